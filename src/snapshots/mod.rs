//! Snapshot layer split into submodules:
//! - information.rs: SnapshotInformation / ShadowCopyInformation.
//! - index.rs: SnapshotsIndex (header + catalog + application info), has_snapshots_index().
//! - snapshot.rs: Snapshot (diff area maps) and forwarder resolution.
//! - shadow_copy.rs: ShadowCopy (merged view of a snapshot chain).
//! - read.rs: chunked read engine (ReadParameters, Chunk, ShadowCopy::read_at).
//! - stream.rs: ShadowCopyStream (Read + Seek).
//! - dump.rs: JSON diagnostics.

pub mod dump;
pub mod index;
pub mod information;
pub mod read;
pub mod shadow_copy;
pub mod snapshot;
pub mod stream;

pub use index::{has_snapshots_index, parse_shadow_copy_id, SnapshotsIndex};
pub use information::{ShadowCopyInformation, SnapshotInformation};
pub use read::{Chunk, ChunkKind, ReadParameters};
pub use shadow_copy::{Block, CopyOnWriteBlock, ShadowCopy};
pub use snapshot::{CopyOnWrite, Forwarder, Overlay, Snapshot};
pub use stream::ShadowCopyStream;
