//! vsstore: read-only reconstruction of Volume Shadow Copy snapshots from
//! the on-disk VSS store of an NTFS volume.
//!
//! Layers (leaf first):
//! - record: packed record decoders and chain walking;
//! - snapshots: index, per-snapshot diff areas, merged shadow copies and
//!   the chunked read path;
//! - config / metrics / error / util: ambient pieces;
//! - cli: data-producing bodies of the vsstore commands.

pub mod consts;
pub mod error;
pub mod config;
pub mod metrics;
pub mod util;

pub mod record;
pub mod snapshots;
pub mod cli;

pub use config::{VssConfig, VssConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use snapshots::{
    has_snapshots_index, ShadowCopy, ShadowCopyInformation, ShadowCopyStream, Snapshot,
    SnapshotInformation, SnapshotsIndex,
};
