//! record — decoders for the packed on-disk records of the VSS store.
//!
//! Every decoder takes a byte slice, checks its size, reads fields with
//! explicit little-endian readers and validates structural invariants.
//! Chained records are walked through `chain::walk_chain`.

pub mod application_info;
pub mod attributes;
pub mod catalog;
pub mod chain;
pub mod common;
pub mod diff_area;
pub mod index_header;
pub mod node;

pub use application_info::{ApplicationInformation, VssLocalInfo};
pub use attributes::{SnapshotContext, VolumeSnapshotAttributes};
pub use catalog::{Catalog, CatalogEntry, DiffAreaInfo, SnapshotInfo};
pub use index_header::SnapshotsIndexHeader;
pub use node::{Node, NodeType};
