//! record/diff_area — per-snapshot diff area chains (table, bitmap, location table).

pub mod bitmap;
pub mod entry;
pub mod location;
pub mod table;

pub use bitmap::{bitmap_bit, clear_bitmap_bit, DiffAreaBitmap};
pub use entry::{DiffAreaEntryFlags, DiffAreaTableEntry};
pub use location::DiffAreaLocationTable;
pub use table::DiffAreaTable;
