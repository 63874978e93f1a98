//! Shared on-disk constants of the VSS store format (volume header, catalog, diff area).
//!
//! All layouts are little-endian and packed. Offsets inside individual
//! records live in `record::common`.

// -------- Store identifier --------

/// {3808876b-c176-4e48-b7ae-04046e6cc752} as stored on disk (mixed-endian).
pub const VSS_IDENTIFIER: [u8; 16] = [
    0x6b, 0x87, 0x08, 0x38, 0x76, 0xc1, 0x48, 0x4e, 0xb7, 0xae, 0x04, 0x04, 0x6e, 0x6c, 0xc7, 0x52,
];

/// VssLocalInfo guid written by the Microsoft provider.
/// {e5de7d45-49f2-40a4-817c-7dc82b72587f}
pub const MICROSOFT_PROVIDER_GUID: [u8; 16] = [
    0x45, 0x7d, 0xde, 0xe5, 0xf2, 0x49, 0xa4, 0x40, 0x81, 0x7c, 0x7d, 0xc8, 0x2b, 0x72, 0x58, 0x7f,
];

/// VssLocalInfo guid written for hidden snapshots.
/// {f12142b4-9a4b-49af-a851-700c42fdc2be}
pub const MICROSOFT_HIDDEN_PROVIDER_GUID: [u8; 16] = [
    0xb4, 0x42, 0x21, 0xf1, 0x4b, 0x9a, 0xaf, 0x49, 0xa8, 0x51, 0x70, 0x0c, 0x42, 0xfd, 0xc2, 0xbe,
];

// -------- Volume layout --------

/// Fixed volume offset of the snapshots index header.
pub const INDEX_HEADER_OFFSET: u64 = 0x1E00;

/// Every catalog / diff area / bitmap / application info record is one block.
pub const STORE_BLOCK_SIZE: usize = 0x4000;

/// Granularity of COW tracking on the volume (same 16 KiB).
pub const VOLUME_BLOCK_SIZE: u64 = 0x4000;
pub const VOLUME_BLOCK_MASK: u64 = !(VOLUME_BLOCK_SIZE - 1);
pub const VOLUME_BLOCK_SHIFT: u32 = 14;

/// Sub-block unit tracked by the 32-bit entry bitmaps.
pub const SUB_BLOCK_SIZE: u64 = 512;
pub const SUB_BLOCKS_PER_BLOCK: u32 = 32;
pub const FULL_BLOCK_BITMAP: u32 = u32::MAX;

// -------- Record sizes --------

/// Common node prefix of every store record.
pub const NODE_SIZE: usize = 48;

/// Header (node + padding) of a catalog / diff area table / bitmap block.
pub const BLOCK_HEADER_SIZE: usize = 128;

/// Catalog entries.
pub const CATALOG_ENTRY_SIZE: usize = 128;
pub const CATALOG_ENTRIES_PER_BLOCK: usize = (STORE_BLOCK_SIZE - BLOCK_HEADER_SIZE) / CATALOG_ENTRY_SIZE;

/// Diff area table entries.
pub const DIFF_AREA_ENTRY_SIZE: usize = 32;
pub const DIFF_AREA_ENTRIES_PER_BLOCK: usize =
    (STORE_BLOCK_SIZE - BLOCK_HEADER_SIZE) / DIFF_AREA_ENTRY_SIZE;

/// Diff area location table slots (body layout unconfirmed).
pub const LOCATION_SLOT_SIZE: usize = 24;

/// Bytes of bitmap payload carried by a single bitmap block.
pub const BITMAP_PAYLOAD_PER_BLOCK: usize = STORE_BLOCK_SIZE - BLOCK_HEADER_SIZE;

/// Snapshots index header (volume header) decoded size.
pub const INDEX_HEADER_SIZE: usize = 128;

/// Application information fixed header (node + size + padding).
pub const APPLICATION_INFO_HEADER_SIZE: usize = 128;
/// VssLocalInfo fixed part preceding the length-prefixed strings.
pub const VSS_LOCAL_INFO_SIZE: usize = 64;

// -------- Chain guards --------

/// Default cap on blocks visited while walking a single on-disk chain.
pub const DEFAULT_MAX_CHAIN_BLOCKS: usize = 1_000_000;
