//! record/common — field offsets of the packed store records.
//!
//! Every record starts with the 48-byte node prefix; record specific fields
//! follow. Offsets are relative to the start of the record (or of the entry
//! for catalog / diff area entries).

// ---------- Node (common prefix) ----------
/// Store identifier GUID (16 bytes).
pub const NODE_OFF_GUID: usize = 0;
/// Record version (u32).
pub const NODE_OFF_VERSION: usize = 16;
/// Record type (u32), see NodeType.
pub const NODE_OFF_TYPE: usize = 20;
/// Offset relative to the store start (u64).
pub const NODE_OFF_RELATIVE_OFFSET: usize = 24;
/// Absolute volume offset of this record (u64).
pub const NODE_OFF_OFFSET: usize = 32;
/// Absolute volume offset of the next record in the chain, 0 = end (u64).
pub const NODE_OFF_NEXT: usize = 40;

// ---------- Snapshots index header (volume header @0x1E00) ----------
pub const IDX_OFF_CATALOG_OFFSET: usize = 48;
pub const IDX_OFF_MAXIMUM_SIZE: usize = 56;
pub const IDX_OFF_VOLUME_GUID: usize = 64;
pub const IDX_OFF_STORAGE_GUID: usize = 80;
pub const IDX_OFF_FLAGS: usize = 96;
pub const IDX_OFF_PROTECTION_FLAGS: usize = 100;
/// Start of the trailing zero padding of the decoded part.
pub const IDX_OFF_PADDING: usize = 104;

// ---------- Catalog entry (128 bytes) ----------
/// Entry type (u32).
pub const CAT_OFF_TYPE: usize = 0;

// SnapshotInfo (type 2)
pub const CAT_SI_OFF_UNKNOWN4: usize = 4;
pub const CAT_SI_OFF_SIZE: usize = 8;
pub const CAT_SI_OFF_GUID: usize = 16;
pub const CAT_SI_OFF_POSITION: usize = 32;
pub const CAT_SI_OFF_FLAGS: usize = 40;
pub const CAT_SI_OFF_CREATION_TIME: usize = 48;
pub const CAT_SI_OFF_UNKNOWN56: usize = 56;
pub const CAT_SI_OFF_PADDING: usize = 58;

// DiffAreaInfo (type 3)
pub const CAT_DA_OFF_TABLE_OFFSET: usize = 8;
pub const CAT_DA_OFF_GUID: usize = 16;
pub const CAT_DA_OFF_APPLICATION_INFO: usize = 32;
pub const CAT_DA_OFF_LOCATION_TABLE: usize = 40;
pub const CAT_DA_OFF_BITMAP: usize = 48;
pub const CAT_DA_OFF_FRN: usize = 56;
pub const CAT_DA_OFF_ALLOCATED_SIZE: usize = 64;
pub const CAT_DA_OFF_PREVIOUS_BITMAP: usize = 72;
pub const CAT_DA_OFF_UNKNOWN72: usize = 80;
pub const CAT_DA_OFF_PADDING: usize = 84;

// EndOfCatalog / FreeEntry (type 0 / 1)
pub const CAT_EMPTY_OFF_PADDING: usize = 4;

// ---------- Application information ----------
/// Size of the VssLocalInfo payload (u64).
pub const APP_OFF_INFO_SIZE: usize = 48;
pub const APP_OFF_PADDING: usize = 56;

// VssLocalInfo, relative to the end of the 128-byte application header
pub const LOCAL_OFF_GUID: usize = 0;
pub const LOCAL_OFF_SHADOW_COPY_ID: usize = 16;
pub const LOCAL_OFF_SHADOW_COPY_SET_ID: usize = 32;
pub const LOCAL_OFF_CONTEXT: usize = 48;
pub const LOCAL_OFF_SNAPSHOTS_COUNT: usize = 52;
pub const LOCAL_OFF_ATTRIBUTES: usize = 56;
pub const LOCAL_OFF_UNKNOWN: usize = 60;

// ---------- Diff area table entry (32 bytes) ----------
pub const DAE_OFF_OFFSET: usize = 0;
pub const DAE_OFF_DATA_RELATIVE_OFFSET: usize = 8;
pub const DAE_OFF_DATA_OFFSET: usize = 16;
pub const DAE_OFF_FLAGS: usize = 24;
pub const DAE_OFF_BITMAP: usize = 28;

// ---------- Block header (catalog / diff area / bitmap / location) ----------
/// Zero padding after the node up to BLOCK_HEADER_SIZE.
pub const BLK_OFF_PADDING: usize = 48;
