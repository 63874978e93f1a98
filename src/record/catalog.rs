//! record/catalog — catalog chain and its 128-byte entries.
//!
//! The catalog lists, for every snapshot, one SnapshotInfo entry (identity,
//! size, layer position, creation time) and one DiffAreaInfo entry (heads of
//! the per-snapshot diff area chains). Both carry the same store GUID.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::io::{Read, Seek};
use uuid::Uuid;

use crate::consts::{BLOCK_HEADER_SIZE, CATALOG_ENTRIES_PER_BLOCK, CATALOG_ENTRY_SIZE, STORE_BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::record::chain::walk_chain;
use crate::record::common::*;
use crate::record::node::NodeType;
use crate::util::{filetime_to_utc, guid_from_le, is_zeroed};

pub const CATALOG_ENTRY_END: u32 = 0;
pub const CATALOG_ENTRY_FREE: u32 = 1;
pub const CATALOG_ENTRY_SNAPSHOT_INFO: u32 = 2;
pub const CATALOG_ENTRY_DIFF_AREA_INFO: u32 = 3;

/// Catalog entry type 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    /// Size of the protected volume in bytes.
    pub size: u64,
    pub guid: Uuid,
    /// Layer position in the snapshot stack.
    pub position: u64,
    /// vista/seven: 0x40, w8: 0x440
    pub flags: u64,
    /// Raw FILETIME.
    pub creation_time: u64,
}

impl SnapshotInfo {
    pub fn parse(e: &[u8]) -> Result<Self> {
        Error::check_size("catalog SnapshotInfo", e, CATALOG_ENTRY_SIZE)?;
        let t = LittleEndian::read_u32(&e[CAT_OFF_TYPE..CAT_OFF_TYPE + 4]);
        if t != CATALOG_ENTRY_SNAPSHOT_INFO {
            return Err(Error::bad(format!(
                "catalog SnapshotInfo has invalid type {}",
                t
            )));
        }

        let size = LittleEndian::read_i64(&e[CAT_SI_OFF_SIZE..CAT_SI_OFF_SIZE + 8]);
        if size <= 0 {
            return Err(Error::bad(format!(
                "catalog SnapshotInfo has invalid size {}",
                size
            )));
        }

        let position = LittleEndian::read_i64(&e[CAT_SI_OFF_POSITION..CAT_SI_OFF_POSITION + 8]);
        if position < 0 {
            return Err(Error::bad(format!(
                "catalog SnapshotInfo has invalid position {}",
                position
            )));
        }

        debug!(
            "VSS catalog SnapshotInfo unknown4={} unknown56={}",
            e[CAT_SI_OFF_UNKNOWN4],
            LittleEndian::read_u16(&e[CAT_SI_OFF_UNKNOWN56..CAT_SI_OFF_UNKNOWN56 + 2])
        );
        if !is_zeroed(&e[CAT_SI_OFF_PADDING..CATALOG_ENTRY_SIZE]) {
            debug!("VSS catalog SnapshotInfo has unexpected non-zero padding");
        }

        Ok(Self {
            size: size as u64,
            guid: guid_from_le(&e[CAT_SI_OFF_GUID..CAT_SI_OFF_GUID + 16]),
            position: position as u64,
            flags: LittleEndian::read_u64(&e[CAT_SI_OFF_FLAGS..CAT_SI_OFF_FLAGS + 8]),
            creation_time: LittleEndian::read_u64(
                &e[CAT_SI_OFF_CREATION_TIME..CAT_SI_OFF_CREATION_TIME + 8],
            ),
        })
    }

    pub fn creation_time_utc(&self) -> Option<DateTime<Utc>> {
        filetime_to_utc(self.creation_time)
    }
}

/// Catalog entry type 3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffAreaInfo {
    pub first_diff_area_table_offset: u64,
    pub guid: Uuid,
    pub application_info_offset: u64,
    pub first_location_table_offset: u64,
    pub first_bitmap_offset: u64,
    /// NTFS file reference of the diff area file.
    pub frn: u64,
    pub allocated_size: u64,
    /// 0 when there is no previous bitmap.
    pub previous_bitmap_offset: u64,
}

fn block_offset_field(e: &[u8], off: usize, name: &str) -> Result<u64> {
    let v = LittleEndian::read_i64(&e[off..off + 8]);
    if v <= 0 || (v as u64) % STORE_BLOCK_SIZE as u64 != 0 {
        return Err(Error::bad(format!(
            "catalog DiffAreaInfo has invalid '{}' ({:#x})",
            name, v
        )));
    }
    Ok(v as u64)
}

impl DiffAreaInfo {
    pub fn parse(e: &[u8]) -> Result<Self> {
        Error::check_size("catalog DiffAreaInfo", e, CATALOG_ENTRY_SIZE)?;
        let t = LittleEndian::read_u32(&e[CAT_OFF_TYPE..CAT_OFF_TYPE + 4]);
        if t != CATALOG_ENTRY_DIFF_AREA_INFO {
            return Err(Error::bad(format!(
                "catalog DiffAreaInfo has invalid type {}",
                t
            )));
        }

        let first_diff_area_table_offset =
            block_offset_field(e, CAT_DA_OFF_TABLE_OFFSET, "diff_area_table_offset")?;
        let application_info_offset =
            block_offset_field(e, CAT_DA_OFF_APPLICATION_INFO, "application_info_offset")?;
        let first_location_table_offset =
            block_offset_field(e, CAT_DA_OFF_LOCATION_TABLE, "location_table_offset")?;
        let first_bitmap_offset = block_offset_field(e, CAT_DA_OFF_BITMAP, "bitmap_offset")?;

        let previous_bitmap_offset =
            LittleEndian::read_u64(&e[CAT_DA_OFF_PREVIOUS_BITMAP..CAT_DA_OFF_PREVIOUS_BITMAP + 8]);

        debug!(
            "VSS catalog DiffAreaInfo unknown72={}",
            LittleEndian::read_u32(&e[CAT_DA_OFF_UNKNOWN72..CAT_DA_OFF_UNKNOWN72 + 4])
        );
        if !is_zeroed(&e[CAT_DA_OFF_PADDING..CATALOG_ENTRY_SIZE]) {
            debug!("VSS catalog DiffAreaInfo has unexpected non-zero padding");
        }

        Ok(Self {
            first_diff_area_table_offset,
            guid: guid_from_le(&e[CAT_DA_OFF_GUID..CAT_DA_OFF_GUID + 16]),
            application_info_offset,
            first_location_table_offset,
            first_bitmap_offset,
            frn: LittleEndian::read_u64(&e[CAT_DA_OFF_FRN..CAT_DA_OFF_FRN + 8]),
            allocated_size: LittleEndian::read_u64(
                &e[CAT_DA_OFF_ALLOCATED_SIZE..CAT_DA_OFF_ALLOCATED_SIZE + 8],
            ),
            previous_bitmap_offset,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    EndOfCatalog,
    Free,
    SnapshotInfo(SnapshotInfo),
    DiffAreaInfo(DiffAreaInfo),
}

impl CatalogEntry {
    pub fn parse(e: &[u8]) -> Result<Self> {
        Error::check_size("catalog entry", e, CATALOG_ENTRY_SIZE)?;
        let t = LittleEndian::read_u32(&e[CAT_OFF_TYPE..CAT_OFF_TYPE + 4]);
        match t {
            CATALOG_ENTRY_END | CATALOG_ENTRY_FREE => {
                if !is_zeroed(&e[CAT_EMPTY_OFF_PADDING..CATALOG_ENTRY_SIZE]) {
                    debug!("VSS catalog entry type {} has unexpected non-zero padding", t);
                }
                Ok(if t == CATALOG_ENTRY_END {
                    CatalogEntry::EndOfCatalog
                } else {
                    CatalogEntry::Free
                })
            }
            CATALOG_ENTRY_SNAPSHOT_INFO => Ok(CatalogEntry::SnapshotInfo(SnapshotInfo::parse(e)?)),
            CATALOG_ENTRY_DIFF_AREA_INFO => Ok(CatalogEntry::DiffAreaInfo(DiffAreaInfo::parse(e)?)),
            other => Err(Error::InvalidArgument(format!(
                "unknown catalog entry type {}",
                other
            ))),
        }
    }
}

/// All entries of a catalog chain (EndOfCatalog markers excluded).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn parse<R: Read + Seek + ?Sized>(stream: &mut R, head: u64, max_blocks: usize) -> Result<Self> {
        let mut entries = Vec::new();

        walk_chain(stream, head, NodeType::Catalog, max_blocks, |_node, block| {
            for i in 0..CATALOG_ENTRIES_PER_BLOCK {
                let start = BLOCK_HEADER_SIZE + i * CATALOG_ENTRY_SIZE;
                let entry = CatalogEntry::parse(&block[start..start + CATALOG_ENTRY_SIZE])?;
                if entry == CatalogEntry::EndOfCatalog {
                    break;
                }
                entries.push(entry);
            }
            Ok(())
        })?;

        Ok(Self { entries })
    }

    pub fn snapshot_infos(&self) -> impl Iterator<Item = &SnapshotInfo> {
        self.entries.iter().filter_map(|e| match e {
            CatalogEntry::SnapshotInfo(s) => Some(s),
            _ => None,
        })
    }

    pub fn diff_area_infos(&self) -> impl Iterator<Item = &DiffAreaInfo> {
        self.entries.iter().filter_map(|e| match e {
            CatalogEntry::DiffAreaInfo(d) => Some(d),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn diff_area_entry() -> Vec<u8> {
        let mut e = vec![0u8; CATALOG_ENTRY_SIZE];
        LittleEndian::write_u32(&mut e[0..4], CATALOG_ENTRY_DIFF_AREA_INFO);
        LittleEndian::write_u64(&mut e[8..16], 0x10000);
        LittleEndian::write_u64(&mut e[32..40], 0x14000);
        LittleEndian::write_u64(&mut e[40..48], 0x18000);
        LittleEndian::write_u64(&mut e[48..56], 0x1C000);
        e
    }

    #[test]
    fn diff_area_info_offsets() {
        let d = DiffAreaInfo::parse(&diff_area_entry()).expect("valid");
        assert_eq!(d.first_diff_area_table_offset, 0x10000);
        assert_eq!(d.first_location_table_offset, 0x18000);
        assert_eq!(d.previous_bitmap_offset, 0);

        let mut e = diff_area_entry();
        LittleEndian::write_u64(&mut e[48..56], 0x1C010);
        assert_eq!(DiffAreaInfo::parse(&e).unwrap_err().kind(), ErrorKind::BadMessage);
    }

    #[test]
    fn snapshot_info_rejects_non_positive_size() {
        let mut e = vec![0u8; CATALOG_ENTRY_SIZE];
        LittleEndian::write_u32(&mut e[0..4], CATALOG_ENTRY_SNAPSHOT_INFO);
        assert_eq!(SnapshotInfo::parse(&e).unwrap_err().kind(), ErrorKind::BadMessage);

        LittleEndian::write_i64(&mut e[8..16], 1 << 30);
        LittleEndian::write_i64(&mut e[32..40], 3);
        let s = SnapshotInfo::parse(&e).expect("valid");
        assert_eq!(s.position, 3);
    }

    #[test]
    fn unknown_entry_type() {
        let mut e = vec![0u8; CATALOG_ENTRY_SIZE];
        LittleEndian::write_u32(&mut e[0..4], 9);
        assert_eq!(CatalogEntry::parse(&e).unwrap_err().kind(), ErrorKind::InvalidArgument);
        LittleEndian::write_u32(&mut e[0..4], CATALOG_ENTRY_FREE);
        assert_eq!(CatalogEntry::parse(&e).unwrap(), CatalogEntry::Free);
    }
}
