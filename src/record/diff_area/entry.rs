//! record/diff_area/entry — one 32-byte diff area table entry.

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use serde::Serialize;

use crate::consts::{DIFF_AREA_ENTRY_SIZE, VOLUME_BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::record::common::{
    DAE_OFF_BITMAP, DAE_OFF_DATA_OFFSET, DAE_OFF_DATA_RELATIVE_OFFSET, DAE_OFF_FLAGS, DAE_OFF_OFFSET,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DiffAreaEntryFlags: u32 {
        /// Data lives at the offset named by a newer snapshot.
        const FORWARDER = 0x1;
        /// Scoped snapshot redirection.
        const OVERLAY   = 0x2;
        const UNUSED    = 0x4;
    }
}

impl Serialize for DiffAreaEntryFlags {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_u32(self.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffAreaTableEntry {
    /// Volume block the entry describes.
    pub offset: u64,
    /// Forwarder target, or 1 for an overlay continuation.
    pub data_relative_offset: u64,
    /// Where the saved block lives.
    pub data_offset: u64,
    pub flags: DiffAreaEntryFlags,
    /// One bit per 512-byte sub-block (overlays only).
    pub bitmap: u32,
}

impl DiffAreaTableEntry {
    /// Decode one slot. Returns Ok(None) for an all-zero (empty) slot.
    pub fn parse(buf: &[u8]) -> Result<Option<Self>> {
        Error::check_size("diff area table entry", buf, DIFF_AREA_ENTRY_SIZE)?;
        let buf = &buf[..DIFF_AREA_ENTRY_SIZE];
        if buf.iter().all(|&b| b == 0) {
            return Ok(None);
        }

        let offset = LittleEndian::read_u64(&buf[DAE_OFF_OFFSET..DAE_OFF_OFFSET + 8]);
        let data_relative_offset =
            LittleEndian::read_u64(&buf[DAE_OFF_DATA_RELATIVE_OFFSET..DAE_OFF_DATA_RELATIVE_OFFSET + 8]);
        let data_offset = LittleEndian::read_u64(&buf[DAE_OFF_DATA_OFFSET..DAE_OFF_DATA_OFFSET + 8]);
        let raw_flags = LittleEndian::read_u32(&buf[DAE_OFF_FLAGS..DAE_OFF_FLAGS + 4]);
        let bitmap = LittleEndian::read_u32(&buf[DAE_OFF_BITMAP..DAE_OFF_BITMAP + 4]);

        if offset % VOLUME_BLOCK_SIZE != 0 {
            return Err(Error::bad(format!(
                "diff area entry has misaligned offset {:#x}",
                offset
            )));
        }
        if data_offset % VOLUME_BLOCK_SIZE != 0 {
            return Err(Error::bad(format!(
                "diff area entry {:#x} has misaligned data offset {:#x}",
                offset, data_offset
            )));
        }

        let flags = DiffAreaEntryFlags::from_bits_retain(raw_flags);
        if flags.bits() & !DiffAreaEntryFlags::all().bits() != 0 {
            debug!("VSS diff area entry {:#x} has unknown flag(s) {:#x}", offset, raw_flags);
        }
        if flags.contains(DiffAreaEntryFlags::FORWARDER | DiffAreaEntryFlags::OVERLAY) {
            return Err(Error::bad(format!(
                "diff area entry {:#x} is both forwarder and overlay",
                offset
            )));
        }

        Ok(Some(Self {
            offset,
            data_relative_offset,
            data_offset,
            flags,
            bitmap,
        }))
    }

    pub fn is_forwarder(&self) -> bool {
        self.flags.contains(DiffAreaEntryFlags::FORWARDER)
    }

    pub fn is_overlay(&self) -> bool {
        self.flags.contains(DiffAreaEntryFlags::OVERLAY)
    }

    pub fn is_unused(&self) -> bool {
        self.flags.contains(DiffAreaEntryFlags::UNUSED)
    }

    /// Overlay entry extending the one already recorded at the same offset.
    pub fn is_continuation(&self) -> bool {
        self.data_relative_offset == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn raw(offset: u64, rel: u64, data: u64, flags: u32, bitmap: u32) -> [u8; 32] {
        let mut b = [0u8; 32];
        LittleEndian::write_u64(&mut b[0..8], offset);
        LittleEndian::write_u64(&mut b[8..16], rel);
        LittleEndian::write_u64(&mut b[16..24], data);
        LittleEndian::write_u32(&mut b[24..28], flags);
        LittleEndian::write_u32(&mut b[28..32], bitmap);
        b
    }

    #[test]
    fn empty_slot_is_skipped() {
        assert_eq!(DiffAreaTableEntry::parse(&[0u8; 32]).unwrap(), None);
    }

    #[test]
    fn alignment_and_flag_checks() {
        let e = DiffAreaTableEntry::parse(&raw(0x4000, 0, 0x8000, 0, 0)).unwrap().unwrap();
        assert!(!e.is_forwarder() && !e.is_overlay());

        let bad = |b: [u8; 32]| DiffAreaTableEntry::parse(&b).unwrap_err().kind();
        assert_eq!(bad(raw(0x4001, 0, 0x8000, 0, 0)), ErrorKind::BadMessage);
        assert_eq!(bad(raw(0x4000, 0, 0x8200, 0, 0)), ErrorKind::BadMessage);
        assert_eq!(bad(raw(0x4000, 0, 0x8000, 3, 0)), ErrorKind::BadMessage);
    }

    #[test]
    fn unknown_flags_are_tolerated() {
        let e = DiffAreaTableEntry::parse(&raw(0x4000, 1, 0x8000, 0x12, 0xF0)).unwrap().unwrap();
        assert!(e.is_overlay());
        assert!(e.is_continuation());
        assert_eq!(e.flags.bits(), 0x12);
        assert_eq!(e.bitmap, 0xF0);
    }
}
