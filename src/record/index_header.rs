//! record/index_header — the snapshots index (volume) header at 0x1E00.

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use serde::Serialize;
use std::io::{Read, Seek};
use uuid::Uuid;

use crate::consts::INDEX_HEADER_SIZE;
use crate::error::{Error, Result};
use crate::record::common::{
    IDX_OFF_CATALOG_OFFSET, IDX_OFF_FLAGS, IDX_OFF_MAXIMUM_SIZE, IDX_OFF_PADDING,
    IDX_OFF_PROTECTION_FLAGS, IDX_OFF_STORAGE_GUID, IDX_OFF_VOLUME_GUID,
};
use crate::record::node::{Node, NodeType};
use crate::util::{guid_from_le, is_zeroed, read_block_at};

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotsIndexHeader {
    pub node: Node,
    pub first_catalog_offset: u64,
    pub maximum_size: u64,
    pub volume_guid: Uuid,
    pub storage_guid: Uuid,
    pub flags: u32,
    pub protection_flags: u32,
}

impl SnapshotsIndexHeader {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        Error::check_size("snapshots index header", buf, INDEX_HEADER_SIZE)?;
        let node = Node::parse_expecting(buf, NodeType::VolumeHeader)?;

        let first_catalog_offset =
            LittleEndian::read_u64(&buf[IDX_OFF_CATALOG_OFFSET..IDX_OFF_CATALOG_OFFSET + 8]);
        if first_catalog_offset % crate::consts::STORE_BLOCK_SIZE as u64 != 0 {
            return Err(Error::bad(format!(
                "snapshots index header has misaligned catalog offset {:#x}",
                first_catalog_offset
            )));
        }

        if !is_zeroed(&buf[IDX_OFF_PADDING..INDEX_HEADER_SIZE]) {
            debug!("VSS snapshots index header has unexpected non-zero padding");
        }

        Ok(Self {
            node,
            first_catalog_offset,
            maximum_size: LittleEndian::read_u64(&buf[IDX_OFF_MAXIMUM_SIZE..IDX_OFF_MAXIMUM_SIZE + 8]),
            volume_guid: guid_from_le(&buf[IDX_OFF_VOLUME_GUID..IDX_OFF_VOLUME_GUID + 16]),
            storage_guid: guid_from_le(&buf[IDX_OFF_STORAGE_GUID..IDX_OFF_STORAGE_GUID + 16]),
            flags: LittleEndian::read_u32(&buf[IDX_OFF_FLAGS..IDX_OFF_FLAGS + 4]),
            protection_flags: LittleEndian::read_u32(
                &buf[IDX_OFF_PROTECTION_FLAGS..IDX_OFF_PROTECTION_FLAGS + 4],
            ),
        })
    }

    /// Read and decode the header at `offset` (normally 0x1E00).
    pub fn read<R: Read + Seek + ?Sized>(stream: &mut R, offset: u64) -> Result<Self> {
        let mut buf = [0u8; INDEX_HEADER_SIZE];
        read_block_at(stream, offset, &mut buf, "snapshots index header")?;
        Self::parse(&buf)
    }

    pub fn version(&self) -> u32 {
        self.node.version
    }

    pub fn has_catalog(&self) -> bool {
        self.first_catalog_offset != 0
    }

    /// Diff areas are stored on the protected volume itself.
    pub fn is_local_storage(&self) -> bool {
        self.volume_guid == self.storage_guid
    }
}
