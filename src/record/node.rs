//! record/node — the 48-byte prefix shared by every store record.

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::consts::{NODE_SIZE, VSS_IDENTIFIER};
use crate::error::{Error, Result};
use crate::record::common::{
    NODE_OFF_GUID, NODE_OFF_NEXT, NODE_OFF_OFFSET, NODE_OFF_RELATIVE_OFFSET, NODE_OFF_TYPE,
    NODE_OFF_VERSION,
};
use crate::util::guid_from_le;

/// Record type carried by the node prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeType {
    Unknown,
    VolumeHeader,
    Catalog,
    DiffAreaTable,
    ApplicationInfo,
    DiffAreaLocationTable,
    DiffAreaBitmap,
}

impl NodeType {
    pub fn from_u32(code: u32) -> Self {
        match code {
            1 => NodeType::VolumeHeader,
            2 => NodeType::Catalog,
            3 => NodeType::DiffAreaTable,
            4 => NodeType::ApplicationInfo,
            5 => NodeType::DiffAreaLocationTable,
            6 => NodeType::DiffAreaBitmap,
            _ => NodeType::Unknown,
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            NodeType::Unknown => 0,
            NodeType::VolumeHeader => 1,
            NodeType::Catalog => 2,
            NodeType::DiffAreaTable => 3,
            NodeType::ApplicationInfo => 4,
            NodeType::DiffAreaLocationTable => 5,
            NodeType::DiffAreaBitmap => 6,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeType::Unknown => "unknown",
            NodeType::VolumeHeader => "volume_header",
            NodeType::Catalog => "catalog",
            NodeType::DiffAreaTable => "diff_area_table",
            NodeType::ApplicationInfo => "application_info",
            NodeType::DiffAreaLocationTable => "diff_area_location_table",
            NodeType::DiffAreaBitmap => "diff_area_bitmap",
        };
        f.write_str(s)
    }
}

/// Decoded node prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub guid: Uuid,
    pub version: u32,
    pub node_type: NodeType,
    pub relative_offset: u64,
    pub offset: u64,
    /// 0 marks the last record of a chain.
    pub next: u64,
}

impl Node {
    /// Decode and validate a node prefix.
    pub fn parse(buf: &[u8]) -> Result<Node> {
        Error::check_size("node", buf, NODE_SIZE)?;

        if buf[NODE_OFF_GUID..NODE_OFF_GUID + 16] != VSS_IDENTIFIER {
            return Err(Error::bad(format!(
                "node has unexpected identifier {}",
                guid_from_le(&buf[NODE_OFF_GUID..NODE_OFF_GUID + 16])
            )));
        }

        let version = LittleEndian::read_u32(&buf[NODE_OFF_VERSION..NODE_OFF_VERSION + 4]);
        if version != 1 && version != 2 {
            debug!("VSS node has unusual version {}", version);
        }

        let raw_type = LittleEndian::read_u32(&buf[NODE_OFF_TYPE..NODE_OFF_TYPE + 4]);
        let node_type = NodeType::from_u32(raw_type);
        if node_type == NodeType::Unknown {
            debug!("VSS node has unknown type {}", raw_type);
        }

        let offset = LittleEndian::read_u64(&buf[NODE_OFF_OFFSET..NODE_OFF_OFFSET + 8]);
        let next = LittleEndian::read_u64(&buf[NODE_OFF_NEXT..NODE_OFF_NEXT + 8]);
        if next == offset {
            return Err(Error::bad(format!(
                "node at {:#x} links to itself",
                offset
            )));
        }

        Ok(Node {
            guid: guid_from_le(&buf[NODE_OFF_GUID..NODE_OFF_GUID + 16]),
            version,
            node_type,
            relative_offset: LittleEndian::read_u64(
                &buf[NODE_OFF_RELATIVE_OFFSET..NODE_OFF_RELATIVE_OFFSET + 8],
            ),
            offset,
            next,
        })
    }

    /// Decode a node that must be of the given type.
    pub fn parse_expecting(buf: &[u8], expected: NodeType) -> Result<Node> {
        let node = Node::parse(buf)?;
        if node.node_type != expected {
            return Err(Error::bad(format!(
                "unexpected node type {} (expected {})",
                node.node_type, expected
            )));
        }
        Ok(node)
    }

    pub fn is_last(&self) -> bool {
        self.next == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn raw_node(node_type: u32, offset: u64, next: u64) -> Vec<u8> {
        let mut b = vec![0u8; NODE_SIZE];
        b[..16].copy_from_slice(&VSS_IDENTIFIER);
        LittleEndian::write_u32(&mut b[16..20], 1);
        LittleEndian::write_u32(&mut b[20..24], node_type);
        LittleEndian::write_u64(&mut b[24..32], 0x80);
        LittleEndian::write_u64(&mut b[32..40], offset);
        LittleEndian::write_u64(&mut b[40..48], next);
        b
    }

    #[test]
    fn parses_valid_node() {
        let n = Node::parse(&raw_node(3, 0x8000, 0xC000)).expect("valid");
        assert_eq!(n.node_type, NodeType::DiffAreaTable);
        assert_eq!(n.relative_offset, 0x80);
        assert_eq!(n.offset, 0x8000);
        assert_eq!(n.next, 0xC000);
        assert!(!n.is_last());
    }

    #[test]
    fn rejects_bad_guid_and_self_loop() {
        let mut b = raw_node(2, 0x4000, 0);
        b[0] ^= 0xFF;
        assert_eq!(Node::parse(&b).unwrap_err().kind(), ErrorKind::BadMessage);

        let b = raw_node(2, 0x4000, 0x4000);
        assert_eq!(Node::parse(&b).unwrap_err().kind(), ErrorKind::BadMessage);
    }

    #[test]
    fn short_buffer_and_type_mismatch() {
        let b = raw_node(2, 0x4000, 0);
        assert_eq!(
            Node::parse(&b[..40]).unwrap_err().kind(),
            ErrorKind::MessageSize
        );
        assert_eq!(
            Node::parse_expecting(&b, NodeType::DiffAreaBitmap)
                .unwrap_err()
                .kind(),
            ErrorKind::BadMessage
        );
        assert!(Node::parse_expecting(&b, NodeType::Catalog).is_ok());
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let n = Node::parse(&raw_node(42, 0x4000, 0)).expect("tolerated");
        assert_eq!(n.node_type, NodeType::Unknown);
        assert_eq!(NodeType::from_u32(NodeType::DiffAreaBitmap.to_u32()), NodeType::DiffAreaBitmap);
    }
}
