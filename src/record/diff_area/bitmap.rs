//! record/diff_area/bitmap — the per-snapshot volume block bitmap.
//!
//! One bit per 16 KiB volume block, LSB first. The payload of every block
//! of the chain (everything after the 128-byte header) is appended in order.

use std::io::{Read, Seek};

use crate::consts::{BITMAP_PAYLOAD_PER_BLOCK, BLOCK_HEADER_SIZE, VOLUME_BLOCK_SHIFT};
use crate::error::Result;
use crate::record::chain::walk_chain;
use crate::record::node::NodeType;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffAreaBitmap {
    pub bytes: Vec<u8>,
}

impl DiffAreaBitmap {
    /// A head offset of 0 yields an empty bitmap.
    pub fn parse<R: Read + Seek + ?Sized>(stream: &mut R, head: u64, max_blocks: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        walk_chain(stream, head, NodeType::DiffAreaBitmap, max_blocks, |_node, block| {
            bytes.extend_from_slice(&block[BLOCK_HEADER_SIZE..BLOCK_HEADER_SIZE + BITMAP_PAYLOAD_PER_BLOCK]);
            Ok(())
        })?;
        Ok(Self { bytes })
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// State of the bit for the volume block containing `offset`;
/// None when the bitmap does not cover it.
pub fn bitmap_bit(bitmap: &[u8], offset: u64) -> Option<bool> {
    let block = offset >> VOLUME_BLOCK_SHIFT;
    let byte = usize::try_from(block / 8).ok()?;
    let b = *bitmap.get(byte)?;
    Some(b & (1 << (block % 8)) != 0)
}

/// Clear the bit of the block containing `offset`. Returns false when out of range.
pub fn clear_bitmap_bit(bitmap: &mut [u8], offset: u64) -> bool {
    let block = offset >> VOLUME_BLOCK_SHIFT;
    let Ok(byte) = usize::try_from(block / 8) else {
        return false;
    };
    match bitmap.get_mut(byte) {
        Some(b) => {
            *b &= !(1u8 << (block % 8));
            true
        }
        None => false,
    }
}
