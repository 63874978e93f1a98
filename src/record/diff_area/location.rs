//! record/diff_area/location — the diff area location table chain.
//!
//! The body layout is not known. Non-zero 24-byte slots are counted so a
//! caller can tell whether the store depends on it.

use std::io::{Read, Seek};

use crate::consts::{BLOCK_HEADER_SIZE, LOCATION_SLOT_SIZE, STORE_BLOCK_SIZE};
use crate::error::Result;
use crate::record::chain::walk_chain;
use crate::record::node::NodeType;
use crate::util::is_zeroed;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffAreaLocationTable {
    pub blocks: usize,
    pub items: usize,
}

/// Count the non-zero slots in one block body.
pub fn count_location_items(block: &[u8]) -> usize {
    block[BLOCK_HEADER_SIZE..STORE_BLOCK_SIZE.min(block.len())]
        .chunks_exact(LOCATION_SLOT_SIZE)
        .filter(|slot| !is_zeroed(slot))
        .count()
}

impl DiffAreaLocationTable {
    pub fn parse<R: Read + Seek + ?Sized>(stream: &mut R, head: u64, max_blocks: usize) -> Result<Self> {
        let mut items = 0usize;
        let blocks = walk_chain(
            stream,
            head,
            NodeType::DiffAreaLocationTable,
            max_blocks,
            |_node, block| {
                items += count_location_items(block);
                Ok(())
            },
        )?;
        Ok(Self { blocks, items })
    }

    pub fn is_empty(&self) -> bool {
        self.items == 0
    }
}
