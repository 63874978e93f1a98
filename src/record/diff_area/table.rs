//! record/diff_area/table — the diff area table chain.
//!
//! Each block: 128-byte header (node type DiffAreaTable) followed by 508
//! entries. Entries are split by kind in table order; empty slots and UNUSED
//! entries are dropped.

use std::io::{Read, Seek};

use log::trace;

use crate::consts::{BLOCK_HEADER_SIZE, DIFF_AREA_ENTRIES_PER_BLOCK, DIFF_AREA_ENTRY_SIZE};
use crate::error::Result;
use crate::metrics::record_diff_area_entries;
use crate::record::chain::walk_chain;
use crate::record::diff_area::entry::DiffAreaTableEntry;
use crate::record::node::NodeType;

#[derive(Debug, Clone, Default)]
pub struct DiffAreaTable {
    pub overlay_entries: Vec<DiffAreaTableEntry>,
    pub cow_entries: Vec<DiffAreaTableEntry>,
}

impl DiffAreaTable {
    /// Split one decoded block body into the two entry lists.
    pub fn push_block(&mut self, block: &[u8]) -> Result<usize> {
        let mut decoded = 0usize;
        for i in 0..DIFF_AREA_ENTRIES_PER_BLOCK {
            let start = BLOCK_HEADER_SIZE + i * DIFF_AREA_ENTRY_SIZE;
            let Some(entry) = DiffAreaTableEntry::parse(&block[start..start + DIFF_AREA_ENTRY_SIZE])? else {
                continue;
            };
            decoded += 1;
            if entry.is_overlay() {
                self.overlay_entries.push(entry);
            } else if !entry.is_unused() {
                self.cow_entries.push(entry);
            }
        }
        Ok(decoded)
    }

    pub fn parse<R: Read + Seek + ?Sized>(stream: &mut R, head: u64, max_blocks: usize) -> Result<Self> {
        let mut table = DiffAreaTable::default();
        let blocks = walk_chain(stream, head, NodeType::DiffAreaTable, max_blocks, |_node, block| {
            let n = table.push_block(block)?;
            record_diff_area_entries(n);
            Ok(())
        })?;
        trace!(
            "VSS diff area table {:#x}: {} block(s), {} overlay(s), {} cow(s)",
            head,
            blocks,
            table.overlay_entries.len(),
            table.cow_entries.len()
        );
        Ok(table)
    }
}
