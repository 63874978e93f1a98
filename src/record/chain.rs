//! record/chain — walking Node.next linked chains of 16 KiB store blocks.
//!
//! Public API:
//! - walk_chain(stream, head, node_type, max_blocks, visit) -> Result<usize>
//!   Reads each block starting at `head`, validates its node (type must match),
//!   hands (node, block) to `visit`, follows `node.next` until 0.
//!
//! Loop protection:
//! - the node decoder rejects `next == offset`;
//! - an already-visited offset aborts with BadMessage;
//! - at most `max_blocks` blocks are read (VssConfig::max_chain_blocks).

use log::{debug, trace};
use std::collections::HashSet;
use std::io::{Read, Seek};

use crate::consts::{BLOCK_HEADER_SIZE, STORE_BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::metrics::{record_chain_block, record_chain_loop};
use crate::record::common::BLK_OFF_PADDING;
use crate::record::node::{Node, NodeType};
use crate::util::{is_zeroed, read_block_at};

/// Walk a chain of store blocks. Returns the number of blocks visited.
pub fn walk_chain<R, F>(
    stream: &mut R,
    head: u64,
    node_type: NodeType,
    max_blocks: usize,
    mut visit: F,
) -> Result<usize>
where
    R: Read + Seek + ?Sized,
    F: FnMut(&Node, &[u8]) -> Result<()>,
{
    let mut seen: HashSet<u64> = HashSet::new();
    let mut block = vec![0u8; STORE_BLOCK_SIZE];
    let mut offset = head;
    let mut count = 0usize;

    while offset != 0 {
        if !seen.insert(offset) {
            record_chain_loop();
            return Err(Error::bad(format!(
                "{} chain revisits block {:#x}",
                node_type, offset
            )));
        }
        if count >= max_blocks {
            record_chain_loop();
            return Err(Error::bad(format!(
                "{} chain longer than {} blocks",
                node_type, max_blocks
            )));
        }

        read_block_at(stream, offset, &mut block, "store block")?;
        record_chain_block();
        count += 1;

        let node = Node::parse_expecting(&block, node_type)?;
        if node.offset != offset {
            debug!(
                "VSS {} block read at {:#x} declares offset {:#x}",
                node_type, offset, node.offset
            );
        }
        if !is_zeroed(&block[BLK_OFF_PADDING..BLOCK_HEADER_SIZE]) {
            debug!("VSS {} block at {:#x} has non-zero header padding", node_type, offset);
        }

        trace!("VSS {} block {:#x} -> next {:#x}", node_type, offset, node.next);
        visit(&node, &block)?;
        offset = node.next;
    }

    Ok(count)
}
