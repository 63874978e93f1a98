//! snapshots/read — chunked random-access reads over a shadow copy.
//!
//! A read is split into 16 KiB volume blocks. Each block carries a 32-bit
//! read bitmap (one bit per 512-byte sub-block). For every block the bits
//! are routed to a source:
//! - Overlay: bits covered by the block's overlay bitmap;
//! - CopyOnWrite: remaining bits when the block has a COW redirection;
//! - Zeroes: no redirection and the effective bitmap marks the block (or
//!   does not cover it);
//! - CurrentVolume: no redirection, block unchanged since the snapshot.
//!
//! Runs of bits become chunks; adjacent chunks of the same kind whose
//! source ranges touch are merged (also across blocks) so that contiguous
//! data is fetched with a single positioned read.

use std::io::{Read, Seek};

use log::{debug, trace};

use crate::consts::{FULL_BLOCK_BITMAP, SUB_BLOCKS_PER_BLOCK, SUB_BLOCK_SIZE, VOLUME_BLOCK_MASK, VOLUME_BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::metrics::{
    record_chunk_copy_on_write, record_chunk_current_volume, record_chunk_overlay,
    record_chunk_zeroes, record_read_call,
};
use crate::record::diff_area::bitmap_bit;
use crate::snapshots::shadow_copy::ShadowCopy;
use crate::util::read_chunk_at;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    CurrentVolume,
    CopyOnWrite,
    Overlay,
    Zeroes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    /// Source offset (for Zeroes: the volume offset being described).
    pub offset: u64,
    pub end_offset: u64,
    pub offset_in_block: u32,
    pub length: u64,
}

/// Block decomposition of a `(offset, length)` read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadParameters {
    first_block_offset: u64,
    first_block_bitmap: u32,
    last_block_bitmap: u32,
    block_count: u64,
}

/// Bitmap with the `n` low bits set (n <= 32).
#[inline]
fn low_bits(n: u64) -> u32 {
    ((1u64 << n) - 1) as u32
}

impl ReadParameters {
    /// `length` is clamped so the range ends at or before `u64::MAX`.
    pub fn new(offset: u64, length: usize) -> Self {
        let length = (length as u64).min(u64::MAX - offset);
        if length == 0 {
            return Self::default();
        }

        let first_block_offset = offset & VOLUME_BLOCK_MASK;
        let head = offset - first_block_offset;
        let aligned_length = length + head;
        let residue = aligned_length % VOLUME_BLOCK_SIZE;
        let block_count = aligned_length / VOLUME_BLOCK_SIZE + u64::from(residue != 0);

        let ignored = head / SUB_BLOCK_SIZE;
        let first = !low_bits(ignored);

        let residue_sub_blocks = residue.div_ceil(SUB_BLOCK_SIZE);
        let mut last = low_bits(residue_sub_blocks);
        if last == 0 {
            last = FULL_BLOCK_BITMAP;
        }

        if block_count == 1 {
            let both = first & last;
            Self {
                first_block_offset,
                first_block_bitmap: both,
                last_block_bitmap: both,
                block_count,
            }
        } else {
            Self {
                first_block_offset,
                first_block_bitmap: first,
                last_block_bitmap: last,
                block_count,
            }
        }
    }

    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    pub fn block_offset(&self, index: u64) -> u64 {
        self.first_block_offset
            .saturating_add(index.saturating_mul(VOLUME_BLOCK_SIZE))
    }

    pub fn read_bitmap(&self, index: u64) -> u32 {
        if index >= self.block_count {
            0
        } else if index == 0 {
            self.first_block_bitmap
        } else if index == self.block_count - 1 {
            self.last_block_bitmap
        } else {
            FULL_BLOCK_BITMAP
        }
    }
}

/// Append one chunk per run of set bits. `base` is the source offset of the
/// block's first sub-block.
pub fn bitmap_to_chunks(kind: ChunkKind, bitmap: u32, base: u64, out: &mut Vec<Chunk>) {
    if bitmap == FULL_BLOCK_BITMAP {
        out.push(Chunk {
            kind,
            offset: base,
            end_offset: base.saturating_add(VOLUME_BLOCK_SIZE),
            offset_in_block: 0,
            length: VOLUME_BLOCK_SIZE,
        });
        return;
    }

    let mut i = 0u32;
    while i < SUB_BLOCKS_PER_BLOCK {
        if bitmap & (1 << i) == 0 {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        while j < SUB_BLOCKS_PER_BLOCK && bitmap & (1 << j) != 0 {
            j += 1;
        }

        let offset_in_block = i * SUB_BLOCK_SIZE as u32;
        let length = u64::from(j - i) * SUB_BLOCK_SIZE;
        let offset = base.saturating_add(u64::from(offset_in_block));
        out.push(Chunk {
            kind,
            offset,
            end_offset: offset.saturating_add(length),
            offset_in_block,
            length,
        });
        i = j;
    }
}

impl ShadowCopy {
    /// Chunks needed to serve `read_bitmap` of the block at `block_offset`,
    /// ordered by position in the block.
    pub fn block_chunks(&self, block_offset: u64, read_bitmap: u32) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        if read_bitmap == 0 {
            return chunks;
        }

        let (overlay, cow) = self.get_block_descriptors(block_offset);

        let overlay_bitmap = overlay.map_or(0, |o| read_bitmap & o.bitmap);
        let rest = read_bitmap & !overlay_bitmap;

        if let Some(o) = overlay.filter(|_| overlay_bitmap != 0) {
            trace!("VSS overlay (block: {:#x}, bitmap: {:#x})", block_offset, overlay_bitmap);
            bitmap_to_chunks(ChunkKind::Overlay, overlay_bitmap, o.offset, &mut chunks);
        }

        if rest != 0 {
            if let Some(c) = cow {
                trace!(
                    "VSS cow (block: {:#x}, bitmap: {:#x}, redirection: {:#x})",
                    block_offset,
                    rest,
                    c.offset
                );
                bitmap_to_chunks(ChunkKind::CopyOnWrite, rest, c.offset, &mut chunks);
            } else {
                match bitmap_bit(self.bitmap(), block_offset) {
                    None => {
                        debug!("VSS bitmap does not cover block {:#x}", block_offset);
                        bitmap_to_chunks(ChunkKind::Zeroes, rest, block_offset, &mut chunks);
                    }
                    Some(true) => {
                        trace!("VSS missing cow entry (block: {:#x}, bitmap: {:#x})", block_offset, rest);
                        bitmap_to_chunks(ChunkKind::Zeroes, rest, block_offset, &mut chunks);
                    }
                    Some(false) => {
                        trace!("VSS current volume (block: {:#x}, bitmap: {:#x})", block_offset, rest);
                        bitmap_to_chunks(ChunkKind::CurrentVolume, rest, block_offset, &mut chunks);
                    }
                }
            }
        }

        chunks.sort_by_key(|c| c.offset_in_block);
        chunks
    }

    /// Merged chunk list for a read of `length` bytes at `offset`. The first
    /// chunk still starts on a sub-block boundary.
    pub fn plan_read(&self, offset: u64, length: usize) -> Vec<Chunk> {
        let params = ReadParameters::new(offset, length);
        let mut planned: Vec<Chunk> = Vec::new();

        for i in 0..params.block_count() {
            for chunk in self.block_chunks(params.block_offset(i), params.read_bitmap(i)) {
                if let Some(pending) = planned.last_mut() {
                    if pending.kind == chunk.kind && pending.end_offset == chunk.offset {
                        pending.length += chunk.length;
                        pending.end_offset = chunk.end_offset;
                        continue;
                    }
                }
                planned.push(chunk);
            }
        }
        planned
    }

    /// Read `output.len()` bytes of the shadow copy starting at `offset`.
    ///
    /// Returns the number of bytes produced. An underlying short read ends
    /// the call early; I/O errors are returned as-is. A range running past
    /// `u64::MAX` is InvalidArgument.
    pub fn read_at<R: Read + Seek + ?Sized>(&self, stream: &mut R, offset: u64, output: &mut [u8]) -> Result<usize> {
        record_read_call();

        if offset.checked_add(output.len() as u64).is_none() {
            return Err(Error::InvalidArgument(format!(
                "read of {} bytes at {:#x} overflows the volume offset range",
                output.len(),
                offset
            )));
        }

        let mut chunks = self.plan_read(offset, output.len());
        if let Some(first) = chunks.first_mut() {
            let skip = offset % SUB_BLOCK_SIZE;
            first.offset += skip;
            first.length -= skip;
        }

        let mut total = 0usize;
        for chunk in chunks {
            if total >= output.len() {
                break;
            }
            let len = (chunk.length as usize).min(output.len() - total);
            let buf = &mut output[total..total + len];

            let processed = match chunk.kind {
                ChunkKind::Zeroes => {
                    buf.fill(0);
                    record_chunk_zeroes(len);
                    len
                }
                kind => {
                    let n = read_chunk_at(stream, chunk.offset, buf)?;
                    match kind {
                        ChunkKind::Overlay => record_chunk_overlay(n),
                        ChunkKind::CopyOnWrite => record_chunk_copy_on_write(n),
                        _ => record_chunk_current_volume(n),
                    }
                    n
                }
            };

            total += processed;
            if processed < len {
                debug!(
                    "VSS short read at {:#x} ({} of {} bytes)",
                    chunk.offset, processed, len
                );
                break;
            }
        }

        Ok(total)
    }
}
