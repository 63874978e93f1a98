//! snapshots/shadow_copy — the resolved, read-only view of a volume at the
//! time a snapshot was taken.
//!
//! A shadow copy is built from its active snapshot and every newer one:
//! the effective bitmap comes from the active snapshot, copy-on-write
//! redirections are merged first-writer-wins across the chain and overlays
//! come from the active snapshot only. The chunked read path lives in
//! `snapshots::read`.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use log::{debug, info};
use serde::Serialize;
use uuid::Uuid;

use crate::config::VssConfig;
use crate::error::{Error, Result};
use crate::record::diff_area::clear_bitmap_bit;
use crate::snapshots::index::SnapshotsIndex;
use crate::snapshots::information::ShadowCopyInformation;
use crate::snapshots::snapshot::{Overlay, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CopyOnWriteBlock {
    pub offset: u64,
}

/// Redirections known for one 16 KiB volume block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Block {
    pub overlay: Option<Overlay>,
    pub copy_on_write: Option<CopyOnWriteBlock>,
}

#[derive(Debug, Clone)]
pub struct ShadowCopy {
    information: ShadowCopyInformation,
    bitmap: Vec<u8>,
    blocks: BTreeMap<u64, Block>,
}

/// Bitmap of the active snapshot combined with its previous bitmap.
/// Bytes beyond the shorter of the two stay fully set.
fn effective_bitmap(active: &Snapshot) -> Vec<u8> {
    let bitmap = active.bitmap();
    let previous = active.previous_bitmap();

    if previous.is_empty() {
        return bitmap.to_vec();
    }

    if bitmap.len() != previous.len() {
        debug!(
            "VSS inconsistent bitmap size (shadow copy: {}, bitmap: {}, previous: {})",
            active.information().shadow_copy_id,
            bitmap.len(),
            previous.len()
        );
    }

    let mut out = vec![0xFFu8; bitmap.len().max(previous.len())];
    for (o, (b, p)) in out.iter_mut().zip(bitmap.iter().zip(previous.iter())) {
        *o = b & p;
    }
    out
}

impl ShadowCopy {
    /// Merge `snapshots` (active snapshot first, then every newer one, with
    /// forwarders already resolved) into a shadow copy.
    pub fn initialize(snapshots: &[Snapshot]) -> Result<Self> {
        let Some(active) = snapshots.first() else {
            return Err(Error::InvalidArgument(
                "shadow copy needs at least one snapshot".into(),
            ));
        };

        let mut information = ShadowCopyInformation::from(active.information().clone());
        let mut bitmap = effective_bitmap(active);

        if snapshots.len() == 1 {
            // Newest snapshot: blocks still forwarded are read from the live volume.
            for &offset in active.forwarders().keys() {
                if !clear_bitmap_bit(&mut bitmap, offset) {
                    debug!("VSS forwarder {:#x} is beyond the bitmap", offset);
                }
            }
        }

        let mut blocks: BTreeMap<u64, Block> = BTreeMap::new();
        let mut copy_on_write_count = 0u64;
        for snapshot in snapshots {
            for (&offset, cow) in snapshot.copy_on_writes() {
                let block = blocks.entry(offset).or_default();
                if block.copy_on_write.is_none() {
                    block.copy_on_write = Some(CopyOnWriteBlock { offset: cow.offset });
                    copy_on_write_count += 1;
                }
            }
        }

        let mut overlay_count = 0u64;
        for (&offset, overlay) in active.overlays() {
            blocks.entry(offset).or_default().overlay = Some(*overlay);
            overlay_count += 1;
        }

        information.copy_on_write_count = copy_on_write_count;
        information.overlay_count = overlay_count;

        Ok(Self {
            information,
            bitmap,
            blocks,
        })
    }

    /// Resolve the shadow copy `shadow_copy_id`: its snapshot and every newer one.
    pub fn parse<R: Read + Seek + ?Sized>(
        stream: &mut R,
        shadow_copy_id: &Uuid,
        config: &VssConfig,
    ) -> Result<Self> {
        let index = SnapshotsIndex::parse(stream, config)?;
        let Some(position) = index.position(shadow_copy_id) else {
            debug!("VSS shadow copy {} is not in the snapshots index", shadow_copy_id);
            return Err(Error::NotFound(format!("shadow copy {}", shadow_copy_id)));
        };

        let mut snapshots = Snapshot::parse_items(stream, &index.items()[position..], config)?;
        Snapshot::resolve_forwarders(&mut snapshots);
        let shadow_copy = Self::initialize(&snapshots)?;

        info!(
            "VSS shadow copy {}: {} cow block(s), {} overlay block(s)",
            shadow_copy_id,
            shadow_copy.information.copy_on_write_count,
            shadow_copy.information.overlay_count
        );
        Ok(shadow_copy)
    }

    /// One shadow copy per snapshot of the volume, oldest first.
    pub fn parse_all<R: Read + Seek + ?Sized>(stream: &mut R, config: &VssConfig) -> Result<Vec<Self>> {
        let mut snapshots = Snapshot::parse_all(stream, config)?;
        Snapshot::resolve_forwarders(&mut snapshots);
        (0..snapshots.len())
            .map(|i| Self::initialize(&snapshots[i..]))
            .collect()
    }

    pub fn get_block_descriptors(&self, offset: u64) -> (Option<Overlay>, Option<CopyOnWriteBlock>) {
        match self.blocks.get(&offset) {
            Some(block) => (block.overlay, block.copy_on_write),
            None => (None, None),
        }
    }

    pub fn information(&self) -> &ShadowCopyInformation {
        &self.information
    }

    /// Effective bitmap: a set bit means the block content is unknown
    /// unless a copy-on-write redirection exists.
    pub fn bitmap(&self) -> &[u8] {
        &self.bitmap
    }

    pub fn blocks(&self) -> &BTreeMap<u64, Block> {
        &self.blocks
    }

    /// Size of the volume as seen by this shadow copy.
    pub fn size(&self) -> u64 {
        self.information.size()
    }
}
