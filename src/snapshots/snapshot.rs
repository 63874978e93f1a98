//! snapshots/snapshot — one snapshot's diff area, decoded into block maps.
//!
//! Public API:
//! - Snapshot::parse(stream, information, config)
//! - Snapshot::parse_all(stream, config)
//! - Snapshot::from_table(information, table, bitmap, previous_bitmap)
//! - Snapshot::resolve_forwarders(&mut [Snapshot]) -> per-snapshot unresolved counts
//!
//! Maps are keyed by 16 KiB aligned volume offsets.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use log::{debug, error, trace};
use serde::Serialize;

use crate::config::VssConfig;
use crate::error::{Error, Result};
use crate::metrics::{record_forwarders, record_overlay_continuation_missed};
use crate::record::diff_area::{
    DiffAreaBitmap, DiffAreaLocationTable, DiffAreaTable, DiffAreaTableEntry,
};
use crate::snapshots::index::SnapshotsIndex;
use crate::snapshots::information::SnapshotInformation;

/// Scoped-snapshot redirection of some sub-blocks of a volume block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Overlay {
    pub offset: u64,
    pub bitmap: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CopyOnWrite {
    /// Where the saved block lives, or the forwarding target when `forward`.
    pub offset: u64,
    pub forward: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Forwarder {
    pub offset: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    information: SnapshotInformation,
    bitmap: Vec<u8>,
    previous_bitmap: Vec<u8>,
    overlays: BTreeMap<u64, Overlay>,
    copy_on_writes: BTreeMap<u64, CopyOnWrite>,
    forwarders: BTreeMap<u64, Forwarder>,
    location_table_items: usize,
}

/// Overlay entries in table order. A continuation (data_relative_offset == 1)
/// extends the overlay already recorded at its offset.
pub(crate) fn apply_overlay_entries(entries: &[DiffAreaTableEntry], overlays: &mut BTreeMap<u64, Overlay>) {
    for entry in entries {
        if !entry.is_continuation() {
            overlays.entry(entry.offset).or_insert(Overlay {
                offset: entry.data_offset,
                bitmap: entry.bitmap,
            });
            continue;
        }

        let Some(overlay) = overlays.get_mut(&entry.offset) else {
            debug!(
                "VSS missing overlay entry (offset: {:#x}, data: {:#x})",
                entry.offset, entry.data_offset
            );
            record_overlay_continuation_missed();
            continue;
        };

        if overlay.offset != entry.data_offset {
            debug!(
                "VSS mismatching data offset for overlay {:#x} ({:#x} vs {:#x})",
                entry.offset, entry.data_offset, overlay.offset
            );
            record_overlay_continuation_missed();
            continue;
        }

        overlay.bitmap |= entry.bitmap;
    }
}

/// Copy-on-write entries in table order, tracking forwarders chained inside
/// the same table.
pub(crate) fn apply_copy_on_write_entries(
    entries: &[DiffAreaTableEntry],
    copy_on_writes: &mut BTreeMap<u64, CopyOnWrite>,
    forwarders: &mut BTreeMap<u64, Forwarder>,
) {
    for entry in entries {
        let forward = entry.is_forwarder();
        let data = if forward {
            entry.data_relative_offset
        } else {
            entry.data_offset
        };

        let mut target = entry.offset;
        if let Some(fwd) = forwarders.remove(&target) {
            target = fwd.offset;
        }

        copy_on_writes.insert(target, CopyOnWrite { offset: data, forward });

        if forward {
            if target != data {
                forwarders.insert(data, Forwarder { offset: target });
            } else {
                copy_on_writes.remove(&target);
            }
        }
    }
}

impl Snapshot {
    /// Build a snapshot from an already decoded diff area table.
    pub fn from_table(
        information: SnapshotInformation,
        table: &DiffAreaTable,
        bitmap: Vec<u8>,
        previous_bitmap: Vec<u8>,
    ) -> Self {
        let mut snapshot = Snapshot {
            information,
            bitmap,
            previous_bitmap,
            ..Default::default()
        };
        apply_overlay_entries(&table.overlay_entries, &mut snapshot.overlays);
        apply_copy_on_write_entries(
            &table.cow_entries,
            &mut snapshot.copy_on_writes,
            &mut snapshot.forwarders,
        );
        snapshot
    }

    pub fn parse<R: Read + Seek + ?Sized>(
        stream: &mut R,
        information: &SnapshotInformation,
        config: &VssConfig,
    ) -> Result<Self> {
        let da = &information.diff_area;
        let max = config.max_chain_blocks;

        let table = DiffAreaTable::parse(stream, da.first_diff_area_table_offset, max)?;

        let location = DiffAreaLocationTable::parse(stream, da.first_location_table_offset, max)?;
        if !location.is_empty() {
            if config.strict_location_table {
                return Err(Error::NotSupported(format!(
                    "diff area location table of {} holds {} item(s)",
                    information.shadow_copy_id, location.items
                )));
            }
            error!(
                "VSS found unsupported diff area location table items, please provide a full disk dump (shadow copy: {}, count: {})",
                information.shadow_copy_id, location.items
            );
        }

        let bitmap = DiffAreaBitmap::parse(stream, da.first_bitmap_offset, max)?;
        let previous_bitmap = DiffAreaBitmap::parse(stream, da.previous_bitmap_offset, max)?;

        let mut snapshot = Snapshot::from_table(
            information.clone(),
            &table,
            bitmap.into_bytes(),
            previous_bitmap.into_bytes(),
        );
        snapshot.location_table_items = location.items;

        trace!(
            "VSS snapshot {}: {} cow(s), {} overlay(s), {} forwarder(s)",
            information.shadow_copy_id,
            snapshot.copy_on_writes.len(),
            snapshot.overlays.len(),
            snapshot.forwarders.len()
        );
        Ok(snapshot)
    }

    /// Parse every snapshot of the volume, oldest first.
    pub fn parse_all<R: Read + Seek + ?Sized>(stream: &mut R, config: &VssConfig) -> Result<Vec<Self>> {
        let index = SnapshotsIndex::parse(stream, config)?;
        Self::parse_items(stream, index.items(), config)
    }

    pub(crate) fn parse_items<R: Read + Seek + ?Sized>(
        stream: &mut R,
        items: &[SnapshotInformation],
        config: &VssConfig,
    ) -> Result<Vec<Self>> {
        items
            .iter()
            .map(|info| {
                Snapshot::parse(stream, info, config).map_err(|e| {
                    debug!("VSS failed to parse snapshot {}: {}", info.shadow_copy_id, e);
                    e
                })
            })
            .collect()
    }

    /// Replace forwarding COW entries by what newer snapshots hold for their
    /// target. Snapshots are processed oldest first so that resolutions
    /// made on a snapshot are visible when resolving older ones.
    ///
    /// Returns the number of forwarders left unresolved, per snapshot.
    pub fn resolve_forwarders(snapshots: &mut [Snapshot]) -> Vec<u64> {
        let mut unresolved_counts = vec![0u64; snapshots.len()];
        let mut resolved_total = 0u64;

        for i in 0..snapshots.len().saturating_sub(1) {
            let (head, newer) = snapshots.split_at_mut(i + 1);
            let active = &mut head[i];

            let mut unresolved = 0u64;
            let mut updates: Vec<(u64, CopyOnWrite)> = Vec::new();

            for (&offset, cow) in active.copy_on_writes.iter() {
                if !cow.forward {
                    continue;
                }

                let mut target = cow.offset;
                let mut last_found: Option<CopyOnWrite> = None;
                for snapshot in newer.iter() {
                    let Some(found) = snapshot.copy_on_writes.get(&target) else {
                        continue;
                    };
                    last_found = Some(*found);
                    if !found.forward {
                        break;
                    }
                    target = found.offset;
                }

                match last_found {
                    Some(found) => {
                        if found.forward {
                            unresolved += 1;
                        } else {
                            resolved_total += 1;
                        }
                        updates.push((offset, found));
                    }
                    None => unresolved += 1,
                }
            }

            for (offset, cow) in updates {
                active.copy_on_writes.insert(offset, cow);
            }

            if unresolved > 0 {
                debug!(
                    "VSS unresolved forwarder(s) (shadow copy: {}, count: {})",
                    active.information.shadow_copy_id, unresolved
                );
            }
            unresolved_counts[i] = unresolved;
        }

        record_forwarders(resolved_total, unresolved_counts.iter().sum());
        unresolved_counts
    }

    pub fn information(&self) -> &SnapshotInformation {
        &self.information
    }

    pub fn bitmap(&self) -> &[u8] {
        &self.bitmap
    }

    pub fn previous_bitmap(&self) -> &[u8] {
        &self.previous_bitmap
    }

    pub fn overlays(&self) -> &BTreeMap<u64, Overlay> {
        &self.overlays
    }

    pub fn copy_on_writes(&self) -> &BTreeMap<u64, CopyOnWrite> {
        &self.copy_on_writes
    }

    pub fn forwarders(&self) -> &BTreeMap<u64, Forwarder> {
        &self.forwarders
    }

    /// Non-zero slots found in the diff area location table.
    pub fn location_table_items(&self) -> usize {
        self.location_table_items
    }
}
