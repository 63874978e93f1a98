//! snapshots/index — the snapshots index: header, catalog and per-snapshot
//! application information, paired and ordered by layer position.

use std::io::{Read, Seek};

use log::{debug, info};
use uuid::Uuid;

use crate::config::VssConfig;
use crate::consts::NODE_SIZE;
use crate::error::{Error, Result};
use crate::record::{ApplicationInformation, Catalog, Node, SnapshotsIndexHeader};
use crate::snapshots::information::{ShadowCopyInformation, SnapshotInformation};
use crate::util::read_chunk_at;

/// Whether a VSS store header is present at the configured offset.
/// Anything that does not decode as a node is reported as absent; only
/// I/O failures are errors.
pub fn has_snapshots_index<R: Read + Seek + ?Sized>(stream: &mut R, config: &VssConfig) -> Result<bool> {
    let mut buf = [0u8; NODE_SIZE];
    let n = read_chunk_at(stream, config.index_offset, &mut buf)?;
    if n < NODE_SIZE {
        debug!("VSS header probe: short read ({} bytes) at {:#x}", n, config.index_offset);
        return Ok(false);
    }
    match Node::parse(&buf) {
        Ok(_) => Ok(true),
        Err(e) => {
            debug!("VSS header probe: {}", e);
            Ok(false)
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotsIndex {
    header: SnapshotsIndexHeader,
    items: Vec<SnapshotInformation>,
}

impl SnapshotsIndex {
    pub fn parse<R: Read + Seek + ?Sized>(stream: &mut R, config: &VssConfig) -> Result<Self> {
        let header = SnapshotsIndexHeader::read(stream, config.index_offset)?;
        if !header.has_catalog() {
            return Err(Error::NotFound("VSS store has no catalog".into()));
        }

        let catalog = Catalog::parse(stream, header.first_catalog_offset, config.max_chain_blocks)?;
        if catalog.entries.is_empty() {
            return Err(Error::NotFound("VSS catalog is empty".into()));
        }

        let snapshot_infos: Vec<_> = catalog.snapshot_infos().collect();
        let diff_area_infos: Vec<_> = catalog.diff_area_infos().collect();
        if snapshot_infos.is_empty() {
            return Err(Error::bad("VSS catalog: missing SnapshotInfo"));
        }
        if diff_area_infos.is_empty() {
            return Err(Error::bad("VSS catalog: missing DiffAreaInfo"));
        }
        if snapshot_infos.len() != diff_area_infos.len() {
            return Err(Error::bad(format!(
                "VSS catalog: {} SnapshotInfo for {} DiffAreaInfo",
                snapshot_infos.len(),
                diff_area_infos.len()
            )));
        }

        let mut items = Vec::with_capacity(snapshot_infos.len());
        for si in snapshot_infos {
            let da = diff_area_infos
                .iter()
                .find(|d| d.guid == si.guid)
                .ok_or_else(|| Error::bad(format!("VSS catalog: no DiffAreaInfo for {}", si.guid)))?;

            let app = ApplicationInformation::read(stream, da.application_info_offset)?;
            let local = app.local_info.ok_or_else(|| {
                Error::NotSupported(format!(
                    "application information of {} is not VssLocalInfo",
                    si.guid
                ))
            })?;

            items.push(SnapshotInformation::new(si, da, local));
        }
        items.sort_by_key(|i| i.layer_position);

        info!(
            "VSS index: {} snapshot(s), catalog at {:#x}",
            items.len(),
            header.first_catalog_offset
        );
        Ok(Self { header, items })
    }

    pub fn header(&self) -> &SnapshotsIndexHeader {
        &self.header
    }

    /// Snapshots ordered by layer position (oldest first).
    pub fn items(&self) -> &[SnapshotInformation] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, shadow_copy_id: &Uuid) -> Result<&SnapshotInformation> {
        self.items
            .iter()
            .find(|i| i.shadow_copy_id == *shadow_copy_id)
            .ok_or_else(|| Error::NotFound(format!("shadow copy {}", shadow_copy_id)))
    }

    /// Lookup by textual id; braces are accepted.
    pub fn get_str(&self, shadow_copy_id: &str) -> Result<&SnapshotInformation> {
        let id = parse_shadow_copy_id(shadow_copy_id)?;
        self.get(&id)
    }

    /// Index of the newest entry carrying `shadow_copy_id`.
    pub fn position(&self, shadow_copy_id: &Uuid) -> Option<usize> {
        self.items
            .iter()
            .rposition(|i| i.shadow_copy_id == *shadow_copy_id)
    }

    /// Every snapshot as shadow copy information, oldest creation time first.
    pub fn shadow_copies_information(&self) -> Vec<ShadowCopyInformation> {
        let mut out: Vec<ShadowCopyInformation> =
            self.items.iter().cloned().map(ShadowCopyInformation::from).collect();
        out.sort_by_key(|i| i.snapshot.creation_time as i64);
        out
    }
}

pub fn parse_shadow_copy_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim())
        .map_err(|e| Error::InvalidArgument(format!("invalid shadow copy id '{}': {}", s, e)))
}
