//! snapshots/information — what is known about a snapshot before its diff
//! area is parsed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::record::{
    DiffAreaInfo, SnapshotContext, SnapshotInfo, VolumeSnapshotAttributes, VssLocalInfo,
};
use crate::util::filetime_to_utc;

/// Catalog entries of one snapshot joined with its application information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotInformation {
    // SnapshotInfo
    pub guid: Uuid,
    /// Protected volume size in bytes.
    pub size: u64,
    pub layer_position: u64,
    /// Raw FILETIME.
    pub creation_time: u64,
    pub flags: u64,

    // VssLocalInfo
    pub shadow_copy_id: Uuid,
    pub shadow_copy_set_id: Uuid,
    pub machine: String,
    pub service: String,
    pub volume_snapshot_attributes: VolumeSnapshotAttributes,
    pub snapshot_context: SnapshotContext,
    pub snapshots_count: u32,
    pub application_info_guid: Uuid,

    pub diff_area: DiffAreaInfo,
}

impl SnapshotInformation {
    pub fn new(snapshot: &SnapshotInfo, diff_area: &DiffAreaInfo, local: VssLocalInfo) -> Self {
        Self {
            guid: snapshot.guid,
            size: snapshot.size,
            layer_position: snapshot.position,
            creation_time: snapshot.creation_time,
            flags: snapshot.flags,
            shadow_copy_id: local.shadow_copy_id,
            shadow_copy_set_id: local.shadow_copy_set_id,
            machine: local.machine,
            service: local.service,
            volume_snapshot_attributes: local.attributes,
            snapshot_context: local.snapshot_context,
            snapshots_count: local.snapshots_count,
            application_info_guid: local.guid,
            diff_area: diff_area.clone(),
        }
    }

    pub fn creation_time_utc(&self) -> Option<DateTime<Utc>> {
        filetime_to_utc(self.creation_time)
    }
}

/// Information about a resolved shadow copy (its active snapshot plus the
/// number of redirected blocks).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShadowCopyInformation {
    #[serde(flatten)]
    pub snapshot: SnapshotInformation,
    pub overlay_count: u64,
    pub copy_on_write_count: u64,
}

impl ShadowCopyInformation {
    pub fn shadow_copy_id(&self) -> Uuid {
        self.snapshot.shadow_copy_id
    }

    pub fn size(&self) -> u64 {
        self.snapshot.size
    }
}

impl From<SnapshotInformation> for ShadowCopyInformation {
    fn from(snapshot: SnapshotInformation) -> Self {
        Self {
            snapshot,
            overlay_count: 0,
            copy_on_write_count: 0,
        }
    }
}
