//! snapshots/dump — JSON diagnostics of the parsed structures.
//!
//! Maps are emitted as arrays sorted by block offset, bitmaps as lowercase
//! hex strings.

use std::fs;
use std::io;
use std::path::Path;

use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::snapshots::information::SnapshotInformation;
use crate::snapshots::shadow_copy::ShadowCopy;
use crate::snapshots::snapshot::Snapshot;
use crate::util::to_hex;

pub fn dump_snapshot_information(info: &SnapshotInformation) -> Value {
    let da = &info.diff_area;
    json!({
        "guid": info.guid.to_string(),
        "size": info.size,
        "position": info.layer_position,
        "creation_time": info.creation_time,
        "creation_time_utc": info.creation_time_utc().map(|t| t.to_rfc3339()),
        "flags": info.flags,
        "diff_area": {
            "guid": da.guid.to_string(),
            "allocated_size": da.allocated_size,
            "application_info_offset": da.application_info_offset,
            "bitmap_offset": da.first_bitmap_offset,
            "previous_bitmap_offset": da.previous_bitmap_offset,
            "diff_area_offset": da.first_diff_area_table_offset,
            "diff_location_table_offset": da.first_location_table_offset,
            "frn": da.frn,
        },
        "application_information": {
            "guid": info.application_info_guid.to_string(),
            "shadow_copy_id": info.shadow_copy_id.to_string(),
            "shadow_copy_set_id": info.shadow_copy_set_id.to_string(),
            "machine": info.machine,
            "service": info.service,
            "snapshots_count": info.snapshots_count,
            "volume_snapshot_attributes": info.volume_snapshot_attributes.bits(),
            "volume_snapshot_attributes_names": info.volume_snapshot_attributes.to_string(),
            "snapshot_context": info.snapshot_context.0,
            "snapshot_context_name": info.snapshot_context.to_string(),
        },
    })
}

pub fn dump_snapshot(snapshot: &Snapshot) -> Value {
    let copy_on_writes: Vec<Value> = snapshot
        .copy_on_writes()
        .iter()
        .map(|(offset, cow)| json!({ "offset": offset, "cow": cow.offset, "forward": cow.forward }))
        .collect();
    let overlays: Vec<Value> = snapshot
        .overlays()
        .iter()
        .map(|(offset, o)| json!({ "offset": offset, "overlay": o.offset, "bitmap": o.bitmap }))
        .collect();
    let forwarders: Vec<Value> = snapshot
        .forwarders()
        .iter()
        .map(|(offset, f)| json!({ "offset": offset, "target": f.offset }))
        .collect();

    json!({
        "shadow_copy_id": snapshot.information().shadow_copy_id.to_string(),
        "copy_on_writes": copy_on_writes,
        "overlays": overlays,
        "forwarders": forwarders,
        "location_table_items": snapshot.location_table_items(),
        "bitmap": to_hex(snapshot.bitmap()),
        "previous_bitmap": to_hex(snapshot.previous_bitmap()),
    })
}

pub fn dump_shadow_copy(shadow_copy: &ShadowCopy) -> Value {
    let blocks: Vec<Value> = shadow_copy
        .blocks()
        .iter()
        .map(|(offset, block)| {
            json!({
                "offset": offset,
                "cow": block.copy_on_write.map(|c| c.offset),
                "overlay": block.overlay.map(|o| json!({ "offset": o.offset, "bitmap": o.bitmap })),
            })
        })
        .collect();

    let info = shadow_copy.information();
    json!({
        "shadow_copy_id": info.shadow_copy_id().to_string(),
        "size": info.size(),
        "copy_on_write_count": info.copy_on_write_count,
        "overlay_count": info.overlay_count,
        "blocks": blocks,
        "bitmap": to_hex(shadow_copy.bitmap()),
    })
}

/// Write `value` as pretty JSON to `path`. I/O failures name the path.
pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).map_err(|e| {
        Error::Io(io::Error::new(e.kind(), format!("write {}: {}", path.display(), e)))
    })?;
    Ok(())
}
