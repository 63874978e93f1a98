//! cli/report: JSON reports, dumps and extraction for the vsstore commands.
//!
//! Everything here works on any `Read + Seek` image so that it can run on
//! files and in-memory volumes alike.

use std::fs;
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use log::warn;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::VssConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::record::SnapshotsIndexHeader;
use crate::snapshots::dump::{dump_shadow_copy, dump_snapshot, dump_snapshot_information, write_json};
use crate::snapshots::{has_snapshots_index, ShadowCopy, ShadowCopyStream, Snapshot, SnapshotsIndex};

const COPY_BUFFER_SIZE: usize = 1 << 20;

/// `info --json`: store header, one row per snapshot (with its own parse
/// status) and the metrics so far. A volume without a store yields
/// `{"vss": false}`.
pub fn info_json<R: Read + Seek + ?Sized>(stream: &mut R, image: &str, cfg: &VssConfig) -> Result<Value> {
    if !has_snapshots_index(stream, cfg)? {
        return Ok(json!({ "image": image, "vss": false }));
    }

    let header = SnapshotsIndexHeader::read(stream, cfg.index_offset)?;
    let index = SnapshotsIndex::parse(stream, cfg)?;

    let mut snapshots = Vec::with_capacity(index.len());
    for item in index.items() {
        let mut v = json!({
            "shadow_copy_id": item.shadow_copy_id.to_string(),
            "position": item.layer_position,
            "creation_time": item.creation_time_utc().map(|t| t.to_rfc3339()),
            "size": item.size,
            "machine": item.machine,
            "attributes": item.volume_snapshot_attributes.to_string(),
            "context": item.snapshot_context.to_string(),
        });
        // one broken diff area must not hide the others
        match Snapshot::parse(stream, item, cfg) {
            Ok(s) => {
                v["ok"] = json!(true);
                v["copy_on_writes"] = json!(s.copy_on_writes().len());
                v["overlays"] = json!(s.overlays().len());
                v["forwarders"] = json!(s.forwarders().len());
                v["location_table_items"] = json!(s.location_table_items());
            }
            Err(e) => {
                v["ok"] = json!(false);
                v["error"] = json!(e.to_string());
                v["error_kind"] = json!(e.kind().to_string());
            }
        }
        snapshots.push(v);
    }

    Ok(json!({
        "image": image,
        "vss": true,
        "config": cfg.to_string(),
        "header": serde_json::to_value(&header)?,
        "snapshots": snapshots,
        "metrics": serde_json::to_value(metrics::metrics_snapshot())?,
    }))
}

/// `list --json`: information of every shadow copy, oldest first.
pub fn list_json(shadow_copies: &[ShadowCopy]) -> Result<Value> {
    let infos: Vec<_> = shadow_copies.iter().map(|s| s.information()).collect();
    Ok(serde_json::to_value(infos)?)
}

/// `dump`: writes information.json, snapshot.json and shadow_copy.json for
/// one shadow copy into `out` (created if missing). Returns the written paths.
pub fn dump_files<R: Read + Seek + ?Sized>(
    stream: &mut R,
    id: &Uuid,
    out: &Path,
    cfg: &VssConfig,
) -> Result<Vec<PathBuf>> {
    let index = SnapshotsIndex::parse(stream, cfg)?;
    let info = index.get(id)?.clone();
    let snapshot = Snapshot::parse(stream, &info, cfg)?;
    let shadow_copy = ShadowCopy::parse(stream, id, cfg)?;

    fs::create_dir_all(out).map_err(|e| {
        Error::Io(io::Error::new(e.kind(), format!("create {}: {}", out.display(), e)))
    })?;

    let files = [
        ("information.json", dump_snapshot_information(&info)),
        ("snapshot.json", dump_snapshot(&snapshot)),
        ("shadow_copy.json", dump_shadow_copy(&shadow_copy)),
    ];
    let mut written = Vec::with_capacity(files.len());
    for (name, value) in &files {
        let path = out.join(name);
        write_json(&path, value)?;
        written.push(path);
    }
    Ok(written)
}

/// `extract`: copies the point-in-time volume of one shadow copy into `out`.
/// Returns the number of bytes written, less than the volume size when the
/// image is truncated.
pub fn extract_to<R: Read + Seek, W: Write + ?Sized>(
    reader: R,
    id: &Uuid,
    out: &mut W,
    cfg: &VssConfig,
) -> Result<u64> {
    let mut stream = ShadowCopyStream::open(reader, id, cfg)?;
    let size = stream.size();

    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        };
        out.write_all(&buf[..n])?;
        written += n as u64;
    }
    out.flush()?;

    if written < size {
        warn!("shadow copy {} truncated: {} of {} bytes", id, written, size);
    }
    Ok(written)
}
