use anyhow::{anyhow, Context, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;

use uuid::Uuid;
use vsstore::snapshots::parse_shadow_copy_id;
use vsstore::SnapshotInformation;

pub fn open_image(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("open image {}", path.display()))
}

pub fn parse_id(id: &str) -> Result<Uuid> {
    parse_shadow_copy_id(id).map_err(|e| anyhow!("{}", e))
}

pub fn creation_time_str(info: &SnapshotInformation) -> String {
    match info.creation_time_utc() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("<invalid {:#x}>", info.creation_time),
    }
}

pub fn human_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut v = n as f64;
    let mut u = 0;
    while v >= 1024.0 && u < UNITS.len() - 1 {
        v /= 1024.0;
        u += 1;
    }
    if u == 0 {
        format!("{} {}", n, UNITS[0])
    } else {
        format!("{:.1} {}", v, UNITS[u])
    }
}
