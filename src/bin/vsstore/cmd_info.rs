use anyhow::{Context, Result};
use std::path::PathBuf;

use vsstore::cli::report::info_json;
use vsstore::record::SnapshotsIndexHeader;
use vsstore::{has_snapshots_index, Snapshot, SnapshotsIndex, VssConfig};

use crate::util::{creation_time_str, human_bytes, open_image};

pub fn exec(image: PathBuf, json: bool) -> Result<()> {
    let cfg = VssConfig::from_env();
    let mut f = open_image(&image)?;

    if json {
        let out = info_json(&mut f, &image.display().to_string(), &cfg)
            .context("build info report")?;
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if !has_snapshots_index(&mut f, &cfg)? {
        println!("No VSS store at {:#x} in {}", cfg.index_offset, image.display());
        return Ok(());
    }

    let header = SnapshotsIndexHeader::read(&mut f, cfg.index_offset)
        .context("read snapshots index header")?;
    let index = SnapshotsIndex::parse(&mut f, &cfg).context("parse snapshots index")?;

    // Per-snapshot parse status: one broken diff area must not hide the others.
    let mut rows = Vec::with_capacity(index.len());
    for item in index.items() {
        let status = Snapshot::parse(&mut f, item, &cfg);
        rows.push((item, status));
    }

    println!("VSS store in {}", image.display());
    println!("  version          = {}", header.version());
    println!("  catalog_offset   = {:#x}", header.first_catalog_offset);
    println!("  maximum_size     = {}", human_bytes(header.maximum_size));
    println!("  volume_guid      = {}", header.volume_guid);
    println!("  storage_guid     = {}", header.storage_guid);
    println!("  local_storage    = {}", header.is_local_storage());
    println!("  flags            = 0x{:08x}", header.flags);
    println!("  protection_flags = 0x{:08x}", header.protection_flags);
    println!("  snapshots        = {}", index.len());

    for (item, status) in &rows {
        println!();
        println!("  [{}] {}", item.layer_position, item.shadow_copy_id);
        println!("    created    = {}", creation_time_str(item));
        println!("    size       = {}", human_bytes(item.size));
        println!("    machine    = {}", item.machine);
        println!("    service    = {}", item.service);
        println!("    attributes = {}", item.volume_snapshot_attributes);
        println!("    context    = {}", item.snapshot_context);
        match status {
            Ok(s) => println!(
                "    diff area  = {} cow, {} overlay, {} forwarder",
                s.copy_on_writes().len(),
                s.overlays().len(),
                s.forwarders().len()
            ),
            Err(e) => println!("    diff area  = ERROR {}", e),
        }
    }
    Ok(())
}
