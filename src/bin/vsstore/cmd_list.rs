use anyhow::{Context, Result};
use std::path::PathBuf;

use vsstore::cli::report::list_json;
use vsstore::{ShadowCopy, VssConfig};

use crate::util::{creation_time_str, human_bytes, open_image};

pub fn exec(image: PathBuf, json: bool) -> Result<()> {
    let cfg = VssConfig::from_env();
    let mut f = open_image(&image)?;

    let shadow_copies = ShadowCopy::parse_all(&mut f, &cfg).context("resolve shadow copies")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&list_json(&shadow_copies)?)?);
        return Ok(());
    }

    if shadow_copies.is_empty() {
        println!("No shadow copy");
        return Ok(());
    }
    for sc in &shadow_copies {
        let info = sc.information();
        println!(
            "{}  {}  {:>10}  cow={} overlay={}",
            info.shadow_copy_id(),
            creation_time_str(&info.snapshot),
            human_bytes(info.size()),
            info.copy_on_write_count,
            info.overlay_count
        );
    }
    Ok(())
}
