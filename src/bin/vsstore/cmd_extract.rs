use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use vsstore::cli::report::extract_to;
use vsstore::{metrics, VssConfig};

use crate::util::{human_bytes, open_image, parse_id};

pub fn exec(image: PathBuf, id: String, out: PathBuf) -> Result<()> {
    let cfg = VssConfig::from_env();
    let id = parse_id(&id)?;
    let mut f = open_image(&image)?;

    let dst = File::create(&out).with_context(|| format!("create {}", out.display()))?;
    let mut w = BufWriter::new(dst);

    let started = Instant::now();
    let written = extract_to(&mut f, &id, &mut w, &cfg)
        .with_context(|| format!("extract shadow copy {}", id))?;

    let ms = metrics::metrics_snapshot();
    info!(
        "extracted {} ({}) in {:.2?}: {} chunk(s), {} zero-filled",
        id,
        human_bytes(written),
        started.elapsed(),
        ms.chunks_total(),
        human_bytes(ms.bytes_zero_filled)
    );
    println!("Wrote {} bytes to {}", written, out.display());
    Ok(())
}
