use anyhow::{Context, Result};
use std::path::PathBuf;

use vsstore::cli::report::dump_files;
use vsstore::VssConfig;

use crate::util::{open_image, parse_id};

pub fn exec(image: PathBuf, id: String, out: PathBuf) -> Result<()> {
    let cfg = VssConfig::from_env();
    let id = parse_id(&id)?;
    let mut f = open_image(&image)?;

    let files = dump_files(&mut f, &id, &out, &cfg)
        .with_context(|| format!("dump shadow copy {}", id))?;
    for path in &files {
        println!("  {}", path.display());
    }
    println!("Dumped {} to {}", id, out.display());
    Ok(())
}
