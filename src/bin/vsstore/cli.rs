use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect and extract Volume Shadow Copies from a raw NTFS volume image
#[derive(Parser, Debug)]
#[command(name = "vsstore", version, about = "VSS store reader")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Store header, snapshot summary and per-snapshot parse status
    Info {
        #[arg(long)]
        image: PathBuf,
        /// Print one JSON object (includes metrics)
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Resolved shadow copies, oldest first
    List {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write information.json, snapshot.json and shadow_copy.json for one shadow copy
    Dump {
        #[arg(long)]
        image: PathBuf,
        /// Shadow copy id, with or without braces
        #[arg(long)]
        id: String,
        /// Output directory (created if missing)
        #[arg(long)]
        out: PathBuf,
    },
    /// Write the point-in-time volume of one shadow copy to a raw file
    Extract {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        id: String,
        #[arg(long)]
        out: PathBuf,
    },
}
