use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::error;

mod cli;
mod util;
mod cmd_info;
mod cmd_list;
mod cmd_dump;
mod cmd_extract;

fn init_logger() {
    // RUST_LOG overrides the default level, e.g. RUST_LOG=vsstore=trace
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Info { image, json } =>
            cmd_info::exec(image, json),

        cli::Cmd::List { image, json } =>
            cmd_list::exec(image, json),

        cli::Cmd::Dump { image, id, out } =>
            cmd_dump::exec(image, id, out),

        cli::Cmd::Extract { image, id, out } =>
            cmd_extract::exec(image, id, out),
    }
}
