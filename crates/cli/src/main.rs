//! swiftfs - Swift container filesystem
//!
//! Mounts an OpenStack Swift container as a read-only FUSE filesystem.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod exit_code;
mod fuse;
mod output;

use commands::Cli;

/// Log filter used with `--debug` when `RUST_LOG` is not set
const DEBUG_FILTER: &str = "swiftfs=debug,swiftfs_cli=debug,swiftfs_core=debug,swiftfs_swift=debug";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so `cat` output stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.debug { DEBUG_FILTER } else { "warn" })
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
