//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations.
//! Every command works on one container and shares the credentials-file and
//! output flags defined on [`Cli`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use swiftfs_core::{
    Credentials, CredentialsManager, Error, FsAdapter, Owner, Result, Session,
};
use swiftfs_swift::SwiftClient;

use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

mod cat;
mod completions;
mod ls;
mod mount;
mod stat;

/// swiftfs - Swift container filesystem
///
/// Mounts an OpenStack Swift container as a read-only filesystem and
/// inspects it from the command line.
#[derive(Parser, Debug)]
#[command(name = "swiftfs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Credentials file (defaults to ~/.swiftfs)
    #[arg(long, global = true, env = "SWIFTFS_CREDENTIALS")]
    pub credentials_file: Option<PathBuf>,

    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mount a container as a read-only filesystem
    Mount(mount::MountArgs),

    /// List a directory of a container
    Ls(ls::LsArgs),

    /// Show attributes of a path
    Stat(stat::StatArgs),

    /// Display file contents
    Cat(cat::CatArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };
    let credentials = cli.credentials_file.as_deref();

    match cli.command {
        Commands::Mount(args) => mount::execute(args, credentials, output_config).await,
        Commands::Ls(args) => ls::execute(args, credentials, output_config).await,
        Commands::Stat(args) => stat::execute(args, credentials, output_config).await,
        Commands::Cat(args) => cat::execute(args, credentials, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Load credentials from `path`, or from `~/.swiftfs` when unset
pub(crate) fn load_credentials(path: Option<&Path>) -> Result<Credentials> {
    let manager = match path {
        Some(path) => CredentialsManager::with_path(path.to_path_buf()),
        None => CredentialsManager::new()?,
    };
    manager.load()
}

/// Build the adapter for `container` on top of a Swift client
pub(crate) fn open_container(
    container: &str,
    credentials_file: Option<&Path>,
    owner: Owner,
) -> Result<FsAdapter<SwiftClient>> {
    validate_container(container)?;
    let credentials = load_credentials(credentials_file)?;
    let client = SwiftClient::new(&credentials)?;
    let session = Session::new(client, credentials, container, owner);
    Ok(FsAdapter::new(Arc::new(session)))
}

/// Owner of the calling process
pub(crate) fn current_owner() -> Owner {
    // SAFETY: getuid and getgid always succeed and touch no memory
    unsafe { Owner::new(libc::getuid(), libc::getgid()) }
}

/// Container names are a single non-empty path segment
pub(crate) fn validate_container(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidPath("container name cannot be empty".into()));
    }
    if name.contains('/') {
        return Err(Error::InvalidPath(format!(
            "container name cannot contain '/': {name}"
        )));
    }
    Ok(())
}
