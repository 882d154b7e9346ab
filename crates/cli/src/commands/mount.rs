//! mount command - Mount a container as a read-only filesystem
//!
//! Builds the tree once up front so credential and connectivity problems are
//! reported before the mount point is touched, then hands the adapter to
//! fuser on a blocking thread until the filesystem is unmounted.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Args;
use fuser::MountOption;
use swiftfs_core::{Error, Owner};

use super::{current_owner, open_container};
use crate::exit_code::ExitCode;
use crate::fuse::SwiftFs;
use crate::output::{Formatter, OutputConfig};

/// Mount a container as a read-only filesystem
#[derive(Args, Debug)]
pub struct MountArgs {
    /// Container to mount
    pub container: String,

    /// Directory to mount on
    pub mount_point: PathBuf,

    /// Filesystem name shown by mount(8) (defaults to swift.<container>)
    #[arg(long)]
    pub fsname: Option<String>,

    /// Owner uid of every entry (defaults to the current user)
    #[arg(long)]
    pub uid: Option<u32>,

    /// Owner gid of every entry (defaults to the current group)
    #[arg(long)]
    pub gid: Option<u32>,

    /// Allow other users to access the mount
    #[arg(long)]
    pub allow_other: bool,

    /// Re-list the container every time a directory is opened
    #[arg(long)]
    pub refresh_on_opendir: bool,
}

impl MountArgs {
    fn fsname(&self) -> String {
        self.fsname
            .clone()
            .unwrap_or_else(|| format!("swift.{}", self.container))
    }

    fn owner(&self) -> Owner {
        let current = current_owner();
        Owner::new(
            self.uid.unwrap_or(current.uid),
            self.gid.unwrap_or(current.gid),
        )
    }

    fn mount_options(&self) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::RO,
            MountOption::FSName(self.fsname()),
            MountOption::Subtype("swiftfs".to_string()),
            MountOption::DefaultPermissions,
            MountOption::NoDev,
            MountOption::NoSuid,
            MountOption::AutoUnmount,
        ];
        if self.allow_other {
            options.push(MountOption::AllowOther);
        }
        options
    }
}

/// Execute the mount command
pub async fn execute(
    args: MountArgs,
    credentials_file: Option<&Path>,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);

    tokio::select! {
        result = run(&args, credentials_file, &formatter) => match result {
            Ok(()) => {
                formatter.success(&format!("Unmounted {}", args.mount_point.display()));
                ExitCode::Success
            }
            Err(e) => {
                formatter.error(&format!("{e:#}"));
                e.downcast_ref::<Error>()
                    .map(ExitCode::from_error)
                    .unwrap_or(ExitCode::GeneralError)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            formatter.warning("Interrupted, the mount is released when the process exits");
            ExitCode::Interrupted
        }
    }
}

async fn run(
    args: &MountArgs,
    credentials_file: Option<&Path>,
    formatter: &Formatter,
) -> anyhow::Result<()> {
    if !args.mount_point.is_dir() {
        bail!(Error::InvalidPath(format!(
            "mount point is not a directory: {}",
            args.mount_point.display()
        )));
    }

    let adapter = open_container(&args.container, credentials_file, args.owner())?;
    adapter
        .refresh()
        .await
        .with_context(|| format!("Failed to list container '{}'", args.container))?;

    let stats = adapter.statfs().await?;
    tracing::info!(
        container = %args.container,
        mount_point = %args.mount_point.display(),
        objects = stats.objects,
        "mounting"
    );
    formatter.success(&format!(
        "Mounted {} ({} objects) at {}",
        args.container,
        stats.objects,
        args.mount_point.display()
    ));

    let fs = SwiftFs::new(adapter, tokio::runtime::Handle::current())
        .refresh_on_opendir(args.refresh_on_opendir);
    let options = args.mount_options();
    let mount_point = args.mount_point.clone();

    tokio::task::spawn_blocking(move || fuser::mount2(fs, &mount_point, &options))
        .await
        .context("FUSE session thread panicked")?
        .with_context(|| format!("Failed to mount {}", args.mount_point.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> MountArgs {
        let mut argv = vec!["mount", "photos", "/mnt/photos"];
        argv.extend_from_slice(extra);
        let matches = <MountArgs as clap::Args>::augment_args(clap::Command::new("mount"))
            .try_get_matches_from(argv)
            .unwrap();
        <MountArgs as clap::FromArgMatches>::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn test_default_fsname() {
        assert_eq!(args(&[]).fsname(), "swift.photos");
        assert_eq!(args(&["--fsname", "pics"]).fsname(), "pics");
    }

    #[test]
    fn test_owner_overrides() {
        let owner = args(&["--uid", "1234", "--gid", "99"]).owner();
        assert_eq!(owner, Owner::new(1234, 99));

        let current = current_owner();
        assert_eq!(args(&["--uid", "7"]).owner(), Owner::new(7, current.gid));
    }

    #[test]
    fn test_mount_options_read_only() {
        let options = args(&[]).mount_options();
        assert!(options.contains(&MountOption::RO));
        assert!(options.contains(&MountOption::FSName("swift.photos".to_string())));
        assert!(!options.contains(&MountOption::AllowOther));

        let options = args(&["--allow-other"]).mount_options();
        assert!(options.contains(&MountOption::AllowOther));
    }

    #[tokio::test]
    async fn test_missing_mount_point() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut args = args(&[]);
        args.mount_point = dir.path().join("absent");

        let err = run(&args, None, &Formatter::default()).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidPath(_))));
    }
}
