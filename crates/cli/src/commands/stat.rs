//! stat command - Show attributes of a path
//!
//! Displays the synthesized attributes a mount would report for one path.

use std::path::Path;

use clap::Args;
use serde::Serialize;
use swiftfs_core::Attrs;

use super::{current_owner, open_container};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, format_mode, format_size, format_time};

/// Show attributes of a path
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Container name
    pub container: String,

    /// Path inside the container
    pub path: String,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    path: String,
    #[serde(rename = "type")]
    kind: &'static str,
    mode: String,
    permissions: String,
    uid: u32,
    gid: u32,
    size_bytes: u64,
    size_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
}

impl StatOutput {
    fn new(path: &str, attrs: &Attrs) -> Self {
        Self {
            path: swiftfs_core::path::normalize(path),
            kind: if attrs.is_dir() { "directory" } else { "file" },
            mode: format!("{:o}", attrs.mode),
            permissions: format_mode(attrs.mode),
            uid: attrs.uid,
            gid: attrs.gid,
            size_bytes: attrs.size,
            size_human: format_size(attrs.size),
            last_modified: jiff::Timestamp::from_second(attrs.modified_time)
                .ok()
                .map(|ts| ts.to_string()),
        }
    }
}

/// Execute the stat command
pub async fn execute(
    args: StatArgs,
    credentials_file: Option<&Path>,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let fs = match open_container(&args.container, credentials_file, current_owner()) {
        Ok(fs) => fs,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    match fs.getattr(&args.path).await {
        Ok(attrs) => {
            let output = StatOutput::new(&args.path, &attrs);
            if formatter.is_json() {
                formatter.json(&output);
            } else {
                formatter.println(&format!("Name      : {}", output.path));
                formatter.println(&format!("Type      : {}", output.kind));
                formatter.println(&format!(
                    "Mode      : {} ({})",
                    output.permissions, output.mode
                ));
                formatter.println(&format!("Owner     : {}:{}", output.uid, output.gid));
                formatter.println(&format!(
                    "Size      : {} ({} bytes)",
                    output.size_human, output.size_bytes
                ));
                if let Some(date) = format_time(attrs.modified_time) {
                    formatter.println(&format!("Date      : {date} UTC"));
                }
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to stat {}: {e}", args.path));
            ExitCode::from_error(&e)
        }
    }
}
