//! cat command - Display file contents
//!
//! Streams a file (or a byte range of it) to stdout through the same
//! range-read path a mount uses.

use std::io::{self, Write};
use std::path::Path;

use clap::Args;
use swiftfs_core::{Error, FsAdapter};
use swiftfs_swift::SwiftClient;

use super::{current_owner, open_container};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Bytes requested per range read
const CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Display file contents
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Container name
    pub container: String,

    /// File path inside the container
    pub path: String,

    /// Start reading at this byte offset
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Read at most this many bytes (defaults to the rest of the file)
    #[arg(long)]
    pub length: Option<u64>,
}

/// Execute the cat command
pub async fn execute(
    args: CatArgs,
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

    // Write directly to stdout (not through formatter to preserve binary data)
    let mut stdout = io::stdout();
    match copy_range(&fs, &args, &mut stdout).await {
        Ok(_) => ExitCode::Success,
        Err(e) => {
            formatter.error(&format!("Failed to read {}: {e}", args.path));
            ExitCode::from_error(&e)
        }
    }
}

/// Copy the requested range of a file to `out`, returning the byte count
async fn copy_range(
    fs: &FsAdapter<SwiftClient>,
    args: &CatArgs,
    out: &mut impl Write,
) -> swiftfs_core::Result<u64> {
    let attrs = fs.getattr(&args.path).await?;
    if attrs.is_dir() {
        return Err(Error::InvalidPath(format!("is a directory: {}", args.path)));
    }

    let (start, end) = span(attrs.size, args.offset, args.length);
    let mut position = start;
    while position < end {
        let length = (end - position).min(CHUNK_SIZE);
        let data = fs.read(&args.path, length, position).await?;
        if data.is_empty() {
            break;
        }
        out.write_all(&data)?;
        position += data.len() as u64;
    }
    out.flush()?;

    Ok(position - start)
}

/// Byte span `[start, end)` to read, clamped to the file size
fn span(size: u64, offset: u64, length: Option<u64>) -> (u64, u64) {
    let start = offset.min(size);
    let end = match length {
        Some(length) => start.saturating_add(length).min(size),
        None => size,
    };
    (start, end)
}
