//! ls command - List a directory of a container
//!
//! Lists the entries of one directory in the tree built from the container
//! listing, the same view a mount would show.

use std::path::Path;

use clap::Args;
use serde::Serialize;
use swiftfs_core::path::join;
use swiftfs_core::{Attrs, EntryKind, FsAdapter};
use swiftfs_swift::SwiftClient;

use super::{current_owner, open_container};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, format_size, format_time};

/// List a directory of a container
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Container name
    pub container: String,

    /// Directory inside the container
    #[arg(default_value = "/")]
    pub path: String,

    /// Include the `.` and `..` entries
    #[arg(short, long)]
    pub all: bool,

    /// Summarize output (show totals only)
    #[arg(long)]
    pub summarize: bool,
}

/// Output structure for ls command (JSON format)
#[derive(Debug, Serialize)]
struct LsOutput {
    path: String,
    items: Vec<LsItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct LsItem {
    name: String,
    kind: EntryKind,
    #[serde(flatten)]
    attrs: Attrs,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_files: usize,
    total_dirs: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

/// Execute the ls command
pub async fn execute(
    args: LsArgs,
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

    match list(&fs, &args).await {
        Ok(items) => {
            print_items(&formatter, &args, items);
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to list {}: {e}", args.path));
            ExitCode::from_error(&e)
        }
    }
}

async fn list(fs: &FsAdapter<SwiftClient>, args: &LsArgs) -> swiftfs_core::Result<Vec<LsItem>> {
    let entries = fs.readdir(&args.path).await?;
    let mut items = Vec::with_capacity(entries.len());

    for entry in entries {
        let is_dot = entry.name == "." || entry.name == "..";
        if is_dot && !args.all {
            continue;
        }
        let attrs = match entry.name.as_str() {
            "." => fs.getattr(&args.path).await?,
            ".." => fs.getattr(&swiftfs_core::path::parent(&args.path)).await?,
            name => fs.getattr(&join(&args.path, name)).await?,
        };
        items.push(LsItem {
            name: entry.name,
            kind: entry.kind,
            attrs,
        });
    }

    Ok(items)
}

fn summarize(items: &[LsItem]) -> Summary {
    let total_files = items
        .iter()
        .filter(|i| i.kind == EntryKind::File)
        .count();
    let total_size: u64 = items
        .iter()
        .filter(|i| i.kind == EntryKind::File)
        .map(|i| i.attrs.size)
        .sum();
    Summary {
        total_files,
        total_dirs: items.len() - total_files,
        total_size_bytes: total_size,
        total_size_human: format_size(total_size),
    }
}

fn print_items(formatter: &Formatter, args: &LsArgs, items: Vec<LsItem>) {
    if formatter.is_json() {
        let output = LsOutput {
            path: swiftfs_core::path::normalize(&args.path),
            summary: args.summarize.then(|| summarize(&items)),
            items,
        };
        formatter.json(&output);
        return;
    }

    if !args.summarize {
        for item in &items {
            formatter.println(&format_line(item));
        }
        return;
    }

    let summary = summarize(&items);
    formatter.println(&format!(
        "Total: {} files, {} directories, {}",
        summary.total_files, summary.total_dirs, summary.total_size_human
    ));
}

fn format_line(item: &LsItem) -> String {
    let date = format_time(item.attrs.modified_time)
        .unwrap_or_else(|| "                   ".to_string());
    match item.kind {
        EntryKind::Directory => format!("[{date}] {:>10} {}/", "0 B", item.name),
        EntryKind::File => format!(
            "[{date}] {:>10} {}",
            format_size(item.attrs.size),
            item.name
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, kind: EntryKind, size: u64) -> LsItem {
        LsItem {
            name: name.to_string(),
            kind,
            attrs: Attrs {
                mode: 0,
                uid: 0,
                gid: 0,
                size,
                modified_time: 1_672_531_200,
            },
        }
    }

    #[test]
    fn test_format_line() {
        assert_eq!(
            format_line(&item("b.txt", EntryKind::File, 5)),
            "[2023-01-01 00:00:00]        5 B b.txt"
        );
        assert_eq!(
            format_line(&item("a", EntryKind::Directory, 0)),
            "[2023-01-01 00:00:00]        0 B a/"
        );
    }

    #[test]
    fn test_summarize() {
        let items = [
            item("a", EntryKind::Directory, 0),
            item("b.txt", EntryKind::File, 1024),
            item("c.txt", EntryKind::File, 1024),
        ];
        let summary = summarize(&items);
        assert_eq!(summary.total_files, 2);
        assert_eq!(summary.total_dirs, 1);
        assert_eq!(summary.total_size_bytes, 2048);
        assert_eq!(summary.total_size_human, "2 KiB");
    }

    #[test]
    fn test_item_json_is_flat() {
        let json = serde_json::to_value(item("b.txt", EntryKind::File, 5)).unwrap();
        assert_eq!(json["name"], "b.txt");
        assert_eq!(json["kind"], "file");
        assert_eq!(json["size"], 5);
        assert_eq!(json["modified_time"], 1_672_531_200);
    }
}
