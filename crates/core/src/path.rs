//! Path resolution over a built tree
//!
//! Paths are absolute mount paths like `/a/b.txt`. Resolution is purely
//! structural: each segment descends one directory level.

use crate::tree::{Node, Tree};

/// Find the node at `path`, `None` if any segment is missing
///
/// The empty path and `/` resolve to the root. A file in a non-final position
/// makes the whole path unresolvable.
pub fn resolve<'t>(path: &str, tree: &'t Tree) -> Option<&'t Node> {
    let mut node = tree.root();
    for segment in segments(path) {
        node = node.as_dir()?.child(segment)?;
    }
    Some(node)
}

/// Non-empty segments of a path
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Normalize a path to `/seg/seg` form
pub fn normalize(path: &str) -> String {
    let mut normalized = String::from("/");
    for (i, segment) in segments(path).enumerate() {
        if i > 0 {
            normalized.push('/');
        }
        normalized.push_str(segment);
    }
    normalized
}

/// Join a child name onto a directory path
pub fn join(parent: &str, name: &str) -> String {
    let base = normalize(parent);
    if base == "/" {
        format!("/{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Parent of a path, the root is its own parent
pub fn parent(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(pos) => normalized[..pos].to_string(),
    }
}

/// Object name within the container for a mount path
pub fn object_name(path: &str) -> String {
    normalize(path).trim_start_matches('/').to_string()
}
