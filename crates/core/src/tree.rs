//! Filesystem tree built from a flat container listing
//!
//! Object names use `/` as a hierarchy delimiter. Building inserts each name
//! into a trie keyed by path segment, materializing intermediate directories
//! on demand. Directories that exist only because an object name passes
//! through them carry no size or modification time.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::mode::{self, NodeKind};
use crate::timestamp::{parse_epoch_header, parse_last_modified};
use crate::traits::ObjectRecord;

/// Container header carrying the container timestamp
pub const HEADER_TIMESTAMP: &str = "x-timestamp";

/// Container header carrying total bytes used
pub const HEADER_BYTES_USED: &str = "x-container-bytes-used";

/// Owner assigned to every node of a tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    pub const fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }
}

/// POSIX-style attributes of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Byte count, unset on synthesized directories
    pub size: Option<u64>,
    /// Epoch seconds, unset on synthesized directories
    pub modified_time: Option<i64>,
}

impl Attributes {
    fn new(kind: NodeKind, owner: Owner) -> Self {
        Self {
            mode: mode::default_mode(kind),
            uid: owner.uid,
            gid: owner.gid,
            size: None,
            modified_time: None,
        }
    }
}

/// A directory and its children, keyed by path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub attrs: Attributes,
    pub children: BTreeMap<String, Node>,
}

impl Directory {
    fn synthesized(owner: Owner) -> Self {
        Self {
            attrs: Attributes::new(NodeKind::Directory, owner),
            children: BTreeMap::new(),
        }
    }

    /// Look up a direct child by segment name
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    /// Child segment names in listing order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }
}

/// An object-backed regular file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub attrs: Attributes,
}

/// A node in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Directory(Directory),
    File(File),
}

impl Node {
    pub fn attrs(&self) -> &Attributes {
        match self {
            Node::Directory(dir) => &dir.attrs,
            Node::File(file) => &file.attrs,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Directory(_) => NodeKind::Directory,
            Node::File(_) => NodeKind::File,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    pub fn as_dir(&self) -> Option<&Directory> {
        match self {
            Node::Directory(dir) => Some(dir),
            Node::File(_) => None,
        }
    }
}

/// A complete tree built from one listing snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    root: Node,
    object_count: usize,
}

impl Tree {
    /// Build a tree from container metadata and object records
    pub fn build<'a>(
        metadata: &HashMap<String, String>,
        records: impl IntoIterator<Item = &'a ObjectRecord>,
        owner: Owner,
    ) -> Result<Self> {
        let mut root = Directory::synthesized(owner);
        root.attrs.modified_time = Some(
            header(metadata, HEADER_TIMESTAMP)
                .map(parse_epoch_header)
                .transpose()?
                .unwrap_or(0),
        );
        root.attrs.size = Some(
            header(metadata, HEADER_BYTES_USED)
                .map(|v| {
                    v.trim().parse::<u64>().map_err(|e| {
                        Error::Parse(format!("{HEADER_BYTES_USED} '{v}': {e}"))
                    })
                })
                .transpose()?
                .unwrap_or(0),
        );

        for record in records {
            insert(&mut root, record, owner)?;
        }
        let object_count = count_files(&root);

        Ok(Self {
            root: Node::Directory(root),
            object_count,
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Number of file nodes in the tree
    pub fn object_count(&self) -> usize {
        self.object_count
    }
}

fn header<'m>(metadata: &'m HashMap<String, String>, name: &str) -> Option<&'m str> {
    metadata
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn count_files(root: &Directory) -> usize {
    let mut count = 0;
    let mut stack = vec![root];
    while let Some(dir) = stack.pop() {
        for child in dir.children.values() {
            match child {
                Node::Directory(sub) => stack.push(sub),
                Node::File(_) => count += 1,
            }
        }
    }
    count
}

/// `.` and `..` are reserved for directory navigation
fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}

/// Insert one record into the trie
///
/// Directories win over files at the same path regardless of record order.
fn insert(root: &mut Directory, record: &ObjectRecord, owner: Owner) -> Result<()> {
    let segments: Vec<&str> = record.name.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| is_dot_segment(s)) {
        tracing::warn!(name = %record.name, "skipping `.` and `..` segments in object name");
    }
    let segments: Vec<&str> = segments.into_iter().filter(|s| !is_dot_segment(s)).collect();
    // A name ending in `/` is a directory marker: every segment is a directory.
    let marker = record.name.ends_with('/');

    let Some((leaf, parents)) = segments.split_last() else {
        tracing::warn!(name = %record.name, "skipping object with empty name");
        return Ok(());
    };

    let dir_segments = if marker { &segments[..] } else { parents };

    let mut current = root;
    for segment in dir_segments {
        let slot = current
            .children
            .entry((*segment).to_string())
            .or_insert_with(|| Node::Directory(Directory::synthesized(owner)));

        if let Node::File(_) = slot {
            tracing::warn!(
                name = %record.name,
                segment,
                "file replaced by directory with the same name"
            );
            *slot = Node::Directory(Directory::synthesized(owner));
        }

        current = match slot {
            Node::Directory(dir) => dir,
            Node::File(_) => unreachable!("slot was just made a directory"),
        };
    }

    if marker {
        return Ok(());
    }

    if let Some(Node::Directory(_)) = current.children.get(*leaf) {
        tracing::warn!(name = %record.name, "object shadowed by directory with the same name");
        return Ok(());
    }

    let mut attrs = Attributes::new(NodeKind::File, owner);
    attrs.size = Some(record.bytes);
    attrs.modified_time = Some(parse_last_modified(&record.last_modified)?);
    current
        .children
        .insert((*leaf).to_string(), Node::File(File { attrs }));

    Ok(())
}
