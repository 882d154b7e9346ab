//! Filesystem adapter
//!
//! Translates path-based filesystem queries into tree lookups and range reads.
//! Attribute and listing queries go through the session's cached tree; reads
//! go straight to the backing store without consulting the tree.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::mode::NodeKind;
use crate::path::{join, object_name};
use crate::session::Session;
use crate::traits::{BackingStore, ByteRange};
use crate::tree::Node;

/// Self and parent entries that lead every directory listing
pub const DOT_ENTRIES: [&str; 2] = [".", ".."];

/// Attributes reported for a path
///
/// Fields missing on the underlying node are reported as 0; absence is not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Attrs {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub modified_time: i64,
}

impl Attrs {
    pub fn is_dir(&self) -> bool {
        self.mode & crate::mode::S_IFDIR != 0
    }

    pub fn kind(&self) -> NodeKind {
        if self.is_dir() {
            NodeKind::Directory
        } else {
            NodeKind::File
        }
    }
}

impl From<&Node> for Attrs {
    fn from(node: &Node) -> Self {
        let attrs = node.attrs();
        Self {
            mode: attrs.mode,
            uid: attrs.uid,
            gid: attrs.gid,
            size: attrs.size.unwrap_or(0),
            modified_time: attrs.modified_time.unwrap_or(0),
        }
    }
}

/// A directory listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

impl From<NodeKind> for EntryKind {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Directory => EntryKind::Directory,
            NodeKind::File => EntryKind::File,
        }
    }
}

/// Filesystem-wide statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FsStats {
    /// Container bytes used, from the container metadata
    pub bytes_used: u64,
    /// Number of objects in the current tree
    pub objects: u64,
}

/// Path-level filesystem operations over a [`Session`]
pub struct FsAdapter<S> {
    session: Arc<Session<S>>,
}

impl<S> Clone for FsAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
        }
    }
}

impl<S: BackingStore> FsAdapter<S> {
    pub fn new(session: Arc<Session<S>>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session<S>> {
        &self.session
    }

    /// Attribute query for `path`
    pub async fn getattr(&self, path: &str) -> Result<Attrs> {
        let snapshot = self.session.get_tree(path, false).await?;
        snapshot
            .node()
            .map(Attrs::from)
            .ok_or_else(|| Error::NotFound(snapshot.path().to_string()))
    }

    /// Attribute query for `name` inside the directory at `parent`
    pub async fn lookup(&self, parent: &str, name: &str) -> Result<Attrs> {
        self.getattr(&join(parent, name)).await
    }

    /// Directory listing for `path`, led by `.` and `..`
    pub async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let snapshot = self.session.get_tree(path, false).await?;
        let node = snapshot
            .node()
            .ok_or_else(|| Error::NotFound(snapshot.path().to_string()))?;
        let dir = node
            .as_dir()
            .ok_or_else(|| Error::NotADirectory(snapshot.path().to_string()))?;

        let mut entries: Vec<DirEntry> = DOT_ENTRIES
            .iter()
            .map(|name| DirEntry {
                name: (*name).to_string(),
                kind: EntryKind::Directory,
            })
            .collect();
        entries.extend(dir.children.iter().map(|(name, child)| DirEntry {
            name: name.clone(),
            kind: child.kind().into(),
        }));
        Ok(entries)
    }

    /// Read `length` bytes at `offset` from the object behind `path`
    ///
    /// The tree is not consulted, so neither existence nor size is checked
    /// locally. Whatever the backing store returns is passed through.
    pub async fn read(&self, path: &str, length: u64, offset: u64) -> Result<Vec<u8>> {
        let range = ByteRange::new(offset, length);
        if range.last().is_none() {
            return Ok(Vec::new());
        }

        let object = object_name(path);
        match self.session.read_range(&object, range).await {
            Ok(data) => Ok(data.data),
            Err(e) => {
                tracing::warn!(path, offset, length, error = %e, "range read failed");
                Err(Error::Remote(format!("read {path}: {e}")))
            }
        }
    }

    /// Rebuild the tree from the backing store
    pub async fn refresh(&self) -> Result<()> {
        self.session.refresh().await.map(|_| ())
    }

    /// Filesystem statistics from the current tree
    pub async fn statfs(&self) -> Result<FsStats> {
        let snapshot = self.session.get_tree("/", false).await?;
        let tree = snapshot.tree();
        Ok(FsStats {
            bytes_used: tree.root().attrs().size.unwrap_or(0),
            objects: tree.object_count() as u64,
        })
    }
}
