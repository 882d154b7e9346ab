//! Inode ↔ path mapping for the FUSE binding
//!
//! The kernel addresses nodes by 64-bit inode numbers while the adapter is
//! path based. Numbers are handed out on first sight of a path and never
//! reused, so an inode stays valid across tree refreshes even if its path
//! disappears (the adapter then answers ENOENT for it).

use std::collections::HashMap;

use swiftfs_core::path::normalize;

/// Bidirectional mapping between inodes and mount paths
#[derive(Debug)]
pub struct InodeTable {
    path_to_inode: HashMap<String, u64>,
    inode_to_path: HashMap<u64, String>,
    next_inode: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// Root inode number (always 1 in FUSE)
    pub const ROOT_INODE: u64 = 1;

    /// Create a new inode table with root pre-registered
    pub fn new() -> Self {
        Self {
            path_to_inode: HashMap::from([("/".to_string(), Self::ROOT_INODE)]),
            inode_to_path: HashMap::from([(Self::ROOT_INODE, "/".to_string())]),
            next_inode: Self::ROOT_INODE + 1,
        }
    }

    /// Get or assign the inode for a path
    pub fn get_or_create(&mut self, path: &str) -> u64 {
        let normalized = normalize(path);
        if let Some(&inode) = self.path_to_inode.get(&normalized) {
            return inode;
        }

        let inode = self.next_inode;
        self.next_inode += 1;
        self.path_to_inode.insert(normalized.clone(), inode);
        self.inode_to_path.insert(inode, normalized);
        inode
    }

    /// Get the inode for a path if one was assigned
    pub fn get_inode(&self, path: &str) -> Option<u64> {
        self.path_to_inode.get(&normalize(path)).copied()
    }

    /// Get the path for an inode if it exists
    pub fn get_path(&self, inode: u64) -> Option<&str> {
        self.inode_to_path.get(&inode).map(String::as_str)
    }

    /// Number of assigned inodes, root included
    pub fn len(&self) -> usize {
        self.inode_to_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inode_to_path.is_empty()
    }
}
