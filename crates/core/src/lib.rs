//! swiftfs-core: Core library for the swiftfs filesystem
//!
//! This crate provides the in-memory filesystem model behind a swiftfs mount:
//! - Credentials file loading
//! - Mode and timestamp synthesis for tree nodes
//! - Tree building from a flat container listing
//! - Path resolution over a built tree
//! - The per-container session that caches the tree and auth token
//! - The filesystem adapter answering getattr/readdir/read style queries
//!
//! Nothing here talks HTTP directly. The backing store is reached through the
//! [`BackingStore`] trait, which keeps the model testable without a server.

pub mod config;
pub mod error;
pub mod fs;
pub mod mode;
pub mod path;
pub mod session;
pub mod timestamp;
pub mod traits;
pub mod tree;

pub use config::{Credentials, CredentialsManager};
pub use error::{Error, Result};
pub use fs::{Attrs, DirEntry, EntryKind, FsAdapter, FsStats};
pub use mode::{NodeKind, PermissionSpec};
pub use path::resolve;
pub use session::{Session, Snapshot};
pub use traits::{AuthToken, BackingStore, ByteRange, ContainerListing, ObjectData, ObjectRecord};
pub use tree::{Attributes, Directory, File, Node, Owner, Tree};
