//! BackingStore trait definition
//!
//! This trait defines the three calls the filesystem needs from the object store.
//! It allows the tree model to be decoupled from the Swift HTTP implementation.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Credentials;
use crate::error::Result;

/// Storage endpoint and session token returned by authentication
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// Storage URL for the account (`X-Storage-Url`)
    pub storage_url: String,

    /// Session token (`X-Auth-Token`)
    pub token: String,
}

impl AuthToken {
    pub fn new(storage_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            storage_url: storage_url.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("storage_url", &self.storage_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// One object as reported by a container listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Object name, `/` delimits hierarchy
    pub name: String,

    /// Size in bytes
    pub bytes: u64,

    /// Last modified timestamp, `YYYY-MM-DDTHH:MM:SS[.ffffff]`
    pub last_modified: String,

    /// MD5 of the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Content type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ObjectRecord {
    /// Create a record with only the fields the tree needs
    pub fn new(name: impl Into<String>, bytes: u64, last_modified: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            last_modified: last_modified.into(),
            hash: None,
            content_type: None,
        }
    }
}

/// Container metadata plus every object in it
#[derive(Debug, Clone, Default)]
pub struct ContainerListing {
    /// Container response headers, keys lowercased
    pub metadata: HashMap<String, String>,

    /// All objects in the container
    pub objects: Vec<ObjectRecord>,
}

/// Inclusive byte span of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

impl ByteRange {
    pub const fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Last byte of the span, `None` for an empty span
    pub fn last(&self) -> Option<u64> {
        if self.length == 0 {
            return None;
        }
        Some(self.offset.saturating_add(self.length - 1))
    }

    /// Value for an HTTP `Range` header, `None` for an empty span
    pub fn header_value(&self) -> Option<String> {
        self.last()
            .map(|last| format!("bytes={}-{}", self.offset, last))
    }
}

/// Result of a range read
#[derive(Debug, Clone, Default)]
pub struct ObjectData {
    /// Response headers, keys lowercased
    pub metadata: HashMap<String, String>,

    /// Bytes received
    pub data: Vec<u8>,
}

/// Trait for the object store backing a mount
///
/// Implemented by the Swift adapter and mocked for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Exchange credentials for a storage endpoint and token
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken>;

    /// Fetch container metadata and the full object listing
    async fn list_container(&self, auth: &AuthToken, container: &str) -> Result<ContainerListing>;

    /// Fetch a byte range of one object
    async fn get_object_range(
        &self,
        auth: &AuthToken,
        container: &str,
        object: &str,
        range: ByteRange,
    ) -> Result<ObjectData>;
}
