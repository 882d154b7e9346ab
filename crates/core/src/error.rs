//! Error types for swiftfs-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for swiftfs-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for swiftfs-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Credentials file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path does not resolve to a node in the tree
    #[error("Not found: {0}")]
    NotFound(String),

    /// Directory operation on a file node
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Malformed timestamp or numeric header from the backing store
    #[error("Parse error: {0}")]
    Parse(String),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Object missing on the backing store
    #[error("Remote object not found: {0}")]
    RemoteNotFound(String),

    /// Any other failed backing-store call
    #[error("Remote error: {0}")]
    Remote(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::Config(_) | Error::TomlParse(_) => 2, // UsageError
            Error::Remote(_) => 3,                                               // RemoteError
            Error::Auth(_) => 4,                                                 // AuthError
            Error::NotFound(_) | Error::RemoteNotFound(_) => 5,                  // NotFound
            Error::NotADirectory(_) => 6,                                        // NotADirectory
            _ => 1,                                                              // GeneralError
        }
    }

    /// Whether the error came from a backing-store call
    ///
    /// The filesystem layer reports all of these as a single remote I/O failure.
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Auth(_) | Error::RemoteNotFound(_) | Error::Remote(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::InvalidPath("test".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::Remote("test".into()).exit_code(), 3);
        assert_eq!(Error::Auth("test".into()).exit_code(), 4);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::RemoteNotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::NotADirectory("test".into()).exit_code(), 6);
        assert_eq!(Error::Parse("test".into()).exit_code(), 1);
        assert_eq!(Error::General("test".into()).exit_code(), 1);
    }

    #[test]
    fn test_is_remote() {
        assert!(Error::Auth("expired".into()).is_remote());
        assert!(Error::RemoteNotFound("a/b".into()).is_remote());
        assert!(Error::Remote("connection reset".into()).is_remote());
        assert!(!Error::NotFound("/a".into()).is_remote());
        assert!(!Error::Parse("bad".into()).is_remote());
    }

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("/a/b.txt".into());
        assert_eq!(err.to_string(), "Not found: /a/b.txt");

        let err = Error::NotADirectory("/a/b.txt".into());
        assert_eq!(err.to_string(), "Not a directory: /a/b.txt");
    }
}
