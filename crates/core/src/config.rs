//! Credentials file management
//!
//! The credentials file is a TOML table stored at `~/.swiftfs` by default.
//! The core treats its contents as an opaque key/value mapping; the backing
//! store adapter decides which keys it needs (`auth_url`, `user`, `key`, ...).

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default credentials file name, relative to the home directory
pub const DEFAULT_CREDENTIALS_FILE: &str = ".swiftfs";

/// Keys whose values never appear in debug output
const SECRET_KEYS: &[&str] = &["key", "password", "auth_token"];

/// Opaque key/value credentials
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    values: BTreeMap<String, String>,
}

impl Credentials {
    /// Build credentials from key/value pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse credentials from TOML text
    ///
    /// Only top-level scalar values are accepted; numbers and booleans are
    /// kept in their textual form.
    pub fn from_toml(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let mut values = BTreeMap::new();

        for (key, value) in table {
            let text = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(Error::Config(format!(
                        "credentials key '{key}' must be a scalar, found {}",
                        other.type_str()
                    )));
                }
            };
            values.insert(key, text);
        }

        Ok(Self { values })
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Get a value that must be present and non-empty
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(Error::Config(format!("credentials are missing '{key}'"))),
        }
    }

    /// Get a numeric value, `None` if absent
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        self.get(key)
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|e| Error::Config(format!("credentials '{key}' = '{v}': {e}")))
            })
            .transpose()
    }

    /// Get a boolean value, `false` if absent
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            None => Ok(false),
            Some("true") | Some("1") | Some("yes") => Ok(true),
            Some("false") | Some("0") | Some("no") => Ok(false),
            Some(other) => Err(Error::Config(format!(
                "credentials '{key}' = '{other}' is not a boolean"
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in &self.values {
            if SECRET_KEYS.contains(&k.as_str()) {
                map.entry(k, &"<redacted>");
            } else {
                map.entry(k, v);
            }
        }
        map.finish()
    }
}

/// Credentials manager handles locating and loading the credentials file
#[derive(Debug)]
pub struct CredentialsManager {
    credentials_path: PathBuf,
}

impl CredentialsManager {
    /// Create a new CredentialsManager with the default path (`~/.swiftfs`)
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".into()))?;
        Ok(Self {
            credentials_path: home.join(DEFAULT_CREDENTIALS_FILE),
        })
    }

    /// Create a CredentialsManager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            credentials_path: path,
        }
    }

    /// Get the credentials file path
    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    /// Load credentials from disk
    ///
    /// A missing file is an error: mounting without credentials cannot work.
    pub fn load(&self) -> Result<Credentials> {
        if !self.credentials_path.exists() {
            return Err(Error::Config(format!(
                "credentials file not found: {}",
                self.credentials_path.display()
            )));
        }

        self.warn_if_exposed();

        let content = std::fs::read_to_string(&self.credentials_path)?;
        let credentials = Credentials::from_toml(&content)?;
        tracing::debug!(
            path = %self.credentials_path.display(),
            ?credentials,
            "loaded credentials"
        );
        Ok(credentials)
    }

    #[cfg(unix)]
    fn warn_if_exposed(&self) {
        use std::os::unix::fs::PermissionsExt;

        if let Ok(meta) = std::fs::metadata(&self.credentials_path) {
            let mode = meta.permissions().mode();
            if mode & 0o077 != 0 {
                tracing::warn!(
                    path = %self.credentials_path.display(),
                    mode = %format!("{:o}", mode & 0o777),
                    "credentials file is readable by other users"
                );
            }
        }
    }

    #[cfg(not(unix))]
    fn warn_if_exposed(&self) {}
}
