//! Key/value persistence for workflow state.
//!
//! Two backends implement [`KeyValueStore`]:
//!
//! 1. **File** ([`FileStore`]): one JSON document per key under a directory
//!    - 0600 permissions (owner read/write only)
//!    - Atomic writes (temp file + rename) so a crash never leaves half a file
//!
//! 2. **Memory** ([`MemoryStore`]): process-local map for tests and dry runs

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{MoveMintError, Result};

/// Extension for stored values.
const VALUE_EXTENSION: &str = "json";

/// String key/value storage. Methods take `&self`; backends handle their own locking.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored.
    fn keys(&self) -> Result<Vec<String>>;
}

// === File Storage ===

/// Directory-backed store.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            MoveMintError::Storage(format!("create storage dir {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let name = sanitize_key(key)?;
        Ok(self.root.join(format!("{name}.{VALUE_EXTENSION}")))
    }
}

/// Map a key onto a safe file stem. Only `[A-Za-z0-9_.-]` survive; anything
/// else becomes `_`.
fn sanitize_key(key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(MoveMintError::Storage("empty storage key".to_string()));
    }
    let name: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.chars().all(|c| c == '.') {
        return Err(MoveMintError::Storage(format!("invalid storage key: {key}")));
    }
    Ok(name)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MoveMintError::Storage(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let temp_path = path.with_extension("tmp");

        fs::write(&temp_path, value).map_err(|e| {
            MoveMintError::Storage(format!("write {}: {e}", temp_path.display()))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&temp_path, permissions).map_err(|e| {
                MoveMintError::Storage(format!("set permissions on {}: {e}", temp_path.display()))
            })?;
        }

        fs::rename(&temp_path, &path).map_err(|e| {
            MoveMintError::Storage(format!("replace {}: {e}", path.display()))
        })?;
        debug!(key, path = %path.display(), "stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "removed value");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MoveMintError::Storage(format!(
                "remove {}: {e}",
                path.display()
            ))),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            MoveMintError::Storage(format!("list {}: {e}", self.root.display()))
        })?;
        let mut keys = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable storage entry");
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

// === Memory Storage ===

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.values.lock().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
