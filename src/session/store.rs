//! Persisted flat key-value credential storage.
//!
//! DESIGN
//! ======
//! Keys are fixed strings with no schema versioning. Every mutation is one
//! call (`replace`, `set_many`, or `clear`) so login, refresh, and logout
//! each land as a single write. `FileStore` rewrites the whole JSON
//! document through an owner-only (0600) temp file and a rename, so a crash
//! never leaves a half-written session.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const TOKEN_KEY: &str = "token";
pub const REFRESH_KEY: &str = "refresh";
pub const USER_EMAIL_KEY: &str = "user_email";
pub const USER_NAME_KEY: &str = "user_name";
pub const USER_ID_KEY: &str = "user_id";

/// Every key the session manager owns. `clear` removes all of them.
/// Owner read/write only; the file holds bearer credentials.
#[cfg(unix)]
pub const SESSION_FILE_MODE: u32 = 0o600;

pub const SESSION_KEYS: [&str; 5] = [TOKEN_KEY, REFRESH_KEY, USER_EMAIL_KEY, USER_NAME_KEY, USER_ID_KEY];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Write several keys as one operation.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError>;

    /// Replace the whole contents with `entries` as one operation.
    fn replace(&self, entries: &[(&str, &str)]) -> Result<(), StoreError>;

    /// Remove every key. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), StoreError>;

    fn snapshot(&self) -> BTreeMap<String, String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_many(&[(key, value)])
    }

    fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

fn to_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut map = lock(&self.entries);
        for (key, value) in entries {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        Ok(())
    }

    fn replace(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        *lock(&self.entries) = to_map(entries);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        lock(&self.entries).clear();
        Ok(())
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        lock(&self.entries).clone()
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// JSON-file backed store. The file is read once at open and rewritten on
/// every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the session file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }
        let text = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        let mut file = private_file(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut map = lock(&self.entries);
        let mut next = map.clone();
        for (key, value) in entries {
            next.insert((*key).to_owned(), (*value).to_owned());
        }
        self.persist(&next)?;
        *map = next;
        Ok(())
    }

    fn replace(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut map = lock(&self.entries);
        let next = to_map(entries);
        self.persist(&next)?;
        *map = next;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut map = lock(&self.entries);
        self.persist(&BTreeMap::new())?;
        map.clear();
        Ok(())
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        lock(&self.entries).clone()
    }
}

/// Truncate-or-create `path`, readable by the owner only.
fn private_file(path: &Path) -> std::io::Result<File> {
    #[cfg(unix)]
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(SESSION_FILE_MODE);
    let file = options.open(path)?;
    // `mode` only applies on creation; a leftover temp file keeps its bits.
    #[cfg(unix)]
    file.set_permissions(std::fs::Permissions::from_mode(SESSION_FILE_MODE))?;
    Ok(file)
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
