//! Durable key-value storage for session data
//!
//! The credential store and the preferences both persist plain string values
//! under fixed keys ([`ACCESS_TOKEN_KEY`], [`REFRESH_TOKEN_KEY`],
//! [`THEME_KEY`]). [`DurableStorage`] abstracts where those values live:
//!
//! - [`FileStorage`]    -- a JSON object on disk (default backend)
//! - [`KeyringStorage`] -- one OS keyring entry per key
//! - [`MemoryStorage`]  -- process memory only, for tests and one-off runs

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::StorageConfig;
use crate::error::{AuthlinkError, Result};

/// Key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Key holding the UI theme preference.
pub const THEME_KEY: &str = "theme";

/// Persistent string key-value storage that survives process restarts.
///
/// Implementations must tolerate removal of a key that does not exist.
pub trait DurableStorage: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Builds the storage backend selected by `storage.backend`.
///
/// # Errors
///
/// Returns [`AuthlinkError::Config`] for an unknown backend name or when no
/// file path can be resolved.
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn DurableStorage>> {
    match config.backend.as_str() {
        "file" => {
            let path = config.resolved_path()?;
            tracing::debug!("Using file credential storage at {}", path.display());
            Ok(Arc::new(FileStorage::new(path)))
        }
        "keyring" => {
            tracing::debug!(
                "Using keyring credential storage (service={})",
                config.keyring_service
            );
            Ok(Arc::new(KeyringStorage::new(&config.keyring_service)))
        }
        "memory" => {
            tracing::warn!("Using in-memory credential storage; tokens will not persist");
            Ok(Arc::new(MemoryStorage::default()))
        }
        other => Err(AuthlinkError::Config(format!(
            "Unknown storage backend: {}",
            other
        ))),
    }
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// JSON-file backed storage.
///
/// The whole map is re-read on every access so that several processes
/// sharing the file observe each other's writes. Writes go to a sibling
/// temporary file that is then renamed over the original.
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Creates a storage rooted at `path`. The file is created lazily.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                AuthlinkError::Storage(format!(
                    "Corrupt credential file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        match std::fs::remove_file(&tmp) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        // Owner read/write only: the file holds bearer tokens.
        let mut opts = std::fs::OpenOptions::new();
        opts.create_new(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }

        let mut file = opts.open(&tmp)?;
        file.write_all(&serde_json::to_vec_pretty(map)?)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        if apply(&mut map) {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|map| map.remove(key).is_some())
    }
}

// ---------------------------------------------------------------------------
// KeyringStorage
// ---------------------------------------------------------------------------

/// OS keyring backed storage.
///
/// Each key is its own keyring entry under a shared service name, so the
/// tokens never touch the filesystem in clear text.
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    /// Creates an accessor for entries under `service`.
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key).map_err(AuthlinkError::Keyring)
    }
}

impl DurableStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AuthlinkError::Keyring(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(AuthlinkError::Keyring)
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AuthlinkError::Keyring(e)),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Non-durable storage kept in process memory.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Creates a storage pre-populated with `entries`.
    ///
    /// # Examples
    ///
    /// ```
    /// use authlink::auth::storage::{DurableStorage, MemoryStorage};
    ///
    /// let storage = MemoryStorage::with_entries([("access_token", "T1")]);
    /// assert_eq!(storage.get("access_token").unwrap().as_deref(), Some("T1"));
    /// ```
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}
