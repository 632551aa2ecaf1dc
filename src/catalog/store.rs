//! Local persistence for the catalog cache
//!
//! The cache is a pair: the raw payload as last fetched and a plain integer
//! epoch-seconds timestamp of that fetch. Writes always replace whole files.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{HpcError, Result};

/// Payload file name inside the state directory
pub const PAYLOAD_FILE: &str = "partitions.json";

/// Timestamp file name inside the state directory
pub const TIMESTAMP_FILE: &str = "partition_last_update";

/// What a store currently holds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCatalog {
    /// Raw payload, `None` when nothing was ever cached
    pub payload: Option<Vec<u8>>,
    /// Last refresh time; `None` when missing or unparseable
    pub refreshed_at: Option<i64>,
}

pub trait CatalogStore {
    fn read(&self) -> Result<StoredCatalog>;

    /// Replace payload and timestamp together
    fn write(&self, payload: &[u8], refreshed_at: i64) -> Result<()>;
}

/// Catalog cache kept as two files in a directory
#[derive(Debug, Clone)]
pub struct FsCatalogStore {
    dir: PathBuf,
}

impl FsCatalogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn payload_path(&self) -> PathBuf {
        self.dir.join(PAYLOAD_FILE)
    }

    pub fn timestamp_path(&self) -> PathBuf {
        self.dir.join(TIMESTAMP_FILE)
    }

    fn staged(&self, contents: &[u8]) -> std::io::Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }

    /// Put back the payload that was on disk before a failed write
    fn restore_payload(&self, previous: Option<&[u8]>) -> std::io::Result<()> {
        match previous {
            Some(bytes) => {
                self.staged(bytes)?
                    .persist(self.payload_path())
                    .map_err(|e| e.error)?;
            }
            None => fs::remove_file(self.payload_path())?,
        }
        Ok(())
    }
}

impl CatalogStore for FsCatalogStore {
    fn read(&self) -> Result<StoredCatalog> {
        let payload = match fs::read(self.payload_path()) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(HpcError::IoError(e)),
        };

        let refreshed_at = read_timestamp(&self.timestamp_path());

        Ok(StoredCatalog {
            payload,
            refreshed_at,
        })
    }

    fn write(&self, payload: &[u8], refreshed_at: i64) -> Result<()> {
        let write_failed = |e: std::io::Error| HpcError::WriteFailed(format!("{}: {}", self.dir.display(), e));

        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(write_failed)?;
            debug!(dir = %self.dir.display(), "created state directory");
        }

        // Stage both files before touching either destination
        let payload_tmp = self.staged(payload).map_err(write_failed)?;
        let timestamp_tmp = self
            .staged(refreshed_at.to_string().as_bytes())
            .map_err(write_failed)?;

        // Kept so a failed timestamp replace can put the payload back
        let previous = match fs::read(self.payload_path()) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(write_failed(e)),
        };

        payload_tmp
            .persist(self.payload_path())
            .map_err(|e| write_failed(e.error))?;

        if let Err(e) = timestamp_tmp.persist(self.timestamp_path()) {
            if let Err(restore) = self.restore_payload(previous.as_deref()) {
                warn!(error = %restore, "cannot restore previous partition catalog");
            }
            return Err(write_failed(e.error));
        }

        Ok(())
    }
}

fn read_timestamp(path: &Path) -> Option<i64> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// In-memory store, shareable between a cache and whoever inspects it
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    stored: StoredCatalog,
    read_only: bool,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(payload: impl Into<Vec<u8>>, refreshed_at: Option<i64>) -> Self {
        let store = Self::new();
        store.state().stored = StoredCatalog {
            payload: Some(payload.into()),
            refreshed_at,
        };
        store
    }

    /// Make every subsequent write fail
    pub fn set_read_only(&self, read_only: bool) {
        self.state().read_only = read_only;
    }

    pub fn snapshot(&self) -> StoredCatalog {
        self.state().stored.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn read(&self) -> Result<StoredCatalog> {
        Ok(self.snapshot())
    }

    fn write(&self, payload: &[u8], refreshed_at: i64) -> Result<()> {
        let mut state = self.state();
        if state.read_only {
            return Err(HpcError::WriteFailed("store is read-only".to_string()));
        }
        state.stored = StoredCatalog {
            payload: Some(payload.to_vec()),
            refreshed_at: Some(refreshed_at),
        };
        Ok(())
    }
}
