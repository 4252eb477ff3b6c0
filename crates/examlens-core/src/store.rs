//! Local storage for the attempt index.
//!
//! The store holds a single entry: the JSON-encoded map of exam-set id to
//! attempt record. Writers always replace the whole entry.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::attempt::AttemptIndex;
use crate::error::StoreError;

/// Default bound on the encoded cache entry.
pub const DEFAULT_MAX_BYTES: usize = 1024 * 1024;

pub trait AttemptIndexStore: Send + Sync {
    /// The stored index, or `None` when nothing has been written.
    fn read(&self) -> Result<Option<AttemptIndex>, StoreError>;

    /// Replace the stored index.
    fn overwrite(&self, index: &AttemptIndex) -> Result<(), StoreError>;

    /// Remove the stored index entirely.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Read the cached index, treating a corrupt or oversized entry as empty
/// and clearing it.
pub fn read_or_reset(store: &dyn AttemptIndexStore) -> Result<AttemptIndex, StoreError> {
    match store.read() {
        Ok(index) => Ok(index.unwrap_or_default()),
        Err(e @ (StoreError::Corrupt(_) | StoreError::CapacityExceeded { .. })) => {
            warn!("discarding unreadable attempt cache: {e}");
            store.clear()?;
            Ok(AttemptIndex::new())
        }
        Err(e) => Err(e),
    }
}

fn check_size(size: usize, max_bytes: usize) -> Result<(), StoreError> {
    if size > max_bytes {
        return Err(StoreError::CapacityExceeded {
            size,
            limit: max_bytes,
        });
    }
    Ok(())
}

fn encode(index: &AttemptIndex, max_bytes: usize) -> Result<Vec<u8>, StoreError> {
    let bytes = serde_json::to_vec(index)?;
    check_size(bytes.len(), max_bytes)?;
    Ok(bytes)
}

/// In-process store holding the encoded entry.
pub struct MemoryStore {
    entry: Mutex<Option<String>>,
    max_bytes: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entry: Mutex::new(None),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Seed the store with a raw entry, valid or not.
    pub fn with_raw_entry(self, raw: impl Into<String>) -> Self {
        *self.lock() = Some(raw.into());
        self
    }

    pub fn raw_entry(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AttemptIndexStore for MemoryStore {
    fn read(&self) -> Result<Option<AttemptIndex>, StoreError> {
        match self.lock().as_deref() {
            Some(raw) => {
                check_size(raw.len(), self.max_bytes)?;
                Ok(Some(serde_json::from_str(raw)?))
            }
            None => Ok(None),
        }
    }

    fn overwrite(&self, index: &AttemptIndex) -> Result<(), StoreError> {
        let bytes = encode(index, self.max_bytes)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| StoreError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        *self.lock() = Some(text);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.lock() = None;
        Ok(())
    }
}

/// A single JSON file, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    max_bytes: usize,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AttemptIndexStore for FileStore {
    fn read(&self) -> Result<Option<AttemptIndex>, StoreError> {
        let len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        check_size(usize::try_from(len).unwrap_or(usize::MAX), self.max_bytes)?;
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        check_size(bytes.len(), self.max_bytes)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn overwrite(&self, index: &AttemptIndex) -> Result<(), StoreError> {
        let bytes = encode(index, self.max_bytes)?;
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        info!(path = %self.path.display(), entries = index.len(), "attempt cache written");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "attempt cache cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
