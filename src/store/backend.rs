//! Durable byte storage behind the keyed store
//!
//! The store core only needs `read`/`write`/`delete` on named byte blobs.
//! [`FileBackend`] persists one file per key with atomic writes (write to
//! temp, then rename) so a crash never leaves a half-written value.
//! [`MemoryBackend`] backs tests and throwaway stores.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::config::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};

/// A local key-value byte store
pub trait StorageBackend {
    /// Read the bytes stored for `key`, or `None` when absent
    fn read(&self, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    /// Write `bytes` under `key`, replacing any previous value
    fn write(&mut self, key: &str, bytes: &[u8]) -> LedgerResult<()>;

    /// Delete the value stored for `key`, if any
    fn delete(&mut self, key: &str) -> LedgerResult<()>;
}

/// Keys double as file stems, so they must stay plain identifiers.
fn validate_key(key: &str) -> LedgerResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(LedgerError::Invariant(format!(
            "\"{}\" is not a valid store key",
            key
        )))
    }
}

/// File-per-key backend with atomic writes
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at the data directory of `paths`
    pub fn new(paths: &LedgerPaths) -> LedgerResult<Self> {
        paths.ensure_directories()?;
        Ok(Self {
            dir: paths.data_dir(),
        })
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let path = self.file_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| {
            LedgerError::Storage(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(Some(bytes))
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> LedgerResult<()> {
        validate_key(key)?;
        let path = self.file_path(key);

        // Temp file in the same directory, required for an atomic rename
        let temp_path = path.with_extension("json.tmp");

        let file = File::create(&temp_path)
            .map_err(|e| LedgerError::Storage(format!("Failed to create temp file: {}", e)))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(bytes)
            .map_err(|e| LedgerError::Storage(format!("Failed to write data: {}", e)))?;
        writer
            .flush()
            .map_err(|e| LedgerError::Storage(format!("Failed to flush data: {}", e)))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| LedgerError::Storage(format!("Failed to sync data: {}", e)))?;

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            LedgerError::Storage(format!("Failed to rename temp file: {}", e))
        })?;

        Ok(())
    }

    fn delete(&mut self, key: &str) -> LedgerResult<()> {
        validate_key(key)?;
        let path = self.file_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                LedgerError::Storage(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

/// In-memory backend for tests and ephemeral stores
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: HashMap<String, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.values.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> LedgerResult<()> {
        validate_key(key)?;
        self.values.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> LedgerResult<()> {
        validate_key(key)?;
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_backend_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut backend = FileBackend::new(&paths).unwrap();

        assert!(backend.read("entries").unwrap().is_none());

        backend.write("entries", b"[1,2,3]").unwrap();
        assert_eq!(backend.read("entries").unwrap().unwrap(), b"[1,2,3]");
        assert!(temp_dir.path().join("data/entries.json").exists());

        backend.delete("entries").unwrap();
        assert!(backend.read("entries").unwrap().is_none());
        // Deleting an absent key is not an error
        backend.delete("entries").unwrap();
    }

    #[test]
    fn test_file_backend_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut backend = FileBackend::new(&paths).unwrap();

        backend.write("state", b"old").unwrap();
        backend.write("state", b"new").unwrap();
        assert_eq!(backend.read("state").unwrap().unwrap(), b"new");
    }

    #[test]
    fn test_invalid_key_rejected() {
        let mut backend = MemoryBackend::new();
        assert!(backend.write("../escape", b"x").is_err());
        assert!(backend.read("").is_err());
    }

    #[test]
    fn test_memory_backend_round_trip() {
        let mut backend = MemoryBackend::new();
        backend.write("categories", b"[]").unwrap();
        assert_eq!(backend.read("categories").unwrap().unwrap(), b"[]");
        backend.delete("categories").unwrap();
        assert!(backend.read("categories").unwrap().is_none());
    }
}
