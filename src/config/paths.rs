//! Path management for kassenbuch
//!
//! Provides XDG-compliant path resolution for the locally persisted store.
//!
//! ## Path Resolution Order
//!
//! 1. `KASSENBUCH_DATA_DIR` environment variable (if set)
//! 2. Platform config directory, e.g. `~/.config/kassenbuch` on Linux

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::{LedgerError, LedgerResult};

/// Manages all paths used by kassenbuch
#[derive(Debug, Clone)]
pub struct LedgerPaths {
    /// Base directory for all kassenbuch data
    base_dir: PathBuf,
}

impl LedgerPaths {
    /// Create a new LedgerPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> LedgerResult<Self> {
        let base_dir = if let Ok(custom) = std::env::var("KASSENBUCH_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            let dirs = BaseDirs::new().ok_or_else(|| {
                LedgerError::Storage("Could not determine the home directory".into())
            })?;
            dirs.config_dir().join("kassenbuch")
        };

        Ok(Self { base_dir })
    }

    /// Create LedgerPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the data directory holding one JSON file per store key
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> LedgerResult<()> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| LedgerError::Storage(format!("Failed to create base directory: {}", e)))?;
        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| LedgerError::Storage(format!("Failed to create data directory: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().join("nested"));

        paths.ensure_directories().unwrap();
        assert!(paths.data_dir().exists());
    }
}
