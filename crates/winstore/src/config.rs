//! Store configuration.

use std::path::{Path, PathBuf};

/// Default root of log file names.
pub const DEFAULT_FILENAME_ROOT: &str = "winstore";

/// Default permission bits for newly created log files.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Sync mode for log durability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Fsync after each record.
    Fsync,
    /// Use fdatasync after each record (skip metadata update).
    Fdatasync,
    /// Flush to the operating system only (default).
    #[default]
    None,
}

/// Configuration for a log store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the dated log files. It must already exist.
    pub dir: PathBuf,
    /// Root of every log file name (`<root>_<YYYYMMDD>.dat`).
    pub filename_root: String,
    /// Permission bits used when a log file is created (Unix only).
    pub file_mode: u32,
    /// Sync mode applied after every appended record.
    pub sync_mode: SyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            filename_root: DEFAULT_FILENAME_ROOT.to_string(),
            file_mode: DEFAULT_FILE_MODE,
            sync_mode: SyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for `filename_root` files inside `dir`.
    pub fn new(dir: impl AsRef<Path>, filename_root: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            filename_root: filename_root.into(),
            ..Self::default()
        }
    }

    /// Sets the permission bits for created files.
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Sets the sync mode.
    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = StoreConfig::new("/tmp/data", "metrics")
            .with_file_mode(0o600)
            .with_sync_mode(SyncMode::Fsync);

        assert_eq!(config.dir, PathBuf::from("/tmp/data"));
        assert_eq!(config.filename_root, "metrics");
        assert_eq!(config.file_mode, 0o600);
        assert_eq!(config.sync_mode, SyncMode::Fsync);

        let default = StoreConfig::default();
        assert_eq!(default.file_mode, DEFAULT_FILE_MODE);
        assert_eq!(default.sync_mode, SyncMode::None);
    }
}
