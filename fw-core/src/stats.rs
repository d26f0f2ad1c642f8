//! Aggregate storage statistics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::metadata::{round2, GB, MB};

/// Per-directory totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryStats {
    pub files: u64,
    pub size: u64,
}

/// Totals computed by walking the store; never cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageStats {
    pub root: PathBuf,
    pub total_files: u64,
    pub total_size: u64,
    /// Keyed by directory path relative to the root (`.` for the root itself)
    pub directories: BTreeMap<String, DirectoryStats>,
    pub backup_files: u64,
    pub backup_size: u64,
}

impl StorageStats {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn record_file(&mut self, directory: impl Into<String>, size: u64) {
        self.total_files += 1;
        self.total_size += size;
        let entry = self.directories.entry(directory.into()).or_default();
        entry.files += 1;
        entry.size += size;
    }

    pub fn record_backup(&mut self, size: u64) {
        self.backup_files += 1;
        self.backup_size += size;
    }

    pub fn size_mb(&self) -> f64 {
        round2(self.total_size as f64 / MB)
    }

    pub fn size_gb(&self) -> f64 {
        round2(self.total_size as f64 / GB)
    }
}
