//! Store configuration
//!
//! One [`StoreConfig`] describes one store. Nothing here is global, so a
//! process can open as many independent stores as it likes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FwError, FwResult};
use crate::metadata::DigestAlgorithm;

const MAX_JSON_INDENT: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base directory holding every record
    pub root: PathBuf,
    /// Reserved directory under `root` for backups
    pub backup_dir: String,
    /// Digest reported by file info and hash queries
    pub digest: DigestAlgorithm,
    /// Spaces per JSON indentation level; 0 writes compact JSON
    pub json_indent: usize,
    /// Create `root` on open when missing
    pub create_root: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("file_storage"),
            backup_dir: "backups".to_string(),
            digest: DigestAlgorithm::Md5,
            json_indent: 4,
            create_root: true,
        }
    }
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    pub fn with_backup_dir(mut self, backup_dir: impl Into<String>) -> Self {
        self.backup_dir = backup_dir.into();
        self
    }

    pub fn from_toml_str(text: &str) -> FwResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| FwError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> FwResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> FwResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(FwError::InvalidConfig("root must not be empty".into()));
        }
        let plain_segment = !self.backup_dir.is_empty()
            && self.backup_dir != "."
            && self.backup_dir != ".."
            && !self.backup_dir.contains(['/', '\\', '\0']);
        if !plain_segment {
            return Err(FwError::InvalidConfig(format!(
                "backup_dir must be a single directory name, got {:?}",
                self.backup_dir
            )));
        }
        if self.json_indent > MAX_JSON_INDENT {
            return Err(FwError::InvalidConfig(format!(
                "json_indent must be at most {MAX_JSON_INDENT}"
            )));
        }
        Ok(())
    }
}
