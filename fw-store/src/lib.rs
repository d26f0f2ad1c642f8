// SPDX-License-Identifier: AGPL-3.0-or-later
//! Directory-scoped file store for File Warden
//!
//! [`FileStore`] owns one root directory. Every operation maps a
//! `(filename, subdirectory)` pair onto a path under that root through the
//! [`PathResolver`], and every write that would lose data first leaves a
//! [`Backup`] behind.
//!
//! All operations are synchronous and hold file handles only for the
//! duration of the call. There is no locking between processes sharing a
//! root.

mod archive;
pub mod backup;
mod codec;
pub mod digest;
mod query;
mod records;
pub mod resolver;

pub use backup::{Backup, BackupStore};
pub use codec::CsvTable;
pub use query::{FileListing, FileListingIter};
pub use resolver::{PathResolver, Resolved};

use fw_core::{FwError, FwResult, StoreConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File store rooted at a single directory
#[derive(Debug, Clone)]
pub struct FileStore {
    config: StoreConfig,
    resolver: PathResolver,
    backups: BackupStore,
}

impl FileStore {
    /// Open (and by default create) the store described by `config`.
    pub fn open(config: StoreConfig) -> FwResult<Self> {
        config.validate()?;

        if !config.root.exists() {
            if !config.create_root {
                return Err(FwError::NotFound(config.root.display().to_string()));
            }
            fs::create_dir_all(&config.root)?;
            info!(root = %config.root.display(), "store root created");
        }
        if !config.root.is_dir() {
            return Err(FwError::NotAFile(format!(
                "{} is not a directory",
                config.root.display()
            )));
        }

        let root = config.root.canonicalize()?;
        let resolver = PathResolver::new(root.clone(), config.backup_dir.clone());
        let backups = BackupStore::new(root, config.backup_dir.clone());

        Ok(Self {
            config,
            resolver,
            backups,
        })
    }

    /// Open a store at `root` with default settings.
    pub fn new(root: impl Into<PathBuf>) -> FwResult<Self> {
        Self::open(StoreConfig::new(root))
    }

    /// Canonical root directory
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Locate an existing record, failing with `NotFound`/`NotAFile`.
    fn require_file(&self, filename: &str, subdir: Option<&str>) -> FwResult<Resolved> {
        let target = self.resolver.locate(filename, subdir)?;
        if !target.exists() {
            warn!(path = %target.path, "record not found");
            return Err(FwError::NotFound(target.path.to_string()));
        }
        if !target.is_file() {
            return Err(FwError::NotAFile(target.path.to_string()));
        }
        Ok(target)
    }
}
