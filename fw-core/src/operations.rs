//! Operation options

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOptions {
    pub subdirectory: Option<String>,
    pub recursive: bool,
    /// Glob matched against file names; everything when absent
    pub pattern: Option<String>,
}

impl ListOptions {
    pub fn in_dir(subdirectory: impl Into<String>) -> Self {
        Self {
            subdirectory: Some(subdirectory.into()),
            ..Default::default()
        }
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    Stored,
    #[default]
    Deflated,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZipOptions {
    /// Replace an existing archive of the same name (after backing it up)
    pub overwrite: bool,
    pub compression: Compression,
}
