//! Listing entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::StorePath;

/// Short record description produced by listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub path: StorePath,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl FileSummary {
    pub fn new(path: StorePath, size: u64) -> Self {
        Self { path, size, modified: None }
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.path.name()
    }
}
