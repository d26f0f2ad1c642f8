//! Record metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::StorePath;

/// Content digest used for change detection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Blake3,
}

impl DigestAlgorithm {
    /// Length of the lowercase hex digest
    pub fn hex_len(&self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 32,
            DigestAlgorithm::Blake3 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Md5 => f.write_str("md5"),
            DigestAlgorithm::Blake3 => f.write_str("blake3"),
        }
    }
}

/// Full description of a single record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub path: StorePath,
    pub size: u64,
    /// Not every filesystem reports a birth time
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub extension: Option<String>,
    pub digest: String,
    pub digest_algorithm: DigestAlgorithm,
}

impl FileInfo {
    pub fn size_mb(&self) -> f64 {
        round2(self.size as f64 / MB)
    }
}

pub(crate) const MB: f64 = 1024.0 * 1024.0;
pub(crate) const GB: f64 = MB * 1024.0;

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
