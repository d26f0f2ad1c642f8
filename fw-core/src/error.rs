//! Error types for File Warden

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias
pub type FwResult<T> = Result<T, FwError>;

/// Structured formats whose content can fail to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFormat {
    Json,
    Csv,
    Zip,
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataFormat::Json => "JSON",
            DataFormat::Csv => "CSV",
            DataFormat::Zip => "ZIP",
        };
        f.write_str(name)
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum FwError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Path escapes store root: {0}")]
    PathViolation(String),

    #[error("Malformed {format} content: {message}")]
    Decode { format: DataFormat, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FwError {
    pub fn decode(format: DataFormat, err: impl fmt::Display) -> Self {
        FwError::Decode {
            format,
            message: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FwError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, FwError::AlreadyExists(_))
    }

    /// Everything except raw I/O failures is decided by the store itself.
    pub fn is_domain_error(&self) -> bool {
        !matches!(self, FwError::Io(_))
    }
}
