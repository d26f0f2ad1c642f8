//! File Warden Core
//!
//! Shared types for the directory-scoped file store: errors, store-relative
//! paths, metadata, listing entries, statistics and configuration.

pub mod config;
pub mod entry;
pub mod error;
pub mod metadata;
pub mod operations;
pub mod path;
pub mod stats;

pub use config::StoreConfig;
pub use entry::FileSummary;
pub use error::{DataFormat, FwError, FwResult};
pub use metadata::{DigestAlgorithm, FileInfo};
pub use operations::{Compression, ListOptions, ZipOptions};
pub use path::StorePath;
pub use stats::{DirectoryStats, StorageStats};
