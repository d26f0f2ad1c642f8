//! Listing, search, file info and storage statistics

use chrono::{DateTime, Utc};
use fw_core::{FileInfo, FileSummary, FwError, FwResult, ListOptions, StorageStats, StorePath};
use fw_search::{NameFilter, SearchHit, SearchMode, SearchQuery};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::{digest, FileStore};

/// Lazily walked, restartable sequence of record summaries.
///
/// Each call to [`FileListing::iter`] starts a fresh walk, so the listing
/// reflects the directory at iteration time.
#[derive(Debug, Clone)]
pub struct FileListing {
    root: PathBuf,
    /// `None` when the scope directory does not exist
    scope: Option<PathBuf>,
    recursive: bool,
    filter: NameFilter,
    backup_dir: PathBuf,
}

impl FileListing {
    pub fn iter(&self) -> FileListingIter<'_> {
        let walker = self.scope.as_ref().map(|scope| {
            let depth = if self.recursive { usize::MAX } else { 1 };
            WalkDir::new(scope)
                .min_depth(1)
                .max_depth(depth)
                .sort_by_file_name()
                .into_iter()
        });
        FileListingIter { listing: self, walker }
    }
}

impl<'a> IntoIterator for &'a FileListing {
    type Item = FwResult<FileSummary>;
    type IntoIter = FileListingIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct FileListingIter<'a> {
    listing: &'a FileListing,
    walker: Option<walkdir::IntoIter>,
}

impl Iterator for FileListingIter<'_> {
    type Item = FwResult<FileSummary>;

    fn next(&mut self) -> Option<Self::Item> {
        let walker = self.walker.as_mut()?;
        loop {
            let entry = match walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(FwError::Io(e.into()))),
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                if entry.path() == self.listing.backup_dir {
                    walker.skip_current_dir();
                }
                continue;
            }
            // Symlinks are never followed out of the store
            if !file_type.is_file() {
                continue;
            }
            if !self.listing.filter.matches(&entry.file_name().to_string_lossy()) {
                continue;
            }

            let summary = entry
                .metadata()
                .map_err(|e| FwError::Io(e.into()))
                .and_then(|meta| {
                    let path = StorePath::from_fs_path(&self.listing.root, entry.path())?;
                    let mut summary = FileSummary::new(path, meta.len());
                    if let Some(modified) = modified_time(&meta) {
                        summary = summary.with_modified(modified);
                    }
                    Ok(summary)
                });
            return Some(summary);
        }
    }
}

impl FileStore {
    /// Files in a directory scope. A missing scope lists as empty.
    pub fn list_files(&self, options: &ListOptions) -> FwResult<FileListing> {
        let scope = self.resolver.locate_dir(options.subdirectory.as_deref())?;
        Ok(FileListing {
            root: self.root().to_path_buf(),
            scope: scope.real.is_dir().then_some(scope.real),
            recursive: options.recursive,
            filter: NameFilter::new(options.pattern.as_deref()),
            backup_dir: self.backups.base(),
        })
    }

    /// Recursive search under `subdir`, sorted by path.
    pub fn search_files(&self, query: &SearchQuery, subdir: Option<&str>) -> FwResult<Vec<SearchHit>> {
        let listing = self.list_files(&ListOptions {
            subdirectory: subdir.map(str::to_string),
            recursive: true,
            pattern: None,
        })?;
        let matcher = query.matcher();

        let mut hits = Vec::new();
        for summary in &listing {
            let summary = summary?;
            let name = summary.name().unwrap_or_default();

            let location = match matcher.check(query.mode, name, None) {
                Some(location) => Some(location),
                None if query.mode.needs_content() => {
                    let content = fs::read(summary.path.to_fs_path(self.root()))?;
                    matcher.check(SearchMode::Content, name, Some(&content))
                }
                None => None,
            };

            if let Some(location) = location {
                hits.push(SearchHit {
                    path: summary.path,
                    size: summary.size,
                    location,
                });
            }
        }

        hits.sort_by(|a, b| a.path.cmp(&b.path));
        if let Some(limit) = query.limit {
            hits.truncate(limit);
        }
        debug!(query = %query.text, mode = ?query.mode, hits = hits.len(), "search finished");
        Ok(hits)
    }

    /// Case-insensitive file name search.
    pub fn search_names(&self, text: &str, subdir: Option<&str>) -> FwResult<Vec<SearchHit>> {
        self.search_files(&SearchQuery::name(text), subdir)
    }

    pub fn get_file_info(&self, filename: &str, subdir: Option<&str>) -> FwResult<FileInfo> {
        let target = self.require_file(filename, subdir)?;
        let meta = fs::metadata(&target.real)?;
        let algorithm = self.config.digest;
        let digest = digest::hash_file(&target.real, algorithm)?;

        Ok(FileInfo {
            name: target.path.name().unwrap_or_default().to_string(),
            extension: target.path.extension().map(str::to_string),
            size: meta.len(),
            created: meta.created().ok().map(DateTime::<Utc>::from),
            modified: modified_time(&meta),
            digest,
            digest_algorithm: algorithm,
            path: target.path,
        })
    }

    /// Hex digest of a record's full content.
    pub fn get_file_hash(&self, filename: &str, subdir: Option<&str>) -> FwResult<String> {
        let target = self.require_file(filename, subdir)?;
        let hash = digest::hash_file(&target.real, self.config.digest)?;
        debug!(path = %target.path, algorithm = %self.config.digest, "hash computed");
        Ok(hash)
    }

    /// Walk the whole store. Always fresh, O(number of files).
    pub fn storage_stats(&self) -> FwResult<StorageStats> {
        let root = self.root();
        let backup_dir = self.backups.base();
        let mut stats = StorageStats::new(root);

        for entry in WalkDir::new(root).min_depth(1) {
            let entry = entry.map_err(|e| FwError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let size = entry.metadata().map_err(|e| FwError::Io(e.into()))?.len();

            if entry.path().starts_with(&backup_dir) {
                stats.record_backup(size);
            } else {
                stats.record_file(directory_key(root, entry.path())?, size);
            }
        }
        Ok(stats)
    }
}

fn directory_key(root: &Path, file: &Path) -> FwResult<String> {
    let path = StorePath::from_fs_path(root, file)?;
    Ok(path.parent().unwrap_or_else(StorePath::root).to_path_string())
}

fn modified_time(meta: &fs::Metadata) -> Option<DateTime<Utc>> {
    meta.modified().ok().map(DateTime::<Utc>::from)
}
