//! Backups taken before destructive writes
//!
//! Backups mirror the record's directory under the reserved backup
//! directory and are named `<stem>_<YYYYmmddTHHMMSSffffff>-<seq><.ext>`.
//! The UTC timestamp has microsecond resolution and `seq` only moves past
//! `000` on a collision inside the same microsecond, so plain name order is
//! chronological. Backups are never pruned.

use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};
use fw_core::{FwError, FwResult, StorePath};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";
const TIMESTAMP_LEN: usize = 15 + 6;
const MAX_SEQUENCE: u32 = 999;

/// A stored snapshot of a record's earlier content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backup {
    /// Record the snapshot was taken from
    pub original: StorePath,
    /// Location of the snapshot relative to the store root
    pub path: StorePath,
    pub created: DateTime<Utc>,
    pub sequence: u32,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
    dir: String,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>, dir: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            dir: dir.into(),
        }
    }

    /// Absolute path of the backup directory
    pub fn base(&self) -> PathBuf {
        self.root.join(&self.dir)
    }

    pub fn real_path(&self, backup: &Backup) -> PathBuf {
        backup.path.to_fs_path(&self.root)
    }

    /// Copy the current content of `record` (found at `real`) into a new backup.
    pub fn snapshot(&self, record: &StorePath, real: &Path) -> FwResult<Backup> {
        let folder = self.folder_for(record);
        let dir_real = folder.to_fs_path(&self.root);
        fs::create_dir_all(&dir_real)?;

        let created = Utc::now();
        let mut source = File::open(real)?;

        for sequence in 0..=MAX_SEQUENCE {
            let name = backup_name(record, created, sequence);
            let target = dir_real.join(&name);
            let mut out = match OpenOptions::new().write(true).create_new(true).open(&target) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            let size = match io::copy(&mut source, &mut out) {
                Ok(size) => size,
                Err(e) => {
                    drop(out);
                    let _ = fs::remove_file(&target);
                    return Err(e.into());
                }
            };

            let backup = Backup {
                original: record.clone(),
                path: folder.join(&name)?,
                created: truncate_to_micros(created),
                sequence,
                size,
            };
            info!(record = %record, backup = %backup.path, bytes = size, "backup created");
            return Ok(backup);
        }

        Err(FwError::AlreadyExists(format!(
            "backup slots for {record} at {created}"
        )))
    }

    /// Every backup of `record`, oldest first.
    pub fn list(&self, record: &StorePath) -> FwResult<Vec<Backup>> {
        let folder = self.folder_for(record);
        let dir_real = folder.to_fs_path(&self.root);

        let entries = match fs::read_dir(&dir_real) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some((created, sequence)) = parse_backup_name(record, &name) {
                backups.push(Backup {
                    original: record.clone(),
                    path: folder.join(&name)?,
                    created,
                    sequence,
                    size: meta.len(),
                });
            }
        }

        backups.sort_by(|a, b| (a.created, a.sequence).cmp(&(b.created, b.sequence)));
        Ok(backups)
    }

    pub fn latest(&self, record: &StorePath) -> FwResult<Option<Backup>> {
        Ok(self.list(record)?.pop())
    }

    fn folder_for(&self, record: &StorePath) -> StorePath {
        let mut segments = vec![self.dir.clone()];
        if let Some(parent) = record.parent() {
            segments.extend(parent.segments);
        }
        StorePath { segments }
    }
}

fn backup_name(record: &StorePath, at: DateTime<Utc>, sequence: u32) -> String {
    let stem = record.stem().unwrap_or_default();
    let stamp = at.format("%Y%m%dT%H%M%S%6f");
    match record.extension() {
        Some(ext) => format!("{stem}_{stamp}-{sequence:03}.{ext}"),
        None => format!("{stem}_{stamp}-{sequence:03}"),
    }
}

fn parse_backup_name(record: &StorePath, name: &str) -> Option<(DateTime<Utc>, u32)> {
    let stem = record.stem()?;
    let rest = match record.extension() {
        Some(ext) => name.strip_suffix(ext)?.strip_suffix('.')?,
        None => name,
    };
    let rest = rest.strip_prefix(stem)?.strip_prefix('_')?;
    let (stamp, sequence) = rest.split_once('-')?;

    if stamp.len() != TIMESTAMP_LEN || sequence.len() != 3 {
        return None;
    }
    if !sequence.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let sequence: u32 = sequence.parse().ok()?;

    let (seconds, micros) = stamp.split_at(15);
    if !micros.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let micros: u32 = micros.parse().ok()?;
    let naive = NaiveDateTime::parse_from_str(seconds, TIMESTAMP_FORMAT)
        .ok()?
        .with_nanosecond(micros * 1_000)?;

    Some((Utc.from_utc_datetime(&naive), sequence))
}

fn truncate_to_micros(at: DateTime<Utc>) -> DateTime<Utc> {
    let micros = at.nanosecond() / 1_000;
    at.with_nanosecond(micros * 1_000).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_record(root: &Path, rel: &str, content: &str) -> (StorePath, PathBuf) {
        let path = StorePath::parse(rel).unwrap();
        let real = path.to_fs_path(root);
        fs::create_dir_all(real.parent().unwrap()).unwrap();
        fs::write(&real, content).unwrap();
        (path, real)
    }

    #[test]
    fn test_name_round_trip() {
        let record = StorePath::parse("docs/report.final.txt").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
            .with_nanosecond(123_456_000)
            .unwrap();

        let name = backup_name(&record, at, 7);
        assert_eq!(name, "report.final_20240309T140507123456-007.txt");
        assert_eq!(parse_backup_name(&record, &name), Some((at, 7)));
    }

    #[test]
    fn test_name_without_extension() {
        let record = StorePath::parse("Makefile").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let name = backup_name(&record, at, 0);
        assert_eq!(name, "Makefile_20240101T000000000000-000");
        assert_eq!(parse_backup_name(&record, &name), Some((at, 0)));
    }

    #[test]
    fn test_parse_rejects_other_records() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let txt = StorePath::parse("a.txt").unwrap();
        let bare = StorePath::parse("a").unwrap();
        let name = backup_name(&txt, at, 0);

        assert!(parse_backup_name(&bare, &name).is_none());
        assert!(parse_backup_name(&StorePath::parse("b.txt").unwrap(), &name).is_none());
        assert!(parse_backup_name(&txt, "a_garbage-000.txt").is_none());
    }

    #[test]
    fn test_snapshot_copies_content() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path(), "backups");
        let (record, real) = write_record(dir.path(), "docs/a.txt", "first");

        let backup = store.snapshot(&record, &real).unwrap();
        assert_eq!(backup.original, record);
        assert_eq!(backup.path.first(), Some("backups"));
        assert_eq!(backup.path.parent().unwrap().to_path_string(), "backups/docs");
        assert_eq!(backup.size, 5);
        assert_eq!(fs::read_to_string(store.real_path(&backup)).unwrap(), "first");
    }

    #[test]
    fn test_list_is_chronological() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path(), "backups");
        let (record, real) = write_record(dir.path(), "a.txt", "v1");

        store.snapshot(&record, &real).unwrap();
        fs::write(&real, "v2").unwrap();
        store.snapshot(&record, &real).unwrap();
        fs::write(&real, "v3").unwrap();
        store.snapshot(&record, &real).unwrap();

        let backups = store.list(&record).unwrap();
        let contents: Vec<String> = backups
            .iter()
            .map(|b| fs::read_to_string(store.real_path(b)).unwrap())
            .collect();
        assert_eq!(contents, vec!["v1", "v2", "v3"]);

        let latest = store.latest(&record).unwrap().unwrap();
        assert_eq!(latest, backups[2]);
    }

    #[test]
    fn test_list_separates_directories() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path(), "backups");
        let (top, top_real) = write_record(dir.path(), "a.txt", "top");
        let (nested, _) = write_record(dir.path(), "docs/a.txt", "nested");

        store.snapshot(&top, &top_real).unwrap();
        assert_eq!(store.list(&top).unwrap().len(), 1);
        assert!(store.list(&nested).unwrap().is_empty());
    }

    #[test]
    fn test_list_without_backups() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path(), "backups");
        let record = StorePath::parse("never.txt").unwrap();
        assert!(store.list(&record).unwrap().is_empty());
        assert!(store.latest(&record).unwrap().is_none());
    }
}
