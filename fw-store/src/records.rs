//! Record operations: create, read, update, delete, copy, move, restore

use bytes::Bytes;
use fw_core::{FwError, FwResult, StorePath};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{Backup, FileStore};

impl FileStore {
    /// Create a new record. Never overwrites.
    pub fn create(
        &self,
        filename: &str,
        content: impl AsRef<[u8]>,
        subdir: Option<&str>,
    ) -> FwResult<StorePath> {
        let target = self.resolver.resolve(filename, subdir)?;
        let content = content.as_ref();

        write_new(&target.real, content).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => {
                warn!(path = %target.path, "record already exists");
                FwError::AlreadyExists(target.path.to_string())
            }
            _ => FwError::Io(e),
        })?;

        info!(path = %target.path, bytes = content.len(), "record created");
        Ok(target.path)
    }

    pub fn read(&self, filename: &str, subdir: Option<&str>) -> FwResult<Bytes> {
        let target = self.require_file(filename, subdir)?;
        let data = fs::read(&target.real)?;
        debug!(path = %target.path, bytes = data.len(), "record read");
        Ok(Bytes::from(data))
    }

    /// Read a record as UTF-8 text.
    pub fn read_to_string(&self, filename: &str, subdir: Option<&str>) -> FwResult<String> {
        let data = self.read(filename, subdir)?;
        String::from_utf8(data.to_vec())
            .map_err(|e| FwError::Io(io::Error::new(ErrorKind::InvalidData, e)))
    }

    pub fn exists(&self, filename: &str, subdir: Option<&str>) -> FwResult<bool> {
        Ok(self.resolver.locate(filename, subdir)?.is_file())
    }

    /// Replace an existing record's content, keeping a backup of the old one.
    pub fn update(
        &self,
        filename: &str,
        content: impl AsRef<[u8]>,
        subdir: Option<&str>,
    ) -> FwResult<Backup> {
        let target = self.require_file(filename, subdir)?;
        let backup = self.backups.snapshot(&target.path, &target.real)?;

        let content = content.as_ref();
        fs::write(&target.real, content)?;
        info!(path = %target.path, bytes = content.len(), "record updated");
        Ok(backup)
    }

    /// Remove a record, keeping a backup of its content.
    pub fn delete(&self, filename: &str, subdir: Option<&str>) -> FwResult<Backup> {
        let target = self.require_file(filename, subdir)?;
        let backup = self.backups.snapshot(&target.path, &target.real)?;

        fs::remove_file(&target.real)?;
        info!(path = %target.path, "record deleted");
        Ok(backup)
    }

    pub fn copy(
        &self,
        source: &str,
        destination: &str,
        subdir: Option<&str>,
    ) -> FwResult<StorePath> {
        let src = self.require_file(source, subdir)?;
        let dst = self.resolver.resolve(destination, subdir)?;

        let mut reader = File::open(&src.real)?;
        let mut writer = match OpenOptions::new().write(true).create_new(true).open(&dst.real) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!(path = %dst.path, "copy destination exists");
                return Err(FwError::AlreadyExists(dst.path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = io::copy(&mut reader, &mut writer) {
            drop(writer);
            let _ = fs::remove_file(&dst.real);
            return Err(e.into());
        }

        info!(source = %src.path, destination = %dst.path, "record copied");
        Ok(dst.path)
    }

    /// Move a record. The source disappears without a backup since its
    /// content lives on at the destination.
    pub fn move_file(
        &self,
        source: &str,
        destination: &str,
        subdir: Option<&str>,
    ) -> FwResult<StorePath> {
        let src = self.require_file(source, subdir)?;
        let dst = self.resolver.resolve(destination, subdir)?;

        if fs::symlink_metadata(&dst.real).is_ok() {
            warn!(path = %dst.path, "move destination exists");
            return Err(FwError::AlreadyExists(dst.path.to_string()));
        }

        fs::rename(&src.real, &dst.real)?;
        info!(source = %src.path, destination = %dst.path, "record moved");
        Ok(dst.path)
    }

    /// Every backup taken of a record, oldest first.
    pub fn list_backups(&self, filename: &str, subdir: Option<&str>) -> FwResult<Vec<Backup>> {
        let target = self.resolver.locate(filename, subdir)?;
        self.backups.list(&target.path)
    }

    /// Write the newest backup's content back into the record.
    ///
    /// The record's current content, if any, is backed up first, so a
    /// restore can itself be undone.
    pub fn restore_backup(&self, filename: &str, subdir: Option<&str>) -> FwResult<Backup> {
        let located = self.resolver.locate(filename, subdir)?;
        let latest = self.backups.latest(&located.path)?.ok_or_else(|| {
            warn!(path = %located.path, "no backup to restore");
            FwError::NotFound(format!("backup of {}", located.path))
        })?;
        let target = self.resolver.resolve(filename, subdir)?;

        if target.is_file() {
            self.backups.snapshot(&target.path, &target.real)?;
        } else if target.exists() {
            return Err(FwError::NotAFile(target.path.to_string()));
        }

        fs::copy(self.backups.real_path(&latest), &target.real)?;
        info!(path = %target.path, backup = %latest.path, "record restored");
        Ok(latest)
    }

    /// Create-or-replace used by the structured codecs.
    pub(crate) fn upsert(
        &self,
        filename: &str,
        content: &[u8],
        subdir: Option<&str>,
    ) -> FwResult<StorePath> {
        let target = self.resolver.resolve(filename, subdir)?;

        if target.is_file() {
            self.backups.snapshot(&target.path, &target.real)?;
            fs::write(&target.real, content)?;
        } else if target.exists() {
            return Err(FwError::NotAFile(target.path.to_string()));
        } else {
            write_new(&target.real, content)?;
        }

        info!(path = %target.path, bytes = content.len(), "record saved");
        Ok(target.path)
    }
}

fn write_new(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(content)
}

#[cfg(test)]
mod tests {
    use crate::test_util::store;
    use fw_core::FwError;
    use std::fs;

    #[test]
    fn test_create_then_read() {
        let (_dir, store) = store();
        let path = store.create("test.txt", "Bu test fayli", Some("documents")).unwrap();

        assert_eq!(path.to_path_string(), "documents/test.txt");
        assert_eq!(store.read("test.txt", Some("documents")).unwrap(), "Bu test fayli".as_bytes());
    }

    #[test]
    fn test_create_binary_content() {
        let (_dir, store) = store();
        let data = vec![0u8, 159, 146, 150, 255];
        store.create("blob.bin", &data, None).unwrap();
        assert_eq!(store.read("blob.bin", None).unwrap().as_ref(), data.as_slice());
    }

    #[test]
    fn test_create_existing_fails() {
        let (_dir, store) = store();
        store.create("a.txt", "one", None).unwrap();

        let err = store.create("a.txt", "two", None).unwrap_err();
        assert!(matches!(err, FwError::AlreadyExists(_)));
        assert_eq!(store.read_to_string("a.txt", None).unwrap(), "one");
    }

    #[test]
    fn test_create_traversal_fails_without_mutation() {
        let (dir, store) = store();
        let err = store.create("../../evil.txt", "x", Some("sub")).unwrap_err();

        assert!(matches!(err, FwError::PathViolation(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_read_missing() {
        let (_dir, store) = store();
        assert!(store.read("nope.txt", None).unwrap_err().is_not_found());
        assert!(store.read("nope.txt", Some("nowhere")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_read_directory_is_not_a_file() {
        let (_dir, store) = store();
        store.create("x.txt", "", Some("folder")).unwrap();
        assert!(matches!(store.read("folder", None), Err(FwError::NotAFile(_))));
    }

    #[test]
    fn test_read_to_string_invalid_utf8() {
        let (_dir, store) = store();
        store.create("bad.txt", [0xffu8, 0xfe], None).unwrap();
        assert!(matches!(store.read_to_string("bad.txt", None), Err(FwError::Io(_))));
    }

    #[test]
    fn test_exists() {
        let (_dir, store) = store();
        assert!(!store.exists("a.txt", None).unwrap());
        store.create("a.txt", "", None).unwrap();
        assert!(store.exists("a.txt", None).unwrap());
    }

    #[test]
    fn test_update_keeps_backup_of_previous_content() {
        let (_dir, store) = store();
        store.create("notes.txt", "before", Some("docs")).unwrap();

        let backup = store.update("notes.txt", "after", Some("docs")).unwrap();
        assert_eq!(store.read_to_string("notes.txt", Some("docs")).unwrap(), "after");
        assert_eq!(
            fs::read_to_string(store.backups().real_path(&backup)).unwrap(),
            "before"
        );
        assert_eq!(backup.original.to_path_string(), "docs/notes.txt");
    }

    #[test]
    fn test_update_missing() {
        let (_dir, store) = store();
        assert!(store.update("ghost.txt", "x", None).unwrap_err().is_not_found());
        assert!(store.list_backups("ghost.txt", None).unwrap().is_empty());
    }

    #[test]
    fn test_delete_keeps_backup() {
        let (_dir, store) = store();
        store.create("gone.txt", "last words", None).unwrap();

        let backup = store.delete("gone.txt", None).unwrap();
        assert!(!store.exists("gone.txt", None).unwrap());
        assert_eq!(
            fs::read_to_string(store.backups().real_path(&backup)).unwrap(),
            "last words"
        );
    }

    #[test]
    fn test_delete_missing() {
        let (_dir, store) = store();
        assert!(store.delete("ghost.txt", None).unwrap_err().is_not_found());
    }

    #[test]
    fn test_copy() {
        let (_dir, store) = store();
        store.create("src.txt", "payload", Some("d")).unwrap();

        let dst = store.copy("src.txt", "nested/dst.txt", Some("d")).unwrap();
        assert_eq!(dst.to_path_string(), "d/nested/dst.txt");
        assert_eq!(store.read_to_string("src.txt", Some("d")).unwrap(), "payload");
        assert_eq!(store.read_to_string("nested/dst.txt", Some("d")).unwrap(), "payload");
    }

    #[test]
    fn test_copy_errors() {
        let (_dir, store) = store();
        assert!(store.copy("missing.txt", "b.txt", None).unwrap_err().is_not_found());

        store.create("a.txt", "a", None).unwrap();
        store.create("b.txt", "b", None).unwrap();
        assert!(store.copy("a.txt", "b.txt", None).unwrap_err().is_conflict());
        assert_eq!(store.read_to_string("b.txt", None).unwrap(), "b");
    }

    #[test]
    fn test_move() {
        let (_dir, store) = store();
        store.create("old.txt", "moving", None).unwrap();

        store.move_file("old.txt", "archive/new.txt", None).unwrap();
        assert!(!store.exists("old.txt", None).unwrap());
        assert_eq!(store.read_to_string("archive/new.txt", None).unwrap(), "moving");
        assert!(store.list_backups("old.txt", None).unwrap().is_empty());
    }

    #[test]
    fn test_move_errors() {
        let (_dir, store) = store();
        assert!(store.move_file("missing.txt", "b.txt", None).unwrap_err().is_not_found());

        store.create("a.txt", "a", None).unwrap();
        store.create("b.txt", "b", None).unwrap();
        assert!(store.move_file("a.txt", "b.txt", None).unwrap_err().is_conflict());
        assert!(store.exists("a.txt", None).unwrap());
    }

    #[test]
    fn test_restore_latest_backup() {
        let (_dir, store) = store();
        store.create("cfg.txt", "v1", None).unwrap();
        store.update("cfg.txt", "v2", None).unwrap();
        store.update("cfg.txt", "v3", None).unwrap();

        let used = store.restore_backup("cfg.txt", None).unwrap();
        assert_eq!(store.read_to_string("cfg.txt", None).unwrap(), "v2");
        assert_eq!(used.size, 2);
        // v1, v2 and the pre-restore v3
        assert_eq!(store.list_backups("cfg.txt", None).unwrap().len(), 3);
    }

    #[test]
    fn test_restore_deleted_record() {
        let (_dir, store) = store();
        store.create("gone.txt", "back again", Some("docs")).unwrap();
        store.delete("gone.txt", Some("docs")).unwrap();

        store.restore_backup("gone.txt", Some("docs")).unwrap();
        assert_eq!(store.read_to_string("gone.txt", Some("docs")).unwrap(), "back again");
    }

    #[test]
    fn test_restore_without_backup() {
        let (_dir, store) = store();
        store.create("fresh.txt", "x", None).unwrap();
        assert!(store.restore_backup("fresh.txt", None).unwrap_err().is_not_found());
    }

    #[test]
    fn test_failed_restore_creates_no_directories() {
        let (_dir, store) = store();
        let err = store.restore_backup("x.txt", Some("never/made")).unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.root().join("never").exists());
    }

    #[test]
    fn test_restore_recreates_removed_directory() {
        let (_dir, store) = store();
        store.create("r.txt", "kept", Some("gone/deep")).unwrap();
        store.delete("r.txt", Some("gone/deep")).unwrap();
        fs::remove_dir_all(store.root().join("gone")).unwrap();

        store.restore_backup("r.txt", Some("gone/deep")).unwrap();
        assert_eq!(store.read_to_string("r.txt", Some("gone/deep")).unwrap(), "kept");
    }
}
