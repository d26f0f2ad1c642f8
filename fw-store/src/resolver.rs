//! Path resolution scoped to the store root
//!
//! Two entry points with different side effects:
//!
//! - [`PathResolver::resolve`] is used by mutating operations. Once the
//!   path is known to stay inside the root it creates every missing
//!   directory up to the target's parent.
//! - [`PathResolver::locate`] is used by read-only operations and never
//!   touches the filesystem beyond `stat`/`canonicalize`.
//!
//! Both reject lexical traversal, the reserved backup directory, and
//! symlinked ancestors that lead outside the root. Every check runs before
//! any directory is created.

use fw_core::{FwError, FwResult, StorePath};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A store path together with its location on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: StorePath,
    pub real: PathBuf,
}

impl Resolved {
    pub fn exists(&self) -> bool {
        self.real.exists()
    }

    pub fn is_file(&self) -> bool {
        self.real.is_file()
    }
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    reserved: String,
}

impl PathResolver {
    /// `root` must already be canonical.
    pub fn new(root: impl Into<PathBuf>, reserved: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            reserved: reserved.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reserved(&self) -> &str {
        &self.reserved
    }

    /// Resolve a record path for writing, creating its parent directories.
    pub fn resolve(&self, filename: &str, subdir: Option<&str>) -> FwResult<Resolved> {
        let resolved = self.locate(filename, subdir)?;
        if let Some(parent) = resolved.real.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(resolved)
    }

    /// Resolve a record path without creating anything.
    pub fn locate(&self, filename: &str, subdir: Option<&str>) -> FwResult<Resolved> {
        let path = StorePath::file(subdir, filename).map_err(logged)?;
        self.check(path)
    }

    /// Resolve a directory scope without creating anything.
    pub fn locate_dir(&self, subdir: Option<&str>) -> FwResult<Resolved> {
        let path = StorePath::dir(subdir).map_err(logged)?;
        self.check(path)
    }

    /// Resolve a directory, creating it and any missing ancestors.
    pub fn resolve_dir(&self, path: StorePath) -> FwResult<Resolved> {
        let resolved = self.check(path)?;
        fs::create_dir_all(&resolved.real)?;
        Ok(resolved)
    }

    /// Validate an already-parsed path and map it onto the disk.
    pub fn check(&self, path: StorePath) -> FwResult<Resolved> {
        if path.first() == Some(self.reserved.as_str()) {
            let err = FwError::PathViolation(format!(
                "{path} is inside the reserved {} directory",
                self.reserved
            ));
            return Err(logged(err));
        }

        let real = path.to_fs_path(&self.root);
        self.check_contained(&real).map_err(logged)?;
        Ok(Resolved { path, real })
    }

    /// The deepest ancestor that exists must canonicalize to somewhere
    /// under the root.
    fn check_contained(&self, real: &Path) -> FwResult<()> {
        let mut probe = real;
        while fs::symlink_metadata(probe).is_err() {
            match probe.parent() {
                Some(parent) => probe = parent,
                None => break,
            }
        }

        let canonical = probe
            .canonicalize()
            .map_err(|_| FwError::PathViolation(real.display().to_string()))?;
        if canonical.starts_with(&self.root) {
            Ok(())
        } else {
            Err(FwError::PathViolation(format!(
                "{} resolves outside the store root",
                real.display()
            )))
        }
    }
}

fn logged(err: FwError) -> FwError {
    warn!(error = %err, "path rejected");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolver() -> (TempDir, PathResolver) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        (dir, PathResolver::new(root, "backups"))
    }

    #[test]
    fn test_resolve_creates_parent_dirs() {
        let (_dir, resolver) = resolver();
        let resolved = resolver.resolve("a.txt", Some("docs/2024")).unwrap();

        assert_eq!(resolved.path.to_path_string(), "docs/2024/a.txt");
        assert!(resolver.root().join("docs/2024").is_dir());
        assert!(!resolved.exists());
    }

    #[test]
    fn test_locate_creates_nothing() {
        let (_dir, resolver) = resolver();
        let resolved = resolver.locate("a.txt", Some("docs")).unwrap();

        assert_eq!(resolved.real, resolver.root().join("docs").join("a.txt"));
        assert!(!resolver.root().join("docs").exists());
    }

    #[test]
    fn test_traversal_performs_no_mutation() {
        let (dir, resolver) = resolver();
        let err = resolver.resolve("../../escape.txt", Some("new")).unwrap_err();

        assert!(matches!(err, FwError::PathViolation(_)));
        assert!(!resolver.root().join("new").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_reserved_directory_rejected() {
        let (_dir, resolver) = resolver();
        assert!(matches!(
            resolver.resolve("a.txt", Some("backups")),
            Err(FwError::PathViolation(_))
        ));
        assert!(matches!(
            resolver.locate("backups/a.txt", None),
            Err(FwError::PathViolation(_))
        ));
        // Only the top-level directory is reserved
        assert!(resolver.locate("a.txt", Some("docs/backups")).is_ok());
    }

    #[test]
    fn test_locate_dir_root() {
        let (_dir, resolver) = resolver();
        let resolved = resolver.locate_dir(None).unwrap();
        assert!(resolved.path.is_root());
        assert_eq!(resolved.real, resolver.root());
    }

    #[test]
    fn test_resolve_dir_creates_directory() {
        let (_dir, resolver) = resolver();
        let resolved = resolver.resolve_dir(StorePath::parse("out/nested").unwrap()).unwrap();
        assert!(resolved.real.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_rejected() {
        let (_dir, resolver) = resolver();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), resolver.root().join("link")).unwrap();

        let err = resolver.resolve("x.txt", Some("link/deeper")).unwrap_err();
        assert!(matches!(err, FwError::PathViolation(_)));
        assert!(!outside.path().join("deeper").exists());
    }
}
