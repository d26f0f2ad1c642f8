//! Store-relative path model
//!
//! A [`StorePath`] is a normalized sequence of segments below the store
//! root. Construction never touches the filesystem; anything that would
//! climb above the root is rejected with [`FwError::PathViolation`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{FwError, FwResult};

/// Path of a record or directory relative to the store root
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StorePath {
    /// Path segments
    pub segments: Vec<String>,
}

impl StorePath {
    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    /// Parse a relative path; an empty string is the root.
    pub fn parse(path: impl AsRef<str>) -> FwResult<Self> {
        Self::root().join(path)
    }

    /// Directory scope for an optional subdirectory argument.
    pub fn dir(subdir: Option<&str>) -> FwResult<Self> {
        Self::parse(subdir.unwrap_or(""))
    }

    /// File path for a `(filename, subdirectory)` pair.
    ///
    /// Normalization runs over the combined segments, so the filename may
    /// step out of the subdirectory as long as it stays below the root.
    pub fn file(subdir: Option<&str>, filename: &str) -> FwResult<Self> {
        if filename.is_empty() {
            return Err(FwError::PathViolation("empty filename".into()));
        }
        let path = Self::dir(subdir)?.join(filename)?;
        if path.is_root() {
            return Err(FwError::PathViolation(format!(
                "{filename} does not name a file"
            )));
        }
        Ok(path)
    }

    pub fn join(&self, rel: impl AsRef<str>) -> FwResult<Self> {
        let rel = rel.as_ref();
        if rel.contains('\0') {
            return Err(FwError::PathViolation(format!("{rel:?} contains NUL")));
        }
        if is_absolute(rel) {
            return Err(FwError::PathViolation(format!("{rel} is absolute")));
        }

        let mut segments = self.segments.clone();
        for part in rel.split(['/', '\\']).filter(|s| !s.is_empty()) {
            match part {
                "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(FwError::PathViolation(format!(
                            "{rel} climbs above the store root"
                        )));
                    }
                }
                _ if has_drive_prefix(part) => {
                    return Err(FwError::PathViolation(format!(
                        "{rel} contains a drive prefix"
                    )));
                }
                _ => segments.push(part.to_string()),
            }
        }
        Ok(Self { segments })
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut segments = self.segments.clone();
            segments.pop();
            Some(Self { segments })
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(|s| s.as_str())
    }

    /// File name without its final extension. Dotfiles have no extension.
    pub fn stem(&self) -> Option<&str> {
        let name = self.name()?;
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => Some(stem),
            _ => Some(name),
        }
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.name()?;
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Some(ext),
            _ => None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn starts_with(&self, base: &StorePath) -> bool {
        self.segments.starts_with(&base.segments)
    }

    pub fn strip_prefix(&self, base: &StorePath) -> Option<Self> {
        self.segments
            .strip_prefix(base.segments.as_slice())
            .map(|rest| Self { segments: rest.to_vec() })
    }

    /// Slash-separated form; the root renders as `.`.
    pub fn to_path_string(&self) -> String {
        if self.segments.is_empty() {
            ".".to_string()
        } else {
            self.segments.join("/")
        }
    }

    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut real = root.to_path_buf();
        for seg in &self.segments {
            real.push(seg);
        }
        real
    }

    /// Inverse of [`StorePath::to_fs_path`] for paths found by walking the store.
    pub fn from_fs_path(root: &Path, real: &Path) -> FwResult<Self> {
        let relative = real
            .strip_prefix(root)
            .map_err(|_| FwError::PathViolation(real.display().to_string()))?;

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return Err(FwError::PathViolation(real.display().to_string())),
            }
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path_string())
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with(['/', '\\']) || has_drive_prefix(path)
}

fn has_drive_prefix(segment: &str) -> bool {
    matches!(segment.as_bytes(), [drive, b':', ..] if drive.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let path = StorePath::parse("docs/reports/q1.txt").unwrap();
        assert_eq!(path.segments, vec!["docs", "reports", "q1.txt"]);
    }

    #[test]
    fn test_parse_handles_empty_segments() {
        let path = StorePath::parse("docs//reports/").unwrap();
        assert_eq!(path.segments, vec!["docs", "reports"]);
    }

    #[test]
    fn test_parse_backslashes() {
        let path = StorePath::parse("docs\\a.txt").unwrap();
        assert_eq!(path.segments, vec!["docs", "a.txt"]);
    }

    #[test]
    fn test_root() {
        let root = StorePath::parse("").unwrap();
        assert!(root.is_root());
        assert_eq!(root, StorePath::root());
        assert_eq!(root.to_path_string(), ".");
    }

    #[test]
    fn test_file_joins_subdir() {
        let path = StorePath::file(Some("data"), "users.csv").unwrap();
        assert_eq!(path.to_path_string(), "data/users.csv");

        let path = StorePath::file(None, "a.txt").unwrap();
        assert_eq!(path.to_path_string(), "a.txt");
    }

    #[test]
    fn test_file_with_dotdot_inside_root() {
        let path = StorePath::file(Some("docs"), "../a.txt").unwrap();
        assert_eq!(path.segments, vec!["a.txt"]);

        let path = StorePath::file(None, "docs/./../b.txt").unwrap();
        assert_eq!(path.segments, vec!["b.txt"]);
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(matches!(
            StorePath::file(None, "../escape.txt"),
            Err(FwError::PathViolation(_))
        ));
        assert!(matches!(
            StorePath::file(Some("docs"), "../../escape.txt"),
            Err(FwError::PathViolation(_))
        ));
        assert!(matches!(
            StorePath::dir(Some("../outside")),
            Err(FwError::PathViolation(_))
        ));
    }

    #[test]
    fn test_absolute_rejected() {
        assert!(StorePath::file(None, "/etc/passwd").is_err());
        assert!(StorePath::file(None, "\\windows\\system.ini").is_err());
        assert!(StorePath::file(None, "C:\\boot.ini").is_err());
        assert!(StorePath::file(Some("docs"), "x/../C:y").is_err());
        assert!(StorePath::dir(Some("/tmp")).is_err());
    }

    #[test]
    fn test_empty_and_root_filenames_rejected() {
        assert!(matches!(
            StorePath::file(None, ""),
            Err(FwError::PathViolation(_))
        ));
        assert!(matches!(
            StorePath::file(Some("docs"), ".."),
            Err(FwError::PathViolation(_))
        ));
        assert!(matches!(
            StorePath::file(None, "."),
            Err(FwError::PathViolation(_))
        ));
    }

    #[test]
    fn test_nul_rejected() {
        assert!(StorePath::file(None, "a\0b").is_err());
    }

    #[test]
    fn test_parent() {
        let path = StorePath::parse("a/b/c.txt").unwrap();
        assert_eq!(path.parent().unwrap().segments, vec!["a", "b"]);
        assert!(StorePath::root().parent().is_none());
    }

    #[test]
    fn test_stem_and_extension() {
        let path = StorePath::parse("report.txt").unwrap();
        assert_eq!(path.stem(), Some("report"));
        assert_eq!(path.extension(), Some("txt"));

        let path = StorePath::parse("archive.tar.gz").unwrap();
        assert_eq!(path.stem(), Some("archive.tar"));
        assert_eq!(path.extension(), Some("gz"));

        let path = StorePath::parse(".bashrc").unwrap();
        assert_eq!(path.stem(), Some(".bashrc"));
        assert!(path.extension().is_none());

        let path = StorePath::parse("Makefile").unwrap();
        assert_eq!(path.stem(), Some("Makefile"));
        assert!(path.extension().is_none());
    }

    #[test]
    fn test_strip_prefix() {
        let path = StorePath::parse("data/2024/a.csv").unwrap();
        let base = StorePath::parse("data").unwrap();
        assert!(path.starts_with(&base));
        assert_eq!(path.strip_prefix(&base).unwrap().to_path_string(), "2024/a.csv");

        let other = StorePath::parse("docs").unwrap();
        assert!(path.strip_prefix(&other).is_none());
    }

    #[test]
    fn test_fs_path_round_trip() {
        let root = Path::new("/srv/store");
        let path = StorePath::parse("docs/a.txt").unwrap();
        let real = path.to_fs_path(root);
        assert_eq!(real, PathBuf::from("/srv/store/docs/a.txt"));
        assert_eq!(StorePath::from_fs_path(root, &real).unwrap(), path);
    }

    #[test]
    fn test_from_fs_path_outside_root() {
        let root = Path::new("/srv/store");
        assert!(StorePath::from_fs_path(root, Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn test_display() {
        let path = StorePath::parse("a/b.txt").unwrap();
        assert_eq!(format!("{}", path), "a/b.txt");
    }
}
