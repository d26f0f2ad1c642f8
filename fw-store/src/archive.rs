//! ZIP packing and unpacking
//!
//! Archives and extracted files are written to fresh temporary files next
//! to their target and persisted only once complete, so a failed call never
//! leaves a half-written record behind or touches an unrelated one.

use fw_core::{Compression, DataFormat, FwError, FwResult, StorePath, ZipOptions};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::FileStore;

impl FileStore {
    /// Pack records into a new archive. Entry names are the given filenames
    /// relative to `subdir`.
    pub fn create_zip<S: AsRef<str>>(
        &self,
        archive_name: &str,
        files: &[S],
        subdir: Option<&str>,
        options: &ZipOptions,
    ) -> FwResult<StorePath> {
        let scope = StorePath::dir(subdir)?;

        let mut seen = HashSet::new();
        let mut sources = Vec::with_capacity(files.len());
        for file in files {
            let source = self.require_file(file.as_ref(), subdir)?;
            let entry_name = source
                .path
                .strip_prefix(&scope)
                .unwrap_or_else(|| source.path.clone())
                .to_path_string();
            if seen.insert(entry_name.clone()) {
                sources.push((entry_name, source.real));
            }
        }

        let archive = self.resolver.resolve(archive_name, subdir)?;
        if archive.exists() {
            if !archive.is_file() {
                return Err(FwError::NotAFile(archive.path.to_string()));
            }
            if !options.overwrite {
                warn!(path = %archive.path, "archive already exists");
                return Err(FwError::AlreadyExists(archive.path.to_string()));
            }
        }

        let mut partial = temp_beside(&archive.real)?;
        write_archive(partial.as_file_mut(), &sources, options.compression)?;

        if archive.exists() {
            self.backups.snapshot(&archive.path, &archive.real)?;
        }
        persist(partial, &archive.real)?;

        info!(path = %archive.path, entries = sources.len(), "archive created");
        Ok(archive.path)
    }

    /// Unpack an archive into `destination` (relative to `subdir`).
    ///
    /// Every entry name is checked before anything is written; an entry
    /// that would land outside the destination fails the whole call.
    /// Existing files are backed up before being replaced.
    pub fn extract_zip(
        &self,
        archive_name: &str,
        destination: &str,
        subdir: Option<&str>,
    ) -> FwResult<Vec<StorePath>> {
        let archive_file = self.require_file(archive_name, subdir)?;
        let dest = StorePath::dir(subdir)?.join(destination)?;
        let dest = self.resolver.check(dest)?;

        let mut archive = open_archive(&archive_file.real)?;

        let mut plan = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive.by_index(index).map_err(zip_error)?;
            let name = entry
                .enclosed_name()
                .map(|p| p.to_path_buf())
                .ok_or_else(|| {
                    FwError::PathViolation(format!("archive entry {}", entry.name()))
                })?;
            let target = dest.path.join(name.to_string_lossy())?;
            let target = self.resolver.check(target)?;
            plan.push((index, entry.is_dir(), target));
        }

        fs::create_dir_all(&dest.real)?;
        let mut extracted = Vec::new();
        for (index, is_dir, target) in plan {
            if is_dir {
                fs::create_dir_all(&target.real)?;
                continue;
            }

            if target.exists() && !target.is_file() {
                return Err(FwError::NotAFile(target.path.to_string()));
            }
            if let Some(parent) = target.real.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut entry = archive.by_index(index).map_err(zip_error)?;
            let mut unpacked = temp_beside(&target.real)?;
            copy_entry(&mut entry, unpacked.as_file_mut())?;

            if target.is_file() {
                self.backups.snapshot(&target.path, &target.real)?;
            }
            persist(unpacked, &target.real)?;
            extracted.push(target.path);
        }

        info!(
            archive = %archive_file.path,
            destination = %dest.path,
            files = extracted.len(),
            "archive extracted"
        );
        Ok(extracted)
    }

    /// Entry names stored in an archive, in archive order.
    pub fn archive_entries(&self, archive_name: &str, subdir: Option<&str>) -> FwResult<Vec<String>> {
        let archive_file = self.require_file(archive_name, subdir)?;
        let mut archive = open_archive(&archive_file.real)?;

        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive.by_index(index).map_err(zip_error)?;
            names.push(entry.name().to_string());
        }
        Ok(names)
    }
}

fn write_archive(
    out: &mut File,
    sources: &[(String, PathBuf)],
    compression: Compression,
) -> FwResult<()> {
    let method = match compression {
        Compression::Stored => CompressionMethod::Stored,
        Compression::Deflated => CompressionMethod::Deflated,
    };
    let options = SimpleFileOptions::default().compression_method(method);

    let mut writer = ZipWriter::new(out);
    for (name, real) in sources {
        writer.start_file(name.as_str(), options).map_err(zip_error)?;
        let mut source = File::open(real)?;
        io::copy(&mut source, &mut writer)?;
    }
    writer.finish().map_err(zip_error)?;
    Ok(())
}

fn open_archive(path: &Path) -> FwResult<ZipArchive<File>> {
    ZipArchive::new(File::open(path)?).map_err(zip_error)
}

/// Uniquely named, exclusively created file in the target's directory
fn temp_beside(target: &Path) -> FwResult<NamedTempFile> {
    let dir = target.parent().unwrap_or(Path::new("."));
    Ok(NamedTempFile::new_in(dir)?)
}

fn persist(temp: NamedTempFile, target: &Path) -> FwResult<()> {
    temp.persist(target).map_err(|e| FwError::Io(e.error))?;
    Ok(())
}

/// Stream one entry out. Read failures are archive damage, write failures
/// are I/O.
fn copy_entry<R: Read, W: Write>(entry: &mut R, out: &mut W) -> FwResult<u64> {
    let mut buf = [0u8; 8192];
    let mut written = 0u64;
    loop {
        let n = match entry.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FwError::decode(DataFormat::Zip, e)),
        };
        out.write_all(&buf[..n])?;
        written += n as u64;
    }
    out.flush()?;
    Ok(written)
}

fn zip_error(err: ZipError) -> FwError {
    match err {
        ZipError::Io(e) => FwError::Io(e),
        other => FwError::decode(DataFormat::Zip, other),
    }
}
