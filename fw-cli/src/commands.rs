// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations

use chrono::{DateTime, Utc};
use console::style;
use dialoguer::Confirm;
use fw_core::{
    Compression, DataFormat, FileSummary, FwError, FwResult, ListOptions, StoreConfig, ZipOptions,
};
use fw_search::{MatchLocation, SearchMode, SearchQuery};
use fw_store::FileStore;
use serde_json::json;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing::debug;

const CONFIG_FILE: &str = "config.toml";

/// Default location of the user configuration file
fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "hyperpolymath", "file-warden")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Build the store configuration: explicit file, then the user config file
/// when present, then defaults. `root` always wins.
pub fn load_config(explicit: Option<&Path>, root: Option<&Path>) -> FwResult<StoreConfig> {
    let discovered = default_config_path().filter(|p| p.is_file());
    resolve_config(explicit, discovered.as_deref(), root)
}

fn resolve_config(
    explicit: Option<&Path>,
    discovered: Option<&Path>,
    root: Option<&Path>,
) -> FwResult<StoreConfig> {
    let mut config = match explicit.or(discovered) {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            StoreConfig::load(path)?
        }
        None => StoreConfig::default(),
    };
    if let Some(root) = root {
        config.root = root.to_path_buf();
    }
    Ok(config)
}

/// Format a timestamp for display
fn format_time(dt: Option<DateTime<Utc>>) -> String {
    dt.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Format file size
fn format_size(size: u64, human: bool) -> String {
    if human {
        bytesize::ByteSize(size).to_string()
    } else {
        size.to_string()
    }
}

fn ok_mark() -> console::StyledObject<&'static str> {
    style("✓").green()
}

#[derive(Tabled)]
struct LsEntry {
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Path")]
    path: String,
}

impl LsEntry {
    fn from_summary(summary: &FileSummary, human: bool) -> Self {
        Self {
            size: format_size(summary.size, human),
            modified: format_time(summary.modified),
            path: summary.path.to_string(),
        }
    }
}

#[derive(Tabled)]
struct DirRow {
    #[tabled(rename = "Directory")]
    directory: String,
    #[tabled(rename = "Files")]
    files: u64,
    #[tabled(rename = "Size")]
    size: String,
}

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Size")]
    size: u64,
    #[tabled(rename = "Backup")]
    path: String,
}

/// Create a new file
pub fn create(config: StoreConfig, filename: &str, content: &str, dir: Option<&str>) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let path = store.create(filename, content, dir)?;
    println!("{} Created {}", ok_mark(), path);
    Ok(())
}

/// Display file contents
pub fn cat(config: StoreConfig, filename: &str, dir: Option<&str>) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let data = store.read(filename, dir)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}

/// Replace file contents
pub fn update(config: StoreConfig, filename: &str, content: &str, dir: Option<&str>) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let backup = store.update(filename, content, dir)?;
    println!(
        "{} Updated {} (previous content in {})",
        ok_mark(),
        backup.original,
        style(&backup.path).dim()
    );
    Ok(())
}

/// Remove files
pub fn rm(config: StoreConfig, filenames: &[String], dir: Option<&str>, force: bool) -> FwResult<()> {
    let store = FileStore::open(config)?;

    for filename in filenames {
        if !force {
            let confirmed = Confirm::new()
                .with_prompt(format!("Remove {filename}?"))
                .default(false)
                .interact()
                .map_err(|e| FwError::Io(io::Error::other(e)))?;
            if !confirmed {
                println!("{} {}", style("Skipped").yellow(), filename);
                continue;
            }
        }

        let backup = store.delete(filename, dir)?;
        println!("{} Removed {} (backup: {})", ok_mark(), backup.original, backup.path);
    }

    Ok(())
}

/// Copy a file
pub fn cp(config: StoreConfig, source: &str, dest: &str, dir: Option<&str>) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let path = store.copy(source, dest, dir)?;
    println!("{} Copied {} -> {}", ok_mark(), source, path);
    Ok(())
}

/// Move/rename a file
pub fn mv(config: StoreConfig, source: &str, dest: &str, dir: Option<&str>) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let path = store.move_file(source, dest, dir)?;
    println!("{} Moved {} -> {}", ok_mark(), source, path);
    Ok(())
}

/// Show file information
pub fn stat(config: StoreConfig, filename: &str, dir: Option<&str>) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let info = store.get_file_info(filename, dir)?;

    println!("  Name: {}", info.name);
    println!("  Path: {}", info.path);
    println!("  Size: {} ({}, {} MB)", info.size, bytesize::ByteSize(info.size), info.size_mb());
    println!("  Created: {}", format_time(info.created));
    println!("  Modified: {}", format_time(info.modified));
    println!("  Extension: {}", info.extension.as_deref().unwrap_or("-"));
    println!("  {}: {}", info.digest_algorithm, info.digest);

    Ok(())
}

/// Print the content digest
pub fn hash(config: StoreConfig, filename: &str, dir: Option<&str>) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let digest = store.get_file_hash(filename, dir)?;
    println!("{digest}  {filename}");
    Ok(())
}

/// List files
pub fn ls(
    config: StoreConfig,
    dir: Option<String>,
    pattern: Option<String>,
    recursive: bool,
    long: bool,
    human: bool,
) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let options = ListOptions {
        subdirectory: dir,
        recursive,
        pattern,
    };
    let listing = store.list_files(&options)?;
    let summaries = listing.iter().collect::<FwResult<Vec<_>>>()?;

    if summaries.is_empty() {
        println!("(no files)");
        return Ok(());
    }

    if long {
        let entries: Vec<LsEntry> = summaries
            .iter()
            .map(|s| LsEntry::from_summary(s, human))
            .collect();
        println!("{}", Table::new(entries));
    } else {
        for summary in &summaries {
            println!("{}", summary.path);
        }
    }

    Ok(())
}

/// Search for files
pub fn search(
    config: StoreConfig,
    text: &str,
    dir: Option<&str>,
    content: bool,
    all: bool,
    case_sensitive: bool,
    limit: Option<usize>,
) -> FwResult<()> {
    let store = FileStore::open(config)?;

    let mode = match (content, all) {
        (_, true) => SearchMode::NameOrContent,
        (true, false) => SearchMode::Content,
        (false, false) => SearchMode::Name,
    };
    let mut query = SearchQuery::name(text).with_mode(mode);
    if case_sensitive {
        query = query.case_sensitive();
    }
    if let Some(limit) = limit {
        query = query.with_limit(limit);
    }

    let hits = store.search_files(&query, dir)?;
    if hits.is_empty() {
        println!("No matches for {}", style(text).bold());
        return Ok(());
    }

    for hit in hits {
        let location = match hit.location {
            MatchLocation::Name => style("name").cyan(),
            MatchLocation::Content => style("content").magenta(),
        };
        println!("{}  [{}]", hit.path, location);
    }

    Ok(())
}

/// Create a ZIP archive
pub fn zip(
    config: StoreConfig,
    archive: &str,
    files: &[String],
    dir: Option<&str>,
    force: bool,
    store_only: bool,
) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let options = ZipOptions {
        overwrite: force,
        compression: if store_only {
            Compression::Stored
        } else {
            Compression::Deflated
        },
    };

    let path = store.create_zip(archive, files, dir, &options)?;
    println!("{} Packed {} file(s) into {}", ok_mark(), files.len(), path);
    Ok(())
}

/// Extract or list a ZIP archive
pub fn unzip(config: StoreConfig, archive: &str, dest: &str, dir: Option<&str>, list: bool) -> FwResult<()> {
    let store = FileStore::open(config)?;

    if list {
        for name in store.archive_entries(archive, dir)? {
            println!("{name}");
        }
        return Ok(());
    }

    let files = store.extract_zip(archive, dest, dir)?;
    for file in &files {
        println!("  {file}");
    }
    println!("{} Extracted {} file(s)", ok_mark(), files.len());
    Ok(())
}

/// Show storage statistics
pub fn stats(config: StoreConfig, human: bool) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let stats = store.storage_stats()?;

    println!("Storage: {}", stats.root.display());
    println!("  Files:   {}", stats.total_files);
    println!(
        "  Size:    {} ({} MB, {} GB)",
        format_size(stats.total_size, human),
        stats.size_mb(),
        stats.size_gb()
    );
    println!(
        "  Backups: {} ({})",
        stats.backup_files,
        format_size(stats.backup_size, human)
    );

    if !stats.directories.is_empty() {
        let rows: Vec<DirRow> = stats
            .directories
            .iter()
            .map(|(directory, dir_stats)| DirRow {
                directory: directory.clone(),
                files: dir_stats.files,
                size: format_size(dir_stats.size, human),
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    Ok(())
}

/// List backups of a file
pub fn backups(config: StoreConfig, filename: &str, dir: Option<&str>) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let backups = store.list_backups(filename, dir)?;

    if backups.is_empty() {
        println!("No backups of {filename}");
        return Ok(());
    }

    let rows: Vec<BackupRow> = backups
        .iter()
        .map(|b| BackupRow {
            created: format_time(Some(b.created)),
            size: b.size,
            path: b.path.to_string(),
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

/// Restore the newest backup
pub fn restore(config: StoreConfig, filename: &str, dir: Option<&str>) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let backup = store.restore_backup(filename, dir)?;
    println!("{} Restored {} from {}", ok_mark(), backup.original, backup.path);
    Ok(())
}

/// Print a JSON document or the value at `pointer`
pub fn json_get(config: StoreConfig, filename: &str, pointer: Option<&str>, dir: Option<&str>) -> FwResult<()> {
    let store = FileStore::open(config)?;
    let document = store.load_json(filename, dir)?;

    let value = match pointer {
        Some(pointer) => document
            .pointer(pointer)
            .ok_or_else(|| FwError::NotFound(format!("{pointer} in {filename}")))?,
        None => &document,
    };
    let text = serde_json::to_string_pretty(value).map_err(|e| FwError::decode(DataFormat::Json, e))?;
    println!("{text}");
    Ok(())
}

/// Write a text record, replacing it when it already exists
fn put_text(store: &FileStore, filename: &str, content: &str, dir: Option<&str>) -> FwResult<()> {
    match store.create(filename, content, dir) {
        Err(e) if e.is_conflict() => store.update(filename, content, dir).map(drop),
        other => other.map(drop),
    }
}

/// Demonstration flow: text, JSON and CSV records, a listing, file info and
/// storage statistics.
pub fn demo(config: StoreConfig) -> FwResult<()> {
    let store = FileStore::open(config)?;

    println!("{}\n", style("=== File Warden demo ===").bold());

    put_text(&store, "test.txt", "Bu test fayli", Some("documents"))?;
    println!("{} Text file created", ok_mark());

    let user = json!({
        "ism": "Ali",
        "yosh": 25,
        "shahar": "Toshkent",
        "kasb": "Dasturchi"
    });
    store.save_json("user_data.json", &user, Some("data"))?;
    println!("{} JSON saved", ok_mark());

    let header = ["Ism", "Yosh", "Shahar"].map(String::from);
    let rows = vec![
        ["Ali", "25", "Toshkent"].map(String::from).to_vec(),
        ["Vali", "30", "Samarqand"].map(String::from).to_vec(),
        ["Sardor", "28", "Buxoro"].map(String::from).to_vec(),
    ];
    store.save_csv("users.csv", &rows, Some(&header), Some("data"))?;
    println!("{} CSV saved", ok_mark());

    let listing = store.list_files(&ListOptions::in_dir("data"))?;
    let names = listing
        .iter()
        .map(|s| s.map(|s| s.name().unwrap_or_default().to_string()))
        .collect::<FwResult<Vec<_>>>()?;
    println!("\nFiles in data: {names:?}");

    let info = store.get_file_info("user_data.json", Some("data"))?;
    println!("\nFile info:");
    println!("  name: {}", info.name);
    println!("  size: {}", info.size);
    println!("  size_mb: {}", info.size_mb());
    println!("  created: {}", format_time(info.created));
    println!("  modified: {}", format_time(info.modified));
    println!("  extension: {}", info.extension.as_deref().unwrap_or(""));
    println!("  path: {}", info.path);
    println!("  {}: {}", info.digest_algorithm, info.digest);

    let stats = store.storage_stats()?;
    println!("\nStorage statistics:");
    println!("  Total files: {}", stats.total_files);
    println!("  Total size: {} MB", stats.size_mb());

    println!("\n{}", style("Demo finished").green().bold());
    Ok(())
}
