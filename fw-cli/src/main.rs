// SPDX-License-Identifier: AGPL-3.0-or-later
//! File Warden CLI
//!
//! Manage records, backups and archives inside a single storage root.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "fw")]
#[command(author, version, about = "File Warden - directory-scoped file management", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage root (overrides the configured one)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new file
    Create {
        /// File name, relative to the subdirectory
        filename: String,

        /// Content to write (empty when omitted)
        #[arg(default_value = "")]
        content: String,

        /// Subdirectory under the root
        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Display file contents
    Cat {
        filename: String,

        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Replace a file's contents, keeping a backup
    Update {
        filename: String,

        content: String,

        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Remove files, keeping backups
    Rm {
        /// File(s) to remove
        #[arg(required = true)]
        filenames: Vec<String>,

        #[arg(short, long)]
        dir: Option<String>,

        /// Remove without confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Copy a file
    Cp {
        source: String,

        dest: String,

        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Move or rename a file
    Mv {
        source: String,

        dest: String,

        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Show file information
    Stat {
        filename: String,

        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Print a file's content digest
    Hash {
        filename: String,

        #[arg(short, long)]
        dir: Option<String>,
    },

    /// List files
    #[command(alias = "dir")]
    Ls {
        /// Subdirectory to list (defaults to the root)
        dir: Option<String>,

        /// Glob matched against file names
        #[arg(short, long)]
        pattern: Option<String>,

        /// Descend into subdirectories
        #[arg(short = 'R', long)]
        recursive: bool,

        /// Long format with details
        #[arg(short, long)]
        long: bool,

        /// Human-readable sizes
        #[arg(short = 'H', long)]
        human: bool,
    },

    /// Search file names (and optionally contents)
    Search {
        text: String,

        #[arg(short, long)]
        dir: Option<String>,

        /// Match file contents instead of names
        #[arg(long, conflicts_with = "all")]
        content: bool,

        /// Match names or contents
        #[arg(short, long)]
        all: bool,

        /// Case-sensitive matching
        #[arg(short = 's', long)]
        case_sensitive: bool,

        /// Maximum number of results
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Pack files into a ZIP archive
    Zip {
        archive: String,

        /// Files to pack
        #[arg(required = true)]
        files: Vec<String>,

        #[arg(short, long)]
        dir: Option<String>,

        /// Replace an existing archive (it is backed up first)
        #[arg(short, long)]
        force: bool,

        /// Store entries without compression
        #[arg(long)]
        store: bool,
    },

    /// Extract a ZIP archive
    Unzip {
        archive: String,

        /// Destination directory, relative to the subdirectory
        #[arg(default_value = ".")]
        dest: String,

        #[arg(short, long)]
        dir: Option<String>,

        /// List entries instead of extracting
        #[arg(short, long)]
        list: bool,
    },

    /// Show storage statistics
    Stats {
        /// Human-readable sizes
        #[arg(short = 'H', long)]
        human: bool,
    },

    /// List backups of a file
    Backups {
        filename: String,

        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Restore a file from its newest backup
    Restore {
        filename: String,

        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Print a JSON file, or one value from it
    JsonGet {
        filename: String,

        /// JSON pointer such as /user/name
        pointer: Option<String>,

        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Run the demonstration flow
    Demo,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match commands::load_config(cli.config.as_deref(), cli.root.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Create { filename, content, dir } => {
            commands::create(config, &filename, &content, dir.as_deref())
        }
        Commands::Cat { filename, dir } => commands::cat(config, &filename, dir.as_deref()),
        Commands::Update { filename, content, dir } => {
            commands::update(config, &filename, &content, dir.as_deref())
        }
        Commands::Rm { filenames, dir, force } => {
            commands::rm(config, &filenames, dir.as_deref(), force)
        }
        Commands::Cp { source, dest, dir } => commands::cp(config, &source, &dest, dir.as_deref()),
        Commands::Mv { source, dest, dir } => commands::mv(config, &source, &dest, dir.as_deref()),
        Commands::Stat { filename, dir } => commands::stat(config, &filename, dir.as_deref()),
        Commands::Hash { filename, dir } => commands::hash(config, &filename, dir.as_deref()),
        Commands::Ls { dir, pattern, recursive, long, human } => {
            commands::ls(config, dir, pattern, recursive, long, human)
        }
        Commands::Search { text, dir, content, all, case_sensitive, limit } => {
            commands::search(config, &text, dir.as_deref(), content, all, case_sensitive, limit)
        }
        Commands::Zip { archive, files, dir, force, store } => {
            commands::zip(config, &archive, &files, dir.as_deref(), force, store)
        }
        Commands::Unzip { archive, dest, dir, list } => {
            commands::unzip(config, &archive, &dest, dir.as_deref(), list)
        }
        Commands::Stats { human } => commands::stats(config, human),
        Commands::Backups { filename, dir } => commands::backups(config, &filename, dir.as_deref()),
        Commands::Restore { filename, dir } => commands::restore(config, &filename, dir.as_deref()),
        Commands::JsonGet { filename, pointer, dir } => {
            commands::json_get(config, &filename, pointer.as_deref(), dir.as_deref())
        }
        Commands::Demo => commands::demo(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
