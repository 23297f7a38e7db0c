//! Command-line interface for series-matcher.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **import**: Add or update records from a JSON or TSV/CSV file
//! - **match**: Run the matching pipeline over every record in the library
//! - **review**: List, approve, reject or remove matches
//! - **status**: Show library statistics or unmatched records
//!
//! ## Usage
//!
//! ```text
//! # Import a library scan
//! series-matcher import scan.tsv
//!
//! # Match with the external lookup disabled
//! series-matcher match --offline
//!
//! # Review pending matches as JSON
//! series-matcher review list --status pending --format json
//!
//! # Approve everything scoring 90 or more
//! series-matcher review approve-all --threshold 90
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::core::types::StatusFilter;
use crate::store::memory::MemoryStore;

pub mod import;
pub mod review;
pub mod run;
pub mod status;

#[derive(Parser)]
#[command(name = "series-matcher")]
#[command(version)]
#[command(about = "Group audiobooks into series and review the matches")]
#[command(
    long_about = "series-matcher infers which series each audiobook in a library belongs to.\n\nEach record is tried against, in order:\n- an external lookup (AI model or book catalog), when enabled\n- the series metadata already embedded in the library\n- series patterns in the title such as \"(Alex Rider, Book 1)\"\n- fuzzy similarity to series already known\n\nEvery match is stored as pending until it is approved or rejected."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Library file holding records, series and matches
    #[arg(short, long, global = true, default_value = "library.json")]
    pub library: PathBuf,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import records from a JSON or TSV/CSV file
    Import(import::ImportArgs),

    /// Match every record in the library to a series
    Match(run::MatchArgs),

    /// Review matches
    Review(review::ReviewArgs),

    /// Show library statistics
    Status(status::StatusArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Review state filter accepted on the command line
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum StatusArg {
    #[default]
    All,
    Pending,
    Approved,
    Rejected,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::All => Self::All,
            StatusArg::Pending => Self::Pending,
            StatusArg::Approved => Self::Approved,
            StatusArg::Rejected => Self::Rejected,
        }
    }
}

/// Open the library file, starting empty if it does not exist
pub(crate) fn open_library(path: &Path) -> anyhow::Result<MemoryStore> {
    MemoryStore::open(path)
        .with_context(|| format!("Failed to open library {}", path.display()))
}

pub(crate) fn save_library(store: &MemoryStore, path: &Path) -> anyhow::Result<()> {
    store
        .save_to_file(path)
        .with_context(|| format!("Failed to save library {}", path.display()))
}

/// Replace tabs and newlines so a value fits in one TSV cell
pub(crate) fn tsv_cell(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}
