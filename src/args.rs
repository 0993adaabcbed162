//! Command-line argument definitions.
//!
//! This module defines the CLI surfaced by `game-scout`.

// -- std imports
use std::path::PathBuf;

// -- crate imports
use clap::Parser;

/// Command-line arguments for `game-scout`.
///
/// Use `--help` to see all options and defaults.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "game-scout",
    about = "Locate installed games and tools by scanning for marker files"
)]
pub struct Args {
    /// Path to the JSON catalog manifest describing games and tools
    #[arg(long)]
    pub catalog: PathBuf,

    /// Search root to walk (can be passed multiple times)
    #[arg(long = "root")]
    pub roots: Vec<PathBuf>,

    /// Previously discovered results (JSON); manual entries are never
    /// overwritten and already-discovered targets are skipped
    #[arg(long)]
    pub previous: Option<PathBuf>,

    /// Skip the brute-force search pass (hint-path quick discovery only)
    #[arg(long)]
    pub no_search: bool,

    /// Print JSON output (machine readable)
    #[arg(long)]
    pub json: bool,

    /// Suppress all logging output
    #[arg(long)]
    pub no_log: bool,

    /// Print per-root progress lines to stderr
    #[arg(long)]
    pub progress: bool,

    /// Max concurrent roots/applications (defaults to CPU count * 4)
    #[arg(long)]
    pub jobs: Option<usize>,
}
