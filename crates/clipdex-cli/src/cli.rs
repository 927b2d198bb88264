//! Argument definitions for the `clipdex` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clipdex_search::SortBy;

/// clipdex - video-clip catalog search and indexing
#[derive(Parser, Debug)]
#[command(name = "clipdex")]
#[command(about = "Search and maintain the clip catalog index", long_about = None)]
pub struct Args {
    /// Configuration file path (TOML). Environment variables override it.
    #[arg(short, long, global = true, env = "CLIPDEX_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the clip index with its mapping if it does not exist
    Init,

    /// Report engine reachability and service state
    Health,

    /// Print the resolved configuration (password redacted)
    Config,

    /// Fetch one clip by id
    Get {
        /// Clip id
        id: String,
    },

    /// Index a clip from a JSON file (`-` for stdin)
    Create {
        /// JSON document path
        file: PathBuf,
    },

    /// Apply a partial update from a JSON file (`-` for stdin)
    Update {
        /// Clip id
        id: String,

        /// JSON object with the fields to change
        file: PathBuf,

        /// Record who made the change
        #[arg(long)]
        by: Option<String>,
    },

    /// Dump every clip, newest first
    List {
        /// Fail instead of printing a partial or empty listing
        #[arg(long)]
        strict: bool,
    },

    /// Full-text search with optional show and character filters
    Search {
        /// Free text
        #[arg(short, long)]
        text: Option<String>,

        /// Show title (fuzzy)
        #[arg(long)]
        show: Option<String>,

        /// Character name (exact)
        #[arg(long)]
        character: Option<String>,

        /// `createdAt` or `name`
        #[arg(long, default_value_t = SortBy::CreatedAt)]
        sort: SortBy,

        /// Hits to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Page size
        #[arg(long, default_value_t = clipdex_search::types::DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Show titles with clip counts
    Shows {
        /// Only shows this character appears in
        #[arg(long)]
        character: Option<String>,
    },

    /// Character names with clip counts
    Characters {
        /// Only characters appearing in this show (fuzzy)
        #[arg(long)]
        show: Option<String>,
    },
}
