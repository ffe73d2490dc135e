//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{delete, export, get, import, list, patch, put};

/// Inspect and edit a docrepo file store.
#[derive(Parser, Debug)]
#[command(name = "docrepo")]
#[command(author, version = env!("DOCREPO_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Store root directory (defaults to the platform data directory)
    #[arg(long, env = "DOCREPO_ROOT", global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a single document
    Get(get::GetArgs),

    /// Query a collection, one page at a time
    List(list::ListArgs),

    /// Create or replace a document
    Put(put::PutArgs),

    /// Update selected fields of an existing document
    Patch(patch::PatchArgs),

    /// Delete a document
    Delete(delete::DeleteArgs),

    /// Write JSON lines into a collection in batches
    Import(import::ImportArgs),

    /// Write a collection out as JSON lines
    Export(export::ExportArgs),
}
