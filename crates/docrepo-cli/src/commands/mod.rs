//! Subcommand implementations.

pub mod delete;
pub mod export;
mod filter;
pub mod get;
pub mod import;
pub mod list;
pub mod patch;
pub mod put;

use std::path::Path;

use anyhow::Result;

use crate::cli::Commands;

pub async fn handle(command: Commands, root: &Path) -> Result<()> {
    match command {
        Commands::Get(args) => get::run(args, root).await,
        Commands::List(args) => list::run(args, root).await,
        Commands::Put(args) => put::run(args, root).await,
        Commands::Patch(args) => patch::run(args, root).await,
        Commands::Delete(args) => delete::run(args, root).await,
        Commands::Import(args) => import::run(args, root).await,
        Commands::Export(args) => export::run(args, root).await,
    }
}
