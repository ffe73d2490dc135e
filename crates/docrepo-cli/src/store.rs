//! Store location and opening.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::debug;

use docrepo::{EntityConfig, Loader, Repository};
use docrepo_file::FileStore;

use crate::document::RawDocument;

/// Pick the store root: explicit flag or `DOCREPO_ROOT` first, then the
/// platform data directory.
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        debug!(root = %root.display(), "Using configured store root");
        return Ok(root.to_path_buf());
    }

    let dirs =
        ProjectDirs::from("", "", "docrepo").context("Could not determine data directory")?;
    let root = dirs.data_dir().join("store");
    debug!(root = %root.display(), "Using default store root");
    Ok(root)
}

pub fn open(root: &Path) -> Arc<FileStore> {
    debug!(root = %root.display(), "Opening file store");
    Arc::new(FileStore::new(root))
}

/// Raw documents carry no version, so writes are unchecked.
pub fn entity_config(collection: &str) -> Result<EntityConfig> {
    let config = EntityConfig::new(collection)
        .with_context(|| format!("Invalid collection name: {}", collection))?
        .created_at("created_at")
        .updated_at("updated_at");
    Ok(config)
}

pub fn loader(root: &Path, collection: &str) -> Result<Loader<RawDocument, FileStore>> {
    Loader::new(open(root), entity_config(collection)?).context("Failed to describe documents")
}

pub fn repository(root: &Path, collection: &str) -> Result<Repository<RawDocument, FileStore>> {
    Repository::new(open(root), entity_config(collection)?).context("Failed to describe documents")
}

/// Read a whole input file, or stdin for `-`.
pub fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        Ok(buf)
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
    }
}
