//! Get command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::{output, store};

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Collection name
    pub collection: String,

    /// Document key
    pub id: String,
}

pub async fn run(args: GetArgs, root: &Path) -> Result<()> {
    let loader = store::loader(root, &args.collection)?;

    let Some(doc) = loader
        .load(&args.id)
        .await
        .context("Failed to load document")?
    else {
        bail!("Document not found: {}/{}", args.collection, args.id);
    };

    output::json_pretty(&doc)
}
