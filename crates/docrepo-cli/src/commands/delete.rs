//! Delete command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use crate::{output, store};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Collection name
    pub collection: String,

    /// Document key
    pub id: String,
}

pub async fn run(args: DeleteArgs, root: &Path) -> Result<()> {
    let repo = store::repository(root, &args.collection)?;

    let outcome = repo
        .delete(&args.id)
        .await
        .context("Failed to delete document")?;

    if outcome.is_applied() {
        output::success(&format!("Deleted {}/{}", args.collection, args.id));
    } else {
        output::warning(&format!("No such document: {}/{}", args.collection, args.id));
    }

    Ok(())
}
