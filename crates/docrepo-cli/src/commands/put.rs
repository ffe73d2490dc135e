//! Put command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;

use docrepo::Outcome;

use crate::{document, output, store};

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Collection name
    pub collection: String,

    /// JSON file with the document (use - for stdin)
    #[arg(long, default_value = "-")]
    pub json: String,

    /// Document key, overriding any `_id` in the input; a key is generated
    /// when neither is given
    #[arg(long)]
    pub id: Option<String>,
}

pub async fn run(args: PutArgs, root: &Path) -> Result<()> {
    let repo = store::repository(root, &args.collection)?;

    let input = store::read_input(&args.json)?;
    let mut doc = document::parse(&input).context("Invalid JSON document")?;
    if let Some(id) = args.id {
        doc.id = id;
    }

    let outcome = repo.save(&mut doc).await.context("Failed to save document")?;
    if outcome != Outcome::Applied {
        bail!("Document {}/{} was not written ({})", args.collection, doc.id, outcome);
    }

    println!("{}", doc.id);
    output::success(&format!("Saved {}/{}", args.collection, doc.id));

    Ok(())
}
