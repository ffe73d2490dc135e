//! Export command implementation.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use docrepo::Exporter;
use docrepo_core::query::Query;

use super::filter;
use crate::store;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Collection name
    pub collection: String,

    /// Output file (defaults to stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Filter clause 'field op value' (repeatable)
    #[arg(long = "where", short = 'w')]
    pub filters: Vec<String>,
}

pub async fn run(args: ExportArgs, root: &Path) -> Result<()> {
    let mut query = Query::new();
    for predicate in filter::parse_all(&args.filters)? {
        query = query.filter(predicate);
    }

    let exporter = Exporter::json_lines(store::loader(root, &args.collection)?).with_query(query);

    let mut out: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let count = exporter
        .export(&mut out)
        .await
        .context("Failed to export collection")?;

    eprintln!(
        "{} {} document(s) from {}",
        "Exported".dimmed(),
        count,
        args.collection
    );

    Ok(())
}
