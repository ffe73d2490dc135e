//! Import command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use docrepo::{BatchResult, BatchWriter, StreamWriter, WriteMode};

use crate::{document, output, store};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Collection name
    pub collection: String,

    /// JSON lines file, one document per line (use - for stdin)
    #[arg(long, default_value = "-")]
    pub input: String,

    /// Documents written per transaction
    #[arg(long, default_value_t = 500)]
    pub batch_size: usize,

    /// How each batch is written
    #[arg(long, value_enum, default_value_t = ImportMode::Save)]
    pub mode: ImportMode,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ImportMode {
    /// Only insert documents whose key is free
    Create,
    /// Only replace documents that exist
    Update,
    /// Insert or replace
    Save,
}

impl From<ImportMode> for WriteMode {
    fn from(mode: ImportMode) -> Self {
        match mode {
            ImportMode::Create => WriteMode::Create,
            ImportMode::Update => WriteMode::Update,
            ImportMode::Save => WriteMode::Save,
        }
    }
}

#[derive(Default)]
struct Totals {
    written: usize,
    failed: usize,
}

impl Totals {
    fn add(&mut self, result: &BatchResult) {
        self.written += result.succeeded.len();
        self.failed += result.failed.len();
    }
}

pub async fn run(args: ImportArgs, root: &Path) -> Result<()> {
    let writer = BatchWriter::new(store::open(root), store::entity_config(&args.collection)?)
        .context("Failed to describe documents")?;
    let mut stream = StreamWriter::new(writer, args.mode.into(), args.batch_size)
        .context("Invalid batch size")?;

    let input = store::read_input(&args.input)?;
    let mut totals = Totals::default();

    for (number, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let doc = document::parse(line)
            .with_context(|| format!("Invalid JSON on line {}", number + 1))?;

        if let Some(result) = stream.write(doc).await.context("Failed to write batch")? {
            totals.add(&result);
        }
    }
    totals.add(&stream.flush().await.context("Failed to write batch")?);

    output::success(&format!("Imported {} document(s) into {}", totals.written, args.collection));
    if totals.failed > 0 {
        output::warning(&format!("{} document(s) were rejected", totals.failed));
    }

    Ok(())
}
