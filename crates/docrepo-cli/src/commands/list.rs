//! List command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use docrepo::{Criteria, Searcher};
use docrepo_core::query::Predicate;

use super::filter;
use crate::{output, store};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Collection name
    pub collection: String,

    /// Filter clause 'field op value' (repeatable)
    #[arg(long = "where", short = 'w')]
    pub filters: Vec<String>,

    /// Sort keys, e.g. '-score,name'
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub sort: String,

    /// Maximum number of documents to return (0 for all)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,

    /// Key of the last document of the previous page
    #[arg(long, default_value = "")]
    pub cursor: String,

    /// Only return these fields
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

struct ListFilter {
    predicates: Vec<Predicate>,
    select: Vec<String>,
    sort: String,
}

pub async fn run(args: ListArgs, root: &Path) -> Result<()> {
    let searcher = Searcher::new(
        store::loader(root, &args.collection)?,
        |f: &ListFilter| Criteria {
            predicates: f.predicates.clone(),
            select: f.select.clone(),
        },
        |f: &ListFilter| f.sort.clone(),
    );

    let list_filter = ListFilter {
        predicates: filter::parse_all(&args.filters)?,
        select: args.select,
        sort: args.sort,
    };

    let page = searcher
        .search(&list_filter, args.limit, &args.cursor)
        .await
        .context("Failed to list documents")?;

    if page.items.is_empty() {
        eprintln!("{}", "No documents found.".dimmed());
        return Ok(());
    }

    for doc in &page.items {
        if args.pretty {
            output::json_pretty(doc)?;
        } else {
            output::json(doc)?;
        }
    }

    if !page.is_last() {
        eprintln!();
        eprintln!("{}: {}", "Next cursor".dimmed(), page.next_cursor);
    }

    Ok(())
}
