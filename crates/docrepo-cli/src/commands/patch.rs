//! Patch command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::{Map, Value};

use docrepo::Outcome;

use crate::{output, store};

#[derive(Args, Debug)]
pub struct PatchArgs {
    /// Collection name
    pub collection: String,

    /// Document key
    pub id: String,

    /// Field assignment 'path=value', value parsed as JSON when possible (repeatable)
    #[arg(long = "set", short = 's')]
    pub assignments: Vec<String>,

    /// JSON file with an object of fields to update (use - for stdin)
    #[arg(long)]
    pub json: Option<String>,
}

pub async fn run(args: PatchArgs, root: &Path) -> Result<()> {
    let repo = store::repository(root, &args.collection)?;

    let mut fields = match &args.json {
        Some(path) => match serde_json::from_str(&store::read_input(path)?)
            .context("Invalid JSON patch")?
        {
            Value::Object(map) => map,
            _ => bail!("Patch input must be a JSON object"),
        },
        None => Map::new(),
    };
    for assignment in &args.assignments {
        let (path, value) = parse_assignment(assignment)?;
        fields.insert(path, value);
    }
    if fields.is_empty() {
        bail!("Nothing to patch: pass --set or --json");
    }

    fields.insert("_id".to_string(), Value::String(args.id.clone()));

    match repo.patch(&mut fields).await.context("Failed to patch document")? {
        Outcome::Applied => {}
        Outcome::Unaffected => bail!("Document not found: {}/{}", args.collection, args.id),
        Outcome::Conflict => bail!("Document {}/{} was modified concurrently", args.collection, args.id),
    }

    output::success(&format!("Patched {}/{}", args.collection, args.id));
    if let Some(Value::String(updated)) = fields.get("_updated_at") {
        output::field("Updated", updated);
    }

    Ok(())
}

fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let Some((path, raw)) = assignment.split_once('=') else {
        bail!("Expected 'path=value', got '{}'", assignment);
    };
    let path = path.trim();
    if path.is_empty() {
        bail!("Empty field path in '{}'", assignment);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((path.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("stats.views=10").unwrap(),
            ("stats.views".to_string(), json!(10))
        );
        assert_eq!(
            parse_assignment("title=a=b").unwrap(),
            ("title".to_string(), json!("a=b"))
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=1").is_err());
    }
}
