//! `--where` clause parsing.

use anyhow::{Context, Result, bail};
use serde_json::Value;

use docrepo_core::query::{Operator, Predicate};

/// Parse `field op value`.
///
/// The value is read as JSON when it parses (`3`, `true`, `["a","b"]`,
/// `"quoted"`) and taken as a bare string otherwise.
pub fn parse_where(clause: &str) -> Result<Predicate> {
    let mut parts = clause.trim().splitn(3, char::is_whitespace);
    let (Some(field), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("Expected 'field op value', got '{}'", clause);
    };

    let op: Operator = op
        .parse()
        .with_context(|| format!("Unknown operator in '{}'", clause))?;

    let value = value.trim();
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    Ok(Predicate::new(field, op, value))
}

pub fn parse_all(clauses: &[String]) -> Result<Vec<Predicate>> {
    clauses.iter().map(|c| parse_where(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_values() {
        let p = parse_where("age >= 21").unwrap();
        assert_eq!(p.field, "age");
        assert_eq!(p.op, Operator::GreaterThanOrEqual);
        assert_eq!(p.value, json!(21));

        let p = parse_where(r#"tags array-contains-any ["a", "b"]"#).unwrap();
        assert_eq!(p.op, Operator::ArrayContainsAny);
        assert_eq!(p.value, json!(["a", "b"]));
    }

    #[test]
    fn test_bare_string_value_keeps_spaces() {
        let p = parse_where("title == hello world").unwrap();
        assert_eq!(p.value, json!("hello world"));
    }

    #[test]
    fn test_rejects_malformed_clauses() {
        assert!(parse_where("age").is_err());
        assert!(parse_where("age ~ 3").is_err());
    }
}
