//! Query model shared by stores and the search engine.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};
use crate::types::DocumentId;

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
    NotIn,
    ArrayContains,
    ArrayContainsAny,
}

impl Operator {
    /// Returns the operator as written in query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::In => "in",
            Operator::NotIn => "not-in",
            Operator::ArrayContains => "array-contains",
            Operator::ArrayContainsAny => "array-contains-any",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s {
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessThanOrEqual,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterThanOrEqual,
            "in" => Operator::In,
            "not-in" => Operator::NotIn,
            "array-contains" => Operator::ArrayContains,
            "array-contains-any" => Operator::ArrayContainsAny,
            other => {
                return Err(InvalidInputError::Operator {
                    value: other.to_string(),
                }
                .into());
            }
        };
        Ok(op)
    }
}

/// A single `field op value` filter. Fields use store-native (wire) names.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

/// A filtered, ordered, optionally cursored query over one collection.
///
/// Predicates are AND-combined. Stores always break ordering ties by
/// document id, so `start_after` is well defined for any ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Predicate>,
    pub order_by: Vec<OrderBy>,
    pub select: Vec<String>,
    pub limit: Option<usize>,
    pub start_after: Option<DocumentId>,
}

impl Query {
    /// A query matching every document of a collection.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, id: DocumentId) -> Self {
        self.start_after = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_parse_roundtrip() {
        for s in [
            "==",
            "!=",
            "<",
            "<=",
            ">",
            ">=",
            "in",
            "not-in",
            "array-contains",
            "array-contains-any",
        ] {
            let op: Operator = s.parse().unwrap();
            assert_eq!(op.as_str(), s);
        }
    }

    #[test]
    fn operator_parse_unknown() {
        assert!("=~".parse::<Operator>().is_err());
    }

    #[test]
    fn builder_accumulates() {
        let q = Query::new()
            .filter(Predicate::new("age", Operator::GreaterThan, 30))
            .order_by(OrderBy::desc("age"))
            .select(["name"])
            .limit(10);
        assert_eq!(q.filters.len(), 1);
        assert_eq!(q.order_by[0].direction, Direction::Descending);
        assert_eq!(q.select, vec!["name".to_string()]);
        assert_eq!(q.limit, Some(10));
        assert!(q.start_after.is_none());
    }
}
