//! In-memory query evaluation.

use std::cmp::Ordering;

use serde_json::Value;

use docrepo_core::document::{Document, get_path, project};
use docrepo_core::error::InvalidInputError;
use docrepo_core::query::{Direction, Operator, Predicate, Query};
use docrepo_core::Result;

/// Reject queries whose operands cannot be evaluated.
pub(crate) fn validate(query: &Query) -> Result<()> {
    for predicate in &query.filters {
        let needs_list = matches!(
            predicate.op,
            Operator::In | Operator::NotIn | Operator::ArrayContainsAny
        );
        if needs_list && !predicate.value.is_array() {
            return Err(InvalidInputError::Other {
                message: format!(
                    "operator '{}' on '{}' needs a list operand",
                    predicate.op, predicate.field
                ),
            }
            .into());
        }
    }
    Ok(())
}

/// Filter, order, cursor, limit and project a set of documents.
///
/// Documents without a value for an ordered field are dropped. Ties are
/// broken by document id, in the direction of the last ordering key.
pub(crate) fn execute(docs: Vec<Document>, query: &Query, cursor: Option<&Document>) -> Vec<Document> {
    let mut docs: Vec<Document> = docs
        .into_iter()
        .filter(|doc| query.filters.iter().all(|p| matches(doc, p)))
        .filter(|doc| query.order_by.iter().all(|o| doc.get(&o.field).is_some()))
        .collect();

    docs.sort_by(|a, b| compare_docs(a, b, query));

    if let Some(cursor) = cursor {
        docs.retain(|doc| compare_docs(doc, cursor, query) == Ordering::Greater);
    }

    if let Some(limit) = query.limit {
        docs.truncate(limit);
    }

    if !query.select.is_empty() {
        for doc in &mut docs {
            doc.fields = project(&doc.fields, &query.select);
        }
    }

    docs
}

fn compare_docs(a: &Document, b: &Document, query: &Query) -> Ordering {
    for order in &query.order_by {
        let ord = match (a.get(&order.field), b.get(&order.field)) {
            (Some(x), Some(y)) => compare_values(x, y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ord = apply(order.direction, ord);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    let tie_direction = query
        .order_by
        .last()
        .map(|o| o.direction)
        .unwrap_or_default();
    apply(tie_direction, a.id.as_str().cmp(b.id.as_str()))
}

fn apply(direction: Direction, ord: Ordering) -> Ordering {
    match direction {
        Direction::Ascending => ord,
        Direction::Descending => ord.reverse(),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: null < bool < number < string < array < object.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y) {
                let ord = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_numbers(x: &serde_json::Number, y: &serde_json::Number) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a.cmp(&b);
    }
    let a = x.as_f64().unwrap_or(f64::NAN);
    let b = y.as_f64().unwrap_or(f64::NAN);
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Ordering::Equal
}

fn matches(doc: &Document, predicate: &Predicate) -> bool {
    let Some(value) = get_path(&doc.fields, &predicate.field) else {
        return false;
    };
    let operand = &predicate.value;
    let list = operand.as_array().map(Vec::as_slice).unwrap_or_default();

    match predicate.op {
        Operator::Equal => equal(value, operand),
        Operator::NotEqual => !value.is_null() && !equal(value, operand),
        Operator::LessThan => comparable(value, operand) && compare_values(value, operand).is_lt(),
        Operator::LessThanOrEqual => {
            comparable(value, operand) && compare_values(value, operand).is_le()
        }
        Operator::GreaterThan => {
            comparable(value, operand) && compare_values(value, operand).is_gt()
        }
        Operator::GreaterThanOrEqual => {
            comparable(value, operand) && compare_values(value, operand).is_ge()
        }
        Operator::In => list.iter().any(|v| equal(value, v)),
        Operator::NotIn => !value.is_null() && !list.iter().any(|v| equal(value, v)),
        Operator::ArrayContains => value
            .as_array()
            .is_some_and(|items| items.iter().any(|v| equal(v, operand))),
        Operator::ArrayContainsAny => value
            .as_array()
            .is_some_and(|items| items.iter().any(|v| list.iter().any(|w| equal(v, w)))),
    }
}

/// Range comparisons only match values of the same type.
fn comparable(a: &Value, b: &Value) -> bool {
    type_rank(a) == type_rank(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docrepo_core::query::OrderBy;
    use docrepo_core::types::DocumentId;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> Document {
        Document {
            id: DocumentId::new(id).unwrap(),
            fields: fields.as_object().cloned().unwrap(),
            create_time: Utc::now(),
            update_time: Utc::now(),
        }
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn value_ordering_across_types() {
        let ordered = [
            json!(null),
            json!(false),
            json!(true),
            json!(-1),
            json!(2.5),
            json!(10),
            json!("a"),
            json!("b"),
            json!([1]),
            json!([1, 2]),
            json!({"a": 1}),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(compare_values(&pair[0], &pair[1]), Ordering::Less, "{:?}", pair);
        }
        assert_eq!(compare_values(&json!(1), &json!(1.0)), Ordering::Equal);
    }

    #[test]
    fn predicates() {
        let d = doc("a", json!({"age": 30, "tags": ["x", "y"], "name": "n", "nil": null}));
        let check = |field: &str, op: Operator, value: Value| {
            matches(&d, &Predicate::new(field, op, value))
        };

        assert!(check("age", Operator::Equal, json!(30)));
        assert!(check("age", Operator::NotEqual, json!(31)));
        assert!(!check("nil", Operator::NotEqual, json!(1)));
        assert!(check("age", Operator::GreaterThan, json!(29)));
        assert!(!check("age", Operator::GreaterThan, json!("29")));
        assert!(check("age", Operator::LessThanOrEqual, json!(30)));
        assert!(check("age", Operator::In, json!([1, 30])));
        assert!(check("age", Operator::NotIn, json!([1, 2])));
        assert!(check("tags", Operator::ArrayContains, json!("x")));
        assert!(check("tags", Operator::ArrayContainsAny, json!(["z", "y"])));
        assert!(!check("missing", Operator::NotEqual, json!(1)));
    }

    #[test]
    fn validate_rejects_scalar_in_operand() {
        let q = Query::new().filter(Predicate::new("a", Operator::In, 1));
        assert!(validate(&q).is_err());
    }

    #[test]
    fn order_then_id_tiebreak() {
        let docs = vec![
            doc("c", json!({"n": 1})),
            doc("a", json!({"n": 2})),
            doc("b", json!({"n": 1})),
            doc("d", json!({})),
        ];
        let q = Query::new().order_by(OrderBy::asc("n"));
        assert_eq!(ids(&execute(docs.clone(), &q, None)), vec!["b", "c", "a"]);

        let q = Query::new().order_by(OrderBy::desc("n"));
        assert_eq!(ids(&execute(docs, &q, None)), vec!["a", "c", "b"]);
    }

    #[test]
    fn cursor_resumes_strictly_after() {
        let docs: Vec<_> = (0..5).map(|i| doc(&format!("k{}", i), json!({"n": i}))).collect();
        let q = Query::new().order_by(OrderBy::asc("n")).limit(2);
        let cursor = docs[1].clone();
        assert_eq!(ids(&execute(docs, &q, Some(&cursor))), vec!["k2", "k3"]);
    }

    #[test]
    fn select_projects_fields() {
        let docs = vec![doc("a", json!({"x": 1, "y": 2}))];
        let q = Query::new().select(["x"]);
        let out = execute(docs, &q, None);
        assert_eq!(Value::Object(out[0].fields.clone()), json!({"x": 1}));
    }
}
