//! Stored document types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::DocumentId;

/// The payload of a document: a JSON object keyed by wire name.
pub type Fields = serde_json::Map<String, Value>;

/// A document as held by the store.
///
/// `create_time` and `update_time` are owned by the store and live outside the
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The document key.
    pub id: DocumentId,
    /// The document payload.
    pub fields: Fields,
    /// When the document was first created.
    pub create_time: DateTime<Utc>,
    /// When the document was last written.
    pub update_time: DateTime<Utc>,
}

impl Document {
    /// Look up a value by dot-separated field path.
    ///
    /// ```
    /// use docrepo_core::{Document, DocumentId};
    /// use serde_json::json;
    ///
    /// let fields = json!({"address": {"city": "Oslo"}});
    /// let doc = Document {
    ///     id: DocumentId::new("a").unwrap(),
    ///     fields: fields.as_object().unwrap().clone(),
    ///     create_time: chrono::Utc::now(),
    ///     update_time: chrono::Utc::now(),
    /// };
    /// assert_eq!(doc.get("address.city"), Some(&json!("Oslo")));
    /// ```
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.fields, path)
    }
}

/// Resolve a dot-separated path inside a field map.
pub fn get_path<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write a value at a dot-separated path, creating intermediate objects.
///
/// Non-object intermediate values are replaced by objects.
pub fn set_path(fields: &mut Fields, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            fields.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = fields
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Fields::new()));
            if !entry.is_object() {
                *entry = Value::Object(Fields::new());
            }
            if let Value::Object(child) = entry {
                set_path(child, rest, value);
            }
        }
    }
}

/// Keep only the given paths of a field map.
pub fn project(fields: &Fields, paths: &[String]) -> Fields {
    let mut out = Fields::new();
    for path in paths {
        if let Some(value) = get_path(fields, path) {
            set_path(&mut out, path, value.clone());
        }
    }
    out
}

/// A single field-path assignment for a partial update.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    /// Dot-separated field path.
    pub path: String,
    /// New value.
    pub value: Value,
}

impl FieldUpdate {
    /// Create a new field update.
    pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }
}

/// The outcome of a single successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult {
    /// Key of the written document.
    pub id: DocumentId,
    /// Creation time of the document after the write.
    pub create_time: DateTime<Utc>,
    /// Store-assigned time of the write.
    pub update_time: DateTime<Utc>,
}
