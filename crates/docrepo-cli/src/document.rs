//! Schemaless document entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use docrepo::{Entity, Field, ID_TAG};

/// Any JSON object, with its key and store timestamps lifted out.
///
/// The underscore-prefixed keys are bound from document metadata and never
/// stored in the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(rename = "_created_at", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(rename = "_updated_at", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entity for RawDocument {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::text("id", |d: &Self| &d.id, |d: &mut Self, v| d.id = v)
                .rename("_id")
                .tag(ID_TAG)
                .ignored(),
            Field::timestamp("created_at", |d: &Self| d.created_at, |d: &mut Self, v| {
                d.created_at = v
            })
            .rename("_created_at")
            .ignored(),
            Field::timestamp("updated_at", |d: &Self| d.updated_at, |d: &mut Self, v| {
                d.updated_at = v
            })
            .rename("_updated_at")
            .ignored(),
        ]
    }

    fn entity_name() -> &'static str {
        "document"
    }
}

/// Parse one JSON object into a document.
pub fn parse(text: &str) -> serde_json::Result<RawDocument> {
    serde_json::from_str(text)
}
