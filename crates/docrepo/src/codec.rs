//! Entity payload mapping.
//!
//! Entities are serialized with serde and their keys translated through the
//! descriptor's wire table. Identifier and timestamps are never read from the
//! payload; they are bound from document metadata instead.

use chrono::{DateTime, Utc};
use serde_json::Value;

use docrepo_core::document::{Document, Fields, WriteResult};
use docrepo_core::error::Error;
use docrepo_core::types::DocumentId;
use docrepo_core::Result;

use crate::descriptor::Descriptor;
use crate::schema::Entity;

impl<E: Entity> Descriptor<E> {
    /// Serialize an entity into a store payload.
    pub fn encode(&self, entity: &E) -> Result<Fields> {
        match serde_json::to_value(entity)? {
            Value::Object(map) => Ok(self.to_wire(map)),
            other => Err(Error::Codec {
                message: format!(
                    "{} must serialize to an object, got {}",
                    self.entity(),
                    kind_of(&other)
                ),
            }),
        }
    }

    /// Rebuild an entity from a stored document.
    pub fn decode(&self, doc: Document) -> Result<E> {
        let map: Fields = doc
            .fields
            .into_iter()
            .map(|(key, value)| match self.json_name(&key) {
                Some(json) => (json.to_string(), value),
                None => (key, value),
            })
            .collect();
        let mut entity: E = serde_json::from_value(Value::Object(map))?;
        self.bind(&mut entity, &doc.id, doc.create_time, doc.update_time);
        Ok(entity)
    }

    /// Bind identifier and store timestamps onto an entity.
    pub fn bind(
        &self,
        entity: &mut E,
        id: &DocumentId,
        create_time: DateTime<Utc>,
        update_time: DateTime<Utc>,
    ) {
        if let Some(slot) = &self.id {
            slot.set(entity, id);
        }
        if let Some(slot) = &self.created_at {
            slot.set(entity, create_time);
        }
        if let Some(slot) = &self.updated_at {
            slot.set(entity, update_time);
        }
    }

    pub(crate) fn bind_write(&self, entity: &mut E, write: &WriteResult) {
        self.bind(entity, &write.id, write.create_time, write.update_time);
    }
}

impl<E> Descriptor<E> {
    /// Translate serialized keys to store-native names, dropping ignored
    /// fields. Keys outside the wire table pass through unchanged.
    pub fn to_wire(&self, map: Fields) -> Fields {
        map.into_iter()
            .filter(|(key, _)| !self.is_ignored(key))
            .map(|(key, value)| match self.wire_name(&key) {
                Some(wire) => (wire.to_string(), value),
                None => (key, value),
            })
            .collect()
    }
}

/// Decimal text of a stored version value.
///
/// Versions are compared as text so that integer widths on either side never
/// matter: numbers render in their decimal form, strings are taken as-is and
/// anything else (including a missing value) is empty.
pub fn version_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
