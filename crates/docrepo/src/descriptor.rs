//! Entity metadata resolution.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

use docrepo_core::error::{ConfigError, Error};
use docrepo_core::types::CollectionName;
use docrepo_core::Result;

use crate::accessor::{IdSlot, TimeSlot, VersionSlot};
use crate::config::EntityConfig;
use crate::schema::{Access, Entity, Field, FieldKind, ID_TAG};

/// Resolved, immutable storage metadata for one entity type.
///
/// Built once by [`Descriptor::resolve`]; every repository, searcher and
/// writer shares it afterwards.
pub struct Descriptor<E> {
    entity: &'static str,
    collection: CollectionName,
    pub(crate) id: Option<IdSlot<E>>,
    pub(crate) created_at: Option<TimeSlot<E>>,
    pub(crate) updated_at: Option<TimeSlot<E>>,
    pub(crate) version: Option<VersionSlot<E>>,
    wire_names: HashMap<String, String>,
    json_names: HashMap<String, String>,
    ignored: HashSet<String>,
}

impl<E: Entity> Descriptor<E> {
    /// Resolve the descriptor of `E` under the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when a configured field does not exist
    /// or a role is assigned to a field of the wrong kind. An entity without
    /// an identifier is accepted; identity-bound operations reject it later.
    pub fn resolve(config: &EntityConfig) -> Result<Self> {
        let entity = E::entity_name();
        let fields = E::fields();

        let id_field = match &config.id_field {
            Some(name) => Some(find(entity, &fields, name)?),
            None => fields.iter().find(|f| f.has_tag(ID_TAG)),
        };
        let id = id_field
            .map(|field| match &field.access {
                Access::Text { get, set } => Ok(IdSlot {
                    field: field.name.clone(),
                    json: field.json_name().to_string(),
                    get: *get,
                    set: *set,
                }),
                _ => Err(kind_error(entity, field, "identifier", FieldKind::Text)),
            })
            .transpose()?;

        let created_at = time_slot(entity, &fields, config.created_at_field.as_deref(), "created-at")?;
        let updated_at = time_slot(entity, &fields, config.updated_at_field.as_deref(), "updated-at")?;

        let version = config
            .version_field
            .as_deref()
            .map(|name| {
                let field = find(entity, &fields, name)?;
                match &field.access {
                    Access::Integer { kind, get, set } => Ok(VersionSlot {
                        field: field.name.clone(),
                        json: field.json_name().to_string(),
                        wire: field.store_name().to_string(),
                        kind: *kind,
                        get: get.clone(),
                        set: set.clone(),
                    }),
                    _ => Err(Error::from(ConfigError::FieldType {
                        entity: entity.to_string(),
                        field: field.name.clone(),
                        role: "version".to_string(),
                        expected: "integer (i8, i16, i32 or i64)".to_string(),
                        found: field.kind().to_string(),
                    })),
                }
            })
            .transpose()?;

        let mut wire_names = HashMap::new();
        let mut json_names = HashMap::new();
        let mut ignored = HashSet::new();
        for field in &fields {
            if field.is_ignored() {
                ignored.insert(field.json_name().to_string());
                continue;
            }
            wire_names.insert(field.json_name().to_string(), field.store_name().to_string());
            json_names.insert(field.store_name().to_string(), field.json_name().to_string());
        }

        debug!(
            entity,
            collection = %config.collection,
            id = id.as_ref().map(|s| s.field.as_str()),
            version = version.as_ref().map(|s| s.field.as_str()),
            "Resolved entity descriptor"
        );

        Ok(Self {
            entity,
            collection: config.collection.clone(),
            id,
            created_at,
            updated_at,
            version,
            wire_names,
            json_names,
            ignored,
        })
    }
}

impl<E> Descriptor<E> {
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn collection(&self) -> &CollectionName {
        &self.collection
    }

    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }

    pub fn has_version(&self) -> bool {
        self.version.is_some()
    }

    /// Serialized key of the identifier field.
    pub fn id_json_name(&self) -> Option<&str> {
        self.id.as_ref().map(|s| s.json.as_str())
    }

    /// Serialized key of the version field.
    pub fn version_json_name(&self) -> Option<&str> {
        self.version.as_ref().map(|s| s.json.as_str())
    }

    /// Serialized keys of the created-at and updated-at fields.
    pub fn timestamp_json_names(&self) -> (Option<&str>, Option<&str>) {
        (
            self.created_at.as_ref().map(|s| s.json.as_str()),
            self.updated_at.as_ref().map(|s| s.json.as_str()),
        )
    }

    /// The tracked created-at and updated-at values of an entity.
    pub fn timestamps(&self, entity: &E) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (
            self.created_at.as_ref().and_then(|s| s.get(entity)),
            self.updated_at.as_ref().and_then(|s| s.get(entity)),
        )
    }

    /// Store-native name for a serialized key, if the field is stored.
    pub fn wire_name(&self, json: &str) -> Option<&str> {
        self.wire_names.get(json).map(String::as_str)
    }

    /// Serialized key for a store-native name.
    pub fn json_name(&self, wire: &str) -> Option<&str> {
        self.json_names.get(wire).map(String::as_str)
    }

    /// Whether a serialized key belongs to an ignored field.
    pub fn is_ignored(&self, json: &str) -> bool {
        self.ignored.contains(json)
    }

    /// The identifier slot, or a configuration error.
    pub(crate) fn require_id(&self) -> Result<&IdSlot<E>> {
        self.id.as_ref().ok_or_else(|| {
            ConfigError::MissingIdField {
                entity: self.entity.to_string(),
            }
            .into()
        })
    }
}

impl<E> fmt::Debug for Descriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("entity", &self.entity)
            .field("collection", &self.collection)
            .field("id", &self.id.as_ref().map(|s| &s.field))
            .field("created_at", &self.created_at.as_ref().map(|s| &s.field))
            .field("updated_at", &self.updated_at.as_ref().map(|s| &s.field))
            .field("version", &self.version.as_ref().map(|s| &s.field))
            .field("wire_names", &self.wire_names)
            .finish()
    }
}

fn find<'a, E>(entity: &str, fields: &'a [Field<E>], name: &str) -> Result<&'a Field<E>> {
    fields.iter().find(|f| f.name == name).ok_or_else(|| {
        ConfigError::UnknownField {
            entity: entity.to_string(),
            field: name.to_string(),
        }
        .into()
    })
}

fn kind_error<E>(entity: &str, field: &Field<E>, role: &str, expected: FieldKind) -> Error {
    ConfigError::FieldType {
        entity: entity.to_string(),
        field: field.name.clone(),
        role: role.to_string(),
        expected: expected.to_string(),
        found: field.kind().to_string(),
    }
    .into()
}

fn time_slot<E>(
    entity: &str,
    fields: &[Field<E>],
    name: Option<&str>,
    role: &str,
) -> Result<Option<TimeSlot<E>>> {
    let Some(name) = name else {
        return Ok(None);
    };
    let field = find(entity, fields, name)?;
    match &field.access {
        Access::Timestamp { get, set } => Ok(Some(TimeSlot {
            field: field.name.clone(),
            json: field.json_name().to_string(),
            get: *get,
            set: *set,
        })),
        _ => Err(kind_error(entity, field, role, FieldKind::Timestamp)),
    }
}
