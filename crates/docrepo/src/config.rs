//! Per-entity repository configuration.

use docrepo_core::types::CollectionName;
use docrepo_core::Result;

/// Where an entity is stored and which fields carry tracked roles.
///
/// Field names refer to the declared field names of the entity. An unset
/// identifier falls back to the field tagged [`ID_TAG`](crate::ID_TAG).
#[derive(Debug, Clone)]
pub struct EntityConfig {
    pub(crate) collection: CollectionName,
    pub(crate) id_field: Option<String>,
    pub(crate) created_at_field: Option<String>,
    pub(crate) updated_at_field: Option<String>,
    pub(crate) version_field: Option<String>,
}

impl EntityConfig {
    /// Configuration for the given collection with no tracked fields.
    ///
    /// ```
    /// use docrepo::EntityConfig;
    ///
    /// let config = EntityConfig::new("users")
    ///     .unwrap()
    ///     .version("version")
    ///     .updated_at("updated_at");
    /// assert_eq!(config.collection().as_str(), "users");
    /// ```
    pub fn new(collection: impl Into<String>) -> Result<Self> {
        Ok(Self::for_collection(CollectionName::new(collection)?))
    }

    pub fn for_collection(collection: CollectionName) -> Self {
        Self {
            collection,
            id_field: None,
            created_at_field: None,
            updated_at_field: None,
            version_field: None,
        }
    }

    pub fn id(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    pub fn created_at(mut self, field: impl Into<String>) -> Self {
        self.created_at_field = Some(field.into());
        self
    }

    pub fn updated_at(mut self, field: impl Into<String>) -> Self {
        self.updated_at_field = Some(field.into());
        self
    }

    pub fn version(mut self, field: impl Into<String>) -> Self {
        self.version_field = Some(field.into());
        self
    }

    pub fn collection(&self) -> &CollectionName {
        &self.collection
    }
}
