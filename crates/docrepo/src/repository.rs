//! CRUD with optimistic concurrency.

use std::ops::Deref;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use docrepo_core::document::{Document, FieldUpdate, Fields, WriteResult};
use docrepo_core::error::{Error, InvalidInputError, TransportError};
use docrepo_core::traits::{DocumentStore, Transaction};
use docrepo_core::types::DocumentId;
use docrepo_core::Result;

use crate::codec::version_text;
use crate::config::EntityConfig;
use crate::descriptor::Descriptor;
use crate::loader::Loader;
use crate::outcome::Outcome;
use crate::schema::Entity;

/// Commit a transaction holding exactly one write.
pub(crate) async fn commit_one<T: Transaction>(tx: T) -> Result<WriteResult> {
    tx.commit().await?.pop().ok_or_else(|| {
        Error::Transport(TransportError::Protocol {
            message: "commit returned no write result".to_string(),
        })
    })
}

/// Single-document reads and writes for one entity type.
///
/// Every check-then-write (update, save, patch) runs in one store
/// transaction. With a version field configured, writes must present the
/// stored version and advance it by one; a mismatch yields
/// [`Outcome::Conflict`].
///
/// Read operations come from the wrapped [`Loader`].
pub struct Repository<E, S> {
    loader: Loader<E, S>,
}

impl<E, S> Clone for Repository<E, S> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
        }
    }
}

impl<E, S> Deref for Repository<E, S> {
    type Target = Loader<E, S>;

    fn deref(&self) -> &Self::Target {
        &self.loader
    }
}

impl<E: Entity, S: DocumentStore> Repository<E, S> {
    /// Resolve `E` and bind it to a store.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error if the entity has no identifier field.
    pub fn new(store: Arc<S>, config: EntityConfig) -> Result<Self> {
        Self::from_loader(Loader::new(store, config)?)
    }

    pub fn from_loader(loader: Loader<E, S>) -> Result<Self> {
        loader.descriptor().require_id()?;
        Ok(Self { loader })
    }

    pub fn loader(&self) -> &Loader<E, S> {
        &self.loader
    }

    fn desc(&self) -> &Descriptor<E> {
        self.loader.descriptor()
    }

    /// Create a document from an entity.
    ///
    /// An empty identifier is replaced by a store-allocated key, written back
    /// onto the entity. The version, if any, starts at 1. A taken key is
    /// [`Outcome::Unaffected`].
    #[instrument(skip(self, entity), fields(entity = self.desc().entity()))]
    pub async fn create(&self, entity: &mut E) -> Result<Outcome> {
        let desc = self.desc();
        let slot = desc.require_id()?;

        let id = if slot.get(entity).is_empty() {
            let id = self.store().new_id();
            slot.set(entity, &id);
            id
        } else {
            slot.require(entity)?
        };

        let previous = match &desc.version {
            Some(slot) => {
                let previous = slot.get(entity);
                slot.set(entity, 1)?;
                Some(previous)
            }
            None => None,
        };

        let written: Result<WriteResult> = async {
            let fields = desc.encode(entity)?;
            self.store().create(desc.collection(), &id, fields).await
        }
        .await;

        match written {
            Ok(write) => {
                desc.bind_write(entity, &write);
                debug!(%id, "Created entity");
                Ok(Outcome::Applied)
            }
            Err(err) => {
                self.restore_version(entity, previous);
                if err.is_already_exists() {
                    debug!(%id, "Entity already exists");
                    Ok(Outcome::Unaffected)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Replace an existing document.
    ///
    /// An absent document is [`Outcome::Unaffected`]. An empty identifier is
    /// an input error.
    #[instrument(skip(self, entity), fields(entity = self.desc().entity()))]
    pub async fn update(&self, entity: &mut E) -> Result<Outcome> {
        let desc = self.desc();
        let id = desc.require_id()?.require(entity)?;

        let mut tx = self.store().begin().await?;
        match tx.get(desc.collection(), &id).await? {
            Some(current) => self.replace_checked(tx, entity, &id, &current).await,
            None => {
                tx.rollback().await?;
                debug!(%id, "Update target absent");
                Ok(Outcome::Unaffected)
            }
        }
    }

    /// Create or replace.
    ///
    /// An empty identifier always creates. Otherwise the stored document is
    /// read first: absent creates with version 1, present follows the update
    /// rules including the version check.
    #[instrument(skip(self, entity), fields(entity = self.desc().entity()))]
    pub async fn save(&self, entity: &mut E) -> Result<Outcome> {
        let desc = self.desc();
        let slot = desc.require_id()?;
        if slot.get(entity).is_empty() {
            return self.create(entity).await;
        }
        let id = slot.require(entity)?;

        let mut tx = self.store().begin().await?;
        match tx.get(desc.collection(), &id).await? {
            Some(current) => self.replace_checked(tx, entity, &id, &current).await,
            None => self.create_in(tx, entity, &id).await,
        }
    }

    /// Apply a partial update given as serialized keys.
    ///
    /// The identifier key is taken out of `fields` for the duration of the
    /// call. With a version field, `fields` must carry the version read by the
    /// caller; on success it is advanced in place and the updated-at key, if
    /// configured, is set to the store's write time.
    #[instrument(skip(self, fields), fields(entity = self.desc().entity()))]
    pub async fn patch(&self, fields: &mut Fields) -> Result<Outcome> {
        let id_key = self.desc().require_id()?.json.clone();
        let Some(raw_id) = fields.remove(&id_key) else {
            return Err(InvalidInputError::MissingField { field: id_key }.into());
        };

        let result = self.patch_fields(fields, &raw_id).await;
        fields.insert(id_key, raw_id);
        result
    }

    /// Delete by key. An absent document is [`Outcome::Unaffected`].
    #[instrument(skip(self), fields(entity = self.desc().entity()))]
    pub async fn delete(&self, id: &str) -> Result<Outcome> {
        let desc = self.desc();
        desc.require_id()?;
        let id = DocumentId::new(id)?;

        if self.store().delete(desc.collection(), &id).await? {
            debug!(%id, "Deleted entity");
            Ok(Outcome::Applied)
        } else {
            Ok(Outcome::Unaffected)
        }
    }

    async fn replace_checked(
        &self,
        mut tx: S::Transaction,
        entity: &mut E,
        id: &DocumentId,
        current: &Document,
    ) -> Result<Outcome> {
        let desc = self.desc();

        let previous = match &desc.version {
            Some(slot) => {
                let stored = version_text(current.fields.get(&slot.wire));
                let supplied = slot.get(entity).to_string();
                if stored != supplied {
                    tx.rollback().await?;
                    debug!(%id, %stored, %supplied, "Version conflict");
                    return Ok(Outcome::Conflict);
                }
                Some(slot.increment(entity)?)
            }
            None => None,
        };

        let written: Result<WriteResult> = async {
            tx.replace(desc.collection(), id, desc.encode(entity)?);
            commit_one(tx).await
        }
        .await;

        match written {
            Ok(write) => {
                desc.bind_write(entity, &write);
                debug!(%id, "Replaced entity");
                Ok(Outcome::Applied)
            }
            Err(err) => {
                self.restore_version(entity, previous);
                Err(err)
            }
        }
    }

    async fn create_in(
        &self,
        mut tx: S::Transaction,
        entity: &mut E,
        id: &DocumentId,
    ) -> Result<Outcome> {
        let desc = self.desc();

        let previous = match &desc.version {
            Some(slot) => {
                let previous = slot.get(entity);
                slot.set(entity, 1)?;
                Some(previous)
            }
            None => None,
        };

        let written: Result<WriteResult> = async {
            tx.create(desc.collection(), id, desc.encode(entity)?);
            commit_one(tx).await
        }
        .await;

        match written {
            Ok(write) => {
                desc.bind_write(entity, &write);
                debug!(%id, "Created entity");
                Ok(Outcome::Applied)
            }
            Err(err) => {
                self.restore_version(entity, previous);
                if err.is_already_exists() {
                    Ok(Outcome::Unaffected)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn patch_fields(&self, fields: &mut Fields, raw_id: &Value) -> Result<Outcome> {
        let desc = self.desc();
        let id = match raw_id {
            Value::String(s) => DocumentId::new(s.as_str())?,
            other => {
                return Err(InvalidInputError::DocumentId {
                    value: other.to_string(),
                    reason: "must be a string".to_string(),
                }
                .into());
            }
        };

        let mut tx = self.store().begin().await?;
        let Some(current) = tx.get(desc.collection(), &id).await? else {
            tx.rollback().await?;
            debug!(%id, "Patch target absent");
            return Ok(Outcome::Unaffected);
        };

        let mut previous = None;
        if let Some(slot) = &desc.version {
            let supplied = fields.get(&slot.json).cloned().ok_or_else(|| {
                Error::from(InvalidInputError::MissingField {
                    field: slot.json.clone(),
                })
            })?;
            let stored = current.fields.get(&slot.wire);
            if version_text(Some(&supplied)) != version_text(stored) {
                tx.rollback().await?;
                debug!(%id, "Version conflict");
                return Ok(Outcome::Conflict);
            }
            fields.insert(slot.json.clone(), next_version(stored.unwrap_or(&Value::Null))?);
            previous = Some((slot.json.clone(), supplied));
        }

        let updates = fields
            .iter()
            .filter(|(key, _)| !desc.is_ignored(key))
            .map(|(key, value)| {
                FieldUpdate::new(desc.wire_name(key).unwrap_or(key), value.clone())
            })
            .collect();
        tx.update_fields(desc.collection(), &id, updates);

        let write = match commit_one(tx).await {
            Ok(write) => write,
            Err(err) => {
                if let Some((key, value)) = previous {
                    fields.insert(key, value);
                }
                return Err(err);
            }
        };

        if let (_, Some(updated_key)) = desc.timestamp_json_names() {
            fields.insert(updated_key.to_string(), serde_json::to_value(write.update_time)?);
        }

        debug!(%id, "Patched entity");
        Ok(Outcome::Applied)
    }

    fn restore_version(&self, entity: &mut E, previous: Option<i64>) {
        if let (Some(slot), Some(previous)) = (&self.desc().version, previous) {
            let _ = slot.set(entity, previous);
        }
    }
}

/// The version value following the stored `current`, keeping its representation.
fn next_version(current: &Value) -> Result<Value> {
    let invalid = || {
        Error::from(InvalidInputError::Other {
            message: format!("version {} is not an integer", current),
        })
    };
    match current {
        Value::Number(n) => {
            let next = n.as_i64().and_then(|v| v.checked_add(1)).ok_or_else(invalid)?;
            Ok(Value::from(next))
        }
        Value::String(s) => {
            let next = s
                .parse::<i64>()
                .ok()
                .and_then(|v| v.checked_add(1))
                .ok_or_else(invalid)?;
            Ok(Value::String(next.to_string()))
        }
        _ => Err(invalid()),
    }
}
