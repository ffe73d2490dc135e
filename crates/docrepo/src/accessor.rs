//! Typed accessors for the tracked field roles.

use chrono::{DateTime, Utc};

use docrepo_core::error::{Error, InvalidInputError};
use docrepo_core::types::DocumentId;
use docrepo_core::Result;

use crate::schema::{IntGetter, IntSetter, IntegerKind};

/// The identifier field of an entity.
pub(crate) struct IdSlot<E> {
    pub(crate) field: String,
    pub(crate) json: String,
    pub(crate) get: fn(&E) -> &str,
    pub(crate) set: fn(&mut E, String),
}

impl<E> IdSlot<E> {
    pub(crate) fn get<'a>(&self, entity: &'a E) -> &'a str {
        (self.get)(entity)
    }

    pub(crate) fn set(&self, entity: &mut E, id: &DocumentId) {
        (self.set)(entity, id.to_string())
    }

    pub(crate) fn clear(&self, entity: &mut E) {
        (self.set)(entity, String::new())
    }

    /// The entity's key; empty and malformed identifiers are rejected.
    pub(crate) fn require(&self, entity: &E) -> Result<DocumentId> {
        DocumentId::new(self.get(entity))
    }
}

/// A created-at or updated-at field.
pub(crate) struct TimeSlot<E> {
    pub(crate) field: String,
    pub(crate) json: String,
    pub(crate) get: fn(&E) -> Option<DateTime<Utc>>,
    pub(crate) set: fn(&mut E, Option<DateTime<Utc>>),
}

impl<E> TimeSlot<E> {
    pub(crate) fn get(&self, entity: &E) -> Option<DateTime<Utc>> {
        (self.get)(entity)
    }

    pub(crate) fn set(&self, entity: &mut E, time: DateTime<Utc>) {
        (self.set)(entity, Some(time))
    }
}

/// The optimistic-concurrency version field.
pub(crate) struct VersionSlot<E> {
    pub(crate) field: String,
    pub(crate) json: String,
    pub(crate) wire: String,
    pub(crate) kind: IntegerKind,
    pub(crate) get: IntGetter<E>,
    pub(crate) set: IntSetter<E>,
}

impl<E> VersionSlot<E> {
    pub(crate) fn get(&self, entity: &E) -> i64 {
        (self.get)(entity)
    }

    pub(crate) fn set(&self, entity: &mut E, version: i64) -> Result<()> {
        if (self.set)(entity, version) {
            Ok(())
        } else {
            Err(self.overflow())
        }
    }

    /// Advance the version by one, returning the previous value.
    pub(crate) fn increment(&self, entity: &mut E) -> Result<i64> {
        let current = self.get(entity);
        let next = current.checked_add(1).ok_or_else(|| self.overflow())?;
        self.set(entity, next)?;
        Ok(current)
    }

    fn overflow(&self) -> Error {
        InvalidInputError::Other {
            message: format!("version field '{}' overflows {}", self.field, self.kind),
        }
        .into()
    }
}
