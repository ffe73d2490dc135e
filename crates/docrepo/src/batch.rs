//! Transactional multi-document writes.

use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

use tracing::{debug, instrument};

use docrepo_core::traits::{DocumentStore, Transaction};
use docrepo_core::types::DocumentId;
use docrepo_core::Result;

use crate::config::EntityConfig;
use crate::descriptor::Descriptor;
use crate::loader::Loader;
use crate::schema::Entity;

/// Per-item outcome of a batch write, as input indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub succeeded: Vec<usize>,
    pub failed: Vec<usize>,
}

impl BatchResult {
    /// Number of items written.
    pub fn count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes sets of entities inside one store transaction.
///
/// Per-item problems (malformed or duplicate key, existence check failing)
/// mark that index as failed and never abort the batch. Store errors abort
/// the whole transaction and are returned as-is.
pub struct BatchWriter<E, S> {
    loader: Loader<E, S>,
}

impl<E, S> Clone for BatchWriter<E, S> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
        }
    }
}

impl<E, S> Deref for BatchWriter<E, S> {
    type Target = Loader<E, S>;

    fn deref(&self) -> &Self::Target {
        &self.loader
    }
}

/// Edits made to caller items while staging, undone if the batch fails.
#[derive(Default)]
struct Edits {
    allocated_ids: Vec<usize>,
    versions: Vec<(usize, i64)>,
}

/// Indices staged for commit, in transaction order.
struct Staged {
    indices: Vec<usize>,
    result: BatchResult,
}

impl Staged {
    fn new() -> Self {
        Self {
            indices: Vec::new(),
            result: BatchResult::default(),
        }
    }

    fn fail(&mut self, index: usize) {
        self.result.failed.push(index);
    }
}

impl<E: Entity, S: DocumentStore> BatchWriter<E, S> {
    pub fn new(store: Arc<S>, config: EntityConfig) -> Result<Self> {
        Self::from_loader(Loader::new(store, config)?)
    }

    pub fn from_loader(loader: Loader<E, S>) -> Result<Self> {
        loader.descriptor().require_id()?;
        Ok(Self { loader })
    }

    fn desc(&self) -> &Descriptor<E> {
        self.loader.descriptor()
    }

    /// Create every item whose key is free.
    ///
    /// Items with an empty identifier get a store-allocated key. Existing,
    /// malformed and repeated keys are reported as failed.
    #[instrument(skip(self, items), fields(entity = self.desc().entity(), items = items.len()))]
    pub async fn create_many(&self, items: &mut [E]) -> Result<BatchResult> {
        let mut edits = Edits::default();
        let result = self.create_staged(items, &mut edits).await;
        if result.is_err() {
            self.revert(items, edits);
        }
        result
    }

    async fn create_staged(&self, items: &mut [E], edits: &mut Edits) -> Result<BatchResult> {
        let desc = self.desc();
        let slot = desc.require_id()?;
        let collection = desc.collection();

        let mut tx = self.store().begin().await?;
        let mut staged = Staged::new();
        let mut seen = HashSet::new();

        for (index, item) in items.iter_mut().enumerate() {
            let id = if slot.get(item).is_empty() {
                let id = self.store().new_id();
                slot.set(item, &id);
                edits.allocated_ids.push(index);
                id
            } else {
                match slot.require(item) {
                    Ok(id) => id,
                    Err(_) => {
                        staged.fail(index);
                        continue;
                    }
                }
            };

            if !seen.insert(id.clone()) || tx.get(collection, &id).await?.is_some() {
                staged.fail(index);
                continue;
            }

            if let Some(version) = &desc.version {
                edits.versions.push((index, version.get(item)));
                version.set(item, 1)?;
            }
            tx.create(collection, &id, desc.encode(item)?);
            staged.indices.push(index);
        }

        self.finish(tx, staged, items).await
    }

    /// Replace every item whose document exists.
    ///
    /// Absent, malformed and repeated keys are reported as failed. When no
    /// item is eligible nothing is committed.
    #[instrument(skip(self, items), fields(entity = self.desc().entity(), items = items.len()))]
    pub async fn update_many(&self, items: &mut [E]) -> Result<BatchResult> {
        let desc = self.desc();
        let collection = desc.collection();

        let mut tx = self.store().begin().await?;
        let mut staged = Staged::new();
        let mut seen = HashSet::new();

        for (index, item) in items.iter().enumerate() {
            let Some(id) = self.keyed(item, &mut seen) else {
                staged.fail(index);
                continue;
            };

            if tx.get(collection, &id).await?.is_none() {
                staged.fail(index);
                continue;
            }

            tx.replace(collection, &id, desc.encode(item)?);
            staged.indices.push(index);
        }

        self.finish(tx, staged, items).await
    }

    /// Create or replace every item.
    ///
    /// Unlike [`Repository::save`](crate::Repository::save), stored versions
    /// are not checked: the last writer wins. New documents start at version 1.
    /// Empty, malformed and repeated keys are reported as failed.
    #[instrument(skip(self, items), fields(entity = self.desc().entity(), items = items.len()))]
    pub async fn save_many(&self, items: &mut [E]) -> Result<BatchResult> {
        let mut edits = Edits::default();
        let result = self.save_staged(items, &mut edits).await;
        if result.is_err() {
            self.revert(items, edits);
        }
        result
    }

    async fn save_staged(&self, items: &mut [E], edits: &mut Edits) -> Result<BatchResult> {
        let desc = self.desc();
        let collection = desc.collection();

        let mut tx = self.store().begin().await?;
        let mut staged = Staged::new();
        let mut seen = HashSet::new();

        for (index, item) in items.iter_mut().enumerate() {
            let Some(id) = self.keyed(item, &mut seen) else {
                staged.fail(index);
                continue;
            };

            if tx.get(collection, &id).await?.is_some() {
                tx.replace(collection, &id, desc.encode(item)?);
            } else {
                if let Some(version) = &desc.version {
                    edits.versions.push((index, version.get(item)));
                    version.set(item, 1)?;
                }
                tx.create(collection, &id, desc.encode(item)?);
            }
            staged.indices.push(index);
        }

        self.finish(tx, staged, items).await
    }

    /// Delete every listed document that exists.
    ///
    /// Absent, malformed and repeated keys are reported as failed.
    #[instrument(skip(self, ids), fields(entity = self.desc().entity(), items = ids.len()))]
    pub async fn delete_many<I: AsRef<str>>(&self, ids: &[I]) -> Result<BatchResult> {
        let collection = self.desc().collection();

        let mut tx = self.store().begin().await?;
        let mut staged = Staged::new();
        let mut seen = HashSet::new();

        for (index, raw) in ids.iter().enumerate() {
            let Ok(id) = DocumentId::new(raw.as_ref()) else {
                staged.fail(index);
                continue;
            };

            if !seen.insert(id.clone()) || tx.get(collection, &id).await?.is_none() {
                staged.fail(index);
                continue;
            }

            tx.delete(collection, &id);
            staged.indices.push(index);
        }

        self.finish(tx, staged, &mut []).await
    }

    /// Undo allocated keys and reset versions after a failed batch.
    fn revert(&self, items: &mut [E], edits: Edits) {
        let desc = self.desc();
        if let Some(slot) = &desc.id {
            for index in edits.allocated_ids {
                slot.clear(&mut items[index]);
            }
        }
        if let Some(slot) = &desc.version {
            for (index, previous) in edits.versions {
                let _ = slot.set(&mut items[index], previous);
            }
        }
    }

    /// The item's key if it is well formed and not yet seen in this batch.
    fn keyed(&self, item: &E, seen: &mut HashSet<DocumentId>) -> Option<DocumentId> {
        let id = self.desc().id.as_ref()?.require(item).ok()?;
        seen.insert(id.clone()).then_some(id)
    }

    async fn finish(
        &self,
        tx: S::Transaction,
        mut staged: Staged,
        items: &mut [E],
    ) -> Result<BatchResult> {
        if staged.indices.is_empty() {
            tx.rollback().await?;
            debug!(failed = staged.result.failed.len(), "Nothing to commit");
            return Ok(staged.result);
        }

        let writes = tx.commit().await?;
        for (index, write) in staged.indices.into_iter().zip(writes.iter()) {
            if let Some(item) = items.get_mut(index) {
                self.desc().bind_write(item, write);
            }
            staged.result.succeeded.push(index);
        }

        debug!(
            succeeded = staged.result.succeeded.len(),
            failed = staged.result.failed.len(),
            "Committed batch"
        );

        Ok(staged.result)
    }
}
