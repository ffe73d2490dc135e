//! Transactions over the file store.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument, warn};

use docrepo_core::document::{Document, FieldUpdate, Fields, WriteResult};
use docrepo_core::error::Error;
use docrepo_core::traits::Transaction;
use docrepo_core::types::{CollectionName, DocumentId};
use docrepo_core::Result;

use crate::store::{FileStore, StagedFile, StoreLock, StoredDocument, apply_updates};

#[derive(Debug)]
enum PendingWrite {
    Create(Fields),
    Replace(Fields),
    Update(Vec<FieldUpdate>),
    Delete,
}

type Key = (CollectionName, DocumentId);

/// A transaction on a [`FileStore`].
///
/// Holds the store lock for its whole life, so no other writer can interleave
/// between its reads and its commit.
pub struct FileTransaction {
    store: FileStore,
    writes: Vec<(Key, PendingWrite)>,
    _lock: StoreLock,
}

impl FileTransaction {
    pub(crate) fn new(store: FileStore, lock: StoreLock) -> Self {
        Self {
            store,
            writes: Vec::new(),
            _lock: lock,
        }
    }

    fn push(&mut self, collection: &CollectionName, id: &DocumentId, write: PendingWrite) {
        self.writes.push(((collection.clone(), id.clone()), write));
    }

    /// Put back what was on disk before the commit for every applied key.
    fn undo(&self, applied: &[&Key], originals: &HashMap<Key, Option<StoredDocument>>) {
        for key in applied.iter().rev() {
            let restored = match originals.get(*key) {
                Some(Some(doc)) => self.store.write(&key.0, doc),
                _ => self.store.remove(&key.0, &key.1).map(|_| ()),
            };
            if let Err(err) = restored {
                warn!(collection = %key.0, id = %key.1, error = %err, "Failed to undo write");
            }
        }
    }
}

#[async_trait]
impl Transaction for FileTransaction {
    async fn get(
        &mut self,
        collection: &CollectionName,
        id: &DocumentId,
    ) -> Result<Option<Document>> {
        self.store
            .read(collection, id)?
            .map(StoredDocument::into_document)
            .transpose()
    }

    fn create(&mut self, collection: &CollectionName, id: &DocumentId, fields: Fields) {
        self.push(collection, id, PendingWrite::Create(fields));
    }

    fn replace(&mut self, collection: &CollectionName, id: &DocumentId, fields: Fields) {
        self.push(collection, id, PendingWrite::Replace(fields));
    }

    fn update_fields(
        &mut self,
        collection: &CollectionName,
        id: &DocumentId,
        updates: Vec<FieldUpdate>,
    ) {
        self.push(collection, id, PendingWrite::Update(updates));
    }

    fn delete(&mut self, collection: &CollectionName, id: &DocumentId) {
        self.push(collection, id, PendingWrite::Delete);
    }

    fn len(&self) -> usize {
        self.writes.len()
    }

    #[instrument(skip(self), fields(writes = self.writes.len()))]
    async fn commit(mut self) -> Result<Vec<WriteResult>> {
        let now = Utc::now();
        let mut staged: HashMap<Key, Option<StoredDocument>> = HashMap::new();
        let mut originals: HashMap<Key, Option<StoredDocument>> = HashMap::new();
        let mut touched: Vec<Key> = Vec::new();
        let mut results = Vec::with_capacity(self.writes.len());

        // Resolve every write in memory first so a failing write aborts the
        // whole commit before anything touches disk.
        let writes = std::mem::take(&mut self.writes);
        for (key, write) in writes {
            let slot = match staged.entry(key.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let current = self.store.read(&key.0, &key.1)?;
                    originals.insert(key.clone(), current.clone());
                    touched.push(key.clone());
                    entry.insert(current)
                }
            };

            let (collection, id) = &key;
            match write {
                PendingWrite::Create(fields) => {
                    if slot.is_some() {
                        return Err(Error::AlreadyExists {
                            collection: collection.to_string(),
                            id: id.to_string(),
                        });
                    }
                    let doc = StoredDocument {
                        id: id.to_string(),
                        create_time: now,
                        update_time: now,
                        fields,
                    };
                    results.push(doc.write_result(id));
                    *slot = Some(doc);
                }
                PendingWrite::Replace(fields) => {
                    let create_time = slot.as_ref().map(|d| d.create_time).unwrap_or(now);
                    let doc = StoredDocument {
                        id: id.to_string(),
                        create_time,
                        update_time: now,
                        fields,
                    };
                    results.push(doc.write_result(id));
                    *slot = Some(doc);
                }
                PendingWrite::Update(updates) => {
                    let doc = slot.as_mut().ok_or_else(|| Error::NotFound {
                        collection: collection.to_string(),
                        id: id.to_string(),
                    })?;
                    apply_updates(doc, updates, now);
                    results.push(doc.write_result(id));
                }
                PendingWrite::Delete => {
                    let create_time = slot.as_ref().map(|d| d.create_time).unwrap_or(now);
                    results.push(WriteResult {
                        id: id.clone(),
                        create_time,
                        update_time: now,
                    });
                    *slot = None;
                }
            }
        }

        // Every surviving document goes to its temp file before any of them
        // becomes visible.
        let mut prepared: Vec<(&Key, Option<StagedFile>)> = Vec::with_capacity(touched.len());
        for key in &touched {
            let file = match staged.get(key) {
                Some(Some(doc)) => match self.store.stage(&key.0, doc) {
                    Ok(file) => Some(file),
                    Err(err) => {
                        prepared.iter().flat_map(|(_, f)| f).for_each(StagedFile::discard);
                        return Err(err);
                    }
                },
                _ => None,
            };
            prepared.push((key, file));
        }

        let mut applied: Vec<&Key> = Vec::with_capacity(prepared.len());
        let mut pending = prepared.into_iter();
        while let Some((key, file)) = pending.next() {
            let done = match file {
                Some(file) => file.install(),
                None => self.store.remove(&key.0, &key.1).map(|_| ()),
            };
            if let Err(err) = done {
                pending.flat_map(|(_, f)| f).for_each(|f| f.discard());
                self.undo(&applied, &originals);
                return Err(err);
            }
            applied.push(key);
        }

        debug!(documents = touched.len(), "Committed transaction");

        Ok(results)
    }

    async fn rollback(self) -> Result<()> {
        debug!(discarded = self.writes.len(), "Rolled back transaction");
        Ok(())
    }
}
