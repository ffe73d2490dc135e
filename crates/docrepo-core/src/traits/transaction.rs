//! Transaction trait.

use async_trait::async_trait;

use crate::document::{Document, FieldUpdate, Fields, WriteResult};
use crate::types::{CollectionName, DocumentId};
use crate::Result;

/// An atomic batch of writes.
///
/// Reads observe committed state. Writes are buffered and applied together on
/// [`commit`](Transaction::commit); if any of them fails none is applied.
/// Dropping a transaction without committing discards it.
#[async_trait]
pub trait Transaction: Send {
    /// Read a document as of the transaction.
    async fn get(&mut self, collection: &CollectionName, id: &DocumentId)
    -> Result<Option<Document>>;

    /// Buffer a create; commit fails if the key is taken.
    fn create(&mut self, collection: &CollectionName, id: &DocumentId, fields: Fields);

    /// Buffer a full-document write.
    fn replace(&mut self, collection: &CollectionName, id: &DocumentId, fields: Fields);

    /// Buffer field-path assignments; commit fails if the document is absent.
    fn update_fields(
        &mut self,
        collection: &CollectionName,
        id: &DocumentId,
        updates: Vec<FieldUpdate>,
    );

    /// Buffer a delete.
    fn delete(&mut self, collection: &CollectionName, id: &DocumentId);

    /// Number of buffered writes.
    fn len(&self) -> usize;

    /// Returns true when no writes are buffered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply every buffered write atomically, returning one result per write
    /// in the order they were buffered.
    async fn commit(self) -> Result<Vec<WriteResult>>;

    /// Discard the transaction.
    async fn rollback(self) -> Result<()>;
}
