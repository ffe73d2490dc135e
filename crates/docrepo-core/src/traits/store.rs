//! Document store trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::document::{Document, FieldUpdate, Fields, WriteResult};
use crate::query::Query;
use crate::types::{CollectionName, DocumentId};
use crate::Result;

use super::Transaction;

/// Stream of documents produced by a query.
pub type DocumentStream = Pin<Box<dyn Stream<Item = Result<Document>> + Send>>;

/// A schemaless document store addressed by collection and key.
///
/// Implementations never retry internally; every failure is surfaced to the
/// caller as-is.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Transaction handle type for this store.
    type Transaction: Transaction;

    /// Allocate a fresh key for an auto-id create.
    fn new_id(&self) -> DocumentId {
        DocumentId::generate()
    }

    /// Fetch a document, `None` if absent.
    async fn get(&self, collection: &CollectionName, id: &DocumentId) -> Result<Option<Document>>;

    /// Create a document. Fails with [`Error::AlreadyExists`](crate::Error::AlreadyExists)
    /// if the key is taken.
    async fn create(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<WriteResult>;

    /// Write the whole document, creating it if absent.
    async fn replace(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<WriteResult>;

    /// Apply field-path assignments. Fails with
    /// [`Error::NotFound`](crate::Error::NotFound) if the document is absent.
    async fn update_fields(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        updates: Vec<FieldUpdate>,
    ) -> Result<WriteResult>;

    /// Delete a document. Returns whether it existed.
    async fn delete(&self, collection: &CollectionName, id: &DocumentId) -> Result<bool>;

    /// Run a query, streaming matching documents in query order.
    async fn query(&self, collection: &CollectionName, query: &Query) -> Result<DocumentStream>;

    /// Begin an atomic multi-document transaction.
    async fn begin(&self) -> Result<Self::Transaction>;
}
