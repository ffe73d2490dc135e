//! Read-only access to a collection.

use std::sync::Arc;

use futures_util::TryStreamExt;
use serde_json::Value;
use tracing::{instrument, warn};

use docrepo_core::document::Document;
use docrepo_core::query::{Operator, Predicate, Query};
use docrepo_core::traits::DocumentStore;
use docrepo_core::types::DocumentId;
use docrepo_core::Result;

use crate::config::EntityConfig;
use crate::descriptor::Descriptor;
use crate::schema::Entity;

/// Post-decode hook applied to every loaded entity.
pub type MapFn<E> = Arc<dyn Fn(&mut E) + Send + Sync>;

/// Reads entities of one type from a document store.
///
/// Works without an identifier field, in which case only [`all`](Loader::all),
/// [`query`](Loader::query) and [`find_in`](Loader::find_in) are usable.
pub struct Loader<E, S> {
    store: Arc<S>,
    descriptor: Arc<Descriptor<E>>,
    map: Option<MapFn<E>>,
}

impl<E, S> Clone for Loader<E, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            descriptor: self.descriptor.clone(),
            map: self.map.clone(),
        }
    }
}

impl<E: Entity, S: DocumentStore> Loader<E, S> {
    /// Resolve `E` and bind it to a store.
    pub fn new(store: Arc<S>, config: EntityConfig) -> Result<Self> {
        let descriptor = Descriptor::resolve(&config)?;
        if !descriptor.has_id() {
            warn!(
                entity = descriptor.entity(),
                "No identifier field; load, exist and writes are unavailable"
            );
        }
        Ok(Self::from_parts(store, Arc::new(descriptor)))
    }

    /// Build from an already resolved descriptor.
    pub fn from_parts(store: Arc<S>, descriptor: Arc<Descriptor<E>>) -> Self {
        Self {
            store,
            descriptor,
            map: None,
        }
    }

    /// Install a hook run on every entity after it is decoded.
    pub fn with_map(mut self, map: impl Fn(&mut E) + Send + Sync + 'static) -> Self {
        self.map = Some(Arc::new(map));
        self
    }

    pub fn descriptor(&self) -> &Arc<Descriptor<E>> {
        &self.descriptor
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Decode a document and run the map hook.
    pub(crate) fn hydrate(&self, doc: Document) -> Result<E> {
        let mut entity = self.descriptor.decode(doc)?;
        if let Some(map) = &self.map {
            map(&mut entity);
        }
        Ok(entity)
    }

    /// Every entity of the collection, in key order.
    pub async fn all(&self) -> Result<Vec<E>> {
        self.query(&Query::new()).await
    }

    /// Entities matching a store query.
    #[instrument(skip(self, query), fields(entity = self.descriptor.entity()))]
    pub async fn query(&self, query: &Query) -> Result<Vec<E>> {
        let docs: Vec<Document> = self
            .store
            .query(self.descriptor.collection(), query)
            .await?
            .try_collect()
            .await?;
        docs.into_iter().map(|doc| self.hydrate(doc)).collect()
    }

    /// Load one entity by key.
    #[instrument(skip(self), fields(entity = self.descriptor.entity()))]
    pub async fn load(&self, id: &str) -> Result<Option<E>> {
        self.descriptor.require_id()?;
        let id = DocumentId::new(id)?;
        match self.store.get(self.descriptor.collection(), &id).await? {
            Some(doc) => self.hydrate(doc).map(Some),
            None => Ok(None),
        }
    }

    /// Whether a document exists under the key.
    pub async fn exist(&self, id: &str) -> Result<bool> {
        self.descriptor.require_id()?;
        let id = DocumentId::new(id)?;
        Ok(self
            .store
            .get(self.descriptor.collection(), &id)
            .await?
            .is_some())
    }

    /// Entities whose `field` (serialized key) equals any of `values`.
    pub async fn find_in(&self, field: &str, values: Vec<Value>) -> Result<Vec<E>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let wire = self.descriptor.wire_name(field).unwrap_or(field);
        let query = Query::new().filter(Predicate::new(wire, Operator::In, values));
        self.query(&query).await
    }
}
