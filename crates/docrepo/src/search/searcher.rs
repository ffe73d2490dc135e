//! Filter-driven search with keyset pagination.

use std::ops::Deref;
use std::sync::Arc;

use futures_util::TryStreamExt;
use tracing::{debug, instrument};

use docrepo_core::document::Document;
use docrepo_core::error::Error;
use docrepo_core::query::{OrderBy, Predicate, Query};
use docrepo_core::traits::DocumentStore;
use docrepo_core::types::DocumentId;
use docrepo_core::Result;

use crate::descriptor::Descriptor;
use crate::loader::Loader;
use crate::schema::Entity;

use super::sort::parse_sort;

/// Store-level translation of a caller filter.
///
/// Field names in both lists are store-native names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub predicates: Vec<Predicate>,
    pub select: Vec<String>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn select<I, T>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }
}

pub type BuildQueryFn<F> = Arc<dyn Fn(&F) -> Criteria + Send + Sync>;
pub type GetSortFn<F> = Arc<dyn Fn(&F) -> String + Send + Sync>;
pub type BuildSortFn<E> = Arc<dyn Fn(&str, &Descriptor<E>) -> Vec<OrderBy> + Send + Sync>;

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage<E> {
    pub items: Vec<E>,
    /// Key to pass back for the next page; empty once results are exhausted.
    pub next_cursor: String,
}

impl<E> SearchPage<E> {
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_empty()
    }
}

/// Searches entities of type `E` with caller filters of type `F`.
pub struct Searcher<E, F, S> {
    loader: Loader<E, S>,
    build_query: BuildQueryFn<F>,
    get_sort: GetSortFn<F>,
    build_sort: BuildSortFn<E>,
}

impl<E, F, S> Clone for Searcher<E, F, S> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            build_query: self.build_query.clone(),
            get_sort: self.get_sort.clone(),
            build_sort: self.build_sort.clone(),
        }
    }
}

impl<E, F, S> Deref for Searcher<E, F, S> {
    type Target = Loader<E, S>;

    fn deref(&self) -> &Self::Target {
        &self.loader
    }
}

impl<E: Entity, F, S: DocumentStore> Searcher<E, F, S> {
    /// Create a searcher using the default `[+|-]field` sort parser.
    pub fn new(
        loader: Loader<E, S>,
        build_query: impl Fn(&F) -> Criteria + Send + Sync + 'static,
        get_sort: impl Fn(&F) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            loader,
            build_query: Arc::new(build_query),
            get_sort: Arc::new(get_sort),
            build_sort: Arc::new(|spec: &str, descriptor: &Descriptor<E>| {
                parse_sort(spec, descriptor)
            }),
        }
    }

    /// Replace the sort parser.
    pub fn with_sort_builder(
        mut self,
        build_sort: impl Fn(&str, &Descriptor<E>) -> Vec<OrderBy> + Send + Sync + 'static,
    ) -> Self {
        self.build_sort = Arc::new(build_sort);
        self
    }

    pub fn loader(&self) -> &Loader<E, S> {
        &self.loader
    }

    /// Translate a filter into a store query, without cursor.
    ///
    /// A `limit` of zero means no limit.
    pub fn build(&self, filter: &F, limit: usize) -> Query {
        let criteria = (self.build_query)(filter);
        let spec = (self.get_sort)(filter);
        let order_by = (self.build_sort)(&spec, self.loader.descriptor());

        Query {
            filters: criteria.predicates,
            order_by,
            select: criteria.select,
            limit: (limit > 0).then_some(limit),
            start_after: None,
        }
    }

    /// Fetch one page.
    ///
    /// A non-empty `cursor` must name a document that still exists; the page
    /// starts strictly after it in the query order. Without explicit sort keys
    /// the store's key order applies. The returned cursor is the last key of a
    /// full page and empty otherwise.
    #[instrument(skip(self, filter), fields(entity = self.loader.descriptor().entity()))]
    pub async fn search(&self, filter: &F, limit: usize, cursor: &str) -> Result<SearchPage<E>> {
        let descriptor = self.loader.descriptor();
        let collection = descriptor.collection();
        let mut query = self.build(filter, limit);

        if !cursor.is_empty() {
            let id = DocumentId::new(cursor)?;
            if self.loader.store().get(collection, &id).await?.is_none() {
                return Err(Error::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }
            query.start_after = Some(id);
        }

        let docs: Vec<Document> = self
            .loader
            .store()
            .query(collection, &query)
            .await?
            .try_collect()
            .await?;

        let full_page = limit > 0 && docs.len() == limit;
        let next_cursor = match docs.last() {
            Some(last) if full_page => last.id.to_string(),
            _ => String::new(),
        };

        let items = docs
            .into_iter()
            .map(|doc| self.loader.hydrate(doc))
            .collect::<Result<Vec<_>>>()?;

        debug!(count = items.len(), next = %next_cursor, "Fetched search page");

        Ok(SearchPage { items, next_cursor })
    }
}
