//! Line-oriented collection export.

use std::io::Write;
use std::sync::Arc;

use futures_util::TryStreamExt;
use tracing::{debug, instrument};

use docrepo_core::error::{Error, TransportError};
use docrepo_core::query::Query;
use docrepo_core::traits::DocumentStore;
use docrepo_core::Result;

use crate::loader::Loader;
use crate::schema::Entity;

pub type TransformFn<E> = Arc<dyn Fn(&E) -> Result<String> + Send + Sync>;

/// Streams a collection out as one line per entity.
pub struct Exporter<E, S> {
    loader: Loader<E, S>,
    query: Query,
    transform: TransformFn<E>,
}

impl<E: Entity, S: DocumentStore> Exporter<E, S> {
    pub fn new(
        loader: Loader<E, S>,
        transform: impl Fn(&E) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            loader,
            query: Query::new(),
            transform: Arc::new(transform),
        }
    }

    /// Export entities serialized as JSON, one object per line.
    pub fn json_lines(loader: Loader<E, S>) -> Self {
        Self::new(loader, |entity: &E| Ok(serde_json::to_string(entity)?))
    }

    /// Restrict the export to a query instead of the whole collection.
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Write every entity to `out`, returning how many were written.
    #[instrument(skip(self, out), fields(entity = self.loader.descriptor().entity()))]
    pub async fn export<W: Write + Send>(&self, out: &mut W) -> Result<u64> {
        let mut docs = self
            .loader
            .store()
            .query(self.loader.descriptor().collection(), &self.query)
            .await?;

        let mut count = 0u64;
        while let Some(doc) = docs.try_next().await? {
            let entity = self.loader.hydrate(doc)?;
            let line = (self.transform)(&entity)?;
            writeln!(out, "{}", line).map_err(map_io)?;
            count += 1;
        }
        out.flush().map_err(map_io)?;

        debug!(count, "Exported collection");
        Ok(count)
    }
}

fn map_io(err: std::io::Error) -> Error {
    Error::Transport(TransportError::Io {
        message: err.to_string(),
    })
}
