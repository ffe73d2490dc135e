//! Buffered writing of entity streams.

use std::mem;

use tracing::{debug, warn};

use docrepo_core::error::ConfigError;
use docrepo_core::traits::DocumentStore;
use docrepo_core::Result;

use crate::batch::{BatchResult, BatchWriter};
use crate::loader::MapFn;
use crate::schema::Entity;

/// Which batch operation a [`StreamWriter`] flushes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    Create,
    Update,
    #[default]
    Save,
}

/// Accumulates entities and writes them in batches.
///
/// Single-producer: `write` and `flush` take `&mut self`. A flush always
/// empties the buffer, even when the batch fails; failed items are not kept
/// for retry.
pub struct StreamWriter<E, S> {
    writer: BatchWriter<E, S>,
    mode: WriteMode,
    batch_size: usize,
    buffer: Vec<E>,
    map: Option<MapFn<E>>,
}

impl<E: Entity, S: DocumentStore> StreamWriter<E, S> {
    /// # Errors
    ///
    /// A `batch_size` of zero is a configuration error.
    pub fn new(writer: BatchWriter<E, S>, mode: WriteMode, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(ConfigError::BatchSize.into());
        }
        Ok(Self {
            writer,
            mode,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            map: None,
        })
    }

    /// Install a hook run on each entity as it is written.
    pub fn with_map(mut self, map: impl Fn(&mut E) + Send + Sync + 'static) -> Self {
        self.map = Some(std::sync::Arc::new(map));
        self
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of buffered entities.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Buffer one entity, flushing once the buffer reaches the batch size.
    ///
    /// Returns the batch outcome when a flush happened.
    pub async fn write(&mut self, mut entity: E) -> Result<Option<BatchResult>> {
        if let Some(map) = &self.map {
            map(&mut entity);
        }
        self.buffer.push(entity);

        if self.buffer.len() >= self.batch_size {
            return self.flush().await.map(Some);
        }
        Ok(None)
    }

    /// Write out whatever is buffered. Indices in the result refer to
    /// positions within the flushed batch.
    pub async fn flush(&mut self) -> Result<BatchResult> {
        if self.buffer.is_empty() {
            return Ok(BatchResult::default());
        }

        let mut batch = mem::take(&mut self.buffer);
        let result = match self.mode {
            WriteMode::Create => self.writer.create_many(&mut batch).await,
            WriteMode::Update => self.writer.update_many(&mut batch).await,
            WriteMode::Save => self.writer.save_many(&mut batch).await,
        };

        match &result {
            Ok(outcome) => debug!(
                mode = ?self.mode,
                succeeded = outcome.succeeded.len(),
                failed = outcome.failed.len(),
                "Flushed batch"
            ),
            Err(err) => warn!(mode = ?self.mode, dropped = batch.len(), error = %err, "Batch flush failed"),
        }

        result
    }
}
