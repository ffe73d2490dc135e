//! Filesystem storage for documents.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument};

use docrepo_core::document::{Document, FieldUpdate, Fields, WriteResult, set_path};
use docrepo_core::error::{Error, InvalidInputError, TransportError};
use docrepo_core::query::Query;
use docrepo_core::traits::{DocumentStore, DocumentStream};
use docrepo_core::types::{CollectionName, DocumentId};
use docrepo_core::Result;

use crate::eval;
use crate::transaction::FileTransaction;

/// Longest encoded file name accepted for a document.
const MAX_FILE_STEM: usize = 240;

pub(crate) fn map_io(err: std::io::Error) -> Error {
    Error::Transport(TransportError::Io {
        message: err.to_string(),
    })
}

/// On-disk representation of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredDocument {
    pub id: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub fields: Fields,
}

impl StoredDocument {
    pub(crate) fn into_document(self) -> Result<Document> {
        Ok(Document {
            id: DocumentId::new(self.id)?,
            fields: self.fields,
            create_time: self.create_time,
            update_time: self.update_time,
        })
    }

    pub(crate) fn write_result(&self, id: &DocumentId) -> WriteResult {
        WriteResult {
            id: id.clone(),
            create_time: self.create_time,
            update_time: self.update_time,
        }
    }
}

/// Apply field-path assignments to a stored document.
pub(crate) fn apply_updates(doc: &mut StoredDocument, updates: Vec<FieldUpdate>, now: DateTime<Utc>) {
    for update in updates {
        set_path(&mut doc.fields, &update.path, update.value);
    }
    doc.update_time = now;
}

/// A document sitting in its temp file, not yet renamed into place.
pub(crate) struct StagedFile {
    temp: PathBuf,
    target: PathBuf,
}

impl StagedFile {
    /// Rename into place. The temp file is removed if that fails.
    pub(crate) fn install(self) -> Result<()> {
        fs::rename(&self.temp, &self.target).map_err(|e| {
            self.discard();
            map_io(e)
        })
    }

    pub(crate) fn discard(&self) {
        let _ = fs::remove_file(&self.temp);
    }
}

/// Exclusive hold on the store. Released on drop.
pub(crate) struct StoreLock {
    file: File,
    _gate: OwnedMutexGuard<()>,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Filesystem-backed document store.
///
/// Clones share one in-process write gate; separate processes are
/// serialised by the advisory lock file.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    gate: Arc<Mutex<()>>,
}

impl FileStore {
    /// Create a new file store at the given root directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collections_dir(&self) -> PathBuf {
        self.root.join("collections")
    }

    fn collection_dir(&self, collection: &CollectionName) -> PathBuf {
        self.collections_dir().join(encode_segment(collection.as_str()))
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("store.lock")
    }

    fn document_path(&self, collection: &CollectionName, id: &DocumentId) -> Result<PathBuf> {
        let stem = encode_segment(id.as_str());
        if stem.len() > MAX_FILE_STEM {
            return Err(InvalidInputError::DocumentId {
                value: id.to_string(),
                reason: "too long for the file store".to_string(),
            }
            .into());
        }
        Ok(self.collection_dir(collection).join(format!("{}.json", stem)))
    }

    /// Take the exclusive write lock.
    pub(crate) async fn lock(&self) -> Result<StoreLock> {
        let gate = self.gate.clone().lock_owned().await;

        fs::create_dir_all(&self.root).map_err(map_io)?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(map_io)?;

        file.lock_exclusive().map_err(|e| {
            Error::Transport(TransportError::Lock {
                message: e.to_string(),
            })
        })?;

        Ok(StoreLock { file, _gate: gate })
    }

    pub(crate) fn read(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
    ) -> Result<Option<StoredDocument>> {
        let path = self.document_path(collection, id)?;
        if !path.exists() {
            return Ok(None);
        }
        read_stored(&path).map(Some)
    }

    pub(crate) fn write(&self, collection: &CollectionName, doc: &StoredDocument) -> Result<()> {
        self.stage(collection, doc)?.install()
    }

    /// Write a document to its temp file without making it visible.
    pub(crate) fn stage(
        &self,
        collection: &CollectionName,
        doc: &StoredDocument,
    ) -> Result<StagedFile> {
        let id = DocumentId::new(doc.id.as_str())?;
        let target = self.document_path(collection, &id)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }

        let content = serde_json::to_string_pretty(doc)?;
        let temp = target.with_extension("tmp");
        if let Err(e) = fs::write(&temp, &content) {
            let _ = fs::remove_file(&temp);
            return Err(map_io(e));
        }

        Ok(StagedFile { temp, target })
    }

    pub(crate) fn remove(&self, collection: &CollectionName, id: &DocumentId) -> Result<bool> {
        let path = self.document_path(collection, id)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(map_io)?;
        Ok(true)
    }

    /// Load every document of a collection.
    pub(crate) fn scan(&self, collection: &CollectionName) -> Result<Vec<StoredDocument>> {
        let dir = self.collection_dir(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut docs = Vec::new();
        for entry in fs::read_dir(&dir).map_err(map_io)? {
            let path = entry.map_err(map_io)?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                docs.push(read_stored(&path)?);
            }
        }
        Ok(docs)
    }

    /// List the collections that currently hold at least one document.
    pub fn collections(&self) -> Result<Vec<CollectionName>> {
        let dir = self.collections_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).map_err(map_io)? {
            let entry = entry.map_err(map_io)?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str().and_then(decode_segment)
                && let Ok(name) = CollectionName::new(name)
            {
                names.push(name);
            }
        }
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(names)
    }

    fn run_query(&self, collection: &CollectionName, query: &Query) -> Result<Vec<Document>> {
        let cursor = match &query.start_after {
            Some(id) => Some(self.read(collection, id)?.ok_or_else(|| Error::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?),
            None => None,
        };

        let docs = self
            .scan(collection)?
            .into_iter()
            .map(StoredDocument::into_document)
            .collect::<Result<Vec<_>>>()?;

        let cursor = cursor.map(StoredDocument::into_document).transpose()?;
        Ok(eval::execute(docs, query, cursor.as_ref()))
    }
}

fn read_stored(path: &Path) -> Result<StoredDocument> {
    let content = fs::read_to_string(path).map_err(map_io)?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Transport(TransportError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    })
}

/// Percent-encode a key so it is a safe, case-preserving path segment.
fn encode_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn decode_segment(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[async_trait]
impl DocumentStore for FileStore {
    type Transaction = FileTransaction;

    #[instrument(skip(self))]
    async fn get(&self, collection: &CollectionName, id: &DocumentId) -> Result<Option<Document>> {
        self.read(collection, id)?
            .map(StoredDocument::into_document)
            .transpose()
    }

    #[instrument(skip(self, fields))]
    async fn create(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<WriteResult> {
        let _lock = self.lock().await?;

        if self.read(collection, id)?.is_some() {
            return Err(Error::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let now = Utc::now();
        let doc = StoredDocument {
            id: id.to_string(),
            create_time: now,
            update_time: now,
            fields,
        };
        self.write(collection, &doc)?;

        debug!(%collection, %id, "Created document");

        Ok(doc.write_result(id))
    }

    #[instrument(skip(self, fields))]
    async fn replace(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<WriteResult> {
        let _lock = self.lock().await?;

        let now = Utc::now();
        let create_time = self
            .read(collection, id)?
            .map(|existing| existing.create_time)
            .unwrap_or(now);
        let doc = StoredDocument {
            id: id.to_string(),
            create_time,
            update_time: now,
            fields,
        };
        self.write(collection, &doc)?;

        debug!(%collection, %id, "Replaced document");

        Ok(doc.write_result(id))
    }

    #[instrument(skip(self, updates))]
    async fn update_fields(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        updates: Vec<FieldUpdate>,
    ) -> Result<WriteResult> {
        let _lock = self.lock().await?;

        let mut doc = self.read(collection, id)?.ok_or_else(|| Error::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;
        apply_updates(&mut doc, updates, Utc::now());
        self.write(collection, &doc)?;

        debug!(%collection, %id, "Updated document fields");

        Ok(doc.write_result(id))
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &CollectionName, id: &DocumentId) -> Result<bool> {
        let _lock = self.lock().await?;
        let existed = self.remove(collection, id)?;

        debug!(%collection, %id, existed, "Deleted document");

        Ok(existed)
    }

    #[instrument(skip(self, query), fields(filters = query.filters.len()))]
    async fn query(&self, collection: &CollectionName, query: &Query) -> Result<DocumentStream> {
        eval::validate(query)?;

        let store = self.clone();
        let collection = collection.clone();
        let query = query.clone();

        let stream = async_stream::try_stream! {
            for doc in store.run_query(&collection, &query)? {
                yield doc;
            }
        };

        Ok(Box::pin(stream))
    }

    async fn begin(&self) -> Result<FileTransaction> {
        let lock = self.lock().await?;
        Ok(FileTransaction::new(self.clone(), lock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_encoding_roundtrip() {
        for s in ["plain", "with space", "colon:and#hash", "ünï", "UPPER.lower"] {
            let encoded = encode_segment(s);
            assert!(!encoded.contains(['/', ' ', ':']));
            assert_eq!(decode_segment(&encoded).as_deref(), Some(s));
        }
    }

    #[test]
    fn segment_encoding_keeps_safe_chars() {
        assert_eq!(encode_segment("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(encode_segment("a b"), "a%20b");
    }

    #[test]
    fn overlong_ids_are_rejected() {
        let store = FileStore::new("/tmp/unused");
        let collection = CollectionName::new("c").unwrap();
        let id = DocumentId::new("%".repeat(100)).unwrap();
        assert!(store.document_path(&collection, &id).is_err());
    }
}
