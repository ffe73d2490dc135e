//! Validated identifier types.

mod collection;
mod document_id;

pub use collection::CollectionName;
pub use document_id::DocumentId;
