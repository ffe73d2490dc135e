//! docrepo-core - Core document store types and traits.

pub mod document;
pub mod error;
pub mod query;
pub mod traits;
pub mod types;

pub use document::{Document, FieldUpdate, Fields, WriteResult};
pub use error::Error;
pub use query::{Direction, Operator, OrderBy, Predicate, Query};
pub use traits::{DocumentStore, DocumentStream, Transaction};
pub use types::{CollectionName, DocumentId};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
