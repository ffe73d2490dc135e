//! Error types for docrepo.
//!
//! A single error type with explicit variants for configuration,
//! input validation, store-reported conditions and transport failures.

use thiserror::Error;

/// The unified error type for docrepo operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Entity metadata could not be resolved. Fatal at construction time.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Input validation errors (document ids, collections, operators).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// The addressed document does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// A create targeted an id that is already taken.
    #[error("document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },

    /// The store could not be reached or failed mid-operation.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A payload could not be converted to or from an entity.
    #[error("codec error: {message}")]
    Codec { message: String },
}

impl Error {
    /// Returns true for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true for [`Error::AlreadyExists`].
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Codec {
            message: err.to_string(),
        }
    }
}

/// Entity metadata resolution errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No identifier field was named or tagged.
    #[error("entity '{entity}' has no identifier field")]
    MissingIdField { entity: String },

    /// A configured field name does not exist on the entity.
    #[error("entity '{entity}' has no field named '{field}'")]
    UnknownField { entity: String, field: String },

    /// A role was assigned to a field of the wrong kind.
    #[error("field '{field}' of '{entity}' cannot be the {role} field: expected {expected}, found {found}")]
    FieldType {
        entity: String,
        field: String,
        role: String,
        expected: String,
        found: String,
    },

    /// Batch size must be at least one.
    #[error("batch size must be greater than zero")]
    BatchSize,
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Local or remote I/O failed.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// The store lock could not be acquired or released.
    #[error("lock error: {message}")]
    Lock { message: String },

    /// The store answered in a way the caller cannot use.
    #[error("unexpected store response: {message}")]
    Protocol { message: String },

    /// Stored data could not be decoded.
    #[error("corrupt document '{path}': {message}")]
    Corrupt { path: String, message: String },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid document id.
    #[error("invalid document id '{value}': {reason}")]
    DocumentId { value: String, reason: String },

    /// Invalid collection name.
    #[error("invalid collection '{value}': {reason}")]
    Collection { value: String, reason: String },

    /// Unknown query operator.
    #[error("unknown operator '{value}'")]
    Operator { value: String },

    /// A required field is missing from the input.
    #[error("missing field '{field}'")]
    MissingField { field: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
