//! Document identifier type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, InvalidInputError};

/// Longest document id a store accepts, in bytes.
pub const MAX_ID_BYTES: usize = 1500;

/// A validated document identifier.
///
/// Document ids are opaque strings unique within a collection. They are also
/// the cursor handed back by paginated searches.
///
/// # Example
///
/// ```
/// use docrepo_core::DocumentId;
///
/// let id = DocumentId::new("user-42").unwrap();
/// assert_eq!(id.as_str(), "user-42");
/// assert!(DocumentId::new("a/b").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a new document id from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a usable document id.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        let invalid = |reason: &str| -> Error {
            InvalidInputError::DocumentId {
                value: s.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        if s.is_empty() {
            return Err(invalid("cannot be empty"));
        }

        if s.len() > MAX_ID_BYTES {
            return Err(invalid("exceeds maximum length of 1500 bytes"));
        }

        if s == "." || s == ".." {
            return Err(invalid("cannot be '.' or '..'"));
        }

        if s.len() > 4 && s.starts_with("__") && s.ends_with("__") {
            return Err(invalid("names of the form __name__ are reserved"));
        }

        if let Some(c) = s.chars().find(|c| *c == '/' || *c == '\\' || c.is_control()) {
            return Err(invalid(&format!("contains invalid character {:?}", c)));
        }

        Ok(())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
