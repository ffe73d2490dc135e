//! Collection name type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// A validated collection name.
///
/// Collections group documents of one entity type. Names follow the same
/// character rules as document ids so they can be used as path segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName(String);

impl CollectionName {
    /// Create a new collection name, validating the format.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Returns the collection name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        // - 1-1500 bytes
        // - no path separators or control characters
        // - not "." / ".." and not __reserved__

        let reason = if s.is_empty() {
            Some("cannot be empty".to_string())
        } else if s.len() > 1500 {
            Some("exceeds maximum length of 1500 bytes".to_string())
        } else if s == "." || s == ".." {
            Some("cannot be '.' or '..'".to_string())
        } else if s.len() > 4 && s.starts_with("__") && s.ends_with("__") {
            Some("names of the form __name__ are reserved".to_string())
        } else {
            s.chars()
                .find(|c| *c == '/' || *c == '\\' || c.is_control())
                .map(|c| format!("contains invalid character {:?}", c))
        };

        match reason {
            Some(reason) => Err(InvalidInputError::Collection {
                value: s.to_string(),
                reason,
            }
            .into()),
            None => Ok(()),
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CollectionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CollectionName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for CollectionName {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CollectionName> for String {
    fn from(name: CollectionName) -> Self {
        name.0
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
