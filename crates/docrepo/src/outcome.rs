//! Write outcomes.

use std::fmt;

/// The result of a single-document write.
///
/// Absence and version conflicts are expected outcomes, not errors. They map
/// onto the affected-count convention `1 / 0 / -1` through [`Outcome::affected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The write was applied.
    Applied,
    /// Nothing was written: the document was absent, or already existed on create.
    Unaffected,
    /// The caller's version did not match the stored version.
    Conflict,
}

impl Outcome {
    /// Affected-document count: `1` applied, `0` unaffected, `-1` conflict.
    pub fn affected(self) -> i64 {
        match self {
            Outcome::Applied => 1,
            Outcome::Unaffected => 0,
            Outcome::Conflict => -1,
        }
    }

    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }

    pub fn is_conflict(self) -> bool {
        self == Outcome::Conflict
    }
}

impl From<Outcome> for i64 {
    fn from(outcome: Outcome) -> Self {
        outcome.affected()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Outcome::Applied => "applied",
            Outcome::Unaffected => "unaffected",
            Outcome::Conflict => "conflict",
        };
        f.write_str(text)
    }
}
