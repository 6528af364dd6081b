//! Transaction completion outcomes.

use std::fmt;

/// Outcome handed to after-completion callbacks.
///
/// `Unknown` is used when the engine cannot determine the terminal outcome,
/// e.g. after a commit failure or when callbacks outlive an outer-managed
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CompletionStatus {
    /// The transaction committed.
    Committed,
    /// The transaction rolled back.
    RolledBack,
    /// The terminal outcome could not be determined.
    Unknown,
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Committed => "committed",
            Self::RolledBack => "rolled-back",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
