use thiserror::Error;
use txflow_types::CompletionStatus;

/// Primary error type for txflow operations.
///
/// Structured variants for the workflow-level failures, plus a generic
/// `System` bucket for resource strategy failures (begin/commit/rollback/
/// suspend/resume I/O errors). Convenience constructors keep call sites
/// short; classification predicates let callers route without matching
/// every variant.
#[derive(Error, Debug)]
pub enum TxFlowError {
    /// A definition or manager default declared a timeout below `-1`.
    #[error("invalid transaction timeout: {seconds}")]
    InvalidTimeout { seconds: i32 },

    /// API misuse: wrong propagation for the current context, completion of
    /// an already-completed status, validation mismatch, and friends.
    #[error("illegal transaction state: {detail}")]
    IllegalState { detail: String },

    /// A nested scope was requested but neither savepoints nor nested begin
    /// are available.
    #[error("nested transaction not supported: {detail}")]
    NestedNotSupported { detail: String },

    /// The strategy cannot suspend its resource.
    #[error("transaction suspension is not supported by this strategy")]
    SuspensionNotSupported,

    /// A commit was silently converted to a rollback because the transaction
    /// had been marked rollback-only.
    #[error("unexpected rollback: {detail}")]
    UnexpectedRollback { detail: String },

    /// The transaction coordinator completed the transaction heuristically.
    #[error("heuristic completion: transaction outcome is {outcome}")]
    Heuristic { outcome: CompletionStatus },

    /// Generic resource strategy failure; `op` names the failing primitive.
    #[error("transaction system failure in {op}: {detail}")]
    System { op: &'static str, detail: String },
}

impl TxFlowError {
    /// Create an [`TxFlowError::IllegalState`].
    pub fn illegal_state(detail: impl Into<String>) -> Self {
        Self::IllegalState {
            detail: detail.into(),
        }
    }

    /// Create a [`TxFlowError::NestedNotSupported`].
    pub fn nested_not_supported(detail: impl Into<String>) -> Self {
        Self::NestedNotSupported {
            detail: detail.into(),
        }
    }

    /// Create an [`TxFlowError::UnexpectedRollback`].
    pub fn unexpected_rollback(detail: impl Into<String>) -> Self {
        Self::UnexpectedRollback {
            detail: detail.into(),
        }
    }

    /// Create a [`TxFlowError::System`] for the named strategy primitive.
    pub fn system(op: &'static str, detail: impl Into<String>) -> Self {
        Self::System {
            op,
            detail: detail.into(),
        }
    }

    /// Whether this error reflects caller misuse rather than a resource
    /// failure: the operation was rejected before touching the resource.
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTimeout { .. }
                | Self::IllegalState { .. }
                | Self::NestedNotSupported { .. }
                | Self::SuspensionNotSupported
        )
    }

    /// Whether this error originated in the resource strategy or the
    /// transaction coordinator, as opposed to the workflow engine itself.
    #[must_use]
    pub const fn is_system_error(&self) -> bool {
        matches!(self, Self::System { .. } | Self::Heuristic { .. })
    }

    /// Whether this error reports a rollback the caller did not ask for.
    #[must_use]
    pub const fn is_unexpected_rollback(&self) -> bool {
        matches!(self, Self::UnexpectedRollback { .. })
    }
}

/// Result type alias using [`TxFlowError`].
pub type Result<T> = std::result::Result<T, TxFlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TxFlowError::InvalidTimeout { seconds: -5 };
        assert_eq!(err.to_string(), "invalid transaction timeout: -5");

        let err = TxFlowError::illegal_state("no existing transaction");
        assert_eq!(
            err.to_string(),
            "illegal transaction state: no existing transaction"
        );

        let err = TxFlowError::system("begin", "connection refused");
        assert_eq!(
            err.to_string(),
            "transaction system failure in begin: connection refused"
        );

        let err = TxFlowError::Heuristic {
            outcome: CompletionStatus::Unknown,
        };
        assert_eq!(
            err.to_string(),
            "heuristic completion: transaction outcome is unknown"
        );
    }

    #[test]
    fn usage_classification() {
        assert!(TxFlowError::InvalidTimeout { seconds: -2 }.is_usage_error());
        assert!(TxFlowError::illegal_state("x").is_usage_error());
        assert!(TxFlowError::nested_not_supported("x").is_usage_error());
        assert!(TxFlowError::SuspensionNotSupported.is_usage_error());
        assert!(!TxFlowError::system("commit", "io").is_usage_error());
        assert!(!TxFlowError::unexpected_rollback("x").is_usage_error());
    }

    #[test]
    fn system_classification() {
        assert!(TxFlowError::system("rollback", "io").is_system_error());
        assert!(
            TxFlowError::Heuristic {
                outcome: CompletionStatus::Committed,
            }
            .is_system_error()
        );
        assert!(!TxFlowError::illegal_state("x").is_system_error());
        assert!(!TxFlowError::unexpected_rollback("x").is_system_error());
    }

    #[test]
    fn unexpected_rollback_classification() {
        assert!(TxFlowError::unexpected_rollback("marked rollback-only").is_unexpected_rollback());
        assert!(!TxFlowError::system("commit", "io").is_unexpected_rollback());
    }
}
