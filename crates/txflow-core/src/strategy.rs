//! The pluggable resource strategy behind the workflow engine.
//!
//! The engine owns the propagation decisions; a [`TransactionStrategy`]
//! owns the native primitives: opening a resource, BEGIN/COMMIT/ROLLBACK,
//! savepoints, and suspending/restoring the context binding. The engine
//! treats the strategy's transaction token, suspended-resource handle and
//! savepoint as opaque values.

use tracing::debug;
use txflow_error::{Result, TxFlowError};
use txflow_types::{CompletionStatus, TransactionDefinition};

use crate::status::TransactionStatus;
use crate::synchronization::{invoke_after_completion, SynchronizationList};

/// Native transaction primitives over a concrete resource.
///
/// Defaults are provided for everything a minimal resource can skip:
/// suspension and participation fail with the matching workflow error,
/// nested scopes use savepoints, and after-completion callbacks that cannot
/// be handed to an outer coordinator run immediately with outcome `Unknown`.
pub trait TransactionStrategy: Sized {
    /// Token for the resource binding of one transactional scope. "New"
    /// when created by a begin in this scope, "existing" when it reflects a
    /// binding already present in the execution context.
    type Transaction;

    /// Opaque handle for suspended resources, sufficient to restore them.
    type Suspended;

    /// Opaque savepoint handle.
    type Savepoint;

    /// Return a token reflecting any currently bound resource in the
    /// execution context, or a fresh unbound token.
    fn acquire(&self) -> Result<Self::Transaction>;

    /// Whether the token is currently bound to a live native transaction.
    fn is_existing(&self, transaction: &Self::Transaction) -> Result<bool>;

    /// Start a native transaction: apply isolation and the read-only hint,
    /// arm the timeout, bind the resource to the execution context.
    ///
    /// On failure the strategy must leave no binding behind.
    fn begin(
        &self,
        transaction: &mut Self::Transaction,
        definition: &TransactionDefinition,
        timeout: i32,
    ) -> Result<()>;

    /// Unbind the current resource and return a handle sufficient to
    /// restore it.
    ///
    /// # Errors
    ///
    /// The default fails with [`TxFlowError::SuspensionNotSupported`].
    fn suspend(&self, _transaction: &mut Self::Transaction) -> Result<Self::Suspended> {
        Err(TxFlowError::SuspensionNotSupported)
    }

    /// Re-bind a previously suspended resource.
    ///
    /// # Errors
    ///
    /// The default fails with [`TxFlowError::SuspensionNotSupported`].
    fn resume(
        &self,
        _transaction: Option<&mut Self::Transaction>,
        _suspended: Self::Suspended,
    ) -> Result<()> {
        Err(TxFlowError::SuspensionNotSupported)
    }

    /// Perform the native commit. After return the binding must be released.
    fn commit(&self, status: &mut TransactionStatus<Self>) -> Result<()>;

    /// Perform the native rollback. After return the binding must be
    /// released.
    fn rollback(&self, status: &mut TransactionStatus<Self>) -> Result<()>;

    /// Mark the native transaction so that a later commit converts to a
    /// rollback. Called when a participating scope fails.
    ///
    /// # Errors
    ///
    /// The default fails with [`TxFlowError::IllegalState`]: a strategy
    /// whose `is_existing` can return `true` must provide this.
    fn set_rollback_only(&self, _status: &mut TransactionStatus<Self>) -> Result<()> {
        Err(TxFlowError::illegal_state(
            "participating in existing transactions is not supported by this strategy",
        ))
    }

    /// Whether the native transaction carries a global rollback-only marker.
    fn is_rollback_only(&self, _transaction: &Self::Transaction) -> bool {
        false
    }

    /// Release holder state after completion, on any outcome. Must not fail.
    fn cleanup(&self, _transaction: &mut Self::Transaction) {}

    /// Whether nested scopes are realized as savepoints within the existing
    /// transaction (`true`, default) or as a nested native begin (`false`).
    fn use_savepoint_for_nested(&self) -> bool {
        true
    }

    /// Whether the strategy wants the commit call even when the transaction
    /// is globally marked rollback-only, e.g. because an outer coordinator
    /// raises its own rollback error with the specific reason.
    fn should_commit_on_global_rollback_only(&self) -> bool {
        false
    }

    /// Hook before the `before_commit` callbacks fire. Errors abort the
    /// commit and trigger a rollback attempt.
    fn prepare_for_commit(&self, _status: &mut TransactionStatus<Self>) -> Result<()> {
        Ok(())
    }

    /// Hand the remaining after-completion callbacks to an existing
    /// transaction managed outside this engine.
    ///
    /// The default cannot learn the eventual outcome, so it invokes the
    /// callbacks immediately with [`CompletionStatus::Unknown`].
    fn register_after_completion(
        &self,
        _transaction: &Self::Transaction,
        synchronizations: SynchronizationList,
    ) -> Result<()> {
        debug!(
            "cannot hand after-completion callbacks to the outer transaction - \
             invoking immediately with outcome 'unknown'"
        );
        invoke_after_completion(&synchronizations, CompletionStatus::Unknown);
        Ok(())
    }

    /// Create a native savepoint on the given transaction.
    ///
    /// # Errors
    ///
    /// The default fails with [`TxFlowError::NestedNotSupported`].
    fn create_savepoint(&self, _transaction: &mut Self::Transaction) -> Result<Self::Savepoint> {
        Err(TxFlowError::nested_not_supported(
            "this strategy does not provide savepoints",
        ))
    }

    /// Roll back to a previously created savepoint, keeping it usable.
    ///
    /// # Errors
    ///
    /// The default fails with [`TxFlowError::NestedNotSupported`].
    fn rollback_to_savepoint(
        &self,
        _transaction: &mut Self::Transaction,
        _savepoint: &Self::Savepoint,
    ) -> Result<()> {
        Err(TxFlowError::nested_not_supported(
            "this strategy does not provide savepoints",
        ))
    }

    /// Release a savepoint that is no longer needed.
    ///
    /// # Errors
    ///
    /// The default fails with [`TxFlowError::NestedNotSupported`].
    fn release_savepoint(
        &self,
        _transaction: &mut Self::Transaction,
        _savepoint: Self::Savepoint,
    ) -> Result<()> {
        Err(TxFlowError::nested_not_supported(
            "this strategy does not provide savepoints",
        ))
    }
}
