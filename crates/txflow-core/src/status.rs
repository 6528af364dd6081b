//! Transaction status handle and suspended-state bundle.

use std::fmt;
use std::sync::Arc;

use txflow_error::{Result, TxFlowError};
use txflow_types::Isolation;

use crate::registry::SyncRegistry;
use crate::strategy::TransactionStrategy;
use crate::synchronization::SynchronizationList;

/// Captured state of a paused transaction: the strategy's suspended
/// resources, the callbacks that were registered, and the registry metadata
/// to restore. Created by the engine when suspending and consumed exactly
/// once by the matching resume.
pub struct SuspendedBundle<S: TransactionStrategy> {
    pub(crate) resources: Option<S::Suspended>,
    pub(crate) synchronizations: Option<SynchronizationList>,
    pub(crate) name: Option<String>,
    pub(crate) read_only: bool,
    pub(crate) isolation: Option<Isolation>,
    pub(crate) was_active: bool,
}

impl<S: TransactionStrategy> SuspendedBundle<S> {
    pub(crate) fn new(
        resources: Option<S::Suspended>,
        synchronizations: SynchronizationList,
        name: Option<String>,
        read_only: bool,
        isolation: Option<Isolation>,
        was_active: bool,
    ) -> Self {
        Self {
            resources,
            synchronizations: Some(synchronizations),
            name,
            read_only,
            isolation,
            was_active,
        }
    }

    /// A bundle carrying only suspended resources, for a transaction that
    /// was active without callback synchronization.
    pub(crate) fn resources_only(resources: S::Suspended) -> Self {
        Self {
            resources: Some(resources),
            synchronizations: None,
            name: None,
            read_only: false,
            isolation: None,
            was_active: false,
        }
    }

    /// Whether the bundle holds strategy resources to restore.
    #[must_use]
    pub fn has_resources(&self) -> bool {
        self.resources.is_some()
    }

    /// Whether the bundle holds suspended callbacks to re-register.
    #[must_use]
    pub fn has_synchronizations(&self) -> bool {
        self.synchronizations.is_some()
    }
}

impl<S: TransactionStrategy> fmt::Debug for SuspendedBundle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspendedBundle")
            .field("has_resources", &self.has_resources())
            .field(
                "synchronizations",
                &self.synchronizations.as_ref().map(SynchronizationList::len),
            )
            .field("name", &self.name)
            .field("read_only", &self.read_only)
            .field("isolation", &self.isolation)
            .field("was_active", &self.was_active)
            .finish()
    }
}

/// Handle for one transactional scope, returned by
/// [`TransactionEngine::get_transaction`](crate::TransactionEngine::get_transaction)
/// and later passed to commit or rollback.
///
/// The handle exclusively owns any [`SuspendedBundle`] captured when the
/// scope displaced an outer transaction; cleanup after completion restores
/// the bundle to the execution context.
pub struct TransactionStatus<S: TransactionStrategy> {
    strategy: Arc<S>,
    transaction: Option<S::Transaction>,
    new_transaction: bool,
    new_synchronization: bool,
    read_only: bool,
    local_rollback_only: bool,
    completed: bool,
    savepoint: Option<S::Savepoint>,
    suspended: Option<SuspendedBundle<S>>,
}

impl<S: TransactionStrategy> TransactionStatus<S> {
    pub(crate) fn new(
        strategy: Arc<S>,
        transaction: Option<S::Transaction>,
        new_transaction: bool,
        new_synchronization: bool,
        read_only: bool,
        suspended: Option<SuspendedBundle<S>>,
    ) -> Self {
        Self {
            strategy,
            transaction,
            new_transaction,
            new_synchronization,
            read_only,
            local_rollback_only: false,
            completed: false,
            savepoint: None,
            suspended,
        }
    }

    /// Whether this scope carries an actual transaction, new or inherited.
    #[must_use]
    pub fn has_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Whether this scope began its own transaction. `false` for empty
    /// scopes and for participation in an outer transaction.
    #[must_use]
    pub fn is_new_transaction(&self) -> bool {
        self.has_transaction() && self.new_transaction
    }

    /// Whether this scope owns the callback synchronization it activated.
    #[must_use]
    pub fn is_new_synchronization(&self) -> bool {
        self.new_synchronization
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether this scope holds a savepoint (nested-via-savepoint).
    #[must_use]
    pub fn has_savepoint(&self) -> bool {
        self.savepoint.is_some()
    }

    /// Whether this scope still owns a suspended outer transaction.
    #[must_use]
    pub fn has_suspended(&self) -> bool {
        self.suspended.is_some()
    }

    /// Whether commit or rollback has already run for this scope.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Request that the only legal terminal outcome for this scope is a
    /// rollback. Monotonic: once set it cannot be unset.
    pub fn set_rollback_only(&mut self) {
        self.local_rollback_only = true;
    }

    /// Whether this scope itself requested rollback.
    #[must_use]
    pub fn is_local_rollback_only(&self) -> bool {
        self.local_rollback_only
    }

    /// Whether the underlying transaction carries a global rollback-only
    /// marker, set by some participating scope.
    #[must_use]
    pub fn is_global_rollback_only(&self) -> bool {
        self.transaction
            .as_ref()
            .is_some_and(|transaction| self.strategy.is_rollback_only(transaction))
    }

    /// Whether this scope can only end in a rollback, for either local or
    /// global reasons.
    #[must_use]
    pub fn is_rollback_only(&self) -> bool {
        self.is_local_rollback_only() || self.is_global_rollback_only()
    }

    /// Borrow the strategy's transaction token, if any.
    #[must_use]
    pub fn transaction(&self) -> Option<&S::Transaction> {
        self.transaction.as_ref()
    }

    /// Mutably borrow the strategy's transaction token, if any.
    pub fn transaction_mut(&mut self) -> Option<&mut S::Transaction> {
        self.transaction.as_mut()
    }

    /// Flush pending state: fan out over the registered callbacks' `flush`
    /// hooks. Best-effort by contract; a resource with nothing to flush
    /// sees a no-op.
    pub fn flush(&self) -> Result<()> {
        if SyncRegistry::is_synchronization_active() {
            for synchronization in SyncRegistry::synchronizations()? {
                synchronization.flush()?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Savepoint API
    // -----------------------------------------------------------------

    /// Create a savepoint on the underlying transaction.
    ///
    /// # Errors
    ///
    /// Fails with [`TxFlowError::IllegalState`] if the scope is completed,
    /// or [`TxFlowError::NestedNotSupported`] without a backing transaction
    /// or savepoint support in the strategy.
    pub fn create_savepoint(&mut self) -> Result<S::Savepoint> {
        self.ensure_not_completed()?;
        let strategy = Arc::clone(&self.strategy);
        strategy.create_savepoint(self.require_transaction()?)
    }

    /// Roll back to a previously created savepoint, keeping it usable.
    pub fn rollback_to_savepoint(&mut self, savepoint: &S::Savepoint) -> Result<()> {
        self.ensure_not_completed()?;
        let strategy = Arc::clone(&self.strategy);
        strategy.rollback_to_savepoint(self.require_transaction()?, savepoint)
    }

    /// Release a savepoint that is no longer needed.
    pub fn release_savepoint(&mut self, savepoint: S::Savepoint) -> Result<()> {
        self.ensure_not_completed()?;
        let strategy = Arc::clone(&self.strategy);
        strategy.release_savepoint(self.require_transaction()?, savepoint)
    }

    /// Create a savepoint and hold it for this scope, demarcating the start
    /// of a nested transaction.
    pub fn create_and_hold_savepoint(&mut self) -> Result<()> {
        let savepoint = self.create_savepoint()?;
        self.savepoint = Some(savepoint);
        Ok(())
    }

    /// Roll back to the held savepoint, then release and clear it.
    ///
    /// # Errors
    ///
    /// Fails with [`TxFlowError::IllegalState`] if no savepoint is held.
    pub fn rollback_to_held_savepoint(&mut self) -> Result<()> {
        self.ensure_not_completed()?;
        let savepoint = self.savepoint.take().ok_or_else(|| {
            TxFlowError::illegal_state("cannot roll back to savepoint - none held for this scope")
        })?;
        let strategy = Arc::clone(&self.strategy);
        let transaction = self.require_transaction()?;
        strategy.rollback_to_savepoint(transaction, &savepoint)?;
        strategy.release_savepoint(transaction, savepoint)
    }

    /// Release the held savepoint and clear it.
    ///
    /// # Errors
    ///
    /// Fails with [`TxFlowError::IllegalState`] if no savepoint is held.
    pub fn release_held_savepoint(&mut self) -> Result<()> {
        self.ensure_not_completed()?;
        let savepoint = self.savepoint.take().ok_or_else(|| {
            TxFlowError::illegal_state("cannot release savepoint - none held for this scope")
        })?;
        let strategy = Arc::clone(&self.strategy);
        strategy.release_savepoint(self.require_transaction()?, savepoint)
    }

    // -----------------------------------------------------------------
    // Engine internals
    // -----------------------------------------------------------------

    pub(crate) fn mark_completed(&mut self) {
        self.completed = true;
    }

    pub(crate) fn take_suspended(&mut self) -> Option<SuspendedBundle<S>> {
        self.suspended.take()
    }

    fn ensure_not_completed(&self) -> Result<()> {
        if self.completed {
            return Err(TxFlowError::illegal_state(
                "transaction is already completed - the status can no longer be used",
            ));
        }
        Ok(())
    }

    fn require_transaction(&mut self) -> Result<&mut S::Transaction> {
        self.transaction.as_mut().ok_or_else(|| {
            TxFlowError::nested_not_supported(
                "transaction status has no backing transaction to manage savepoints on",
            )
        })
    }
}

impl<S: TransactionStrategy> fmt::Debug for TransactionStatus<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionStatus")
            .field("has_transaction", &self.has_transaction())
            .field("new_transaction", &self.new_transaction)
            .field("new_synchronization", &self.new_synchronization)
            .field("read_only", &self.read_only)
            .field("local_rollback_only", &self.local_rollback_only)
            .field("completed", &self.completed)
            .field("has_savepoint", &self.has_savepoint())
            .field("has_suspended", &self.has_suspended())
            .finish()
    }
}
