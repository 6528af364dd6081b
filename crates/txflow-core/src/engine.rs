//! The propagation workflow engine.
//!
//! [`TransactionEngine`] drives the full demarcation workflow over a
//! [`TransactionStrategy`]:
//!
//! - determines whether the execution context already carries a transaction;
//! - applies the declared propagation behavior, beginning, participating,
//!   suspending or creating a savepoint as required;
//! - checks rollback-only markers on commit;
//! - applies the appropriate action on rollback (actual rollback or marking
//!   rollback-only);
//! - fires the registered synchronization callbacks;
//! - cleans up and restores any suspended outer transaction on every exit
//!   path.

use std::sync::Arc;

use tracing::{debug, error, trace, warn};
use txflow_error::{Result, TxFlowError};
use txflow_types::{
    CompletionStatus, Isolation, Propagation, TransactionDefinition, TIMEOUT_DEFAULT,
};

use crate::config::{EngineConfig, SyncMode};
use crate::registry::SyncRegistry;
use crate::status::{SuspendedBundle, TransactionStatus};
use crate::strategy::TransactionStrategy;
use crate::synchronization::{invoke_after_completion, SynchronizationList};

/// Propagation workflow engine over a resource strategy.
///
/// The engine itself holds no cross-context mutable state: its policy
/// configuration is read-only after construction, and all per-transaction
/// state lives in the context-local [`SyncRegistry`] and in the
/// [`TransactionStatus`] handles it returns.
pub struct TransactionEngine<S: TransactionStrategy> {
    strategy: Arc<S>,
    config: EngineConfig,
}

impl<S: TransactionStrategy> TransactionEngine<S> {
    /// Build an engine with the default configuration.
    pub fn new(strategy: S) -> Self {
        Self::with_config(strategy, EngineConfig::default())
    }

    /// Build an engine with an explicit policy configuration.
    pub fn with_config(strategy: S, config: EngineConfig) -> Self {
        Self {
            strategy: Arc::new(strategy),
            config,
        }
    }

    /// The resource strategy driving native transactions.
    #[must_use]
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// The engine's policy configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // get_transaction
    // -----------------------------------------------------------------

    /// Open a transactional scope according to `definition`, returning the
    /// status handle to later pass to [`commit`](Self::commit) or
    /// [`rollback`](Self::rollback). A missing definition means all
    /// defaults.
    ///
    /// # Errors
    ///
    /// Fails with [`TxFlowError::InvalidTimeout`] for a timeout below `-1`,
    /// [`TxFlowError::IllegalState`] when the propagation behavior is
    /// incompatible with the current context, and propagates strategy
    /// failures.
    pub fn get_transaction(
        &self,
        definition: Option<&TransactionDefinition>,
    ) -> Result<TransactionStatus<S>> {
        let default_definition;
        let definition = match definition {
            Some(definition) => definition,
            None => {
                default_definition = TransactionDefinition::default();
                &default_definition
            }
        };

        let transaction = self.strategy.acquire()?;
        if self.strategy.is_existing(&transaction)? {
            return self.handle_existing(definition, transaction);
        }

        if definition.timeout_seconds() < TIMEOUT_DEFAULT {
            return Err(TxFlowError::InvalidTimeout {
                seconds: definition.timeout_seconds(),
            });
        }

        match definition.propagation() {
            Propagation::Mandatory => Err(TxFlowError::illegal_state(
                "no existing transaction found for transaction marked with propagation 'mandatory'",
            )),
            Propagation::Required | Propagation::RequiresNew | Propagation::Nested => {
                let suspended = self.suspend(None)?;
                debug!(definition = %definition, "creating new transaction");
                self.start_transaction(definition, transaction, suspended)
            }
            Propagation::Supports | Propagation::NotSupported | Propagation::Never => {
                // Empty scope: no actual transaction, potentially synchronization.
                if definition.isolation_level() != Isolation::Default {
                    warn!(
                        definition = %definition,
                        "custom isolation level specified but no actual transaction \
                         initiated; the isolation level will be ignored"
                    );
                }
                let new_synchronization = self.config.sync_mode() == SyncMode::Always;
                let status = self.build_status(definition, None, true, new_synchronization, None);
                self.prepare_synchronization(&status, definition)?;
                Ok(status)
            }
        }
    }

    /// Apply the propagation behavior against an existing transaction.
    fn handle_existing(
        &self,
        definition: &TransactionDefinition,
        mut transaction: S::Transaction,
    ) -> Result<TransactionStatus<S>> {
        match definition.propagation() {
            Propagation::Never => Err(TxFlowError::illegal_state(
                "existing transaction found for transaction marked with propagation 'never'",
            )),
            Propagation::NotSupported => {
                debug!("suspending current transaction");
                let suspended = self.suspend(Some(&mut transaction))?;
                let new_synchronization = self.config.sync_mode() == SyncMode::Always;
                let status =
                    self.build_status(definition, None, false, new_synchronization, suspended);
                self.prepare_synchronization(&status, definition)?;
                Ok(status)
            }
            Propagation::RequiresNew => {
                debug!(
                    definition = %definition,
                    "suspending current transaction, creating new transaction"
                );
                let suspended = self.suspend(Some(&mut transaction))?;
                self.start_transaction(definition, transaction, suspended)
            }
            Propagation::Nested => {
                if !self.config.nested_allowed() {
                    return Err(TxFlowError::nested_not_supported(
                        "nested scopes are disabled - enable 'nested_allowed' on the engine \
                         configuration",
                    ));
                }
                debug!(definition = %definition, "creating nested transaction");
                if self.strategy.use_savepoint_for_nested() {
                    // Savepoint within the existing transaction. Never
                    // activates a new synchronization scope.
                    let mut status =
                        self.build_status(definition, Some(transaction), false, false, None);
                    status.create_and_hold_savepoint()?;
                    Ok(status)
                } else {
                    // Nested begin; the strategy must detect the active
                    // transaction and nest within it.
                    self.start_transaction(definition, transaction, None)
                }
            }
            Propagation::Required | Propagation::Supports | Propagation::Mandatory => {
                debug!("participating in existing transaction");
                if self.config.validate_existing() {
                    self.validate_participation(definition)?;
                }
                let new_synchronization = self.config.sync_mode() != SyncMode::Never;
                let status = self.build_status(
                    definition,
                    Some(transaction),
                    false,
                    new_synchronization,
                    None,
                );
                self.prepare_synchronization(&status, definition)?;
                Ok(status)
            }
        }
    }

    /// Reject participation when the definition's isolation or read-only
    /// settings are incompatible with the transaction it would join.
    fn validate_participation(&self, definition: &TransactionDefinition) -> Result<()> {
        if definition.isolation_level() != Isolation::Default {
            let current = SyncRegistry::current_isolation();
            if current != Some(definition.isolation_level()) {
                return Err(TxFlowError::illegal_state(format!(
                    "participating transaction with definition [{definition}] specifies an \
                     isolation level incompatible with the existing transaction ({})",
                    current.map_or_else(|| "unknown".to_owned(), |level| level.to_string()),
                )));
            }
        }
        if !definition.is_read_only() && SyncRegistry::is_current_read_only() {
            return Err(TxFlowError::illegal_state(format!(
                "participating transaction with definition [{definition}] is not marked as \
                 read-only but the existing transaction is",
            )));
        }
        Ok(())
    }

    /// Begin a new transaction for `definition`, restoring any suspended
    /// state if the begin fails.
    fn start_transaction(
        &self,
        definition: &TransactionDefinition,
        mut transaction: S::Transaction,
        suspended: Option<SuspendedBundle<S>>,
    ) -> Result<TransactionStatus<S>> {
        let new_synchronization = self.config.sync_mode() != SyncMode::Never;
        let timeout = self.determine_timeout(definition);
        if let Err(begin_error) = self.strategy.begin(&mut transaction, definition, timeout) {
            return Err(self.resume_after_begin_failure(
                Some(&mut transaction),
                suspended,
                begin_error,
            ));
        }
        let status = self.build_status(
            definition,
            Some(transaction),
            true,
            new_synchronization,
            suspended,
        );
        self.prepare_synchronization(&status, definition)?;
        Ok(status)
    }

    fn build_status(
        &self,
        definition: &TransactionDefinition,
        transaction: Option<S::Transaction>,
        new_transaction: bool,
        new_synchronization: bool,
        suspended: Option<SuspendedBundle<S>>,
    ) -> TransactionStatus<S> {
        let actual_new_synchronization =
            new_synchronization && !SyncRegistry::is_synchronization_active();
        TransactionStatus::new(
            Arc::clone(&self.strategy),
            transaction,
            new_transaction,
            actual_new_synchronization,
            definition.is_read_only(),
            suspended,
        )
    }

    /// Install the scope's metadata in the context registry and activate
    /// callback synchronization, when this status owns it.
    fn prepare_synchronization(
        &self,
        status: &TransactionStatus<S>,
        definition: &TransactionDefinition,
    ) -> Result<()> {
        if status.is_new_synchronization() {
            SyncRegistry::set_actual_transaction_active(status.has_transaction());
            SyncRegistry::set_current_isolation(
                (definition.isolation_level() != Isolation::Default)
                    .then_some(definition.isolation_level()),
            );
            SyncRegistry::set_current_read_only(definition.is_read_only());
            SyncRegistry::set_current_name(definition.name().map(str::to_owned));
            SyncRegistry::init_synchronization()?;
        }
        Ok(())
    }

    /// Resolve the timeout to hand to the strategy: the definition's own,
    /// or the manager default when the definition leaves it unset.
    fn determine_timeout(&self, definition: &TransactionDefinition) -> i32 {
        if definition.timeout_seconds() != TIMEOUT_DEFAULT {
            definition.timeout_seconds()
        } else {
            self.config.default_timeout()
        }
    }

    // -----------------------------------------------------------------
    // Suspend / resume
    // -----------------------------------------------------------------

    /// Suspend the current synchronizations, and the given transaction's
    /// resources when one is passed. Returns `None` when neither a
    /// transaction nor synchronization is active.
    fn suspend(
        &self,
        transaction: Option<&mut S::Transaction>,
    ) -> Result<Option<SuspendedBundle<S>>> {
        if SyncRegistry::is_synchronization_active() {
            let suspended_synchronizations = self.suspend_synchronizations()?;
            let snapshot = (|| -> Result<_> {
                let mut suspended_resources = None;
                if let Some(transaction) = transaction {
                    suspended_resources = Some(self.strategy.suspend(transaction)?);
                }
                let name = SyncRegistry::current_name();
                SyncRegistry::set_current_name(None);
                let read_only = SyncRegistry::is_current_read_only();
                SyncRegistry::set_current_read_only(false);
                let isolation = SyncRegistry::current_isolation();
                SyncRegistry::set_current_isolation(None);
                let was_active = SyncRegistry::is_actual_transaction_active();
                SyncRegistry::set_actual_transaction_active(false);
                Ok((suspended_resources, name, read_only, isolation, was_active))
            })();
            match snapshot {
                Ok((resources, name, read_only, isolation, was_active)) => {
                    Ok(Some(SuspendedBundle::new(
                        resources,
                        suspended_synchronizations,
                        name,
                        read_only,
                        isolation,
                        was_active,
                    )))
                }
                Err(suspend_error) => {
                    // The strategy failed to suspend - the original
                    // transaction is still active, so reinstate its
                    // callbacks before surfacing the error.
                    if let Err(resume_error) =
                        self.resume_synchronizations(suspended_synchronizations)
                    {
                        error!(
                            error = %suspend_error,
                            "suspend error overridden by synchronization resume error"
                        );
                        return Err(resume_error);
                    }
                    Err(suspend_error)
                }
            }
        } else if let Some(transaction) = transaction {
            // Transaction active but no synchronization.
            let resources = self.strategy.suspend(transaction)?;
            Ok(Some(SuspendedBundle::resources_only(resources)))
        } else {
            Ok(None)
        }
    }

    /// Restore a suspended bundle: strategy resources first, then registry
    /// metadata, then the callbacks in their original registration order.
    fn resume(
        &self,
        transaction: Option<&mut S::Transaction>,
        bundle: SuspendedBundle<S>,
    ) -> Result<()> {
        let SuspendedBundle {
            resources,
            synchronizations,
            name,
            read_only,
            isolation,
            was_active,
        } = bundle;
        if let Some(resources) = resources {
            self.strategy.resume(transaction, resources)?;
        }
        if let Some(synchronizations) = synchronizations {
            SyncRegistry::set_actual_transaction_active(was_active);
            SyncRegistry::set_current_isolation(isolation);
            SyncRegistry::set_current_read_only(read_only);
            SyncRegistry::set_current_name(name);
            self.resume_synchronizations(synchronizations)?;
        }
        Ok(())
    }

    /// Restore the outer transaction after an inner begin failed, so the
    /// failure never leaks a suspended bundle.
    fn resume_after_begin_failure(
        &self,
        transaction: Option<&mut S::Transaction>,
        suspended: Option<SuspendedBundle<S>>,
        begin_error: TxFlowError,
    ) -> TxFlowError {
        if let Some(bundle) = suspended {
            if let Err(resume_error) = self.resume(transaction, bundle) {
                error!(
                    error = %begin_error,
                    "inner transaction begin error overridden by outer transaction resume error"
                );
                return resume_error;
            }
        }
        begin_error
    }

    /// Fire `suspend` on every registered callback in registration order,
    /// then deactivate synchronization; returns the suspended callbacks.
    fn suspend_synchronizations(&self) -> Result<SynchronizationList> {
        let synchronizations = SyncRegistry::synchronizations()?;
        for synchronization in &synchronizations {
            synchronization.suspend()?;
        }
        SyncRegistry::clear_synchronization();
        Ok(synchronizations)
    }

    /// Reactivate synchronization and fire `resume` on each callback in the
    /// original registration order, re-registering as it goes.
    fn resume_synchronizations(&self, synchronizations: SynchronizationList) -> Result<()> {
        SyncRegistry::init_synchronization()?;
        for synchronization in synchronizations {
            synchronization.resume()?;
            SyncRegistry::register_synchronization(synchronization)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // commit
    // -----------------------------------------------------------------

    /// Complete the scope, committing when permitted: a local rollback-only
    /// request and (unless the strategy opts out) a global rollback-only
    /// marker convert the commit into a rollback.
    ///
    /// # Errors
    ///
    /// Fails with [`TxFlowError::IllegalState`] if the status is already
    /// completed, [`TxFlowError::UnexpectedRollback`] when a rollback-only
    /// marker silently converted the commit, and propagates strategy and
    /// callback failures.
    pub fn commit(&self, status: &mut TransactionStatus<S>) -> Result<()> {
        self.ensure_not_completed(status)?;

        if status.is_local_rollback_only() {
            debug!("transactional code has requested rollback");
            return self.process_rollback(status, false);
        }

        if !self.strategy.should_commit_on_global_rollback_only() && status.is_global_rollback_only()
        {
            debug!(
                "global transaction is marked as rollback-only but transactional code \
                 requested commit"
            );
            return self.process_rollback(status, true);
        }

        self.process_commit(status)
    }

    fn process_commit(&self, status: &mut TransactionStatus<S>) -> Result<()> {
        let outcome = self.commit_attempt(status);
        self.finish_cleanup(status, outcome)
    }

    fn commit_attempt(&self, status: &mut TransactionStatus<S>) -> Result<()> {
        let mut before_completion_invoked = false;
        let step = self.commit_steps(status, &mut before_completion_invoked);
        match step {
            Ok(()) => {
                // An after-commit error propagates to the caller, but the
                // transaction is still considered committed.
                let after_commit = self.trigger_after_commit(status);
                self.trigger_after_completion(status, CompletionStatus::Committed);
                after_commit
            }
            Err(error) if error.is_unexpected_rollback() => {
                self.trigger_after_completion(status, CompletionStatus::RolledBack);
                Err(error)
            }
            Err(error) if error.is_system_error() => {
                // Strategy commit failure.
                if self.config.rollback_on_commit_failure() {
                    self.rollback_after_commit_error(status, &error)?;
                } else {
                    self.trigger_after_completion(status, CompletionStatus::Unknown);
                }
                Err(error)
            }
            Err(error) => {
                // Failure before or around the commit itself, e.g. from a
                // before-commit callback or the prepare hook.
                if !before_completion_invoked {
                    self.trigger_before_completion(status);
                }
                self.rollback_after_commit_error(status, &error)?;
                Err(error)
            }
        }
    }

    fn commit_steps(
        &self,
        status: &mut TransactionStatus<S>,
        before_completion_invoked: &mut bool,
    ) -> Result<()> {
        let mut unexpected_rollback = false;

        self.strategy.prepare_for_commit(status)?;
        self.trigger_before_commit(status)?;
        self.trigger_before_completion(status);
        *before_completion_invoked = true;

        if status.has_savepoint() {
            debug!("releasing transaction savepoint");
            unexpected_rollback = status.is_global_rollback_only();
            status.release_held_savepoint()?;
        } else if status.is_new_transaction() {
            debug!("initiating transaction commit");
            unexpected_rollback = status.is_global_rollback_only();
            self.strategy.commit(status)?;
        } else if self.config.fail_early_on_global_rollback_only() {
            unexpected_rollback = status.is_global_rollback_only();
        }

        // Surface a silent rollback when a global rollback-only marker was
        // set but the commit call itself did not report it.
        if unexpected_rollback {
            return Err(TxFlowError::unexpected_rollback(
                "transaction silently rolled back because it has been marked as rollback-only",
            ));
        }
        Ok(())
    }

    /// Attempt a rollback after a failed commit. On success the original
    /// commit error stands; a rollback failure overrides it.
    fn rollback_after_commit_error(
        &self,
        status: &mut TransactionStatus<S>,
        commit_error: &TxFlowError,
    ) -> Result<()> {
        let attempt: Result<()> = (|| {
            if status.is_new_transaction() {
                debug!("initiating transaction rollback after commit failure");
                self.strategy.rollback(status)?;
            } else if status.has_transaction()
                && self.config.global_rollback_on_participation_failure()
            {
                debug!("marking existing transaction as rollback-only after commit failure");
                self.strategy.set_rollback_only(status)?;
            }
            Ok(())
        })();
        if let Err(rollback_error) = attempt {
            error!(error = %commit_error, "commit error overridden by rollback error");
            self.trigger_after_completion(status, CompletionStatus::Unknown);
            return Err(rollback_error);
        }
        self.trigger_after_completion(status, CompletionStatus::RolledBack);
        Ok(())
    }

    // -----------------------------------------------------------------
    // rollback
    // -----------------------------------------------------------------

    /// Roll the scope back: to its savepoint for a nested scope, through
    /// the strategy for a new transaction, or by marking the outer
    /// transaction rollback-only when participating.
    ///
    /// # Errors
    ///
    /// Fails with [`TxFlowError::IllegalState`] if the status is already
    /// completed, and propagates strategy failures.
    pub fn rollback(&self, status: &mut TransactionStatus<S>) -> Result<()> {
        self.ensure_not_completed(status)?;
        self.process_rollback(status, false)
    }

    fn process_rollback(&self, status: &mut TransactionStatus<S>, unexpected: bool) -> Result<()> {
        let outcome = self.rollback_attempt(status, unexpected);
        self.finish_cleanup(status, outcome)
    }

    fn rollback_attempt(&self, status: &mut TransactionStatus<S>, unexpected: bool) -> Result<()> {
        let mut unexpected_rollback = unexpected;

        self.trigger_before_completion(status);

        let step: Result<()> = (|| {
            if status.has_savepoint() {
                debug!("rolling back transaction to savepoint");
                status.rollback_to_held_savepoint()?;
            } else if status.is_new_transaction() {
                debug!("initiating transaction rollback");
                self.strategy.rollback(status)?;
            } else {
                // Participating in a larger transaction.
                if status.has_transaction() {
                    if status.is_local_rollback_only()
                        || self.config.global_rollback_on_participation_failure()
                    {
                        debug!(
                            "participating transaction failed - marking existing transaction \
                             as rollback-only"
                        );
                        self.strategy.set_rollback_only(status)?;
                    } else {
                        debug!(
                            "participating transaction failed - letting the transaction \
                             originator decide on rollback"
                        );
                    }
                } else {
                    debug!("should roll back transaction but cannot - no transaction available");
                }
                // An unexpected rollback only matters here when failing early.
                if !self.config.fail_early_on_global_rollback_only() {
                    unexpected_rollback = false;
                }
            }
            Ok(())
        })();

        if let Err(error) = step {
            self.trigger_after_completion(status, CompletionStatus::Unknown);
            return Err(error);
        }

        self.trigger_after_completion(status, CompletionStatus::RolledBack);

        if unexpected_rollback {
            return Err(TxFlowError::unexpected_rollback(
                "transaction rolled back because it has been marked as rollback-only",
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Callback dispatch
    // -----------------------------------------------------------------

    fn trigger_before_commit(&self, status: &TransactionStatus<S>) -> Result<()> {
        if status.is_new_synchronization() {
            trace!("triggering before-commit callbacks");
            for synchronization in SyncRegistry::synchronizations()? {
                synchronization.before_commit(status.is_read_only())?;
            }
        }
        Ok(())
    }

    fn trigger_before_completion(&self, status: &TransactionStatus<S>) {
        if status.is_new_synchronization() {
            trace!("triggering before-completion callbacks");
            for synchronization in SyncRegistry::synchronizations().unwrap_or_default() {
                if let Err(err) = synchronization.before_completion() {
                    warn!(error = %err, "before-completion callback failed");
                }
            }
        }
    }

    fn trigger_after_commit(&self, status: &TransactionStatus<S>) -> Result<()> {
        if status.is_new_synchronization() {
            trace!("triggering after-commit callbacks");
            for synchronization in SyncRegistry::synchronizations()? {
                synchronization.after_commit()?;
            }
        }
        Ok(())
    }

    fn trigger_after_completion(&self, status: &TransactionStatus<S>, completion: CompletionStatus) {
        if status.is_new_synchronization() {
            let synchronizations = SyncRegistry::synchronizations().unwrap_or_default();
            SyncRegistry::clear_synchronization();
            if !status.has_transaction() || status.is_new_transaction() {
                // No transaction, or one owned by this scope: the outcome is
                // known, invoke immediately.
                trace!(outcome = %completion, "triggering after-completion callbacks");
                invoke_after_completion(&synchronizations, completion);
            } else if !synchronizations.is_empty() {
                // Participating in a transaction controlled outside this
                // engine's scope: the strategy decides how to defer.
                if let Some(transaction) = status.transaction() {
                    if let Err(err) = self
                        .strategy
                        .register_after_completion(transaction, synchronizations)
                    {
                        warn!(
                            error = %err,
                            "failed to hand after-completion callbacks to the outer transaction"
                        );
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Cleanup
    // -----------------------------------------------------------------

    fn ensure_not_completed(&self, status: &TransactionStatus<S>) -> Result<()> {
        if status.is_completed() {
            return Err(TxFlowError::illegal_state(
                "transaction is already completed - do not call commit or rollback more than \
                 once per transaction",
            ));
        }
        Ok(())
    }

    /// Run completion cleanup after an attempt, preferring a cleanup error
    /// over the attempt's own outcome.
    fn finish_cleanup(&self, status: &mut TransactionStatus<S>, outcome: Result<()>) -> Result<()> {
        match self.cleanup_after_completion(status) {
            Ok(()) => outcome,
            Err(cleanup_error) => {
                if let Err(error) = &outcome {
                    error!(
                        error = %error,
                        "completion error overridden by resume error during cleanup"
                    );
                }
                Err(cleanup_error)
            }
        }
    }

    /// Mark the status completed, release registry and holder state, and
    /// restore any suspended outer transaction.
    fn cleanup_after_completion(&self, status: &mut TransactionStatus<S>) -> Result<()> {
        status.mark_completed();
        if status.is_new_synchronization() {
            SyncRegistry::clear();
        }
        if status.is_new_transaction() {
            if let Some(transaction) = status.transaction_mut() {
                self.strategy.cleanup(transaction);
            }
        }
        if let Some(bundle) = status.take_suspended() {
            debug!("resuming suspended transaction after completion of inner transaction");
            self.resume(status.transaction_mut(), bundle)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Closure-scoped execution
    // -----------------------------------------------------------------

    /// Run `f` within a transactional scope for `definition`: commit on
    /// `Ok`, roll back on `Err`. A rollback failure overrides the
    /// application error.
    pub fn execute<T, F>(
        &self,
        definition: Option<&TransactionDefinition>,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut TransactionStatus<S>) -> Result<T>,
    {
        let mut status = self.get_transaction(definition)?;
        match f(&mut status) {
            Ok(value) => {
                self.commit(&mut status)?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = self.rollback(&mut status) {
                    error!(error = %error, "application error overridden by rollback error");
                    return Err(rollback_error);
                }
                Err(error)
            }
        }
    }
}
