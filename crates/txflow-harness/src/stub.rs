//! In-memory resource strategy with a call journal and injectable faults.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use parking_lot::Mutex;
use txflow_core::{ResourceKey, SyncRegistry, TransactionStatus, TransactionStrategy};
use txflow_error::{Result, TxFlowError};
use txflow_types::{Isolation, TransactionDefinition};

/// One native primitive the engine drove, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyCall {
    Begin {
        transaction: u64,
        name: Option<String>,
        isolation: Isolation,
        read_only: bool,
        timeout: i32,
    },
    /// A begin nested inside an already-active transaction (nested-via-begin
    /// mode).
    BeginNested { transaction: u64 },
    Commit { transaction: u64 },
    Rollback { transaction: u64 },
    SetRollbackOnly { transaction: u64 },
    Suspend { transaction: u64 },
    Resume { transaction: u64 },
    Cleanup { transaction: u64 },
    CreateSavepoint { transaction: u64, savepoint: u32 },
    RollbackToSavepoint { transaction: u64, savepoint: u32 },
    ReleaseSavepoint { transaction: u64, savepoint: u32 },
}

/// Holder for one native transaction, bound to the execution context while
/// the transaction runs.
#[derive(Debug)]
pub struct StubHolder {
    id: u64,
    active: Cell<bool>,
    rollback_only: Cell<bool>,
    /// Nesting depth for nested-via-begin mode; 0 for a top-level scope.
    depth: Cell<u32>,
}

impl StubHolder {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    #[must_use]
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only.get()
    }
}

/// Transaction token handed to the engine; wraps the context-bound holder,
/// if any.
#[derive(Debug, Default)]
pub struct StubTransaction {
    holder: Option<Rc<StubHolder>>,
    /// Whether this token opened a nested level on an already-active holder.
    nested: bool,
}

impl StubTransaction {
    /// The bound holder's id, if the token reflects a live transaction.
    #[must_use]
    pub fn holder_id(&self) -> Option<u64> {
        self.holder.as_ref().map(|holder| holder.id)
    }
}

/// Opaque savepoint handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubSavepoint(u32);

impl StubSavepoint {
    #[must_use]
    pub fn id(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Default)]
struct Faults {
    begin: bool,
    commit: bool,
    rollback: bool,
    suspend: bool,
    resume: bool,
}

#[derive(Default)]
struct Shared {
    journal: Vec<StrategyCall>,
    faults: Faults,
    next_transaction: u64,
    next_savepoint: u32,
}

/// In-memory [`TransactionStrategy`] for tests.
///
/// The strategy binds a [`StubHolder`] into the context registry on begin
/// and releases it on completion, so tests observe the same binding
/// discipline a real connection-holder strategy would follow. Every
/// primitive is appended to a journal; faults can be injected per
/// primitive.
///
/// Clones share the journal, the fault switches and the resource key, so
/// two engines can drive the same underlying resource.
#[derive(Clone)]
pub struct StubStrategy {
    key: ResourceKey,
    shared: Arc<Mutex<Shared>>,
    use_savepoint_for_nested: bool,
    suspension_supported: bool,
    commit_on_global_rollback_only: bool,
}

impl Default for StubStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl StubStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: ResourceKey::allocate(),
            shared: Arc::new(Mutex::new(Shared::default())),
            use_savepoint_for_nested: true,
            suspension_supported: true,
            commit_on_global_rollback_only: false,
        }
    }

    /// Realize nested scopes as nested begin calls instead of savepoints.
    #[must_use]
    pub fn with_nested_via_begin(mut self) -> Self {
        self.use_savepoint_for_nested = false;
        self
    }

    /// Refuse suspension, like a resource without suspend support.
    #[must_use]
    pub fn without_suspension(mut self) -> Self {
        self.suspension_supported = false;
        self
    }

    /// Request the commit call even when globally marked rollback-only,
    /// like an outer coordinator that reports the rollback itself.
    #[must_use]
    pub fn with_commit_on_global_rollback_only(mut self) -> Self {
        self.commit_on_global_rollback_only = true;
        self
    }

    /// The key under which this strategy binds its holder.
    #[must_use]
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    /// Whether a holder is currently bound for this strategy in the
    /// calling context.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        SyncRegistry::has_resource(self.key)
    }

    /// Snapshot of the call journal.
    #[must_use]
    pub fn calls(&self) -> Vec<StrategyCall> {
        self.shared.lock().journal.clone()
    }

    /// Number of journal entries matching `predicate`.
    #[must_use]
    pub fn count_calls(&self, predicate: impl Fn(&StrategyCall) -> bool) -> usize {
        self.shared.lock().journal.iter().filter(|call| predicate(call)).count()
    }

    pub fn clear_calls(&self) {
        self.shared.lock().journal.clear();
    }

    pub fn fail_begin(&self, fail: bool) {
        self.shared.lock().faults.begin = fail;
    }

    pub fn fail_commit(&self, fail: bool) {
        self.shared.lock().faults.commit = fail;
    }

    pub fn fail_rollback(&self, fail: bool) {
        self.shared.lock().faults.rollback = fail;
    }

    pub fn fail_suspend(&self, fail: bool) {
        self.shared.lock().faults.suspend = fail;
    }

    pub fn fail_resume(&self, fail: bool) {
        self.shared.lock().faults.resume = fail;
    }

    fn record(&self, call: StrategyCall) {
        self.shared.lock().journal.push(call);
    }

    fn bound_holder(&self) -> Option<Rc<StubHolder>> {
        SyncRegistry::get_resource(self.key)
            .and_then(|resource| resource.downcast::<StubHolder>().ok())
    }

    /// Release the context binding if it is the given holder's.
    fn unbind_if_current(&self, holder: &StubHolder) {
        if self
            .bound_holder()
            .is_some_and(|bound| bound.id == holder.id)
        {
            SyncRegistry::unbind_resource_if_possible(self.key);
        }
    }

    fn status_holder(status: &TransactionStatus<Self>) -> Result<Rc<StubHolder>> {
        status
            .transaction()
            .and_then(|transaction| transaction.holder.clone())
            .ok_or_else(|| {
                TxFlowError::illegal_state("status carries no native transaction holder")
            })
    }
}

impl TransactionStrategy for StubStrategy {
    type Transaction = StubTransaction;
    type Suspended = Rc<StubHolder>;
    type Savepoint = StubSavepoint;

    fn acquire(&self) -> Result<StubTransaction> {
        Ok(StubTransaction {
            holder: self.bound_holder(),
            nested: false,
        })
    }

    fn is_existing(&self, transaction: &StubTransaction) -> Result<bool> {
        Ok(transaction
            .holder
            .as_ref()
            .is_some_and(|holder| holder.active.get()))
    }

    fn begin(
        &self,
        transaction: &mut StubTransaction,
        definition: &TransactionDefinition,
        timeout: i32,
    ) -> Result<()> {
        if self.shared.lock().faults.begin {
            return Err(TxFlowError::system("begin", "injected begin failure"));
        }

        // Nested-via-begin: an active holder means this begin nests inside
        // it rather than opening a fresh native transaction.
        if let Some(holder) = &transaction.holder {
            if holder.active.get() {
                holder.depth.set(holder.depth.get() + 1);
                transaction.nested = true;
                self.record(StrategyCall::BeginNested {
                    transaction: holder.id,
                });
                return Ok(());
            }
        }

        let id = {
            let mut shared = self.shared.lock();
            shared.next_transaction += 1;
            shared.next_transaction
        };
        let holder = Rc::new(StubHolder {
            id,
            active: Cell::new(true),
            rollback_only: Cell::new(false),
            depth: Cell::new(0),
        });
        SyncRegistry::bind_resource(self.key, Rc::clone(&holder) as Rc<dyn Any>)?;
        self.record(StrategyCall::Begin {
            transaction: id,
            name: definition.name().map(str::to_owned),
            isolation: definition.isolation_level(),
            read_only: definition.is_read_only(),
            timeout,
        });
        transaction.holder = Some(holder);
        Ok(())
    }

    fn suspend(&self, transaction: &mut StubTransaction) -> Result<Rc<StubHolder>> {
        if !self.suspension_supported {
            return Err(TxFlowError::SuspensionNotSupported);
        }
        if self.shared.lock().faults.suspend {
            return Err(TxFlowError::system("suspend", "injected suspend failure"));
        }
        let holder = transaction.holder.take().ok_or_else(|| {
            TxFlowError::illegal_state("no active transaction holder to suspend")
        })?;
        SyncRegistry::unbind_resource(self.key)?;
        self.record(StrategyCall::Suspend {
            transaction: holder.id,
        });
        Ok(holder)
    }

    fn resume(
        &self,
        transaction: Option<&mut StubTransaction>,
        suspended: Rc<StubHolder>,
    ) -> Result<()> {
        if self.shared.lock().faults.resume {
            return Err(TxFlowError::system("resume", "injected resume failure"));
        }
        self.record(StrategyCall::Resume {
            transaction: suspended.id,
        });
        SyncRegistry::bind_resource(self.key, Rc::clone(&suspended) as Rc<dyn Any>)?;
        if let Some(transaction) = transaction {
            transaction.holder = Some(suspended);
        }
        Ok(())
    }

    fn commit(&self, status: &mut TransactionStatus<Self>) -> Result<()> {
        let holder = Self::status_holder(status)?;
        if self.shared.lock().faults.commit {
            return Err(TxFlowError::system("commit", "injected commit failure"));
        }
        self.record(StrategyCall::Commit {
            transaction: holder.id,
        });
        if holder.depth.get() > 0 {
            holder.depth.set(holder.depth.get() - 1);
            return Ok(());
        }
        holder.active.set(false);
        self.unbind_if_current(&holder);
        Ok(())
    }

    fn rollback(&self, status: &mut TransactionStatus<Self>) -> Result<()> {
        let holder = Self::status_holder(status)?;
        if self.shared.lock().faults.rollback {
            return Err(TxFlowError::system("rollback", "injected rollback failure"));
        }
        self.record(StrategyCall::Rollback {
            transaction: holder.id,
        });
        if holder.depth.get() > 0 {
            holder.depth.set(holder.depth.get() - 1);
            return Ok(());
        }
        holder.active.set(false);
        self.unbind_if_current(&holder);
        Ok(())
    }

    fn set_rollback_only(&self, status: &mut TransactionStatus<Self>) -> Result<()> {
        let holder = Self::status_holder(status)?;
        holder.rollback_only.set(true);
        self.record(StrategyCall::SetRollbackOnly {
            transaction: holder.id,
        });
        Ok(())
    }

    fn is_rollback_only(&self, transaction: &StubTransaction) -> bool {
        transaction
            .holder
            .as_ref()
            .is_some_and(|holder| holder.rollback_only.get())
    }

    fn cleanup(&self, transaction: &mut StubTransaction) {
        if let Some(holder) = transaction.holder.take() {
            self.record(StrategyCall::Cleanup {
                transaction: holder.id,
            });
            // A nested level leaves the enclosing native transaction alone.
            if !transaction.nested {
                holder.active.set(false);
                self.unbind_if_current(&holder);
            }
        }
    }

    fn use_savepoint_for_nested(&self) -> bool {
        self.use_savepoint_for_nested
    }

    fn should_commit_on_global_rollback_only(&self) -> bool {
        self.commit_on_global_rollback_only
    }

    fn create_savepoint(&self, transaction: &mut StubTransaction) -> Result<StubSavepoint> {
        let holder = transaction.holder.as_ref().ok_or_else(|| {
            TxFlowError::nested_not_supported("no active transaction to create a savepoint on")
        })?;
        let id = {
            let mut shared = self.shared.lock();
            shared.next_savepoint += 1;
            shared.next_savepoint
        };
        self.record(StrategyCall::CreateSavepoint {
            transaction: holder.id,
            savepoint: id,
        });
        Ok(StubSavepoint(id))
    }

    fn rollback_to_savepoint(
        &self,
        transaction: &mut StubTransaction,
        savepoint: &StubSavepoint,
    ) -> Result<()> {
        let holder = transaction.holder.as_ref().ok_or_else(|| {
            TxFlowError::nested_not_supported("no active transaction to roll back within")
        })?;
        self.record(StrategyCall::RollbackToSavepoint {
            transaction: holder.id,
            savepoint: savepoint.0,
        });
        Ok(())
    }

    fn release_savepoint(
        &self,
        transaction: &mut StubTransaction,
        savepoint: StubSavepoint,
    ) -> Result<()> {
        let holder = transaction.holder.as_ref().ok_or_else(|| {
            TxFlowError::nested_not_supported("no active transaction to release a savepoint on")
        })?;
        self.record(StrategyCall::ReleaseSavepoint {
            transaction: holder.id,
            savepoint: savepoint.0,
        });
        Ok(())
    }
}
