//! Execution-context-local synchronization registry.
//!
//! One independent registry exists per execution context (an OS thread).
//! It tracks the registered callbacks, the active-transaction metadata
//! (name, isolation, read-only flag, actual-activity flag) and the resource
//! bindings that strategies install while a transaction runs.
//!
//! The engine suspends and restores this state in LIFO discipline across
//! nested scopes; after top-level completion the registry equals its
//! pre-call state.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use txflow_error::{Result, TxFlowError};
use txflow_types::Isolation;

use crate::synchronization::{SynchronizationList, TransactionSynchronization};

/// Key under which a strategy binds its resource holder for the current
/// execution context. Each strategy instance allocates its own key, so two
/// strategies over different resources never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceKey(u64);

impl ResourceKey {
    /// Allocate a process-unique key.
    #[must_use]
    pub fn allocate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw key value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

#[derive(Default)]
struct RegistryState {
    /// `Some` while synchronization is active for this context.
    synchronizations: Option<SynchronizationList>,
    current_name: Option<String>,
    current_read_only: bool,
    current_isolation: Option<Isolation>,
    actual_transaction_active: bool,
    resources: HashMap<ResourceKey, Rc<dyn Any>>,
}

thread_local! {
    static REGISTRY: RefCell<RegistryState> = RefCell::new(RegistryState::default());
}

/// Access point for the current context's registry.
///
/// All operations act on the calling context's state only; no state is
/// shared across concurrent contexts. Callbacks are never invoked while a
/// registry borrow is held, so hooks may themselves call back into the
/// registry.
pub struct SyncRegistry;

impl SyncRegistry {
    /// Whether callback synchronization is active for the current context.
    #[must_use]
    pub fn is_synchronization_active() -> bool {
        REGISTRY.with(|state| state.borrow().synchronizations.is_some())
    }

    /// Activate callback synchronization for the current context.
    ///
    /// # Errors
    ///
    /// Fails with [`TxFlowError::IllegalState`] if synchronization is
    /// already active.
    pub fn init_synchronization() -> Result<()> {
        REGISTRY.with(|state| {
            let mut state = state.borrow_mut();
            if state.synchronizations.is_some() {
                return Err(TxFlowError::illegal_state(
                    "cannot activate transaction synchronization - already active",
                ));
            }
            state.synchronizations = Some(SynchronizationList::new());
            Ok(())
        })
    }

    /// Register a callback with the active synchronization.
    ///
    /// # Errors
    ///
    /// Fails with [`TxFlowError::IllegalState`] if synchronization is not
    /// active.
    pub fn register_synchronization(
        synchronization: Rc<dyn TransactionSynchronization>,
    ) -> Result<()> {
        REGISTRY.with(|state| {
            let mut state = state.borrow_mut();
            match &mut state.synchronizations {
                Some(list) => {
                    list.push(synchronization);
                    Ok(())
                }
                None => Err(TxFlowError::illegal_state(
                    "transaction synchronization is not active",
                )),
            }
        })
    }

    /// Snapshot of the registered callbacks, in registration order.
    ///
    /// # Errors
    ///
    /// Fails with [`TxFlowError::IllegalState`] if synchronization is not
    /// active.
    pub fn synchronizations() -> Result<SynchronizationList> {
        REGISTRY.with(|state| {
            state
                .borrow()
                .synchronizations
                .clone()
                .ok_or_else(|| TxFlowError::illegal_state("transaction synchronization is not active"))
        })
    }

    /// Deactivate synchronization, dropping any registered callbacks.
    pub fn clear_synchronization() {
        REGISTRY.with(|state| state.borrow_mut().synchronizations = None);
    }

    /// Reset synchronization and all transaction metadata. Resource bindings
    /// are left alone; they are owned by the strategies that installed them.
    pub fn clear() {
        REGISTRY.with(|state| {
            let mut state = state.borrow_mut();
            state.synchronizations = None;
            state.current_name = None;
            state.current_read_only = false;
            state.current_isolation = None;
            state.actual_transaction_active = false;
        });
    }

    /// Name of the current transaction, if synchronization metadata is set.
    #[must_use]
    pub fn current_name() -> Option<String> {
        REGISTRY.with(|state| state.borrow().current_name.clone())
    }

    pub fn set_current_name(name: Option<String>) {
        REGISTRY.with(|state| state.borrow_mut().current_name = name);
    }

    /// Read-only flag of the current transaction.
    #[must_use]
    pub fn is_current_read_only() -> bool {
        REGISTRY.with(|state| state.borrow().current_read_only)
    }

    pub fn set_current_read_only(read_only: bool) {
        REGISTRY.with(|state| state.borrow_mut().current_read_only = read_only);
    }

    /// Isolation level of the current transaction; `None` when unset or
    /// left at the resource default.
    #[must_use]
    pub fn current_isolation() -> Option<Isolation> {
        REGISTRY.with(|state| state.borrow().current_isolation)
    }

    pub fn set_current_isolation(isolation: Option<Isolation>) {
        REGISTRY.with(|state| state.borrow_mut().current_isolation = isolation);
    }

    /// Whether an actual resource-backed transaction is active, as opposed
    /// to an empty synchronization-only scope.
    #[must_use]
    pub fn is_actual_transaction_active() -> bool {
        REGISTRY.with(|state| state.borrow().actual_transaction_active)
    }

    pub fn set_actual_transaction_active(active: bool) {
        REGISTRY.with(|state| state.borrow_mut().actual_transaction_active = active);
    }

    /// Bind a resource holder for the current context.
    ///
    /// # Errors
    ///
    /// Fails with [`TxFlowError::IllegalState`] if the key is already bound;
    /// two begins without an intervening suspend are not permitted.
    pub fn bind_resource(key: ResourceKey, value: Rc<dyn Any>) -> Result<()> {
        REGISTRY.with(|state| {
            let mut state = state.borrow_mut();
            if state.resources.contains_key(&key) {
                return Err(TxFlowError::illegal_state(format!(
                    "already a resource bound for key {key}"
                )));
            }
            state.resources.insert(key, value);
            Ok(())
        })
    }

    /// Remove and return the binding for `key`.
    ///
    /// # Errors
    ///
    /// Fails with [`TxFlowError::IllegalState`] if no resource is bound.
    pub fn unbind_resource(key: ResourceKey) -> Result<Rc<dyn Any>> {
        REGISTRY.with(|state| {
            state.borrow_mut().resources.remove(&key).ok_or_else(|| {
                TxFlowError::illegal_state(format!("no resource bound for key {key}"))
            })
        })
    }

    /// Remove and return the binding for `key`, if present.
    pub fn unbind_resource_if_possible(key: ResourceKey) -> Option<Rc<dyn Any>> {
        REGISTRY.with(|state| state.borrow_mut().resources.remove(&key))
    }

    /// Shared handle to the binding for `key`, if present.
    #[must_use]
    pub fn get_resource(key: ResourceKey) -> Option<Rc<dyn Any>> {
        REGISTRY.with(|state| state.borrow().resources.get(&key).cloned())
    }

    /// Whether a binding exists for `key`.
    #[must_use]
    pub fn has_resource(key: ResourceKey) -> bool {
        REGISTRY.with(|state| state.borrow().resources.contains_key(&key))
    }
}
