//! Public API facade for txflow.
//!
//! txflow is a transaction management core: a propagation workflow engine
//! ([`TransactionEngine`]) that drives begin/participate/suspend/savepoint
//! decisions over a pluggable [`TransactionStrategy`], with
//! execution-context-local synchronization callbacks.
//!
//! ```no_run
//! use txflow::{Propagation, TransactionDefinition, TransactionEngine};
//! # use txflow::{Result, TransactionStrategy};
//! # fn demo<S: TransactionStrategy>(engine: &TransactionEngine<S>) -> Result<()> {
//! let definition = TransactionDefinition::with_propagation(Propagation::RequiresNew)
//!     .named("checkout");
//! let value = engine.execute(Some(&definition), |_status| Ok(42))?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

pub use txflow_core::{
    invoke_after_completion, EngineConfig, ResourceKey, SuspendedBundle, SyncMode, SyncRegistry,
    SynchronizationList, TransactionEngine, TransactionStatus, TransactionStrategy,
    TransactionSynchronization,
};
pub use txflow_error::{Result, TxFlowError};
pub use txflow_types::{
    CompletionStatus, Isolation, Propagation, TransactionDefinition, TIMEOUT_DEFAULT,
};
