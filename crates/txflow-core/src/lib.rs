//! Propagation workflow engine for the txflow transaction framework.
//!
//! The engine decides, for each caller-declared
//! [`TransactionDefinition`](txflow_types::TransactionDefinition), whether to
//! begin a new resource-backed transaction, participate in an existing one,
//! suspend-and-replace it, create a savepoint, or run without transactional
//! scope - then commits or rolls back through the same discipline.
//!
//! Native resource primitives are supplied by a [`TransactionStrategy`];
//! per-context callback and metadata state lives in the [`SyncRegistry`].

pub mod config;
pub mod engine;
pub mod registry;
pub mod status;
pub mod strategy;
pub mod synchronization;

pub use config::{EngineConfig, SyncMode};
pub use engine::TransactionEngine;
pub use registry::{ResourceKey, SyncRegistry};
pub use status::{SuspendedBundle, TransactionStatus};
pub use strategy::TransactionStrategy;
pub use synchronization::{
    invoke_after_completion, SynchronizationList, TransactionSynchronization,
};
