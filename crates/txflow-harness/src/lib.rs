//! Test harness for the txflow engine.
//!
//! Provides the pieces the scenario and property tests are built from:
//!
//! - [`StubStrategy`]: an in-memory resource strategy with a call journal
//!   and injectable faults, so tests can assert exactly which native
//!   primitives the engine drove and in which order.
//! - [`ProbeSynchronization`]: a lifecycle callback that records every hook
//!   invocation into a shared, ordered [`EventLog`].
//!
//! Everything here is deterministic and context-local, matching the
//! engine's execution model.

pub mod probe;
pub mod stub;

pub use probe::{EventLog, FailPoint, ProbeSynchronization, SyncEvent};
pub use stub::{StrategyCall, StubHolder, StubSavepoint, StubStrategy, StubTransaction};
