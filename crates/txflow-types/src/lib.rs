//! Core value types for the txflow transaction workflow engine.
//!
//! This crate defines the immutable vocabulary shared by the engine, the
//! resource strategies and the synchronization callbacks:
//!
//! - [`Propagation`]: how a new transactional scope relates to an active one.
//! - [`Isolation`]: guarantee strength against concurrent anomalies.
//! - [`TransactionDefinition`]: a caller-declared transaction demarcation.
//! - [`CompletionStatus`]: the outcome handed to after-completion callbacks.
//!
//! All enums carry stable integer encodings matching the standard database
//! driver constants, so definitions can round-trip through configuration and
//! wire formats without private mapping tables.

pub mod completion;
pub mod definition;
pub mod isolation;
pub mod propagation;

pub use completion::CompletionStatus;
pub use definition::{TransactionDefinition, TIMEOUT_DEFAULT};
pub use isolation::Isolation;
pub use propagation::Propagation;
