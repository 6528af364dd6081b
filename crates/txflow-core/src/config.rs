//! Engine policy configuration.

use txflow_error::{Result, TxFlowError};
use txflow_types::TIMEOUT_DEFAULT;

/// When the engine activates callback synchronization for a new scope.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum SyncMode {
    /// Activate synchronization for every scope, including "empty" ones that
    /// carry no actual transaction.
    #[default]
    Always,
    /// Activate synchronization only for scopes backed by an actual
    /// transaction.
    OnActual,
    /// Never activate synchronization.
    Never,
}

/// Flat policy configuration for a [`TransactionEngine`](crate::TransactionEngine).
///
/// All fields are set before the engine is built and read-only during
/// operation. The defaults match the conservative behavior documented on
/// each builder method.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    sync_mode: SyncMode,
    default_timeout: i32,
    nested_allowed: bool,
    validate_existing: bool,
    global_rollback_on_participation_failure: bool,
    fail_early_on_global_rollback_only: bool,
    rollback_on_commit_failure: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::Always,
            default_timeout: TIMEOUT_DEFAULT,
            nested_allowed: false,
            validate_existing: false,
            global_rollback_on_participation_failure: true,
            fail_early_on_global_rollback_only: false,
            rollback_on_commit_failure: false,
        }
    }
}

impl EngineConfig {
    /// Replace the synchronization activation mode. Default: [`SyncMode::Always`].
    #[must_use]
    pub fn with_sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }

    /// Replace the fallback timeout applied when a definition leaves its
    /// timeout at the default, in seconds.
    ///
    /// # Errors
    ///
    /// Fails with [`TxFlowError::InvalidTimeout`] for values below `-1`.
    pub fn with_default_timeout(mut self, seconds: i32) -> Result<Self> {
        if seconds < TIMEOUT_DEFAULT {
            return Err(TxFlowError::InvalidTimeout { seconds });
        }
        self.default_timeout = seconds;
        Ok(self)
    }

    /// Allow `Nested` propagation. Default: `false`.
    #[must_use]
    pub fn with_nested_allowed(mut self, allowed: bool) -> Self {
        self.nested_allowed = allowed;
        self
    }

    /// Validate isolation and read-only compatibility before participating
    /// in an existing transaction. Default: `false` (lenient).
    #[must_use]
    pub fn with_validate_existing(mut self, validate: bool) -> Self {
        self.validate_existing = validate;
        self
    }

    /// Mark the whole transaction rollback-only when a participating scope
    /// rolls back. Default: `true`.
    #[must_use]
    pub fn with_global_rollback_on_participation_failure(mut self, global: bool) -> Self {
        self.global_rollback_on_participation_failure = global;
        self
    }

    /// Surface an unexpected-rollback error as soon as a global
    /// rollback-only marker is seen, even at an inner scope boundary.
    /// Default: `false` (only the outermost boundary reports it).
    #[must_use]
    pub fn with_fail_early_on_global_rollback_only(mut self, fail_early: bool) -> Self {
        self.fail_early_on_global_rollback_only = fail_early;
        self
    }

    /// Attempt a rollback when the strategy's commit fails. Default: `false`.
    #[must_use]
    pub fn with_rollback_on_commit_failure(mut self, rollback: bool) -> Self {
        self.rollback_on_commit_failure = rollback;
        self
    }

    #[inline]
    #[must_use]
    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    #[inline]
    #[must_use]
    pub fn default_timeout(&self) -> i32 {
        self.default_timeout
    }

    #[inline]
    #[must_use]
    pub fn nested_allowed(&self) -> bool {
        self.nested_allowed
    }

    #[inline]
    #[must_use]
    pub fn validate_existing(&self) -> bool {
        self.validate_existing
    }

    #[inline]
    #[must_use]
    pub fn global_rollback_on_participation_failure(&self) -> bool {
        self.global_rollback_on_participation_failure
    }

    #[inline]
    #[must_use]
    pub fn fail_early_on_global_rollback_only(&self) -> bool {
        self.fail_early_on_global_rollback_only
    }

    #[inline]
    #[must_use]
    pub fn rollback_on_commit_failure(&self) -> bool {
        self.rollback_on_commit_failure
    }
}
