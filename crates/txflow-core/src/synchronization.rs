//! Synchronization callbacks: user-registered observers of the transaction
//! lifecycle.
//!
//! Callbacks are registered with the [`SyncRegistry`](crate::SyncRegistry)
//! for the current execution context and invoked synchronously by the engine
//! in registration order. All hooks default to no-ops so implementors only
//! override what they observe.

use std::rc::Rc;

use smallvec::SmallVec;
use tracing::warn;
use txflow_error::Result;
use txflow_types::CompletionStatus;

/// Observer of transaction lifecycle events.
///
/// Hook errors are handled per the workflow contract: `before_commit`,
/// `after_commit`, `suspend`, `resume` and `flush` errors propagate to the
/// caller; `before_completion` and `after_completion` errors are logged and
/// the remaining callbacks still run.
pub trait TransactionSynchronization {
    /// The owning transaction is being suspended.
    fn suspend(&self) -> Result<()> {
        Ok(())
    }

    /// The owning transaction is being resumed.
    fn resume(&self) -> Result<()> {
        Ok(())
    }

    /// Flush pending state to the underlying resource, if any.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// The transaction is about to commit.
    fn before_commit(&self, _read_only: bool) -> Result<()> {
        Ok(())
    }

    /// The transaction is about to complete, by commit or rollback.
    fn before_completion(&self) -> Result<()> {
        Ok(())
    }

    /// The transaction has committed.
    fn after_commit(&self) -> Result<()> {
        Ok(())
    }

    /// The transaction has completed with the given outcome.
    fn after_completion(&self, _status: CompletionStatus) -> Result<()> {
        Ok(())
    }
}

/// Ordered list of registered callbacks. Small scopes register a handful of
/// callbacks, so the list stays inline.
pub type SynchronizationList = SmallVec<[Rc<dyn TransactionSynchronization>; 4]>;

/// Invoke `after_completion` on every callback in registration order,
/// logging and swallowing individual failures so one callback cannot starve
/// the rest.
pub fn invoke_after_completion(
    synchronizations: &[Rc<dyn TransactionSynchronization>],
    status: CompletionStatus,
) {
    for synchronization in synchronizations {
        if let Err(err) = synchronization.after_completion(status) {
            warn!(error = %err, outcome = %status, "after-completion callback failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use txflow_error::TxFlowError;

    use super::*;

    struct Recording {
        seen: RefCell<Vec<CompletionStatus>>,
        fail: bool,
    }

    impl TransactionSynchronization for Recording {
        fn after_completion(&self, status: CompletionStatus) -> Result<()> {
            self.seen.borrow_mut().push(status);
            if self.fail {
                return Err(TxFlowError::system("after_completion", "boom"));
            }
            Ok(())
        }
    }

    #[test]
    fn default_hooks_are_noops() {
        struct Silent;
        impl TransactionSynchronization for Silent {}

        let sync = Silent;
        assert!(sync.suspend().is_ok());
        assert!(sync.resume().is_ok());
        assert!(sync.flush().is_ok());
        assert!(sync.before_commit(true).is_ok());
        assert!(sync.before_completion().is_ok());
        assert!(sync.after_commit().is_ok());
        assert!(sync.after_completion(CompletionStatus::Unknown).is_ok());
    }

    #[test]
    fn after_completion_failure_does_not_starve_later_callbacks() {
        let first = Rc::new(Recording {
            seen: RefCell::new(Vec::new()),
            fail: true,
        });
        let second = Rc::new(Recording {
            seen: RefCell::new(Vec::new()),
            fail: false,
        });

        let list: Vec<Rc<dyn TransactionSynchronization>> =
            vec![Rc::clone(&first) as _, Rc::clone(&second) as _];
        invoke_after_completion(&list, CompletionStatus::Committed);

        assert_eq!(*first.seen.borrow(), vec![CompletionStatus::Committed]);
        assert_eq!(*second.seen.borrow(), vec![CompletionStatus::Committed]);
    }
}
