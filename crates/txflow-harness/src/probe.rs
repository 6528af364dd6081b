//! Lifecycle probes: callbacks that record every hook invocation.

use std::cell::RefCell;
use std::rc::Rc;

use txflow_core::TransactionSynchronization;
use txflow_error::{Result, TxFlowError};
use txflow_types::CompletionStatus;

/// One observed callback hook invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    Suspend,
    Resume,
    Flush,
    BeforeCommit { read_only: bool },
    BeforeCompletion,
    AfterCommit,
    AfterCompletion(CompletionStatus),
}

/// Hook at which a probe injects a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Suspend,
    Resume,
    Flush,
    BeforeCommit,
    BeforeCompletion,
    AfterCommit,
    AfterCompletion,
}

/// Shared, ordered log of `(probe label, event)` pairs. Probes registered
/// in the same scope share one log so tests can assert cross-probe
/// ordering.
#[derive(Clone, Default)]
pub struct EventLog {
    entries: Rc<RefCell<Vec<(&'static str, SyncEvent)>>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, label: &'static str, event: SyncEvent) {
        self.entries.borrow_mut().push((label, event));
    }

    /// Snapshot of all recorded entries, in invocation order.
    #[must_use]
    pub fn events(&self) -> Vec<(&'static str, SyncEvent)> {
        self.entries.borrow().clone()
    }

    /// Labels of the probes that saw `event`, in invocation order.
    #[must_use]
    pub fn labels_for(&self, event: SyncEvent) -> Vec<&'static str> {
        self.entries
            .borrow()
            .iter()
            .filter(|(_, seen)| *seen == event)
            .map(|(label, _)| *label)
            .collect()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

/// A [`TransactionSynchronization`] that records each hook into its
/// [`EventLog`], optionally failing at one hook.
pub struct ProbeSynchronization {
    label: &'static str,
    log: EventLog,
    fail_at: Option<FailPoint>,
}

impl ProbeSynchronization {
    #[must_use]
    pub fn new(label: &'static str, log: &EventLog) -> Self {
        Self {
            label,
            log: log.clone(),
            fail_at: None,
        }
    }

    /// A probe that fails with an error at the given hook, after recording
    /// the event.
    #[must_use]
    pub fn failing(label: &'static str, log: &EventLog, fail_at: FailPoint) -> Self {
        Self {
            label,
            log: log.clone(),
            fail_at: Some(fail_at),
        }
    }

    fn observe(&self, event: SyncEvent, hook: FailPoint) -> Result<()> {
        self.log.record(self.label, event);
        if self.fail_at == Some(hook) {
            return Err(TxFlowError::illegal_state(format!(
                "probe '{}' rejected {hook:?}",
                self.label
            )));
        }
        Ok(())
    }
}

impl TransactionSynchronization for ProbeSynchronization {
    fn suspend(&self) -> Result<()> {
        self.observe(SyncEvent::Suspend, FailPoint::Suspend)
    }

    fn resume(&self) -> Result<()> {
        self.observe(SyncEvent::Resume, FailPoint::Resume)
    }

    fn flush(&self) -> Result<()> {
        self.observe(SyncEvent::Flush, FailPoint::Flush)
    }

    fn before_commit(&self, read_only: bool) -> Result<()> {
        self.observe(SyncEvent::BeforeCommit { read_only }, FailPoint::BeforeCommit)
    }

    fn before_completion(&self) -> Result<()> {
        self.observe(SyncEvent::BeforeCompletion, FailPoint::BeforeCompletion)
    }

    fn after_commit(&self) -> Result<()> {
        self.observe(SyncEvent::AfterCommit, FailPoint::AfterCommit)
    }

    fn after_completion(&self, status: CompletionStatus) -> Result<()> {
        self.observe(SyncEvent::AfterCompletion(status), FailPoint::AfterCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_invocation_order() {
        let log = EventLog::new();
        let first = ProbeSynchronization::new("first", &log);
        let second = ProbeSynchronization::new("second", &log);

        first.before_commit(false).expect("records");
        second.before_commit(false).expect("records");
        first
            .after_completion(CompletionStatus::Committed)
            .expect("records");

        assert_eq!(
            log.labels_for(SyncEvent::BeforeCommit { read_only: false }),
            vec!["first", "second"]
        );
        assert_eq!(
            log.labels_for(SyncEvent::AfterCompletion(CompletionStatus::Committed)),
            vec!["first"]
        );
    }

    #[test]
    fn failing_probe_still_records() {
        let log = EventLog::new();
        let probe = ProbeSynchronization::failing("bad", &log, FailPoint::BeforeCommit);
        assert!(probe.before_commit(true).is_err());
        assert!(probe.after_commit().is_ok());
        assert_eq!(
            log.events(),
            vec![
                ("bad", SyncEvent::BeforeCommit { read_only: true }),
                ("bad", SyncEvent::AfterCommit),
            ]
        );
    }
}
