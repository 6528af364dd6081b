//! Propagation decisions without and within an existing transaction.

use std::rc::Rc;

use txflow_core::{
    EngineConfig, SyncRegistry, TransactionEngine, TransactionSynchronization,
};
use txflow_error::TxFlowError;
use txflow_harness::{EventLog, ProbeSynchronization, StrategyCall, StubStrategy, SyncEvent};
use txflow_types::{CompletionStatus, Isolation, Propagation, TransactionDefinition};

fn engine() -> TransactionEngine<StubStrategy> {
    TransactionEngine::new(StubStrategy::new())
}

fn register(log: &EventLog, label: &'static str) {
    SyncRegistry::register_synchronization(Rc::new(ProbeSynchronization::new(label, log)))
        .expect("synchronization active");
}

#[test]
fn required_without_outer_begins_and_commits() {
    let engine = engine();
    let log = EventLog::new();
    let definition = TransactionDefinition::required().named("A");

    let mut status = engine
        .get_transaction(Some(&definition))
        .expect("required begins");
    assert!(status.is_new_transaction());
    assert!(status.is_new_synchronization());
    register(&log, "probe");

    engine.commit(&mut status).expect("commit");

    assert_eq!(
        log.events(),
        vec![
            ("probe", SyncEvent::BeforeCommit { read_only: false }),
            ("probe", SyncEvent::BeforeCompletion),
            ("probe", SyncEvent::AfterCommit),
            ("probe", SyncEvent::AfterCompletion(CompletionStatus::Committed)),
        ]
    );

    let calls = engine.strategy().calls();
    assert!(
        matches!(&calls[0], StrategyCall::Begin { name: Some(name), .. } if name == "A"),
        "begin carries the definition name: {calls:?}"
    );
    assert!(matches!(calls[1], StrategyCall::Commit { .. }));
    assert!(matches!(calls[2], StrategyCall::Cleanup { .. }));
    assert_eq!(calls.len(), 3);

    assert!(!SyncRegistry::is_synchronization_active());
    assert_eq!(SyncRegistry::current_name(), None);
    assert!(!engine.strategy().is_bound());
}

#[test]
fn required_inside_required_participates() {
    let engine = engine();
    let log = EventLog::new();

    let outer_definition = TransactionDefinition::required().named("outer");
    let mut outer = engine
        .get_transaction(Some(&outer_definition))
        .expect("outer begins");
    register(&log, "probe");
    assert_eq!(SyncRegistry::current_name().as_deref(), Some("outer"));

    let inner_definition = TransactionDefinition::required().named("inner");
    let mut inner = engine
        .get_transaction(Some(&inner_definition))
        .expect("inner participates");
    assert!(!inner.is_new_transaction());
    assert!(inner.has_transaction());
    assert!(!inner.is_new_synchronization());

    engine.commit(&mut inner).expect("inner commit is a no-op");
    assert_eq!(
        engine
            .strategy()
            .count_calls(|call| matches!(call, StrategyCall::Commit { .. })),
        0,
        "participating commit must not drive the native commit"
    );
    assert!(log.events().is_empty(), "callbacks wait for the outer commit");

    engine.commit(&mut outer).expect("outer commit");
    assert_eq!(
        engine
            .strategy()
            .count_calls(|call| matches!(call, StrategyCall::Commit { .. })),
        1
    );
    assert_eq!(
        log.labels_for(SyncEvent::AfterCompletion(CompletionStatus::Committed)),
        vec!["probe"]
    );
}

#[test]
fn mandatory_without_outer_fails_cleanly() {
    let engine = engine();
    let definition = TransactionDefinition::with_propagation(Propagation::Mandatory);

    let err = engine
        .get_transaction(Some(&definition))
        .expect_err("mandatory needs an existing transaction");
    assert!(matches!(err, TxFlowError::IllegalState { .. }));

    assert!(engine.strategy().calls().is_empty(), "no begin, no mutation");
    assert!(!SyncRegistry::is_synchronization_active());
}

#[test]
fn mandatory_inside_required_participates() {
    let engine = engine();
    let mut outer = engine.get_transaction(None).expect("outer begins");

    let definition = TransactionDefinition::with_propagation(Propagation::Mandatory);
    let mut inner = engine
        .get_transaction(Some(&definition))
        .expect("mandatory joins the outer transaction");
    assert!(!inner.is_new_transaction());

    engine.commit(&mut inner).expect("inner commit");
    engine.commit(&mut outer).expect("outer commit");
}

#[test]
fn never_with_existing_transaction_fails() {
    let engine = engine();
    let mut outer = engine.get_transaction(None).expect("outer begins");

    let definition = TransactionDefinition::with_propagation(Propagation::Never);
    let err = engine
        .get_transaction(Some(&definition))
        .expect_err("never refuses an existing transaction");
    assert!(matches!(err, TxFlowError::IllegalState { .. }));

    engine.commit(&mut outer).expect("outer unaffected");
}

#[test]
fn empty_scopes_run_without_native_transaction() {
    for propagation in [
        Propagation::Supports,
        Propagation::NotSupported,
        Propagation::Never,
    ] {
        let engine = engine();
        let definition = TransactionDefinition::with_propagation(propagation);
        let mut status = engine
            .get_transaction(Some(&definition))
            .expect("empty scope opens");
        assert!(!status.has_transaction());
        assert!(!status.is_new_transaction());
        assert!(status.is_new_synchronization(), "sync mode defaults to always");

        engine.commit(&mut status).expect("empty commit");
        assert!(engine.strategy().calls().is_empty());
        assert!(!SyncRegistry::is_synchronization_active());
    }
}

#[test]
fn empty_scope_callbacks_fire_with_committed_outcome() {
    let engine = engine();
    let log = EventLog::new();
    let definition = TransactionDefinition::with_propagation(Propagation::Supports);

    let mut status = engine
        .get_transaction(Some(&definition))
        .expect("empty scope opens");
    register(&log, "probe");
    engine.commit(&mut status).expect("empty commit");

    assert_eq!(
        log.labels_for(SyncEvent::AfterCompletion(CompletionStatus::Committed)),
        vec!["probe"]
    );
}

#[test]
fn invalid_timeout_is_rejected_before_any_work() {
    let engine = engine();
    let definition = TransactionDefinition::required().timeout(-3);
    let err = engine
        .get_transaction(Some(&definition))
        .expect_err("timeout below -1");
    assert!(matches!(err, TxFlowError::InvalidTimeout { seconds: -3 }));
    assert!(engine.strategy().calls().is_empty());
}

#[test]
fn definition_timeout_overrides_manager_default() {
    let config = EngineConfig::default()
        .with_default_timeout(30)
        .expect("valid default");
    let engine = TransactionEngine::with_config(StubStrategy::new(), config);

    let mut status = engine
        .get_transaction(Some(&TransactionDefinition::required().timeout(5)))
        .expect("begins");
    engine.commit(&mut status).expect("commit");

    let mut status = engine
        .get_transaction(Some(&TransactionDefinition::required()))
        .expect("begins");
    engine.commit(&mut status).expect("commit");

    let timeouts: Vec<i32> = engine
        .strategy()
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            StrategyCall::Begin { timeout, .. } => Some(timeout),
            _ => None,
        })
        .collect();
    assert_eq!(timeouts, vec![5, 30]);
}

#[test]
fn validation_rejects_incompatible_isolation() {
    let config = EngineConfig::default().with_validate_existing(true);
    let engine = TransactionEngine::with_config(StubStrategy::new(), config);

    let outer_definition = TransactionDefinition::required().isolation(Isolation::Serializable);
    let mut outer = engine
        .get_transaction(Some(&outer_definition))
        .expect("outer begins");

    let incompatible = TransactionDefinition::required().isolation(Isolation::ReadCommitted);
    let err = engine
        .get_transaction(Some(&incompatible))
        .expect_err("isolation mismatch is rejected");
    assert!(matches!(err, TxFlowError::IllegalState { .. }));

    let compatible = TransactionDefinition::required().isolation(Isolation::Serializable);
    let mut inner = engine
        .get_transaction(Some(&compatible))
        .expect("matching isolation participates");
    engine.commit(&mut inner).expect("inner commit");

    let lenient = TransactionDefinition::required();
    let mut inner = engine
        .get_transaction(Some(&lenient))
        .expect("default isolation always participates");
    engine.commit(&mut inner).expect("inner commit");

    engine.commit(&mut outer).expect("outer commit");
}

#[test]
fn validation_rejects_writable_scope_inside_read_only() {
    let config = EngineConfig::default().with_validate_existing(true);
    let engine = TransactionEngine::with_config(StubStrategy::new(), config);

    let outer_definition = TransactionDefinition::required().read_only(true);
    let mut outer = engine
        .get_transaction(Some(&outer_definition))
        .expect("outer begins");

    let writable = TransactionDefinition::required();
    let err = engine
        .get_transaction(Some(&writable))
        .expect_err("writable participation in a read-only transaction is rejected");
    assert!(matches!(err, TxFlowError::IllegalState { .. }));

    let read_only = TransactionDefinition::required().read_only(true);
    let mut inner = engine
        .get_transaction(Some(&read_only))
        .expect("read-only participation is fine");
    engine.commit(&mut inner).expect("inner commit");

    engine.commit(&mut outer).expect("outer commit");
}

/// Distinct strategies keep distinct context state: a transaction begun by
/// one engine is invisible to an engine over another resource.
#[test]
fn independent_resources_do_not_observe_each_other() {
    let first = engine();
    let second = engine();

    let mut outer = first.get_transaction(None).expect("first begins");
    let mut other = second.get_transaction(None).expect("second begins its own");
    assert!(other.is_new_transaction(), "no cross-strategy participation");

    second.commit(&mut other).expect("second commits");
    first.commit(&mut outer).expect("first commits");
}

/// The registry rejects registration outside any synchronization scope.
#[test]
fn registration_requires_active_synchronization() {
    struct Noop;
    impl TransactionSynchronization for Noop {}

    let err = SyncRegistry::register_synchronization(Rc::new(Noop))
        .expect_err("no active scope in a fresh context");
    assert!(matches!(err, TxFlowError::IllegalState { .. }));
}
