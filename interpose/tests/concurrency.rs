//! Concurrent calls through one dispatcher keep their correlation apart.

use interpose::{
    AspectRegistry, CorrelationStore, DispatchPolicy, Dispatcher, Phase,
    aspects::{TimingAspect, TimingSink},
    repository::{Repository, RepositoryInterceptor},
    testing::{AuditingStore, EventLog, FaultyAspect, RecordingAspect},
};
use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

mod common;
use common::{Ledger, LedgerCapability, LedgerError, LedgerInterceptor, MemoryLedger};

fn ledger(
    sink: &TimingSink,
    log: &EventLog,
    store: Arc<AuditingStore>,
) -> LedgerInterceptor {
    let registry = AspectRegistry::builder()
        .attach_all(TimingAspect::new().with_sink(sink.clone()))
        .attach_all(FaultyAspect::healthy("paired"))
        .attach_all(RecordingAspect::new("probe", log.clone()))
        .build_for::<LedgerCapability>();
    let dispatcher = Dispatcher::<LedgerCapability>::builder(Arc::new(MemoryLedger::new()))
        .registry(registry)
        .store(store)
        .policy(DispatchPolicy::strict())
        .build();
    LedgerInterceptor::from_dispatcher(dispatcher)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_calls_each_take_their_own_entries() {
    let sink = TimingSink::new();
    let log = EventLog::new();
    let store = Arc::new(AuditingStore::new());
    let ledger = ledger(&sink, &log, store.clone());

    let mut tasks = Vec::new();
    for i in 0..64_u64 {
        let ledger = ledger.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            ledger.deposit(format!("acct-{}", i % 4), i)
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // Every token written was taken exactly once, and nothing is left.
    let puts: HashSet<_> = store.puts().into_iter().collect();
    let takes: HashSet<_> = store.takes().into_iter().collect();
    assert_eq!(puts.len(), 64 * 2);
    assert_eq!(store.takes().len(), 64 * 2);
    assert_eq!(puts, takes);
    assert!(store.is_empty());

    // One measurement per call, each under a distinct token.
    let measurements = sink.measurements();
    assert_eq!(measurements.len(), 64);
    let tokens: HashSet<_> = measurements.iter().map(|m| m.token).collect();
    assert_eq!(tokens.len(), 64);

    // Every call saw exactly one before- and one after-phase.
    for measurement in &measurements {
        let phases: Vec<_> = log
            .for_call(measurement.call)
            .into_iter()
            .map(|event| event.phase)
            .collect();
        assert_eq!(phases, vec![Phase::Before, Phase::After]);
    }

    let total: u64 = (0..4)
        .map(|acct| ledger.balance(format!("acct-{acct}")).unwrap())
        .sum();
    assert_eq!(total, (0..64).sum::<u64>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_call_does_not_block_a_fast_one() {
    let target = Arc::new(
        interpose::repository::InMemoryRepository::new()
            .with_reindex_delay(Duration::from_millis(500)),
    );
    let repository = RepositoryInterceptor::new(target);

    let slow = {
        let repository = repository.clone();
        tokio::task::spawn_blocking(move || (repository.reindex(), Instant::now()))
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let fast = {
        let repository = repository.clone();
        tokio::task::spawn_blocking(move || {
            let created = repository.create("Arthur".into(), "Schopenhauer".into());
            (created, Instant::now())
        })
    };

    let (arthur, fast_done) = fast.await.unwrap();
    let (reindexed, slow_done) = slow.await.unwrap();
    assert_eq!(arthur.unwrap().id, 1);
    reindexed.unwrap();
    assert!(fast_done < slow_done);
    assert!(repository.dispatcher().store().is_empty());
}

#[test]
fn target_errors_keep_their_type_under_aspects() {
    let sink = TimingSink::new();
    let log = EventLog::new();
    let ledger = ledger(&sink, &log, Arc::new(AuditingStore::new()));

    ledger.freeze("acct-0".into()).unwrap();
    let err = ledger.deposit("acct-0".into(), 5).unwrap_err();

    assert!(matches!(err, LedgerError::Frozen(ref account) if account == "acct-0"));
    assert_eq!(sink.len(), 2);
}
