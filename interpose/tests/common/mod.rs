//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use interpose::{
    AspectRegistry, DispatchPolicy, Dispatcher, InterposeError, capability,
    repository::{InMemoryRepository, RepositoryCapability, RepositoryInterceptor},
    testing::{EventLog, RecordingAspect},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use thiserror::Error;

// ============================================================================
// Repository Fixtures
// ============================================================================

/// A repository whose reindex does not sleep.
pub fn quick_repository() -> Arc<InMemoryRepository> {
    Arc::new(InMemoryRepository::new().with_reindex_delay(Duration::ZERO))
}

/// The repository's declared aspects followed by a recording probe on every
/// operation.
pub fn probed_repository(
    target: Arc<InMemoryRepository>,
    log: &EventLog,
) -> RepositoryInterceptor {
    let registry = AspectRegistry::builder()
        .extend_from::<RepositoryCapability>()
        .attach_all(RecordingAspect::new("probe", log.clone()))
        .build_for::<RepositoryCapability>();
    let dispatcher = Dispatcher::<RepositoryCapability>::builder(target)
        .registry(registry)
        .build();
    RepositoryInterceptor::from_dispatcher(dispatcher)
}

/// A repository dispatcher built from an explicit registry and policy.
pub fn repository_with(
    target: Arc<InMemoryRepository>,
    registry: AspectRegistry,
    policy: DispatchPolicy,
) -> Dispatcher<RepositoryCapability> {
    Dispatcher::<RepositoryCapability>::builder(target)
        .registry(registry)
        .policy(policy)
        .build()
}

// ============================================================================
// Ledger Capability
// ============================================================================

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("account {0} is frozen")]
    Frozen(String),

    #[error(transparent)]
    Interpose(#[from] InterposeError),
}

/// A second capability set, declared without any aspects of its own.
#[capability(name = "ledger")]
pub trait Ledger: Send + Sync {
    fn deposit(&self, account: String, amount: u64) -> Result<u64, LedgerError>;

    fn balance(&self, account: String) -> Result<u64, LedgerError>;

    fn freeze(&self, account: String) -> Result<(), LedgerError>;
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: Mutex<HashMap<String, (u64, bool)>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for MemoryLedger {
    fn deposit(&self, account: String, amount: u64) -> Result<u64, LedgerError> {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        let (balance, frozen) = accounts.entry(account.clone()).or_default();
        if *frozen {
            return Err(LedgerError::Frozen(account));
        }
        *balance += amount;
        Ok(*balance)
    }

    fn balance(&self, account: String) -> Result<u64, LedgerError> {
        let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.get(&account).map_or(0, |(balance, _)| *balance))
    }

    fn freeze(&self, account: String) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts.entry(account).or_default().1 = true;
        Ok(())
    }
}
