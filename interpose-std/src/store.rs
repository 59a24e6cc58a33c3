//! Shared correlation store.

use interpose_core::{CorrelationStore, CorrelationToken, InterposeError, Payload};
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Mutex, MutexGuard, PoisonError},
};

/// A [`CorrelationStore`] backed by a mutex-guarded hash map.
///
/// One instance is created per dispatcher and shared by every call running
/// through it. The lock is only held for the duration of a single map
/// operation, never across a hook.
#[derive(Default)]
pub struct SharedCorrelationStore {
    entries: Mutex<HashMap<CorrelationToken, Payload>>,
}

impl SharedCorrelationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking aspect must not wedge every later call.
    fn lock(&self) -> MutexGuard<'_, HashMap<CorrelationToken, Payload>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CorrelationStore for SharedCorrelationStore {
    fn put(&self, token: CorrelationToken, payload: Payload) -> Result<(), InterposeError> {
        match self.lock().entry(token) {
            Entry::Occupied(_) => Err(InterposeError::DuplicateToken(token)),
            Entry::Vacant(slot) => {
                slot.insert(payload);
                Ok(())
            }
        }
    }

    fn take(&self, token: &CorrelationToken) -> Result<Payload, InterposeError> {
        self.lock()
            .remove(token)
            .ok_or(InterposeError::MissingCorrelation(*token))
    }

    fn discard(&self, token: &CorrelationToken) -> bool {
        self.lock().remove(token).is_some()
    }

    fn contains(&self, token: &CorrelationToken) -> bool {
        self.lock().contains_key(token)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

impl std::fmt::Debug for SharedCorrelationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCorrelationStore")
            .field("len", &self.len())
            .finish()
    }
}
