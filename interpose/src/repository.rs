//! Sample target: an in-memory entity repository.
//!
//! [`Repository`] is a capability set; every operation is wrapped by the
//! timing and logging aspects. [`RepositoryInterceptor`] is the intercepted
//! form callers should hold, [`InMemoryRepository`] the plain target.

use crate::{
    InterposeError,
    aspects::{LoggingAspect, TimingAspect},
    capability,
};
use std::{
    fmt,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};
use thiserror::Error;

/// Default time a [`Repository::reindex`] call blocks for.
pub const DEFAULT_REINDEX_DELAY: Duration = Duration::from_millis(200);

/// A stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Identifier assigned on creation.
    pub id: u32,
    /// First name.
    pub name: String,
    /// Last name.
    pub last_name: String,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {}", self.id, self.name, self.last_name)
    }
}

/// Errors returned by a [`Repository`].
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No entity carries the requested id.
    #[error("no entity with id {0}")]
    NotFound(u32),

    /// Every id is taken.
    #[error("repository is full")]
    Full,

    /// The interception pipeline failed around the call.
    #[error(transparent)]
    Interpose(#[from] InterposeError),
}

/// Entity storage.
#[capability]
pub trait Repository: Send + Sync {
    /// Store a new entity and return it with its assigned id.
    #[aspects(TimingAspect::new(), LoggingAspect::new())]
    fn create(&self, name: String, last_name: String) -> Result<Entity, RepositoryError>;

    /// Replace the names of an existing entity.
    #[aspects(TimingAspect::new(), LoggingAspect::new())]
    fn update(&self, id: u32, name: String, last_name: String) -> Result<(), RepositoryError>;

    /// Remove an entity. Returns whether it existed.
    #[aspects(TimingAspect::new(), LoggingAspect::new())]
    fn delete(&self, id: u32) -> Result<bool, RepositoryError>;

    /// All stored entities in insertion order.
    #[aspects(TimingAspect::new(), LoggingAspect::new())]
    fn list(&self) -> Result<Vec<Entity>, RepositoryError>;

    /// Rebuild the storage indexes. Blocks the calling thread.
    #[aspects(TimingAspect::new(), LoggingAspect::new())]
    fn reindex(&self) -> Result<(), RepositoryError>;
}

/// A [`Repository`] kept in memory.
///
/// New entities get `len + 1` as id, computed under the same write lock that
/// stores them.
#[derive(Debug)]
pub struct InMemoryRepository {
    entities: RwLock<Vec<Entity>>,
    reindex_delay: Duration,
}

impl InMemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(Vec::new()),
            reindex_delay: DEFAULT_REINDEX_DELAY,
        }
    }

    /// Set how long [`Repository::reindex`] blocks.
    pub fn with_reindex_delay(mut self, delay: Duration) -> Self {
        self.reindex_delay = delay;
        self
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Entity>> {
        self.entities.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Entity>> {
        self.entities.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for InMemoryRepository {
    fn create(&self, name: String, last_name: String) -> Result<Entity, RepositoryError> {
        let mut entities = self.write();
        let id = u32::try_from(entities.len() + 1).map_err(|_| RepositoryError::Full)?;
        let entity = Entity {
            id,
            name,
            last_name,
        };
        entities.push(entity.clone());
        Ok(entity)
    }

    fn update(&self, id: u32, name: String, last_name: String) -> Result<(), RepositoryError> {
        let mut entities = self.write();
        let entity = entities
            .iter_mut()
            .find(|entity| entity.id == id)
            .ok_or(RepositoryError::NotFound(id))?;
        entity.name = name;
        entity.last_name = last_name;
        Ok(())
    }

    fn delete(&self, id: u32) -> Result<bool, RepositoryError> {
        let mut entities = self.write();
        let before = entities.len();
        entities.retain(|entity| entity.id != id);
        Ok(entities.len() != before)
    }

    fn list(&self) -> Result<Vec<Entity>, RepositoryError> {
        Ok(self.read().clone())
    }

    fn reindex(&self) -> Result<(), RepositoryError> {
        tracing::debug!(delay = ?self.reindex_delay, "reindexing");
        std::thread::sleep(self.reindex_delay);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arguments, Aspect, Capability, CorrelationStore, Outcome, ReturnShape};
    use std::sync::Arc;

    fn intercepted() -> (Arc<InMemoryRepository>, RepositoryInterceptor) {
        let target = Arc::new(InMemoryRepository::new().with_reindex_delay(Duration::ZERO));
        let interceptor = RepositoryInterceptor::new(target.clone());
        (target, interceptor)
    }

    #[test]
    fn operations_are_described_in_declaration_order() {
        let names: Vec<_> = RepositoryCapability::operations()
            .iter()
            .map(|op| op.name)
            .collect();
        assert_eq!(names, ["create", "update", "delete", "list", "reindex"]);

        let create = RepositoryCapability::descriptor("create", 2).unwrap();
        assert_eq!(create.params[0].name, "name");
        assert_eq!(create.params[1].ty, "String");
        assert_eq!(create.returns, ReturnShape::Value("Entity"));
        assert!(RepositoryCapability::descriptor("reindex", 0).unwrap().is_void());
        assert!(RepositoryCapability::descriptor("create", 1).is_none());
    }

    #[test]
    fn every_operation_declares_timing_then_logging() {
        for descriptor in RepositoryCapability::operations() {
            let names: Vec<_> = RepositoryCapability::declared_aspects(descriptor)
                .iter()
                .map(|aspect| aspect.name())
                .collect();
            assert_eq!(names, ["timing", "logging"], "{}", descriptor.name);
        }
    }

    #[test]
    fn create_assigns_size_based_ids() {
        let (target, repository) = intercepted();

        let arthur = repository
            .create("Arthur".into(), "Schopenhauer".into())
            .unwrap();
        let gustave = repository.create("Gustave".into(), "Le bon".into()).unwrap();

        assert_eq!(arthur.id, 1);
        assert_eq!(gustave.id, 2);
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn update_missing_entity_passes_error_through() {
        let (_, repository) = intercepted();

        let err = repository
            .update(7, "Arthur".into(), "Schopenhauer".into())
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(7)));
    }

    #[test]
    fn update_delete_and_list() {
        let (_, repository) = intercepted();
        repository.create("Arthur".into(), "Schopenhauer".into()).unwrap();

        repository.update(1, "Arthur".into(), "S.".into()).unwrap();
        assert_eq!(repository.list().unwrap()[0].last_name, "S.");

        assert!(repository.delete(1).unwrap());
        assert!(!repository.delete(1).unwrap());
        assert!(repository.list().unwrap().is_empty());
    }

    #[test]
    fn reindex_blocks_for_the_configured_delay() {
        let target = Arc::new(
            InMemoryRepository::new().with_reindex_delay(Duration::from_millis(20)),
        );
        let repository = RepositoryInterceptor::new(target);

        let started = std::time::Instant::now();
        repository.reindex().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn dynamic_invoke_matches_typed_call() {
        let (_, repository) = intercepted();

        let outcome = repository
            .dispatcher()
            .invoke(
                "create",
                Arguments::new()
                    .with("Arthur".to_string())
                    .with("Schopenhauer".to_string()),
            )
            .unwrap();
        let entity = outcome.downcast_ref::<Entity>().unwrap();
        assert_eq!(entity.id, 1);

        let outcome = repository.dispatcher().invoke("reindex", Arguments::new()).unwrap();
        assert!(matches!(outcome, Outcome::Void));
    }

    #[test]
    fn dynamic_invoke_with_wrong_argument_type_is_unknown() {
        let (_, repository) = intercepted();

        let err = repository
            .dispatcher()
            .invoke("delete", Arguments::new().with("one".to_string()))
            .unwrap_err();
        assert!(matches!(err, InterposeError::UnknownOperation { .. }));
        assert!(repository.dispatcher().store().is_empty());
    }

    #[test]
    fn generated_capability_checks_argument_types() {
        let update = RepositoryCapability::descriptor("update", 3).unwrap();
        let good = Arguments::new()
            .with(1_u32)
            .with("Arthur".to_string())
            .with("Schopenhauer".to_string());
        let swapped = Arguments::new()
            .with("Arthur".to_string())
            .with(1_u32)
            .with("Schopenhauer".to_string());

        assert!(RepositoryCapability::accepts(update, &good));
        assert!(!RepositoryCapability::accepts(update, &swapped));
        assert!(RepositoryCapability::resolve("update", &swapped).is_none());
    }
}
