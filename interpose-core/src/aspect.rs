//! # Aspects
//!
//! An aspect observes a call twice: once before the target runs and once
//! after it completes. State that has to survive from one observation to the
//! other goes through the [`AspectContext`] the dispatcher threads through
//! both hooks, never through fields of the aspect itself. One aspect instance
//! may therefore serve any number of concurrent calls.
//!
//! ```rust,ignore
//! struct Stopwatch;
//!
//! impl Aspect for Stopwatch {
//!     fn before(&self, _: &OperationDescriptor, _: &CallInfo, cx: &AspectContext<'_>) -> AspectResult {
//!         cx.stash(Instant::now())
//!     }
//!
//!     fn after(&self, call: &CallInfo, _: &Outcome, cx: &AspectContext<'_>) -> AspectResult {
//!         let started: Instant = cx.take()?;
//!         println!("{} took {:?}", call.operation(), started.elapsed());
//!         Ok(())
//!     }
//! }
//! ```

use crate::{
    correlation::{CorrelationStore, CorrelationToken},
    error::InterposeError,
    operation::{CallInfo, OperationDescriptor},
    value::Outcome,
};
use std::{any::Any, sync::Arc};

/// Result of one aspect hook.
pub type AspectResult = Result<(), InterposeError>;

/// A cross-cutting behavior run around an operation.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `Aspect`",
    label = "missing `Aspect` implementation",
    note = "Aspects must implement both `before` and `after`."
)]
pub trait Aspect: Send + Sync + 'static {
    /// Name used in logs and error reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Observe the pending call.
    ///
    /// Returning an error aborts the call: the target is not invoked.
    fn before(
        &self,
        descriptor: &OperationDescriptor,
        call: &CallInfo,
        cx: &AspectContext<'_>,
    ) -> AspectResult;

    /// Observe the completed call and its outcome.
    fn after(&self, call: &CallInfo, outcome: &Outcome, cx: &AspectContext<'_>) -> AspectResult;
}

impl<A: Aspect + ?Sized> Aspect for Arc<A> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn before(
        &self,
        descriptor: &OperationDescriptor,
        call: &CallInfo,
        cx: &AspectContext<'_>,
    ) -> AspectResult {
        (**self).before(descriptor, call, cx)
    }

    fn after(&self, call: &CallInfo, outcome: &Outcome, cx: &AspectContext<'_>) -> AspectResult {
        (**self).after(call, outcome, cx)
    }
}

/// Per-call, per-aspect context.
///
/// Created by the dispatcher for each aspect of each call and passed to both
/// hooks. Its token is fresh, so entries written through it cannot collide
/// with any other call or any other aspect of the same call.
pub struct AspectContext<'a> {
    token: CorrelationToken,
    store: &'a dyn CorrelationStore,
}

impl<'a> AspectContext<'a> {
    /// Create a context with a fresh token over `store`.
    pub fn new(store: &'a dyn CorrelationStore) -> Self {
        Self {
            token: CorrelationToken::new(),
            store,
        }
    }

    /// This context's correlation token.
    pub fn token(&self) -> CorrelationToken {
        self.token
    }

    /// Record state for the matching after-phase.
    pub fn stash<T: Any + Send>(&self, payload: T) -> AspectResult {
        self.store.put(self.token, Box::new(payload))
    }

    /// Consume the state recorded by the matching before-phase.
    pub fn take<T: Any + Send>(&self) -> Result<T, InterposeError> {
        let payload = self.store.take(&self.token)?;
        payload
            .downcast::<T>()
            .map(|payload| *payload)
            .map_err(|_| InterposeError::PayloadType {
                token: self.token,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Whether this context currently owns an entry in the store.
    pub fn has_entry(&self) -> bool {
        self.store.contains(&self.token)
    }

    /// Drop this context's entry if it still exists.
    pub fn discard(&self) -> bool {
        self.store.discard(&self.token)
    }
}

impl std::fmt::Debug for AspectContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspectContext")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Resolves the ordered aspects declared on an operation.
pub trait AspectResolver: Send + Sync {
    /// Aspects for `descriptor`, in declaration order.
    fn resolve(&self, descriptor: &OperationDescriptor) -> &[Arc<dyn Aspect>];
}
