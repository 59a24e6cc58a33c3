//! The interception dispatcher.
//!
//! Sits between a caller and a target. For every call it resolves the
//! operation against the target's capability set, runs the before-phase of
//! each declared aspect in order, forwards the call, runs the after-phases
//! in the same order and hands the outcome back untouched.
//!
//! Each call runs start to finish on the caller's thread. Concurrent calls
//! only share the correlation store, and every entry in it is keyed by a
//! token unique to one aspect of one call.

use crate::{
    policy::{AfterFailure, BeforeFailure, DispatchPolicy, Orphans},
    registry::AspectRegistry,
    store::SharedCorrelationStore,
};
use interpose_core::{
    Arguments, Aspect, AspectContext, AspectResolver, CallInfo, Capability, CorrelationStore,
    InterposeError, Outcome,
};
use std::sync::Arc;

/// Runs declared aspects around every call to a target of capability `C`.
pub struct Dispatcher<C: Capability> {
    target: Arc<C::Target>,
    resolver: Arc<dyn AspectResolver>,
    store: Arc<dyn CorrelationStore>,
    policy: DispatchPolicy,
}

impl<C: Capability> Dispatcher<C> {
    /// A dispatcher with the aspects declared on `C`, a fresh store and the
    /// default policy.
    pub fn new(target: Arc<C::Target>) -> Self {
        Self::builder(target).build()
    }

    /// Start building a dispatcher around `target`.
    pub fn builder(target: Arc<C::Target>) -> DispatcherBuilder<C> {
        DispatcherBuilder {
            target,
            resolver: None,
            store: None,
            policy: DispatchPolicy::default(),
        }
    }

    /// The wrapped target.
    pub fn target(&self) -> &Arc<C::Target> {
        &self.target
    }

    /// The correlation store shared by every call.
    pub fn store(&self) -> &dyn CorrelationStore {
        self.store.as_ref()
    }

    /// The failure policy in effect.
    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Invoke `operation` with `args`, running its aspects around the call.
    ///
    /// A target failure is not an error here: it comes back as
    /// [`Outcome::Failed`] after the after-phases have observed it. Errors are
    /// reserved for the pipeline itself and for failing aspects.
    pub fn invoke(&self, operation: &str, args: Arguments) -> Result<Outcome, InterposeError> {
        let Some(descriptor) = C::resolve(operation, &args) else {
            tracing::debug!(
                capability = C::NAME,
                operation,
                arg_count = args.len(),
                "operation not in capability set"
            );
            return Err(InterposeError::UnknownOperation {
                capability: C::NAME,
                operation: operation.to_owned(),
            });
        };

        let call = CallInfo::new(descriptor, args);
        let span = tracing::debug_span!(
            "invoke",
            capability = C::NAME,
            operation = descriptor.name,
            call = %call.id()
        );
        let _entered = span.enter();

        let aspects = self.resolver.resolve(descriptor);
        let store = self.store.as_ref();
        let contexts: Vec<AspectContext<'_>> =
            aspects.iter().map(|_| AspectContext::new(store)).collect();

        for (index, (aspect, cx)) in aspects.iter().zip(&contexts).enumerate() {
            if let Err(err) = aspect.before(descriptor, &call, cx) {
                tracing::debug!(aspect = aspect.name(), error = %err, "before-phase failed");
                let attempted = index + 1;
                return Err(self.abort(
                    &call,
                    &aspects[..attempted],
                    &contexts[..attempted],
                    err,
                ));
            }
        }

        let outcome = C::call(self.target.as_ref(), descriptor, call.arguments());
        tracing::trace!(outcome = %outcome, "target returned");

        self.complete(&call, aspects, &contexts, outcome)
    }

    fn abort(
        &self,
        call: &CallInfo,
        aspects: &[Arc<dyn Aspect>],
        contexts: &[AspectContext<'_>],
        err: InterposeError,
    ) -> InterposeError {
        let err = match self.policy.before_failure {
            BeforeFailure::Propagate => err,
            BeforeFailure::Purge => {
                let purged = contexts.iter().filter(|cx| cx.discard()).count();
                tracing::debug!(purged, "purged correlation entries of aborted call");
                err
            }
            BeforeFailure::Unwind => {
                let mut unwind_error = None;
                for (aspect, cx) in aspects.iter().zip(contexts) {
                    if let Err(unwind) = aspect.after(call, &Outcome::Aborted, cx) {
                        tracing::warn!(aspect = aspect.name(), error = %unwind, "unwinding failed");
                        unwind_error.get_or_insert(unwind);
                    }
                }
                match unwind_error {
                    Some(unwind) => {
                        tracing::warn!(error = %err, "before-phase error superseded by unwinding");
                        unwind
                    }
                    None => err,
                }
            }
        };
        self.settle(call, contexts);
        err
    }

    fn complete(
        &self,
        call: &CallInfo,
        aspects: &[Arc<dyn Aspect>],
        contexts: &[AspectContext<'_>],
        outcome: Outcome,
    ) -> Result<Outcome, InterposeError> {
        let mut first_error = None;
        for (aspect, cx) in aspects.iter().zip(contexts) {
            let Err(err) = aspect.after(call, &outcome, cx) else {
                continue;
            };
            match self.policy.after_failure {
                AfterFailure::Propagate => {
                    first_error = Some(err);
                    break;
                }
                AfterFailure::Continue => {
                    first_error.get_or_insert(err);
                }
                AfterFailure::Report => {
                    tracing::warn!(aspect = aspect.name(), error = %err, "after-phase failed");
                }
            }
        }
        self.settle(call, contexts);
        match first_error {
            Some(err) => Err(err),
            None => Ok(outcome),
        }
    }

    /// Deal with entries still in the store once the call is over.
    fn settle(&self, call: &CallInfo, contexts: &[AspectContext<'_>]) {
        match self.policy.orphans {
            Orphans::Report => {
                let orphaned = contexts.iter().filter(|cx| cx.has_entry()).count();
                if orphaned > 0 {
                    tracing::warn!(
                        operation = call.operation(),
                        orphaned,
                        "call finished with correlation entries left behind"
                    );
                }
            }
            Orphans::Purge => {
                let purged = contexts.iter().filter(|cx| cx.discard()).count();
                if purged > 0 {
                    tracing::debug!(
                        operation = call.operation(),
                        purged,
                        "purged correlation entries left behind"
                    );
                }
            }
        }
    }
}

impl<C: Capability> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            resolver: self.resolver.clone(),
            store: self.store.clone(),
            policy: self.policy,
        }
    }
}

impl<C: Capability> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("capability", &C::NAME)
            .field("entries", &self.store.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`Dispatcher`].
pub struct DispatcherBuilder<C: Capability> {
    target: Arc<C::Target>,
    resolver: Option<Arc<dyn AspectResolver>>,
    store: Option<Arc<dyn CorrelationStore>>,
    policy: DispatchPolicy,
}

impl<C: Capability> DispatcherBuilder<C> {
    /// Resolve aspects with `resolver` instead of the declared ones.
    pub fn resolver<R: AspectResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Arc::new(resolver) as Arc<dyn AspectResolver>);
        self
    }

    /// Resolve aspects from `registry`.
    pub fn registry(self, registry: AspectRegistry) -> Self {
        self.resolver(registry)
    }

    /// Share `store` instead of creating a fresh one.
    pub fn store<S: CorrelationStore + 'static>(mut self, store: Arc<S>) -> Self {
        self.store = Some(store as Arc<dyn CorrelationStore>);
        self
    }

    /// Use `policy` for failure handling.
    pub fn policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the dispatcher.
    pub fn build(self) -> Dispatcher<C> {
        let resolver: Arc<dyn AspectResolver> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(AspectRegistry::declared::<C>()),
        };
        let store: Arc<dyn CorrelationStore> = match self.store {
            Some(store) => store,
            None => Arc::new(SharedCorrelationStore::new()),
        };
        Dispatcher {
            target: self.target,
            resolver,
            store,
            policy: self.policy,
        }
    }
}
