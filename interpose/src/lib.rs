//! # interpose - Aspect Dispatch Pipeline
//!
//! `interpose` runs cross-cutting aspects around every call made to a
//! target. Each operation declares its aspects once; the dispatcher runs
//! their before-phases in declaration order, calls the target, then runs
//! their after-phases in the same order. Aspects are stateless and shared
//! across calls; per-call state lives in a correlation store under a token
//! that is unique to one call and one aspect.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use interpose::{capability, aspects::{LoggingAspect, TimingAspect}};
//!
//! #[capability]
//! pub trait Repository: Send + Sync {
//!     #[aspects(TimingAspect::new(), LoggingAspect::new())]
//!     fn create(&self, name: String, last_name: String) -> Result<Entity, RepositoryError>;
//! }
//!
//! let repository = RepositoryInterceptor::new(Arc::new(InMemoryRepository::new()));
//! let arthur = repository.create("Arthur".into(), "Schopenhauer".into())?;
//! ```
//!
//! ## Dynamic Invocation
//!
//! Every interceptor is backed by a [`Dispatcher`] that can also be called by
//! operation name with positional [`Arguments`]:
//!
//! ```rust,ignore
//! let outcome = repository
//!     .dispatcher()
//!     .invoke("create", Arguments::new().with("Gustave".to_string()).with("Le bon".to_string()))?;
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// The `#[capability]` expansion names items through `::interpose`, which
// has to resolve inside this crate as well.
extern crate self as interpose;

pub use interpose_core::{
    // Aspect
    Aspect,
    AspectContext,
    AspectResolver,
    AspectResult,
    // Values
    Arguments,
    // Error types
    BoxError,
    // Operations
    CallId,
    CallInfo,
    // Capability
    Capability,
    // Correlation
    CorrelationStore,
    CorrelationToken,
    DisplayArguments,
    InterposeError,
    OperationDescriptor,
    Outcome,
    ParamDescriptor,
    Payload,
    Phase,
    ReturnShape,
    Value,
};

pub use interpose_std::{
    AfterFailure, AspectRegistry, AspectRegistryBuilder, BeforeFailure, DispatchPolicy, Dispatcher,
    DispatcherBuilder, Orphans, SharedCorrelationStore,
};

/// Standard aspects.
pub mod aspects {
    pub use interpose_std::aspects::{LoggingAspect, Measurement, TimingAspect, TimingSink};
}

/// Test doubles for aspects and correlation stores.
pub mod testing {
    pub use interpose_std::testing::{
        AspectEvent, AuditingStore, EventLog, FaultyAspect, InjectedFault, RecordingAspect,
    };
}

pub use interpose_macros::capability;

pub mod repository;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Arguments, Aspect, AspectContext, AspectResult, CallInfo, Capability, Dispatcher,
        DispatchPolicy, InterposeError, OperationDescriptor, Outcome, capability,
    };
}
