//! # interpose-core
//!
//! Core contracts for the Interpose aspect dispatch pipeline.
//!
//! This crate only defines the vocabulary shared by targets, aspects and
//! dispatchers. Plugins that provide aspects or correlation stores depend on
//! it alone; the standard dispatcher lives in `interpose-std`.
//!
//! # Pipeline
//!
//! ```text
//! caller -> Dispatcher::invoke(op, args)
//!             -> Capability::descriptor(op)       (UnknownOperation)
//!             -> AspectResolver::resolve(op)
//!             -> Aspect::before(..) for each, in order
//!             -> Capability::call(target, ..)
//!             -> Aspect::after(..) for each, in the same order
//!          <- Outcome
//! ```
//!
//! # Pieces
//!
//! - [`Aspect`] / [`AspectContext`] - the two-phase hook contract and the
//!   per-call context carrying correlation state between the phases
//! - [`AspectResolver`] - operation to ordered aspects
//! - [`CorrelationStore`] - shared keyed store for before/after state
//! - [`Capability`] - statically declared operations of a target
//! - [`InterposeError`] - every failure the pipeline itself can raise

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod aspect;
mod capability;
mod correlation;
mod error;
mod operation;
mod value;

// Re-exports
pub use aspect::{Aspect, AspectContext, AspectResolver, AspectResult};
pub use capability::Capability;
pub use correlation::{CorrelationStore, CorrelationToken, Payload};
pub use error::{BoxError, InterposeError, Phase};
pub use operation::{
    CallId, CallInfo, DisplayArguments, OperationDescriptor, ParamDescriptor, ReturnShape,
};
pub use value::{Arguments, Outcome, Value};
