//! # interpose-std
//!
//! Standard implementations for the Interpose aspect dispatch pipeline.
//!
//! This crate provides:
//! - **Dispatching**: [`Dispatcher`], [`DispatcherBuilder`]
//! - **Failure policies**: [`DispatchPolicy`], [`BeforeFailure`], [`AfterFailure`], [`Orphans`]
//! - **Aspect resolution**: [`AspectRegistry`], [`AspectRegistryBuilder`]
//! - **Correlation**: [`SharedCorrelationStore`]
//! - **Standard aspects**: Logging, Timing
//! - **Testing utilities**: recording and fault-injecting aspects, auditing store

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use interpose_core;

// Modules
pub mod aspects;
pub mod dispatcher;
pub mod policy;
pub mod registry;
pub mod store;
pub mod testing;

pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use policy::{AfterFailure, BeforeFailure, DispatchPolicy, Orphans};
pub use registry::{AspectRegistry, AspectRegistryBuilder};
pub use store::SharedCorrelationStore;
