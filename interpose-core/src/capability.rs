//! Capability sets.
//!
//! A capability set is the statically known list of operations a target
//! exposes. It replaces runtime reflection: descriptors, declared aspects and
//! the by-name call table are all fixed when the crate is compiled. The
//! `#[capability]` attribute generates an implementation from a trait.

use crate::{
    aspect::Aspect,
    operation::OperationDescriptor,
    value::{Arguments, Outcome},
};
use std::sync::Arc;

/// The declared operations of a target, and how to call them by name.
pub trait Capability: 'static {
    /// The target type operations are invoked on.
    type Target: ?Sized + Send + Sync + 'static;

    /// Name of the capability set.
    const NAME: &'static str;

    /// Every declared operation, in declaration order.
    fn operations() -> &'static [OperationDescriptor];

    /// Find an operation by name and argument count.
    fn descriptor(name: &str, arity: usize) -> Option<&'static OperationDescriptor> {
        Self::operations()
            .iter()
            .find(|op| op.name == name && op.arity() == arity)
    }

    /// Whether `args` has the parameter types of `descriptor`.
    ///
    /// Only consulted once name and arity matched. Implementations that do
    /// not know their parameter types accept everything and leave the check
    /// to [`call`](Self::call).
    fn accepts(descriptor: &OperationDescriptor, args: &Arguments) -> bool {
        let _ = (descriptor, args);
        true
    }

    /// Find the operation a call to `name` with `args` refers to: same name,
    /// same arity and accepted argument types.
    fn resolve(name: &str, args: &Arguments) -> Option<&'static OperationDescriptor> {
        Self::operations().iter().find(|op| {
            op.name == name && op.arity() == args.len() && Self::accepts(op, args)
        })
    }

    /// Aspects declared on `descriptor`, in declaration order.
    ///
    /// Called once per operation when a registry is built, never per call.
    fn declared_aspects(descriptor: &OperationDescriptor) -> Vec<Arc<dyn Aspect>> {
        let _ = descriptor;
        Vec::new()
    }

    /// Invoke `descriptor` on `target` with `args`.
    ///
    /// Argument extraction failures and target failures both come back as
    /// [`Outcome::Failed`].
    fn call(target: &Self::Target, descriptor: &OperationDescriptor, args: &Arguments) -> Outcome;
}
