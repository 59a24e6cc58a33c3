//! Aspect registry.
//!
//! Maps operations to their ordered aspects. A registry is built once, when
//! the dispatcher is assembled, and is read-only afterwards: resolution at
//! call time is a single hash lookup.
//!
//! Aspects are shared across calls. Per-call state lives in the
//! [`AspectContext`](interpose_core::AspectContext) the dispatcher creates for
//! each call, so sharing an instance never mixes state between calls.

use interpose_core::{Aspect, AspectResolver, Capability, OperationDescriptor};
use std::{collections::HashMap, sync::Arc};

/// A frozen operation-to-aspects mapping.
#[derive(Default)]
pub struct AspectRegistry {
    bindings: HashMap<&'static str, Vec<Arc<dyn Aspect>>>,
}

impl AspectRegistry {
    /// Start building a registry.
    pub fn builder() -> AspectRegistryBuilder {
        AspectRegistryBuilder::new()
    }

    /// A registry holding exactly the aspects declared on `C`.
    pub fn declared<C: Capability>() -> Self {
        Self::builder().extend_from::<C>().build()
    }

    /// A registry with no aspects at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Names of the aspects bound to `operation`, in order.
    pub fn aspect_names(&self, operation: &str) -> Vec<&'static str> {
        self.bindings
            .get(operation)
            .map(|aspects| aspects.iter().map(|aspect| aspect.name()).collect())
            .unwrap_or_default()
    }

    /// Number of operations with at least one aspect.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no operation has aspects.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl AspectResolver for AspectRegistry {
    fn resolve(&self, descriptor: &OperationDescriptor) -> &[Arc<dyn Aspect>] {
        self.bindings
            .get(descriptor.name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl std::fmt::Debug for AspectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (operation, aspects) in &self.bindings {
            let names: Vec<_> = aspects.iter().map(|aspect| aspect.name()).collect();
            map.entry(operation, &names);
        }
        map.finish()
    }
}

/// Builder for constructing an [`AspectRegistry`].
#[derive(Default)]
pub struct AspectRegistryBuilder {
    bindings: HashMap<&'static str, Vec<Arc<dyn Aspect>>>,
    global: Vec<Arc<dyn Aspect>>,
}

impl AspectRegistryBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the aspects `C` declares on each of its operations.
    pub fn extend_from<C: Capability>(mut self) -> Self {
        for descriptor in C::operations() {
            let declared = C::declared_aspects(descriptor);
            if !declared.is_empty() {
                self.bindings
                    .entry(descriptor.name)
                    .or_default()
                    .extend(declared);
            }
        }
        self
    }

    /// Append an aspect to one operation.
    pub fn attach<A: Aspect>(mut self, operation: &'static str, aspect: A) -> Self {
        self.bindings
            .entry(operation)
            .or_default()
            .push(Arc::new(aspect));
        self
    }

    /// Append an aspect to every operation, after their own aspects.
    pub fn attach_all<A: Aspect>(mut self, aspect: A) -> Self {
        self.global.push(Arc::new(aspect));
        self
    }

    /// Freeze the registry.
    ///
    /// Aspects added with [`attach_all`](Self::attach_all) only reach
    /// operations that are known here; use [`build_for`](Self::build_for) to
    /// cover every operation of a capability set.
    pub fn build(mut self) -> AspectRegistry {
        if !self.global.is_empty() {
            for aspects in self.bindings.values_mut() {
                aspects.extend(self.global.iter().cloned());
            }
        }
        AspectRegistry {
            bindings: self.bindings,
        }
    }

    /// Freeze the registry, binding global aspects to every operation of `C`.
    pub fn build_for<C: Capability>(mut self) -> AspectRegistry {
        for descriptor in C::operations() {
            self.bindings.entry(descriptor.name).or_default();
        }
        let mut registry = self.build();
        registry.bindings.retain(|_, aspects| !aspects.is_empty());
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EventLog, RecordingAspect};
    use interpose_core::{Arguments, Outcome, ReturnShape};

    const PING: OperationDescriptor = OperationDescriptor {
        name: "ping",
        params: &[],
        returns: ReturnShape::Void,
    };

    const PONG: OperationDescriptor = OperationDescriptor {
        name: "pong",
        params: &[],
        returns: ReturnShape::Void,
    };

    struct Pings;

    impl Capability for Pings {
        type Target = ();
        const NAME: &'static str = "Pings";

        fn operations() -> &'static [OperationDescriptor] {
            static OPS: [OperationDescriptor; 2] = [PING, PONG];
            &OPS
        }

        fn declared_aspects(descriptor: &OperationDescriptor) -> Vec<Arc<dyn Aspect>> {
            match descriptor.name {
                "ping" => vec![
                    Arc::new(RecordingAspect::new("declared", EventLog::new())) as Arc<dyn Aspect>,
                ],
                _ => Vec::new(),
            }
        }

        fn call(_: &(), _: &OperationDescriptor, _: &Arguments) -> Outcome {
            Outcome::Void
        }
    }

    #[test]
    fn declared_aspects_are_collected() {
        let registry = AspectRegistry::declared::<Pings>();
        assert_eq!(registry.aspect_names("ping"), vec!["declared"]);
        assert!(registry.resolve(&PONG).is_empty());
    }

    #[test]
    fn attach_keeps_declaration_order() {
        let log = EventLog::new();
        let registry = AspectRegistry::builder()
            .extend_from::<Pings>()
            .attach("ping", RecordingAspect::new("first", log.clone()))
            .attach("ping", RecordingAspect::new("second", log))
            .build();

        assert_eq!(
            registry.aspect_names("ping"),
            vec!["declared", "first", "second"]
        );
    }

    #[test]
    fn attach_all_runs_last_on_every_operation() {
        let log = EventLog::new();
        let registry = AspectRegistry::builder()
            .attach("ping", RecordingAspect::new("local", log.clone()))
            .attach_all(RecordingAspect::new("global", log))
            .build_for::<Pings>();

        assert_eq!(registry.aspect_names("ping"), vec!["local", "global"]);
        assert_eq!(registry.aspect_names("pong"), vec!["global"]);
    }

    #[test]
    fn resolution_is_stable_across_calls() {
        let registry = AspectRegistry::declared::<Pings>();
        let first = registry.resolve(&PING).as_ptr();
        let second = registry.resolve(&PING).as_ptr();
        assert_eq!(first, second);
    }
}
