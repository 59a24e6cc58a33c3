//! Logging aspect.

use interpose_core::{
    Aspect, AspectContext, AspectResult, CallInfo, OperationDescriptor, Outcome,
};

/// An aspect that logs every call it observes.
///
/// The before-phase logs the operation signature and the arguments; the
/// after-phase logs the arguments again with the outcome (`void` for
/// operations without a value).
///
/// # Example
///
/// ```rust,ignore
/// use interpose::aspects::LoggingAspect;
///
/// #[capability]
/// trait Repository: Send + Sync {
///     #[aspects(LoggingAspect::named("repository"))]
///     fn list(&self) -> Result<Vec<Entity>, RepositoryError>;
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LoggingAspect {
    name: &'static str,
}

impl LoggingAspect {
    /// Create a new `LoggingAspect` with a default name.
    pub fn new() -> Self {
        Self { name: "logging" }
    }

    /// Create a new `LoggingAspect` with a custom name.
    ///
    /// The name is attached to every log line and used in error reports.
    pub fn named(name: &'static str) -> Self {
        Self { name }
    }
}

impl Default for LoggingAspect {
    fn default() -> Self {
        Self::new()
    }
}

impl Aspect for LoggingAspect {
    fn name(&self) -> &'static str {
        self.name
    }

    fn before(
        &self,
        descriptor: &OperationDescriptor,
        call: &CallInfo,
        _cx: &AspectContext<'_>,
    ) -> AspectResult {
        tracing::info!(
            aspect = self.name,
            call = %call.id(),
            operation = descriptor.name,
            signature = %descriptor,
            arguments = %call.display_arguments(),
            "logging before"
        );
        Ok(())
    }

    fn after(&self, call: &CallInfo, outcome: &Outcome, _cx: &AspectContext<'_>) -> AspectResult {
        tracing::info!(
            aspect = self.name,
            call = %call.id(),
            operation = call.operation(),
            arg_count = call.arg_count(),
            arguments = %call.display_arguments(),
            result = %outcome,
            "logging after"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SharedCorrelationStore;
    use interpose_core::{Arguments, CorrelationStore, ReturnShape};

    const REINDEX: OperationDescriptor = OperationDescriptor {
        name: "reindex",
        params: &[],
        returns: ReturnShape::Void,
    };

    #[test]
    fn logging_leaves_no_state_behind() {
        let store = SharedCorrelationStore::new();
        let cx = AspectContext::new(&store);
        let call = CallInfo::new(&REINDEX, Arguments::new());
        let aspect = LoggingAspect::named("audit");

        aspect.before(&REINDEX, &call, &cx).unwrap();
        aspect.after(&call, &Outcome::Void, &cx).unwrap();

        assert_eq!(aspect.name(), "audit");
        assert!(store.is_empty());
    }
}
