//! Failure policies of the dispatcher.

/// What the dispatcher does when a before-phase fails.
///
/// In every case the target is not invoked and the call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeforeFailure {
    /// Return the error at once. Entries already written by earlier aspects
    /// of the call are left to [`Orphans`].
    #[default]
    Propagate,
    /// Discard every entry written by the call, then return the error.
    Purge,
    /// Run the after-phase, with [`Outcome::Aborted`], of every aspect whose
    /// before-phase was attempted, in declaration order. An error raised
    /// while unwinding replaces the original one.
    ///
    /// [`Outcome::Aborted`]: interpose_core::Outcome::Aborted
    Unwind,
}

/// What the dispatcher does when an after-phase fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfterFailure {
    /// Return the error at once; later after-phases are skipped.
    #[default]
    Propagate,
    /// Run every remaining after-phase, then return the first error.
    Continue,
    /// Log every failure and hand the outcome back to the caller anyway.
    Report,
}

/// What the dispatcher does with correlation entries still in the store
/// once a call is over, whether it succeeded, failed or was aborted.
///
/// Such entries belong to aspects whose after-phase never ran or failed
/// before taking its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orphans {
    /// Leave them in place and log a warning.
    #[default]
    Report,
    /// Discard them.
    Purge,
}

/// Failure handling configuration of a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchPolicy {
    /// Handling of before-phase failures.
    pub before_failure: BeforeFailure,
    /// Handling of after-phase failures.
    pub after_failure: AfterFailure,
    /// Handling of entries that outlive their call.
    pub orphans: Orphans,
}

impl DispatchPolicy {
    /// The default policy: every failure propagates immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set before-phase failure handling.
    pub fn on_before_failure(mut self, before_failure: BeforeFailure) -> Self {
        self.before_failure = before_failure;
        self
    }

    /// Set after-phase failure handling.
    pub fn on_after_failure(mut self, after_failure: AfterFailure) -> Self {
        self.after_failure = after_failure;
        self
    }

    /// Set handling of entries that outlive their call.
    pub fn on_orphans(mut self, orphans: Orphans) -> Self {
        self.orphans = orphans;
        self
    }

    /// Never leave orphaned entries and never drop an after-phase.
    pub fn strict() -> Self {
        Self {
            before_failure: BeforeFailure::Purge,
            after_failure: AfterFailure::Continue,
            orphans: Orphans::Purge,
        }
    }
}
