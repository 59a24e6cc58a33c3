//! Testing utilities for Interpose.
//!
//! This module provides aspects and stores that make the behavior of a
//! dispatcher observable from a test.
//!
//! # Features
//!
//! - [`RecordingAspect`]: records every phase it observes into an [`EventLog`]
//! - [`FaultyAspect`]: a correlating aspect with injectable failures
//! - [`AuditingStore`]: a correlation store that records every token it sees

use crate::store::SharedCorrelationStore;
use interpose_core::{
    Aspect, AspectContext, AspectResult, CallId, CallInfo, CorrelationStore, CorrelationToken,
    InterposeError, OperationDescriptor, Outcome, Payload, Phase,
};
use std::sync::{Arc, Mutex, PoisonError};

// ============================================================================
// Event Log
// ============================================================================

/// One observation made by a [`RecordingAspect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspectEvent {
    /// Name of the recording aspect.
    pub aspect: &'static str,
    /// Phase the observation was made in.
    pub phase: Phase,
    /// Observed operation.
    pub operation: &'static str,
    /// Observed call.
    pub call: CallId,
    /// Rendered arguments (before) or outcome (after).
    pub detail: String,
}

/// A shared, ordered log of [`AspectEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<AspectEvent>>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the recorded events.
    pub fn events(&self) -> Vec<AspectEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `(aspect, phase)` pairs in recording order.
    pub fn sequence(&self) -> Vec<(&'static str, Phase)> {
        self.events()
            .into_iter()
            .map(|event| (event.aspect, event.phase))
            .collect()
    }

    /// Events recorded for one call.
    pub fn for_call(&self, call: CallId) -> Vec<AspectEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.call == call)
            .collect()
    }

    /// Get the number of recorded events.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn push(&self, event: AspectEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

// ============================================================================
// Recording Aspect
// ============================================================================

/// An aspect that records both phases of every call into an [`EventLog`].
///
/// # Example
///
/// ```rust,ignore
/// let log = EventLog::new();
/// let registry = AspectRegistry::builder()
///     .attach("create", RecordingAspect::new("first", log.clone()))
///     .attach("create", RecordingAspect::new("second", log.clone()))
///     .build();
///
/// // ... invoke "create" ...
///
/// assert_eq!(log.sequence(), vec![
///     ("first", Phase::Before),
///     ("second", Phase::Before),
///     ("first", Phase::After),
///     ("second", Phase::After),
/// ]);
/// ```
#[derive(Debug, Clone)]
pub struct RecordingAspect {
    name: &'static str,
    log: EventLog,
}

impl RecordingAspect {
    /// Create a recording aspect writing into `log`.
    pub fn new(name: &'static str, log: EventLog) -> Self {
        Self { name, log }
    }
}

impl Aspect for RecordingAspect {
    fn name(&self) -> &'static str {
        self.name
    }

    fn before(
        &self,
        descriptor: &OperationDescriptor,
        call: &CallInfo,
        _cx: &AspectContext<'_>,
    ) -> AspectResult {
        self.log.push(AspectEvent {
            aspect: self.name,
            phase: Phase::Before,
            operation: descriptor.name,
            call: call.id(),
            detail: call.display_arguments().to_string(),
        });
        Ok(())
    }

    fn after(&self, call: &CallInfo, outcome: &Outcome, _cx: &AspectContext<'_>) -> AspectResult {
        self.log.push(AspectEvent {
            aspect: self.name,
            phase: Phase::After,
            operation: call.operation(),
            call: call.id(),
            detail: outcome.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Faulty Aspect
// ============================================================================

/// The error raised by a [`FaultyAspect`] on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("injected {0} failure")]
pub struct InjectedFault(pub Phase);

/// A correlating aspect whose phases can be made to fail.
///
/// A healthy before-phase stashes a marker under its token and the
/// after-phase takes it back (unless built with
/// [`abandoning`](Self::abandoning)), so an after-phase whose before-phase
/// failed reports [`InterposeError::MissingCorrelation`].
#[derive(Debug, Clone, Copy)]
pub struct FaultyAspect {
    name: &'static str,
    fail_before: bool,
    fail_after: bool,
    abandon: bool,
}

impl FaultyAspect {
    /// An aspect that pairs correctly and never fails.
    pub fn healthy(name: &'static str) -> Self {
        Self {
            name,
            fail_before: false,
            fail_after: false,
            abandon: false,
        }
    }

    /// An aspect whose before-phase fails without writing anything.
    pub fn failing_before(name: &'static str) -> Self {
        Self {
            fail_before: true,
            ..Self::healthy(name)
        }
    }

    /// An aspect whose after-phase fails once it has taken its entry.
    pub fn failing_after(name: &'static str) -> Self {
        Self {
            fail_after: true,
            ..Self::healthy(name)
        }
    }

    /// An aspect whose after-phase fails without taking its entry.
    pub fn abandoning(name: &'static str) -> Self {
        Self {
            fail_after: true,
            abandon: true,
            ..Self::healthy(name)
        }
    }
}

impl Aspect for FaultyAspect {
    fn name(&self) -> &'static str {
        self.name
    }

    fn before(
        &self,
        _descriptor: &OperationDescriptor,
        _call: &CallInfo,
        cx: &AspectContext<'_>,
    ) -> AspectResult {
        if self.fail_before {
            return Err(InterposeError::aspect(
                self.name,
                Phase::Before,
                InjectedFault(Phase::Before),
            ));
        }
        cx.stash(self.name)
    }

    fn after(&self, _call: &CallInfo, _outcome: &Outcome, cx: &AspectContext<'_>) -> AspectResult {
        if !self.abandon {
            cx.take::<&'static str>()?;
        }
        if self.fail_after {
            return Err(InterposeError::aspect(
                self.name,
                Phase::After,
                InjectedFault(Phase::After),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Auditing Store
// ============================================================================

/// A [`CorrelationStore`] that records every token written and consumed.
///
/// Behaves exactly like [`SharedCorrelationStore`]: duplicate puts and
/// missing takes are rejected and are not recorded.
#[derive(Debug, Default)]
pub struct AuditingStore {
    inner: SharedCorrelationStore,
    puts: Mutex<Vec<CorrelationToken>>,
    takes: Mutex<Vec<CorrelationToken>>,
}

impl AuditingStore {
    /// Create an empty auditing store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens successfully written, in order.
    pub fn puts(&self) -> Vec<CorrelationToken> {
        self.puts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Tokens successfully taken, in order.
    pub fn takes(&self) -> Vec<CorrelationToken> {
        self.takes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CorrelationStore for AuditingStore {
    fn put(&self, token: CorrelationToken, payload: Payload) -> Result<(), InterposeError> {
        self.inner.put(token, payload)?;
        self.puts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(token);
        Ok(())
    }

    fn take(&self, token: &CorrelationToken) -> Result<Payload, InterposeError> {
        let payload = self.inner.take(token)?;
        self.takes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*token);
        Ok(payload)
    }

    fn discard(&self, token: &CorrelationToken) -> bool {
        self.inner.discard(token)
    }

    fn contains(&self, token: &CorrelationToken) -> bool {
        self.inner.contains(token)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
