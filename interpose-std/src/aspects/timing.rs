//! Timing aspect.
//!
//! Measures the service time of each call: the before-phase stashes a start
//! instant under the call's correlation token, the after-phase takes it back
//! and reports the elapsed time. A missing start instant surfaces as
//! [`InterposeError::MissingCorrelation`].
//!
//! [`InterposeError::MissingCorrelation`]: interpose_core::InterposeError::MissingCorrelation

use interpose_core::{
    Aspect, AspectContext, AspectResult, CallId, CallInfo, CorrelationToken, OperationDescriptor,
    Outcome,
};
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

/// One completed service-time measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Measured operation.
    pub operation: &'static str,
    /// Call the measurement belongs to.
    pub call: CallId,
    /// Token the start instant was stored under.
    pub token: CorrelationToken,
    /// Time between the before- and after-phase.
    pub elapsed: Duration,
}

/// Shared collector for [`Measurement`]s.
#[derive(Debug, Clone, Default)]
pub struct TimingSink {
    measurements: Arc<Mutex<Vec<Measurement>>>,
}

impl TimingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every measurement recorded so far.
    pub fn measurements(&self) -> Vec<Measurement> {
        self.measurements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of measurements recorded so far.
    pub fn len(&self) -> usize {
        self.measurements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, measurement: Measurement) {
        self.measurements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(measurement);
    }
}

/// An aspect that measures how long each call takes.
#[derive(Debug, Clone, Default)]
pub struct TimingAspect {
    slow_threshold: Option<Duration>,
    sink: Option<TimingSink>,
}

impl TimingAspect {
    /// Create a timing aspect that only logs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log calls slower than `threshold` at `warn` instead of `info`.
    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    /// Also record every measurement into `sink`.
    pub fn with_sink(mut self, sink: TimingSink) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl Aspect for TimingAspect {
    fn name(&self) -> &'static str {
        "timing"
    }

    fn before(
        &self,
        descriptor: &OperationDescriptor,
        _call: &CallInfo,
        cx: &AspectContext<'_>,
    ) -> AspectResult {
        cx.stash(Instant::now())?;
        tracing::debug!(operation = descriptor.name, token = %cx.token(), "timing started");
        Ok(())
    }

    fn after(&self, call: &CallInfo, outcome: &Outcome, cx: &AspectContext<'_>) -> AspectResult {
        let started: Instant = cx.take()?;
        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1_000.0;

        match self.slow_threshold {
            Some(threshold) if elapsed > threshold => tracing::warn!(
                operation = call.operation(),
                elapsed_ms,
                threshold_ms = threshold.as_secs_f64() * 1_000.0,
                aborted = matches!(outcome, Outcome::Aborted),
                "slow call"
            ),
            _ => tracing::info!(
                operation = call.operation(),
                elapsed_ms,
                aborted = matches!(outcome, Outcome::Aborted),
                "service time"
            ),
        }

        if let Some(sink) = &self.sink {
            sink.record(Measurement {
                operation: call.operation(),
                call: call.id(),
                token: cx.token(),
                elapsed,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SharedCorrelationStore;
    use interpose_core::{Arguments, CorrelationStore, ReturnShape};

    const LIST: OperationDescriptor = OperationDescriptor {
        name: "list",
        params: &[],
        returns: ReturnShape::Value("Vec<Entity>"),
    };

    #[test]
    fn paired_phases_produce_one_measurement() {
        let store = SharedCorrelationStore::new();
        let sink = TimingSink::new();
        let aspect = TimingAspect::new().with_sink(sink.clone());
        let cx = AspectContext::new(&store);
        let call = CallInfo::new(&LIST, Arguments::new());

        aspect.before(&LIST, &call, &cx).unwrap();
        assert_eq!(store.len(), 1);
        std::thread::sleep(Duration::from_millis(5));
        aspect.after(&call, &Outcome::value(Vec::<u8>::new()), &cx).unwrap();

        assert!(store.is_empty());
        let measurements = sink.measurements();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].call, call.id());
        assert_eq!(measurements[0].token, cx.token());
        assert!(measurements[0].elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn after_without_before_is_missing_correlation() {
        let store = SharedCorrelationStore::new();
        let sink = TimingSink::new();
        let aspect = TimingAspect::new().with_sink(sink.clone());
        let cx = AspectContext::new(&store);
        let call = CallInfo::new(&LIST, Arguments::new());

        let err = aspect.after(&call, &Outcome::Void, &cx).unwrap_err();
        assert!(err.is_missing_correlation());
        assert!(sink.is_empty());
    }

    #[test]
    fn second_after_is_missing_correlation() {
        let store = SharedCorrelationStore::new();
        let aspect = TimingAspect::new().slow_threshold(Duration::ZERO);
        let cx = AspectContext::new(&store);
        let call = CallInfo::new(&LIST, Arguments::new());

        aspect.before(&LIST, &call, &cx).unwrap();
        aspect.after(&call, &Outcome::Void, &cx).unwrap();
        assert!(
            aspect
                .after(&call, &Outcome::Void, &cx)
                .unwrap_err()
                .is_missing_correlation()
        );
    }
}
