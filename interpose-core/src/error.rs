//! Error types for Interpose.
//!
//! Every failure the pipeline itself can raise is a variant of
//! [`InterposeError`]. Failures raised by a target travel inside
//! [`Outcome::Failed`](crate::Outcome::Failed) instead and are never wrapped
//! by the dispatcher.

use crate::correlation::CorrelationToken;
use std::fmt;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The two observation points of an aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the real invocation.
    Before,
    /// After the real invocation (or while unwinding an aborted call).
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Before => f.write_str("before"),
            Phase::After => f.write_str("after"),
        }
    }
}

/// Top-level error type for all Interpose operations.
#[derive(Error, Debug)]
pub enum InterposeError {
    /// The requested operation is not part of the target's capability set.
    #[error("unknown operation `{operation}` on capability `{capability}`")]
    UnknownOperation {
        /// Capability set that was searched.
        capability: &'static str,
        /// Operation name as requested by the caller.
        operation: String,
    },

    /// A correlation token was written twice.
    #[error("correlation token {0} already present")]
    DuplicateToken(CorrelationToken),

    /// An after-phase read state its before-phase never wrote.
    #[error("no correlation entry for token {0}")]
    MissingCorrelation(CorrelationToken),

    /// A correlation entry held a payload of another type than requested.
    #[error("correlation entry {token} does not hold a `{expected}`")]
    PayloadType {
        /// Token of the offending entry.
        token: CorrelationToken,
        /// Requested payload type.
        expected: &'static str,
    },

    /// An argument was missing or of an unexpected type.
    #[error("argument {index} is not a `{expected}`")]
    ArgumentMismatch {
        /// Position of the argument.
        index: usize,
        /// Type the operation expects at that position.
        expected: &'static str,
    },

    /// The target produced a return value of an unexpected shape.
    #[error("operation did not return a `{expected}`")]
    ReturnMismatch {
        /// Type the caller expects.
        expected: &'static str,
    },

    /// An aspect failed for a reason of its own.
    #[error("aspect `{aspect}` failed in {phase} phase")]
    Aspect {
        /// Name of the failing aspect.
        aspect: &'static str,
        /// Phase the failure happened in.
        phase: Phase,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// A target failure that does not belong to the caller's error type.
    #[error(transparent)]
    Foreign(BoxError),
}

impl InterposeError {
    /// Wrap a custom aspect failure.
    pub fn aspect(aspect: &'static str, phase: Phase, source: impl Into<BoxError>) -> Self {
        InterposeError::Aspect {
            aspect,
            phase,
            source: source.into(),
        }
    }

    /// Whether this error reports a before/after pairing mismatch.
    pub fn is_missing_correlation(&self) -> bool {
        matches!(self, InterposeError::MissingCorrelation(_))
    }
}

impl From<BoxError> for InterposeError {
    fn from(err: BoxError) -> Self {
        match err.downcast::<InterposeError>() {
            Ok(err) => *err,
            Err(err) => InterposeError::Foreign(err),
        }
    }
}
