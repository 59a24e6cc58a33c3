//! # Correlation
//!
//! Carries aspect-private state from a before-phase to its matching
//! after-phase. Every entry is keyed by a [`CorrelationToken`] that is unique
//! per aspect per call, so concurrent calls on the same operation never see
//! each other's state.
//!
//! The store itself is shared by every call running through a dispatcher and
//! must therefore be safe for concurrent `put`/`take`.

use crate::error::InterposeError;
use std::{any::Any, fmt};
use uuid::Uuid;

/// Aspect-private state held between the two phases of one call.
pub type Payload = Box<dyn Any + Send>;

/// Opaque key pairing one before-phase with its after-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationToken(Uuid);

impl CorrelationToken {
    /// Generate a fresh random token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying identifier.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A concurrency-safe keyed store for correlation entries.
///
/// Implementations must reject a second `put` under the same token with
/// [`InterposeError::DuplicateToken`] and a `take` of an absent token with
/// [`InterposeError::MissingCorrelation`].
pub trait CorrelationStore: Send + Sync {
    /// Insert a new entry.
    fn put(&self, token: CorrelationToken, payload: Payload) -> Result<(), InterposeError>;

    /// Remove and return an entry.
    fn take(&self, token: &CorrelationToken) -> Result<Payload, InterposeError>;

    /// Remove an entry if present. Returns whether anything was removed.
    fn discard(&self, token: &CorrelationToken) -> bool;

    /// Whether an entry exists for the token.
    fn contains(&self, token: &CorrelationToken) -> bool;

    /// Number of live entries.
    fn len(&self) -> usize;

    /// Whether the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_unique() {
        let tokens: HashSet<_> = (0..1_000).map(|_| CorrelationToken::new()).collect();
        assert_eq!(tokens.len(), 1_000);
    }

    #[test]
    fn token_displays_as_uuid() {
        let token = CorrelationToken::new();
        assert_eq!(token.to_string(), token.as_uuid().to_string());
    }
}
