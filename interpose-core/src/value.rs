//! Values flowing through the pipeline.
//!
//! Arguments and return values cross the dispatcher as boxed [`Value`]s. The
//! dispatcher never inspects them; aspects may render them with `Debug`, and
//! the target or the typed adapter recovers the concrete type by downcasting.

use crate::error::{BoxError, InterposeError};
use std::{any::Any, fmt};

/// Any value that may be passed into or returned from an operation.
///
/// Blanket-implemented for every `'static + Debug + Send + Sync` type.
pub trait Value: Any + fmt::Debug + Send + Sync {
    /// Borrow as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Convert into a boxed `Any` for downcasting by value.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

impl<T: Any + fmt::Debug + Send + Sync> Value for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

/// Ordered positional arguments of one call.
#[derive(Debug, Default)]
pub struct Arguments {
    values: Vec<Box<dyn Value>>,
}

impl Arguments {
    /// Create an empty argument list.
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Create an empty argument list with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Append a value.
    pub fn push<T: Value>(&mut self, value: T) {
        self.values.push(Box::new(value));
    }

    /// Append a value, builder style.
    pub fn with<T: Value>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the raw value at `index`.
    pub fn raw(&self, index: usize) -> Option<&dyn Value> {
        self.values.get(index).map(|value| &**value)
    }

    /// Borrow the argument at `index` as a `T`.
    pub fn get<T: Value>(&self, index: usize) -> Result<&T, InterposeError> {
        self.raw(index)
            .and_then(|value| value.as_any().downcast_ref::<T>())
            .ok_or(InterposeError::ArgumentMismatch {
                index,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Whether the argument at `index` exists and is a `T`.
    pub fn is<T: Value>(&self, index: usize) -> bool {
        self.raw(index)
            .is_some_and(|value| value.as_any().is::<T>())
    }

    /// Clone the argument at `index` out as a `T`.
    pub fn cloned<T: Value + Clone>(&self, index: usize) -> Result<T, InterposeError> {
        self.get::<T>(index).cloned()
    }

    /// Iterate over the values in order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Value> {
        self.values.iter().map(|value| &**value)
    }
}

/// The result of one real invocation.
///
/// Produced once per call, observed by every after-phase and then handed to
/// the caller.
#[derive(Debug)]
pub enum Outcome {
    /// The operation produced a value.
    Value(Box<dyn Value>),
    /// The operation completed without producing a value.
    Void,
    /// The operation failed. The error is the target's own, unwrapped.
    Failed(BoxError),
    /// The operation never ran because a before-phase failed.
    ///
    /// Only observed by after-phases run while unwinding.
    Aborted,
}

impl Outcome {
    /// Wrap a produced value.
    pub fn value<T: Value>(value: T) -> Self {
        Outcome::Value(Box::new(value))
    }

    /// Wrap a failure.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Outcome::Failed(err.into())
    }

    /// Convert a value-returning target result.
    pub fn from_result<T, E>(result: Result<T, E>) -> Self
    where
        T: Value,
        E: std::error::Error + Send + Sync + 'static,
    {
        match result {
            Ok(value) => Outcome::value(value),
            Err(err) => Outcome::Failed(Box::new(err)),
        }
    }

    /// Convert a target result that carries no value.
    pub fn from_void_result<E>(result: Result<(), E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match result {
            Ok(()) => Outcome::Void,
            Err(err) => Outcome::Failed(Box::new(err)),
        }
    }

    /// Whether the operation produced a value.
    pub fn is_value(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }

    /// Whether the operation completed without a value.
    pub fn is_void(&self) -> bool {
        matches!(self, Outcome::Void)
    }

    /// Whether the operation failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// Borrow the produced value as a `T`, if there is one of that type.
    pub fn downcast_ref<T: Value>(&self) -> Option<&T> {
        match self {
            Outcome::Value(value) => {
                let value: &dyn Value = &**value;
                value.as_any().downcast_ref::<T>()
            }
            _ => None,
        }
    }

    /// Recover a typed result for a value-returning operation.
    ///
    /// A target failure of type `E` comes back as that very error.
    pub fn into_value<T, E>(self) -> Result<T, E>
    where
        T: Value,
        E: From<InterposeError> + std::error::Error + Send + Sync + 'static,
    {
        let mismatch = || InterposeError::ReturnMismatch {
            expected: std::any::type_name::<T>(),
        };
        match self {
            Outcome::Value(value) => match value.into_any().downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(_) => Err(mismatch().into()),
            },
            Outcome::Failed(err) => Err(recover(err)),
            Outcome::Void | Outcome::Aborted => Err(mismatch().into()),
        }
    }

    /// Recover a typed result for an operation without a return value.
    pub fn into_void<E>(self) -> Result<(), E>
    where
        E: From<InterposeError> + std::error::Error + Send + Sync + 'static,
    {
        match self {
            Outcome::Void => Ok(()),
            Outcome::Failed(err) => Err(recover(err)),
            Outcome::Value(_) | Outcome::Aborted => {
                Err(InterposeError::ReturnMismatch { expected: "()" }.into())
            }
        }
    }
}

fn recover<E>(err: BoxError) -> E
where
    E: From<InterposeError> + std::error::Error + Send + Sync + 'static,
{
    match err.downcast::<E>() {
        Ok(err) => *err,
        Err(err) => InterposeError::from(err).into(),
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(value) => write!(f, "{value:?}"),
            Outcome::Void => f.write_str("void"),
            Outcome::Failed(err) => write!(f, "failed: {err}"),
            Outcome::Aborted => f.write_str("aborted"),
        }
    }
}
