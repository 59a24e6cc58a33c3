//! Operation metadata and per-call records.

use crate::value::{Arguments, Value};
use std::fmt;
use uuid::Uuid;

/// One declared parameter of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamDescriptor {
    /// Parameter name.
    pub name: &'static str,
    /// Parameter type, as written in the capability trait.
    pub ty: &'static str,
}

/// What an operation hands back on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    /// A value of the named type.
    Value(&'static str),
    /// No value.
    Void,
}

/// Static metadata about one invocable operation.
///
/// Descriptors are built at compile time from a capability trait and are
/// never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationDescriptor {
    /// Operation name.
    pub name: &'static str,
    /// Declared parameters, in order.
    pub params: &'static [ParamDescriptor],
    /// Return shape.
    pub returns: ReturnShape,
}

impl OperationDescriptor {
    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether the operation returns no value.
    pub fn is_void(&self) -> bool {
        matches!(self.returns, ReturnShape::Void)
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", param.name, param.ty)?;
        }
        match self.returns {
            ReturnShape::Value(ty) => write!(f, ") -> {ty}"),
            ReturnShape::Void => f.write_str(")"),
        }
    }
}

/// Identifier of one invocation, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallId(Uuid);

impl CallId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Per-invocation record.
///
/// Created fresh for every call and owned by the dispatcher for the duration
/// of that call. Aspects only ever see it by shared reference.
#[derive(Debug)]
pub struct CallInfo {
    id: CallId,
    descriptor: &'static OperationDescriptor,
    arguments: Arguments,
}

impl CallInfo {
    /// Build the record for a call to `descriptor`.
    pub fn new(descriptor: &'static OperationDescriptor, arguments: Arguments) -> Self {
        Self {
            id: CallId::new(),
            descriptor,
            arguments,
        }
    }

    /// Identifier of this call.
    pub fn id(&self) -> CallId {
        self.id
    }

    /// Name of the invoked operation.
    pub fn operation(&self) -> &'static str {
        self.descriptor.name
    }

    /// Descriptor of the invoked operation.
    pub fn descriptor(&self) -> &'static OperationDescriptor {
        self.descriptor
    }

    /// The call's arguments.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Number of arguments.
    pub fn arg_count(&self) -> usize {
        self.arguments.len()
    }

    /// Name of the argument at `index`.
    pub fn arg_name(&self, index: usize) -> Option<&'static str> {
        self.descriptor.params.get(index).map(|param| param.name)
    }

    /// Value of the argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&dyn Value> {
        self.arguments.raw(index)
    }

    /// Name/value pairs in declaration order.
    pub fn named_arguments(&self) -> impl Iterator<Item = (&'static str, &dyn Value)> {
        self.descriptor
            .params
            .iter()
            .map(|param| param.name)
            .zip(self.arguments.iter())
    }

    /// Render the arguments as `name: value` pairs.
    pub fn display_arguments(&self) -> DisplayArguments<'_> {
        DisplayArguments(self)
    }
}

/// Helper returned by [`CallInfo::display_arguments`].
pub struct DisplayArguments<'a>(&'a CallInfo);

impl fmt::Display for DisplayArguments<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (name, value)) in self.0.named_arguments().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value:?}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static CREATE: OperationDescriptor = OperationDescriptor {
        name: "create",
        params: &[
            ParamDescriptor {
                name: "name",
                ty: "String",
            },
            ParamDescriptor {
                name: "last_name",
                ty: "String",
            },
        ],
        returns: ReturnShape::Value("Entity"),
    };

    #[test]
    fn descriptor_renders_signature() {
        assert_eq!(
            CREATE.to_string(),
            "create(name: String, last_name: String) -> Entity"
        );
        assert_eq!(CREATE.arity(), 2);
        assert!(!CREATE.is_void());
    }

    #[test]
    fn call_info_pairs_names_with_values() {
        let args = Arguments::new()
            .with("Arthur".to_string())
            .with("Schopenhauer".to_string());
        let call = CallInfo::new(&CREATE, args);

        assert_eq!(call.operation(), "create");
        assert_eq!(call.arg_count(), 2);
        assert_eq!(call.arg_name(1), Some("last_name"));
        let first = call.arg(0).unwrap().as_any().downcast_ref::<String>();
        assert_eq!(first.map(String::as_str), Some("Arthur"));
        assert!(call.arg(2).is_none());
        assert_eq!(
            call.display_arguments().to_string(),
            r#"[name: "Arthur", last_name: "Schopenhauer"]"#
        );
    }

    #[test]
    fn every_call_gets_its_own_id() {
        let a = CallInfo::new(&CREATE, Arguments::new());
        let b = CallInfo::new(&CREATE, Arguments::new());
        assert_ne!(a.id(), b.id());
    }
}
