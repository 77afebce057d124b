//! Error types for compilation and for the generated bindings' runtime contract.

use thiserror::Error;

use crate::coercion::DecodeError;
use crate::types::IdlType;

/// Structural problems in the interface declarations. Any of these aborts
/// the compilation unit; no source is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A member declares a type tag with no registered mapping.
    #[error("unsupported type `{tag}`{}", describe_member(.member))]
    UnsupportedType { tag: String, member: Option<String> },

    /// Constructor parameters are out of order or do not line up with the
    /// interface's attributes, or a member is requested that the interface
    /// does not declare.
    #[error("invalid signature for `{interface}`: {reason}")]
    InvalidSignature { interface: String, reason: String },

    /// Two declarations share an identifier, or an identifier is reserved
    /// by the generated source.
    #[error("duplicate symbol `{symbol}`: {reason}")]
    DuplicateSymbol { symbol: String, reason: String },

    /// An identifier is not usable as a C++ identifier.
    #[error("invalid identifier `{name}` for {context}")]
    InvalidIdentifier { name: String, context: String },

    /// Several of the above, in declaration order.
    #[error("{} errors:\n{}", count(.0), list(.0))]
    Multiple(Vec<CompileError>),
}

fn describe_member(member: &Option<String>) -> String {
    match member {
        Some(m) => format!(" for `{}`", m),
        None => String::new(),
    }
}

fn count(errors: &[CompileError]) -> usize {
    errors.len()
}

fn list(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

impl CompileError {
    pub(crate) fn unsupported_type(tag: &str) -> Self {
        CompileError::UnsupportedType {
            tag: tag.to_string(),
            member: None,
        }
    }

    pub(crate) fn invalid_signature(interface: &str, reason: impl Into<String>) -> Self {
        CompileError::InvalidSignature {
            interface: interface.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn duplicate(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::DuplicateSymbol {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Attach the `Interface.member` path to an `UnsupportedType` error.
    pub(crate) fn at_member(self, path: String) -> Self {
        match self {
            CompileError::UnsupportedType { tag, member: None } => CompileError::UnsupportedType {
                tag,
                member: Some(path),
            },
            other => other,
        }
    }

    /// Fold a list of errors into one, flattening nested `Multiple`s.
    pub(crate) fn from_list(errors: Vec<CompileError>) -> Option<Self> {
        let mut flat = Vec::with_capacity(errors.len());
        for err in errors {
            match err {
                CompileError::Multiple(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(CompileError::Multiple(flat)),
        }
    }

    /// Iterate the individual errors.
    pub fn errors(&self) -> Vec<&CompileError> {
        match self {
            CompileError::Multiple(inner) => inner.iter().collect(),
            single => vec![single],
        }
    }
}

fn verb(count: &usize) -> &'static str {
    if *count == 1 {
        "was"
    } else {
        "were"
    }
}

/// Errors the generated bindings raise to the host caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A construction call supplied too few or too many arguments.
    #[error("Failed to construct '{interface}': {expectation}, but {actual} {} provided.", verb(.actual))]
    Arity {
        interface: String,
        expectation: String,
        actual: usize,
    },

    /// A value could not be decoded into the target native type.
    #[error("{context} is not of type '{expected}'.")]
    TypeMismatch {
        context: String,
        expected: IdlType,
        #[source]
        reason: DecodeError,
    },

    /// Assignment to a readonly attribute.
    #[error("Cannot assign to read only property '{property}' of object '#<{interface}>'")]
    ReadOnly { interface: String, property: String },

    /// The property is not an attribute of the interface.
    #[error("'{property}' is not an attribute of '{interface}'")]
    UnknownProperty { interface: String, property: String },

    /// No class with that name is exported by the module.
    #[error("'{0}' is not a constructor")]
    UnknownInterface(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_list_flattens() {
        let a = CompileError::duplicate("A", "declared twice");
        let b = CompileError::invalid_signature("B", "bad");
        let nested = CompileError::Multiple(vec![a.clone(), b.clone()]);
        let c = CompileError::unsupported_type("any");

        let folded = CompileError::from_list(vec![nested, c.clone()]).unwrap();
        assert_eq!(folded, CompileError::Multiple(vec![a, b, c]));
        assert!(CompileError::from_list(Vec::new()).is_none());
    }

    #[test]
    fn test_display_messages() {
        let err = CompileError::unsupported_type("any").at_member("Animal.pet".to_string());
        assert_eq!(err.to_string(), "unsupported type `any` for `Animal.pet`");

        let arity = RuntimeError::Arity {
            interface: "Animal".into(),
            expectation: "expected at most 2 arguments".into(),
            actual: 3,
        };
        assert_eq!(
            arity.to_string(),
            "Failed to construct 'Animal': expected at most 2 arguments, but 3 were provided."
        );

        let readonly = RuntimeError::ReadOnly {
            interface: "Animal".into(),
            property: "name".into(),
        };
        assert!(readonly.to_string().contains("'name'"));
    }
}
