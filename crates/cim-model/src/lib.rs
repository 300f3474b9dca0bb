//! CIM object model shared by the CIM-XML decoders.
//!
//! The crate is transport- and XML-agnostic: it knows the CIM type system,
//! how raw text converts into typed values, the datetime and object path text
//! grammars, and the immutable entity types (classes, instances, qualifiers)
//! that decoders construct.

use thiserror::Error;

pub mod coerce;
pub mod datatype;
pub mod datetime;
pub mod entity;
pub mod path;
pub mod value;

pub use coerce::{coerce, coerce_legacy, coerce_typed, coerce_value, ValueTypeHint};
pub use datatype::{DataType, TypeKind};
pub use datetime::{CimDateTime, DateTimeAbsolute, DateTimeInterval};
pub use entity::{
    find_qualifier, Argument, CimClass, CimInstance, CimMethod, CimParameter, CimProperty,
    CimQualifier, Flavor, QualifierType, Scope,
};
pub use path::{KeyBinding, ObjectPath};
pub use value::{CimValue, Scalar, TypedValue};

/// Errors produced while interpreting CIM type names and value text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The type name is not part of the CIM type table.
    #[error("invalid type: {0}")]
    InvalidType(String),
    /// Text could not be converted into the requested kind.
    #[error("cannot parse {value:?} as {kind}: {reason}")]
    Parse {
        kind: &'static str,
        value: String,
        reason: String,
    },
    /// Text matched neither the absolute nor the interval datetime grammar.
    #[error("invalid datetime {value:?}: {absolute}; {interval}")]
    DateTime {
        value: String,
        absolute: String,
        interval: String,
    },
    /// Text is not a well-formed serialized object path.
    #[error("invalid object path {value:?}: {reason}")]
    Path { value: String, reason: String },
}

impl ValueError {
    pub(crate) fn parse(kind: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ValueError::Parse {
            kind,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn path(value: &str, reason: impl Into<String>) -> Self {
        ValueError::Path {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
