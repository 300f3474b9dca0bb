//! Typed CIM values.

use std::fmt;

use crate::datatype::{DataType, TypeKind};
use crate::datetime::CimDateTime;
use crate::entity::{CimClass, CimInstance};
use crate::path::ObjectPath;

/// A single value of one of the CIM scalar kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    UInt8(u8),
    SInt8(i8),
    UInt16(u16),
    SInt16(i16),
    UInt32(u32),
    SInt32(i32),
    UInt64(u64),
    SInt64(i64),
    Real32(f32),
    Real64(f64),
    String(String),
    Boolean(bool),
    Char16(char),
    DateTime(CimDateTime),
    Reference(ObjectPath),
    /// Embedded class decoded from escaped XML text.
    Class(Box<CimClass>),
    /// Embedded instance decoded from escaped XML text.
    Instance(Box<CimInstance>),
}

impl Scalar {
    /// Kind this value belongs to.
    pub fn kind(&self) -> TypeKind {
        match self {
            Scalar::UInt8(_) => TypeKind::UInt8,
            Scalar::SInt8(_) => TypeKind::SInt8,
            Scalar::UInt16(_) => TypeKind::UInt16,
            Scalar::SInt16(_) => TypeKind::SInt16,
            Scalar::UInt32(_) => TypeKind::UInt32,
            Scalar::SInt32(_) => TypeKind::SInt32,
            Scalar::UInt64(_) => TypeKind::UInt64,
            Scalar::SInt64(_) => TypeKind::SInt64,
            Scalar::Real32(_) => TypeKind::Real32,
            Scalar::Real64(_) => TypeKind::Real64,
            Scalar::String(_) => TypeKind::String,
            Scalar::Boolean(_) => TypeKind::Boolean,
            Scalar::Char16(_) => TypeKind::Char16,
            Scalar::DateTime(_) => TypeKind::DateTime,
            Scalar::Reference(_) => TypeKind::Reference,
            Scalar::Class(_) => TypeKind::Class,
            Scalar::Instance(_) => TypeKind::Object,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&ObjectPath> {
        match self {
            Scalar::Reference(path) => Some(path),
            _ => None,
        }
    }

    pub fn as_path_mut(&mut self) -> Option<&mut ObjectPath> {
        match self {
            Scalar::Reference(path) => Some(path),
            _ => None,
        }
    }

    /// Integer kinds widened to `i128`, which holds every CIM integer.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Scalar::UInt8(v) => Some(v.into()),
            Scalar::SInt8(v) => Some(v.into()),
            Scalar::UInt16(v) => Some(v.into()),
            Scalar::SInt16(v) => Some(v.into()),
            Scalar::UInt32(v) => Some(v.into()),
            Scalar::SInt32(v) => Some(v.into()),
            Scalar::UInt64(v) => Some(v.into()),
            Scalar::SInt64(v) => Some(v.into()),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::UInt8(v) => fmt::Display::fmt(v, f),
            Scalar::SInt8(v) => fmt::Display::fmt(v, f),
            Scalar::UInt16(v) => fmt::Display::fmt(v, f),
            Scalar::SInt16(v) => fmt::Display::fmt(v, f),
            Scalar::UInt32(v) => fmt::Display::fmt(v, f),
            Scalar::SInt32(v) => fmt::Display::fmt(v, f),
            Scalar::UInt64(v) => fmt::Display::fmt(v, f),
            Scalar::SInt64(v) => fmt::Display::fmt(v, f),
            Scalar::Real32(v) => fmt::Display::fmt(v, f),
            Scalar::Real64(v) => fmt::Display::fmt(v, f),
            Scalar::String(v) => f.write_str(v),
            Scalar::Boolean(v) => f.write_str(if *v { "TRUE" } else { "FALSE" }),
            Scalar::Char16(v) => fmt::Display::fmt(v, f),
            Scalar::DateTime(v) => fmt::Display::fmt(v, f),
            Scalar::Reference(v) => fmt::Display::fmt(v, f),
            Scalar::Class(class) => write!(f, "class {}", class.name()),
            Scalar::Instance(instance) => write!(f, "instance of {}", instance.class_name()),
        }
    }
}

/// Value content of a slot: absent, one scalar, or an array.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CimValue {
    #[default]
    Null,
    Scalar(Scalar),
    /// Array entries are `None` where the wire carried `VALUE.NULL`.
    Array(Vec<Option<Scalar>>),
}

impl CimValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, CimValue::Null)
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            CimValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_scalar(self) -> Option<Scalar> {
        match self {
            CimValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Option<Scalar>]> {
        match self {
            CimValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Iterate over every present scalar, whether scalar or array shaped.
    pub fn scalars(&self) -> Box<dyn Iterator<Item = &Scalar> + '_> {
        match self {
            CimValue::Null => Box::new(std::iter::empty()),
            CimValue::Scalar(s) => Box::new(std::iter::once(s)),
            CimValue::Array(items) => Box::new(items.iter().flatten()),
        }
    }

    /// Mutable counterpart of [`CimValue::scalars`].
    pub fn scalars_mut(&mut self) -> Box<dyn Iterator<Item = &mut Scalar> + '_> {
        match self {
            CimValue::Null => Box::new(std::iter::empty()),
            CimValue::Scalar(s) => Box::new(std::iter::once(s)),
            CimValue::Array(items) => Box::new(items.iter_mut().flatten()),
        }
    }
}

/// A value paired with the type it was decoded as.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub data_type: DataType,
    pub value: CimValue,
}

impl TypedValue {
    pub fn new(data_type: DataType, value: CimValue) -> Self {
        Self { data_type, value }
    }

    /// Typed null of the given type.
    pub fn null(data_type: DataType) -> Self {
        Self {
            data_type,
            value: CimValue::Null,
        }
    }

    pub fn scalar(scalar: Scalar) -> Self {
        let data_type = match &scalar {
            Scalar::Reference(_) => DataType::reference(None),
            other => DataType::scalar(other.kind()),
        };
        Self {
            data_type,
            value: CimValue::Scalar(scalar),
        }
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self::scalar(Scalar::String(text.into()))
    }

    pub fn reference(path: ObjectPath) -> Self {
        Self::scalar(Scalar::Reference(path))
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        self.value.as_scalar()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }
}
