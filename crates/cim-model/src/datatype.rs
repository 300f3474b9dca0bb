//! CIM type descriptors.

use std::fmt;

use crate::ValueError;

/// Scalar kinds of the CIM type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    UInt8,
    SInt8,
    UInt16,
    SInt16,
    UInt32,
    SInt32,
    UInt64,
    SInt64,
    Real32,
    Real64,
    String,
    Boolean,
    Char16,
    DateTime,
    /// Object path pointing at another class or instance.
    Reference,
    /// Embedded class definition.
    Class,
    /// Embedded instance.
    Object,
    /// Placeholder for a slot whose type could not be determined.
    Invalid,
}

const TYPE_TABLE: &[(&str, TypeKind)] = &[
    ("uint8", TypeKind::UInt8),
    ("sint8", TypeKind::SInt8),
    ("uint16", TypeKind::UInt16),
    ("sint16", TypeKind::SInt16),
    ("uint32", TypeKind::UInt32),
    ("sint32", TypeKind::SInt32),
    ("uint64", TypeKind::UInt64),
    ("sint64", TypeKind::SInt64),
    ("real32", TypeKind::Real32),
    ("real64", TypeKind::Real64),
    ("string", TypeKind::String),
    ("boolean", TypeKind::Boolean),
    ("char16", TypeKind::Char16),
    ("datetime", TypeKind::DateTime),
    ("reference", TypeKind::Reference),
    ("class", TypeKind::Class),
    ("object", TypeKind::Object),
];

impl TypeKind {
    /// Case-insensitive lookup in the CIM type table.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        TYPE_TABLE
            .iter()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
            .map(|(_, kind)| *kind)
    }

    /// Canonical lowercase type name as used in `TYPE` attributes.
    pub const fn name(self) -> &'static str {
        match self {
            TypeKind::UInt8 => "uint8",
            TypeKind::SInt8 => "sint8",
            TypeKind::UInt16 => "uint16",
            TypeKind::SInt16 => "sint16",
            TypeKind::UInt32 => "uint32",
            TypeKind::SInt32 => "sint32",
            TypeKind::UInt64 => "uint64",
            TypeKind::SInt64 => "sint64",
            TypeKind::Real32 => "real32",
            TypeKind::Real64 => "real64",
            TypeKind::String => "string",
            TypeKind::Boolean => "boolean",
            TypeKind::Char16 => "char16",
            TypeKind::DateTime => "datetime",
            TypeKind::Reference => "reference",
            TypeKind::Class => "class",
            TypeKind::Object => "object",
            TypeKind::Invalid => "invalid",
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            TypeKind::UInt8
                | TypeKind::SInt8
                | TypeKind::UInt16
                | TypeKind::SInt16
                | TypeKind::UInt32
                | TypeKind::SInt32
                | TypeKind::UInt64
                | TypeKind::SInt64
        )
    }

    pub const fn is_real(self) -> bool {
        matches!(self, TypeKind::Real32 | TypeKind::Real64)
    }

    /// Kinds whose values carry a decoded class or instance.
    pub const fn is_embedded(self) -> bool {
        matches!(self, TypeKind::Class | TypeKind::Object)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Full type descriptor of a value slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataType {
    kind: TypeKind,
    array: bool,
    array_size: usize,
    reference_class: Option<String>,
}

impl DataType {
    /// Scalar type of the given kind.
    pub const fn scalar(kind: TypeKind) -> Self {
        Self {
            kind,
            array: false,
            array_size: 0,
            reference_class: None,
        }
    }

    /// Unbounded array of the given element kind.
    pub const fn array(kind: TypeKind) -> Self {
        Self {
            kind,
            array: true,
            array_size: 0,
            reference_class: None,
        }
    }

    pub const fn string() -> Self {
        Self::scalar(TypeKind::String)
    }

    /// Scalar reference, optionally constrained to a target class.
    pub fn reference(class: Option<&str>) -> Self {
        Self {
            kind: TypeKind::Reference,
            array: false,
            array_size: 0,
            reference_class: class.filter(|c| !c.is_empty()).map(str::to_string),
        }
    }

    /// Array of references, optionally constrained to a target class.
    pub fn reference_array(class: Option<&str>) -> Self {
        Self {
            array: true,
            ..Self::reference(class)
        }
    }

    /// Resolve a `TYPE` attribute value.
    ///
    /// An absent name defaults to string; an unknown name is an error.
    pub fn from_name(name: Option<&str>, is_array: bool) -> Result<Self, ValueError> {
        let kind = match name {
            None => TypeKind::String,
            Some(name) => {
                TypeKind::from_name(name).ok_or_else(|| ValueError::InvalidType(name.to_string()))?
            }
        };
        Ok(if is_array {
            Self::array(kind)
        } else {
            Self::scalar(kind)
        })
    }

    pub const fn kind(&self) -> TypeKind {
        self.kind
    }

    pub const fn is_array(&self) -> bool {
        self.array
    }

    /// Declared array length; `0` means unbounded.
    pub const fn array_size(&self) -> usize {
        self.array_size
    }

    pub fn reference_class(&self) -> Option<&str> {
        self.reference_class.as_deref()
    }

    pub const fn is_reference(&self) -> bool {
        matches!(self.kind, TypeKind::Reference)
    }

    /// Return the array form of this type with the given bound.
    ///
    /// A scalar type becomes an array; `0` keeps the array unbounded.
    pub fn with_array_size(mut self, size: usize) -> Self {
        self.array = true;
        self.array_size = size;
        self
    }

    /// Scalar element type of an array descriptor.
    pub fn element(&self) -> Self {
        Self {
            array: false,
            array_size: 0,
            ..self.clone()
        }
    }

    /// Same array shape with a different element kind.
    pub fn with_kind(&self, kind: TypeKind) -> Self {
        Self {
            kind,
            array: self.array,
            array_size: self.array_size,
            reference_class: if kind == TypeKind::Reference {
                self.reference_class.clone()
            } else {
                None
            },
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(class) = &self.reference_class {
            write!(f, "{class} ref")?;
        } else {
            f.write_str(self.kind.name())?;
        }
        match (self.array, self.array_size) {
            (false, _) => Ok(()),
            (true, 0) => f.write_str("[]"),
            (true, size) => write!(f, "[{size}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_name_roundtrips() {
        for (name, kind) in TYPE_TABLE {
            for is_array in [false, true] {
                let ty = DataType::from_name(Some(name), is_array).expect("known type");
                assert_eq!(ty.kind(), *kind);
                assert_eq!(ty.is_array(), is_array);
                assert!(ty.kind().name().eq_ignore_ascii_case(name));
                let upper = name.to_ascii_uppercase();
                let again = DataType::from_name(Some(&upper), is_array).expect("uppercase");
                assert_eq!(again, ty);
            }
        }
    }

    #[test]
    fn absent_name_defaults_to_string() {
        assert_eq!(DataType::from_name(None, false).unwrap(), DataType::string());
        assert_eq!(
            DataType::from_name(None, true).unwrap(),
            DataType::array(TypeKind::String)
        );
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = DataType::from_name(Some("uint128"), false).unwrap_err();
        assert_eq!(err, ValueError::InvalidType("uint128".into()));
    }

    #[test]
    fn reference_target_is_kept_only_for_references() {
        let ty = DataType::reference(Some("CIM_System"));
        assert_eq!(ty.reference_class(), Some("CIM_System"));
        assert_eq!(ty.to_string(), "CIM_System ref");
        let retyped = ty.with_kind(TypeKind::String);
        assert_eq!(retyped.reference_class(), None);
        assert_eq!(DataType::array(TypeKind::UInt8).with_array_size(4).to_string(), "uint8[4]");
    }
}
