//! Immutable CIM entities: qualifiers, properties, methods, classes, instances.

use bitflags::bitflags;

use crate::datatype::DataType;
use crate::path::{KeyBinding, ObjectPath};
use crate::value::{CimValue, TypedValue};

bitflags! {
    /// Qualifier flavor bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flavor: u8 {
        /// Subclasses may not override the qualifier value.
        const DISABLE_OVERRIDE = 0x01;
        /// The qualifier is not propagated to subclasses.
        const RESTRICTED = 0x02;
        /// The qualifier value is localizable.
        const TRANSLATE = 0x04;
    }
}

bitflags! {
    /// Model elements a qualifier declaration applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Scope: u8 {
        const CLASS = 0x01;
        const ASSOCIATION = 0x02;
        const INDICATION = 0x04;
        const PROPERTY = 0x08;
        const REFERENCE = 0x10;
        const METHOD = 0x20;
        const PARAMETER = 0x40;
        const ANY = 0x7F;
    }
}

impl Scope {
    /// Scope bit named by a `SCOPE` attribute.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        const KEYWORDS: &[(&str, Scope)] = &[
            ("CLASS", Scope::CLASS),
            ("ASSOCIATION", Scope::ASSOCIATION),
            ("INDICATION", Scope::INDICATION),
            ("PROPERTY", Scope::PROPERTY),
            ("REFERENCE", Scope::REFERENCE),
            ("METHOD", Scope::METHOD),
            ("PARAMETER", Scope::PARAMETER),
            ("ANY", Scope::ANY),
        ];
        KEYWORDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(keyword))
            .map(|(_, scope)| *scope)
    }
}

/// Typed, flavored annotation on a model element.
#[derive(Debug, Clone, PartialEq)]
pub struct CimQualifier {
    pub name: String,
    pub value: TypedValue,
    pub flavor: Flavor,
    pub propagated: bool,
}

impl CimQualifier {
    /// `true` when the qualifier carries a boolean `TRUE`.
    pub fn is_true(&self) -> bool {
        self.value.as_bool() == Some(true)
    }
}

/// Find a qualifier by case-insensitive name.
pub fn find_qualifier<'a>(qualifiers: &'a [CimQualifier], name: &str) -> Option<&'a CimQualifier> {
    qualifiers.iter().find(|q| q.name.eq_ignore_ascii_case(name))
}

/// Property of a class or instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CimProperty {
    pub name: String,
    pub value: TypedValue,
    /// Set when a `Key` qualifier with value `TRUE` is present.
    pub key: bool,
    pub propagated: bool,
    pub origin_class: Option<String>,
    pub qualifiers: Vec<CimQualifier>,
}

impl CimProperty {
    pub fn new(name: impl Into<String>, value: TypedValue) -> Self {
        Self {
            name: name.into(),
            value,
            key: false,
            propagated: false,
            origin_class: None,
            qualifiers: Vec::new(),
        }
    }

    pub fn data_type(&self) -> &DataType {
        &self.value.data_type
    }

    pub fn qualifier(&self, name: &str) -> Option<&CimQualifier> {
        find_qualifier(&self.qualifiers, name)
    }
}

/// Parameter declaration of a method.
#[derive(Debug, Clone, PartialEq)]
pub struct CimParameter {
    pub name: String,
    pub data_type: DataType,
    pub qualifiers: Vec<CimQualifier>,
}

/// Method signature declared by a class.
#[derive(Debug, Clone, PartialEq)]
pub struct CimMethod {
    pub name: String,
    /// Return type; never an array.
    pub return_type: DataType,
    pub origin_class: Option<String>,
    pub propagated: bool,
    pub qualifiers: Vec<CimQualifier>,
    pub parameters: Vec<CimParameter>,
}

/// CIM class definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CimClass {
    pub path: ObjectPath,
    pub superclass: Option<String>,
    pub qualifiers: Vec<CimQualifier>,
    pub properties: Vec<CimProperty>,
    pub methods: Vec<CimMethod>,
    association: bool,
    keyed: bool,
}

impl CimClass {
    /// Build a class, deriving the association and keyed flags from its
    /// qualifiers and properties.
    pub fn new(
        path: ObjectPath,
        superclass: Option<String>,
        qualifiers: Vec<CimQualifier>,
        properties: Vec<CimProperty>,
        methods: Vec<CimMethod>,
    ) -> Self {
        let association = find_qualifier(&qualifiers, "Association").is_some_and(CimQualifier::is_true);
        let keyed = properties.iter().any(|p| p.key);
        Self {
            path,
            superclass,
            qualifiers,
            properties,
            methods,
            association,
            keyed,
        }
    }

    pub fn name(&self) -> &str {
        self.path.object_name()
    }

    pub fn is_association(&self) -> bool {
        self.association
    }

    pub fn is_keyed(&self) -> bool {
        self.keyed
    }

    pub fn property(&self, name: &str) -> Option<&CimProperty> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn method(&self, name: &str) -> Option<&CimMethod> {
        self.methods.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn qualifier(&self, name: &str) -> Option<&CimQualifier> {
        find_qualifier(&self.qualifiers, name)
    }
}

/// CIM instance with its owning object path.
#[derive(Debug, Clone, PartialEq)]
pub struct CimInstance {
    pub path: ObjectPath,
    pub qualifiers: Vec<CimQualifier>,
    pub properties: Vec<CimProperty>,
}

impl CimInstance {
    pub fn class_name(&self) -> &str {
        self.path.object_name()
    }

    pub fn property(&self, name: &str) -> Option<&CimProperty> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Key bindings formed from the properties flagged as keys.
    pub fn key_bindings(&self) -> Vec<KeyBinding> {
        self.properties
            .iter()
            .filter(|p| p.key)
            .map(|p| KeyBinding::new(p.name.clone(), p.value.clone()))
            .collect()
    }
}

/// Qualifier declaration (`QUALIFIER.DECLARATION`).
#[derive(Debug, Clone, PartialEq)]
pub struct QualifierType {
    /// Qualifier name carried as the path's object name.
    pub path: ObjectPath,
    pub data_type: DataType,
    pub default: CimValue,
    pub scope: Scope,
    pub flavor: Flavor,
}

impl QualifierType {
    pub fn name(&self) -> &str {
        self.path.object_name()
    }
}

/// Named parameter value of a method or operation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: TypedValue,
}

impl Argument {
    pub fn new(name: impl Into<String>, value: TypedValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn data_type(&self) -> &DataType {
        &self.value.data_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Scalar;

    fn qualifier(name: &str, value: bool) -> CimQualifier {
        CimQualifier {
            name: name.into(),
            value: TypedValue::scalar(Scalar::Boolean(value)),
            flavor: Flavor::empty(),
            propagated: false,
        }
    }

    #[test]
    fn class_flags_follow_qualifiers_and_keys() {
        let mut key = CimProperty::new("Name", TypedValue::string("x"));
        key.key = true;
        let class = CimClass::new(
            ObjectPath::new("CIM_Dependency"),
            None,
            vec![qualifier("ASSOCIATION", true)],
            vec![key],
            Vec::new(),
        );
        assert!(class.is_association());
        assert!(class.is_keyed());

        let plain = CimClass::new(
            ObjectPath::new("CIM_Plain"),
            Some("CIM_Base".into()),
            vec![qualifier("Association", false)],
            vec![CimProperty::new("Caption", TypedValue::string("y"))],
            Vec::new(),
        );
        assert!(!plain.is_association());
        assert!(!plain.is_keyed());
    }

    #[test]
    fn scope_keywords() {
        assert_eq!(Scope::from_keyword("property"), Some(Scope::PROPERTY));
        assert_eq!(Scope::from_keyword("Any"), Some(Scope::ANY));
        assert_eq!(Scope::from_keyword("FIELD"), None);
        assert!(Scope::ANY.contains(Scope::PARAMETER | Scope::CLASS));
    }
}
