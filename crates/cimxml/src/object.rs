//! Recursive-descent decoding of the CIM-XML object productions.

use cim_model::{
    coerce_legacy, coerce_typed, coerce_value, find_qualifier, CimClass, CimInstance, CimMethod,
    CimParameter, CimProperty, CimQualifier, CimValue, DataType, Flavor, KeyBinding, ObjectPath,
    QualifierType, Scalar, Scope, TypeKind, TypedValue, ValueTypeHint,
};
use tracing::{debug, trace, warn};

use crate::config::DecoderConfig;
use crate::element::{Element, XmlNode};
use crate::embedded::embedded_kind;
use crate::error::DecodeError;
use crate::resolver::PathResolver;
use crate::tag::Tag;

type Result<T> = std::result::Result<T, DecodeError>;

/// Anything a single object element decodes to.
#[derive(Debug, Clone, PartialEq)]
pub enum CimObject {
    Class(CimClass),
    Instance(CimInstance),
    Path(ObjectPath),
    QualifierType(QualifierType),
    Value(TypedValue),
}

impl CimObject {
    pub fn path(&self) -> Option<&ObjectPath> {
        match self {
            CimObject::Class(class) => Some(&class.path),
            CimObject::Instance(instance) => Some(&instance.path),
            CimObject::Path(path) => Some(path),
            CimObject::QualifierType(decl) => Some(&decl.path),
            CimObject::Value(_) => None,
        }
    }

    pub fn path_mut(&mut self) -> Option<&mut ObjectPath> {
        match self {
            CimObject::Class(class) => Some(&mut class.path),
            CimObject::Instance(instance) => Some(&mut instance.path),
            CimObject::Path(path) => Some(path),
            CimObject::QualifierType(decl) => Some(&mut decl.path),
            CimObject::Value(_) => None,
        }
    }

    pub fn as_class(&self) -> Option<&CimClass> {
        match self {
            CimObject::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&CimInstance> {
        match self {
            CimObject::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&TypedValue> {
        match self {
            CimObject::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Value shapes tried by single-value-or-array decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Value,
    Reference,
    Array,
    RefArray,
}

impl ValueShape {
    pub const fn tag(self) -> Tag {
        match self {
            ValueShape::Value => Tag::Value,
            ValueShape::Reference => Tag::ValueReference,
            ValueShape::Array => Tag::ValueArray,
            ValueShape::RefArray => Tag::ValueRefArray,
        }
    }
}

const REFERENCE_TARGETS: &[Tag] = &[
    Tag::ClassPath,
    Tag::LocalClassPath,
    Tag::ClassName,
    Tag::InstancePath,
    Tag::LocalInstancePath,
    Tag::InstanceName,
];

const SCOPE_ATTRIBUTES: &[(&str, Scope)] = &[
    ("CLASS", Scope::CLASS),
    ("ASSOCIATION", Scope::ASSOCIATION),
    ("INDICATION", Scope::INDICATION),
    ("PROPERTY", Scope::PROPERTY),
    ("REFERENCE", Scope::REFERENCE),
    ("METHOD", Scope::METHOD),
    ("PARAMETER", Scope::PARAMETER),
];

/// Decodes CIM-XML element trees into the CIM object model.
///
/// A decoder is immutable: its options and the base path used to qualify
/// local paths are fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    pub(crate) config: DecoderConfig,
    pub(crate) resolver: PathResolver,
}

impl Decoder {
    pub fn new(config: DecoderConfig, resolver: PathResolver) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Same options, different base path.
    pub fn with_base(&self, base: ObjectPath) -> Self {
        let mut resolver = self.resolver.clone();
        resolver.set_base(base);
        Self {
            config: self.config,
            resolver,
        }
    }

    /// Parse `xml` and decode its document element as an object.
    pub fn decode_object_str(&self, xml: &str) -> Result<CimObject> {
        self.decode_object(&Element::parse(xml)?)
    }

    /// Decode any element that denotes a class, instance, path, qualifier
    /// declaration or bare value.
    pub fn decode_object<N: XmlNode>(&self, node: &N) -> Result<CimObject> {
        let tag = node
            .tag()
            .ok_or_else(|| DecodeError::invalid("object", format!("unknown element {}", node.name())))?;
        let object = match tag {
            Tag::Class => CimObject::Class(self.decode_class(node)?),
            Tag::Instance => CimObject::Instance(self.decode_instance(node)?),
            Tag::ClassPath
            | Tag::LocalClassPath
            | Tag::ClassName
            | Tag::InstancePath
            | Tag::LocalInstancePath
            | Tag::InstanceName
            | Tag::ObjectPath
            | Tag::ValueReference => CimObject::Path(self.decode_any_path(node)?),
            Tag::ValueObject => self.decode_value_object(node)?,
            Tag::ValueNamedInstance => CimObject::Instance(self.decode_value_named_instance(node)?),
            Tag::ValueNamedObject => self.decode_value_named_object(node)?,
            Tag::ValueObjectWithPath => self.decode_value_object_with_path(node)?,
            Tag::ValueObjectWithLocalPath => self.decode_value_object_with_local_path(node)?,
            Tag::ValueInstanceWithPath => {
                CimObject::Instance(self.decode_value_instance_with_path(node)?)
            }
            Tag::QualifierDeclaration => {
                CimObject::QualifierType(self.decode_qualifier_declaration(node)?)
            }
            Tag::Value => CimObject::Value(coerce_value_node(Tag::Value, node, None)?),
            Tag::ValueArray => CimObject::Value(self.decode_value_array(node, None)?),
            Tag::ValueRefArray => CimObject::Value(self.decode_value_ref_array(node, None)?),
            Tag::ValueNull => CimObject::Value(TypedValue::null(DataType::string())),
            Tag::Cim
            | Tag::Message
            | Tag::SimpleReq
            | Tag::MultiReq
            | Tag::SimpleRsp
            | Tag::MultiRsp
            | Tag::SimpleExpReq
            | Tag::MultiExpReq
            | Tag::SimpleExpRsp
            | Tag::MultiExpRsp
            | Tag::MethodCall
            | Tag::IMethodCall
            | Tag::ExpMethodCall
            | Tag::ParamValue
            | Tag::IParamValue
            | Tag::ExpParamValue
            | Tag::MethodResponse
            | Tag::IMethodResponse
            | Tag::ExpMethodResponse
            | Tag::Error
            | Tag::ReturnValue
            | Tag::IReturnValue
            | Tag::NamespacePath
            | Tag::LocalNamespacePath
            | Tag::Host
            | Tag::Namespace
            | Tag::KeyBinding
            | Tag::KeyValue
            | Tag::Qualifier
            | Tag::Scope
            | Tag::Property
            | Tag::PropertyArray
            | Tag::PropertyReference
            | Tag::Method
            | Tag::Parameter
            | Tag::ParameterReference
            | Tag::ParameterArray
            | Tag::ParameterRefArray => {
                return Err(DecodeError::invalid(
                    tag.as_str(),
                    "element does not denote an object",
                ))
            }
        };
        Ok(object)
    }

    // ---- object paths ----

    /// `NAMESPACEPATH`: host context plus namespace.
    pub fn decode_namespace_path<N: XmlNode>(&self, node: &N) -> Result<ObjectPath> {
        expect(node, Tag::NamespacePath)?;
        let host = self.decode_host(node.require_child(Tag::NamespacePath, Tag::Host)?)?;
        let namespace = self.decode_local_namespace_path(
            node.require_child(Tag::NamespacePath, Tag::LocalNamespacePath)?,
        )?;
        Ok(ObjectPath {
            namespace: Some(namespace),
            ..host
        })
    }

    /// `HOST` text, optionally carrying a scheme and port.
    pub fn decode_host<N: XmlNode>(&self, node: &N) -> Result<ObjectPath> {
        expect(node, Tag::Host)?;
        let text = node.text().map(str::trim).unwrap_or("");
        if text.is_empty() {
            return Err(DecodeError::invalid("HOST", "empty host name"));
        }
        let parsed = if text.contains("//") {
            ObjectPath::parse(text)
        } else {
            ObjectPath::parse(&format!("//{text}"))
        };
        match parsed {
            Ok(path) if path.host.is_some() => Ok(ObjectPath {
                scheme: path.scheme,
                host: path.host,
                port: path.port,
                ..ObjectPath::default()
            }),
            _ => {
                debug!(host = text, "keeping host text verbatim");
                Ok(ObjectPath {
                    host: Some(text.to_string()),
                    ..ObjectPath::default()
                })
            }
        }
    }

    /// `LOCALNAMESPACEPATH`: `NAMESPACE` components joined with `/`.
    pub fn decode_local_namespace_path<N: XmlNode>(&self, node: &N) -> Result<String> {
        expect(node, Tag::LocalNamespacePath)?;
        let parts = node
            .children_named(Tag::Namespace)
            .map(|ns| ns.require_attr(Tag::Namespace, "NAME"))
            .collect::<Result<Vec<_>>>()?;
        if parts.is_empty() {
            return Err(DecodeError::MissingElement {
                production: Tag::LocalNamespacePath.as_str(),
                child: Tag::Namespace.as_str(),
            });
        }
        Ok(parts.join("/"))
    }

    pub fn decode_class_name<N: XmlNode>(&self, node: &N) -> Result<String> {
        expect(node, Tag::ClassName)?;
        Ok(node.require_attr(Tag::ClassName, "NAME")?.to_string())
    }

    pub fn decode_class_path<N: XmlNode>(&self, node: &N) -> Result<ObjectPath> {
        expect(node, Tag::ClassPath)?;
        let context =
            self.decode_namespace_path(node.require_child(Tag::ClassPath, Tag::NamespacePath)?)?;
        let name = self.decode_class_name(node.require_child(Tag::ClassPath, Tag::ClassName)?)?;
        Ok(ObjectPath {
            object_name: name,
            ..context
        })
    }

    pub fn decode_local_class_path<N: XmlNode>(&self, node: &N) -> Result<ObjectPath> {
        expect(node, Tag::LocalClassPath)?;
        let namespace = self.decode_local_namespace_path(
            node.require_child(Tag::LocalClassPath, Tag::LocalNamespacePath)?,
        )?;
        let name =
            self.decode_class_name(node.require_child(Tag::LocalClassPath, Tag::ClassName)?)?;
        Ok(self.resolver.build(&name, Some(&namespace)))
    }

    pub fn decode_instance_path<N: XmlNode>(&self, node: &N) -> Result<ObjectPath> {
        expect(node, Tag::InstancePath)?;
        let context = self
            .decode_namespace_path(node.require_child(Tag::InstancePath, Tag::NamespacePath)?)?;
        let name =
            self.decode_instance_name(node.require_child(Tag::InstancePath, Tag::InstanceName)?)?;
        Ok(ObjectPath {
            object_name: name.object_name,
            keys: name.keys,
            ..context
        })
    }

    pub fn decode_local_instance_path<N: XmlNode>(&self, node: &N) -> Result<ObjectPath> {
        expect(node, Tag::LocalInstancePath)?;
        let namespace = self.decode_local_namespace_path(
            node.require_child(Tag::LocalInstancePath, Tag::LocalNamespacePath)?,
        )?;
        let name = self
            .decode_instance_name(node.require_child(Tag::LocalInstancePath, Tag::InstanceName)?)?;
        Ok(self
            .resolver
            .build_with_keys(&name.object_name, Some(&namespace), name.keys))
    }

    /// `INSTANCENAME` as a context-free path; no key bindings yields a bare
    /// class-named path.
    pub fn decode_instance_name<N: XmlNode>(&self, node: &N) -> Result<ObjectPath> {
        expect(node, Tag::InstanceName)?;
        let class_name = node.require_attr(Tag::InstanceName, "CLASSNAME")?;
        let mut keys = Vec::new();
        for child in node.children() {
            match child.tag() {
                Some(Tag::KeyBinding) => keys.push(self.decode_key_binding(child)?),
                Some(Tag::KeyValue) => {
                    keys.push(KeyBinding::new(String::new(), self.decode_key_value(child)?))
                }
                Some(Tag::ValueReference) => keys.push(KeyBinding::new(
                    String::new(),
                    TypedValue::reference(self.decode_value_reference(child)?),
                )),
                _ => {}
            }
        }
        Ok(ObjectPath {
            object_name: class_name.to_string(),
            keys,
            ..ObjectPath::default()
        })
    }

    pub fn decode_key_binding<N: XmlNode>(&self, node: &N) -> Result<KeyBinding> {
        expect(node, Tag::KeyBinding)?;
        let name = node.require_attr(Tag::KeyBinding, "NAME")?;
        let value = if let Some(key_value) = node.child(Tag::KeyValue) {
            self.decode_key_value(key_value)?
        } else if let Some(reference) = node.child(Tag::ValueReference) {
            TypedValue::reference(self.decode_value_reference(reference)?)
        } else {
            return Err(DecodeError::MissingElement {
                production: Tag::KeyBinding.as_str(),
                child: Tag::KeyValue.as_str(),
            });
        };
        Ok(KeyBinding::new(name, value))
    }

    /// `KEYVALUE`: typed by `TYPE` when present, otherwise by the legacy
    /// `VALUETYPE` probing rules.
    pub fn decode_key_value<N: XmlNode>(&self, node: &N) -> Result<TypedValue> {
        expect(node, Tag::KeyValue)?;
        let text = node.text();
        if let Some(type_name) = node.attribute("TYPE") {
            return coerce_typed(type_name, text).map_err(DecodeError::value("KEYVALUE"));
        }
        let hint = match node.attribute("VALUETYPE") {
            None => ValueTypeHint::String,
            Some(raw) => ValueTypeHint::from_attr(raw).ok_or_else(|| {
                DecodeError::invalid("KEYVALUE", format!("unknown VALUETYPE {raw:?}"))
            })?,
        };
        coerce_legacy(hint, text).map_err(DecodeError::value("KEYVALUE"))
    }

    /// `OBJECTPATH`: an instance or class path.
    pub fn decode_object_path<N: XmlNode>(&self, node: &N) -> Result<ObjectPath> {
        expect(node, Tag::ObjectPath)?;
        if let Some(path) = node.child(Tag::InstancePath) {
            self.decode_instance_path(path)
        } else if let Some(path) = node.child(Tag::ClassPath) {
            self.decode_class_path(path)
        } else {
            Err(DecodeError::MissingElement {
                production: Tag::ObjectPath.as_str(),
                child: "INSTANCEPATH|CLASSPATH",
            })
        }
    }

    pub fn decode_value_reference<N: XmlNode>(&self, node: &N) -> Result<ObjectPath> {
        expect(node, Tag::ValueReference)?;
        let target = node
            .child_of(REFERENCE_TARGETS)
            .ok_or(DecodeError::MissingElement {
                production: Tag::ValueReference.as_str(),
                child: "CLASSPATH|LOCALCLASSPATH|CLASSNAME|INSTANCEPATH|LOCALINSTANCEPATH|INSTANCENAME",
            })?;
        self.decode_any_path(target)
    }

    /// Any element of the object path family; bare names are qualified
    /// through the resolver.
    pub fn decode_any_path<N: XmlNode>(&self, node: &N) -> Result<ObjectPath> {
        match node.tag() {
            Some(Tag::ClassPath) => self.decode_class_path(node),
            Some(Tag::LocalClassPath) => self.decode_local_class_path(node),
            Some(Tag::ClassName) => Ok(self.resolver.build(&self.decode_class_name(node)?, None)),
            Some(Tag::InstancePath) => self.decode_instance_path(node),
            Some(Tag::LocalInstancePath) => self.decode_local_instance_path(node),
            Some(Tag::InstanceName) => {
                let name = self.decode_instance_name(node)?;
                Ok(self
                    .resolver
                    .build_with_keys(&name.object_name, None, name.keys))
            }
            Some(Tag::ObjectPath) => self.decode_object_path(node),
            Some(Tag::ValueReference) => self.decode_value_reference(node),
            _ => Err(DecodeError::invalid(
                "object path",
                format!("{} is not an object path element", node.name()),
            )),
        }
    }

    // ---- values ----

    /// Try `shapes` in order and decode the first one present.
    ///
    /// With nothing present the result is a null of the explicit type, or of
    /// string (`array` selects string array) when there is none.
    pub fn decode_value_or_array<N: XmlNode>(
        &self,
        production: Tag,
        node: &N,
        explicit: Option<&DataType>,
        array: bool,
        shapes: &[ValueShape],
    ) -> Result<TypedValue> {
        for shape in shapes {
            let Some(child) = node.child(shape.tag()) else {
                continue;
            };
            return match shape {
                ValueShape::Value => coerce_value_node(production, child, explicit),
                ValueShape::Reference => {
                    let target = self.decode_value_reference(child)?;
                    let data_type = match explicit {
                        Some(ty) if ty.is_reference() => ty.element(),
                        _ => DataType::reference(None),
                    };
                    Ok(TypedValue::new(
                        data_type,
                        CimValue::Scalar(Scalar::Reference(target)),
                    ))
                }
                ValueShape::Array => self.decode_value_array(child, explicit),
                ValueShape::RefArray => self.decode_value_ref_array(child, explicit),
            };
        }
        Ok(match explicit {
            Some(ty) => TypedValue::null(ty.clone()),
            None if array => TypedValue::null(DataType::array(TypeKind::String)),
            None => TypedValue::null(DataType::string()),
        })
    }

    /// `VALUE.ARRAY` typed by `explicit`, else by the first child's `TYPE`,
    /// else as strings.
    pub fn decode_value_array<N: XmlNode>(
        &self,
        node: &N,
        explicit: Option<&DataType>,
    ) -> Result<TypedValue> {
        expect(node, Tag::ValueArray)?;
        let element = match explicit {
            Some(ty) => ty.element(),
            None => {
                let first_typed = node
                    .children_named(Tag::Value)
                    .filter_map(|value| value.attribute("TYPE"))
                    .find(|name| !is_null_type(Some(*name)));
                DataType::from_name(first_typed, false).map_err(DecodeError::value("VALUE.ARRAY"))?
            }
        };
        let mut items = Vec::new();
        for child in node.children() {
            match child.tag() {
                Some(Tag::Value) if is_null_type(child.attribute("TYPE")) => items.push(None),
                Some(Tag::Value) => items.push(
                    coerce_value(&element, child.text())
                        .map_err(DecodeError::value("VALUE.ARRAY"))?
                        .value
                        .into_scalar(),
                ),
                Some(Tag::ValueNull) => items.push(None),
                _ => {}
            }
        }
        let data_type = match explicit {
            Some(ty) if ty.is_array() => ty.clone(),
            _ => element.with_array_size(0),
        };
        check_array_size(Tag::ValueArray, &data_type, items.len())?;
        Ok(TypedValue::new(data_type, CimValue::Array(items)))
    }

    pub fn decode_value_ref_array<N: XmlNode>(
        &self,
        node: &N,
        explicit: Option<&DataType>,
    ) -> Result<TypedValue> {
        expect(node, Tag::ValueRefArray)?;
        let mut items = Vec::new();
        for child in node.children() {
            match child.tag() {
                Some(Tag::ValueReference) => {
                    items.push(Some(Scalar::Reference(self.decode_value_reference(child)?)))
                }
                Some(Tag::ValueNull) => items.push(None),
                _ => {}
            }
        }
        let data_type = match explicit {
            Some(ty) if ty.is_reference() && ty.is_array() => ty.clone(),
            Some(ty) => DataType::reference_array(ty.reference_class()),
            None => DataType::reference_array(None),
        };
        check_array_size(Tag::ValueRefArray, &data_type, items.len())?;
        Ok(TypedValue::new(data_type, CimValue::Array(items)))
    }

    // ---- qualifiers ----

    pub fn decode_qualifier<N: XmlNode>(&self, node: &N) -> Result<CimQualifier> {
        expect(node, Tag::Qualifier)?;
        let name = node.require_attr(Tag::Qualifier, "NAME")?;
        let type_name = node.require_attr(Tag::Qualifier, "TYPE")?;
        let data_type =
            DataType::from_name(Some(type_name), false).map_err(DecodeError::value("QUALIFIER"))?;
        let value = self.decode_value_or_array(
            Tag::Qualifier,
            node,
            Some(&data_type),
            false,
            &[ValueShape::Value, ValueShape::Array],
        )?;
        Ok(CimQualifier {
            name: name.to_string(),
            value,
            flavor: decode_flavor(node, Tag::Qualifier)?,
            propagated: node.bool_attr(Tag::Qualifier, "PROPAGATED", false)?,
        })
    }

    fn decode_qualifiers<N: XmlNode>(&self, node: &N) -> Result<Vec<CimQualifier>> {
        node.children_named(Tag::Qualifier)
            .map(|q| self.decode_qualifier(q))
            .collect()
    }

    /// `QUALIFIER.DECLARATION` with its scope and default value.
    pub fn decode_qualifier_declaration<N: XmlNode>(&self, node: &N) -> Result<QualifierType> {
        const QD: Tag = Tag::QualifierDeclaration;
        expect(node, QD)?;
        let name = node.require_attr(QD, "NAME")?;
        let type_name = node.require_attr(QD, "TYPE")?;
        let is_array = node.bool_attr(QD, "ISARRAY", false)?;
        let declared = DataType::from_name(Some(type_name), is_array)
            .map_err(DecodeError::value(QD.as_str()))?;
        let size = array_size(node);
        let value = self.decode_value_or_array(
            QD,
            node,
            Some(&declared),
            is_array,
            &[ValueShape::Value, ValueShape::Array],
        )?;
        let mut data_type = value.data_type;
        if data_type.is_array() && size > 0 {
            data_type = data_type.with_array_size(size);
            if let CimValue::Array(items) = &value.value {
                check_array_size(QD, &data_type, items.len())?;
            }
        }
        let scope = match node.child(Tag::Scope) {
            Some(scope) => decode_scope(scope)?,
            None => Scope::empty(),
        };
        trace!(qualifier = name, %data_type, ?scope, "decoded qualifier declaration");
        Ok(QualifierType {
            path: self.resolver.build(name, None),
            data_type,
            default: value.value,
            scope,
            flavor: decode_flavor(node, QD)?,
        })
    }

    // ---- properties ----

    /// `PROPERTY`, `PROPERTY.ARRAY` or `PROPERTY.REFERENCE`.
    pub fn decode_property<N: XmlNode>(&self, node: &N) -> Result<CimProperty> {
        match node.tag() {
            Some(Tag::Property) => self.decode_scalar_property(node),
            Some(Tag::PropertyArray) => self.decode_array_property(node),
            Some(Tag::PropertyReference) => self.decode_reference_property(node),
            _ => Err(DecodeError::invalid(
                "property",
                format!("{} is not a property element", node.name()),
            )),
        }
    }

    fn decode_scalar_property<N: XmlNode>(&self, node: &N) -> Result<CimProperty> {
        let name = node.require_attr(Tag::Property, "NAME")?;
        let qualifiers = self.decode_qualifiers(node)?;
        let raw = DataType::from_name(node.attribute("TYPE"), false)
            .map_err(DecodeError::value("PROPERTY"))?;
        let value_node = node.child(Tag::Value);
        let value = match embedded_kind(node, Tag::Property, &qualifiers)? {
            Some(kind) => self.decode_embedded_scalar(Tag::Property, kind, &raw, value_node)?,
            None => match value_node {
                Some(value) if is_null_type(value.attribute("TYPE")) => TypedValue::null(raw),
                Some(value) => coerce_value(&raw, value.text())
                    .map_err(DecodeError::value("PROPERTY"))?,
                None => TypedValue::null(raw),
            },
        };
        finish_property(Tag::Property, node, name, value, qualifiers)
    }

    fn decode_array_property<N: XmlNode>(&self, node: &N) -> Result<CimProperty> {
        let name = node.require_attr(Tag::PropertyArray, "NAME")?;
        let qualifiers = self.decode_qualifiers(node)?;
        let raw = DataType::from_name(node.attribute("TYPE"), true)
            .map_err(DecodeError::value("PROPERTY.ARRAY"))?
            .with_array_size(array_size(node));
        let array_node = node.child(Tag::ValueArray);
        let value = match embedded_kind(node, Tag::PropertyArray, &qualifiers)? {
            Some(kind) => self.decode_embedded_array(Tag::PropertyArray, kind, &raw, array_node)?,
            None => match array_node {
                Some(array) => self.decode_value_array(array, Some(&raw))?,
                None => TypedValue::null(raw),
            },
        };
        finish_property(Tag::PropertyArray, node, name, value, qualifiers)
    }

    fn decode_reference_property<N: XmlNode>(&self, node: &N) -> Result<CimProperty> {
        let name = node.require_attr(Tag::PropertyReference, "NAME")?;
        let qualifiers = self.decode_qualifiers(node)?;
        let data_type = DataType::reference(node.attribute("REFERENCECLASS"));
        let value = match node.child(Tag::ValueReference) {
            Some(reference) => TypedValue::new(
                data_type,
                CimValue::Scalar(Scalar::Reference(self.decode_value_reference(reference)?)),
            ),
            None => TypedValue::null(data_type),
        };
        finish_property(Tag::PropertyReference, node, name, value, qualifiers)
    }

    // ---- methods ----

    pub fn decode_method<N: XmlNode>(&self, node: &N) -> Result<CimMethod> {
        expect(node, Tag::Method)?;
        let name = node.require_attr(Tag::Method, "NAME")?;
        let qualifiers = self.decode_qualifiers(node)?;
        let mut return_type = DataType::from_name(node.attribute("TYPE"), false)
            .map_err(DecodeError::value("METHOD"))?;
        if let Some(kind) = embedded_kind(node, Tag::Method, &qualifiers)? {
            return_type = self.embedded_slot_type(Tag::Method, kind, &return_type)?;
        }
        let parameters = node
            .children()
            .iter()
            .filter(|child| {
                matches!(
                    child.tag(),
                    Some(
                        Tag::Parameter
                            | Tag::ParameterReference
                            | Tag::ParameterArray
                            | Tag::ParameterRefArray
                    )
                )
            })
            .map(|child| self.decode_parameter(child))
            .collect::<Result<Vec<_>>>()?;
        Ok(CimMethod {
            name: name.to_string(),
            return_type,
            origin_class: node.attribute("CLASSORIGIN").map(str::to_string),
            propagated: node.bool_attr(Tag::Method, "PROPAGATED", false)?,
            qualifiers,
            parameters,
        })
    }

    /// Any of the four `PARAMETER` variants.
    pub fn decode_parameter<N: XmlNode>(&self, node: &N) -> Result<CimParameter> {
        let tag = node.tag().ok_or_else(|| {
            DecodeError::invalid("parameter", format!("unknown element {}", node.name()))
        })?;
        let name = node.require_attr(tag, "NAME")?;
        let qualifiers = self.decode_qualifiers(node)?;
        let mut data_type = match tag {
            Tag::Parameter => DataType::from_name(node.attribute("TYPE"), false),
            Tag::ParameterArray => DataType::from_name(node.attribute("TYPE"), true)
                .map(|ty| ty.with_array_size(array_size(node))),
            Tag::ParameterReference => Ok(DataType::reference(node.attribute("REFERENCECLASS"))),
            Tag::ParameterRefArray => Ok(DataType::reference_array(
                node.attribute("REFERENCECLASS"),
            )
            .with_array_size(array_size(node))),
            other => {
                return Err(DecodeError::invalid(
                    other.as_str(),
                    "element is not a parameter declaration",
                ))
            }
        }
        .map_err(DecodeError::value(tag.as_str()))?;
        if matches!(tag, Tag::Parameter | Tag::ParameterArray) {
            if let Some(kind) = embedded_kind(node, tag, &qualifiers)? {
                data_type = self.embedded_slot_type(tag, kind, &data_type)?;
            }
        }
        Ok(CimParameter {
            name: name.to_string(),
            data_type,
            qualifiers,
        })
    }

    // ---- classes and instances ----

    pub fn decode_class<N: XmlNode>(&self, node: &N) -> Result<CimClass> {
        expect(node, Tag::Class)?;
        let name = node.require_attr(Tag::Class, "NAME")?;
        let superclass = node
            .attribute("SUPERCLASS")
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let mut qualifiers = Vec::new();
        let mut properties = Vec::new();
        let mut methods = Vec::new();
        for child in node.children() {
            match child.tag() {
                Some(Tag::Qualifier) => qualifiers.push(self.decode_qualifier(child)?),
                Some(Tag::Property | Tag::PropertyArray | Tag::PropertyReference) => {
                    properties.push(self.decode_property(child)?)
                }
                Some(Tag::Method) => methods.push(self.decode_method(child)?),
                _ => trace!(class = name, element = child.name(), "skipping class child"),
            }
        }
        let class = CimClass::new(
            self.resolver.build(name, None),
            superclass,
            qualifiers,
            properties,
            methods,
        );
        debug!(
            class = %class.name(),
            properties = class.properties.len(),
            methods = class.methods.len(),
            association = class.is_association(),
            "decoded class"
        );
        Ok(class)
    }

    pub fn decode_instance<N: XmlNode>(&self, node: &N) -> Result<CimInstance> {
        expect(node, Tag::Instance)?;
        let class_name = node.require_attr(Tag::Instance, "CLASSNAME")?;
        let mut qualifiers = Vec::new();
        let mut properties = Vec::new();
        for child in node.children() {
            match child.tag() {
                Some(Tag::Qualifier) => qualifiers.push(self.decode_qualifier(child)?),
                Some(Tag::Property | Tag::PropertyArray | Tag::PropertyReference) => {
                    properties.push(self.decode_property(child)?)
                }
                _ => trace!(class = class_name, element = child.name(), "skipping instance child"),
            }
        }
        let mut instance = CimInstance {
            path: ObjectPath::default(),
            qualifiers,
            properties,
        };
        instance.path = self
            .resolver
            .build_with_keys(class_name, None, instance.key_bindings());
        trace!(class = class_name, properties = instance.properties.len(), "decoded instance");
        Ok(instance)
    }

    // ---- object wrappers ----

    /// `VALUE.OBJECT`: a class or an instance.
    pub fn decode_value_object<N: XmlNode>(&self, node: &N) -> Result<CimObject> {
        expect(node, Tag::ValueObject)?;
        if let Some(class) = node.child(Tag::Class) {
            Ok(CimObject::Class(self.decode_class(class)?))
        } else if let Some(instance) = node.child(Tag::Instance) {
            Ok(CimObject::Instance(self.decode_instance(instance)?))
        } else {
            Err(DecodeError::MissingElement {
                production: Tag::ValueObject.as_str(),
                child: "CLASS|INSTANCE",
            })
        }
    }

    /// `VALUE.NAMEDINSTANCE`: instance named by a local `INSTANCENAME`.
    pub fn decode_value_named_instance<N: XmlNode>(&self, node: &N) -> Result<CimInstance> {
        expect(node, Tag::ValueNamedInstance)?;
        self.named_instance(Tag::ValueNamedInstance, node)
    }

    /// `VALUE.NAMEDOBJECT`: a class, or an instance with its name.
    pub fn decode_value_named_object<N: XmlNode>(&self, node: &N) -> Result<CimObject> {
        expect(node, Tag::ValueNamedObject)?;
        match node.child(Tag::Class) {
            Some(class) => Ok(CimObject::Class(self.decode_class(class)?)),
            None => Ok(CimObject::Instance(
                self.named_instance(Tag::ValueNamedObject, node)?,
            )),
        }
    }

    /// `VALUE.OBJECTWITHPATH`: `(CLASSPATH, CLASS)` or `(INSTANCEPATH, INSTANCE)`.
    pub fn decode_value_object_with_path<N: XmlNode>(&self, node: &N) -> Result<CimObject> {
        const VOWP: Tag = Tag::ValueObjectWithPath;
        expect(node, VOWP)?;
        if let Some(path) = node.child(Tag::ClassPath) {
            let mut class = self.decode_class(node.require_child(VOWP, Tag::Class)?)?;
            class.path = self.decode_class_path(path)?;
            Ok(CimObject::Class(class))
        } else if let Some(path) = node.child(Tag::InstancePath) {
            let mut instance = self.decode_instance(node.require_child(VOWP, Tag::Instance)?)?;
            instance.path = self.decode_instance_path(path)?;
            Ok(CimObject::Instance(instance))
        } else {
            Err(DecodeError::MissingElement {
                production: VOWP.as_str(),
                child: "CLASSPATH|INSTANCEPATH",
            })
        }
    }

    /// `VALUE.OBJECTWITHLOCALPATH`: local path variants of the above.
    pub fn decode_value_object_with_local_path<N: XmlNode>(&self, node: &N) -> Result<CimObject> {
        const VOWLP: Tag = Tag::ValueObjectWithLocalPath;
        expect(node, VOWLP)?;
        if let Some(path) = node.child(Tag::LocalClassPath) {
            let mut class = self.decode_class(node.require_child(VOWLP, Tag::Class)?)?;
            class.path = self.decode_local_class_path(path)?;
            Ok(CimObject::Class(class))
        } else if let Some(path) = node.child(Tag::LocalInstancePath) {
            let mut instance = self.decode_instance(node.require_child(VOWLP, Tag::Instance)?)?;
            instance.path = self.decode_local_instance_path(path)?;
            Ok(CimObject::Instance(instance))
        } else {
            Err(DecodeError::MissingElement {
                production: VOWLP.as_str(),
                child: "LOCALCLASSPATH|LOCALINSTANCEPATH",
            })
        }
    }

    /// `VALUE.INSTANCEWITHPATH`: instance with its full path.
    pub fn decode_value_instance_with_path<N: XmlNode>(&self, node: &N) -> Result<CimInstance> {
        const VIWP: Tag = Tag::ValueInstanceWithPath;
        expect(node, VIWP)?;
        let path = self.decode_instance_path(node.require_child(VIWP, Tag::InstancePath)?)?;
        let mut instance = self.decode_instance(node.require_child(VIWP, Tag::Instance)?)?;
        instance.path = path;
        Ok(instance)
    }

    fn named_instance<N: XmlNode>(&self, production: Tag, node: &N) -> Result<CimInstance> {
        let name = self.decode_instance_name(node.require_child(production, Tag::InstanceName)?)?;
        let mut instance = self.decode_instance(node.require_child(production, Tag::Instance)?)?;
        instance.path = self
            .resolver
            .build_with_keys(&name.object_name, None, name.keys);
        Ok(instance)
    }
}

pub(crate) fn expect<N: XmlNode>(node: &N, tag: Tag) -> Result<()> {
    if node.is(tag) {
        Ok(())
    } else {
        Err(DecodeError::invalid(
            tag.as_str(),
            format!("unexpected element {}", node.name()),
        ))
    }
}

/// `TYPE="null"` (any case) marks a value as null whatever its text.
pub(crate) fn is_null_type(name: Option<&str>) -> bool {
    name.is_some_and(|name| name.trim().eq_ignore_ascii_case("null"))
}

/// Decode one `VALUE` against the caller's type or its own `TYPE`.
pub(crate) fn coerce_value_node<N: XmlNode>(
    production: Tag,
    node: &N,
    explicit: Option<&DataType>,
) -> Result<TypedValue> {
    if is_null_type(node.attribute("TYPE")) {
        let data_type = explicit.map_or_else(DataType::string, DataType::element);
        return Ok(TypedValue::null(data_type));
    }
    let data_type = value_type(node, explicit)?;
    coerce_value(&data_type, node.text()).map_err(DecodeError::value(production.as_str()))
}

/// Element type for a `VALUE`: the caller's type, the element's own `TYPE`,
/// or string.
pub(crate) fn value_type<N: XmlNode>(node: &N, explicit: Option<&DataType>) -> Result<DataType> {
    match explicit {
        Some(ty) => Ok(ty.element()),
        None => DataType::from_name(node.attribute("TYPE"), false)
            .map_err(DecodeError::value("VALUE")),
    }
}

/// `ARRAYSIZE`; absent or unparsable means unbounded.
pub(crate) fn array_size<N: XmlNode>(node: &N) -> usize {
    let Some(raw) = node.attribute("ARRAYSIZE") else {
        return 0;
    };
    match raw.trim().parse() {
        Ok(size) => size,
        Err(err) => {
            warn!(element = node.name(), value = raw, %err, "ignoring unparsable ARRAYSIZE");
            0
        }
    }
}

pub(crate) fn check_array_size(production: Tag, data_type: &DataType, len: usize) -> Result<()> {
    let size = data_type.array_size();
    if size > 0 && size != len {
        return Err(DecodeError::invalid(
            production.as_str(),
            format!("array declares {size} elements but carries {len}"),
        ));
    }
    Ok(())
}

fn decode_flavor<N: XmlNode>(node: &N, production: Tag) -> Result<Flavor> {
    let mut flavor = Flavor::empty();
    if !node.bool_attr(production, "OVERRIDABLE", true)? {
        flavor |= Flavor::DISABLE_OVERRIDE;
    }
    if !node.bool_attr(production, "TOSUBCLASS", true)? {
        flavor |= Flavor::RESTRICTED;
    }
    if node.bool_attr(production, "TRANSLATABLE", false)? {
        flavor |= Flavor::TRANSLATE;
    }
    Ok(flavor)
}

fn decode_scope<N: XmlNode>(node: &N) -> Result<Scope> {
    let mut scope = Scope::empty();
    for &(attribute, bit) in SCOPE_ATTRIBUTES {
        if node.bool_attr(Tag::Scope, attribute, false)? {
            scope |= bit;
        }
    }
    Ok(scope)
}

fn finish_property<N: XmlNode>(
    production: Tag,
    node: &N,
    name: &str,
    value: TypedValue,
    qualifiers: Vec<CimQualifier>,
) -> Result<CimProperty> {
    let key = find_qualifier(&qualifiers, "Key").is_some_and(CimQualifier::is_true);
    Ok(CimProperty {
        name: name.to_string(),
        value,
        key,
        propagated: node.bool_attr(production, "PROPAGATED", false)?,
        origin_class: node.attribute("CLASSORIGIN").map(str::to_string),
        qualifiers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cim_model::TypeKind;

    fn decoder() -> Decoder {
        Decoder::new(
            DecoderConfig::default(),
            PathResolver::new(ObjectPath::parse("http://cimom:5988/root/cimv2").unwrap()),
        )
    }

    fn element(xml: &str) -> Element {
        Element::parse(xml).expect("fixture parses")
    }

    const CLASS: &str = r#"
<CLASS NAME="CIM_Dependency" SUPERCLASS="CIM_ManagedElement">
  <QUALIFIER NAME="Association" TYPE="boolean" OVERRIDABLE="false"><VALUE>TRUE</VALUE></QUALIFIER>
  <QUALIFIER NAME="Description" TYPE="string" TRANSLATABLE="true" TOSUBCLASS="false">
    <VALUE>A dependency</VALUE>
  </QUALIFIER>
  <PROPERTY.REFERENCE NAME="Antecedent" REFERENCECLASS="CIM_ManagedElement">
    <QUALIFIER NAME="Key" TYPE="boolean"><VALUE>true</VALUE></QUALIFIER>
  </PROPERTY.REFERENCE>
  <PROPERTY NAME="Weight" TYPE="uint16" CLASSORIGIN="CIM_Dependency" PROPAGATED="true">
    <VALUE>0x10</VALUE>
  </PROPERTY>
  <PROPERTY.ARRAY NAME="Tags" TYPE="string" ARRAYSIZE="many"/>
  <METHOD NAME="Bump" TYPE="uint32">
    <PARAMETER NAME="By" TYPE="sint8"/>
    <PARAMETER.REFERENCE NAME="Target" REFERENCECLASS="CIM_System"/>
    <PARAMETER.ARRAY NAME="Codes" TYPE="uint8" ARRAYSIZE="4"/>
    <PARAMETER.REFARRAY NAME="Peers"/>
  </METHOD>
</CLASS>"#;

    #[test]
    fn class_with_members() {
        let class = decoder().decode_class(&element(CLASS)).expect("class");
        assert_eq!(class.name(), "CIM_Dependency");
        assert_eq!(class.path.namespace.as_deref(), Some("root/cimv2"));
        assert_eq!(class.superclass.as_deref(), Some("CIM_ManagedElement"));
        assert!(class.is_association());
        assert!(class.is_keyed());

        let association = class.qualifier("association").unwrap();
        assert_eq!(association.flavor, Flavor::DISABLE_OVERRIDE);
        let description = class.qualifier("Description").unwrap();
        assert_eq!(description.flavor, Flavor::RESTRICTED | Flavor::TRANSLATE);

        let antecedent = class.property("Antecedent").unwrap();
        assert!(antecedent.key);
        assert_eq!(antecedent.data_type().reference_class(), Some("CIM_ManagedElement"));
        assert!(antecedent.value.is_null());

        let weight = class.property("Weight").unwrap();
        assert_eq!(weight.value.as_scalar(), Some(&Scalar::UInt16(16)));
        assert!(weight.propagated);
        assert_eq!(weight.origin_class.as_deref(), Some("CIM_Dependency"));

        let tags = class.property("Tags").unwrap();
        assert!(tags.data_type().is_array());
        assert_eq!(tags.data_type().array_size(), 0);

        let bump = class.method("Bump").unwrap();
        assert_eq!(bump.return_type, DataType::scalar(TypeKind::UInt32));
        let types: Vec<String> = bump.parameters.iter().map(|p| p.data_type.to_string()).collect();
        assert_eq!(types, ["sint8", "CIM_System ref", "uint8[4]", "reference[]"]);
    }

    #[test]
    fn typed_value_scenarios() {
        let d = decoder();
        let value = d.decode_object_str(r#"<VALUE TYPE="uint32">42</VALUE>"#).unwrap();
        let value = value.as_value().unwrap();
        assert_eq!(value.data_type, DataType::scalar(TypeKind::UInt32));
        assert_eq!(value.as_scalar(), Some(&Scalar::UInt32(42)));

        let array = d
            .decode_object_str("<VALUE.ARRAY><VALUE>hello</VALUE><VALUE.NULL/></VALUE.ARRAY>")
            .unwrap();
        let array = array.as_value().unwrap();
        assert_eq!(array.data_type, DataType::array(TypeKind::String));
        assert_eq!(
            array.value.as_array().unwrap(),
            &[Some(Scalar::String("hello".into())), None]
        );
    }

    #[test]
    fn null_value_type_ignores_text() {
        let d = decoder();
        let value = d.decode_object_str(r#"<VALUE TYPE="null">not a number</VALUE>"#).unwrap();
        assert!(value.as_value().unwrap().is_null());

        let array = d
            .decode_object_str(
                r#"<VALUE.ARRAY><VALUE TYPE="NULL">junk</VALUE><VALUE TYPE="sint16">-4</VALUE></VALUE.ARRAY>"#,
            )
            .unwrap();
        let array = array.as_value().unwrap();
        assert_eq!(array.data_type, DataType::array(TypeKind::SInt16));
        assert_eq!(array.value.as_array().unwrap(), &[None, Some(Scalar::SInt16(-4))]);

        let prop = d
            .decode_property(&element(
                r#"<PROPERTY NAME="Count" TYPE="uint32"><VALUE TYPE="null">abc</VALUE></PROPERTY>"#,
            ))
            .unwrap();
        assert_eq!(prop.data_type(), &DataType::scalar(TypeKind::UInt32));
        assert!(prop.value.is_null());

        let param = element(r#"<IPARAMVALUE NAME="x"><VALUE TYPE="null">1.5</VALUE></IPARAMVALUE>"#);
        let value = d
            .decode_value_or_array(Tag::IParamValue, &param, None, false, &[ValueShape::Value])
            .unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn key_values_and_instance_names() {
        let d = decoder();
        let seven = d
            .decode_key_value(&element(r#"<KEYVALUE VALUETYPE="numeric">7</KEYVALUE>"#))
            .unwrap();
        assert_eq!(seven.data_type.kind(), TypeKind::SInt64);
        assert_eq!(seven.as_scalar(), Some(&Scalar::SInt64(7)));

        let typed = d
            .decode_key_value(&element(r#"<KEYVALUE VALUETYPE="numeric" TYPE="uint16">7</KEYVALUE>"#))
            .unwrap();
        assert_eq!(typed.as_scalar(), Some(&Scalar::UInt16(7)));
        assert!(d
            .decode_key_value(&element(r#"<KEYVALUE VALUETYPE="blob">7</KEYVALUE>"#))
            .is_err());

        let bare = d.decode_instance_name(&element(r#"<INSTANCENAME CLASSNAME="Foo"/>"#)).unwrap();
        assert_eq!(bare.object_name(), "Foo");
        assert!(bare.keys.is_empty());

        let keyed = d
            .decode_instance_name(&element(
                r#"<INSTANCENAME CLASSNAME="CIM_Port">
                     <KEYBINDING NAME="Id"><KEYVALUE>p0</KEYVALUE></KEYBINDING>
                     <KEYBINDING NAME="System">
                       <VALUE.REFERENCE><INSTANCENAME CLASSNAME="CIM_System">
                         <KEYBINDING NAME="Name"><KEYVALUE>srv</KEYVALUE></KEYBINDING>
                       </INSTANCENAME></VALUE.REFERENCE>
                     </KEYBINDING>
                   </INSTANCENAME>"#,
            ))
            .unwrap();
        assert_eq!(keyed.key("Id").and_then(TypedValue::as_str), Some("p0"));
        let system = keyed.key("System").and_then(TypedValue::as_scalar).and_then(Scalar::as_path).unwrap();
        assert_eq!(system.namespace.as_deref(), Some("root/cimv2"));
        assert_eq!(system.key("Name").and_then(TypedValue::as_str), Some("srv"));
    }

    #[test]
    fn paths_with_and_without_context() {
        let d = decoder();
        let path = d
            .decode_any_path(&element(
                r#"<INSTANCEPATH>
                     <NAMESPACEPATH><HOST>other.example:5989</HOST>
                       <LOCALNAMESPACEPATH><NAMESPACE NAME="root"/><NAMESPACE NAME="interop"/></LOCALNAMESPACEPATH>
                     </NAMESPACEPATH>
                     <INSTANCENAME CLASSNAME="CIM_Namespace">
                       <KEYBINDING NAME="Name"><KEYVALUE>root/interop</KEYVALUE></KEYBINDING>
                     </INSTANCENAME>
                   </INSTANCEPATH>"#,
            ))
            .unwrap();
        assert_eq!(path.host.as_deref(), Some("other.example"));
        assert_eq!(path.port, Some(5989));
        assert_eq!(path.scheme, None);
        assert_eq!(path.namespace.as_deref(), Some("root/interop"));
        assert!(path.is_instance());

        let local = d
            .decode_any_path(&element(
                r#"<LOCALCLASSPATH>
                     <LOCALNAMESPACEPATH><NAMESPACE NAME="root/test"/></LOCALNAMESPACEPATH>
                     <CLASSNAME NAME="CIM_Foo"/>
                   </LOCALCLASSPATH>"#,
            ))
            .unwrap();
        assert_eq!(local.to_string(), "http://cimom:5988/root/test:CIM_Foo");

        let err = d
            .decode_any_path(&element("<LOCALNAMESPACEPATH/>"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Invalid { .. }));
        let err = d
            .decode_local_namespace_path(&element("<LOCALNAMESPACEPATH/>"))
            .unwrap_err();
        assert_eq!(err.to_string(), "LOCALNAMESPACEPATH: missing child element NAMESPACE");
    }

    #[test]
    fn missing_mandatory_parts_name_the_production() {
        let d = decoder();
        let err = d.decode_class(&element("<CLASS/>")).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MissingAttribute { production: "CLASS", attribute: "NAME" }
        ));
        let err = d
            .decode_qualifier(&element(r#"<QUALIFIER NAME="Key"><VALUE>true</VALUE></QUALIFIER>"#))
            .unwrap_err();
        assert!(matches!(err, DecodeError::MissingAttribute { attribute: "TYPE", .. }));
        let err = d
            .decode_property(&element(r#"<PROPERTY NAME="X" TYPE="uint9"/>"#))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Value { production: "PROPERTY", .. }));
        let err = d
            .decode_object(&element(r#"<VALUE.OBJECTWITHPATH><CLASS NAME="A"/></VALUE.OBJECTWITHPATH>"#))
            .unwrap_err();
        assert!(matches!(err, DecodeError::MissingElement { .. }));
    }

    #[test]
    fn declared_array_size_must_match() {
        let d = decoder();
        let prop = d
            .decode_property(&element(
                r#"<PROPERTY.ARRAY NAME="Pair" TYPE="uint8" ARRAYSIZE="2">
                     <VALUE.ARRAY><VALUE>1</VALUE><VALUE>2</VALUE></VALUE.ARRAY>
                   </PROPERTY.ARRAY>"#,
            ))
            .unwrap();
        assert_eq!(prop.data_type().to_string(), "uint8[2]");
        let err = d
            .decode_property(&element(
                r#"<PROPERTY.ARRAY NAME="Pair" TYPE="uint8" ARRAYSIZE="2">
                     <VALUE.ARRAY><VALUE>1</VALUE></VALUE.ARRAY>
                   </PROPERTY.ARRAY>"#,
            ))
            .unwrap_err();
        assert!(err.to_string().contains("declares 2 elements but carries 1"));
    }

    #[test]
    fn qualifier_declaration_scope_and_size() {
        let decl = decoder()
            .decode_qualifier_declaration(&element(
                r#"<QUALIFIER.DECLARATION NAME="ValueMap" TYPE="string" ISARRAY="true" ARRAYSIZE="2" TOSUBCLASS="false">
                     <SCOPE PROPERTY="true" METHOD="true" PARAMETER="true"/>
                     <VALUE.ARRAY><VALUE>a</VALUE><VALUE>b</VALUE></VALUE.ARRAY>
                   </QUALIFIER.DECLARATION>"#,
            ))
            .unwrap();
        assert_eq!(decl.name(), "ValueMap");
        assert_eq!(decl.data_type.to_string(), "string[2]");
        assert_eq!(decl.scope, Scope::PROPERTY | Scope::METHOD | Scope::PARAMETER);
        assert_eq!(decl.flavor, Flavor::RESTRICTED);
        assert_eq!(decl.default.as_array().map(<[_]>::len), Some(2));

        let bare = decoder()
            .decode_qualifier_declaration(&element(
                r#"<QUALIFIER.DECLARATION NAME="Key" TYPE="boolean"/>"#,
            ))
            .unwrap();
        assert!(bare.default.is_null());
        assert_eq!(bare.data_type, DataType::scalar(TypeKind::Boolean));
        assert!(bare.scope.is_empty());
    }

    #[test]
    fn value_or_array_fallbacks() {
        let d = decoder();
        let empty = element("<PARAMVALUE NAME=\"x\"/>");
        let scalar = d
            .decode_value_or_array(Tag::ParamValue, &empty, None, false, &[ValueShape::Value])
            .unwrap();
        assert_eq!(scalar.data_type, DataType::string());
        assert!(scalar.is_null());
        let array = d
            .decode_value_or_array(Tag::ParamValue, &empty, None, true, &[ValueShape::Array])
            .unwrap();
        assert_eq!(array.data_type, DataType::array(TypeKind::String));

        let refs = element(
            r#"<X><VALUE.REFARRAY>
                 <VALUE.REFERENCE><CLASSNAME NAME="A"/></VALUE.REFERENCE>
                 <VALUE.NULL/>
               </VALUE.REFARRAY></X>"#,
        );
        let value = d
            .decode_value_or_array(
                Tag::ParamValue,
                &refs,
                None,
                false,
                &[ValueShape::Value, ValueShape::Reference, ValueShape::Array, ValueShape::RefArray],
            )
            .unwrap();
        assert_eq!(value.data_type, DataType::reference_array(None));
        let items = value.value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().and_then(Scalar::as_path).map(ObjectPath::object_name), Some("A"));
    }

    #[test]
    fn object_wrappers_carry_paths() {
        let d = decoder();
        let object = d
            .decode_object_str(
                r#"<VALUE.NAMEDINSTANCE>
                     <INSTANCENAME CLASSNAME="CIM_Foo"><KEYBINDING NAME="Id"><KEYVALUE VALUETYPE="numeric">3</KEYVALUE></KEYBINDING></INSTANCENAME>
                     <INSTANCE CLASSNAME="CIM_Foo"><PROPERTY NAME="Id" TYPE="uint32"><VALUE>3</VALUE></PROPERTY></INSTANCE>
                   </VALUE.NAMEDINSTANCE>"#,
            )
            .unwrap();
        let instance = object.as_instance().unwrap();
        assert_eq!(instance.path.to_string(), "http://cimom:5988/root/cimv2:CIM_Foo.Id=3");
        assert_eq!(instance.property("id").unwrap().value.as_scalar(), Some(&Scalar::UInt32(3)));

        let class = d
            .decode_object_str(
                r#"<VALUE.OBJECTWITHLOCALPATH>
                     <LOCALCLASSPATH><LOCALNAMESPACEPATH><NAMESPACE NAME="root/x"/></LOCALNAMESPACEPATH><CLASSNAME NAME="CIM_Bar"/></LOCALCLASSPATH>
                     <CLASS NAME="CIM_Bar"/>
                   </VALUE.OBJECTWITHLOCALPATH>"#,
            )
            .unwrap();
        assert_eq!(class.path().and_then(ObjectPath::namespace_name), Some("root/x"));

        let err = d.decode_object_str(r#"<PROPERTY NAME="x"/>"#).unwrap_err();
        assert_eq!(err.to_string(), "PROPERTY: element does not denote an object");
    }
}
