//! Embedded classes and instances carried as escaped XML in string values.

use cim_model::{find_qualifier, CimQualifier, CimValue, DataType, Scalar, TypeKind, TypedValue};
use tracing::{debug, trace};

use crate::element::{Element, XmlNode};
use crate::error::DecodeError;
use crate::object::{check_array_size, CimObject, Decoder};
use crate::tag::Tag;

/// What an embedded slot is declared to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedKind {
    /// A class or an instance.
    Object,
    /// An instance only.
    Instance,
}

impl EmbeddedKind {
    /// `EmbeddedObject` attribute value, case-insensitive.
    pub fn from_attr(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("object") {
            Some(EmbeddedKind::Object)
        } else if value.eq_ignore_ascii_case("instance") {
            Some(EmbeddedKind::Instance)
        } else {
            None
        }
    }
}

/// Embedding declared by the element's `EmbeddedObject` attribute or by its
/// `EmbeddedObject`/`EmbeddedInstance` qualifiers.
///
/// An instance declaration from either source wins over an object one.
pub(crate) fn embedded_kind<N: XmlNode>(
    node: &N,
    production: Tag,
    qualifiers: &[CimQualifier],
) -> Result<Option<EmbeddedKind>, DecodeError> {
    let from_attr = match node
        .attribute("EmbeddedObject")
        .or_else(|| node.attribute("EMBEDDEDOBJECT"))
    {
        None => None,
        Some(raw) => Some(EmbeddedKind::from_attr(raw).ok_or_else(|| {
            DecodeError::Embedded(format!("{production}: unknown EmbeddedObject value {raw:?}"))
        })?),
    };
    let from_qualifier = if find_qualifier(qualifiers, "EmbeddedInstance")
        .is_some_and(|q| !q.value.is_null())
    {
        Some(EmbeddedKind::Instance)
    } else if find_qualifier(qualifiers, "EmbeddedObject").is_some_and(CimQualifier::is_true) {
        Some(EmbeddedKind::Object)
    } else {
        None
    };
    let kind = match (from_attr, from_qualifier) {
        (Some(EmbeddedKind::Instance), _) | (_, Some(EmbeddedKind::Instance)) => {
            Some(EmbeddedKind::Instance)
        }
        (attr, qualifier) => attr.or(qualifier),
    };
    if kind.is_some() && find_qualifier(qualifiers, "Key").is_some_and(CimQualifier::is_true) {
        debug!(element = node.name(), name = node.attribute("NAME"), "embedded slot is a key");
    }
    Ok(kind)
}

fn require_string(production: Tag, raw: &DataType) -> Result<(), DecodeError> {
    if raw.kind() == TypeKind::String {
        Ok(())
    } else {
        Err(DecodeError::Embedded(format!(
            "{production}: embedded payload declared as {raw}, must be string"
        )))
    }
}

fn payload_text<N: XmlNode>(node: &N) -> Option<&str> {
    node.text().map(str::trim).filter(|text| !text.is_empty())
}

impl Decoder {
    /// Type of an embedded slot whose payload is absent.
    ///
    /// Instances are always object typed. Objects are class typed in strict
    /// mode and stay string typed otherwise.
    pub(crate) fn embedded_slot_type(
        &self,
        production: Tag,
        kind: EmbeddedKind,
        raw: &DataType,
    ) -> Result<DataType, DecodeError> {
        require_string(production, raw)?;
        let kind = match (kind, self.config.strict_embedded_typing) {
            (EmbeddedKind::Instance, _) => TypeKind::Object,
            (EmbeddedKind::Object, true) => TypeKind::Class,
            (EmbeddedKind::Object, false) => TypeKind::String,
        };
        Ok(raw.with_kind(kind))
    }

    pub(crate) fn decode_embedded_scalar<N: XmlNode>(
        &self,
        production: Tag,
        kind: EmbeddedKind,
        raw: &DataType,
        value: Option<&N>,
    ) -> Result<TypedValue, DecodeError> {
        require_string(production, raw)?;
        match value.and_then(payload_text) {
            None => Ok(TypedValue::null(self.embedded_slot_type(production, kind, raw)?)),
            Some(text) => {
                let scalar = self.decode_embedded_payload(production, kind, text)?;
                Ok(TypedValue::new(
                    raw.with_kind(scalar.kind()),
                    CimValue::Scalar(scalar),
                ))
            }
        }
    }

    /// Embedded `VALUE.ARRAY`; all payloads must be of the same kind.
    pub(crate) fn decode_embedded_array<N: XmlNode>(
        &self,
        production: Tag,
        kind: EmbeddedKind,
        raw: &DataType,
        array: Option<&N>,
    ) -> Result<TypedValue, DecodeError> {
        require_string(production, raw)?;
        let Some(array) = array else {
            return Ok(TypedValue::null(self.embedded_slot_type(production, kind, raw)?));
        };
        let mut items = Vec::new();
        let mut found: Option<TypeKind> = None;
        for child in array.children() {
            match child.tag() {
                Some(Tag::Value) => match payload_text(child) {
                    Some(text) => {
                        let scalar = self.decode_embedded_payload(production, kind, text)?;
                        match found {
                            Some(seen) if seen != scalar.kind() => {
                                return Err(DecodeError::Embedded(format!(
                                    "{production}: array mixes embedded classes and instances"
                                )))
                            }
                            _ => found = Some(scalar.kind()),
                        }
                        items.push(Some(scalar));
                    }
                    None => items.push(None),
                },
                Some(Tag::ValueNull) => items.push(None),
                _ => {}
            }
        }
        let data_type = match found {
            Some(element) => raw.with_kind(element),
            None => self.embedded_slot_type(production, kind, raw)?,
        };
        check_array_size(production, &data_type, items.len())?;
        Ok(TypedValue::new(data_type, CimValue::Array(items)))
    }

    /// Parse unescaped payload text and decode it as a class or instance.
    fn decode_embedded_payload(
        &self,
        production: Tag,
        kind: EmbeddedKind,
        text: &str,
    ) -> Result<Scalar, DecodeError> {
        let document = Element::parse(text).map_err(|err| {
            DecodeError::Embedded(format!("{production}: payload is not well-formed: {err}"))
        })?;
        trace!(%production, root = document.name(), "decoding embedded payload");
        match self.decode_object(&document)? {
            CimObject::Class(class) if kind == EmbeddedKind::Instance => {
                Err(DecodeError::Embedded(format!(
                    "{production}: embedded instance slot carries class {}",
                    class.name()
                )))
            }
            CimObject::Class(class) => Ok(Scalar::Class(Box::new(class))),
            CimObject::Instance(instance) => Ok(Scalar::Instance(Box::new(instance))),
            _ => Err(DecodeError::Embedded(format!(
                "{production}: payload {} is neither a class nor an instance",
                document.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoderConfig;
    use crate::resolver::PathResolver;

    fn decoder(strict: bool) -> Decoder {
        Decoder::new(
            DecoderConfig {
                strict_embedded_typing: strict,
                ..DecoderConfig::default()
            },
            PathResolver::default(),
        )
    }

    fn element(xml: &str) -> Element {
        Element::parse(xml).expect("fixture parses")
    }

    const INSTANCE_PAYLOAD: &str = "&lt;INSTANCE CLASSNAME=\"CIM_Inner\"&gt;&lt;PROPERTY NAME=\"A\" TYPE=\"uint8\"&gt;&lt;VALUE&gt;3&lt;/VALUE&gt;&lt;/PROPERTY&gt;&lt;/INSTANCE&gt;";
    const CLASS_PAYLOAD: &str = "&lt;CLASS NAME=\"CIM_Inner\"/&gt;";

    #[test]
    fn value_less_object_slot_depends_on_mode() {
        let xml = r#"<PROPERTY NAME="Payload" TYPE="string" EmbeddedObject="object"/>"#;
        let strict = decoder(true).decode_property(&element(xml)).unwrap();
        assert_eq!(strict.data_type().kind(), TypeKind::Class);
        let lenient = decoder(false).decode_property(&element(xml)).unwrap();
        assert_eq!(lenient.data_type().kind(), TypeKind::String);

        let legacy = r#"<PROPERTY NAME="Payload" TYPE="string" EMBEDDEDOBJECT="INSTANCE"/>"#;
        for strict in [true, false] {
            let prop = decoder(strict).decode_property(&element(legacy)).unwrap();
            assert_eq!(prop.data_type().kind(), TypeKind::Object);
            assert!(prop.value.is_null());
        }
    }

    #[test]
    fn payload_is_decoded_recursively() {
        let xml = format!(
            r#"<PROPERTY NAME="Payload" TYPE="string"><QUALIFIER NAME="EmbeddedInstance" TYPE="string"><VALUE>CIM_Inner</VALUE></QUALIFIER><VALUE>{INSTANCE_PAYLOAD}</VALUE></PROPERTY>"#
        );
        let prop = decoder(false).decode_property(&element(&xml)).unwrap();
        assert_eq!(prop.data_type().kind(), TypeKind::Object);
        let Some(Scalar::Instance(inner)) = prop.value.as_scalar() else {
            panic!("expected embedded instance, got {:?}", prop.value);
        };
        assert_eq!(inner.class_name(), "CIM_Inner");
        assert_eq!(inner.property("A").unwrap().value.as_scalar(), Some(&Scalar::UInt8(3)));
    }

    #[test]
    fn homogeneous_arrays_only() {
        let homogeneous = format!(
            r#"<PROPERTY.ARRAY NAME="Items" TYPE="string" EmbeddedObject="object"><VALUE.ARRAY><VALUE>{INSTANCE_PAYLOAD}</VALUE><VALUE.NULL/><VALUE>{INSTANCE_PAYLOAD}</VALUE></VALUE.ARRAY></PROPERTY.ARRAY>"#
        );
        let prop = decoder(false).decode_property(&element(&homogeneous)).unwrap();
        assert_eq!(prop.data_type(), &DataType::array(TypeKind::Object));
        assert_eq!(prop.value.value.as_array().map(<[_]>::len), Some(3));

        let mixed = format!(
            r#"<PROPERTY.ARRAY NAME="Items" TYPE="string" EmbeddedObject="object"><VALUE.ARRAY><VALUE>{INSTANCE_PAYLOAD}</VALUE><VALUE>{CLASS_PAYLOAD}</VALUE></VALUE.ARRAY></PROPERTY.ARRAY>"#
        );
        let err = decoder(true).decode_property(&element(&mixed)).unwrap_err();
        assert!(matches!(err, DecodeError::Embedded(_)), "{err}");
    }

    #[test]
    fn inconsistent_declarations_are_rejected() {
        let wrong_type = r#"<PROPERTY NAME="P" TYPE="uint8" EmbeddedObject="object"/>"#;
        assert!(matches!(
            decoder(true).decode_property(&element(wrong_type)),
            Err(DecodeError::Embedded(_))
        ));
        let unknown = r#"<PROPERTY NAME="P" TYPE="string" EmbeddedObject="thing"/>"#;
        assert!(decoder(true).decode_property(&element(unknown)).is_err());
        let class_in_instance_slot = format!(
            r#"<PROPERTY NAME="P" TYPE="string" EmbeddedObject="instance"><VALUE>{CLASS_PAYLOAD}</VALUE></PROPERTY>"#
        );
        assert!(decoder(true).decode_property(&element(&class_in_instance_slot)).is_err());
        let garbage = r#"<PROPERTY NAME="P" TYPE="string" EmbeddedObject="object"><VALUE>&lt;CLASS</VALUE></PROPERTY>"#;
        assert!(decoder(true).decode_property(&element(garbage)).is_err());
    }

    #[test]
    fn method_and_parameter_slots() {
        let xml = r#"<METHOD NAME="Get" TYPE="string">
            <QUALIFIER NAME="EmbeddedObject" TYPE="boolean"><VALUE>true</VALUE></QUALIFIER>
            <PARAMETER NAME="Filter" TYPE="string">
              <QUALIFIER NAME="EmbeddedInstance" TYPE="string"><VALUE>CIM_Filter</VALUE></QUALIFIER>
            </PARAMETER>
          </METHOD>"#;
        let method = decoder(true).decode_method(&element(xml)).unwrap();
        assert_eq!(method.return_type.kind(), TypeKind::Class);
        assert_eq!(method.parameters[0].data_type.kind(), TypeKind::Object);
    }
}
