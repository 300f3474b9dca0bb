//! Conversion of raw value text into typed CIM values.

use tracing::trace;

use crate::datatype::{DataType, TypeKind};
use crate::datetime::CimDateTime;
use crate::path::ObjectPath;
use crate::value::{CimValue, Scalar, TypedValue};
use crate::ValueError;

/// Coarse `VALUETYPE` hint used by `KEYVALUE` when no `TYPE` is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTypeHint {
    String,
    Boolean,
    Numeric,
}

impl ValueTypeHint {
    /// Interpret a `VALUETYPE` attribute value (case-insensitive).
    pub fn from_attr(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "string" => Some(ValueTypeHint::String),
            "boolean" => Some(ValueTypeHint::Boolean),
            "numeric" => Some(ValueTypeHint::Numeric),
            _ => None,
        }
    }
}

/// Convert text into a scalar of the given kind.
pub fn coerce(kind: TypeKind, text: &str) -> Result<Scalar, ValueError> {
    let scalar = match kind {
        TypeKind::UInt8 => narrow(kind, text, |v| u8::try_from(v).ok().map(Scalar::UInt8))?,
        TypeKind::SInt8 => narrow(kind, text, |v| i8::try_from(v).ok().map(Scalar::SInt8))?,
        TypeKind::UInt16 => narrow(kind, text, |v| u16::try_from(v).ok().map(Scalar::UInt16))?,
        TypeKind::SInt16 => narrow(kind, text, |v| i16::try_from(v).ok().map(Scalar::SInt16))?,
        TypeKind::UInt32 => narrow(kind, text, |v| u32::try_from(v).ok().map(Scalar::UInt32))?,
        TypeKind::SInt32 => narrow(kind, text, |v| i32::try_from(v).ok().map(Scalar::SInt32))?,
        TypeKind::UInt64 => narrow(kind, text, |v| u64::try_from(v).ok().map(Scalar::UInt64))?,
        TypeKind::SInt64 => narrow(kind, text, |v| i64::try_from(v).ok().map(Scalar::SInt64))?,
        TypeKind::Real32 => Scalar::Real32(
            text.trim()
                .parse()
                .map_err(|err| ValueError::parse(kind.name(), text, format!("{err}")))?,
        ),
        TypeKind::Real64 => Scalar::Real64(
            text.trim()
                .parse()
                .map_err(|err| ValueError::parse(kind.name(), text, format!("{err}")))?,
        ),
        TypeKind::Boolean => Scalar::Boolean(parse_bool(text)?),
        TypeKind::String => Scalar::String(text.to_string()),
        TypeKind::Char16 => Scalar::Char16(
            text.chars()
                .next()
                .ok_or_else(|| ValueError::parse(kind.name(), text, "empty text"))?,
        ),
        TypeKind::DateTime => Scalar::DateTime(CimDateTime::parse(text)?),
        TypeKind::Reference => Scalar::Reference(ObjectPath::parse(text)?),
        TypeKind::Class | TypeKind::Object | TypeKind::Invalid => {
            return Err(ValueError::parse(
                kind.name(),
                text,
                "kind has no text representation",
            ))
        }
    };
    Ok(scalar)
}

/// Convert optional value text into a typed value of the given type.
///
/// Absent text yields an empty string for string types and null otherwise.
pub fn coerce_value(data_type: &DataType, text: Option<&str>) -> Result<TypedValue, ValueError> {
    let value = match text {
        Some(text) => CimValue::Scalar(coerce(data_type.kind(), text)?),
        None if data_type.kind() == TypeKind::String => {
            CimValue::Scalar(Scalar::String(String::new()))
        }
        None => CimValue::Null,
    };
    Ok(TypedValue::new(data_type.element(), value))
}

/// Coerce text against a named type; the name `null` always yields null.
pub fn coerce_typed(type_name: &str, text: Option<&str>) -> Result<TypedValue, ValueError> {
    if type_name.trim().eq_ignore_ascii_case("null") {
        return Ok(TypedValue::null(DataType::string()));
    }
    let data_type = DataType::from_name(Some(type_name), false)?;
    coerce_value(&data_type, text)
}

/// Legacy `VALUETYPE` dialect: infer the concrete type by probing.
///
/// Numeric text is tried as signed 64-bit, then unsigned 64-bit, then
/// real64. String text is tried against the datetime grammars first.
pub fn coerce_legacy(hint: ValueTypeHint, text: Option<&str>) -> Result<TypedValue, ValueError> {
    let raw = text.unwrap_or("");
    match hint {
        ValueTypeHint::String => match CimDateTime::parse(raw) {
            Ok(dt) => {
                trace!(value = raw, "legacy string value decoded as datetime");
                Ok(TypedValue::scalar(Scalar::DateTime(dt)))
            }
            Err(_) => Ok(TypedValue::string(raw)),
        },
        ValueTypeHint::Boolean => Ok(TypedValue::scalar(Scalar::Boolean(parse_bool(raw)?))),
        ValueTypeHint::Numeric => [TypeKind::SInt64, TypeKind::UInt64, TypeKind::Real64]
            .into_iter()
            .find_map(|kind| coerce(kind, raw).ok())
            .map(TypedValue::scalar)
            .ok_or_else(|| {
                ValueError::parse("numeric", raw, "not a signed, unsigned, or real number")
            }),
    }
}

fn parse_bool(text: &str) -> Result<bool, ValueError> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ValueError::parse("boolean", text, "expected TRUE or FALSE"))
    }
}

/// Parse a decimal or `0x` hexadecimal integer with optional sign.
fn parse_integer(kind: TypeKind, text: &str) -> Result<i128, ValueError> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    if digits.starts_with(|c: char| c == '+' || c == '-') {
        return Err(ValueError::parse(kind.name(), text, "repeated sign"));
    }
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) if hex.starts_with(|c: char| c.is_ascii_hexdigit()) => {
            u128::from_str_radix(hex, 16)
        }
        Some(_) => return Err(ValueError::parse(kind.name(), text, "expected hex digits after 0x")),
        None => digits.parse::<u128>(),
    }
    .map_err(|err| ValueError::parse(kind.name(), text, format!("{err}")))?;
    let magnitude = i128::try_from(magnitude)
        .map_err(|_| ValueError::parse(kind.name(), text, "out of range"))?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn narrow(
    kind: TypeKind,
    text: &str,
    convert: impl FnOnce(i128) -> Option<Scalar>,
) -> Result<Scalar, ValueError> {
    let value = parse_integer(kind, text)?;
    convert(value).ok_or_else(|| {
        ValueError::parse(kind.name(), text, format!("{value} out of range for {kind}"))
    })
}
