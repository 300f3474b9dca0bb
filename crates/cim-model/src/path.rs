//! Object paths and their WBEM URI text form.

use std::fmt;
use std::str::FromStr;

use crate::coerce::{coerce_legacy, ValueTypeHint};
use crate::value::{Scalar, TypedValue};
use crate::ValueError;

/// Named key property value inside an instance path.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBinding {
    pub name: String,
    pub value: TypedValue,
}

impl KeyBinding {
    pub fn new(name: impl Into<String>, value: TypedValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Identity of a namespace, class, or instance.
///
/// A path with key bindings names an instance; without keys it names a
/// class. Context fields (`scheme`, `host`, `port`, `namespace`) are absent
/// for local paths until a resolver fills them in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectPath {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub namespace: Option<String>,
    pub object_name: String,
    pub keys: Vec<KeyBinding>,
}

impl ObjectPath {
    /// Class path without any context.
    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            ..Self::default()
        }
    }

    /// Path naming only a namespace.
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_key(mut self, name: impl Into<String>, value: TypedValue) -> Self {
        self.keys.push(KeyBinding::new(name, value));
        self
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn namespace_name(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_instance(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn is_class(&self) -> bool {
        !self.object_name.is_empty() && self.keys.is_empty()
    }

    /// Look up a key binding by case-insensitive name.
    pub fn key(&self, name: &str) -> Option<&TypedValue> {
        self.keys
            .iter()
            .find(|k| k.name.eq_ignore_ascii_case(name))
            .map(|k| &k.value)
    }

    /// The same path with the key bindings removed.
    pub fn class_path(&self) -> Self {
        Self {
            keys: Vec::new(),
            ..self.clone()
        }
    }

    /// Parse a serialized path such as
    /// `http://host:5988/root/cimv2:CIM_System.Name="srv"`.
    pub fn parse(text: &str) -> Result<Self, ValueError> {
        let text = text.trim();
        let mut path = ObjectPath::default();
        let mut rest = text;

        if let Some(idx) = rest.find("//") {
            let prefix = &rest[..idx];
            let scheme = prefix.strip_suffix(':');
            if idx == 0 || scheme.is_some_and(|s| s.chars().all(|c| c.is_ascii_alphanumeric())) {
                path.scheme = scheme.filter(|s| !s.is_empty()).map(str::to_string);
                let authority_and_rest = &rest[idx + 2..];
                let end = authority_and_rest.find('/').unwrap_or(authority_and_rest.len());
                parse_authority(text, &authority_and_rest[..end], &mut path)?;
                rest = authority_and_rest[end..].trim_start_matches('/');
            }
        }

        let stop = rest
            .find(|c: char| matches!(c, '.' | '"' | '='))
            .unwrap_or(rest.len());
        if let Some(colon) = rest[..stop].rfind(':') {
            let namespace = &rest[..colon];
            if !namespace.is_empty() {
                path.namespace = Some(namespace.to_string());
            }
            rest = &rest[colon + 1..];
        } else if stop == rest.len() && path.host.is_some() {
            // `//host/root/cimv2` names a namespace only.
            if !rest.is_empty() {
                path.namespace = Some(rest.to_string());
            }
            return Ok(path);
        }

        let (name, keys) = match rest.split_once('.') {
            Some((name, keys)) => (name, Some(keys)),
            None => (rest, None),
        };
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(ValueError::path(text, format!("invalid class name {name:?}")));
        }
        path.object_name = name.to_string();
        if let Some(keys) = keys {
            path.keys = parse_keys(text, keys)?;
        }
        Ok(path)
    }
}

fn parse_authority(text: &str, authority: &str, path: &mut ObjectPath) -> Result<(), ValueError> {
    if authority.is_empty() {
        return Ok(());
    }
    let (host, port) = if let Some(stripped) = authority.strip_prefix('[') {
        let close = stripped
            .find(']')
            .ok_or_else(|| ValueError::path(text, "unterminated IPv6 host"))?;
        let port = stripped[close + 1..].strip_prefix(':');
        (&authority[..close + 2], port)
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };
    path.host = Some(host.to_string());
    if let Some(port) = port {
        let port = port
            .parse()
            .map_err(|err| ValueError::path(text, format!("invalid port {port:?}: {err}")))?;
        path.port = Some(port);
    }
    Ok(())
}

fn parse_keys(text: &str, mut input: &str) -> Result<Vec<KeyBinding>, ValueError> {
    let mut keys = Vec::new();
    while !input.is_empty() {
        let (name, after) = input
            .split_once('=')
            .ok_or_else(|| ValueError::path(text, "key binding without '='"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValueError::path(text, "key binding without a name"));
        }
        let (value, remaining) = if let Some(quoted) = after.strip_prefix('"') {
            let (unescaped, consumed) = unquote(quoted)
                .ok_or_else(|| ValueError::path(text, format!("unterminated value for {name}")))?;
            (TypedValue::string(unescaped), &quoted[consumed..])
        } else {
            let end = after.find(',').unwrap_or(after.len());
            let raw = after[..end].trim();
            let value = if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") {
                coerce_legacy(ValueTypeHint::Boolean, Some(raw))
            } else {
                coerce_legacy(ValueTypeHint::Numeric, Some(raw))
            }
            .map_err(|err| ValueError::path(text, err.to_string()))?;
            (value, &after[end..])
        };
        keys.push(KeyBinding::new(name, value));
        input = remaining.trim_start();
        if let Some(next) = input.strip_prefix(',') {
            input = next;
        } else if !input.is_empty() {
            return Err(ValueError::path(text, format!("unexpected {input:?} after key {name}")));
        }
    }
    Ok(keys)
}

/// Read a quoted string body; returns the unescaped value and the number of
/// bytes consumed including the closing quote.
fn unquote(input: &str) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut chars = input.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => {
                let (_, escaped) = chars.next()?;
                out.push(escaped);
            }
            '"' => return Some((out, idx + 1)),
            other => out.push(other),
        }
    }
    None
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in value.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("\"")
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            if let Some(scheme) = &self.scheme {
                write!(f, "{scheme}:")?;
            }
            write!(f, "//{host}")?;
            if let Some(port) = self.port {
                write!(f, ":{port}")?;
            }
            f.write_str("/")?;
        }
        if let Some(namespace) = &self.namespace {
            f.write_str(namespace)?;
            if !self.object_name.is_empty() {
                f.write_str(":")?;
            }
        }
        f.write_str(&self.object_name)?;
        for (idx, key) in self.keys.iter().enumerate() {
            f.write_str(if idx == 0 { "." } else { "," })?;
            write!(f, "{}=", key.name)?;
            match key.value.as_scalar() {
                Some(Scalar::Boolean(b)) => f.write_str(if *b { "TRUE" } else { "FALSE" })?,
                Some(scalar) if scalar.as_integer().is_some() => write!(f, "{scalar}")?,
                Some(scalar @ (Scalar::Real32(_) | Scalar::Real64(_))) => write!(f, "{scalar}")?,
                Some(scalar) => write_quoted(f, &scalar.to_string())?,
                None => f.write_str("\"\"")?,
            }
        }
        Ok(())
    }
}

impl FromStr for ObjectPath {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectPath::parse(s)
    }
}
