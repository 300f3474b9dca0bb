use cim_model::{CimInstance, ValueError};
use thiserror::Error;

/// Errors raised while decoding a CIM-XML document or stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The tokenizer rejected the byte stream.
    #[error("xml: {0}")]
    Xml(String),
    /// A mandatory child element is absent.
    #[error("{production}: missing child element {child}")]
    MissingElement {
        production: &'static str,
        child: &'static str,
    },
    /// A mandatory attribute is absent.
    #[error("{production}: missing attribute {attribute}")]
    MissingAttribute {
        production: &'static str,
        attribute: &'static str,
    },
    /// An element is present but its content violates the grammar.
    #[error("{production}: {detail}")]
    Invalid {
        production: &'static str,
        detail: String,
    },
    /// Value text or a type name could not be interpreted.
    #[error("{production}: {source}")]
    Value {
        production: &'static str,
        source: ValueError,
    },
    /// Embedded object typing is inconsistent.
    #[error("embedded object: {0}")]
    Embedded(String),
    /// The envelope announces an unsupported protocol or DTD version.
    #[error("unsupported version: {0}")]
    Version(String),
    /// The server answered with an `ERROR` element where items were expected.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The token stream ended or nested inconsistently.
    #[error("stream: {0}")]
    Stream(String),
    /// The enumeration was closed before the operation.
    #[error("enumeration closed")]
    Closed,
}

impl DecodeError {
    pub(crate) fn invalid(production: &'static str, detail: impl Into<String>) -> Self {
        DecodeError::Invalid {
            production,
            detail: detail.into(),
        }
    }

    pub(crate) fn value(production: &'static str) -> impl FnOnce(ValueError) -> Self {
        move |source| DecodeError::Value { production, source }
    }
}

/// CIM status codes (DSP0200).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Failed,
    AccessDenied,
    InvalidNamespace,
    InvalidParameter,
    InvalidClass,
    NotFound,
    NotSupported,
    ClassHasChildren,
    ClassHasInstances,
    InvalidSuperclass,
    AlreadyExists,
    NoSuchProperty,
    TypeMismatch,
    QueryLanguageNotSupported,
    InvalidQuery,
    MethodNotAvailable,
    MethodNotFound,
    NamespaceNotEmpty,
    InvalidEnumerationContext,
    InvalidOperationTimeout,
    PullHasBeenAbandoned,
    PullCannotBeAbandoned,
    FilteredEnumerationNotSupported,
    ContinuationOnErrorNotSupported,
    ServerLimitsExceeded,
    ServerIsShuttingDown,
    /// A status code not known to this implementation.
    Unknown(u32),
}

impl StatusCode {
    /// Convert from the numeric `CODE` attribute.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => StatusCode::Failed,
            2 => StatusCode::AccessDenied,
            3 => StatusCode::InvalidNamespace,
            4 => StatusCode::InvalidParameter,
            5 => StatusCode::InvalidClass,
            6 => StatusCode::NotFound,
            7 => StatusCode::NotSupported,
            8 => StatusCode::ClassHasChildren,
            9 => StatusCode::ClassHasInstances,
            10 => StatusCode::InvalidSuperclass,
            11 => StatusCode::AlreadyExists,
            12 => StatusCode::NoSuchProperty,
            13 => StatusCode::TypeMismatch,
            14 => StatusCode::QueryLanguageNotSupported,
            15 => StatusCode::InvalidQuery,
            16 => StatusCode::MethodNotAvailable,
            17 => StatusCode::MethodNotFound,
            20 => StatusCode::NamespaceNotEmpty,
            21 => StatusCode::InvalidEnumerationContext,
            22 => StatusCode::InvalidOperationTimeout,
            23 => StatusCode::PullHasBeenAbandoned,
            24 => StatusCode::PullCannotBeAbandoned,
            25 => StatusCode::FilteredEnumerationNotSupported,
            26 => StatusCode::ContinuationOnErrorNotSupported,
            27 => StatusCode::ServerLimitsExceeded,
            28 => StatusCode::ServerIsShuttingDown,
            other => StatusCode::Unknown(other),
        }
    }

    /// Numeric value as carried on the wire.
    pub const fn to_raw(self) -> u32 {
        match self {
            StatusCode::Failed => 1,
            StatusCode::AccessDenied => 2,
            StatusCode::InvalidNamespace => 3,
            StatusCode::InvalidParameter => 4,
            StatusCode::InvalidClass => 5,
            StatusCode::NotFound => 6,
            StatusCode::NotSupported => 7,
            StatusCode::ClassHasChildren => 8,
            StatusCode::ClassHasInstances => 9,
            StatusCode::InvalidSuperclass => 10,
            StatusCode::AlreadyExists => 11,
            StatusCode::NoSuchProperty => 12,
            StatusCode::TypeMismatch => 13,
            StatusCode::QueryLanguageNotSupported => 14,
            StatusCode::InvalidQuery => 15,
            StatusCode::MethodNotAvailable => 16,
            StatusCode::MethodNotFound => 17,
            StatusCode::NamespaceNotEmpty => 20,
            StatusCode::InvalidEnumerationContext => 21,
            StatusCode::InvalidOperationTimeout => 22,
            StatusCode::PullHasBeenAbandoned => 23,
            StatusCode::PullCannotBeAbandoned => 24,
            StatusCode::FilteredEnumerationNotSupported => 25,
            StatusCode::ContinuationOnErrorNotSupported => 26,
            StatusCode::ServerLimitsExceeded => 27,
            StatusCode::ServerIsShuttingDown => 28,
            StatusCode::Unknown(code) => code,
        }
    }
}

/// A decoded `ERROR` element.
///
/// This is a successfully decoded server answer, not a decoding failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("CIM status {code}: {description}")]
pub struct ProtocolError {
    pub code: u32,
    pub description: String,
    /// Diagnostic instances such as `CIM_Error`.
    pub instances: Vec<CimInstance>,
}

impl ProtocolError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_raw(self.code)
    }
}
