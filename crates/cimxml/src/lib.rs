#![cfg_attr(docsrs, feature(doc_cfg))]
//! CIM-XML (DSP0201) decoding.
//!
//! Bytes are tokenized by [`XmlTokenizer`] and either materialized into an
//! [`Element`] tree for the batch [`Decoder`] or fed to a [`CimEnumerator`]
//! that decodes one `IRETURNVALUE` item at a time.
//!
//! ```rust
//! use cimxml::{Decoder, DecoderConfig, PathResolver};
//! use cim_model::ObjectPath;
//!
//! let base = ObjectPath::parse("https://cimom:5989/root/cimv2").expect("base path");
//! let decoder = Decoder::new(DecoderConfig::default(), PathResolver::new(base));
//! let object = decoder
//!     .decode_object_str(r#"<CLASSNAME NAME="CIM_ComputerSystem"/>"#)
//!     .expect("decode");
//! assert_eq!(
//!     object.path().map(ToString::to_string).as_deref(),
//!     Some("https://cimom:5989/root/cimv2:CIM_ComputerSystem")
//! );
//! ```

pub mod config;
pub mod element;
pub mod embedded;
pub mod enumerator;
pub mod error;
pub mod message;
pub mod object;
pub mod resolver;
pub mod tag;
pub mod token;

pub use config::DecoderConfig;
pub use element::{Element, TreeBuilder, XmlNode};
pub use embedded::EmbeddedKind;
pub use enumerator::{CimEnumerator, EnumeratorState};
pub use error::{DecodeError, ProtocolError, StatusCode};
pub use message::{CallKind, CimMessage, CimRequest, CimResponse, MessageBody};
pub use object::{CimObject, Decoder, ValueShape};
pub use resolver::PathResolver;
pub use tag::Tag;
pub use token::{Token, TokenSource, XmlTokenizer};
