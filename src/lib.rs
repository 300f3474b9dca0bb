#![cfg_attr(docsrs, feature(doc_cfg))]
//! CIM-XML workspace facade that re-exports the model and decoder crates and
//! bundles a per-session decoder configuration.
//!
//! ```rust
//! use cimxml_rs::{Session, SessionConfig};
//!
//! let config = SessionConfig::from_json(
//!     r#"{ "base_path": "https://cimom:5989/root/cimv2",
//!          "decoder": { "strict_embedded_typing": true } }"#,
//! )
//! .expect("session config");
//! let session = Session::new(config).expect("session");
//! assert!(session.decoder().config().strict_embedded_typing);
//! ```

pub use cim_model as model;
pub use cimxml;

use bytes::Bytes;
use cim_model::{ObjectPath, ValueError};
use cimxml::{CimEnumerator, CimMessage, DecodeError, Decoder, DecoderConfig, PathResolver};
use cimxml::{TokenSource, XmlTokenizer};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Error type produced by the session facade.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session configuration document could not be read.
    #[error("config: {0}")]
    Config(#[from] serde_json::Error),
    /// The configured base path is not a valid object path.
    #[error("base path: {0}")]
    BasePath(#[from] ValueError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Settings fixed for the lifetime of a [`Session`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub decoder: DecoderConfig,
    /// Object path text supplying scheme, host, port and default namespace.
    pub base_path: Option<String>,
}

impl SessionConfig {
    pub fn from_json(text: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(text)?)
    }

    fn base(&self) -> Result<ObjectPath, SessionError> {
        match self.base_path.as_deref() {
            Some(text) => Ok(ObjectPath::parse(text)?),
            None => Ok(ObjectPath::default()),
        }
    }
}

/// A configured decoder bound to one server connection context.
#[derive(Debug, Clone)]
pub struct Session {
    decoder: Decoder,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let base = config.base()?;
        info!(base = %base, strict = config.decoder.strict_embedded_typing, "session configured");
        Ok(Self {
            decoder: Decoder::new(config.decoder, PathResolver::new(base)),
        })
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Swap the base path; decodes already running keep the old one.
    pub fn set_base(&mut self, base: ObjectPath) {
        debug!(base = %base, "session base path changed");
        self.decoder = self.decoder.with_base(base);
    }

    /// Decode a complete request or response body.
    pub fn decode_message(&self, body: Bytes) -> Result<CimMessage, SessionError> {
        Ok(self.decoder.decode_message_bytes(body)?)
    }

    /// Start streaming an enumeration response from `source`.
    pub fn enumerate<S: TokenSource>(&self, source: S) -> Result<CimEnumerator<S>, SessionError> {
        Ok(self.decoder.enumerate(source)?)
    }

    /// Stream a response body already held in memory.
    pub fn enumerate_bytes(
        &self,
        body: Bytes,
    ) -> Result<CimEnumerator<XmlTokenizer<bytes::buf::Reader<Bytes>>>, SessionError> {
        self.enumerate(XmlTokenizer::from_bytes(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimxml::CimObject;

    const RESPONSE: &str = r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0"><MESSAGE ID="4" PROTOCOLVERSION="1.0"><SIMPLERSP>
<IMETHODRESPONSE NAME="EnumerateClassNames"><IRETURNVALUE>
<CLASSNAME NAME="CIM_ManagedElement"/><CLASSNAME NAME="CIM_Job"/>
</IRETURNVALUE></IMETHODRESPONSE></SIMPLERSP></MESSAGE></CIM>"#;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    #[test]
    fn config_defaults_and_parse_errors() {
        let config = SessionConfig::from_json("{}").expect("empty config");
        assert_eq!(config, SessionConfig::default());
        assert!(matches!(
            SessionConfig::from_json(r#"{ "decoder": 3 }"#),
            Err(SessionError::Config(_))
        ));
        let bad = SessionConfig {
            base_path: Some("http://cimom:notaport/root".into()),
            ..SessionConfig::default()
        };
        assert!(matches!(Session::new(bad), Err(SessionError::BasePath(_))));
    }

    #[test]
    fn batch_and_streaming_share_the_base() {
        init_tracing();
        let config = SessionConfig::from_json(r#"{ "base_path": "http://cimom:5988/root/cimv2" }"#)
            .unwrap();
        let mut session = Session::new(config).unwrap();
        let message = session
            .decode_message(Bytes::from_static(RESPONSE.as_bytes()))
            .expect("batch decode");
        let batch = message.into_response().unwrap().objects;
        let streamed: Vec<CimObject> = session
            .enumerate_bytes(Bytes::from_static(RESPONSE.as_bytes()))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(batch, streamed);
        assert_eq!(
            batch[1].path().unwrap().to_string(),
            "http://cimom:5988/root/cimv2:CIM_Job"
        );

        session.set_base(ObjectPath::namespace("root/interop"));
        let message = session
            .decode_message(Bytes::from_static(RESPONSE.as_bytes()))
            .unwrap();
        let objects = message.into_response().unwrap().objects;
        assert_eq!(objects[0].path().unwrap().to_string(), "root/interop:CIM_ManagedElement");
    }
}
