//! Forward-only cursor over an intrinsic enumeration response.
//!
//! The envelope (`CIM`, `MESSAGE`, `SIMPLERSP`, `IMETHODRESPONSE`,
//! `IRETURNVALUE`) is tracked as a stack of open tags; only the children of
//! `IRETURNVALUE` are materialized, one subtree at a time, and decoded with
//! the same rules as the batch decoder.

use std::collections::VecDeque;

use cim_model::{Argument, CimProperty, CimValue, ObjectPath};
use tracing::{debug, trace};

use crate::element::{Element, TreeBuilder, XmlNode};
use crate::error::DecodeError;
use crate::message::{check_cim_versions, check_protocol_version};
use crate::object::{CimObject, Decoder};
use crate::resolver::PathResolver;
use crate::tag::Tag;
use crate::token::{Token, TokenSource};

type Result<T> = std::result::Result<T, DecodeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumeratorState {
    /// Nothing buffered; more input may follow.
    Idle,
    /// An item or a deferred error is ready.
    HasPending,
    /// Input fully consumed and every result handed out.
    Exhausted,
    Closed,
}

/// Streaming decoder for `IRETURNVALUE` items.
///
/// Yields `Ok` items in document order. A structural failure or a response
/// `ERROR` is yielded once, after the items decoded before it.
pub struct CimEnumerator<S: TokenSource> {
    decoder: Decoder,
    origin: PathResolver,
    source: Option<S>,
    state: EnumeratorState,
    open: Vec<Tag>,
    builder: TreeBuilder,
    pending: VecDeque<CimObject>,
    error: Option<DecodeError>,
    trailing: Vec<Argument>,
    saw_response: bool,
    /// No further tokens will be pulled.
    finished: bool,
    yielded: usize,
}

impl<S: TokenSource> CimEnumerator<S> {
    /// Bind `source` and read up to the first item.
    ///
    /// Paths lacking a host or namespace are completed from `origin`. Fails
    /// when the response fails before producing any item.
    pub fn new(decoder: Decoder, source: S, origin: ObjectPath) -> Result<Self> {
        let mut enumerator = Self {
            decoder,
            origin: PathResolver::new(origin),
            source: Some(source),
            state: EnumeratorState::Idle,
            open: Vec::new(),
            builder: TreeBuilder::default(),
            pending: VecDeque::new(),
            error: None,
            trailing: Vec::new(),
            saw_response: false,
            finished: false,
            yielded: 0,
        };
        enumerator.fill();
        if enumerator.pending.is_empty() {
            if let Some(err) = enumerator.error.take() {
                return Err(err);
            }
        }
        enumerator.update_state();
        debug!(origin = %enumerator.origin.base(), state = ?enumerator.state, "enumeration opened");
        Ok(enumerator)
    }

    pub fn state(&self) -> EnumeratorState {
        self.state
    }

    /// True if a call to `next` will produce a result.
    pub fn has_next(&mut self) -> bool {
        self.fill();
        self.update_state();
        !self.pending.is_empty() || self.error.is_some()
    }

    /// Read the rest of the response, buffering every item.
    ///
    /// Returns how many items are buffered. A failure stays deferred behind
    /// them.
    pub fn fetch_all(&mut self) -> Result<usize> {
        if self.state == EnumeratorState::Closed {
            return Err(DecodeError::Closed);
        }
        while !self.finished {
            self.pull();
        }
        self.update_state();
        Ok(self.pending.len())
    }

    /// Stop the enumeration; later calls are no-ops.
    ///
    /// With `force` the source is dropped unread. Otherwise the remaining
    /// input is read and discarded so [`into_source`](Self::into_source)
    /// returns a drained transport.
    pub fn close(&mut self, force: bool) -> Result<()> {
        if self.state == EnumeratorState::Closed {
            return Ok(());
        }
        self.state = EnumeratorState::Closed;
        self.finished = true;
        self.pending.clear();
        self.builder.clear();
        self.error = None;
        debug!(force, yielded = self.yielded, "closing enumeration");
        if force {
            self.source = None;
            return Ok(());
        }
        match self.source.as_mut() {
            Some(source) => source.skip_to_end(),
            None => Ok(()),
        }
    }

    /// The token source, unless it was abandoned by a forced close.
    pub fn into_source(self) -> Option<S> {
        self.source
    }

    /// `PARAMVALUE`s that followed `IRETURNVALUE`, such as pull operation
    /// enumeration contexts.
    pub fn trailing_params(&self) -> &[Argument] {
        &self.trailing
    }

    fn fill(&mut self) {
        while self.pending.is_empty() && !self.finished {
            self.pull();
        }
    }

    fn pull(&mut self) {
        if let Err(err) = self.step() {
            debug!(%err, "enumeration failed");
            self.error = Some(err);
            self.finished = true;
        }
    }

    fn update_state(&mut self) {
        if self.state == EnumeratorState::Closed {
            return;
        }
        self.state = if !self.pending.is_empty() || self.error.is_some() {
            EnumeratorState::HasPending
        } else if self.finished {
            EnumeratorState::Exhausted
        } else {
            EnumeratorState::Idle
        };
    }

    fn step(&mut self) -> Result<()> {
        let Some(source) = self.source.as_mut() else {
            self.finished = true;
            return Ok(());
        };
        match source.next_token()? {
            Token::Start { name, attributes } => {
                if self.builder.is_building() {
                    self.builder.start(name, attributes);
                    return Ok(());
                }
                self.open_element(name, attributes)
            }
            Token::End { name } => {
                if self.builder.is_building() {
                    if let Some(element) = self.builder.end(&name)? {
                        self.complete(element)?;
                    }
                    return Ok(());
                }
                match self.open.pop() {
                    Some(tag) if tag.as_str() == name => {
                        if tag == Tag::IReturnValue {
                            trace!(items = self.yielded + self.pending.len(), "IRETURNVALUE closed");
                        }
                        Ok(())
                    }
                    Some(tag) => Err(DecodeError::Stream(format!(
                        "end of {name} while {tag} is open"
                    ))),
                    None => Err(DecodeError::Stream(format!(
                        "end of {name} outside the document element"
                    ))),
                }
            }
            Token::Text(text) => {
                if self.builder.is_building() {
                    self.builder.text(&text);
                }
                Ok(())
            }
            Token::Eof => {
                self.finished = true;
                if self.builder.is_building() || !self.open.is_empty() {
                    let depth = self.builder.depth() + self.open.len();
                    return Err(DecodeError::Stream(format!(
                        "document ended inside {depth} open element(s)"
                    )));
                }
                if !self.saw_response {
                    return Err(DecodeError::Stream(
                        "document ended without an IMETHODRESPONSE".into(),
                    ));
                }
                Ok(())
            }
        }
    }

    fn open_element(&mut self, name: String, attributes: Vec<(String, String)>) -> Result<()> {
        let parent = self.open.last().copied();
        let tag = Tag::from_name(&name);
        match (parent, tag) {
            (None, Some(Tag::Cim)) => {
                let cim = Element::from_parts(name, attributes);
                check_cim_versions(
                    cim.require_attr(Tag::Cim, "CIMVERSION")?,
                    cim.require_attr(Tag::Cim, "DTDVERSION")?,
                )?;
            }
            (Some(Tag::Cim), Some(Tag::Message)) => {
                let message = Element::from_parts(name, attributes);
                message.require_attr(Tag::Message, "ID")?;
                check_protocol_version(message.require_attr(Tag::Message, "PROTOCOLVERSION")?)?;
            }
            (Some(Tag::Message), Some(Tag::SimpleRsp | Tag::MultiRsp))
            | (Some(Tag::MultiRsp), Some(Tag::SimpleRsp)) => {}
            (Some(Tag::SimpleRsp), Some(Tag::IMethodResponse)) => {
                let response = Element::from_parts(name, attributes);
                let method = response.require_attr(Tag::IMethodResponse, "NAME")?;
                trace!(method, "enumerating intrinsic response");
                self.saw_response = true;
            }
            (Some(Tag::IMethodResponse), Some(Tag::IReturnValue)) => {}
            (Some(Tag::IMethodResponse), Some(Tag::Error | Tag::ParamValue))
            | (Some(Tag::IReturnValue), _) => {
                self.builder.start(name, attributes);
                return Ok(());
            }
            (parent, _) => {
                return Err(DecodeError::Stream(match parent {
                    Some(parent) => format!("unexpected element {name} inside {parent}"),
                    None => format!("unexpected document element {name}"),
                }))
            }
        }
        if let Some(tag) = tag {
            self.open.push(tag);
        }
        Ok(())
    }

    fn complete(&mut self, element: Element) -> Result<()> {
        match self.open.last() {
            Some(Tag::IReturnValue) => {
                let mut object = self.decoder.decode_object(&element)?;
                self.fix_up(&mut object);
                trace!(element = element.name(), "decoded enumeration item");
                self.pending.push_back(object);
                Ok(())
            }
            _ if element.is(Tag::Error) => {
                Err(DecodeError::Protocol(self.decoder.decode_error(&element)?))
            }
            _ => {
                self.trailing.push(self.decoder.decode_param_value(&element)?);
                Ok(())
            }
        }
    }

    fn fix_up(&self, object: &mut CimObject) {
        if let Some(path) = object.path_mut() {
            self.origin.resolve_in_place(path);
        }
        match object {
            CimObject::Value(value) => self.fix_references(&mut value.value),
            CimObject::Class(class) => self.fix_properties(&mut class.properties),
            CimObject::Instance(instance) => self.fix_properties(&mut instance.properties),
            CimObject::Path(_) | CimObject::QualifierType(_) => {}
        }
    }

    fn fix_properties(&self, properties: &mut [CimProperty]) {
        for property in properties {
            self.fix_references(&mut property.value.value);
        }
    }

    fn fix_references(&self, value: &mut CimValue) {
        for scalar in value.scalars_mut() {
            if let Some(path) = scalar.as_path_mut() {
                self.origin.resolve_in_place(path);
            }
        }
    }
}

impl<S: TokenSource> Iterator for CimEnumerator<S> {
    type Item = Result<CimObject>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == EnumeratorState::Closed {
            return None;
        }
        self.fill();
        let item = match self.pending.pop_front() {
            Some(object) => {
                self.yielded += 1;
                self.fill();
                Some(Ok(object))
            }
            None => self.error.take().map(Err),
        };
        self.update_state();
        item
    }
}

impl Decoder {
    /// Stream the items of an intrinsic response, completing local paths
    /// from this decoder's base path.
    pub fn enumerate<S: TokenSource>(&self, source: S) -> Result<CimEnumerator<S>> {
        CimEnumerator::new(self.clone(), source, self.resolver.base().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoderConfig;
    use crate::error::StatusCode;
    use crate::token::XmlTokenizer;
    use cim_model::Scalar;

    const ENUMERATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<CIM CIMVERSION="2.0" DTDVERSION="2.0">
 <MESSAGE ID="77" PROTOCOLVERSION="1.0">
  <SIMPLERSP>
   <IMETHODRESPONSE NAME="EnumerateInstances">
    <IRETURNVALUE>
     <VALUE.NAMEDINSTANCE>
      <INSTANCENAME CLASSNAME="CIM_Service"><KEYBINDING NAME="Name"><KEYVALUE>sshd</KEYVALUE></KEYBINDING></INSTANCENAME>
      <INSTANCE CLASSNAME="CIM_Service"><PROPERTY NAME="Name" TYPE="string"><VALUE>sshd</VALUE></PROPERTY></INSTANCE>
     </VALUE.NAMEDINSTANCE>
     <VALUE.NAMEDINSTANCE>
      <INSTANCENAME CLASSNAME="CIM_Service"><KEYBINDING NAME="Name"><KEYVALUE>cron</KEYVALUE></KEYBINDING></INSTANCENAME>
      <INSTANCE CLASSNAME="CIM_Service"><PROPERTY NAME="Started" TYPE="boolean"><VALUE>true</VALUE></PROPERTY></INSTANCE>
     </VALUE.NAMEDINSTANCE>
     <VALUE.NAMEDINSTANCE>
      <INSTANCENAME CLASSNAME="CIM_Service"><KEYBINDING NAME="Name"><KEYVALUE>ntpd</KEYVALUE></KEYBINDING></INSTANCENAME>
      <INSTANCE CLASSNAME="CIM_Service"/>
     </VALUE.NAMEDINSTANCE>
    </IRETURNVALUE>
    <PARAMVALUE NAME="EndOfSequence" PARAMTYPE="boolean"><VALUE>TRUE</VALUE></PARAMVALUE>
   </IMETHODRESPONSE>
  </SIMPLERSP>
 </MESSAGE>
</CIM>"#;

    fn decoder() -> Decoder {
        Decoder::new(
            DecoderConfig::default(),
            PathResolver::new(ObjectPath::parse("http://cimom:5988/root/cimv2").unwrap()),
        )
    }

    /// Replays fixed tokens and counts how many were pulled.
    struct Scripted {
        tokens: VecDeque<Token>,
        pulled: usize,
    }

    impl Scripted {
        fn new(xml: &str) -> Self {
            let mut tokenizer = XmlTokenizer::new(xml.as_bytes());
            let mut tokens = VecDeque::new();
            loop {
                let token = tokenizer.next_token().expect("tokenize fixture");
                if token == Token::Eof {
                    break;
                }
                tokens.push_back(token);
            }
            Self { tokens, pulled: 0 }
        }
    }

    impl TokenSource for Scripted {
        fn next_token(&mut self) -> Result<Token> {
            self.pulled += 1;
            Ok(self.tokens.pop_front().unwrap_or(Token::Eof))
        }
    }

    #[test]
    fn streaming_matches_batch_decoding() {
        let d = decoder();
        let batch = d
            .decode_message_str(ENUMERATION)
            .unwrap()
            .into_response()
            .unwrap();

        let mut stream = d
            .enumerate(XmlTokenizer::new(ENUMERATION.as_bytes()))
            .expect("open enumeration");
        assert_eq!(stream.state(), EnumeratorState::HasPending);
        let streamed: Vec<CimObject> = stream.by_ref().collect::<Result<_>>().expect("items");
        assert_eq!(streamed, batch.objects);
        assert_eq!(stream.state(), EnumeratorState::Exhausted);
        assert!(!stream.has_next());

        assert_eq!(stream.trailing_params().len(), 1);
        assert_eq!(stream.trailing_params()[0].value.as_bool(), Some(true));
        assert_eq!(batch.params, stream.trailing_params());
    }

    #[test]
    fn local_paths_take_the_origin_context() {
        let origin = ObjectPath::parse("https://other:5989/root/interop").unwrap();
        let xml = ENUMERATION.replace(
            "<IRETURNVALUE>",
            r#"<IRETURNVALUE><INSTANCEPATH><NAMESPACEPATH><HOST>fixed</HOST><LOCALNAMESPACEPATH><NAMESPACE NAME="root/fixed"/></LOCALNAMESPACEPATH></NAMESPACEPATH><INSTANCENAME CLASSNAME="CIM_Fixed"/></INSTANCEPATH>"#,
        );
        let stream = CimEnumerator::new(
            decoder().with_base(ObjectPath::default()),
            XmlTokenizer::new(xml.as_bytes()),
            origin,
        )
        .unwrap();
        let items: Vec<CimObject> = stream.collect::<Result<_>>().unwrap();
        assert_eq!(items.len(), 4);
        let fixed = items[0].path().unwrap();
        assert_eq!(fixed.host.as_deref(), Some("fixed"));
        assert_eq!(fixed.namespace.as_deref(), Some("root/fixed"));
        let service = items[1].path().unwrap();
        assert_eq!(service.host.as_deref(), Some("other"));
        assert_eq!(service.port, Some(5989));
        assert_eq!(service.namespace.as_deref(), Some("root/interop"));
        assert!(service.is_instance());
    }

    #[test]
    fn reference_properties_take_the_origin_context() {
        let origin = ObjectPath::parse("https://other:5989/root/interop").unwrap();
        let xml = ENUMERATION.replace(
            r#"<INSTANCE CLASSNAME="CIM_Service"/>"#,
            r#"<INSTANCE CLASSNAME="CIM_Service"><PROPERTY.REFERENCE NAME="Owner" REFERENCECLASS="CIM_System"><VALUE.REFERENCE><INSTANCENAME CLASSNAME="CIM_System"><KEYBINDING NAME="Name"><KEYVALUE>host1</KEYVALUE></KEYBINDING></INSTANCENAME></VALUE.REFERENCE></PROPERTY.REFERENCE></INSTANCE>"#,
        );
        let stream = CimEnumerator::new(
            decoder().with_base(ObjectPath::default()),
            XmlTokenizer::new(xml.as_bytes()),
            origin,
        )
        .unwrap();
        let items: Vec<CimObject> = stream.collect::<Result<_>>().unwrap();
        let ntpd = items[2].as_instance().unwrap();
        let owner = ntpd.property("Owner").unwrap();
        let path = owner.value.as_scalar().and_then(Scalar::as_path).unwrap();
        assert_eq!(path.object_name(), "CIM_System");
        assert_eq!(path.host.as_deref(), Some("other"));
        assert_eq!(path.port, Some(5989));
        assert_eq!(path.namespace.as_deref(), Some("root/interop"));
    }

    #[test]
    fn error_response_fails_on_open() {
        let xml = r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0"><MESSAGE ID="9" PROTOCOLVERSION="1.0"><SIMPLERSP>
<IMETHODRESPONSE NAME="EnumerateInstances"><ERROR CODE="6" DESCRIPTION="CIM_Nothing"/></IMETHODRESPONSE>
</SIMPLERSP></MESSAGE></CIM>"#;
        let err = decoder()
            .enumerate(XmlTokenizer::new(xml.as_bytes()))
            .err()
            .expect("protocol error");
        match err {
            DecodeError::Protocol(error) => {
                assert_eq!(error.status(), StatusCode::NotFound);
                assert_eq!(error.description, "CIM_Nothing");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn items_before_a_truncation_are_yielded_first() {
        let cut = ENUMERATION.find("<VALUE.NAMEDINSTANCE>\n      <INSTANCENAME CLASSNAME=\"CIM_Service\"><KEYBINDING NAME=\"Name\"><KEYVALUE>cron")
            .unwrap();
        let truncated = &ENUMERATION[..cut];
        let mut stream = decoder()
            .enumerate(Scripted::new(truncated))
            .expect("first item decodes");
        let first = stream.next().unwrap().unwrap();
        assert_eq!(first.as_instance().unwrap().class_name(), "CIM_Service");
        assert!(stream.has_next());
        assert!(matches!(stream.next(), Some(Err(DecodeError::Stream(_)))));
        assert!(stream.next().is_none());
        assert_eq!(stream.state(), EnumeratorState::Exhausted);
    }

    #[test]
    fn document_without_response_is_rejected() {
        let xml = r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0"><MESSAGE ID="9" PROTOCOLVERSION="1.0"><SIMPLERSP/></MESSAGE></CIM>"#;
        assert!(matches!(
            decoder().enumerate(XmlTokenizer::new(xml.as_bytes())),
            Err(DecodeError::Stream(_))
        ));
        let xml = r#"<CIM CIMVERSION="3.0" DTDVERSION="2.0"/>"#;
        assert!(matches!(
            decoder().enumerate(XmlTokenizer::new(xml.as_bytes())),
            Err(DecodeError::Version(_))
        ));
        let request = r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0"><MESSAGE ID="9" PROTOCOLVERSION="1.0"><SIMPLEREQ/></MESSAGE></CIM>"#;
        assert!(matches!(
            decoder().enumerate(XmlTokenizer::new(request.as_bytes())),
            Err(DecodeError::Stream(_))
        ));
    }

    #[test]
    fn close_is_idempotent_and_drains_unless_forced() {
        let mut stream = decoder().enumerate(Scripted::new(ENUMERATION)).unwrap();
        let pulled = stream.source.as_ref().unwrap().pulled;
        stream.close(true).unwrap();
        stream.close(false).unwrap();
        assert_eq!(stream.state(), EnumeratorState::Closed);
        assert!(stream.next().is_none());
        assert!(matches!(stream.fetch_all(), Err(DecodeError::Closed)));
        assert!(stream.into_source().is_none());
        assert!(pulled > 0);

        let mut stream = decoder().enumerate(Scripted::new(ENUMERATION)).unwrap();
        stream.close(false).unwrap();
        let source = stream.into_source().expect("source kept");
        assert!(source.tokens.is_empty());
    }

    #[test]
    fn fetch_all_buffers_everything() {
        let mut stream = decoder().enumerate(Scripted::new(ENUMERATION)).unwrap();
        assert_eq!(stream.fetch_all().unwrap(), 3);
        assert_eq!(stream.source.as_ref().unwrap().tokens.len(), 0);
        assert_eq!(stream.trailing_params().len(), 1);
        let names: Vec<Option<Scalar>> = stream
            .map(|item| {
                item.unwrap()
                    .path()
                    .and_then(|path| path.key("Name"))
                    .and_then(|key| key.as_scalar().cloned())
            })
            .collect();
        assert_eq!(
            names,
            [
                Some(Scalar::String("sshd".into())),
                Some(Scalar::String("cron".into())),
                Some(Scalar::String("ntpd".into())),
            ]
        );
    }
}
