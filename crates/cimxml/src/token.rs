//! Pull tokenizer over a CIM-XML byte stream.

use std::io::BufRead;

use bytes::{Buf, Bytes};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::trace;

use crate::error::DecodeError;

/// One structural XML event.
///
/// Empty elements are reported as a `Start` immediately followed by `End`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Start {
        name: String,
        attributes: Vec<(String, String)>,
    },
    End {
        name: String,
    },
    /// Unescaped character data, CDATA included.
    Text(String),
    Eof,
}

/// Sequential source of [`Token`]s.
pub trait TokenSource {
    /// Pull the next token; returns [`Token::Eof`] repeatedly once finished.
    fn next_token(&mut self) -> Result<Token, DecodeError>;

    /// Consume the remaining input without decoding it.
    fn skip_to_end(&mut self) -> Result<(), DecodeError> {
        while self.next_token()? != Token::Eof {}
        Ok(())
    }
}

impl<S: TokenSource + ?Sized> TokenSource for Box<S> {
    fn next_token(&mut self) -> Result<Token, DecodeError> {
        (**self).next_token()
    }

    fn skip_to_end(&mut self) -> Result<(), DecodeError> {
        (**self).skip_to_end()
    }
}

/// [`TokenSource`] backed by `quick-xml`.
pub struct XmlTokenizer<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> XmlTokenizer<R> {
    pub fn new(inner: R) -> Self {
        let mut reader = Reader::from_reader(inner);
        reader.expand_empty_elements(true);
        Self {
            reader,
            buf: Vec::new(),
            finished: false,
        }
    }

    /// Give back the underlying reader, positioned wherever tokenizing stopped.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    fn read_error(&self, err: quick_xml::Error) -> DecodeError {
        DecodeError::Xml(format!(
            "{err} at byte {}",
            self.reader.buffer_position()
        ))
    }
}

impl XmlTokenizer<bytes::buf::Reader<Bytes>> {
    /// Tokenize a complete response body.
    pub fn from_bytes(body: Bytes) -> Self {
        Self::new(body.reader())
    }
}

impl<R: BufRead> TokenSource for XmlTokenizer<R> {
    fn next_token(&mut self) -> Result<Token, DecodeError> {
        if self.finished {
            return Ok(Token::Eof);
        }
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(err) => {
                    let err = self.read_error(err);
                    self.finished = true;
                    return Err(err);
                }
            };
            let token = match event {
                Event::Start(start) => Token::Start {
                    name: element_name(&start),
                    attributes: attributes(&start)?,
                },
                Event::End(end) => Token::End {
                    name: String::from_utf8_lossy(end.name().as_ref()).into_owned(),
                },
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|err| DecodeError::Xml(err.to_string()))?;
                    if text.is_empty() {
                        continue;
                    }
                    Token::Text(text.into_owned())
                }
                Event::CData(data) => {
                    Token::Text(String::from_utf8_lossy(&data.into_inner()).into_owned())
                }
                Event::Eof => {
                    self.finished = true;
                    Token::Eof
                }
                // declarations, comments, processing instructions
                _ => continue,
            };
            return Ok(token);
        }
    }

    fn skip_to_end(&mut self) -> Result<(), DecodeError> {
        let mut skipped = 0usize;
        while !self.finished {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Eof) => self.finished = true,
                Ok(_) => skipped += 1,
                Err(err) => {
                    self.finished = true;
                    return Err(self.read_error(err));
                }
            }
        }
        trace!(skipped, "drained remaining xml events");
        Ok(())
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>, DecodeError> {
    start
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(|err| DecodeError::Xml(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| DecodeError::Xml(err.to_string()))?
                .into_owned();
            Ok((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Vec<Token> {
        let mut tokenizer = XmlTokenizer::new(xml.as_bytes());
        let mut tokens = Vec::new();
        loop {
            let token = tokenizer.next_token().expect("token");
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    #[test]
    fn empty_elements_expand() {
        let tokens = collect(r#"<?xml version="1.0"?><A x="1&amp;2"><B/></A>"#);
        assert_eq!(
            tokens,
            vec![
                Token::Start {
                    name: "A".into(),
                    attributes: vec![("x".into(), "1&2".into())],
                },
                Token::Start {
                    name: "B".into(),
                    attributes: Vec::new(),
                },
                Token::End { name: "B".into() },
                Token::End { name: "A".into() },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn text_is_unescaped_and_cdata_kept() {
        let tokens = collect("<V>&lt;x&gt;<![CDATA[<y/>]]></V>");
        assert_eq!(tokens[1], Token::Text("<x>".into()));
        assert_eq!(tokens[2], Token::Text("<y/>".into()));
    }

    #[test]
    fn mismatched_end_is_an_error() {
        let mut tokenizer = XmlTokenizer::new("<A><B></A>".as_bytes());
        let mut failed = false;
        for _ in 0..5 {
            match tokenizer.next_token() {
                Err(DecodeError::Xml(_)) => {
                    failed = true;
                    break;
                }
                Ok(Token::Eof) => break,
                _ => {}
            }
        }
        assert!(failed);
    }

    #[test]
    fn skip_then_eof_and_bytes_source() {
        let mut tokenizer = XmlTokenizer::from_bytes(Bytes::from_static(b"<A><B/><C>t</C></A>"));
        assert!(matches!(tokenizer.next_token().unwrap(), Token::Start { .. }));
        tokenizer.skip_to_end().unwrap();
        assert_eq!(tokenizer.next_token().unwrap(), Token::Eof);
        assert!(!tokenizer.into_inner().get_ref().has_remaining());
    }
}
