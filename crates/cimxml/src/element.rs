//! Materialized element tree and the node interface the decoders walk.

use std::io::BufRead;

use crate::error::DecodeError;
use crate::tag::Tag;
use crate::token::{Token, TokenSource, XmlTokenizer};

/// Read-only view of one XML element.
///
/// The object and message decoders only rely on this interface, so any tree
/// representation can drive them.
pub trait XmlNode: Sized {
    fn name(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
    fn children(&self) -> &[Self];
    /// Character data directly inside the element, if any.
    fn text(&self) -> Option<&str>;

    fn tag(&self) -> Option<Tag> {
        Tag::from_name(self.name())
    }

    fn is(&self, tag: Tag) -> bool {
        self.name() == tag.as_str()
    }

    /// First child with the given tag.
    fn child(&self, tag: Tag) -> Option<&Self> {
        self.children().iter().find(|c| c.is(tag))
    }

    /// First child matching any of `tags`, in document order.
    fn child_of(&self, tags: &[Tag]) -> Option<&Self> {
        self.children()
            .iter()
            .find(|c| tags.iter().any(|t| c.is(*t)))
    }

    fn children_named<'a>(&'a self, tag: Tag) -> impl Iterator<Item = &'a Self> + 'a
    where
        Self: 'a,
    {
        self.children().iter().filter(move |c| c.is(tag))
    }

    fn require_child(&self, production: Tag, tag: Tag) -> Result<&Self, DecodeError> {
        self.child(tag).ok_or(DecodeError::MissingElement {
            production: production.as_str(),
            child: tag.as_str(),
        })
    }

    fn require_attr(&self, production: Tag, attribute: &'static str) -> Result<&str, DecodeError> {
        self.attribute(attribute)
            .ok_or(DecodeError::MissingAttribute {
                production: production.as_str(),
                attribute,
            })
    }

    /// Boolean attribute; absent yields `default`.
    fn bool_attr(
        &self,
        production: Tag,
        attribute: &'static str,
        default: bool,
    ) -> Result<bool, DecodeError> {
        match self.attribute(attribute).map(str::trim) {
            None => Ok(default),
            Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(true),
            Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(false),
            Some(raw) => Err(DecodeError::invalid(
                production.as_str(),
                format!("attribute {attribute}={raw:?} is not a boolean"),
            )),
        }
    }
}

/// Owned XML element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: Option<String>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Element with attributes and no content, as carried by a start tag.
    pub fn from_parts(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Parse a complete document held in memory.
    pub fn parse(xml: &str) -> Result<Self, DecodeError> {
        Self::from_reader(xml.as_bytes())
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, DecodeError> {
        Self::from_tokens(&mut XmlTokenizer::new(reader))
    }

    /// Build the document element from a token source.
    pub fn from_tokens<S: TokenSource + ?Sized>(source: &mut S) -> Result<Self, DecodeError> {
        let mut builder = TreeBuilder::default();
        let mut root = None;
        loop {
            match source.next_token()? {
                Token::Start { name, attributes } => {
                    if root.is_some() {
                        return Err(DecodeError::Stream(format!(
                            "second document element {name}"
                        )));
                    }
                    builder.start(name, attributes);
                }
                Token::End { name } => {
                    if let Some(done) = builder.end(&name)? {
                        root = Some(done);
                    }
                }
                Token::Text(text) => builder.text(&text),
                Token::Eof => break,
            }
        }
        if builder.depth() > 0 {
            return Err(DecodeError::Stream(format!(
                "document ended inside {} open element(s)",
                builder.depth()
            )));
        }
        root.ok_or_else(|| DecodeError::Stream("document has no element".into()))
    }
}

impl XmlNode for Element {
    fn name(&self) -> &str {
        &self.name
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// Incrementally assembles elements from tokens.
///
/// Used both for whole documents and for the single item subtrees the
/// streaming enumerator materializes.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    stack: Vec<Element>,
}

impl TreeBuilder {
    pub fn start(&mut self, name: String, attributes: Vec<(String, String)>) {
        self.stack.push(Element {
            name,
            attributes,
            children: Vec::new(),
            text: None,
        });
    }

    /// Character data outside any open element is dropped.
    pub fn text(&mut self, text: &str) {
        if let Some(current) = self.stack.last_mut() {
            current.text.get_or_insert_with(String::new).push_str(text);
        }
    }

    /// Close the innermost element; yields it once the outermost one closes.
    pub fn end(&mut self, name: &str) -> Result<Option<Element>, DecodeError> {
        let element = self.stack.pop().ok_or_else(|| {
            DecodeError::Stream(format!("end of {name} without a matching start"))
        })?;
        if element.name != name {
            return Err(DecodeError::Stream(format!(
                "end of {name} while {} is open",
                element.name
            )));
        }
        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(element);
                Ok(None)
            }
            None => Ok(Some(element)),
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_building(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}
