//! Response body decoding keyed by format tag.
//!
//! # Design
//! A `DecoderRegistry` owns two tables: format tag → decoder, and an ordered
//! list of (format tag, MIME substring) pairs used to sniff the format from a
//! `Content-Type` header. The defaults cover `xml` and `json`; callers can
//! register more. Decoders produce `serde_json::Value` so XML and JSON bodies
//! end up in the same nested mapping/sequence shape.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, ParseError};

/// Key under which element text is stored when the element also has
/// attributes or children.
pub const XML_CONTENT_KEY: &str = "__content__";

/// Format tag selecting a decoder, e.g. `xml` or `json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Format(Cow<'static, str>);

impl Format {
    pub const XML: Format = Format(Cow::Borrowed("xml"));
    pub const JSON: Format = Format(Cow::Borrowed("json"));

    pub fn new(tag: impl Into<String>) -> Self {
        Format(Cow::Owned(tag.into().to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.is_empty() {
            return Err(Error::InvalidOption("format must not be empty".to_string()));
        }
        Ok(match tag.to_ascii_lowercase().as_str() {
            "xml" => Format::XML,
            "json" => Format::JSON,
            other => Format::new(other),
        })
    }
}

impl From<Format> for String {
    fn from(format: Format) -> Self {
        format.0.into_owned()
    }
}

impl TryFrom<String> for Format {
    type Error = Error;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        tag.parse()
    }
}

/// Outcome of decoding a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// The body was absent or empty.
    Empty,
    Value(Value),
    /// No decoder applied; the body is passed through untouched.
    Raw(Vec<u8>),
}

impl Decoded {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Decoded::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Decoded::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Decoded::Empty)
    }
}

/// Turns a non-empty body into a structured value.
pub trait Decoder: Send + Sync {
    fn decode(&self, body: &[u8]) -> Result<Value, String>;
}

impl<F> Decoder for F
where
    F: Fn(&[u8]) -> Result<Value, String> + Send + Sync,
{
    fn decode(&self, body: &[u8]) -> Result<Value, String> {
        self(body)
    }
}

pub struct DecoderRegistry {
    decoders: HashMap<Format, Box<dyn Decoder>>,
    mime_types: Vec<(Format, String)>,
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<&str> = self.decoders.keys().map(Format::as_str).collect();
        formats.sort_unstable();
        f.debug_struct("DecoderRegistry")
            .field("formats", &formats)
            .field("mime_types", &self.mime_types)
            .finish()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(Format::XML, decode_xml)
            .register(Format::JSON, decode_json)
            .register_mime(Format::XML, "text/xml")
            .register_mime(Format::XML, "application/xml")
            .register_mime(Format::JSON, "application/json")
            .register_mime(Format::JSON, "text/json")
            .register_mime(Format::JSON, "application/javascript")
            .register_mime(Format::JSON, "text/javascript");
        registry
    }
}

impl DecoderRegistry {
    /// A registry with no decoders; every body passes through raw.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
            mime_types: Vec::new(),
        }
    }

    /// Register (or replace) the decoder for `format`.
    pub fn register(&mut self, format: Format, decoder: impl Decoder + 'static) -> &mut Self {
        self.decoders.insert(format, Box::new(decoder));
        self
    }

    /// Append a MIME substring that sniffs to `format`. Earlier entries win.
    pub fn register_mime(&mut self, format: Format, mime: impl Into<String>) -> &mut Self {
        self.mime_types.push((format, mime.into().to_ascii_lowercase()));
        self
    }

    pub fn supports(&self, format: &Format) -> bool {
        self.decoders.contains_key(format)
    }

    /// Infer a format from a `Content-Type` header value.
    pub fn sniff(&self, content_type: &str) -> Option<Format> {
        let content_type = content_type.to_ascii_lowercase();
        self.mime_types
            .iter()
            .find(|(_, mime)| content_type.contains(mime.as_str()))
            .map(|(format, _)| format.clone())
    }

    pub fn decode(&self, body: &[u8], format: Option<&Format>) -> Result<Decoded, ParseError> {
        if body.is_empty() {
            return Ok(Decoded::Empty);
        }
        let Some((format, decoder)) =
            format.and_then(|f| self.decoders.get(f).map(|decoder| (f, decoder)))
        else {
            return Ok(Decoded::Raw(body.to_vec()));
        };
        decoder
            .decode(body)
            .map(Decoded::Value)
            .map_err(|message| ParseError::new(format.clone(), message))
    }
}

pub fn decode_json(body: &[u8]) -> Result<Value, String> {
    serde_json::from_slice(body).map_err(|e| e.to_string())
}

/// Convert an XML document into nested objects keyed by element name.
///
/// Text-only elements become strings, empty elements become `null`,
/// attributes become string entries, and repeated sibling elements collapse
/// into an array. Text runs separated by child elements are trimmed and
/// joined with a single space.
pub fn decode_xml(body: &[u8]) -> Result<Value, String> {
    let text = std::str::from_utf8(body).map_err(|e| e.to_string())?;
    let mut reader = Reader::from_str(text);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => stack.push(XmlNode::open(&start)?),
            Event::Empty(start) => {
                let node = XmlNode::open(&start)?;
                close_node(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack.pop().ok_or("unexpected closing tag")?;
                close_node(&mut stack, &mut root, node)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| e.to_string())?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(cdata) => {
                let text = String::from_utf8(cdata.into_inner().into_owned())
                    .map_err(|e| e.to_string())?;
                push_text(&mut stack, &text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }
    let (name, value) = root.ok_or("document has no root element")?;
    let mut doc = Map::new();
    doc.insert(name, value);
    Ok(Value::Object(doc))
}

struct XmlNode {
    name: String,
    fields: Map<String, Value>,
    /// Text runs already closed off by a child element.
    runs: Vec<String>,
    text: String,
}

impl XmlNode {
    fn open(start: &BytesStart<'_>) -> Result<Self, String> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| e.to_string())?
            .to_string();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| e.to_string())?
                .to_string();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            fields.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            fields,
            runs: Vec::new(),
            text: String::new(),
        })
    }

    fn end_run(&mut self) {
        let run = std::mem::take(&mut self.text);
        let run = run.trim();
        if !run.is_empty() {
            self.runs.push(run.to_string());
        }
    }

    fn into_value(mut self) -> Value {
        self.end_run();
        let text = self.runs.join(" ");
        if self.fields.is_empty() {
            return if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            };
        }
        let mut fields = self.fields;
        if !text.is_empty() {
            fields.insert(XML_CONTENT_KEY.to_string(), Value::String(text));
        }
        Value::Object(fields)
    }
}

fn push_text(stack: &mut [XmlNode], text: &str) -> Result<(), String> {
    match stack.last_mut() {
        Some(node) => {
            node.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err("text outside of the root element".to_string()),
    }
}

fn close_node(
    stack: &mut [XmlNode],
    root: &mut Option<(String, Value)>,
    node: XmlNode,
) -> Result<(), String> {
    let name = node.name.clone();
    let value = node.into_value();
    match stack.last_mut() {
        Some(parent) => {
            parent.end_run();
            insert_child(&mut parent.fields, name, value);
            Ok(())
        }
        None if root.is_some() => Err("multiple root elements".to_string()),
        None => {
            *root = Some((name, value));
            Ok(())
        }
    }
}

fn insert_child(fields: &mut Map<String, Value>, name: String, value: Value) {
    match fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(name, value);
        }
    }
}
