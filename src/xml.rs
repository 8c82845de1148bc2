//! XML plist decoder.
//!
//! Pulls events from `quick-xml`, converts each to an owned [`Node`] right away, and builds a
//! [`Value`] by recursive descent. The preamble is validated in order: XML declaration, the
//! Apple DOCTYPE, then `<plist version="1.0">`. A childless `<plist>` decodes to `None`.
//!
//! Two modes are available:
//!
//! - [`Mode::Permissive`] (default): any known element may be the root, and character data,
//!   comments and processing instructions between elements are ignored.
//! - [`Mode::Strict`]: the root must be `<dict>` or `<array>`, the declaration must read
//!   `version="1.0" encoding="UTF-8"`, and only whitespace may appear between elements.
//!
//! Unknown elements are skipped together with their subtree in both modes. Containers nest
//! at most [`MAX_DEPTH`] levels.

use crate::error::PlistError;
use crate::mapper::Project;
use crate::value::{Value, MAX_DEPTH};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::io::BufRead;

/// The only DOCTYPE accepted on input, and the one written on output.
pub const PLIST_DOCTYPE: &str = r#"<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">"#;

/// Value of the `version` attribute on `<plist>`.
pub const PLIST_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Permissive,
    Strict,
}

/// Owned form of the events the decoder cares about.
#[derive(Debug)]
enum Node {
    Decl { version: String, encoding: Option<String> },
    DocType(String),
    Start { name: String, attrs: Vec<(String, String)> },
    Empty { name: String, attrs: Vec<(String, String)> },
    End(String),
    Text(String),
    Comment,
    Eof,
}

/// Structural element returned by [`XmlDecoder::next_element`].
enum Element {
    Start(String),
    Empty(String),
    End(String),
}

const VALUE_TAGS: [&str; 9] = ["dict", "array", "true", "false", "date", "data", "string", "real", "integer"];

fn is_value_tag(name: &str) -> bool {
    VALUE_TAGS.contains(&name)
}

pub struct XmlDecoder<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    mode: Mode,
    depth: usize,
}

impl<R: BufRead> XmlDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_mode(reader, Mode::default())
    }

    pub fn with_mode(reader: R, mode: Mode) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.trim_text(false);
        XmlDecoder { reader, buf: Vec::new(), mode, depth: 0 }
    }

    /// Decode the document. `Ok(None)` means the `<plist>` element had no child.
    pub fn decode_value(&mut self) -> Result<Option<Value>, PlistError> {
        self.read_preamble()?;
        if !self.read_plist_open()? {
            return Ok(None);
        }
        let root = self.read_root()?;
        if root.is_some() {
            self.expect_plist_close()?;
        }
        Ok(root)
    }

    /// Decode the document and project it onto `target`. An empty document leaves it untouched.
    pub fn decode<T: Project + ?Sized>(&mut self, target: &mut T) -> Result<(), PlistError> {
        match self.decode_value()? {
            Some(v) => target.project(&v),
            None => Ok(()),
        }
    }

    fn next_node(&mut self) -> Result<Node, PlistError> {
        let node = match self.reader.read_event_into(&mut self.buf)? {
            Event::Decl(d) => decl_node(&d)?,
            Event::DocType(t) => Node::DocType(String::from_utf8_lossy(&t).into_owned()),
            Event::Start(s) => {
                let (name, attrs) = start_parts(&s)?;
                Node::Start { name, attrs }
            }
            Event::Empty(s) => {
                let (name, attrs) = start_parts(&s)?;
                Node::Empty { name, attrs }
            }
            Event::End(e) => Node::End(String::from_utf8_lossy(e.name().as_ref()).into_owned()),
            Event::Text(t) => Node::Text(t.unescape()?.into_owned()),
            Event::CData(c) => Node::Text(
                String::from_utf8(c.into_inner().into_owned())
                    .map_err(|e| PlistError::lexical(format!("CDATA is not UTF-8: {}", e)))?,
            ),
            Event::Comment(_) | Event::PI(_) => Node::Comment,
            Event::Eof => Node::Eof,
        };
        self.buf.clear();
        Ok(node)
    }

    /// Next preamble item, skipping whitespace (and comments when permissive).
    fn next_preamble_node(&mut self) -> Result<Node, PlistError> {
        loop {
            match self.next_node()? {
                Node::Text(t) if t.trim().is_empty() => continue,
                Node::Comment if self.mode == Mode::Permissive => continue,
                Node::Text(t) => {
                    return Err(PlistError::structure(format!(
                        "unexpected text {:?} before <plist>",
                        t.trim()
                    )))
                }
                other => return Ok(other),
            }
        }
    }

    fn read_preamble(&mut self) -> Result<(), PlistError> {
        match self.next_preamble_node()? {
            Node::Decl { version, encoding } => {
                if self.mode == Mode::Strict
                    && (version != "1.0" || encoding.as_deref() != Some("UTF-8"))
                {
                    return Err(PlistError::structure(format!(
                        "XML declaration must be version=\"1.0\" encoding=\"UTF-8\", found version={:?} encoding={:?}",
                        version, encoding
                    )));
                }
            }
            other => return Err(PlistError::structure(format!("expected XML declaration, found {:?}", other))),
        }
        match self.next_preamble_node()? {
            Node::DocType(body) => {
                let normalized = body.split_whitespace().collect::<Vec<_>>().join(" ");
                if format!("<!DOCTYPE {}>", normalized) != PLIST_DOCTYPE {
                    return Err(PlistError::structure(format!("unexpected DOCTYPE {:?}", normalized)));
                }
            }
            other => return Err(PlistError::structure(format!("expected plist DOCTYPE, found {:?}", other))),
        }
        Ok(())
    }

    /// Read `<plist version="1.0">`. Returns false for a self-closing `<plist/>`.
    fn read_plist_open(&mut self) -> Result<bool, PlistError> {
        let (has_body, attrs) = match self.next_preamble_node()? {
            Node::Start { name, attrs } if name == "plist" => (true, attrs),
            Node::Empty { name, attrs } if name == "plist" => (false, attrs),
            other => return Err(PlistError::structure(format!("expected <plist>, found {:?}", other))),
        };
        match attrs.as_slice() {
            [(k, v)] if k == "version" && v == PLIST_VERSION => Ok(has_body),
            _ => Err(PlistError::structure(format!(
                "<plist> must carry exactly version=\"{}\", found {:?}",
                PLIST_VERSION, attrs
            ))),
        }
    }

    fn read_root(&mut self) -> Result<Option<Value>, PlistError> {
        loop {
            let (tag, empty) = match self.next_element()? {
                Element::End(name) if name == "plist" => return Ok(None),
                Element::End(name) => {
                    return Err(PlistError::structure(format!("unexpected </{}> in <plist>", name)))
                }
                Element::Start(name) => (name, false),
                Element::Empty(name) => (name, true),
            };
            if !is_value_tag(&tag) {
                self.skip_unknown(&tag, empty)?;
                continue;
            }
            if self.mode == Mode::Strict && tag != "dict" && tag != "array" {
                return Err(PlistError::structure(format!(
                    "root element must be <dict> or <array>, found <{}>",
                    tag
                )));
            }
            log::trace!("plist root element <{}>", tag);
            return self.read_value(&tag, empty).map(Some);
        }
    }

    fn expect_plist_close(&mut self) -> Result<(), PlistError> {
        loop {
            match self.next_element()? {
                Element::End(name) if name == "plist" => return Ok(()),
                Element::Start(name) if !is_value_tag(&name) => self.skip_unknown(&name, false)?,
                Element::Empty(name) if !is_value_tag(&name) => self.skip_unknown(&name, true)?,
                Element::Start(name) | Element::Empty(name) => {
                    return Err(PlistError::structure(format!(
                        "<plist> holds more than one root element (found <{}>)",
                        name
                    )))
                }
                Element::End(name) => {
                    return Err(PlistError::structure(format!("unexpected </{}>, expected </plist>", name)))
                }
            }
        }
    }

    /// Next start, empty or end element, skipping what lies between according to the mode.
    fn next_element(&mut self) -> Result<Element, PlistError> {
        loop {
            match self.next_node()? {
                Node::Start { name, .. } => return Ok(Element::Start(name)),
                Node::Empty { name, .. } => return Ok(Element::Empty(name)),
                Node::End(name) => return Ok(Element::End(name)),
                Node::Text(t) => {
                    if self.mode == Mode::Strict && !t.trim().is_empty() {
                        return Err(PlistError::structure(format!(
                            "unexpected character data {:?} between elements",
                            t.trim()
                        )));
                    }
                }
                Node::Comment => {}
                Node::Eof => return Err(PlistError::structure("unexpected end of document")),
                other => {
                    return Err(PlistError::structure(format!("unexpected {:?} inside <plist>", other)))
                }
            }
        }
    }

    fn skip_unknown(&mut self, name: &str, empty: bool) -> Result<(), PlistError> {
        log::debug!("skipping unknown element <{}>", name);
        if empty {
            return Ok(());
        }
        let mut depth = 0usize;
        loop {
            match self.next_node()? {
                Node::Start { .. } => depth += 1,
                Node::End(_) if depth == 0 => return Ok(()),
                Node::End(_) => depth -= 1,
                Node::Eof => {
                    return Err(PlistError::structure(format!("unexpected end of document in <{}>", name)))
                }
                _ => {}
            }
        }
    }

    /// Next known value inside `container`, or `None` at its closing tag.
    fn next_value_or_end(&mut self, container: &str) -> Result<Option<Value>, PlistError> {
        loop {
            let (tag, empty) = match self.next_element()? {
                Element::End(name) if name == container => return Ok(None),
                Element::End(name) => {
                    return Err(PlistError::structure(format!(
                        "unexpected </{}> in <{}>",
                        name, container
                    )))
                }
                Element::Start(name) => (name, false),
                Element::Empty(name) => (name, true),
            };
            if is_value_tag(&tag) {
                return self.read_value(&tag, empty).map(Some);
            }
            self.skip_unknown(&tag, empty)?;
        }
    }

    fn enter(&mut self) -> Result<(), PlistError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(PlistError::structure(format!("nesting too deep (limit {})", MAX_DEPTH)));
        }
        Ok(())
    }

    fn read_value(&mut self, tag: &str, empty: bool) -> Result<Value, PlistError> {
        match tag {
            "dict" => {
                if empty {
                    return Ok(Value::Dictionary(BTreeMap::new()));
                }
                self.enter()?;
                let dict = self.read_dict()?;
                self.depth -= 1;
                Ok(dict)
            }
            "array" => {
                let mut items = Vec::new();
                if !empty {
                    self.enter()?;
                    while let Some(v) = self.next_value_or_end("array")? {
                        items.push(v);
                    }
                    self.depth -= 1;
                }
                Ok(Value::Array(items))
            }
            "true" | "false" => {
                if !empty && !self.read_text(tag)?.trim().is_empty() {
                    return Err(PlistError::structure(format!("<{}> must be empty", tag)));
                }
                Ok(Value::Boolean(tag == "true"))
            }
            "string" => {
                if empty {
                    return Ok(Value::String(String::new()));
                }
                Ok(Value::String(self.read_text(tag)?))
            }
            "data" => {
                if empty {
                    return Ok(Value::Data(Vec::new()));
                }
                let text = self.read_text(tag)?;
                let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                STANDARD
                    .decode(compact.as_bytes())
                    .map(Value::Data)
                    .map_err(|e| PlistError::lexical(format!("bad base64 in <data>: {}", e)))
            }
            "integer" => {
                let text = self.required_text(tag, empty)?;
                text.parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|e| PlistError::lexical(format!("bad <integer> {:?}: {}", text, e)))
            }
            "real" => {
                let text = self.required_text(tag, empty)?;
                text.parse::<f64>()
                    .map(Value::Real)
                    .map_err(|e| PlistError::lexical(format!("bad <real> {:?}: {}", text, e)))
            }
            "date" => {
                let text = self.required_text(tag, empty)?;
                DateTime::parse_from_rfc3339(&text)
                    .map(|d| Value::Date(d.with_timezone(&Utc)))
                    .map_err(|e| PlistError::lexical(format!("bad <date> {:?}: {}", text, e)))
            }
            other => Err(PlistError::structure(format!("<{}> is not a plist value", other))),
        }
    }

    fn read_dict(&mut self) -> Result<Value, PlistError> {
        let mut map = BTreeMap::new();
        loop {
            let key = match self.next_element()? {
                Element::End(name) if name == "dict" => break,
                Element::Start(name) if name == "key" => self.read_text("key")?,
                Element::Empty(name) if name == "key" => String::new(),
                Element::Start(name) | Element::Empty(name) if is_value_tag(&name) => {
                    return Err(PlistError::structure(format!("expected <key> in <dict>, found <{}>", name)))
                }
                Element::Start(name) => {
                    self.skip_unknown(&name, false)?;
                    continue;
                }
                Element::Empty(name) => {
                    self.skip_unknown(&name, true)?;
                    continue;
                }
                Element::End(name) => {
                    return Err(PlistError::structure(format!("unexpected </{}> in <dict>", name)))
                }
            };
            let value = self
                .next_value_or_end("dict")?
                .ok_or_else(|| PlistError::structure(format!("missing value for key {:?}", key)))?;
            map.insert(key, value);
        }
        Ok(Value::Dictionary(map))
    }

    /// Character data up to `</tag>`. Comments are dropped; child elements are an error.
    fn read_text(&mut self, tag: &str) -> Result<String, PlistError> {
        let mut text = String::new();
        loop {
            match self.next_node()? {
                Node::Text(t) => text.push_str(&t),
                Node::Comment => {}
                Node::End(name) if name == tag => return Ok(text),
                Node::Eof => {
                    return Err(PlistError::structure(format!("unexpected end of document in <{}>", tag)))
                }
                other => {
                    return Err(PlistError::structure(format!("unexpected {:?} inside <{}>", other, tag)))
                }
            }
        }
    }

    /// Trimmed character data that must be present (integer, real, date).
    fn required_text(&mut self, tag: &str, empty: bool) -> Result<String, PlistError> {
        let text = if empty { String::new() } else { self.read_text(tag)? };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PlistError::structure(format!("<{}>: expected character data", tag)));
        }
        Ok(trimmed.to_string())
    }
}

fn decl_node(d: &BytesDecl<'_>) -> Result<Node, PlistError> {
    let version = String::from_utf8_lossy(&d.version()?).into_owned();
    let encoding = match d.encoding() {
        Some(e) => Some(String::from_utf8_lossy(&e?).into_owned()),
        None => None,
    };
    Ok(Node::Decl { version, encoding })
}

fn start_parts(s: &BytesStart<'_>) -> Result<(String, Vec<(String, String)>), PlistError> {
    let name = String::from_utf8_lossy(s.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in s.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        attrs.push((key, attr.unescape_value()?.into_owned()));
    }
    Ok((name, attrs))
}

/// Decode an XML plist held in memory and project it onto `target`.
pub fn from_slice<T: Project + ?Sized>(bytes: &[u8], target: &mut T) -> Result<(), PlistError> {
    XmlDecoder::new(bytes).decode(target)
}

/// Decode an XML plist held in memory into a [`Value`].
pub fn value_from_slice(bytes: &[u8]) -> Result<Option<Value>, PlistError> {
    XmlDecoder::new(bytes).decode_value()
}
