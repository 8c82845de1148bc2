//! XML plist encoder.
//!
//! Walks native Rust values through the [`Encode`] trait and writes indented plist markup:
//! the XML declaration, the Apple DOCTYPE, a `<plist version="1.0">` wrapper, then one element
//! per line, each prefixed with one tab per nesting depth (the root sits at depth 0).
//!
//! `BTreeMap` and [`Value::Dictionary`] entries are written in key order. `HashMap` entries are
//! written in the map's iteration order, which is not stable across runs.

use crate::error::PlistError;
use crate::value::{Kind, Value};
use crate::xml::{PLIST_DOCTYPE, PLIST_VERSION};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::io::{BufWriter, Write};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Which value kinds may sit at the document root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootPolicy {
    /// Dictionaries, records and arrays only. Scalars and byte blobs are rejected.
    #[default]
    Containers,
    /// Any value, including a bare scalar.
    Any,
}

/// A value the XML encoder can write.
pub trait Encode {
    /// Kind of element this value is written as.
    fn kind(&self) -> Kind;

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError>;

    /// Absent values are left out of records and dictionaries.
    fn is_absent(&self) -> bool {
        false
    }

    #[doc(hidden)]
    fn slice_kind(_items: &[Self]) -> Kind
    where
        Self: Sized,
    {
        Kind::Array
    }

    #[doc(hidden)]
    fn encode_slice<W: Write>(items: &[Self], enc: &mut XmlEncoder<W>) -> Result<(), PlistError>
    where
        Self: Sized,
    {
        enc.begin_array()?;
        for item in items {
            item.encode(enc)?;
        }
        enc.end_array()
    }
}

pub struct XmlEncoder<W: Write> {
    writer: BufWriter<W>,
    depth: usize,
    root_policy: RootPolicy,
}

impl<W: Write> XmlEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self::with_root_policy(writer, RootPolicy::default())
    }

    pub fn with_root_policy(writer: W, root_policy: RootPolicy) -> Self {
        XmlEncoder { writer: BufWriter::new(writer), depth: 0, root_policy }
    }

    /// Write one complete document for `value` and flush. The underlying writer stays open.
    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), PlistError> {
        if value.is_absent() {
            return Err(PlistError::structure("root value is absent"));
        }
        let kind = value.kind();
        if self.root_policy == RootPolicy::Containers && !kind.is_container() {
            return Err(PlistError::structure(format!(
                "root must be a dictionary or array, found {}",
                kind
            )));
        }
        log::trace!("encoding plist root: {}", kind);
        self.depth = 0;
        self.writer.write_all(XML_DECLARATION.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.write_all(PLIST_DOCTYPE.as_bytes())?;
        self.writer.write_all(b"\n")?;
        writeln!(self.writer, r#"<plist version="{}">"#, PLIST_VERSION)?;
        value.encode(self)?;
        self.writer.write_all(b"</plist>\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), PlistError> {
        for _ in 0..self.depth {
            self.writer.write_all(b"\t")?;
        }
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn text_element(&mut self, tag: &str, text: &str) -> Result<(), PlistError> {
        self.write_line(&format!("<{tag}>{}</{tag}>", escape(text), tag = tag))
    }

    pub fn begin_array(&mut self) -> Result<(), PlistError> {
        self.write_line("<array>")?;
        self.depth += 1;
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<(), PlistError> {
        self.depth = self.depth.saturating_sub(1);
        self.write_line("</array>")
    }

    pub fn begin_dict(&mut self) -> Result<(), PlistError> {
        self.write_line("<dict>")?;
        self.depth += 1;
        Ok(())
    }

    pub fn end_dict(&mut self) -> Result<(), PlistError> {
        self.depth = self.depth.saturating_sub(1);
        self.write_line("</dict>")
    }

    pub fn key(&mut self, key: &str) -> Result<(), PlistError> {
        self.text_element("key", key)
    }

    pub fn integer(&mut self, x: i64) -> Result<(), PlistError> {
        self.write_line(&format!("<integer>{}</integer>", x))
    }

    /// Values above `i64::MAX` are refused so that every written integer decodes again.
    pub fn unsigned(&mut self, x: u64) -> Result<(), PlistError> {
        if x > i64::MAX as u64 {
            return Err(PlistError::structure(format!(
                "integer {} exceeds the signed 64-bit plist range",
                x
            )));
        }
        self.write_line(&format!("<integer>{}</integer>", x))
    }

    /// `Display` for floats is the shortest text that parses back to the same value.
    pub fn real(&mut self, x: impl std::fmt::Display) -> Result<(), PlistError> {
        self.write_line(&format!("<real>{}</real>", x))
    }

    pub fn string(&mut self, s: &str) -> Result<(), PlistError> {
        self.text_element("string", s)
    }

    pub fn boolean(&mut self, b: bool) -> Result<(), PlistError> {
        self.write_line(if b { "<true/>" } else { "<false/>" })
    }

    pub fn data(&mut self, bytes: &[u8]) -> Result<(), PlistError> {
        self.write_line(&format!("<data>{}</data>", STANDARD.encode(bytes)))
    }

    pub fn date(&mut self, d: &DateTime<Utc>) -> Result<(), PlistError> {
        self.write_line(&format!("<date>{}</date>", d.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
    }

    fn dict_entries<'a, K, V, I>(&mut self, entries: I) -> Result<(), PlistError>
    where
        K: AsRef<str> + 'a,
        V: Encode + 'a,
        I: IntoIterator<Item = (&'a K, &'a V)>,
    {
        self.begin_dict()?;
        for (k, v) in entries {
            if v.is_absent() {
                continue;
            }
            self.key(k.as_ref())?;
            v.encode(self)?;
        }
        self.end_dict()
    }
}

/// Encode `value` into a fresh buffer with the default root policy.
pub fn to_vec<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>, PlistError> {
    let mut out = Vec::new();
    XmlEncoder::new(&mut out).encode(value)?;
    Ok(out)
}

impl Encode for str {
    fn kind(&self) -> Kind {
        Kind::String
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        enc.string(self)
    }
}

impl Encode for String {
    fn kind(&self) -> Kind {
        Kind::String
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        enc.string(self)
    }
}

impl Encode for bool {
    fn kind(&self) -> Kind {
        Kind::Boolean
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        enc.boolean(*self)
    }
}

macro_rules! encode_signed {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn kind(&self) -> Kind {
                    Kind::Integer
                }

                fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
                    enc.integer(i64::from(*self))
                }
            }
        )*
    };
}

encode_signed!(i8, i16, i32, i64);

macro_rules! encode_unsigned {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn kind(&self) -> Kind {
                    Kind::Integer
                }

                fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
                    enc.unsigned(u64::from(*self))
                }
            }
        )*
    };
}

encode_unsigned!(u16, u32, u64);

impl Encode for isize {
    fn kind(&self) -> Kind {
        Kind::Integer
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        enc.integer(*self as i64)
    }
}

impl Encode for usize {
    fn kind(&self) -> Kind {
        Kind::Integer
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        enc.unsigned(*self as u64)
    }
}

/// A lone `u8` is an integer; a sequence of them is a `<data>` blob.
impl Encode for u8 {
    fn kind(&self) -> Kind {
        Kind::Integer
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        enc.unsigned(u64::from(*self))
    }

    fn slice_kind(_items: &[Self]) -> Kind {
        Kind::Data
    }

    fn encode_slice<W: Write>(items: &[Self], enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        enc.data(items)
    }
}

impl Encode for f32 {
    fn kind(&self) -> Kind {
        Kind::Real
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        enc.real(*self)
    }
}

impl Encode for f64 {
    fn kind(&self) -> Kind {
        Kind::Real
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        enc.real(*self)
    }
}

impl Encode for DateTime<Utc> {
    fn kind(&self) -> Kind {
        Kind::Date
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        enc.date(self)
    }
}

impl<T: Encode> Encode for [T] {
    fn kind(&self) -> Kind {
        T::slice_kind(self)
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        T::encode_slice(self, enc)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn kind(&self) -> Kind {
        T::slice_kind(self)
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        T::encode_slice(self, enc)
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn kind(&self) -> Kind {
        (**self).kind()
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        (**self).encode(enc)
    }

    fn is_absent(&self) -> bool {
        (**self).is_absent()
    }
}

impl<T: Encode> Encode for Option<T> {
    fn kind(&self) -> Kind {
        // `None` never reaches a kind check: absent values are skipped or rejected first.
        self.as_ref().map_or(Kind::String, Encode::kind)
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        match self {
            Some(v) => v.encode(enc),
            None => Ok(()),
        }
    }

    fn is_absent(&self) -> bool {
        self.as_ref().map_or(true, Encode::is_absent)
    }
}

impl<K: AsRef<str>, V: Encode> Encode for BTreeMap<K, V> {
    fn kind(&self) -> Kind {
        Kind::Dictionary
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        enc.dict_entries(self)
    }
}

impl<K: AsRef<str>, V: Encode, S: BuildHasher> Encode for HashMap<K, V, S> {
    fn kind(&self) -> Kind {
        Kind::Dictionary
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        enc.dict_entries(self)
    }
}

impl Encode for Value {
    fn kind(&self) -> Kind {
        Value::kind(self)
    }

    fn encode<W: Write>(&self, enc: &mut XmlEncoder<W>) -> Result<(), PlistError> {
        match self {
            Value::String(s) => enc.string(s),
            Value::Data(b) => enc.data(b),
            Value::Boolean(b) => enc.boolean(*b),
            Value::Integer(x) => enc.integer(*x),
            Value::Real(x) => enc.real(*x),
            Value::Date(d) => enc.date(d),
            Value::Array(items) => Value::encode_slice(items, enc),
            Value::Dictionary(m) => enc.dict_entries(m),
        }
    }
}
