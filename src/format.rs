//! Format detection and dispatch to the dialect decoders and the XML encoder.
//!
//! The dispatcher never parses: it reads a short prefix, decides which dialect the stream is,
//! and hands the prefix plus the rest of the stream to that dialect's decoder.

use crate::ascii::AsciiDecoder;
use crate::encoder::{Encode, RootPolicy, XmlEncoder};
use crate::error::PlistError;
use crate::mapper::Project;
use crate::value::Value;
use crate::xml::{Mode, XmlDecoder};
use std::io::{BufReader, Cursor, Read, Write};

/// Number of leading bytes inspected by [`detect`].
pub const PREFIX_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Xml,
    Ascii,
    /// Recognized but not supported.
    Binary,
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Classify a stream by its first bytes.
pub fn detect(prefix: &[u8]) -> Result<Format, PlistError> {
    if contains(prefix, b"<?xml") {
        Ok(Format::Xml)
    } else if contains(prefix, b"bplist") {
        Ok(Format::Binary)
    } else if prefix.iter().any(|&c| c == b'{' || c == b'(') {
        Ok(Format::Ascii)
    } else {
        Err(PlistError::UnsupportedFormat(format!(
            "unrecognized plist prefix {:?}",
            String::from_utf8_lossy(prefix)
        )))
    }
}

/// Decoder for a stream of unknown dialect.
pub struct Decoder<R> {
    reader: R,
    mode: Mode,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_mode(reader, Mode::default())
    }

    /// `mode` applies when the stream turns out to be XML.
    pub fn with_mode(reader: R, mode: Mode) -> Self {
        Decoder { reader, mode }
    }

    pub fn decode_value(&mut self) -> Result<Option<Value>, PlistError> {
        let mut prefix = Vec::with_capacity(PREFIX_LEN);
        (&mut self.reader).take(PREFIX_LEN as u64).read_to_end(&mut prefix)?;
        if prefix.is_empty() {
            return Err(PlistError::EndOfStream);
        }
        let format = detect(&prefix)?;
        log::debug!("detected plist format {:?}", format);
        let stream = Cursor::new(prefix).chain(&mut self.reader);
        match format {
            Format::Xml => XmlDecoder::with_mode(BufReader::new(stream), self.mode).decode_value(),
            Format::Ascii => AsciiDecoder::new(stream).decode_value().map(Some),
            Format::Binary => Err(PlistError::UnsupportedFormat("binary plists are not supported".into())),
        }
    }

    pub fn decode<T: Project + ?Sized>(&mut self, target: &mut T) -> Result<(), PlistError> {
        match self.decode_value()? {
            Some(v) => target.project(&v),
            None => Ok(()),
        }
    }
}

/// Encoder front end. Only XML output exists.
pub struct Encoder<W: Write> {
    inner: XmlEncoder<W>,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Encoder { inner: XmlEncoder::new(writer) }
    }

    pub fn for_format(writer: W, format: Format) -> Result<Self, PlistError> {
        match format {
            Format::Xml => Ok(Self::new(writer)),
            other => Err(PlistError::UnsupportedFormat(format!("cannot encode {:?} plists", other))),
        }
    }

    pub fn with_root_policy(writer: W, policy: RootPolicy) -> Self {
        Encoder { inner: XmlEncoder::with_root_policy(writer, policy) }
    }

    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), PlistError> {
        self.inner.encode(value)
    }
}
