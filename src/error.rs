//! Error type shared by the scanner, parsers, mapper and encoder.

use crate::value::Kind;

#[derive(Debug, thiserror::Error)]
pub enum PlistError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Lexical: {0}")]
    Lexical(String),
    #[error("Structure: {0}")]
    Structure(String),
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: Kind },
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Input exhausted between tokens. Only surfaces to callers when the
    /// stream ends before a root value starts.
    #[error("end of stream")]
    EndOfStream,
}

impl PlistError {
    pub(crate) fn lexical(msg: impl Into<String>) -> Self {
        PlistError::Lexical(msg.into())
    }

    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        PlistError::Structure(msg.into())
    }

    pub(crate) fn mismatch(expected: impl Into<String>, found: Kind) -> Self {
        PlistError::TypeMismatch { expected: expected.into(), found }
    }

    /// Turn end-of-stream met inside a structure into a grammar error.
    pub(crate) fn inside(self, what: &str) -> Self {
        match self {
            PlistError::EndOfStream => PlistError::Structure(format!("unexpected end of stream in {}", what)),
            e => e,
        }
    }
}
