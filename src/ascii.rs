//! Recursive-descent parser for the old-style ASCII plist dialect.
//!
//! ```text
//! root  := array | dict
//! array := '(' [ elem (',' elem)* [','] ] ')'
//! dict  := '{' (string '=' elem ';')* '}'
//! elem  := array | dict | string | data
//! ```
//!
//! The dialect has no numeric or boolean types: every scalar decodes to [`Value::String`]
//! or [`Value::Data`]. Containers nest at most [`MAX_DEPTH`] levels, and nothing but
//! whitespace may follow the root.

use crate::error::PlistError;
use crate::mapper::Project;
use crate::scanner::{Scanner, Token};
use crate::value::{Value, MAX_DEPTH};
use std::collections::BTreeMap;
use std::io::Read;

pub struct AsciiDecoder<R> {
    scanner: Scanner<R>,
    depth: usize,
}

impl<R: Read> AsciiDecoder<R> {
    pub fn new(reader: R) -> Self {
        AsciiDecoder { scanner: Scanner::new(reader), depth: 0 }
    }

    /// Decode one root array or dictionary.
    pub fn decode_value(&mut self) -> Result<Value, PlistError> {
        let root = match self.scanner.next_token()? {
            Token::ParenOpen => self.read_array()?,
            Token::CurlyOpen => self.read_dict()?,
            other => {
                return Err(PlistError::structure(format!(
                    "root must be an array or dictionary, found {}",
                    other
                )))
            }
        };
        match self.scanner.next_token() {
            Err(PlistError::EndOfStream) => {}
            Ok(tok) => {
                return Err(PlistError::structure(format!("unexpected {} after the root value", tok)))
            }
            Err(e) => return Err(e),
        }
        log::trace!("ascii plist root: {}", root.kind());
        Ok(root)
    }

    pub fn decode<T: Project + ?Sized>(&mut self, target: &mut T) -> Result<(), PlistError> {
        let value = self.decode_value()?;
        target.project(&value)
    }

    fn enter(&mut self) -> Result<(), PlistError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(PlistError::structure(format!("nesting too deep (limit {})", MAX_DEPTH)));
        }
        Ok(())
    }

    fn next(&mut self, what: &str) -> Result<Token, PlistError> {
        self.scanner.next_token().map_err(|e| e.inside(what))
    }

    fn read_element(&mut self, tok: Token, what: &str) -> Result<Value, PlistError> {
        match tok {
            Token::ParenOpen => self.read_array(),
            Token::CurlyOpen => self.read_dict(),
            Token::String(s) => Ok(Value::String(s)),
            Token::Data(b) => Ok(Value::Data(b)),
            other => Err(PlistError::structure(format!("bad {} {}", what, other))),
        }
    }

    fn read_array(&mut self) -> Result<Value, PlistError> {
        self.enter()?;
        let mut items = Vec::new();
        let mut tok = self.next("array")?;
        loop {
            if tok == Token::ParenClose {
                break;
            }
            items.push(self.read_element(tok, "array element")?);
            match self.next("array")? {
                Token::Comma => tok = self.next("array")?,
                Token::ParenClose => break,
                other => {
                    return Err(PlistError::structure(format!(
                        "expected ',' or ')' in array, found {}",
                        other
                    )))
                }
            }
        }
        self.depth -= 1;
        Ok(Value::Array(items))
    }

    fn read_dict(&mut self) -> Result<Value, PlistError> {
        self.enter()?;
        let mut map = BTreeMap::new();
        loop {
            let key = match self.next("dictionary")? {
                Token::CurlyClose => break,
                Token::String(s) => s,
                other => return Err(PlistError::structure(format!("bad dictionary key {}", other))),
            };
            match self.next("dictionary")? {
                Token::Equal => {}
                other => {
                    return Err(PlistError::structure(format!(
                        "expected '=' after key {:?}, found {}",
                        key, other
                    )))
                }
            }
            let tok = self.next("dictionary")?;
            let value = self.read_element(tok, "dictionary value")?;
            match self.next("dictionary")? {
                Token::Semicolon => {}
                other => {
                    return Err(PlistError::structure(format!(
                        "expected ';' after value of {:?}, found {}",
                        key, other
                    )))
                }
            }
            map.insert(key, value);
        }
        self.depth -= 1;
        Ok(Value::Dictionary(map))
    }
}

/// Decode an ASCII plist held in memory and project it onto `target`.
pub fn from_slice<T: Project + ?Sized>(bytes: &[u8], target: &mut T) -> Result<(), PlistError> {
    AsciiDecoder::new(bytes).decode(target)
}

/// Decode an ASCII plist held in memory into a [`Value`].
pub fn value_from_slice(bytes: &[u8]) -> Result<Value, PlistError> {
    AsciiDecoder::new(bytes).decode_value()
}
