//! Token scanner for the old-style ASCII plist dialect.
//!
//! Pulls one byte at a time from the reader and keeps a small pushback stack so a bare
//! string can return the byte that terminated it.

use crate::error::PlistError;
use byteorder::ReadBytesExt;
use std::fmt;
use std::io::{ErrorKind, Read};

/// Lexical token of the ASCII dialect. Tokens carry no position.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    CurlyOpen,
    CurlyClose,
    ParenOpen,
    ParenClose,
    Comma,
    Semicolon,
    Equal,
    /// Quoted or bare string.
    String(String),
    /// `<hex digits>` block, already decoded.
    Data(Vec<u8>),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::CurlyOpen => f.write_str("'{'"),
            Token::CurlyClose => f.write_str("'}'"),
            Token::ParenOpen => f.write_str("'('"),
            Token::ParenClose => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::Semicolon => f.write_str("';'"),
            Token::Equal => f.write_str("'='"),
            Token::String(s) => write!(f, "string {:?}", s),
            Token::Data(b) => write!(f, "data ({} bytes)", b.len()),
        }
    }
}

pub struct Scanner<R> {
    reader: R,
    pushback: Vec<u8>,
}

impl<R: Read> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Scanner { reader, pushback: Vec::new() }
    }

    /// Next token, or [`PlistError::EndOfStream`] once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Token, PlistError> {
        loop {
            let c = self.getch()?;
            match c {
                b'{' => return Ok(Token::CurlyOpen),
                b'}' => return Ok(Token::CurlyClose),
                b'(' => return Ok(Token::ParenOpen),
                b')' => return Ok(Token::ParenClose),
                b';' => return Ok(Token::Semicolon),
                b',' => return Ok(Token::Comma),
                b'=' => return Ok(Token::Equal),
                b' ' | b'\t' | b'\n' | b'\r' => continue,
                b'"' => return self.scan_quoted_string(),
                b'<' => return self.scan_data(),
                c if c.is_ascii_alphanumeric() => return self.scan_bare_string(c),
                c => {
                    return Err(PlistError::lexical(format!(
                        "bad character {:?} (0x{:02x})",
                        c as char, c
                    )))
                }
            }
        }
    }

    fn getch(&mut self) -> Result<u8, PlistError> {
        if let Some(c) = self.pushback.pop() {
            return Ok(c);
        }
        match self.reader.read_u8() {
            Ok(c) => Ok(c),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(PlistError::EndOfStream),
            Err(e) => Err(PlistError::Io(e)),
        }
    }

    fn putch(&mut self, c: u8) {
        self.pushback.push(c);
    }

    fn scan_quoted_string(&mut self) -> Result<Token, PlistError> {
        let mut buf = Vec::new();
        loop {
            let c = self.getch().map_err(|e| e.inside("quoted string"))?;
            match c {
                b'"' => break,
                b'\\' => {
                    let escaped = self.getch().map_err(|e| e.inside("quoted string"))?;
                    if escaped != b'"' {
                        return Err(PlistError::lexical(format!(
                            "bad escape sequence \\{}",
                            escaped as char
                        )));
                    }
                    buf.push(escaped);
                }
                c => buf.push(c),
            }
        }
        let s = String::from_utf8(buf)
            .map_err(|e| PlistError::lexical(format!("quoted string is not UTF-8: {}", e)))?;
        Ok(Token::String(s))
    }

    fn scan_data(&mut self) -> Result<Token, PlistError> {
        let mut digits = Vec::new();
        loop {
            let c = self.getch().map_err(|e| e.inside("data block"))?;
            match c {
                b'>' => break,
                b' ' => continue,
                c if c.is_ascii_hexdigit() => digits.push(c),
                c => {
                    return Err(PlistError::lexical(format!(
                        "non-hex character {:?} in data block",
                        c as char
                    )))
                }
            }
        }
        if digits.len() % 2 != 0 {
            return Err(PlistError::lexical(format!(
                "data block has an odd number of hex digits ({})",
                digits.len()
            )));
        }
        let data = digits
            .chunks(2)
            .map(|pair| (hex_val(pair[0]) << 4) | hex_val(pair[1]))
            .collect();
        Ok(Token::Data(data))
    }

    fn scan_bare_string(&mut self, first: u8) -> Result<Token, PlistError> {
        let mut buf = vec![first];
        loop {
            match self.getch() {
                Ok(c) if c.is_ascii_alphanumeric() => buf.push(c),
                Ok(c) => {
                    self.putch(c);
                    break;
                }
                Err(PlistError::EndOfStream) => break,
                Err(e) => return Err(e),
            }
        }
        // Only ASCII alphanumerics were collected.
        Ok(Token::String(buf.into_iter().map(char::from).collect()))
    }
}

fn hex_val(c: u8) -> u8 {
    match c {
        b'a'..=b'f' => 10 + c - b'a',
        b'A'..=b'F' => 10 + c - b'A',
        _ => c - b'0',
    }
}
