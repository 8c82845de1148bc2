//! # plistcodec: property list codec
//!
//! Decodes old-style ASCII and XML property lists into a [`Value`] tree or straight onto typed
//! targets, and encodes native Rust values as XML plists.
//!
//! ## Layers
//!
//! - [`scanner`] / [`ascii`]: ASCII tokens and recursive-descent parser
//! - [`xml`]: XML parser with preamble validation ([`Mode::Permissive`] or [`Mode::Strict`])
//! - [`mapper`]: projection of a decoded tree onto targets ([`Project`], [`plist_record!`])
//! - [`encoder`]: XML writer driven by the [`Encode`] trait
//! - [`format`]: prefix sniffing and dispatch ([`Decoder`], [`Encoder`])
//!
//! ## Example
//!
//! ```
//! use plistcodec::plist_record;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Profile {
//!     name: String,
//!     get_task_allow: bool,
//! }
//!
//! plist_record!(Profile {
//!     name => "Name",
//!     get_task_allow => "get-task-allow",
//! });
//!
//! let profile = Profile { name: "dev".into(), get_task_allow: true };
//! let bytes = plistcodec::to_vec(&profile).unwrap();
//! let mut back = Profile::default();
//! plistcodec::from_slice(&bytes, &mut back).unwrap();
//! assert_eq!(back, profile);
//! ```

pub mod ascii;
pub mod dump;
pub mod encoder;
pub mod error;
pub mod format;
pub mod mapper;
pub mod scanner;
pub mod value;
pub mod xml;

pub use ascii::AsciiDecoder;
pub use encoder::{Encode, RootPolicy, XmlEncoder};
pub use error::PlistError;
pub use format::{detect, Decoder, Encoder, Format};
pub use mapper::{Element, Project};
pub use value::{Kind, Value};
pub use xml::{Mode, XmlDecoder};

use std::io::{Read, Write};

/// Decode a plist of any supported dialect held in memory and project it onto `target`.
pub fn from_slice<T: Project + ?Sized>(bytes: &[u8], target: &mut T) -> Result<(), PlistError> {
    Decoder::new(bytes).decode(target)
}

/// Decode a plist of any supported dialect from `reader` and project it onto `target`.
pub fn from_reader<R: Read, T: Project + ?Sized>(reader: R, target: &mut T) -> Result<(), PlistError> {
    Decoder::new(reader).decode(target)
}

/// Decode a plist of any supported dialect into a [`Value`]. `None` for an empty XML `<plist>`.
pub fn value_from_slice(bytes: &[u8]) -> Result<Option<Value>, PlistError> {
    Decoder::new(bytes).decode_value()
}

/// Encode `value` as an XML plist.
pub fn to_vec<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>, PlistError> {
    encoder::to_vec(value)
}

/// Encode `value` as an XML plist into `writer`. The writer is flushed, not closed.
pub fn to_writer<W: Write, T: Encode + ?Sized>(writer: W, value: &T) -> Result<(), PlistError> {
    Encoder::new(writer).encode(value)
}
