//! Structural mapping: project a decoded [`Value`] tree onto typed targets.
//!
//! Targets implement [`Project`]. Scalars, `String`, dates, vectors, `Option` and the
//! `String`-keyed maps are covered here; record structs get their implementation from
//! [`plist_record!`](crate::plist_record), which generates a fixed key/field binding table
//! at compile time.
//!
//! ## Policy
//!
//! - Scalar fields are strict: a decoded kind that does not match the field is a
//!   [`PlistError::TypeMismatch`].
//! - Integer fields accept any decoded integer that fits the declared width.
//! - An empty decoded array clears a `Vec` field.
//! - `Vec<u8>` takes a `<data>` blob directly, or an array of small integers.
//! - Maps are replaced wholesale by the decoded dictionary.
//! - Keys missing from the dictionary leave record fields untouched.
//!
//! A failed projection does not roll back: record fields projected before the failing one
//! keep their new values.

use crate::error::PlistError;
use crate::value::{Kind, Value};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// A decode target that can be updated in place from a decoded value.
pub trait Project {
    fn project(&mut self, value: &Value) -> Result<(), PlistError>;
}

/// A type that can be built from one element of a decoded array.
pub trait Element: Sized {
    fn from_element(value: &Value) -> Result<Self, PlistError>;

    /// Build a whole vector from a `<data>` blob. Only byte elements accept this.
    fn from_data(_bytes: &[u8]) -> Option<Vec<Self>> {
        None
    }
}

impl Project for Value {
    fn project(&mut self, value: &Value) -> Result<(), PlistError> {
        *self = value.clone();
        Ok(())
    }
}

impl Element for Value {
    fn from_element(value: &Value) -> Result<Self, PlistError> {
        Ok(value.clone())
    }
}

impl Element for bool {
    fn from_element(value: &Value) -> Result<Self, PlistError> {
        value.as_bool().ok_or_else(|| PlistError::mismatch("boolean", value.kind()))
    }
}

impl Element for String {
    fn from_element(value: &Value) -> Result<Self, PlistError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PlistError::mismatch("string", value.kind()))
    }
}

impl Element for f64 {
    fn from_element(value: &Value) -> Result<Self, PlistError> {
        value.as_f64().ok_or_else(|| PlistError::mismatch("real", value.kind()))
    }
}

impl Element for f32 {
    fn from_element(value: &Value) -> Result<Self, PlistError> {
        let x = value.as_f64().ok_or_else(|| PlistError::mismatch("real", value.kind()))?;
        let narrowed = x as f32;
        if x.is_finite() && !narrowed.is_finite() {
            return Err(PlistError::mismatch(format!("f32 (value {} out of range)", x), Kind::Real));
        }
        Ok(narrowed)
    }
}

impl Element for DateTime<Utc> {
    fn from_element(value: &Value) -> Result<Self, PlistError> {
        value.as_date().copied().ok_or_else(|| PlistError::mismatch("date", value.kind()))
    }
}

macro_rules! integer_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                fn from_element(value: &Value) -> Result<Self, PlistError> {
                    let x = value
                        .as_i64()
                        .ok_or_else(|| PlistError::mismatch(stringify!($t), value.kind()))?;
                    <$t>::try_from(x).map_err(|_| {
                        PlistError::mismatch(format!("{} (value {} out of range)", stringify!($t), x), Kind::Integer)
                    })
                }
            }
        )*
    };
}

integer_element!(i8, i16, i32, i64, isize, u16, u32, u64, usize);

impl Element for u8 {
    fn from_element(value: &Value) -> Result<Self, PlistError> {
        let x = value.as_i64().ok_or_else(|| PlistError::mismatch("u8", value.kind()))?;
        u8::try_from(x)
            .map_err(|_| PlistError::mismatch(format!("u8 (value {} out of range)", x), Kind::Integer))
    }

    fn from_data(bytes: &[u8]) -> Option<Vec<Self>> {
        Some(bytes.to_vec())
    }
}

macro_rules! project_via_element {
    ($($t:ty),*) => {
        $(
            impl Project for $t {
                fn project(&mut self, value: &Value) -> Result<(), PlistError> {
                    *self = <$t as Element>::from_element(value)?;
                    Ok(())
                }
            }
        )*
    };
}

project_via_element!(
    bool, String, f32, f64, DateTime<Utc>, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize
);

impl<T: Element> Element for Vec<T> {
    fn from_element(value: &Value) -> Result<Self, PlistError> {
        match value {
            Value::Array(items) => items.iter().map(T::from_element).collect(),
            Value::Data(bytes) => {
                T::from_data(bytes).ok_or_else(|| PlistError::mismatch("array", Kind::Data))
            }
            other => Err(PlistError::mismatch("array", other.kind())),
        }
    }
}

impl<T: Element> Project for Vec<T> {
    fn project(&mut self, value: &Value) -> Result<(), PlistError> {
        match value {
            Value::Array(items) if items.is_empty() => {
                self.clear();
                Ok(())
            }
            _ => {
                *self = Vec::<T>::from_element(value)?;
                Ok(())
            }
        }
    }
}

impl<T: Project + Default> Project for Option<T> {
    fn project(&mut self, value: &Value) -> Result<(), PlistError> {
        self.get_or_insert_with(T::default).project(value)
    }
}

fn dictionary_of(value: &Value) -> Result<&BTreeMap<String, Value>, PlistError> {
    value
        .as_dictionary()
        .ok_or_else(|| PlistError::mismatch("dictionary", value.kind()))
}

impl Project for BTreeMap<String, Value> {
    fn project(&mut self, value: &Value) -> Result<(), PlistError> {
        *self = dictionary_of(value)?.clone();
        Ok(())
    }
}

impl Element for BTreeMap<String, Value> {
    fn from_element(value: &Value) -> Result<Self, PlistError> {
        Ok(dictionary_of(value)?.clone())
    }
}

impl Project for HashMap<String, Value> {
    fn project(&mut self, value: &Value) -> Result<(), PlistError> {
        *self = Self::from_element(value)?;
        Ok(())
    }
}

impl Element for HashMap<String, Value> {
    fn from_element(value: &Value) -> Result<Self, PlistError> {
        Ok(dictionary_of(value)?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// Bind a struct's fields to plist dictionary keys.
///
/// Implements [`Project`], [`Element`] and [`Encode`](crate::Encode) for the struct.
/// Each entry is `field => binding`, where the binding is:
///
/// - `"key"`: decoded from and encoded under `key`;
/// - `_`: never decoded, encoded under the field's own name;
/// - `-`: never decoded or encoded.
///
/// The struct must implement `Default` (used when it appears inside an array).
///
/// ```
/// use plistcodec::plist_record;
///
/// #[derive(Debug, Default)]
/// struct Entitlements {
///     get_task_allow: bool,
///     scratch: u32,
/// }
///
/// plist_record!(Entitlements {
///     get_task_allow => "get-task-allow",
///     scratch => -,
/// });
/// ```
#[macro_export]
macro_rules! plist_record {
    ($ty:ident { $($field:ident => $binding:tt),* $(,)? }) => {
        impl $crate::Project for $ty {
            fn project(&mut self, value: &$crate::Value) -> ::std::result::Result<(), $crate::PlistError> {
                let dict = value.as_dictionary().ok_or_else(|| $crate::PlistError::TypeMismatch {
                    expected: ::std::string::String::from(stringify!($ty)),
                    found: value.kind(),
                })?;
                $( $crate::__plist_project_field!(self, dict, $field, $binding); )*
                let _ = dict;
                Ok(())
            }
        }

        impl $crate::Element for $ty {
            fn from_element(value: &$crate::Value) -> ::std::result::Result<Self, $crate::PlistError> {
                let mut record = <$ty as ::std::default::Default>::default();
                $crate::Project::project(&mut record, value)?;
                Ok(record)
            }
        }

        impl $crate::Encode for $ty {
            fn kind(&self) -> $crate::Kind {
                $crate::Kind::Dictionary
            }

            fn encode<W: ::std::io::Write>(
                &self,
                enc: &mut $crate::XmlEncoder<W>,
            ) -> ::std::result::Result<(), $crate::PlistError> {
                enc.begin_dict()?;
                $( $crate::__plist_encode_field!(self, enc, $field, $binding); )*
                enc.end_dict()
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __plist_project_field {
    ($self:ident, $dict:ident, $field:ident, -) => {};
    ($self:ident, $dict:ident, $field:ident, _) => {};
    ($self:ident, $dict:ident, $field:ident, $key:literal) => {
        if let Some(v) = $dict.get($key) {
            $crate::Project::project(&mut $self.$field, v)?;
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __plist_encode_field {
    (@emit $self:ident, $enc:ident, $field:ident, $key:expr) => {
        if !$crate::Encode::is_absent(&$self.$field) {
            $enc.key($key)?;
            $crate::Encode::encode(&$self.$field, &mut *$enc)?;
        }
    };
    ($self:ident, $enc:ident, $field:ident, -) => {};
    ($self:ident, $enc:ident, $field:ident, _) => {
        $crate::__plist_encode_field!(@emit $self, $enc, $field, stringify!($field));
    };
    ($self:ident, $enc:ident, $field:ident, $key:literal) => {
        $crate::__plist_encode_field!(@emit $self, $enc, $field, $key);
    };
}
