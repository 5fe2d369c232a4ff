//! The "unavailable" field sentinel.
//!
//! Sites do not expose every field to every extraction strategy. A
//! field the current strategy could not populate is marked
//! [`Field::Unavailable`] rather than omitted, so downstream consumers
//! can distinguish "not present on the site" from "not attempted".

use serde::{Serialize, Serializer};

/// An extracted field that is either present or explicitly unavailable.
///
/// Serializes `Present(v)` transparently as `v` and `Unavailable` as
/// the string `"unavailable"`, never `null` and never omitted.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Field<T> {
    /// The strategy populated this field.
    Present(T),

    /// The strategy could not populate this field.
    #[default]
    Unavailable,
}

impl<T> Field<T> {
    /// Wrap a value.
    pub fn present(value: T) -> Self {
        Field::Present(value)
    }

    /// True if a value is present.
    pub fn is_present(&self) -> bool {
        matches!(self, Field::Present(_))
    }

    /// True if the field is the unavailable sentinel.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Field::Unavailable)
    }

    /// Borrow the inner value if present.
    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Field::Present(v) => Field::Present(v),
            Field::Unavailable => Field::Unavailable,
        }
    }

    /// Convert into an `Option`, discarding the sentinel distinction.
    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Present(v) => Some(v),
            Field::Unavailable => None,
        }
    }

    /// Map the present value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Field<U> {
        match self {
            Field::Present(v) => Field::Present(f(v)),
            Field::Unavailable => Field::Unavailable,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Present(v),
            None => Field::Unavailable,
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Field::Present(v) => v.serialize(serializer),
            Field::Unavailable => serializer.serialize_str("unavailable"),
        }
    }
}
