//! # Core Utilities

use serde::{Deserialize, Serialize};

/// `Kind` allows serde to serialize/deserialize a string or an object.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Kind<T> {
    /// Simple string value.
    String(String),

    /// Complex object value.
    Object(T),
}

impl<T> Default for Kind<T> {
    fn default() -> Self {
        Self::String(String::new())
    }
}

impl<T> From<String> for Kind<T> {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T> Kind<T> {
    /// Returns the string value, if this is a `String` variant.
    pub const fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            Self::Object(_) => None,
        }
    }

    /// Returns the object value, if this is an `Object` variant.
    pub const fn as_object(&self) -> Option<&T> {
        match self {
            Self::String(_) => None,
            Self::Object(o) => Some(o),
        }
    }
}

/// `OneMany` allows serde to serialize/deserialize a single object or a set
/// of objects, matching the `aud`/`credentialSchema`/`type` shapes used
/// throughout the JOSE and verifiable-credentials data model.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneMany<T> {
    /// Single object.
    One(T),

    /// Set of objects.
    Many(Vec<T>),
}

impl<T: Default> Default for OneMany<T> {
    fn default() -> Self {
        Self::One(T::default())
    }
}

impl<T> From<T> for OneMany<T> {
    fn from(value: T) -> Self {
        Self::One(value)
    }
}

impl<T> OneMany<T> {
    /// Returns the single object, if this is a `One` variant.
    pub const fn as_one(&self) -> Option<&T> {
        match self {
            Self::One(o) => Some(o),
            Self::Many(_) => None,
        }
    }

    /// Returns the set of objects, if this is a `Many` variant.
    pub const fn as_many(&self) -> Option<&[T]> {
        match self {
            Self::One(_) => None,
            Self::Many(m) => Some(m.as_slice()),
        }
    }

    /// Iterates over the contained values, whether one or many.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        match self {
            Self::One(o) => std::slice::from_ref(o).iter(),
            Self::Many(m) => m.iter(),
        }
    }
}
