//! Attribute values
//!
//! A value is an immutable scalar. Every value renders as a string; integer
//! projection parses strings as base-10.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Integer value
    Int(i64),
    /// String value
    String(String),
}

impl AttributeValue {
    /// Creates a string value
    pub fn string(v: impl Into<String>) -> Self {
        AttributeValue::String(v.into())
    }

    /// Creates an integer value
    pub fn int(v: i64) -> Self {
        AttributeValue::Int(v)
    }

    /// Renders the value as a string
    pub fn rendered(&self) -> String {
        match self {
            AttributeValue::Int(v) => v.to_string(),
            AttributeValue::String(s) => s.clone(),
        }
    }

    /// Projects the value as an integer.
    ///
    /// Strings are parsed as base-10; anything else yields `None`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::String(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}
