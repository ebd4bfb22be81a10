//! Leaf values stored at the ends of a form's value trees.
//!
//! Both structures share this leaf type so that equality of field values is
//! decided the same way regardless of how the containers above them are
//! represented.

use std::fmt;

use serde_json::{Number, Value as JsonValue};

/// A terminal value in a form tree.
///
/// `Scalar` mirrors the non-container half of JSON. Containers (maps and
/// lists) belong to the structure that holds the scalars.
///
/// # Direct Comparisons
///
/// ```
/// # use formstate::structure::Scalar;
/// let text = Scalar::from("hello");
/// assert!(text == "hello");
/// assert!(Scalar::Int(42) == 42);
/// assert!(!(text == 42));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Present, but without a value. Also used to pad vivified list slots.
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text string value
    Text(String),
}

impl Scalar {
    /// Returns true for values that count as "nothing entered": `null` and `""`.
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns true if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Text(_) => "text",
        }
    }

    /// Attempts to convert to a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to convert to an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to convert to a string
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts a non-container JSON value. Returns `None` for arrays and objects.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => Some(Scalar::Null),
            JsonValue::Bool(b) => Some(Scalar::Bool(*b)),
            JsonValue::Number(n) => Some(match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            JsonValue::String(s) => Some(Scalar::Text(s.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    /// Converts to JSON. Non-finite floats have no JSON form and become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Scalar::Null => JsonValue::Null,
            Scalar::Bool(b) => JsonValue::Bool(*b),
            Scalar::Int(n) => JsonValue::Number((*n).into()),
            Scalar::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Scalar::Text(s) => JsonValue::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Float(n) => write!(f, "{n}"),
            Scalar::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value as i64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl PartialEq<str> for Scalar {
    fn eq(&self, other: &str) -> bool {
        matches!(self, Scalar::Text(s) if s == other)
    }
}

impl PartialEq<&str> for Scalar {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<i64> for Scalar {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, Scalar::Int(n) if n == other)
    }
}

impl PartialEq<i32> for Scalar {
    fn eq(&self, other: &i32) -> bool {
        matches!(self, Scalar::Int(n) if *n == *other as i64)
    }
}

impl PartialEq<bool> for Scalar {
    fn eq(&self, other: &bool) -> bool {
        matches!(self, Scalar::Bool(b) if b == other)
    }
}

impl PartialEq<Scalar> for &str {
    fn eq(&self, other: &Scalar) -> bool {
        other == self
    }
}

impl PartialEq<Scalar> for i64 {
    fn eq(&self, other: &Scalar) -> bool {
        other == self
    }
}

impl PartialEq<Scalar> for bool {
    fn eq(&self, other: &Scalar) -> bool {
        other == self
    }
}
