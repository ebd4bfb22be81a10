//! Field names and the paths they parse into.
//!
//! A field name such as `"contact.phones[2].number"` addresses a leaf inside a
//! form's value tree. [`FieldPath`] is the parsed form: an ordered sequence of
//! [`Segment`]s, each either an object key or a list index.
//!
//! # Grammar
//!
//! - A name starts with a key: `"user"`.
//! - `.key` descends into a map: `"user.name"`.
//! - `[n]` descends into a list: `"users[0]"`.
//! - `[]` appends to a list. It is only meaningful as a write target and
//!   only as the final segment: `"tags[]"`.
//!
//! Brackets always mean list indices and dots always mean map keys, so a key
//! that looks numeric (`"codes.404"`) is still a map key.
//!
//! ```rust
//! use formstate::path::{FieldPath, Segment};
//!
//! let path = FieldPath::parse("users[1].name")?;
//! assert_eq!(
//!     path.segments(),
//!     &[Segment::key("users"), Segment::Index(1), Segment::key("name")]
//! );
//! assert_eq!(path.to_string(), "users[1].name");
//! # Ok::<(), formstate::path::PathError>(())
//! ```

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Error type for field names that cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PathError {
    /// The field name is malformed.
    #[error("Invalid field path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl PathError {
    fn invalid(path: &str, reason: impl Into<String>) -> Self {
        PathError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// The offending field name.
    pub fn path(&self) -> &str {
        match self {
            PathError::InvalidPath { path, .. } => path,
        }
    }
}

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Named child of a map node.
    Key(String),
    /// Positional child of a list node.
    Index(usize),
    /// One past the end of a list node; write-only.
    Append,
}

impl Segment {
    /// Shorthand for `Segment::Key(key.into())`.
    pub fn key(key: impl Into<String>) -> Self {
        Segment::Key(key.into())
    }

    /// Returns true if this segment addresses a list position.
    ///
    /// Used when vivifying a missing node: the kind of the node is decided by
    /// the segment that will address into it.
    pub fn is_positional(&self) -> bool {
        matches!(self, Segment::Index(_) | Segment::Append)
    }

    /// Returns the key if this is a map segment.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(key) => Some(key),
            _ => None,
        }
    }

    /// Returns the index if this is a concrete list segment.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(index) => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{key}"),
            Segment::Index(index) => write!(f, "[{index}]"),
            Segment::Append => write!(f, "[]"),
        }
    }
}

/// A parsed field name.
///
/// The empty path addresses the root of a tree. It is never produced by
/// [`FieldPath::parse`] but is available through [`FieldPath::root`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The empty path, addressing a whole tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a field name into its segments.
    ///
    /// # Errors
    /// Returns [`PathError::InvalidPath`] for empty names, empty key
    /// components, unbalanced brackets, non-numeric indices, and `[]`
    /// anywhere but the end.
    pub fn parse(name: &str) -> Result<Self, PathError> {
        let path = FieldPath {
            segments: parse_segments(name)?,
        };
        path.check_append(name)?;
        Ok(path)
    }

    fn check_append(&self, name: &str) -> Result<(), PathError> {
        let last = self.segments.len().saturating_sub(1);
        if self
            .segments
            .iter()
            .enumerate()
            .any(|(i, segment)| *segment == Segment::Append && i != last)
        {
            return Err(PathError::invalid(
                name,
                "'[]' is only allowed as the last segment",
            ));
        }
        Ok(())
    }

    /// Builds a path from raw segments.
    ///
    /// # Errors
    /// Fails if a key is empty or contains path syntax, or if `Append` is not last.
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self, PathError> {
        let path = FieldPath { segments };
        for segment in &path.segments {
            if let Segment::Key(key) = segment {
                validate_key(&path.to_string(), key)?;
            }
        }
        path.check_append(&path.to_string())?;
        Ok(path)
    }

    /// Serializes segments back into a field name.
    pub fn join(segments: &[Segment]) -> String {
        let mut out = String::new();
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 && matches!(segment, Segment::Key(_)) {
                out.push('.');
            }
            out.push_str(&segment.to_string());
        }
        out
    }

    /// Returns the segments of this path.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the last segment, or `None` for the root.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Returns the parent path, or `None` for the root.
    pub fn parent(&self) -> Option<FieldPath> {
        if self.segments.is_empty() {
            None
        } else {
            Some(FieldPath {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// Returns true if `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Returns true if the path contains an append segment.
    pub fn is_write_only(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Append))
    }

    /// Appends a map key.
    ///
    /// # Errors
    /// Fails if the key is empty or contains `.`, `[` or `]`, or if this
    /// path already ends in `[]`.
    pub fn push_key(mut self, key: impl Into<String>) -> Result<Self, PathError> {
        let key = key.into();
        validate_key(&key, &key)?;
        if self.is_write_only() {
            return Err(PathError::invalid(
                &self.to_string(),
                "cannot extend a path ending in '[]'",
            ));
        }
        self.segments.push(Segment::Key(key));
        Ok(self)
    }

    /// Appends a list index.
    pub fn push_index(mut self, index: usize) -> Self {
        if self.is_write_only() {
            self.segments.pop();
        }
        self.segments.push(Segment::Index(index));
        self
    }

    /// Returns a new path with `key` appended, for keys known to be valid.
    pub(crate) fn with_key(&self, key: &str) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        FieldPath { segments }
    }
}

fn parse_segments(name: &str) -> Result<Vec<Segment>, PathError> {
    if name.is_empty() {
        return Err(PathError::invalid(name, "field name is empty"));
    }

    let bytes = name.as_bytes();
    let mut segments = Vec::new();
    let mut pos = 0;

    loop {
        let start = pos;
        while pos < bytes.len() && !matches!(bytes[pos], b'.' | b'[' | b']') {
            pos += 1;
        }
        if pos == start {
            let reason = if pos < bytes.len() && bytes[pos] == b'[' && segments.is_empty() {
                "field name must start with a key"
            } else {
                "empty key component"
            };
            return Err(PathError::invalid(name, reason));
        }
        segments.push(Segment::Key(name[start..pos].to_string()));

        while pos < bytes.len() && bytes[pos] == b'[' {
            let close = name[pos + 1..]
                .find(']')
                .map(|offset| pos + 1 + offset)
                .ok_or_else(|| PathError::invalid(name, "unclosed '['"))?;
            let inner = &name[pos + 1..close];
            if inner.is_empty() {
                segments.push(Segment::Append);
            } else if inner.bytes().all(|b| b.is_ascii_digit()) {
                let index = inner.parse::<usize>().map_err(|_| {
                    PathError::invalid(name, format!("index '{inner}' is out of range"))
                })?;
                segments.push(Segment::Index(index));
            } else {
                return Err(PathError::invalid(
                    name,
                    format!("non-numeric index '{inner}'"),
                ));
            }
            pos = close + 1;
        }

        if pos == bytes.len() {
            break;
        }
        match bytes[pos] {
            b'.' => pos += 1,
            b']' => return Err(PathError::invalid(name, "unbalanced ']'")),
            _ => return Err(PathError::invalid(name, "unexpected character after ']'")),
        }
    }
    Ok(segments)
}

fn validate_key(path: &str, key: &str) -> Result<(), PathError> {
    if key.is_empty() {
        return Err(PathError::invalid(path, "empty key component"));
    }
    if key.contains(['.', '[', ']']) {
        return Err(PathError::invalid(
            path,
            format!("key '{key}' contains path syntax"),
        ));
    }
    Ok(())
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::join(&self.segments))
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = PathError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl AsRef<[Segment]> for FieldPath {
    fn as_ref(&self) -> &[Segment] {
        &self.segments
    }
}

impl serde::Serialize for FieldPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for FieldPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        FieldPath::parse(&name).map_err(serde::de::Error::custom)
    }
}

/// A field name in which list positions match any index.
///
/// `items[].name` and `items[0].name` both match `items[3].name`. Patterns
/// accept `[]` in any position since they are never written through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPattern {
    segments: Vec<Segment>,
}

impl FieldPattern {
    /// Parses a pattern with the same syntax as [`FieldPath::parse`].
    pub fn parse(pattern: &str) -> Result<Self, PathError> {
        Ok(FieldPattern {
            segments: parse_segments(pattern)?,
        })
    }

    /// Returns true if `path` has the same keys at the same depths, with any
    /// index wherever the pattern has a list position.
    pub fn matches(&self, path: &FieldPath) -> bool {
        self.segments.len() == path.segments.len()
            && self
                .segments
                .iter()
                .zip(&path.segments)
                .all(|(pattern, segment)| match (pattern, segment) {
                    (Segment::Key(a), Segment::Key(b)) => a == b,
                    (a, b) => a.is_positional() && b.is_positional(),
                })
    }
}

impl fmt::Display for FieldPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", FieldPath::join(&self.segments))
    }
}

impl FromStr for FieldPattern {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<FieldPath> for FieldPattern {
    fn from(path: FieldPath) -> Self {
        FieldPattern {
            segments: path.segments,
        }
    }
}

impl serde::Serialize for FieldPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for FieldPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        FieldPattern::parse(&pattern).map_err(serde::de::Error::custom)
    }
}
