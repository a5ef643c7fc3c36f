//! # Belief Content
//!
//! Belief content is arbitrary nested data. It is modelled as a closed
//! tagged union so that two values can be compared both for equality and for
//! *structural shape*: the value with every scalar leaf replaced by a
//! placeholder, keeping container shape and record keys.
//!
//! ```text
//! (temperature, room1, 22)  shape ─→ (_, _, _)
//! (temperature, room1, 25)  shape ─→ (_, _, _)   same shape, different value
//! {reading: 22}             shape ─→ {reading: _}
//! ```
//!
//! Two atoms whose contents share a shape but differ in value are in
//! *structural conflict*.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar leaf inside belief content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// An interned label such as `specialization_pattern` or `valid`.
    Symbol(String),
}

/// Arbitrary nested belief content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BeliefContent {
    /// A single scalar value.
    Atomic(Scalar),
    /// An ordered sequence (lists and tuples).
    Sequence(Vec<BeliefContent>),
    /// A keyed record; keys are ordered for deterministic comparison.
    Record(BTreeMap<String, BeliefContent>),
}

/// The structural shape of a [`BeliefContent`] value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentShape {
    Leaf,
    Sequence(Vec<ContentShape>),
    Record(BTreeMap<String, ContentShape>),
}

impl BeliefContent {
    pub fn null() -> Self {
        Self::Atomic(Scalar::Null)
    }

    pub fn symbol(label: impl Into<String>) -> Self {
        Self::Atomic(Scalar::Symbol(label.into()))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Atomic(Scalar::Text(value.into()))
    }

    pub fn int(value: i64) -> Self {
        Self::Atomic(Scalar::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::Atomic(Scalar::Float(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::Atomic(Scalar::Bool(value))
    }

    /// Builds a tuple-like sequence.
    pub fn tuple(items: impl IntoIterator<Item = BeliefContent>) -> Self {
        Self::Sequence(items.into_iter().collect())
    }

    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, BeliefContent)>) -> Self {
        Self::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the float value of a numeric scalar.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Atomic(Scalar::Float(v)) => Some(*v),
            Self::Atomic(Scalar::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Atomic(Scalar::Symbol(s)) | Self::Atomic(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&BTreeMap<String, BeliefContent>> {
        match self {
            Self::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Computes the structural shape of this value.
    pub fn shape(&self) -> ContentShape {
        match self {
            Self::Atomic(_) => ContentShape::Leaf,
            Self::Sequence(items) => ContentShape::Sequence(items.iter().map(Self::shape).collect()),
            Self::Record(fields) => ContentShape::Record(
                fields.iter().map(|(k, v)| (k.clone(), v.shape())).collect(),
            ),
        }
    }

    /// Shape comparison without materialising either shape.
    pub fn same_shape(&self, other: &BeliefContent) -> bool {
        match (self, other) {
            (Self::Atomic(_), Self::Atomic(_)) => true,
            (Self::Sequence(a), Self::Sequence(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_shape(y))
            }
            (Self::Record(a), Self::Record(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.same_shape(vb))
            }
            _ => false,
        }
    }

    /// Same shape, different value.
    pub fn conflicts_with(&self, other: &BeliefContent) -> bool {
        self != other && self.same_shape(other)
    }
}

impl From<&str> for BeliefContent {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for BeliefContent {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<i64> for BeliefContent {
    fn from(value: i64) -> Self {
        Self::int(value)
    }
}

impl From<f64> for BeliefContent {
    fn from(value: f64) -> Self {
        Self::float(value)
    }
}

impl From<bool> for BeliefContent {
    fn from(value: bool) -> Self {
        Self::bool(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("nil"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(v) => write!(f, "{v:?}"),
            Scalar::Symbol(v) => write!(f, ":{v}"),
        }
    }
}

impl fmt::Display for BeliefContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atomic(s) => write!(f, "{s}"),
            Self::Sequence(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Record(fields) => {
                f.write_str("{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}
