//! Typed values moved by a single transfer.
//!
//! A closed sum type over the kinds an I/O list item can have. The engines
//! and the codec match on it exhaustively, so adding a kind is a
//! compile-time-checked change.

use serde::{Deserialize, Serialize};

/// One value produced or consumed by a transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Integer(i32),
    Logical(bool),
    Real(f32),
    Double(f64),
    /// Real part, imaginary part.
    Complex(f64, f64),
    Text(String),
}

/// The kind of value a read request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Logical,
    Real,
    Double,
    Complex,
    /// Variable-length text (the whole field or token).
    Text,
    /// Fixed-length character target: short input is blank-padded on the
    /// right; long input keeps its rightmost characters under an `A` field
    /// and its leftmost characters when list-directed.
    FixedText(usize),
}

impl Value {
    /// The kind this value belongs to.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Integer(_) => ValueKind::Integer,
            Self::Logical(_) => ValueKind::Logical,
            Self::Real(_) => ValueKind::Real,
            Self::Double(_) => ValueKind::Double,
            Self::Complex(..) => ValueKind::Complex,
            Self::Text(_) => ValueKind::Text,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_logical(&self) -> Option<bool> {
        match self {
            Self::Logical(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_real(&self) -> Option<f32> {
        match self {
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_complex(&self) -> Option<(f64, f64)> {
        match self {
            Self::Complex(re, im) => Some((*re, *im)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl ValueKind {
    /// Short name used in diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Logical => "logical",
            Self::Real => "real",
            Self::Double => "double precision",
            Self::Complex => "complex",
            Self::Text | Self::FixedText(_) => "character",
        }
    }

    /// True for the floating kinds that accept F/E/D edit descriptors.
    #[must_use]
    pub fn is_floating(self) -> bool {
        matches!(self, Self::Real | Self::Double | Self::Complex)
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
