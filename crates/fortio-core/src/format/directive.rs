//! Directive shapes consumed by the read and write engines.

use crate::value::ValueKind;

/// Data edit descriptor letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditLetter {
    /// Integer.
    I,
    /// Fixed-point real.
    F,
    /// Exponential real.
    E,
    /// Exponential real with a `D` exponent letter.
    D,
    /// Character.
    A,
    /// Logical.
    L,
    /// Generalized: any kind.
    G,
}

impl EditLetter {
    /// Parse a descriptor letter (case-insensitive).
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b.to_ascii_uppercase() {
            b'I' => Self::I,
            b'F' => Self::F,
            b'E' => Self::E,
            b'D' => Self::D,
            b'A' => Self::A,
            b'L' => Self::L,
            b'G' => Self::G,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::I => 'I',
            Self::F => 'F',
            Self::E => 'E',
            Self::D => 'D',
            Self::A => 'A',
            Self::L => 'L',
            Self::G => 'G',
        }
    }

    /// Whether this descriptor may transfer an item of `kind`.
    #[must_use]
    pub fn accepts(self, kind: ValueKind) -> bool {
        match self {
            Self::I => matches!(kind, ValueKind::Integer),
            Self::F | Self::E | Self::D => kind.is_floating(),
            Self::A => matches!(kind, ValueKind::Text | ValueKind::FixedText(_)),
            Self::L => matches!(kind, ValueKind::Logical),
            Self::G => true,
        }
    }
}

impl std::fmt::Display for EditLetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A data edit descriptor: `Xw[.d]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub letter: EditLetter,
    /// Field width; `<= 0` selects free-form scanning/rendering.
    pub width: i32,
    /// Decimal places (F/E/D/G) or minimum digits (I).
    pub decimals: Option<u32>,
}

impl FieldSpec {
    #[must_use]
    pub const fn new(letter: EditLetter, width: i32, decimals: Option<u32>) -> Self {
        Self {
            letter,
            width,
            decimals,
        }
    }

    /// Positive width, if any.
    #[must_use]
    pub fn fixed_width(&self) -> Option<usize> {
        usize::try_from(self.width).ok().filter(|&w| w > 0)
    }
}

/// Cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// `nX`, `TRn` (positive) and `TLn` (negative).
    Relative(i32),
    /// `Tn`: 1-based column.
    Absolute(usize),
}

/// One parsed format token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Field(FieldSpec),
    Position(Move),
    Literal(String),
    EndOfRecord,
    /// Suppress the end-of-record advance for this record.
    NoAdvance,
}

/// Ordered, restartable source of directives for one statement.
pub trait DirectiveStream {
    /// Next directive, or `None` once the stream is exhausted.
    fn next_directive(&mut self) -> Option<Directive>;

    /// Restart from the first directive.
    fn reset(&mut self);

    /// True when [`DirectiveStream::next_directive`] would return `None`.
    fn is_exhausted(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_parse_case_insensitively() {
        assert_eq!(EditLetter::from_byte(b'i'), Some(EditLetter::I));
        assert_eq!(EditLetter::from_byte(b'G'), Some(EditLetter::G));
        assert_eq!(EditLetter::from_byte(b'Z'), None);
    }

    #[test]
    fn descriptor_kind_compatibility() {
        assert!(EditLetter::I.accepts(ValueKind::Integer));
        assert!(!EditLetter::I.accepts(ValueKind::Real));
        assert!(EditLetter::D.accepts(ValueKind::Complex));
        assert!(EditLetter::A.accepts(ValueKind::FixedText(4)));
        assert!(!EditLetter::L.accepts(ValueKind::Text));
        assert!(EditLetter::G.accepts(ValueKind::Logical));
    }

    #[test]
    fn non_positive_width_is_free_form() {
        assert_eq!(FieldSpec::new(EditLetter::A, 0, None).fixed_width(), None);
        assert_eq!(FieldSpec::new(EditLetter::I, -3, None).fixed_width(), None);
        assert_eq!(FieldSpec::new(EditLetter::I, 5, None).fixed_width(), Some(5));
    }
}
