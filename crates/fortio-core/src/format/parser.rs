//! Format literal parser.
//!
//! Turns a literal such as `(I5, 2(F6.2, 1X), 'done', /)` into a flat
//! directive list. Repeat counts on descriptors and groups are expanded at
//! parse time, so the cursor is a plain index into the list.
//!
//! Accepted tokens:
//! - `[r]Xw[.d]` data descriptors, `X` in `I F E D A L G`
//! - `nX`, `Tn`, `TLn`, `TRn` positioning
//! - `'text'`, `"text"` (doubled quote escapes itself), `nHtext`
//! - `[r]/` end of record, `$` or `\` no-advance
//! - `r( ... )` groups, nested to any depth
//!
//! Blanks outside literals are insignificant. The outer parentheses are
//! optional.

use crate::format::directive::{Directive, DirectiveStream, EditLetter, FieldSpec, Move};
use crate::iostat::FormatError;

/// Upper bound on the expanded directive count of one format.
const MAX_EXPANDED: usize = 1 << 16;

/// A parsed format literal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormatProgram {
    directives: Vec<Directive>,
}

impl FormatProgram {
    /// Parse a format literal.
    pub fn parse(literal: &str) -> Result<Self, FormatError> {
        let mut parser = Parser {
            src: literal.as_bytes(),
            pos: 0,
        };
        parser.skip_blanks();
        let wrapped = parser.peek() == Some(b'(');
        if wrapped {
            parser.pos += 1;
        }
        let directives = parser.parse_list(wrapped)?;
        parser.skip_blanks();
        if parser.pos < parser.src.len() {
            return Err(parser.malformed("trailing characters after format"));
        }
        Ok(Self { directives })
    }

    #[must_use]
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// A fresh cursor positioned at the first directive.
    #[must_use]
    pub fn cursor(&self) -> FormatCursor<'_> {
        FormatCursor {
            directives: &self.directives,
            index: 0,
        }
    }
}

/// Restartable iteration over a [`FormatProgram`].
#[derive(Debug, Clone)]
pub struct FormatCursor<'a> {
    directives: &'a [Directive],
    index: usize,
}

impl DirectiveStream for FormatCursor<'_> {
    fn next_directive(&mut self) -> Option<Directive> {
        let d = self.directives.get(self.index)?.clone();
        self.index += 1;
        Some(d)
    }

    fn reset(&mut self) {
        self.index = 0;
    }

    fn is_exhausted(&self) -> bool {
        self.index >= self.directives.len()
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn malformed(&self, reason: &str) -> FormatError {
        FormatError::Malformed {
            column: self.pos + 1,
            reason: reason.to_string(),
        }
    }

    /// Digits with embedded blanks skipped. `None` if no digit is present.
    fn number(&mut self) -> Option<usize> {
        self.skip_blanks();
        let mut value: Option<usize> = None;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                let acc = value.unwrap_or(0);
                value = Some(acc.saturating_mul(10).saturating_add(usize::from(b - b'0')));
                self.pos += 1;
            } else if b == b' ' && value.is_some() {
                self.pos += 1;
            } else {
                break;
            }
        }
        value
    }

    /// Items up to `)` (when `nested`) or end of input.
    fn parse_list(&mut self, nested: bool) -> Result<Vec<Directive>, FormatError> {
        let mut out = Vec::new();
        loop {
            self.skip_blanks();
            match self.peek() {
                None if nested => return Err(self.malformed("missing `)`")),
                None => return Ok(out),
                Some(b')') if nested => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b')') => return Err(self.malformed("unbalanced `)`")),
                Some(b',') => {
                    self.pos += 1;
                }
                Some(_) => {
                    self.parse_item(&mut out)?;
                    if out.len() > MAX_EXPANDED {
                        return Err(self.malformed("format expands to too many directives"));
                    }
                }
            }
        }
    }

    fn parse_item(&mut self, out: &mut Vec<Directive>) -> Result<(), FormatError> {
        let count = self.number();
        self.skip_blanks();
        let Some(b) = self.peek() else {
            return Err(self.malformed("repeat count without descriptor"));
        };

        match b {
            b'\'' | b'"' if count.is_none() => {
                let text = self.quoted(b)?;
                out.push(Directive::Literal(text));
            }
            b'/' => {
                self.pos += 1;
                let times = count.unwrap_or(1);
                self.check_room(out, times)?;
                out.extend(std::iter::repeat_n(Directive::EndOfRecord, times));
            }
            b'$' | b'\\' if count.is_none() => {
                self.pos += 1;
                out.push(Directive::NoAdvance);
            }
            b'(' => {
                self.pos += 1;
                let group = self.parse_list(true)?;
                let times = count.unwrap_or(1);
                self.check_room(out, group.len().saturating_mul(times))?;
                for _ in 0..times {
                    out.extend(group.iter().cloned());
                }
            }
            b'X' | b'x' => {
                self.pos += 1;
                let n = count.unwrap_or(1);
                out.push(Directive::Position(Move::Relative(clamp_i32(n))));
            }
            b'H' | b'h' => {
                self.pos += 1;
                let Some(n) = count else {
                    return Err(self.malformed("`H` needs a character count"));
                };
                if n > self.src.len() - self.pos {
                    self.pos = self.src.len();
                    return Err(self.malformed("Hollerith literal runs past end of format"));
                }
                let text = String::from_utf8_lossy(&self.src[self.pos..self.pos + n]).into_owned();
                self.pos += n;
                out.push(Directive::Literal(text));
            }
            b'T' | b't' if count.is_none() => {
                self.pos += 1;
                out.push(Directive::Position(self.tab()?));
            }
            _ => {
                let Some(letter) = EditLetter::from_byte(b) else {
                    return Err(self.malformed("unknown edit descriptor"));
                };
                self.pos += 1;
                let spec = self.field(letter)?;
                let times = count.unwrap_or(1);
                if times == 0 {
                    return Err(FormatError::BadRepeatCount("0".to_string()));
                }
                self.check_room(out, times)?;
                out.extend(std::iter::repeat_n(Directive::Field(spec), times));
            }
        }
        Ok(())
    }

    /// Refuse an expansion that would push `out` past `MAX_EXPANDED`.
    fn check_room(&self, out: &[Directive], adding: usize) -> Result<(), FormatError> {
        if adding > MAX_EXPANDED.saturating_sub(out.len()) {
            return Err(self.malformed("format expands to too many directives"));
        }
        Ok(())
    }

    fn tab(&mut self) -> Result<Move, FormatError> {
        self.skip_blanks();
        match self.peek() {
            Some(b'L' | b'l') => {
                self.pos += 1;
                let n = self.number().ok_or_else(|| self.malformed("`TL` needs a count"))?;
                Ok(Move::Relative(-clamp_i32(n)))
            }
            Some(b'R' | b'r') => {
                self.pos += 1;
                let n = self.number().ok_or_else(|| self.malformed("`TR` needs a count"))?;
                Ok(Move::Relative(clamp_i32(n)))
            }
            _ => {
                let n = self.number().ok_or_else(|| self.malformed("`T` needs a column"))?;
                if n == 0 {
                    return Err(self.malformed("`T` column must be at least 1"));
                }
                Ok(Move::Absolute(n))
            }
        }
    }

    fn field(&mut self, letter: EditLetter) -> Result<FieldSpec, FormatError> {
        let width = self.number().map_or(0, clamp_i32);
        self.skip_blanks();
        let decimals = if self.peek() == Some(b'.') {
            self.pos += 1;
            let d = self
                .number()
                .ok_or_else(|| self.malformed("`.` must be followed by digits"))?;
            Some(u32::try_from(d).unwrap_or(u32::MAX))
        } else {
            None
        };
        // Exponent width (`Ew.dEe`) is accepted and ignored.
        if matches!(letter, EditLetter::E | EditLetter::D | EditLetter::G)
            && decimals.is_some()
            && matches!(self.peek(), Some(b'E' | b'e'))
        {
            let save = self.pos;
            self.pos += 1;
            if self.number().is_none() {
                self.pos = save;
            }
        }
        if width == 0 && matches!(letter, EditLetter::F | EditLetter::E | EditLetter::D)
            && decimals.is_some()
        {
            return Err(self.malformed("real descriptor with decimals needs a width"));
        }
        Ok(FieldSpec::new(letter, width, decimals))
    }

    fn quoted(&mut self, quote: u8) -> Result<String, FormatError> {
        self.pos += 1;
        let mut text = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.malformed("unterminated literal")),
                Some(b) if b == quote => {
                    self.pos += 1;
                    if self.peek() == Some(quote) {
                        text.push(quote);
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Some(b) => {
                    text.push(b);
                    self.pos += 1;
                }
            }
        }
        Ok(String::from_utf8_lossy(&text).into_owned())
    }
}

fn clamp_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
