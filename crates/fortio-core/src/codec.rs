//! Text codec between directives and typed values.
//!
//! [`ValueCodec`] is the seam the engines call through; [`StandardCodec`] is
//! the stock implementation. Rendering follows the usual fixed-field rules:
//! numbers are right-justified, a value that does not fit fills the field
//! with `*`, and blank handling on input follows the unit's blank mode.

use thiserror::Error;

use crate::device::BlankMode;
use crate::format::{EditLetter, FieldSpec};
use crate::iostat::FormatError;
use crate::value::{Value, ValueKind};

/// Decimal places used by E/D/G when a format omits them.
const DEFAULT_DECIMALS: u32 = 6;

/// Longest field the codec will render.
const MAX_FIELD: usize = 4096;

/// Codec failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input text does not denote a value of the requested kind.
    #[error("`{text}` is not a valid {kind} value")]
    Invalid { text: String, kind: ValueKind },
    /// The descriptor cannot carry the value; a static program error.
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Conversion between directives, text, and typed values.
pub trait ValueCodec {
    /// Decode the text sliced for one fixed-width field.
    fn decode_field(
        &self,
        spec: &FieldSpec,
        text: &str,
        kind: ValueKind,
        blank: BlankMode,
    ) -> Result<Value, CodecError>;

    /// Render `value` into exactly `spec.width` characters (or free-form
    /// when the width is not positive).
    fn encode_field(&self, spec: &FieldSpec, value: &Value) -> Result<String, CodecError>;

    /// Decode a list-directed token (already unquoted for text).
    fn decode_free(&self, token: &str, kind: ValueKind) -> Result<Value, CodecError>;

    /// Default list-directed rendering.
    fn encode_free(&self, value: &Value) -> String;
}

/// The stock codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardCodec;

impl ValueCodec for StandardCodec {
    fn decode_field(
        &self,
        spec: &FieldSpec,
        text: &str,
        kind: ValueKind,
        blank: BlankMode,
    ) -> Result<Value, CodecError> {
        check_descriptor(spec.letter, kind)?;
        match kind {
            ValueKind::Integer => {
                let s = normalize_blanks(text, blank);
                if s.is_empty() {
                    return Ok(Value::Integer(0));
                }
                s.parse::<i32>()
                    .map(Value::Integer)
                    .map_err(|_| invalid(text, kind))
            }
            ValueKind::Real => {
                let s = normalize_blanks(text, blank);
                real_literal(&s, spec.decimals)
                    .and_then(|lit| lit.parse::<f32>().ok())
                    .map(Value::Real)
                    .ok_or_else(|| invalid(text, kind))
            }
            ValueKind::Double => {
                let s = normalize_blanks(text, blank);
                real_literal(&s, spec.decimals)
                    .and_then(|lit| lit.parse::<f64>().ok())
                    .map(Value::Double)
                    .ok_or_else(|| invalid(text, kind))
            }
            ValueKind::Logical => parse_logical(text)
                .map(Value::Logical)
                .ok_or_else(|| invalid(text, kind)),
            ValueKind::Text => Ok(Value::Text(text.to_string())),
            ValueKind::FixedText(len) => Ok(Value::Text(fit_right(text, len))),
            // Complex items are transferred as two real fields by the engines.
            ValueKind::Complex => Err(mismatch(spec.letter, kind).into()),
        }
    }

    fn encode_field(&self, spec: &FieldSpec, value: &Value) -> Result<String, CodecError> {
        check_descriptor(spec.letter, value.kind())?;
        let Some(width) = spec.fixed_width() else {
            return Ok(self.encode_free(value));
        };
        let width = width.min(MAX_FIELD);
        let out = match value {
            Value::Integer(v) => render_integer(*v, spec.decimals, width),
            Value::Logical(b) => right_justify(if *b { "T" } else { "F" }, width),
            Value::Real(v) => render_real(f64::from(*v), spec, width),
            Value::Double(v) => render_real(*v, spec, width),
            Value::Text(s) => render_text(s, width),
            Value::Complex(..) => return Err(mismatch(spec.letter, ValueKind::Complex).into()),
        };
        Ok(out)
    }

    fn decode_free(&self, token: &str, kind: ValueKind) -> Result<Value, CodecError> {
        let t = token.trim();
        match kind {
            ValueKind::Integer => t
                .parse::<i32>()
                .map(Value::Integer)
                .map_err(|_| invalid(token, kind)),
            ValueKind::Real => real_literal(t, None)
                .and_then(|lit| lit.parse::<f32>().ok())
                .map(Value::Real)
                .ok_or_else(|| invalid(token, kind)),
            ValueKind::Double => real_literal(t, None)
                .and_then(|lit| lit.parse::<f64>().ok())
                .map(Value::Double)
                .ok_or_else(|| invalid(token, kind)),
            ValueKind::Complex => parse_complex(t)
                .map(|(re, im)| Value::Complex(re, im))
                .ok_or_else(|| invalid(token, kind)),
            ValueKind::Logical => parse_logical(t)
                .map(Value::Logical)
                .ok_or_else(|| invalid(token, kind)),
            ValueKind::Text => Ok(Value::Text(token.to_string())),
            ValueKind::FixedText(len) => Ok(Value::Text(fit_left(token, len))),
        }
    }

    fn encode_free(&self, value: &Value) -> String {
        match value {
            Value::Integer(v) => v.to_string(),
            Value::Logical(b) => String::from(if *b { "T" } else { "F" }),
            Value::Real(v) => free_real(v.to_string(), format!("{v:e}")),
            Value::Double(v) => free_real(v.to_string(), format!("{v:e}")),
            Value::Complex(re, im) => format!(
                "({},{})",
                free_real(re.to_string(), format!("{re:e}")),
                free_real(im.to_string(), format!("{im:e}"))
            ),
            Value::Text(s) => s.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Input helpers
// ---------------------------------------------------------------------------

fn invalid(text: &str, kind: ValueKind) -> CodecError {
    CodecError::Invalid {
        text: text.to_string(),
        kind,
    }
}

fn mismatch(letter: EditLetter, kind: ValueKind) -> FormatError {
    FormatError::Mismatch {
        letter: letter.as_char(),
        kind,
    }
}

fn check_descriptor(letter: EditLetter, kind: ValueKind) -> Result<(), FormatError> {
    if letter.accepts(kind) {
        Ok(())
    } else {
        Err(mismatch(letter, kind))
    }
}

/// Apply the blank mode to a numeric field: leading blanks are dropped,
/// other blanks are removed (`NULL`) or read as zeros (`ZERO`).
fn normalize_blanks(text: &str, blank: BlankMode) -> String {
    let trimmed = text.trim_start();
    match blank {
        BlankMode::Null => trimmed.chars().filter(|c| *c != ' ').collect(),
        BlankMode::Zero => {
            let body = trimmed.trim_end_matches(' ');
            let trailing = trimmed.len() - body.len();
            let mut s: String = body.chars().map(|c| if c == ' ' { '0' } else { c }).collect();
            if !s.is_empty() {
                s.extend(std::iter::repeat_n('0', trailing));
            }
            s
        }
    }
}

/// Rewrite a real field into a Rust float literal.
///
/// Accepts `D`/`Q` exponent letters, an exponent introduced by a bare sign
/// (`1.5+3`), and an implied decimal point: with no `.` in the mantissa the
/// last `decimals` digits are fractional. An empty field is zero.
fn real_literal(s: &str, decimals: Option<u32>) -> Option<String> {
    if s.is_empty() {
        return Some(String::from("0"));
    }
    let lower = s.to_ascii_lowercase();
    if matches!(
        lower.trim_start_matches(['+', '-']),
        "inf" | "infinity" | "nan"
    ) {
        return Some(lower);
    }

    let bytes = s.as_bytes();
    let mut split = None;
    for (i, &b) in bytes.iter().enumerate().skip(1) {
        match b {
            b'e' | b'E' | b'd' | b'D' | b'q' | b'Q' => {
                split = Some((i, i + 1));
                break;
            }
            b'+' | b'-' if bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.' => {
                split = Some((i, i));
                break;
            }
            _ => {}
        }
    }
    let (mantissa, exponent) = match split {
        Some((m_end, e_start)) => (&s[..m_end], &s[e_start..]),
        None => (s, ""),
    };

    let digits = mantissa.trim_start_matches(['+', '-']);
    let valid_mantissa = !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1
        && mantissa.len() - digits.len() <= 1;
    if !valid_mantissa {
        return None;
    }

    let mut exp: i64 = if exponent.is_empty() {
        0
    } else {
        exponent.parse().ok()?
    };
    if !mantissa.contains('.') {
        exp -= i64::from(decimals.unwrap_or(0));
    }
    Some(format!("{mantissa}e{exp}"))
}

fn parse_logical(text: &str) -> Option<bool> {
    let t = text.trim_start().trim_start_matches('.');
    match t.chars().next()? {
        'T' | 't' => Some(true),
        'F' | 'f' => Some(false),
        _ => None,
    }
}

fn parse_complex(t: &str) -> Option<(f64, f64)> {
    let inner = t.strip_prefix('(')?.strip_suffix(')')?;
    let (re, im) = inner.split_once(',')?;
    let re = real_literal(re.trim(), None)?.parse().ok()?;
    let im = real_literal(im.trim(), None)?.parse().ok()?;
    Some((re, im))
}

/// A-edit input: keep the rightmost `len` characters, blank-pad short input.
fn fit_right(text: &str, len: usize) -> String {
    let count = text.chars().count();
    if count >= len {
        text.chars().skip(count - len).collect()
    } else {
        let mut s = text.to_string();
        s.extend(std::iter::repeat_n(' ', len - count));
        s
    }
}

/// List-directed input: keep the leftmost `len` characters, blank-pad.
fn fit_left(text: &str, len: usize) -> String {
    let mut s: String = text.chars().take(len).collect();
    let count = s.chars().count();
    s.extend(std::iter::repeat_n(' ', len - count));
    s
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn stars(width: usize) -> String {
    "*".repeat(width)
}

fn right_justify(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len > width {
        return stars(width);
    }
    let mut out = " ".repeat(width - len);
    out.push_str(s);
    out
}

fn render_integer(value: i32, min_digits: Option<u32>, width: usize) -> String {
    let abs = value.unsigned_abs();
    let mut digits = if min_digits == Some(0) && value == 0 {
        String::new()
    } else {
        abs.to_string()
    };
    if let Some(m) = min_digits {
        let m = (m as usize).min(MAX_FIELD);
        if digits.len() < m {
            digits = format!("{}{digits}", "0".repeat(m - digits.len()));
        }
    }
    if value < 0 {
        digits.insert(0, '-');
    }
    right_justify(&digits, width)
}

fn render_text(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.chars().take(width).collect()
    } else {
        let mut out = " ".repeat(width - len);
        out.push_str(s);
        out
    }
}

fn render_real(value: f64, spec: &FieldSpec, width: usize) -> String {
    if value.is_nan() {
        return right_justify("NaN", width);
    }
    if value.is_infinite() {
        return right_justify(if value > 0.0 { "Inf" } else { "-Inf" }, width);
    }
    match spec.letter {
        EditLetter::E => render_exponential(value, spec.decimals.unwrap_or(DEFAULT_DECIMALS), width, 'E'),
        EditLetter::D => render_exponential(value, spec.decimals.unwrap_or(DEFAULT_DECIMALS), width, 'D'),
        EditLetter::G => render_general(value, spec.decimals.unwrap_or(DEFAULT_DECIMALS), width),
        _ => render_fixed(value, spec.decimals.unwrap_or(0), width),
    }
}

/// `Fw.d`.
fn render_fixed(value: f64, decimals: u32, width: usize) -> String {
    let prec = (decimals as usize).min(MAX_FIELD);
    let mut body = format!("{:.prec$}", value.abs());
    let negative = value < 0.0;
    let sign_len = usize::from(negative);
    // The leading zero of a pure fraction is optional.
    if body.len() + sign_len > width && body.starts_with("0.") {
        body.remove(0);
    }
    if negative {
        body.insert(0, '-');
    }
    right_justify(&body, width)
}

/// `Ew.d` / `Dw.d`: `[-]0.ddddE+ee`.
fn render_exponential(value: f64, decimals: u32, width: usize, letter: char) -> String {
    let d = (decimals as usize).min(MAX_FIELD);
    let (digits, exp) = significant_digits(value.abs(), d);
    let exp_text = if exp.unsigned_abs() <= 99 {
        format!("{letter}{}{:02}", if exp < 0 { '-' } else { '+' }, exp.unsigned_abs())
    } else {
        format!("{}{:03}", if exp < 0 { '-' } else { '+' }, exp.unsigned_abs())
    };
    let negative = value < 0.0;
    let mut body = format!("0.{digits}{exp_text}");
    if body.len() + usize::from(negative) > width {
        body.remove(0);
    }
    if negative {
        body.insert(0, '-');
    }
    right_justify(&body, width)
}

/// `Gw.d`: fixed notation with four trailing blanks when the magnitude is
/// in range, exponential otherwise.
fn render_general(value: f64, decimals: u32, width: usize) -> String {
    let d = decimals as usize;
    let abs = value.abs();
    let k = if abs == 0.0 {
        1
    } else {
        significant_digits(abs, d.max(1)).1
    };
    if width > 4 && abs == 0.0 || (abs >= 0.1 && (0..=d as i32).contains(&k) && width > 4) {
        let frac = (d as i32 - k).max(0) as u32;
        let mut s = render_fixed(value, frac, width - 4);
        s.push_str("    ");
        s
    } else {
        render_exponential(value, decimals, width, 'E')
    }
}

/// Round `abs` to `d` significant digits; returns the digit string and the
/// exponent for a `0.ddd` mantissa.
fn significant_digits(abs: f64, d: usize) -> (String, i32) {
    if abs == 0.0 {
        return ("0".repeat(d), 0);
    }
    let prec = d.saturating_sub(1);
    let sci = format!("{abs:.prec$e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = if d == 0 { String::new() } else { digits };
    (digits, exp + 1)
}

/// List-directed real: plain notation for moderate magnitudes, otherwise
/// `m.mmmE+ee`. Always contains a decimal point.
fn free_real(plain: String, sci: String) -> String {
    let moderate = plain.len() <= 16 && !plain.contains("inf") && !plain.contains("NaN");
    if moderate {
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else if let Some((m, e)) = sci.split_once('e') {
        let m = if m.contains('.') { m.to_string() } else { format!("{m}.0") };
        let exp: i32 = e.parse().unwrap_or(0);
        format!("{m}E{}{:02}", if exp < 0 { '-' } else { '+' }, exp.unsigned_abs())
    } else {
        plain
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
