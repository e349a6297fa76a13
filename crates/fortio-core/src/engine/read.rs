//! READ statement execution.

use tracing::trace;

use super::{StatementOptions, Transfer, codec_interrupt};
use crate::codec::ValueCodec;
use crate::device::{Device, Form};
use crate::format::{Directive, DirectiveStream, FieldSpec, Move};
use crate::iostat::{Completion, Fault, FormatError, Interrupt, IoStat};
use crate::value::{Value, ValueKind};

/// Cached token of an `n*value` list item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RepeatState {
    token: String,
    remaining: usize,
}

/// Unformatted record payload and read position.
#[derive(Debug, Clone, Default)]
struct BinaryRecord {
    bytes: Vec<u8>,
    pos: usize,
}

impl BinaryRecord {
    fn take(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn take_vec(&mut self, n: usize) -> Result<Vec<u8>, IoStat> {
        self.take(n).map(<[u8]>::to_vec).ok_or(IoStat::ReadError)
    }

    fn rest(&mut self) -> &[u8] {
        let slice = &self.bytes[self.pos.min(self.bytes.len())..];
        self.pos = self.bytes.len();
        slice
    }
}

fn array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], IoStat> {
    bytes.try_into().map_err(|_| IoStat::ReadError)
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | ',')
}

/// Characters that may continue a free-form token of `kind`.
fn continues_token(kind: ValueKind, c: char) -> bool {
    match kind {
        ValueKind::Integer => c.is_ascii_digit() || c == '+' || c == '-',
        ValueKind::Real | ValueKind::Double | ValueKind::Complex => {
            c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E' | 'd' | 'D' | 'q' | 'Q')
        }
        ValueKind::Logical => !is_separator(c) && c != '*',
        ValueKind::Text | ValueKind::FixedText(_) => !is_separator(c),
    }
}

/// Executes the value requests of one READ statement.
pub struct ReadEngine<'a> {
    device: &'a mut Device,
    directives: Option<&'a mut dyn DirectiveStream>,
    codec: &'a dyn ValueCodec,
    options: StatementOptions,
    /// Current record; `None` forces a fetch on the next request.
    line: Option<Vec<char>>,
    cursor: usize,
    /// The device is positioned on a record this statement consumed.
    touched: bool,
    repeat: RepeatState,
    binary: Option<BinaryRecord>,
    /// Status raised while positioning (`REC=` on a sequential unit).
    deferred: Option<IoStat>,
}

impl std::fmt::Debug for ReadEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadEngine")
            .field("unit", &self.device.unit())
            .field("formatted", &self.directives.is_some())
            .field("cursor", &self.cursor)
            .field("repeat", &self.repeat)
            .finish_non_exhaustive()
    }
}

impl<'a> ReadEngine<'a> {
    /// Without a directive stream every request is list-directed.
    pub fn new(
        device: &'a mut Device,
        directives: Option<&'a mut dyn DirectiveStream>,
        codec: &'a dyn ValueCodec,
        options: StatementOptions,
    ) -> Self {
        device.finish_partial();
        let deferred = options.record.and_then(|n| device.seek_record(n).err());
        Self {
            device,
            directives,
            codec,
            options,
            line: None,
            cursor: 0,
            touched: false,
            repeat: RepeatState::default(),
            binary: None,
            deferred,
        }
    }

    #[must_use]
    pub fn unit(&self) -> i32 {
        self.device.unit()
    }

    /// Values still to be served from the last `n*` prefix.
    #[must_use]
    pub fn pending_repeats(&self) -> usize {
        self.repeat.remaining
    }

    // -- records ------------------------------------------------------------

    fn load_record(&mut self) -> Result<(), Interrupt> {
        if std::mem::take(&mut self.touched) {
            self.device.advance();
        }
        let Some(text) = self.device.fetch_line()? else {
            self.line = None;
            return Err(IoStat::EndOfFile.into());
        };
        trace!(unit = self.device.unit(), record = self.device.record(), "record fetched");
        self.line = Some(text.chars().collect());
        self.cursor = 0;
        self.touched = true;
        Ok(())
    }

    fn line_len(&self) -> usize {
        self.line.as_ref().map_or(0, Vec::len)
    }

    fn peek_at(&self, pos: usize) -> Option<char> {
        self.line.as_ref().and_then(|l| l.get(pos).copied())
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(self.cursor)
    }

    fn clamp_cursor(&mut self, pos: i64) {
        let last = self.line_len().saturating_sub(1) as i64;
        self.cursor = pos.clamp(0, last) as usize;
    }

    // -- directives ---------------------------------------------------------

    /// Next field directive, applying positional and record directives on
    /// the way. `None` when the statement is list-directed.
    pub fn next_directive(&mut self) -> Result<Option<Directive>, Interrupt> {
        let Some(stream) = self.directives.take() else {
            return Ok(None);
        };
        let result = self.pull(&mut *stream);
        self.directives = Some(stream);
        result
    }

    fn pull(&mut self, stream: &mut dyn DirectiveStream) -> Result<Option<Directive>, Interrupt> {
        let mut reverted = false;
        loop {
            if self.line.is_none() {
                self.load_record()?;
            }
            let Some(directive) = stream.next_directive() else {
                if reverted {
                    return Err(FormatError::NoDataDescriptor.into());
                }
                reverted = true;
                stream.reset();
                self.line = None;
                continue;
            };
            match directive {
                Directive::Field(_) => return Ok(Some(directive)),
                Directive::Position(Move::Relative(n)) => {
                    self.clamp_cursor(self.cursor as i64 + i64::from(n));
                }
                Directive::Position(Move::Absolute(col)) => {
                    self.clamp_cursor(col as i64 - 1);
                }
                Directive::Literal(text) => {
                    self.cursor = (self.cursor + text.chars().count()).min(self.line_len());
                }
                Directive::EndOfRecord => self.line = None,
                Directive::NoAdvance => {}
            }
        }
    }

    // -- scanning -----------------------------------------------------------

    /// Up to `width` characters from the cursor.
    fn slice_field(&mut self, width: usize) -> (String, usize) {
        let len = self.line_len();
        let start = self.cursor.min(len);
        let end = start.saturating_add(width).min(len);
        let text: String = self
            .line
            .as_ref()
            .map(|l| l[start..end].iter().collect())
            .unwrap_or_default();
        self.cursor = end;
        (text, end - start)
    }

    /// Scan one free-form token. Returns the token, the characters it
    /// consumed, and the repeat count it carried (if any).
    fn scan_free(
        &mut self,
        kind: ValueKind,
        list_directed: bool,
    ) -> Result<(String, usize, Option<usize>), Interrupt> {
        if self.line.is_none() {
            self.load_record()?;
        }
        loop {
            while matches!(self.peek(), Some(' ' | '\t')) {
                self.cursor += 1;
            }
            if self.peek().is_some() || !list_directed {
                break;
            }
            self.load_record()?;
        }

        let mut start = self.cursor;
        let mut token = String::new();
        let mut repeat = None;
        while let Some(c) = self.peek() {
            if c == '*' && !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
                if repeat.is_some() {
                    return Err(FormatError::RepeatedRepeatCount.into());
                }
                let n: usize = token
                    .parse()
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| FormatError::BadRepeatCount(token.clone()))?;
                repeat = Some(n);
                start = self.cursor;
                self.cursor += 1;
                token.clear();
                continue;
            }
            if token.is_empty() && matches!(kind, ValueKind::Text | ValueKind::FixedText(_)) && (c == '\'' || c == '"') {
                self.scan_quoted(c, &mut token);
                break;
            }
            if token.is_empty() && kind == ValueKind::Complex && c == '(' {
                self.scan_parenthesized(&mut token);
                break;
            }
            if !continues_token(kind, c) {
                break;
            }
            token.push(c);
            self.cursor += 1;
        }
        let count = self.cursor - start;

        let mut after = self.cursor;
        while matches!(self.peek_at(after), Some(' ' | '\t')) {
            after += 1;
        }
        if self.peek_at(after) == Some(',') {
            self.cursor = after + 1;
        }
        Ok((token, count, repeat))
    }

    /// Quoted string; a doubled quote stands for one quote character.
    fn scan_quoted(&mut self, quote: char, token: &mut String) {
        self.cursor += 1;
        while let Some(c) = self.peek() {
            self.cursor += 1;
            if c == quote {
                if self.peek() == Some(quote) {
                    self.cursor += 1;
                } else {
                    return;
                }
            }
            token.push(c);
        }
    }

    fn scan_parenthesized(&mut self, token: &mut String) {
        while let Some(c) = self.peek() {
            token.push(c);
            self.cursor += 1;
            if c == ')' {
                return;
            }
        }
    }

    // -- transfers ----------------------------------------------------------

    fn transfer(&mut self, kind: ValueKind) -> Result<Transfer<Value>, Interrupt> {
        if let Some(stat) = self.deferred {
            return Err(stat.into());
        }
        if self.device.form() == Form::Unformatted {
            return self.transfer_binary(kind);
        }
        if kind == ValueKind::Complex && self.directives.is_some() {
            let re = self.transfer(ValueKind::Double)?;
            let im = self.transfer(ValueKind::Double)?;
            let value = match (re.value, im.value) {
                (Value::Double(re), Value::Double(im)) => Value::Complex(re, im),
                _ => return Err(IoStat::ReadError.into()),
            };
            return Ok(Transfer {
                value,
                count: re.count + im.count,
            });
        }

        if self.repeat.remaining > 0 {
            self.repeat.remaining -= 1;
            let value = self
                .codec
                .decode_free(&self.repeat.token, kind)
                .map_err(|e| codec_interrupt(e, IoStat::ReadError))?;
            return Ok(Transfer { value, count: 0 });
        }

        match self.next_directive()? {
            Some(Directive::Field(spec)) => match spec.fixed_width() {
                Some(width) => self.transfer_field(&spec, width, kind),
                None => {
                    if !spec.letter.accepts(kind) {
                        return Err(FormatError::Mismatch {
                            letter: spec.letter.as_char(),
                            kind,
                        }
                        .into());
                    }
                    self.transfer_free(kind, false)
                }
            },
            _ => self.transfer_free(kind, true),
        }
    }

    fn transfer_field(
        &mut self,
        spec: &FieldSpec,
        width: usize,
        kind: ValueKind,
    ) -> Result<Transfer<Value>, Interrupt> {
        let (text, count) = self.slice_field(width);
        let value = self
            .codec
            .decode_field(spec, &text, kind, self.device.blank())
            .map_err(|e| codec_interrupt(e, IoStat::ReadError))?;
        Ok(Transfer { value, count })
    }

    fn transfer_free(&mut self, kind: ValueKind, list_directed: bool) -> Result<Transfer<Value>, Interrupt> {
        let (token, count, repeat) = self.scan_free(kind, list_directed)?;
        let value = self
            .codec
            .decode_free(&token, kind)
            .map_err(|e| codec_interrupt(e, IoStat::ReadError))?;
        if let Some(n) = repeat {
            self.repeat = RepeatState {
                token,
                remaining: n - 1,
            };
        }
        Ok(Transfer { value, count })
    }

    fn transfer_binary(&mut self, kind: ValueKind) -> Result<Transfer<Value>, Interrupt> {
        if self.binary.is_none() {
            let Some(bytes) = self.device.fetch()? else {
                return Err(IoStat::EndOfFile.into());
            };
            self.touched = true;
            self.binary = Some(BinaryRecord { bytes, pos: 0 });
        }
        let Some(record) = self.binary.as_mut() else {
            return Err(IoStat::ReadError.into());
        };
        let before = record.pos;
        let value = match kind {
            ValueKind::Integer => Value::Integer(i32::from_le_bytes(array(&record.take_vec(4)?)?)),
            ValueKind::Logical => Value::Logical(i32::from_le_bytes(array(&record.take_vec(4)?)?) != 0),
            ValueKind::Real => Value::Real(f32::from_le_bytes(array(&record.take_vec(4)?)?)),
            ValueKind::Double => Value::Double(f64::from_le_bytes(array(&record.take_vec(8)?)?)),
            ValueKind::Complex => {
                let re = f64::from_le_bytes(array(&record.take_vec(8)?)?);
                let im = f64::from_le_bytes(array(&record.take_vec(8)?)?);
                Value::Complex(re, im)
            }
            ValueKind::FixedText(n) => Value::Text(String::from_utf8_lossy(&record.take_vec(n)?).into_owned()),
            ValueKind::Text => Value::Text(String::from_utf8_lossy(record.rest()).into_owned()),
        };
        Ok(Transfer {
            value,
            count: record.pos - before,
        })
    }

    fn settle_as<T>(
        &mut self,
        kind: ValueKind,
        pick: impl FnOnce(Value) -> Option<T>,
    ) -> Result<Completion<Transfer<T>>, Fault> {
        let unit = self.device.unit();
        let result = self.transfer(kind).and_then(|t| {
            let count = t.count;
            pick(t.value)
                .map(|value| Transfer { value, count })
                .ok_or(Interrupt::Status(IoStat::ReadError))
        });
        self.options.handlers.settle(unit, result)
    }

    /// Read one value of `kind`.
    pub fn read(&mut self, kind: ValueKind) -> Result<Completion<Transfer<Value>>, Fault> {
        self.settle_as(kind, Some)
    }

    pub fn read_integer(&mut self) -> Result<Completion<Transfer<i32>>, Fault> {
        self.settle_as(ValueKind::Integer, |v| v.as_integer())
    }

    pub fn read_logical(&mut self) -> Result<Completion<Transfer<bool>>, Fault> {
        self.settle_as(ValueKind::Logical, |v| v.as_logical())
    }

    pub fn read_real(&mut self) -> Result<Completion<Transfer<f32>>, Fault> {
        self.settle_as(ValueKind::Real, |v| v.as_real())
    }

    pub fn read_double(&mut self) -> Result<Completion<Transfer<f64>>, Fault> {
        self.settle_as(ValueKind::Double, |v| v.as_double())
    }

    pub fn read_complex(&mut self) -> Result<Completion<Transfer<(f64, f64)>>, Fault> {
        self.settle_as(ValueKind::Complex, |v| v.as_complex())
    }

    pub fn read_text(&mut self) -> Result<Completion<Transfer<String>>, Fault> {
        self.settle_as(ValueKind::Text, text_of)
    }

    /// Read into a character target of length `len`.
    pub fn read_fixed_text(&mut self, len: usize) -> Result<Completion<Transfer<String>>, Fault> {
        self.settle_as(ValueKind::FixedText(len), text_of)
    }

    /// Consume the current record without transferring anything.
    pub fn skip_record(&mut self) -> Result<Completion<()>, Fault> {
        let unit = self.device.unit();
        let result = match self.deferred {
            Some(stat) => Err(Interrupt::Status(stat)),
            None if self.touched => Ok(()),
            None => self.load_record(),
        };
        self.line = None;
        self.options.handlers.settle(unit, result)
    }

    /// Finish the statement: move past the last record it touched.
    pub fn end_record(&mut self) {
        if std::mem::take(&mut self.touched) {
            self.device.advance();
        }
        self.line = None;
        self.binary = None;
        self.repeat = RepeatState::default();
    }
}

fn text_of(v: Value) -> Option<String> {
    match v {
        Value::Text(s) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StandardCodec;
    use crate::format::FormatProgram;
    use crate::iostat::Handlers;

    fn list(device: &mut Device) -> ReadEngine<'_> {
        ReadEngine::new(device, None, &StandardCodec, StatementOptions::default())
    }

    fn done<T>(c: Result<Completion<Transfer<T>>, Fault>) -> Transfer<T> {
        c.unwrap().done().unwrap()
    }

    #[test]
    fn repeat_count_serves_cached_value() {
        let mut dev = Device::internal(["3*7"]);
        let mut eng = list(&mut dev);
        let counts: Vec<(i32, usize)> = (0..3)
            .map(|_| {
                let t = done(eng.read_integer());
                (t.value, t.count)
            })
            .collect();
        assert_eq!(counts, [(7, 2), (7, 0), (7, 0)]);
        assert_eq!(eng.pending_repeats(), 0);
    }

    #[test]
    fn second_repeat_is_fatal() {
        let mut dev = Device::internal(["2*3*4"]);
        let mut eng = list(&mut dev);
        assert_eq!(
            eng.read_integer().unwrap_err(),
            Fault::Format(FormatError::RepeatedRepeatCount)
        );
    }

    #[test]
    fn list_directed_crosses_records() {
        let mut dev = Device::internal(["1, 2", "", "  3"]);
        let mut eng = list(&mut dev);
        assert_eq!(done(eng.read_integer()).value, 1);
        assert_eq!(done(eng.read_integer()).value, 2);
        assert_eq!(done(eng.read_integer()).value, 3);
        eng.end_record();
        assert_eq!(dev.record(), 4);
    }

    #[test]
    fn quoted_strings_and_complex() {
        let mut dev = Device::internal(["'it''s', (1.5, -2), .true."]);
        let mut eng = list(&mut dev);
        let text = done(eng.read_text());
        assert_eq!(text.value, "it's");
        assert_eq!(text.count, 7);
        assert_eq!(done(eng.read_complex()).value, (1.5, -2.0));
        assert!(done(eng.read_logical()).value);
    }

    #[test]
    fn fixed_fields_consume_exact_width() {
        let program = FormatProgram::parse("(I5,F6.2)").unwrap();
        let mut cursor = program.cursor();
        let mut dev = Device::internal(["   42  3.14"]);
        let mut eng = ReadEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
        let a = done(eng.read_integer());
        assert_eq!((a.value, a.count), (42, 5));
        let b = done(eng.read_real());
        assert_eq!((b.value, b.count), (3.14, 6));
    }

    #[test]
    fn short_field_at_end_of_line() {
        let program = FormatProgram::parse("(I3,I5)").unwrap();
        let mut cursor = program.cursor();
        let mut dev = Device::internal(["12345"]);
        let mut eng = ReadEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
        assert_eq!(done(eng.read_integer()).value, 123);
        let t = done(eng.read_integer());
        assert_eq!((t.value, t.count), (45, 2));
    }

    #[test]
    fn reversion_moves_to_next_record() {
        let program = FormatProgram::parse("(I2)").unwrap();
        let mut cursor = program.cursor();
        let mut dev = Device::internal(["11", "22"]);
        let mut eng = ReadEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
        assert_eq!(done(eng.read_integer()).value, 11);
        assert_eq!(done(eng.read_integer()).value, 22);
        eng.end_record();
        assert_eq!(dev.record(), 3);
    }

    #[test]
    fn positional_directives_clamp() {
        let program = FormatProgram::parse("(T4,I2,TL10,I1,50X,A1)").unwrap();
        let mut cursor = program.cursor();
        let mut dev = Device::internal(["abc12xyz"]);
        let mut eng = ReadEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
        assert_eq!(done(eng.read_integer()).value, 12);
        assert!(matches!(eng.read_integer().unwrap_err(), Fault::Unhandled { status: IoStat::ReadError, .. }));
        assert_eq!(done(eng.read_text()).value, "z");
    }

    #[test]
    fn end_of_file_with_and_without_handlers() {
        let mut dev = Device::internal(Vec::<String>::new());
        let mut eng = list(&mut dev);
        assert_eq!(eng.read_integer().unwrap_err(), Fault::EndOfFile { unit: -1 });

        let mut dev = Device::internal(Vec::<String>::new());
        let opts = StatementOptions::default().with_handlers(Handlers::IOSTAT);
        let mut eng = ReadEngine::new(&mut dev, None, &StandardCodec, opts);
        let c = eng.read_integer().unwrap();
        assert_eq!(c.iostat(), -1);
    }

    #[test]
    fn format_without_fields_is_fatal() {
        let program = FormatProgram::parse("('abc')").unwrap();
        let mut cursor = program.cursor();
        let mut dev = Device::internal(["x", "y", "z"]);
        let mut eng = ReadEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
        assert_eq!(
            eng.read_integer().unwrap_err(),
            Fault::Format(FormatError::NoDataDescriptor)
        );
    }

    #[test]
    fn record_option_on_sequential_unit() {
        let mut dev = Device::internal(["1"]);
        let opts = StatementOptions::default()
            .with_record(1)
            .with_handlers(Handlers::IOSTAT);
        let mut eng = ReadEngine::new(&mut dev, None, &StandardCodec, opts);
        assert_eq!(eng.read_integer().unwrap().iostat(), IoStat::IllegalAccess.code());
    }

    #[test]
    fn skip_record_advances_one() {
        let mut dev = Device::internal(["a", "b"]);
        let mut eng = list(&mut dev);
        assert!(eng.skip_record().unwrap().is_done());
        eng.end_record();
        assert_eq!(dev.record(), 2);
    }
}
