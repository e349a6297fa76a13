//! WRITE statement execution.

use tracing::debug;

use super::{LineBuffer, StatementOptions, codec_interrupt};
use crate::codec::ValueCodec;
use crate::device::{Device, Form};
use crate::format::{Directive, DirectiveStream, Move};
use crate::iostat::{Completion, Fault, FormatError, Interrupt, IoStat};
use crate::value::Value;

/// Executes the value requests of one WRITE statement.
pub struct WriteEngine<'a> {
    device: &'a mut Device,
    directives: Option<&'a mut dyn DirectiveStream>,
    codec: &'a dyn ValueCodec,
    options: StatementOptions,
    line: LineBuffer,
    /// Items placed on the current line.
    items: usize,
    /// Cleared by a no-advance directive until the record is flushed.
    advance: bool,
    /// Records flushed by this statement.
    written: Vec<String>,
    binary: Vec<u8>,
    deferred: Option<IoStat>,
}

impl std::fmt::Debug for WriteEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteEngine")
            .field("unit", &self.device.unit())
            .field("formatted", &self.directives.is_some())
            .field("line", &self.line)
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

impl<'a> WriteEngine<'a> {
    /// Without a directive stream every value is list-directed.
    pub fn new(
        device: &'a mut Device,
        directives: Option<&'a mut dyn DirectiveStream>,
        codec: &'a dyn ValueCodec,
        options: StatementOptions,
    ) -> Self {
        let deferred = options.record.and_then(|n| device.seek_record(n).err());
        Self {
            device,
            directives,
            codec,
            options,
            line: LineBuffer::new(),
            items: 0,
            advance: true,
            written: Vec::new(),
            binary: Vec::new(),
            deferred,
        }
    }

    #[must_use]
    pub fn unit(&self) -> i32 {
        self.device.unit()
    }

    /// The record under construction.
    #[must_use]
    pub fn line(&self) -> &LineBuffer {
        &self.line
    }

    fn flush_line(&mut self) -> Result<(), Interrupt> {
        let text = self.line.take();
        self.device.write_line(&text, self.advance)?;
        debug!(
            unit = self.device.unit(),
            record = self.device.record(),
            len = text.len(),
            advance = self.advance,
            "record flushed"
        );
        self.written.push(text);
        self.items = 0;
        self.advance = true;
        Ok(())
    }

    // -- directives ---------------------------------------------------------

    /// Next field directive, emitting literals and applying positional and
    /// record directives on the way. On exhaustion the line is flushed and
    /// the stream restarted when `allow_reset` holds; otherwise `None`.
    pub fn next_directive(&mut self, allow_reset: bool) -> Result<Option<Directive>, Interrupt> {
        let Some(stream) = self.directives.take() else {
            return Ok(None);
        };
        let result = self.pull(&mut *stream, allow_reset);
        self.directives = Some(stream);
        result
    }

    fn pull(
        &mut self,
        stream: &mut dyn DirectiveStream,
        allow_reset: bool,
    ) -> Result<Option<Directive>, Interrupt> {
        let mut reverted = false;
        loop {
            let Some(directive) = stream.next_directive() else {
                if !allow_reset {
                    return Ok(None);
                }
                if reverted {
                    return Err(FormatError::NoDataDescriptor.into());
                }
                reverted = true;
                self.flush_line()?;
                stream.reset();
                continue;
            };
            match directive {
                Directive::Field(_) => return Ok(Some(directive)),
                Directive::Literal(text) => self.line.put(&text),
                Directive::Position(Move::Relative(n)) => self.line.move_by(n),
                Directive::Position(Move::Absolute(col)) => {
                    self.line.pad_to(col);
                    self.line.move_to(col.saturating_sub(1));
                }
                Directive::EndOfRecord => self.flush_line()?,
                Directive::NoAdvance => self.advance = false,
            }
        }
    }

    // -- transfers ----------------------------------------------------------

    fn transfer(&mut self, value: &Value) -> Result<(), Interrupt> {
        if let Some(stat) = self.deferred {
            return Err(stat.into());
        }
        if self.device.form() == Form::Unformatted {
            encode_binary(value, &mut self.binary);
            return Ok(());
        }
        if let (Value::Complex(re, im), true) = (value, self.directives.is_some()) {
            self.transfer(&Value::Double(*re))?;
            return self.transfer(&Value::Double(*im));
        }
        match self.next_directive(true)? {
            Some(Directive::Field(spec)) => {
                let text = self
                    .codec
                    .encode_field(&spec, value)
                    .map_err(|e| codec_interrupt(e, IoStat::WriteError))?;
                self.line.put(&text);
            }
            _ => {
                if self.options.use_separators && self.items > 0 {
                    self.line.put(" ");
                }
                let text = self.codec.encode_free(value);
                self.line.put(&text);
            }
        }
        self.items += 1;
        Ok(())
    }

    /// Write one value.
    pub fn write(&mut self, value: &Value) -> Result<Completion<()>, Fault> {
        let unit = self.device.unit();
        let result = self.transfer(value);
        self.options.handlers.settle(unit, result)
    }

    pub fn write_integer(&mut self, v: i32) -> Result<Completion<()>, Fault> {
        self.write(&Value::Integer(v))
    }

    pub fn write_logical(&mut self, v: bool) -> Result<Completion<()>, Fault> {
        self.write(&Value::Logical(v))
    }

    pub fn write_real(&mut self, v: f32) -> Result<Completion<()>, Fault> {
        self.write(&Value::Real(v))
    }

    pub fn write_double(&mut self, v: f64) -> Result<Completion<()>, Fault> {
        self.write(&Value::Double(v))
    }

    pub fn write_complex(&mut self, re: f64, im: f64) -> Result<Completion<()>, Fault> {
        self.write(&Value::Complex(re, im))
    }

    pub fn write_text(&mut self, v: &str) -> Result<Completion<()>, Fault> {
        self.write(&Value::Text(v.to_string()))
    }

    fn finish(&mut self) -> Result<String, Interrupt> {
        if let Some(stat) = self.deferred {
            return Err(stat.into());
        }
        if self.device.form() == Form::Unformatted {
            let data = std::mem::take(&mut self.binary);
            self.device.write_binary(&data)?;
            return Ok(String::new());
        }
        // Trailing literals and moves up to the next data descriptor.
        self.next_directive(false)?;
        self.flush_line()?;
        Ok(std::mem::take(&mut self.written).join("\n"))
    }

    /// Finish the statement: emit trailing literals, flush the last record,
    /// and return the text written (records joined by newlines).
    pub fn end_record(&mut self) -> Result<Completion<String>, Fault> {
        let unit = self.device.unit();
        let result = self.finish();
        self.items = 0;
        self.advance = true;
        self.written.clear();
        self.options.handlers.settle(unit, result)
    }
}

/// Little-endian payload; logicals are 4-byte integers, complex values two
/// doubles.
fn encode_binary(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Integer(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Logical(b) => out.extend_from_slice(&i32::from(*b).to_le_bytes()),
        Value::Real(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Complex(re, im) => {
            out.extend_from_slice(&re.to_le_bytes());
            out.extend_from_slice(&im.to_le_bytes());
        }
        Value::Text(s) => out.extend_from_slice(s.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StandardCodec;
    use crate::format::FormatProgram;

    fn written(c: Result<Completion<String>, Fault>) -> String {
        c.unwrap().done().unwrap()
    }

    #[test]
    fn list_directed_separators() {
        let mut dev = Device::internal(Vec::<String>::new());
        let mut eng = WriteEngine::new(&mut dev, None, &StandardCodec, StatementOptions::default());
        for v in 1..=3 {
            assert!(eng.write_integer(v).unwrap().is_done());
        }
        assert_eq!(written(eng.end_record()), "1 2 3");
        assert_eq!(dev.lines().unwrap(), ["1 2 3"]);
    }

    #[test]
    fn separators_can_be_disabled() {
        let mut dev = Device::internal(Vec::<String>::new());
        let opts = StatementOptions {
            use_separators: false,
            ..StatementOptions::default()
        };
        let mut eng = WriteEngine::new(&mut dev, None, &StandardCodec, opts);
        eng.write_text("ab").unwrap();
        eng.write_text("cd").unwrap();
        assert_eq!(written(eng.end_record()), "abcd");
    }

    #[test]
    fn formatted_fields() {
        let program = FormatProgram::parse("(I5,F6.2)").unwrap();
        let mut cursor = program.cursor();
        let mut dev = Device::internal(Vec::<String>::new());
        let mut eng = WriteEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
        eng.write_integer(42).unwrap();
        eng.write_real(3.14).unwrap();
        assert_eq!(written(eng.end_record()), "   42  3.14");
    }

    #[test]
    fn trailing_literals_are_drained() {
        let program = FormatProgram::parse("('x=',I2,' units',I3)").unwrap();
        let mut cursor = program.cursor();
        let mut dev = Device::internal(Vec::<String>::new());
        let mut eng = WriteEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
        eng.write_integer(7).unwrap();
        assert_eq!(written(eng.end_record()), "x= 7 units");
    }

    #[test]
    fn absolute_tab_pads_and_overwrites() {
        let program = FormatProgram::parse("(A5,T10,A1,T2,A2)").unwrap();
        let mut cursor = program.cursor();
        let mut dev = Device::internal(Vec::<String>::new());
        let mut eng = WriteEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
        eng.write_text("abcde").unwrap();
        eng.write_text("z").unwrap();
        assert!(eng.line().len() >= 10);
        eng.write_text("XY").unwrap();
        assert_eq!(written(eng.end_record()), "aXYde    z");
    }

    #[test]
    fn reversion_flushes_records() {
        let program = FormatProgram::parse("(2I3)").unwrap();
        let mut cursor = program.cursor();
        let mut dev = Device::internal(Vec::<String>::new());
        let mut eng = WriteEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
        for v in [1, 2, 3] {
            eng.write_integer(v).unwrap();
        }
        assert_eq!(written(eng.end_record()), "  1  2\n  3");
        assert_eq!(dev.lines().unwrap(), ["  1  2", "  3"]);
        assert_eq!(dev.record(), 3);
    }

    #[test]
    fn mismatch_is_fatal_even_with_iostat() {
        let program = FormatProgram::parse("(I5)").unwrap();
        let mut cursor = program.cursor();
        let mut dev = Device::internal(Vec::<String>::new());
        let opts = StatementOptions::default().with_handlers(crate::iostat::Handlers::IOSTAT);
        let mut eng = WriteEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, opts);
        assert!(matches!(
            eng.write_text("no").unwrap_err(),
            Fault::Format(FormatError::Mismatch { letter: 'I', .. })
        ));
    }

    #[test]
    fn no_advance_keeps_record_open() {
        let program = FormatProgram::parse("('prompt> ',$)").unwrap();
        let mut cursor = program.cursor();
        let mut dev = Device::internal(Vec::<String>::new());
        let mut eng = WriteEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
        assert_eq!(written(eng.end_record()), "prompt> ");
        drop(eng);
        assert_eq!(dev.record(), 1);
        let mut eng = WriteEngine::new(&mut dev, None, &StandardCodec, StatementOptions::default());
        eng.write_integer(5).unwrap();
        eng.end_record().unwrap();
        assert_eq!(dev.lines().unwrap(), ["prompt> 5"]);
    }

    #[test]
    fn complex_takes_two_directives() {
        let program = FormatProgram::parse("(2F5.1)").unwrap();
        let mut cursor = program.cursor();
        let mut dev = Device::internal(Vec::<String>::new());
        let mut eng = WriteEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
        eng.write_complex(1.5, -2.0).unwrap();
        assert_eq!(written(eng.end_record()), "  1.5 -2.0");
    }

    #[test]
    fn binary_payload_layout() {
        let mut out = Vec::new();
        encode_binary(&Value::Integer(1), &mut out);
        encode_binary(&Value::Logical(true), &mut out);
        encode_binary(&Value::Text("ab".into()), &mut out);
        assert_eq!(out, [1, 0, 0, 0, 1, 0, 0, 0, b'a', b'b']);
    }
}
