//! A connected unit: its attributes, position, and backing record store.

pub mod store;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::iostat::IoStat;
use store::{MemoryStore, RecordStore};

/// Unit number reported by internal (in-memory) units.
pub const INTERNAL_UNIT: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Access {
    Sequential,
    Direct,
}

impl Access {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "SEQUENTIAL",
            Self::Direct => "DIRECT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Form {
    Formatted,
    Unformatted,
}

impl Form {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Formatted => "FORMATTED",
            Self::Unformatted => "UNFORMATTED",
        }
    }
}

/// Treatment of blanks inside numeric input fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlankMode {
    /// Blanks are ignored.
    #[default]
    Null,
    /// Non-leading blanks are zeros.
    Zero,
}

impl BlankMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Zero => "ZERO",
        }
    }
}

/// Attributes fixed when a unit is connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub unit: i32,
    pub path: Option<PathBuf>,
    pub access: Access,
    pub form: Form,
    pub blank: BlankMode,
    pub scratch: bool,
    pub is_new: bool,
    pub recl: Option<usize>,
    pub carriage_control: bool,
}

/// One connected unit.
#[derive(Debug)]
pub struct Device {
    conn: Connection,
    /// 1-based index of the next record to transfer.
    record: usize,
    /// Text of a record written without advancing; the next write extends it.
    partial: Option<String>,
    store: Box<dyn RecordStore>,
}

impl Device {
    #[must_use]
    pub fn new(conn: Connection, store: Box<dyn RecordStore>) -> Self {
        Self {
            conn,
            record: 1,
            partial: None,
            store,
        }
    }

    /// A formatted sequential unit over in-memory lines.
    pub fn internal<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let conn = Connection {
            unit: INTERNAL_UNIT,
            path: None,
            access: Access::Sequential,
            form: Form::Formatted,
            blank: BlankMode::Null,
            scratch: false,
            is_new: false,
            recl: None,
            carriage_control: false,
        };
        Self::new(conn, Box::new(MemoryStore::from_lines(lines)))
    }

    #[must_use]
    pub fn unit(&self) -> i32 {
        self.conn.unit
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.conn.path.as_deref()
    }

    #[must_use]
    pub fn access(&self) -> Access {
        self.conn.access
    }

    #[must_use]
    pub fn form(&self) -> Form {
        self.conn.form
    }

    #[must_use]
    pub fn blank(&self) -> BlankMode {
        self.conn.blank
    }

    pub fn set_blank(&mut self, blank: BlankMode) {
        self.conn.blank = blank;
    }

    #[must_use]
    pub fn is_scratch(&self) -> bool {
        self.conn.scratch
    }

    /// Whether OPEN created the file.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.conn.is_new
    }

    #[must_use]
    pub fn recl(&self) -> Option<usize> {
        self.conn.recl
    }

    #[must_use]
    pub fn record(&self) -> usize {
        self.record
    }

    #[must_use]
    pub fn carriage_control(&self) -> bool {
        self.conn.carriage_control
    }

    pub fn set_carriage_control(&mut self, on: bool) {
        self.conn.carriage_control = on;
    }

    #[must_use]
    pub fn has_partial(&self) -> bool {
        self.partial.is_some()
    }

    // -- positioning --------------------------------------------------------

    /// Move to the next record.
    pub fn advance(&mut self) {
        self.record = self.record.saturating_add(1);
    }

    /// Position a direct-access unit at record `n`.
    pub fn seek_record(&mut self, n: usize) -> Result<(), IoStat> {
        if self.conn.access != Access::Direct || n == 0 {
            return Err(IoStat::IllegalAccess);
        }
        self.finish_partial();
        self.record = n;
        Ok(())
    }

    /// Complete a pending non-advancing record.
    pub fn finish_partial(&mut self) {
        if self.partial.take().is_some() {
            self.record = self.record.saturating_add(1);
        }
    }

    pub fn backspace(&mut self) -> Result<(), IoStat> {
        if self.conn.access != Access::Sequential {
            return Err(IoStat::BackspaceError);
        }
        self.finish_partial();
        if self.record <= 1 {
            return Err(IoStat::EndfileError);
        }
        self.record -= 1;
        Ok(())
    }

    pub fn rewind(&mut self) {
        self.partial = None;
        self.record = 1;
    }

    /// Discard the current record and everything after it.
    pub fn truncate(&mut self) -> Result<(), IoStat> {
        self.finish_partial();
        self.store
            .truncate(self.record)
            .map_err(|_| IoStat::EndfileError)
    }

    // -- transfer -----------------------------------------------------------

    /// Raw payload of the current record, or `None` at end of file.
    pub fn fetch(&mut self) -> Result<Option<Vec<u8>>, IoStat> {
        self.store
            .read_record(self.record)
            .map_err(|_| IoStat::ReadError)
    }

    /// Current record as text.
    pub fn fetch_line(&mut self) -> Result<Option<String>, IoStat> {
        Ok(self
            .fetch()?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Write one formatted record. Without `advance` the record stays
    /// current and the next write extends it.
    pub fn write_line(&mut self, text: &str, advance: bool) -> Result<(), IoStat> {
        let line = match self.partial.take() {
            Some(mut pending) => {
                pending.push_str(text);
                pending
            }
            None if self.conn.carriage_control => self.apply_carriage_control(text)?,
            None => text.to_string(),
        };
        if let Some(recl) = self.conn.recl {
            if line.chars().count() > recl {
                return Err(IoStat::WriteError);
            }
        }
        self.put(line.as_bytes())?;
        if advance {
            self.record = self.record.saturating_add(1);
        } else {
            self.partial = Some(line);
        }
        Ok(())
    }

    /// Write one unformatted record and advance.
    pub fn write_binary(&mut self, data: &[u8]) -> Result<(), IoStat> {
        self.finish_partial();
        self.put(data)?;
        self.record = self.record.saturating_add(1);
        Ok(())
    }

    fn put(&mut self, data: &[u8]) -> Result<(), IoStat> {
        self.store
            .write_record(self.record, data)
            .map_err(|_| IoStat::WriteError)?;
        if self.conn.access == Access::Sequential {
            self.store
                .truncate(self.record.saturating_add(1))
                .map_err(|_| IoStat::WriteError)?;
        }
        Ok(())
    }

    /// Interpret the leading control character of an output record.
    fn apply_carriage_control(&mut self, text: &str) -> Result<String, IoStat> {
        let mut chars = text.chars();
        let body: String = match chars.next() {
            Some('0') => {
                self.put(b"")?;
                self.record = self.record.saturating_add(1);
                chars.collect()
            }
            Some('1') => {
                let mut s = String::from('\u{c}');
                s.extend(chars);
                s
            }
            Some(_) => chars.collect(),
            None => String::new(),
        };
        Ok(body)
    }

    /// Every record of the unit as text (used to inspect internal units).
    pub fn lines(&mut self) -> Result<Vec<String>, IoStat> {
        let mut out = Vec::new();
        let mut n = 1;
        while let Some(bytes) = self.store.read_record(n).map_err(|_| IoStat::ReadError)? {
            out.push(String::from_utf8_lossy(&bytes).into_owned());
            n += 1;
        }
        Ok(out)
    }

    pub fn flush(&mut self) -> Result<(), IoStat> {
        self.store.flush().map_err(|_| IoStat::WriteError)
    }

    /// Flush and release the unit, returning its connection attributes.
    pub fn disconnect(mut self) -> Connection {
        self.finish_partial();
        if let Err(err) = self.store.flush() {
            debug!(unit = self.conn.unit, error = %err, "flush on disconnect failed");
        }
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_unit_reads_lines_in_order() {
        let mut dev = Device::internal(["alpha", "beta"]);
        assert_eq!(dev.unit(), INTERNAL_UNIT);
        assert_eq!(dev.fetch_line().unwrap().as_deref(), Some("alpha"));
        dev.advance();
        assert_eq!(dev.fetch_line().unwrap().as_deref(), Some("beta"));
        dev.advance();
        assert_eq!(dev.fetch_line().unwrap(), None);
    }

    #[test]
    fn sequential_write_truncates_following_records() {
        let mut dev = Device::internal(["a", "b", "c"]);
        dev.advance();
        dev.write_line("x", true).unwrap();
        assert_eq!(dev.lines().unwrap(), ["a", "x"]);
        assert_eq!(dev.record(), 3);
    }

    #[test]
    fn non_advancing_write_extends_the_record() {
        let mut dev = Device::internal(Vec::<String>::new());
        dev.write_line("abc", false).unwrap();
        assert_eq!(dev.record(), 1);
        assert!(dev.has_partial());
        dev.write_line("def", true).unwrap();
        assert_eq!(dev.lines().unwrap(), ["abcdef"]);
        assert_eq!(dev.record(), 2);
    }

    #[test]
    fn carriage_control_codes() {
        let mut dev = Device::internal(Vec::<String>::new());
        dev.set_carriage_control(true);
        dev.write_line(" plain", true).unwrap();
        dev.write_line("0double", true).unwrap();
        dev.write_line("1page", true).unwrap();
        dev.write_line("+over", true).unwrap();
        assert_eq!(dev.lines().unwrap(), ["plain", "", "double", "\u{c}page", "over"]);
    }

    #[test]
    fn backspace_rules() {
        let mut dev = Device::internal(["a", "b"]);
        assert_eq!(dev.backspace(), Err(IoStat::EndfileError));
        dev.advance();
        dev.backspace().unwrap();
        assert_eq!(dev.record(), 1);
        assert_eq!(dev.seek_record(1), Err(IoStat::IllegalAccess));
    }

    #[test]
    fn truncate_at_current_record() {
        let mut dev = Device::internal(["a", "b", "c"]);
        dev.advance();
        dev.truncate().unwrap();
        assert_eq!(dev.lines().unwrap(), ["a"]);
        dev.rewind();
        assert_eq!(dev.record(), 1);
    }
}
