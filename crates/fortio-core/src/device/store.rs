//! Record-level storage behind a connected unit.
//!
//! A store addresses records by 1-based index. Variable-length layouts
//! (`Text`, `Framed`) locate records by scanning and cache every record
//! start they discover; fixed layouts compute offsets directly.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};

/// Physical record framing of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// Formatted sequential: newline-terminated lines.
    Text,
    /// Formatted direct: `recl` characters, blank padded, then a newline.
    FixedText { recl: usize },
    /// Unformatted sequential: payload framed by little-endian `u32` lengths.
    Framed,
    /// Unformatted direct: `recl` bytes, zero padded.
    Fixed { recl: usize },
}

impl RecordLayout {
    /// On-disk size of one record for fixed layouts.
    #[must_use]
    pub fn fixed_size(self) -> Option<u64> {
        match self {
            Self::FixedText { recl } => Some(recl as u64 + 1),
            Self::Fixed { recl } => Some(recl as u64),
            Self::Text | Self::Framed => None,
        }
    }

    fn recl(self) -> Option<usize> {
        match self {
            Self::FixedText { recl } | Self::Fixed { recl } => Some(recl),
            Self::Text | Self::Framed => None,
        }
    }

    fn pad_byte(self) -> u8 {
        match self {
            Self::FixedText { .. } | Self::Text => b' ',
            Self::Fixed { .. } | Self::Framed => 0,
        }
    }
}

/// Primitive record file handle.
pub trait RecordStore: std::fmt::Debug + Send {
    /// Payload of record `n`, or `None` past the last record.
    fn read_record(&mut self, n: usize) -> io::Result<Option<Vec<u8>>>;

    /// Replace record `n`.
    fn write_record(&mut self, n: usize, data: &[u8]) -> io::Result<()>;

    /// Discard record `n` and everything after it.
    fn truncate(&mut self, n: usize) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn invalid(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

/// Blank or zero records a direct write may insert past the end of file.
const MAX_GAP_RECORDS: u64 = 1 << 20;

/// Byte offset of fixed-size record `n`.
fn fixed_offset(n: usize, size: u64) -> io::Result<u64> {
    u64::try_from(n)
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| index.checked_mul(size))
        .ok_or_else(|| invalid("record number out of range"))
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FileStore {
    file: File,
    layout: RecordLayout,
    /// `offsets[i]` is the start of record `i + 1` (variable layouts only).
    offsets: Vec<u64>,
}

impl FileStore {
    #[must_use]
    pub fn new(file: File, layout: RecordLayout) -> Self {
        Self {
            file,
            layout,
            offsets: vec![0],
        }
    }

    #[must_use]
    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    fn file_len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Start of record `n`. For variable layouts `None` means fewer than
    /// `n - 1` records exist; the start of the record after the last one is
    /// the end of the file.
    fn start_of(&mut self, n: usize) -> io::Result<Option<u64>> {
        if n == 0 {
            return Err(invalid("record numbers start at 1"));
        }
        if let Some(size) = self.layout.fixed_size() {
            return fixed_offset(n, size).map(Some);
        }
        while self.offsets.len() < n {
            let start = self.offsets[self.offsets.len() - 1];
            match self.end_of(start)? {
                Some(end) => self.offsets.push(end),
                None => return Ok(None),
            }
        }
        Ok(Some(self.offsets[n - 1]))
    }

    /// End of the variable-length record beginning at `start`.
    fn end_of(&mut self, start: u64) -> io::Result<Option<u64>> {
        self.file.seek(SeekFrom::Start(start))?;
        match self.layout {
            RecordLayout::Framed => {
                let mut header = [0u8; 4];
                match self.file.read_exact(&mut header) {
                    Ok(()) => Ok(Some(start + 8 + u64::from(u32::from_le_bytes(header)))),
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
                    Err(e) => Err(e),
                }
            }
            _ => {
                let mut reader = BufReader::new(&self.file);
                let mut line = Vec::new();
                let read = reader.read_until(b'\n', &mut line)?;
                Ok((read > 0).then_some(start + read as u64))
            }
        }
    }

    fn read_span(&mut self, start: u64, len: usize) -> io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(start))?;
        let mut buf = Vec::with_capacity(len);
        (&self.file).take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn write_fixed(&mut self, n: usize, recl: usize, data: &[u8]) -> io::Result<()> {
        if data.len() > recl {
            return Err(invalid("record longer than RECL"));
        }
        let size = self.layout.fixed_size().unwrap_or(recl as u64);
        let start = fixed_offset(n, size)?;
        let len = self.file_len()?;
        if start > len {
            let existing = len / size;
            let index = start / size;
            if index - existing > MAX_GAP_RECORDS {
                return Err(invalid("record number too far past end of file"));
            }
            match self.layout {
                RecordLayout::FixedText { .. } => {
                    let mut blank = vec![b' '; recl];
                    blank.push(b'\n');
                    self.file.seek(SeekFrom::Start(existing * size))?;
                    for _ in existing..index {
                        self.file.write_all(&blank)?;
                    }
                }
                _ => self.file.set_len(start)?,
            }
        }
        let mut record = data.to_vec();
        record.resize(recl, self.layout.pad_byte());
        if matches!(self.layout, RecordLayout::FixedText { .. }) {
            record.push(b'\n');
        }
        self.file.seek(SeekFrom::Start(start))?;
        self.file.write_all(&record)
    }

    fn write_variable(&mut self, n: usize, data: &[u8]) -> io::Result<()> {
        let Some(start) = self.start_of(n)? else {
            return Err(invalid("record gap in sequential file"));
        };
        let mut bytes = Vec::with_capacity(data.len() + 9);
        let mut shifted = false;
        match self.layout {
            RecordLayout::Framed => {
                let len = u32::try_from(data.len()).map_err(|_| invalid("record too long"))?;
                bytes.extend_from_slice(&len.to_le_bytes());
                bytes.extend_from_slice(data);
                bytes.extend_from_slice(&len.to_le_bytes());
            }
            _ => {
                if start > 0 {
                    // An unterminated last line must not absorb the new record.
                    let prev = self.read_span(start - 1, 1)?;
                    if prev != b"\n" {
                        bytes.push(b'\n');
                        shifted = true;
                    }
                }
                bytes.extend_from_slice(data);
                bytes.push(b'\n');
            }
        }
        self.file.seek(SeekFrom::Start(start))?;
        self.file.write_all(&bytes)?;
        let end = start + bytes.len() as u64;
        self.file.set_len(end)?;
        self.offsets.truncate(n);
        if shifted {
            self.offsets[n - 1] = start + 1;
        }
        self.offsets.push(end);
        Ok(())
    }
}

impl RecordStore for FileStore {
    fn read_record(&mut self, n: usize) -> io::Result<Option<Vec<u8>>> {
        let Some(start) = self.start_of(n)? else {
            return Ok(None);
        };
        let len = self.file_len()?;
        if start >= len {
            return Ok(None);
        }
        match self.layout {
            RecordLayout::FixedText { recl } | RecordLayout::Fixed { recl } => {
                let mut buf = self.read_span(start, recl)?;
                buf.resize(recl, self.layout.pad_byte());
                Ok(Some(buf))
            }
            RecordLayout::Framed => {
                let Some(end) = self.start_of(n + 1)? else {
                    return Ok(None);
                };
                let total = usize::try_from(end - start).map_err(|_| invalid("record too long"))?;
                let mut buf = self.read_span(start, total)?;
                if buf.len() < 8 {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated record"));
                }
                buf.truncate(total - 4);
                buf.drain(..4);
                Ok(Some(buf))
            }
            RecordLayout::Text => {
                let Some(end) = self.start_of(n + 1)? else {
                    return Ok(None);
                };
                let total = usize::try_from(end - start).map_err(|_| invalid("record too long"))?;
                let mut buf = self.read_span(start, total)?;
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                Ok(Some(buf))
            }
        }
    }

    fn write_record(&mut self, n: usize, data: &[u8]) -> io::Result<()> {
        if n == 0 {
            return Err(invalid("record numbers start at 1"));
        }
        match self.layout.recl() {
            Some(recl) => self.write_fixed(n, recl, data),
            None => self.write_variable(n, data),
        }
    }

    fn truncate(&mut self, n: usize) -> io::Result<()> {
        let len = self.file_len()?;
        if let Some(start) = self.start_of(n)? {
            if start < len {
                self.file.set_len(start)?;
            }
            self.offsets.truncate(n.max(1));
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Records held in memory; backs internal units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    records: Vec<Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            records: lines
                .into_iter()
                .map(|l| l.as_ref().as_bytes().to_vec())
                .collect(),
        }
    }

    #[must_use]
    pub fn records(&self) -> &[Vec<u8>] {
        &self.records
    }
}

impl RecordStore for MemoryStore {
    fn read_record(&mut self, n: usize) -> io::Result<Option<Vec<u8>>> {
        if n == 0 {
            return Err(invalid("record numbers start at 1"));
        }
        Ok(self.records.get(n - 1).cloned())
    }

    fn write_record(&mut self, n: usize, data: &[u8]) -> io::Result<()> {
        if n == 0 {
            return Err(invalid("record numbers start at 1"));
        }
        if self.records.len() < n {
            if (n - self.records.len()) as u64 > MAX_GAP_RECORDS {
                return Err(invalid("record number too far past end of store"));
            }
            self.records.resize(n, Vec::new());
        }
        self.records[n - 1] = data.to_vec();
        Ok(())
    }

    fn truncate(&mut self, n: usize) -> io::Result<()> {
        self.records.truncate(n.saturating_sub(1));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_store(layout: RecordLayout, contents: &[u8]) -> (FileStore, File) {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(contents).unwrap();
        let view = file.try_clone().unwrap();
        (FileStore::new(file, layout), view)
    }

    fn contents(file: &mut File) -> Vec<u8> {
        let mut out = Vec::new();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn text_records_read_by_index() {
        let (mut store, _) = file_store(RecordLayout::Text, b"one\ntwo\r\nthree");
        assert_eq!(store.read_record(2).unwrap().unwrap(), b"two");
        assert_eq!(store.read_record(1).unwrap().unwrap(), b"one");
        assert_eq!(store.read_record(3).unwrap().unwrap(), b"three");
        assert_eq!(store.read_record(4).unwrap(), None);
        assert_eq!(store.read_record(9).unwrap(), None);
    }

    #[test]
    fn text_write_discards_later_records() {
        let (mut store, mut view) = file_store(RecordLayout::Text, b"a\nb\nc\n");
        store.write_record(2, b"xyz").unwrap();
        assert_eq!(contents(&mut view), b"a\nxyz\n");
        store.write_record(3, b"d").unwrap();
        assert_eq!(contents(&mut view), b"a\nxyz\nd\n");
    }

    #[test]
    fn text_append_after_unterminated_line() {
        let (mut store, mut view) = file_store(RecordLayout::Text, b"a");
        store.write_record(2, b"b").unwrap();
        assert_eq!(contents(&mut view), b"a\nb\n");
        assert_eq!(store.read_record(2).unwrap().unwrap(), b"b");
    }

    #[test]
    fn text_gap_is_rejected() {
        let (mut store, _) = file_store(RecordLayout::Text, b"");
        assert!(store.write_record(3, b"x").is_err());
    }

    #[test]
    fn framed_records_round_trip() {
        let (mut store, _) = file_store(RecordLayout::Framed, b"");
        store.write_record(1, &[1, 2, 3]).unwrap();
        store.write_record(2, &[]).unwrap();
        store.write_record(3, &[9; 10]).unwrap();
        assert_eq!(store.read_record(1).unwrap().unwrap(), vec![1, 2, 3]);
        assert_eq!(store.read_record(2).unwrap().unwrap(), Vec::<u8>::new());
        assert_eq!(store.read_record(3).unwrap().unwrap(), vec![9; 10]);
        assert_eq!(store.read_record(4).unwrap(), None);
    }

    #[test]
    fn fixed_text_pads_and_fills_gaps() {
        let (mut store, mut view) = file_store(RecordLayout::FixedText { recl: 4 }, b"");
        store.write_record(2, b"ab").unwrap();
        assert_eq!(contents(&mut view), b"    \nab  \n");
        assert_eq!(store.read_record(2).unwrap().unwrap(), b"ab  ".to_vec());
        assert!(store.write_record(1, b"toolong").is_err());
    }

    #[test]
    fn fixed_binary_overwrites_in_place() {
        let (mut store, _) = file_store(RecordLayout::Fixed { recl: 4 }, b"");
        store.write_record(1, &[1]).unwrap();
        store.write_record(3, &[3, 3]).unwrap();
        store.write_record(1, &[7, 7, 7, 7]).unwrap();
        assert_eq!(store.read_record(1).unwrap().unwrap(), vec![7, 7, 7, 7]);
        assert_eq!(store.read_record(2).unwrap().unwrap(), vec![0; 4]);
        assert_eq!(store.read_record(3).unwrap().unwrap(), vec![3, 3, 0, 0]);
        assert_eq!(store.read_record(4).unwrap(), None);
    }

    #[test]
    fn out_of_range_record_numbers_are_errors() {
        let (mut store, mut view) = file_store(RecordLayout::Fixed { recl: 8 }, b"");
        let err = store.read_record(usize::MAX / 2).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(store.write_record(usize::MAX, &[1]).is_err());
        assert!(store.write_record(3 + MAX_GAP_RECORDS as usize, &[1]).is_err());
        assert!(contents(&mut view).is_empty());

        let (mut store, _) = file_store(RecordLayout::FixedText { recl: 4 }, b"");
        assert!(store.write_record(1 << 40, b"x").is_err());
        assert!(MemoryStore::new().write_record(1 << 40, b"x").is_err());
    }

    #[test]
    fn truncate_keeps_earlier_records() {
        let (mut store, mut view) = file_store(RecordLayout::Text, b"a\nb\nc\n");
        store.truncate(2).unwrap();
        assert_eq!(contents(&mut view), b"a\n");
        store.truncate(7).unwrap();
        assert_eq!(contents(&mut view), b"a\n");
    }

    #[test]
    fn memory_store_behaves_like_records() {
        let mut store = MemoryStore::from_lines(["x", "y"]);
        assert_eq!(store.read_record(2).unwrap().unwrap(), b"y");
        store.write_record(4, b"w").unwrap();
        assert_eq!(store.records().len(), 4);
        store.truncate(2).unwrap();
        assert_eq!(store.records(), &[b"x".to_vec()]);
        assert!(store.read_record(0).is_err());
    }
}
