//! Output record under construction.

/// Characters of one output record plus a write cursor.
///
/// Writes overwrite in place and extend the line as needed; moving the
/// cursor past the end pads with blanks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    chars: Vec<char>,
    cursor: usize,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Blank-pad the line to at least `len` characters.
    pub fn pad_to(&mut self, len: usize) {
        if self.chars.len() < len {
            self.chars.resize(len, ' ');
        }
    }

    /// Place the cursor at `pos`, padding the line up to it.
    pub fn move_to(&mut self, pos: usize) {
        self.pad_to(pos);
        self.cursor = pos;
    }

    /// Move by `delta`, stopping at column zero.
    pub fn move_by(&mut self, delta: i32) {
        let target = if delta < 0 {
            self.cursor.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            self.cursor + delta as usize
        };
        self.move_to(target);
    }

    /// Write `text` at the cursor and advance past it.
    pub fn put(&mut self, text: &str) {
        for c in text.chars() {
            if self.cursor < self.chars.len() {
                self.chars[self.cursor] = c;
            } else {
                self.chars.push(c);
            }
            self.cursor += 1;
        }
    }

    /// Take the finished line, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.chars).into_iter().collect()
    }

    #[must_use]
    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_move_pads_with_blanks() {
        let mut line = LineBuffer::new();
        line.put("ab");
        line.move_to(5);
        line.put("c");
        assert_eq!(line.as_string(), "ab   c");
        assert_eq!(line.cursor(), 6);
    }

    #[test]
    fn backward_move_overwrites_in_place() {
        let mut line = LineBuffer::new();
        line.put("abcdef");
        line.move_by(-4);
        line.put("XY");
        assert_eq!(line.as_string(), "abXYef");
        line.move_by(-100);
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    fn take_resets() {
        let mut line = LineBuffer::new();
        line.put("xyz");
        assert_eq!(line.take(), "xyz");
        assert!(line.is_empty());
        assert_eq!(line.cursor(), 0);
    }
}
