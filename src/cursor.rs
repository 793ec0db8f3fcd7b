//! A byte cursor over a single source line.
//!
//! Every parser in the crate walks one of these. A failed sub-parse restores
//! the position it started from, so callers can try alternatives.

/// Cursor into one line of assembly source.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    line: &'a [u8],
    pos: usize,
    lineno: usize,
}

pub(crate) fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'.'
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at the start of `line`. `lineno` is 1-based.
    pub fn new(line: &'a str, lineno: usize) -> Self {
        Cursor {
            line: line.as_bytes(),
            pos: 0,
            lineno,
        }
    }

    /// Current byte offset into the line.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Restores a position previously taken with [`Cursor::pos`].
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// 1-based line number for diagnostics.
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    /// 1-based column of the current position.
    pub fn column(&self) -> usize {
        self.pos + 1
    }

    /// True when the cursor has consumed the whole line.
    pub fn at_end(&self) -> bool {
        self.pos >= self.line.len()
    }

    /// The byte under the cursor, if any.
    pub fn peek(&self) -> Option<u8> {
        self.line.get(self.pos).copied()
    }

    /// The byte `n` positions ahead of the cursor.
    pub fn peek_at(&self, n: usize) -> Option<u8> {
        self.line.get(self.pos + n).copied()
    }

    /// Advances over the current byte.
    pub fn bump(&mut self) {
        if self.pos < self.line.len() {
            self.pos += 1;
        }
    }

    /// Skips spaces and tabs.
    pub fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    /// Advances over one byte, then skips spaces.
    pub fn skip_char_and_spaces(&mut self) {
        self.bump();
        self.skip_spaces();
    }

    /// Consumes `expected` if it is the next byte.
    pub fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// The unconsumed remainder of the line.
    pub fn rest(&self) -> &'a [u8] {
        &self.line[self.pos.min(self.line.len())..]
    }

    /// Text between a previously saved position and the cursor.
    pub fn span(&self, start: usize) -> &'a str {
        std::str::from_utf8(&self.line[start..self.pos]).unwrap_or("")
    }

    /// Case-insensitive match of `word` at the cursor, without consuming.
    pub fn looking_at_nocase(&self, word: &str) -> bool {
        let rest = self.rest();
        rest.len() >= word.len()
            && rest[..word.len()].eq_ignore_ascii_case(word.as_bytes())
    }

    /// Extracts a symbol name: `[A-Za-z._$][A-Za-z0-9._$]*`. Returns an
    /// empty string without moving when the cursor is not at a name.
    pub fn extract_sym_name(&mut self) -> &'a str {
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b == b'.' => {}
            _ => return "",
        }
        while matches!(self.peek(), Some(b) if is_name_char(b)) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.line[start..self.pos]).unwrap_or("")
    }

    /// Extracts a plain word of `[A-Za-z0-9_]`, used for register and
    /// modifier names. Returns `None` without moving when absent.
    pub fn extract_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
            _ => return None,
        }
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        Some(std::str::from_utf8(&self.line[start..self.pos]).unwrap_or(""))
    }

    /// Parses a small decimal number (0-255), the way register indices and
    /// modifier counts are written.
    pub fn parse_byte(&mut self) -> Result<u8, crate::AsmError> {
        let mut value: u16 = 0;
        if !matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            return Err(crate::AsmError::Parse("Missing number".into()));
        }
        while let Some(b) = self.peek() {
            if !b.is_ascii_digit() {
                break;
            }
            value = value * 10 + u16::from(b - b'0');
            if value >= 256 {
                return Err(crate::AsmError::Range("Number is too big".into()));
            }
            self.pos += 1;
        }
        Ok(value as u8)
    }
}
