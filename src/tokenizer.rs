use crate::lexical::{is_comment, is_line_break, is_wsp, skip_c_nl};

/// A scanned word and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub pos: usize,
}

impl Token {
    pub fn new(value: impl Into<String>, pos: usize) -> Token {
        Token {
            value: value.into(),
            pos,
        }
    }
}

/// Cursor over a configuration buffer.
#[derive(Debug)]
pub struct Tokenizer<'a> {
    data: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn from_str(data: &'a str) -> Tokenizer<'a> {
        Tokenizer { data, pos: 0 }
    }

    pub fn data(&self) -> &'a str {
        self.data
    }

    fn bytes(&self) -> &'a [u8] {
        self.data.as_bytes()
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// `;`, `#`, or a line terminator.
    pub fn at_terminator(&self) -> bool {
        is_comment(self.bytes(), self.pos) || is_line_break(self.bytes(), self.pos)
    }

    // Skip whitespace within the line.
    pub fn skip_space(&mut self) {
        while is_wsp(self.bytes(), self.pos) {
            self.pos += 1;
        }
    }

    /// Skip an optional comment and the end of the line.
    pub fn skip_line(&mut self) -> bool {
        let data = self.bytes();
        skip_c_nl(data, &mut self.pos)
    }

    fn scan(&mut self, f: impl Fn(u8) -> bool) -> Token {
        let start = self.pos;
        while self.bytes().get(self.pos).map_or(false, |&c| f(c)) {
            self.pos += 1;
        }
        Token::new(self.text(start, self.pos).to_ascii_lowercase(), start)
    }

    /// Directive name: letters and `_`, lowercased.
    pub fn parse_name(&mut self) -> Token {
        self.scan(|c| c.is_ascii_alphabetic() || c == b'_')
    }

    /// Directive argument: letters, digits, `_` and `=`, lowercased.
    pub fn parse_argument(&mut self) -> Token {
        self.scan(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'=')
    }

    /// The rest of the line up to the terminator, trailing whitespace removed.
    pub fn parse_raw(&mut self) -> Token {
        let start = self.pos;
        while !self.is_eof() && !self.at_terminator() {
            self.pos += 1;
        }
        let mut end = self.pos;
        while end > start && is_wsp(self.bytes(), end - 1) {
            end -= 1;
        }
        Token::new(self.text(start, end), start)
    }

    /// The character under the cursor, for error messages.
    pub fn unexpected(&self) -> Token {
        let value = self
            .data
            .get(self.pos..)
            .and_then(|s| s.chars().next())
            .map(|c| c.to_string())
            .unwrap_or_default();
        Token::new(value, self.pos)
    }

    fn text(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.bytes()[start..end]).into_owned()
    }

    pub fn save_pos(&self) -> usize {
        self.pos
    }

    pub fn restore_pos(&mut self, pos: usize) {
        self.pos = pos;
    }
}
