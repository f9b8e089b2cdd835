//! Character cursor shared by the phrase and sentence scanners.

/// Marker text for free speech, in both template languages.
pub const WILDCARD: &str = "...";

/// Output of scanning one template: the recognized tokens in order, plus the
/// text fragments that matched no token shape and were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan<T> {
    pub tokens: Vec<T>,
    pub rejected: Vec<String>,
}

impl<T> Default for Scan<T> {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> Scan<T> {
    pub(crate) fn push(&mut self, token: T) {
        self.tokens.push(token);
    }
}

/// Accumulates consecutive unrecognized characters into one fragment.
#[derive(Default)]
pub(crate) struct Rejects {
    pending: String,
}

impl Rejects {
    pub(crate) fn push(&mut self, c: char) {
        self.pending.push(c);
    }

    pub(crate) fn flush<T>(&mut self, scan: &mut Scan<T>) {
        if !self.pending.is_empty() {
            scan.rejected.push(std::mem::take(&mut self.pending));
        }
    }
}

pub(crate) struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn reset(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub(crate) fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    /// Consumes one or more `...` groups.
    pub(crate) fn eat_wildcard(&mut self) -> bool {
        let start = self.pos;
        while self.rest().starts_with(WILDCARD) {
            self.pos += WILDCARD.len();
        }
        self.pos > start
    }
}
