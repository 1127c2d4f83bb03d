//! Source preprocessing ahead of scanning.
//!
//! The JASM scanner treats `\n` as the only line terminator. Raw input is
//! passed through [`PreprocessedSource::new()`] first, which:
//! - normalizes `\r\n` and bare `\r` to `\n`
//! - builds a [`LineIndex`] from actual byte positions in the normalized text,
//!   so offsets never drift by one byte per `\r\n` line

use crate::span::Position;

/// Normalized source text plus its precomputed line index.
#[derive(Debug, Clone)]
pub struct PreprocessedSource {
    /// Source text with all line endings converted to `\n`.
    pub text: String,
    /// Line offset index built from the normalized text.
    pub line_index: LineIndex,
}

impl PreprocessedSource {
    /// Normalize line endings and index the result.
    pub fn new(raw: &str) -> Self {
        Self::from_unix(normalize_line_endings(raw))
    }

    /// Index text that must not be normalized.
    ///
    /// Any `\r` bytes are kept as ordinary characters, which the scanner will
    /// then reject.
    pub fn from_unix(text: String) -> Self {
        let line_index = LineIndex::new(&text);
        Self { text, line_index }
    }

    /// Resolve a byte offset into a 1-indexed line/column [`Position`].
    ///
    /// Offsets past the end of the text resolve to the end of the last line.
    /// An offset inside a multi-byte character resolves to that character.
    pub fn position(&self, offset: u32) -> Position {
        let offset = offset.min(self.text.len() as u32);
        let (line, line_start) = self.line_index.locate(offset);
        let column = self.text[line_start as usize..]
            .char_indices()
            .take_while(|(i, _)| line_start + (*i as u32) < offset)
            .count();
        Position::new(line + 1, column as u32 + 1, offset)
    }

    /// Number of physical lines, counting the (possibly empty) segment after
    /// the last `\n`.
    pub fn line_count(&self) -> usize {
        self.line_index.line_count()
    }
}

/// Byte offset of the start of every line in a normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// `offsets[i]` is the byte offset where line `i` (0-indexed) begins.
    offsets: Vec<u32>,
}

impl LineIndex {
    /// Build a line index from `\n`-terminated text.
    pub fn new(text: &str) -> Self {
        let mut offsets = vec![0];
        offsets.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| (i + 1) as u32),
        );
        Self { offsets }
    }

    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }

    /// Byte offset where the given line (0-indexed) starts.
    pub fn line_start(&self, line: usize) -> Option<u32> {
        self.offsets.get(line).copied()
    }

    /// The 0-indexed line containing `offset`, and that line's start offset.
    pub fn locate(&self, offset: u32) -> (u32, u32) {
        let line = match self.offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert_point) => insert_point.saturating_sub(1),
        };
        (line as u32, self.offsets[line])
    }
}

/// Normalize line endings to `\n`.
///
/// Converts `\r\n` and bare `\r` to `\n`; everything else is copied through
/// unchanged, including multi-byte characters.
pub fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            out.push('\n');
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
        } else {
            out.push(c);
        }
    }
    out
}
