//! Source location tracking for error reporting.
//!
//! Every token carries both a [`Span`] (a byte range, used to label source
//! text when rendering diagnostics) and a [`Position`] (line/column, used in
//! messages). Both refer to the line-ending-normalized text produced by
//! [`crate::PreprocessedSource`].

use std::fmt;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a source file.
///
/// The front end parses one file per call; the id only matters to hosts that
/// merge diagnostics from several files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileId(pub u32);

impl FileId {
    /// The default file ID for the main source file.
    pub const MAIN: FileId = FileId(0);
}

/// A contiguous range of bytes in one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// The source file this span belongs to.
    pub file: FileId,
    /// Byte offset of the start of this span (0-indexed).
    pub start: u32,
    /// Byte offset of the end of this span (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Create a span in the main source file.
    pub fn main(start: u32, end: u32) -> Self {
        Self::new(FileId::MAIN, start, end)
    }

    /// Create an empty span at a position.
    pub fn point(file: FileId, pos: u32) -> Self {
        Self::new(file, pos, pos)
    }

    /// Length of this span in bytes.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Extend this span to include another span.
    pub fn extend(self, other: Span) -> Self {
        debug_assert_eq!(self.file, other.file, "Cannot extend span across files");
        Self {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Convert to a byte range.
    pub fn to_range(&self) -> Range<usize> {
        (self.start as usize)..(self.end as usize)
    }
}

/// A resolved point in the source: 1-indexed line and column plus the byte
/// offset it was computed from.
///
/// Columns count characters, not bytes, so a tab or a multi-byte character
/// each advance the column by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, in characters).
    pub column: u32,
    /// Byte offset into the normalized source (0-indexed).
    pub offset: u32,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: u32) -> Self {
        Self { line, column, offset }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
