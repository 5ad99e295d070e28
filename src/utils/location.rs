//! Positions inside set/relation text and script lines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Byte offset from the start of the text
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Location of the first character.
    pub fn start() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }
}

/// A range of text between two locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    /// Byte offset of start
    pub start_offset: usize,
    /// Byte offset one past the end
    pub end_offset: usize,
}

impl Span {
    /// Create a span from line/column pairs, without byte offsets.
    pub fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
            start_offset: 0,
            end_offset: 0,
        }
    }

    pub fn from_locations(start: SourceLocation, end: SourceLocation) -> Self {
        Self {
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column,
            start_offset: start.offset,
            end_offset: end.offset,
        }
    }

    /// Smallest span covering both.
    pub fn merge(&self, other: &Span) -> Span {
        let (first, last) = if self.start_offset <= other.start_offset {
            (self, other)
        } else {
            (other, self)
        };
        let end = if last.end_offset >= first.end_offset { last } else { first };
        Span {
            start_line: first.start_line,
            start_column: first.start_column,
            end_line: end.end_line,
            end_column: end.end_column,
            start_offset: first.start_offset,
            end_offset: end.end_offset,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end_offset.saturating_sub(self.start_offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The spanned part of `source`, if the offsets fit.
    pub fn text<'s>(&self, source: &'s str) -> Option<&'s str> {
        source.get(self.start_offset..self.end_offset)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "{}:{}-{}", self.start_line, self.start_column, self.end_column)
        } else {
            write!(
                f,
                "{}:{}-{}:{}",
                self.start_line, self.start_column, self.end_line, self.end_column
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(1, 5, 1, 10).to_string(), "1:5-10");
        assert_eq!(Span::new(1, 5, 2, 3).to_string(), "1:5-2:3");
    }

    #[test]
    fn test_span_merge_and_text() {
        let source = "realign(S0, S1, 1)";
        let a = Span::from_locations(SourceLocation::new(1, 9, 8), SourceLocation::new(1, 11, 10));
        let b = Span::from_locations(SourceLocation::new(1, 13, 12), SourceLocation::new(1, 15, 14));
        let merged = b.merge(&a);
        assert_eq!(merged.text(source), Some("S0, S1"));
        assert_eq!(merged.len(), 6);
        assert!(!merged.is_empty());
    }
}
