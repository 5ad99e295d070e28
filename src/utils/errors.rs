//! Error types for the schedule transformer.
//!
//! This module defines all error types used throughout the crate,
//! organized by the phase that produces them.

use thiserror::Error;
use crate::utils::location::Span;
use std::fmt;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum PwaffError {
    /// Error while parsing set/relation notation or a directive
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error inside the relation algebra
    #[error("Polyhedral error: {0}")]
    Poly(#[from] PolyError),

    /// Error while loading or validating a SCoP
    #[error("SCoP error: {0}")]
    Scop(#[from] ScopError),

    /// Error during transformation
    #[error("Transformation error: {0}")]
    Transform(#[from] TransformError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error while parsing text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The error message
    pub message: String,
    /// Location in the parsed text
    pub span: Span,
    /// The kind of parse error
    pub kind: ParseErrorKind,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(message: impl Into<String>, span: Span, kind: ParseErrorKind) -> Self {
        Self {
            message: message.into(),
            span,
            kind,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

/// Kind of parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected character
    UnexpectedChar,
    /// Unexpected token
    UnexpectedToken,
    /// Identifier is neither a tuple variable nor a known parameter
    UnknownIdentifier,
    /// Expression is not affine (e.g. product of two variables)
    NonAffine,
    /// Integer literal out of range
    InvalidNumber,
    /// Unexpected end of input
    UnexpectedEof,
    /// Construct recognised but not supported
    Unsupported,
}

/// Error inside the relation algebra.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolyError {
    /// A dimension could not be bounded while enumerating
    #[error("dimension {dim} has no finite bounds")]
    Unbounded {
        /// Index of the unbounded column
        dim: usize,
    },

    /// Enumeration produced more points than allowed
    #[error("enumeration exceeded the limit of {limit} points")]
    TooManyPoints {
        /// Configured point limit
        limit: usize,
    },

    /// Operands live in spaces of different dimension
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        found: usize,
    },

    /// A parameter has no value in the context
    #[error("parameter `{0}` has no value in the context")]
    UnknownParameter(String),
}

/// Error while loading or validating a SCoP.
#[derive(Error, Debug, Clone)]
pub struct ScopError {
    /// The error message
    pub message: String,
    /// The kind of SCoP error
    pub kind: ScopErrorKind,
}

impl ScopError {
    /// Create a new SCoP error.
    pub fn new(message: impl Into<String>, kind: ScopErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl fmt::Display for ScopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Kind of SCoP error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopErrorKind {
    /// Statement name used twice
    DuplicateStatement,
    /// Reference to a statement that does not exist
    UnknownStatement,
    /// Schedule is not a relation from the statement's iteration space
    ScheduleMismatch,
    /// Two statements are scheduled onto the same point
    OverlappingSchedules,
}

/// Error during transformation.
#[derive(Error, Debug, Clone)]
pub struct TransformError {
    /// The error message
    pub message: String,
    /// The kind of transformation error
    pub kind: TransformErrorKind,
    /// The directive (or stage) that failed
    pub transform: String,
}

impl TransformError {
    /// Create a new transformation error.
    pub fn new(
        message: impl Into<String>,
        kind: TransformErrorKind,
        transform: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            kind,
            transform: transform.into(),
        }
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.message, self.transform)
    }
}

/// Kind of transformation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformErrorKind {
    /// Directive references a label with no metadata (strict policy only)
    UnknownLabel,
    /// New schedule maps some statement instance to several points
    NonFunctionalSchedule,
    /// Relation algebra failed while building a directive
    Algebra,
}

/// A diagnostic message with severity level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level
    pub severity: DiagnosticSeverity,
    /// Message
    pub message: String,
    /// Additional notes
    pub notes: Vec<String>,
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    /// Error - the transformation was not applied
    Error,
    /// Warning - the pass continues with reduced checking or skipped work
    Warning,
    /// Note - informational message
    Note,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Create a new note diagnostic.
    pub fn note(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Note,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Add a note to the diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Note => "note",
        };
        write!(f, "{}: {}", level, self.message)?;
        for note in &self.notes {
            write!(f, "\n  = {}", note)?;
        }
        Ok(())
    }
}

/// Result type using PwaffError.
pub type PwaffResult<T> = Result<T, PwaffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(
            "Unexpected token",
            Span::new(1, 5, 1, 10),
            ParseErrorKind::UnexpectedToken,
        );
        let s = format!("{}", err);
        assert!(s.contains("Unexpected token"));
        assert!(s.contains("1:5"));
    }

    #[test]
    fn test_diagnostic_notes() {
        let diag = Diagnostic::warning("dependences unavailable")
            .with_note("only injectivity is checked");
        let s = diag.to_string();
        assert!(s.starts_with("warning: dependences unavailable"));
        assert!(s.contains("= only injectivity is checked"));
    }

    #[test]
    fn test_poly_error_conversion() {
        let err: PwaffError = PolyError::TooManyPoints { limit: 10 }.into();
        assert!(err.to_string().contains("limit of 10 points"));
    }
}
