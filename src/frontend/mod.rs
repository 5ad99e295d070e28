//! Frontend: lexer and parsers for set/relation notation and scripts.
//!
//! Two small languages share one lexer:
//!
//! ```text
//! [N] -> { S0[i] : 0 <= i < N }          set / relation notation
//! isplit(S0, A, B, { [i] : i < 4 }, 0)   transformation directive
//! ```

pub mod token;
pub mod lexer;
pub mod notation;
pub mod directive;

// Re-exports
pub use lexer::Lexer;
pub use token::{Token, TokenKind};
pub use notation::{parse_relation, parse_set};
pub use directive::{parse_line, parse_line_checked, Directive};
pub use crate::utils::errors::ParseError;
