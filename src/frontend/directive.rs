//! Parser for transformation script lines.
//!
//! One directive per line:
//!
//! ```text
//! realign(L1, L2, n)
//! isplit(L, R1, R2, { [i] : i < 8 }, n)
//! affine(L, { [i] -> [floor(i / 4), i] })
//! lift(L, R, n)
//! ```
//!
//! Embedded set and relation texts are kept verbatim; they are parsed
//! later against the pass context.

use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::errors::{ParseError, ParseErrorKind};
use std::fmt;

/// One elementary schedule transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Move `second` directly after `first` at loop depth `depth`.
    Realign {
        /// Label that stays in place
        first: String,
        /// Label that is moved
        second: String,
        /// Loop depth of the realignment
        depth: usize,
    },
    /// Split the instances of `label` by a predicate.
    IndexSplit {
        /// Label being split
        label: String,
        /// Label of the instances satisfying the predicate
        first: String,
        /// Label of the remaining instances
        second: String,
        /// Predicate set over loop coordinates
        predicate: String,
        /// Loop depth at which the remainder is separated
        depth: usize,
    },
    /// Apply an affine relation to the loop coordinates of `label`.
    AffineRemap {
        /// Label being remapped
        label: String,
        /// Relation over loop coordinates
        relation: String,
    },
    /// Record the part of `label` sharing its first `depth` bands with the
    /// rest of the program as `result`.
    Lift {
        /// Label being lifted
        label: String,
        /// Label receiving the lifted domain
        result: String,
        /// Number of leading bands that must agree
        depth: usize,
    },
}

impl Directive {
    /// Script keyword of this directive.
    pub fn keyword(&self) -> &'static str {
        match self {
            Directive::Realign { .. } => "realign",
            Directive::IndexSplit { .. } => "isplit",
            Directive::AffineRemap { .. } => "affine",
            Directive::Lift { .. } => "lift",
        }
    }

    /// Labels the directive reads; all must be known for it to apply.
    pub fn required_labels(&self) -> Vec<&str> {
        match self {
            Directive::Realign { first, second, .. } => vec![first.as_str(), second.as_str()],
            Directive::IndexSplit { label, .. }
            | Directive::AffineRemap { label, .. }
            | Directive::Lift { label, .. } => vec![label.as_str()],
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Realign { first, second, depth } => {
                write!(f, "realign({}, {}, {})", first, second, depth)
            }
            Directive::IndexSplit { label, first, second, predicate, depth } => {
                write!(f, "isplit({}, {}, {}, {}, {})", label, first, second, predicate, depth)
            }
            Directive::AffineRemap { label, relation } => {
                write!(f, "affine({}, {})", label, relation)
            }
            Directive::Lift { label, result, depth } => {
                write!(f, "lift({}, {}, {})", label, result, depth)
            }
        }
    }
}

/// Parse one script line, yielding `None` if it is not a directive.
pub fn parse_line(line: &str) -> Option<Directive> {
    parse_line_checked(line).ok()
}

/// Parse one script line, reporting why it is not a directive.
pub fn parse_line_checked(line: &str) -> Result<Directive, ParseError> {
    let tokens = Lexer::new(line).tokenize()?;
    let mut parser = DirectiveParser { source: line, tokens, pos: 0 };
    parser.parse_directive()
}

struct DirectiveParser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl DirectiveParser<'_> {
    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let kind = if self.check(TokenKind::Eof) {
            ParseErrorKind::UnexpectedEof
        } else {
            ParseErrorKind::UnexpectedToken
        };
        ParseError::new(
            format!("expected {}, found '{}'", expected, self.current().lexeme),
            self.current().span,
            kind,
        )
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", kind)))
        }
    }

    fn parse_directive(&mut self) -> Result<Directive, ParseError> {
        let name = self.consume(TokenKind::Identifier)?;
        self.consume(TokenKind::LeftParen)?;
        let directive = match name.lexeme.as_str() {
            "realign" => {
                let first = self.label()?;
                self.consume(TokenKind::Comma)?;
                let second = self.label()?;
                self.consume(TokenKind::Comma)?;
                let depth = self.depth()?;
                Directive::Realign { first, second, depth }
            }
            "isplit" => {
                let label = self.label()?;
                self.consume(TokenKind::Comma)?;
                let first = self.label()?;
                self.consume(TokenKind::Comma)?;
                let second = self.label()?;
                self.consume(TokenKind::Comma)?;
                let predicate = self.raw_text()?;
                self.consume(TokenKind::Comma)?;
                let depth = self.depth()?;
                Directive::IndexSplit { label, first, second, predicate, depth }
            }
            "affine" => {
                let label = self.label()?;
                self.consume(TokenKind::Comma)?;
                let relation = self.raw_text()?;
                Directive::AffineRemap { label, relation }
            }
            "lift" => {
                let label = self.label()?;
                self.consume(TokenKind::Comma)?;
                let result = self.label()?;
                self.consume(TokenKind::Comma)?;
                let depth = self.depth()?;
                Directive::Lift { label, result, depth }
            }
            other => {
                return Err(ParseError::new(
                    format!("unknown directive `{}`", other),
                    name.span,
                    ParseErrorKind::UnknownIdentifier,
                ));
            }
        };
        self.consume(TokenKind::RightParen)?;
        if self.check(TokenKind::Semicolon) {
            self.advance();
        }
        if !self.check(TokenKind::Eof) {
            return Err(self.unexpected("end of line"));
        }
        Ok(directive)
    }

    fn label(&mut self) -> Result<String, ParseError> {
        Ok(self.consume(TokenKind::Identifier)?.lexeme)
    }

    fn depth(&mut self) -> Result<usize, ParseError> {
        let token = self.consume(TokenKind::Integer)?;
        token.lexeme.parse::<usize>().map_err(|_| {
            ParseError::new(
                format!("depth `{}` out of range", token.lexeme),
                token.span,
                ParseErrorKind::InvalidNumber,
            )
        })
    }

    /// Capture a `{ ... }` text, with optional `[params] ->` prefix, verbatim.
    fn raw_text(&mut self) -> Result<String, ParseError> {
        if !self.check(TokenKind::LeftBrace) && !self.check(TokenKind::LeftBracket) {
            return Err(self.unexpected("'{' or '['"));
        }
        let mut span = self.current().span;
        let mut depth = 0usize;
        loop {
            match self.current().kind {
                TokenKind::Eof => return Err(self.unexpected("closing '}'")),
                TokenKind::Comma | TokenKind::RightParen if depth == 0 => break,
                TokenKind::LeftBrace | TokenKind::LeftBracket | TokenKind::LeftParen => depth += 1,
                TokenKind::RightBrace | TokenKind::RightBracket | TokenKind::RightParen => {
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
            span = span.merge(&self.advance().span);
        }
        span.text(self.source)
            .map(str::to_string)
            .ok_or_else(|| self.unexpected("set or relation text"))
    }
}
