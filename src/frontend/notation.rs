//! Parser for set and relation notation.
//!
//! Accepts an isl-like text form:
//!
//! ```text
//! [N] -> { S0[i, j] : 0 <= i < N and 0 <= j <= i }
//! { [i] -> [floor(i / 4), i] : i >= 0 }
//! { S0[i] -> S1[i + 1] }
//! ```
//!
//! Every tuple entry becomes one column. An entry that is a fresh
//! identifier names the column; any other entry (an expression, a
//! variable already in scope, a parameter) becomes an anonymous column
//! constrained to equal it. `floor(e / c)` entries are expanded into the
//! pair of inequalities `c*x <= e <= c*x + c - 1`.
//!
//! Parameters are resolved against a [`Context`] and laid out in its
//! order, so parsed objects can be evaluated with `ctx.param_values()`.

use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::polyhedral::{
    AffineExpr, AffineRelation, Constraint, ConstraintKind, ConstraintSystem, Context,
    IntegerSet, Space,
};
use crate::utils::errors::{ParseError, ParseErrorKind};
use crate::utils::location::Span;
use std::collections::BTreeMap;

/// Parse a set such as `[N] -> { S[i] : 0 <= i < N }`.
pub fn parse_set(text: &str, ctx: &Context) -> Result<IntegerSet, ParseError> {
    let parsed = NotationParser::new(text, ctx)?.parse()?;
    match parsed.output {
        None => Ok(parsed.into_set(ctx)),
        Some(_) => Err(ParseError::new(
            "expected a set, found a relation",
            parsed.span,
            ParseErrorKind::Unsupported,
        )),
    }
}

/// Parse a relation such as `{ S[i] -> [0, i, 0] }`.
pub fn parse_relation(text: &str, ctx: &Context) -> Result<AffineRelation, ParseError> {
    let parsed = NotationParser::new(text, ctx)?.parse()?;
    match parsed.output {
        Some(_) => Ok(parsed.into_relation(ctx)),
        None => Err(ParseError::new(
            "expected a relation, found a set",
            parsed.span,
            ParseErrorKind::Unsupported,
        )),
    }
}

/// A linear form over columns and parameters, built while columns are still
/// being discovered.
#[derive(Debug, Clone, Default, PartialEq)]
struct Linear {
    constant: i64,
    vars: BTreeMap<usize, i64>,
    params: BTreeMap<usize, i64>,
}

impl Linear {
    fn constant(value: i64) -> Self {
        Self { constant: value, ..Self::default() }
    }

    fn var(column: usize) -> Self {
        let mut lin = Self::default();
        lin.vars.insert(column, 1);
        lin
    }

    fn param(index: usize) -> Self {
        let mut lin = Self::default();
        lin.params.insert(index, 1);
        lin
    }

    fn is_constant(&self) -> bool {
        self.vars.values().all(|&c| c == 0) && self.params.values().all(|&c| c == 0)
    }

    /// `None` on overflow. `i64::MIN` is rejected too so every coefficient
    /// can be negated.
    fn scale(mut self, factor: i64) -> Option<Self> {
        self.constant = checked(self.constant.checked_mul(factor))?;
        for c in self.vars.values_mut().chain(self.params.values_mut()) {
            *c = checked(c.checked_mul(factor))?;
        }
        Some(self)
    }

    fn add(mut self, other: Linear) -> Option<Self> {
        self.constant = checked(self.constant.checked_add(other.constant))?;
        for (k, c) in other.vars {
            let entry = self.vars.entry(k).or_insert(0);
            *entry = checked(entry.checked_add(c))?;
        }
        for (k, c) in other.params {
            let entry = self.params.entry(k).or_insert(0);
            *entry = checked(entry.checked_add(c))?;
        }
        Some(self)
    }

    fn sub(self, other: Linear) -> Option<Self> {
        self.add(other.scale(-1)?)
    }

    fn to_expr(&self, n_dim: usize, n_param: usize) -> AffineExpr {
        let mut expr = AffineExpr::constant(self.constant, n_dim, n_param);
        for (&k, &c) in &self.vars {
            expr.coeffs[k] += c;
        }
        for (&k, &c) in &self.params {
            expr.param_coeffs[k] += c;
        }
        expr
    }
}

fn checked(value: Option<i64>) -> Option<i64> {
    value.filter(|&v| v != i64::MIN)
}

/// `lhs - rhs` related to zero.
type Atom = (Linear, ConstraintKind);

/// A condition in disjunctive normal form.
type Dnf = Vec<Vec<Atom>>;

/// One parsed tuple.
#[derive(Debug, Clone)]
struct Tuple {
    name: Option<String>,
    /// First column of the tuple
    start: usize,
    /// Column names (`None` for anonymous entries)
    names: Vec<Option<String>>,
}

/// Result of parsing one text.
struct Parsed {
    input: Tuple,
    output: Option<Tuple>,
    n_columns: usize,
    /// Constraints every disjunct carries (tuple entry definitions)
    common: Vec<Atom>,
    /// Disjuncts of the condition
    condition: Dnf,
    span: Span,
}

impl Parsed {
    fn systems(&self, n_param: usize) -> Vec<ConstraintSystem> {
        self.condition.iter()
            .map(|conj| {
                let mut sys = ConstraintSystem::new(self.n_columns, n_param);
                for (lin, kind) in self.common.iter().chain(conj) {
                    sys.add(Constraint::new(lin.to_expr(self.n_columns, n_param), *kind));
                }
                sys
            })
            .collect()
    }

    fn column_names(tuple: &Tuple) -> Vec<String> {
        tuple.names.iter()
            .enumerate()
            .map(|(k, n)| n.clone().unwrap_or_else(|| format!("_{}", tuple.start + k)))
            .collect()
    }

    fn into_set(self, ctx: &Context) -> IntegerSet {
        let space = Space::set(self.n_columns)
            .with_params(ctx.param_names().to_vec())
            .with_dim_names(Self::column_names(&self.input));
        IntegerSet {
            pieces: self.systems(ctx.n_param()),
            space,
            name: self.input.name.clone(),
        }
    }

    fn into_relation(self, ctx: &Context) -> AffineRelation {
        let n_in = self.input.names.len();
        let n_out = self.n_columns - n_in;
        let out_name = self.output.as_ref().and_then(|t| t.name.clone());
        AffineRelation {
            space: Space::map(n_in, n_out).with_params(ctx.param_names().to_vec()),
            pieces: self.systems(ctx.n_param()),
            in_name: self.input.name.clone(),
            out_name,
        }
    }
}

/// Recursive descent parser over a token vector.
struct NotationParser<'c> {
    tokens: Vec<Token>,
    pos: usize,
    ctx: &'c Context,
    /// Named columns in scope
    scope: BTreeMap<String, usize>,
    n_columns: usize,
    common: Vec<Atom>,
}

impl<'c> NotationParser<'c> {
    fn new(text: &str, ctx: &'c Context) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: Lexer::new(text).tokenize()?,
            pos: 0,
            ctx,
            scope: BTreeMap::new(),
            n_columns: 0,
            common: Vec::new(),
        })
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self, ahead: usize) -> TokenKind {
        self.tokens.get(self.pos + ahead).map(|t| t.kind).unwrap_or(TokenKind::Eof)
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

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>, kind: ParseErrorKind) -> ParseError {
        ParseError::new(message, self.current().span, kind)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let kind = if self.check(TokenKind::Eof) {
            ParseErrorKind::UnexpectedEof
        } else {
            ParseErrorKind::UnexpectedToken
        };
        self.error(format!("expected {}, found '{}'", expected, self.current().kind), kind)
    }

    /// Turn an overflowed coefficient into an error at the current token.
    fn arith(&self, value: Option<Linear>) -> Result<Linear, ParseError> {
        value.ok_or_else(|| self.error("coefficient overflows i64", ParseErrorKind::InvalidNumber))
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", kind)))
        }
    }

    fn parse(mut self) -> Result<Parsed, ParseError> {
        let start = self.current().span;
        if self.check(TokenKind::LeftBracket) {
            self.parse_param_prefix()?;
        }
        self.consume(TokenKind::LeftBrace)?;
        let input = self.parse_tuple()?;
        let output = if self.match_token(TokenKind::Arrow) {
            Some(self.parse_tuple()?)
        } else {
            None
        };
        let condition = if self.match_token(TokenKind::Colon) {
            self.parse_disjunction()?
        } else {
            vec![Vec::new()]
        };
        self.consume(TokenKind::RightBrace)?;
        if !self.check(TokenKind::Eof) {
            return Err(self.unexpected("end of input"));
        }
        let span = start.merge(&self.current().span);
        Ok(Parsed {
            input,
            output,
            n_columns: self.n_columns,
            common: self.common,
            condition,
            span,
        })
    }

    /// `[N, M] ->`
    fn parse_param_prefix(&mut self) -> Result<(), ParseError> {
        self.consume(TokenKind::LeftBracket)?;
        if !self.check(TokenKind::RightBracket) {
            loop {
                let token = self.consume(TokenKind::Identifier)?;
                if self.ctx.param_index(&token.lexeme).is_none() {
                    return Err(ParseError::new(
                        format!("parameter `{}` has no value", token.lexeme),
                        token.span,
                        ParseErrorKind::UnknownIdentifier,
                    ));
                }
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightBracket)?;
        self.consume(TokenKind::Arrow)?;
        Ok(())
    }

    /// `Name[e0, e1, ...]` or `[e0, ...]`
    fn parse_tuple(&mut self) -> Result<Tuple, ParseError> {
        let name = if self.check(TokenKind::Identifier) {
            Some(self.advance().lexeme)
        } else {
            None
        };
        self.consume(TokenKind::LeftBracket)?;
        let mut tuple = Tuple {
            name,
            start: self.n_columns,
            names: Vec::new(),
        };
        if !self.check(TokenKind::RightBracket) {
            loop {
                let name = self.parse_tuple_entry()?;
                tuple.names.push(name);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightBracket)?;
        Ok(tuple)
    }

    fn fresh_column(&mut self) -> usize {
        self.n_columns += 1;
        self.n_columns - 1
    }

    fn parse_tuple_entry(&mut self) -> Result<Option<String>, ParseError> {
        let ends_entry = matches!(self.peek_kind(1), TokenKind::Comma | TokenKind::RightBracket);
        if self.check(TokenKind::Identifier) && ends_entry {
            let lexeme = self.current().lexeme.clone();
            let is_fresh = !self.scope.contains_key(&lexeme) && self.ctx.param_index(&lexeme).is_none();
            if is_fresh {
                self.advance();
                let column = self.fresh_column();
                self.scope.insert(lexeme.clone(), column);
                return Ok(Some(lexeme));
            }
        }

        if self.check(TokenKind::Floor) {
            let (numerator, divisor) = self.parse_floor()?;
            let column = self.fresh_column();
            // divisor * x <= numerator <= divisor * x + divisor - 1
            let scaled = self.arith(Linear::var(column).scale(divisor))?;
            let lower = self.arith(numerator.clone().sub(scaled.clone()))?;
            self.common.push((lower, ConstraintKind::Inequality));
            let upper = self.arith(scaled.add(Linear::constant(divisor - 1)).and_then(|e| e.sub(numerator)))?;
            self.common.push((upper, ConstraintKind::Inequality));
            return Ok(None);
        }

        let value = self.parse_expr()?;
        let column = self.fresh_column();
        let entry = self.arith(Linear::var(column).sub(value))?;
        self.common.push((entry, ConstraintKind::Equality));
        Ok(None)
    }

    /// `floor(expr / c)`
    fn parse_floor(&mut self) -> Result<(Linear, i64), ParseError> {
        self.consume(TokenKind::Floor)?;
        self.consume(TokenKind::LeftParen)?;
        let numerator = self.parse_expr()?;
        self.consume(TokenKind::Slash)?;
        let divisor = self.parse_integer()?;
        if divisor <= 0 {
            return Err(self.error("floor divisor must be positive", ParseErrorKind::InvalidNumber));
        }
        self.consume(TokenKind::RightParen)?;
        Ok((numerator, divisor))
    }

    fn parse_integer(&mut self) -> Result<i64, ParseError> {
        let token = self.consume(TokenKind::Integer)?;
        token.lexeme.parse::<i64>().map_err(|_| {
            ParseError::new(
                format!("integer literal `{}` out of range", token.lexeme),
                token.span,
                ParseErrorKind::InvalidNumber,
            )
        })
    }

    fn parse_disjunction(&mut self) -> Result<Dnf, ParseError> {
        let mut result = self.parse_conjunction()?;
        while self.match_token(TokenKind::Or) {
            result.extend(self.parse_conjunction()?);
        }
        Ok(result)
    }

    fn parse_conjunction(&mut self) -> Result<Dnf, ParseError> {
        let mut result = self.parse_condition_atom()?;
        while self.match_token(TokenKind::And) {
            let rhs = self.parse_condition_atom()?;
            let mut product = Vec::with_capacity(result.len() * rhs.len());
            for a in &result {
                for b in &rhs {
                    product.push(a.iter().chain(b).cloned().collect());
                }
            }
            result = product;
        }
        Ok(result)
    }

    /// A comparison chain, or a parenthesized condition.
    fn parse_condition_atom(&mut self) -> Result<Dnf, ParseError> {
        let saved = self.pos;
        match self.parse_comparison_chain() {
            Ok(atoms) => Ok(vec![atoms]),
            Err(err) if self.tokens[saved].kind == TokenKind::LeftParen => {
                self.pos = saved;
                self.consume(TokenKind::LeftParen)?;
                let inner = self.parse_disjunction().map_err(|_| err)?;
                self.consume(TokenKind::RightParen)?;
                Ok(inner)
            }
            Err(err) => Err(err),
        }
    }

    /// `e0 op e1 op e2 ...`, each adjacent pair giving one constraint.
    fn parse_comparison_chain(&mut self) -> Result<Vec<Atom>, ParseError> {
        let mut lhs = self.parse_expr()?;
        if !self.current().kind.is_comparison() {
            return Err(self.unexpected("comparison operator"));
        }
        let mut atoms = Vec::new();
        while self.current().kind.is_comparison() {
            let op = self.advance().kind;
            let rhs = self.parse_expr()?;
            let one = Linear::constant(1);
            let (diff, kind) = match op {
                TokenKind::LessEqual => (rhs.clone().sub(lhs), ConstraintKind::Inequality),
                TokenKind::Less => (rhs.clone().sub(lhs).and_then(|e| e.sub(one)), ConstraintKind::Inequality),
                TokenKind::GreaterEqual => (lhs.sub(rhs.clone()), ConstraintKind::Inequality),
                TokenKind::Greater => (lhs.sub(rhs.clone()).and_then(|e| e.sub(one)), ConstraintKind::Inequality),
                _ => (lhs.sub(rhs.clone()), ConstraintKind::Equality),
            };
            atoms.push((self.arith(diff)?, kind));
            lhs = rhs;
        }
        Ok(atoms)
    }

    fn parse_expr(&mut self) -> Result<Linear, ParseError> {
        let mut result = self.parse_term()?;
        loop {
            if self.match_token(TokenKind::Plus) {
                let rhs = self.parse_term()?;
                result = self.arith(result.add(rhs))?;
            } else if self.match_token(TokenKind::Minus) {
                let rhs = self.parse_term()?;
                result = self.arith(result.sub(rhs))?;
            } else {
                break;
            }
        }
        Ok(result)
    }

    fn parse_term(&mut self) -> Result<Linear, ParseError> {
        let mut result = self.parse_unary()?;
        loop {
            let implicit = self.tokens[self.pos.saturating_sub(1)].kind == TokenKind::Integer
                && matches!(self.current().kind, TokenKind::Identifier | TokenKind::LeftParen);
            if self.match_token(TokenKind::Star) || implicit {
                let rhs = self.parse_unary()?;
                result = self.multiply(result, rhs)?;
            } else if self.check(TokenKind::Slash) {
                return Err(self.error(
                    "division is only supported inside floor()",
                    ParseErrorKind::Unsupported,
                ));
            } else {
                break;
            }
        }
        Ok(result)
    }

    fn multiply(&self, lhs: Linear, rhs: Linear) -> Result<Linear, ParseError> {
        if lhs.is_constant() {
            self.arith(rhs.scale(lhs.constant))
        } else if rhs.is_constant() {
            self.arith(lhs.scale(rhs.constant))
        } else {
            Err(self.error("product of two non-constant terms", ParseErrorKind::NonAffine))
        }
    }

    fn parse_unary(&mut self) -> Result<Linear, ParseError> {
        if self.match_token(TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return self.arith(operand.scale(-1));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Linear, ParseError> {
        match self.current().kind {
            TokenKind::Integer => Ok(Linear::constant(self.parse_integer()?)),
            TokenKind::Identifier => {
                let token = self.advance();
                if let Some(&column) = self.scope.get(&token.lexeme) {
                    Ok(Linear::var(column))
                } else if let Some(idx) = self.ctx.param_index(&token.lexeme) {
                    Ok(Linear::param(idx))
                } else {
                    Err(ParseError::new(
                        format!("unknown identifier `{}`", token.lexeme),
                        token.span,
                        ParseErrorKind::UnknownIdentifier,
                    ))
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.consume(TokenKind::RightParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::with_params([("N", 4), ("M", 3)])
    }

    #[test]
    fn test_parse_parametric_set() {
        let ctx = ctx();
        let set = parse_set("[N] -> { S0[i, j] : 0 <= i < N and 0 <= j <= i }", &ctx).unwrap();
        assert_eq!(set.tuple_name(), Some("S0"));
        assert_eq!(set.dim(), 2);
        assert_eq!(set.enumerate(&ctx).unwrap().len(), 10);
    }

    #[test]
    fn test_parse_disjunction() {
        let ctx = ctx();
        let set = parse_set("{ [i] : 0 <= i <= 1 or 5 <= i <= 6 }", &ctx).unwrap();
        let points = set.enumerate(&ctx).unwrap();
        assert_eq!(points.len(), 4);
        assert!(points.contains(&[5]));
    }

    #[test]
    fn test_parenthesized_condition() {
        let ctx = ctx();
        let set = parse_set("{ [i, j] : (i = 0 or i = 2) and 0 <= j < 2 }", &ctx).unwrap();
        assert_eq!(set.enumerate(&ctx).unwrap().len(), 4);
        let set = parse_set("{ [i] : (i + 1) * 2 <= 6 and i >= 0 }", &ctx).unwrap();
        assert_eq!(set.enumerate(&ctx).unwrap().len(), 3);
    }

    #[test]
    fn test_coefficients() {
        let ctx = ctx();
        let set = parse_set("{ [i, j] : j = 2i and 0 <= i < 3 }", &ctx).unwrap();
        assert!(set.contains(&[2, 4], ctx.param_values()));
        let set = parse_set("{ [i, j] : j = 2*i + M and 0 <= i < 3 }", &ctx).unwrap();
        assert!(set.contains(&[1, 5], ctx.param_values()));
    }

    #[test]
    fn test_expression_entries() {
        let ctx = ctx();
        let rel = parse_relation("{ S0[i] -> S1[i + 1] }", &ctx).unwrap();
        assert_eq!(rel.in_name.as_deref(), Some("S0"));
        assert_eq!(rel.out_name.as_deref(), Some("S1"));
        assert!(rel.contains(&[2], &[3], ctx.param_values()));
        assert!(!rel.contains(&[2], &[2], ctx.param_values()));

        let sched = parse_relation("{ S0[i, j] -> [0, i, 1, j, 0] }", &ctx).unwrap();
        assert_eq!((sched.n_in(), sched.n_out()), (2, 5));
        assert!(sched.contains(&[3, 1], &[0, 3, 1, 1, 0], &[]));
    }

    #[test]
    fn test_repeated_name_equates() {
        let ctx = ctx();
        let rel = parse_relation("{ [i] -> [i] }", &ctx).unwrap();
        assert!(rel.contains(&[7], &[7], &[]));
        assert!(!rel.contains(&[7], &[8], &[]));
    }

    #[test]
    fn test_floor_entry() {
        let ctx = ctx();
        let rel = parse_relation("{ [i] -> [floor(i / 4), i] }", &ctx).unwrap();
        assert!(rel.contains(&[9], &[2, 9], &[]));
        assert!(!rel.contains(&[9], &[3, 9], &[]));
        assert!(rel.contains(&[-1], &[-1, -1], &[]));
    }

    #[test]
    fn test_unknown_identifier() {
        let err = parse_set("{ [i] : i < K }", &ctx()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownIdentifier);
        let err = parse_set("[K] -> { [i] : i < 3 }", &ctx()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownIdentifier);
    }

    #[test]
    fn test_non_affine() {
        let err = parse_set("{ [i, j] : i * j = 0 }", &ctx()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NonAffine);
    }

    #[test]
    fn test_set_versus_relation() {
        assert!(parse_relation("{ [i] : i = 0 }", &ctx()).is_err());
        assert!(parse_set("{ [i] -> [i] }", &ctx()).is_err());
        assert!(parse_set("{ [i] : i = 0 } trailing", &ctx()).is_err());
    }

    #[test]
    fn test_params_follow_context_order() {
        let ctx = ctx();
        let set = parse_set("[M, N] -> { [i] : M <= i < N }", &ctx).unwrap();
        assert_eq!(set.space.param_names, vec!["N".to_string(), "M".to_string()]);
        assert_eq!(set.enumerate(&ctx).unwrap().len(), 1);
    }
}
