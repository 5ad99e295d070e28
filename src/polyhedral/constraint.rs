//! Linear constraints and constraint systems.
//!
//! A constraint is a linear inequality or equality:
//! - Inequality: expr >= 0
//! - Equality: expr = 0
//!
//! A [`ConstraintSystem`] is a conjunction of constraints. Besides
//! satisfaction checks it can *scan* its integer solutions: variables are
//! fixed one at a time, each time picking a variable whose bounds are
//! fully determined by the values chosen so far.

use crate::polyhedral::expr::AffineExpr;
use crate::utils::errors::PolyError;
use num_integer::Integer;
use serde::{Serialize, Deserialize};
use std::fmt;

/// A linear constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    /// The affine expression (constraint is: expr >= 0 or expr = 0)
    pub expr: AffineExpr,
    /// Kind of constraint
    pub kind: ConstraintKind,
}

/// Kind of constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Greater than or equal: expr >= 0
    Inequality,
    /// Equal: expr = 0
    Equality,
}

impl Constraint {
    /// Create a new constraint.
    pub fn new(expr: AffineExpr, kind: ConstraintKind) -> Self {
        Self { expr, kind }
    }

    /// Create an inequality constraint: expr >= 0
    pub fn ge_zero(expr: AffineExpr) -> Self {
        Self::new(expr, ConstraintKind::Inequality)
    }

    /// Create an equality constraint: expr = 0
    pub fn eq_zero(expr: AffineExpr) -> Self {
        Self::new(expr, ConstraintKind::Equality)
    }

    /// lhs >= rhs
    pub fn ge(lhs: AffineExpr, rhs: AffineExpr) -> Self {
        Self::ge_zero(lhs - rhs)
    }

    /// lhs <= rhs
    pub fn le(lhs: AffineExpr, rhs: AffineExpr) -> Self {
        Self::ge_zero(rhs - lhs)
    }

    /// lhs > rhs, i.e. lhs - rhs - 1 >= 0
    pub fn gt(lhs: AffineExpr, rhs: AffineExpr) -> Self {
        let mut expr = lhs - rhs;
        expr.constant -= 1;
        Self::ge_zero(expr)
    }

    /// lhs < rhs
    pub fn lt(lhs: AffineExpr, rhs: AffineExpr) -> Self {
        Self::gt(rhs, lhs)
    }

    /// lhs = rhs
    pub fn eq(lhs: AffineExpr, rhs: AffineExpr) -> Self {
        Self::eq_zero(lhs - rhs)
    }

    /// Column `a` equals column `b` plus `offset`.
    pub fn equate(a: usize, b: usize, offset: i64, n_dim: usize, n_param: usize) -> Self {
        let mut rhs = AffineExpr::var(b, n_dim, n_param);
        rhs.constant = offset;
        Self::eq(AffineExpr::var(a, n_dim, n_param), rhs)
    }

    /// Column `dim` is fixed to `value`.
    pub fn fix(dim: usize, value: i64, n_dim: usize, n_param: usize) -> Self {
        Self::eq(
            AffineExpr::var(dim, n_dim, n_param),
            AffineExpr::constant(value, n_dim, n_param),
        )
    }

    /// Check if this is an equality constraint.
    pub fn is_equality(&self) -> bool {
        matches!(self.kind, ConstraintKind::Equality)
    }

    /// Check if this constraint is satisfied by the given point.
    pub fn is_satisfied(&self, dim_values: &[i64], param_values: &[i64]) -> bool {
        let value = self.expr.evaluate(dim_values, param_values);
        match self.kind {
            ConstraintKind::Inequality => value >= 0,
            ConstraintKind::Equality => value == 0,
        }
    }

    /// Get the number of columns.
    pub fn n_dim(&self) -> usize {
        self.expr.n_dim()
    }

    /// Get the number of parameters.
    pub fn n_param(&self) -> usize {
        self.expr.n_param()
    }

    /// Convert to string with given names.
    pub fn to_string_with_names(&self, dim_names: &[String], param_names: &[String]) -> String {
        let expr_str = self.expr.to_string_with_names(dim_names, param_names);
        match self.kind {
            ConstraintKind::Inequality => format!("{} >= 0", expr_str),
            ConstraintKind::Equality => format!("{} = 0", expr_str),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with_names(&[], &[]))
    }
}

/// Lower and upper bound of one variable, either of which may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    /// Inclusive lower bound
    pub lower: Option<i64>,
    /// Inclusive upper bound
    pub upper: Option<i64>,
}

impl Bounds {
    fn raise(&mut self, value: i64) {
        self.lower = Some(self.lower.map_or(value, |l| l.max(value)));
    }

    fn lower_to(&mut self, value: i64) {
        self.upper = Some(self.upper.map_or(value, |u| u.min(value)));
    }

    /// Both bounds known and no value in between.
    pub fn is_infeasible(&self) -> bool {
        matches!((self.lower, self.upper), (Some(l), Some(u)) if l > u)
    }
}

fn ceil_div(a: i64, b: i64) -> i64 {
    -Integer::div_floor(&-a, &b)
}

/// A system of constraints (a conjunction).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSystem {
    /// All constraints in the system
    pub constraints: Vec<Constraint>,
    /// Number of columns
    pub n_dim: usize,
    /// Number of parameters
    pub n_param: usize,
}

impl ConstraintSystem {
    /// Create an unconstrained system.
    pub fn new(n_dim: usize, n_param: usize) -> Self {
        Self {
            constraints: Vec::new(),
            n_dim,
            n_param,
        }
    }

    /// Add a constraint.
    pub fn add(&mut self, constraint: Constraint) {
        debug_assert_eq!(constraint.n_dim(), self.n_dim);
        debug_assert_eq!(constraint.n_param(), self.n_param);
        self.constraints.push(constraint);
    }

    /// Add multiple constraints.
    pub fn add_all(&mut self, constraints: impl IntoIterator<Item = Constraint>) {
        for c in constraints {
            self.add(c);
        }
    }

    /// Conjunction of two systems over the same columns.
    pub fn conjoin(&self, other: &ConstraintSystem) -> ConstraintSystem {
        let mut result = self.clone();
        result.add_all(other.constraints.iter().cloned());
        result
    }

    /// Check if a point satisfies all constraints.
    pub fn is_satisfied(&self, dim_values: &[i64], param_values: &[i64]) -> bool {
        self.constraints.iter().all(|c| c.is_satisfied(dim_values, param_values))
    }

    /// Check if the system has no constraints.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Get the number of constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Move every column `i` to `positions[i]` in a system of `n_dim` columns.
    pub fn reindex(&self, positions: &[usize], n_dim: usize) -> ConstraintSystem {
        ConstraintSystem {
            constraints: self.constraints.iter()
                .map(|c| Constraint::new(c.expr.reindex(positions, n_dim), c.kind))
                .collect(),
            n_dim,
            n_param: self.n_param,
        }
    }

    /// Bounds of column `var` implied by constraints whose other columns are known.
    pub fn bounds_for(&self, var: usize, values: &[Option<i64>], params: &[i64]) -> Bounds {
        let mut bounds = Bounds::default();
        for c in &self.constraints {
            let a = c.expr.coeff(var);
            if a == 0 {
                continue;
            }
            let rest = match c.expr.evaluate_partial(values, params, var) {
                Some(rest) => rest,
                None => continue,
            };
            // a*v + rest >= 0, or a*v + rest = 0
            match c.kind {
                ConstraintKind::Inequality if a > 0 => bounds.raise(ceil_div(-rest, a)),
                ConstraintKind::Inequality => bounds.lower_to(Integer::div_floor(&rest, &-a)),
                ConstraintKind::Equality => {
                    if (-rest) % a != 0 {
                        return Bounds { lower: Some(1), upper: Some(0) };
                    }
                    let v = -rest / a;
                    bounds.raise(v);
                    bounds.lower_to(v);
                }
            }
        }
        bounds
    }

    /// Enumerate all integer solutions that agree with `fixed`.
    ///
    /// Columns set to `Some` in `fixed` are taken as given; the remaining
    /// ones are scanned. Fails with [`PolyError::Unbounded`] if some free
    /// column never receives finite bounds.
    pub fn scan(
        &self,
        fixed: &[Option<i64>],
        params: &[i64],
        limit: usize,
    ) -> Result<Vec<Vec<i64>>, PolyError> {
        if fixed.len() != self.n_dim {
            return Err(PolyError::DimensionMismatch { expected: self.n_dim, found: fixed.len() });
        }
        let mut scanner = Scanner {
            system: self,
            params,
            limit,
            work: 0,
            points: Vec::new(),
        };
        let mut values = fixed.to_vec();
        scanner.visit(&mut values)?;
        Ok(scanner.points)
    }
}

struct Scanner<'a> {
    system: &'a ConstraintSystem,
    params: &'a [i64],
    limit: usize,
    work: usize,
    points: Vec<Vec<i64>>,
}

impl Scanner<'_> {
    fn violates_known(&self, values: &[Option<i64>]) -> bool {
        self.system.constraints.iter().any(|c| {
            let known: Option<Vec<i64>> = c.expr.support()
                .map(|i| values[i])
                .collect();
            known.is_some() && {
                let point: Vec<i64> = values.iter().map(|v| v.unwrap_or(0)).collect();
                !c.is_satisfied(&point, self.params)
            }
        })
    }

    fn visit(&mut self, values: &mut Vec<Option<i64>>) -> Result<(), PolyError> {
        self.work += 1;
        if self.work > self.limit.saturating_mul(8) {
            return Err(PolyError::TooManyPoints { limit: self.limit });
        }
        if self.violates_known(values) {
            return Ok(());
        }

        let mut best: Option<(usize, i64, i64)> = None;
        let mut unbounded = None;
        for var in 0..values.len() {
            if values[var].is_some() {
                continue;
            }
            let bounds = self.system.bounds_for(var, values, self.params);
            if bounds.is_infeasible() {
                return Ok(());
            }
            match (bounds.lower, bounds.upper) {
                (Some(lo), Some(hi)) => {
                    if best.map_or(true, |(_, bl, bh)| hi.saturating_sub(lo) < bh.saturating_sub(bl)) {
                        best = Some((var, lo, hi));
                    }
                }
                _ => unbounded = unbounded.or(Some(var)),
            }
        }

        match best {
            Some((var, lo, hi)) => {
                for x in lo..=hi {
                    values[var] = Some(x);
                    self.visit(values)?;
                }
                values[var] = None;
                Ok(())
            }
            None => match unbounded {
                Some(dim) => Err(PolyError::Unbounded { dim }),
                None => {
                    if let Some(point) = values.iter().copied().collect::<Option<Vec<i64>>>() {
                        if self.points.len() >= self.limit {
                            return Err(PolyError::TooManyPoints { limit: self.limit });
                        }
                        self.points.push(point);
                    }
                    Ok(())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(n: i64) -> ConstraintSystem {
        // 0 <= i < n and 0 <= j <= i
        let mut sys = ConstraintSystem::new(2, 0);
        sys.add(Constraint::ge(AffineExpr::var(0, 2, 0), AffineExpr::zero(2, 0)));
        sys.add(Constraint::lt(AffineExpr::var(0, 2, 0), AffineExpr::constant(n, 2, 0)));
        sys.add(Constraint::ge(AffineExpr::var(1, 2, 0), AffineExpr::zero(2, 0)));
        sys.add(Constraint::le(AffineExpr::var(1, 2, 0), AffineExpr::var(0, 2, 0)));
        sys
    }

    #[test]
    fn test_strict_bounds() {
        let c = Constraint::lt(AffineExpr::var(0, 1, 0), AffineExpr::constant(10, 1, 0));
        assert!(c.is_satisfied(&[9], &[]));
        assert!(!c.is_satisfied(&[10], &[]));
    }

    #[test]
    fn test_bounds_for() {
        let sys = triangle(4);
        let b = sys.bounds_for(1, &[Some(2), None], &[]);
        assert_eq!(b, Bounds { lower: Some(0), upper: Some(2) });
    }

    #[test]
    fn test_scan_triangle() {
        let points = triangle(4).scan(&[None, None], &[], 100).unwrap();
        assert_eq!(points.len(), 10);
        assert!(points.contains(&vec![3, 3]));
        assert!(!points.contains(&vec![1, 2]));
    }

    #[test]
    fn test_scan_with_fixed_column() {
        let points = triangle(4).scan(&[Some(1), None], &[], 100).unwrap();
        assert_eq!(points, vec![vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn test_scan_equality_with_stride() {
        // 2*d1 = d0
        let mut sys = ConstraintSystem::new(2, 0);
        let mut expr = AffineExpr::zero(2, 0);
        expr.coeffs = vec![1, -2];
        sys.add(Constraint::eq_zero(expr));
        assert_eq!(sys.scan(&[Some(6), None], &[], 10).unwrap(), vec![vec![6, 3]]);
        assert!(sys.scan(&[Some(5), None], &[], 10).unwrap().is_empty());
    }

    #[test]
    fn test_scan_unbounded() {
        let mut sys = ConstraintSystem::new(1, 0);
        sys.add(Constraint::ge(AffineExpr::var(0, 1, 0), AffineExpr::zero(1, 0)));
        assert_eq!(sys.scan(&[None], &[], 10), Err(PolyError::Unbounded { dim: 0 }));
    }

    #[test]
    fn test_scan_limit() {
        let result = triangle(100).scan(&[None, None], &[], 50);
        assert_eq!(result, Err(PolyError::TooManyPoints { limit: 50 }));
    }

    #[test]
    fn test_parametric_bound() {
        // 0 <= d0 < p0
        let mut sys = ConstraintSystem::new(1, 1);
        sys.add(Constraint::ge(AffineExpr::var(0, 1, 1), AffineExpr::zero(1, 1)));
        sys.add(Constraint::lt(AffineExpr::var(0, 1, 1), AffineExpr::param(0, 1, 1)));
        assert_eq!(sys.scan(&[None], &[3], 10).unwrap().len(), 3);
    }
}
