//! Symbolic affine relations.
//!
//! An `AffineRelation` is a union of conjunctions of affine constraints over
//! the concatenated `[inputs | outputs]` columns. Unlike a function it may
//! leave outputs undetermined (e.g. lexicographic orders); such relations are
//! evaluated against a finite universe with [`AffineRelation::image_within`].

use crate::polyhedral::constraint::{Constraint, ConstraintSystem};
use crate::polyhedral::context::Context;
use crate::polyhedral::expr::AffineExpr;
use crate::polyhedral::points::PointSet;
use crate::polyhedral::relation::PointRelation;
use crate::polyhedral::space::Space;
use crate::utils::errors::PolyError;
use std::fmt;

/// A union of basic relations from `n_in` to `n_out` coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffineRelation {
    /// The space of this relation (`space.n_in` inputs, `space.n_dim` outputs)
    pub space: Space,
    /// Disjuncts over `n_in + n_out` columns
    pub pieces: Vec<ConstraintSystem>,
    /// Optional input tuple name
    pub in_name: Option<String>,
    /// Optional output tuple name
    pub out_name: Option<String>,
}

impl AffineRelation {
    /// Create the relation holding every pair.
    pub fn universe(n_in: usize, n_out: usize, n_param: usize) -> Self {
        Self::from_system(
            Space::map(n_in, n_out),
            ConstraintSystem::new(n_in + n_out, n_param),
        )
    }

    /// Create the relation holding no pair.
    pub fn empty(space: Space) -> Self {
        Self {
            space,
            pieces: Vec::new(),
            in_name: None,
            out_name: None,
        }
    }

    /// Create a basic relation from one constraint system.
    pub fn from_system(space: Space, system: ConstraintSystem) -> Self {
        Self {
            space,
            pieces: vec![system],
            in_name: None,
            out_name: None,
        }
    }

    /// Attach parameter names.
    pub fn with_params(mut self, names: Vec<String>) -> Self {
        self.space = self.space.with_params(names);
        self
    }

    /// Input arity.
    pub fn n_in(&self) -> usize {
        self.space.n_in
    }

    /// Output arity.
    pub fn n_out(&self) -> usize {
        self.space.n_dim
    }

    /// Number of constraint columns.
    pub fn n_columns(&self) -> usize {
        self.space.n_columns()
    }

    /// Number of parameters carried by the constraints.
    pub fn n_param(&self) -> usize {
        self.pieces.first().map(|p| p.n_param).unwrap_or_else(|| self.space.n_param())
    }

    /// Column index of output `j`.
    pub fn out_column(&self, j: usize) -> usize {
        self.n_in() + j
    }

    /// Add a constraint to every disjunct.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        for piece in &mut self.pieces {
            piece.add(constraint.clone());
        }
    }

    /// Require output `out` to equal input `input` plus `offset`.
    pub fn equate(&mut self, out: usize, input: usize, offset: i64) {
        let c = Constraint::equate(self.out_column(out), input, offset, self.n_columns(), self.n_param());
        self.add_constraint(c);
    }

    /// Require output `out` to equal `value`.
    pub fn fix_out(&mut self, out: usize, value: i64) {
        let c = Constraint::fix(self.out_column(out), value, self.n_columns(), self.n_param());
        self.add_constraint(c);
    }

    /// Require output `out` to be at least input `input` plus `offset`.
    pub fn shift(&mut self, out: usize, input: usize, offset: i64) {
        let mut expr = AffineExpr::var(self.out_column(out), self.n_columns(), self.n_param());
        expr.coeffs[input] -= 1;
        expr.constant -= offset;
        self.add_constraint(Constraint::ge_zero(expr));
    }

    /// Union of two relations over the same space.
    pub fn union(mut self, other: AffineRelation) -> AffineRelation {
        self.pieces.extend(other.pieces);
        self
    }

    /// Intersection of two relations over the same space.
    pub fn intersect(&self, other: &AffineRelation) -> AffineRelation {
        let mut pieces = Vec::with_capacity(self.pieces.len() * other.pieces.len());
        for a in &self.pieces {
            for b in &other.pieces {
                pieces.push(a.conjoin(b));
            }
        }
        AffineRelation {
            pieces,
            ..self.clone()
        }
    }

    /// Swap inputs and outputs.
    pub fn reverse(&self) -> AffineRelation {
        let (n_in, n_out) = (self.n_in(), self.n_out());
        let in_pos: Vec<usize> = (0..n_in).map(|i| n_out + i).collect();
        let out_pos: Vec<usize> = (0..n_out).collect();
        AffineRelation {
            in_name: self.out_name.clone(),
            out_name: self.in_name.clone(),
            ..self.reindex(&in_pos, &out_pos, n_out, n_in)
        }
    }

    /// Move input `i` to column `in_pos[i]` and output `j` to column
    /// `out_pos[j]` of a relation from `n_in` to `n_out` coordinates.
    ///
    /// `out_pos` indexes the concatenated columns of the new relation.
    pub fn reindex(&self, in_pos: &[usize], out_pos: &[usize], n_in: usize, n_out: usize) -> AffineRelation {
        debug_assert_eq!(in_pos.len(), self.n_in());
        debug_assert_eq!(out_pos.len(), self.n_out());
        let positions: Vec<usize> = in_pos.iter().chain(out_pos).copied().collect();
        AffineRelation {
            space: Space::map(n_in, n_out).with_params(self.space.param_names.clone()),
            pieces: self.pieces.iter()
                .map(|p| p.reindex(&positions, n_in + n_out))
                .collect(),
            in_name: None,
            out_name: None,
        }
    }

    /// Check if `(input, output)` belongs to the relation.
    pub fn contains(&self, input: &[i64], output: &[i64], params: &[i64]) -> bool {
        let mut point = Vec::with_capacity(input.len() + output.len());
        point.extend_from_slice(input);
        point.extend_from_slice(output);
        self.pieces.iter().any(|p| p.is_satisfied(&point, params))
    }

    /// All pairs whose input lies in `domain`.
    ///
    /// Outputs are solved by scanning; an output left unbounded by the
    /// constraints makes this fail with [`PolyError::Unbounded`].
    pub fn image_pairs(&self, domain: &PointSet, ctx: &Context) -> Result<PointRelation, PolyError> {
        if domain.dim() != self.n_in() {
            return Err(PolyError::DimensionMismatch { expected: self.n_in(), found: domain.dim() });
        }
        let mut result = PointRelation::empty(self.n_in(), self.n_out());
        let mut fixed = vec![None; self.n_columns()];
        for x in domain {
            for (slot, &v) in fixed.iter_mut().zip(x) {
                *slot = Some(v);
            }
            for piece in &self.pieces {
                for point in piece.scan(&fixed, ctx.param_values(), ctx.max_points())? {
                    result.insert(x.clone(), point[self.n_in()..].to_vec());
                }
            }
            if result.len() > ctx.max_points() {
                return Err(PolyError::TooManyPoints { limit: ctx.max_points() });
            }
        }
        Ok(result)
    }

    /// Image of `domain`.
    pub fn image(&self, domain: &PointSet, ctx: &Context) -> Result<PointSet, PolyError> {
        Ok(self.image_pairs(domain, ctx)?.range())
    }

    /// Points of `universe` related to some point of `source`.
    pub fn image_within(&self, source: &PointSet, universe: &PointSet, params: &[i64]) -> PointSet {
        universe.clone().filter(|y| source.iter().any(|x| self.contains(x, y, params)))
    }

    /// Points of `universe` related to some point of `target`.
    pub fn preimage_within(&self, target: &PointSet, universe: &PointSet, params: &[i64]) -> PointSet {
        universe.clone().filter(|x| target.iter().any(|y| self.contains(x, y, params)))
    }

    /// Restrict a finite relation to the pairs of this relation.
    pub fn restrict(&self, rel: PointRelation, params: &[i64]) -> PointRelation {
        rel.filter_by(self, params)
    }
}

impl fmt::Display for AffineRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = (0..self.n_in()).map(|i| format!("i{}", i)).collect();
        names.extend((0..self.n_out()).map(|j| format!("o{}", j)));
        let param_names = &self.space.param_names;
        if !param_names.is_empty() {
            write!(f, "[{}] -> ", param_names.join(", "))?;
        }
        write!(
            f,
            "{{ {}[{}] -> {}[{}]",
            self.in_name.as_deref().unwrap_or(""),
            names[..self.n_in()].join(", "),
            self.out_name.as_deref().unwrap_or(""),
            names[self.n_in()..].join(", "),
        )?;
        if self.pieces.is_empty() {
            write!(f, " : false")?;
        }
        let mut first = true;
        for piece in self.pieces.iter().filter(|p| !p.is_empty()) {
            write!(f, "{}", if first { " : " } else { " or " })?;
            first = false;
            let parts: Vec<String> = piece.constraints.iter()
                .map(|c| c.to_string_with_names(&names, param_names))
                .collect();
            write!(f, "{}", parts.join(" and "))?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(dim: usize, pts: &[&[i64]]) -> PointSet {
        PointSet::from_points(dim, pts.iter().map(|p| p.to_vec()))
    }

    #[test]
    fn test_image_pairs_solves_outputs() {
        // { [i] -> [0, i + 1] }
        let mut rel = AffineRelation::universe(1, 2, 0);
        rel.fix_out(0, 0);
        rel.equate(1, 0, 1);
        let pairs = rel.image_pairs(&points(1, &[&[0], &[4]]), &Context::new()).unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&[4], &[0, 5]));
    }

    #[test]
    fn test_unbounded_output() {
        let rel = AffineRelation::universe(1, 1, 0);
        assert_eq!(
            rel.image_pairs(&points(1, &[&[0]]), &Context::new()),
            Err(PolyError::Unbounded { dim: 1 })
        );
    }

    #[test]
    fn test_image_within_order() {
        // { [x] -> [y] : y >= x + 1 }
        let mut later = AffineRelation::universe(1, 1, 0);
        later.shift(0, 0, 1);
        let universe = points(1, &[&[0], &[1], &[2], &[3]]);
        let after_one = later.image_within(&points(1, &[&[1]]), &universe, &[]);
        assert_eq!(after_one, points(1, &[&[2], &[3]]));
        let before_two = later.preimage_within(&points(1, &[&[2]]), &universe, &[]);
        assert_eq!(before_two, points(1, &[&[0], &[1]]));
    }

    #[test]
    fn test_reverse() {
        let mut rel = AffineRelation::universe(1, 2, 0);
        rel.fix_out(0, 3);
        rel.equate(1, 0, 0);
        let rev = rel.reverse();
        assert_eq!((rev.n_in(), rev.n_out()), (2, 1));
        assert!(rev.contains(&[3, 7], &[7], &[]));
        assert!(!rev.contains(&[2, 7], &[7], &[]));
    }

    #[test]
    fn test_union_intersect() {
        let mut a = AffineRelation::universe(1, 1, 0);
        a.equate(0, 0, 0);
        let mut b = AffineRelation::universe(1, 1, 0);
        b.equate(0, 0, 1);
        let both = a.clone().union(b.clone());
        assert!(both.contains(&[1], &[1], &[]) && both.contains(&[1], &[2], &[]));
        assert!(!a.intersect(&b).contains(&[1], &[1], &[]));
    }
}
