//! Symbolic integer sets.
//!
//! An `IntegerSet` is a union of conjunctions of affine constraints over one
//! tuple of coordinates, possibly referring to symbolic parameters. Binding the
//! parameters through a [`Context`] turns it into a finite [`PointSet`].

use crate::polyhedral::constraint::{Constraint, ConstraintSystem};
use crate::polyhedral::context::Context;
use crate::polyhedral::points::PointSet;
use crate::polyhedral::space::Space;
use crate::utils::errors::PolyError;
use std::fmt;

/// A union of basic sets over one coordinate tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerSet {
    /// The space of this set
    pub space: Space,
    /// Disjuncts; the set is empty when there are none
    pub pieces: Vec<ConstraintSystem>,
    /// Optional tuple name (e.g. a statement name)
    pub name: Option<String>,
}

impl IntegerSet {
    /// Create the set of all points of `space`.
    pub fn universe(space: Space) -> Self {
        let piece = ConstraintSystem::new(space.n_dim, space.n_param());
        Self {
            space,
            pieces: vec![piece],
            name: None,
        }
    }

    /// Create the empty set of `space`.
    pub fn empty(space: Space) -> Self {
        Self {
            space,
            pieces: Vec::new(),
            name: None,
        }
    }

    /// Create a basic set from one constraint system.
    pub fn from_system(space: Space, system: ConstraintSystem) -> Self {
        Self {
            space,
            pieces: vec![system],
            name: None,
        }
    }

    /// Attach a tuple name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Number of coordinates.
    pub fn dim(&self) -> usize {
        self.space.n_dim
    }

    /// Number of parameters.
    pub fn n_param(&self) -> usize {
        self.space.n_param()
    }

    /// Tuple name, if any.
    pub fn tuple_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Check if the set has no disjunct at all.
    pub fn is_obviously_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Add a constraint to every disjunct.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        for piece in &mut self.pieces {
            piece.add(constraint.clone());
        }
    }

    /// Union of two sets over the same space.
    pub fn union(mut self, other: IntegerSet) -> IntegerSet {
        self.pieces.extend(other.pieces);
        self
    }

    /// Intersection of two sets over the same space.
    pub fn intersect(&self, other: &IntegerSet) -> IntegerSet {
        let mut pieces = Vec::with_capacity(self.pieces.len() * other.pieces.len());
        for a in &self.pieces {
            for b in &other.pieces {
                pieces.push(a.conjoin(b));
            }
        }
        IntegerSet {
            space: self.space.clone(),
            pieces,
            name: self.name.clone(),
        }
    }

    /// Check membership of a point.
    pub fn contains(&self, point: &[i64], params: &[i64]) -> bool {
        self.pieces.iter().any(|p| p.is_satisfied(point, params))
    }

    /// Enumerate every point for the context's parameter values.
    pub fn enumerate(&self, ctx: &Context) -> Result<PointSet, PolyError> {
        let mut result = PointSet::empty(self.dim());
        let free = vec![None; self.dim()];
        for piece in &self.pieces {
            for point in piece.scan(&free, ctx.param_values(), ctx.max_points())? {
                result.insert(point);
            }
            if result.len() > ctx.max_points() {
                return Err(PolyError::TooManyPoints { limit: ctx.max_points() });
            }
        }
        Ok(result)
    }

    /// Points of `points` that belong to this set.
    pub fn filter(&self, points: &PointSet, params: &[i64]) -> PointSet {
        points.clone().filter(|p| self.contains(p, params))
    }

    /// Move coordinate `i` to `positions[i]` of a `n_dim`-dimensional space.
    ///
    /// Coordinates of the new space that receive no column are unconstrained.
    pub fn reindex(&self, positions: &[usize], space: Space) -> IntegerSet {
        debug_assert_eq!(positions.len(), self.dim());
        IntegerSet {
            pieces: self.pieces.iter()
                .map(|p| p.reindex(positions, space.n_dim))
                .collect(),
            space,
            name: None,
        }
    }
}

impl fmt::Display for IntegerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dim_names = self.space.all_dim_names();
        let param_names = &self.space.param_names;
        if !param_names.is_empty() {
            write!(f, "[{}] -> ", param_names.join(", "))?;
        }
        write!(f, "{{ {}[{}]", self.name.as_deref().unwrap_or(""), dim_names.join(", "))?;
        if self.is_obviously_empty() {
            write!(f, " : false")?;
        }
        for (i, piece) in self.pieces.iter().enumerate() {
            if piece.is_empty() {
                continue;
            }
            write!(f, "{}", if i == 0 { " : " } else { " or " })?;
            let parts: Vec<String> = piece.constraints.iter()
                .map(|c| c.to_string_with_names(&dim_names, param_names))
                .collect();
            write!(f, "{}", parts.join(" and "))?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::expr::AffineExpr;

    /// `[N] -> { [i] : 0 <= i < N }`
    fn range_set() -> IntegerSet {
        let space = Space::set(1).with_params(vec!["N".into()]);
        let mut set = IntegerSet::universe(space);
        set.add_constraint(Constraint::ge_zero(AffineExpr::var(0, 1, 1)));
        set.add_constraint(Constraint::lt(AffineExpr::var(0, 1, 1), AffineExpr::param(0, 1, 1)));
        set
    }

    #[test]
    fn test_enumerate_parametric() {
        let ctx = Context::with_params([("N", 4)]);
        let points = range_set().enumerate(&ctx).unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points.lexmax(), Some(&vec![3]));
    }

    #[test]
    fn test_union_and_intersect() {
        let ctx = Context::with_params([("N", 10)]);
        let mut low = range_set();
        low.add_constraint(Constraint::le(AffineExpr::var(0, 1, 1), AffineExpr::constant(2, 1, 1)));
        let mut high = range_set();
        high.add_constraint(Constraint::ge(AffineExpr::var(0, 1, 1), AffineExpr::constant(8, 1, 1)));

        let both = low.clone().union(high.clone());
        assert_eq!(both.enumerate(&ctx).unwrap().len(), 5);
        assert!(low.intersect(&high).enumerate(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_too_many_points() {
        let ctx = Context::with_params([("N", 100)]).with_max_points(10);
        assert!(matches!(
            range_set().enumerate(&ctx),
            Err(PolyError::TooManyPoints { limit: 10 })
        ));
    }

    #[test]
    fn test_reindex_into_loop_slots() {
        let ctx = Context::with_params([("N", 3)]);
        let wide = range_set().reindex(&[1], Space::schedule(3).with_params(vec!["N".into()]));
        assert!(wide.contains(&[7, 2, -1], ctx.param_values()));
        assert!(!wide.contains(&[0, 3, 0], ctx.param_values()));
    }

    #[test]
    fn test_display() {
        let s = range_set().with_name("S0").to_string();
        assert!(s.starts_with("[N] -> { S0[i0] : "));
    }
}
