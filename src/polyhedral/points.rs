//! Finite integer point sets.
//!
//! A `PointSet` is the exact, enumerated form of an [`IntegerSet`] once its
//! parameters are bound. Points are kept in lexicographic order, so two sets
//! holding the same points compare equal and `lexmin`/`lexmax` are the first
//! and last elements.
//!
//! [`IntegerSet`]: crate::polyhedral::IntegerSet

use crate::polyhedral::relation::PointRelation;
use std::collections::BTreeSet;
use std::fmt;

/// A finite set of integer tuples of one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointSet {
    dim: usize,
    points: BTreeSet<Vec<i64>>,
}

impl PointSet {
    /// Create an empty set.
    pub fn empty(dim: usize) -> Self {
        Self {
            dim,
            points: BTreeSet::new(),
        }
    }

    /// Create a set from points.
    pub fn from_points(dim: usize, points: impl IntoIterator<Item = Vec<i64>>) -> Self {
        let mut set = Self::empty(dim);
        for p in points {
            set.insert(p);
        }
        set
    }

    /// Create the singleton `{ point }`.
    pub fn singleton(point: Vec<i64>) -> Self {
        Self::from_points(point.len(), [point])
    }

    /// Insert a point.
    pub fn insert(&mut self, point: Vec<i64>) -> bool {
        debug_assert_eq!(point.len(), self.dim);
        self.points.insert(point)
    }

    /// Dimension of every point.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Check membership.
    pub fn contains(&self, point: &[i64]) -> bool {
        self.points.contains(point)
    }

    /// Iterate points in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &Vec<i64>> + '_ {
        self.points.iter()
    }

    /// Union.
    pub fn union(mut self, other: PointSet) -> PointSet {
        debug_assert_eq!(self.dim, other.dim);
        self.points.extend(other.points);
        self
    }

    /// Intersection.
    pub fn intersect(mut self, other: &PointSet) -> PointSet {
        self.points.retain(|p| other.contains(p));
        self
    }

    /// Points of `self` that are not in `other`.
    pub fn subtract(mut self, other: &PointSet) -> PointSet {
        self.points.retain(|p| !other.contains(p));
        self
    }

    /// Keep the points satisfying `pred`.
    pub fn filter(mut self, mut pred: impl FnMut(&[i64]) -> bool) -> PointSet {
        self.points.retain(|p| pred(p));
        self
    }

    /// Check if every point of `self` is in `other`.
    pub fn is_subset(&self, other: &PointSet) -> bool {
        self.points.is_subset(&other.points)
    }

    /// Check if the sets share no point.
    pub fn is_disjoint(&self, other: &PointSet) -> bool {
        self.points.is_disjoint(&other.points)
    }

    /// Lexicographically smallest point.
    pub fn lexmin(&self) -> Option<&Vec<i64>> {
        self.points.iter().next()
    }

    /// Lexicographically largest point.
    pub fn lexmax(&self) -> Option<&Vec<i64>> {
        self.points.iter().next_back()
    }

    /// Pointwise negation.
    pub fn neg(&self) -> PointSet {
        let negated = self.points.iter().map(|p| p.iter().map(|v| v.saturating_neg()).collect());
        PointSet::from_points(self.dim, negated)
    }

    /// Minkowski sum `{ a + b : a in self, b in other }`.
    pub fn sum(&self, other: &PointSet) -> PointSet {
        let mut result = PointSet::empty(self.dim);
        for a in &self.points {
            for b in &other.points {
                result.insert(add(a, b));
            }
        }
        result
    }

    /// Translate every point by `delta`.
    pub fn translate(&self, delta: &[i64]) -> PointSet {
        PointSet::from_points(self.dim, self.points.iter().map(|p| add(p, delta)))
    }

    /// Widen every point to `width` coordinates by appending zeros.
    pub fn pad_to(&self, width: usize) -> PointSet {
        if width <= self.dim {
            return self.clone();
        }
        PointSet::from_points(width, self.points.iter().map(|p| pad(p, width)))
    }

    /// Image of the set under a relation.
    pub fn apply(&self, rel: &PointRelation) -> PointSet {
        rel.image(self)
    }

    /// The identity relation on this set.
    pub fn identity(&self) -> PointRelation {
        PointRelation::from_pairs(
            self.dim,
            self.dim,
            self.points.iter().map(|p| (p.clone(), p.clone())),
        )
    }

    /// Cartesian product `self x other` as a relation.
    pub fn product(&self, other: &PointSet) -> PointRelation {
        let mut rel = PointRelation::empty(self.dim, other.dim);
        for a in &self.points {
            for b in &other.points {
                rel.insert(a.clone(), b.clone());
            }
        }
        rel
    }
}

impl fmt::Display for PointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for (i, p) in self.points.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", format_tuple(p))?;
        }
        write!(f, " }}")
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Vec<i64>;
    type IntoIter = std::collections::btree_set::Iter<'a, Vec<i64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Format a tuple as `[a, b, c]`.
pub fn format_tuple(point: &[i64]) -> String {
    let parts: Vec<String> = point.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

pub(crate) fn add(a: &[i64], b: &[i64]) -> Vec<i64> {
    a.iter().zip(b).map(|(x, y)| x.saturating_add(*y)).collect()
}

pub(crate) fn pad(point: &[i64], width: usize) -> Vec<i64> {
    let mut padded = point.to_vec();
    padded.resize(width.max(point.len()), 0);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(points: &[&[i64]]) -> PointSet {
        PointSet::from_points(points[0].len(), points.iter().map(|p| p.to_vec()))
    }

    #[test]
    fn test_set_operations() {
        let a = set(&[&[0, 1], &[0, 2], &[1, 0]]);
        let b = set(&[&[0, 2], &[2, 2]]);
        assert_eq!(a.clone().intersect(&b), set(&[&[0, 2]]));
        assert_eq!(a.clone().subtract(&b), set(&[&[0, 1], &[1, 0]]));
        assert_eq!(a.clone().union(b.clone()).len(), 4);
        assert!(!a.is_disjoint(&b));
    }

    #[test]
    fn test_lexmin_lexmax() {
        let a = set(&[&[1, 0], &[0, 5], &[0, 2]]);
        assert_eq!(a.lexmin(), Some(&vec![0, 2]));
        assert_eq!(a.lexmax(), Some(&vec![1, 0]));
        assert_eq!(PointSet::empty(2).lexmax(), None);
    }

    #[test]
    fn test_sum_and_neg() {
        let gap = PointSet::singleton(vec![3, 0, 1]).sum(&PointSet::singleton(vec![1, 0, 0]).neg());
        assert_eq!(gap, PointSet::singleton(vec![2, 0, 1]));
    }

    #[test]
    fn test_pad_and_translate() {
        let a = set(&[&[0, 4, 0]]);
        assert_eq!(a.pad_to(5), set(&[&[0, 4, 0, 0, 0]]));
        assert_eq!(a.translate(&[1, 0, 2]), set(&[&[1, 4, 2]]));
    }

    #[test]
    fn test_product() {
        let rel = set(&[&[0], &[1]]).product(&set(&[&[5]]));
        assert_eq!(rel.len(), 2);
        assert!(rel.contains(&[1], &[5]));
    }

    #[test]
    fn test_display() {
        assert_eq!(set(&[&[0, 1], &[2, 3]]).to_string(), "{ [0, 1]; [2, 3] }");
    }
}
