//! Finite binary relations between integer tuples.
//!
//! Schedules, transforms and dependences are all `PointRelation`s once
//! their parameters are bound. Pairs are kept ordered, so equal relations
//! compare equal without a separate canonicalization step.

use crate::polyhedral::map::AffineRelation;
use crate::polyhedral::points::{add, format_tuple, pad, PointSet};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A finite set of `(input, output)` tuple pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PointRelation {
    n_in: usize,
    n_out: usize,
    pairs: BTreeSet<(Vec<i64>, Vec<i64>)>,
}

/// Two distinct inputs mapped onto one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    /// First input
    pub first: Vec<i64>,
    /// Second input
    pub second: Vec<i64>,
    /// Shared output
    pub image: Vec<i64>,
}

impl PointRelation {
    /// Create an empty relation.
    pub fn empty(n_in: usize, n_out: usize) -> Self {
        Self {
            n_in,
            n_out,
            pairs: BTreeSet::new(),
        }
    }

    /// Create a relation from pairs.
    pub fn from_pairs(
        n_in: usize,
        n_out: usize,
        pairs: impl IntoIterator<Item = (Vec<i64>, Vec<i64>)>,
    ) -> Self {
        let mut rel = Self::empty(n_in, n_out);
        for (x, y) in pairs {
            rel.insert(x, y);
        }
        rel
    }

    /// Insert a pair.
    pub fn insert(&mut self, input: Vec<i64>, output: Vec<i64>) -> bool {
        debug_assert_eq!(input.len(), self.n_in);
        debug_assert_eq!(output.len(), self.n_out);
        self.pairs.insert((input, output))
    }

    /// Input arity.
    pub fn n_in(&self) -> usize {
        self.n_in
    }

    /// Output arity.
    pub fn n_out(&self) -> usize {
        self.n_out
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check if the relation is empty.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Check membership of a pair.
    pub fn contains(&self, input: &[i64], output: &[i64]) -> bool {
        self.pairs.contains(&(input.to_vec(), output.to_vec()))
    }

    /// Iterate pairs in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &(Vec<i64>, Vec<i64>)> + '_ {
        self.pairs.iter()
    }

    /// Set of inputs.
    pub fn domain(&self) -> PointSet {
        PointSet::from_points(self.n_in, self.pairs.iter().map(|(x, _)| x.clone()))
    }

    /// Set of outputs.
    pub fn range(&self) -> PointSet {
        PointSet::from_points(self.n_out, self.pairs.iter().map(|(_, y)| y.clone()))
    }

    /// Swap inputs and outputs.
    pub fn reverse(&self) -> PointRelation {
        PointRelation::from_pairs(
            self.n_out,
            self.n_in,
            self.pairs.iter().map(|(x, y)| (y.clone(), x.clone())),
        )
    }

    /// Union.
    pub fn union(mut self, other: PointRelation) -> PointRelation {
        debug_assert_eq!((self.n_in, self.n_out), (other.n_in, other.n_out));
        self.pairs.extend(other.pairs);
        self
    }

    /// Intersection.
    pub fn intersect(mut self, other: &PointRelation) -> PointRelation {
        self.pairs.retain(|p| other.pairs.contains(p));
        self
    }

    /// Pairs of `self` not in `other`.
    pub fn subtract(mut self, other: &PointRelation) -> PointRelation {
        self.pairs.retain(|p| !other.pairs.contains(p));
        self
    }

    /// Keep the pairs whose input lies in `set`.
    pub fn intersect_domain(mut self, set: &PointSet) -> PointRelation {
        self.pairs.retain(|(x, _)| set.contains(x));
        self
    }

    /// Keep the pairs whose output lies in `set`.
    pub fn intersect_range(mut self, set: &PointSet) -> PointRelation {
        self.pairs.retain(|(_, y)| set.contains(y));
        self
    }

    /// Keep the pairs satisfying `pred`.
    pub fn filter(mut self, mut pred: impl FnMut(&[i64], &[i64]) -> bool) -> PointRelation {
        self.pairs.retain(|(x, y)| pred(x, y));
        self
    }

    /// Keep the pairs that belong to a symbolic relation.
    pub fn filter_by(self, rel: &AffineRelation, params: &[i64]) -> PointRelation {
        self.filter(|x, y| rel.contains(x, y, params))
    }

    fn successors(&self) -> BTreeMap<&[i64], Vec<&[i64]>> {
        let mut index: BTreeMap<&[i64], Vec<&[i64]>> = BTreeMap::new();
        for (x, y) in &self.pairs {
            index.entry(x.as_slice()).or_default().push(y.as_slice());
        }
        index
    }

    /// Composition `{ (x, z) : (x, y) in self, (y, z) in other }`.
    pub fn apply_range(self, other: &PointRelation) -> PointRelation {
        let index = other.successors();
        let mut result = PointRelation::empty(self.n_in, other.n_out);
        for (x, y) in &self.pairs {
            if let Some(targets) = index.get(y.as_slice()) {
                for z in targets {
                    result.insert(x.clone(), z.to_vec());
                }
            }
        }
        result
    }

    /// Rename inputs through `other`: `{ (x', y) : (x, y) in self, (x, x') in other }`.
    pub fn apply_domain(self, other: &PointRelation) -> PointRelation {
        self.reverse().apply_range(other).reverse()
    }

    /// Image of a set.
    pub fn image(&self, set: &PointSet) -> PointSet {
        PointSet::from_points(
            self.n_out,
            self.pairs.iter()
                .filter(|(x, _)| set.contains(x))
                .map(|(_, y)| y.clone()),
        )
    }

    /// Pointwise sum `{ (x, y1 + y2) : (x, y1) in self, (x, y2) in other }`.
    pub fn sum(&self, other: &PointRelation) -> PointRelation {
        let index = other.successors();
        let mut result = PointRelation::empty(self.n_in, self.n_out);
        for (x, y1) in &self.pairs {
            if let Some(rhs) = index.get(x.as_slice()) {
                for y2 in rhs {
                    result.insert(x.clone(), add(y1, y2));
                }
            }
        }
        result
    }

    /// Translate every output by `delta`.
    pub fn translate_range(&self, delta: &[i64]) -> PointRelation {
        PointRelation::from_pairs(
            self.n_in,
            self.n_out,
            self.pairs.iter().map(|(x, y)| (x.clone(), add(y, delta))),
        )
    }

    /// Widen every output to `width` coordinates by appending zeros.
    pub fn pad_range(&self, width: usize) -> PointRelation {
        if width <= self.n_out {
            return self.clone();
        }
        PointRelation::from_pairs(
            self.n_in,
            width,
            self.pairs.iter().map(|(x, y)| (x.clone(), pad(y, width))),
        )
    }

    /// Check that no output has two distinct inputs.
    pub fn is_injective(&self) -> bool {
        self.collisions(1).is_empty()
    }

    /// Check that no input has two distinct outputs.
    pub fn is_single_valued(&self) -> bool {
        self.reverse().is_injective()
    }

    /// Check if the relations share no pair.
    pub fn is_disjoint(&self, other: &PointRelation) -> bool {
        self.pairs.is_disjoint(&other.pairs)
    }

    /// Up to `limit` witnesses of non-injectivity.
    pub fn collisions(&self, limit: usize) -> Vec<Collision> {
        let mut owner: BTreeMap<&[i64], &[i64]> = BTreeMap::new();
        let mut found = Vec::new();
        for (x, y) in &self.pairs {
            let Some(first) = owner.get(y.as_slice()).copied() else {
                owner.insert(y.as_slice(), x.as_slice());
                continue;
            };
            if first != x.as_slice() {
                found.push(Collision {
                    first: first.to_vec(),
                    second: x.clone(),
                    image: y.clone(),
                });
                if found.len() >= limit {
                    break;
                }
            }
        }
        found
    }
}

impl fmt::Display for PointRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for (i, (x, y)) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} -> {}", format_tuple(x), format_tuple(y))?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(pairs: &[(&[i64], &[i64])]) -> PointRelation {
        PointRelation::from_pairs(
            pairs[0].0.len(),
            pairs[0].1.len(),
            pairs.iter().map(|(x, y)| (x.to_vec(), y.to_vec())),
        )
    }

    #[test]
    fn test_domain_range_reverse() {
        let r = rel(&[(&[0], &[1, 0]), (&[1], &[1, 1])]);
        assert_eq!(r.domain().len(), 2);
        assert_eq!(r.range(), PointSet::from_points(2, vec![vec![1, 0], vec![1, 1]]));
        assert!(r.reverse().contains(&[1, 1], &[1]));
    }

    #[test]
    fn test_apply_range_composes() {
        let a = rel(&[(&[0], &[10]), (&[1], &[11])]);
        let b = rel(&[(&[10], &[100]), (&[12], &[120])]);
        assert_eq!(a.apply_range(&b), rel(&[(&[0], &[100])]));
    }

    #[test]
    fn test_apply_domain_renames_inputs() {
        let dep = rel(&[(&[0], &[1])]);
        let sched = rel(&[(&[0], &[7]), (&[1], &[8])]);
        let moved = dep.apply_domain(&sched).apply_range(&sched);
        assert_eq!(moved, rel(&[(&[7], &[8])]));
    }

    #[test]
    fn test_injectivity() {
        let ok = rel(&[(&[0], &[0]), (&[1], &[1])]);
        assert!(ok.is_injective());
        let bad = rel(&[(&[0], &[5]), (&[1], &[5])]);
        assert!(!bad.is_injective());
        let witness = &bad.collisions(10)[0];
        assert_eq!(witness.first, vec![0]);
        assert_eq!(witness.second, vec![1]);
        assert_eq!(witness.image, vec![5]);
        assert!(bad.reverse().is_injective());
        assert!(!bad.reverse().is_single_valued());
    }

    #[test]
    fn test_sum_and_translate() {
        let a = rel(&[(&[0], &[1, 1])]);
        let b = rel(&[(&[0], &[2, 0])]);
        assert_eq!(a.sum(&b), rel(&[(&[0], &[3, 1])]));
        assert_eq!(a.translate_range(&[0, -1]), rel(&[(&[0], &[1, 0])]));
        assert_eq!(a.pad_range(3), rel(&[(&[0], &[1, 1, 0])]));
    }

    #[test]
    fn test_domain_restriction() {
        let r = rel(&[(&[0], &[0]), (&[1], &[1])]);
        let d = PointSet::singleton(vec![1]);
        assert_eq!(r.clone().intersect_domain(&d), rel(&[(&[1], &[1])]));
        assert_eq!(r.image(&d), d);
    }
}
