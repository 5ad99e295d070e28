//! Embedding between iteration and schedule coordinates.
//!
//! Loop coordinate `k` of an iteration vector lives at schedule index
//! `2k + 1`; the even schedule indices are band markers.

use crate::polyhedral::{
    AffineRelation, Context, IntegerSet, PointSet, Space,
};
use crate::utils::errors::PolyError;
use log::debug;

/// Relation placing `domain_dim` iteration coordinates into the loop slots
/// of a schedule vector of `range_dim` coordinates.
///
/// Band markers and slots beyond `domain_dim` stay unconstrained. If the
/// schedule is too narrow the universal relation is returned.
pub fn embed(domain_dim: usize, range_dim: usize, n_param: usize) -> AffineRelation {
    let mut rel = AffineRelation::universe(domain_dim, range_dim, n_param);
    if range_dim < Space::schedule_width_for(domain_dim) {
        debug!("embed: {} loops do not fit a width-{} schedule", domain_dim, range_dim);
        return rel;
    }
    for k in 0..domain_dim {
        rel.equate(Space::loop_coord(k), k, 0);
    }
    rel
}

/// Self-map keeping band markers and clearing loop coordinates.
pub fn zero_pad(width: usize, n_param: usize) -> AffineRelation {
    let mut rel = AffineRelation::universe(width, width, n_param);
    for i in 0..width {
        if i % 2 == 0 {
            rel.equate(i, i, 0);
        } else {
            rel.fix_out(i, 0);
        }
    }
    rel
}

/// Band-marker skeleton of a schedule-space set.
pub fn zero_pad_points(set: &PointSet, ctx: &Context) -> Result<PointSet, PolyError> {
    zero_pad(set.dim(), ctx.n_param()).image(set, ctx)
}

/// Place a set over loop coordinates into schedule space of `width`.
///
/// A set with more loops than the schedule holds embeds as the universe.
pub fn embed_set(set: &IntegerSet, width: usize) -> IntegerSet {
    let space = Space::schedule(width).with_params(set.space.param_names.clone());
    if width < Space::schedule_width_for(set.dim()) {
        debug!("embed_set: {} loops do not fit a width-{} schedule", set.dim(), width);
        return IntegerSet::universe(space);
    }
    let positions: Vec<usize> = (0..set.dim()).map(Space::loop_coord).collect();
    set.reindex(&positions, space)
}

/// Place a relation over loop coordinates into a relation from schedule
/// width `width_in` to schedule width `width_out`.
///
/// Returns `None` when either side has more loops than its schedule holds.
pub fn embed_relation(rel: &AffineRelation, width_in: usize, width_out: usize) -> Option<AffineRelation> {
    if width_in < Space::schedule_width_for(rel.n_in())
        || width_out < Space::schedule_width_for(rel.n_out())
    {
        return None;
    }
    let in_pos: Vec<usize> = (0..rel.n_in()).map(Space::loop_coord).collect();
    let out_pos: Vec<usize> = (0..rel.n_out())
        .map(|j| width_in + Space::loop_coord(j))
        .collect();
    Some(rel.reindex(&in_pos, &out_pos, width_in, width_out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{parse_relation, parse_set};

    #[test]
    fn test_embed_loop_slots() {
        let rel = embed(2, 5, 0);
        assert!(rel.contains(&[3, 4], &[9, 3, 9, 4, 9], &[]));
        assert!(!rel.contains(&[3, 4], &[0, 4, 0, 3, 0], &[]));
    }

    #[test]
    fn test_embed_too_narrow_is_universal() {
        let rel = embed(2, 3, 0);
        assert!(rel.contains(&[3, 4], &[1, 1, 1], &[]));
    }

    #[test]
    fn test_zero_pad() {
        let ctx = Context::new();
        let set = PointSet::from_points(5, vec![vec![1, 7, 2, 9, 0], vec![1, 3, 2, 4, 0]]);
        let padded = zero_pad_points(&set, &ctx).unwrap();
        assert_eq!(padded, PointSet::singleton(vec![1, 0, 2, 0, 0]));
    }

    #[test]
    fn test_embed_set() {
        let ctx = Context::new();
        let pred = parse_set("{ [i] : i < 2 }", &ctx).unwrap();
        let wide = embed_set(&pred, 3);
        assert_eq!(wide.dim(), 3);
        assert!(wide.contains(&[5, 1, 5], &[]));
        assert!(!wide.contains(&[0, 2, 0], &[]));
        assert!(embed_set(&pred, 1).contains(&[100], &[]));
    }

    #[test]
    fn test_embed_relation() {
        let ctx = Context::new();
        let rel = parse_relation("{ [i] -> [floor(i / 2), i] }", &ctx).unwrap();
        let wide = embed_relation(&rel, 3, 5).unwrap();
        assert!(wide.contains(&[0, 5, 0], &[9, 2, 9, 5, 9], &[]));
        assert!(embed_relation(&rel, 3, 3).is_none());
        assert!(embed_relation(&rel, 1, 5).is_none());
    }
}
