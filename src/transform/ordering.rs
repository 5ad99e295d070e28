//! Lexicographic order relations over schedule coordinates.
//!
//! The band-prefix orders compare only band markers (even indices); the
//! full order compares every coordinate and decides execution order.

use crate::polyhedral::{
    AffineExpr, AffineRelation, Constraint, ConstraintSystem, Space,
};

fn column_diff(a: usize, b: usize, n_columns: usize, n_param: usize) -> AffineExpr {
    AffineExpr::var(a, n_columns, n_param) - AffineExpr::var(b, n_columns, n_param)
}

/// Disjunct "coordinates in `prefix` are equal and coordinate `at` is
/// strictly greater in the input".
fn greater_at(width: usize, prefix: &[usize], at: usize, n_param: usize) -> ConstraintSystem {
    let n = 2 * width;
    let mut sys = ConstraintSystem::new(n, n_param);
    for &j in prefix {
        sys.add(Constraint::equate(j, width + j, 0, n, n_param));
    }
    let mut diff = column_diff(at, width + at, n, n_param);
    diff.constant -= 1;
    sys.add(Constraint::ge_zero(diff));
    sys
}

/// Pairs `(x, y)` where `x` is greater than `y` on the first `bands` band
/// markers: for some `i < bands`, `x[2j] = y[2j]` for all `j < i` and
/// `x[2i] > y[2i]`.
pub fn lex_greater(width: usize, bands: usize, n_param: usize) -> AffineRelation {
    let mut rel = AffineRelation::empty(Space::map(width, width));
    let markers: Vec<usize> = (0..bands)
        .map(Space::band_marker)
        .take_while(|&c| c < width)
        .collect();
    for (i, &at) in markers.iter().enumerate() {
        rel.pieces.push(greater_at(width, &markers[..i], at, n_param));
    }
    rel
}

/// Pairs agreeing on the first `bands` band markers.
pub fn lex_equal(width: usize, bands: usize, n_param: usize) -> AffineRelation {
    let mut rel = AffineRelation::universe(width, width, n_param);
    for c in (0..bands).map(Space::band_marker).take_while(|&c| c < width) {
        rel.equate(c, c, 0);
    }
    rel
}

/// Pairs where `x` is lexicographically greater than or equal to `y` over
/// all coordinates.
pub fn lex_ge(width: usize, n_param: usize) -> AffineRelation {
    let mut rel = AffineRelation::empty(Space::map(width, width));
    let all: Vec<usize> = (0..width).collect();
    let mut equal = ConstraintSystem::new(2 * width, n_param);
    for &j in &all {
        equal.add(Constraint::equate(j, width + j, 0, 2 * width, n_param));
    }
    rel.pieces.push(equal);
    for at in 0..width {
        rel.pieces.push(greater_at(width, &all[..at], at, n_param));
    }
    rel
}
