//! Legality checks on a composed transform.
//!
//! A transform is legal when it is injective and, if dependences are known,
//! every transformed dependence still runs strictly forward in schedule
//! order. Both checks run once on the whole script's transform.

use crate::polyhedral::{Collision, Context, PointRelation};
use crate::transform::ordering::lex_ge;
use log::{error, info, warn};
use std::fmt;

/// Number of colliding pairs kept as witnesses.
const MAX_COLLISIONS: usize = 8;

/// Outcome of the dependence-preservation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependenceVerdict {
    /// Every transformed dependence points forward
    Preserved,
    /// Transformed dependence pairs whose target runs at or before the source
    Violated { counter_examples: PointRelation },
    /// No dependence information was available
    Unchecked,
}

impl DependenceVerdict {
    /// Check if the verdict allows committing.
    pub fn allows_commit(&self) -> bool {
        !matches!(self, DependenceVerdict::Violated { .. })
    }
}

/// Result of both legality checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalityReport {
    pub injective: bool,
    /// Distinct instances sent to the same point
    pub collisions: Vec<Collision>,
    pub dependences: DependenceVerdict,
}

impl LegalityReport {
    /// Check if the transform may be committed.
    pub fn is_legal(&self) -> bool {
        self.injective && self.dependences.allows_commit()
    }
}

impl fmt::Display for LegalityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "injectivity: {}", if self.injective { "pass" } else { "FAIL" })?;
        for c in &self.collisions {
            writeln!(f, "  {:?} and {:?} both map to {:?}", c.first, c.second, c.image)?;
        }
        match &self.dependences {
            DependenceVerdict::Preserved => writeln!(f, "dependences: pass"),
            DependenceVerdict::Unchecked => writeln!(f, "dependences: unchecked"),
            DependenceVerdict::Violated { counter_examples } => {
                writeln!(f, "dependences: FAIL")?;
                writeln!(f, "  counter-examples: {}", counter_examples)
            }
        }
    }
}

/// Check `transform` against the schedule-space `validity` relation.
///
/// `validity` is `None` when dependences are unavailable; only injectivity
/// is checked then.
pub fn check(transform: &PointRelation, validity: Option<&PointRelation>, ctx: &Context) -> LegalityReport {
    let collisions = transform.collisions(MAX_COLLISIONS);
    let injective = collisions.is_empty();

    let dependences = match validity {
        None => {
            warn!("dependences unavailable, checking injectivity only");
            DependenceVerdict::Unchecked
        }
        Some(deps) => {
            let moved = deps.clone().apply_domain(transform).apply_range(transform);
            let counter_examples = moved.filter_by(&lex_ge(transform.n_out(), ctx.n_param()), ctx.param_values());
            if counter_examples.is_empty() {
                DependenceVerdict::Preserved
            } else {
                DependenceVerdict::Violated { counter_examples }
            }
        }
    };

    let report = LegalityReport { injective, collisions, dependences };
    if report.is_legal() {
        info!("transform is legal: injective, dependences {:?}", report.dependences);
    } else {
        error!("transform rejected:\n{}", report);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::PointSet;

    fn domain() -> PointSet {
        PointSet::from_points(3, vec![vec![0, 0, 0], vec![1, 0, 0]])
    }

    #[test]
    fn test_identity_is_legal() {
        let ctx = Context::new();
        let deps = PointRelation::from_pairs(3, 3, vec![(vec![0, 0, 0], vec![1, 0, 0])]);
        let report = check(&domain().identity(), Some(&deps), &ctx);
        assert!(report.is_legal());
        assert_eq!(report.dependences, DependenceVerdict::Preserved);
    }

    #[test]
    fn test_collision_detected() {
        let ctx = Context::new();
        let t = domain().product(&PointSet::singleton(vec![0, 0, 0]));
        let report = check(&t, None, &ctx);
        assert!(!report.injective);
        assert_eq!(report.collisions.len(), 1);
        assert_eq!(report.dependences, DependenceVerdict::Unchecked);
        assert!(!report.is_legal());
    }

    #[test]
    fn test_reversed_dependence_violated() {
        let ctx = Context::new();
        let deps = PointRelation::from_pairs(3, 3, vec![(vec![0, 0, 0], vec![1, 0, 0])]);
        let swap = PointRelation::from_pairs(3, 3, vec![
            (vec![0, 0, 0], vec![1, 0, 0]),
            (vec![1, 0, 0], vec![0, 0, 0]),
        ]);
        let report = check(&swap, Some(&deps), &ctx);
        assert!(report.injective);
        match report.dependences {
            DependenceVerdict::Violated { counter_examples } => {
                assert!(counter_examples.contains(&[1, 0, 0], &[0, 0, 0]));
                assert_eq!(counter_examples.len(), 1);
            }
            other => panic!("expected violation, got {:?}", other),
        }
    }
}
