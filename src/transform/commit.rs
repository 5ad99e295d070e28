//! Installing a legal transform into the statement schedules.

use crate::analysis::Scop;
use crate::polyhedral::PointRelation;
use crate::utils::errors::{TransformError, TransformErrorKind};
use log::{debug, info};

/// Compose every statement schedule with `transform` and install the result.
///
/// New schedules are computed for all statements first; nothing is
/// installed unless each one is single-valued. A statement whose instances
/// all fall outside the transform's domain gets an empty schedule.
pub fn commit(scop: &mut Scop, transform: &PointRelation) -> Result<(), TransformError> {
    let mut schedules = Vec::with_capacity(scop.statements.len());
    for stmt in &scop.statements {
        let schedule = stmt.schedule.clone().apply_range(transform);
        if !schedule.is_single_valued() {
            return Err(TransformError::new(
                format!("statement `{}` would run some instance more than once", stmt.name),
                TransformErrorKind::NonFunctionalSchedule,
                "commit",
            ));
        }
        if schedule.is_empty() && !stmt.domain.is_empty() {
            debug!("statement {} has no instance left in the new schedule", stmt.name);
        }
        schedules.push(schedule);
    }

    for (stmt, schedule) in scop.statements.iter_mut().zip(schedules) {
        debug!("{}: {}", stmt.name, schedule);
        stmt.schedule = schedule;
    }
    info!("committed new schedules for {} statements", scop.statements.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DependenceInfo, ScopStmt};
    use crate::polyhedral::{Context, PointSet};
    use crate::transform::labels::LabelTable;

    fn scop() -> Scop {
        let domain = PointSet::from_points(1, vec![vec![0], vec![1]]);
        let schedule = PointRelation::from_pairs(1, 3, vec![
            (vec![0], vec![0, 0, 0]),
            (vec![1], vec![0, 1, 0]),
        ]);
        Scop {
            name: "s".into(),
            context: Context::new(),
            statements: vec![ScopStmt::new("S0", domain, schedule)],
            labels: LabelTable::new(),
            dependences: DependenceInfo::unavailable(),
            optimized: false,
        }
    }

    #[test]
    fn test_commit_shifts_schedule() {
        let mut scop = scop();
        let t = scop.transform_domain().identity().translate_range(&[0, 0, 2]);
        commit(&mut scop, &t).unwrap();
        assert!(scop.statements[0].schedule.contains(&[1], &[0, 1, 2]));
    }

    #[test]
    fn test_commit_rejects_multivalued() {
        let mut scop = scop();
        let domain = scop.transform_domain();
        let t = domain.identity().union(domain.identity().translate_range(&[1, 0, 0]));
        let before = scop.statements.clone();
        let err = commit(&mut scop, &t).unwrap_err();
        assert_eq!(err.kind, TransformErrorKind::NonFunctionalSchedule);
        assert_eq!(scop.statements, before);
    }

    #[test]
    fn test_commit_outside_transform_is_empty() {
        let mut scop = scop();
        commit(&mut scop, &PointRelation::empty(3, 3)).unwrap();
        assert!(scop.statements[0].schedule.is_empty());
    }
}
