//! Static Control Part (SCoP) model.
//!
//! A region arrives as a [`ScopDescription`] (JSON) holding set and relation
//! text. Loading binds the parameters, enumerates every statement instance,
//! and checks the initial schedule before any transformation touches it.

use crate::analysis::dependence::{DependenceInfo, DependenceKind, DependenceRelation};
use crate::config::TransformConfig;
use crate::frontend::{parse_relation, parse_set};
use crate::polyhedral::{Context, PointRelation, PointSet};
use crate::transform::labels::{LabelInfo, LabelTable};
use crate::utils::errors::{PolyError, PwaffError, ScopError, ScopErrorKind};
use anyhow::Context as _;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serialized form of a region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopDescription {
    pub name: String,
    /// Parameter values
    #[serde(default)]
    pub params: BTreeMap<String, i64>,
    pub statements: Vec<StatementDescription>,
    #[serde(default)]
    pub labels: Vec<LabelDescription>,
    /// Missing means the dependence analysis is unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependences: Option<DependenceDescription>,
}

/// One statement: iteration domain and schedule in set/relation notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementDescription {
    pub name: String,
    pub domain: String,
    pub schedule: String,
}

/// A label naming statements and/or a schedule-space region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDescription {
    pub name: String,
    #[serde(default)]
    pub statements: Vec<String>,
    /// Set over schedule coordinates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
}

/// Upstream dependence analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependenceDescription {
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default)]
    pub relations: Vec<DependenceEntry>,
}

fn default_valid() -> bool {
    true
}

/// One dependence; statement names come from the relation's tuple names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependenceEntry {
    pub kind: DependenceKind,
    pub relation: String,
}

impl ScopDescription {
    /// Parse a JSON description.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("invalid SCoP description")
    }

    /// Context binding the described parameters, with the overrides and
    /// point limit of `config` applied.
    pub fn context(&self, config: &TransformConfig) -> Result<Context, PolyError> {
        let mut ctx = Context::from_map(&self.params).with_max_points(config.max_points);
        for (name, &value) in &config.params {
            ctx.override_param(name, value)?;
        }
        Ok(ctx)
    }
}

/// A statement with enumerated instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopStmt {
    pub name: String,
    /// Iteration domain
    pub domain: PointSet,
    /// Schedule restricted to the domain
    pub schedule: PointRelation,
}

impl ScopStmt {
    pub fn new(name: impl Into<String>, domain: PointSet, schedule: PointRelation) -> Self {
        Self {
            name: name.into(),
            domain,
            schedule,
        }
    }

    /// Number of enclosing loops.
    pub fn depth(&self) -> usize {
        self.domain.dim()
    }
}

/// A Static Control Part: the unit one pass invocation works on.
#[derive(Debug, Clone)]
pub struct Scop {
    pub name: String,
    /// Parameter binding shared by every relation of this region
    pub context: Context,
    pub statements: Vec<ScopStmt>,
    /// Labels available to directives
    pub labels: LabelTable,
    pub dependences: DependenceInfo,
    /// Set once a pass has considered this region
    pub optimized: bool,
}

impl Scop {
    /// Load a region from JSON under `config`'s parameters and point limit.
    pub fn from_json(text: &str, config: &TransformConfig) -> anyhow::Result<Self> {
        let desc = ScopDescription::from_json(text)?;
        let ctx = desc.context(config)?;
        Ok(Self::from_description(&desc, ctx)?)
    }

    /// Build a region from its description.
    pub fn from_description(desc: &ScopDescription, ctx: Context) -> Result<Self, PwaffError> {
        let mut statements: Vec<ScopStmt> = Vec::new();
        for stmt in &desc.statements {
            if statements.iter().any(|s| s.name == stmt.name) {
                return Err(ScopError::new(
                    format!("statement `{}` is defined twice", stmt.name),
                    ScopErrorKind::DuplicateStatement,
                ).into());
            }
            statements.push(load_statement(stmt, &ctx)?);
        }

        let width = statements.iter().map(|s| s.schedule.n_out()).max().unwrap_or(0);
        for stmt in &mut statements {
            stmt.schedule = stmt.schedule.pad_range(width);
        }
        check_disjoint(&statements)?;

        let mut scop = Self {
            name: desc.name.clone(),
            context: ctx,
            statements,
            labels: LabelTable::new(),
            dependences: DependenceInfo::unavailable(),
            optimized: false,
        };
        scop.labels = scop.build_labels(&desc.labels)?;
        if let Some(deps) = &desc.dependences {
            scop.dependences = scop.build_dependences(deps)?;
        }
        info!(
            "loaded SCoP `{}`: {} statements, {} instances, schedule width {}",
            scop.name,
            scop.statements.len(),
            scop.transform_domain().len(),
            scop.schedule_width()
        );
        Ok(scop)
    }

    /// Common schedule width of all statements.
    pub fn schedule_width(&self) -> usize {
        self.statements.first().map_or(0, |s| s.schedule.n_out())
    }

    /// Check if the region has no statement instances.
    pub fn is_empty(&self) -> bool {
        self.statements.iter().all(|s| s.domain.is_empty())
    }

    /// Scheduled instances of all statements.
    pub fn transform_domain(&self) -> PointSet {
        self.statements.iter().fold(
            PointSet::empty(self.schedule_width()),
            |acc, s| acc.union(s.schedule.range()),
        )
    }

    /// Find a statement by name.
    pub fn statement(&self, name: &str) -> Option<&ScopStmt> {
        self.statements.iter().find(|s| s.name == name)
    }

    /// Validity relation in schedule space, `None` when dependences are unavailable.
    pub fn validity(&self) -> Option<PointRelation> {
        self.dependences.validity(&self.statements, self.schedule_width())
    }

    fn unknown_statement(&self, name: &str, used_by: &str) -> PwaffError {
        ScopError::new(
            format!("{} refers to unknown statement `{}`", used_by, name),
            ScopErrorKind::UnknownStatement,
        ).into()
    }

    fn build_labels(&self, descs: &[LabelDescription]) -> Result<LabelTable, PwaffError> {
        let mut labels = LabelTable::new();
        for stmt in &self.statements {
            labels.insert(stmt.name.clone(), LabelInfo::new(stmt.schedule.range(), stmt.depth()));
        }

        let width = self.schedule_width();
        let universe = self.transform_domain();
        for desc in descs {
            let mut domain = PointSet::empty(width);
            let mut depth = 0;
            for name in &desc.statements {
                let stmt = self.statement(name)
                    .ok_or_else(|| self.unknown_statement(name, &format!("label `{}`", desc.name)))?;
                domain = domain.union(stmt.schedule.range());
                depth = depth.max(stmt.depth());
            }
            if let Some(text) = &desc.domain {
                let set = parse_set(text, &self.context)?;
                if set.dim() != width {
                    return Err(PolyError::DimensionMismatch { expected: width, found: set.dim() }.into());
                }
                domain = domain.union(set.filter(&universe, self.context.param_values()));
                if desc.statements.is_empty() {
                    depth = width / 2;
                }
            }
            let depth = desc.depth.unwrap_or(depth);
            debug!("label {} (depth {}): {}", desc.name, depth, domain);
            labels.insert(desc.name.clone(), LabelInfo::new(domain, depth));
        }
        Ok(labels)
    }

    fn build_dependences(&self, desc: &DependenceDescription) -> Result<DependenceInfo, PwaffError> {
        if !desc.valid {
            return Ok(DependenceInfo::unavailable());
        }
        let mut relations = Vec::new();
        for entry in &desc.relations {
            let rel = parse_relation(&entry.relation, &self.context)?;
            let used_by = format!("{} dependence", entry.kind.short_name());
            let src_name = rel.in_name.clone().unwrap_or_default();
            let tgt_name = rel.out_name.clone().unwrap_or_default();
            let src = self.statement(&src_name)
                .ok_or_else(|| self.unknown_statement(&src_name, &used_by))?;
            let tgt = self.statement(&tgt_name)
                .ok_or_else(|| self.unknown_statement(&tgt_name, &used_by))?;
            if rel.n_in() != src.depth() || rel.n_out() != tgt.depth() {
                return Err(ScopError::new(
                    format!("{} {} -> {} has the wrong arity", used_by, src_name, tgt_name),
                    ScopErrorKind::ScheduleMismatch,
                ).into());
            }

            let pairs = match rel.image_pairs(&src.domain, &self.context) {
                Ok(pairs) => pairs,
                Err(PolyError::Unbounded { .. }) => {
                    rel.restrict(src.domain.product(&tgt.domain), self.context.param_values())
                }
                Err(err) => return Err(err.into()),
            };
            let pairs = pairs.intersect_range(&tgt.domain);
            debug!("{} {} -> {}: {}", used_by, src_name, tgt_name, pairs);
            relations.push(DependenceRelation::new(entry.kind, src_name, tgt_name, pairs));
        }
        Ok(DependenceInfo::new(relations))
    }
}

fn load_statement(desc: &StatementDescription, ctx: &Context) -> Result<ScopStmt, PwaffError> {
    let domain = parse_set(&desc.domain, ctx)?.enumerate(ctx)?;
    let schedule = parse_relation(&desc.schedule, ctx)?;
    if schedule.n_in() != domain.dim() {
        return Err(ScopError::new(
            format!(
                "schedule of `{}` takes {} coordinates, domain has {}",
                desc.name, schedule.n_in(), domain.dim()
            ),
            ScopErrorKind::ScheduleMismatch,
        ).into());
    }
    let pairs = schedule.image_pairs(&domain, ctx)?;
    if !pairs.is_single_valued() || pairs.domain() != domain {
        return Err(ScopError::new(
            format!("schedule of `{}` must assign exactly one time to each instance", desc.name),
            ScopErrorKind::ScheduleMismatch,
        ).into());
    }
    Ok(ScopStmt::new(desc.name.clone(), domain, pairs))
}

/// Distinct instances must not share a schedule point.
fn check_disjoint(statements: &[ScopStmt]) -> Result<(), PwaffError> {
    for (i, a) in statements.iter().enumerate() {
        if !a.schedule.is_injective() {
            return Err(ScopError::new(
                format!("schedule of `{}` maps two instances to one time", a.name),
                ScopErrorKind::OverlappingSchedules,
            ).into());
        }
        for b in &statements[i + 1..] {
            if !a.schedule.range().is_disjoint(&b.schedule.range()) {
                return Err(ScopError::new(
                    format!("schedules of `{}` and `{}` overlap", a.name, b.name),
                    ScopErrorKind::OverlappingSchedules,
                ).into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LOOPS: &str = r#"{
        "name": "two_loops",
        "params": { "N": 4 },
        "statements": [
            { "name": "S0", "domain": "[N] -> { S0[i] : 0 <= i < N }", "schedule": "{ S0[i] -> [0, i, 0] }" },
            { "name": "S1", "domain": "[N] -> { S1[i] : 0 <= i < N }", "schedule": "{ S1[i] -> [1, i] }" }
        ],
        "labels": [ { "name": "L", "statements": ["S0", "S1"] } ],
        "dependences": { "relations": [
            { "kind": "RAW", "relation": "[N] -> { S0[i] -> S1[i] }" }
        ] }
    }"#;

    fn load(text: &str) -> Result<Scop, PwaffError> {
        let desc = ScopDescription::from_json(text).unwrap();
        let ctx = desc.context(&TransformConfig::default()).unwrap();
        Scop::from_description(&desc, ctx)
    }

    #[test]
    fn test_load_pads_schedules() {
        let scop = load(TWO_LOOPS).unwrap();
        assert_eq!(scop.schedule_width(), 3);
        assert_eq!(scop.transform_domain().len(), 8);
        assert!(scop.statement("S1").unwrap().schedule.contains(&[2], &[1, 2, 0]));
        assert!(!scop.is_empty());
        assert!(!scop.optimized);
    }

    #[test]
    fn test_labels_registered() {
        let scop = load(TWO_LOOPS).unwrap();
        assert_eq!(scop.labels.get("S0").unwrap().depth, 1);
        assert_eq!(scop.labels.get("L").unwrap().domain.len(), 8);
    }

    #[test]
    fn test_dependences_loaded() {
        let scop = load(TWO_LOOPS).unwrap();
        assert!(scop.dependences.valid);
        assert_eq!(scop.dependences.relations[0].relation.len(), 4);
        let validity = scop.validity().unwrap();
        assert!(validity.contains(&[0, 3, 0], &[1, 3, 0]));
    }

    #[test]
    fn test_missing_dependences_unavailable() {
        let text = r#"{ "name": "s", "statements": [
            { "name": "S0", "domain": "{ S0[i] : 0 <= i < 2 }", "schedule": "{ S0[i] -> [0, i, 0] }" }
        ] }"#;
        let scop = load(text).unwrap();
        assert!(scop.validity().is_none());
    }

    #[test]
    fn test_param_override() {
        let config = TransformConfig::new().with_param("N", 2);
        let scop = Scop::from_json(TWO_LOOPS, &config).unwrap();
        assert_eq!(scop.transform_domain().len(), 4);
        assert_eq!(scop.context.value_of("N"), Some(2));
        let desc = ScopDescription::from_json(TWO_LOOPS).unwrap();
        assert!(desc.context(&TransformConfig::new().with_param("M", 2)).is_err());
    }

    #[test]
    fn test_max_points_bounds_loading() {
        let config = TransformConfig::new().with_param("N", 100).with_max_points(10);
        let err = Scop::from_json(TWO_LOOPS, &config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PwaffError>(),
            Some(PwaffError::Poly(PolyError::TooManyPoints { limit: 10 }))
        ));
        let scop = Scop::from_json(TWO_LOOPS, &TransformConfig::new().with_max_points(10)).unwrap();
        assert_eq!(scop.context.max_points(), 10);
    }

    #[test]
    fn test_overlapping_schedules_rejected() {
        let text = r#"{ "name": "s", "statements": [
            { "name": "S0", "domain": "{ S0[i] : 0 <= i < 2 }", "schedule": "{ S0[i] -> [0, i, 0] }" },
            { "name": "S1", "domain": "{ S1[i] : 0 <= i < 2 }", "schedule": "{ S1[i] -> [0, i, 0] }" }
        ] }"#;
        match load(text) {
            Err(PwaffError::Scop(err)) => assert_eq!(err.kind, ScopErrorKind::OverlappingSchedules),
            other => panic!("expected overlap error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_statement_rejected() {
        let text = r#"{ "name": "s", "statements": [
            { "name": "S0", "domain": "{ S0[i] : 0 <= i < 2 }", "schedule": "{ S0[i] -> [0, i, 0] }" },
            { "name": "S0", "domain": "{ S0[i] : 0 <= i < 2 }", "schedule": "{ S0[i] -> [1, i, 0] }" }
        ] }"#;
        assert!(matches!(load(text), Err(PwaffError::Scop(e)) if e.kind == ScopErrorKind::DuplicateStatement));
    }

    #[test]
    fn test_unknown_dependence_statement() {
        let text = r#"{ "name": "s", "statements": [
            { "name": "S0", "domain": "{ S0[i] : 0 <= i < 2 }", "schedule": "{ S0[i] -> [0, i, 0] }" }
        ], "dependences": { "relations": [ { "kind": "WAW", "relation": "{ S0[i] -> S7[i] }" } ] } }"#;
        assert!(matches!(load(text), Err(PwaffError::Scop(e)) if e.kind == ScopErrorKind::UnknownStatement));
    }
}
