//! Script-driven schedule transformation.
//!
//! One pass invocation runs a directive script against a region:
//!
//! 1. the pipeline folds every directive into one transform `T` over
//!    schedule space, starting from the identity,
//! 2. the legality checker verifies `T` is injective and preserves the
//!    dependences,
//! 3. the commit stage composes each statement schedule with `T`.
//!
//! An illegal transform leaves every schedule untouched. Either way the
//! region is marked as optimized.

pub mod labels;
pub mod mapper;
pub mod ordering;
pub mod interpreter;
pub mod pipeline;
pub mod legality;
pub mod commit;

pub use interpreter::{Interpreter, SkipReason, StepStatus};
pub use labels::{LabelInfo, LabelTable};
pub use legality::{DependenceVerdict, LegalityReport};
pub use pipeline::{PipelineOutcome, ScriptStep, TransformPipeline};

use crate::analysis::Scop;
use crate::config::TransformConfig;
use crate::polyhedral::PointRelation;
use crate::utils::errors::Diagnostic;
use anyhow::{bail, Result};
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Final state of a pass invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    /// New schedules were installed
    Committed,
    /// The transform was illegal; schedules are unchanged
    Rejected,
    /// The region has no instances; nothing to do
    EmptyRegion,
}

/// Everything a pass invocation found out.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub status: PassStatus,
    pub pipeline: PipelineOutcome,
    /// `None` for an empty region
    pub legality: Option<LegalityReport>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PassReport {
    /// Check if schedules were replaced.
    pub fn committed(&self) -> bool {
        self.status == PassStatus::Committed
    }

    /// Cumulative transform computed from the script.
    pub fn transform(&self) -> &PointRelation {
        &self.pipeline.transform
    }

    /// Serializable digest for JSON output.
    pub fn summary(&self, scop: &Scop) -> PassSummary {
        let (dependences, counter_examples) = match self.legality.as_ref().map(|l| &l.dependences) {
            Some(DependenceVerdict::Preserved) => ("preserved", Vec::new()),
            Some(DependenceVerdict::Violated { counter_examples }) => {
                ("violated", counter_examples.iter().cloned().collect())
            }
            Some(DependenceVerdict::Unchecked) | None => ("unchecked", Vec::new()),
        };
        PassSummary {
            scop: scop.name.clone(),
            status: self.status,
            applied: self.pipeline.applied(),
            skipped: self.pipeline.skipped(),
            unrecognized: self.pipeline.unrecognized(),
            injective: self.legality.as_ref().map_or(true, |l| l.injective),
            dependences: dependences.to_string(),
            counter_examples,
            diagnostics: self.diagnostics.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pipeline)?;
        if let Some(legality) = &self.legality {
            write!(f, "{}", legality)?;
        }
        for diag in &self.diagnostics {
            writeln!(f, "{}", diag)?;
        }
        writeln!(f, "status: {:?}", self.status)
    }
}

/// JSON form of a [`PassReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub scop: String,
    pub status: PassStatus,
    pub applied: usize,
    pub skipped: usize,
    pub unrecognized: usize,
    pub injective: bool,
    /// `preserved`, `violated` or `unchecked`
    pub dependences: String,
    /// Violating pairs in schedule space
    pub counter_examples: Vec<(Vec<i64>, Vec<i64>)>,
    pub diagnostics: Vec<String>,
}

enum Script<'s> {
    File(&'s Path),
    Text(&'s str),
}

/// Run the script named by `config` on `scop`.
///
/// Without a script the transform is the identity and the original
/// schedules are committed unchanged.
pub fn run_on_scop(scop: &mut Scop, config: &TransformConfig) -> Result<PassReport> {
    match &config.script {
        Some(path) => run_pass(scop, config, Script::File(path)),
        None => run_pass(scop, config, Script::Text("")),
    }
}

/// Run an in-memory script on `scop`; `config.script` is ignored.
pub fn run_on_scop_with_script(scop: &mut Scop, config: &TransformConfig, script: &str) -> Result<PassReport> {
    run_pass(scop, config, Script::Text(script))
}

fn run_pass(scop: &mut Scop, config: &TransformConfig, script: Script<'_>) -> Result<PassReport> {
    check_binding(scop, config)?;
    let mut diagnostics = Vec::new();
    if scop.is_empty() {
        info!("SCoP `{}` has no instances, nothing to transform", scop.name);
        scop.optimized = true;
        return Ok(PassReport {
            status: PassStatus::EmptyRegion,
            pipeline: PipelineOutcome::identity(&scop.transform_domain()),
            legality: None,
            diagnostics,
        });
    }

    let ctx = scop.context.clone().with_max_points(config.max_points);
    let validity = if !config.check_dependences {
        diagnostics.push(Diagnostic::note("dependence check disabled"));
        None
    } else if let Some(validity) = scop.validity() {
        Some(validity)
    } else {
        warn!("SCoP `{}`: dependence analysis unavailable", scop.name);
        diagnostics.push(
            Diagnostic::warning("dependence analysis unavailable")
                .with_note("only injectivity is checked"),
        );
        None
    };

    let domain = scop.transform_domain();
    let mut labels = scop.labels.clone();
    let pipeline = TransformPipeline::new(&ctx, config.unknown_labels);
    let outcome = match script {
        Script::File(path) => pipeline.run_file(path, &domain, &mut labels),
        Script::Text(text) => pipeline.run(text, &domain, &mut labels),
    };
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            scop.optimized = true;
            return Err(anyhow::Error::new(err)
                .context(format!("running script on SCoP `{}`", scop.name)));
        }
    };
    for step in &outcome.steps {
        if let StepStatus::Skipped(reason) = &step.status {
            diagnostics.push(
                Diagnostic::warning(format!("line {}: directive skipped", step.line))
                    .with_note(format!("{}: {}", step.text, reason)),
            );
        }
    }

    let report = legality::check(&outcome.transform, validity.as_ref(), &ctx);
    let status = if !report.is_legal() {
        diagnostics.push(rejection(&report));
        PassStatus::Rejected
    } else {
        match commit::commit(scop, &outcome.transform) {
            Ok(()) => {
                scop.labels = relabel(&labels, &outcome.transform);
                PassStatus::Committed
            }
            Err(err) => {
                diagnostics.push(Diagnostic::error(err.to_string()));
                PassStatus::Rejected
            }
        }
    };
    scop.optimized = true;
    info!("SCoP `{}`: {:?}", scop.name, status);

    Ok(PassReport {
        status,
        pipeline: outcome,
        legality: Some(report),
        diagnostics,
    })
}

/// Parameters are bound when the region is loaded; `config` must agree.
fn check_binding(scop: &Scop, config: &TransformConfig) -> Result<()> {
    for (name, &value) in &config.params {
        match scop.context.value_of(name) {
            Some(bound) if bound == value => {}
            Some(bound) => bail!(
                "SCoP `{}` was loaded with {} = {}, not {}; load it with this config instead",
                scop.name, name, bound, value
            ),
            None => bail!("SCoP `{}` has no parameter `{}`", scop.name, name),
        }
    }
    Ok(())
}

fn rejection(report: &LegalityReport) -> Diagnostic {
    let mut diag = Diagnostic::error("transform is illegal, schedules left unchanged");
    for c in &report.collisions {
        diag = diag.with_note(format!(
            "{:?} and {:?} both map to {:?}", c.first, c.second, c.image
        ));
    }
    if let DependenceVerdict::Violated { counter_examples } = &report.dependences {
        diag = diag.with_note(format!("dependences violated: {}", counter_examples));
    }
    diag
}

/// Move label domains into the committed schedule space.
fn relabel(labels: &LabelTable, transform: &PointRelation) -> LabelTable {
    let mut moved = LabelTable::new();
    for (name, info) in labels.iter() {
        moved.insert(name.clone(), LabelInfo::new(transform.image(&info.domain), info.depth));
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ScopDescription;

    fn scop(deps: &str) -> Scop {
        let text = format!(r#"{{
            "name": "fuse",
            "params": {{ "N": 3 }},
            "statements": [
                {{ "name": "S0", "domain": "[N] -> {{ S0[i] : 0 <= i < N }}", "schedule": "{{ S0[i] -> [0, i, 0] }}" }},
                {{ "name": "S1", "domain": "[N] -> {{ S1[i] : 0 <= i < N }}", "schedule": "{{ S1[i] -> [1, i, 0] }}" }}
            ]{}
        }}"#, deps);
        let desc = ScopDescription::from_json(&text).unwrap();
        Scop::from_description(&desc, desc.context(&TransformConfig::default()).unwrap()).unwrap()
    }

    const FLOW: &str = r#", "dependences": { "relations": [ { "kind": "RAW", "relation": "{ S0[i] -> S1[i] }" } ] }"#;

    #[test]
    fn test_fusion_committed() {
        let mut scop = scop(FLOW);
        let report = run_on_scop_with_script(&mut scop, &TransformConfig::default(), "realign(S0, S1, 1)").unwrap();
        assert_eq!(report.status, PassStatus::Committed);
        assert!(scop.optimized);
        assert!(scop.statement("S1").unwrap().schedule.contains(&[2], &[0, 2, 1]));
        assert!(scop.labels.get("S1").unwrap().domain.contains(&[0, 2, 1]));
    }

    #[test]
    fn test_rejected_leaves_schedules() {
        let mut scop = scop(FLOW);
        let before = scop.statements.clone();
        let report = run_on_scop_with_script(&mut scop, &TransformConfig::default(), "realign(S0, S1, 2)").unwrap();
        assert_eq!(report.status, PassStatus::Rejected);
        assert!(scop.optimized);
        assert_eq!(scop.statements, before);
        assert!(!report.summary(&scop).injective);
    }

    #[test]
    fn test_missing_dependences_warns() {
        let mut scop = scop("");
        let report = run_on_scop(&mut scop, &TransformConfig::default()).unwrap();
        assert_eq!(report.status, PassStatus::Committed);
        assert!(report.diagnostics.iter().any(|d| d.message.contains("unavailable")));
        assert_eq!(report.summary(&scop).dependences, "unchecked");
    }

    #[test]
    fn test_strict_labels_error() {
        let mut scop = scop(FLOW);
        let config = TransformConfig::new().with_unknown_labels(crate::config::UnknownLabelPolicy::Error);
        assert!(run_on_scop_with_script(&mut scop, &config, "lift(X, Y, 0)").is_err());
        assert!(scop.optimized);
    }
}
