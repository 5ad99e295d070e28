//! Transform pipeline.
//!
//! Reads a directive script line by line and folds every directive into one
//! cumulative transform, starting from the identity on the scheduled
//! instances. Lines are applied strictly in order; label definitions made by
//! one directive are visible to the next.

use crate::config::UnknownLabelPolicy;
use crate::frontend::{parse_line_checked, Directive};
use crate::polyhedral::{Context, PointRelation, PointSet};
use crate::transform::interpreter::{Interpreter, StepStatus};
use crate::transform::labels::LabelTable;
use crate::utils::errors::TransformError;
use log::{debug, info, warn};
use std::fmt;
use std::path::Path;

/// One script line and what became of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep {
    /// 1-based line number
    pub line: usize,
    pub text: String,
    pub directive: Option<Directive>,
    pub status: StepStatus,
}

/// Result of running a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// Cumulative transform over schedule space
    pub transform: PointRelation,
    pub steps: Vec<ScriptStep>,
}

impl PipelineOutcome {
    /// Outcome of an empty script.
    pub fn identity(domain: &PointSet) -> Self {
        Self {
            transform: domain.identity(),
            steps: Vec::new(),
        }
    }

    /// Number of directives that took effect.
    pub fn applied(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_applied()).count()
    }

    /// Number of directives that were recognized but skipped.
    pub fn skipped(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s.status, StepStatus::Skipped(_))).count()
    }

    /// Number of lines that are not directives.
    pub fn unrecognized(&self) -> usize {
        self.steps.iter().filter(|s| s.status == StepStatus::Unrecognized).count()
    }
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            match &step.status {
                StepStatus::Comment => continue,
                StepStatus::Applied => writeln!(f, "{:>4}: applied    {}", step.line, step.text)?,
                StepStatus::Skipped(reason) => {
                    writeln!(f, "{:>4}: skipped    {} ({})", step.line, step.text, reason)?
                }
                StepStatus::Unrecognized => writeln!(f, "{:>4}: unrecognized {}", step.line, step.text)?,
            }
        }
        Ok(())
    }
}

/// Runs directive scripts against one region.
pub struct TransformPipeline<'a> {
    interpreter: Interpreter<'a>,
}

impl<'a> TransformPipeline<'a> {
    pub fn new(ctx: &'a Context, unknown_labels: UnknownLabelPolicy) -> Self {
        Self {
            interpreter: Interpreter::new(ctx, unknown_labels),
        }
    }

    /// Run the script stored at `path`.
    ///
    /// A script that cannot be read leaves the transform at the identity.
    pub fn run_file(
        &self,
        path: &Path,
        domain: &PointSet,
        labels: &mut LabelTable,
    ) -> Result<PipelineOutcome, TransformError> {
        match std::fs::read_to_string(path) {
            Ok(script) => self.run(&script, domain, labels),
            Err(err) => {
                warn!("cannot read script {}: {}; using the identity transform", path.display(), err);
                Ok(PipelineOutcome::identity(domain))
            }
        }
    }

    /// Run an in-memory script over the scheduled instances `domain`.
    pub fn run(
        &self,
        script: &str,
        domain: &PointSet,
        labels: &mut LabelTable,
    ) -> Result<PipelineOutcome, TransformError> {
        let mut outcome = PipelineOutcome::identity(domain);
        for (idx, raw) in script.lines().enumerate() {
            let text = raw.trim();
            let mut step = ScriptStep {
                line: idx + 1,
                text: text.to_string(),
                directive: None,
                status: StepStatus::Comment,
            };
            if text.is_empty() || text.starts_with("//") {
                outcome.steps.push(step);
                continue;
            }

            match parse_line_checked(text) {
                Ok(directive) => {
                    let (transform, status) =
                        self.interpreter.apply(&directive, outcome.transform, labels)?;
                    debug!("line {}: {} -> {:?}", step.line, directive, status);
                    outcome.transform = transform;
                    step.directive = Some(directive);
                    step.status = status;
                }
                Err(err) => {
                    warn!("line {}: not a directive: {}", step.line, err);
                    step.status = StepStatus::Unrecognized;
                }
            }
            outcome.steps.push(step);
        }
        info!(
            "script: {} applied, {} skipped, {} unrecognized",
            outcome.applied(),
            outcome.skipped(),
            outcome.unrecognized()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::interpreter::SkipReason;
    use crate::transform::labels::LabelInfo;
    use std::io::Write;

    fn setup() -> (PointSet, LabelTable) {
        let s0 = PointSet::from_points(3, (0..2).map(|i| vec![0, i, 0]));
        let s1 = PointSet::from_points(3, (0..2).map(|i| vec![1, i, 0]));
        let mut labels = LabelTable::new();
        labels.insert("S0", LabelInfo::new(s0.clone(), 1));
        labels.insert("S1", LabelInfo::new(s1.clone(), 1));
        (s0.union(s1), labels)
    }

    #[test]
    fn test_comments_only_is_identity() {
        let ctx = Context::new();
        let (domain, mut labels) = setup();
        let pipeline = TransformPipeline::new(&ctx, UnknownLabelPolicy::Skip);
        let outcome = pipeline.run("// nothing\n\n   \n// here", &domain, &mut labels).unwrap();
        assert_eq!(outcome.transform, domain.identity());
        assert_eq!(outcome.applied(), 0);
        assert!(outcome.steps.iter().all(|s| s.status == StepStatus::Comment));
    }

    #[test]
    fn test_unrecognized_line_passes_through() {
        let ctx = Context::new();
        let (domain, mut labels) = setup();
        let pipeline = TransformPipeline::new(&ctx, UnknownLabelPolicy::Skip);
        let outcome = pipeline.run("tile(S0, 32)", &domain, &mut labels).unwrap();
        assert_eq!(outcome.transform, domain.identity());
        assert_eq!(outcome.unrecognized(), 1);
    }

    #[test]
    fn test_later_lines_see_new_labels() {
        let ctx = Context::new();
        let (domain, mut labels) = setup();
        let pipeline = TransformPipeline::new(&ctx, UnknownLabelPolicy::Skip);
        let script = "lift(S0, R, 1)\nrealign(R, S1, 1)\nrealign(Q, S1, 1)";
        let outcome = pipeline.run(script, &domain, &mut labels).unwrap();
        assert_eq!(outcome.applied(), 2);
        assert_eq!(
            outcome.steps[2].status,
            StepStatus::Skipped(SkipReason::UnknownLabel("Q".into()))
        );
        assert!(outcome.transform.contains(&[1, 1, 0], &[0, 1, 1]));
    }

    #[test]
    fn test_missing_script_file() {
        let ctx = Context::new();
        let (domain, mut labels) = setup();
        let pipeline = TransformPipeline::new(&ctx, UnknownLabelPolicy::Skip);
        let dir = tempfile::tempdir().unwrap();
        let outcome = pipeline
            .run_file(&dir.path().join("missing.txt"), &domain, &mut labels)
            .unwrap();
        assert_eq!(outcome.transform, domain.identity());
    }

    #[test]
    fn test_script_file() {
        let ctx = Context::new();
        let (domain, mut labels) = setup();
        let pipeline = TransformPipeline::new(&ctx, UnknownLabelPolicy::Skip);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "// fuse the two loops").unwrap();
        writeln!(file, "realign(S0, S1, 1)").unwrap();
        let outcome = pipeline.run_file(file.path(), &domain, &mut labels).unwrap();
        assert_eq!(outcome.applied(), 1);
        assert_eq!(outcome.steps.len(), 2);
    }
}
