//! Directive interpreter.
//!
//! Each directive is turned into an elementary relation over the current
//! schedule range `D'` and composed onto the range side of the cumulative
//! transform `T`. Label domains are kept in original schedule coordinates:
//! a label's current position is its domain pushed through `T`, and labels
//! created by a directive are pulled back through `T` before being stored.

use crate::config::UnknownLabelPolicy;
use crate::frontend::{parse_relation, parse_set, Directive};
use crate::polyhedral::{Context, PointRelation, PointSet, Space};
use crate::transform::labels::{LabelInfo, LabelTable};
use crate::transform::mapper::{embed_relation, embed_set, zero_pad_points};
use crate::transform::ordering::{lex_equal, lex_greater};
use crate::utils::errors::{PolyError, TransformError, TransformErrorKind};
use log::{debug, warn};
use std::fmt;

/// Why a directive left the transform unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A referenced label has no metadata
    UnknownLabel(String),
    /// Embedded set or relation text did not parse
    MalformedText(String),
    /// A relation does not fit the label's loops or the schedule width
    ArityMismatch(String),
    /// The relation algebra failed
    Algebra(PolyError),
}

impl From<PolyError> for SkipReason {
    fn from(err: PolyError) -> Self {
        SkipReason::Algebra(err)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownLabel(label) => write!(f, "unknown label `{}`", label),
            SkipReason::MalformedText(msg) => write!(f, "malformed text: {}", msg),
            SkipReason::ArityMismatch(msg) => write!(f, "arity mismatch: {}", msg),
            SkipReason::Algebra(err) => write!(f, "{}", err),
        }
    }
}

/// What happened to one script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The directive was composed into the transform
    Applied,
    /// The directive was recognized but left the transform unchanged
    Skipped(SkipReason),
    /// The line is not a directive
    Unrecognized,
    /// Blank or comment line
    Comment,
}

impl StepStatus {
    /// Check if the directive took effect.
    pub fn is_applied(&self) -> bool {
        matches!(self, StepStatus::Applied)
    }
}

/// Current geometry every directive starts from.
struct View<'t> {
    transform: &'t PointRelation,
    /// `D'`, the range of the transform
    range: PointSet,
    /// Schedule width of `D'`
    width: usize,
}

impl View<'_> {
    /// Current position of a label.
    fn post(&self, info: &LabelInfo) -> PointSet {
        self.transform.image(&info.domain)
    }

    /// Original coordinates of points of `D'`.
    fn pull_back(&self, set: &PointSet) -> PointSet {
        self.transform.reverse().image(set)
    }

    /// Points of `D'` scheduled at or before `anchor` on the band markers.
    fn up_to(&self, anchor: &PointSet, params: &[i64], n_param: usize) -> PointSet {
        let bands = (self.width + 1) / 2;
        lex_greater(self.width, bands, n_param)
            .image_within(anchor, &self.range, params)
            .union(anchor.clone())
            .intersect(&self.range)
    }

    /// Unit vector at band marker `depth`, or zero if the schedule is too narrow.
    fn band_step(&self, depth: usize) -> Vec<i64> {
        let mut step = vec![0; self.width];
        let at = Space::band_marker(depth);
        if at < self.width {
            step[at] = 1;
        } else {
            warn!("band marker {} lies outside the width-{} schedule", depth, self.width);
        }
        step
    }
}

/// Applies directives for one pass invocation.
pub struct Interpreter<'a> {
    ctx: &'a Context,
    unknown_labels: UnknownLabelPolicy,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter bound to a context.
    pub fn new(ctx: &'a Context, unknown_labels: UnknownLabelPolicy) -> Self {
        Self { ctx, unknown_labels }
    }

    /// Apply one directive to `transform`.
    ///
    /// Returns the new transform and what happened. A skipped directive
    /// returns `transform` unchanged and leaves `labels` untouched. Under
    /// [`UnknownLabelPolicy::Error`] an unknown label is an error instead.
    pub fn apply(
        &self,
        directive: &Directive,
        transform: PointRelation,
        labels: &mut LabelTable,
    ) -> Result<(PointRelation, StepStatus), TransformError> {
        if let Some(missing) = labels.first_missing(&directive.required_labels()) {
            return match self.unknown_labels {
                UnknownLabelPolicy::Skip => {
                    warn!("{}: skipped, label `{}` is unknown", directive, missing);
                    let reason = SkipReason::UnknownLabel(missing.to_string());
                    Ok((transform, StepStatus::Skipped(reason)))
                }
                UnknownLabelPolicy::Error => Err(TransformError::new(
                    format!("label `{}` is not defined", missing),
                    TransformErrorKind::UnknownLabel,
                    directive.to_string(),
                )),
            };
        }

        let view = View {
            range: transform.range(),
            width: transform.n_out(),
            transform: &transform,
        };
        let elementary = match directive {
            Directive::Realign { first, second, depth } => {
                self.realign(&view, labels, first, second, *depth)
            }
            Directive::IndexSplit { label, first, second, predicate, depth } => {
                self.index_split(&view, labels, label, first, second, predicate, *depth)
            }
            Directive::AffineRemap { label, relation } => {
                self.affine_remap(&view, labels, label, relation)
            }
            Directive::Lift { label, result, depth } => {
                self.lift(&view, labels, label, result, *depth)
            }
        };

        match elementary {
            Ok(map) => {
                debug!("{}: elementary map {}", directive, map);
                Ok((transform.apply_range(&map), StepStatus::Applied))
            }
            Err(reason) => {
                warn!("{}: skipped, {}", directive, reason);
                Ok((transform, StepStatus::Skipped(reason)))
            }
        }
    }

    fn label<'t>(labels: &'t LabelTable, name: &str) -> Result<&'t LabelInfo, SkipReason> {
        labels.get(name).ok_or_else(|| SkipReason::UnknownLabel(name.to_string()))
    }

    /// Move everything after `first` so that it continues `first` at band `depth`.
    fn realign(
        &self,
        view: &View<'_>,
        labels: &LabelTable,
        first: &str,
        second: &str,
        depth: usize,
    ) -> Result<PointRelation, SkipReason> {
        let params = self.ctx.param_values();
        let post1 = view.post(Self::label(labels, first)?);
        let post2 = view.post(Self::label(labels, second)?);
        debug!("realign: {} at {}, {} at {}", first, post1, second, post2);

        let left = view.up_to(&post1, params, self.ctx.n_param());
        let right = view.range.clone().subtract(&left);

        let left_pad = zero_pad_points(&left, self.ctx)?;
        let right_pad = zero_pad_points(&right, self.ctx)?;
        let gap = match (left_pad.lexmax(), right_pad.lexmin()) {
            (Some(max), Some(min)) => {
                let raw = PointSet::singleton(max.clone())
                    .sum(&PointSet::singleton(min.clone()).neg());
                raw.translate(&view.band_step(depth)).lexmin().cloned()
            }
            _ => None,
        };
        debug!("realign: left {} right {} gap {:?}", left, right, gap);

        let map = match gap {
            Some(gap) => left.identity().union(right.identity().translate_range(&gap)),
            None => view.range.identity(),
        };
        Ok(map)
    }

    /// Split `label` into the instances satisfying `predicate` and the rest.
    #[allow(clippy::too_many_arguments)]
    fn index_split(
        &self,
        view: &View<'_>,
        labels: &mut LabelTable,
        label: &str,
        first: &str,
        second: &str,
        predicate: &str,
        depth: usize,
    ) -> Result<PointRelation, SkipReason> {
        let params = self.ctx.param_values();
        let pred = parse_set(predicate, self.ctx)
            .map_err(|e| SkipReason::MalformedText(e.to_string()))?;
        let embedded = embed_set(&pred, view.width);

        let info = Self::label(labels, label)?.clone();
        let post = view.post(&info);
        let pred_post = embedded.filter(&post, params);
        debug!("isplit: {} at {}, predicate part {}", label, post, pred_post);

        let before = lex_greater(view.width, (view.width + 1) / 2, self.ctx.n_param())
            .image_within(&post, &view.range, params);
        let left = before.union(pred_post.clone()).intersect(&view.range);
        let right = view.range.clone().subtract(&left);
        let map = left.identity()
            .union(right.identity().translate_range(&view.band_step(depth)));

        let taken = info.domain.clone().intersect(&view.pull_back(&pred_post));
        let rest = info.domain.clone().subtract(&taken);
        debug!("isplit: {} <- {}, {} <- {}", first, taken, second, rest);
        labels.insert(first, LabelInfo::new(taken, info.depth));
        labels.insert(second, LabelInfo::new(rest, info.depth));
        Ok(map)
    }

    /// Apply a user relation to the leading loops of `label`.
    fn affine_remap(
        &self,
        view: &View<'_>,
        labels: &mut LabelTable,
        label: &str,
        relation: &str,
    ) -> Result<PointRelation, SkipReason> {
        let user = parse_relation(relation, self.ctx)
            .map_err(|e| SkipReason::MalformedText(e.to_string()))?;
        let info = Self::label(labels, label)?.clone();
        let (k, m, w) = (user.n_in(), user.n_out(), view.width);

        let new_depth = (info.depth + m).checked_sub(k).ok_or_else(|| {
            SkipReason::ArityMismatch(format!(
                "{} loops removed from `{}` at depth {}", k - m, label, info.depth
            ))
        })?;
        let offset = 2 * (m as i64 - k as i64);
        let new_width = w + offset.max(0) as usize;

        let mut map = embed_relation(&user, w, new_width).ok_or_else(|| {
            SkipReason::ArityMismatch(format!(
                "[{}] -> [{}] does not fit schedule width {}", k, m, w
            ))
        })?;
        // bands enclosing the remapped loops are kept
        for i in (0..2 * k.min(m)).step_by(2) {
            map.equate(i, i, 0);
        }
        // coordinates after the remapped loops move by `offset`
        for i in (2 * k)..w {
            let j = i as i64 + offset;
            if (0..new_width as i64).contains(&j) {
                map.equate(j as usize, i, 0);
            }
        }
        // band markers between introduced loops
        if offset > 0 {
            for i in (0..offset as usize).step_by(2) {
                map.fix_out(2 * k + i, 0);
            }
        }
        // slots vacated by removed loops
        for j in ((w as i64 + offset).max(0) as usize)..new_width {
            map.fix_out(j, 0);
        }

        let post = view.post(&info);
        let moved = map.image_pairs(&post, self.ctx)?;
        let others = view.range.clone().subtract(&post);
        debug!("affine: {} moved {}, width {} -> {}", label, moved, w, new_width);

        labels.set_depth(label, new_depth);
        Ok(moved.union(others.identity().pad_range(new_width)))
    }

    /// Record the part of `D'` sharing `label`'s first `depth` bands as `result`.
    fn lift(
        &self,
        view: &View<'_>,
        labels: &mut LabelTable,
        label: &str,
        result: &str,
        depth: usize,
    ) -> Result<PointRelation, SkipReason> {
        let info = Self::label(labels, label)?.clone();
        let post = view.post(&info);
        let lifted = lex_equal(view.width, depth, self.ctx.n_param())
            .image_within(&post, &view.range, self.ctx.param_values());
        let domain = view.pull_back(&lifted);
        debug!("lift: {} -> {} at {}", label, result, domain);
        labels.insert(result, LabelInfo::new(domain, info.depth));
        Ok(view.range.identity())
    }
}
