//! Dependence relations between statement instances.
//!
//! Dependences are computed upstream and handed to the pass as finite
//! relations between iteration vectors:
//! - RAW/WAR/WAW/RAR classification
//! - Direction vectors for reporting
//! - The validity relation in schedule space, used by the legality check

use crate::analysis::scop::ScopStmt;
use crate::polyhedral::PointRelation;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of data dependence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependenceKind {
    /// Read-after-write (true/flow dependence)
    #[serde(rename = "RAW", alias = "flow")]
    Flow,
    /// Write-after-read (anti dependence)
    #[serde(rename = "WAR", alias = "anti")]
    Anti,
    /// Write-after-write (output dependence)
    #[serde(rename = "WAW", alias = "output")]
    Output,
    /// Read-after-read (input dependence, not a true dependence)
    #[serde(rename = "RAR", alias = "input")]
    Input,
}

impl DependenceKind {
    /// Check if this is a "true" dependence that must be respected.
    pub fn is_true_dependence(&self) -> bool {
        !matches!(self, DependenceKind::Input)
    }

    /// Get short name for the dependence kind.
    pub fn short_name(&self) -> &'static str {
        match self {
            DependenceKind::Flow => "RAW",
            DependenceKind::Anti => "WAR",
            DependenceKind::Output => "WAW",
            DependenceKind::Input => "RAR",
        }
    }
}

/// Direction of a dependence in one loop coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// < (forward dependence, positive distance)
    Lt,
    /// = (same iteration, zero distance)
    Eq,
    /// > (backward dependence, negative distance)
    Gt,
    /// <= (forward or same)
    Le,
    /// >= (backward or same)
    Ge,
    /// * (unknown/any direction)
    Star,
}

impl Direction {
    /// Get the character representation.
    pub fn to_char(&self) -> char {
        match self {
            Direction::Lt => '<',
            Direction::Eq => '=',
            Direction::Gt => '>',
            Direction::Le => '≤',
            Direction::Ge => '≥',
            Direction::Star => '*',
        }
    }

    /// Combine two directions (union).
    pub fn union(&self, other: &Direction) -> Direction {
        if self == other {
            return *self;
        }
        match (self, other) {
            (Direction::Lt, Direction::Eq) | (Direction::Eq, Direction::Lt) => Direction::Le,
            (Direction::Gt, Direction::Eq) | (Direction::Eq, Direction::Gt) => Direction::Ge,
            (Direction::Le, Direction::Lt | Direction::Eq)
            | (Direction::Lt | Direction::Eq, Direction::Le) => Direction::Le,
            (Direction::Ge, Direction::Gt | Direction::Eq)
            | (Direction::Gt | Direction::Eq, Direction::Ge) => Direction::Ge,
            _ => Direction::Star,
        }
    }

    /// Compute direction from a distance value.
    pub fn from_distance(dist: i64) -> Direction {
        match dist.cmp(&0) {
            std::cmp::Ordering::Less => Direction::Gt,
            std::cmp::Ordering::Equal => Direction::Eq,
            std::cmp::Ordering::Greater => Direction::Lt,
        }
    }
}

/// Dependence between the instances of two statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependenceRelation {
    /// Kind of dependence
    pub kind: DependenceKind,
    /// Source statement name
    pub source: String,
    /// Target statement name
    pub target: String,
    /// Pairs (source iteration, target iteration)
    pub relation: PointRelation,
}

impl DependenceRelation {
    /// Create a dependence relation.
    pub fn new(
        kind: DependenceKind,
        source: impl Into<String>,
        target: impl Into<String>,
        relation: PointRelation,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            target: target.into(),
            relation,
        }
    }

    /// Direction vector over the loops common to both statements.
    ///
    /// Empty for an empty relation.
    pub fn direction(&self) -> Vec<Direction> {
        let common = self.relation.n_in().min(self.relation.n_out());
        let mut result: Vec<Direction> = Vec::new();
        for (src, tgt) in self.relation.iter() {
            let dirs = (0..common).map(|k| Direction::from_distance(tgt[k].saturating_sub(src[k])));
            if result.is_empty() {
                result = dirs.collect();
            } else {
                for (acc, d) in result.iter_mut().zip(dirs) {
                    *acc = acc.union(&d);
                }
            }
        }
        result
    }

    /// Constant distance vector, if every pair has the same one.
    pub fn distance(&self) -> Option<Vec<i64>> {
        let common = self.relation.n_in().min(self.relation.n_out());
        let mut iter = self.relation.iter()
            .map(|(src, tgt)| (0..common).map(|k| tgt[k].saturating_sub(src[k])).collect::<Vec<_>>());
        let first = iter.next()?;
        iter.all(|d| d == first).then_some(first)
    }

    /// Get a human-readable description.
    pub fn description(&self) -> String {
        let dir_str: String = self.direction().iter().map(|d| d.to_char()).collect();
        let mut desc = format!(
            "{} -> {} [{}] {} pairs dir=<{}>",
            self.source,
            self.target,
            self.kind.short_name(),
            self.relation.len(),
            dir_str
        );
        if let Some(dist) = self.distance() {
            let parts: Vec<String> = dist.iter().map(|d| d.to_string()).collect();
            desc.push_str(&format!(" dist=({})", parts.join(", ")));
        }
        desc
    }
}

/// Dependence information of a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependenceInfo {
    /// Whether the upstream analysis succeeded
    pub valid: bool,
    /// Individual dependences
    pub relations: Vec<DependenceRelation>,
}

impl DependenceInfo {
    /// Dependences from a successful analysis.
    pub fn new(relations: Vec<DependenceRelation>) -> Self {
        Self { valid: true, relations }
    }

    /// Marker for a failed or missing analysis.
    pub fn unavailable() -> Self {
        Self { valid: false, relations: Vec::new() }
    }

    /// Dependences that constrain execution order.
    pub fn true_dependences(&self) -> impl Iterator<Item = &DependenceRelation> + '_ {
        self.relations.iter().filter(|d| d.kind.is_true_dependence())
    }

    /// Validity relation in schedule space of `width` coordinates.
    ///
    /// Each true dependence is mapped through the schedules of its source
    /// and target statements. Returns `None` when the analysis is invalid.
    pub fn validity(&self, statements: &[ScopStmt], width: usize) -> Option<PointRelation> {
        if !self.valid {
            return None;
        }
        let find = |name: &str| statements.iter().find(|s| s.name == name);
        let mut result = PointRelation::empty(width, width);
        for dep in self.true_dependences() {
            let (Some(src), Some(tgt)) = (find(&dep.source), find(&dep.target)) else {
                warn!("dependence {} names an unknown statement", dep.description());
                continue;
            };
            let mapped = dep.relation.clone()
                .apply_domain(&src.schedule)
                .apply_range(&tgt.schedule);
            result = result.union(mapped);
        }
        Some(result)
    }

    /// Get summary statistics.
    pub fn summary(&self) -> DependenceSummary {
        let count = |kind: DependenceKind| self.relations.iter().filter(|d| d.kind == kind).count();
        DependenceSummary {
            valid: self.valid,
            num_dependences: self.relations.len(),
            num_flow: count(DependenceKind::Flow),
            num_anti: count(DependenceKind::Anti),
            num_output: count(DependenceKind::Output),
            num_input: count(DependenceKind::Input),
            num_pairs: self.true_dependences().map(|d| d.relation.len()).sum(),
        }
    }
}

impl fmt::Display for DependenceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            return writeln!(f, "dependences unavailable");
        }
        for dep in &self.relations {
            writeln!(f, "{}", dep.description())?;
        }
        Ok(())
    }
}

/// Summary of the dependences of a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependenceSummary {
    pub valid: bool,
    pub num_dependences: usize,
    pub num_flow: usize,
    pub num_anti: usize,
    pub num_output: usize,
    pub num_input: usize,
    /// Instance pairs over all true dependences
    pub num_pairs: usize,
}

impl fmt::Display for DependenceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dependence Summary:")?;
        if !self.valid {
            return writeln!(f, "  unavailable");
        }
        writeln!(f, "  Total dependences: {}", self.num_dependences)?;
        writeln!(f, "    Flow (RAW): {}", self.num_flow)?;
        writeln!(f, "    Anti (WAR): {}", self.num_anti)?;
        writeln!(f, "    Output (WAW): {}", self.num_output)?;
        writeln!(f, "    Input (RAR): {}", self.num_input)?;
        writeln!(f, "  Constraining pairs: {}", self.num_pairs)?;
        Ok(())
    }
}
