//! Per-label domain and depth bookkeeping.
//!
//! Directives name loops by label. Each label carries its iteration domain,
//! kept in the numbering of the *original* schedule space (before any
//! directive of the current script), and its loop-nest depth. A table is
//! created per pass invocation and threaded through the pipeline.

use crate::polyhedral::PointSet;
use std::collections::BTreeMap;
use std::fmt;

/// Metadata of one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelInfo {
    /// Instances named by the label, in original schedule coordinates
    pub domain: PointSet,
    /// Number of loops enclosing (and including) the labeled loop
    pub depth: usize,
}

impl LabelInfo {
    /// Create label metadata.
    pub fn new(domain: PointSet, depth: usize) -> Self {
        Self { domain, depth }
    }
}

/// Label name to metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    entries: BTreeMap<String, LabelInfo>,
}

impl LabelTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or redefine a label, returning its previous metadata.
    pub fn insert(&mut self, name: impl Into<String>, info: LabelInfo) -> Option<LabelInfo> {
        self.entries.insert(name.into(), info)
    }

    /// Metadata of a label.
    pub fn get(&self, name: &str) -> Option<&LabelInfo> {
        self.entries.get(name)
    }

    /// Update the depth of an existing label.
    pub fn set_depth(&mut self, name: &str, depth: usize) -> bool {
        match self.entries.get_mut(name) {
            Some(info) => {
                info.depth = depth;
                true
            }
            None => false,
        }
    }

    /// Check if a label is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// First label of `names` without metadata.
    pub fn first_missing<'a>(&self, names: &[&'a str]) -> Option<&'a str> {
        names.iter().copied().find(|n| !self.contains(n))
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate labels in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &LabelInfo)> + '_ {
        self.entries.iter()
    }
}

impl fmt::Display for LabelTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, info) in &self.entries {
            writeln!(f, "{} (depth {}): {} instances", name, info.depth, info.domain.len())?;
        }
        Ok(())
    }
}
