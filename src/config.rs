//! Pass configuration.

use crate::polyhedral::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// What to do with a directive that names an undefined label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownLabelPolicy {
    /// Leave the transform unchanged and continue with the next line
    #[default]
    Skip,
    /// Abort the pass with an error
    Error,
}

/// Configuration of one pass invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Directive script; no script means the identity transform
    pub script: Option<PathBuf>,
    pub unknown_labels: UnknownLabelPolicy,
    /// Bound on enumerated points per set or relation
    pub max_points: usize,
    /// Parameter values overriding the region's own, applied when the
    /// region is loaded; the pass refuses a region bound differently
    pub params: BTreeMap<String, i64>,
    /// Check dependence preservation when dependences are available
    pub check_dependences: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            script: None,
            unknown_labels: UnknownLabelPolicy::Skip,
            max_points: Context::DEFAULT_MAX_POINTS,
            params: BTreeMap::new(),
            check_dependences: true,
        }
    }
}

impl TransformConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.script = Some(path.into());
        self
    }

    pub fn with_unknown_labels(mut self, policy: UnknownLabelPolicy) -> Self {
        self.unknown_labels = policy;
        self
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: i64) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_dependence_check(mut self, enabled: bool) -> Self {
        self.check_dependences = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TransformConfig::default();
        assert!(config.script.is_none());
        assert_eq!(config.unknown_labels, UnknownLabelPolicy::Skip);
        assert!(config.check_dependences);
    }

    #[test]
    fn test_builder() {
        let config = TransformConfig::new()
            .with_script("fuse.txt")
            .with_unknown_labels(UnknownLabelPolicy::Error)
            .with_param("N", 16)
            .with_max_points(10);
        assert_eq!(config.script, Some(PathBuf::from("fuse.txt")));
        assert_eq!(config.params.get("N"), Some(&16));
        assert_eq!(config.max_points, 10);
    }
}
