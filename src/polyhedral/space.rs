//! Coordinate spaces for iteration domains and schedules.
//!
//! A space describes the structure of a set or relation:
//! - Input dimensions (for relations)
//! - Output / set dimensions
//! - Parameter dimensions (symbolic constants)
//!
//! Schedule spaces interleave band markers and loop coordinates:
//! `[b0, l0, b1, l1, ..., bn]`. Band marker `k` lives at index `2k`,
//! loop coordinate `k` at index `2k + 1`.

use serde::{Serialize, Deserialize};
use std::fmt;

/// Which flavor of coordinates a space carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpaceKind {
    /// One dimension per loop index of a statement or label.
    Iteration,
    /// Interleaved band markers and loop coordinates.
    Schedule,
}

/// A coordinate space describes the dimensionality and structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    /// Number of set/output dimensions
    pub n_dim: usize,
    /// Number of input dimensions (for relations only)
    pub n_in: usize,
    /// Parameter names, in context order
    pub param_names: Vec<String>,
    /// Names of the set/output dimensions (optional, for printing)
    pub dim_names: Vec<String>,
    /// Coordinate flavor of the set/output tuple
    pub kind: SpaceKind,
}

impl Space {
    /// Create an iteration set space.
    pub fn set(n_dim: usize) -> Self {
        Self {
            n_dim,
            n_in: 0,
            param_names: Vec::new(),
            dim_names: Vec::new(),
            kind: SpaceKind::Iteration,
        }
    }

    /// Create a schedule set space of the given width.
    pub fn schedule(width: usize) -> Self {
        Self {
            kind: SpaceKind::Schedule,
            ..Self::set(width)
        }
    }

    /// Create a relation space.
    pub fn map(n_in: usize, n_out: usize) -> Self {
        Self {
            n_in,
            ..Self::set(n_out)
        }
    }

    /// Attach parameter names.
    pub fn with_params(mut self, names: Vec<String>) -> Self {
        self.param_names = names;
        self
    }

    /// Attach dimension names.
    pub fn with_dim_names(mut self, names: Vec<String>) -> Self {
        self.dim_names = names;
        self
    }

    /// Check if this is a set space (no input dimensions).
    pub fn is_set(&self) -> bool {
        self.n_in == 0
    }

    /// Number of output/set dimensions.
    pub fn dim(&self) -> usize {
        self.n_dim
    }

    /// Number of parameters.
    pub fn n_param(&self) -> usize {
        self.param_names.len()
    }

    /// Number of columns a constraint over this space carries
    /// (inputs followed by outputs; parameters are kept separately).
    pub fn n_columns(&self) -> usize {
        self.n_in + self.n_dim
    }

    /// Number of loop coordinates a schedule of this width can hold.
    pub fn n_loops(&self) -> usize {
        self.n_dim / 2
    }

    /// Number of band markers a schedule of this width holds.
    pub fn n_bands(&self) -> usize {
        (self.n_dim + 1) / 2
    }

    /// Index of band marker `k` in schedule coordinates.
    ///
    /// The layout helpers saturate: an out-of-range `k` gives an index past
    /// every schedule width.
    pub fn band_marker(k: usize) -> usize {
        k.saturating_mul(2)
    }

    /// Index of loop coordinate `k` in schedule coordinates.
    pub fn loop_coord(k: usize) -> usize {
        k.saturating_mul(2).saturating_add(1)
    }

    /// Minimum schedule width able to embed `n_loops` loop coordinates.
    pub fn schedule_width_for(n_loops: usize) -> usize {
        n_loops.saturating_mul(2).saturating_add(1)
    }

    /// Get all dimension names with defaults.
    pub fn all_dim_names(&self) -> Vec<String> {
        let prefix = match self.kind {
            SpaceKind::Iteration => "i",
            SpaceKind::Schedule => "c",
        };
        (0..self.n_dim)
            .map(|i| {
                self.dim_names.get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("{}{}", prefix, i))
            })
            .collect()
    }

    /// Domain space of a relation space.
    pub fn domain(&self) -> Space {
        Space::set(self.n_in).with_params(self.param_names.clone())
    }

    /// Range space of a relation space.
    pub fn range(&self) -> Space {
        Space {
            n_in: 0,
            dim_names: self.dim_names.clone(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.param_names.is_empty() {
            write!(f, "[{}] -> ", self.param_names.join(", "))?;
        }
        if self.is_set() {
            write!(f, "[{}]", self.n_dim)
        } else {
            write!(f, "[{}] -> [{}]", self.n_in, self.n_dim)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_layout() {
        let space = Space::schedule(7);
        assert_eq!(space.n_loops(), 3);
        assert_eq!(space.n_bands(), 4);
        assert_eq!(Space::band_marker(2), 4);
        assert_eq!(Space::loop_coord(2), 5);
        assert_eq!(Space::schedule_width_for(3), 7);
        assert_eq!(Space::band_marker(usize::MAX), usize::MAX);
    }

    #[test]
    fn test_map_space() {
        let space = Space::map(2, 5);
        assert!(!space.is_set());
        assert_eq!(space.n_columns(), 7);
        assert_eq!(space.domain().dim(), 2);
        assert_eq!(space.range().dim(), 5);
    }

    #[test]
    fn test_default_names() {
        assert_eq!(Space::schedule(2).all_dim_names(), vec!["c0", "c1"]);
        let named = Space::set(2).with_dim_names(vec!["i".into(), "j".into()]);
        assert_eq!(named.all_dim_names(), vec!["i", "j"]);
    }
}
