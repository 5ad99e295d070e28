//! Parameter binding and enumeration limits for one pass invocation.
//!
//! Every set and relation is parsed against a `Context`, which fixes the
//! order of the symbolic parameters and their concrete values. Objects built
//! against different contexts must not be mixed.

use crate::utils::errors::PolyError;
use std::collections::BTreeMap;

/// Ordered parameter names, their values and the enumeration limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    names: Vec<String>,
    values: Vec<i64>,
    max_points: usize,
}

impl Context {
    /// Default upper bound on the number of points a single enumeration may yield.
    pub const DEFAULT_MAX_POINTS: usize = 1_000_000;

    /// Create a context without parameters.
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            values: Vec::new(),
            max_points: Self::DEFAULT_MAX_POINTS,
        }
    }

    /// Create a context from `(name, value)` pairs, keeping their order.
    pub fn with_params<S: Into<String>>(params: impl IntoIterator<Item = (S, i64)>) -> Self {
        let mut ctx = Self::new();
        for (name, value) in params {
            ctx.set_param(name, value);
        }
        ctx
    }

    /// Create a context from a name-sorted parameter map.
    pub fn from_map(params: &BTreeMap<String, i64>) -> Self {
        Self::with_params(params.iter().map(|(k, &v)| (k.clone(), v)))
    }

    /// Set the enumeration limit.
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    /// Bind `name` to `value`, appending it if it is new.
    pub fn set_param(&mut self, name: impl Into<String>, value: i64) {
        let name = name.into();
        match self.param_index(&name) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.names.push(name);
                self.values.push(value);
            }
        }
    }

    /// Rebind an existing parameter.
    pub fn override_param(&mut self, name: &str, value: i64) -> Result<(), PolyError> {
        let idx = self.param_index(name)
            .ok_or_else(|| PolyError::UnknownParameter(name.to_string()))?;
        self.values[idx] = value;
        Ok(())
    }

    /// Parameter names in context order.
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    /// Parameter values in context order.
    pub fn param_values(&self) -> &[i64] {
        &self.values
    }

    /// Number of parameters.
    pub fn n_param(&self) -> usize {
        self.names.len()
    }

    /// Position of a parameter.
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Value bound to a parameter.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.param_index(name).map(|idx| self.values[idx])
    }

    /// Enumeration limit.
    pub fn max_points(&self) -> usize {
        self.max_points
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
