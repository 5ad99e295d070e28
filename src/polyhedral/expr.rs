//! Affine expressions over coordinates and parameters.
//!
//! An affine expression is a linear combination of variables plus a constant:
//! `aff(x) = c0 + c1*x1 + ... + cn*xn + p1*P1 + ... + pm*Pm`

use serde::{Serialize, Deserialize};
use std::fmt;
use std::ops::{Add, Sub, Neg};

/// Clamp to the symmetric `i64` range so every value can be negated.
fn narrow(value: i128) -> i64 {
    value.clamp(-i128::from(i64::MAX), i128::from(i64::MAX)) as i64
}

/// An affine expression: constant + sum(coeff[i] * var[i]) + sum(param_coeff[j] * param[j])
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AffineExpr {
    /// Constant term
    pub constant: i64,
    /// Coefficients for each column (index = column index)
    pub coeffs: Vec<i64>,
    /// Coefficients for parameters (index = parameter index)
    pub param_coeffs: Vec<i64>,
}

impl AffineExpr {
    /// Create a zero expression.
    pub fn zero(n_dim: usize, n_param: usize) -> Self {
        Self {
            constant: 0,
            coeffs: vec![0; n_dim],
            param_coeffs: vec![0; n_param],
        }
    }

    /// Create a constant expression.
    pub fn constant(value: i64, n_dim: usize, n_param: usize) -> Self {
        Self {
            constant: value,
            ..Self::zero(n_dim, n_param)
        }
    }

    /// Create an expression for a single column.
    pub fn var(dim: usize, n_dim: usize, n_param: usize) -> Self {
        let mut expr = Self::zero(n_dim, n_param);
        if dim < n_dim {
            expr.coeffs[dim] = 1;
        }
        expr
    }

    /// Create an expression for a parameter.
    pub fn param(idx: usize, n_dim: usize, n_param: usize) -> Self {
        let mut expr = Self::zero(n_dim, n_param);
        if idx < n_param {
            expr.param_coeffs[idx] = 1;
        }
        expr
    }

    /// Check if this is a constant expression.
    pub fn is_constant(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0) &&
        self.param_coeffs.iter().all(|&c| c == 0)
    }

    /// Get the number of columns.
    pub fn n_dim(&self) -> usize {
        self.coeffs.len()
    }

    /// Get the number of parameters.
    pub fn n_param(&self) -> usize {
        self.param_coeffs.len()
    }

    /// Get coefficient for a column.
    pub fn coeff(&self, dim: usize) -> i64 {
        self.coeffs.get(dim).copied().unwrap_or(0)
    }

    /// Columns with a non-zero coefficient.
    pub fn support(&self) -> impl Iterator<Item = usize> + '_ {
        self.coeffs.iter()
            .enumerate()
            .filter(|(_, &c)| c != 0)
            .map(|(i, _)| i)
    }

    /// Evaluate the expression given concrete values.
    ///
    /// Sums are taken in `i128` and saturate at `±i64::MAX`, so the sign of
    /// the result is exact.
    pub fn evaluate(&self, dim_values: &[i64], param_values: &[i64]) -> i64 {
        let mut result = i128::from(self.constant);
        for (i, &c) in self.coeffs.iter().enumerate() {
            if let Some(&v) = dim_values.get(i) {
                result = result.saturating_add(i128::from(c) * i128::from(v));
            }
        }
        for (i, &c) in self.param_coeffs.iter().enumerate() {
            if let Some(&v) = param_values.get(i) {
                result = result.saturating_add(i128::from(c) * i128::from(v));
            }
        }
        narrow(result)
    }

    /// Evaluate every term except column `skip`, treating unknown columns as absent.
    ///
    /// Returns `None` if a column other than `skip` with a non-zero
    /// coefficient has no value yet.
    pub fn evaluate_partial(
        &self,
        values: &[Option<i64>],
        param_values: &[i64],
        skip: usize,
    ) -> Option<i64> {
        let mut result = i128::from(self.constant);
        for (i, &c) in self.coeffs.iter().enumerate() {
            if c == 0 || i == skip {
                continue;
            }
            let v = values.get(i).copied().flatten()?;
            result = result.saturating_add(i128::from(c) * i128::from(v));
        }
        for (i, &c) in self.param_coeffs.iter().enumerate() {
            let v = param_values.get(i).copied().unwrap_or(0);
            result = result.saturating_add(i128::from(c) * i128::from(v));
        }
        Some(narrow(result))
    }

    /// Scale the expression by a constant, saturating at `±i64::MAX`.
    pub fn scale(&self, factor: i64) -> Self {
        let mul = |c: i64| narrow(i128::from(c) * i128::from(factor));
        Self {
            constant: mul(self.constant),
            coeffs: self.coeffs.iter().map(|&c| mul(c)).collect(),
            param_coeffs: self.param_coeffs.iter().map(|&c| mul(c)).collect(),
        }
    }

    /// Move every column `i` to column `positions[i]` of a wider expression.
    pub fn reindex(&self, positions: &[usize], n_dim: usize) -> Self {
        let mut coeffs = vec![0; n_dim];
        for (i, &c) in self.coeffs.iter().enumerate() {
            if c != 0 {
                coeffs[positions[i]] += c;
            }
        }
        Self {
            constant: self.constant,
            coeffs,
            param_coeffs: self.param_coeffs.clone(),
        }
    }

    /// Widen the expression with `extra` trailing zero columns.
    pub fn extend(&self, extra: usize) -> Self {
        let mut coeffs = self.coeffs.clone();
        coeffs.extend(std::iter::repeat(0).take(extra));
        Self {
            constant: self.constant,
            coeffs,
            param_coeffs: self.param_coeffs.clone(),
        }
    }

    /// Convert to string with given column and parameter names.
    pub fn to_string_with_names(&self, dim_names: &[String], param_names: &[String]) -> String {
        let mut parts = Vec::new();

        let mut push_term = |c: i64, name: &str| {
            match c {
                0 => {}
                1 => parts.push(name.to_string()),
                -1 => parts.push(format!("-{}", name)),
                _ => parts.push(format!("{}{}", c, name)),
            }
        };

        for (i, &c) in self.coeffs.iter().enumerate() {
            let default_name = format!("d{}", i);
            let name = dim_names.get(i).map(|s| s.as_str()).unwrap_or(&default_name);
            push_term(c, name);
        }
        for (i, &c) in self.param_coeffs.iter().enumerate() {
            let default_name = format!("p{}", i);
            let name = param_names.get(i).map(|s| s.as_str()).unwrap_or(&default_name);
            push_term(c, name);
        }
        if self.constant != 0 || parts.is_empty() {
            parts.push(self.constant.to_string());
        }

        parts.join(" + ").replace("+ -", "- ")
    }
}

impl Add for AffineExpr {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        assert_eq!(self.coeffs.len(), other.coeffs.len());
        assert_eq!(self.param_coeffs.len(), other.param_coeffs.len());
        let plus = |a: i64, b: i64| narrow(i128::from(a) + i128::from(b));
        Self {
            constant: plus(self.constant, other.constant),
            coeffs: self.coeffs.iter().zip(&other.coeffs)
                .map(|(&a, &b)| plus(a, b)).collect(),
            param_coeffs: self.param_coeffs.iter().zip(&other.param_coeffs)
                .map(|(&a, &b)| plus(a, b)).collect(),
        }
    }
}

impl Sub for AffineExpr {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self + (-other)
    }
}

impl Neg for AffineExpr {
    type Output = Self;

    fn neg(self) -> Self {
        self.scale(-1)
    }
}

impl fmt::Display for AffineExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with_names(&[], &[]))
    }
}
