//! Polyhedral data structures and operations.
//!
//! This module provides the relation algebra the transformer is built on:
//! - Affine expressions and constraint systems with an integer scanner
//! - Symbolic sets and relations parsed from text
//! - Finite point sets and relations for bound parameter values
//! - The per-invocation parameter context

pub mod space;
pub mod expr;
pub mod constraint;
pub mod context;
pub mod set;
pub mod map;
pub mod points;
pub mod relation;

pub use space::{Space, SpaceKind};
pub use expr::AffineExpr;
pub use constraint::{Constraint, ConstraintKind, ConstraintSystem};
pub use context::Context;
pub use set::IntegerSet;
pub use map::AffineRelation;
pub use points::PointSet;
pub use relation::{Collision, PointRelation};
