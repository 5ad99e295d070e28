//! Region model and dependence information consumed by the pass.

pub mod scop;
pub mod dependence;

pub use scop::{Scop, ScopDescription, ScopStmt};
pub use dependence::{DependenceInfo, DependenceKind, DependenceRelation, Direction};
