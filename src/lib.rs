//! # pwaff - Legality-checked schedule transformation
//!
//! Applies a script of loop-restructuring directives to the schedule of a
//! static control part (SCoP) and installs the result only if it is legal:
//! - Realign: fuse the loops following one label into another at a band
//! - Index split: split a loop's instances by a predicate
//! - Affine remap: apply an affine relation to a label's leading loops
//! - Lift: name the instances sharing a label's outer bands
//!
//! ## Architecture
//!
//! ```text
//! SCoP (JSON) → Scop → Pipeline (script → T) → Legality → Commit
//! ```
//!
//! Schedules live in an interleaved space where even coordinates are band
//! markers and odd coordinates are loop values. Parameters are bound up
//! front, so every relation the pass handles is finite.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pwaff::prelude::*;
//!
//! let mut scop = Scop::from_json(&text, &TransformConfig::default())?;
//! let report = run_on_scop_with_script(&mut scop, &TransformConfig::default(), "realign(S0, S1, 1)")?;
//! assert!(report.committed());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod frontend;
pub mod polyhedral;
pub mod transform;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::analysis::{
        DependenceInfo, DependenceKind, DependenceRelation, Scop, ScopDescription, ScopStmt,
    };
    pub use crate::config::{TransformConfig, UnknownLabelPolicy};
    pub use crate::frontend::{parse_line, parse_relation, parse_set, Directive, ParseError};
    pub use crate::polyhedral::{
        AffineRelation, Context, IntegerSet, PointRelation, PointSet, Space,
    };
    pub use crate::transform::{
        run_on_scop, run_on_scop_with_script, DependenceVerdict, LegalityReport, PassReport,
        PassStatus, PipelineOutcome, SkipReason, StepStatus,
    };
    pub use crate::utils::errors::*;
}

pub use transform::{run_on_scop, run_on_scop_with_script};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
