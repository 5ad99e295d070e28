//! Utility modules for the schedule transformer.
//!
//! - Error types and diagnostics
//! - Source location tracking
//! - Printing of regions and relations

pub mod errors;
pub mod location;
pub mod poly_print;

// Re-exports
pub use errors::*;
pub use location::{SourceLocation, Span};
pub use poly_print::{print_schedules, print_scop, print_transform, PolyPrinter};
