//! Automatic group formation
//!
//! [`CompatibilityEvaluator`] decides whether a character fits next to a
//! player or into a party; [`MatchEngine`] runs the scans that act on it.

pub mod compatibility;
pub mod engine;

pub use compatibility::{CompatibilityEvaluator, GroupComposition, DPS_QUOTA};
pub use engine::{MatchEngine, MatchOutcome};
