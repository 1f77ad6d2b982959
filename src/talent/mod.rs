//! Talent data access and role inference
//!
//! This module reads the static talent tables and derives which party roles a
//! character can fill from the way its talent points are distributed.

pub mod classifier;
pub mod store;

// Re-export commonly used types
pub use classifier::TalentRoleClassifier;
pub use store::{StaticTalentStore, TalentEntry, TalentStore, TalentTab, MAX_TALENT_RANK, TALENT_TREES};
