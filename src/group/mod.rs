//! Group management for the matchmaking service
//!
//! Groups are created by the match engine on demand and owned by a
//! [`GroupStore`]; characters only hold a group id.

pub mod instance;
pub mod store;

// Re-export commonly used types
pub use instance::{Group, GroupMember};
pub use store::{GroupStore, GroupStoreStats, InMemoryGroupStore};
