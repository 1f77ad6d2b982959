//! LFG Matchmaker - looking-for-group matching for an online game server
//!
//! Characters advertise the dungeons they want to run ("looking for group")
//! or the members their party still needs ("looking for more"). This crate
//! infers each character's party role from its talents, decides whether two
//! characters or a character and a party fit together, forms groups
//! automatically and builds the listing clients browse.

pub mod config;
pub mod error;
pub mod group;
pub mod matching;
pub mod metrics;
pub mod protocol;
pub mod service;
pub mod session;
pub mod talent;
pub mod types;
pub mod utils;
pub mod world;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use group::GroupStore;
pub use matching::{CompatibilityEvaluator, MatchEngine, MatchOutcome};
pub use protocol::{ClientRequest, ListingProtocol, ServerMessage};
pub use session::LfgService;
pub use talent::{TalentRoleClassifier, TalentStore};
pub use world::{ChannelService, PlayerRegistry, World};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
