//! The shared, mutable state every matching and listing pass runs against
//!
//! [`World`] bundles the external collaborators: the online character
//! registry, the group store and the chat channel service. It is always
//! accessed under a single lock (see [`crate::session::LfgService`]), so a
//! scan never observes a half-applied mutation from another scan.

pub mod channel;
pub mod registry;

pub use channel::{ChannelService, InMemoryChannelService};
pub use registry::{InMemoryPlayerRegistry, PlayerRegistry};

use crate::group::{Group, GroupStore, InMemoryGroupStore};
use crate::types::{Character, CharacterId};

/// Collaborators consulted and mutated by the matchmaker
pub struct World {
    pub players: Box<dyn PlayerRegistry>,
    pub groups: Box<dyn GroupStore>,
    pub channels: Box<dyn ChannelService>,
}

impl World {
    pub fn new(
        players: Box<dyn PlayerRegistry>,
        groups: Box<dyn GroupStore>,
        channels: Box<dyn ChannelService>,
    ) -> Self {
        Self {
            players,
            groups,
            channels,
        }
    }

    /// World backed entirely by in-memory collaborators
    pub fn in_memory(group_capacity: usize, channels: InMemoryChannelService) -> Self {
        Self::new(
            Box::new(InMemoryPlayerRegistry::new()),
            Box::new(InMemoryGroupStore::with_capacity(group_capacity)),
            Box::new(channels),
        )
    }

    /// The group a character currently belongs to
    pub fn group_of(&self, character: CharacterId) -> Option<&Group> {
        let group = self.players.get(character)?.group?;
        self.groups.get(group)
    }

    /// Online members of a group; members not in the registry are skipped
    pub fn online_members<'a>(&'a self, group: &'a Group) -> impl Iterator<Item = &'a Character> + 'a {
        group
            .members()
            .iter()
            .filter_map(move |member| self.players.get(member.id))
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("online", &self.players.len())
            .field("groups", &self.groups.count())
            .finish()
    }
}
