//! Group storage
//!
//! Groups are owned here and referenced by id from characters. The matchmaker
//! only ever creates groups and adds members; disbanding empty groups is the
//! store's own business.

use crate::group::instance::Group;
use crate::types::{CharacterId, GroupId, MAX_GROUP_SIZE};
use std::collections::HashMap;
use tracing::{debug, info};

/// Persistent group store used by the matchmaker
pub trait GroupStore: Send {
    /// Create a new group led by `leader`; `None` when creation is refused
    fn create(&mut self, leader: CharacterId, leader_name: &str) -> Option<GroupId>;

    /// Add a member; false when the group is missing or full
    fn add_member(&mut self, group: GroupId, id: CharacterId, name: &str) -> bool;

    /// Look up a group
    fn get(&self, group: GroupId) -> Option<&Group>;

    /// Number of live groups
    fn count(&self) -> usize;
}

/// Statistics about group store operations
#[derive(Debug, Clone, Default)]
pub struct GroupStoreStats {
    pub groups_created: u64,
    pub members_added: u64,
}

/// HashMap-backed group store
#[derive(Debug)]
pub struct InMemoryGroupStore {
    groups: HashMap<GroupId, Group>,
    capacity: usize,
    stats: GroupStoreStats,
}

impl InMemoryGroupStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_GROUP_SIZE)
    }

    /// Store whose new groups hold `capacity` members
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            groups: HashMap::new(),
            capacity,
            stats: GroupStoreStats::default(),
        }
    }

    /// Register an already built group (battlegrounds, restored groups)
    pub fn insert(&mut self, group: Group) -> GroupId {
        let id = group.id();
        self.groups.insert(id, group);
        id
    }

    pub fn stats(&self) -> &GroupStoreStats {
        &self.stats
    }
}

impl Default for InMemoryGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupStore for InMemoryGroupStore {
    fn create(&mut self, leader: CharacterId, leader_name: &str) -> Option<GroupId> {
        if self.groups.values().any(|g| g.contains(leader)) {
            debug!("Refusing to create group: character {} already grouped", leader);
            return None;
        }

        let group = Group::new(leader, leader_name, self.capacity);
        let id = group.id();
        self.groups.insert(id, group);
        self.stats.groups_created += 1;

        info!("Created group {} led by '{}' ({})", id, leader_name, leader);
        Some(id)
    }

    fn add_member(&mut self, group: GroupId, id: CharacterId, name: &str) -> bool {
        let Some(target) = self.groups.get_mut(&group) else {
            return false;
        };

        if !target.add_member(id, name) {
            return false;
        }

        self.stats.members_added += 1;
        debug!(
            "Added '{}' ({}) to group {} - size: {}/{}",
            name,
            id,
            group,
            target.len(),
            target.capacity()
        );
        true
    }

    fn get(&self, group: GroupId) -> Option<&Group> {
        self.groups.get(&group)
    }

    fn count(&self) -> usize {
        self.groups.len()
    }
}
