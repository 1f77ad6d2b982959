//! Group instance implementation
//!
//! A group is an ordered member list with a leader that is always a member.

use crate::types::{CharacterId, GroupId};
use crate::utils::{current_timestamp, generate_group_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Member slot inside a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: CharacterId,
    pub name: String,
}

/// A party of characters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    id: GroupId,
    leader: CharacterId,
    members: Vec<GroupMember>,
    capacity: usize,
    battleground: bool,
    created_at: DateTime<Utc>,
}

impl Group {
    /// Create a group whose only member is its leader
    pub fn new(leader: CharacterId, leader_name: impl Into<String>, capacity: usize) -> Self {
        Self {
            id: generate_group_id(),
            leader,
            members: vec![GroupMember {
                id: leader,
                name: leader_name.into(),
            }],
            capacity,
            battleground: false,
            created_at: current_timestamp(),
        }
    }

    /// Create a battleground raid; those are never matched into
    pub fn battleground(leader: CharacterId, leader_name: impl Into<String>, capacity: usize) -> Self {
        let mut group = Self::new(leader, leader_name, capacity);
        group.battleground = true;
        group
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn leader(&self) -> CharacterId {
        self.leader
    }

    pub fn is_leader(&self, character: CharacterId) -> bool {
        self.leader == character
    }

    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    pub fn is_battleground(&self) -> bool {
        self.battleground
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn contains(&self, character: CharacterId) -> bool {
        self.members.iter().any(|m| m.id == character)
    }

    /// Append a member; false when the group is full or already has them
    pub fn add_member(&mut self, id: CharacterId, name: impl Into<String>) -> bool {
        if self.is_full() || self.contains(id) {
            return false;
        }
        self.members.push(GroupMember {
            id,
            name: name.into(),
        });
        true
    }
}
