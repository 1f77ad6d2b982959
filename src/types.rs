//! Common types used throughout the matchmaking service

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Unique identifier (object guid) of an online character
pub type CharacterId = u64;

/// Unique identifier for groups
pub type GroupId = Uuid;

/// Number of simultaneous "looking for group" slots per character
pub const MAX_LFG_SLOTS: usize = 3;

/// Default party capacity
pub const MAX_GROUP_SIZE: usize = 5;

/// Character classes, numbered as the client numbers them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Class {
    Warrior,
    Paladin,
    Hunter,
    Rogue,
    Priest,
    Shaman,
    Mage,
    Warlock,
    Druid,
}

impl Class {
    pub const ALL: [Class; 9] = [
        Class::Warrior,
        Class::Paladin,
        Class::Hunter,
        Class::Rogue,
        Class::Priest,
        Class::Shaman,
        Class::Mage,
        Class::Warlock,
        Class::Druid,
    ];

    /// Client class id
    pub fn id(self) -> u8 {
        match self {
            Class::Warrior => 1,
            Class::Paladin => 2,
            Class::Hunter => 3,
            Class::Rogue => 4,
            Class::Priest => 5,
            Class::Shaman => 7,
            Class::Mage => 8,
            Class::Warlock => 9,
            Class::Druid => 11,
        }
    }

    /// Bit used by talent tabs to declare which classes they belong to
    pub fn mask(self) -> u32 {
        1 << (self.id() - 1)
    }

    /// Talent tree used when the character has not specialised yet
    pub fn default_tree(self) -> usize {
        match self {
            Class::Mage | Class::Priest => 1,
            Class::Paladin => 2,
            _ => 0,
        }
    }
}

impl std::fmt::Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Class::Warrior => "Warrior",
            Class::Paladin => "Paladin",
            Class::Hunter => "Hunter",
            Class::Rogue => "Rogue",
            Class::Priest => "Priest",
            Class::Shaman => "Shaman",
            Class::Mage => "Mage",
            Class::Warlock => "Warlock",
            Class::Druid => "Druid",
        };
        write!(f, "{}", name)
    }
}

/// Faction a character belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Alliance,
    Horde,
}

/// Account privilege level; only plain players are subject to LFG channel restriction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    #[default]
    Player,
    Moderator,
    GameMaster,
    Administrator,
}

/// Kind of activity advertised in a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LfgType {
    None = 0,
    Dungeon = 1,
    Raid = 2,
    Quest = 3,
    Zone = 4,
    HeroicDungeon = 5,
}

impl LfgType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(LfgType::None),
            1 => Some(LfgType::Dungeon),
            2 => Some(LfgType::Raid),
            3 => Some(LfgType::Quest),
            4 => Some(LfgType::Zone),
            5 => Some(LfgType::HeroicDungeon),
            _ => None,
        }
    }
}

/// One advertised (entry, type) pair
///
/// The type is kept raw because clients may send values outside [`LfgType`];
/// such slots are still listed but never auto-join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LfgSlot {
    pub entry: u32,
    pub lfg_type: u32,
}

impl LfgSlot {
    pub fn new(entry: u32, lfg_type: u32) -> Self {
        Self { entry, lfg_type }
    }

    /// Decode the client's packed slot word (entry in the low 16 bits, type from bit 24)
    pub fn from_word(word: u32) -> Self {
        Self {
            entry: word & 0xFFFF,
            lfg_type: (word >> 24) & 0xFFFF,
        }
    }

    /// Pack the slot the way the client expects it in server messages
    pub fn to_word(self) -> u32 {
        self.entry | (self.lfg_type << 24)
    }

    pub fn is_empty(&self) -> bool {
        self.entry == 0 && self.lfg_type == 0
    }

    pub fn is(&self, entry: u32, lfg_type: u32) -> bool {
        self.entry == entry && self.lfg_type == lfg_type
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Only dungeon slots take part in automatic matching
    pub fn can_auto_join(&self) -> bool {
        !self.is_empty()
            && matches!(
                LfgType::from_raw(self.lfg_type),
                Some(LfgType::Dungeon | LfgType::HeroicDungeon)
            )
    }
}

/// Everything a character currently advertises
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookingForGroup {
    pub slots: [LfgSlot; MAX_LFG_SLOTS],
    pub more: LfgSlot,
    pub comment: String,
}

impl LookingForGroup {
    pub fn have_in_slot(&self, entry: u32, lfg_type: u32) -> bool {
        self.slots.iter().any(|slot| slot.is(entry, lfg_type))
    }

    pub fn have_slot(&self, slot: &LfgSlot) -> bool {
        self.have_in_slot(slot.entry, slot.lfg_type)
    }

    /// True when any of the LFG slots is eligible for automatic joining
    pub fn can_auto_join(&self) -> bool {
        self.slots.iter().any(LfgSlot::can_auto_join)
    }

    pub fn clear_slots(&mut self) {
        self.slots.iter_mut().for_each(LfgSlot::clear);
    }
}

/// Per-character automatic matching switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoFlags {
    /// Seeker: wants to be absorbed into a matching group
    pub auto_join: bool,
    /// Advertiser: wants matching seekers pulled into its group
    pub auto_add: bool,
}

bitflags! {
    /// Party roles a character can cover, inferred from talents
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RoleCapability: u8 {
        const TANK = 0x01;
        const HEALER = 0x02;
        const DPS = 0x04;
    }
}

/// An online character as seen by the matchmaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub class: Class,
    pub level: u32,
    pub team: Team,
    pub zone: u32,
    pub free_talent_points: u32,
    /// Spells the character has learned, talent ranks included
    pub spells: HashSet<u32>,
    pub group: Option<GroupId>,
    pub security: SecurityLevel,
    pub in_world: bool,
    /// Session is reconnecting / logged out but still referenced
    pub session_offline: bool,
    pub lfg: LookingForGroup,
    pub auto: AutoFlags,
}

impl Character {
    /// Fresh in-world character with empty LFG state
    pub fn new(id: CharacterId, name: impl Into<String>, class: Class, level: u32, team: Team) -> Self {
        Self {
            id,
            name: name.into(),
            class,
            level,
            team,
            zone: 0,
            free_talent_points: 0,
            spells: HashSet::new(),
            group: None,
            security: SecurityLevel::Player,
            in_world: true,
            session_offline: false,
            lfg: LookingForGroup::default(),
            auto: AutoFlags::default(),
        }
    }

    pub fn has_spell(&self, spell_id: u32) -> bool {
        self.spells.contains(&spell_id)
    }

    /// In world and not in the middle of a reconnect
    pub fn is_available(&self) -> bool {
        self.in_world && !self.session_offline
    }

    /// Whether matching side effects may pull this character out of the LFG channel
    pub fn is_unprivileged(&self) -> bool {
        self.security == SecurityLevel::Player
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_word_packing() {
        let slot = LfgSlot::from_word(0x0100_0021);
        assert_eq!(slot.entry, 0x21);
        assert_eq!(slot.lfg_type, 1);
        assert_eq!(slot.to_word(), 0x0100_0021);

        // bits 16..24 are not part of either field
        let slot = LfgSlot::from_word(0x02AB_0005);
        assert_eq!(slot, LfgSlot::new(5, 2));
    }

    #[test]
    fn test_slot_auto_join_rules() {
        assert!(!LfgSlot::default().can_auto_join());
        assert!(LfgSlot::new(5, LfgType::Dungeon as u32).can_auto_join());
        assert!(LfgSlot::new(5, LfgType::HeroicDungeon as u32).can_auto_join());
        assert!(!LfgSlot::new(5, LfgType::Raid as u32).can_auto_join());
        assert!(!LfgSlot::new(5, LfgType::Zone as u32).can_auto_join());
        assert!(!LfgSlot::new(5, 42).can_auto_join());
    }

    #[test]
    fn test_looking_for_group_slots() {
        let mut lfg = LookingForGroup::default();
        assert!(!lfg.can_auto_join());

        lfg.slots[2] = LfgSlot::new(33, 1);
        assert!(lfg.can_auto_join());
        assert!(lfg.have_in_slot(33, 1));
        assert!(!lfg.have_in_slot(33, 2));

        lfg.clear_slots();
        assert!(lfg.slots.iter().all(LfgSlot::is_empty));
    }

    #[test]
    fn test_class_masks_and_defaults() {
        assert_eq!(Class::Warrior.mask(), 0x1);
        assert_eq!(Class::Druid.mask(), 0x400);
        assert_eq!(Class::Mage.default_tree(), 1);
        assert_eq!(Class::Priest.default_tree(), 1);
        assert_eq!(Class::Paladin.default_tree(), 2);
        assert_eq!(Class::Rogue.default_tree(), 0);
    }

    #[test]
    fn test_role_capability_hybrid() {
        let feral = RoleCapability::TANK | RoleCapability::DPS;
        assert!(feral.contains(RoleCapability::TANK));
        assert!(feral.contains(RoleCapability::DPS));
        assert!(!feral.contains(RoleCapability::HEALER));
    }
}
