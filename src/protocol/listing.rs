//! Listing response for a (entry, type) query
//!
//! Layout: `u32 type, u32 entry, u32 displayed, u32 found`, then one record per
//! displayed character. The two counts are only known after the scan, so they
//! are written as placeholders and patched at the end. Characters past the
//! display limit still count towards `found`.

use crate::error::{MatchmakingError, Result};
use crate::metrics::MetricsCollector;
use crate::protocol::codec::{PacketReader, PacketWriter};
use crate::types::{Character, CharacterId, LfgSlot, MAX_LFG_SLOTS};
use crate::world::World;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Entries the client is able to display
pub const DEFAULT_DISPLAY_LIMIT: u32 = 50;

/// Placeholder slot word sent after the "more" slot of an LFM record
const LFM_FILLER_WORD: u32 = 0x0100_0000;

/// An encoded listing plus the counts it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingResponse {
    pub lfg_type: u32,
    pub entry: u32,
    pub displayed: u32,
    pub found: u32,
    pub payload: Bytes,
}

/// One decoded listing record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub guid: CharacterId,
    pub level: u32,
    pub zone: u32,
    pub lfm: bool,
    pub slot_words: [u32; MAX_LFG_SLOTS],
    pub comment: String,
    /// Other online members of the character's group as (guid, level)
    pub members: Vec<(CharacterId, u32)>,
}

impl ListingResponse {
    /// Decode the records of the payload
    pub fn entries(&self) -> Result<Vec<ListingEntry>> {
        let mut reader = PacketReader::new(self.payload.clone());
        let _lfg_type = reader.read_u32()?;
        let _entry = reader.read_u32()?;
        let displayed = reader.read_u32()?;
        let _found = reader.read_u32()?;

        let mut entries = Vec::with_capacity(displayed as usize);
        for _ in 0..displayed {
            let guid = reader.read_packed_guid()?;
            let level = reader.read_u32()?;
            let zone = reader.read_u32()?;
            let lfm = reader.read_u8()? != 0;

            let mut slot_words = [0; MAX_LFG_SLOTS];
            for word in slot_words.iter_mut() {
                *word = reader.read_u32()?;
            }

            let comment = reader.read_cstring()?;
            let count = reader.read_u32()?;
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                members.push((reader.read_packed_guid()?, reader.read_u32()?));
            }

            entries.push(ListingEntry {
                guid,
                level,
                zone,
                lfm,
                slot_words,
                comment,
                members,
            });
        }

        Ok(entries)
    }
}

/// Builds listing responses from the online population
#[derive(Clone)]
pub struct ListingProtocol {
    display_limit: u32,
    metrics: Arc<MetricsCollector>,
}

impl ListingProtocol {
    pub fn new(display_limit: u32, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            display_limit,
            metrics,
        }
    }

    pub fn display_limit(&self) -> u32 {
        self.display_limit
    }

    /// Characters visible to `requester` for the query, in registry order
    pub fn build(
        &self,
        world: &World,
        requester: CharacterId,
        entry: u32,
        lfg_type: u32,
    ) -> Result<ListingResponse> {
        let team = world
            .players
            .get(requester)
            .map(|character| character.team)
            .ok_or(MatchmakingError::PlayerNotFound {
                character_id: requester,
            })?;

        let query = LfgSlot::new(entry, lfg_type);
        let mut writer = PacketWriter::with_capacity(256);
        writer.put_u32(lfg_type);
        writer.put_u32(entry);
        let displayed_at = writer.placeholder_u32();
        let found_at = writer.placeholder_u32();

        let mut displayed = 0u32;
        let mut found = 0u32;

        for id in world.players.online() {
            let Some(candidate) = world.players.get(id) else {
                continue;
            };
            if candidate.team != team || !Self::is_listed(world, candidate, &query) {
                continue;
            }

            found += 1;
            if displayed >= self.display_limit {
                continue;
            }
            displayed += 1;

            Self::write_record(&mut writer, world, candidate, &query)?;
        }

        writer.patch_u32(displayed_at, displayed)?;
        writer.patch_u32(found_at, found)?;

        debug!(
            "Listing for {} (entry {}, type {}): displayed {}, found {}",
            requester, entry, lfg_type, displayed, found
        );
        self.metrics.record_listing(found, displayed);

        Ok(ListingResponse {
            lfg_type,
            entry,
            displayed,
            found,
            payload: writer.freeze(),
        })
    }

    fn is_listed(world: &World, candidate: &Character, query: &LfgSlot) -> bool {
        if !candidate.is_available() {
            return false;
        }
        if !candidate.lfg.have_slot(query) && candidate.lfg.more != *query {
            return false;
        }

        match candidate.group {
            // a dangling group id is treated like an unusable group
            Some(group_id) => world.groups.get(group_id).is_some_and(|group| {
                !group.is_battleground() && !group.is_full() && group.is_leader(candidate.id)
            }),
            None => true,
        }
    }

    fn write_record(
        writer: &mut PacketWriter,
        world: &World,
        candidate: &Character,
        query: &LfgSlot,
    ) -> Result<()> {
        let lfm = candidate.lfg.more == *query;

        writer.put_packed_guid(candidate.id);
        writer.put_u32(candidate.level);
        writer.put_u32(candidate.zone);
        writer.put_u8(u8::from(lfm));

        if lfm {
            writer.put_u32(candidate.lfg.more.to_word());
            writer.put_u32(LFM_FILLER_WORD);
            writer.put_u32(LFM_FILLER_WORD);
        } else {
            for slot in &candidate.lfg.slots {
                writer.put_u32(slot.to_word());
            }
        }

        writer.put_cstring(&candidate.lfg.comment);

        let count_at = writer.placeholder_u32();
        if let Some(group) = candidate.group.and_then(|id| world.groups.get(id)) {
            let mut count = 0;
            for member in world.online_members(group) {
                if member.id == candidate.id {
                    continue;
                }
                writer.put_packed_guid(member.id);
                writer.put_u32(member.level);
                count += 1;
            }
            writer.patch_u32(count_at, count)?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for ListingProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingProtocol")
            .field("display_limit", &self.display_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{Group, GroupStore, InMemoryGroupStore};
    use crate::types::{Class, LfgType, Team};
    use crate::world::{InMemoryChannelService, InMemoryPlayerRegistry};

    const ENTRY: u32 = 5;
    const DUNGEON: u32 = LfgType::Dungeon as u32;

    fn protocol() -> ListingProtocol {
        ListingProtocol::new(
            DEFAULT_DISPLAY_LIMIT,
            Arc::new(MetricsCollector::new().unwrap()),
        )
    }

    fn world() -> World {
        World::in_memory(5, InMemoryChannelService::new())
    }

    fn lfg_character(id: CharacterId) -> Character {
        let mut character = Character::new(id, format!("lfg{}", id), Class::Mage, 60, Team::Alliance);
        character.zone = 1519;
        character.lfg.slots[1] = LfgSlot::new(ENTRY, DUNGEON);
        character
    }

    #[test]
    fn test_header_and_lfg_record() {
        let mut world = world();
        let mut character = lfg_character(1);
        character.lfg.comment = "need group".to_string();
        world.players.login(character);

        let listing = protocol().build(&world, 1, ENTRY, DUNGEON).unwrap();
        assert_eq!((listing.displayed, listing.found), (1, 1));
        assert_eq!(&listing.payload[..4], &DUNGEON.to_le_bytes());
        assert_eq!(&listing.payload[4..8], &ENTRY.to_le_bytes());
        assert_eq!(&listing.payload[8..12], &1u32.to_le_bytes());
        assert_eq!(&listing.payload[12..16], &1u32.to_le_bytes());

        let entries = listing.entries().unwrap();
        assert_eq!(entries.len(), 1);
        let record = &entries[0];
        assert_eq!(record.guid, 1);
        assert_eq!(record.level, 60);
        assert_eq!(record.zone, 1519);
        assert!(!record.lfm);
        assert_eq!(record.slot_words, [0, 0x0100_0005, 0]);
        assert_eq!(record.comment, "need group");
        assert!(record.members.is_empty());
    }

    #[test]
    fn test_lfm_record_uses_more_slot() {
        let mut world = world();
        let mut advertiser = Character::new(2, "lead", Class::Priest, 58, Team::Alliance);
        advertiser.lfg.more = LfgSlot::new(ENTRY, DUNGEON);
        world.players.login(advertiser);
        world.players.login(lfg_character(1));

        let listing = protocol().build(&world, 1, ENTRY, DUNGEON).unwrap();
        let entries = listing.entries().unwrap();
        let lfm = entries.iter().find(|e| e.guid == 2).unwrap();
        assert!(lfm.lfm);
        assert_eq!(lfm.slot_words, [0x0100_0005, 0x0100_0000, 0x0100_0000]);
    }

    #[test]
    fn test_filters_team_availability_and_query() {
        let mut world = world();
        world.players.login(lfg_character(1));

        let mut horde = lfg_character(2);
        horde.team = Team::Horde;
        world.players.login(horde);

        let mut offline = lfg_character(3);
        offline.session_offline = true;
        world.players.login(offline);

        let mut other = lfg_character(4);
        other.lfg.slots[1] = LfgSlot::new(ENTRY + 1, DUNGEON);
        world.players.login(other);

        let listing = protocol().build(&world, 1, ENTRY, DUNGEON).unwrap();
        assert_eq!((listing.displayed, listing.found), (1, 1));
    }

    #[test]
    fn test_group_members_listed_for_leader_only() {
        let mut world = world();
        let group_id = world.groups.create(1, "lfg1").unwrap();
        world.groups.add_member(group_id, 2, "member");
        world.groups.add_member(group_id, 3, "offline");

        let mut leader = lfg_character(1);
        leader.group = Some(group_id);
        world.players.login(leader);

        let mut member = lfg_character(2);
        member.level = 42;
        member.group = Some(group_id);
        world.players.login(member);

        let listing = protocol().build(&world, 1, ENTRY, DUNGEON).unwrap();
        let entries = listing.entries().unwrap();
        // the member advertises too but does not lead its group
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].guid, 1);
        assert_eq!(entries[0].members, vec![(2, 42)]);
    }

    #[test]
    fn test_unusable_groups_hide_their_leader() {
        let mut groups = InMemoryGroupStore::new();
        let bg = groups.insert(Group::battleground(1, "lfg1", 40));
        let mut full = Group::new(2, "lfg2", 2);
        full.add_member(9, "other");
        let full = groups.insert(full);

        let mut world = World::new(
            Box::new(InMemoryPlayerRegistry::new()),
            Box::new(groups),
            Box::new(InMemoryChannelService::new()),
        );

        let mut in_bg = lfg_character(1);
        in_bg.group = Some(bg);
        world.players.login(in_bg);

        let mut in_full = lfg_character(2);
        in_full.group = Some(full);
        world.players.login(in_full);

        let listing = protocol().build(&world, 1, ENTRY, DUNGEON).unwrap();
        assert_eq!((listing.displayed, listing.found), (0, 0));
        assert_eq!(listing.payload.len(), 16);
    }

    #[test]
    fn test_display_limit_keeps_counting_found() {
        let mut world = world();
        for id in 1..=60 {
            world.players.login(lfg_character(id));
        }

        let listing = protocol().build(&world, 1, ENTRY, DUNGEON).unwrap();
        assert_eq!(listing.displayed, 50);
        assert_eq!(listing.found, 60);
        assert_eq!(listing.entries().unwrap().len(), 50);
    }

    #[test]
    fn test_unknown_requester() {
        let world = world();
        let err = protocol().build(&world, 7, ENTRY, DUNGEON).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::PlayerNotFound { character_id: 7 })
        ));
    }
}
