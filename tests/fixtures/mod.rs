//! Test fixtures and collaborator doubles for integration testing

#![allow(dead_code)]

use lfg_matchmaker::config::LfgSettings;
use lfg_matchmaker::group::{Group, GroupStore, InMemoryGroupStore};
use lfg_matchmaker::metrics::MetricsCollector;
use lfg_matchmaker::session::LfgService;
use lfg_matchmaker::talent::StaticTalentStore;
use lfg_matchmaker::types::{Character, CharacterId, Class, GroupId, LfgSlot, LfgType, Team};
use lfg_matchmaker::world::{InMemoryChannelService, InMemoryPlayerRegistry, World};
use std::sync::{Arc, Mutex};

/// Slot every fixture advertises unless told otherwise
pub const DUNGEON: LfgSlot = LfgSlot {
    entry: 5,
    lfg_type: LfgType::Dungeon as u32,
};

/// Character of `class` with 31 points in `tree` and 5 in the next tree
pub fn create_test_character(id: CharacterId, class: Class, tree: usize) -> Character {
    let mut character = Character::new(id, format!("{}{}", class, id), class, 60, Team::Alliance);
    character
        .spells
        .extend(StaticTalentStore::synthetic_spells(class, tree, 31));
    character
        .spells
        .extend(StaticTalentStore::synthetic_spells(class, (tree + 1) % 3, 5));
    character
}

pub fn protection_warrior(id: CharacterId) -> Character {
    create_test_character(id, Class::Warrior, 2)
}

pub fn holy_priest(id: CharacterId) -> Character {
    create_test_character(id, Class::Priest, 1)
}

pub fn feral_druid(id: CharacterId) -> Character {
    create_test_character(id, Class::Druid, 1)
}

pub fn dps(id: CharacterId, class: Class) -> Character {
    let tree = match class {
        Class::Warrior | Class::Shaman | Class::Druid => 0,
        Class::Priest | Class::Paladin => 2,
        _ => 1,
    };
    create_test_character(id, class, tree)
}

/// Service and the channel handle its world uses
pub struct TestSystem {
    pub service: Arc<LfgService>,
    pub channels: InMemoryChannelService,
    pub metrics: Arc<MetricsCollector>,
}

pub fn create_test_system(channel_restricted: bool) -> TestSystem {
    let settings = LfgSettings {
        channel_restricted,
        ..LfgSettings::default()
    };
    let channels = InMemoryChannelService::new();
    let world = World::in_memory(settings.max_group_size, channels.clone());
    build(world, channels, &settings)
}

pub fn create_system_with_groups(
    groups: Box<dyn GroupStore>,
    channel_restricted: bool,
) -> TestSystem {
    let settings = LfgSettings {
        channel_restricted,
        ..LfgSettings::default()
    };
    let channels = InMemoryChannelService::new();
    let world = World::new(
        Box::new(InMemoryPlayerRegistry::new()),
        groups,
        Box::new(channels.clone()),
    );
    build(world, channels, &settings)
}

fn build(world: World, channels: InMemoryChannelService, settings: &LfgSettings) -> TestSystem {
    let metrics = Arc::new(MetricsCollector::new().expect("Failed to create metrics collector"));
    let service = LfgService::new(
        world,
        Arc::new(StaticTalentStore::synthetic()),
        settings,
        metrics.clone(),
    );

    TestSystem {
        service: Arc::new(service),
        channels,
        metrics,
    }
}

impl TestSystem {
    /// Log a character in and put it in the LFG channel
    pub fn online(&self, character: Character) {
        self.channels.join_lfg_channel(character.id);
        self.service
            .login(character)
            .expect("Failed to log character in");
    }

    pub fn group_of(&self, id: CharacterId) -> Option<GroupId> {
        self.service
            .with_world(|world| world.players.get(id).and_then(|c| c.group))
            .expect("World lock poisoned")
    }

    pub fn group(&self, id: GroupId) -> Option<Group> {
        self.service
            .with_world(|world| world.groups.get(id).cloned())
            .expect("World lock poisoned")
    }

    pub fn group_count(&self) -> usize {
        self.service
            .with_world(|world| world.groups.count())
            .expect("World lock poisoned")
    }
}

/// Group store that can be told to refuse group creation, recording attempts
#[derive(Default)]
pub struct RefusingGroupStore {
    inner: InMemoryGroupStore,
    refuse_create: bool,
    attempts: Arc<Mutex<Vec<CharacterId>>>,
}

impl RefusingGroupStore {
    pub fn refusing() -> Self {
        Self {
            refuse_create: true,
            ..Self::default()
        }
    }

    /// Shared log of leaders whose group creation was attempted
    pub fn attempts(&self) -> Arc<Mutex<Vec<CharacterId>>> {
        self.attempts.clone()
    }
}

impl GroupStore for RefusingGroupStore {
    fn create(&mut self, leader: CharacterId, leader_name: &str) -> Option<GroupId> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(leader);
        }
        if self.refuse_create {
            return None;
        }
        self.inner.create(leader, leader_name)
    }

    fn add_member(&mut self, group: GroupId, id: CharacterId, name: &str) -> bool {
        self.inner.add_member(group, id, name)
    }

    fn get(&self, group: GroupId) -> Option<&Group> {
        self.inner.get(group)
    }

    fn count(&self) -> usize {
        self.inner.count()
    }
}
