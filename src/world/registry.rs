//! Registry of online characters

use crate::types::{Character, CharacterId};
use std::collections::BTreeMap;
use tracing::info;

/// Enumeration and lookup of currently online characters
pub trait PlayerRegistry: Send {
    /// Ids of every online character, in registry iteration order
    fn online(&self) -> Vec<CharacterId>;

    fn get(&self, id: CharacterId) -> Option<&Character>;

    fn get_mut(&mut self, id: CharacterId) -> Option<&mut Character>;

    /// Add a character; returns the previous record for the same id
    fn login(&mut self, character: Character) -> Option<Character>;

    fn logout(&mut self, id: CharacterId) -> Option<Character>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered map of online characters, iterated by ascending id
#[derive(Debug, Default)]
pub struct InMemoryPlayerRegistry {
    characters: BTreeMap<CharacterId, Character>,
}

impl InMemoryPlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayerRegistry for InMemoryPlayerRegistry {
    fn online(&self) -> Vec<CharacterId> {
        self.characters.keys().copied().collect()
    }

    fn get(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    fn get_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    fn login(&mut self, character: Character) -> Option<Character> {
        info!(
            "Character '{}' ({}) logged in - {} level {}",
            character.name, character.id, character.class, character.level
        );
        self.characters.insert(character.id, character)
    }

    fn logout(&mut self, id: CharacterId) -> Option<Character> {
        let removed = self.characters.remove(&id);
        if let Some(character) = &removed {
            info!("Character '{}' ({}) logged out", character.name, id);
        }
        removed
    }

    fn len(&self) -> usize {
        self.characters.len()
    }
}
