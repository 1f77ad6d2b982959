//! Read-only talent definitions
//!
//! The live server loads these from client data tables. The matchmaker only
//! needs to know which tab (and therefore which tree) every talent rank
//! spell belongs to.

use crate::types::{Class, Character};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of ranks a single talent can have
pub const MAX_TALENT_RANK: usize = 5;

/// Number of talent trees per class
pub const TALENT_TREES: usize = 3;

/// A talent tree of one (or several) classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalentTab {
    pub id: u32,
    pub class_mask: u32,
    /// Position of the tree in the talent frame (0..3)
    pub tab_page: u8,
}

/// A single talent; `ranks[i]` is the spell taught by rank `i + 1`, 0 when unused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalentEntry {
    pub id: u32,
    pub tab_id: u32,
    pub ranks: [u32; MAX_TALENT_RANK],
}

impl TalentEntry {
    /// Highest rank (1-based) the character has learned, 0 when untrained
    pub fn learned_rank(&self, character: &Character) -> u32 {
        self.ranks
            .iter()
            .rposition(|&spell| spell != 0 && character.has_spell(spell))
            .map_or(0, |idx| idx as u32 + 1)
    }
}

/// Lookup interface over the static talent tables
pub trait TalentStore: Send + Sync {
    /// Every talent definition
    fn talents(&self) -> &[TalentEntry];

    /// Tab a talent belongs to
    fn tab(&self, tab_id: u32) -> Option<&TalentTab>;
}

/// In-memory talent tables
#[derive(Debug, Clone, Default)]
pub struct StaticTalentStore {
    tabs: HashMap<u32, TalentTab>,
    talents: Vec<TalentEntry>,
}

/// Talents generated per tree by [`StaticTalentStore::synthetic`]
const SYNTHETIC_TALENTS_PER_TREE: u32 = 16;

impl StaticTalentStore {
    pub fn new(tabs: Vec<TalentTab>, talents: Vec<TalentEntry>) -> Self {
        Self {
            tabs: tabs.into_iter().map(|tab| (tab.id, tab)).collect(),
            talents,
        }
    }

    /// Deterministic table with three 80-point trees for every class
    ///
    /// Used by the scenario runner and the test-suite in place of the
    /// client data files.
    pub fn synthetic() -> Self {
        let mut tabs = Vec::new();
        let mut talents = Vec::new();

        for class in Class::ALL {
            for page in 0..TALENT_TREES as u32 {
                let tab_id = Self::synthetic_tab_id(class, page as usize);
                tabs.push(TalentTab {
                    id: tab_id,
                    class_mask: class.mask(),
                    tab_page: page as u8,
                });

                for idx in 0..SYNTHETIC_TALENTS_PER_TREE {
                    let mut ranks = [0; MAX_TALENT_RANK];
                    for (rank, spell) in ranks.iter_mut().enumerate() {
                        *spell = Self::synthetic_spell_id(class, page as usize, idx, rank);
                    }
                    talents.push(TalentEntry {
                        id: tab_id * 100 + idx,
                        tab_id,
                        ranks,
                    });
                }
            }
        }

        Self::new(tabs, talents)
    }

    fn synthetic_tab_id(class: Class, tree: usize) -> u32 {
        class.id() as u32 * 10 + tree as u32
    }

    fn synthetic_spell_id(class: Class, tree: usize, talent: u32, rank: usize) -> u32 {
        class.id() as u32 * 100_000 + tree as u32 * 10_000 + talent * 10 + rank as u32 + 1
    }

    /// Spells a character of `class` knows after spending `points` in `tree`
    /// of the synthetic table (talents filled to max rank in order)
    pub fn synthetic_spells(class: Class, tree: usize, points: u32) -> Vec<u32> {
        let mut spells = Vec::new();
        let mut remaining = points.min(SYNTHETIC_TALENTS_PER_TREE * MAX_TALENT_RANK as u32);
        let mut talent = 0;

        while remaining > 0 {
            let rank = remaining.min(MAX_TALENT_RANK as u32) as usize;
            spells.push(Self::synthetic_spell_id(class, tree, talent, rank - 1));
            remaining -= rank as u32;
            talent += 1;
        }

        spells
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }
}

impl TalentStore for StaticTalentStore {
    fn talents(&self) -> &[TalentEntry] {
        &self.talents
    }

    fn tab(&self, tab_id: u32) -> Option<&TalentTab> {
        self.tabs.get(&tab_id)
    }
}
