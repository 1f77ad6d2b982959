//! Role inference from talent investment
//!
//! Characters never declare a role. The classifier looks at where their talent
//! points went and maps the dominant tree of their class to the roles that
//! tree is able to fill.

use crate::talent::store::{TalentStore, TALENT_TREES};
use crate::types::{Character, Class, RoleCapability};
use std::sync::Arc;

/// Below this level talent spreads are not considered meaningful
pub const MIN_SPECIALIZATION_LEVEL: u32 = 10;

/// Infers [`RoleCapability`] from the current talent state of a character
#[derive(Clone)]
pub struct TalentRoleClassifier {
    talents: Arc<dyn TalentStore>,
}

impl TalentRoleClassifier {
    pub fn new(talents: Arc<dyn TalentStore>) -> Self {
        Self { talents }
    }

    /// Points invested per tree of the character's class
    pub fn tree_points(&self, character: &Character) -> [u32; TALENT_TREES] {
        let mut points = [0; TALENT_TREES];
        let class_mask = character.class.mask();

        for talent in self.talents.talents() {
            let Some(tab) = self.talents.tab(talent.tab_id) else {
                continue;
            };
            if tab.class_mask & class_mask == 0 {
                continue;
            }
            if let Some(total) = points.get_mut(tab.tab_page as usize) {
                *total += talent.learned_rank(character);
            }
        }

        points
    }

    /// Tree the character is specialised in
    ///
    /// Ties go to the lowest tree index. Characters below
    /// [`MIN_SPECIALIZATION_LEVEL`] or with unspent points fall back to the
    /// class default tree.
    pub fn dominant_tree(&self, character: &Character) -> usize {
        if character.level < MIN_SPECIALIZATION_LEVEL || character.free_talent_points > 0 {
            return character.class.default_tree();
        }

        let points = self.tree_points(character);
        let mut best = 0;
        for tree in 1..TALENT_TREES {
            if points[tree] > points[best] {
                best = tree;
            }
        }
        best
    }

    /// Roles the character can currently cover
    pub fn classify(&self, character: &Character) -> RoleCapability {
        Self::role_for_tree(character.class, self.dominant_tree(character))
    }

    /// Fixed (class, tree) -> roles table
    pub fn role_for_tree(class: Class, tree: usize) -> RoleCapability {
        match (class, tree) {
            (Class::Priest, 2) => RoleCapability::DPS,
            (Class::Priest, _) => RoleCapability::HEALER,
            (Class::Shaman, 2) => RoleCapability::HEALER,
            (Class::Shaman, _) => RoleCapability::DPS,
            (Class::Warrior, 2) => RoleCapability::TANK,
            (Class::Warrior, _) => RoleCapability::DPS,
            (Class::Paladin, 0) => RoleCapability::HEALER,
            (Class::Paladin, 1) => RoleCapability::TANK,
            (Class::Paladin, _) => RoleCapability::DPS,
            (Class::Druid, 0) => RoleCapability::DPS,
            (Class::Druid, 1) => RoleCapability::TANK | RoleCapability::DPS,
            (Class::Druid, _) => RoleCapability::HEALER,
            _ => RoleCapability::DPS,
        }
    }
}

impl std::fmt::Debug for TalentRoleClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TalentRoleClassifier").finish_non_exhaustive()
    }
}
