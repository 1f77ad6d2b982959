//! Role-balance compatibility checks
//!
//! A candidate may join a single player when they do not duplicate a tank or a
//! healer and are not two damage dealers of the same class. Joining a group is
//! decided from an aggregate count of the roles already present, where hybrid
//! (tank and damage) members are counted as whichever role the group lacks.

use crate::talent::TalentRoleClassifier;
use crate::types::{Character, Class, RoleCapability};

/// Damage dealers a party is considered to need
pub const DPS_QUOTA: u32 = 3;

/// Role tally of a group, relative to a given candidate class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupComposition {
    pub dps: u32,
    pub heal: u32,
    pub tank: u32,
    pub offtank: u32,
    pub offdps: u32,
    /// Damage dealers sharing the candidate's class
    pub same_dps_class: u32,
}

impl GroupComposition {
    /// Count members in group order, then settle hybrids
    ///
    /// The tally is order-sensitive: whether a hybrid member counts as
    /// off-tank or off-dps depends on what was counted before it.
    pub fn tally<I>(candidate_class: Class, members: I) -> Self
    where
        I: IntoIterator<Item = (Class, RoleCapability)>,
    {
        let mut composition = Self::default();
        for (class, roles) in members {
            composition.count_member(candidate_class, class, roles);
        }
        composition.settle_hybrids();
        composition
    }

    fn count_member(&mut self, candidate_class: Class, class: Class, roles: RoleCapability) {
        if roles.contains(RoleCapability::DPS) {
            if roles.contains(RoleCapability::TANK) && (self.tank > 0 || self.dps < DPS_QUOTA) {
                self.offdps += 1;
            } else {
                self.dps += 1;
            }

            if class == candidate_class {
                self.same_dps_class += 1;
            }
        }

        if roles.contains(RoleCapability::HEALER) {
            self.heal += 1;
        }

        if roles.contains(RoleCapability::TANK) {
            if roles.contains(RoleCapability::DPS) && (self.tank == 0 || self.dps >= DPS_QUOTA) {
                self.offtank += 1;
            } else {
                self.tank += 1;
            }
        }
    }

    fn settle_hybrids(&mut self) {
        // a hybrid covers the missing tank before it counts as damage
        if self.tank == 0 && self.offtank > 0 {
            self.tank += 1;
            self.offtank -= 1;
            self.offdps = self.offdps.saturating_sub(1);
        }

        if self.dps < DPS_QUOTA && self.offdps > 0 && self.offtank > 0 {
            self.dps += self.offdps;
        }
    }

    /// Whether a candidate with `roles` still fits
    pub fn accepts(&self, roles: RoleCapability) -> bool {
        let pure_dps = roles.contains(RoleCapability::DPS) && !roles.contains(RoleCapability::TANK);
        if pure_dps && (self.dps >= DPS_QUOTA || self.same_dps_class > 0) {
            return false;
        }

        if roles.contains(RoleCapability::HEALER) && self.heal >= 1 {
            return false;
        }

        let pure_tank = roles.contains(RoleCapability::TANK) && !roles.contains(RoleCapability::DPS);
        if pure_tank && self.tank >= 1 {
            return false;
        }

        true
    }
}

/// Decides whether adding a candidate would break role balance
#[derive(Debug, Clone)]
pub struct CompatibilityEvaluator {
    classifier: TalentRoleClassifier,
}

impl CompatibilityEvaluator {
    pub fn new(classifier: TalentRoleClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &TalentRoleClassifier {
        &self.classifier
    }

    /// Two-person check on already classified characters
    pub fn roles_compatible(
        candidate: (Class, RoleCapability),
        other: (Class, RoleCapability),
    ) -> bool {
        let (candidate_class, candidate_roles) = candidate;
        let (other_class, other_roles) = other;
        let shared = candidate_roles & other_roles;

        if shared.contains(RoleCapability::TANK) || shared.contains(RoleCapability::HEALER) {
            return false;
        }

        !(shared.contains(RoleCapability::DPS) && candidate_class == other_class)
    }

    pub fn is_compatible_with_player(&self, candidate: &Character, other: &Character) -> bool {
        Self::roles_compatible(
            (candidate.class, self.classifier.classify(candidate)),
            (other.class, self.classifier.classify(other)),
        )
    }

    /// Role tally of `members` as seen by `candidate`
    pub fn group_composition<'a, I>(&self, candidate: &Character, members: I) -> GroupComposition
    where
        I: IntoIterator<Item = &'a Character>,
    {
        GroupComposition::tally(
            candidate.class,
            members
                .into_iter()
                .map(|member| (member.class, self.classifier.classify(member))),
        )
    }

    pub fn is_compatible_with_group<'a, I>(&self, candidate: &Character, members: I) -> bool
    where
        I: IntoIterator<Item = &'a Character>,
    {
        let roles = self.classifier.classify(candidate);
        self.group_composition(candidate, members).accepts(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RoleCapability as R;

    fn feral() -> RoleCapability {
        R::TANK | R::DPS
    }

    #[test]
    fn test_pairwise_rejects_duplicate_tank_and_healer() {
        assert!(!CompatibilityEvaluator::roles_compatible(
            (Class::Warrior, R::TANK),
            (Class::Paladin, R::TANK)
        ));
        assert!(!CompatibilityEvaluator::roles_compatible(
            (Class::Priest, R::HEALER),
            (Class::Druid, R::HEALER)
        ));
        // a feral druid still holds the tank bit
        assert!(!CompatibilityEvaluator::roles_compatible(
            (Class::Druid, feral()),
            (Class::Warrior, R::TANK)
        ));
    }

    #[test]
    fn test_pairwise_same_class_dps() {
        assert!(!CompatibilityEvaluator::roles_compatible(
            (Class::Mage, R::DPS),
            (Class::Mage, R::DPS)
        ));
        assert!(CompatibilityEvaluator::roles_compatible(
            (Class::Mage, R::DPS),
            (Class::Rogue, R::DPS)
        ));
        // same class in different roles is fine
        assert!(CompatibilityEvaluator::roles_compatible(
            (Class::Priest, R::DPS),
            (Class::Priest, R::HEALER)
        ));
    }

    #[test]
    fn test_pairwise_tank_and_healer() {
        assert!(CompatibilityEvaluator::roles_compatible(
            (Class::Warrior, R::TANK),
            (Class::Priest, R::HEALER)
        ));
    }

    #[test]
    fn test_three_dps_cap() {
        let group = GroupComposition::tally(
            Class::Warlock,
            [
                (Class::Mage, R::DPS),
                (Class::Rogue, R::DPS),
                (Class::Hunter, R::DPS),
            ],
        );
        assert_eq!(group.dps, 3);
        assert!(!group.accepts(R::DPS));
        assert!(group.accepts(R::TANK));
        assert!(group.accepts(R::HEALER));
    }

    #[test]
    fn test_same_class_dps_rejected_below_cap() {
        let group = GroupComposition::tally(Class::Mage, [(Class::Mage, R::DPS)]);
        assert_eq!(group.same_dps_class, 1);
        assert!(!group.accepts(R::DPS));
    }

    #[test]
    fn test_lone_hybrid_is_promoted_to_tank() {
        let group = GroupComposition::tally(Class::Mage, [(Class::Druid, feral())]);
        assert_eq!(group.tank, 1);
        assert_eq!(group.dps, 0);
        assert_eq!(group.offtank, 0);
        assert_eq!(group.offdps, 0);

        assert!(!group.accepts(R::TANK));
        assert!(group.accepts(R::DPS));
        // another hybrid may still join
        assert!(group.accepts(feral()));
    }

    #[test]
    fn test_hybrid_behind_real_tank_counts_as_dps() {
        let group = GroupComposition::tally(
            Class::Mage,
            [
                (Class::Warrior, R::TANK),
                (Class::Druid, feral()),
                (Class::Rogue, R::DPS),
            ],
        );
        // druid: offdps (tank present) + tank (tank present, dps < 3)
        assert_eq!(group.tank, 2);
        assert_eq!(group.offdps, 1);
        assert_eq!(group.dps, 1);
    }

    #[test]
    fn test_two_hybrids_fold_offdps_into_dps() {
        let group = GroupComposition::tally(
            Class::Mage,
            [(Class::Druid, feral()), (Class::Druid, feral())],
        );
        // both count as offtank + offdps, one is promoted, the other folds into dps
        assert_eq!(group.tank, 1);
        assert_eq!(group.offtank, 1);
        assert_eq!(group.offdps, 1);
        assert_eq!(group.dps, 1);
    }

    #[test]
    fn test_hybrid_promotion_without_offdps_does_not_underflow() {
        // three dps first, then a hybrid: it counts as dps and offtank
        let group = GroupComposition::tally(
            Class::Warlock,
            [
                (Class::Mage, R::DPS),
                (Class::Rogue, R::DPS),
                (Class::Hunter, R::DPS),
                (Class::Druid, feral()),
            ],
        );
        assert_eq!(group.dps, 4);
        assert_eq!(group.tank, 1);
        assert_eq!(group.offdps, 0);
    }

    #[test]
    fn test_second_healer_rejected() {
        let group = GroupComposition::tally(Class::Priest, [(Class::Shaman, R::HEALER)]);
        assert!(!group.accepts(R::HEALER));
        assert!(group.accepts(R::DPS));
    }

    #[test]
    fn test_empty_group_accepts_everyone() {
        let group = GroupComposition::tally(Class::Mage, Vec::new());
        for roles in [R::TANK, R::HEALER, R::DPS, feral()] {
            assert!(group.accepts(roles));
        }
    }
}
