//! Automatic matching over the online population
//!
//! Two scans exist. `attempt_join` places a lone seeker into the first
//! compatible advertiser's group (creating it when the advertiser is still
//! alone). `attempt_add_more` lets an advertiser absorb as many compatible
//! seekers as its group can hold. Both are single synchronous passes in
//! registry order and must be called with exclusive access to the [`World`].

use crate::config::LfgSettings;
use crate::group::Group;
use crate::matching::compatibility::CompatibilityEvaluator;
use crate::metrics::{AttemptKind, MetricsCollector};
use crate::types::{Character, CharacterId, GroupId};
use crate::world::World;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one matching attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Preconditions failed; nothing was scanned
    Skipped,
    /// The scan ended without adding anyone
    NoMatch,
    /// The seeker joined the group led by `leader`
    Joined { group: GroupId, leader: CharacterId },
    /// The advertiser's group absorbed `added`
    Filled {
        group: GroupId,
        added: Vec<CharacterId>,
    },
    /// The advertiser's group could not be created; the attempt stopped
    Aborted,
}

impl MatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            MatchOutcome::Skipped => "skipped",
            MatchOutcome::NoMatch => "no_match",
            MatchOutcome::Joined { .. } => "joined",
            MatchOutcome::Filled { .. } => "filled",
            MatchOutcome::Aborted => "aborted",
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Joined { .. } | MatchOutcome::Filled { .. })
    }
}

/// Runs the auto-join and auto-fill scans
#[derive(Clone)]
pub struct MatchEngine {
    evaluator: CompatibilityEvaluator,
    settings: LfgSettings,
    metrics: Arc<MetricsCollector>,
}

impl MatchEngine {
    pub fn new(
        evaluator: CompatibilityEvaluator,
        settings: LfgSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            evaluator,
            settings,
            metrics,
        }
    }

    pub fn evaluator(&self) -> &CompatibilityEvaluator {
        &self.evaluator
    }

    /// Try to place `seeker_id` into a compatible advertiser's group
    pub fn attempt_join(&self, world: &mut World, seeker_id: CharacterId) -> MatchOutcome {
        let timer = self.metrics.start_timer();
        let outcome = self.join_scan(world, seeker_id);
        self.metrics
            .record_attempt(AttemptKind::Join, outcome.label(), timer.stop());
        outcome
    }

    /// Try to fill `advertiser_id`'s group with compatible seekers
    pub fn attempt_add_more(&self, world: &mut World, advertiser_id: CharacterId) -> MatchOutcome {
        let timer = self.metrics.start_timer();
        let outcome = self.add_more_scan(world, advertiser_id);
        self.metrics
            .record_attempt(AttemptKind::AddMore, outcome.label(), timer.stop());
        outcome
    }

    fn join_scan(&self, world: &mut World, seeker_id: CharacterId) -> MatchOutcome {
        let Some(seeker) = world.players.get(seeker_id).cloned() else {
            return MatchOutcome::Skipped;
        };

        if !seeker.lfg.can_auto_join() || seeker.group.is_some() {
            debug!(
                "Auto-join skipped for '{}' ({}) - auto-joinable: {}, grouped: {}",
                seeker.name,
                seeker_id,
                seeker.lfg.can_auto_join(),
                seeker.group.is_some()
            );
            return MatchOutcome::Skipped;
        }

        for candidate_id in world.players.online() {
            let (leader_name, existing_group) = {
                let Some(candidate) = world.players.get(candidate_id) else {
                    continue;
                };
                if !self.is_join_target(world, &seeker, candidate) {
                    continue;
                }
                (candidate.name.clone(), candidate.group)
            };

            let group_id = match existing_group {
                Some(group_id) => group_id,
                // creation failure only loses this candidate
                None => match self.create_group(world, candidate_id, &leader_name) {
                    Some(group_id) => group_id,
                    None => continue,
                },
            };

            if self.add_member(world, group_id, seeker_id, &seeker.name) {
                info!(
                    "Auto-join: '{}' ({}) joined group {} led by '{}' ({})",
                    seeker.name, seeker_id, group_id, leader_name, candidate_id
                );
                self.leave_channel_if_restricted(world, seeker_id);
                return MatchOutcome::Joined {
                    group: group_id,
                    leader: candidate_id,
                };
            }

            debug!(
                "Auto-join: group {} of '{}' filled up, continuing scan",
                group_id, leader_name
            );
            self.leave_channel_if_restricted(world, candidate_id);
        }

        MatchOutcome::NoMatch
    }

    fn add_more_scan(&self, world: &mut World, advertiser_id: CharacterId) -> MatchOutcome {
        let Some(advertiser) = world.players.get(advertiser_id).cloned() else {
            return MatchOutcome::Skipped;
        };

        if !advertiser.lfg.more.can_auto_join() {
            debug!(
                "Auto-fill skipped for '{}' ({}) - LFM slot not auto-joinable",
                advertiser.name, advertiser_id
            );
            return MatchOutcome::Skipped;
        }

        let mut group_id = match world.group_of(advertiser_id) {
            Some(group) if !Self::accepts_recruits(group, advertiser_id) => {
                debug!(
                    "Auto-fill skipped for '{}' ({}) - group {} cannot take members",
                    advertiser.name,
                    advertiser_id,
                    group.id()
                );
                return MatchOutcome::Skipped;
            }
            Some(group) => Some(group.id()),
            None => None,
        };

        let mut added = Vec::new();

        for candidate_id in world.players.online() {
            let candidate_name = {
                let Some(candidate) = world.players.get(candidate_id) else {
                    continue;
                };
                if !self.is_fill_target(world, &advertiser, group_id, candidate) {
                    continue;
                }
                candidate.name.clone()
            };

            let target = match group_id {
                Some(target) => target,
                None => match self.create_group(world, advertiser_id, &advertiser.name) {
                    Some(created) => {
                        group_id = Some(created);
                        created
                    }
                    None => {
                        // unlike auto-join, a refused creation ends the whole attempt
                        return MatchOutcome::Aborted;
                    }
                },
            };

            if !self.add_member(world, target, candidate_id, &candidate_name) {
                debug!(
                    "Auto-fill: group {} of '{}' is full, stopping",
                    target, advertiser.name
                );
                self.leave_channel_if_restricted(world, advertiser_id);
                break;
            }

            info!(
                "Auto-fill: '{}' ({}) added '{}' ({}) to group {}",
                advertiser.name, advertiser_id, candidate_name, candidate_id, target
            );
            added.push(candidate_id);
            self.leave_channel_if_restricted(world, candidate_id);

            if world.groups.get(target).is_some_and(Group::is_full) {
                info!("Auto-fill: group {} of '{}' is now full", target, advertiser.name);
                self.leave_channel_if_restricted(world, advertiser_id);
                break;
            }
        }

        match group_id {
            Some(group) if !added.is_empty() => MatchOutcome::Filled { group, added },
            _ => MatchOutcome::NoMatch,
        }
    }

    /// A group can receive members only through its leader, outside battlegrounds
    fn accepts_recruits(group: &Group, leader: CharacterId) -> bool {
        !group.is_battleground() && !group.is_full() && group.is_leader(leader)
    }

    /// Faction, presence and self checks shared by both scans
    fn is_reachable(seeker: &Character, candidate: &Character) -> bool {
        candidate.id != seeker.id && candidate.team == seeker.team && candidate.is_available()
    }

    fn is_join_target(&self, world: &World, seeker: &Character, candidate: &Character) -> bool {
        if !Self::is_reachable(seeker, candidate) || !candidate.auto.auto_add {
            return false;
        }

        let more = &candidate.lfg.more;
        if !more.can_auto_join() || !seeker.lfg.have_slot(more) {
            return false;
        }

        match candidate.group {
            Some(group_id) => {
                let Some(group) = world.groups.get(group_id) else {
                    warn!(
                        "Character {} references missing group {}",
                        candidate.id, group_id
                    );
                    return false;
                };
                Self::accepts_recruits(group, candidate.id)
                    && self
                        .evaluator
                        .is_compatible_with_group(seeker, world.online_members(group))
            }
            None => self.evaluator.is_compatible_with_player(seeker, candidate),
        }
    }

    fn is_fill_target(
        &self,
        world: &World,
        advertiser: &Character,
        group_id: Option<GroupId>,
        candidate: &Character,
    ) -> bool {
        if !Self::is_reachable(advertiser, candidate) || !candidate.auto.auto_join {
            return false;
        }
        if !candidate.lfg.have_slot(&advertiser.lfg.more) || candidate.group.is_some() {
            return false;
        }

        match group_id.and_then(|id| world.groups.get(id)) {
            Some(group) => self
                .evaluator
                .is_compatible_with_group(candidate, world.online_members(group)),
            None => self.evaluator.is_compatible_with_player(candidate, advertiser),
        }
    }

    fn create_group(&self, world: &mut World, leader: CharacterId, leader_name: &str) -> Option<GroupId> {
        let Some(group_id) = world.groups.create(leader, leader_name) else {
            warn!("Failed to create group for '{}' ({})", leader_name, leader);
            self.metrics.record_group_creation_failed();
            return None;
        };

        if let Some(character) = world.players.get_mut(leader) {
            character.group = Some(group_id);
        }
        self.metrics.record_group_created();
        Some(group_id)
    }

    fn add_member(&self, world: &mut World, group_id: GroupId, id: CharacterId, name: &str) -> bool {
        if !world.groups.add_member(group_id, id, name) {
            return false;
        }

        if let Some(character) = world.players.get_mut(id) {
            character.group = Some(group_id);
        }
        self.metrics.record_member_added();
        true
    }

    /// Remove an unprivileged character from the LFG channel when channel restriction is on
    pub fn leave_channel_if_restricted(&self, world: &mut World, id: CharacterId) {
        if !self.settings.channel_restricted {
            return;
        }

        let unprivileged = world
            .players
            .get(id)
            .is_some_and(Character::is_unprivileged);
        if unprivileged {
            world.channels.leave_lfg_channel(id);
            self.metrics.record_channel_removal();
        }
    }
}

impl std::fmt::Debug for MatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
