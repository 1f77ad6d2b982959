//! Scenario replay
//!
//! A scenario file declares a population of characters and a sequence of
//! LFG requests. Replaying it through an in-process [`LfgService`] shows which
//! groups form, who was pulled from the LFG channel and what listings were
//! returned.
//!
//! ```toml
//! [lfg]
//! channel_restricted = true
//!
//! [[characters]]
//! id = 1
//! name = "Brom"
//! class = "warrior"
//! talents = [5, 0, 31]
//!
//! [[actions]]
//! action = "set_lfg"
//! character = 1
//! slot = 0
//! entry = 5
//! lfg_type = 1
//! ```

use crate::config::{validate_config, AppConfig, LfgSettings};
use crate::error::{MatchmakingError, Result};
use crate::metrics::MetricsCollector;
use crate::protocol::{ClientRequest, ServerMessage};
use crate::session::LfgService;
use crate::talent::{StaticTalentStore, TALENT_TREES};
use crate::types::{Character, CharacterId, Class, LfgSlot, SecurityLevel, Team};
use crate::world::{InMemoryChannelService, World};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

fn default_level() -> u32 {
    60
}

fn default_team() -> Team {
    Team::Alliance
}

fn default_in_channel() -> bool {
    true
}

/// A character to log in before the actions run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioCharacter {
    pub id: CharacterId,
    pub name: String,
    pub class: Class,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default = "default_team")]
    pub team: Team,
    #[serde(default)]
    pub zone: u32,
    /// Points spent per talent tree
    #[serde(default)]
    pub talents: [u32; TALENT_TREES],
    #[serde(default)]
    pub free_talent_points: u32,
    #[serde(default)]
    pub security: SecurityLevel,
    #[serde(default = "default_in_channel")]
    pub in_lfg_channel: bool,
}

impl ScenarioCharacter {
    fn build(&self) -> Character {
        let mut character = Character::new(self.id, &self.name, self.class, self.level, self.team);
        character.zone = self.zone;
        character.free_talent_points = self.free_talent_points;
        character.security = self.security;
        for (tree, &points) in self.talents.iter().enumerate() {
            character
                .spells
                .extend(StaticTalentStore::synthetic_spells(self.class, tree, points));
        }
        character
    }
}

/// One step of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioAction {
    SetLfg {
        character: CharacterId,
        slot: u32,
        entry: u32,
        lfg_type: u32,
    },
    ClearLfg {
        character: CharacterId,
    },
    SetLfm {
        character: CharacterId,
        entry: u32,
        lfg_type: u32,
    },
    ClearLfm {
        character: CharacterId,
    },
    SetComment {
        character: CharacterId,
        comment: String,
    },
    SetAutoJoin {
        character: CharacterId,
    },
    ClearAutoJoin {
        character: CharacterId,
    },
    SetAutoFill {
        character: CharacterId,
    },
    ClearAutoFill {
        character: CharacterId,
    },
    ListQuery {
        character: CharacterId,
        entry: u32,
        lfg_type: u32,
    },
    Logout {
        character: CharacterId,
    },
}

impl ScenarioAction {
    fn into_request(self) -> (CharacterId, Option<ClientRequest>) {
        match self {
            ScenarioAction::SetLfg {
                character,
                slot,
                entry,
                lfg_type,
            } => (
                character,
                Some(ClientRequest::SetLfg {
                    slot,
                    lfg: LfgSlot::new(entry, lfg_type),
                }),
            ),
            ScenarioAction::ClearLfg { character } => (character, Some(ClientRequest::ClearLfg)),
            ScenarioAction::SetLfm {
                character,
                entry,
                lfg_type,
            } => (
                character,
                Some(ClientRequest::SetLfm {
                    more: LfgSlot::new(entry, lfg_type),
                }),
            ),
            ScenarioAction::ClearLfm { character } => (character, Some(ClientRequest::ClearLfm)),
            ScenarioAction::SetComment { character, comment } => {
                (character, Some(ClientRequest::SetComment { comment }))
            }
            ScenarioAction::SetAutoJoin { character } => {
                (character, Some(ClientRequest::SetAutoJoin))
            }
            ScenarioAction::ClearAutoJoin { character } => {
                (character, Some(ClientRequest::ClearAutoJoin))
            }
            ScenarioAction::SetAutoFill { character } => {
                (character, Some(ClientRequest::SetAutoFill))
            }
            ScenarioAction::ClearAutoFill { character } => {
                (character, Some(ClientRequest::ClearAutoFill))
            }
            ScenarioAction::ListQuery {
                character,
                entry,
                lfg_type,
            } => (
                character,
                Some(ClientRequest::ListQuery {
                    lfg_type,
                    entry,
                    unk: 0,
                }),
            ),
            ScenarioAction::Logout { character } => (character, None),
        }
    }
}

/// A complete scenario file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// Overrides the configured LFG settings when present
    #[serde(default)]
    pub lfg: Option<LfgSettings>,
    #[serde(default)]
    pub characters: Vec<ScenarioCharacter>,
    #[serde(default)]
    pub actions: Vec<ScenarioAction>,
}

/// A group as it stands after the replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub leader: CharacterId,
    pub members: Vec<CharacterId>,
}

/// A listing returned during the replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingSummary {
    pub requester: CharacterId,
    pub entry: u32,
    pub lfg_type: u32,
    pub displayed: u32,
    pub found: u32,
}

/// Observable result of a replay
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioReport {
    /// Groups ordered by leader id
    pub groups: Vec<GroupSummary>,
    pub channel_removals: Vec<CharacterId>,
    pub listings: Vec<ListingSummary>,
}

impl Scenario {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| {
            MatchmakingError::ScenarioError {
                message: format!("Invalid scenario: {}", e),
            }
            .into()
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    /// Settings in effect for the replay, checked like any loaded configuration
    pub fn effective_config(&self, config: &AppConfig) -> Result<AppConfig> {
        let effective = AppConfig {
            lfg: self.lfg.clone().unwrap_or_else(|| config.lfg.clone()),
            ..config.clone()
        };
        validate_config(&effective)?;
        Ok(effective)
    }

    /// Replay against fresh in-memory collaborators
    pub fn run(&self, config: &AppConfig) -> Result<ScenarioReport> {
        let settings = self.effective_config(config)?.lfg;
        let channels = InMemoryChannelService::new();
        let world = World::in_memory(settings.max_group_size, channels.clone());
        let metrics = Arc::new(MetricsCollector::new()?);
        let service = LfgService::new(
            world,
            Arc::new(StaticTalentStore::synthetic()),
            &settings,
            metrics,
        );

        for character in &self.characters {
            if character.in_lfg_channel {
                channels.join_lfg_channel(character.id);
            }
            service.login(character.build())?;
        }
        info!(
            "Replaying {} actions for {} characters",
            self.actions.len(),
            self.characters.len()
        );

        let mut report = ScenarioReport::default();
        for (step, action) in self.actions.iter().cloned().enumerate() {
            let (character, request) = action.into_request();
            let Some(request) = request else {
                service.logout(character)?;
                continue;
            };

            let replies = service.handle(character, request).map_err(|e| {
                MatchmakingError::ScenarioError {
                    message: format!("Action {} failed: {}", step + 1, e),
                }
            })?;

            for reply in replies {
                if let ServerMessage::Listing(listing) = reply {
                    report.listings.push(ListingSummary {
                        requester: character,
                        entry: listing.entry,
                        lfg_type: listing.lfg_type,
                        displayed: listing.displayed,
                        found: listing.found,
                    });
                }
            }
        }

        report.groups = service.with_world(|world| {
            let ids: BTreeSet<_> = world
                .players
                .online()
                .into_iter()
                .filter_map(|id| world.players.get(id)?.group)
                .collect();

            let mut groups: Vec<_> = ids
                .into_iter()
                .filter_map(|id| world.groups.get(id))
                .map(|group| GroupSummary {
                    leader: group.leader(),
                    members: group.members().iter().map(|m| m.id).collect(),
                })
                .collect();
            groups.sort_by_key(|group| group.leader);
            groups
        })?;
        report.channel_removals = channels.removals();

        Ok(report)
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Groups: {}", self.groups.len())?;
        for group in &self.groups {
            writeln!(f, "  leader {} members {:?}", group.leader, group.members)?;
        }
        writeln!(f, "Channel removals: {:?}", self.channel_removals)?;
        for listing in &self.listings {
            writeln!(
                f,
                "Listing for {} (entry {}, type {}): {} shown of {}",
                listing.requester, listing.entry, listing.lfg_type, listing.displayed, listing.found
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TANK_AND_HEALER: &str = r#"
        [lfg]
        channel_restricted = true

        [[characters]]
        id = 1
        name = "Brom"
        class = "warrior"
        talents = [5, 0, 31]

        [[characters]]
        id = 2
        name = "Ilya"
        class = "priest"
        talents = [11, 31, 0]

        [[actions]]
        action = "set_auto_fill"
        character = 2

        [[actions]]
        action = "set_lfm"
        character = 2
        entry = 5
        lfg_type = 1

        [[actions]]
        action = "set_auto_join"
        character = 1

        [[actions]]
        action = "set_lfg"
        character = 1
        slot = 0
        entry = 5
        lfg_type = 1
    "#;

    #[test]
    fn test_tank_and_healer_scenario() {
        let scenario = Scenario::from_toml_str(TANK_AND_HEALER).unwrap();
        let report = scenario.run(&AppConfig::default()).unwrap();

        assert_eq!(
            report.groups,
            vec![GroupSummary {
                leader: 2,
                members: vec![2, 1]
            }]
        );
        assert_eq!(report.channel_removals, vec![1]);
        assert_eq!(report.listings.len(), 2);
        assert!(report.to_string().contains("leader 2"));
    }

    #[test]
    fn test_invalid_lfg_override_is_rejected() {
        let raw = r#"
            [lfg]
            max_group_size = 1
            listing_display_limit = 0

            [[characters]]
            id = 2
            name = "Ilya"
            class = "priest"

            [[actions]]
            action = "set_auto_fill"
            character = 2
        "#;
        let scenario = Scenario::from_toml_str(raw).unwrap();
        let err = scenario.run(&AppConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_override_replaces_only_lfg_settings() {
        let scenario = Scenario::from_toml_str(TANK_AND_HEALER).unwrap();
        let mut config = AppConfig::default();
        config.service.name = "replay".to_string();

        let effective = scenario.effective_config(&config).unwrap();
        assert!(effective.lfg.channel_restricted);
        assert_eq!(effective.service.name, "replay");
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let raw = r#"
            [[actions]]
            action = "dance"
            character = 1
        "#;
        assert!(Scenario::from_toml_str(raw).is_err());
    }

    #[test]
    fn test_action_for_missing_character_fails() {
        let raw = r#"
            [[actions]]
            action = "clear_lfg"
            character = 9
        "#;
        let scenario = Scenario::from_toml_str(raw).unwrap();
        let err = scenario.run(&AppConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::ScenarioError { .. })
        ));
    }
}
