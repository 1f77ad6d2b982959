//! Per-character LFG request handling
//!
//! Every request runs to completion while holding the world lock, including
//! any matching attempt it triggers and the listing it replies with.

use crate::config::LfgSettings;
use crate::error::{MatchmakingError, Result};
use crate::matching::{CompatibilityEvaluator, MatchEngine, MatchOutcome};
use crate::metrics::MetricsCollector;
use crate::protocol::{ClientRequest, ListingProtocol, RequestKind, ServerMessage};
use crate::talent::{TalentRoleClassifier, TalentStore};
use crate::types::{AutoFlags, Character, CharacterId, LookingForGroup, MAX_LFG_SLOTS};
use crate::world::World;
use bytes::Bytes;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Front door of the LFG subsystem
pub struct LfgService {
    world: Mutex<World>,
    engine: MatchEngine,
    listing: ListingProtocol,
    metrics: Arc<MetricsCollector>,
}

impl LfgService {
    pub fn new(
        world: World,
        talents: Arc<dyn TalentStore>,
        settings: &LfgSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let evaluator = CompatibilityEvaluator::new(TalentRoleClassifier::new(talents));
        let engine = MatchEngine::new(evaluator, settings.clone(), metrics.clone());
        let listing = ListingProtocol::new(settings.listing_display_limit, metrics.clone());

        Self {
            world: Mutex::new(world),
            engine,
            listing,
            metrics,
        }
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    fn lock(&self) -> Result<MutexGuard<'_, World>> {
        self.world.lock().map_err(|_| {
            MatchmakingError::InternalError {
                message: "World lock poisoned".to_string(),
            }
            .into()
        })
    }

    /// Run `f` against the world under the lock
    pub fn with_world<R>(&self, f: impl FnOnce(&World) -> R) -> Result<R> {
        let world = self.lock()?;
        Ok(f(&world))
    }

    /// Bring a character online with empty LFG state and both auto flags off
    pub fn login(&self, mut character: Character) -> Result<()> {
        character.lfg = LookingForGroup::default();
        character.auto = AutoFlags::default();

        let mut world = self.lock()?;
        if world.players.login(character).is_some() {
            debug!("Replaced an existing session record on login");
        }
        self.metrics.update_online_characters(world.players.len());
        Ok(())
    }

    /// Take a character offline; its LFG state goes with it
    pub fn logout(&self, id: CharacterId) -> Result<Option<Character>> {
        let mut world = self.lock()?;
        let removed = world.players.logout(id);
        self.metrics.update_online_characters(world.players.len());
        Ok(removed)
    }

    /// Decode a raw request body and handle it
    pub fn handle_raw(
        &self,
        character: CharacterId,
        kind: RequestKind,
        body: impl Into<Bytes>,
    ) -> Result<Vec<ServerMessage>> {
        let request = ClientRequest::decode(kind, body)?;
        self.handle(character, request)
    }

    /// Apply a request from `character` and return the messages for it
    pub fn handle(
        &self,
        character: CharacterId,
        request: ClientRequest,
    ) -> Result<Vec<ServerMessage>> {
        let mut guard = self.lock()?;
        let world = &mut *guard;

        if world.players.get(character).is_none() {
            return Err(MatchmakingError::PlayerNotFound {
                character_id: character,
            }
            .into());
        }

        debug!("Handling {} from character {}", request, character);
        self.metrics.record_request(request.kind().label());

        let mut replies = Vec::new();
        match request {
            ClientRequest::SetLfg { slot, lfg } => {
                let Some(index) = usize::try_from(slot).ok().filter(|&i| i < MAX_LFG_SLOTS) else {
                    debug!("Ignoring LFG slot {} from character {}", slot, character);
                    return Ok(replies);
                };

                let auto_join = {
                    let seeker = Self::character_mut(world, character)?;
                    seeker.lfg.slots[index] = lfg;
                    seeker.auto.auto_join
                };
                if auto_join {
                    self.log_outcome(character, self.engine.attempt_join(world, character));
                }

                replies.push(self.listing_reply(world, character, lfg.entry, lfg.lfg_type)?);
                replies.push(Self::update_lfg(world, character)?);
            }
            ClientRequest::ClearLfg => {
                Self::character_mut(world, character)?.lfg.clear_slots();
                self.engine.leave_channel_if_restricted(world, character);
                replies.push(Self::update_lfg(world, character)?);
            }
            ClientRequest::SetLfm { more } => {
                let auto_add = {
                    let advertiser = Self::character_mut(world, character)?;
                    advertiser.lfg.more = more;
                    advertiser.auto.auto_add
                };
                if auto_add {
                    self.log_outcome(character, self.engine.attempt_add_more(world, character));
                }

                replies.push(self.listing_reply(world, character, more.entry, more.lfg_type)?);
                replies.push(ServerMessage::update_lfm(more));
            }
            ClientRequest::ClearLfm => {
                let advertiser = Self::character_mut(world, character)?;
                advertiser.lfg.more.clear();
                replies.push(ServerMessage::update_lfm(advertiser.lfg.more));
            }
            ClientRequest::SetComment { comment } => {
                Self::character_mut(world, character)?.lfg.comment = comment;
            }
            ClientRequest::SetAutoJoin => {
                Self::character_mut(world, character)?.auto.auto_join = true;
                self.log_outcome(character, self.engine.attempt_join(world, character));
            }
            ClientRequest::ClearAutoJoin => {
                Self::character_mut(world, character)?.auto.auto_join = false;
            }
            ClientRequest::SetAutoFill => {
                Self::character_mut(world, character)?.auto.auto_add = true;
                self.log_outcome(character, self.engine.attempt_add_more(world, character));
            }
            ClientRequest::ClearAutoFill => {
                Self::character_mut(world, character)?.auto.auto_add = false;
            }
            ClientRequest::ListQuery {
                lfg_type,
                entry,
                unk,
            } => {
                debug!(
                    "List query from {}: type {}, entry {}, unk {}",
                    character, lfg_type, entry, unk
                );
                let auto = Self::character_mut(world, character)?.auto;
                if auto.auto_add {
                    self.log_outcome(character, self.engine.attempt_add_more(world, character));
                }
                if auto.auto_join {
                    self.log_outcome(character, self.engine.attempt_join(world, character));
                }

                replies.push(self.listing_reply(world, character, entry, lfg_type)?);
            }
        }

        Ok(replies)
    }

    fn character_mut(world: &mut World, id: CharacterId) -> Result<&mut Character> {
        world
            .players
            .get_mut(id)
            .ok_or_else(|| MatchmakingError::PlayerNotFound { character_id: id }.into())
    }

    fn listing_reply(
        &self,
        world: &World,
        requester: CharacterId,
        entry: u32,
        lfg_type: u32,
    ) -> Result<ServerMessage> {
        let listing = self.listing.build(world, requester, entry, lfg_type)?;
        Ok(ServerMessage::Listing(listing))
    }

    fn update_lfg(world: &World, id: CharacterId) -> Result<ServerMessage> {
        let character = world
            .players
            .get(id)
            .ok_or(MatchmakingError::PlayerNotFound { character_id: id })?;
        Ok(ServerMessage::UpdateLfg {
            slots: character.lfg.slots,
        })
    }

    fn log_outcome(&self, character: CharacterId, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::Joined { group, leader } => {
                info!("Character {} matched into group {} of {}", character, group, leader)
            }
            MatchOutcome::Filled { group, added } => {
                info!("Character {} filled group {} with {:?}", character, group, added)
            }
            other => debug!("Matching for {} ended: {}", character, other.label()),
        }
    }
}

impl std::fmt::Debug for LfgService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LfgService")
            .field("engine", &self.engine)
            .field("listing", &self.listing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::talent::StaticTalentStore;
    use crate::types::{Class, LfgSlot, LfgType, Team};
    use crate::world::InMemoryChannelService;

    const DUNGEON: LfgSlot = LfgSlot {
        entry: 5,
        lfg_type: LfgType::Dungeon as u32,
    };

    fn service(channels: InMemoryChannelService, restricted: bool) -> LfgService {
        let settings = LfgSettings {
            channel_restricted: restricted,
            ..LfgSettings::default()
        };
        LfgService::new(
            World::in_memory(settings.max_group_size, channels),
            Arc::new(StaticTalentStore::synthetic()),
            &settings,
            Arc::new(MetricsCollector::new().unwrap()),
        )
    }

    fn specced(id: CharacterId, class: Class, tree: usize) -> Character {
        let mut character = Character::new(id, format!("char{}", id), class, 60, Team::Alliance);
        character
            .spells
            .extend(StaticTalentStore::synthetic_spells(class, tree, 31));
        character
    }

    #[test]
    fn test_login_resets_lfg_state() {
        let service = service(InMemoryChannelService::new(), false);
        let mut character = specced(1, Class::Warrior, 2);
        character.lfg.more = DUNGEON;
        character.auto.auto_add = true;
        service.login(character).unwrap();

        let (lfg, auto) = service
            .with_world(|world| {
                let c = world.players.get(1).unwrap();
                (c.lfg.clone(), c.auto)
            })
            .unwrap();
        assert_eq!(lfg, LookingForGroup::default());
        assert_eq!(auto, AutoFlags::default());
    }

    #[test]
    fn test_unknown_character_is_rejected() {
        let service = service(InMemoryChannelService::new(), false);
        let err = service.handle(42, ClientRequest::ClearLfg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::PlayerNotFound { character_id: 42 })
        ));
    }

    #[test]
    fn test_out_of_range_slot_is_ignored() {
        let service = service(InMemoryChannelService::new(), false);
        service.login(specced(1, Class::Warrior, 2)).unwrap();

        let replies = service
            .handle(1, ClientRequest::SetLfg { slot: 3, lfg: DUNGEON })
            .unwrap();
        assert!(replies.is_empty());
        let lfg = service
            .with_world(|world| world.players.get(1).unwrap().lfg.clone())
            .unwrap();
        assert_eq!(lfg, LookingForGroup::default());
    }

    #[test]
    fn test_set_lfg_replies_with_listing_and_update() {
        let service = service(InMemoryChannelService::new(), false);
        service.login(specced(1, Class::Warrior, 2)).unwrap();

        let replies = service
            .handle(1, ClientRequest::SetLfg { slot: 0, lfg: DUNGEON })
            .unwrap();
        assert_eq!(replies.len(), 2);
        let ServerMessage::Listing(listing) = &replies[0] else {
            panic!("expected a listing first");
        };
        assert_eq!((listing.entry, listing.lfg_type), (5, 1));
        assert_eq!(listing.found, 1);
        assert_eq!(
            replies[1],
            ServerMessage::UpdateLfg {
                slots: [DUNGEON, LfgSlot::default(), LfgSlot::default()]
            }
        );
    }

    #[test]
    fn test_auto_join_flow_forms_group() {
        let channels = InMemoryChannelService::new();
        channels.join_lfg_channel(1);
        let service = service(channels.clone(), true);
        service.login(specced(1, Class::Warrior, 2)).unwrap();
        service.login(specced(2, Class::Priest, 1)).unwrap();

        service.handle(2, ClientRequest::SetAutoFill).unwrap();
        service.handle(2, ClientRequest::SetLfm { more: DUNGEON }).unwrap();
        service.handle(1, ClientRequest::SetAutoJoin).unwrap();
        service
            .handle(1, ClientRequest::SetLfg { slot: 0, lfg: DUNGEON })
            .unwrap();

        let (warrior_group, priest_group) = service
            .with_world(|world| {
                (
                    world.players.get(1).unwrap().group,
                    world.players.get(2).unwrap().group,
                )
            })
            .unwrap();
        assert!(warrior_group.is_some());
        assert_eq!(warrior_group, priest_group);
        assert!(!channels.is_member(1));
    }

    #[test]
    fn test_clear_requests() {
        let channels = InMemoryChannelService::new();
        channels.join_lfg_channel(1);
        let service = service(channels.clone(), true);
        service.login(specced(1, Class::Mage, 0)).unwrap();

        service
            .handle(1, ClientRequest::SetLfg { slot: 2, lfg: DUNGEON })
            .unwrap();
        service.handle(1, ClientRequest::SetLfm { more: DUNGEON }).unwrap();

        let replies = service.handle(1, ClientRequest::ClearLfg).unwrap();
        assert_eq!(
            replies,
            vec![ServerMessage::UpdateLfg {
                slots: [LfgSlot::default(); MAX_LFG_SLOTS]
            }]
        );
        assert!(!channels.is_member(1));

        let replies = service.handle(1, ClientRequest::ClearLfm).unwrap();
        assert_eq!(replies, vec![ServerMessage::UpdateLfm { more: None }]);
    }

    #[test]
    fn test_comment_and_flag_toggles() {
        let service = service(InMemoryChannelService::new(), false);
        service.login(specced(1, Class::Rogue, 0)).unwrap();

        let replies = service
            .handle(
                1,
                ClientRequest::SetComment {
                    comment: "lf tank".to_string(),
                },
            )
            .unwrap();
        assert!(replies.is_empty());

        service.handle(1, ClientRequest::SetAutoJoin).unwrap();
        service.handle(1, ClientRequest::SetAutoFill).unwrap();
        service.handle(1, ClientRequest::ClearAutoJoin).unwrap();

        let character = service
            .with_world(|world| world.players.get(1).unwrap().clone())
            .unwrap();
        assert_eq!(character.lfg.comment, "lf tank");
        assert!(!character.auto.auto_join);
        assert!(character.auto.auto_add);
    }

    #[test]
    fn test_raw_list_query() {
        let service = service(InMemoryChannelService::new(), false);
        service.login(specced(1, Class::Rogue, 0)).unwrap();

        let body: Vec<u8> = [1u32, 5, 0].iter().flat_map(|w| w.to_le_bytes()).collect();
        let replies = service.handle_raw(1, RequestKind::ListQuery, body).unwrap();
        assert!(matches!(
            &replies[..],
            [ServerMessage::Listing(listing)] if listing.found == 0
        ));

        assert!(service
            .handle_raw(1, RequestKind::ListQuery, vec![1u8])
            .is_err());
    }

    #[test]
    fn test_logout_removes_character() {
        let service = service(InMemoryChannelService::new(), false);
        service.login(specced(1, Class::Rogue, 0)).unwrap();

        assert!(service.logout(1).unwrap().is_some());
        assert!(service.logout(1).unwrap().is_none());
        assert!(service.handle(1, ClientRequest::ClearLfm).is_err());
    }
}
