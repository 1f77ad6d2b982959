//! LFG advertising channel membership

use crate::types::CharacterId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Chat channel side effects triggered by matching
#[cfg_attr(test, mockall::automock)]
pub trait ChannelService: Send {
    /// Remove a character from the LFG advertising channel
    fn leave_lfg_channel(&mut self, character: CharacterId);
}

/// Channel membership kept in memory
///
/// Clones share state, so a handle kept outside the world observes removals.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChannelService {
    members: Arc<Mutex<HashSet<CharacterId>>>,
    removals: Arc<Mutex<Vec<CharacterId>>>,
}

impl InMemoryChannelService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join_lfg_channel(&self, character: CharacterId) {
        if let Ok(mut members) = self.members.lock() {
            members.insert(character);
        }
    }

    pub fn is_member(&self, character: CharacterId) -> bool {
        self.members
            .lock()
            .map(|members| members.contains(&character))
            .unwrap_or(false)
    }

    /// Every removal performed, in order
    pub fn removals(&self) -> Vec<CharacterId> {
        self.removals
            .lock()
            .map(|removals| removals.clone())
            .unwrap_or_default()
    }
}

impl ChannelService for InMemoryChannelService {
    fn leave_lfg_channel(&mut self, character: CharacterId) {
        if let Ok(mut members) = self.members.lock() {
            members.remove(&character);
        }
        if let Ok(mut removals) = self.removals.lock() {
            removals.push(character);
        }
        debug!("Character {} left the LFG channel", character);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_handle_observes_removal() {
        let handle = InMemoryChannelService::new();
        handle.join_lfg_channel(7);

        let mut service = handle.clone();
        service.leave_lfg_channel(7);

        assert!(!handle.is_member(7));
        assert_eq!(handle.removals(), vec![7]);
    }
}
