//! Connected participant bookkeeping
//!
//! The registry is the source of truth for who is in the game. A participant
//! is present exactly while its connection is open and writable; the round
//! buffer and the broadcaster both consult it for membership.

use crate::client::PlayerHandle;
use crate::error::RoundError;
use log::{debug, info};
use shared::ParticipantId;
use std::collections::HashMap;

/// Maps connection ids to the handles used to write to them.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    players: HashMap<ParticipantId, PlayerHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Adds a participant.
    ///
    /// Fails with [`RoundError::DuplicateId`] if the id is already present,
    /// leaving the existing entry untouched.
    pub fn register(&mut self, id: ParticipantId, handle: PlayerHandle) -> Result<(), RoundError> {
        if self.players.contains_key(&id) {
            return Err(RoundError::DuplicateId(id));
        }

        info!("Participant {} connected from {}", id, handle.addr());
        self.players.insert(id, handle);
        Ok(())
    }

    /// Removes a participant. Returns None if it was already gone, which is
    /// expected when a disconnect races with an earlier removal.
    pub fn unregister(&mut self, id: ParticipantId) -> Option<PlayerHandle> {
        let removed = self.players.remove(&id);
        match &removed {
            Some(_) => info!("Participant {} disconnected", id),
            None => debug!("Participant {} already unregistered", id),
        }
        removed
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn get(&self, id: ParticipantId) -> Option<&PlayerHandle> {
        self.players.get(&id)
    }

    /// Copies the current membership, ordered by id.
    pub fn snapshot(&self) -> Vec<(ParticipantId, PlayerHandle)> {
        let mut members: Vec<_> = self
            .players
            .iter()
            .map(|(id, handle)| (*id, handle.clone()))
            .collect();
        members.sort_by_key(|(id, _)| *id);
        members
    }

    /// Applies `f` to every handle registered at the time of the call.
    pub fn for_each(&self, mut f: impl FnMut(ParticipantId, &PlayerHandle)) {
        for (id, handle) in self.snapshot() {
            f(id, &handle);
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
