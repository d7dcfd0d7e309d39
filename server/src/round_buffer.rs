//! Pending moves for the round in progress

use crate::error::RoundError;
use crate::registry::ConnectionRegistry;
use log::debug;
use shared::{Move, ParticipantId};
use std::collections::BTreeMap;

/// Holds at most one move per connected participant.
///
/// Moves are keyed by id in a `BTreeMap` so the drained round is handed to
/// the resolver in a stable order.
#[derive(Debug, Default)]
pub struct RoundBuffer {
    moves: BTreeMap<ParticipantId, Move>,
}

impl RoundBuffer {
    pub fn new() -> Self {
        Self {
            moves: BTreeMap::new(),
        }
    }

    /// Records `mv` for `id`, replacing any move it already submitted this
    /// round. Submissions from ids the registry does not know are refused.
    pub fn submit(
        &mut self,
        registry: &ConnectionRegistry,
        id: ParticipantId,
        mv: Move,
    ) -> Result<(), RoundError> {
        if !registry.contains(id) {
            return Err(RoundError::StaleSubmission(id));
        }

        if let Some(previous) = self.moves.insert(id, mv) {
            debug!(
                "Participant {} replaced pending move {:?}",
                id,
                previous.to_text_lossy()
            );
        }
        Ok(())
    }

    /// Forgets the pending move of `id`, if any.
    pub fn purge(&mut self, id: ParticipantId) -> Option<Move> {
        self.moves.remove(&id)
    }

    /// True once at least `target` distinct participants have moved.
    pub fn is_complete(&self, target: usize) -> bool {
        self.moves.len() >= target
    }

    /// Takes every pending move, leaving the buffer empty.
    pub fn drain_all(&mut self) -> BTreeMap<ParticipantId, Move> {
        std::mem::take(&mut self.moves)
    }

    pub fn pending(&self) -> &BTreeMap<ParticipantId, Move> {
        &self.moves
    }

    pub fn has_moved(&self, id: ParticipantId) -> bool {
        self.moves.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}
