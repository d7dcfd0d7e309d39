//! Pluggable game rules
//!
//! The coordinator knows nothing about the game being played. When a round is
//! complete it hands every pending move to a [`RoundResolver`] and broadcasts
//! whatever payload comes back.

use crate::error::ResolveError;
use shared::{Move, ParticipantId, RoundResult, RoundSummary};
use std::collections::BTreeMap;

/// Turns a completed round's moves into the payload sent to every player.
pub trait RoundResolver: Send + Sync {
    fn resolve(
        &self,
        round: u64,
        moves: &BTreeMap<ParticipantId, Move>,
    ) -> Result<RoundResult, ResolveError>;
}

impl<F> RoundResolver for F
where
    F: Fn(u64, &BTreeMap<ParticipantId, Move>) -> Result<RoundResult, ResolveError> + Send + Sync,
{
    fn resolve(
        &self,
        round: u64,
        moves: &BTreeMap<ParticipantId, Move>,
    ) -> Result<RoundResult, ResolveError> {
        self(round, moves)
    }
}

/// Broadcasts the same state after every round.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    state: RoundResult,
}

impl StaticResolver {
    pub fn new(state: impl Into<Vec<u8>>) -> Self {
        Self {
            state: RoundResult(state.into()),
        }
    }
}

impl RoundResolver for StaticResolver {
    fn resolve(
        &self,
        _round: u64,
        _moves: &BTreeMap<ParticipantId, Move>,
    ) -> Result<RoundResult, ResolveError> {
        Ok(self.state.clone())
    }
}

/// Broadcasts a bincode-encoded [`RoundSummary`] listing every move.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryResolver;

impl RoundResolver for SummaryResolver {
    fn resolve(
        &self,
        round: u64,
        moves: &BTreeMap<ParticipantId, Move>,
    ) -> Result<RoundResult, ResolveError> {
        let summary = RoundSummary {
            round,
            moves: moves.iter().map(|(id, mv)| (*id, mv.clone())).collect(),
        };
        Ok(RoundResult(summary.encode()?))
    }
}
