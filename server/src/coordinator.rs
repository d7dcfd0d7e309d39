//! Round barrier: collects one move per player and closes the round
//!
//! The coordinator owns the registry and the round buffer outright. It is
//! driven by one event loop, so every method takes `&mut self` and no
//! locking is needed: an event that completes a round runs the whole
//! resolve, broadcast and reset sequence before the next event is looked at.
//!
//! Completion is re-evaluated after every accepted move and after every
//! departure, since losing a player who has not moved can leave everyone
//! else waiting on a round that is already complete. Departures only lower
//! the target once the table has been full at least once; until then the
//! coordinator waits for the expected count.

use crate::broadcaster::Broadcaster;
use crate::client::PlayerHandle;
use crate::config::CompletionPolicy;
use crate::error::RoundError;
use crate::registry::ConnectionRegistry;
use crate::resolver::RoundResolver;
use crate::round_buffer::RoundBuffer;
use log::{debug, error, info, warn};
use shared::{Move, ParticipantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Collecting moves
    Waiting,
    /// Resolver and broadcast in flight
    Resolving,
}

/// Running totals for operators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundStats {
    pub rounds_completed: u64,
    pub resolver_failures: u64,
    pub stale_submissions: u64,
    pub duplicate_registrations: u64,
    pub dropped_connections: u64,
}

/// What happened when a round closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub round: u64,
    pub submissions: usize,
    /// False when the resolver failed and nothing was broadcast
    pub resolved: bool,
    pub delivered: usize,
    /// Participants removed because the broadcast could not reach them
    pub dropped: Vec<ParticipantId>,
}

pub struct RoundCoordinator {
    registry: ConnectionRegistry,
    buffer: RoundBuffer,
    broadcaster: Broadcaster,
    resolver: Box<dyn RoundResolver>,
    expected_players: usize,
    policy: CompletionPolicy,
    /// Set once the registry reaches `expected_players`, cleared when it empties
    armed: bool,
    phase: RoundPhase,
    /// Number of the round currently collecting moves, starting at 1
    round: u64,
    stats: RoundStats,
}

impl RoundCoordinator {
    pub fn new(
        expected_players: usize,
        policy: CompletionPolicy,
        broadcaster: Broadcaster,
        resolver: Box<dyn RoundResolver>,
    ) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            buffer: RoundBuffer::new(),
            broadcaster,
            resolver,
            expected_players,
            policy,
            armed: false,
            phase: RoundPhase::Waiting,
            round: 1,
            stats: RoundStats::default(),
        }
    }

    /// Registers a new connection. Round state is unaffected.
    pub fn on_connection_opened(
        &mut self,
        id: ParticipantId,
        handle: PlayerHandle,
    ) -> Result<(), RoundError> {
        self.registry.register(id, handle).map_err(|e| {
            self.stats.duplicate_registrations += 1;
            warn!("Rejecting connection: {}", e);
            e
        })?;
        self.refresh_armed();
        Ok(())
    }

    /// Buffers a move and closes the round if it was the last one needed.
    ///
    /// Moves from unknown participants are dropped and reported as
    /// [`RoundError::StaleSubmission`]. Returns the report of the round
    /// this move completed, if any.
    pub async fn on_message_received(
        &mut self,
        id: ParticipantId,
        mv: Move,
    ) -> Result<Option<RoundReport>, RoundError> {
        self.recover_interrupted_round();

        debug!("Round {}: move {:?} from {}", self.round, mv.to_text_lossy(), id);
        if let Err(e) = self.buffer.submit(&self.registry, id, mv) {
            self.stats.stale_submissions += 1;
            warn!("{}", e);
            return Err(e);
        }

        Ok(self.check_round_complete().await)
    }

    /// Forgets a departed participant and its pending move, then re-checks
    /// completion. Unknown ids are ignored.
    pub async fn on_connection_closed(&mut self, id: ParticipantId) -> Option<RoundReport> {
        self.recover_interrupted_round();

        self.registry.unregister(id);
        self.refresh_armed();
        if self.buffer.purge(id).is_some() {
            debug!("Discarded pending move of departed participant {}", id);
        }

        self.check_round_complete().await
    }

    /// Closes the failing connection and treats it as a departure.
    pub async fn on_error(&mut self, id: ParticipantId, info: &str) -> Option<RoundReport> {
        warn!("Connection error for {}: {}", id, info);
        if let Some(handle) = self.registry.get(id) {
            handle.close();
        }
        self.on_connection_closed(id).await
    }

    fn refresh_armed(&mut self) {
        if !self.armed && self.registry.len() >= self.expected_players {
            info!("All {} expected players connected", self.expected_players);
            self.armed = true;
        } else if self.armed && self.registry.is_empty() {
            debug!("Registry empty, waiting for a full table again");
            self.armed = false;
        }
    }

    fn completion_target(&self) -> usize {
        self.policy
            .target(self.expected_players, self.registry.len(), self.armed)
    }

    async fn check_round_complete(&mut self) -> Option<RoundReport> {
        if self.buffer.is_empty() || !self.buffer.is_complete(self.completion_target()) {
            return None;
        }
        Some(self.finish_round().await)
    }

    /// Resolve, broadcast, reset. The buffer is drained even when the
    /// resolver fails so the server never sticks in `Resolving`.
    async fn finish_round(&mut self) -> RoundReport {
        self.phase = RoundPhase::Resolving;
        let round = self.round;
        let submissions = self.buffer.len();
        info!(
            "Round {} complete with {} moves from {} connected players",
            round,
            submissions,
            self.registry.len()
        );

        let resolved = match self.resolver.resolve(round, self.buffer.pending()) {
            Ok(result) => Some(result),
            Err(source) => {
                self.stats.resolver_failures += 1;
                error!("{}", RoundError::Resolver { round, source });
                None
            }
        };

        let mut report = RoundReport {
            round,
            submissions,
            resolved: resolved.is_some(),
            delivered: 0,
            dropped: Vec::new(),
        };

        if let Some(result) = resolved {
            let outcome = self.broadcaster.broadcast(&self.registry, result).await;
            report.delivered = outcome.delivered.len();
            report.dropped = outcome.failed_ids();
        }

        self.buffer.drain_all();

        for id in &report.dropped {
            if let Some(handle) = self.registry.unregister(*id) {
                handle.close();
                self.stats.dropped_connections += 1;
            }
        }
        self.refresh_armed();

        self.round += 1;
        self.stats.rounds_completed += 1;
        self.phase = RoundPhase::Waiting;

        info!(
            "Round {} finished: delivered to {}, dropped {}, {} rounds total",
            round,
            report.delivered,
            report.dropped.len(),
            self.stats.rounds_completed
        );
        report
    }

    /// A round-finish future that was cancelled mid-broadcast leaves the
    /// phase at `Resolving`. Discard that round instead of wedging.
    fn recover_interrupted_round(&mut self) {
        if self.phase == RoundPhase::Resolving {
            let discarded = self.buffer.drain_all();
            warn!(
                "Round {} was interrupted; discarding {} pending moves",
                self.round,
                discarded.len()
            );
            self.round += 1;
            self.phase = RoundPhase::Waiting;
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn stats(&self) -> RoundStats {
        self.stats
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn buffer(&self) -> &RoundBuffer {
        &self.buffer
    }
}
