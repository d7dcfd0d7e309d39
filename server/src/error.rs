//! Error types for the round coordination core and its transport

use shared::ParticipantId;
use std::time::Duration;
use thiserror::Error;

/// Failures raised while bookkeeping a round.
///
/// None of these are fatal to the server. They are logged and counted and
/// never forwarded to players.
#[derive(Debug, Error)]
pub enum RoundError {
    #[error("participant {0} is already registered")]
    DuplicateId(ParticipantId),

    #[error("dropping move from {0}: not a registered participant")]
    StaleSubmission(ParticipantId),

    #[error("resolver failed for round {round}: {source}")]
    Resolver {
        round: u64,
        #[source]
        source: ResolveError,
    },

    #[error("send to {id} failed: {source}")]
    Send {
        id: ParticipantId,
        #[source]
        source: SendError,
    },
}

/// Raised by a [`RoundResolver`](crate::resolver::RoundResolver).
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("round rejected: {0}")]
    Rejected(String),

    #[error("failed to encode round result: {0}")]
    Encode(#[from] bincode::Error),
}

/// Per-connection delivery failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("connection closed")]
    Closed,

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Rejected server configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("expected player count must be at least 1")]
    NoPlayers,

    #[error("send timeout must be greater than zero")]
    ZeroSendTimeout,

    #[error("outbound queue capacity must be at least 1")]
    ZeroOutboundCapacity,
}
