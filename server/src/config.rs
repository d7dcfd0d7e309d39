//! Server configuration and the choices exposed to deployers

use crate::error::ConfigError;
use crate::resolver::{RoundResolver, StaticResolver, SummaryResolver};
use clap::ValueEnum;
use shared::DEFAULT_EXPECTED_PLAYERS;
use std::time::Duration;

/// How many submissions close a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CompletionPolicy {
    /// Once a full table has gathered, every still-connected participant has
    /// moved, capped at the expected count
    #[default]
    Connected,
    /// At least the expected count has moved, regardless of departures
    Strict,
}

impl CompletionPolicy {
    /// Number of distinct submissions required to close the round.
    ///
    /// `armed` is set once the registry has reached `expected`. Until then
    /// both policies wait for the full count, so early joiners cannot close
    /// rounds on their own. Never returns zero: a round with no moves is
    /// never resolved.
    pub fn target(self, expected: usize, connected: usize, armed: bool) -> usize {
        match self {
            CompletionPolicy::Connected if armed => expected.min(connected).max(1),
            CompletionPolicy::Connected | CompletionPolicy::Strict => expected.max(1),
        }
    }
}

/// Which built-in resolver produces the broadcast payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResolverKind {
    /// Broadcast a fixed game state
    #[default]
    Static,
    /// Broadcast every move of the round
    Summary,
}

impl ResolverKind {
    pub fn build(self, state: &str) -> Box<dyn RoundResolver> {
        match self {
            ResolverKind::Static => Box::new(StaticResolver::new(state)),
            ResolverKind::Summary => Box::new(SummaryResolver),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to
    pub bind_addr: String,
    /// Submissions that constitute a complete round
    pub expected_players: usize,
    pub policy: CompletionPolicy,
    /// Upper bound on a single broadcast send
    pub send_timeout: Duration,
    /// Connections silent for this long are closed; None disables the check
    pub idle_timeout: Option<Duration>,
    /// Per-connection outbound queue length
    pub outbound_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            expected_players: DEFAULT_EXPECTED_PLAYERS,
            policy: CompletionPolicy::default(),
            send_timeout: Duration::from_millis(500),
            idle_timeout: Some(Duration::from_secs(60)),
            outbound_capacity: 32,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.expected_players == 0 {
            return Err(ConfigError::NoPlayers);
        }
        if self.send_timeout.is_zero() {
            return Err(ConfigError::ZeroSendTimeout);
        }
        if self.outbound_capacity == 0 {
            return Err(ConfigError::ZeroOutboundCapacity);
        }
        Ok(())
    }
}
