use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of submissions that make up a round.
pub const DEFAULT_EXPECTED_PLAYERS: usize = 2;

/// Connection identifier assigned by the transport.
///
/// Ids are handed out from a monotonically increasing counter and never
/// reused while the server process is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A player's submission for the current round. The server never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move(pub Vec<u8>);

impl Move {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lossy text view, used for logging.
    pub fn to_text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl From<&str> for Move {
    fn from(value: &str) -> Self {
        Move(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Move {
    fn from(value: Vec<u8>) -> Self {
        Move(value)
    }
}

/// Payload produced by a round resolver and broadcast to every player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResult(pub Vec<u8>);

impl RoundResult {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the payload as text when it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl From<&str> for RoundResult {
    fn from(value: &str) -> Self {
        RoundResult(value.as_bytes().to_vec())
    }
}

/// Every move of a completed round, as broadcast by the summary resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: u64,
    pub moves: Vec<(ParticipantId, Move)>,
}

impl RoundSummary {
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
