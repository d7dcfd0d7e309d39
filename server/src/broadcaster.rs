//! Round result fan-out to every connected participant

use crate::error::{RoundError, SendError};
use crate::registry::ConnectionRegistry;
use futures::future::join_all;
use log::{debug, warn};
use shared::{ParticipantId, RoundResult};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one broadcast.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    /// Participants whose queue accepted the payload
    pub delivered: Vec<ParticipantId>,
    /// Participants that could not be written to and must be dropped
    pub failed: Vec<(ParticipantId, SendError)>,
}

impl BroadcastReport {
    pub fn failed_ids(&self) -> Vec<ParticipantId> {
        self.failed.iter().map(|(id, _)| *id).collect()
    }
}

/// Sends a payload to every handle the registry yields from `for_each`.
///
/// All sends run concurrently and each is bounded by `send_timeout`, so one
/// slow peer delays the broadcast by at most that long. Failures are
/// collected instead of returned early.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    send_timeout: Duration,
}

impl Broadcaster {
    pub fn new(send_timeout: Duration) -> Self {
        Self { send_timeout }
    }

    pub async fn broadcast(
        &self,
        registry: &ConnectionRegistry,
        payload: RoundResult,
    ) -> BroadcastReport {
        let payload = Arc::new(payload);
        let mut recipients = Vec::with_capacity(registry.len());
        registry.for_each(|id, handle| recipients.push((id, handle.clone())));

        let sends = recipients.iter().map(|(id, handle)| {
            let payload = Arc::clone(&payload);
            async move { (*id, handle.send(payload, self.send_timeout).await) }
        });

        let mut report = BroadcastReport::default();
        for (id, result) in join_all(sends).await {
            match result {
                Ok(()) => report.delivered.push(id),
                Err(e) => {
                    warn!("{}", RoundError::Send { id, source: e.clone() });
                    report.failed.push((id, e));
                }
            }
        }

        debug!(
            "Broadcast {} bytes: {} delivered, {} failed",
            payload.as_bytes().len(),
            report.delivered.len(),
            report.failed.len()
        );
        report
    }
}
