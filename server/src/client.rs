//! Server-side handle to a connected player's outbound queue

use crate::error::SendError;
use shared::RoundResult;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Item consumed by a connection's writer task.
pub type Outbound = Arc<RoundResult>;

/// Writable end of a player connection.
///
/// Cloning the handle clones the queue sender and shares the close token,
/// so every clone feeds and closes the same writer task.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    addr: SocketAddr,
    sender: mpsc::Sender<Outbound>,
    closer: CancellationToken,
}

impl PlayerHandle {
    pub fn new(addr: SocketAddr, sender: mpsc::Sender<Outbound>) -> Self {
        Self {
            addr,
            sender,
            closer: CancellationToken::new(),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Queues a round result, waiting at most `limit` for queue capacity.
    pub async fn send(&self, payload: Outbound, limit: Duration) -> Result<(), SendError> {
        match timeout(limit, self.sender.send(payload)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SendError::Closed),
            Err(_) => Err(SendError::TimedOut(limit)),
        }
    }

    /// Asks the transport to close the socket.
    ///
    /// Signalled out of band, so it takes effect even when the queue is
    /// full, which is exactly the case for a peer dropped on a send timeout.
    pub fn close(&self) {
        self.closer.cancel();
    }

    pub fn is_close_requested(&self) -> bool {
        self.closer.is_cancelled()
    }

    /// Token the writer task waits on.
    pub fn close_token(&self) -> CancellationToken {
        self.closer.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
