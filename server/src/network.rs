//! WebSocket transport and the event loop that drives the coordinator

use crate::broadcaster::Broadcaster;
use crate::client::{Outbound, PlayerHandle};
use crate::config::ServerConfig;
use crate::coordinator::RoundCoordinator;
use crate::resolver::RoundResolver;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{Move, ParticipantId, RoundResult};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// How long a closing writer may spend on its last frames before it is aborted
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Connection events funneled from socket tasks into the server loop.
///
/// Every connection task pushes its own events in the order it observes
/// them, so `Opened` always precedes that connection's moves.
#[derive(Debug)]
pub enum ServerEvent {
    /// The loop answers on `accepted`. A refused connection task exits
    /// without emitting `Closed`, so it cannot evict the entry that
    /// already holds its id.
    Opened {
        id: ParticipantId,
        handle: PlayerHandle,
        accepted: oneshot::Sender<bool>,
    },
    Message {
        id: ParticipantId,
        mv: Move,
    },
    Closed {
        id: ParticipantId,
    },
    Error {
        id: ParticipantId,
        info: String,
    },
    Shutdown,
}

/// Settings each connection task needs.
#[derive(Debug, Clone, Copy)]
struct ConnectionSettings {
    outbound_capacity: usize,
    idle_timeout: Option<Duration>,
}

/// Accepts WebSocket players and runs rounds for them
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    coordinator: RoundCoordinator,
    settings: ConnectionSettings,

    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn new(
        config: &ServerConfig,
        resolver: Box<dyn RoundResolver>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        config.validate()?;

        let listener = TcpListener::bind(&config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(
            "Server listening on {} ({} players per round, {:?} policy)",
            local_addr, config.expected_players, config.policy
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            coordinator: RoundCoordinator::new(
                config.expected_players,
                config.policy,
                Broadcaster::new(config.send_timeout),
                resolver,
            ),
            settings: ConnectionSettings {
                outbound_capacity: config.outbound_capacity,
                idle_timeout: config.idle_timeout,
            },
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sender that can inject events, e.g. `ServerEvent::Shutdown`
    pub fn event_sender(&self) -> mpsc::UnboundedSender<ServerEvent> {
        self.event_tx.clone()
    }

    pub fn coordinator(&self) -> &RoundCoordinator {
        &self.coordinator
    }

    /// Spawns the task accepting TCP connections. Ids start at 1.
    fn spawn_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            warn!("Acceptor already running");
            return;
        };
        let event_tx = self.event_tx.clone();
        let settings = self.settings;

        tokio::spawn(async move {
            let mut next_id = 1u64;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let id = ParticipantId(next_id);
                        next_id += 1;

                        let event_tx = event_tx.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, addr, id, event_tx, settings).await;
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }

                if event_tx.is_closed() {
                    break;
                }
            }
        });
    }

    /// Applies one event to the coordinator. Returns false on shutdown.
    async fn dispatch(&mut self, event: ServerEvent) -> bool {
        match event {
            ServerEvent::Opened {
                id,
                handle,
                accepted,
            } => {
                let registered = self.coordinator.on_connection_opened(id, handle).is_ok();
                if accepted.send(registered).is_err() && registered {
                    // The connection task is gone and will never report Closed
                    self.coordinator.on_connection_closed(id).await;
                }
            }
            ServerEvent::Message { id, mv } => {
                // Stale submissions are logged and counted by the coordinator
                let _ = self.coordinator.on_message_received(id, mv).await;
            }
            ServerEvent::Closed { id } => {
                self.coordinator.on_connection_closed(id).await;
            }
            ServerEvent::Error { id, info } => {
                self.coordinator.on_error(id, &info).await;
            }
            ServerEvent::Shutdown => {
                info!("Server shutting down");
                return false;
            }
        }
        true
    }

    /// Main server loop. Every connection event is handled here, one at a
    /// time, which is what makes each round-finish sequence indivisible.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.spawn_acceptor();
        info!("Server started successfully");

        while let Some(event) = self.event_rx.recv().await {
            if !self.dispatch(event).await {
                break;
            }
        }

        let stats = self.coordinator.stats();
        info!(
            "Served {} rounds ({} resolver failures, {} stale moves, {} dropped connections)",
            stats.rounds_completed,
            stats.resolver_failures,
            stats.stale_submissions,
            stats.dropped_connections
        );
        Ok(())
    }
}

/// Frame used for a round result: text when the payload is UTF-8.
fn round_frame(result: &RoundResult) -> Message {
    match result.as_text() {
        Some(text) => Message::text(text.to_string()),
        None => Message::binary(result.as_bytes().to_vec()),
    }
}

/// Drives one socket: handshake, writer task, then the read loop.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    id: ParticipantId,
    event_tx: mpsc::UnboundedSender<ServerEvent>,
    settings: ConnectionSettings,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    let (mut sink, mut source) = ws.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Outbound>(settings.outbound_capacity);
    let handle = PlayerHandle::new(addr, out_tx);
    let closer = handle.close_token();

    let (accepted_tx, accepted_rx) = oneshot::channel();
    let opened = ServerEvent::Opened {
        id,
        handle,
        accepted: accepted_tx,
    };
    if event_tx.send(opened).is_err() {
        return;
    }
    if !matches!(accepted_rx.await, Ok(true)) {
        warn!("Connection {} from {} refused", id, addr);
        let _ = timeout(CLOSE_GRACE, sink.send(Message::Close(None))).await;
        return;
    }

    let writer_closer = closer.clone();
    let mut writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_closer.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                out = out_rx.recv() => match out {
                    Some(result) => {
                        if let Err(e) = sink.send(round_frame(&result)).await {
                            debug!("Write to {} failed: {}", id, e);
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        let _ = sink.close().await;
    });

    let mut writer_done = false;
    let last_event = loop {
        let next = tokio::select! {
            _ = &mut writer => {
                writer_done = true;
                break ServerEvent::Closed { id };
            }
            _ = closer.cancelled() => break ServerEvent::Closed { id },
            next = read_next(&mut source, settings.idle_timeout) => next,
        };

        match next {
            ReadOutcome::Frame(msg) if msg.is_text() || msg.is_binary() => {
                let mv = Move(msg.into_data().to_vec());
                if event_tx.send(ServerEvent::Message { id, mv }).is_err() {
                    break ServerEvent::Closed { id };
                }
            }
            ReadOutcome::Frame(Message::Close(_)) | ReadOutcome::Ended => {
                break ServerEvent::Closed { id };
            }
            ReadOutcome::Frame(_) => {}
            ReadOutcome::Idle(limit) => {
                info!("Participant {} idle for {:?}, closing", id, limit);
                break ServerEvent::Closed { id };
            }
            ReadOutcome::Failed(info) => {
                break ServerEvent::Error { id, info };
            }
        }
    };

    let _ = event_tx.send(last_event);

    // A writer stuck on a peer that stopped reading is aborted, which drops
    // the socket
    closer.cancel();
    if !writer_done && timeout(CLOSE_GRACE, &mut writer).await.is_err() {
        debug!("Writer for {} did not finish closing, aborting", id);
        writer.abort();
    }
}

enum ReadOutcome {
    Frame(Message),
    Ended,
    Idle(Duration),
    Failed(String),
}

async fn read_next<S>(source: &mut S, idle_timeout: Option<Duration>) -> ReadOutcome
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let next = match idle_timeout {
        Some(limit) => match timeout(limit, source.next()).await {
            Ok(next) => next,
            Err(_) => return ReadOutcome::Idle(limit),
        },
        None => source.next().await,
    };

    match next {
        Some(Ok(msg)) => ReadOutcome::Frame(msg),
        Some(Err(e)) => ReadOutcome::Failed(e.to_string()),
        None => ReadOutcome::Ended,
    }
}
