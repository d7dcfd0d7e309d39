//! Integration tests for the round server
//!
//! These tests boot a real server on an ephemeral port and play rounds with
//! WebSocket clients.

use futures::{SinkExt, StreamExt};
use server::config::{CompletionPolicy, ServerConfig};
use server::network::Server;
use server::resolver::{RoundResolver, StaticResolver, SummaryResolver};
use shared::RoundSummary;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Boots a server with the given round size and returns its URL.
async fn boot_server(
    expected_players: usize,
    policy: CompletionPolicy,
    resolver: Box<dyn RoundResolver>,
    idle_timeout: Option<Duration>,
) -> String {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        expected_players,
        policy,
        idle_timeout,
        ..ServerConfig::default()
    };

    let mut server = Server::new(&config, resolver)
        .await
        .expect("Failed to start server");
    let url = format!("ws://{}", server.local_addr());

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    url
}

/// Connects `count` players one after another and lets the server register them.
async fn connect_players(url: &str, count: usize) -> Vec<WsStream> {
    let mut players = Vec::new();
    for _ in 0..count {
        let (ws, _) = connect_async(url).await.expect("Failed to connect");
        players.push(ws);
    }
    sleep(Duration::from_millis(50)).await;
    players
}

/// Waits for the next data frame and returns its payload.
async fn next_payload(ws: &mut WsStream) -> Vec<u8> {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for round result")
            .expect("Stream ended")
            .expect("WebSocket error");

        if msg.is_text() || msg.is_binary() {
            return msg.into_data().to_vec();
        }
    }
}

/// ROUND LIFECYCLE TESTS
mod round_tests {
    use super::*;

    /// Three players move once each and all receive one summary of the round
    #[tokio::test]
    async fn three_player_round_is_broadcast_to_all() {
        let url = boot_server(3, CompletionPolicy::Connected, Box::new(SummaryResolver), None).await;
        let mut players = connect_players(&url, 3).await;

        for (ws, mv) in players.iter_mut().zip(["up", "down", "left"]) {
            ws.send(Message::text(mv.to_string())).await.unwrap();
        }

        for ws in players.iter_mut() {
            let summary = RoundSummary::decode(&next_payload(ws).await).unwrap();
            let mut moves: Vec<String> =
                summary.moves.iter().map(|(_, mv)| mv.to_text_lossy()).collect();
            moves.sort();

            assert_eq!(summary.round, 1);
            assert_eq!(moves, vec!["down", "left", "up"]);
        }
    }

    /// Consecutive rounds are numbered and each move only counts once
    #[tokio::test]
    async fn consecutive_rounds() {
        let url = boot_server(2, CompletionPolicy::Connected, Box::new(SummaryResolver), None).await;
        let mut players = connect_players(&url, 2).await;

        for round in 1..=3u64 {
            for ws in players.iter_mut() {
                ws.send(Message::text(format!("move-{}", round))).await.unwrap();
            }
            for ws in players.iter_mut() {
                let summary = RoundSummary::decode(&next_payload(ws).await).unwrap();
                assert_eq!(summary.round, round);
                assert_eq!(summary.moves.len(), 2);
            }
        }
    }

    /// A player who joins early waits for the rest of the table
    #[tokio::test]
    async fn early_joiner_waits_for_full_table() {
        let url = boot_server(2, CompletionPolicy::Connected, Box::new(SummaryResolver), None).await;
        let mut early = connect_players(&url, 1).await.pop().unwrap();

        early.send(Message::text("up".to_string())).await.unwrap();
        let premature = timeout(Duration::from_millis(300), early.next()).await;
        assert!(premature.is_err(), "round resolved before the table was full");

        let mut late = connect_players(&url, 1).await.pop().unwrap();
        late.send(Message::text("down".to_string())).await.unwrap();

        for ws in [&mut early, &mut late] {
            let summary = RoundSummary::decode(&next_payload(ws).await).unwrap();
            assert_eq!(summary.round, 1);
            assert_eq!(summary.moves.len(), 2);
        }
    }

    /// The static resolver's state arrives as a text frame
    #[tokio::test]
    async fn static_state_is_sent_as_text() {
        let url = boot_server(
            1,
            CompletionPolicy::Connected,
            Box::new(StaticResolver::new("new game state")),
            None,
        )
        .await;
        let mut players = connect_players(&url, 1).await;

        players[0].send(Message::binary(vec![1u8, 2, 3])).await.unwrap();

        let msg = timeout(TIMEOUT, players[0].next()).await.unwrap().unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_data().to_vec(), b"new game state".to_vec());
    }
}

/// MEMBERSHIP CHURN TESTS
mod churn_tests {
    use super::*;

    /// A player leaving without moving completes the round for the rest
    #[tokio::test]
    async fn departure_completes_round() {
        let url = boot_server(2, CompletionPolicy::Connected, Box::new(SummaryResolver), None).await;
        let mut players = connect_players(&url, 2).await;
        let mut leaver = players.pop().unwrap();
        let mut stayer = players.pop().unwrap();

        stayer.send(Message::text("up".to_string())).await.unwrap();
        sleep(Duration::from_millis(50)).await;
        leaver.close(None).await.unwrap();

        let summary = RoundSummary::decode(&next_payload(&mut stayer).await).unwrap();
        assert_eq!(summary.moves.len(), 1);
        assert_eq!(summary.moves[0].1.to_text_lossy(), "up");
    }

    /// A departed player's pending move is not part of the next round
    #[tokio::test]
    async fn departed_move_is_discarded() {
        let url = boot_server(3, CompletionPolicy::Connected, Box::new(SummaryResolver), None).await;
        let mut players = connect_players(&url, 3).await;

        players[0].send(Message::text("ghost".to_string())).await.unwrap();
        sleep(Duration::from_millis(50)).await;
        let mut leaver = players.remove(0);
        leaver.close(None).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        for ws in players.iter_mut() {
            ws.send(Message::text("real".to_string())).await.unwrap();
        }

        for ws in players.iter_mut() {
            let summary = RoundSummary::decode(&next_payload(ws).await).unwrap();
            assert_eq!(summary.moves.len(), 2);
            assert!(summary.moves.iter().all(|(_, mv)| mv.to_text_lossy() == "real"));
        }
    }

    /// Silent connections are closed by the server
    #[tokio::test]
    async fn idle_connection_is_closed() {
        let url = boot_server(
            2,
            CompletionPolicy::Connected,
            Box::new(SummaryResolver),
            Some(Duration::from_millis(200)),
        )
        .await;
        let mut players = connect_players(&url, 1).await;

        let closed = timeout(TIMEOUT, async {
            loop {
                match players[0].next().await {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        })
        .await;

        assert!(closed.is_ok(), "server did not close the idle connection");
    }
}
