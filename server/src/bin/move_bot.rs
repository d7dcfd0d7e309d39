//! Scripted WebSocket player for exercising a running server by hand

use clap::Parser;
use futures::{SinkExt, StreamExt};
use log::{info, warn};
use shared::RoundSummary;
use std::time::Duration;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server WebSocket URL
    #[clap(short, long, default_value = "ws://127.0.0.1:8080")]
    url: String,

    /// Moves to submit, one per round, cycled
    #[clap(short, long, default_values_t = vec!["up".to_string(), "down".to_string()])]
    moves: Vec<String>,

    /// Number of rounds to play
    #[clap(short, long, default_value = "5")]
    rounds: u32,

    /// Delay before each move in milliseconds
    #[clap(short, long, default_value = "250")]
    delay_ms: u64,
}

fn describe(payload: &[u8]) -> String {
    match RoundSummary::decode(payload) {
        Ok(summary) => {
            let moves: Vec<String> = summary
                .moves
                .iter()
                .map(|(id, mv)| format!("{}={}", id, mv.to_text_lossy()))
                .collect();
            format!("round {}: {}", summary.round, moves.join(" "))
        }
        Err(_) => String::from_utf8_lossy(payload).into_owned(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.moves.is_empty() {
        return Err("at least one move is required".into());
    }

    let (ws, _) = connect_async(args.url.as_str()).await?;
    info!("Connected to {}", args.url);
    let (mut sink, mut source) = ws.split();

    for round in 0..args.rounds {
        sleep(Duration::from_millis(args.delay_ms)).await;

        let mv = &args.moves[round as usize % args.moves.len()];
        info!("Sending move {:?}", mv);
        sink.send(Message::text(mv.clone())).await?;

        // Wait for the round to close
        loop {
            match source.next().await {
                Some(Ok(msg)) if msg.is_text() || msg.is_binary() => {
                    info!("Result: {}", describe(&msg.into_data()));
                    break;
                }
                Some(Ok(Message::Close(_))) | None => {
                    warn!("Server closed the connection");
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    sink.send(Message::Close(None)).await?;
    info!("Move bot finished");
    Ok(())
}
