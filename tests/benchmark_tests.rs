//! Performance benchmarks for the round coordination hot path

use server::broadcaster::Broadcaster;
use server::client::{Outbound, PlayerHandle};
use server::config::CompletionPolicy;
use server::coordinator::RoundCoordinator;
use server::resolver::{RoundResolver, StaticResolver, SummaryResolver};
use shared::{Move, ParticipantId};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

fn coordinator_with_players(
    players: u64,
    resolver: Box<dyn RoundResolver>,
) -> (RoundCoordinator, Vec<mpsc::Receiver<Outbound>>) {
    let mut coord = RoundCoordinator::new(
        players as usize,
        CompletionPolicy::Connected,
        Broadcaster::new(Duration::from_millis(100)),
        resolver,
    );
    let mut receivers = Vec::new();
    for id in 1..=players {
        let (tx, rx) = mpsc::channel(4);
        let handle = PlayerHandle::new("127.0.0.1:9000".parse().unwrap(), tx);
        coord.on_connection_opened(ParticipantId(id), handle).unwrap();
        receivers.push(rx);
    }
    (coord, receivers)
}

/// Benchmarks full rounds through the coordinator
#[tokio::test]
async fn benchmark_round_completion() {
    let players = 16;
    let (mut coord, mut receivers) =
        coordinator_with_players(players, Box::new(StaticResolver::new("state")));

    let rounds = 1_000;
    let start = Instant::now();

    for _ in 0..rounds {
        for id in 1..=players {
            coord
                .on_message_received(ParticipantId(id), Move::from("up"))
                .await
                .unwrap();
        }
        for rx in receivers.iter_mut() {
            while rx.try_recv().is_ok() {}
        }
    }

    let duration = start.elapsed();
    println!(
        "Round completion: {} rounds of {} players in {:?} ({:.2} μs/round)",
        rounds,
        players,
        duration,
        duration.as_micros() as f64 / rounds as f64
    );

    assert_eq!(coord.stats().rounds_completed, rounds);
    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks overwriting moves without completing a round
#[tokio::test]
async fn benchmark_move_overwrite() {
    let (mut coord, _receivers) =
        coordinator_with_players(4, Box::new(StaticResolver::new("state")));

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let mv = if i % 2 == 0 { "left" } else { "right" };
        coord
            .on_message_received(ParticipantId(1), Move::from(mv))
            .await
            .unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Move overwrite: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert_eq!(coord.buffer().len(), 1);
    assert_eq!(coord.stats().rounds_completed, 0);
    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks summary encoding for a large round
#[test]
fn benchmark_summary_resolver() {
    let moves: BTreeMap<ParticipantId, Move> = (0..64)
        .map(|id| (ParticipantId(id), Move::from("attack north-east")))
        .collect();

    let iterations = 10_000;
    let start = Instant::now();

    for round in 0..iterations {
        let _ = SummaryResolver.resolve(round, &moves).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Summary encoding: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}
