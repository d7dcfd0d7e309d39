use clap::Parser;
use log::{error, info};
use server::config::{CompletionPolicy, ResolverKind, ServerConfig};
use server::network::{Server, ServerEvent};
use std::time::Duration;

/// Command line arguments for the round server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,

    /// Moves needed to complete a round
    #[clap(short = 'n', long, default_value = "2")]
    players: usize,

    /// How departures count toward completion
    #[clap(long, value_enum, default_value = "connected")]
    policy: CompletionPolicy,

    /// Game state producer
    #[clap(short, long, value_enum, default_value = "static")]
    resolver: ResolverKind,

    /// Payload broadcast by the static resolver
    #[clap(long, default_value = "new game state")]
    state: String,

    /// Per-player broadcast send timeout in milliseconds
    #[clap(long, default_value = "500")]
    send_timeout_ms: u64,

    /// Close connections silent for this many seconds (0 disables)
    #[clap(long, default_value = "60")]
    idle_timeout_secs: u64,

    /// Per-connection outbound queue length
    #[clap(long, default_value = "32")]
    outbound_capacity: usize,
}

impl Args {
    fn to_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: format!("{}:{}", self.host, self.port),
            expected_players: self.players,
            policy: self.policy,
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            idle_timeout: (self.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(self.idle_timeout_secs)),
            outbound_capacity: self.outbound_capacity,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.to_config();
    let resolver = args.resolver.build(&args.state);

    let mut server = Server::new(&config, resolver).await?;
    let shutdown = server.event_sender();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            let _ = shutdown.send(ServerEvent::Shutdown);
        }
    });

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
