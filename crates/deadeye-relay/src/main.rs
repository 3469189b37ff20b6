use clap::Parser;
use tracing_subscriber::EnvFilter;

use deadeye_relay::{RelayConfig, build_app};

#[derive(Debug, Parser)]
#[command(name = "deadeye-relay", about = "Lobby relay for Deadeye multiplayer sync")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value_t = 8081)]
    port: u16,

    #[arg(long, default_value_t = 100)]
    max_lobbies: usize,

    /// Frames a peer may burst before rate limiting kicks in.
    #[arg(long, default_value_t = 100.0)]
    burst: f64,

    /// Sustained frames per second allowed per peer.
    #[arg(long, default_value_t = 100.0)]
    rate: f64,

    /// Frames buffered per peer before the relay starts dropping.
    #[arg(long, default_value_t = 256)]
    queue: usize,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = RelayConfig {
        max_lobbies: args.max_lobbies,
        burst: args.burst,
        refill_per_sec: args.rate,
        peer_queue_capacity: args.queue,
    };
    let (app, _state) = build_app(config);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, max_lobbies = config.max_lobbies, "Deadeye relay listening");

    axum::serve(listener, app).await
}
