use clap::Parser;
use log::info;
use server::game::GameConfig;
use server::network::Server;
use shared::{DEFAULT_HIT_NODES, DEFAULT_TICK_RATE};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative melee server", long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,
    /// Tick rate (updates per second)
    #[arg(short, long, default_value_t = DEFAULT_TICK_RATE)]
    tick_rate: u32,
    /// Maximum number of connected clients
    #[arg(short, long, default_value = "16")]
    max_clients: usize,
    /// Weapons every new character spawns with
    #[arg(long, default_value = "2")]
    default_weapons: usize,
    /// Hit-detection nodes per weapon
    #[arg(long, default_value_t = DEFAULT_HIT_NODES)]
    hit_nodes: usize,
    /// Ticks one swing takes
    #[arg(long, default_value = "8")]
    swing_ticks: u32,
    /// Horizontal arc of a swing, in degrees
    #[arg(long, default_value = "135")]
    swing_arc: f32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = GameConfig {
        default_weapons: args.default_weapons,
        hit_nodes: args.hit_nodes,
        swing_ticks: args.swing_ticks.max(1),
        swing_arc: args.swing_arc.to_radians(),
        ..GameConfig::default()
    };

    let tick_duration = Duration::from_secs_f64(1.0 / args.tick_rate.max(1) as f64);
    let address = format!("{}:{}", args.host, args.port);

    info!(
        "Starting server on {} at {}Hz ({} weapons x {} hit nodes per player)",
        address, args.tick_rate, config.default_weapons, config.hit_nodes
    );

    let mut server = Server::new(&address, tick_duration, args.max_clients, config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
    }

    Ok(())
}
