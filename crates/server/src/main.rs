mod config;
mod server;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use config::ServerConfig;
use server::GameServer;

#[derive(Parser)]
#[command(name = "planetoid-server")]
#[command(about = "Authoritative planetoid game server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = planetoid::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = planetoid::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = 32)]
    max_clients: usize,

    #[arg(long, default_value_t = 32, help = "Longest accepted username, in characters")]
    max_username_len: u8,

    #[arg(long = "ban", help = "Username to refuse (repeatable)")]
    banned: Vec<String>,

    #[arg(long, default_value_t = 60.0)]
    planet_radius: f32,

    #[arg(long, default_value_t = 0, help = "Number of simulated ships")]
    npcs: usize,

    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    #[arg(long, help = "Stop after this many seconds")]
    run_for_secs: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig {
        bind: args.bind,
        port: args.port,
        tick_rate: args.tick_rate,
        max_clients: args.max_clients,
        max_username_len: args.max_username_len,
        banned_usernames: args.banned,
        planet_radius: args.planet_radius,
        connection_timeout_secs: args.timeout_secs,
        npc_count: args.npcs,
        ..Default::default()
    };

    let mut server = GameServer::new(&config)?;
    log::info!("Server started on {}", server.local_addr());

    server.run(args.run_for_secs.map(Duration::from_secs));

    let stats = server.stats();
    log::info!(
        "Server shutting down ({} packets sent, {} received)",
        stats.packets_sent,
        stats.packets_received
    );
    Ok(())
}
