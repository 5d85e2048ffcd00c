mod bot;
mod config;

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use bot::Bot;
use config::ClientConfig;

#[derive(Parser)]
#[command(name = "planetoid-client")]
#[command(about = "Headless planetoid client that flies a scripted patrol")]
struct Args {
    #[arg(
        short,
        long,
        default_value = "127.0.0.1:27015",
        help = "Server address to connect to"
    )]
    server: String,

    #[arg(short, long, default_value = "pilot")]
    username: String,

    #[arg(short, long, default_value_t = planetoid::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(long, default_value_t = 60.0, help = "Must match the server's planet")]
    planet_radius: f32,

    #[arg(long, help = "Leave after this many seconds")]
    run_for_secs: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let server: SocketAddr = args.server.parse()?;
    let config = ClientConfig {
        tick_rate: args.tick_rate,
        planet_radius: args.planet_radius,
        ..Default::default()
    };

    let mut bot = Bot::connect(&config, server, &args.username)?;
    bot.run(args.run_for_secs.map(Duration::from_secs))?;
    log::info!("{} signing off", args.username);
    Ok(())
}
