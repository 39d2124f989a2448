use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::Server;
use server::scheduler::Scheduler;
use server::world::WorldSettings;
use shared::{BATTLE_ROSTER_CAPACITY, SPAWN_BATCH, WORLD_ROSTER_CAPACITY, WORLD_SIZE};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "PokeCat game server")]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "7878")]
    port: u16,

    /// Creature catalog: a directory of JSON files or a single JSON file
    #[arg(short, long, default_value = "data/creatures")]
    catalog: PathBuf,

    /// Player store file
    #[arg(short, long, default_value = "data/players.json")]
    store: PathBuf,

    /// Keep player records in memory only
    #[arg(long)]
    no_persist: bool,

    /// Side length of the square world grid
    #[arg(long, default_value_t = WORLD_SIZE)]
    world_size: i32,

    /// Wild creatures added per spawn tick
    #[arg(long, default_value_t = SPAWN_BATCH)]
    spawn_batch: usize,

    /// Seconds between spawn ticks
    #[arg(long, default_value = "60")]
    spawn_interval: u64,

    /// Seconds between despawn ticks
    #[arg(long, default_value = "300")]
    despawn_interval: u64,

    /// Maximum creatures a player can hold in the world
    #[arg(long, default_value_t = WORLD_ROSTER_CAPACITY)]
    roster_capacity: usize,

    /// Disconnect players idle for this many seconds (0 disables)
    #[arg(long, default_value = "600")]
    idle_timeout: u64,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "64")]
    max_connections: usize,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: format!("{}:{}", self.host, self.port),
            catalog_path: self.catalog,
            store_path: (!self.no_persist).then_some(self.store),
            world: WorldSettings {
                world_size: self.world_size.max(1),
                roster_capacity: self.roster_capacity,
                spawn_batch: self.spawn_batch,
            },
            battle_roster_capacity: BATTLE_ROSTER_CAPACITY,
            spawn_interval: Duration::from_secs(self.spawn_interval.max(1)),
            despawn_interval: Duration::from_secs(self.despawn_interval.max(1)),
            idle_timeout: (self.idle_timeout > 0).then(|| Duration::from_secs(self.idle_timeout)),
            max_connections: self.max_connections,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Args::parse().into_config();
    let ctx = config.build_context()?;

    // Seed the map so the first players have something to find
    ctx.world.spawn_tick(&ctx.catalog).await;

    let scheduler = Scheduler::start(
        ctx.world.clone(),
        ctx.catalog.clone(),
        config.spawn_interval,
        config.despawn_interval,
    );

    let server = Server::bind(&config.bind_addr, ctx, config.idle_timeout).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    scheduler.abort();
    Ok(())
}
