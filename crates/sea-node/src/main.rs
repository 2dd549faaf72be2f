//! Sea Node
//!
//! Headless host for the deterministic game engine. Boots state from
//! disk, runs the authoritative tick loop, snapshots state periodically,
//! and can drive a scripted local simulation for smoke testing.
//! State survives restarts.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use parking_lot::RwLock;
use rand::{rngs::StdRng, Rng, SeedableRng};
use sea_program::{GameEngine, GameInstruction, RewardVaultRecord};
use sea_runtime::{
    Address, EngineMetadata, PersistentStore, RecordStore, RecordStorePersistence, SubmitHandle,
    TickConfig, TickProducer, TokenKind, TokenLedger,
};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

/// Authoritative game engine node
#[derive(Parser, Debug)]
#[command(name = "sea-node")]
#[command(about = "Deterministic game rules engine with a fixed tick loop", long_about = None)]
struct Args {
    /// Data directory for persistent state
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Game parameter overrides (JSON file)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tick time in milliseconds
    #[arg(long, default_value = "50")]
    tick_ms: u64,

    /// Save state every N ticks (0 = only on shutdown)
    #[arg(long, default_value = "200")]
    save_every: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// World line bound used when bootstrapping a fresh world
    #[arg(long, default_value = "50")]
    world_bound: u32,

    /// Target count used when bootstrapping a fresh world
    #[arg(long, default_value = "8")]
    chests: u32,

    /// Seed for world generation and the local simulation
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Spawn N simulated players driving random actions (0 = disabled)
    #[arg(long, default_value = "0")]
    simulate: usize,

    /// Actions each simulated player submits
    #[arg(long, default_value = "50")]
    simulate_actions: usize,

    /// Enable verbose per-tick logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    tracing::info!("Starting Sea Node");
    tracing::info!("  Tick time: {}ms ({}Hz)", args.tick_ms, 1000 / args.tick_ms.max(1));
    tracing::info!("  Data directory: {:?}", args.data_dir);
    tracing::info!("  Save interval: {} ticks", args.save_every);

    // Create data directory if it doesn't exist
    std::fs::create_dir_all(&args.data_dir)?;

    let params = config::load_params(args.config.as_deref())?;

    // Open persistent store
    let persistent_store = Arc::new(PersistentStore::open(&args.data_dir)?);

    let store = Arc::new(RecordStore::new());
    let tokens = Arc::new(TokenLedger::new());

    // Load existing state from disk
    let start_tick = match persistent_store.load_metadata()? {
        Some(metadata) => {
            tracing::info!(
                "Loading state from disk: tick {}, {} records",
                metadata.tick,
                metadata.record_count
            );
            let records = store.load_from_disk(&persistent_store)?;
            let holdings = persistent_store.load_balances(&tokens)?;
            tracing::info!("Loaded {} records and {} holdings", records, holdings);
            metadata.tick
        }
        None => {
            tracing::info!("No existing state found, starting fresh");
            0
        }
    };

    let mut game = GameEngine::with_parts(params, store.clone(), tokens.clone())?;

    // Bootstrap a fresh deployment
    if store.is_empty() {
        let admin = Address::from_label(b"sea_node_admin");
        game.bootstrap(admin, args.world_bound, args.chests, args.seed)?;
        tracing::info!(
            "Bootstrapped fresh world: bound {}, {} targets, admin {}",
            args.world_bound,
            args.chests,
            admin
        );
    }

    let mut engine = game.into_engine();
    engine.restore_tick(start_tick);

    // Initialize tick producer
    let tick_config = TickConfig {
        tick_time_ms: args.tick_ms,
        verbose: args.verbose,
        ..Default::default()
    };
    let producer = TickProducer::new(engine, tick_config);
    let submit_handle = producer.submit_handle();
    let mut updates = producer.subscribe();

    let current_tick = Arc::new(RwLock::new(start_tick));

    // Spawn tick producer
    let producer_handle = tokio::spawn(async move {
        producer.run_async().await;
    });

    // Spawn update handler with periodic saves
    let tick_ref = current_tick.clone();
    let save_every = args.save_every;
    let save_persistent = persistent_store.clone();
    let save_store = store.clone();
    let save_tokens = tokens.clone();
    let update_handler = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    *tick_ref.write() = update.tick;

                    // Periodic save to disk
                    if save_every > 0 && update.tick % save_every == 0 && update.tick > 0 {
                        match save_state(&save_persistent, &save_store, &save_tokens, update.tick) {
                            Ok(()) => tracing::info!("Saved state at tick {}", update.tick),
                            Err(e) => tracing::error!("Failed to save state: {}", e),
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Update stream lagged, skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Optional local simulation
    let mut simulation_handle = None;
    if args.simulate > 0 {
        let handle = submit_handle.clone();
        let sim_tokens = tokens.clone();
        let players = args.simulate;
        let actions = args.simulate_actions;
        let seed = args.seed;
        let targets = args.chests;
        simulation_handle = Some(tokio::spawn(async move {
            if let Err(e) = run_simulation(handle, sim_tokens, players, actions, seed, targets).await
            {
                tracing::error!("Simulation error: {}", e);
            }
        }));
    }

    tracing::info!("Sea node running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");

    // Save state before shutdown
    let final_tick = *current_tick.read();
    tracing::info!("Saving final state at tick {}...", final_tick);
    match save_state(&persistent_store, &store, &tokens, final_tick) {
        Ok(()) => tracing::info!(
            "Final state saved: {} records at tick {}",
            store.len(),
            final_tick
        ),
        Err(e) => tracing::error!("Failed to save final state: {}", e),
    }

    // Abort tasks
    producer_handle.abort();
    update_handler.abort();
    if let Some(handle) = simulation_handle {
        handle.abort();
    }

    tracing::info!("Sea node stopped");

    Ok(())
}

/// Write records, balances, and metadata in one pass
fn save_state(
    persistent: &PersistentStore,
    store: &RecordStore,
    tokens: &TokenLedger,
    tick: u64,
) -> Result<()> {
    let metadata = EngineMetadata {
        tick,
        record_count: store.len() as u64,
        last_save_ts: std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0),
    };
    persistent.save_metadata(&metadata)?;
    store.save_to_disk(persistent)?;
    persistent.save_balances(tokens)?;
    persistent.flush()?;
    Ok(())
}

/// Drive randomized players through the engine for local smoke testing.
/// Requests flow through the same submit handle a real gateway would use.
async fn run_simulation(
    handle: SubmitHandle,
    tokens: Arc<TokenLedger>,
    players: usize,
    actions_per_player: usize,
    seed: u64,
    target_count: u32,
) -> Result<()> {
    tracing::info!(
        "Simulating {} players, {} actions each",
        players,
        actions_per_player
    );
    let mut rng = StdRng::seed_from_u64(seed);

    // Targets pay out of the reward vault; stock it for the run
    let reward_vault = RewardVaultRecord::derive(&sea_program::id());
    tokens.mint(TokenKind::Gold, reward_vault, 1_000_000)?;

    let mut identities = Vec::with_capacity(players);
    for i in 0..players {
        let player = Address::from_label(format!("sim_player_{i}").as_bytes());
        tokens.mint(TokenKind::Gold, player, 10_000)?;
        tokens.mint(TokenKind::Cannon, player, 64)?;
        tokens.mint(TokenKind::Rum, player, 16)?;
        handle.submit(GameInstruction::InitializeShip.into_request(player)?)?;
        handle.submit(
            GameInstruction::SpawnPlayer {
                avatar: Address::new_unique(),
            }
            .into_request(player)?,
        )?;
        identities.push(player);
    }

    // Let the spawn batch commit before the action stream starts
    tokio::time::sleep(Duration::from_millis(200)).await;

    for round in 0..actions_per_player {
        for player in &identities {
            let instruction = match rng.gen_range(0..10) {
                0 => GameInstruction::UpgradeShip,
                1..=4 => GameInstruction::MovePlayer {
                    steps: rng.gen_range(-3..=3),
                },
                5..=8 => GameInstruction::Shoot {
                    target_index: rng.gen_range(0..target_count.max(1)),
                },
                _ => GameInstruction::AreaAttack {
                    target_index: rng.gen_range(0..target_count.max(1)),
                },
            };
            if let Err(e) = handle.submit(instruction.into_request(*player)?) {
                tracing::warn!("Simulation submit failed: {}", e);
            }
        }
        // Pace the stream so the intake queue never saturates
        if round % 10 == 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    tracing::info!("Simulation submitted all actions");
    Ok(())
}
