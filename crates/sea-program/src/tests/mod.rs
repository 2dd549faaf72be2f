//! Game Integration Tests
//!
//! Drive the full engine through the typed facade:
//! - Bootstrap and record lifecycle
//! - Token flows for upgrades, tolls, and payouts
//! - Movement bounds
//! - Shot and area attack resolution
//! - Action history ledger guarantees

mod economy_test;

use sea_runtime::{Address, TokenKind};

use crate::{
    engine::GameEngine,
    params::{AccuracyParams, CostCurve, GameParams},
};

pub const WORLD_BOUND: u32 = 50;
pub const CHEST_COUNT: u32 = 4;
pub const WORLD_SEED_VALUE: u64 = 42;

/// Helper to get the admin identity used across tests
fn admin() -> Address {
    Address::from_label(b"test_admin")
}

/// Helper to build params with a linear cost curve and guaranteed hits
fn sure_hit_params() -> GameParams {
    GameParams {
        upgrade_cost: CostCurve::Linear { base: 100, step: 50 },
        accuracy: AccuracyParams {
            base_bps: 10_000,
            per_level_bps: 0,
            max_bps: 10_000,
        },
        ..GameParams::default()
    }
}

/// Helper to build params with guaranteed misses
fn sure_miss_params() -> GameParams {
    GameParams {
        accuracy: AccuracyParams {
            base_bps: 0,
            per_level_bps: 0,
            max_bps: 0,
        },
        ..GameParams::default()
    }
}

/// Helper to set up an engine with economy, ledger, and world bootstrapped
fn bootstrapped(params: GameParams) -> GameEngine {
    let mut game = GameEngine::new(params).unwrap();
    game.bootstrap(admin(), WORLD_BOUND, CHEST_COUNT, WORLD_SEED_VALUE)
        .unwrap();
    game
}

/// Helper to fund a fresh identity, build its ship, and spawn it
fn join(game: &mut GameEngine, gold: u64, cannons: u64, rum: u64) -> Address {
    let player = Address::new_unique();
    if gold > 0 {
        game.fund(TokenKind::Gold, player, gold).unwrap();
    }
    if cannons > 0 {
        game.fund(TokenKind::Cannon, player, cannons).unwrap();
    }
    if rum > 0 {
        game.fund(TokenKind::Rum, player, rum).unwrap();
    }
    game.initialize_ship(player).unwrap();
    game.spawn_player(player, Address::new_unique()).unwrap();
    player
}

/// Helper to load the reward vault with gold so targets can pay out
fn fill_reward_vault(game: &GameEngine, amount: u64) {
    game.fund(TokenKind::Gold, game.reward_vault(), amount)
        .unwrap();
}
