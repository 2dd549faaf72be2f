//! Token flow tests
//!
//! Upgrade costs, spawn fees, and payout conservation. Every failure
//! case doubles as an atomicity check: a rejected action must leave
//! balances, records, and the ledger exactly as they were.

use sea_runtime::{Address, TokenKind};

use super::{bootstrapped, fill_reward_vault, join, sure_hit_params};
use crate::{
    error::GameError,
    params::{CostCurve, GameParams},
    state::{ActionKind, Outcome},
};

/// Helper to build params with a known linear upgrade curve
fn linear_params() -> GameParams {
    GameParams {
        upgrade_cost: CostCurve::Linear { base: 100, step: 50 },
        ..GameParams::default()
    }
}

/// Test 1: Upgrading moves exactly the configured cost into the vault
#[test]
fn test_upgrade_moves_exact_cost() {
    let mut game = bootstrapped(linear_params());
    let player = Address::new_unique();
    game.fund(TokenKind::Gold, player, 150).unwrap();
    game.initialize_ship(player).unwrap();

    game.upgrade_ship(player).unwrap();

    assert_eq!(game.ship(&player).unwrap().level, 2);
    assert_eq!(game.balance(TokenKind::Gold, &player), 50);
    assert_eq!(
        game.balance(TokenKind::Gold, &game.vault_address(TokenKind::Gold)),
        100
    );

    let ledger = game.ledger().unwrap();
    assert_eq!(ledger.len(), 1);
    let entry = ledger.last().unwrap();
    assert_eq!(entry.player, player);
    assert_eq!(entry.kind, ActionKind::UpgradeShip);
    assert_eq!(entry.outcome, Outcome::Upgraded { level: 2 });
}

/// Test 2: An underfunded upgrade changes nothing
#[test]
fn test_upgrade_insufficient_funds() {
    let mut game = bootstrapped(linear_params());
    let player = Address::new_unique();
    game.fund(TokenKind::Gold, player, 50).unwrap();
    game.initialize_ship(player).unwrap();

    assert_eq!(
        game.upgrade_ship(player),
        Err(GameError::InsufficientFunds {
            record: player,
            needed: 100,
            available: 50,
        })
    );

    assert_eq!(game.ship(&player).unwrap().level, 1);
    assert_eq!(game.balance(TokenKind::Gold, &player), 50);
    assert_eq!(
        game.balance(TokenKind::Gold, &game.vault_address(TokenKind::Gold)),
        0
    );
    assert!(game.ledger().unwrap().is_empty());
}

/// Test 3: Charges follow the curve level by level
#[test]
fn test_upgrade_charges_follow_curve() {
    let mut game = bootstrapped(linear_params());
    let player = Address::new_unique();
    game.fund(TokenKind::Gold, player, 1_000).unwrap();
    game.initialize_ship(player).unwrap();

    game.upgrade_ship(player).unwrap();
    assert_eq!(game.balance(TokenKind::Gold, &player), 900);

    game.upgrade_ship(player).unwrap();
    assert_eq!(game.balance(TokenKind::Gold, &player), 750);

    assert_eq!(game.ship(&player).unwrap().level, 3);
    assert_eq!(
        game.balance(TokenKind::Gold, &game.vault_address(TokenKind::Gold)),
        250
    );
}

/// Test 4: The level cap rejects before any transfer
#[test]
fn test_max_level_blocks_without_transfer() {
    let params = GameParams {
        max_level: 2,
        upgrade_cost: CostCurve::Linear { base: 100, step: 50 },
        ..GameParams::default()
    };
    let mut game = bootstrapped(params);
    let player = Address::new_unique();
    game.fund(TokenKind::Gold, player, 1_000).unwrap();
    game.initialize_ship(player).unwrap();

    game.upgrade_ship(player).unwrap();
    let balance_at_cap = game.balance(TokenKind::Gold, &player);
    let ledger_len = game.ledger().unwrap().len();

    assert!(matches!(
        game.upgrade_ship(player),
        Err(GameError::MaxLevelReached { level: 2, .. })
    ));
    assert_eq!(game.ship(&player).unwrap().level, 2);
    assert_eq!(game.balance(TokenKind::Gold, &player), balance_at_cap);
    assert_eq!(game.ledger().unwrap().len(), ledger_len);
}

/// Test 5: Spawn fees land in the reward vault
#[test]
fn test_spawn_fee_flows_to_reward_vault() {
    let params = GameParams {
        spawn_fee: 25,
        ..GameParams::default()
    };
    let mut game = bootstrapped(params);
    let player = Address::new_unique();
    game.fund(TokenKind::Gold, player, 100).unwrap();
    game.initialize_ship(player).unwrap();

    game.spawn_player(player, Address::new_unique()).unwrap();

    assert_eq!(game.balance(TokenKind::Gold, &player), 75);
    assert_eq!(game.balance(TokenKind::Gold, &game.reward_vault()), 25);
}

/// Test 6: An unaffordable spawn fee aborts the whole spawn
#[test]
fn test_unaffordable_spawn_fee_aborts_spawn() {
    let params = GameParams {
        spawn_fee: 25,
        ..GameParams::default()
    };
    let mut game = bootstrapped(params);
    let player = Address::new_unique();
    game.fund(TokenKind::Gold, player, 10).unwrap();
    game.initialize_ship(player).unwrap();

    let targets_before = game.world().unwrap().targets.len();
    assert!(matches!(
        game.spawn_player(player, Address::new_unique()),
        Err(GameError::InsufficientFunds { .. })
    ));

    // No player record, no new target, balance untouched
    assert!(matches!(
        game.player(&player),
        Err(GameError::AccountNotInitialized { .. })
    ));
    assert_eq!(game.world().unwrap().targets.len(), targets_before);
    assert_eq!(game.balance(TokenKind::Gold, &player), 10);
}

/// Test 7: A hit conserves gold between vault and player
#[test]
fn test_hit_payout_conservation() {
    let mut game = bootstrapped(sure_hit_params());
    fill_reward_vault(&game, 10_000);
    let player = join(&mut game, 1_000, 5, 0);

    let reward = game.world().unwrap().targets[0].reward;
    let toll = game.params().shoot_toll;
    game.shoot(player, 0).unwrap();

    assert_eq!(
        game.balance(TokenKind::Gold, &player),
        1_000 - toll + reward
    );
    assert_eq!(
        game.balance(TokenKind::Gold, &game.reward_vault()),
        10_000 - reward
    );
    assert_eq!(
        game.balance(TokenKind::Gold, &game.vault_address(TokenKind::Gold)),
        toll
    );
}

/// Test 8: A reward vault that cannot pay aborts the whole shot
#[test]
fn test_reward_vault_short_aborts_shot() {
    let mut game = bootstrapped(sure_hit_params());
    // Reward vault deliberately left empty
    let player = join(&mut game, 1_000, 5, 0);

    assert!(matches!(
        game.shoot(player, 0),
        Err(GameError::InsufficientFunds { .. })
    ));

    // Ammo, toll, target, and ledger are all untouched
    assert_eq!(game.player(&player).unwrap().ammo, 5);
    assert_eq!(game.balance(TokenKind::Gold, &player), 1_000);
    assert!(!game.world().unwrap().targets[0].depleted);
    assert_eq!(game.world().unwrap().chests_opened, 0);
    assert!(game.ledger().unwrap().is_empty());
}

/// Test 9: Gameplay never mints; totals only move between holders
#[test]
fn test_tolls_and_payouts_only_move_gold() {
    let mut game = bootstrapped(sure_hit_params());
    fill_reward_vault(&game, 500);
    let player = join(&mut game, 300, 2, 0);

    let total_before = 500 + 300;
    game.move_player(player, 5).unwrap();
    game.shoot(player, 1).unwrap();

    let total_after = game.balance(TokenKind::Gold, &player)
        + game.balance(TokenKind::Gold, &game.reward_vault())
        + game.balance(TokenKind::Gold, &game.vault_address(TokenKind::Gold));
    assert_eq!(total_after, total_before);
}
