//! Game rules processor
//!
//! Executes one instruction per unit of work against the staging context.
//! The order of checks inside each operation is part of the contract:
//! preconditions fail before any resource is spent or toll charged, and
//! a failure at any point discards the whole unit of work.

use borsh::BorshDeserialize;
use sea_runtime::{ActionContext, Address, BuiltinProgram, EngineError, TokenKind};

use crate::{
    error::GameError,
    instruction::GameInstruction,
    params::{GameParams, ParamsError},
    rng::XorShift64,
    state::{
        ActionKind, AuthorityRecord, LedgerRecord, Outcome, PlayerRecord, RewardVaultRecord,
        ShipRecord, Target, VaultRecord, WorldRecord,
    },
};

/// The game rules as a hosted builtin
pub struct SeaProgram {
    params: GameParams,
}

impl SeaProgram {
    /// Validates the parameter set; a constructed program never runs
    /// with an inconsistent one.
    pub fn new(params: GameParams) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &GameParams {
        &self.params
    }
}

impl BuiltinProgram for SeaProgram {
    fn process(&self, ctx: &mut ActionContext<'_>, data: &[u8]) -> Result<(), EngineError> {
        let instruction =
            GameInstruction::try_from_slice(data).map_err(|_| EngineError::InvalidInstructionData)?;

        let result = match instruction {
            GameInstruction::Initialize => process_initialize(ctx),
            GameInstruction::InitializeGameActions => process_initialize_game_actions(ctx),
            GameInstruction::InitializeGameData {
                bound,
                chest_count,
                seed,
            } => process_initialize_game_data(ctx, &self.params, bound, chest_count, seed),
            GameInstruction::InitializeShip => process_initialize_ship(ctx),
            GameInstruction::UpgradeShip => process_upgrade_ship(ctx, &self.params),
            GameInstruction::SpawnPlayer { avatar } => {
                process_spawn_player(ctx, &self.params, avatar)
            }
            GameInstruction::DespawnPlayer => process_despawn_player(ctx),
            GameInstruction::MovePlayer { steps } => process_move_player(ctx, &self.params, steps),
            GameInstruction::Shoot { target_index } => {
                process_shoot(ctx, &self.params, target_index)
            }
            GameInstruction::AreaAttack { target_index } => {
                process_area_attack(ctx, &self.params, target_index)
            }
            GameInstruction::ResetWorld { chest_count, seed } => {
                process_reset_world(ctx, &self.params, chest_count, seed)
            }
        };
        result.map_err(EngineError::from)
    }
}

/// Load the authority record and check the signer against its admin
fn require_admin(ctx: &ActionContext<'_>) -> Result<(), GameError> {
    let authority_address = AuthorityRecord::derive(&ctx.program());
    let authority: AuthorityRecord = ctx.load(&authority_address)?;
    if authority.admin != ctx.signer() {
        return Err(GameError::Unauthorized {
            record: authority_address,
        });
    }
    Ok(())
}

/// Append one history entry; an absent ledger means bootstrap is incomplete
fn append_entry(
    ctx: &mut ActionContext<'_>,
    player: Address,
    kind: ActionKind,
    outcome: Outcome,
) -> Result<(), GameError> {
    let ledger_address = LedgerRecord::derive(&ctx.program());
    let mut ledger: LedgerRecord = ctx.load(&ledger_address)?;
    let at = ctx.clock().unix_timestamp;
    ledger
        .append(player, kind, outcome, at)
        .ok_or(GameError::Overflow {
            record: ledger_address,
        })?;
    ctx.save(ledger_address, &ledger)?;
    Ok(())
}

/// Roll seed tied to the action's ledger slot, shooter, and target.
/// Any observer holding the ledger can recompute the roll.
fn combat_seed(seq: u64, player: &Address, target_index: u32) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seq.to_le_bytes());
    hasher.update(player.as_ref());
    hasher.update(&target_index.to_le_bytes());
    let mut word = [0u8; 8];
    word.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
    u64::from_le_bytes(word)
}

/// Place `count` fresh targets on `[0, bound]`
fn seed_targets(rng: &mut XorShift64, bound: u32, count: u32, reward: u64) -> Vec<Target> {
    (0..count)
        .map(|_| Target {
            position: rng.roll(bound as u64 + 1) as u32,
            reward,
            depleted: false,
        })
        .collect()
}

fn process_initialize(ctx: &mut ActionContext<'_>) -> Result<(), GameError> {
    let program = ctx.program();
    let signer = ctx.signer();

    // The first signer becomes the admin
    let authority_address = AuthorityRecord::derive(&program);
    ctx.create(authority_address, &AuthorityRecord { admin: signer })?;

    // Reward vault with its gold holding
    let reward_vault = RewardVaultRecord::derive(&program);
    ctx.create(reward_vault, &RewardVaultRecord::default())?;
    ctx.open_holding(TokenKind::Gold, reward_vault);

    // One toll vault per token kind
    for kind in TokenKind::ALL {
        let vault = VaultRecord::derive(&program, kind);
        ctx.create(vault, &VaultRecord { token_kind: kind })?;
        ctx.open_holding(kind, vault);
    }

    tracing::debug!(admin = %signer, "economy initialized");
    Ok(())
}

fn process_initialize_game_actions(ctx: &mut ActionContext<'_>) -> Result<(), GameError> {
    require_admin(ctx)?;

    let ledger_address = LedgerRecord::derive(&ctx.program());
    ctx.create(ledger_address, &LedgerRecord::default())?;

    tracing::debug!("action ledger initialized");
    Ok(())
}

fn process_initialize_game_data(
    ctx: &mut ActionContext<'_>,
    params: &GameParams,
    bound: u32,
    chest_count: u32,
    seed: u64,
) -> Result<(), GameError> {
    require_admin(ctx)?;

    let world_address = WorldRecord::derive(&ctx.program());
    let mut rng = XorShift64::new(seed);
    let targets = seed_targets(&mut rng, bound, chest_count, params.chest_reward);

    let world = WorldRecord {
        admin: ctx.signer(),
        bound,
        rng_state: rng.state(),
        chests_opened: 0,
        targets,
    };
    ctx.create(world_address, &world)?;

    tracing::debug!(bound, chest_count, "world created");
    Ok(())
}

fn process_initialize_ship(ctx: &mut ActionContext<'_>) -> Result<(), GameError> {
    let signer = ctx.signer();
    let ship_address = ShipRecord::derive(&ctx.program(), &signer);
    ctx.create(
        ship_address,
        &ShipRecord {
            owner: signer,
            level: 1,
        },
    )?;

    tracing::debug!(owner = %signer, "ship created");
    Ok(())
}

fn process_upgrade_ship(ctx: &mut ActionContext<'_>, params: &GameParams) -> Result<(), GameError> {
    let signer = ctx.signer();
    let program = ctx.program();

    let ship_address = ShipRecord::derive(&program, &signer);
    let mut ship: ShipRecord = ctx.load(&ship_address)?;
    if ship.owner != signer {
        return Err(GameError::Unauthorized {
            record: ship_address,
        });
    }

    // Level gate comes before any transfer
    if ship.level >= params.max_level {
        return Err(GameError::MaxLevelReached {
            record: ship_address,
            level: ship.level,
        });
    }

    let cost = params
        .upgrade_cost
        .cost(ship.level)
        .ok_or(GameError::Overflow {
            record: ship_address,
        })?;
    let gold_vault = VaultRecord::derive(&program, TokenKind::Gold);
    ctx.charge_toll(TokenKind::Gold, gold_vault, cost)?;

    ship.level += 1;
    ctx.save(ship_address, &ship)?;

    append_entry(
        ctx,
        signer,
        ActionKind::UpgradeShip,
        Outcome::Upgraded { level: ship.level },
    )?;

    tracing::debug!(owner = %signer, level = ship.level, cost, "ship upgraded");
    Ok(())
}

fn process_spawn_player(
    ctx: &mut ActionContext<'_>,
    params: &GameParams,
    avatar: Address,
) -> Result<(), GameError> {
    let signer = ctx.signer();
    let program = ctx.program();

    // World and ship must exist before anyone spawns
    let world_address = WorldRecord::derive(&program);
    let mut world: WorldRecord = ctx.load(&world_address)?;
    let ship_address = ShipRecord::derive(&program, &signer);
    let ship: ShipRecord = ctx.load(&ship_address)?;
    if ship.owner != signer {
        return Err(GameError::Unauthorized {
            record: ship_address,
        });
    }

    // Combat resources are snapshots of the signer's holdings,
    // opened on demand so an unfunded player spawns with zero
    for kind in TokenKind::ALL {
        ctx.open_holding(kind, signer);
    }
    let ammo = ctx.balance(TokenKind::Cannon, &signer);
    let consumables = ctx.balance(TokenKind::Rum, &signer);

    let player_address = PlayerRecord::derive(&program, &signer);
    let player = PlayerRecord {
        owner: signer,
        avatar,
        position: world.default_spawn(),
        ammo,
        consumables,
    };
    ctx.create(player_address, &player)?;

    // Entry fee funds the reward pool
    let reward_vault = RewardVaultRecord::derive(&program);
    ctx.charge_toll(TokenKind::Gold, reward_vault, params.spawn_fee)?;

    // Each spawn stocks the world with one more target
    let mut rng = XorShift64::new(world.rng_state);
    let position = rng.roll(world.bound as u64 + 1) as u32;
    world.targets.push(Target {
        position,
        reward: params.chest_reward,
        depleted: false,
    });
    world.rng_state = rng.state();
    ctx.save(world_address, &world)?;

    tracing::debug!(owner = %signer, position = player.position, ammo, "player spawned");
    Ok(())
}

fn process_despawn_player(ctx: &mut ActionContext<'_>) -> Result<(), GameError> {
    let signer = ctx.signer();

    let player_address = PlayerRecord::derive(&ctx.program(), &signer);
    let player: PlayerRecord = ctx.load(&player_address)?;
    if player.owner != signer {
        return Err(GameError::Unauthorized {
            record: player_address,
        });
    }

    // Leaving is free and unledgered; only the presence goes away
    ctx.close::<PlayerRecord>(&player_address)?;

    tracing::debug!(owner = %signer, "player despawned");
    Ok(())
}

fn process_move_player(
    ctx: &mut ActionContext<'_>,
    params: &GameParams,
    steps: i32,
) -> Result<(), GameError> {
    let signer = ctx.signer();
    let program = ctx.program();

    let world_address = WorldRecord::derive(&program);
    let world: WorldRecord = ctx.load(&world_address)?;
    let player_address = PlayerRecord::derive(&program, &signer);
    let mut player: PlayerRecord = ctx.load(&player_address)?;
    if player.owner != signer {
        return Err(GameError::Unauthorized {
            record: player_address,
        });
    }

    // Bounds gate comes before any charge
    let candidate = player.position as i64 + steps as i64;
    if !world.in_bounds(candidate) {
        return Err(GameError::OutOfBounds {
            record: player_address,
            candidate,
            bound: world.bound,
        });
    }

    let toll = params
        .move_toll_per_step
        .checked_mul(steps.unsigned_abs() as u64)
        .ok_or(GameError::Overflow {
            record: player_address,
        })?;
    let gold_vault = VaultRecord::derive(&program, TokenKind::Gold);
    ctx.charge_toll(TokenKind::Gold, gold_vault, toll)?;

    player.position = candidate as u32;
    ctx.save(player_address, &player)?;

    append_entry(
        ctx,
        signer,
        ActionKind::Move,
        Outcome::Moved {
            position: player.position,
        },
    )?;

    tracing::debug!(owner = %signer, position = player.position, toll, "player moved");
    Ok(())
}

fn process_shoot(
    ctx: &mut ActionContext<'_>,
    params: &GameParams,
    target_index: u32,
) -> Result<(), GameError> {
    let signer = ctx.signer();
    let program = ctx.program();

    let world_address = WorldRecord::derive(&program);
    let mut world: WorldRecord = ctx.load(&world_address)?;
    let player_address = PlayerRecord::derive(&program, &signer);
    let mut player: PlayerRecord = ctx.load(&player_address)?;
    if player.owner != signer {
        return Err(GameError::Unauthorized {
            record: player_address,
        });
    }

    // Target existence gates everything else
    let target = *world
        .target(target_index)
        .ok_or(GameError::InvalidTarget {
            record: world_address,
            index: target_index,
        })?;

    // One shot per pull, spent even on a miss
    if player.ammo == 0 {
        return Err(GameError::InsufficientResource {
            record: player_address,
            resource: TokenKind::Cannon,
        });
    }
    player.ammo -= 1;

    let gold_vault = VaultRecord::derive(&program, TokenKind::Gold);
    ctx.charge_toll(TokenKind::Gold, gold_vault, params.shoot_toll)?;

    // The roll is fixed by the ledger slot, so the ledger is loaded
    // before resolution rather than through `append_entry`
    let ledger_address = LedgerRecord::derive(&program);
    let mut ledger: LedgerRecord = ctx.load(&ledger_address)?;
    let ship_address = ShipRecord::derive(&program, &signer);
    let ship: ShipRecord = ctx.load(&ship_address)?;

    let mut rng = XorShift64::new(combat_seed(ledger.next_seq, &signer, target_index));
    let roll = rng.roll(10_000);
    // A depleted target never pays, but the shot is still spent
    let hit = !target.depleted && roll < params.accuracy.chance_bps(ship.level) as u64;

    let mut payout = 0;
    if hit {
        let reward_vault = RewardVaultRecord::derive(&program);
        ctx.authorize_payout(TokenKind::Gold, reward_vault, signer, target.reward)?;
        payout = target.reward;
        world.targets[target_index as usize].depleted = true;
        world.chests_opened = world
            .chests_opened
            .checked_add(1)
            .ok_or(GameError::Overflow {
                record: world_address,
            })?;
    }

    ctx.save(player_address, &player)?;
    ctx.save(world_address, &world)?;

    ledger
        .append(
            signer,
            ActionKind::Shoot,
            Outcome::Shot { hit, payout },
            ctx.clock().unix_timestamp,
        )
        .ok_or(GameError::Overflow {
            record: ledger_address,
        })?;
    ctx.save(ledger_address, &ledger)?;

    tracing::debug!(owner = %signer, target_index, hit, payout, "shot resolved");
    Ok(())
}

fn process_area_attack(
    ctx: &mut ActionContext<'_>,
    params: &GameParams,
    target_index: u32,
) -> Result<(), GameError> {
    let signer = ctx.signer();
    let program = ctx.program();

    let world_address = WorldRecord::derive(&program);
    let mut world: WorldRecord = ctx.load(&world_address)?;
    let player_address = PlayerRecord::derive(&program, &signer);
    let mut player: PlayerRecord = ctx.load(&player_address)?;
    if player.owner != signer {
        return Err(GameError::Unauthorized {
            record: player_address,
        });
    }

    let target = *world
        .target(target_index)
        .ok_or(GameError::InvalidTarget {
            record: world_address,
            index: target_index,
        })?;

    if player.consumables == 0 {
        return Err(GameError::InsufficientResource {
            record: player_address,
            resource: TokenKind::Rum,
        });
    }
    player.consumables -= 1;

    let gold_vault = VaultRecord::derive(&program, TokenKind::Gold);
    ctx.charge_toll(TokenKind::Gold, gold_vault, params.area_toll)?;

    let ledger_address = LedgerRecord::derive(&program);
    let mut ledger: LedgerRecord = ctx.load(&ledger_address)?;
    let ship_address = ShipRecord::derive(&program, &signer);
    let ship: ShipRecord = ctx.load(&ship_address)?;

    let mut rng = XorShift64::new(combat_seed(ledger.next_seq, &signer, target_index));
    let roll = rng.roll(10_000);
    let hit = !target.depleted && roll < params.accuracy.chance_bps(ship.level) as u64;

    let mut targets_hit = 0u32;
    let mut payout = 0u64;
    if hit {
        let reward_vault = RewardVaultRecord::derive(&program);

        // Primary takes its full reward
        ctx.authorize_payout(TokenKind::Gold, reward_vault, signer, target.reward)?;
        payout = target.reward;
        targets_hit = 1;
        world.targets[target_index as usize].depleted = true;

        // Splash sweeps whatever is still standing nearby at a scaled reward
        let center = target.position;
        for i in 0..world.targets.len() {
            if i == target_index as usize {
                continue;
            }
            let nearby = world.targets[i];
            if nearby.depleted || nearby.position.abs_diff(center) > params.area_radius {
                continue;
            }
            let splash = nearby
                .reward
                .checked_mul(params.area_reward_scale_bps as u64)
                .ok_or(GameError::Overflow {
                    record: world_address,
                })?
                / 10_000;
            ctx.authorize_payout(TokenKind::Gold, reward_vault, signer, splash)?;
            payout = payout.checked_add(splash).ok_or(GameError::Overflow {
                record: world_address,
            })?;
            world.targets[i].depleted = true;
            targets_hit += 1;
        }

        world.chests_opened = world
            .chests_opened
            .checked_add(targets_hit as u64)
            .ok_or(GameError::Overflow {
                record: world_address,
            })?;
    }

    ctx.save(player_address, &player)?;
    ctx.save(world_address, &world)?;

    ledger
        .append(
            signer,
            ActionKind::AreaAttack,
            Outcome::Area { targets_hit, payout },
            ctx.clock().unix_timestamp,
        )
        .ok_or(GameError::Overflow {
            record: ledger_address,
        })?;
    ctx.save(ledger_address, &ledger)?;

    tracing::debug!(owner = %signer, target_index, targets_hit, payout, "area attack resolved");
    Ok(())
}

fn process_reset_world(
    ctx: &mut ActionContext<'_>,
    params: &GameParams,
    chest_count: u32,
    seed: u64,
) -> Result<(), GameError> {
    require_admin(ctx)?;

    let world_address = WorldRecord::derive(&ctx.program());
    let mut world: WorldRecord = ctx.load(&world_address)?;

    let mut rng = XorShift64::new(seed);
    world.targets = seed_targets(&mut rng, world.bound, chest_count, params.chest_reward);
    world.rng_state = rng.state();
    ctx.save(world_address, &world)?;

    tracing::debug!(chest_count, "world reset");
    Ok(())
}
