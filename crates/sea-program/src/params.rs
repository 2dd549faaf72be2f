//! Tunable game parameters
//!
//! Tolls, upgrade costs, and combat chances are deployment configuration
//! rather than code. A parameter set is validated once when the program
//! is constructed; a running engine never sees an invalid set.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upgrade cost schedule, evaluated per current level
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CostCurve {
    /// `base + step * (level - 1)`
    Linear { base: u64, step: u64 },
    /// `base * factor^(level - 1)`
    Geometric { base: u64, factor: u64 },
}

impl CostCurve {
    /// Cost of upgrading from `level` to `level + 1`.
    ///
    /// Levels start at 1; `None` for level zero or arithmetic overflow.
    pub fn cost(&self, level: u16) -> Option<u64> {
        let exponent = level.checked_sub(1)? as u32;
        match *self {
            CostCurve::Linear { base, step } => {
                step.checked_mul(exponent as u64)?.checked_add(base)
            }
            CostCurve::Geometric { base, factor } => {
                base.checked_mul(factor.checked_pow(exponent)?)
            }
        }
    }
}

/// Hit chance in basis points as a function of ship level
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AccuracyParams {
    /// Chance at level 1
    pub base_bps: u16,
    /// Added per level above 1
    pub per_level_bps: u16,
    /// Hard cap, at most 10_000
    pub max_bps: u16,
}

impl AccuracyParams {
    /// Chance for a ship at `level`, saturating and capped at `max_bps`
    pub fn chance_bps(&self, level: u16) -> u16 {
        let levels_above_base = level.saturating_sub(1) as u32;
        let raw = self.base_bps as u32 + self.per_level_bps as u32 * levels_above_base;
        raw.min(self.max_bps as u32) as u16
    }
}

impl Default for AccuracyParams {
    fn default() -> Self {
        Self {
            base_bps: 6_000,
            per_level_bps: 700,
            max_bps: 9_500,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct GameParams {
    /// Highest reachable ship level, at least 1
    pub max_level: u16,
    pub upgrade_cost: CostCurve,
    /// Gold charged per step of movement
    pub move_toll_per_step: u64,
    /// Gold charged per shot
    pub shoot_toll: u64,
    /// Gold charged per area attack, must exceed `shoot_toll`
    pub area_toll: u64,
    /// Gold charged on spawn, paid into the reward vault
    pub spawn_fee: u64,
    /// Gold loaded into each freshly placed target
    pub chest_reward: u64,
    pub accuracy: AccuracyParams,
    /// Maximum distance from the primary target swept by an area attack
    pub area_radius: u32,
    /// Secondary targets pay `reward * scale / 10_000`
    pub area_reward_scale_bps: u16,
}

impl Default for GameParams {
    fn default() -> Self {
        Self {
            max_level: 5,
            upgrade_cost: CostCurve::Geometric {
                base: 100,
                factor: 5,
            },
            move_toll_per_step: 1,
            shoot_toll: 5,
            area_toll: 25,
            spawn_fee: 0,
            chest_reward: 50,
            accuracy: AccuracyParams::default(),
            area_radius: 5,
            area_reward_scale_bps: 5_000,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("max_level must be at least 1")]
    ZeroMaxLevel,

    #[error("upgrade cost overflows at level {level}")]
    CostOverflow { level: u16 },

    #[error("upgrade cost does not strictly increase at level {level}")]
    CostNotIncreasing { level: u16 },

    #[error("area_toll {area_toll} must exceed shoot_toll {shoot_toll}")]
    AreaTollTooLow { area_toll: u64, shoot_toll: u64 },

    #[error("accuracy must satisfy base_bps <= max_bps <= 10_000")]
    InvalidAccuracy,

    #[error("area_reward_scale_bps {0} exceeds 10_000")]
    InvalidRewardScale(u16),
}

impl GameParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.max_level == 0 {
            return Err(ParamsError::ZeroMaxLevel);
        }

        // The whole schedule up to the cap must be computable and
        // strictly increasing.
        let mut previous: Option<u64> = None;
        for level in 1..self.max_level {
            let cost = self
                .upgrade_cost
                .cost(level)
                .ok_or(ParamsError::CostOverflow { level })?;
            if let Some(prev) = previous {
                if cost <= prev {
                    return Err(ParamsError::CostNotIncreasing { level });
                }
            }
            previous = Some(cost);
        }

        if self.area_toll <= self.shoot_toll {
            return Err(ParamsError::AreaTollTooLow {
                area_toll: self.area_toll,
                shoot_toll: self.shoot_toll,
            });
        }

        if self.accuracy.max_bps > 10_000 || self.accuracy.base_bps > self.accuracy.max_bps {
            return Err(ParamsError::InvalidAccuracy);
        }

        if self.area_reward_scale_bps > 10_000 {
            return Err(ParamsError::InvalidRewardScale(self.area_reward_scale_bps));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_validate() {
        GameParams::default().validate().unwrap();
    }

    #[test]
    fn test_linear_curve_costs() {
        let curve = CostCurve::Linear { base: 100, step: 50 };
        assert_eq!(curve.cost(1), Some(100));
        assert_eq!(curve.cost(2), Some(150));
        assert_eq!(curve.cost(3), Some(200));
        assert_eq!(curve.cost(0), None);
    }

    #[test]
    fn test_geometric_curve_costs() {
        let curve = CostCurve::Geometric { base: 100, factor: 5 };
        assert_eq!(curve.cost(1), Some(100));
        assert_eq!(curve.cost(2), Some(500));
        assert_eq!(curve.cost(3), Some(2_500));
        assert_eq!(curve.cost(4), Some(12_500));
    }

    #[test]
    fn test_geometric_overflow_is_none() {
        let curve = CostCurve::Geometric {
            base: u64::MAX / 2,
            factor: 3,
        };
        assert_eq!(curve.cost(2), None);
    }

    #[test]
    fn test_flat_curve_rejected() {
        let params = GameParams {
            max_level: 3,
            upgrade_cost: CostCurve::Linear { base: 100, step: 0 },
            ..GameParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(ParamsError::CostNotIncreasing { level: 2 })
        );
    }

    #[test]
    fn test_area_toll_must_exceed_shoot_toll() {
        let params = GameParams {
            shoot_toll: 25,
            area_toll: 25,
            ..GameParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ParamsError::AreaTollTooLow { .. })
        ));
    }

    #[test]
    fn test_accuracy_caps_at_max() {
        let accuracy = AccuracyParams {
            base_bps: 6_000,
            per_level_bps: 700,
            max_bps: 9_500,
        };
        assert_eq!(accuracy.chance_bps(1), 6_000);
        assert_eq!(accuracy.chance_bps(2), 6_700);
        assert_eq!(accuracy.chance_bps(5), 8_800);
        assert_eq!(accuracy.chance_bps(100), 9_500);
    }

    #[test]
    fn test_accuracy_above_ten_thousand_rejected() {
        let params = GameParams {
            accuracy: AccuracyParams {
                base_bps: 10_001,
                per_level_bps: 0,
                max_bps: 10_001,
            },
            ..GameParams::default()
        };
        assert_eq!(params.validate(), Err(ParamsError::InvalidAccuracy));
    }

    #[test]
    fn test_partial_json_config_fills_defaults() {
        let params: GameParams =
            serde_json::from_str(r#"{"max_level": 8, "shoot_toll": 10, "area_toll": 40}"#).unwrap();
        assert_eq!(params.max_level, 8);
        assert_eq!(params.shoot_toll, 10);
        assert_eq!(params.area_toll, 40);
        assert_eq!(params.chest_reward, GameParams::default().chest_reward);
        params.validate().unwrap();
    }
}
