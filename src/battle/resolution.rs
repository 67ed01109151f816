//! Roll-chance calculation
//!
//! A roll is a lottery over slots: the defender's defense fills miss slots,
//! the roller's attack fills hit and injure slots.

use serde::{Deserialize, Serialize};

use crate::battle::stats::CombatantStats;
use crate::core::config::BattleConfig;
use crate::core::types::RollOutcome;

/// Probability of each roll outcome. Fractions sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollChances {
    pub miss: f64,
    pub hit: f64,
    pub injure: f64,
}

impl RollChances {
    /// A roll that can never make progress
    pub const CERTAIN_MISS: RollChances = RollChances {
        miss: 1.0,
        hit: 0.0,
        injure: 0.0,
    };

    /// Map a uniform draw in [0, 1) onto an outcome.
    ///
    /// Boundaries are cumulative in the order MISS, HIT, INJURE.
    pub fn pick(&self, draw: f64) -> RollOutcome {
        if draw < self.miss {
            RollOutcome::Miss
        } else if draw < self.miss + self.hit || self.injure <= 0.0 {
            RollOutcome::Hit
        } else {
            RollOutcome::Injure
        }
    }

    pub fn probability(&self, outcome: RollOutcome) -> f64 {
        match outcome {
            RollOutcome::Miss => self.miss,
            RollOutcome::Hit => self.hit,
            RollOutcome::Injure => self.injure,
        }
    }
}

/// Compute outcome probabilities for one roll
pub fn compute_chances(
    attacker: &CombatantStats,
    defender: &CombatantStats,
    config: &BattleConfig,
) -> RollChances {
    let attack = f64::from(attacker.attack_power);

    let miss_slots = f64::from(defender.defense_power) * 2.0;
    let hit_slots = attack * config.hit_multiplier;
    let injure_slots = attack * config.injure_multiplier;
    let total = miss_slots + hit_slots + injure_slots;

    if total <= 0.0 {
        return RollChances::CERTAIN_MISS;
    }

    RollChances {
        miss: miss_slots / total,
        hit: hit_slots / total,
        injure: injure_slots / total,
    }
}
