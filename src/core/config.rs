//! Battle configuration with documented constants
//!
//! Every tunable number of the battle engine lives here. Values are inputs,
//! never hardcoded at call sites, so operators can rebalance coups and
//! invasions from a TOML file.

use std::fs;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::core::error::{BattleError, Result};
use crate::core::types::MatchType;

/// Upper bound for every `*_minutes` setting (one year)
pub const MAX_CONFIG_MINUTES: i64 = 366 * 24 * 60;

/// Per-match-type rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRules {
    /// Captured territories needed to win
    pub win_threshold: usize,

    /// Length of the side-joining window before the battle starts
    pub pledge_minutes: i64,

    /// Battle length before the deadline ruling applies
    pub battle_minutes: i64,
}

/// Configuration for the battle engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    // === ROLL CHANCES ===
    /// Hit slots per point of attack
    pub hit_multiplier: f64,

    /// Injure slots per point of attack
    ///
    /// Together with `hit_multiplier` this splits attack 90/10 between
    /// plain hits and injuries.
    pub injure_multiplier: f64,

    // === PUSH ===
    /// Exponent applied to side size before leadership dampening
    ///
    /// At 0.5 a side of four pushes half as far per hit as a lone fighter.
    pub size_exponent_base: f64,

    /// Exponent reduction per leadership tier
    ///
    /// Leaders soften the size penalty. The exponent bottoms out at zero,
    /// where every participant pushes the full base amount.
    pub leadership_dampening_per_tier: f64,

    /// Push multiplier for an INJURE roll relative to a HIT
    pub injure_push_multiplier: f64,

    /// Bar units moved by one unpenalised hit
    ///
    /// The bar spans 1.0 from the midpoint to either capture line, so at 0.25
    /// a lone fighter needs four hits to take a neutral territory.
    pub push_scale: f64,

    /// Defense added per wall level against invaders
    pub wall_defense_per_level: u32,

    // === TIMING ===
    /// Minimum gap between two rolls of one player in one match
    pub battle_action_cooldown_minutes: i64,

    /// Lockout after rolling INJURE
    pub injury_duration_minutes: i64,

    /// Length of a roll activation; each activation allows `1 + attack` rolls
    pub activation_window_minutes: i64,

    // === REWARDS ===
    /// Share of the target treasury looted by victorious invaders
    pub loot_fraction: f64,

    /// Flat reputation for every participant on the winning side
    pub winner_reputation: i64,

    /// Extra reputation per bar unit a participant pushed
    pub reputation_per_push: f64,

    /// Reputation for participants on the losing side
    pub loser_reputation: i64,

    /// Reputation applied to coup attackers when the coup fails
    pub coup_failure_penalty: i64,

    /// Leadership credit for winners of a coup
    pub coup_leadership_credit: u32,

    /// Wall levels destroyed per territory invaders capture
    pub wall_damage_per_capture: u32,

    // === MATCH RULES ===
    pub coup: MatchRules,
    pub invasion: MatchRules,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            // Roll chances (hit:injure = 9:1)
            hit_multiplier: 0.9,
            injure_multiplier: 0.1,

            // Push
            size_exponent_base: 0.5,
            leadership_dampening_per_tier: 0.05,
            injure_push_multiplier: 2.0,
            push_scale: 0.25,
            wall_defense_per_level: 5,

            // Timing
            battle_action_cooldown_minutes: 10,
            injury_duration_minutes: 30,
            activation_window_minutes: 60,

            // Rewards
            loot_fraction: 0.1,
            winner_reputation: 50,
            reputation_per_push: 20.0,
            loser_reputation: 10,
            coup_failure_penalty: -25,
            coup_leadership_credit: 1,
            wall_damage_per_capture: 1,

            coup: MatchRules {
                win_threshold: 2,
                pledge_minutes: 12 * 60,
                battle_minutes: 4 * 60,
            },
            invasion: MatchRules {
                win_threshold: 3,
                pledge_minutes: 24 * 60,
                battle_minutes: 6 * 60,
            },
        }
    }
}

impl BattleConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BattleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn rules(&self, match_type: MatchType) -> &MatchRules {
        match match_type {
            MatchType::Coup => &self.coup,
            MatchType::Invasion => &self.invasion,
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::minutes(self.battle_action_cooldown_minutes)
    }

    pub fn injury_duration(&self) -> Duration {
        Duration::minutes(self.injury_duration_minutes)
    }

    pub fn activation_window(&self) -> Duration {
        Duration::minutes(self.activation_window_minutes)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let ratios = [
            ("hit_multiplier", self.hit_multiplier),
            ("injure_multiplier", self.injure_multiplier),
            ("size_exponent_base", self.size_exponent_base),
            ("leadership_dampening_per_tier", self.leadership_dampening_per_tier),
            ("injure_push_multiplier", self.injure_push_multiplier),
            ("push_scale", self.push_scale),
            ("loot_fraction", self.loot_fraction),
            ("reputation_per_push", self.reputation_per_push),
        ];
        for (name, value) in ratios {
            if !value.is_finite() || value < 0.0 {
                return Err(BattleError::InvalidConfig(format!(
                    "{} ({}) must be finite and non-negative",
                    name, value
                )));
            }
        }

        if self.push_scale == 0.0 {
            return Err(BattleError::InvalidConfig(
                "push_scale must be positive".into(),
            ));
        }

        if self.loot_fraction > 1.0 {
            return Err(BattleError::InvalidConfig(format!(
                "loot_fraction ({}) must be within [0, 1]",
                self.loot_fraction
            )));
        }

        let in_range = |minutes: i64| (0..=MAX_CONFIG_MINUTES).contains(&minutes);
        if !in_range(self.battle_action_cooldown_minutes)
            || !in_range(self.injury_duration_minutes)
            || !in_range(self.activation_window_minutes)
            || self.activation_window_minutes == 0
        {
            return Err(BattleError::InvalidConfig(format!(
                "durations must lie within [0, {}] minutes and the activation window be positive",
                MAX_CONFIG_MINUTES
            )));
        }

        for match_type in [MatchType::Coup, MatchType::Invasion] {
            let rules = self.rules(match_type);
            let total = match_type.territories().len();

            // A threshold over half the map means both sides can never reach it,
            // and at most ceil(half) keeps exhaustion decisive.
            if rules.win_threshold * 2 <= total || rules.win_threshold > total.div_ceil(2) {
                return Err(BattleError::InvalidConfig(format!(
                    "{:?} win_threshold ({}) must equal a strict majority of {} territories",
                    match_type, rules.win_threshold, total
                )));
            }

            if !in_range(rules.pledge_minutes)
                || !in_range(rules.battle_minutes)
                || rules.battle_minutes == 0
            {
                return Err(BattleError::InvalidConfig(format!(
                    "{:?} pledge/battle durations are invalid",
                    match_type
                )));
            }
        }

        Ok(())
    }
}
