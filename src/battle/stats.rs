//! Combatant attributes
//!
//! Profiles are what the kingdom service tells us about a player. Stats are
//! the per-roll snapshot derived from a profile and the current roster.

use serde::{Deserialize, Serialize};

use crate::battle::constants::BASE_ROLLS_PER_ACTIVATION;

/// Combat attributes of one player, supplied by the surrounding game server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatantProfile {
    pub attack: u32,
    pub defense: u32,
    pub leadership: u32,
    pub level: u32,
}

impl CombatantProfile {
    pub fn new(attack: u32, defense: u32, leadership: u32, level: u32) -> Self {
        Self {
            attack,
            defense,
            leadership,
            level,
        }
    }
}

/// Immutable per-roll snapshot of one side's strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatantStats {
    pub attack_power: u32,
    pub defense_power: u32,
    pub leadership: u32,
    /// Participants on this side
    pub army_size: u32,
    pub level: u32,
}

impl CombatantStats {
    /// Snapshot for the player who is rolling
    pub fn for_participant(profile: &CombatantProfile, army_size: u32) -> Self {
        Self {
            attack_power: profile.attack,
            defense_power: profile.defense,
            leadership: profile.leadership,
            army_size,
            level: profile.level,
        }
    }

    /// Snapshot for a whole side: mean attack, defense and level, best leader
    pub fn side_aggregate<'a>(profiles: impl IntoIterator<Item = &'a CombatantProfile>) -> Self {
        let mut count = 0u64;
        let mut attack = 0u64;
        let mut defense = 0u64;
        let mut level = 0u64;
        let mut leadership = 0u32;

        for profile in profiles {
            count += 1;
            attack += u64::from(profile.attack);
            defense += u64::from(profile.defense);
            level += u64::from(profile.level);
            leadership = leadership.max(profile.leadership);
        }

        if count == 0 {
            return Self::default();
        }

        Self {
            attack_power: rounded_mean(attack, count),
            defense_power: rounded_mean(defense, count),
            leadership,
            army_size: count as u32,
            level: rounded_mean(level, count),
        }
    }

    /// Copy with the wall bonus folded into defense. Stored stats stay untouched.
    pub fn with_wall_bonus(self, wall_level: u32, defense_per_level: u32) -> Self {
        Self {
            defense_power: self
                .defense_power
                .saturating_add(wall_level.saturating_mul(defense_per_level)),
            ..self
        }
    }

    /// Hard cap on rolls in one activation
    pub fn max_rolls(&self) -> u32 {
        BASE_ROLLS_PER_ACTIVATION.saturating_add(self.attack_power)
    }
}

fn rounded_mean(sum: u64, count: u64) -> u32 {
    ((sum + count / 2) / count) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_aggregate_means() {
        let profiles = [
            CombatantProfile::new(10, 4, 1, 5),
            CombatantProfile::new(20, 7, 3, 9),
        ];
        let stats = CombatantStats::side_aggregate(&profiles);

        assert_eq!(stats.army_size, 2);
        assert_eq!(stats.attack_power, 15);
        // 5.5 rounds up
        assert_eq!(stats.defense_power, 6);
        assert_eq!(stats.leadership, 3);
        assert_eq!(stats.level, 7);
    }

    #[test]
    fn test_empty_side_is_zeroed() {
        let stats = CombatantStats::side_aggregate(std::iter::empty());
        assert_eq!(stats, CombatantStats::default());
    }

    #[test]
    fn test_wall_bonus_is_additive() {
        let base = CombatantStats::for_participant(&CombatantProfile::new(3, 12, 0, 1), 1);
        let walled = base.with_wall_bonus(3, 5);

        assert_eq!(walled.defense_power, 27);
        assert_eq!(base.defense_power, 12);
        assert_eq!(walled.attack_power, base.attack_power);
    }

    #[test]
    fn test_max_rolls_is_one_plus_attack() {
        let stats = CombatantStats::for_participant(&CombatantProfile::new(4, 0, 0, 1), 1);
        assert_eq!(stats.max_rolls(), 5);

        let unarmed = CombatantStats::for_participant(&CombatantProfile::default(), 1);
        assert_eq!(unarmed.max_rolls(), 1);
    }
}
