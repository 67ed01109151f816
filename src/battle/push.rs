//! Push calculation: how far one roll moves a territory bar
//!
//! Bigger sides push less per hit. Leadership flattens that penalty.

use crate::core::config::BattleConfig;
use crate::core::types::RollOutcome;

/// Size exponent after leadership dampening, never below zero
pub fn push_exponent(leadership: u32, config: &BattleConfig) -> f64 {
    let dampening = f64::from(leadership) * config.leadership_dampening_per_tier;
    (config.size_exponent_base - dampening).max(0.0)
}

/// Unsigned bar distance for one roll outcome.
///
/// Callers must reject empty sides before getting here; a size of zero is
/// treated as a lone fighter.
pub fn compute_push(
    outcome: RollOutcome,
    side_size: u32,
    leadership: u32,
    config: &BattleConfig,
) -> f64 {
    let size = f64::from(side_size.max(1));
    let base_push = config.push_scale / size.powf(push_exponent(leadership, config));

    match outcome {
        RollOutcome::Miss => 0.0,
        RollOutcome::Hit => base_push,
        RollOutcome::Injure => base_push * config.injure_push_multiplier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lone_fighter_pushes_full_scale() {
        let config = BattleConfig::default();
        let push = compute_push(RollOutcome::Hit, 1, 0, &config);
        assert!((push - config.push_scale).abs() < 1e-12);
    }

    #[test]
    fn test_miss_never_pushes() {
        let config = BattleConfig::default();
        assert_eq!(compute_push(RollOutcome::Miss, 3, 5, &config), 0.0);
    }

    #[test]
    fn test_injure_multiplies_hit() {
        let config = BattleConfig::default();
        let hit = compute_push(RollOutcome::Hit, 4, 1, &config);
        let injure = compute_push(RollOutcome::Injure, 4, 1, &config);
        assert!((injure - hit * config.injure_push_multiplier).abs() < 1e-12);
    }

    #[test]
    fn test_larger_sides_push_less() {
        let config = BattleConfig::default();
        let small = compute_push(RollOutcome::Hit, 2, 0, &config);
        let large = compute_push(RollOutcome::Hit, 16, 0, &config);
        assert!(large < small);

        // exponent 0.5: sixteen fighters push a quarter as far as one
        let lone = compute_push(RollOutcome::Hit, 1, 0, &config);
        assert!((large - lone / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_leadership_flattens_size_penalty() {
        let config = BattleConfig::default();
        let led = compute_push(RollOutcome::Hit, 9, 4, &config);
        let unled = compute_push(RollOutcome::Hit, 9, 0, &config);
        assert!(led > unled);
    }

    #[test]
    fn test_exponent_floors_at_zero() {
        let config = BattleConfig::default();
        assert_eq!(push_exponent(1_000, &config), 0.0);

        // With no size penalty every side pushes the full scale
        let push = compute_push(RollOutcome::Hit, 50, 1_000, &config);
        assert!((push - config.push_scale).abs() < 1e-12);
    }

    #[test]
    fn test_zero_size_treated_as_one() {
        let config = BattleConfig::default();
        assert_eq!(
            compute_push(RollOutcome::Hit, 0, 0, &config),
            compute_push(RollOutcome::Hit, 1, 0, &config)
        );
    }
}
