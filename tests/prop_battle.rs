//! Property-based tests for roll chances, push and territory bars.
//!
//! Run with: cargo test --release prop_battle

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use kingdom_battle::battle::{
    compute_chances, compute_push, CombatantStats, Territory, BAR_MAX, BAR_MIN, CHANCE_EPSILON,
};
use kingdom_battle::core::types::{RollOutcome, Side, TerritoryId};
use kingdom_battle::BattleConfig;

fn stats(attack: u32, defense: u32, leadership: u32, army_size: u32) -> CombatantStats {
    CombatantStats {
        attack_power: attack,
        defense_power: defense,
        leadership,
        army_size,
        level: 1,
    }
}

fn outcome_strategy() -> impl Strategy<Value = RollOutcome> {
    prop_oneof![
        Just(RollOutcome::Miss),
        Just(RollOutcome::Hit),
        Just(RollOutcome::Injure),
    ]
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Attackers), Just(Side::Defenders)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// Chances are non-negative and always sum to one.
    #[test]
    fn prop_chances_are_normalised(
        attack in 0u32..100_000,
        defense in 0u32..100_000,
    ) {
        let config = BattleConfig::default();
        let chances = compute_chances(&stats(attack, 0, 0, 1), &stats(0, defense, 0, 1), &config);

        prop_assert!(chances.miss >= 0.0);
        prop_assert!(chances.hit >= 0.0);
        prop_assert!(chances.injure >= 0.0);
        prop_assert!((chances.miss + chances.hit + chances.injure - 1.0).abs() < CHANCE_EPSILON);
    }

    /// More defenders on the wall never make a hit more likely.
    #[test]
    fn prop_defense_never_helps_the_roller(
        attack in 1u32..1_000,
        defense in 0u32..1_000,
        bonus in 1u32..100,
    ) {
        let config = BattleConfig::default();
        let roller = stats(attack, 0, 0, 1);
        let base = compute_chances(&roller, &stats(0, defense, 0, 1), &config);
        let walled = compute_chances(&roller, &stats(0, defense + bonus, 0, 1), &config);

        prop_assert!(walled.miss >= base.miss);
        prop_assert!(walled.hit <= base.hit);
    }

    /// Push never grows as a side gets bigger.
    #[test]
    fn prop_push_non_increasing_in_side_size(
        size in 1u32..10_000,
        extra in 1u32..1_000,
        leadership in 0u32..30,
        outcome in outcome_strategy(),
    ) {
        let config = BattleConfig::default();
        let small = compute_push(outcome, size, leadership, &config);
        let large = compute_push(outcome, size + extra, leadership, &config);

        prop_assert!(large <= small + 1e-12);
        prop_assert!(small >= 0.0);
        prop_assert!(small <= config.push_scale * config.injure_push_multiplier + 1e-12);
    }

    /// Whatever sequence of pushes lands, the bar stays in bounds and a
    /// captured territory refuses further pushes.
    #[test]
    fn prop_bar_stays_in_bounds(
        pushes in prop::collection::vec((side_strategy(), 0.0f64..3.0), 1..60),
    ) {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut territory = Territory::new(TerritoryId::North);

        for (order, (side, push)) in pushes.into_iter().enumerate() {
            if territory.is_captured() {
                prop_assert!(territory.apply_push(side, push, now, order as u32).is_err());
                break;
            }
            let captured = territory.apply_push(side, push, now, order as u32).unwrap();
            prop_assert!(territory.bar_position >= BAR_MIN);
            prop_assert!(territory.bar_position <= BAR_MAX);
            if let Some(winner) = captured {
                prop_assert_eq!(Some(winner), territory.captured_by);
                prop_assert_eq!(territory.bar_position.abs(), 1.0);
            }
        }
    }
}
