//! Cooldown guard
//!
//! Gates every roll on three timers, checked in this order:
//! 1. injury lockout after rolling INJURE
//! 2. action cooldown since the player's last roll in the match
//! 3. roll budget of the current activation (`1 + attack` rolls)
//!
//! An activation opens with the first roll after the previous one closed and
//! lasts `activation_window`. An injury closes it early.

use ahash::AHashMap;
use chrono::{DateTime, Duration, Utc};

use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{MatchId, PlayerId, RollOutcome};
use crate::session::record::RollRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Activation {
    started_at: DateTime<Utc>,
    rolls: u32,
    max_rolls: u32,
}

#[derive(Debug, Clone, Default)]
struct PlayerTimeline {
    records: Vec<RollRecord>,
    activation: Option<Activation>,
    injured_until: Option<DateTime<Utc>>,
}

impl PlayerTimeline {
    fn last_roll_at(&self) -> Option<DateTime<Utc>> {
        self.records.last().map(|r| r.timestamp)
    }

    /// The activation still open at `now`, if any
    fn open_activation(&self, now: DateTime<Utc>, window: Duration) -> Option<Activation> {
        self.activation
            .filter(|activation| now < activation.started_at + window)
    }
}

/// Per-player roll timing, keyed by match and player
#[derive(Debug, Clone)]
pub struct CooldownGuard {
    cooldown: Duration,
    injury_duration: Duration,
    activation_window: Duration,
    timelines: AHashMap<(MatchId, PlayerId), PlayerTimeline>,
}

impl CooldownGuard {
    pub fn new(config: &BattleConfig) -> Self {
        Self {
            cooldown: config.cooldown(),
            injury_duration: config.injury_duration(),
            activation_window: config.activation_window(),
            timelines: AHashMap::new(),
        }
    }

    /// Check whether a roll at `now` is allowed, reporting the blocking rule
    pub fn check(&self, player_id: PlayerId, match_id: MatchId, now: DateTime<Utc>) -> Result<()> {
        let Some(timeline) = self.timelines.get(&(match_id, player_id)) else {
            return Ok(());
        };

        if let Some(injured_until) = timeline.injured_until {
            if now < injured_until {
                return Err(BattleError::Injured {
                    ready_at: injured_until,
                });
            }
        }

        if let Some(last) = timeline.last_roll_at() {
            let ready_at = last + self.cooldown;
            if now < ready_at {
                return Err(BattleError::CooldownNotElapsed { ready_at });
            }
        }

        if let Some(activation) = timeline.open_activation(now, self.activation_window) {
            if activation.rolls >= activation.max_rolls {
                return Err(BattleError::RollBudgetExceeded {
                    max_rolls: activation.max_rolls,
                });
            }
        }

        Ok(())
    }

    pub fn can_roll(&self, player_id: PlayerId, match_id: MatchId, now: DateTime<Utc>) -> bool {
        self.check(player_id, match_id, now).is_ok()
    }

    /// Record a completed roll. `max_rolls` sets the budget when this roll
    /// opens a new activation.
    pub fn record_roll(&mut self, record: RollRecord, max_rolls: u32) {
        let window = self.activation_window;
        let injury_duration = self.injury_duration;
        let timeline = self
            .timelines
            .entry((record.match_id, record.player_id))
            .or_default();

        let mut activation = timeline
            .open_activation(record.timestamp, window)
            .unwrap_or(Activation {
                started_at: record.timestamp,
                rolls: 0,
                max_rolls: max_rolls.max(1),
            });
        activation.rolls += 1;

        if record.outcome == RollOutcome::Injure {
            timeline.injured_until = Some(record.timestamp + injury_duration);
            timeline.activation = None;
        } else {
            timeline.activation = Some(activation);
        }

        timeline.records.push(record);
    }

    /// Rolls left in the open activation, or `None` when the next roll opens a new one
    pub fn rolls_remaining(
        &self,
        player_id: PlayerId,
        match_id: MatchId,
        now: DateTime<Utc>,
    ) -> Option<u32> {
        self.timelines
            .get(&(match_id, player_id))
            .and_then(|t| t.open_activation(now, self.activation_window))
            .map(|a| a.max_rolls.saturating_sub(a.rolls))
    }

    pub fn history(&self, player_id: PlayerId, match_id: MatchId) -> &[RollRecord] {
        self.timelines
            .get(&(match_id, player_id))
            .map(|t| t.records.as_slice())
            .unwrap_or(&[])
    }

    pub fn last_roll(&self, player_id: PlayerId, match_id: MatchId) -> Option<&RollRecord> {
        self.history(player_id, match_id).last()
    }

    /// Drop every record of a finished match
    pub fn forget_match(&mut self, match_id: MatchId) -> usize {
        let before = self.timelines.len();
        self.timelines.retain(|(m, _), _| *m != match_id);
        before - self.timelines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Side, TerritoryId};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 18, 0, 0).unwrap()
    }

    fn record(match_id: MatchId, outcome: RollOutcome, at: DateTime<Utc>) -> RollRecord {
        RollRecord {
            player_id: PlayerId(7),
            match_id,
            territory_id: TerritoryId::North,
            side: Side::Attackers,
            outcome,
            timestamp: at,
        }
    }

    #[test]
    fn test_fresh_player_can_roll() {
        let guard = CooldownGuard::new(&BattleConfig::default());
        assert!(guard.can_roll(PlayerId(7), MatchId::new(), t0()));
    }

    #[test]
    fn test_cooldown_boundary() {
        let config = BattleConfig::default();
        let mut guard = CooldownGuard::new(&config);
        let match_id = MatchId::new();

        guard.record_roll(record(match_id, RollOutcome::Hit, t0()), 5);

        let just_before = t0() + config.cooldown() - Duration::seconds(1);
        assert!(matches!(
            guard.check(PlayerId(7), match_id, just_before),
            Err(BattleError::CooldownNotElapsed { ready_at }) if ready_at == t0() + config.cooldown()
        ));
        assert!(guard.can_roll(PlayerId(7), match_id, t0() + config.cooldown()));
    }

    #[test]
    fn test_cooldown_is_per_match() {
        let mut guard = CooldownGuard::new(&BattleConfig::default());
        let first = MatchId::new();
        guard.record_roll(record(first, RollOutcome::Miss, t0()), 5);

        assert!(!guard.can_roll(PlayerId(7), first, t0()));
        assert!(guard.can_roll(PlayerId(7), MatchId::new(), t0()));
    }

    #[test]
    fn test_injury_outlasts_cooldown() {
        let config = BattleConfig::default();
        let mut guard = CooldownGuard::new(&config);
        let match_id = MatchId::new();

        guard.record_roll(record(match_id, RollOutcome::Injure, t0()), 5);

        let after_cooldown = t0() + config.cooldown();
        assert!(matches!(
            guard.check(PlayerId(7), match_id, after_cooldown),
            Err(BattleError::Injured { .. })
        ));
        assert!(guard.can_roll(PlayerId(7), match_id, t0() + config.injury_duration()));
    }

    #[test]
    fn test_budget_caps_rolls_per_activation() {
        let config = BattleConfig::default();
        let mut guard = CooldownGuard::new(&config);
        let match_id = MatchId::new();

        // Budget of 2 inside a 60 minute window with a 10 minute cooldown
        guard.record_roll(record(match_id, RollOutcome::Miss, t0()), 2);
        let second = t0() + config.cooldown();
        guard.record_roll(record(match_id, RollOutcome::Miss, second), 2);

        let third = second + config.cooldown();
        assert_eq!(guard.rolls_remaining(PlayerId(7), match_id, third), Some(0));
        assert!(matches!(
            guard.check(PlayerId(7), match_id, third),
            Err(BattleError::RollBudgetExceeded { max_rolls: 2 })
        ));

        // A new activation opens once the window closes
        let next_window = t0() + config.activation_window();
        assert!(guard.can_roll(PlayerId(7), match_id, next_window));
        assert_eq!(guard.rolls_remaining(PlayerId(7), match_id, next_window), None);
    }

    #[test]
    fn test_injury_closes_activation() {
        let config = BattleConfig::default();
        let mut guard = CooldownGuard::new(&config);
        let match_id = MatchId::new();

        guard.record_roll(record(match_id, RollOutcome::Injure, t0()), 1);
        let recovered = t0() + config.injury_duration();
        assert!(guard.can_roll(PlayerId(7), match_id, recovered));

        // The next roll starts a fresh budget even though the window is still open
        guard.record_roll(record(match_id, RollOutcome::Hit, recovered), 1);
        assert_eq!(guard.rolls_remaining(PlayerId(7), match_id, recovered), Some(0));
    }

    #[test]
    fn test_history_and_forget() {
        let mut guard = CooldownGuard::new(&BattleConfig::default());
        let match_id = MatchId::new();
        guard.record_roll(record(match_id, RollOutcome::Hit, t0()), 3);

        assert_eq!(guard.history(PlayerId(7), match_id).len(), 1);
        assert_eq!(
            guard.last_roll(PlayerId(7), match_id).map(|r| r.outcome),
            Some(RollOutcome::Hit)
        );

        assert_eq!(guard.forget_match(match_id), 1);
        assert!(guard.history(PlayerId(7), match_id).is_empty());
    }
}
