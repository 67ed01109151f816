//! Match registry
//!
//! Owns every live match and is the entry point the game server calls.
//! The match map sits behind an `RwLock`. Each match lives in its own `Mutex`
//! together with its cooldown guard, so rolls in different matches never
//! share a lock except the roll source, which is held only while sampling.
//!
//! Lock order is fixed: match, then roll source.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use ahash::AHashMap;
use chrono::{DateTime, Utc};

use crate::battle::events::BattleEvent;
use crate::battle::execution::{JoinReceipt, Match, MatchSetup, RollResult};
use crate::battle::outcome::MatchOutcome;
use crate::battle::resolution::RollChances;
use crate::battle::rolls::{RollSource, SeededRolls};
use crate::battle::snapshot::MatchSnapshot;
use crate::battle::stats::CombatantProfile;
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{MatchId, MatchStatus, PlayerId, RollOutcome, Side, TerritoryId};
use crate::session::CooldownGuard;

/// A match and the roll timers of its participants
struct MatchSlot {
    battle: Match,
    guard: CooldownGuard,
}

type MatchEntry = Arc<Mutex<MatchSlot>>;

/// Borrows the registry's roll source one sample at a time
struct SharedRolls<'a>(&'a Mutex<Box<dyn RollSource>>);

impl RollSource for SharedRolls<'_> {
    fn sample(&mut self, chances: &RollChances) -> RollOutcome {
        let mut source = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        source.sample(chances)
    }
}

pub struct MatchRegistry {
    config: BattleConfig,
    matches: RwLock<AHashMap<MatchId, MatchEntry>>,
    rolls: Mutex<Box<dyn RollSource>>,
}

impl MatchRegistry {
    /// Build a registry. The config is validated once here.
    pub fn new(config: BattleConfig, rolls: Box<dyn RollSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            matches: RwLock::new(AHashMap::new()),
            rolls: Mutex::new(rolls),
        })
    }

    pub fn with_seed(config: BattleConfig, seed: u64) -> Result<Self> {
        Self::new(config, Box::new(SeededRolls::new(seed)))
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    fn entry(&self, match_id: MatchId) -> Result<MatchEntry> {
        let matches = self
            .matches
            .read()
            .map_err(|_| BattleError::LockPoisoned)?;
        matches
            .get(&match_id)
            .cloned()
            .ok_or(BattleError::MatchNotFound(match_id))
    }

    fn with_slot<T>(&self, match_id: MatchId, f: impl FnOnce(&mut MatchSlot) -> Result<T>) -> Result<T> {
        let entry = self.entry(match_id)?;
        let mut slot = entry.lock().map_err(|_| BattleError::LockPoisoned)?;
        f(&mut *slot)
    }

    fn with_match<T>(&self, match_id: MatchId, f: impl FnOnce(&mut Match) -> Result<T>) -> Result<T> {
        self.with_slot(match_id, |slot| f(&mut slot.battle))
    }

    pub fn create_match(&self, setup: MatchSetup, now: DateTime<Utc>) -> Result<MatchId> {
        let battle = Match::new(setup, &self.config, now)?;
        let id = battle.id;
        let slot = MatchSlot {
            battle,
            guard: CooldownGuard::new(&self.config),
        };
        let mut matches = self
            .matches
            .write()
            .map_err(|_| BattleError::LockPoisoned)?;
        matches.insert(id, Arc::new(Mutex::new(slot)));
        Ok(id)
    }

    pub fn join(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
        side: Side,
        profile: CombatantProfile,
        now: DateTime<Utc>,
    ) -> Result<JoinReceipt> {
        self.with_match(match_id, |battle| battle.join(player_id, side, profile, now))
    }

    pub fn leave(&self, match_id: MatchId, player_id: PlayerId, now: DateTime<Utc>) -> Result<MatchStatus> {
        self.with_match(match_id, |battle| battle.leave(player_id, now))
    }

    pub fn refresh_profile(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
        profile: CombatantProfile,
    ) -> Result<()> {
        self.with_match(match_id, |battle| battle.refresh_profile(player_id, profile))
    }

    pub fn start_battle(&self, match_id: MatchId, now: DateTime<Utc>) -> Result<MatchStatus> {
        self.with_match(match_id, |battle| battle.start_battle(now, &self.config))
    }

    pub fn cancel(&self, match_id: MatchId, now: DateTime<Utc>) -> Result<MatchStatus> {
        self.with_match(match_id, |battle| Ok(battle.cancel(now, &self.config)))
    }

    /// Roll for `player_id` against one territory. The whole roll is one
    /// critical section on the match; the roll source is locked only for the
    /// draw itself.
    pub fn roll(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
        territory_id: TerritoryId,
        now: DateTime<Utc>,
    ) -> Result<RollResult> {
        self.with_slot(match_id, |slot| {
            let mut rolls = SharedRolls(&self.rolls);
            slot.battle.roll(
                player_id,
                territory_id,
                now,
                &self.config,
                &mut slot.guard,
                &mut rolls,
            )
        })
    }

    pub fn resolve(&self, match_id: MatchId, now: DateTime<Utc>) -> Result<MatchOutcome> {
        self.with_match(match_id, |battle| battle.resolve(now, &self.config))
    }

    pub fn claim_timeout(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
        now: DateTime<Utc>,
    ) -> Result<MatchOutcome> {
        self.with_match(match_id, |battle| battle.claim_timeout(player_id, now, &self.config))
    }

    pub fn get_status(&self, match_id: MatchId) -> Result<MatchSnapshot> {
        self.with_match(match_id, |battle| Ok(battle.snapshot()))
    }

    /// Take the events recorded since the last drain
    pub fn drain_events(&self, match_id: MatchId) -> Result<Vec<BattleEvent>> {
        self.with_match(match_id, |battle| Ok(battle.events.drain()))
    }

    /// Whether `player_id` may roll in `match_id` at `now`
    pub fn can_roll(&self, match_id: MatchId, player_id: PlayerId, now: DateTime<Utc>) -> Result<bool> {
        self.with_slot(match_id, |slot| Ok(slot.guard.can_roll(player_id, match_id, now)))
    }

    /// Drive timers: close expired pledge windows and apply deadline rulings.
    ///
    /// Returns every match whose status changed.
    pub fn tick(&self, now: DateTime<Utc>) -> Result<Vec<(MatchId, MatchStatus)>> {
        let entries: Vec<(MatchId, MatchEntry)> = {
            let matches = self
                .matches
                .read()
                .map_err(|_| BattleError::LockPoisoned)?;
            matches
                .iter()
                .map(|(id, entry)| (*id, Arc::clone(entry)))
                .collect()
        };

        let mut transitions = Vec::new();
        for (id, entry) in entries {
            let mut slot = entry.lock().map_err(|_| BattleError::LockPoisoned)?;
            if let Some(status) = slot.battle.advance(now, &self.config) {
                transitions.push((id, status));
            }
        }

        if !transitions.is_empty() {
            tracing::debug!(count = transitions.len(), "Tick advanced matches");
        }
        Ok(transitions)
    }

    pub fn active_matches(&self) -> Result<Vec<MatchId>> {
        let matches = self
            .matches
            .read()
            .map_err(|_| BattleError::LockPoisoned)?;
        let mut active = Vec::new();
        for (id, entry) in matches.iter() {
            let slot = entry.lock().map_err(|_| BattleError::LockPoisoned)?;
            if !slot.battle.status.is_terminal() {
                active.push(*id);
            }
        }
        Ok(active)
    }

    /// Drop resolved and cancelled matches along with their roll history
    pub fn prune_finished(&self) -> Result<Vec<MatchId>> {
        let mut matches = self
            .matches
            .write()
            .map_err(|_| BattleError::LockPoisoned)?;
        let mut removed = Vec::new();
        let mut forgotten = 0;
        for (id, entry) in matches.iter() {
            let mut slot = entry.lock().map_err(|_| BattleError::LockPoisoned)?;
            if slot.battle.status.is_terminal() {
                forgotten += slot.guard.forget_match(*id);
                removed.push(*id);
            }
        }
        for id in &removed {
            matches.remove(id);
        }

        tracing::info!(pruned = removed.len(), forgotten, "Pruned finished matches");
        Ok(removed)
    }
}
