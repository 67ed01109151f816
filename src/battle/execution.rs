//! Match orchestration
//!
//! One `Match` is one coup or invasion:
//! PLEDGE (sides gather) -> BATTLE (rolls accepted) -> RESOLVED | CANCELLED
//!
//! Each roll: guard check -> chances -> sample -> push -> territory -> victory check

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::battle::events::{BattleEventLog, BattleEventType};
use crate::battle::outcome::{MatchOutcome, ResolutionCause};
use crate::battle::push::compute_push;
use crate::battle::resolution::{compute_chances, RollChances};
use crate::battle::rolls::RollSource;
use crate::battle::roster::Roster;
use crate::battle::snapshot::{MatchSnapshot, TerritorySnapshot};
use crate::battle::stats::{CombatantProfile, CombatantStats};
use crate::battle::territory::Territory;
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{
    KingdomId, MatchId, MatchStatus, MatchType, PlayerId, RollOutcome, Side, TerritoryId,
};
use crate::session::{CooldownGuard, RollRecord};

/// The kingdom under attack, as the kingdom service sees it at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTarget {
    pub kingdom_id: KingdomId,
    pub ruler: Option<PlayerId>,
    pub wall_level: u32,
    pub treasury: u64,
}

/// Everything needed to open a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSetup {
    pub match_type: MatchType,
    pub initiator: PlayerId,
    pub initiator_profile: CombatantProfile,
    pub target: MatchTarget,
    /// Territories that start away from the midpoint
    pub opening_bars: Vec<(TerritoryId, f64)>,
}

impl MatchSetup {
    pub fn coup(initiator: PlayerId, profile: CombatantProfile, target: MatchTarget) -> Self {
        Self {
            match_type: MatchType::Coup,
            initiator,
            initiator_profile: profile,
            target,
            opening_bars: Vec::new(),
        }
    }

    pub fn invasion(initiator: PlayerId, profile: CombatantProfile, target: MatchTarget) -> Self {
        Self {
            match_type: MatchType::Invasion,
            ..Self::coup(initiator, profile, target)
        }
    }

    pub fn with_opening_bar(mut self, territory: TerritoryId, bar_position: f64) -> Self {
        self.opening_bars.push((territory, bar_position));
        self
    }
}

/// Answer to a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReceipt {
    pub success: bool,
    pub side: Side,
    pub attackers: usize,
    pub defenders: usize,
}

/// Answer to a roll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollResult {
    pub player_id: PlayerId,
    pub side: Side,
    pub territory: TerritoryId,
    pub outcome: RollOutcome,
    pub chances: RollChances,
    /// Bar distance actually moved after clamping
    pub push: f64,
    pub new_bar_position: f64,
    pub territory_captured: Option<Side>,
    /// Set when this roll ended the match
    pub match_outcome: Option<MatchOutcome>,
}

#[derive(Debug, Clone)]
pub struct Match {
    pub id: MatchId,
    pub match_type: MatchType,
    pub status: MatchStatus,
    pub initiator: PlayerId,
    pub target: MatchTarget,
    pub win_threshold: usize,
    pub territories: Vec<Territory>,
    pub attackers: Roster,
    pub defenders: Roster,

    pub created_at: DateTime<Utc>,
    pub pledge_ends_at: DateTime<Utc>,
    pub battle_started_at: Option<DateTime<Utc>>,
    pub battle_ends_at: Option<DateTime<Utc>>,
    /// When the match reached RESOLVED or CANCELLED
    pub resolved_at: Option<DateTime<Utc>>,

    pub outcome: Option<MatchOutcome>,
    pub events: BattleEventLog,
    captures_made: u32,
}

impl Match {
    pub fn new(setup: MatchSetup, config: &BattleConfig, now: DateTime<Utc>) -> Result<Self> {
        let rules = config.rules(setup.match_type);

        let mut territories: Vec<Territory> = setup
            .match_type
            .territories()
            .iter()
            .map(|&id| Territory::new(id))
            .collect();
        for (id, bar_position) in setup.opening_bars {
            let slot = territories
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(BattleError::TerritoryNotInMatch(id))?;
            *slot = Territory::with_opening_bar(id, bar_position)?;
        }

        let mut attackers = Roster::new(Side::Attackers);
        attackers.upsert(setup.initiator, setup.initiator_profile, now);

        let mut battle = Self {
            id: MatchId::new(),
            match_type: setup.match_type,
            status: MatchStatus::Pledge,
            initiator: setup.initiator,
            target: setup.target,
            win_threshold: rules.win_threshold,
            territories,
            attackers,
            defenders: Roster::new(Side::Defenders),
            created_at: now,
            pledge_ends_at: now + Duration::minutes(rules.pledge_minutes),
            battle_started_at: None,
            battle_ends_at: None,
            resolved_at: None,
            outcome: None,
            events: BattleEventLog::new(),
            captures_made: 0,
        };

        battle.log(
            BattleEventType::MatchCreated {
                match_type: battle.match_type,
                initiator: battle.initiator,
            },
            now,
        );
        battle.log(
            BattleEventType::PlayerJoined {
                player: battle.initiator,
                side: Side::Attackers,
            },
            now,
        );

        tracing::info!(
            match_id = %battle.id,
            match_type = ?battle.match_type,
            initiator = %battle.initiator,
            kingdom = battle.target.kingdom_id.0,
            "Match created"
        );

        Ok(battle)
    }

    pub fn roster(&self, side: Side) -> &Roster {
        match side {
            Side::Attackers => &self.attackers,
            Side::Defenders => &self.defenders,
        }
    }

    fn roster_mut(&mut self, side: Side) -> &mut Roster {
        match side {
            Side::Attackers => &mut self.attackers,
            Side::Defenders => &mut self.defenders,
        }
    }

    pub fn side_of(&self, player_id: PlayerId) -> Option<Side> {
        if self.attackers.contains(player_id) {
            Some(Side::Attackers)
        } else if self.defenders.contains(player_id) {
            Some(Side::Defenders)
        } else {
            None
        }
    }

    pub fn territory(&self, territory_id: TerritoryId) -> Option<&Territory> {
        self.territories.iter().find(|t| t.id == territory_id)
    }

    pub fn captures(&self, side: Side) -> usize {
        self.territories
            .iter()
            .filter(|t| t.captured_by == Some(side))
            .count()
    }

    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.battle_ends_at.is_some_and(|end| now >= end)
    }

    fn require(&self, expected: MatchStatus, action: &'static str) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(BattleError::InvalidMatchState {
                action,
                status: self.status,
            })
        }
    }

    fn log(&mut self, event_type: BattleEventType, at: DateTime<Utc>) {
        let id = self.id;
        self.events.push(id, event_type, at);
    }

    fn receipt(&self, side: Side) -> JoinReceipt {
        JoinReceipt {
            success: true,
            side,
            attackers: self.attackers.len(),
            defenders: self.defenders.len(),
        }
    }

    // ===== PLEDGE =====

    /// Pledge a player to a side. Re-joining the same side refreshes the profile.
    pub fn join(
        &mut self,
        player_id: PlayerId,
        side: Side,
        profile: CombatantProfile,
        now: DateTime<Utc>,
    ) -> Result<JoinReceipt> {
        self.require(MatchStatus::Pledge, "join")?;

        if let Some(current) = self.side_of(player_id) {
            if current != side {
                return Err(BattleError::AlreadyJoined {
                    player: player_id,
                    side: current,
                });
            }
        }

        let is_new = !self.roster(side).contains(player_id);
        self.roster_mut(side).upsert(player_id, profile, now);

        if is_new {
            self.log(
                BattleEventType::PlayerJoined {
                    player: player_id,
                    side,
                },
                now,
            );
            tracing::debug!(match_id = %self.id, player = %player_id, ?side, "Player pledged");
        }

        Ok(self.receipt(side))
    }

    /// Withdraw a pledge. The initiator withdrawing aborts the whole match.
    pub fn leave(&mut self, player_id: PlayerId, now: DateTime<Utc>) -> Result<MatchStatus> {
        self.require(MatchStatus::Pledge, "leave")?;
        let side = self
            .side_of(player_id)
            .ok_or(BattleError::PlayerNotParticipant(player_id))?;

        if player_id == self.initiator {
            self.cancel_with("initiator withdrew", now);
            return Ok(self.status);
        }

        self.roster_mut(side).remove(player_id);
        self.log(
            BattleEventType::PlayerLeft {
                player: player_id,
                side,
            },
            now,
        );
        Ok(self.status)
    }

    /// Replace a participant's cached combat attributes
    pub fn refresh_profile(&mut self, player_id: PlayerId, profile: CombatantProfile) -> Result<()> {
        if self.status.is_terminal() {
            return Err(BattleError::InvalidMatchState {
                action: "refresh_profile",
                status: self.status,
            });
        }
        let side = self
            .side_of(player_id)
            .ok_or(BattleError::PlayerNotParticipant(player_id))?;
        if let Some(participant) = self.roster_mut(side).get_mut(player_id) {
            participant.profile = profile;
        }
        Ok(())
    }

    /// Close the pledge window. An empty side cancels the match.
    pub fn start_battle(&mut self, now: DateTime<Utc>, config: &BattleConfig) -> Result<MatchStatus> {
        self.require(MatchStatus::Pledge, "start_battle")?;

        for side in [Side::Attackers, Side::Defenders] {
            if self.roster(side).is_empty() {
                self.cancel_with(&format!("no {:?} pledged", side), now);
                return Err(BattleError::NoParticipants(side));
            }
        }

        let rules = config.rules(self.match_type);
        self.status = MatchStatus::Battle;
        self.battle_started_at = Some(now);
        self.battle_ends_at = Some(now + Duration::minutes(rules.battle_minutes));

        self.log(
            BattleEventType::BattleStarted {
                attackers: self.attackers.len(),
                defenders: self.defenders.len(),
            },
            now,
        );
        tracing::info!(
            match_id = %self.id,
            attackers = self.attackers.len(),
            defenders = self.defenders.len(),
            "Battle started"
        );

        Ok(self.status)
    }

    // ===== BATTLE =====

    /// Resolve one roll by `player_id` against `territory_id`
    pub fn roll(
        &mut self,
        player_id: PlayerId,
        territory_id: TerritoryId,
        now: DateTime<Utc>,
        config: &BattleConfig,
        guard: &mut CooldownGuard,
        source: &mut dyn RollSource,
    ) -> Result<RollResult> {
        if self.status == MatchStatus::Battle && self.deadline_passed(now) {
            self.finish(self.deadline_winner(), ResolutionCause::Deadline, now, config);
        }
        self.require(MatchStatus::Battle, "roll")?;

        let side = self
            .side_of(player_id)
            .ok_or(BattleError::PlayerNotParticipant(player_id))?;
        let index = self
            .territories
            .iter()
            .position(|t| t.id == territory_id)
            .ok_or(BattleError::TerritoryNotInMatch(territory_id))?;
        if self.territories[index].is_captured() {
            return Err(BattleError::TerritoryAlreadyCaptured(territory_id));
        }

        guard.check(player_id, self.id, now)?;

        let own = self.roster(side);
        let profile = own
            .get(player_id)
            .map(|p| p.profile)
            .ok_or(BattleError::PlayerNotParticipant(player_id))?;
        let roller = CombatantStats::for_participant(&profile, own.len() as u32);

        let mut opponent = CombatantStats::side_aggregate(self.roster(side.opponent()).profiles());
        if side == Side::Attackers && self.match_type.uses_walls() {
            opponent = opponent.with_wall_bonus(self.target.wall_level, config.wall_defense_per_level);
        }

        let chances = compute_chances(&roller, &opponent, config);
        let outcome = source.sample(&chances);
        let push = compute_push(outcome, roller.army_size, roller.leadership, config);

        let order = self.captures_made + 1;
        let territory = &mut self.territories[index];
        let before = territory.bar_position;
        let captured = territory.apply_push(side, push, now, order)?;
        let new_bar_position = territory.bar_position;
        let moved = (new_bar_position - before).abs();
        if captured.is_some() {
            self.captures_made = order;
        }

        guard.record_roll(
            RollRecord {
                player_id,
                match_id: self.id,
                territory_id,
                side,
                outcome,
                timestamp: now,
            },
            roller.max_rolls(),
        );

        let roster = self.roster_mut(side);
        roster.last_roll_at = Some(now);
        if let Some(participant) = roster.get_mut(player_id) {
            participant.contribution.record(outcome, moved);
        }

        self.log(
            BattleEventType::Rolled {
                player: player_id,
                side,
                territory: territory_id,
                outcome,
                bar_position: new_bar_position,
            },
            now,
        );
        tracing::debug!(
            match_id = %self.id,
            player = %player_id,
            territory = territory_id.name(),
            ?outcome,
            bar = new_bar_position,
            "Roll resolved"
        );

        let mut match_outcome = None;
        if let Some(capturer) = captured {
            self.log(
                BattleEventType::TerritoryCaptured {
                    territory: territory_id,
                    side: capturer,
                },
                now,
            );
            tracing::info!(
                match_id = %self.id,
                territory = territory_id.name(),
                side = ?capturer,
                "Territory captured"
            );
            match_outcome = self.check_victory(now, config);
        }

        Ok(RollResult {
            player_id,
            side,
            territory: territory_id,
            outcome,
            chances,
            push: moved,
            new_bar_position,
            territory_captured: captured,
            match_outcome,
        })
    }

    /// End the match if a side reached the threshold or nothing is left to take.
    ///
    /// One roll captures at most one territory, so the first side to reach
    /// the threshold chronologically is the only one that can.
    fn check_victory(&mut self, now: DateTime<Utc>, config: &BattleConfig) -> Option<MatchOutcome> {
        let attacker_captures = self.captures(Side::Attackers);
        let defender_captures = self.captures(Side::Defenders);

        let decided = if attacker_captures >= self.win_threshold {
            Some((Side::Attackers, ResolutionCause::Threshold))
        } else if defender_captures >= self.win_threshold {
            Some((Side::Defenders, ResolutionCause::Threshold))
        } else if self.territories.iter().all(Territory::is_captured) {
            let winner = if attacker_captures > defender_captures {
                Side::Attackers
            } else {
                Side::Defenders
            };
            Some((winner, ResolutionCause::Exhaustion))
        } else {
            None
        };

        decided.map(|(winner, cause)| self.finish(winner, cause, now, config))
    }

    /// Deadline ruling: more captures, then bar advantage, ties keep the status quo
    pub fn deadline_winner(&self) -> Side {
        let attacker_captures = self.captures(Side::Attackers);
        let defender_captures = self.captures(Side::Defenders);
        if attacker_captures != defender_captures {
            return if attacker_captures > defender_captures {
                Side::Attackers
            } else {
                Side::Defenders
            };
        }

        let attacker_lean: f64 = self
            .territories
            .iter()
            .filter(|t| !t.is_captured())
            .map(|t| t.lean_toward(Side::Attackers))
            .sum();
        if attacker_lean > 0.0 {
            Side::Attackers
        } else {
            Side::Defenders
        }
    }

    fn finish(
        &mut self,
        winner: Side,
        cause: ResolutionCause,
        now: DateTime<Utc>,
        config: &BattleConfig,
    ) -> MatchOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let outcome = MatchOutcome::compute(self, winner, cause, now, config);
        self.status = MatchStatus::Resolved;
        self.resolved_at = Some(now);
        self.outcome = Some(outcome.clone());

        self.log(BattleEventType::MatchResolved { winner, cause }, now);
        tracing::info!(
            match_id = %self.id,
            ?winner,
            ?cause,
            loot = outcome.loot,
            wall_damage = outcome.wall_damage,
            "Match resolved"
        );

        outcome
    }

    fn cancel_with(&mut self, reason: &str, now: DateTime<Utc>) {
        self.status = MatchStatus::Cancelled;
        self.resolved_at = Some(now);
        self.log(
            BattleEventType::MatchCancelled {
                reason: reason.to_string(),
            },
            now,
        );
        tracing::warn!(match_id = %self.id, reason, "Match cancelled");
    }

    // ===== TERMINATION =====

    /// Outcome of the match. Repeated calls return the cached outcome.
    pub fn resolve(&mut self, now: DateTime<Utc>, config: &BattleConfig) -> Result<MatchOutcome> {
        if let Some(outcome) = &self.outcome {
            return Ok(outcome.clone());
        }
        self.require(MatchStatus::Battle, "resolve")?;

        if self.deadline_passed(now) {
            return Ok(self.finish(self.deadline_winner(), ResolutionCause::Deadline, now, config));
        }

        self.check_victory(now, config)
            .ok_or(BattleError::InvalidMatchState {
                action: "resolve",
                status: self.status,
            })
    }

    /// Claim that the opposing side has gone idle for a full action cooldown.
    ///
    /// Only a side that rolled after the opponent last did may claim. When
    /// both sides are idle, neither can.
    pub fn claim_timeout(
        &mut self,
        player_id: PlayerId,
        now: DateTime<Utc>,
        config: &BattleConfig,
    ) -> Result<MatchOutcome> {
        let side = self
            .side_of(player_id)
            .ok_or(BattleError::PlayerNotParticipant(player_id))?;
        if let Some(outcome) = &self.outcome {
            return Ok(outcome.clone());
        }
        self.require(MatchStatus::Battle, "claim_timeout")?;

        if self.deadline_passed(now) {
            return Ok(self.finish(self.deadline_winner(), ResolutionCause::Deadline, now, config));
        }

        let forfeiting = side.opponent();
        let idle_since = self
            .roster(forfeiting)
            .last_roll_at
            .or(self.battle_started_at)
            .unwrap_or(self.created_at);
        let available_at = idle_since + config.cooldown();
        if now < available_at {
            return Err(BattleError::TimeoutNotReached { available_at });
        }
        let active_since = self.roster(side).last_roll_at;
        if !active_since.is_some_and(|at| at > idle_since) {
            return Err(BattleError::ClaimantIdle { since: idle_since });
        }

        self.log(
            BattleEventType::ForfeitClaimed {
                claimant: player_id,
                forfeiting,
            },
            now,
        );
        tracing::warn!(match_id = %self.id, claimant = %player_id, ?forfeiting, "Forfeit claimed");

        Ok(self.finish(side, ResolutionCause::Forfeit, now, config))
    }

    /// Abort the match. A match that is already decidable resolves instead.
    pub fn cancel(&mut self, now: DateTime<Utc>, config: &BattleConfig) -> MatchStatus {
        match self.status {
            MatchStatus::Resolved | MatchStatus::Cancelled => {}
            MatchStatus::Battle if self.deadline_passed(now) => {
                self.finish(self.deadline_winner(), ResolutionCause::Deadline, now, config);
            }
            MatchStatus::Pledge | MatchStatus::Battle => self.cancel_with("aborted", now),
        }
        self.status
    }

    /// Apply timer-driven transitions. Returns the new status if one happened.
    pub fn advance(&mut self, now: DateTime<Utc>, config: &BattleConfig) -> Option<MatchStatus> {
        match self.status {
            MatchStatus::Pledge if now >= self.pledge_ends_at => {
                if let Err(err) = self.start_battle(now, config) {
                    tracing::warn!(match_id = %self.id, %err, "Pledge expired without a battle");
                }
                Some(self.status)
            }
            MatchStatus::Battle if self.deadline_passed(now) => {
                self.finish(self.deadline_winner(), ResolutionCause::Deadline, now, config);
                Some(self.status)
            }
            _ => None,
        }
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            id: self.id,
            match_type: self.match_type,
            status: self.status,
            initiator: self.initiator,
            target: self.target,
            win_threshold: self.win_threshold,
            territories: self
                .territories
                .iter()
                .map(|t| TerritorySnapshot {
                    id: t.id,
                    name: t.name().to_string(),
                    state: t.state(),
                    bar_position: t.bar_position,
                    capture_time: t.capture_time,
                })
                .collect(),
            attackers: self.attackers.player_ids(),
            defenders: self.defenders.player_ids(),
            created_at: self.created_at,
            pledge_ends_at: self.pledge_ends_at,
            battle_started_at: self.battle_started_at,
            battle_ends_at: self.battle_ends_at,
            resolved_at: self.resolved_at,
            outcome: self.outcome.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::rolls::ScriptedRolls;
    use crate::battle::territory::TerritoryState;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    fn target(wall_level: u32) -> MatchTarget {
        MatchTarget {
            kingdom_id: KingdomId(3),
            ruler: Some(PlayerId(99)),
            wall_level,
            treasury: 10_000,
        }
    }

    fn fighter() -> CombatantProfile {
        CombatantProfile::new(10, 5, 0, 3)
    }

    fn started(setup: MatchSetup, config: &BattleConfig) -> Match {
        let mut battle = Match::new(setup, config, t0()).unwrap();
        battle.join(PlayerId(99), Side::Defenders, fighter(), t0()).unwrap();
        battle.start_battle(t0(), config).unwrap();
        battle
    }

    #[test]
    fn test_new_match_pledges_initiator() {
        let config = BattleConfig::default();
        let battle = Match::new(MatchSetup::coup(PlayerId(1), fighter(), target(0)), &config, t0())
            .unwrap();

        assert_eq!(battle.status, MatchStatus::Pledge);
        assert_eq!(battle.side_of(PlayerId(1)), Some(Side::Attackers));
        assert_eq!(battle.territories.len(), 3);
        assert_eq!(battle.win_threshold, 2);
        assert_eq!(battle.pledge_ends_at, t0() + Duration::minutes(config.coup.pledge_minutes));
    }

    #[test]
    fn test_opening_bar_must_belong_to_match() {
        let config = BattleConfig::default();
        let setup = MatchSetup::coup(PlayerId(1), fighter(), target(0))
            .with_opening_bar(TerritoryId::Capitol, 0.2);
        assert!(matches!(
            Match::new(setup, &config, t0()),
            Err(BattleError::TerritoryNotInMatch(TerritoryId::Capitol))
        ));
    }

    #[test]
    fn test_cannot_switch_sides() {
        let config = BattleConfig::default();
        let mut battle =
            Match::new(MatchSetup::coup(PlayerId(1), fighter(), target(0)), &config, t0()).unwrap();

        let receipt = battle.join(PlayerId(1), Side::Attackers, fighter(), t0()).unwrap();
        assert_eq!(receipt.attackers, 1);

        let err = battle.join(PlayerId(1), Side::Defenders, fighter(), t0()).unwrap_err();
        assert!(matches!(
            err,
            BattleError::AlreadyJoined { side: Side::Attackers, .. }
        ));
    }

    #[test]
    fn test_start_with_empty_side_cancels() {
        let config = BattleConfig::default();
        let mut battle =
            Match::new(MatchSetup::coup(PlayerId(1), fighter(), target(0)), &config, t0()).unwrap();

        let err = battle.start_battle(t0(), &config).unwrap_err();
        assert!(matches!(err, BattleError::NoParticipants(Side::Defenders)));
        assert_eq!(battle.status, MatchStatus::Cancelled);
    }

    #[test]
    fn test_initiator_leaving_cancels() {
        let config = BattleConfig::default();
        let mut battle =
            Match::new(MatchSetup::coup(PlayerId(1), fighter(), target(0)), &config, t0()).unwrap();
        battle.join(PlayerId(2), Side::Attackers, fighter(), t0()).unwrap();

        assert_eq!(battle.leave(PlayerId(2), t0()).unwrap(), MatchStatus::Pledge);
        assert_eq!(battle.leave(PlayerId(1), t0()).unwrap(), MatchStatus::Cancelled);
        assert_eq!(battle.resolved_at, Some(t0()));
    }

    #[test]
    fn test_wall_bonus_only_on_invader_rolls() {
        let config = BattleConfig::default();
        let mut guard = CooldownGuard::new(&config);
        let mut rolls = ScriptedRolls::default();
        let mut battle = started(
            MatchSetup::invasion(PlayerId(1), fighter(), target(3)),
            &config,
        );

        // attacker: miss = (5 + 15) * 2 = 40, hit = 9, injure = 1
        let attack = battle
            .roll(PlayerId(1), TerritoryId::North, t0(), &config, &mut guard, &mut rolls)
            .unwrap();
        assert!((attack.chances.miss - 40.0 / 50.0).abs() < 1e-9);

        // defender: no wall help, miss = 5 * 2 = 10 out of 20
        let defend = battle
            .roll(PlayerId(99), TerritoryId::North, t0(), &config, &mut guard, &mut rolls)
            .unwrap();
        assert!((defend.chances.miss - 0.5).abs() < 1e-9);
        assert_eq!(battle.target.wall_level, 3);
    }

    #[test]
    fn test_roll_outside_battle_is_rejected() {
        let config = BattleConfig::default();
        let mut guard = CooldownGuard::new(&config);
        let mut rolls = ScriptedRolls::default();
        let mut battle =
            Match::new(MatchSetup::coup(PlayerId(1), fighter(), target(0)), &config, t0()).unwrap();

        let err = battle
            .roll(PlayerId(1), TerritoryId::ThroneRoom, t0(), &config, &mut guard, &mut rolls)
            .unwrap_err();
        assert!(matches!(
            err,
            BattleError::InvalidMatchState {
                status: MatchStatus::Pledge,
                ..
            }
        ));
    }

    #[test]
    fn test_roll_validation_errors() {
        let config = BattleConfig::default();
        let mut guard = CooldownGuard::new(&config);
        let mut rolls = ScriptedRolls::default();
        let mut battle = started(MatchSetup::coup(PlayerId(1), fighter(), target(0)), &config);

        assert!(matches!(
            battle.roll(PlayerId(5), TerritoryId::ThroneRoom, t0(), &config, &mut guard, &mut rolls),
            Err(BattleError::PlayerNotParticipant(PlayerId(5)))
        ));
        assert!(matches!(
            battle.roll(PlayerId(1), TerritoryId::North, t0(), &config, &mut guard, &mut rolls),
            Err(BattleError::TerritoryNotInMatch(TerritoryId::North))
        ));
    }

    #[test]
    fn test_contribution_tracks_effective_push() {
        let config = BattleConfig::default();
        let mut guard = CooldownGuard::new(&config);
        let mut rolls = ScriptedRolls::new([RollOutcome::Hit]);
        let mut battle = started(
            MatchSetup::coup(PlayerId(1), fighter(), target(0))
                .with_opening_bar(TerritoryId::CrownSquare, 0.9),
            &config,
        );

        let result = battle
            .roll(PlayerId(1), TerritoryId::CrownSquare, t0(), &config, &mut guard, &mut rolls)
            .unwrap();

        assert_eq!(result.territory_captured, Some(Side::Attackers));
        assert!((result.push - 0.1).abs() < 1e-9);
        let contribution = battle.attackers.get(PlayerId(1)).unwrap().contribution;
        assert_eq!(contribution.hits, 1);
        assert!((contribution.push - 0.1).abs() < 1e-9);
        assert_eq!(
            battle.territory(TerritoryId::CrownSquare).unwrap().state(),
            TerritoryState::CapturedByAttackers
        );
    }

    #[test]
    fn test_deadline_winner_uses_bar_advantage() {
        let config = BattleConfig::default();
        let mut battle = started(
            MatchSetup::coup(PlayerId(1), fighter(), target(0))
                .with_opening_bar(TerritoryId::ThroneRoom, 0.3),
            &config,
        );
        assert_eq!(battle.deadline_winner(), Side::Attackers);

        battle.territories[0].bar_position = -0.5;
        assert_eq!(battle.deadline_winner(), Side::Defenders);
    }

    #[test]
    fn test_advance_starts_and_ends_battle() {
        let config = BattleConfig::default();
        let mut battle =
            Match::new(MatchSetup::coup(PlayerId(1), fighter(), target(0)), &config, t0()).unwrap();
        battle.join(PlayerId(99), Side::Defenders, fighter(), t0()).unwrap();

        assert_eq!(battle.advance(t0(), &config), None);

        let pledge_over = battle.pledge_ends_at;
        assert_eq!(battle.advance(pledge_over, &config), Some(MatchStatus::Battle));

        let deadline = battle.battle_ends_at.unwrap();
        assert_eq!(battle.advance(deadline, &config), Some(MatchStatus::Resolved));
        let outcome = battle.outcome.as_ref().unwrap();
        assert_eq!(outcome.cause, ResolutionCause::Deadline);
        // untouched bars keep the defenders in power
        assert_eq!(outcome.winner, Side::Defenders);
    }

    #[test]
    fn test_cancel_after_deadline_resolves() {
        let config = BattleConfig::default();
        let mut battle = started(MatchSetup::coup(PlayerId(1), fighter(), target(0)), &config);
        let deadline = battle.battle_ends_at.unwrap();

        assert_eq!(battle.cancel(deadline, &config), MatchStatus::Resolved);
        assert_eq!(battle.cancel(deadline, &config), MatchStatus::Resolved);
    }

    #[test]
    fn test_snapshot_mirrors_state() {
        let config = BattleConfig::default();
        let battle = started(MatchSetup::invasion(PlayerId(1), fighter(), target(2)), &config);
        let snapshot = battle.snapshot();

        assert_eq!(snapshot.status, MatchStatus::Battle);
        assert_eq!(snapshot.territories.len(), 5);
        assert_eq!(snapshot.attackers, vec![PlayerId(1)]);
        assert_eq!(snapshot.defenders, vec![PlayerId(99)]);
        assert!(snapshot.outcome.is_none());
    }
}
