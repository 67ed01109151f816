//! Match outcome: winner, per-territory results, rewards and penalties

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::battle::execution::Match;
use crate::battle::roster::Roster;
use crate::core::config::BattleConfig;
use crate::core::types::{KingdomId, MatchId, MatchType, PlayerId, Side, TerritoryId};

// Contribution weights are compared in millionths of a bar unit
const LOOT_WEIGHT_SCALE: f64 = 1_000_000.0;

/// Why the match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionCause {
    /// A side captured `win_threshold` territories
    Threshold,
    /// Every territory was captured
    Exhaustion,
    /// The battle clock ran out
    Deadline,
    /// The losing side went idle and a forfeit was claimed
    Forfeit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryResult {
    pub territory: TerritoryId,
    pub captured_by: Option<Side>,
    pub bar_position: f64,
    pub capture_time: Option<DateTime<Utc>>,
    pub capture_order: Option<u32>,
    /// False for territories still contested when the match ended
    pub decided: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantReward {
    pub player_id: PlayerId,
    pub side: Side,
    pub gold: u64,
    pub reputation: i64,
    pub leadership_credit: u32,
    pub push_contributed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulerChange {
    pub kingdom_id: KingdomId,
    pub previous_ruler: Option<PlayerId>,
    pub new_ruler: PlayerId,
}

/// Everything the outer layer needs to apply a finished match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub match_id: MatchId,
    pub match_type: MatchType,
    pub winner: Side,
    pub cause: ResolutionCause,
    pub resolved_at: DateTime<Utc>,
    pub attacker_captures: usize,
    pub defender_captures: usize,
    pub territories: Vec<TerritoryResult>,
    pub rewards: Vec<ParticipantReward>,
    /// Gold taken from the target treasury
    pub loot: u64,
    /// Wall levels the target kingdom loses
    pub wall_damage: u32,
    pub ruler_change: Option<RulerChange>,
}

impl MatchOutcome {
    pub fn compute(
        battle: &Match,
        winner: Side,
        cause: ResolutionCause,
        now: DateTime<Utc>,
        config: &BattleConfig,
    ) -> Self {
        let attacker_captures = battle.captures(Side::Attackers);
        let defender_captures = battle.captures(Side::Defenders);

        let territories = battle
            .territories
            .iter()
            .map(|t| TerritoryResult {
                territory: t.id,
                captured_by: t.captured_by,
                bar_position: t.bar_position,
                capture_time: t.capture_time,
                capture_order: t.capture_order,
                decided: t.is_captured(),
            })
            .collect();

        let loot = if battle.match_type == MatchType::Invasion && winner == Side::Attackers {
            (battle.target.treasury as f64 * config.loot_fraction).floor() as u64
        } else {
            0
        };

        let mut rewards = side_rewards(&battle.attackers, battle.match_type, winner, config);
        rewards.extend(side_rewards(&battle.defenders, battle.match_type, winner, config));

        if loot > 0 {
            let weights: Vec<f64> = battle
                .attackers
                .participants
                .iter()
                .map(|p| p.contribution.push)
                .collect();
            let shares = split_loot(loot, &weights);
            for (reward, share) in rewards
                .iter_mut()
                .filter(|r| r.side == Side::Attackers)
                .zip(shares)
            {
                reward.gold = share;
            }
        }

        let wall_damage = if battle.match_type.uses_walls() {
            let damage = (attacker_captures as u32).saturating_mul(config.wall_damage_per_capture);
            damage.min(battle.target.wall_level)
        } else {
            0
        };

        let ruler_change = if winner == Side::Attackers && battle.target.ruler != Some(battle.initiator)
        {
            Some(RulerChange {
                kingdom_id: battle.target.kingdom_id,
                previous_ruler: battle.target.ruler,
                new_ruler: battle.initiator,
            })
        } else {
            None
        };

        Self {
            match_id: battle.id,
            match_type: battle.match_type,
            winner,
            cause,
            resolved_at: now,
            attacker_captures,
            defender_captures,
            territories,
            rewards,
            loot,
            wall_damage,
            ruler_change,
        }
    }

    pub fn reward_for(&self, player_id: PlayerId) -> Option<&ParticipantReward> {
        self.rewards.iter().find(|r| r.player_id == player_id)
    }

    pub fn territory(&self, territory: TerritoryId) -> Option<&TerritoryResult> {
        self.territories.iter().find(|t| t.territory == territory)
    }
}

fn side_rewards(
    roster: &Roster,
    match_type: MatchType,
    winner: Side,
    config: &BattleConfig,
) -> Vec<ParticipantReward> {
    let won = roster.side == winner;

    roster
        .participants
        .iter()
        .map(|p| {
            let push = p.contribution.push;
            let reputation = if won {
                config.winner_reputation + (push * config.reputation_per_push).round() as i64
            } else if match_type == MatchType::Coup && roster.side == Side::Attackers {
                config.coup_failure_penalty
            } else {
                config.loser_reputation
            };
            let leadership_credit = if won && match_type == MatchType::Coup {
                config.coup_leadership_credit
            } else {
                0
            };

            ParticipantReward {
                player_id: p.player_id,
                side: roster.side,
                gold: 0,
                reputation,
                leadership_credit,
                push_contributed: push,
            }
        })
        .collect()
}

/// Split `total` proportionally to `weights`, equally when nobody contributed.
///
/// Shares always sum to `total`; leftover coins go to the heaviest weights.
pub fn split_loot(total: u64, weights: &[f64]) -> Vec<u64> {
    if weights.is_empty() {
        return Vec::new();
    }

    let mut scaled: Vec<u128> = weights
        .iter()
        .map(|w| (w.max(0.0) * LOOT_WEIGHT_SCALE).round() as u128)
        .collect();
    if scaled.iter().all(|&w| w == 0) {
        scaled = vec![1; weights.len()];
    }
    let weight_sum: u128 = scaled.iter().sum();

    let mut shares: Vec<u64> = scaled
        .iter()
        .map(|&w| (u128::from(total) * w / weight_sum) as u64)
        .collect();

    let remainder = total - shares.iter().sum::<u64>();
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| match scaled[b].cmp(&scaled[a]) {
        Ordering::Equal => a.cmp(&b),
        other => other,
    });
    for &index in order.iter().take(remainder as usize) {
        shares[index] += 1;
    }

    shares
}
