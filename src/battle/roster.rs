//! Side rosters and per-participant contribution tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::battle::stats::CombatantProfile;
use crate::core::types::{PlayerId, RollOutcome, Side};

/// What a participant achieved during the battle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Contribution {
    pub rolls: u32,
    pub hits: u32,
    pub injures: u32,
    /// Total bar distance pushed in the side's favour
    pub push: f64,
}

impl Contribution {
    pub fn record(&mut self, outcome: RollOutcome, push: f64) {
        self.rolls += 1;
        match outcome {
            RollOutcome::Miss => {}
            RollOutcome::Hit => self.hits += 1,
            RollOutcome::Injure => self.injures += 1,
        }
        self.push += push;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub player_id: PlayerId,
    pub profile: CombatantProfile,
    pub joined_at: DateTime<Utc>,
    pub contribution: Contribution,
}

/// One side of a match, in join order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub side: Side,
    pub participants: Vec<Participant>,
    /// Most recent roll by anyone on this side
    pub last_roll_at: Option<DateTime<Utc>>,
}

impl Roster {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            participants: Vec::new(),
            last_roll_at: None,
        }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.get(player_id).is_some()
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.player_id == player_id)
    }

    pub fn get_mut(&mut self, player_id: PlayerId) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.player_id == player_id)
    }

    /// Add a player, or refresh their profile if already present
    pub fn upsert(&mut self, player_id: PlayerId, profile: CombatantProfile, at: DateTime<Utc>) {
        match self.get_mut(player_id) {
            Some(existing) => existing.profile = profile,
            None => self.participants.push(Participant {
                player_id,
                profile,
                joined_at: at,
                contribution: Contribution::default(),
            }),
        }
    }

    pub fn remove(&mut self, player_id: PlayerId) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| p.player_id == player_id)?;
        Some(self.participants.remove(index))
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.participants.iter().map(|p| p.player_id).collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &CombatantProfile> {
        self.participants.iter().map(|p| &p.profile)
    }
}
