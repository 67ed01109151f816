//! Read-only views of a match for status queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::battle::execution::MatchTarget;
use crate::battle::outcome::MatchOutcome;
use crate::battle::territory::TerritoryState;
use crate::core::types::{MatchId, MatchStatus, MatchType, PlayerId, TerritoryId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritorySnapshot {
    pub id: TerritoryId,
    pub name: String,
    pub state: TerritoryState,
    pub bar_position: f64,
    pub capture_time: Option<DateTime<Utc>>,
}

/// Point-in-time copy of a match, detached from its lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub id: MatchId,
    pub match_type: MatchType,
    pub status: MatchStatus,
    pub initiator: PlayerId,
    pub target: MatchTarget,
    pub win_threshold: usize,
    pub territories: Vec<TerritorySnapshot>,
    pub attackers: Vec<PlayerId>,
    pub defenders: Vec<PlayerId>,
    pub created_at: DateTime<Utc>,
    pub pledge_ends_at: DateTime<Utc>,
    pub battle_started_at: Option<DateTime<Utc>>,
    pub battle_ends_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub outcome: Option<MatchOutcome>,
}

impl MatchSnapshot {
    pub fn territory(&self, id: TerritoryId) -> Option<&TerritorySnapshot> {
        self.territories.iter().find(|t| t.id == id)
    }

    pub fn contested(&self) -> impl Iterator<Item = &TerritorySnapshot> {
        self.territories
            .iter()
            .filter(|t| t.state == TerritoryState::Contested)
    }
}
