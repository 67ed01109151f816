//! Battle events for the outer layer to persist and broadcast

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::battle::outcome::ResolutionCause;
use crate::core::types::{MatchId, MatchType, PlayerId, RollOutcome, Side, TerritoryId};

/// Something that happened in a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    pub match_id: MatchId,
    pub at: DateTime<Utc>,
    pub event_type: BattleEventType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEventType {
    MatchCreated { match_type: MatchType, initiator: PlayerId },
    PlayerJoined { player: PlayerId, side: Side },
    PlayerLeft { player: PlayerId, side: Side },
    BattleStarted { attackers: usize, defenders: usize },
    Rolled {
        player: PlayerId,
        side: Side,
        territory: TerritoryId,
        outcome: RollOutcome,
        bar_position: f64,
    },
    TerritoryCaptured { territory: TerritoryId, side: Side },
    ForfeitClaimed { claimant: PlayerId, forfeiting: Side },
    MatchResolved { winner: Side, cause: ResolutionCause },
    MatchCancelled { reason: String },
}

/// Pending events of one match, drained by the caller
#[derive(Debug, Clone, Default)]
pub struct BattleEventLog {
    pub events: Vec<BattleEvent>,
}

impl BattleEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, match_id: MatchId, event_type: BattleEventType, at: DateTime<Utc>) {
        self.events.push(BattleEvent {
            match_id,
            at,
            event_type,
        });
    }

    pub fn drain(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
