//! Roll records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{MatchId, PlayerId, RollOutcome, Side, TerritoryId};

/// One roll attempt. Created once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRecord {
    pub player_id: PlayerId,
    pub match_id: MatchId,
    pub territory_id: TerritoryId,
    pub side: Side,
    pub outcome: RollOutcome,
    pub timestamp: DateTime<Utc>,
}
