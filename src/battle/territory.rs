//! Territory tug-of-war
//!
//! Each territory carries a bar in [-1, 1]. Attackers drag it toward +1,
//! defenders toward -1. Touching either end captures the territory for good.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::battle::constants::{BAR_MAX, BAR_MIN, BAR_START, CAPTURE_EPSILON};
use crate::core::error::{BattleError, Result};
use crate::core::types::{Side, TerritoryId};

/// Territory lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerritoryState {
    Contested,
    CapturedByAttackers,
    CapturedByDefenders,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    pub bar_position: f64,
    pub captured_by: Option<Side>,
    pub capture_time: Option<DateTime<Utc>>,
    /// 1-based position among all captures in the match
    pub capture_order: Option<u32>,
}

impl Territory {
    pub fn new(id: TerritoryId) -> Self {
        Self {
            id,
            bar_position: BAR_START,
            captured_by: None,
            capture_time: None,
            capture_order: None,
        }
    }

    /// Start somewhere other than the midpoint. Must be strictly inside the bar.
    pub fn with_opening_bar(id: TerritoryId, bar_position: f64) -> Result<Self> {
        if !(bar_position > BAR_MIN && bar_position < BAR_MAX) {
            return Err(BattleError::InvalidConfig(format!(
                "opening bar {} for {:?} must lie strictly inside ({}, {})",
                bar_position, id, BAR_MIN, BAR_MAX
            )));
        }

        Ok(Self {
            bar_position,
            ..Self::new(id)
        })
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    pub fn state(&self) -> TerritoryState {
        match self.captured_by {
            None => TerritoryState::Contested,
            Some(Side::Attackers) => TerritoryState::CapturedByAttackers,
            Some(Side::Defenders) => TerritoryState::CapturedByDefenders,
        }
    }

    pub fn is_captured(&self) -> bool {
        self.captured_by.is_some()
    }

    /// Move the bar in `side`'s favour.
    ///
    /// Returns `Some(side)` when this push completes a capture.
    pub fn apply_push(
        &mut self,
        side: Side,
        push: f64,
        now: DateTime<Utc>,
        capture_order: u32,
    ) -> Result<Option<Side>> {
        if self.is_captured() {
            return Err(BattleError::TerritoryAlreadyCaptured(self.id));
        }

        let moved = self.bar_position + side.bar_direction() * push.max(0.0);
        self.bar_position = moved.clamp(BAR_MIN, BAR_MAX);

        let captured = if self.bar_position >= BAR_MAX - CAPTURE_EPSILON {
            Some(Side::Attackers)
        } else if self.bar_position <= BAR_MIN + CAPTURE_EPSILON {
            Some(Side::Defenders)
        } else {
            None
        };

        if let Some(winner) = captured {
            self.bar_position = match winner {
                Side::Attackers => BAR_MAX,
                Side::Defenders => BAR_MIN,
            };
            self.captured_by = Some(winner);
            self.capture_time = Some(now);
            self.capture_order = Some(capture_order);
        }

        Ok(captured)
    }

    /// Bar advantage for `side`: positive when the bar leans its way
    pub fn lean_toward(&self, side: Side) -> f64 {
        self.bar_position * side.bar_direction()
    }
}
