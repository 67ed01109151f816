use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::types::{MatchId, MatchStatus, PlayerId, Side, TerritoryId};

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Action '{action}' not valid while match is {status:?}")]
    InvalidMatchState {
        action: &'static str,
        status: MatchStatus,
    },

    #[error("Territory {0:?} already captured")]
    TerritoryAlreadyCaptured(TerritoryId),

    #[error("Territory {0:?} is not part of this match")]
    TerritoryNotInMatch(TerritoryId),

    #[error("Player {0} is not a participant")]
    PlayerNotParticipant(PlayerId),

    #[error("Player {player} already pledged to {side:?}")]
    AlreadyJoined { player: PlayerId, side: Side },

    #[error("Cooldown not elapsed, next roll at {ready_at}")]
    CooldownNotElapsed { ready_at: DateTime<Utc> },

    #[error("Player is injured until {ready_at}")]
    Injured { ready_at: DateTime<Utc> },

    #[error("Roll budget of {max_rolls} exhausted for this activation")]
    RollBudgetExceeded { max_rolls: u32 },

    #[error("No participants on the {0:?} side")]
    NoParticipants(Side),

    #[error("Forfeit not claimable before {available_at}")]
    TimeoutNotReached { available_at: DateTime<Utc> },

    #[error("Claimant's side has not rolled since {since}")]
    ClaimantIdle { since: DateTime<Utc> },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Match lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;
