//! Battle engine - territory tug-of-war for coups and invasions
//!
//! Players pledge to a side, then roll against contested territories. Each
//! roll moves a bar; a bar at either end captures the territory. The first
//! side to hold enough territories takes the kingdom (or keeps it).
//!
//! Key properties:
//! - Pure functions for chances and push, no hidden state
//! - Randomness is injected through `RollSource`
//! - Time is always passed in, never read from the clock

pub mod constants;
pub mod events;
pub mod execution;
pub mod outcome;
pub mod push;
pub mod resolution;
pub mod rolls;
pub mod roster;
pub mod snapshot;
pub mod stats;
pub mod territory;

// Re-exports for convenient access
pub use constants::*;
pub use events::{BattleEvent, BattleEventLog, BattleEventType};
pub use execution::{JoinReceipt, Match, MatchSetup, MatchTarget, RollResult};
pub use outcome::{
    split_loot, MatchOutcome, ParticipantReward, ResolutionCause, RulerChange, TerritoryResult,
};
pub use push::{compute_push, push_exponent};
pub use resolution::{compute_chances, RollChances};
pub use rolls::{RollSource, ScriptedRolls, SeededRolls};
pub use roster::{Contribution, Participant, Roster};
pub use snapshot::{MatchSnapshot, TerritorySnapshot};
pub use stats::{CombatantProfile, CombatantStats};
pub use territory::{Territory, TerritoryState};
