//! Kingdom Battle - territory tug-of-war engine for coups and invasions
//!
//! The game server owns players and kingdoms. This crate owns the fight:
//! matches, territory bars, roll timing and the resulting outcome.

pub mod battle;
pub mod core;
pub mod registry;
pub mod session;

pub use crate::battle::{
    CombatantProfile, JoinReceipt, MatchOutcome, MatchSetup, MatchSnapshot, MatchTarget,
    RollResult, RollSource, ScriptedRolls, SeededRolls,
};
pub use crate::core::{BattleConfig, BattleError, Result};
pub use crate::registry::MatchRegistry;
