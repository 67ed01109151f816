pub mod config;
pub mod error;
pub mod types;

pub use config::{BattleConfig, MatchRules};
pub use error::{BattleError, Result};
