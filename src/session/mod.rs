//! Session timing: cooldowns, injuries and roll budgets between rolls

pub mod guard;
pub mod record;

pub use guard::CooldownGuard;
pub use record::RollRecord;
