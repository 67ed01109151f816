//! Battle engine constants that are part of the model, not the balance
//!
//! Balance numbers live in `BattleConfig`. These describe the shape of the
//! tug-of-war bar itself.

// Territory bar. Attackers push toward BAR_MAX, defenders toward BAR_MIN.
pub const BAR_MIN: f64 = -1.0;
pub const BAR_MAX: f64 = 1.0;
pub const BAR_START: f64 = 0.0;

// Float slack when checking whether the bar reached a capture line
pub const CAPTURE_EPSILON: f64 = 1e-9;

// Tolerance for probability normalisation checks
pub const CHANCE_EPSILON: f64 = 1e-9;

// Every activation grants at least one roll on top of attack power
pub const BASE_ROLLS_PER_ACTIVATION: u32 = 1;
