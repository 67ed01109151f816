//! Core type definitions used throughout the codebase

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a coup or invasion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId(pub Uuid);

impl MatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player account identifier, owned by the account service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Kingdom identifier, owned by the kingdom service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KingdomId(pub u64);

/// Which side of a match a participant fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Attackers,
    Defenders,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::Attackers => Side::Defenders,
            Side::Defenders => Side::Attackers,
        }
    }

    /// Direction this side moves a territory bar
    pub fn bar_direction(self) -> f64 {
        match self {
            Side::Attackers => 1.0,
            Side::Defenders => -1.0,
        }
    }
}

/// Coups and invasions share one engine and differ only in rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    Coup,
    Invasion,
}

impl MatchType {
    pub fn territories(self) -> &'static [TerritoryId] {
        match self {
            MatchType::Coup => &[
                TerritoryId::CoupersCamp,
                TerritoryId::CrownSquare,
                TerritoryId::ThroneRoom,
            ],
            MatchType::Invasion => &[
                TerritoryId::North,
                TerritoryId::South,
                TerritoryId::East,
                TerritoryId::West,
                TerritoryId::Capitol,
            ],
        }
    }

    /// Walls only defend against invaders
    pub fn uses_walls(self) -> bool {
        matches!(self, MatchType::Invasion)
    }
}

/// Contested zones. Coups and invasions use disjoint sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerritoryId {
    CoupersCamp,
    CrownSquare,
    ThroneRoom,
    North,
    South,
    East,
    West,
    Capitol,
}

impl TerritoryId {
    pub fn name(self) -> &'static str {
        match self {
            TerritoryId::CoupersCamp => "Couper's Camp",
            TerritoryId::CrownSquare => "Crown Square",
            TerritoryId::ThroneRoom => "Throne Room",
            TerritoryId::North => "North",
            TerritoryId::South => "South",
            TerritoryId::East => "East",
            TerritoryId::West => "West",
            TerritoryId::Capitol => "Capitol",
        }
    }
}

/// Match lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchStatus {
    #[default]
    Pledge,
    Battle,
    Resolved,
    Cancelled,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Resolved | MatchStatus::Cancelled)
    }
}

/// Result of a single roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RollOutcome {
    Miss,
    Hit,
    Injure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opponent_is_involution() {
        assert_eq!(Side::Attackers.opponent(), Side::Defenders);
        assert_eq!(Side::Attackers.opponent().opponent(), Side::Attackers);
    }

    #[test]
    fn test_territory_sets_are_disjoint() {
        let coup = MatchType::Coup.territories();
        let invasion = MatchType::Invasion.territories();
        assert_eq!(coup.len(), 3);
        assert_eq!(invasion.len(), 5);
        assert!(coup.iter().all(|t| !invasion.contains(t)));
    }

    #[test]
    fn test_only_invasions_use_walls() {
        assert!(MatchType::Invasion.uses_walls());
        assert!(!MatchType::Coup.uses_walls());
    }
}
