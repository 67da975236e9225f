//! Scenario descriptor and campaign options

use serde::{Deserialize, Serialize};

use crate::core::types::Side;

/// The three rule editions sharing this engine. They differ in a handful of
/// branches: resupply phase, counter-attack clamp, movement cost formula,
/// weather penalty gates and spotting decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ruleset {
    Europe,
    Desert,
    Vietnam,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub start_minute: i32,
    pub start_hour: i32,
    /// 0-based.
    pub start_day: i32,
    /// 0-based.
    pub start_month: i32,
    pub start_year: i32,
    pub start_weather: i32,
    pub start_supply_levels: [i32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Commander {
    Player,
    Computer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intelligence {
    Full,
    Limited,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Options {
    pub commanders: [Commander; 2],
    pub intelligence: Intelligence,
    /// 0..=4; 2 is even, lower favours side 1, higher favours side 0.
    pub game_balance: i32,
}

impl Options {
    pub fn is_player_controlled(&self, side: Side) -> bool {
        self.commanders[side] == Commander::Player
    }

    /// Packed numeric form of the option switches, kept for the final-result
    /// two-player check and the limited-intelligence masking quirk.
    pub fn packed_value(&self) -> i32 {
        let c0 = match self.commanders[0] {
            Commander::Player => 0,
            Commander::Computer => 1,
        };
        let c1 = match self.commanders[1] {
            Commander::Player => 0,
            Commander::Computer => 1,
        };
        let mut n = c0 + 2 * c1;
        if self.intelligence == Intelligence::Limited {
            n += 56 - 4 * (c0 * c1 + c0);
        }
        n
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            commanders: [Commander::Computer, Commander::Computer],
            intelligence: Intelligence::Full,
            game_balance: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_control_per_side() {
        let o = Options {
            commanders: [Commander::Player, Commander::Computer],
            ..Options::default()
        };
        assert!(o.is_player_controlled(0));
        assert!(!o.is_player_controlled(1));
    }

    #[test]
    fn test_packed_value_two_computer_full() {
        let o = Options::default();
        assert_eq!(o.packed_value(), 3);
        // Two-player check divides by 4.
        assert_ne!(o.packed_value() % 4, 0);
    }

    #[test]
    fn test_packed_value_limited_intelligence() {
        let o = Options {
            commanders: [Commander::Player, Commander::Player],
            intelligence: Intelligence::Limited,
            game_balance: 2,
        };
        assert_eq!(o.packed_value(), 56);
    }
}
