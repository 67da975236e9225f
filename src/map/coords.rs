//! Hex coordinate systems
//!
//! The map is a hex grid stored row by row, with odd rows one tile shorter
//! than even rows. Two coordinate systems coexist:
//!
//! - [`MapCoords`]: storage coordinates, one step in x per tile;
//! - [`UnitCoords`]: doubled x, so horizontally adjacent tiles differ by 2
//!   and diagonal neighbours by 1. Distances and direction arithmetic all
//!   run in unit coordinates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitCoords {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MapCoords {
    pub x: i32,
    pub y: i32,
}

impl UnitCoords {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_map_coords(self) -> MapCoords {
        let x = if self.x >= 0 { self.x / 2 } else { (self.x - 1) / 2 };
        MapCoords { x, y: self.y }
    }
}

impl MapCoords {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_unit_coords(self) -> UnitCoords {
        UnitCoords {
            x: self.x * 2 + self.y.abs() % 2,
            y: self.y,
        }
    }
}

/// Hex distance in unit coordinates.
///
/// When the vertical offset dominates, the distance is just |dy|; otherwise
/// each row crossed pays for one of the doubled-x steps.
pub fn hex_distance(dx: i32, dy: i32) -> i32 {
    if dy.abs() > dx.abs() / 2 {
        dy.abs()
    } else {
        (dx.abs() + dy.abs() + 1) / 2
    }
}
