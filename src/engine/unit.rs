//! Units, orders and the per-side rosters

use serde::{Deserialize, Serialize};

use crate::core::types::Side;
use crate::map::coords::UnitCoords;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Order {
    #[default]
    Reserve,
    Defend,
    Attack,
    Move,
}

impl Order {
    pub fn index(self) -> usize {
        match self {
            Order::Reserve => 0,
            Order::Defend => 1,
            Order::Attack => 2,
            Order::Move => 3,
        }
    }

    pub fn from_index(i: i32) -> Self {
        match i.rem_euclid(4) {
            0 => Order::Reserve,
            1 => Order::Defend,
            2 => Order::Attack,
            _ => Order::Move,
        }
    }

    /// Escalation used by long-range bombardment: Reserve and Attack map to
    /// Attack, Defend and Move to Move.
    pub fn with_assault_bit(self) -> Self {
        Self::from_index((self.index() | 2) as i32)
    }

    pub fn name(self) -> &'static str {
        match self {
            Order::Reserve => "RESERVE",
            Order::Defend => "DEFEND",
            Order::Attack => "ATTACK",
            Order::Move => "MOVE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub side: Side,
    pub in_contact_with_enemy: bool,
    pub is_under_attack: bool,
    /// Flagged hot after engaging a high-value defender; decays like contact.
    pub recently_in_action: bool,
    pub has_supply_line: bool,
    /// Pressed by an adjacent enemy; slows movement.
    pub under_threat: bool,
    pub has_local_command: bool,
    pub seen_by_enemy: bool,
    pub is_in_game: bool,
    pub x: i32,
    pub y: i32,
    pub men_count: i32,
    pub equip_count: i32,
    pub formation: i32,
    /// Roster index of the unit supplying this one.
    pub supply_unit: usize,
    /// Committed to a long-range strike rather than a ground assault.
    pub long_range_strike: bool,
    pub unit_type: usize,
    pub color_palette: i32,
    pub name: String,
    pub target_formation: i32,
    /// The current order was decided this side-turn and holds.
    pub order_settled: bool,
    pub order: Order,
    pub general_index: usize,
    pub supply_level: i32,
    pub morale: i32,
    /// Terrain byte remembered from under the unit's marker.
    pub terrain: u8,
    pub variant_bitmap: u8,
    pub half_days_until_appear: i32,
    pub inv_appear_probability: i32,
    pub fatigue: i32,
    pub objective_x: i32,
    pub objective_y: i32,
    pub index: usize,
}

impl Unit {
    pub fn coords(&self) -> UnitCoords {
        UnitCoords::new(self.x, self.y)
    }

    pub fn objective(&self) -> UnitCoords {
        UnitCoords::new(self.objective_x, self.objective_y)
    }

    /// Wipes transient state when a unit leaves the map.
    pub fn clear_state(&mut self) {
        self.in_contact_with_enemy = false;
        self.is_under_attack = false;
        self.recently_in_action = false;
        self.has_supply_line = true;
        self.under_threat = false;
        self.has_local_command = false;
        self.seen_by_enemy = false;
        self.is_in_game = false;
    }

    /// Hex distance from the unit to its current objective.
    pub fn distance_to_objective(&self) -> i32 {
        crate::map::coords::hex_distance(self.objective_x - self.x, self.objective_y - self.y)
    }
}

/// Daily snapshot of a spawned unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FlashbackUnit {
    pub x: i32,
    pub y: i32,
    pub color_palette: i32,
    pub unit_type: usize,
    pub terrain: u8,
}

/// Both sides' units. Slot order is load order and never changes; the
/// scheduler and supply-chain indices rely on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitRoster {
    pub units: [Vec<Unit>; 2],
}

impl UnitRoster {
    pub fn new(units: [Vec<Unit>; 2]) -> Self {
        Self { units }
    }

    pub fn side(&self, side: Side) -> &[Unit] {
        &self.units[side]
    }

    pub fn get(&self, side: Side, index: usize) -> &Unit {
        &self.units[side][index]
    }

    pub fn put(&mut self, unit: Unit) {
        let (side, index) = (unit.side, unit.index);
        self.units[side][index] = unit;
    }

    pub fn contains_unit_of_side(&self, x: i32, y: i32, side: Side) -> bool {
        self.units[side]
            .iter()
            .any(|u| u.is_in_game && u.x == x && u.y == y)
    }

    pub fn contains_unit(&self, x: i32, y: i32) -> bool {
        self.contains_unit_of_side(x, y, 0) || self.contains_unit_of_side(x, y, 1)
    }

    pub fn find_unit(&self, x: i32, y: i32) -> Option<&Unit> {
        self.units
            .iter()
            .flat_map(|s| s.iter())
            .find(|u| u.is_in_game && u.x == x && u.y == y)
    }

    pub fn find_unit_of_side(&self, x: i32, y: i32, side: Side) -> Option<&Unit> {
        self.units[side]
            .iter()
            .find(|u| u.is_in_game && u.x == x && u.y == y)
    }

    /// Units of the given side within striking distance of (x, y).
    pub fn count_neighbours(&self, x: i32, y: i32, side: Side) -> i32 {
        self.units[side]
            .iter()
            .filter(|u| u.is_in_game && (u.x - x).abs() + 2 * (u.y - y).abs() < 4)
            .count() as i32
    }
}
