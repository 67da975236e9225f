//! Influence grids
//!
//! Three 16×16 side-indexed grids summarizing the battlefield at 8×4-tile
//! resolution, plus two 4×4 aggregates. Rebuilt whenever the scheduler
//! switches sides; the unit AI reads them for rally points, objectives and
//! threat estimates.

use serde::{Deserialize, Serialize};

use crate::core::types::{clamp, in_range, Side};
use crate::map::cities::{City, RegionCoeffs};
use crate::map::geometry::small_grid_offset;
use crate::map::surface::TerrainSurface;
use crate::rules::scenario::{Intelligence, Options};
use crate::rules::RuleTables;

use super::unit::UnitRoster;

type SmallGrid = [[i32; 16]; 16];
type TinyGrid = [[i32; 4]; 4];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluenceGrids {
    /// Unit strength per cell.
    pub strength: [SmallGrid; 2],
    /// Supply-weighted importance radiated by units and cities.
    pub importance: [SmallGrid; 2],
    /// Defensive value per cell, clamped to a byte.
    pub defence: [SmallGrid; 2],
    /// 4×4 aggregate of `strength`.
    pub strength_tiny: [TinyGrid; 2],
    /// 4×4 aggregate of `importance`.
    pub importance_tiny: [TinyGrid; 2],
}

impl InfluenceGrids {
    pub fn new() -> Self {
        Self {
            strength: [[[0; 16]; 16]; 2],
            importance: [[[0; 16]; 16]; 2],
            defence: [[[0; 16]; 16]; 2],
            strength_tiny: [[[0; 4]; 4]; 2],
            importance_tiny: [[[0; 4]; 4]; 2],
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    /// Rebuilds all grids for the side about to be scheduled.
    #[allow(clippy::too_many_arguments)]
    pub fn rebuild(
        &mut self,
        current_side: Side,
        roster: &UnitRoster,
        surface: &TerrainSurface,
        tables: &RuleTables,
        cities: &[City],
        region_coeffs: &RegionCoeffs,
        options: &Options,
    ) {
        self.reset();
        for side_units in roster.units.iter() {
            for unit in side_units {
                if !unit.is_in_game || tables.mask_bit(unit.unit_type, 16) {
                    continue;
                }
                let (sx, sy) = (unit.x / 8, unit.y / 4);
                if !in_range(sx, 0, 16) || !in_range(sy, 0, 16) {
                    continue;
                }
                if unit.side != current_side
                    && options.intelligence == Intelligence::Limited
                    && (unit.side as i32 + 1) & (options.packed_value() / 16) > 0
                    && !unit.seen_by_enemy
                {
                    continue;
                }
                let mut raw_strength = unit.men_count + unit.equip_count;
                let held = raw_strength
                    * clamp(tables.formation_men_defence[unit.formation as usize], 8, 99)
                    / 8;
                let mut defence_value = held
                    * tables.terrain_men_defence[surface.terrain_class(unit.terrain) as usize]
                    / 8;
                if tables.unit_scores[unit.unit_type] > 7 {
                    // Supply sources and other special units count for little.
                    defence_value = 4;
                    raw_strength = 4;
                }
                self.strength[unit.side][sx as usize][sy as usize] += (raw_strength + 4) / 8;
                let d = &mut self.defence[unit.side][sx as usize][sy as usize];
                *d = clamp(*d + (defence_value + 4) / 8, 0, 255);
                if unit.supply_level - 1 > tables.avg_daily_supply_use {
                    let reach = tables.unit_scores[unit.unit_type] / 4;
                    if reach > 0 {
                        self.radiate_importance(
                            unit.side,
                            sx,
                            sy,
                            -1,
                            reach,
                            if unit.is_under_attack { 4 } else { 2 },
                        );
                    }
                }
            }
        }
        for city in cities {
            if city.owner != 0 || city.victory_points != 0 {
                let (sx, sy) = (city.x / 8, city.y / 4);
                let reach = city.victory_points / 8;
                if reach > 0 {
                    self.defence[city.owner][sx as usize][sy as usize] += 1;
                    self.radiate_importance(city.owner, sx, sy, 1, reach, 2);
                }
            }
        }
        for x in 0..16 {
            for y in 0..16 {
                let coeff = region_coeffs.at(x as i32, y as i32);
                self.importance[0][x][y] = self.importance[0][x][y] * coeff / 8;
                self.importance[1][x][y] = self.importance[1][x][y] * coeff / 8;
            }
        }
        for side in 0..2 {
            for x in 0..16 {
                for y in 0..16 {
                    self.strength_tiny[side][x / 4][y / 4] += self.strength[side][x][y];
                    self.importance_tiny[side][x / 4][y / 4] += self.importance[side][x][y];
                }
            }
        }
    }

    /// Adds `amount` on concentric circles out to the given radius; each
    /// circle of radius r has 4r cells beyond the first.
    fn radiate_importance(
        &mut self,
        side: Side,
        sx: i32,
        sy: i32,
        from_radius: i32,
        to_radius: i32,
        amount: i32,
    ) {
        for radius in from_radius..=to_radius {
            let last_neighbour = (radius.abs() - radius.abs().signum()) * 4;
            for i in 0..=last_neighbour as usize {
                let (dx, dy) = small_grid_offset(i);
                let (x, y) = (sx + dx, sy + dy);
                if !in_range(x, 0, 16) || !in_range(y, 0, 16) {
                    continue;
                }
                self.importance[side][x as usize][y as usize] += amount;
            }
        }
    }
}

impl Default for InfluenceGrids {
    fn default() -> Self {
        Self::new()
    }
}
