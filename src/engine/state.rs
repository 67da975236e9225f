//! The campaign state and the main update loop
//!
//! One owned aggregate holds everything mutable: the clock, the weather,
//! both rosters, the terrain overlay, the influence grids and the score
//! tallies. `update` advances one time increment, running a slice of unit
//! updates and firing the calendar hooks on hour and day boundaries.
//!
//! The update pipeline reports invariant violations (corrupt terrain
//! overlay, a defender missing mid-combat) as errors; they mean an upstream
//! table is broken and the run must stop.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use crate::core::error::{EngineError, Result};
use crate::core::types::{clamp, Side};
use crate::map::cities::{find_city, find_city_mut, City, RegionCoeffs};
use crate::map::surface::TerrainSurface;
use crate::rules::{CampaignBundle, HexCoeffs, General, Options, RuleTables, Ruleset, Variant};

use super::calendar::Clock;
use super::events::{Event, EventSync};
use super::grids::InfluenceGrids;
use super::unit::{FlashbackUnit, Unit, UnitRoster};

pub struct GameState {
    pub(crate) rng: ChaCha8Rng,
    pub(crate) ruleset: Ruleset,
    pub(crate) clock: Clock,
    pub(crate) days_elapsed: i32,
    pub(crate) weather: i32,
    pub(crate) supply_levels: [i32; 2],
    pub(crate) player_side: Side,

    units_updated: i32,
    pub(crate) units_per_tick: i32,
    pub(crate) last_updated_unit: usize,

    pub(crate) men_lost: [i32; 2],
    pub(crate) equip_lost: [i32; 2],
    pub(crate) cities_held: [i32; 2],
    pub(crate) critical_locations_captured: [i32; 2],
    flashback: Vec<Vec<FlashbackUnit>>,

    pub(crate) grids: InfluenceGrids,
    /// Side of the most recently scheduled unit; a change triggers a grid
    /// rebuild.
    pub(crate) scheduled_side: Side,

    pub(crate) tables: RuleTables,
    pub(crate) coeffs: HexCoeffs,
    pub(crate) surface: TerrainSurface,
    pub(crate) cities: Vec<City>,
    pub(crate) region_coeffs: RegionCoeffs,
    pub(crate) units: UnitRoster,
    pub(crate) generals: [Vec<General>; 2],
    pub(crate) variant: Variant,
    pub(crate) options: Options,

    pub(crate) sync: EventSync,
}

impl GameState {
    pub fn new(bundle: CampaignBundle, player_side: Side, seed: u64, sync: EventSync) -> Self {
        let CampaignBundle {
            ruleset,
            scenario,
            variant,
            variant_index,
            tables,
            coeffs,
            generals,
            mut units,
            surface,
            mut cities,
            region_coeffs,
            options,
        } = bundle;

        let clock = Clock::new(&scenario);
        for side in 0..2 {
            for unit in units.units[side].iter_mut() {
                if unit.variant_bitmap & (1 << variant_index) != 0 {
                    unit.clear_state();
                    unit.half_days_until_appear = 0;
                }
                unit.variant_bitmap = 0;
                if side == 0 && options.game_balance > 2 {
                    unit.morale = (3 + options.game_balance) * unit.morale / 5;
                } else if side == 1 && options.game_balance < 2 {
                    unit.morale = (7 - options.game_balance) * unit.morale / 5;
                }
                if unit.general_index >= generals[side].len() {
                    warn!(
                        unit = %unit.name,
                        general = unit.general_index,
                        "general index out of range, assigning the first general"
                    );
                    unit.general_index = 0;
                }
            }
        }
        for city in cities.iter_mut() {
            if city.variant_bitmap & (1 << variant_index) != 0 {
                city.victory_points = 0;
            }
        }

        let mut state = Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            ruleset,
            clock,
            days_elapsed: 0,
            weather: scenario.start_weather,
            supply_levels: scenario.start_supply_levels,
            player_side,
            units_updated: 0,
            units_per_tick: tables.updates_per_tick / 2,
            last_updated_unit: 127,
            men_lost: [0, 0],
            equip_lost: [0, 0],
            cities_held: variant.cities_held,
            critical_locations_captured: [0, 0],
            flashback: Vec::new(),
            grids: InfluenceGrids::new(),
            scheduled_side: 0,
            tables,
            coeffs,
            surface,
            cities,
            region_coeffs,
            units,
            generals,
            variant,
            options,
            sync,
        };
        state.show_all_visible_units();
        state
    }

    /// Uniform draw in `0..n`; zero for non-positive `n`.
    pub(crate) fn rand(&mut self, n: i32) -> i32 {
        if n <= 0 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }

    /// First-hour setup. Returns false when the consumer cancelled.
    pub fn init(&mut self) -> Result<bool> {
        if !self.every_hour()? {
            return Ok(false);
        }
        Ok(self.sync.send(Event::Initialized))
    }

    /// Advances one time increment. Returns false when cancelled or when
    /// game over has been signalled.
    pub fn update(&mut self) -> Result<bool> {
        self.units_updated += 1;
        while self.units_updated <= self.units_per_tick {
            let (message, quit) = self.update_unit()?;
            if quit {
                return Ok(false);
            }
            if let Some(event) = message {
                if !self.sync.send(event) {
                    return Ok(false);
                }
            }
            self.units_updated += 1;
        }
        self.units_updated = 0;

        let hour_boundary = self.clock.advance(self.tables.minutes_per_tick);
        if !self.sync.send(Event::TimeChanged) {
            return Ok(false);
        }
        if hour_boundary {
            if !self.every_hour()? {
                return Ok(false);
            }
            if self.clock.hour == 0 && !self.every_day()? {
                return Ok(false);
            }
            if self.clock.hour == 18 && self.is_game_over() {
                if !self.sync.send(Event::TimeChanged) {
                    return Ok(false);
                }
                let _ = self.sync.send(Event::GameOver);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn every_hour(&mut self) -> Result<bool> {
        self.clock.recompute_night();
        if self.clock.hour == 12 && !self.every_12_hours()? {
            return Ok(false);
        }
        if self.tables.avg_daily_supply_use > self.rand(24) {
            for side_units in self.units.units.iter_mut() {
                for unit in side_units.iter_mut() {
                    if !unit.is_in_game
                        || !self.tables.unit_uses_supplies[unit.unit_type]
                        || unit.supply_level <= 0
                    {
                        continue;
                    }
                    unit.supply_level -= 1;
                }
            }
        }
        Ok(true)
    }

    fn every_day(&mut self) -> Result<bool> {
        self.days_elapsed += 1;
        let mut snapshot = Vec::new();
        let mut active_units = 0;
        for side_units in self.units.units.iter() {
            for unit in side_units {
                if unit.is_in_game || !unit.has_supply_line {
                    active_units += 1;
                }
                if unit.is_in_game {
                    snapshot.push(FlashbackUnit {
                        x: unit.x,
                        y: unit.y,
                        color_palette: unit.color_palette,
                        unit_type: unit.unit_type,
                        terrain: unit.terrain,
                    });
                }
            }
        }
        self.units_per_tick = active_units * self.tables.updates_per_tick / 128 + 1;
        self.flashback.push(snapshot);

        let roll = self.rand(256);
        if roll < 140 {
            let quarter = (self.clock.month / 3) as usize;
            self.weather = self.tables.possible_weather[4 * quarter + (roll / 35) as usize] as i32;
        }
        if !self.sync.send(Event::WeatherForecast { weather: self.weather }) {
            return Ok(false);
        }
        if !self.every_12_hours()? {
            return Ok(false);
        }
        let due: Vec<_> = self
            .tables
            .patches
            .iter()
            .filter(|p| p.day == self.days_elapsed)
            .copied()
            .collect();
        for patch in due {
            self.tables.apply_patch(patch.offset, patch.value)?;
        }
        Ok(self.sync.send(Event::DailyUpdate {
            days_remaining: self.variant.length_in_days - self.days_elapsed + 1,
            supply_level: clamp(self.supply_levels[self.player_side] / 256, 0, 2),
        }))
    }

    // Terrain access through the unit overlay.

    pub(crate) fn terrain_at(&self, x: i32, y: i32) -> u8 {
        self.surface.tile_at(x, y)
    }

    pub(crate) fn terrain_class_of(&self, terrain: u8) -> usize {
        self.surface.terrain_class(terrain) as usize
    }

    pub(crate) fn terrain_class_at(&self, x: i32, y: i32) -> usize {
        self.surface.terrain_class_at(x, y) as usize
    }

    pub(crate) fn move_cost(&self, terrain_class: usize, unit_type: usize) -> i32 {
        self.tables.move_speed[terrain_class][unit_type]
    }

    // Unit marker overlay.

    pub(crate) fn is_visible(&self, unit: &Unit) -> bool {
        unit.in_contact_with_enemy
            || unit.seen_by_enemy
            || self.options.is_player_controlled(unit.side)
            || self.options.intelligence == crate::rules::Intelligence::Full
    }

    pub(crate) fn show_unit(&mut self, unit: &Unit) {
        let ix = self.surface.unit_coords_to_index(unit.x, unit.y);
        self.surface
            .set_tile_at_index(ix, (unit.unit_type as i32 + unit.color_palette * 16) as u8);
    }

    pub(crate) fn show_unit_if_visible(&mut self, unit: &Unit) {
        if self.is_visible(unit) {
            self.show_unit(unit);
        }
    }

    /// Restores the terrain byte remembered under the unit's marker.
    pub(crate) fn hide_unit(&mut self, unit: &Unit) -> Result<()> {
        self.surface.restore_tile(unit.x, unit.y, unit.terrain)
    }

    pub(crate) fn hide_all_units(&mut self) -> Result<()> {
        for side in 0..2 {
            for i in 0..self.units.units[side].len() {
                let unit = self.units.units[side][i].clone();
                if unit.is_in_game {
                    self.hide_unit(&unit)?;
                }
            }
        }
        Ok(())
    }

    /// Refreshes each in-game unit's remembered terrain and redraws the
    /// visible markers. Only safe while no marker is on the surface.
    pub(crate) fn show_all_visible_units(&mut self) {
        for side in 0..2 {
            for i in 0..self.units.units[side].len() {
                if !self.units.units[side][i].is_in_game {
                    continue;
                }
                let (x, y) = (self.units.units[side][i].x, self.units.units[side][i].y);
                let terrain = self.terrain_at(x, y);
                self.units.units[side][i].terrain = terrain;
                let unit = self.units.units[side][i].clone();
                self.show_unit_if_visible(&unit);
            }
        }
    }

    /// Captures the city under the unit, if any. Transfers its victory
    /// points between the held-city tallies.
    pub(crate) fn capture_city(&mut self, unit: &Unit) -> Option<City> {
        let side = unit.side;
        let city = find_city_mut(&mut self.cities, unit.x, unit.y)?;
        if city.owner == side {
            return None;
        }
        city.owner = side;
        let captured = city.clone();
        self.cities_held[side] += captured.victory_points;
        self.cities_held[1 - side] -= captured.victory_points;
        self.critical_locations_captured[side] += captured.victory_points & 1;
        Some(captured)
    }

    pub(crate) fn city_at(&self, x: i32, y: i32) -> Option<&City> {
        find_city(&self.cities, x, y)
    }

    /// Formation prescribed for the given order at the given stage.
    pub(crate) fn prescribed_formation(&self, order_index: usize, stage: usize) -> i32 {
        self.tables.order_formation(order_index, stage)
    }

    // Read accessors for the driver.

    pub fn minute(&self) -> i32 {
        self.clock.minute
    }

    pub fn hour(&self) -> i32 {
        self.clock.hour
    }

    pub fn is_night(&self) -> bool {
        self.clock.is_night
    }

    pub fn day(&self) -> i32 {
        self.clock.day
    }

    pub fn month_name(&self) -> &str {
        self.tables
            .months
            .get(self.clock.month as usize)
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn year(&self) -> i32 {
        self.clock.year
    }

    pub fn weather_name(&self) -> &str {
        self.tables
            .weather_names
            .get(self.weather as usize)
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn men_lost(&self, side: Side) -> i32 {
        self.men_lost[side] * self.tables.men_multiplier
    }

    pub fn equip_lost(&self, side: Side) -> i32 {
        self.equip_lost[side] * self.tables.equip_multiplier
    }

    pub fn cities_held(&self, side: Side) -> i32 {
        self.cities_held[side]
    }

    pub fn days_elapsed(&self) -> i32 {
        self.days_elapsed
    }

    pub fn side_name(&self, side: Side) -> &str {
        self.tables
            .sides
            .get(side)
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn flashback_days(&self) -> &[Vec<FlashbackUnit>] {
        &self.flashback
    }
}

/// Corrupt-overlay error for a unit whose remembered terrain byte decodes
/// to a unit marker.
pub(crate) fn corrupt_overlay(unit: &Unit) -> EngineError {
    EngineError::CorruptTerrain {
        byte: unit.terrain,
        x: unit.x,
        y: unit.y,
        class: unit.terrain % 64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::event_channel;
    use crate::rules::sample::sample_campaign;

    fn state() -> GameState {
        // No consumer: a stray send reports cancellation instead of blocking.
        let (sync, stream) = event_channel();
        drop(stream);
        GameState::new(sample_campaign(), 0, 42, sync)
    }

    #[test]
    fn test_new_marks_units_on_surface() {
        let s = state();
        let u = s.units.get(0, 0);
        let marker = s.surface.tile_at(u.x, u.y);
        assert_eq!(marker, (u.unit_type as i32 + u.color_palette * 16) as u8);
        assert!(u.terrain % 64 < 48);
    }

    #[test]
    fn test_balance_scales_morale() {
        let (sync, stream) = event_channel();
        drop(stream);
        let mut bundle = sample_campaign();
        bundle.options.game_balance = 4;
        let base_morale = bundle.units.get(0, 0).morale;
        let s = GameState::new(bundle, 0, 1, sync);
        assert_eq!(s.units.get(0, 0).morale, (3 + 4) * base_morale / 5);
        assert_eq!(s.units.get(1, 0).morale, 100);
    }

    #[test]
    fn test_capture_city_transfers_victory_points() {
        let mut s = state();
        let before = (s.cities_held[0], s.cities_held[1]);
        let mut raider = s.units.get(0, 1).clone();
        // PRUM, owned by side 1, 18 points (even, not critical).
        raider.x = 46;
        raider.y = 8;
        let city = s.capture_city(&raider).unwrap();
        assert_eq!(city.name, "PRUM");
        assert_eq!(s.cities_held[0], before.0 + 18);
        assert_eq!(s.cities_held[1], before.1 - 18);
        assert_eq!(s.critical_locations_captured[0], 0);
        // Re-capturing your own city is not a capture.
        assert!(s.capture_city(&raider).is_none());
    }

    #[test]
    fn test_capture_odd_city_counts_as_critical() {
        let mut s = state();
        let mut raider = s.units.get(1, 0).clone();
        // STAVELOT, 15 points, odd: a critical location.
        raider.x = 18;
        raider.y = 10;
        assert!(s.capture_city(&raider).is_some());
        assert_eq!(s.critical_locations_captured[1], 1);
    }

    #[test]
    fn test_hide_and_show_round_trip() {
        let mut s = state();
        let unit = s.units.get(0, 0).clone();
        s.hide_unit(&unit).unwrap();
        assert_eq!(s.surface.tile_at(unit.x, unit.y), unit.terrain);
        s.show_unit(&unit);
        assert_eq!(
            s.surface.tile_at(unit.x, unit.y),
            (unit.unit_type as i32 + unit.color_palette * 16) as u8
        );
    }

    #[test]
    fn test_out_of_range_general_is_clamped() {
        let (sync, stream) = event_channel();
        drop(stream);
        let mut bundle = sample_campaign();
        bundle.units.units[0][3].general_index = 99;
        let s = GameState::new(bundle, 0, 1, sync);
        assert_eq!(s.units.get(0, 3).general_index, 0);
    }
}
