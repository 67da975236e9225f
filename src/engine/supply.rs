//! Half-day supply distribution, replacements and reinforcements
//!
//! Twice a day both sides' pools grow and, in the ruleset's resupply
//! window, every supplied unit tries to reach a provider: the provider's
//! truck walks tile by tile towards the consumer on a transport budget and
//! hands over supplies once within reach. The same pass counts down delayed
//! reinforcements and tops up replacements for units with a supply line.

use crate::core::error::Result;
use crate::core::types::clamp;
use crate::map::geometry::{direction_index, neighbour_towards, HEX_NEIGHBOURS};
use crate::rules::{Intelligence, Ruleset};

use super::events::Event;
use super::state::{corrupt_overlay, GameState};
use super::unit::Unit;

impl GameState {
    pub(crate) fn every_12_hours(&mut self) -> Result<bool> {
        let mut reinforcements = [false, false];
        self.supply_levels[0] += self.tables.resupply_rate[0] * 2;
        self.supply_levels[1] += self.tables.resupply_rate[1] * 2;
        self.hide_all_units()?;
        // Resupply at night in the first two rulesets, at midday in the
        // third.
        let resupply = (self.ruleset != Ruleset::Vietnam && self.clock.is_night)
            || (self.ruleset == Ruleset::Vietnam && !self.clock.is_night);
        if resupply {
            let _ = self.sync.send(Event::SupplyDistributionStart);
        }
        for side in 0..2 {
            for i in 0..self.units.units[side].len() {
                let mut unit = self.units.units[side][i].clone();
                if unit.is_in_game {
                    if resupply {
                        unit = self.resupply_unit(unit)?;
                    }
                } else if unit.half_days_until_appear != 0 {
                    unit.half_days_until_appear -= 1;
                    if unit.half_days_until_appear == 0 {
                        let mut should_spawn = !self.units.contains_unit(unit.x, unit.y)
                            && self.rand(unit.inv_appear_probability) == 0;
                        if let Some(city) = self.city_at(unit.x, unit.y) {
                            if city.owner != unit.side {
                                should_spawn = false;
                            }
                        }
                        if should_spawn {
                            unit.is_in_game = true;
                            unit.terrain = self.terrain_at(unit.x, unit.y);
                            if unit.terrain % 64 >= 48 {
                                return Err(corrupt_overlay(&unit));
                            }
                            // Drawn later by the show-all pass.
                            reinforcements[unit.side] = true;
                        } else {
                            unit.half_days_until_appear = 1;
                        }
                    }
                }
                self.units.units[side][i] = unit;
            }
        }

        for side in 0..2 {
            for i in 0..self.units.units[side].len() {
                if !self.units.units[side][i].has_supply_line {
                    continue;
                }
                let unit_type = self.units.units[side][i].unit_type;
                if self.units.units[side][i].men_count <= self.tables.men_limit[unit_type] {
                    let gain = self.rand(self.tables.men_replacement_rate[side] + 32) / 32;
                    self.units.units[side][i].men_count += gain;
                }
                if self.units.units[side][i].equip_count <= self.tables.equip_limit[unit_type] {
                    let gain = self.rand(self.tables.equip_replacement_rate[side] + 32) / 32;
                    self.units.units[side][i].equip_count += gain;
                }
            }
        }
        self.show_all_visible_units();
        if resupply {
            let _ = self.sync.send(Event::SupplyDistributionEnd);
        }
        if reinforcements[0] || reinforcements[1] {
            if !self.sync.send(Event::Reinforcements { sides: reinforcements }) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Runs one unit's resupply attempt against every provider on its side.
    fn resupply_unit(&mut self, mut unit: Unit) -> Result<Unit> {
        unit.order_settled = false;
        if !self.tables.unit_uses_supplies[unit.unit_type]
            || !self.tables.unit_can_move[unit.unit_type]
        {
            return Ok(unit);
        }
        unit.has_supply_line = false;
        let mut min_supply_type = self.tables.min_supply_type & 15;
        if unit.unit_type as i32 >= min_supply_type {
            // Providers draw only from providers above them in the chain.
            min_supply_type += 1;
        }
        let watching = self.options.is_player_controlled(unit.side)
            || self.options.intelligence == Intelligence::Full;
        if watching {
            self.show_unit(&unit);
        }
        // Keeps the last examined provider for the no-supply fallback below.
        let (mut last_x, mut last_y) = (0, 0);
        'providers: for j in 0..self.units.units[unit.side].len() {
            let provider = self.units.units[unit.side][j].clone();
            last_x = provider.x;
            last_y = provider.y;
            if (provider.unit_type as i32) < min_supply_type
                || !provider.is_in_game
                || provider.supply_level == 0
            {
                continue;
            }
            let (mut truck_x, mut truck_y) = (provider.x, provider.y);
            if watching {
                self.show_unit(&provider);
            }
            let mut budget = self.tables.max_supply_transport_budget;
            if unit.unit_type as i32 == self.tables.min_supply_type & 15 {
                budget *= 2;
            }
            while budget > 0 {
                let (dx, dy) = (unit.x - truck_x, unit.y - truck_y);
                if dx.abs() + dy.abs() < 3 {
                    let pool = self.supply_levels[unit.side];
                    if pool > 0 {
                        let max_resupply = clamp(
                            (pool - unit.supply_level * 2) / 16,
                            0,
                            self.tables.max_resupply_amount,
                        );
                        let grant =
                            clamp(self.tables.unit_resupply[unit.unit_type], 0, max_resupply);
                        unit.supply_level += grant;
                        self.supply_levels[unit.side] = pool - grant;
                        unit.has_supply_line = true;
                    } else {
                        self.supply_levels[unit.side] = 0;
                    }
                    self.hide_unit(&provider)?;
                    break 'providers;
                }
                let (x, y, cost) =
                    self.best_supply_step(truck_x, truck_y, unit.x, unit.y, 0);
                if watching {
                    let _ = self.sync.send(Event::SupplyTruckMove {
                        from_x: truck_x / 2,
                        from_y: truck_y,
                        to_x: x / 2,
                        to_y: y,
                    });
                }
                truck_x = x;
                truck_y = y;
                if self.units.contains_unit_of_side(truck_x, truck_y, 1 - unit.side) {
                    break;
                }
                budget -= 256 / (cost + 1);
            }
            self.hide_unit(&provider)?;
        }
        if unit.supply_level == 0 {
            unit.fatigue = clamp(unit.fatigue + 64, 0, 255);
            if last_x != 0 {
                unit.objective_x = last_x;
                unit.objective_y = last_y;
            }
        }
        self.hide_unit(&unit)?;
        Ok(unit)
    }

    /// One truck step from (from_x, from_y) towards the consumer: of the two
    /// neighbours nearest the direct line, prefer the cheaper tile for the
    /// supply-chain movement class, with a random tie-break.
    fn best_supply_step(
        &mut self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
        variant: i32,
    ) -> (i32, i32, i32) {
        let unit_type = self.tables.min_supply_type as usize;
        let direction = direction_index(to_x - from_x, to_y - from_y);
        let (dx1, dy1) = HEX_NEIGHBOURS[neighbour_towards(direction, 2 * variant)];
        let (x1, y1) = (from_x + dx1, from_y + dy1);
        let cost1 = self.move_cost(self.terrain_class_at(x1, y1), unit_type);
        let (dx2, dy2) = HEX_NEIGHBOURS[neighbour_towards(direction, 2 * variant + 1)];
        let (x2, y2) = (from_x + dx2, from_y + dy2);
        let cost2 = self.move_cost(self.terrain_class_at(x2, y2), unit_type);
        if cost2 > cost1 - self.rand(2) {
            (x2, y2, cost2)
        } else {
            (x1, y1, cost1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::event_channel;
    use crate::rules::sample::sample_campaign;
    use crate::rules::{Commander, Intelligence};

    fn quiet_state() -> GameState {
        // No consumer: a stray send reports cancellation instead of blocking.
        let (sync, stream) = event_channel();
        drop(stream);
        let mut bundle = sample_campaign();
        bundle.options.commanders = [Commander::Computer, Commander::Computer];
        bundle.options.intelligence = Intelligence::Limited;
        GameState::new(bundle, 0, 11, sync)
    }

    #[test]
    fn test_pools_grow_every_half_day() {
        let mut s = quiet_state();
        // Daytime outside the resupply window: only the pools move.
        s.clock.is_night = false;
        let before = s.supply_levels;
        assert!(s.every_12_hours().unwrap());
        assert_eq!(s.supply_levels[0], before[0] + s.tables.resupply_rate[0] * 2);
        assert_eq!(s.supply_levels[1], before[1] + s.tables.resupply_rate[1] * 2);
    }

    #[test]
    fn test_resupply_grants_from_pool() {
        let mut s = quiet_state();
        let mut unit = s.units.get(0, 0).clone();
        unit.supply_level = 4;
        // Put the unit right next to its depot so the truck never moves.
        let depot = s.units.get(0, unit.supply_unit).clone();
        unit.x = depot.x + 2;
        unit.y = depot.y;
        unit.terrain = s.terrain_at(unit.x, unit.y);
        let pool_before = s.supply_levels[0];
        let unit = s.resupply_unit(unit).unwrap();
        assert!(unit.has_supply_line);
        assert!(unit.supply_level > 4);
        assert_eq!(s.supply_levels[0], pool_before - (unit.supply_level - 4));
    }

    #[test]
    fn test_unsupplied_unit_gains_fatigue_and_heads_back() {
        let mut s = quiet_state();
        // Drain every provider on side 0.
        for u in s.units.units[0].iter_mut() {
            if u.unit_type as i32 >= s.tables.min_supply_type {
                u.supply_level = 0;
            }
        }
        let mut unit = s.units.get(0, 0).clone();
        unit.supply_level = 0;
        unit.fatigue = 10;
        let unit = s.resupply_unit(unit).unwrap();
        assert!(!unit.has_supply_line);
        assert_eq!(unit.fatigue, 74);
        // Falls back towards the last roster unit examined.
        let last = s.units.units[0].last().unwrap();
        assert_eq!((unit.objective_x, unit.objective_y), (last.x, last.y));
    }

    #[test]
    fn test_delayed_reinforcement_counts_down() {
        let mut s = quiet_state();
        s.clock.is_night = false;
        let slot = s.units.units[0].len() - 1;
        s.units.units[0][slot].is_in_game = false;
        s.units.units[0][slot].half_days_until_appear = 2;
        s.units.units[0][slot].inv_appear_probability = 1;
        assert!(s.every_12_hours().unwrap());
        assert_eq!(s.units.units[0][slot].half_days_until_appear, 1);
        assert!(!s.units.units[0][slot].is_in_game);
    }

    #[test]
    fn test_replacements_respect_limits() {
        let mut s = quiet_state();
        s.clock.is_night = false;
        let t = s.units.units[0][0].unit_type;
        s.units.units[0][0].men_count = s.tables.men_limit[t] + 50;
        s.units.units[0][0].has_supply_line = true;
        let men_before = s.units.units[0][0].men_count;
        assert!(s.every_12_hours().unwrap());
        // Above the limit: no replacement men arrive.
        assert_eq!(s.units.units[0][0].men_count, men_before);
    }
}
