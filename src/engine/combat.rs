//! Attack resolution
//!
//! Runs once the update pipeline's gate conditions are met: attacker and
//! defender strengths are folded into a single odds ratio that drives
//! losses, fatigue, morale swings and, past a threshold, the defender's
//! retreat, overrun or the attacker's advance into the vacated tile.

use crate::core::error::{EngineError, Result};
use crate::core::types::clamp;
use crate::map::geometry::HEX_NEIGHBOURS;
use crate::rules::Ruleset;

use super::coeff::surroundings_score;
use super::events::Event;
use super::state::{corrupt_overlay, GameState};
use super::unit::{Order, Unit};

impl GameState {
    /// Resolves the attack of `unit` on the enemy at (sx, sy). Returns true
    /// when the consumer cancelled mid-resolution.
    pub(crate) fn resolve_attack(
        &mut self,
        unit: &mut Unit,
        sx: i32,
        sy: i32,
        weather: i32,
        message: &mut Option<Event>,
    ) -> Result<bool> {
        let d32 = self.tables.weapon_traits[unit.unit_type] as i32;
        if unit.long_range_strike {
            self.hide_unit(unit)?;
            if !self.sync.send(Event::UnitMove {
                unit: unit.clone(),
                from_x: unit.x / 2,
                from_y: unit.y,
                to_x: sx / 2,
                to_y: sy,
            }) {
                return Ok(true);
            }
            self.show_unit(unit);
            if self.ruleset == Ruleset::Vietnam {
                unit.in_contact_with_enemy = true;
                unit.seen_by_enemy = true;
            }
        } else if d32 & 8 != 0 && weather > 3 {
            // Ground attack by a weather-limited unit in bad weather.
            return Ok(false);
        }
        if self.ruleset != Ruleset::Vietnam {
            unit.in_contact_with_enemy = true;
            unit.seen_by_enemy = true;
        }

        let mut defender = match self.units.find_unit_of_side(sx, sy, 1 - unit.side) {
            Some(u) => u.clone(),
            None => return Err(EngineError::MissingDefender { x: sx, y: sy }),
        };
        *message = Some(Event::WeAreAttacking {
            unit: unit.clone(),
            enemy: defender.clone(),
            outcome: 0,
            formation_names: self.tables.formations.clone(),
        });

        let attacker_score = {
            let tt = self.terrain_class_of(unit.terrain);
            let men_coeff = if unit.long_range_strike {
                0
            } else {
                self.tables.terrain_men_attack[tt]
                    * self.tables.formation_men_attack[unit.formation as usize]
                    * unit.men_count
                    / 32
            };
            let mut equip_coeff = self.tables.terrain_equip_attack[tt]
                * self.tables.formation_equip_attack[unit.formation as usize]
                * self.tables.equip_attack_weight[unit.unit_type]
                / 2
                * unit.equip_count
                / 64;
            if unit.long_range_strike
                && ((self.ruleset != Ruleset::Vietnam && d32 & 8 != 0)
                    || (self.ruleset == Ruleset::Vietnam && d32 & 32 != 0))
            {
                if weather > 3 {
                    return Ok(false);
                }
                equip_coeff = equip_coeff * (4 - weather) / 4;
            }
            let mut score =
                (men_coeff + equip_coeff) * unit.morale / 256 * (255 - unit.fatigue) / 128;
            score = score * self.generals[unit.side][unit.general_index].attack / 16;
            score = score
                * surroundings_score(
                    &self.coeffs.assault,
                    &self.units,
                    &self.surface,
                    unit.x,
                    unit.y,
                    unit.side,
                )
                / 8;
            score + 1
        };

        let defender_score = {
            let tt2 = self.terrain_class_of(defender.terrain);
            if self.tables.unit_scores[defender.unit_type] & 248 > 0 {
                unit.recently_in_action = true;
            }
            let men_coeff = self.tables.terrain_men_defence[tt2]
                * self.tables.formation_men_defence[defender.formation as usize]
                * defender.men_count
                / 32;
            let equip_coeff = self.tables.terrain_equip_attack[tt2]
                * self.tables.formation_equip_defence[defender.formation as usize]
                * self.tables.equip_defence_weight[defender.unit_type]
                / 2
                * defender.equip_count
                / 64;
            let mut score = (men_coeff + equip_coeff) * defender.morale / 256
                * (240 - defender.fatigue / 2)
                / 128;
            score = score * self.generals[1 - unit.side][defender.general_index].defence / 16;
            if defender.supply_level == 0 {
                score = score * self.tables.unsupplied_defence_scale / 8;
            }
            score = score
                * surroundings_score(
                    &self.coeffs.assault,
                    &self.units,
                    &self.surface,
                    defender.x,
                    defender.y,
                    1 - unit.side,
                )
                / 8;
            score + 1
        };

        let mut odds = defender_score * 16 / attacker_score;
        if self.tables.unit_mask[unit.unit_type] & 4 == 0 {
            odds += weather;
        }
        odds = clamp(odds, 0, 63);

        if !unit.long_range_strike || d32 & 128 == 0 {
            let men_lost = clamp(
                (self.rand(unit.men_count * odds) + 255) / 512,
                0,
                unit.men_count,
            );
            self.men_lost[unit.side] += men_lost;
            unit.men_count -= men_lost;
            let equip_lost = clamp(
                (self.rand(unit.equip_count * odds) + 255) / 512,
                0,
                unit.equip_count,
            );
            self.equip_lost[unit.side] += equip_lost;
            unit.equip_count -= equip_lost;
            if odds < 24 {
                unit.morale = clamp(unit.morale + 1, 0, 250);
            }
            defender.is_under_attack = true;
            if odds > 32 {
                unit.order = Order::Defend;
                *message = Some(Event::WeHaveMetStrongResistance { unit: unit.clone() });
                unit.morale = (unit.morale - 2).abs();
            }
        }
        unit.fatigue = clamp(unit.fatigue + odds, 0, 255);
        unit.supply_level = clamp(unit.supply_level - self.tables.attack_supply_use, 0, 255);

        // Counter-attack odds drive the defender's share.
        let mut counter = attacker_score * 16 / defender_score - weather;
        counter = if self.ruleset == Ruleset::Europe {
            clamp(counter, 0, 63)
        } else {
            clamp(counter, 0, 128)
        };
        let men_lost = clamp(
            (self.rand(defender.men_count * counter) + 500) / 512,
            0,
            defender.men_count,
        );
        self.men_lost[1 - unit.side] += men_lost;
        defender.men_count -= men_lost;
        let equip_lost = clamp(
            (self.rand(defender.equip_count * counter) + 255) / 512,
            0,
            defender.equip_count,
        );
        self.equip_lost[1 - unit.side] += equip_lost;
        defender.equip_count -= equip_lost;
        defender.supply_level =
            clamp(defender.supply_level - self.tables.defence_supply_use, 0, 255);

        if self.tables.unit_can_move[defender.unit_type]
            && ((self.ruleset != Ruleset::Vietnam && !unit.long_range_strike)
                || (self.ruleset == Ruleset::Vietnam
                    && self.tables.unit_mask[defender.unit_type] & 2 == 0))
            && counter - self.tables.unit_resolve[defender.unit_type] * 2 + defender.fatigue / 4
                > 36
        {
            defender.morale = (defender.morale - 1).abs();
            let (old_x, old_y) = (defender.x, defender.y);
            self.hide_unit(&defender)?;
            let mut overrun = false;
            if defender.fatigue > 128 {
                let source = self.units.get(defender.side, defender.supply_unit).clone();
                if source.is_in_game {
                    defender.morale = (defender.morale
                        - self.units.count_neighbours(defender.x, defender.y, unit.side) * 4)
                        .abs();
                    defender.x = source.x;
                    defender.y = source.y;
                    defender.clear_state();
                    defender.half_days_until_appear = 6;
                    defender.inv_appear_probability = 6;
                    if self.ruleset != Ruleset::Europe {
                        defender.half_days_until_appear = 4;
                        defender.inv_appear_probability = 4;
                        defender.fatigue = if self.ruleset == Ruleset::Desert { 130 } else { 120 };
                    }
                    *message = Some(Event::WeHaveBeenOverrun { unit: defender.clone() });
                    overrun = true;
                }
            }
            // Best reachable neighbour tile to fall back to.
            let mut best_defence = -128;
            let (mut best_x, mut best_y) = (defender.x, defender.y);
            for i in 0..6 {
                let (dx, dy) = HEX_NEIGHBOURS[i];
                let (nx, ny) = (defender.x + dx, defender.y + dy);
                let tt = self.terrain_class_at(nx, ny);
                let mut r = self.tables.terrain_men_defence[tt];
                if self.move_cost(tt, defender.unit_type) > 0
                    && !self.units.contains_unit(nx, ny)
                    && self.city_at(nx, ny).is_none()
                {
                    r += surroundings_score(
                        &self.coeffs.withdrawal,
                        &self.units,
                        &self.surface,
                        nx,
                        ny,
                        1 - unit.side,
                    ) * 4;
                    if r > 11 && r >= best_defence {
                        best_defence = r;
                        best_x = nx;
                        best_y = ny;
                    }
                }
            }
            defender.x = best_x;
            defender.y = best_y;
            defender.terrain = self.terrain_at(defender.x, defender.y);
            if defender.terrain % 64 >= 48 {
                return Err(corrupt_overlay(&defender));
            }
            if !overrun {
                if self.ruleset != Ruleset::Vietnam {
                    self.show_unit(&defender);
                    unit.objective_x = defender.x;
                    unit.objective_y = defender.y;
                } else {
                    if self.options.is_player_controlled(1 - unit.side)
                        || self.options.intelligence == crate::rules::Intelligence::Full
                    {
                        self.show_unit(&defender);
                    }
                    defender.in_contact_with_enemy = false;
                    defender.seen_by_enemy = false;
                }
            }
            if best_x != old_x || best_y != old_y {
                if !overrun {
                    *message = Some(Event::WeAreRetreating { unit: defender.clone() });
                }
                // Chase into the vacated tile when the odds were crushing.
                if counter > 60
                    && (self.ruleset != Ruleset::Vietnam || !unit.long_range_strike)
                    && surroundings_score(
                        &self.coeffs.withdrawal,
                        &self.units,
                        &self.surface,
                        old_x,
                        old_y,
                        unit.side,
                    ) > -4
                    && self.move_cost(self.terrain_class_at(old_x, old_y), unit.unit_type) > 0
                {
                    self.hide_unit(unit)?;
                    unit.x = old_x;
                    unit.y = old_y;
                    unit.terrain = self.terrain_at(unit.x, unit.y);
                    if unit.terrain % 64 >= 48 {
                        return Err(corrupt_overlay(unit));
                    }
                    self.show_unit(unit);
                    if let Some(city) = self.capture_city(unit) {
                        *message = Some(Event::WeHaveCaptured { unit: unit.clone(), city });
                    }
                }
            } else if !overrun {
                *message = None;
            }
            defender.formation = self.tables.order_formations[1][0];
            defender.order = Order::from_index((self.tables.order_formations[1][0] + 1) % 4);
            defender.has_supply_line = false;
        }

        // Fatigue is halved only when the retreat stands as the final word;
        // an attacker chasing into a captured city supersedes it.
        let mut added = counter;
        if matches!(message, Some(Event::WeAreRetreating { .. })) {
            added /= 2;
        }
        defender.fatigue = clamp(defender.fatigue + added, 0, 255);
        if counter < 24 {
            defender.morale = clamp(defender.morale + 1, 0, 250);
        }
        self.units.put(defender);
        if let Some(Event::WeAreAttacking { outcome, .. }) = message.as_mut() {
            *outcome = counter;
        }
        Ok(false)
    }
}
