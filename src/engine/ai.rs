//! Per-unit update pipeline
//!
//! Each call picks the next scheduled unit and runs it through the full
//! pipeline: surrender check, order selection against the influence grids,
//! objective refinement, movement, contact bookkeeping and, when the gate
//! conditions line up, combat resolution. The scratch score of the most
//! recent objective scan doubles as the combat gate value; strike paths
//! force it to the gate threshold.

use crate::core::error::Result;
use crate::core::types::{clamp, in_range, sign};
use crate::map::coords::UnitCoords;
use crate::map::geometry::{
    block_position_bias, direction_index, long_range_offset, neighbour_map_offset,
    neighbour_towards, small_grid_offset, tiny_grid_offset, HEX_NEIGHBOURS,
};
use crate::rules::Ruleset;

use super::coeff::surroundings_score;
use super::events::Event;
use super::state::{corrupt_overlay, GameState};
use super::unit::{Order, Unit};

/// Combat is attempted only when the last scan score reaches this value.
const COMBAT_GATE: i32 = 7;

impl GameState {
    /// Runs one unit through the update pipeline. Returns the message the
    /// unit produced, if any, and whether the consumer cancelled mid-move.
    pub(crate) fn update_unit(&mut self) -> Result<(Option<Event>, bool)> {
        let mut weather = self.weather;
        if self.clock.is_night {
            weather += 8;
        }

        // Scheduler: 128 slots, 64 per side, in a fixed rotation. Static
        // units are skipped; a roster with nothing to schedule hands the
        // slice back untouched.
        let mut unit = {
            let mut picked = None;
            for _ in 0..128 {
                self.last_updated_unit = (self.last_updated_unit + 1) % 128;
                let side = self.last_updated_unit / 64;
                let slot = self.last_updated_unit % 64;
                let Some(u) = self.units.units[side].get(slot) else {
                    continue;
                };
                if !u.is_in_game {
                    continue;
                }
                let mut unit = u.clone();
                if unit.terrain % 64 >= 48 {
                    return Err(corrupt_overlay(&unit));
                }
                if unit.men_count + unit.equip_count < 7 || unit.fatigue == 255 {
                    self.hide_unit(&unit)?;
                    let message = Event::WeMustSurrender { unit: unit.clone() };
                    unit.clear_state();
                    unit.half_days_until_appear = 0;
                    self.cities_held[1 - unit.side] += self.tables.unit_scores[unit.unit_type];
                    self.men_lost[unit.side] += unit.men_count;
                    self.equip_lost[unit.side] += unit.equip_count;
                    return self.finish_unit(unit, Some(message));
                }
                if !self.tables.unit_can_move[unit.unit_type] {
                    continue;
                }
                picked = Some(unit);
                break;
            }
            match picked {
                Some(u) => u,
                None => return Ok((None, false)),
            }
        };

        let mut num_enemy = self.units.count_neighbours(unit.x, unit.y, 1 - unit.side);
        if num_enemy == 0 {
            unit.under_threat = false;
        }

        // Best score of the most recent objective scan. Combat at the end of
        // the pipeline only proceeds when it reaches the gate threshold.
        let mut gate_score = 0;

        let mode = if self.options.is_player_controlled(unit.side) {
            self.scheduled_side = unit.side;
            if !unit.has_local_command
                && (unit.order == Order::Defend
                    || unit.order == Order::Move
                    || unit.objective_x != 0)
            {
                None
            } else {
                unit.has_local_command = true;
                Some(unit.order)
            }
        } else if unit.order_settled {
            Some(unit.order)
        } else {
            self.choose_order(&mut unit, &mut num_enemy, &mut gate_score)
        };

        if let Some(mode) = mode {
            unit.target_formation = self.prescribed_formation(unit.order.index(), 1);
            match mode {
                Order::Attack => self.pick_attack_objective(&mut unit, weather, num_enemy, &mut gate_score),
                Order::Reserve => unit.objective_x = 0,
                Order::Defend => self.pick_defence_objective(&mut unit, &mut gate_score),
                Order::Move => {}
            }
            self.consider_bombardment(&mut unit, weather);
        }

        // Movement towards the objective, budgeted per turn slice.
        self.scheduled_side = unit.side;
        let mut message = None;
        if unit.supply_level == 0 {
            message = Some(Event::WeHaveExhaustedSupplies { unit: unit.clone() });
        }

        let mut budget = 25;
        let mut distance = 0;
        let (mut sx, mut sy) = (0, 0);
        'movement: loop {
            if unit.objective_x == 0 {
                break;
            }
            distance = unit.distance_to_objective();
            let d32 = self.tables.weapon_traits[unit.unit_type] as i32;
            let attack_range = (d32 & 31) * 2;
            if distance > 0 && distance <= attack_range && unit.order == Order::Attack {
                sx = unit.objective_x;
                sy = unit.objective_y;
                unit.long_range_strike = true;
                gate_score = COMBAT_GATE;
                break;
            }
            let mut detour = 0;
            let move_cost = 'step: loop {
                if unit.objective_x == unit.x && unit.objective_y == unit.y {
                    unit.objective_x = 0;
                    unit.target_formation = self.prescribed_formation(unit.order.index(), 1);
                    break 'movement;
                }
                unit.target_formation = self.prescribed_formation(unit.order.index(), 0);
                if (self.options.is_player_controlled(unit.side) || unit.has_local_command)
                    && distance == 1
                    && unit.order == Order::Defend
                    && unit.in_contact_with_enemy
                {
                    unit.target_formation = self.prescribed_formation(unit.order.index(), 1);
                }
                let direction =
                    direction_index(unit.objective_x - unit.x, unit.objective_y - unit.y);
                let (offset, mut cost) =
                    self.step_towards(direction, detour, unit.x, unit.y, unit.unit_type);
                let (dx, dy) = HEX_NEIGHBOURS[offset];
                sx = unit.x + dx;
                sy = unit.y + dy;
                if d32 & 64 != 0 {
                    // Indirect-fire units jump straight onto the objective
                    // instead of stepping hex by hex.
                    if self.ruleset != Ruleset::Vietnam || unit.formation == 0 {
                        sx = unit.objective_x;
                        sy = unit.objective_y;
                        let tt = self.terrain_class_at(sx, sy);
                        cost = self.move_cost(tt, unit.unit_type);
                        gate_score = tt as i32;
                        detour = 1;
                    } else if self.tables.unit_mask[unit.unit_type] & 32 != 0 {
                        break 'movement;
                    }
                }
                if self.units.contains_unit_of_side(sx, sy, unit.side) {
                    cost = 0;
                }
                if self.units.contains_unit_of_side(sx, sy, 1 - unit.side) {
                    cost = -1;
                }
                if cost < 1
                    && (unit.order != Order::Attack || cost != -1)
                    && (unit.objective_x - unit.x).abs() + (unit.objective_y - unit.y).abs() > 2
                    && detour == 0
                {
                    detour = 2;
                    continue 'step;
                }
                if cost < 1 {
                    break 'movement;
                }
                break cost;
            };

            let mut pace = self.tables.formation_pace[unit.formation as usize] * move_cost / 8;
            if unit.under_threat {
                pace = pace * self.tables.combat_pace[unit.unit_type] / 8;
            }
            pace *= (512 - unit.fatigue) / 32;
            pace = pace * self.generals[unit.side][unit.general_index].movement / 16;
            if unit.supply_level == 0 {
                pace /= 2;
            }
            if self.ruleset != Ruleset::Europe && pace == 0 {
                break;
            }
            let mut charge = if self.ruleset == Ruleset::Vietnam { 1023 } else { 1024 };
            if self.tables.unit_mask[unit.unit_type] & 4 != 0 {
                charge += weather * if self.ruleset == Ruleset::Vietnam { 256 } else { 128 };
            }
            charge *= 8;
            let charge = if self.ruleset == Ruleset::Europe {
                charge / (pace + 1)
            } else {
                charge / pace
            };
            if charge > budget && self.rand(charge) > budget {
                break;
            }
            budget -= charge;
            self.hide_unit(&unit)?;
            if self.is_visible(&unit)
                && !self.sync.send(Event::UnitMove {
                    unit: unit.clone(),
                    from_x: unit.x / 2,
                    from_y: unit.y,
                    to_x: sx / 2,
                    to_y: sy,
                })
            {
                return Ok((None, true));
            }
            unit.x = sx;
            unit.y = sy;
            unit.terrain = self.terrain_at(unit.x, unit.y);
            if unit.terrain % 64 >= 48 {
                return Err(corrupt_overlay(&unit));
            }
            self.show_unit_if_visible(&unit);
            if unit.distance_to_objective() == 0 {
                unit.objective_x = 0;
                unit.target_formation = self.prescribed_formation(unit.order.index(), 1);
                if (unit.order == Order::Defend || unit.order == Order::Move)
                    && !unit.has_local_command
                {
                    message = Some(Event::WeHaveReachedOurObjective { unit: unit.clone() });
                }
            }
            unit.fatigue = clamp(unit.fatigue + self.tables.march_fatigue, 0, 255);
            if let Some(city) = self.capture_city(&unit) {
                message = Some(Event::WeHaveCaptured { unit: unit.clone(), city });
                break;
            }
            if budget > 0 {
                if self.units.count_neighbours(unit.x, unit.y, 1 - unit.side) > 0 {
                    unit.in_contact_with_enemy = true;
                    unit.under_threat = true;
                } else {
                    unit.in_contact_with_enemy = false;
                }
                self.show_unit_if_visible(&unit);
                continue;
            }
            break;
        }

        unit.supply_level = clamp(unit.supply_level - 2, 0, 255);
        let was_in_contact = unit.in_contact_with_enemy;

        // Contact and visibility decay, then a fresh scan of the six
        // neighbouring tiles.
        unit.in_contact_with_enemy = false;
        unit.is_under_attack = false;
        unit.recently_in_action = false;
        unit.under_threat = false;
        if self.rand(self.tables.contact_decay[unit.side]) == 0 {
            unit.seen_by_enemy = false;
        }
        if self.ruleset == Ruleset::Vietnam && self.rand(self.tables.spotting_rate) / 8 > 0 {
            unit.seen_by_enemy = true;
        }
        for i in 0..6 {
            let (dx, dy) = HEX_NEIGHBOURS[i];
            let other = match self.units.find_unit(unit.x + dx, unit.y + dy) {
                Some(o) if o.side == 1 - unit.side => o.clone(),
                _ => continue,
            };
            let mut other = other;
            other.in_contact_with_enemy = true;
            other.seen_by_enemy = true;
            self.show_unit(&other);
            let (other_type, ox, oy) = (other.unit_type, other.x, other.y);
            self.units.put(other);
            if self.tables.unit_scores[other_type] > 8
                && self.options.is_player_controlled(unit.side)
            {
                sx = ox;
                sy = oy;
                unit.order = Order::Attack;
                gate_score = COMBAT_GATE;
            }
            if self.tables.unit_mask[other_type] & 128 == 0 {
                unit.under_threat = true;
            }
            if self.tables.unit_can_move[other_type] {
                unit.in_contact_with_enemy = true;
                unit.seen_by_enemy = true;
                if !was_in_contact {
                    message = Some(Event::WeAreInContactWithEnemy { unit: unit.clone() });
                }
            }
        }
        self.show_unit_if_visible(&unit);

        // Combat gate.
        if unit.objective_x == 0 || unit.order != Order::Attack || gate_score < COMBAT_GATE {
            return self.finish_unit(unit, message);
        }
        if distance == 1 && self.units.contains_unit_of_side(sx, sy, unit.side) {
            unit.objective_x = 0;
            return self.finish_unit(unit, message);
        }
        unit.target_formation = self.prescribed_formation(unit.order.index(), 2);
        if unit.fatigue > 64
            || unit.supply_level == 0
            || !self.units.contains_unit_of_side(sx, sy, 1 - unit.side)
            || unit.formation != self.tables.order_formations[0][2]
        {
            return self.finish_unit(unit, message);
        }
        if self.resolve_attack(&mut unit, sx, sy, weather, &mut message)? {
            return Ok((None, true));
        }
        self.finish_unit(unit, message)
    }

    /// Decides a computer unit's order from the influence grids. Returns the
    /// selected mode, or None when an objective was set directly and the
    /// unit should proceed straight to movement.
    fn choose_order(
        &mut self,
        unit: &mut Unit,
        num_enemy: &mut i32,
        gate_score: &mut i32,
    ) -> Option<Order> {
        if self.scheduled_side != unit.side {
            self.grids.rebuild(
                unit.side,
                &self.units,
                &self.surface,
                &self.tables,
                &self.cities,
                &self.region_coeffs,
                &self.options,
            );
        }
        let (sx, sy) = (unit.x / 8, unit.y / 4);

        let mut nearby_enemy = 0;
        for i in 0..9 {
            let (dx, dy) = small_grid_offset(i);
            if in_range(sx + dx, 0, 16) && in_range(sy + dy, 0, 16) {
                nearby_enemy +=
                    self.grids.strength[1 - unit.side][(sx + dx) as usize][(sy + dy) as usize];
            }
        }

        // With no enemy presence nearby, line units with a supply line rally
        // towards the most promising 32x16 block instead of digging in.
        if nearby_enemy == 0
            && ((self.ruleset != Ruleset::Vietnam
                && self.tables.unit_scores[unit.unit_type] & 248 == 0)
                || (self.ruleset == Ruleset::Vietnam
                    && self.tables.unit_mask[unit.unit_type] & 1 == 0))
            && unit.has_supply_line
        {
            let (tx, ty) = (unit.x / 32, unit.y / 16);
            let mut best = -17536;
            let mut best_i = 0;
            let (mut best_x, mut best_y) = (0, 0);
            for i in 0..9 {
                let (dx, dy) = tiny_grid_offset(i);
                let (x, y) = (tx + dx, ty + dy);
                if !in_range(x, 0, 4) || !in_range(y, 0, 4) {
                    continue;
                }
                let val = (self.grids.importance_tiny[unit.side][x as usize][y as usize]
                    + self.grids.importance_tiny[1 - unit.side][x as usize][y as usize])
                    * 16
                    / clamp(
                        self.grids.strength_tiny[unit.side][x as usize][y as usize]
                            - self.grids.strength_tiny[1 - unit.side][x as usize][y as usize],
                        10,
                        9999,
                    );
                let mut score =
                    val * block_position_bias(UnitCoords::new(unit.x / 4, unit.y / 4), i) / 8;
                if i == 0 {
                    // Prefer staying within the current block.
                    score *= 2;
                }
                if score > best {
                    best = score;
                    best_i = i;
                    best_x = x;
                    best_y = y;
                }
            }
            if best_i > 0 {
                unit.target_formation = 0;
                unit.order_settled = false;
                unit.order = Order::Reserve;
                let moved = (unit.men_count + unit.equip_count + 8) / 16;
                self.grids.strength_tiny[unit.side][tx as usize][ty as usize] =
                    (self.grids.strength_tiny[unit.side][best_x as usize][best_y as usize] - moved)
                        .abs();
                self.grids.strength_tiny[unit.side][best_x as usize][best_y as usize] += moved;
                unit.objective_x = best_x * 32 + 16;
                if self.ruleset == Ruleset::Vietnam {
                    unit.objective_x += self.rand(3) * 2;
                }
                unit.objective_y = best_y * 16 + 8;
                *gate_score = best;
                return None;
            }
        }

        // Score the nine surrounding grid cells, twice each: once without and
        // once with this unit's own contribution counted in.
        let general = self.generals[unit.side][unit.general_index].clone();
        let traits = general.traits;
        let mut best = -17536;
        let (mut best_dx, mut best_dy) = (0, 0);
        let mut here_score = 0;
        let mut mode = Order::Reserve;
        let mut own_strength = (unit.men_count + unit.equip_count + 4) / 8;
        let mut own_defence = own_strength
            * clamp(self.tables.formation_men_defence[unit.formation as usize], 8, 99)
            / 8
            * self.tables.terrain_men_defence[self.terrain_class_of(unit.terrain)]
            / 8;
        if self.tables.unit_scores[unit.unit_type] > 7 {
            own_strength = 1;
            own_defence = 1;
        }
        {
            let cell = &mut self.grids.strength[unit.side][sx as usize][sy as usize];
            *cell = clamp(*cell - own_strength, 0, 255);
            let cell = &mut self.grids.defence[unit.side][sx as usize][sy as usize];
            *cell = clamp(*cell - own_defence, 0, 255);
        }
        for i in 1..=9usize {
            let (dx, dy) = small_grid_offset(i - 1);
            if !in_range(sx + dx, 0, 16) || !in_range(sy + dy, 0, 16) {
                continue;
            }
            let (cx, cy) = ((sx + dx) as usize, (sy + dy) as usize);
            let mut attraction = 0; // pull of enemy importance
            let mut opportunity = 0; // pull of enemy presence we outmatch
            let mut exposure = 0; // push of being outmatched
            let mut anxiety = 0; // push of friendly mass under pressure
            let mut men = self.grids.strength[unit.side][cx][cy];
            let mut held = (men + self.grids.defence[unit.side][cx][cy]) / 2;
            let mut enemy_around = self.grids.strength[1 - unit.side][cx][cy] / 2;
            for k in 0..8usize {
                let (ddx, ddy) = small_grid_offset(k + 1);
                if !in_range(sx + dx + ddx, 0, 16) || !in_range(sy + dy + ddy, 0, 16) {
                    continue;
                }
                let mut v = self.grids.strength[1 - unit.side][(sx + dx + ddx) as usize]
                    [(sy + dy + ddy) as usize];
                if k & 4 > 0 {
                    v /= 2;
                }
                enemy_around += v;
            }
            let enemy_here = self.grids.strength[1 - unit.side][cx][cy];
            let mut cell_mode = Order::Reserve;
            if self.grids.defence[1 - unit.side][cx][cy] > 0 {
                cell_mode = Order::Attack;
            }
            let enemy_held = (enemy_here + self.grids.defence[1 - unit.side][cx][cy]) / 2;
            for j in 0..2 {
                let mut strength_ratio = if men > enemy_held {
                    clamp((men + 1) * 8 / (enemy_held + 1) - 7, 0, 16)
                } else {
                    -clamp((enemy_held + 1) * 8 / (men + 1) - 8, 0, 16)
                };
                strength_ratio +=
                    general.attack_bonus + self.tables.unit_valor[unit.unit_type];
                let held_ratio = if held > enemy_around {
                    clamp((held + 1) * 8 / (enemy_around + 1) - 7, 0, 16)
                } else {
                    -clamp((enemy_around + 1) * 8 / (held + 1) - 8, 0, 16)
                };
                if strength_ratio > 0 {
                    let mut v = strength_ratio * self.grids.importance[1 - unit.side][cx][cy];
                    if unit.seen_by_enemy {
                        v /= 2;
                    }
                    if traits.double_aggression {
                        v *= 2;
                    }
                    if traits.halve_aggression {
                        v /= 2;
                    }
                    if j > 0 {
                        v += self.grids.importance[unit.side][cx][cy] * 8 / men;
                    }
                    attraction += v;
                }
                if held_ratio < 0 {
                    cell_mode = Order::Reserve;
                    if enemy_here > 0 {
                        let mut v = self.grids.importance[unit.side][cx][cy] * held_ratio;
                        if traits.double_caution {
                            v *= 2;
                        }
                        if traits.halve_caution {
                            v /= 2;
                        }
                        exposure += v;
                    }
                }
                if strength_ratio > 0 {
                    if *num_enemy > 0 {
                        cell_mode = Order::Attack;
                    }
                    if enemy_here > 0 {
                        let mut v = strength_ratio;
                        if traits.double_boldness {
                            v *= 2;
                        }
                        if traits.halve_boldness {
                            v /= 2;
                        }
                        v *= enemy_here;
                        opportunity += v;
                    }
                }
                if held_ratio < 0 && men > 0 {
                    cell_mode = Order::Defend;
                    let mut v = men * held_ratio;
                    if traits.double_defence {
                        v *= 2;
                    }
                    if traits.halve_defence {
                        v /= 2;
                    }
                    anxiety += v;
                }
                if j == 0 {
                    attraction = -attraction;
                    exposure = -exposure;
                    opportunity = -opportunity;
                    anxiety = -anxiety;
                    men += own_strength;
                    held += own_defence;
                }
            }
            let mut t = attraction + exposure + opportunity + anxiety;
            if i == 1 {
                if let Some(city) = self.city_at(unit.x, unit.y) {
                    if city.victory_points > 0 && enemy_here > 0 {
                        *num_enemy = 2;
                    }
                }
            }
            let mut special = self.tables.unit_scores[unit.unit_type] & 248;
            if unit.in_contact_with_enemy {
                special += unit.fatigue / 16 + unit.fatigue / 32;
            }
            if special > 7 {
                t = held - enemy_held * 2;
                *num_enemy = -128;
                cell_mode = Order::Reserve;
            }
            t = t * block_position_bias(unit.coords(), i - 1) / 8;
            if i == 1 {
                here_score = t;
                mode = cell_mode;
            }
            if t > best {
                best = t;
                best_dx = dx;
                best_dy = dy;
            }
            if (i as i32) + 1 <= sign(mode.index() as i32) + *num_enemy {
                break;
            }
        }
        *gate_score = best;
        unit.order_settled = true;

        // Running low on supplies overrides everything: head for the supply
        // source.
        let mut supply_use = self.tables.avg_daily_supply_use;
        if !unit.has_supply_line {
            supply_use *= 2;
        }
        if unit.supply_level < supply_use {
            let mut source = self.units.get(unit.side, unit.supply_unit).clone();
            if !source.is_in_game {
                source = self.units.get(unit.side, source.supply_unit).clone();
            }
            unit.objective_x = source.x;
            unit.objective_y = source.y;
            unit.order = if *num_enemy > 0 { Order::Defend } else { Order::Move };
            unit.target_formation = 0;
            unit.order_settled = false;
            return None;
        }

        if self.ruleset == Ruleset::Vietnam && self.tables.unit_mask[unit.unit_type] & 1 != 0 {
            best_dx = 0;
            best_dy = 0;
        }
        if unit.fatigue * 4 > best - here_score {
            best_dx = 0;
            best_dy = 0;
        }
        if best_dx == 0 && best_dy == 0 {
            if unit.fatigue > 64 {
                mode = Order::Defend;
            }
            if mode == Order::Reserve {
                mode = Order::Defend;
            }
            // Not moving out: put the unit's contribution back.
            self.grids.strength[unit.side][sx as usize][sy as usize] += own_strength;
            self.grids.defence[unit.side][sx as usize][sy as usize] += own_defence;
        } else {
            let (bx, by) = ((sx + best_dx) as usize, (sy + best_dy) as usize);
            if self.grids.strength[unit.side][bx][by] > 0 {
                self.grids.strength[unit.side][bx][by] += own_strength / 2;
            }
            self.grids.defence[unit.side][bx][by] += own_strength / 2;
            unit.objective_y = ((sy + best_dy) * 4 + self.rand(2) + 1) & 63;
            unit.objective_x =
                (((sx + best_dx) * 4 + self.rand(2) + 1) * 2 + (unit.objective_y & 1)) & 127;
            mode = Order::Move;
            if *num_enemy != 0 {
                unit.order = Order::Defend;
                return Some(mode);
            }
        }
        unit.order = mode;
        Some(mode)
    }

    /// Scans the two-ring neighbourhood for the best tile to assault:
    /// occupied tiles score by how weak the defender looks, empty ones by
    /// how well they carry the advance.
    fn pick_attack_objective(
        &mut self,
        unit: &mut Unit,
        weather: i32,
        num_enemy: i32,
        gate_score: &mut i32,
    ) {
        let mut best = 16000;
        let tt = self.terrain_class_of(unit.terrain);
        let men_coeff = self.tables.terrain_men_attack[tt] * unit.men_count;
        let equip_coeff = self.tables.terrain_equip_attack[tt] * unit.equip_count
            * self.tables.equip_attack_weight[unit.unit_type]
            / 4;
        let coeff = (men_coeff + equip_coeff) / 8 * (255 - unit.fatigue) / 256
            * (unit.morale + self.tables.unit_valor[unit.unit_type] * 16)
            / 128;
        let own_ground = coeff
            * surroundings_score(
                &self.coeffs.assault,
                &self.units,
                &self.surface,
                unit.x,
                unit.y,
                unit.side,
            )
            / 8;
        // Units able to close-assault skip the outer ring when already
        // pressed by neighbours.
        let start = if num_enemy > 0 && self.tables.combat_pace[unit.unit_type] < 3 {
            12
        } else {
            0
        };
        for i in start..=18usize {
            let mut score = 16001;
            let (dx, dy) = long_range_offset(i);
            let (nx, ny) = (unit.x + dx, unit.y + dy);
            if let Some(defender) = self.units.find_unit_of_side(nx, ny, 1 - unit.side) {
                let tt2 = self.terrain_class_of(defender.terrain);
                let men = self.tables.terrain_men_defence[tt2] * defender.men_count;
                let equip = self.tables.terrain_equip_defence[tt2] * defender.equip_count
                    * self.tables.equip_defence_weight[defender.unit_type]
                    / 4;
                let held =
                    (men + equip) * self.tables.formation_men_defence[defender.formation as usize] / 8;
                let mut w = weather;
                if self.ruleset != Ruleset::Vietnam
                    && self.tables.unit_mask[unit.unit_type] & 4 != 0
                {
                    w /= 2;
                }
                if self.ruleset == Ruleset::Vietnam
                    && self.tables.unit_mask[unit.unit_type] & 4 == 0
                {
                    w *= 2;
                }
                let mut d = self.tables.unit_scores[defender.unit_type] + 14 - w;
                if defender.is_under_attack {
                    d += 4;
                }
                if defender.recently_in_action {
                    d += 8;
                }
                let n = held / clamp(d, 1, 32);
                score = n
                    * surroundings_score(
                        &self.coeffs.assault,
                        &self.units,
                        &self.surface,
                        defender.x,
                        defender.y,
                        defender.side,
                    )
                    / 8
                    * (255 - defender.fatigue)
                    / 256
                    * defender.morale
                    / 128;
            } else {
                let mut tile = self.terrain_at(nx, ny);
                if i == 18 {
                    tile = unit.terrain;
                }
                let tt = self.terrain_class_of(tile);
                let bonus = if unit.men_count > unit.equip_count {
                    self.tables.terrain_men_attack[tt]
                } else {
                    self.tables.terrain_equip_attack[tt]
                };
                if tt < 7 {
                    // Score the approach as if this unit were not on the map.
                    self.units.units[unit.side][unit.index].is_in_game = false;
                    score = own_ground
                        - surroundings_score(
                            &self.coeffs.approach,
                            &self.units,
                            &self.surface,
                            nx,
                            ny,
                            unit.side,
                        ) * 2
                        + bonus;
                    self.units.units[unit.side][unit.index].is_in_game = true;
                }
            }
            if i < 12 {
                score *= 2;
            }
            if let Some(city) = self.city_at(nx, ny) {
                if city.owner != unit.side && city.victory_points > 0 {
                    if self.units.contains_unit_of_side(nx, ny, 1 - unit.side) {
                        score -= city.victory_points;
                    } else {
                        score = -city.victory_points;
                    }
                }
            }
            if score <= best {
                best = score;
                unit.objective_x = nx;
                unit.objective_y = ny;
            }
        }
        *gate_score = best;
    }

    /// Picks the best neighbouring tile (or the current one) to defend from.
    fn pick_defence_objective(&mut self, unit: &mut Unit, gate_score: &mut i32) {
        if unit.objective_x > 0 {
            unit.objective_x = unit.x;
            unit.objective_y = unit.y;
        }
        self.units.units[unit.side][unit.index].is_in_game = false;
        let mut best = -17536;
        let mut best_i = 6;
        let mut here_score = 0;
        for i in 0..=6usize {
            let ix = self.surface.unit_coords_to_index(unit.x, unit.y)
                + neighbour_map_offset(self.surface.width, i);
            if !self.surface.is_index_valid(ix) {
                continue;
            }
            let mut tile = self.surface.tile_at_index(ix);
            if i == 6 {
                tile = unit.terrain;
            }
            let tt = self.terrain_class_of(tile);
            let v = if tt == 7 {
                -128
            } else {
                let r = self.tables.terrain_men_defence[tt];
                let (dx, dy) = HEX_NEIGHBOURS[i];
                let (nx, ny) = (unit.x + dx, unit.y + dy);
                let mut v = 0;
                if self.ruleset != Ruleset::Vietnam {
                    v = r + surroundings_score(
                        &self.coeffs.defence,
                        &self.units,
                        &self.surface,
                        nx,
                        ny,
                        unit.side,
                    );
                }
                if let Some(city) = self.city_at(nx, ny) {
                    if self.units.contains_unit_of_side(nx, ny, unit.side) {
                        v += city.victory_points;
                    }
                }
                if self.tables.unit_scores[unit.unit_type] & 248 > 0
                    || unit.fatigue
                        + self.generals[unit.side][unit.general_index].defence_bonus * 4
                        > 96
                {
                    v = r + surroundings_score(
                        &self.coeffs.withdrawal,
                        &self.units,
                        &self.surface,
                        nx,
                        ny,
                        unit.side,
                    );
                }
                v
            };
            if v >= best {
                best = v;
                best_i = i;
            }
            if i == 6 {
                here_score = v;
            }
        }
        self.units.units[unit.side][unit.index].is_in_game = true;
        let mut margin = self.tables.formation_men_defence[unit.formation as usize] - 8;
        if self.options.is_player_controlled(unit.side) {
            margin *= 2;
        }
        if margin + here_score > best {
            best_i = 6;
        }
        if best_i < 6 {
            let (dx, dy) = HEX_NEIGHBOURS[best_i];
            unit.objective_x = unit.x + dx;
            unit.objective_y = unit.y + dy;
        } else {
            unit.target_formation = self.prescribed_formation(unit.order.index(), 1);
        }
        *gate_score = best;
    }

    /// Ranged units pick a spotted enemy in range as a bombardment target,
    /// escalating their order and snapping into assault formation.
    fn consider_bombardment(&mut self, unit: &mut Unit, weather: i32) {
        let d32 = self.tables.weapon_traits[unit.unit_type] as i32;
        let range = (d32 & 31) * 2;
        if range == 0 || unit.fatigue / 4 >= 32 {
            return;
        }
        let conditions_allow = if self.ruleset != Ruleset::Vietnam {
            (d32 & 8) + weather < 10
        } else {
            (d32 & 32) + weather < 34
        };
        if !conditions_allow {
            return;
        }
        for _ in 0..=(32 - unit.fatigue / 4) {
            let slot = self.rand(64) as usize;
            let Some(target) = self.units.units[1 - unit.side].get(slot) else {
                continue;
            };
            let spotted = if self.ruleset != Ruleset::Vietnam {
                target.is_under_attack || target.recently_in_action
            } else {
                target.seen_by_enemy
            };
            if spotted && (unit.x - target.x).abs() / 2 + (unit.y - target.y).abs() <= range {
                unit.objective_x = target.x;
                unit.objective_y = target.y;
                unit.order = unit.order.with_assault_bit();
                unit.formation = self.tables.order_formations[0][2];
            }
        }
    }

    /// Chooses between the two neighbours closest to the given direction,
    /// preferring the cheaper tile with a random tie-break. A detour level
    /// shifts the pair sideways.
    fn step_towards(
        &mut self,
        direction: i32,
        detour: i32,
        x: i32,
        y: i32,
        unit_type: usize,
    ) -> (usize, i32) {
        let base = self.surface.unit_coords_to_index(x, y);
        let n1 = neighbour_towards(direction, detour);
        let ix1 = base + neighbour_map_offset(self.surface.width, n1);
        if !self.surface.is_index_valid(ix1) {
            return (0, 0);
        }
        let cost1 = self.move_cost(
            self.terrain_class_of(self.surface.tile_at_index(ix1)),
            unit_type,
        );
        let n2 = neighbour_towards(direction, detour + 1);
        let ix2 = base + neighbour_map_offset(self.surface.width, n2);
        if !self.surface.is_index_valid(ix2) {
            return (0, 0);
        }
        let cost2 = self.move_cost(
            self.terrain_class_of(self.surface.tile_at_index(ix2)),
            unit_type,
        );
        if cost2 > cost1 - self.rand(2) {
            (n2, cost2)
        } else {
            (n1, cost1)
        }
    }

    /// Glides the formation towards its target, applies fatigue recovery and
    /// writes the unit back to the roster.
    fn finish_unit(
        &mut self,
        mut unit: Unit,
        message: Option<Event>,
    ) -> Result<(Option<Event>, bool)> {
        while unit.formation != unit.target_formation {
            let dif = sign(unit.formation - unit.target_formation);
            let speed = self.tables.formation_change[((dif + 1) * 4 + unit.formation) as usize];
            if speed > self.rand(15) {
                unit.long_range_strike = false;
                unit.formation -= dif;
            }
            if speed & 16 == 0 {
                break;
            }
        }
        let mut recovery = self.tables.recovery_rate[unit.unit_type];
        if !unit.in_contact_with_enemy && unit.has_supply_line {
            recovery *= 2;
        }
        unit.fatigue = clamp(unit.fatigue - recovery, 0, 255);
        self.units.put(unit);
        Ok((message, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::event_channel;
    use crate::engine::grids::InfluenceGrids;
    use crate::rules::sample::sample_campaign;
    use crate::rules::{Commander, Intelligence};

    fn quiet_state() -> GameState {
        // No consumer: a stray send reports cancellation instead of blocking.
        let (sync, stream) = event_channel();
        drop(stream);
        let mut bundle = sample_campaign();
        // Computer vs computer with limited intelligence: no unit is visible
        // until contact, so the pipeline stays silent on the event channel.
        bundle.options.commanders = [Commander::Computer, Commander::Computer];
        bundle.options.intelligence = Intelligence::Limited;
        GameState::new(bundle, 0, 7, sync)
    }

    #[test]
    fn test_weak_unit_surrenders() {
        let mut s = quiet_state();
        s.units.units[0][0].men_count = 3;
        s.units.units[0][0].equip_count = 2;
        let held_before = s.cities_held[1];
        let (message, quit) = s.update_unit().unwrap();
        assert!(!quit);
        match message {
            Some(Event::WeMustSurrender { unit }) => assert_eq!(unit.index, 0),
            other => panic!("expected surrender, got {:?}", other),
        }
        assert!(!s.units.get(0, 0).is_in_game);
        assert_eq!(s.men_lost[0], 3);
        assert_eq!(s.equip_lost[0], 2);
        assert_eq!(s.cities_held[1], held_before + s.tables.unit_scores[s.units.get(0, 0).unit_type]);
    }

    #[test]
    fn test_scheduler_skips_offmap_units() {
        let mut s = quiet_state();
        s.units.units[0][0].is_in_game = false;
        s.units.units[0][1].men_count = 1;
        s.units.units[0][1].equip_count = 1;
        let (message, _) = s.update_unit().unwrap();
        match message {
            Some(Event::WeMustSurrender { unit }) => assert_eq!(unit.index, 1),
            other => panic!("expected slot 1 to surrender, got {:?}", other),
        }
    }

    #[test]
    fn test_exhausted_supplies_reported() {
        let mut s = quiet_state();
        s.units.units[0][0].supply_level = 0;
        s.units.units[0][0].order_settled = true;
        s.units.units[0][0].order = Order::Reserve;
        s.units.units[0][0].objective_x = 0;
        // Make sure the supply shortfall does not reroute through the
        // surrender check.
        s.units.units[0][0].men_count = 200;
        let (message, quit) = s.update_unit().unwrap();
        assert!(!quit);
        assert!(matches!(message, Some(Event::WeHaveExhaustedSupplies { .. })));
    }

    #[test]
    fn test_reserve_clears_objective() {
        let mut s = quiet_state();
        s.units.units[0][0].order_settled = true;
        s.units.units[0][0].order = Order::Reserve;
        s.units.units[0][0].objective_x = 40;
        s.units.units[0][0].objective_y = 12;
        let _ = s.update_unit().unwrap();
        assert_eq!(s.units.get(0, 0).objective_x, 0);
    }

    #[test]
    fn test_update_settles_computer_orders() {
        let mut s = quiet_state();
        assert!(!s.units.get(0, 0).order_settled);
        let _ = s.update_unit().unwrap();
        // Either the grid scan settled the order, or a supply shortfall or
        // rally rerouted it with a concrete objective instead.
        let u = s.units.get(0, 0);
        assert!(u.order_settled || u.objective_x != 0);
    }

    #[test]
    fn test_grid_scan_weighs_cells_with_their_own_bias() {
        let mut s = quiet_state();
        // Side 0 already scheduled: the scan reads the grids exactly as set
        // up here.
        s.scheduled_side = 0;
        s.grids = InfluenceGrids::new();
        // Headquarters in the interior of its 4x4 block, so the positional
        // bias is a plain distance falloff: 9 on the cell the unit holds,
        // 7 one cell south.
        let mut unit = s.units.get(0, 8).clone();
        unit.x = 11;
        unit.y = 5;
        // With the unit's own contribution the held score is 80 at home and
        // 110 one cell south: staying weighs 80*9/8 = 90, moving south
        // 110*7/8 = 96. Mismatched bias indices would instead weigh them
        // 80*7/8 = 70 and 110*5/8 = 68 and keep the unit in place.
        s.grids.strength[0][1][1] = 81;
        s.grids.defence[0][1][1] = 79;
        s.grids.strength[0][1][2] = 110;
        s.grids.defence[0][1][2] = 108;
        let mut num_enemy = 0;
        let mut gate_score = 0;
        let order = s.choose_order(&mut unit, &mut num_enemy, &mut gate_score);
        assert_eq!(order, Some(Order::Move));
        assert_eq!(gate_score, 96);
        // The packed objective points into the southern cell.
        assert!(unit.objective_y == 9 || unit.objective_y == 10);
        assert!(unit.objective_x >= 10 && unit.objective_x <= 13);
    }

    #[test]
    fn test_formation_glides_towards_target() {
        let mut s = quiet_state();
        // High change speed with the continuation bit: the glide always
        // completes.
        s.tables.formation_change = [15 | 16; 16];
        let unit = {
            let mut u = s.units.get(0, 0).clone();
            u.formation = 3;
            u.target_formation = 0;
            u
        };
        let (_, quit) = s.finish_unit(unit, None).unwrap();
        assert!(!quit);
        assert_eq!(s.units.get(0, 0).formation, 0);
    }

    #[test]
    fn test_fatigue_recovery_doubles_out_of_contact() {
        let mut s = quiet_state();
        let rate = s.tables.recovery_rate[s.units.get(0, 0).unit_type];
        let mut rested = s.units.get(0, 0).clone();
        rested.fatigue = 100;
        rested.in_contact_with_enemy = false;
        rested.has_supply_line = true;
        rested.target_formation = rested.formation;
        let _ = s.finish_unit(rested, None).unwrap();
        assert_eq!(s.units.get(0, 0).fatigue, 100 - 2 * rate);

        let mut engaged = s.units.get(0, 0).clone();
        engaged.fatigue = 100;
        engaged.in_contact_with_enemy = true;
        let _ = s.finish_unit(engaged, None).unwrap();
        assert_eq!(s.units.get(0, 0).fatigue, 100 - rate);
    }
}
