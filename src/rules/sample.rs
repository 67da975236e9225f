//! Built-in fixture campaign
//!
//! A small but complete western-front scenario used by the headless binary
//! and by tests: every table filled with plausible numbers, two rosters with
//! headquarters and a depot each, cities worth fighting over and a surface
//! with impassable patches. Not historical, just coherent.

use crate::engine::unit::{Order, Unit, UnitRoster};
use crate::map::cities::{City, RegionCoeffs};
use crate::map::surface::TerrainSurface;

use super::coeffs::{CoeffTable, HexCoeffs};
use super::generals::{General, GeneralTraits};
use super::scenario::{Options, Ruleset, Scenario};
use super::tables::{DataPatch, RuleTables};
use super::variant::Variant;
use super::CampaignBundle;

const SURFACE_WIDTH: i32 = 64;
const SURFACE_HEIGHT: i32 = 32;

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn sample_tables() -> RuleTables {
    RuleTables {
        unit_resolve: [2, 2, 3, 1, 1, 2, 2, 1, 0, 0, 0, 0, 4, 0, 0, 0],
        unit_valor: [1, 2, 2, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        equip_defence_weight: [4, 6, 3, 2, 5, 4, 2, 1, 0, 0, 0, 0, 1, 0, 0, 0],
        equip_attack_weight: [5, 8, 3, 2, 6, 4, 2, 1, 0, 0, 0, 0, 1, 0, 0, 0],
        // Types 4 and 5 are artillery: firing range 3, long-range bit 128.
        weapon_traits: [1, 1, 1, 1, 3 | 128, 3 | 128, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0],
        unit_scores: [2, 3, 2, 1, 3, 3, 1, 1, 0, 0, 0, 0, 9, 8, 0, 0],
        recovery_rate: [12, 10, 14, 12, 10, 10, 12, 12, 8, 8, 8, 8, 16, 8, 8, 8],
        // Bit 8 clear: uses supplies. Bit 64 set: cannot move. Depots sit
        // still and burn nothing.
        unit_mask: [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 8 | 64, 0, 0],
        unit_uses_supplies: [
            true, true, true, true, true, true, true, true, true, true, true, true, true, false,
            true, true,
        ],
        unit_can_move: [
            true, true, true, true, true, true, true, true, true, true, true, true, true, false,
            true, true,
        ],
        terrain_men_attack: [10, 8, 6, 5, 7, 4, 3, 0],
        terrain_equip_attack: [12, 8, 4, 3, 6, 2, 1, 0],
        terrain_men_defence: [8, 10, 12, 13, 9, 14, 15, 0],
        terrain_equip_defence: [10, 9, 6, 5, 8, 4, 2, 0],
        formation_men_attack: [8, 12, 10, 6, 8, 8, 8, 8],
        formation_equip_attack: [8, 12, 10, 4, 8, 8, 8, 8],
        formation_men_defence: [8, 6, 10, 14, 8, 8, 8, 8],
        formation_equip_defence: [8, 6, 10, 12, 8, 8, 8, 8],
        min_supply_type: 12,
        hex_size_miles: 4,
        attack_supply_use: 8,
        defence_supply_use: 4,
        max_resupply_amount: 16,
        max_supply_transport_budget: 12,
        avg_daily_supply_use: 8,
        unsupplied_defence_scale: 4,
        minutes_per_tick: 1,
        updates_per_tick: 16,
        men_multiplier: 50,
        equip_multiplier: 5,
        march_fatigue: 4,
        city_score_divisor: 1,
        spotting_rate: 8,
        // Reserve, Defend, Attack, Move; approach, arrival, combat, pursuit.
        order_formations: [[0, 0, 0, 0], [0, 3, 3, 3], [1, 2, 2, 1], [1, 1, 2, 1]],
        formation_pace: [8, 10, 6, 4, 8, 8, 8, 8],
        combat_pace: [2, 2, 2, 3, 4, 4, 3, 3, 4, 4, 4, 4, 4, 0, 4, 4],
        unit_resupply: [16, 24, 16, 12, 20, 20, 12, 12, 8, 8, 8, 8, 32, 0, 8, 8],
        formation_change: [
            0, 17, 17, 17, 17, 0, 17, 17, 17, 17, 0, 17, 17, 17, 17, 0,
        ],
        resupply_rate: [6, 5],
        men_replacement_rate: [24, 16],
        equip_replacement_rate: [12, 8],
        contact_decay: [3, 4],
        move_speed: [
            [12, 10, 12, 12, 8, 8, 12, 12, 8, 8, 8, 8, 10, 0, 8, 8],
            [10, 8, 10, 10, 6, 6, 10, 10, 6, 6, 6, 6, 8, 0, 6, 6],
            [8, 5, 9, 8, 4, 4, 8, 8, 5, 5, 5, 5, 6, 0, 5, 5],
            [6, 3, 8, 6, 3, 3, 6, 6, 4, 4, 4, 4, 5, 0, 4, 4],
            [9, 7, 9, 9, 5, 5, 9, 9, 6, 6, 6, 6, 7, 0, 6, 6],
            [5, 2, 7, 5, 2, 2, 5, 5, 3, 3, 3, 3, 4, 0, 3, 3],
            [3, 1, 5, 3, 1, 1, 3, 3, 2, 2, 2, 2, 2, 0, 2, 2],
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        ],
        possible_weather: [0, 0, 1, 2, 0, 0, 0, 1, 0, 1, 2, 2, 1, 2, 3, 3],
        men_limit: [
            160, 140, 160, 160, 120, 120, 160, 160, 80, 80, 80, 80, 60, 40, 80, 80,
        ],
        equip_limit: [
            40, 60, 30, 20, 50, 50, 20, 20, 10, 10, 10, 10, 10, 4, 10, 10,
        ],
        patches: vec![
            // Winter storm on day 3: slow everything in open ground.
            DataPatch { day: 3, offset: 192, value: 6 },
            // Side 0 supply effort collapses on day 5.
            DataPatch { day: 5, offset: 232, value: 2 },
        ],
        unit_types: names(&[
            "INFANTRY", "ARMORED", "MOUNTAIN", "MILITIA", "ARTILLERY", "HEAVY ARTILLERY",
            "PARATROOP", "ENGINEER", "GARRISON", "RESERVE", "TRAINING", "SECURITY", "HQ", "DEPOT",
            "CADRE", "REMNANT",
        ]),
        formations: names(&["MARCH", "COLUMN", "ASSAULT", "DEFENSIVE LINE"]),
        experience: names(&["GREEN", "TRAINED", "SEASONED", "VETERAN", "ELITE"]),
        unit_names: [
            names(&[
                "2ND INFANTRY DIVISION",
                "7TH ARMORED DIVISION",
                "1ST MOUNTAIN BRIGADE",
                "9TH INFANTRY DIVISION",
                "3RD ARTILLERY REGIMENT",
                "11TH INFANTRY DIVISION",
                "4TH ENGINEER BATTALION",
                "5TH ARMORED DIVISION",
                "ARMY GROUP NORTH HQ",
                "FORWARD DEPOT",
            ]),
            names(&[
                "21ST RIFLE DIVISION",
                "14TH TANK CORPS",
                "8TH RIFLE DIVISION",
                "2ND GUARDS DIVISION",
                "6TH HOWITZER REGIMENT",
                "17TH RIFLE DIVISION",
                "3RD SAPPER BATTALION",
                "9TH TANK CORPS",
                "FRONT HEADQUARTERS",
                "REAR DEPOT",
            ]),
        ],
        months: names(&[
            "JANUARY", "FEBRUARY", "MARCH", "APRIL", "MAY", "JUNE", "JULY", "AUGUST", "SEPTEMBER",
            "OCTOBER", "NOVEMBER", "DECEMBER",
        ]),
        sides: names(&["ALLIED", "AXIS"]),
        weather_names: names(&["CLEAR", "OVERCAST", "RAIN", "SNOW"]),
    }
}

fn coeff_table(base: [i32; 6], step: [i32; 6]) -> CoeffTable {
    let mut t = [[0i32; 8]; 6];
    for class in 0..6 {
        for count in 0..8 {
            t[class][count] = base[class] + step[class] * count as i32;
        }
    }
    t
}

pub fn sample_coeffs() -> HexCoeffs {
    HexCoeffs {
        // Open ground and friendly flanks help a defender; enemies hurt.
        defence: coeff_table([4, 0, 0, 2, 0, 1], [1, 2, -4, 2, -2, 0]),
        // Approaching: open ground ahead and enemy-flanked tiles to close on.
        approach: coeff_table([2, 0, 0, 0, 1, 1], [2, -1, 3, -1, 2, 1]),
        // Withdrawing: away from enemies, towards friends.
        withdrawal: coeff_table([3, 1, 0, 2, 0, 0], [1, 3, -6, 3, -3, -1]),
        // Assault scale: concentration against the defender's flanks.
        assault: coeff_table([3, 1, 1, 1, 2, 2], [1, 1, 2, 1, 2, 1]),
    }
}

fn terrain_classes() -> [u8; 64] {
    let mut t = [0u8; 64];
    for (i, c) in t.iter_mut().enumerate() {
        *c = (i % 8) as u8;
    }
    // Bytes 48..63 are unit markers; class 7 keeps pathing off them.
    for c in t.iter_mut().skip(48) {
        *c = 7;
    }
    t
}

fn sample_surface() -> TerrainSurface {
    let mut tiles = Vec::with_capacity((SURFACE_WIDTH * SURFACE_HEIGHT) as usize);
    for y in 0..SURFACE_HEIGHT {
        for x in 0..SURFACE_WIDTH {
            // A ridge of rough ground through the middle, clear elsewhere.
            let byte = if (x - 32).abs() < 3 && y % 5 != 0 {
                (5 + (x + y) % 3) as u8
            } else {
                ((x * 7 + y * 13) % 5) as u8
            };
            tiles.push(byte);
        }
    }
    TerrainSurface::new(SURFACE_WIDTH, SURFACE_HEIGHT, tiles, terrain_classes())
}

fn sample_generals() -> [Vec<General>; 2] {
    let mut g0 = vec![
        General::new("BRADLEY"),
        General::new("HODGES"),
        General::new("GEROW"),
        General::new("RIDGWAY"),
    ];
    g0[0].traits = GeneralTraits::from_byte(1);
    g0[1].attack = 12;
    g0[1].attack_bonus = 2;
    g0[2].defence = 13;
    g0[3].traits = GeneralTraits::from_byte(8);
    g0[3].movement = 12;

    let mut g1 = vec![
        General::new("MODEL"),
        General::new("MANTEUFFEL"),
        General::new("DIETRICH"),
        General::new("BRANDENBERGER"),
    ];
    g1[0].defence = 14;
    g1[0].defence_bonus = 1;
    g1[1].traits = GeneralTraits::from_byte(4 | 8);
    g1[1].attack = 13;
    g1[2].attack = 12;
    g1[3].traits = GeneralTraits::from_byte(2);
    [g0, g1]
}

struct UnitSpec {
    name_index: usize,
    unit_type: usize,
    x: i32,
    y: i32,
    men: i32,
    equip: i32,
    general: usize,
    delayed: i32,
}

fn build_unit(side: usize, index: usize, spec: &UnitSpec, tables: &RuleTables) -> Unit {
    let on_map = spec.delayed == 0;
    Unit {
        side,
        in_contact_with_enemy: false,
        is_under_attack: false,
        recently_in_action: false,
        has_supply_line: true,
        under_threat: false,
        has_local_command: false,
        seen_by_enemy: false,
        is_in_game: on_map,
        x: spec.x,
        y: spec.y,
        men_count: spec.men,
        equip_count: spec.equip,
        formation: 0,
        supply_unit: 8,
        long_range_strike: false,
        unit_type: spec.unit_type,
        color_palette: if side == 0 { 3 } else { 2 },
        name: tables.unit_names[side][spec.name_index].clone(),
        target_formation: 0,
        order_settled: false,
        order: Order::Reserve,
        general_index: spec.general,
        supply_level: 48,
        morale: 100,
        terrain: 0,
        variant_bitmap: 0,
        half_days_until_appear: spec.delayed,
        inv_appear_probability: if spec.delayed > 0 { 2 } else { 0 },
        fatigue: 0,
        objective_x: spec.x,
        objective_y: spec.y,
        index,
    }
}

fn sample_units(tables: &RuleTables) -> [Vec<Unit>; 2] {
    let side0 = [
        UnitSpec { name_index: 0, unit_type: 0, x: 18, y: 6, men: 120, equip: 20, general: 0, delayed: 0 },
        UnitSpec { name_index: 1, unit_type: 1, x: 20, y: 8, men: 100, equip: 45, general: 1, delayed: 0 },
        UnitSpec { name_index: 2, unit_type: 2, x: 16, y: 12, men: 90, equip: 12, general: 2, delayed: 0 },
        UnitSpec { name_index: 3, unit_type: 0, x: 22, y: 14, men: 110, equip: 18, general: 0, delayed: 0 },
        UnitSpec { name_index: 4, unit_type: 4, x: 14, y: 9, men: 60, equip: 30, general: 2, delayed: 0 },
        UnitSpec { name_index: 5, unit_type: 0, x: 18, y: 18, men: 115, equip: 20, general: 3, delayed: 0 },
        UnitSpec { name_index: 6, unit_type: 7, x: 16, y: 20, men: 70, equip: 10, general: 3, delayed: 0 },
        UnitSpec { name_index: 7, unit_type: 1, x: 10, y: 10, men: 95, equip: 40, general: 1, delayed: 4 },
        UnitSpec { name_index: 8, unit_type: 12, x: 12, y: 13, men: 30, equip: 5, general: 0, delayed: 0 },
        UnitSpec { name_index: 9, unit_type: 13, x: 8, y: 14, men: 20, equip: 2, general: 0, delayed: 0 },
    ];
    let side1 = [
        UnitSpec { name_index: 0, unit_type: 0, x: 44, y: 6, men: 130, equip: 18, general: 0, delayed: 0 },
        UnitSpec { name_index: 1, unit_type: 1, x: 42, y: 9, men: 105, equip: 50, general: 1, delayed: 0 },
        UnitSpec { name_index: 2, unit_type: 0, x: 46, y: 12, men: 120, equip: 16, general: 0, delayed: 0 },
        UnitSpec { name_index: 3, unit_type: 0, x: 40, y: 15, men: 125, equip: 20, general: 2, delayed: 0 },
        UnitSpec { name_index: 4, unit_type: 5, x: 48, y: 10, men: 55, equip: 35, general: 2, delayed: 0 },
        UnitSpec { name_index: 5, unit_type: 0, x: 44, y: 19, men: 118, equip: 17, general: 3, delayed: 0 },
        UnitSpec { name_index: 6, unit_type: 7, x: 48, y: 20, men: 65, equip: 8, general: 3, delayed: 0 },
        UnitSpec { name_index: 7, unit_type: 1, x: 52, y: 12, men: 100, equip: 48, general: 1, delayed: 6 },
        UnitSpec { name_index: 8, unit_type: 12, x: 50, y: 15, men: 28, equip: 4, general: 0, delayed: 0 },
        UnitSpec { name_index: 9, unit_type: 13, x: 54, y: 16, men: 18, equip: 2, general: 0, delayed: 0 },
    ];
    [
        side0
            .iter()
            .enumerate()
            .map(|(i, s)| build_unit(0, i, s, tables))
            .collect(),
        side1
            .iter()
            .enumerate()
            .map(|(i, s)| build_unit(1, i, s, tables))
            .collect(),
    ]
}

fn sample_cities() -> Vec<City> {
    let city = |owner, victory_points, x, y, name: &str| City {
        owner,
        victory_points,
        x,
        y,
        variant_bitmap: 0,
        name: name.into(),
    };
    vec![
        city(0, 20, 12, 8, "MALMEDY"),
        city(0, 15, 18, 10, "STAVELOT"),
        city(0, 10, 14, 16, "HOUFFALIZE"),
        city(0, 8, 20, 20, "BASTOGNE"),
        city(1, 18, 46, 8, "PRUM"),
        city(1, 12, 42, 13, "BITBURG"),
        city(1, 10, 50, 18, "VIANDEN"),
        city(1, 6, 38, 22, "ECHTERNACH"),
    ]
}

fn sample_region_coeffs() -> RegionCoeffs {
    let mut coeffs = RegionCoeffs::uniform(8);
    // The central ridge matters more than the flanks.
    for row in coeffs.0.iter_mut() {
        row[7] = 12;
        row[8] = 12;
        row[0] = 4;
        row[15] = 4;
    }
    coeffs
}

pub fn sample_variant() -> Variant {
    Variant {
        name: "Campaign".into(),
        length_in_days: 12,
        critical_locations: [60, 55],
        loss_weight: 6,
        cities_held: [53, 46],
    }
}

/// The complete fixture bundle, ready for [`crate::engine::GameState`].
pub fn sample_campaign() -> CampaignBundle {
    let tables = sample_tables();
    let units = sample_units(&tables);
    CampaignBundle {
        ruleset: Ruleset::Europe,
        scenario: Scenario {
            name: "Winter counteroffensive".into(),
            start_minute: 0,
            start_hour: 6,
            start_day: 15,
            start_month: 11,
            start_year: 1944,
            start_weather: 1,
            start_supply_levels: [2048, 1792],
        },
        variant: sample_variant(),
        variant_index: 0,
        tables,
        coeffs: sample_coeffs(),
        generals: sample_generals(),
        units: UnitRoster::new(units),
        surface: sample_surface(),
        cities: sample_cities(),
        region_coeffs: sample_region_coeffs(),
        options: Options::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_start_on_valid_passable_tiles() {
        let b = sample_campaign();
        for side in 0..2 {
            for u in b.units.side(side) {
                let class = b.surface.terrain_class_at(u.x, u.y) as usize;
                assert!(class < 7, "{} starts on impassable ground", u.name);
                assert!(
                    b.tables.move_speed[class][u.unit_type] > 0 || !b.tables.unit_can_move[u.unit_type],
                    "{} cannot stand where it starts",
                    u.name
                );
            }
        }
    }

    #[test]
    fn test_supply_chain_points_at_headquarters() {
        let b = sample_campaign();
        for side in 0..2 {
            for u in b.units.side(side) {
                if u.unit_type < b.tables.min_supply_type as usize {
                    let hq = b.units.get(side, u.supply_unit);
                    assert!(hq.unit_type >= b.tables.min_supply_type as usize);
                }
            }
        }
    }

    #[test]
    fn test_cities_sit_on_the_surface() {
        let b = sample_campaign();
        for c in &b.cities {
            let (mx, my) = (c.x / 2, c.y);
            assert!(b.surface.are_coords_valid(mx, my), "{} off-map", c.name);
        }
    }

    #[test]
    fn test_patches_address_known_offsets() {
        let mut t = sample_tables();
        let patches = t.patches.clone();
        for p in patches {
            t.apply_patch(p.offset, p.value).unwrap();
        }
    }
}
