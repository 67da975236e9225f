//! Hex surroundings score
//!
//! Classifies the six neighbours of a tile through a pair of rotated
//! 12-bit occupancy maps, counts how many neighbours fall in each of six
//! classes and sums one table entry per class. The byte arithmetic is
//! wrapping on purpose: neighbour bits pushed past the sixth pair fall
//! off, which is part of the classification.

use crate::map::geometry::HEX_NEIGHBOURS;
use crate::map::surface::TerrainSurface;
use crate::rules::coeffs::CoeffTable;

use super::unit::UnitRoster;

/// Neighbour classes: 0 open ground, 1 friendly or impassable, 2 enemy,
/// 3 open flanked by a friend, 4 open flanked by an enemy, 5 open flanked
/// by both.
const PATTERN_CLASS: [usize; 16] = [0, 2, 1, 0, 4, 2, 1, 0, 3, 2, 1, 0, 5, 2, 1, 0];

fn rotate_right_6bits(num: u8) -> u8 {
    let odd = num & 1;
    let mut num = num >> 1;
    if odd != 0 {
        num |= 0x20;
    }
    num
}

/// Scores the surroundings of (x, y) for the given side. The result is the
/// per-class table sum reinterpreted as a signed byte.
pub fn surroundings_score(
    table: &CoeffTable,
    roster: &UnitRoster,
    surface: &TerrainSurface,
    x: i32,
    y: i32,
    side: usize,
) -> i32 {
    let mut bitmaps = [0u8; 5];
    for i in (0..6).rev() {
        bitmaps[0] = bitmaps[0].wrapping_shl(2);
        bitmaps[1] = bitmaps[1].wrapping_shl(2);
        bitmaps[4] = bitmaps[4].wrapping_shl(2);
        let (dx, dy) = HEX_NEIGHBOURS[i];
        let (nx, ny) = (x + dx, y + dy);
        if roster.contains_unit_of_side(nx, ny, 1 - side) {
            bitmaps[0] = bitmaps[0].wrapping_add(1);
        } else if roster.contains_unit_of_side(nx, ny, side) {
            bitmaps[1] = bitmaps[1].wrapping_add(1);
        } else if surface.terrain_class_at(nx, ny) >= 7 {
            bitmaps[4] = bitmaps[4].wrapping_add(1);
        }
    }

    bitmaps[3] = bitmaps[1];
    bitmaps[2] = bitmaps[0];

    bitmaps[1] = rotate_right_6bits(bitmaps[1]);
    bitmaps[0] = rotate_right_6bits(bitmaps[0]);

    bitmaps[3] |= rotate_right_6bits(bitmaps[1]);
    bitmaps[2] |= rotate_right_6bits(bitmaps[0]);

    bitmaps[1] |= rotate_right_6bits(bitmaps[4]);

    let mut counts = [0usize; 6];
    for _ in 0..6 {
        let mut pattern = 0usize;
        for b in bitmaps[..4].iter_mut().rev() {
            pattern <<= 1;
            if *b & 1 != 0 {
                pattern += 1;
            }
            *b >>= 1;
        }
        counts[PATTERN_CLASS[pattern]] += 1;
    }

    let mut sum = 0i32;
    for class in (0..6).rev() {
        sum += table[class][counts[class]];
    }
    sum as i8 as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::unit::{Order, Unit, UnitRoster};
    use crate::map::surface::TerrainSurface;

    fn flat_surface() -> TerrainSurface {
        TerrainSurface::filled(16, 16, 0, [0; 64])
    }

    fn unit_at(side: usize, index: usize, x: i32, y: i32) -> Unit {
        Unit {
            side,
            in_contact_with_enemy: false,
            is_under_attack: false,
            recently_in_action: false,
            has_supply_line: true,
            under_threat: false,
            has_local_command: false,
            seen_by_enemy: false,
            is_in_game: true,
            x,
            y,
            men_count: 100,
            equip_count: 10,
            formation: 0,
            supply_unit: 0,
            long_range_strike: false,
            unit_type: 0,
            color_palette: 0,
            name: "TEST".into(),
            target_formation: 0,
            order_settled: false,
            order: Order::Reserve,
            general_index: 0,
            supply_level: 10,
            morale: 100,
            terrain: 0,
            variant_bitmap: 0,
            half_days_until_appear: 0,
            inv_appear_probability: 0,
            fatigue: 0,
            objective_x: x,
            objective_y: y,
            index,
        }
    }

    #[test]
    fn test_rotate_right_wraps_bit_zero_to_bit_five() {
        assert_eq!(rotate_right_6bits(0b000001), 0b100000);
        assert_eq!(rotate_right_6bits(0b100000), 0b010000);
        assert_eq!(rotate_right_6bits(0), 0);
    }

    #[test]
    fn test_empty_surroundings_count_as_open() {
        // All six neighbours open: only class 0 contributes, with count 6.
        let mut table = [[0i32; 8]; 6];
        table[0][6] = 13;
        let roster = UnitRoster::new([vec![], vec![]]);
        let score = surroundings_score(&table, &roster, &flat_surface(), 10, 8, 0);
        assert_eq!(score, 13);
    }

    #[test]
    fn test_single_enemy_marks_flanked_neighbours() {
        // One enemy on the first neighbour: one class-2 cell, two cells
        // flanked by the enemy (class 4), the rest open.
        let mut table = [[0i32; 8]; 6];
        table[2][1] = 3;
        table[4][2] = 5;
        let enemy = unit_at(1, 0, 9, 9);
        let roster = UnitRoster::new([vec![], vec![enemy]]);
        let score = surroundings_score(&table, &roster, &flat_surface(), 10, 8, 0);
        assert_eq!(score, 3 + 5);
    }

    #[test]
    fn test_score_is_a_signed_byte() {
        let mut table = [[0i32; 8]; 6];
        table[0][6] = 200;
        let roster = UnitRoster::new([vec![], vec![]]);
        let score = surroundings_score(&table, &roster, &flat_surface(), 10, 8, 0);
        assert_eq!(score, 200u8 as i8 as i32);
        assert!(score < 0);
    }
}
