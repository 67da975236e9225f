//! Hex neighbourhood geometry
//!
//! Offset rings used by movement, objective scans and the influence grids.
//! All offsets are in unit coordinates (doubled x). The orderings are fixed:
//! scan loops and tie-breaking rules depend on them.

use crate::map::coords::UnitCoords;

/// The six hex neighbours in scan order, with the tile itself at index 6.
pub const HEX_NEIGHBOURS: [(i32, i32); 7] = [
    (-1, 1),
    (-2, 0),
    (-1, -1),
    (1, -1),
    (2, 0),
    (1, 1),
    (0, 0),
];

/// Two-ring hex neighbourhood: the twelve distance-2 tiles first (by angle),
/// then the six neighbours, then the tile itself. Used by the long-range
/// attack-objective scan.
pub const LONG_RANGE_RING: [(i32, i32); 19] = [
    (2, -2),
    (3, -1),
    (4, 0),
    (3, 1),
    (2, 2),
    (0, 2),
    (-2, 2),
    (-3, 1),
    (-4, 0),
    (-3, -1),
    (-2, -2),
    (0, -2),
    (-1, 1),
    (-2, 0),
    (-1, -1),
    (1, -1),
    (2, 0),
    (1, 1),
    (0, 0),
];

/// Square-tiling offsets sorted by distance, then dy, then dx. The first 9
/// entries form the 3×3 neighbourhood used by the grid scans; all 25 feed
/// wider searches.
pub const SQUARE_OFFSETS: [(i32, i32); 25] = [
    (0, 0),
    (0, -1),
    (-1, 0),
    (1, 0),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
    (0, -2),
    (-2, 0),
    (2, 0),
    (0, 2),
    (-1, -2),
    (1, -2),
    (-2, -1),
    (2, -1),
    (-2, 1),
    (2, 1),
    (-1, 2),
    (1, 2),
    (-2, -2),
    (2, -2),
    (-2, 2),
    (2, 2),
];

pub fn small_grid_offset(i: usize) -> (i32, i32) {
    SQUARE_OFFSETS[i]
}

/// The 3×3 neighbourhood used on the 4×4 aggregate grid.
pub fn tiny_grid_offset(i: usize) -> (i32, i32) {
    SQUARE_OFFSETS[i]
}

pub fn hex_neighbour(xy: UnitCoords, i: usize) -> UnitCoords {
    let (dx, dy) = HEX_NEIGHBOURS[i];
    UnitCoords::new(xy.x + dx, xy.y + dy)
}

pub fn long_range_offset(i: usize) -> (i32, i32) {
    LONG_RANGE_RING[i]
}

/// Assigns 0..11 to a direction, consecutively around the origin. Odd
/// numbers are the exact diagonal/horizontal directions, even numbers the
/// ranges between them.
pub fn direction_index(dx: i32, dy: i32) -> i32 {
    if dy < 0 {
        if dx < dy {
            0
        } else if dx == dy {
            1
        } else if dx < -dy {
            2
        } else if dx == -dy {
            3
        } else {
            4
        }
    } else if dy > 0 {
        if dx < -dy {
            10
        } else if dx == -dy {
            9
        } else if dx < dy {
            8
        } else if dx == dy {
            7
        } else {
            6
        }
    } else if dx > 0 {
        5
    } else if dx < 0 {
        11
    } else {
        0
    }
}

/// Index of the neighbour met when heading in the given direction.
/// Variants 0 and 1 pick one of the two most direct neighbours, variant 2 a
/// less direct one, variant 3 the reverse direction.
pub fn neighbour_towards(direction: i32, variant: i32) -> usize {
    let neighbour = match variant {
        0 | 1 => ((direction + 3 + variant) % 12) / 2,
        2 => ((direction + 1) % 12) / 2,
        _ => ((direction + 6) % 12) / 2,
    };
    neighbour as usize
}

/// First neighbouring tile met when going from `from` towards `to`.
pub fn first_neighbour_towards(from: UnitCoords, to: UnitCoords, variant: i32) -> UnitCoords {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let direction = direction_index(dx, dy);
    hex_neighbour(from, neighbour_towards(direction, variant))
}

/// Tile-index delta of hex neighbour `i` on a surface of the given width.
/// Valid because x and y always share parity in unit coordinates.
pub fn neighbour_map_offset(width: i32, i: usize) -> i32 {
    let (dx, dy) = HEX_NEIGHBOURS[i];
    dy * width + (dx - dy) / 2
}

/// Positional weight of a neighbouring grid cell relative to where inside a
/// 4×4 block the given position sits. Cells ahead in the direction the block
/// is already skewed towards weigh more.
pub fn block_position_bias(xy: UnitCoords, neighbour_index: usize) -> i32 {
    let (mut nx, mut ny) = small_grid_offset(neighbour_index);
    // Interior of a 4x4 block: plain distance falloff.
    if (1..3).contains(&((xy.x / 2) % 4)) && (1..3).contains(&(xy.y % 4)) {
        return 9 - 2 * (nx.abs() + ny.abs());
    }
    if nx == 0 && ny == 0 {
        return 9;
    }
    // Which quadrant of the 4x4 block the position occupies.
    let sx = (xy.x / 4) & 1;
    let sy = (xy.y / 2) & 1;
    // Push nx,ny outside the block so the comparison is against the far edge.
    if nx > 0 {
        nx += 1;
    }
    if ny > 0 {
        ny += 1;
    }
    let mut dx = (nx - sx).abs();
    let mut dy = (ny - sy).abs();
    if nx == 0 {
        dx = 0;
    }
    if ny == 0 {
        dy = 0;
    }
    10 - dx.min(dy) - 2 * dx.max(dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_neighbours_are_distance_one() {
        use crate::map::coords::hex_distance;
        for &(dx, dy) in &HEX_NEIGHBOURS[..6] {
            assert_eq!(hex_distance(dx, dy), 1);
        }
        assert_eq!(HEX_NEIGHBOURS[6], (0, 0));
    }

    #[test]
    fn test_long_range_ring_distances() {
        use crate::map::coords::hex_distance;
        for &(dx, dy) in &LONG_RANGE_RING[..12] {
            assert_eq!(hex_distance(dx, dy), 2, "({},{})", dx, dy);
        }
        for &(dx, dy) in &LONG_RANGE_RING[12..18] {
            assert_eq!(hex_distance(dx, dy), 1);
        }
        assert_eq!(LONG_RANGE_RING[18], (0, 0));
    }

    #[test]
    fn test_direction_index_cardinals() {
        assert_eq!(direction_index(1, 0), 5);
        assert_eq!(direction_index(-1, 0), 11);
        assert_eq!(direction_index(0, -1), 2);
        assert_eq!(direction_index(0, 1), 8);
    }

    #[test]
    fn test_first_neighbour_towards_east() {
        let from = UnitCoords::new(10, 10);
        let to = UnitCoords::new(20, 10);
        assert_eq!(first_neighbour_towards(from, to, 0), UnitCoords::new(12, 10));
    }

    #[test]
    fn test_first_neighbour_towards_west() {
        let from = UnitCoords::new(10, 10);
        let to = UnitCoords::new(0, 10);
        assert_eq!(first_neighbour_towards(from, to, 0), UnitCoords::new(8, 10));
    }

    #[test]
    fn test_block_bias_interior_prefers_center() {
        // (x/2)%4 == 1, y%4 == 1: interior of its block.
        let xy = UnitCoords::new(2, 1);
        assert_eq!(block_position_bias(xy, 0), 9);
        assert!(block_position_bias(xy, 1) < 9);
        assert!(block_position_bias(xy, 5) < block_position_bias(xy, 1));
    }

    #[test]
    fn test_neighbour_map_offset_matches_index_arithmetic() {
        let w = 64;
        let index = |x: i32, y: i32| y * w + x / 2 - y / 2;
        for i in 0..7 {
            let (dx, dy) = HEX_NEIGHBOURS[i];
            for &(x, y) in &[(10, 4), (11, 5), (20, 8), (9, 3)] {
                assert_eq!(
                    index(x + dx, y + dy) - index(x, y),
                    neighbour_map_offset(w, i),
                    "neighbour {} from ({},{})",
                    i,
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_block_bias_center_offset_on_edge() {
        let xy = UnitCoords::new(0, 0);
        assert_eq!(block_position_bias(xy, 0), 9);
    }
}
