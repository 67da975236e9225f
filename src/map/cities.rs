//! Cities and regional influence coefficients

use serde::{Deserialize, Serialize};

use crate::core::types::Side;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub owner: Side,
    pub victory_points: i32,
    /// Unit coordinates.
    pub x: i32,
    pub y: i32,
    /// Which scenario variants this city participates in, one bit each.
    pub variant_bitmap: u8,
    pub name: String,
}

/// Per-region weighting applied to importance influence. One coefficient per
/// 4×4-tile square, a 16×16 grid over the whole surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionCoeffs(pub [[i32; 16]; 16]);

impl RegionCoeffs {
    pub fn uniform(v: i32) -> Self {
        Self([[v; 16]; 16])
    }

    /// Coefficient for the 4×4 square holding the given small-grid cell.
    pub fn at(&self, sx: i32, sy: i32) -> i32 {
        self.0[sy as usize & 15][sx as usize & 15]
    }
}

pub fn find_city(cities: &[City], x: i32, y: i32) -> Option<&City> {
    cities.iter().find(|c| c.x == x && c.y == y)
}

pub fn find_city_mut(cities: &mut [City], x: i32, y: i32) -> Option<&mut City> {
    cities.iter_mut().find(|c| c.x == x && c.y == y)
}

pub fn contains_city(cities: &[City], x: i32, y: i32) -> bool {
    find_city(cities, x, y).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<City> {
        vec![
            City {
                owner: 0,
                victory_points: 10,
                x: 4,
                y: 2,
                variant_bitmap: 0xff,
                name: "Arnheim".into(),
            },
            City {
                owner: 1,
                victory_points: 5,
                x: 9,
                y: 5,
                variant_bitmap: 0x01,
                name: "Sant-Vith".into(),
            },
        ]
    }

    #[test]
    fn test_find_city_by_coords() {
        let cities = roster();
        assert_eq!(find_city(&cities, 4, 2).map(|c| c.victory_points), Some(10));
        assert!(find_city(&cities, 0, 0).is_none());
    }

    #[test]
    fn test_region_coeffs_lookup() {
        let mut coeffs = RegionCoeffs::uniform(2);
        coeffs.0[3][1] = 7;
        assert_eq!(coeffs.at(1, 3), 7);
        assert_eq!(coeffs.at(0, 0), 2);
    }
}
