//! Terrain surface
//!
//! A hex grid of tile bytes, stored row by row with odd rows one tile
//! shorter. The low six bits of a tile byte select an entry in the 64-way
//! terrain class table; units standing on the map temporarily overwrite
//! their tile with a unit marker byte and restore the terrain when they
//! move or hide.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{EngineError, Result};

/// Terrain classes are indices 0..8 into the per-class rule rows; anything
/// decoding to 48 or above marks a corrupted tile.
pub const MAX_TERRAIN_CLASS: u8 = 48;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainSurface {
    pub width: i32,
    pub height: i32,
    tiles: Vec<u8>,
    /// 64-way mapping from tile byte (low six bits) to terrain class.
    terrain_classes: Vec<u8>,
}

impl TerrainSurface {
    pub fn new(width: i32, height: i32, tiles: Vec<u8>, terrain_classes: [u8; 64]) -> Self {
        Self {
            width,
            height,
            tiles,
            terrain_classes: terrain_classes.to_vec(),
        }
    }

    /// Uniform surface, handy for fixtures.
    pub fn filled(width: i32, height: i32, tile: u8, terrain_classes: [u8; 64]) -> Self {
        let len = (width * height) as usize;
        Self::new(width, height, vec![tile; len], terrain_classes)
    }

    /// Map-coordinate validity: odd rows are one tile short.
    pub fn are_coords_valid(&self, x: i32, y: i32) -> bool {
        y >= 0 && y < self.height && x >= 0 && x < self.width - y % 2
    }

    pub fn is_index_valid(&self, ix: i32) -> bool {
        ix >= 0 && (ix as usize) < self.tiles.len()
    }

    /// Storage index for unit coordinates.
    pub fn unit_coords_to_index(&self, x: i32, y: i32) -> i32 {
        y * self.width + x / 2 - y / 2
    }

    pub fn tile_at_index(&self, ix: i32) -> u8 {
        if !self.is_index_valid(ix) {
            warn!(ix, "tile read outside surface");
            return 0;
        }
        self.tiles[ix as usize]
    }

    pub fn set_tile_at_index(&mut self, ix: i32, tile: u8) {
        if self.is_index_valid(ix) {
            self.tiles[ix as usize] = tile;
        }
    }

    /// Tile byte at unit coordinates; 0 outside the surface.
    pub fn tile_at(&self, x: i32, y: i32) -> u8 {
        let ix = self.unit_coords_to_index(x, y);
        if !self.is_index_valid(ix) {
            return 0;
        }
        self.tiles[ix as usize]
    }

    pub fn terrain_class(&self, tile: u8) -> u8 {
        self.terrain_classes
            .get((tile & 63) as usize)
            .copied()
            .unwrap_or(0)
    }

    pub fn terrain_class_at(&self, x: i32, y: i32) -> u8 {
        self.terrain_class(self.tile_at(x, y))
    }

    pub fn terrain_class_at_index(&self, ix: i32) -> u8 {
        self.terrain_class(self.tile_at_index(ix))
    }

    /// Restores a terrain byte a unit was standing on. A remembered byte
    /// decoding to a unit marker means the overlay bookkeeping broke down.
    pub fn restore_tile(&mut self, x: i32, y: i32, remembered: u8) -> Result<()> {
        if remembered % 64 >= MAX_TERRAIN_CLASS {
            return Err(EngineError::CorruptTerrain {
                byte: remembered,
                x,
                y,
                class: remembered % 64,
            });
        }
        let ix = self.unit_coords_to_index(x, y);
        self.set_tile_at_index(ix, remembered);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> [u8; 64] {
        let mut t = [0u8; 64];
        for (i, c) in t.iter_mut().enumerate() {
            *c = (i % 8) as u8;
        }
        // Unit marker bytes decode to classes >= 48.
        for c in t.iter_mut().skip(48) {
            *c = 48;
        }
        t
    }

    #[test]
    fn test_odd_rows_are_shorter() {
        let s = TerrainSurface::filled(8, 4, 0, classes());
        assert!(s.are_coords_valid(7, 0));
        assert!(!s.are_coords_valid(7, 1));
        assert!(s.are_coords_valid(6, 1));
    }

    #[test]
    fn test_unit_coords_index_round_trip() {
        let mut s = TerrainSurface::filled(8, 4, 0, classes());
        // Unit coords (5, 1) lie in the second row.
        let ix = s.unit_coords_to_index(5, 1);
        s.set_tile_at_index(ix, 3);
        assert_eq!(s.tile_at(5, 1), 3);
        assert_eq!(s.tile_at(4, 0), 0);
    }

    #[test]
    fn test_out_of_bounds_reads_zero() {
        let s = TerrainSurface::filled(4, 4, 7, classes());
        assert_eq!(s.tile_at(-10, -10), 0);
    }

    #[test]
    fn test_restore_rejects_unit_marker() {
        let mut s = TerrainSurface::filled(4, 4, 0, classes());
        assert!(s.restore_tile(2, 0, 48).is_err());
        assert!(s.restore_tile(2, 0, 5).is_ok());
    }
}
