//! Map layer: coordinates, hex geometry, terrain surface, cities.

pub mod cities;
pub mod coords;
pub mod geometry;
pub mod surface;

pub use cities::{City, RegionCoeffs};
pub use coords::{MapCoords, UnitCoords};
pub use surface::TerrainSurface;
