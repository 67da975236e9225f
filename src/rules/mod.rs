//! Scenario data: rule tables, rosters, options and the campaign bundle

pub mod coeffs;
pub mod generals;
mod loader;
pub mod sample;
pub mod scenario;
pub mod tables;
pub mod variant;

use serde::{Deserialize, Serialize};

use crate::engine::unit::UnitRoster;
use crate::map::cities::{City, RegionCoeffs};
use crate::map::surface::TerrainSurface;

pub use coeffs::HexCoeffs;
pub use generals::General;
pub use loader::{load_campaign, load_campaign_from_str};
pub use scenario::{Commander, Intelligence, Options, Ruleset, Scenario};
pub use tables::{DataPatch, RuleTables};
pub use variant::Variant;

/// Everything needed to start a campaign: the selected variant, the rule
/// tables, both rosters and the battlefield.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignBundle {
    pub ruleset: Ruleset,
    pub scenario: Scenario,
    pub variant: Variant,
    /// Position of the variant in the scenario's list; selects units and
    /// cities through their bitmaps.
    pub variant_index: usize,
    pub tables: RuleTables,
    pub coeffs: HexCoeffs,
    pub generals: [Vec<General>; 2],
    pub units: UnitRoster,
    pub surface: TerrainSurface,
    pub cities: Vec<City>,
    pub region_coeffs: RegionCoeffs,
    #[serde(default)]
    pub options: Options,
}
