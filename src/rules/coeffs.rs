//! Neighbour-pattern coefficient tables
//!
//! Four tables consumed by the hex pattern score. A tile's six neighbours
//! are each classified (0 open ground, 1 friendly or impassable, 2 enemy,
//! 3 open flanked by a friend, 4 open flanked by an enemy, 5 open flanked
//! by both); each table row holds the contribution for having 0..=6
//! neighbours of that class, and the scorer reinterprets the row sum as a
//! signed byte.

use serde::{Deserialize, Serialize};

pub type CoeffTable = [[i32; 8]; 6];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexCoeffs {
    /// Favours tiles good to hold: used by defence objective picking.
    pub defence: CoeffTable,
    /// Scores approach tiles when advancing on an empty hex.
    pub approach: CoeffTable,
    /// Scores withdrawal tiles for retreats and worn-out defenders.
    pub withdrawal: CoeffTable,
    /// Scales attacker and defender combat strength.
    pub assault: CoeffTable,
}

#[cfg(test)]
mod tests {
    use crate::rules::sample::sample_coeffs;

    #[test]
    fn test_tables_have_distinct_profiles() {
        let c = sample_coeffs();
        // Enemy-heavy surroundings must hurt withdrawal scores.
        assert!(c.withdrawal[2][6] < c.withdrawal[2][0]);
        assert_ne!(c.assault, c.defence);
    }
}
