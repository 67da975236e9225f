//! Scenario variants
//!
//! A scenario ships several variants differing in length, win conditions and
//! which units/cities take part (selected through per-unit and per-city
//! bitmaps at setup).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub length_in_days: i32,
    /// Critical locations a side must capture to force an immediate win.
    pub critical_locations: [i32; 2],
    /// Weight (out of 8) of side-1 losses in side-0's score.
    pub loss_weight: i32,
    /// Starting held-city value per side.
    pub cities_held: [i32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_round_trips_through_json() {
        let v = Variant {
            name: "Full campaign".into(),
            length_in_days: 14,
            critical_locations: [3, 2],
            loss_weight: 8,
            cities_held: [120, 80],
        };
        let text = serde_json::to_string(&v).unwrap();
        let back: Variant = serde_json::from_str(&text).unwrap();
        assert_eq!(back.length_in_days, 14);
        assert_eq!(back.cities_held, [120, 80]);
    }
}
