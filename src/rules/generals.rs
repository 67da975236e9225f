//! Generals and their command traits

use serde::{Deserialize, Serialize};

/// Doubling/halving switches applied to the four order-selection score
/// terms, one pair of bits per term.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GeneralTraits {
    pub double_defence: bool,
    pub double_caution: bool,
    pub double_aggression: bool,
    pub double_boldness: bool,
    pub halve_defence: bool,
    pub halve_caution: bool,
    pub halve_aggression: bool,
    pub halve_boldness: bool,
}

impl GeneralTraits {
    pub fn from_byte(b: u8) -> Self {
        Self {
            double_defence: b & 1 != 0,
            double_caution: b & 2 != 0,
            double_aggression: b & 4 != 0,
            double_boldness: b & 8 != 0,
            halve_defence: b & 16 != 0,
            halve_caution: b & 32 != 0,
            halve_aggression: b & 64 != 0,
            halve_boldness: b & 128 != 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct General {
    pub traits: GeneralTraits,
    /// Attack multiplier, out of 16.
    pub attack: i32,
    /// Signed bonus added to strength-ratio scores when ordering.
    pub attack_bonus: i32,
    /// Defence multiplier, out of 16.
    pub defence: i32,
    /// Signed bonus lowering the press-fatigue and withdrawal thresholds.
    pub defence_bonus: i32,
    /// Movement multiplier, out of 16.
    pub movement: i32,
    pub name: String,
}

impl General {
    pub fn new(name: &str) -> Self {
        Self {
            traits: GeneralTraits::default(),
            attack: 10,
            attack_bonus: 0,
            defence: 10,
            defence_bonus: 0,
            movement: 10,
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traits_from_byte() {
        let t = GeneralTraits::from_byte(1 | 8 | 32);
        assert!(t.double_defence);
        assert!(t.double_boldness);
        assert!(t.halve_caution);
        assert!(!t.double_caution);
        assert!(!t.halve_boldness);
    }

    #[test]
    fn test_traits_zero_byte_is_neutral() {
        let t = GeneralTraits::from_byte(0);
        assert!(!t.double_defence && !t.halve_defence);
        assert!(!t.double_aggression && !t.halve_aggression);
    }
}
