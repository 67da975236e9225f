//! Core type definitions used throughout the codebase

/// Side index: 0 or 1. Arrays indexed per side are `[T; 2]`.
pub type Side = usize;

/// The opposing side.
pub fn enemy(side: Side) -> Side {
    1 - side
}

/// Inclusive clamp matching the table arithmetic used across the engine.
pub fn clamp(v: i32, min: i32, max: i32) -> i32 {
    if v < min {
        min
    } else if v > max {
        max
    } else {
        v
    }
}

/// -1, 0 or 1.
pub fn sign(v: i32) -> i32 {
    v.signum()
}

pub fn in_range(v: i32, min: i32, max: i32) -> bool {
    v >= min && v < max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enemy_side() {
        assert_eq!(enemy(0), 1);
        assert_eq!(enemy(1), 0);
    }

    #[test]
    fn test_clamp_bounds() {
        assert_eq!(clamp(-5, 0, 255), 0);
        assert_eq!(clamp(300, 0, 255), 255);
        assert_eq!(clamp(42, 0, 255), 42);
    }

    #[test]
    fn test_in_range_is_half_open() {
        assert!(in_range(0, 0, 4));
        assert!(!in_range(4, 0, 4));
    }
}
