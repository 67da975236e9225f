//! Frontline - deterministic operational wargame engine

pub mod core;
pub mod engine;
pub mod map;
pub mod rules;
