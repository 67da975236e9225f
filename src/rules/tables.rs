//! Scenario rule tables
//!
//! Every tunable number the engine consults lives here, one named table per
//! concern, indexed by unit type (16), terrain class (8), formation (8) or
//! side (2). Scenarios can rewrite single bytes of this block on given days
//! through [`DataPatch`]; the patch offsets address the historical byte
//! layout, so [`RuleTables::apply_patch`] dispatches an offset onto the
//! named table it falls in.

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};

/// Rewrite one rule byte at the start of the given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPatch {
    pub day: i32,
    pub offset: u8,
    pub value: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTables {
    /// Per-type defensive nerve, signed nibble. Higher values delay retreats
    /// and surrender under pressure.
    pub unit_resolve: [i32; 16],
    /// Per-type offensive spirit, signed nibble. Added to morale terms.
    pub unit_valor: [i32; 16],
    /// Equipment contribution to defence scores, per type.
    pub equip_defence_weight: [i32; 16],
    /// Equipment contribution to attack scores, per type.
    pub equip_attack_weight: [i32; 16],
    /// Ranged/armament trait bits per type (`&31` is the firing range).
    pub weapon_traits: [u8; 16],
    /// Score for destroying a unit of this type; types scoring 4 or more are
    /// priority targets.
    pub unit_scores: [i32; 16],
    /// Daily fatigue recovery per type.
    pub recovery_rate: [i32; 16],
    /// Misc behaviour bits per type; see the named accessors.
    pub unit_mask: [u8; 16],
    pub unit_uses_supplies: [bool; 16],
    pub unit_can_move: [bool; 16],

    pub terrain_men_attack: [i32; 8],
    pub terrain_equip_attack: [i32; 8],
    pub terrain_men_defence: [i32; 8],
    pub terrain_equip_defence: [i32; 8],
    pub formation_men_attack: [i32; 8],
    pub formation_equip_attack: [i32; 8],
    pub formation_men_defence: [i32; 8],
    pub formation_equip_defence: [i32; 8],

    /// Types at or above this provide supply to other units; they receive
    /// supplies only from types with larger numbers.
    pub min_supply_type: i32,
    pub hex_size_miles: i32,
    /// Supplies burnt by attacking.
    pub attack_supply_use: i32,
    /// Supplies burnt by defending against an attack.
    pub defence_supply_use: i32,
    pub max_resupply_amount: i32,
    /// Transport budget for a supply run, in half-miles.
    pub max_supply_transport_budget: i32,
    /// Average supplies each unit consumes per day.
    pub avg_daily_supply_use: i32,
    /// Defence score scale (out of 8) for units that ran out of supplies.
    pub unsupplied_defence_scale: i32,
    pub minutes_per_tick: i32,
    /// How many times each unit should be updated per tick, times 128.
    pub updates_per_tick: i32,
    /// One stored man corresponds to this many actual men.
    pub men_multiplier: i32,
    /// Same for equipment.
    pub equip_multiplier: i32,
    /// Fatigue gained by a completed march step.
    pub march_fatigue: i32,
    /// Held-city score divisor used by the third ruleset.
    pub city_score_divisor: i32,
    /// Spotting decay rate used by the third ruleset.
    pub spotting_rate: i32,
    /// Formation prescribed for each order at each of four stages
    /// (approach, arrival, combat, pursuit).
    pub order_formations: [[i32; 4]; 4],
    /// Base pace per formation.
    pub formation_pace: [i32; 8],
    /// Pace scale (out of 8) while in contact, per type, 0..8; types below 3
    /// may close-assault adjacent enemies.
    pub combat_pace: [i32; 16],
    /// Resupply ceiling per type.
    pub unit_resupply: [i32; 16],
    /// Formation change speed table, indexed by glide direction and current
    /// formation.
    pub formation_change: [i32; 16],
    /// Supply pool growth per side per half-day.
    pub resupply_rate: [i32; 2],
    pub men_replacement_rate: [i32; 2],
    pub equip_replacement_rate: [i32; 2],
    /// Contact/visibility decay chance denominator per side.
    pub contact_decay: [i32; 2],
    /// Pace per terrain class and unit type; 0 means impassable.
    pub move_speed: [[i32; 16]; 8],
    /// Four candidate weather states per quarter of the year.
    pub possible_weather: [u8; 16],
    pub men_limit: [i32; 16],
    pub equip_limit: [i32; 16],
    /// Scripted byte rewrites applied at day boundaries.
    pub patches: Vec<DataPatch>,

    pub unit_types: Vec<String>,
    pub formations: Vec<String>,
    pub experience: Vec<String>,
    pub unit_names: [Vec<String>; 2],
    pub months: Vec<String>,
    pub sides: Vec<String>,
    pub weather_names: Vec<String>,
}

fn low_nibble_signed(v: u8) -> i32 {
    (v.wrapping_mul(16) as i8 as i32) / 16
}

fn high_nibble_signed(v: u8) -> i32 {
    ((v & 240) as i8 as i32) / 16
}

impl RuleTables {
    pub fn firing_range(&self, unit_type: usize) -> i32 {
        (self.weapon_traits[unit_type] & 31) as i32
    }

    pub fn mask_bit(&self, unit_type: usize, bit: u8) -> bool {
        self.unit_mask[unit_type] & bit != 0
    }

    /// Formation prescribed for the given order at the given stage.
    pub fn order_formation(&self, order_index: usize, stage: usize) -> i32 {
        self.order_formations[order_index][stage]
    }

    /// Applies one scripted rewrite. Offsets address the historical byte
    /// layout; anything outside a known table is fatal.
    pub fn apply_patch(&mut self, offset: u8, value: u8) -> Result<()> {
        let off = offset as usize;
        let v = value as i32;
        match off {
            0..=15 => {
                self.unit_resolve[off] = low_nibble_signed(value);
                self.unit_valor[off] = high_nibble_signed(value);
            }
            16..=31 => {
                self.equip_defence_weight[off - 16] = (value & 15) as i32;
                self.equip_attack_weight[off - 16] = (value / 16) as i32;
            }
            32..=47 => self.weapon_traits[off - 32] = value,
            48..=63 => self.unit_scores[off - 48] = v,
            64..=79 => self.recovery_rate[off - 64] = v,
            80..=95 => {
                self.unit_mask[off - 80] = value;
                self.unit_uses_supplies[off - 80] = value & 8 == 0;
                self.unit_can_move[off - 80] = value & 64 == 0;
            }
            96..=103 => self.terrain_men_attack[off - 96] = v,
            104..=111 => self.terrain_equip_attack[off - 104] = v,
            112..=119 => self.terrain_men_defence[off - 112] = v,
            120..=127 => self.terrain_equip_defence[off - 120] = v,
            128..=135 => self.formation_men_attack[off - 128] = v,
            136..=143 => self.formation_equip_attack[off - 136] = v,
            144..=151 => self.formation_men_defence[off - 144] = v,
            152..=159 => self.formation_equip_defence[off - 152] = v,
            160 => self.min_supply_type = v,
            161 => self.hex_size_miles = v,
            162 => self.attack_supply_use = v,
            163 => self.defence_supply_use = v,
            164 => self.max_resupply_amount = v,
            165 => self.max_supply_transport_budget = v,
            166 => self.avg_daily_supply_use = v,
            167 => self.unsupplied_defence_scale = v,
            168 => self.minutes_per_tick = v,
            169 => self.updates_per_tick = v,
            170 => self.men_multiplier = v,
            171 => self.equip_multiplier = v,
            173 => self.march_fatigue = v,
            174 => self.city_score_divisor = v,
            175 => self.spotting_rate = v,
            176..=189 => self.order_formations[(off - 176) / 4][(off - 176) % 4] = v,
            192..=199 => self.formation_pace[off - 192] = v,
            200..=215 => {
                self.combat_pace[off - 200] = (value & 7) as i32;
                self.unit_resupply[off - 200] = ((value & 240) >> 1) as i32;
            }
            216..=231 => self.formation_change[off - 216] = v,
            232 => self.resupply_rate[0] = v,
            233 => self.resupply_rate[1] = v,
            234 => self.men_replacement_rate[0] = v,
            235 => self.men_replacement_rate[1] = v,
            236 => self.equip_replacement_rate[0] = v,
            237 => self.equip_replacement_rate[1] = v,
            252 => self.contact_decay[0] = v,
            253 => self.contact_decay[1] = v,
            _ => return Err(EngineError::BadPatchOffset(off)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::sample::sample_tables;

    #[test]
    fn test_patch_signed_nibbles() {
        let mut t = sample_tables();
        // 0xf2: low nibble 2, high nibble -1.
        t.apply_patch(3, 0xf2).unwrap();
        assert_eq!(t.unit_resolve[3], 2);
        assert_eq!(t.unit_valor[3], -1);
        // 0x8f: low nibble -8... 0xf sign-extends to -1.
        t.apply_patch(3, 0x8f).unwrap();
        assert_eq!(t.unit_resolve[3], -1);
        assert_eq!(t.unit_valor[3], -8);
    }

    #[test]
    fn test_patch_pace_and_resupply_share_byte() {
        let mut t = sample_tables();
        t.apply_patch(205, 0b1010_0011).unwrap();
        assert_eq!(t.combat_pace[5], 3);
        assert_eq!(t.unit_resupply[5], 80);
    }

    #[test]
    fn test_patch_mask_updates_derived_flags() {
        let mut t = sample_tables();
        t.apply_patch(82, 8 | 64).unwrap();
        assert!(!t.unit_uses_supplies[2]);
        assert!(!t.unit_can_move[2]);
        t.apply_patch(82, 0).unwrap();
        assert!(t.unit_uses_supplies[2]);
        assert!(t.unit_can_move[2]);
    }

    #[test]
    fn test_patch_unknown_offset_is_fatal() {
        let mut t = sample_tables();
        assert!(matches!(
            t.apply_patch(254, 1),
            Err(EngineError::BadPatchOffset(254))
        ));
        assert!(t.apply_patch(190, 1).is_err());
    }
}
