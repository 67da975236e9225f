//! Campaign scoring
//!
//! Each side's score combines the losses it inflicted with the victory
//! points of the cities it holds. The running comparison drives the
//! end-of-campaign verdict; capturing enough critical locations ends the
//! campaign outright before the clock runs out.

use crate::core::types::{clamp, Side};
use crate::rules::Ruleset;

use super::state::GameState;

impl GameState {
    /// Who is ahead right now, and by how much (0 = marginal, 4 = decisive).
    pub fn winning_side_and_advantage(&self) -> (Side, i32) {
        let mut side0_score =
            (1 + self.men_lost[1] + self.equip_lost[1]) * self.variant.loss_weight / 8;
        let mut side1_score = 1 + self.men_lost[0] + self.equip_lost[0];
        if self.ruleset != Ruleset::Vietnam {
            side0_score += self.cities_held[0] * 3;
            side1_score += self.cities_held[1] * 3;
        } else {
            side0_score += self.cities_held[0] * 6 / (self.tables.city_score_divisor + 1);
            side1_score += self.cities_held[1] * 6 / (self.tables.city_score_divisor + 1);
        }
        let (winning_side, score) = if side0_score < side1_score {
            (1, side1_score * 3 / side0_score)
        } else {
            (0, side0_score * 3 / side1_score)
        };
        let advantage = if score >= 3 { clamp(score - 3, 0, 4) } else { 4 };
        (winning_side, advantage)
    }

    /// End-of-campaign verdict: outcome index into the result strings,
    /// balance index and the commander's performance rank, all 0-based.
    pub fn final_results(&self) -> (i32, i32, i32) {
        let (winning_side, advantage) = self.winning_side_and_advantage();
        let mut absolute_advantage = 6;
        if winning_side == 0 {
            absolute_advantage -= advantage + 1;
        } else {
            absolute_advantage += advantage;
        }
        let mut verdict_side = self.player_side as i32;
        // Both sides under computer command with full intelligence: report
        // from the winner's point of view.
        if self.options.packed_value() % 4 == 0 {
            verdict_side = if absolute_advantage < 6 { 1 } else { 0 };
        }
        let mut outcome = if verdict_side == 0 {
            absolute_advantage
        } else {
            11 - absolute_advantage
        };

        let critical_balance =
            self.critical_locations_captured[0] - self.critical_locations_captured[1];
        if critical_balance >= self.variant.critical_locations[0] {
            outcome = 1 + 9 * (1 - verdict_side);
        }
        if -critical_balance >= self.variant.critical_locations[1] {
            outcome = 1 + 9 * verdict_side;
        }
        let balance = self.options.game_balance + verdict_side * (4 - 2 * self.options.game_balance);
        let rank = (outcome - 2 * balance + 4).min(12);
        (outcome - 1, balance - 1, rank - 1)
    }

    pub(crate) fn is_game_over(&self) -> bool {
        if self.days_elapsed >= self.variant.length_in_days {
            return true;
        }
        let critical_balance =
            self.critical_locations_captured[0] - self.critical_locations_captured[1];
        critical_balance >= self.variant.critical_locations[0]
            || -critical_balance >= self.variant.critical_locations[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::event_channel;
    use crate::rules::sample::sample_campaign;
    use crate::rules::{Commander, Intelligence};

    fn quiet_state() -> GameState {
        // No consumer: a stray send reports cancellation instead of blocking.
        let (sync, stream) = event_channel();
        drop(stream);
        let mut bundle = sample_campaign();
        bundle.options.commanders = [Commander::Computer, Commander::Computer];
        bundle.options.intelligence = Intelligence::Limited;
        GameState::new(bundle, 0, 11, sync)
    }

    #[test]
    fn test_city_holdings_decide_a_bloodless_game() {
        let s = quiet_state();
        // No losses yet: the side holding more victory points leads, barely.
        let (side, advantage) = s.winning_side_and_advantage();
        assert_eq!(side, 0);
        assert_eq!(advantage, 0);
    }

    #[test]
    fn test_heavy_losses_flip_the_verdict() {
        let mut s = quiet_state();
        s.men_lost[0] = 1000;
        let (side, advantage) = s.winning_side_and_advantage();
        assert_eq!(side, 1);
        assert_eq!(advantage, 4);
    }

    #[test]
    fn test_final_results_marginal_win() {
        let s = quiet_state();
        // Side 0 ahead by a whisker: absolute advantage 5, even balance.
        assert_eq!(s.final_results(), (4, 1, 4));
    }

    #[test]
    fn test_critical_locations_override_the_score() {
        let mut s = quiet_state();
        s.critical_locations_captured[1] = s.variant.critical_locations[1];
        let (outcome, _, _) = s.final_results();
        // Player side 0 loses outright.
        assert_eq!(outcome, 0);
    }

    #[test]
    fn test_game_ends_when_time_runs_out() {
        let mut s = quiet_state();
        assert!(!s.is_game_over());
        s.days_elapsed = s.variant.length_in_days;
        assert!(s.is_game_over());
    }

    #[test]
    fn test_game_ends_on_critical_capture() {
        let mut s = quiet_state();
        s.critical_locations_captured[0] = s.variant.critical_locations[0];
        assert!(s.is_game_over());
    }
}
