//! Campaign clock
//!
//! Minutes cascade into hours, days, months and years; every month is 30
//! days long. Night starts and ends relative to a sunrise offset derived
//! from the distance to midsummer, so winter scenarios have longer nights.

use serde::{Deserialize, Serialize};

use crate::rules::Scenario;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Clock {
    pub minute: i32,
    pub hour: i32,
    /// 0-based.
    pub day: i32,
    /// 0-based.
    pub month: i32,
    pub year: i32,
    pub is_night: bool,
}

impl Clock {
    pub fn new(scenario: &Scenario) -> Self {
        let mut clock = Self {
            minute: scenario.start_minute,
            hour: scenario.start_hour,
            day: scenario.start_day,
            month: scenario.start_month,
            year: scenario.start_year,
            is_night: false,
        };
        clock.recompute_night();
        clock
    }

    /// Updates the night flag for the current hour and month.
    pub fn recompute_night(&mut self) {
        let sunrise_offset = (6 - self.month).abs() / 2;
        self.is_night = self.hour < 5 + sunrise_offset || self.hour > 20 - sunrise_offset;
    }

    /// Advances the clock. Returns true when a new hour started; the night
    /// flag is only refreshed on hour boundaries.
    pub fn advance(&mut self, minutes: i32) -> bool {
        self.minute += minutes;
        if self.minute >= 60 {
            self.minute = 0;
            self.hour += 1;
        }
        if self.hour >= 24 {
            self.hour = 0;
            self.day += 1;
        }
        if self.day >= 30 {
            self.day = 0;
            self.month += 1;
        }
        if self.month >= 12 {
            self.month = 0;
            self.year += 1;
        }
        self.minute == 0
    }

    pub fn describe(&self, months: &[String]) -> String {
        let month = months
            .get(self.month as usize)
            .map(String::as_str)
            .unwrap_or("?");
        format!(
            "{:02}:{:02} {} {} {}",
            self.hour,
            self.minute,
            self.day + 1,
            month,
            self.year
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn december_scenario() -> Scenario {
        Scenario {
            name: "test".into(),
            start_minute: 0,
            start_hour: 10,
            start_day: 15,
            start_month: 11,
            start_year: 1944,
            start_weather: 0,
            start_supply_levels: [0, 0],
        }
    }

    #[test]
    fn test_months_are_thirty_days() {
        let mut c = Clock::new(&december_scenario());
        c.minute = 59;
        c.hour = 23;
        c.day = 29;
        assert!(c.advance(1));
        assert_eq!((c.minute, c.hour, c.day, c.month, c.year), (0, 0, 0, 0, 1945));
    }

    #[test]
    fn test_partial_hour_does_not_roll() {
        let mut c = Clock::new(&december_scenario());
        c.minute = 10;
        assert!(!c.advance(1));
        assert_eq!(c.minute, 11);
    }

    #[test]
    fn test_winter_nights_are_long() {
        let mut c = Clock::new(&december_scenario());
        // December: sunrise offset 2, night before 07:00 and after 18:00.
        c.hour = 6;
        c.recompute_night();
        assert!(c.is_night);
        c.hour = 12;
        c.recompute_night();
        assert!(!c.is_night);
        c.hour = 19;
        c.recompute_night();
        assert!(c.is_night);
        // June: offset 0, 19:00 is still daylight.
        c.month = 5;
        c.recompute_night();
        assert!(!c.is_night);
    }

    #[test]
    fn test_describe_uses_month_names() {
        let c = Clock::new(&december_scenario());
        let months: Vec<String> = (0..12).map(|i| format!("M{}", i)).collect();
        assert_eq!(c.describe(&months), "10:00 16 M11 1944");
    }
}
