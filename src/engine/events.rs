//! Simulation events and the blocking hand-off to the consumer
//!
//! The engine runs on its own thread and surrenders control at every event:
//! a send blocks until the consumer acknowledges it, and the acknowledgement
//! doubles as a cancellation flag. Ordering and backpressure are the point;
//! there is no buffering and no timeout.

use std::fmt;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

use crate::map::cities::City;

use super::unit::Unit;

#[derive(Debug, Clone)]
pub enum Event {
    Initialized,
    TimeChanged,
    WeatherForecast { weather: i32 },
    SupplyDistributionStart,
    SupplyDistributionEnd,
    SupplyTruckMove { from_x: i32, from_y: i32, to_x: i32, to_y: i32 },
    Reinforcements { sides: [bool; 2] },
    UnitMove { unit: Unit, from_x: i32, from_y: i32, to_x: i32, to_y: i32 },
    WeMustSurrender { unit: Unit },
    WeHaveExhaustedSupplies { unit: Unit },
    WeAreInContactWithEnemy { unit: Unit },
    WeHaveReachedOurObjective { unit: Unit },
    WeHaveCaptured { unit: Unit, city: City },
    WeAreAttacking { unit: Unit, enemy: Unit, outcome: i32, formation_names: Vec<String> },
    WeHaveMetStrongResistance { unit: Unit },
    WeAreRetreating { unit: Unit },
    WeHaveBeenOverrun { unit: Unit },
    DailyUpdate { days_remaining: i32, supply_level: i32 },
    GameOver,
}

fn unit_headline(unit: &Unit, text: &str) -> String {
    format!("{}: {}", unit.name, text)
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Initialized => write!(f, "initialized"),
            Event::TimeChanged => write!(f, "time changed"),
            Event::WeatherForecast { weather } => write!(f, "weather forecast: {}", weather),
            Event::SupplyDistributionStart => write!(f, "supply distribution started"),
            Event::SupplyDistributionEnd => write!(f, "supply distribution ended"),
            Event::SupplyTruckMove { from_x, from_y, to_x, to_y } => {
                write!(f, "supply truck ({},{}) -> ({},{})", from_x, from_y, to_x, to_y)
            }
            Event::Reinforcements { sides } => {
                write!(f, "reinforcements arrived (side0: {}, side1: {})", sides[0], sides[1])
            }
            Event::UnitMove { unit, to_x, to_y, .. } => {
                write!(f, "{} moves to ({},{})", unit.name, to_x, to_y)
            }
            Event::WeMustSurrender { unit } => {
                write!(f, "{}", unit_headline(unit, "WE MUST SURRENDER"))
            }
            Event::WeHaveExhaustedSupplies { unit } => {
                write!(f, "{}", unit_headline(unit, "WE HAVE EXHAUSTED OUR SUPPLIES"))
            }
            Event::WeAreInContactWithEnemy { unit } => {
                write!(f, "{}", unit_headline(unit, "WE ARE IN CONTACT WITH ENEMY"))
            }
            Event::WeHaveReachedOurObjective { unit } => {
                write!(f, "{}", unit_headline(unit, "WE HAVE REACHED OUR OBJECTIVE"))
            }
            Event::WeHaveCaptured { unit, city } => {
                write!(f, "{}: WE HAVE CAPTURED {}", unit.name, city.name)
            }
            Event::WeAreAttacking { unit, enemy, outcome, formation_names } => {
                let losses = ["HEAVY", "MODERATE", "LIGHT", "VERY LIGHT"];
                let loss = losses[((outcome / 11).max(0) as usize).min(3)];
                let enemy_formation = formation_names
                    .get(enemy.formation as usize)
                    .map(String::as_str)
                    .unwrap_or("?");
                write!(
                    f,
                    "{}: WE ARE ATTACKING {} IN {} FORMATION, {} LOSSES EXPECTED",
                    unit.name, enemy.name, enemy_formation, loss
                )
            }
            Event::WeHaveMetStrongResistance { unit } => {
                write!(f, "{}", unit_headline(unit, "WE HAVE MET STRONG RESISTANCE"))
            }
            Event::WeAreRetreating { unit } => {
                write!(f, "{}", unit_headline(unit, "WE ARE RETREATING"))
            }
            Event::WeHaveBeenOverrun { unit } => {
                write!(f, "{}", unit_headline(unit, "WE HAVE BEEN OVERRUN"))
            }
            Event::DailyUpdate { days_remaining, supply_level } => {
                write!(f, "daily update: {} days remaining, supply {}", days_remaining, supply_level)
            }
            Event::GameOver => write!(f, "game over"),
        }
    }
}

/// Engine half of the rendezvous. Every send blocks until the consumer
/// either asks for the next event (`true`) or cancels (`false`).
pub struct EventSync {
    events: SyncSender<Event>,
    resume: Receiver<bool>,
}

/// Consumer half of the rendezvous.
pub struct EventStream {
    events: Receiver<Event>,
    resume: SyncSender<bool>,
}

/// Both channels are zero-capacity, so each event is handed over in
/// lockstep: the consumer requests, the engine delivers, repeat.
pub fn event_channel() -> (EventSync, EventStream) {
    let (event_tx, event_rx) = sync_channel(0);
    let (resume_tx, resume_rx) = sync_channel(0);
    (
        EventSync { events: event_tx, resume: resume_rx },
        EventStream { events: event_rx, resume: resume_tx },
    )
}

impl EventSync {
    /// Delivers one event. Returns false when the consumer cancelled or
    /// disconnected; the caller must stop the run.
    #[must_use]
    pub fn send(&self, event: Event) -> bool {
        if self.events.send(event).is_err() {
            return false;
        }
        self.resume.recv().unwrap_or(false)
    }

    /// Blocks until the consumer requests the first event. Used once before
    /// the run starts so the consumer controls the pace from the beginning.
    #[must_use]
    pub fn wait(&self) -> bool {
        self.resume.recv().unwrap_or(false)
    }
}

impl EventStream {
    /// Requests and receives the next event; None once the engine is gone.
    pub fn next(&self) -> Option<Event> {
        if self.resume.send(true).is_err() {
            return None;
        }
        self.events.recv().ok()
    }

    /// Cancels the run: the engine's in-flight send returns false.
    pub fn stop(&self) {
        let _ = self.resume.send(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_events_arrive_in_order() {
        let (sync, stream) = event_channel();
        let producer = thread::spawn(move || {
            if !sync.wait() {
                return;
            }
            assert!(sync.send(Event::Initialized));
            assert!(sync.send(Event::TimeChanged));
            assert!(!sync.send(Event::GameOver));
        });
        assert!(matches!(stream.next(), Some(Event::Initialized)));
        assert!(matches!(stream.next(), Some(Event::TimeChanged)));
        assert!(matches!(stream.next(), Some(Event::GameOver)));
        stream.stop();
        producer.join().unwrap();
    }

    #[test]
    fn test_dropped_stream_cancels_producer() {
        let (sync, stream) = event_channel();
        let producer = thread::spawn(move || {
            if !sync.wait() {
                return false;
            }
            sync.send(Event::Initialized)
        });
        assert!(matches!(stream.next(), Some(Event::Initialized)));
        drop(stream);
        assert!(!producer.join().unwrap());
    }

    #[test]
    fn test_send_without_a_consumer_reports_cancellation() {
        // Quiet fixtures drop their stream up front; a stray send must
        // report cancellation instead of blocking on the rendezvous.
        let (sync, stream) = event_channel();
        drop(stream);
        assert!(!sync.send(Event::Initialized));
        assert!(!sync.wait());
    }

    #[test]
    fn test_attack_display_buckets_losses() {
        use crate::rules::sample::sample_campaign;
        let b = sample_campaign();
        let attack = |outcome| Event::WeAreAttacking {
            unit: b.units.get(0, 0).clone(),
            enemy: b.units.get(1, 0).clone(),
            outcome,
            formation_names: b.tables.formations.clone(),
        };
        assert!(format!("{}", attack(0)).contains("HEAVY LOSSES"));
        assert!(format!("{}", attack(11)).contains("MODERATE LOSSES"));
        assert!(format!("{}", attack(63)).contains("VERY LIGHT LOSSES"));
    }
}
