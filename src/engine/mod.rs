//! The simulation engine: game state, clock, unit updates and events.

pub mod calendar;
pub mod coeff;
pub mod events;
pub mod grids;
pub mod state;
pub mod unit;

mod ai;
mod combat;
mod supply;
mod victory;

pub use events::{event_channel, Event, EventStream, EventSync};
pub use state::GameState;
