//! Full campaign runs through the public event interface.

use std::thread;

use frontline::core::error::Result;
use frontline::engine::{event_channel, Event, EventStream, GameState};
use frontline::rules::sample::sample_campaign;
use frontline::rules::{CampaignBundle, Commander, Intelligence};

fn computer_bundle() -> CampaignBundle {
    let mut bundle = sample_campaign();
    bundle.options.commanders = [Commander::Computer, Commander::Computer];
    bundle.options.intelligence = Intelligence::Limited;
    bundle
}

/// Runs the engine on its own thread, exactly like a front end would.
fn spawn_engine(
    bundle: CampaignBundle,
    seed: u64,
) -> (EventStream, thread::JoinHandle<Result<GameState>>) {
    let (sync, stream) = event_channel();
    let handle = thread::spawn(move || -> Result<GameState> {
        let started = sync.wait();
        let mut state = GameState::new(bundle, 0, seed, sync);
        if started && state.init()? {
            while state.update()? {}
        }
        Ok(state)
    });
    (stream, handle)
}

fn first_events(bundle: CampaignBundle, seed: u64, count: usize) -> Vec<String> {
    let (stream, handle) = spawn_engine(bundle, seed);
    let mut log = Vec::with_capacity(count);
    while log.len() < count {
        match stream.next() {
            Some(event) => log.push(format!("{}", event)),
            None => break,
        }
    }
    stream.stop();
    drop(stream);
    handle.join().expect("engine thread panicked").expect("engine failed");
    log
}

#[test]
fn test_same_seed_replays_identically() {
    let a = first_events(computer_bundle(), 7, 400);
    let b = first_events(computer_bundle(), 7, 400);
    assert_eq!(a.len(), 400);
    assert_eq!(a, b);
}

#[test]
fn test_run_starts_with_initialization() {
    let log = first_events(computer_bundle(), 3, 5);
    assert_eq!(log[0], "initialized");
}

#[test]
fn test_cancellation_stops_the_engine() {
    let (stream, handle) = spawn_engine(computer_bundle(), 1);
    for _ in 0..50 {
        assert!(stream.next().is_some());
    }
    stream.stop();
    drop(stream);
    // A cancelled run still hands back a coherent state.
    let state = handle.join().unwrap().unwrap();
    assert!(state.days_elapsed() >= 0);
}

#[test]
fn test_short_campaign_runs_to_verdict() {
    let mut bundle = computer_bundle();
    bundle.variant.length_in_days = 1;
    let (stream, handle) = spawn_engine(bundle, 5);
    let mut saw_game_over = false;
    let mut saw_daily_update = false;
    while let Some(event) = stream.next() {
        match event {
            Event::GameOver => saw_game_over = true,
            Event::DailyUpdate { .. } => saw_daily_update = true,
            _ => {}
        }
    }
    drop(stream);
    let state = handle.join().unwrap().unwrap();
    assert!(saw_game_over);
    assert!(saw_daily_update);
    assert!(state.days_elapsed() >= 1);
    let (outcome, balance, rank) = state.final_results();
    assert!((0..=10).contains(&outcome));
    assert!((-1..=3).contains(&balance));
    assert!((-1..=11).contains(&rank));
}

#[test]
fn test_supply_distribution_brackets_the_nightly_pass() {
    let mut bundle = computer_bundle();
    bundle.variant.length_in_days = 1;
    let (stream, handle) = spawn_engine(bundle, 9);
    let mut depth: i32 = 0;
    let mut distributions = 0;
    while let Some(event) = stream.next() {
        match event {
            Event::SupplyDistributionStart => {
                assert_eq!(depth, 0, "nested distribution");
                depth += 1;
                distributions += 1;
            }
            Event::SupplyDistributionEnd => {
                depth -= 1;
                assert_eq!(depth, 0, "unbalanced distribution");
            }
            Event::SupplyTruckMove { .. } => {
                // Limited intelligence with two computer sides: trucks stay
                // hidden.
                panic!("truck movement visible without intelligence");
            }
            _ => {}
        }
    }
    drop(stream);
    handle.join().unwrap().unwrap();
    assert!(distributions >= 1);
}
