//! Headless campaign runner
//! Drives the engine thread from the command line and prints every report.

use std::path::PathBuf;
use std::thread;

use clap::Parser;
use tracing::info;

use frontline::engine::{event_channel, Event, GameState};
use frontline::rules::sample::sample_campaign;
use frontline::rules::{load_campaign, Commander, Intelligence};

/// Frontline - run a campaign without a front end
#[derive(Parser, Debug)]
#[command(name = "headless")]
#[command(about = "Run a campaign simulation to completion")]
struct Args {
    /// Campaign bundle (JSON); the built-in fixture when omitted
    #[arg(long)]
    campaign: Option<PathBuf>,

    /// Random seed for reproducible runs
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Side the verdict is reported for (0 or 1)
    #[arg(long, default_value_t = 0)]
    side: usize,

    /// Reveal both sides regardless of spotting
    #[arg(long, default_value_t = false)]
    full_intelligence: bool,

    /// Stop after this many delivered events
    #[arg(long, default_value_t = 2_000_000)]
    max_events: u64,

    /// Print unit movement, not just reports
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let mut bundle = match &args.campaign {
        Some(path) => match load_campaign(path) {
            Ok(bundle) => bundle,
            Err(err) => {
                eprintln!("cannot load {}: {}", path.display(), err);
                std::process::exit(1);
            }
        },
        None => sample_campaign(),
    };
    bundle.options.commanders = [Commander::Computer, Commander::Computer];
    bundle.options.intelligence = if args.full_intelligence {
        Intelligence::Full
    } else {
        Intelligence::Limited
    };

    info!(
        scenario = %bundle.scenario.name,
        variant = %bundle.variant.name,
        seed = args.seed,
        "starting campaign"
    );

    let (sync, stream) = event_channel();
    let player_side = args.side.min(1);
    let engine = thread::spawn(move || -> frontline::core::error::Result<GameState> {
        // The consumer paces the run; wait for its first request before
        // touching the channel.
        let started = sync.wait();
        let mut state = GameState::new(bundle, player_side, args.seed, sync);
        if started && state.init()? {
            while state.update()? {}
        }
        Ok(state)
    });

    let mut delivered = 0u64;
    while let Some(event) = stream.next() {
        delivered += 1;
        match &event {
            Event::TimeChanged => {}
            Event::UnitMove { .. } | Event::SupplyTruckMove { .. } => {
                if args.verbose {
                    println!("{}", event);
                }
            }
            _ => println!("{}", event),
        }
        if matches!(event, Event::GameOver) {
            break;
        }
        if delivered >= args.max_events {
            println!("event budget exhausted, cancelling run");
            stream.stop();
            break;
        }
    }
    drop(stream);

    match engine.join() {
        Ok(Ok(state)) => {
            let (outcome, balance, rank) = state.final_results();
            println!();
            println!(
                "{} vs {}: {} days elapsed",
                state.side_name(0),
                state.side_name(1),
                state.days_elapsed()
            );
            for side in 0..2 {
                println!(
                    "  {}: {} men lost, {} equipment lost, {} victory points",
                    state.side_name(side),
                    state.men_lost(side),
                    state.equip_lost(side),
                    state.cities_held(side)
                );
            }
            println!("verdict: outcome {} balance {} rank {}", outcome, balance, rank);
        }
        Ok(Err(err)) => {
            eprintln!("engine stopped: {}", err);
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("engine thread panicked");
            std::process::exit(1);
        }
    }
}
