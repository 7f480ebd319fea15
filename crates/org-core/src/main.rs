//! Organizational Simulation Runner
//!
//! Runs the simulation for a number of days with the offline template text
//! generator and writes one JSON snapshot per day.

use clap::Parser;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use org_core::{JsonlSnapshotSink, OrgSimulator, SimConfig, TemplateTextGenerator};
use org_events::ScheduledMarketEvent;

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "org_sim")]
#[command(about = "Simulates an organization of executive agents in a changing market")]
struct Args {
    /// Configuration file (TOML); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of days to simulate
    #[arg(long, default_value_t = 30)]
    days: u64,

    /// Random seed, overriding the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Snapshot output file, one JSON object per day
    #[arg(long, default_value = "output/snapshots.jsonl")]
    output: PathBuf,

    /// JSON file with a list of {"day", "event"} market injections
    #[arg(long)]
    events: Option<PathBuf>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

fn load_events(path: &Path) -> Result<Vec<ScheduledMarketEvent>, Box<dyn Error>> {
    let content = fs::read_to_string(path)?;
    let mut events: Vec<ScheduledMarketEvent> = serde_json::from_str(&content)?;
    events.sort_by_key(|scheduled| scheduled.day);
    Ok(events)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", SimConfig::default().to_toml()?);
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }

    let events = match &args.events {
        Some(path) => load_events(path)?,
        None => Vec::new(),
    };

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let sink = JsonlSnapshotSink::create(&args.output)?;

    let mut sim = OrgSimulator::start(config, Arc::new(TemplateTextGenerator), sink)?;
    let pause = sim.speed().pause();

    let handle = sim.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current day");
            handle.stop();
        }
    });
    let handle = sim.stop_handle();

    for _ in 0..args.days {
        if handle.is_stopped() {
            break;
        }

        let next_day = sim.current_day() + 1;
        for scheduled in events.iter().filter(|s| s.day == next_day) {
            sim.inject_market_event(scheduled.event.clone())?;
        }

        sim.advance_one_day().await?;

        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    sim.stop()?;
    info!(days = sim.current_day(), output = %args.output.display(), "simulation finished");

    Ok(())
}
