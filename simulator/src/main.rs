//! fxhistory Simulator
//!
//! Runs scripted cache scenarios against the history engine with a seeded
//! synthetic provider and checks provider fetch counts.

use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod controller;
mod metrics;
mod provider;
mod scenario;

use controller::SimulationController;
use scenario::{Scenario, SCENARIOS};

/// fxhistory Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Scenario runner for the fxhistory engine")]
struct Args {
    /// Scenario to run, or "all"
    #[arg(short, long, default_value = "all")]
    scenario: String,

    /// Emit JSON logs and a JSON report
    #[arg(long)]
    json: bool,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated provider latency in milliseconds
    #[arg(long, default_value = "0")]
    latency_ms: u64,

    /// Fetch uncached runs one after another
    #[arg(long)]
    sequential: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));
    if args.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Starting fxhistory Simulator");
    info!("Seed: {}", seed);

    let names: Vec<&str> = if args.scenario == "all" {
        SCENARIOS.to_vec()
    } else {
        vec![args.scenario.as_str()]
    };

    let mut reports = Vec::with_capacity(names.len());
    for name in names {
        let scenario = Scenario::load(name)?;
        let controller = SimulationController::new(
            seed,
            Duration::from_millis(args.latency_ms),
            !args.sequential,
        )?;
        let report = controller.run_scenario(scenario).await?;

        info!(
            "Scenario {} passed: {} requests, {} provider fetches, {} day hits, {} day misses, avg {}us, p99 {}us",
            report.name,
            report.metrics.total_requests,
            report.engine.provider_fetches,
            report.engine.day_hits,
            report.engine.day_misses,
            report.metrics.average_latency_us(),
            report.metrics.p99_latency_us()
        );
        reports.push(report);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    info!("Simulation complete");
    Ok(())
}
