//! Courier CLI - run delivery agents on a local grid.
//!
//! - `courier run` - play a scenario for a bounded time and print the scores
//! - `courier check` - validate a scenario and an agent config without running

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use courier_agent::AgentConfig;
use courier_cli::{run_scenario, RunSummary};
use courier_sim::Scenario;

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Grid-world delivery agents", version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run agents against a scenario
    Run {
        /// Scenario file (map, items, agents)
        #[arg(long)]
        map: PathBuf,

        /// Number of agents to start (1 or 2)
        #[arg(long, default_value = "1")]
        agents: usize,

        /// How long to run
        #[arg(long, default_value = "10")]
        seconds: u64,

        /// Agent configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a scenario and agent config
    Check {
        #[arg(long)]
        map: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            map,
            agents,
            seconds,
            config,
            json,
        } => run(&map, agents, seconds, config.as_deref(), json).await,
        Commands::Check { map, config } => check(&map, config.as_deref()),
    }
}

async fn run(
    map: &Path,
    agents: usize,
    seconds: u64,
    config: Option<&Path>,
    json: bool,
) -> Result<()> {
    let scenario = Scenario::load(map)?;
    let config = AgentConfig::load_or_default(config)?;
    tracing::info!(scenario = %map.display(), agents, seconds, "Starting run");

    let summary = run_scenario(&scenario, &config, agents, Duration::from_secs(seconds)).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn check(map: &Path, config: Option<&Path>) -> Result<()> {
    let scenario = Scenario::load(map)?;
    AgentConfig::load_or_default(config)?;
    let tiles = scenario.tile_map();
    println!(
        "{}: {}x{} map, {} delivery tile(s), {} spawner(s), {} item(s), {} agent(s)",
        map.display(),
        tiles.width(),
        tiles.height(),
        tiles.delivery_cells().len(),
        tiles.spawner_cells().len(),
        scenario.items.len(),
        scenario.agents.len()
    );
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Run finished after {:.1}s", summary.seconds);
    for entry in &summary.scores {
        println!("  {:<12} {:>6}", entry.id.as_str(), entry.score);
    }
    println!("  {:<12} {:>6}", "total", summary.total());
    println!("Items left on the map: {}", summary.items_left);
}
