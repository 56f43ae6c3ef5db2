//! Headless tactical scenario runner.
//!
//! Loads a RON scenario and drives the tactical core without graphics.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario and print the JSON report
//! cargo run -p tactics_headless -- run --scenario scenarios/outpost.ron
//!
//! # Resolve one route on the scenario's map
//! cargo run -p tactics_headless -- path --scenario scenarios/outpost.ron --from 0,0 --to 19,11
//!
//! # Sweep seeds in parallel
//! cargo run -p tactics_headless -- batch --scenario scenarios/outpost.ron --runs 1000 --output results/
//!
//! # Verify determinism
//! cargo run -p tactics_headless -- verify --scenario scenarios/outpost.ron --seed 12345
//! ```
//!
//! Output (stdout): JSON
//! Logs (stderr): `RUST_LOG` or `--verbose`

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tactics_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::ScenarioRunner,
    scenario::{RouteRequest, Scenario},
};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless tactical scenario runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print the report
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Tick limit (defaults to the scenario's)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Seed override
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Resolve a single route on a scenario's map
    Path {
        /// Scenario file providing the map
        #[arg(short, long)]
        scenario: PathBuf,

        /// Start tile as x,y
        #[arg(long, value_parser = parse_tile)]
        from: (i32, i32),

        /// Goal tile as x,y
        #[arg(long, value_parser = parse_tile)]
        to: (i32, i32),

        /// Smooth the path
        #[arg(long)]
        smooth: bool,

        /// Seed override (affects rock passability)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run a scenario across many seeds
    Batch {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of seeds
        #[arg(short, long, default_value = "100")]
        runs: u32,

        /// First seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Worker threads (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Tick limit per run
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Output directory for results (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running the same seed repeatedly
    Verify {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for the report
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            ticks,
            seed,
        } => cmd_run(&scenario, ticks, seed),
        Commands::Path {
            scenario,
            from,
            to,
            smooth,
            seed,
        } => cmd_path(&scenario, from, to, smooth, seed),
        Commands::Batch {
            scenario,
            runs,
            seed,
            parallel,
            ticks,
            output,
        } => cmd_batch(&scenario, runs, seed, parallel, ticks, output),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(&scenario, seed, runs),
    }
}

/// Parse `x,y` into a tile coordinate.
fn parse_tile(s: &str) -> Result<(i32, i32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{s}'"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in '{s}': {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in '{s}': {e}"))?;
    Ok((x, y))
}

fn load_scenario(path: &Path) -> Scenario {
    match Scenario::load(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load scenario: {e}");
            process::exit(1);
        }
    }
}

fn build_runner(scenario: &Scenario, seed: Option<u64>) -> ScenarioRunner {
    let seed = seed.unwrap_or(scenario.seed);
    match ScenarioRunner::with_seed(scenario, seed) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to set up scenario: {e}");
            process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize output: {e}");
            process::exit(1);
        }
    }
}

/// Run one scenario
fn cmd_run(path: &Path, ticks: Option<u64>, seed: Option<u64>) {
    let scenario = load_scenario(path);
    let mut runner = build_runner(&scenario, seed);
    let report = runner.run(ticks);
    print_json(&report);
}

/// Resolve one route
fn cmd_path(path: &Path, from: (i32, i32), to: (i32, i32), smooth: bool, seed: Option<u64>) {
    let scenario = load_scenario(path);
    let runner = build_runner(&scenario, seed);
    let route = runner.plan_route(&RouteRequest {
        name: format!("{},{} -> {},{}", from.0, from.1, to.0, to.1),
        from,
        to,
        smooth,
    });
    print_json(&route);

    if !route.reachable {
        process::exit(2);
    }
}

/// Sweep seeds
fn cmd_batch(
    path: &Path,
    runs: u32,
    seed: u64,
    parallel: u32,
    ticks: Option<u64>,
    output: Option<PathBuf>,
) {
    let scenario = load_scenario(path);
    let config = BatchConfig {
        runs,
        seed_start: seed,
        max_ticks: ticks,
        parallel,
        output: output.clone(),
    };

    let results = run_batch(&scenario, config);

    match output {
        Some(dir) => {
            let results_path = dir.join("batch_results.json");
            if let Err(e) = results.save(&results_path) {
                tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
                eprintln!("FATAL: Failed to save results: {e}");
                process::exit(1);
            }
            eprintln!("Results saved to: {}", results_path.display());
        }
        None => print_json(&results),
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Runs: {}", summary.runs);
    if !results.errors.is_empty() {
        eprintln!("Runs FAILED: {}", results.errors.len());
        for error in results.errors.iter().take(10) {
            eprintln!("  seed {}: {}", error.seed, error.message);
        }
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("Average ticks: {:.1}", summary.average_ticks);
    eprintln!("Average damage: {:.1}", summary.average_damage);
    eprintln!("Shots blocked by sight: {:.1}%", summary.sight_block_rate * 100.0);
    eprintln!("Distinct outcomes: {}", summary.distinct_outcomes);
    eprintln!("\nTeam survival:");
    for (team, rate) in &summary.team_survival {
        eprintln!("  team {team}: {:.1}%", rate * 100.0);
    }
}

/// Verify determinism
fn cmd_verify(path: &Path, seed: u64, runs: u32) {
    let scenario = load_scenario(path);
    tracing::info!(scenario = %scenario.name, seed, runs, "Verifying determinism");

    match verify_determinism(&scenario, seed, runs) {
        Ok(true) => eprintln!("PASS: All {runs} runs produced identical results"),
        Ok(false) => {
            eprintln!("FAIL: Non-determinism detected!");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("FAIL: {e}");
            process::exit(1);
        }
    }
}
