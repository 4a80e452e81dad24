//! Headless simulation runner.
//!
//! Runs the simulation without graphics for CI checks, determinism
//! verification, and balance probing.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in skirmish for 10k ticks, JSON report on stdout
//! cargo run -p era_headless -- run
//!
//! # Run a scenario file
//! cargo run -p era_headless -- run --scenario scenarios/coastal.json
//!
//! # Verify determinism across repeated runs
//! cargo run -p era_headless -- verify --seed 12345 --runs 5
//!
//! # Measure tick throughput
//! cargo run -p era_headless -- benchmark --ticks 36000
//! ```
//!
//! Reports go to stdout; logs go to stderr.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use era_headless::runner::{self, RunConfig, DEFAULT_MAX_TICKS};
use era_headless::scenario::Scenario;

#[derive(Parser)]
#[command(name = "era_headless")]
#[command(about = "Headless simulation runner for CI and balance testing")]
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
    /// Run one scenario and print a JSON report
    Run {
        /// Scenario file to load (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed for the built-in skirmish
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Maximum number of ticks
        #[arg(short, long, default_value_t = DEFAULT_MAX_TICKS)]
        ticks: u64,

        /// Keep running after a winner is decided
        #[arg(long)]
        play_out: bool,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Scenario file to load (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Ticks per run
        #[arg(short, long, default_value = "1000")]
        ticks: u64,
    },

    /// Run N ticks and report throughput
    Benchmark {
        /// Number of ticks to run
        #[arg(short, long, default_value = "36000")]
        ticks: u64,

        /// Scenario file to benchmark
        #[arg(short, long)]
        scenario: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logging goes to stderr; stdout carries the JSON report.
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            ticks,
            play_out,
        } => cmd_run(scenario, seed, ticks, play_out),
        Commands::Verify {
            scenario,
            seed,
            runs,
            ticks,
        } => cmd_verify(scenario, seed, runs, ticks),
        Commands::Benchmark { ticks, scenario } => cmd_benchmark(ticks, scenario),
    }
}

fn load_scenario(path: Option<PathBuf>, seed: u64) -> Scenario {
    match path {
        Some(path) => match Scenario::load(&path) {
            Ok(scenario) => scenario,
            Err(e) => {
                eprintln!("Failed to load scenario: {e}");
                std::process::exit(1);
            }
        },
        None => Scenario::skirmish_1v1(seed),
    }
}

fn cmd_run(scenario: Option<PathBuf>, seed: u64, ticks: u64, play_out: bool) {
    let scenario = load_scenario(scenario, seed);
    tracing::info!(scenario = %scenario.name, ticks, "starting run");

    let mut sim = match scenario.build() {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Failed to build scenario: {e}");
            std::process::exit(1);
        }
    };

    let config = RunConfig {
        max_ticks: ticks,
        stop_on_victory: !play_out,
    };
    let report = runner::run_simulation(&mut sim, &config, &scenario.name);

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize report: {e}");
            std::process::exit(1);
        }
    }

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("RUN COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Ticks: {}", report.ticks_run);
    match report.winner {
        Some(id) => eprintln!("Winner: player {id}"),
        None => eprintln!("Winner: none"),
    }
    eprintln!("Unit deaths: {}", report.unit_deaths);
    eprintln!("Buildings destroyed: {}", report.buildings_destroyed);
    eprintln!("Final hash: {}", report.final_hash);
}

fn cmd_verify(scenario: Option<PathBuf>, seed: u64, runs: u32, ticks: u64) {
    let scenario = load_scenario(scenario, seed);
    tracing::info!(
        scenario = %scenario.name,
        seed,
        runs,
        ticks,
        "verifying determinism"
    );

    match runner::verify_determinism(&scenario, runs, ticks) {
        Ok(true) => {
            eprintln!("PASS: All {runs} runs produced identical results");
        }
        Ok(false) => {
            eprintln!("FAIL: Non-determinism detected!");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to build scenario: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_benchmark(ticks: u64, scenario: Option<PathBuf>) {
    let scenario = load_scenario(scenario, 0);
    let mut sim = match scenario.build() {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Failed to build scenario: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("Starting benchmark with {} units", sim.units().len());
    eprintln!("Running {ticks} ticks...");

    // Warmup
    for _ in 0..100 {
        sim.tick();
    }

    let start = Instant::now();
    for _ in 0..ticks {
        sim.tick();
    }
    let elapsed = start.elapsed();
    let tps = ticks as f64 / elapsed.as_secs_f64();

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BENCHMARK RESULTS");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Ticks: {ticks}");
    eprintln!("Duration: {:.3}s", elapsed.as_secs_f64());
    eprintln!("Ticks/second: {tps:.1}");
    eprintln!("ms/tick: {:.4}", elapsed.as_millis() as f64 / ticks as f64);
    eprintln!("Final units: {}", sim.units().len());
    eprintln!("State hash: {:016x}", sim.state_hash());
}
