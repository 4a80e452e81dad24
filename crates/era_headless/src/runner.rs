//! Driving a session for a fixed number of ticks.
//!
//! The runner advances a [`Simulation`] tick by tick, accumulates the
//! per-tick events into counters, and produces a JSON-serializable
//! [`RunReport`] at the end.

use std::result::Result;

use serde::Serialize;
use tracing::info;

use era_core::prelude::*;

use crate::scenario::{Scenario, ScenarioError};

/// Default tick budget for a run (long enough for elimination games).
pub const DEFAULT_MAX_TICKS: u64 = 10_000;

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum number of ticks to run.
    pub max_ticks: u64,
    /// Stop as soon as a winner is decided.
    pub stop_on_victory: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_ticks: DEFAULT_MAX_TICKS,
            stop_on_victory: true,
        }
    }
}

/// Final state of one player.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerReport {
    /// Player id.
    pub id: PlayerId,
    /// Whether the player was eliminated.
    pub is_defeated: bool,
    /// Live unit count at the end.
    pub population: u32,
    /// Final age name.
    pub age: &'static str,
    /// Final stockpile per resource name.
    pub stockpile: Vec<(&'static str, f64)>,
}

/// Outcome of a headless run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// Ticks actually simulated.
    pub ticks_run: u64,
    /// Winner, if the game was decided.
    pub winner: Option<PlayerId>,
    /// Total unit deaths.
    pub unit_deaths: u64,
    /// Total buildings destroyed.
    pub buildings_destroyed: u64,
    /// Total units produced from queues.
    pub units_produced: u64,
    /// Final state hash, hex-encoded.
    pub final_hash: String,
    /// Per-player final state.
    pub players: Vec<PlayerReport>,
}

/// Run a session under `config` and report the outcome.
pub fn run_simulation(sim: &mut Simulation, config: &RunConfig, scenario_name: &str) -> RunReport {
    let mut unit_deaths = 0u64;
    let mut buildings_destroyed = 0u64;
    let mut units_produced = 0u64;
    let mut ticks_run = 0u64;

    for _ in 0..config.max_ticks {
        let events = sim.tick();
        ticks_run += 1;
        unit_deaths += events.unit_deaths.len() as u64;
        buildings_destroyed += events.buildings_destroyed.len() as u64;
        units_produced += events.units_spawned.len() as u64;
        if config.stop_on_victory && events.winner.is_some() {
            break;
        }
    }

    let winner = sim.winner();
    info!(
        scenario = scenario_name,
        ticks = ticks_run,
        winner = ?winner,
        unit_deaths,
        buildings_destroyed,
        "run finished"
    );

    let players = sim
        .players()
        .iter()
        .map(|player| PlayerReport {
            id: player.id,
            is_defeated: player.is_defeated,
            population: player.population,
            age: player.age.name(),
            stockpile: ResourceKind::ALL
                .iter()
                .map(|&kind| (kind.name(), player.stockpile.get(kind).to_num::<f64>()))
                .collect(),
        })
        .collect();

    RunReport {
        scenario: scenario_name.to_string(),
        ticks_run,
        winner,
        unit_deaths,
        buildings_destroyed,
        units_produced,
        final_hash: format!("{:016x}", sim.state_hash()),
        players,
    }
}

/// Build and run a scenario `runs` times and check the final hashes
/// all match.
pub fn verify_determinism(
    scenario: &Scenario,
    runs: u32,
    ticks: u64,
) -> Result<bool, ScenarioError> {
    let mut hashes = Vec::with_capacity(runs as usize);
    for run in 0..runs {
        let mut sim = scenario.build()?;
        for _ in 0..ticks {
            sim.tick();
        }
        let hash = sim.state_hash();
        info!(run, hash = format!("{hash:016x}"), "verification run");
        hashes.push(hash);
    }
    Ok(hashes.windows(2).all(|w| w[0] == w[1]))
}
