//! Headless simulation runner for CI and balance testing.
//!
//! Runs the simulation without any presentation layer:
//!
//! - **CI verification**: run scenarios to completion and check outcomes
//! - **Determinism checks**: same seed, same final hash, every time
//! - **Balance probes**: JSON reports of economy and combat outcomes
//!
//! Scenarios are JSON files describing the map, starting buildings and
//! units, and the seed. Reports go to stdout as JSON; logs go to
//! stderr.

pub mod runner;
pub mod scenario;

pub use runner::{run_simulation, verify_determinism, RunConfig, RunReport};
pub use scenario::{Scenario, ScenarioError};
