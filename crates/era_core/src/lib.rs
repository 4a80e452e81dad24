//! # Era Core
//!
//! Deterministic simulation engine for Era, a grid-based RTS spanning
//! five historical ages.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (jitter comes from a seeded PRNG owned by
//!   the session)
//! - No floating-point math (uses fixed-point)
//!
//! Two sessions created from the same [`simulation::SimConfig`] and
//! fed the same command stream produce bit-identical state, which
//! enables lockstep multiplayer, replays, and determinism testing.
//!
//! ## Crate Structure
//!
//! - [`simulation`] - the session and tick orchestrator
//! - [`commands`] - the player action API
//! - [`map`] / [`buildings`] / [`units`] / [`players`] - game state
//! - [`behavior`] / [`combat`] / [`construction`] / [`economy`] /
//!   [`territory`] / [`victory`] - the per-tick passes
//! - [`pathfinding`] - per-tick movement resolution
//! - [`math`] - fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod behavior;
pub mod buildings;
pub mod combat;
pub mod commands;
pub mod construction;
pub mod economy;
pub mod error;
pub mod map;
pub mod math;
pub mod pathfinding;
pub mod players;
pub mod simulation;
pub mod territory;
pub mod units;
pub mod victory;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::buildings::{Building, BuildingKind};
    pub use crate::construction::Spawned;
    pub use crate::error::{Result, SimError};
    pub use crate::map::{GameMap, GridPos, Terrain, Tile};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::players::{Age, Player, PlayerId, ResourceKind, ResourceStore};
    pub use crate::simulation::{SimConfig, Simulation, TickEvents};
    pub use crate::territory::TerritoryMap;
    pub use crate::units::{Task, TaskOrigin, TaskTarget, Unit, UnitId, UnitKind, UnitRoster};
}
