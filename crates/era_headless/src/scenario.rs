//! Scenario loading and session construction.
//!
//! A scenario describes everything needed to reproduce a session:
//! map size, terrain features, per-player starting buildings and
//! units, and the seed. Starting buildings are placed fully
//! constructed.

use std::path::Path;
use std::result::Result;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use era_core::prelude::*;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    Read(#[from] std::io::Error),
    /// Failed to parse JSON.
    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
    /// A starting building does not fit its position.
    #[error("Cannot place {kind} at ({x}, {y})")]
    Placement {
        /// Building kind name.
        kind: &'static str,
        /// Origin column.
        x: i32,
        /// Origin row.
        y: i32,
    },
}

/// A rectangular terrain region, inclusive on both corners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Region {
    /// Top-left corner (x, y).
    pub from: (i32, i32),
    /// Bottom-right corner (x, y).
    pub to: (i32, i32),
}

impl Region {
    fn tiles(self) -> impl Iterator<Item = GridPos> {
        let (x0, y0) = self.from;
        let (x1, y1) = self.to;
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| GridPos::new(x, y)))
    }
}

/// Placement of a starting building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingPlacement {
    /// Building kind.
    pub kind: BuildingKind,
    /// Footprint origin (x, y).
    pub position: (i32, i32),
}

/// Placement of starting units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Unit kind.
    pub kind: UnitKind,
    /// Spawn tile (x, y).
    pub position: (i32, i32),
    /// Number of units to spawn.
    pub count: u32,
}

/// Setup for one player.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Starting buildings, placed fully constructed.
    #[serde(default)]
    pub starting_buildings: Vec<BuildingPlacement>,
    /// Starting units.
    #[serde(default)]
    pub starting_units: Vec<UnitPlacement>,
    /// Starting amount of every resource; omit to keep the defaults.
    #[serde(default)]
    pub starting_resources: Option<i64>,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Map dimensions (width, height) in tiles.
    pub map_size: (i32, i32),
    /// RNG seed.
    pub seed: u64,
    /// Water regions.
    #[serde(default)]
    pub water: Vec<Region>,
    /// Forest regions (blocks land movement).
    #[serde(default)]
    pub forests: Vec<Region>,
    /// Fishing spot tiles; must lie on water.
    #[serde(default)]
    pub fishing_spots: Vec<(i32, i32)>,
    /// One setup per player.
    pub players: Vec<PlayerSetup>,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Parse a scenario from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    /// A standard two-player skirmish on open ground.
    #[must_use]
    pub fn skirmish_1v1(seed: u64) -> Self {
        let side = |city: (i32, i32), farm: (i32, i32), idle: (i32, i32)| PlayerSetup {
            starting_buildings: vec![
                BuildingPlacement {
                    kind: BuildingKind::CityCenter,
                    position: city,
                },
                BuildingPlacement {
                    kind: BuildingKind::Farm,
                    position: farm,
                },
            ],
            starting_units: vec![
                UnitPlacement {
                    kind: UnitKind::Citizen,
                    position: idle,
                    count: 3,
                },
                UnitPlacement {
                    kind: UnitKind::Militia,
                    position: (idle.0, idle.1 + 2),
                    count: 2,
                },
            ],
            starting_resources: Some(500),
        };
        Self {
            name: "Skirmish 1v1".to_string(),
            description: "Symmetric two-player start on open ground".to_string(),
            map_size: (64, 64),
            seed,
            water: Vec::new(),
            forests: Vec::new(),
            fishing_spots: Vec::new(),
            players: vec![side((6, 6), (11, 6), (9, 10)), side((52, 52), (47, 52), (50, 48))],
        }
    }

    /// Build a fresh session from this scenario.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        let mut sim = Simulation::new(SimConfig {
            width: self.map_size.0,
            height: self.map_size.1,
            players: u8::try_from(self.players.len()).unwrap_or(u8::MAX),
            seed: self.seed,
        });

        for region in &self.water {
            for pos in region.tiles() {
                if let Some(tile) = sim.map_mut().tile_mut(pos) {
                    tile.terrain = Terrain::Water;
                }
            }
        }
        for region in &self.forests {
            for pos in region.tiles() {
                if let Some(tile) = sim.map_mut().tile_mut(pos) {
                    tile.forest = 3;
                }
            }
        }
        for &(x, y) in &self.fishing_spots {
            if let Some(tile) = sim.map_mut().tile_mut(GridPos::new(x, y)) {
                tile.fishing_spot = true;
            }
        }

        for (slot, setup) in self.players.iter().enumerate() {
            let owner = slot as PlayerId;
            if let Some(amount) = setup.starting_resources {
                let stockpile = &mut sim.players_mut()[slot].stockpile;
                for kind in ResourceKind::ALL {
                    stockpile.set(kind, Fixed::from_num(amount));
                }
            }
            for placement in &setup.starting_buildings {
                let origin = GridPos::new(placement.position.0, placement.position.1);
                let placed = sim
                    .map_mut()
                    .place_building(origin, Building::new(placement.kind, owner));
                if !placed {
                    return Err(ScenarioError::Placement {
                        kind: placement.kind.name(),
                        x: origin.x,
                        y: origin.y,
                    });
                }
                if let Some((_, building)) = sim.map_mut().building_at_mut(origin) {
                    building.advance_construction(Fixed::from_num(100));
                }
            }
            for placement in &setup.starting_units {
                let pos = GridPos::new(placement.position.0, placement.position.1).center();
                for _ in 0..placement.count {
                    sim.spawn_unit(placement.kind, owner, pos);
                }
            }
        }

        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skirmish_builds() {
        let scenario = Scenario::skirmish_1v1(42);
        let sim = scenario.build().unwrap();
        assert_eq!(sim.players().len(), 2);
        assert_eq!(sim.units().len(), 10);
        assert!(sim.map().building_at(GridPos::new(6, 6)).is_some());
    }

    #[test]
    fn test_parse_from_json() {
        let json = r#"{
            "name": "Test",
            "description": "Test scenario",
            "map_size": [32, 32],
            "seed": 7,
            "water": [{"from": [20, 0], "to": [31, 31]}],
            "fishing_spots": [[25, 10]],
            "players": [
                {
                    "starting_buildings": [
                        {"kind": "CityCenter", "position": [5, 5]}
                    ],
                    "starting_units": [
                        {"kind": "FishingBoat", "position": [24, 20], "count": 1}
                    ],
                    "starting_resources": 300
                }
            ]
        }"#;
        let scenario = Scenario::from_json_str(json).unwrap();
        assert_eq!(scenario.name, "Test");

        let sim = scenario.build().unwrap();
        assert_eq!(sim.units().len(), 1);
        assert!(sim
            .map()
            .tile(GridPos::new(25, 10))
            .is_some_and(|t| t.fishing_spot));
        assert_eq!(
            sim.players()[0].stockpile.get(ResourceKind::Oil),
            Fixed::from_num(300)
        );
    }

    #[test]
    fn test_blocked_placement_is_an_error() {
        let mut scenario = Scenario::skirmish_1v1(1);
        // Second building overlapping the first city center.
        scenario.players[0].starting_buildings.push(BuildingPlacement {
            kind: BuildingKind::House,
            position: (7, 7),
        });
        assert!(matches!(
            scenario.build(),
            Err(ScenarioError::Placement { .. })
        ));
    }

    #[test]
    fn test_scenario_round_trips_through_json() {
        let scenario = Scenario::skirmish_1v1(9);
        let json = serde_json::to_string(&scenario).unwrap();
        let parsed = Scenario::from_json_str(&json).unwrap();
        assert_eq!(parsed.name, scenario.name);
        assert_eq!(parsed.players.len(), 2);
    }
}
