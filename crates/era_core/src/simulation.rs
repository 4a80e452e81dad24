//! The simulation session and its tick orchestrator.
//!
//! [`Simulation`] owns the entire mutable game state: the map, the
//! unit roster, the players, and the seeded RNG. `tick()` advances one
//! step in a fixed pass order so two sessions created from the same
//! config and fed the same commands stay bit-identical; `state_hash()`
//! fingerprints the full state for desync and replay checks.
//!
//! Pass order per tick: territory extraction, unit behavior (damage
//! into the ledger), unit damage apply and death sweep, building
//! damage apply and destruction, building lifecycle, economy, victory.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::combat::{self, DamageLedger};
use crate::construction::{self, Spawned};
use crate::error::{Result, SimError};
use crate::map::{GameMap, GridPos};
use crate::math::Vec2Fixed;
use crate::players::{Player, PlayerId};
use crate::territory::TerritoryMap;
use crate::units::{Unit, UnitId, UnitKind, UnitRoster};
use crate::{behavior, economy, victory};

/// Session parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Map width in tiles.
    pub width: i32,
    /// Map height in tiles.
    pub height: i32,
    /// Number of players.
    pub players: u8,
    /// RNG seed; identical seeds reproduce identical runs.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            players: 2,
            seed: 0,
        }
    }
}

/// What happened during one tick, for the driver layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Tick that produced these events.
    pub tick: u64,
    /// Units that died, with their owners.
    pub unit_deaths: Vec<(UnitId, PlayerId)>,
    /// Buildings destroyed, with their former owners.
    pub buildings_destroyed: Vec<(GridPos, PlayerId)>,
    /// Buildings that finished construction.
    pub buildings_completed: Vec<GridPos>,
    /// Units spawned from production queues.
    pub units_spawned: Vec<Spawned>,
    /// Players eliminated this tick.
    pub players_defeated: Vec<PlayerId>,
    /// The winner, once decided (sticky across ticks).
    pub winner: Option<PlayerId>,
}

/// One full simulation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub(crate) tick: u64,
    pub(crate) map: GameMap,
    pub(crate) units: UnitRoster,
    pub(crate) players: Vec<Player>,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) winner: Option<PlayerId>,
}

impl Simulation {
    /// Create a session on an all-grass map.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self {
            tick: 0,
            map: GameMap::new(config.width, config.height),
            units: UnitRoster::new(),
            players: (0..config.players).map(Player::new).collect(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            winner: None,
        }
    }

    /// Current tick number.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// The map.
    #[must_use]
    pub const fn map(&self) -> &GameMap {
        &self.map
    }

    /// Mutable map access, for scenario setup before the first tick.
    pub fn map_mut(&mut self) -> &mut GameMap {
        &mut self.map
    }

    /// The unit roster.
    #[must_use]
    pub const fn units(&self) -> &UnitRoster {
        &self.units
    }

    /// All players.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Mutable player access, for scenario setup before the first
    /// tick.
    pub fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    /// One player by id.
    pub fn player(&self, id: PlayerId) -> Result<&Player> {
        self.players
            .get(id as usize)
            .ok_or(SimError::PlayerNotFound(id))
    }

    /// The winner, once one is decided.
    #[must_use]
    pub const fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// Spawn a unit directly, bypassing production. Scenario setup
    /// and tests only.
    pub fn spawn_unit(&mut self, kind: UnitKind, owner: PlayerId, pos: Vec2Fixed) -> UnitId {
        let pos = self.map.clamp_world(pos);
        self.units.spawn(Unit::new(kind, owner, pos, self.tick))
    }

    /// Advance the simulation one tick.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents {
            tick: self.tick,
            ..TickEvents::default()
        };

        let territory = TerritoryMap::extract(&self.map);
        let mut ledger = DamageLedger::new();

        combat::record_attrition(&mut ledger, &self.units, &territory, self.tick);
        behavior::run_unit_pass(
            &mut self.units,
            &self.map,
            &mut ledger,
            &mut self.rng,
            self.tick,
        );

        ledger.apply_to_units(&mut self.units);
        for id in self.units.sorted_ids() {
            if self.units.get(id).is_some_and(|u| u.is_dead()) {
                if let Some(unit) = self.units.remove(id) {
                    events.unit_deaths.push((id, unit.owner));
                }
            }
        }

        events.buildings_destroyed = ledger.apply_to_buildings(&mut self.map);

        let outcome = construction::run_lifecycle_pass(
            &mut self.map,
            &mut self.units,
            &mut self.rng,
            self.tick,
        );
        events.buildings_completed = outcome.completed;
        events.units_spawned = outcome.spawned;

        economy::run_economy_pass(&mut self.players, &self.units, &self.map);

        let defeated_before: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.is_defeated)
            .map(|p| p.id)
            .collect();
        let winner = victory::run_victory_pass(&mut self.players, &self.map, self.tick);
        for player in &self.players {
            if player.is_defeated && !defeated_before.contains(&player.id) {
                info!(player = player.id, tick = self.tick, "player eliminated");
                events.players_defeated.push(player.id);
            }
        }
        if self.winner.is_none() {
            if let Some(id) = winner {
                info!(player = id, tick = self.tick, "game over");
                self.winner = Some(id);
            }
        }
        events.winner = self.winner;

        self.tick += 1;
        #[cfg(debug_assertions)]
        debug!(tick = self.tick, hash = self.state_hash(), "tick complete");
        events
    }

    /// Hash of the full session state, for desync and replay checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let Ok(bytes) = bincode::serialize(self) else {
            return 0;
        };
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize the session to a snapshot.
    pub fn to_snapshot(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| SimError::Snapshot(e.to_string()))
    }

    /// Restore a session from a snapshot.
    pub fn from_snapshot(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| SimError::Snapshot(e.to_string()))
    }
}
