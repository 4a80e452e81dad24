//! Territory resolution.
//!
//! Territory is a pure function of the current grid: city-family and
//! fort-family building origins each project ownership over a radius.
//! The source list is extracted once per tick and reused by every
//! caller in that tick (attrition, placement checks, border drawing)
//! so ownership queries never rescan the grid.

use serde::{Deserialize, Serialize};

use crate::map::{GameMap, GridPos};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::players::PlayerId;

/// One building projecting ownership influence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritorySource {
    /// Projecting building's origin tile.
    pub origin: GridPos,
    /// Owning player.
    pub owner: PlayerId,
    /// Influence radius in tiles.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
}

/// The per-tick territory view. Derived state; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerritoryMap {
    sources: Vec<TerritorySource>,
}

impl TerritoryMap {
    /// Extract all territory sources from the grid, in row-major
    /// building-origin order.
    #[must_use]
    pub fn extract(map: &GameMap) -> Self {
        let mut sources = Vec::new();
        for (origin, building) in map.buildings() {
            if let Some(radius) = building.kind.territory_radius() {
                sources.push(TerritorySource {
                    origin,
                    owner: building.owner,
                    radius,
                });
            }
        }
        Self { sources }
    }

    /// The extracted sources.
    #[must_use]
    pub fn sources(&self) -> &[TerritorySource] {
        &self.sources
    }

    /// Owner of the territory covering a world position, or `None`
    /// if unclaimed.
    ///
    /// The nearest covering source wins. At exactly equal distance
    /// the larger radius wins; any remaining tie goes to the
    /// earlier-extracted source.
    #[must_use]
    pub fn owner_at(&self, pos: Vec2Fixed) -> Option<PlayerId> {
        let mut best: Option<(Fixed, Fixed, PlayerId)> = None;
        for source in &self.sources {
            let dist_sq = pos.distance_squared(source.origin.center());
            if dist_sq > source.radius * source.radius {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_dist, best_radius, _)) => {
                    dist_sq < best_dist || (dist_sq == best_dist && source.radius > best_radius)
                }
            };
            if better {
                best = Some((dist_sq, source.radius, source.owner));
            }
        }
        best.map(|(_, _, owner)| owner)
    }

    /// Owner at the center of a tile.
    #[must_use]
    pub fn owner_at_tile(&self, pos: GridPos) -> Option<PlayerId> {
        self.owner_at(pos.center())
    }
}
