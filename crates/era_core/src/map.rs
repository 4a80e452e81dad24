//! Tile grid and building placement.
//!
//! A multi-tile building's instance lives only on its origin tile.
//! Instead of scanning backward over the maximum footprint size to
//! find the owning origin, the map maintains a footprint index that
//! maps every footprint tile (origin included) to the origin, updated
//! incrementally on placement and destruction. Occupancy queries are
//! O(1) and observable behavior matches the scan.
//!
//! All access is bounds-checked; out-of-range coordinates read as
//! non-existent (and therefore impassable), never as a panic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingKind};
use crate::math::{Fixed, Vec2Fixed};
use crate::players::PlayerId;

/// Integer tile coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct GridPos {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridPos {
    /// Create a grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Center of this tile in world space.
    #[must_use]
    pub fn center(self) -> Vec2Fixed {
        let half = Fixed::from_num(1) / Fixed::from_num(2);
        Vec2Fixed::new(Fixed::from_num(self.x) + half, Fixed::from_num(self.y) + half)
    }
}

impl std::fmt::Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Terrain classification of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    /// Open grassland.
    #[default]
    Grass,
    /// Bare earth.
    Dirt,
    /// Sand.
    Sand,
    /// Rocky ground.
    Rock,
    /// Water; naval domain only.
    Water,
}

/// One tile of the map.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tile {
    /// Terrain kind.
    pub terrain: Terrain,
    /// Forest density; any value above zero blocks land movement.
    pub forest: u8,
    /// Metal deposit flag.
    pub has_metal: bool,
    /// Oil deposit flag.
    pub has_oil: bool,
    /// Fishing spot flag (water tiles).
    pub fishing_spot: bool,
    /// Building instance; present only on footprint origin tiles.
    pub building: Option<Building>,
    /// Owning player of any footprint tile covering this position.
    pub owner: Option<PlayerId>,
}

impl Tile {
    /// Whether the bare tile (ignoring buildings) blocks land movement.
    #[must_use]
    pub fn blocks_land(&self) -> bool {
        self.terrain == Terrain::Water || self.forest > 0 || self.has_metal || self.has_oil
    }
}

/// The game map: a row-major tile grid plus the footprint index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMap {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    /// Every footprint tile -> its building's origin tile.
    footprint_index: HashMap<GridPos, GridPos>,
}

impl GameMap {
    /// Create a map of all-grass tiles.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is not positive.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0, "map width must be positive");
        assert!(height > 0, "map height must be positive");
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            tiles: vec![Tile::default(); count],
            footprint_index: HashMap::new(),
        }
    }

    /// Map width in tiles.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Map height in tiles.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Whether a position is on the map.
    #[must_use]
    pub const fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    fn index(&self, pos: GridPos) -> usize {
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    /// Get a tile, or `None` out of bounds.
    #[must_use]
    pub fn tile(&self, pos: GridPos) -> Option<&Tile> {
        if self.in_bounds(pos) {
            Some(&self.tiles[self.index(pos)])
        } else {
            None
        }
    }

    /// Get a mutable tile, or `None` out of bounds.
    pub fn tile_mut(&mut self, pos: GridPos) -> Option<&mut Tile> {
        if self.in_bounds(pos) {
            let i = self.index(pos);
            Some(&mut self.tiles[i])
        } else {
            None
        }
    }

    /// Convert a world position to the containing tile.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec2Fixed) -> Option<GridPos> {
        let x: i64 = pos.x.floor().to_num();
        let y: i64 = pos.y.floor().to_num();
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some(GridPos::new(x as i32, y as i32))
    }

    /// Clamp a world position to the map interior.
    #[must_use]
    pub fn clamp_world(&self, pos: Vec2Fixed) -> Vec2Fixed {
        let margin = Fixed::from_num(1) / Fixed::from_num(2);
        pos.clamp(
            Vec2Fixed::new(margin, margin),
            Vec2Fixed::new(
                Fixed::from_num(self.width) - margin,
                Fixed::from_num(self.height) - margin,
            ),
        )
    }

    /// The footprint tiles a building of `kind` would cover at `origin`.
    pub fn footprint_tiles(kind: BuildingKind, origin: GridPos) -> impl Iterator<Item = GridPos> {
        let (w, h) = kind.footprint();
        (0..h).flat_map(move |dy| (0..w).map(move |dx| GridPos::new(origin.x + dx, origin.y + dy)))
    }

    /// Origin of the building covering `pos`, if any.
    #[must_use]
    pub fn building_origin(&self, pos: GridPos) -> Option<GridPos> {
        self.footprint_index.get(&pos).copied()
    }

    /// Building covering `pos` with its origin, if any.
    #[must_use]
    pub fn building_at(&self, pos: GridPos) -> Option<(GridPos, &Building)> {
        let origin = self.building_origin(pos)?;
        let building = self.tile(origin)?.building.as_ref()?;
        Some((origin, building))
    }

    /// Mutable building covering `pos`, if any.
    pub fn building_at_mut(&mut self, pos: GridPos) -> Option<(GridPos, &mut Building)> {
        let origin = self.building_origin(pos)?;
        if !self.in_bounds(origin) {
            return None;
        }
        let i = self.index(origin);
        self.tiles[i].building.as_mut().map(|b| (origin, b))
    }

    /// Whether any building footprint covers `pos`.
    #[must_use]
    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.footprint_index.contains_key(&pos)
    }

    /// Check whether a building of `kind` can be placed at `origin`:
    /// fully in bounds, no overlapping footprint, and terrain that
    /// suits the kind (docks sit on water, everything else off it).
    #[must_use]
    pub fn can_place(&self, kind: BuildingKind, origin: GridPos) -> bool {
        for pos in Self::footprint_tiles(kind, origin) {
            let Some(tile) = self.tile(pos) else {
                return false;
            };
            if self.is_occupied(pos) {
                return false;
            }
            let water = tile.terrain == Terrain::Water;
            if kind == BuildingKind::Dock {
                if !water {
                    return false;
                }
            } else if water || tile.forest > 0 || tile.has_metal || tile.has_oil {
                return false;
            }
        }
        true
    }

    /// Place a building at `origin`, claiming every footprint tile.
    ///
    /// Callers validate with [`can_place`](Self::can_place) first;
    /// placement on an invalid origin returns `false` unchanged.
    pub fn place_building(&mut self, origin: GridPos, building: Building) -> bool {
        let kind = building.kind;
        let owner = building.owner;
        if !self.can_place(kind, origin) {
            return false;
        }
        for pos in Self::footprint_tiles(kind, origin) {
            self.footprint_index.insert(pos, origin);
            if let Some(tile) = self.tile_mut(pos) {
                tile.owner = Some(owner);
            }
        }
        let i = self.index(origin);
        self.tiles[i].building = Some(building);
        true
    }

    /// Remove the building whose footprint covers `pos`, clearing its
    /// tiles and index entries. Returns the removed building.
    pub fn remove_building(&mut self, pos: GridPos) -> Option<Building> {
        let origin = self.building_origin(pos)?;
        let i = self.index(origin);
        let building = self.tiles[i].building.take()?;
        for fp in Self::footprint_tiles(building.kind, origin) {
            self.footprint_index.remove(&fp);
            if let Some(tile) = self.tile_mut(fp) {
                tile.owner = None;
            }
        }
        Some(building)
    }

    /// Iterate over all building origins with their buildings.
    pub fn buildings(&self) -> impl Iterator<Item = (GridPos, &Building)> {
        (0..self.height).flat_map(move |y| {
            (0..self.width).filter_map(move |x| {
                let pos = GridPos::new(x, y);
                self.tiles[self.index(pos)]
                    .building
                    .as_ref()
                    .map(|b| (pos, b))
            })
        })
    }

    /// Whether a land unit may stand on `pos`.
    #[must_use]
    pub fn land_passable(&self, pos: GridPos) -> bool {
        let Some(tile) = self.tile(pos) else {
            return false;
        };
        if tile.blocks_land() {
            return false;
        }
        match self.building_at(pos) {
            Some((_, building)) => building.kind.land_passable(),
            None => true,
        }
    }

    /// Whether a naval unit may sail on `pos`.
    #[must_use]
    pub fn naval_passable(&self, pos: GridPos) -> bool {
        let Some(tile) = self.tile(pos) else {
            return false;
        };
        if tile.terrain != Terrain::Water {
            return false;
        }
        match self.building_at(pos) {
            Some((_, building)) => building.kind.naval_passable(),
            None => true,
        }
    }
}
