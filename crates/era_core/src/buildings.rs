//! Building definitions and per-building lifecycle state.
//!
//! Static stats live on [`BuildingKind`] as const tables; the mutable
//! [`Building`] tracks construction, the production queue, and
//! garrisoned units. A building instance is stored only on its
//! origin tile; the map's footprint index resolves every other
//! footprint tile back to that origin.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};
use crate::players::{Age, PlayerId, ResourceKind};
use crate::units::{UnitId, UnitKind};

/// All placeable building kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    /// City center: territory source, housing, trains citizens.
    /// Losing every city starts the elimination timer.
    CityCenter,
    /// Fort: small territory source.
    Fort,
    /// Housing.
    House,
    /// Food production.
    Farm,
    /// Wood production.
    LumberCamp,
    /// Metal production.
    Mine,
    /// Oil production.
    OilRig,
    /// Gold production.
    Market,
    /// Knowledge production.
    Library,
    /// Trains land military.
    Barracks,
    /// Trains naval units; naval units may pass its footprint.
    Dock,
    /// Trains air units.
    Airfield,
    /// Passable for land units; claims no workers.
    Road,
}

impl BuildingKind {
    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CityCenter => "city center",
            Self::Fort => "fort",
            Self::House => "house",
            Self::Farm => "farm",
            Self::LumberCamp => "lumber camp",
            Self::Mine => "mine",
            Self::OilRig => "oil rig",
            Self::Market => "market",
            Self::Library => "library",
            Self::Barracks => "barracks",
            Self::Dock => "dock",
            Self::Airfield => "airfield",
            Self::Road => "road",
        }
    }

    /// Footprint size (width, height) in tiles.
    #[must_use]
    pub const fn footprint(self) -> (i32, i32) {
        match self {
            Self::CityCenter => (3, 3),
            Self::Road => (1, 1),
            Self::Barracks | Self::Airfield => (3, 2),
            _ => (2, 2),
        }
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(self) -> u32 {
        match self {
            Self::CityCenter => 1200,
            Self::Fort => 800,
            Self::House => 200,
            Self::Farm | Self::LumberCamp => 150,
            Self::Mine | Self::OilRig => 250,
            Self::Market | Self::Library => 300,
            Self::Barracks => 500,
            Self::Dock => 350,
            Self::Airfield => 450,
            Self::Road => 50,
        }
    }

    /// Resource cost to place.
    #[must_use]
    pub const fn cost(self) -> &'static [(ResourceKind, i64)] {
        match self {
            Self::CityCenter => &[(ResourceKind::Wood, 300), (ResourceKind::Food, 100)],
            Self::Fort => &[(ResourceKind::Wood, 150), (ResourceKind::Metal, 100)],
            Self::House => &[(ResourceKind::Wood, 50)],
            Self::Farm => &[(ResourceKind::Wood, 60)],
            Self::LumberCamp => &[(ResourceKind::Wood, 40)],
            Self::Mine => &[(ResourceKind::Wood, 80)],
            Self::OilRig => &[(ResourceKind::Metal, 120), (ResourceKind::Gold, 80)],
            Self::Market => &[(ResourceKind::Wood, 100), (ResourceKind::Gold, 20)],
            Self::Library => &[(ResourceKind::Wood, 120), (ResourceKind::Gold, 40)],
            Self::Barracks => &[(ResourceKind::Wood, 150)],
            Self::Dock => &[(ResourceKind::Wood, 120)],
            Self::Airfield => &[(ResourceKind::Metal, 200), (ResourceKind::Oil, 80)],
            Self::Road => &[(ResourceKind::Wood, 5)],
        }
    }

    /// Age required to place.
    #[must_use]
    pub const fn required_age(self) -> Age {
        match self {
            Self::CityCenter
            | Self::House
            | Self::Farm
            | Self::LumberCamp
            | Self::Barracks
            | Self::Dock
            | Self::Road => Age::Ancient,
            Self::Mine | Self::Market | Self::Library => Age::Classical,
            Self::Fort => Age::Medieval,
            Self::OilRig => Age::Industrial,
            Self::Airfield => Age::Modern,
        }
    }

    /// Worker slots for gather tasks (0 = not a work site).
    #[must_use]
    pub const fn worker_capacity(self) -> u32 {
        match self {
            Self::Farm | Self::LumberCamp | Self::Mine => 5,
            Self::OilRig => 3,
            Self::Market | Self::Library => 4,
            _ => 0,
        }
    }

    /// Resource produced by assigned workers, with the kind-specific
    /// multiplier applied to the base gather rate.
    #[must_use]
    pub fn yields(self) -> Option<(ResourceKind, Fixed)> {
        let (kind, hundredths) = match self {
            Self::Farm => (ResourceKind::Food, 100),
            Self::LumberCamp => (ResourceKind::Wood, 100),
            Self::Mine => (ResourceKind::Metal, 80),
            Self::OilRig => (ResourceKind::Oil, 60),
            Self::Market => (ResourceKind::Gold, 50),
            Self::Library => (ResourceKind::Knowledge, 40),
            _ => return None,
        };
        Some((kind, Fixed::from_num(hundredths) / Fixed::from_num(100)))
    }

    /// Population cap contributed once complete.
    #[must_use]
    pub const fn housing(self) -> u32 {
        match self {
            Self::CityCenter => 10,
            Self::House => 5,
            _ => 0,
        }
    }

    /// Unit kinds this building can train.
    #[must_use]
    pub const fn trains(self) -> &'static [UnitKind] {
        match self {
            Self::CityCenter => &[UnitKind::Citizen],
            Self::Barracks => &[
                UnitKind::Militia,
                UnitKind::Archer,
                UnitKind::Knight,
                UnitKind::Cannon,
            ],
            Self::Dock => &[UnitKind::FishingBoat, UnitKind::Warship],
            Self::Airfield => &[UnitKind::Biplane],
            _ => &[],
        }
    }

    /// City-family buildings project large territory and stave off
    /// elimination.
    #[must_use]
    pub const fn is_city_family(self) -> bool {
        matches!(self, Self::CityCenter)
    }

    /// Fort-family buildings project small territory.
    #[must_use]
    pub const fn is_fort_family(self) -> bool {
        matches!(self, Self::Fort)
    }

    /// Territory radius in tiles, if this kind projects territory.
    #[must_use]
    pub fn territory_radius(self) -> Option<Fixed> {
        if self.is_city_family() {
            Some(Fixed::from_num(12))
        } else if self.is_fort_family() {
            Some(Fixed::from_num(5))
        } else {
            None
        }
    }

    /// Whether land units may walk over this building's footprint.
    #[must_use]
    pub const fn land_passable(self) -> bool {
        matches!(self, Self::Road)
    }

    /// Whether naval units may sail over this building's footprint.
    #[must_use]
    pub const fn naval_passable(self) -> bool {
        matches!(self, Self::Dock)
    }
}

/// Construction progress gained per tick with no builders present.
pub const CONSTRUCTION_BASE_RATE_HUNDREDTHS: i64 = 25;

/// Additional progress per arrived builder per tick.
pub const BUILDER_BONUS_HUNDREDTHS: i64 = 50;

/// A placed building instance, stored on its origin tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Kind, deciding all static stats.
    pub kind: BuildingKind,
    /// Upgrade tier; city level scales the passive gold trickle.
    pub level: u8,
    /// Owning player.
    pub owner: PlayerId,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Construction progress in [0, 100]; monotone until complete.
    #[serde(with = "fixed_serde")]
    pub construction_progress: Fixed,
    /// Queued unit kinds awaiting production.
    pub queue: VecDeque<UnitKind>,
    /// Progress of the front queue item in [0, 100].
    #[serde(with = "fixed_serde")]
    pub production_progress: Fixed,
    /// Units sheltered inside.
    pub garrison: Vec<UnitId>,
}

impl Building {
    /// Create a freshly placed, unconstructed building.
    #[must_use]
    pub fn new(kind: BuildingKind, owner: PlayerId) -> Self {
        Self {
            kind,
            level: 1,
            owner,
            health: kind.max_health(),
            max_health: kind.max_health(),
            construction_progress: Fixed::ZERO,
            queue: VecDeque::new(),
            production_progress: Fixed::ZERO,
            garrison: Vec::new(),
        }
    }

    /// Whether construction has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.construction_progress >= Fixed::from_num(100)
    }

    /// Advance construction, clamped to 100. Negative amounts are
    /// ignored so progress is monotone.
    pub fn advance_construction(&mut self, amount: Fixed) {
        if amount <= Fixed::ZERO {
            return;
        }
        self.construction_progress =
            (self.construction_progress + amount).min(Fixed::from_num(100));
    }

    /// Apply damage, saturating at zero.
    pub fn apply_damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }

    /// Whether the building has been destroyed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.health == 0
    }
}
