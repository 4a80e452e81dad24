//! Player state: resources, ages, population.
//!
//! All stockpile arithmetic is clamped, never raising errors: income
//! beyond the storage limit is discarded, and spending is validated
//! up front by the action layer.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Player identifier (index into the simulation's player list).
pub type PlayerId = u8;

/// The six resource kinds of the economy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Food from farms and fishing.
    Food,
    /// Wood from lumber camps.
    Wood,
    /// Metal from mines.
    Metal,
    /// Gold from markets and city trickle.
    Gold,
    /// Knowledge from libraries; gates age advancement.
    Knowledge,
    /// Oil from rigs; late-age resource.
    Oil,
}

impl ResourceKind {
    /// All resource kinds in storage order.
    pub const ALL: [Self; 6] = [
        Self::Food,
        Self::Wood,
        Self::Metal,
        Self::Gold,
        Self::Knowledge,
        Self::Oil,
    ];

    /// Index into per-resource arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Food => 0,
            Self::Wood => 1,
            Self::Metal => 2,
            Self::Gold => 3,
            Self::Knowledge => 4,
            Self::Oil => 5,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Wood => "wood",
            Self::Metal => "metal",
            Self::Gold => "gold",
            Self::Knowledge => "knowledge",
            Self::Oil => "oil",
        }
    }
}

/// Serde support for the six-element fixed-point array, via raw bits.
mod fixed_array_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::math::Fixed;

    pub fn serialize<S>(value: &[Fixed; 6], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bits: [i64; 6] = [
            value[0].to_bits(),
            value[1].to_bits(),
            value[2].to_bits(),
            value[3].to_bits(),
            value[4].to_bits(),
            value[5].to_bits(),
        ];
        bits.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[Fixed; 6], D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = <[i64; 6]>::deserialize(deserializer)?;
        Ok(bits.map(Fixed::from_bits))
    }
}

/// A per-resource quantity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceStore {
    #[serde(with = "fixed_array_serde")]
    amounts: [Fixed; 6],
}

impl ResourceStore {
    /// Empty store.
    pub const ZERO: Self = Self {
        amounts: [Fixed::ZERO; 6],
    };

    /// Store with the same amount of every resource.
    #[must_use]
    pub fn uniform(amount: Fixed) -> Self {
        Self {
            amounts: [amount; 6],
        }
    }

    /// Get the amount of one resource.
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> Fixed {
        self.amounts[kind.index()]
    }

    /// Set the amount of one resource.
    pub fn set(&mut self, kind: ResourceKind, amount: Fixed) {
        self.amounts[kind.index()] = amount;
    }

    /// Add to one resource (unclamped; callers clamp against storage).
    pub fn add(&mut self, kind: ResourceKind, amount: Fixed) {
        self.amounts[kind.index()] += amount;
    }

    /// Clamp every amount into `[0, limit]` per resource.
    pub fn clamp_to(&mut self, limits: &ResourceStore) {
        for kind in ResourceKind::ALL {
            let i = kind.index();
            self.amounts[i] = self.amounts[i].clamp(Fixed::ZERO, limits.amounts[i]);
        }
    }

    /// Check whether every listed cost is covered.
    #[must_use]
    pub fn can_afford(&self, cost: &[(ResourceKind, i64)]) -> bool {
        cost.iter()
            .all(|&(kind, amount)| self.get(kind) >= Fixed::from_num(amount))
    }

    /// Subtract a cost. Callers must check [`can_afford`](Self::can_afford) first.
    pub fn pay(&mut self, cost: &[(ResourceKind, i64)]) {
        for &(kind, amount) in cost {
            self.amounts[kind.index()] -= Fixed::from_num(amount);
        }
    }
}

/// The five historical ages, ordered. Later ages unlock more
/// buildings and units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Age {
    /// Starting age.
    Ancient,
    /// Second age.
    Classical,
    /// Third age.
    Medieval,
    /// Fourth age.
    Industrial,
    /// Final age.
    Modern,
}

impl Age {
    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ancient => "Ancient",
            Self::Classical => "Classical",
            Self::Medieval => "Medieval",
            Self::Industrial => "Industrial",
            Self::Modern => "Modern",
        }
    }

    /// The next age, or `None` at the end of the line.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Ancient => Some(Self::Classical),
            Self::Classical => Some(Self::Medieval),
            Self::Medieval => Some(Self::Industrial),
            Self::Industrial => Some(Self::Modern),
            Self::Modern => None,
        }
    }

    /// Knowledge cost to advance out of this age.
    #[must_use]
    pub const fn advance_cost(self) -> &'static [(ResourceKind, i64)] {
        match self {
            Self::Ancient => &[(ResourceKind::Food, 200), (ResourceKind::Knowledge, 50)],
            Self::Classical => &[(ResourceKind::Food, 400), (ResourceKind::Knowledge, 150)],
            Self::Medieval => &[
                (ResourceKind::Food, 600),
                (ResourceKind::Gold, 200),
                (ResourceKind::Knowledge, 300),
            ],
            Self::Industrial => &[
                (ResourceKind::Gold, 500),
                (ResourceKind::Knowledge, 600),
                (ResourceKind::Oil, 100),
            ],
            Self::Modern => &[],
        }
    }

    /// Base population cap granted by this age, before housing.
    #[must_use]
    pub const fn base_population_cap(self) -> u32 {
        match self {
            Self::Ancient => 10,
            Self::Classical => 15,
            Self::Medieval => 20,
            Self::Industrial => 30,
            Self::Modern => 40,
        }
    }
}

/// Default storage limit per resource.
pub const DEFAULT_STORAGE_LIMIT: i64 = 1000;

/// Floor for the recomputed population cap.
pub const MIN_POPULATION_CAP: u32 = 5;

/// One player's full state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player id.
    pub id: PlayerId,
    /// Current stockpiles, kept within `[0, storage]`.
    pub stockpile: ResourceStore,
    /// Income per tick, recomputed by the economy pass (display only).
    pub rates: ResourceStore,
    /// Per-resource storage limits.
    pub storage: ResourceStore,
    /// Live unit count.
    pub population: u32,
    /// Current population cap (age base + housing).
    pub population_cap: u32,
    /// Current age.
    pub age: Age,
    /// Set once the elimination timer expires; never cleared.
    pub is_defeated: bool,
    /// Tick at which the player last lost their final city, if any.
    pub no_city_since: Option<u64>,
}

impl Player {
    /// Create a player with starting stockpiles.
    #[must_use]
    pub fn new(id: PlayerId) -> Self {
        let mut stockpile = ResourceStore::ZERO;
        stockpile.set(ResourceKind::Food, Fixed::from_num(200));
        stockpile.set(ResourceKind::Wood, Fixed::from_num(150));
        Self {
            id,
            stockpile,
            rates: ResourceStore::ZERO,
            storage: ResourceStore::uniform(Fixed::from_num(DEFAULT_STORAGE_LIMIT)),
            population: 0,
            population_cap: Age::Ancient.base_population_cap(),
            age: Age::Ancient,
            is_defeated: false,
            no_city_since: None,
        }
    }
}
