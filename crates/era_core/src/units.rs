//! Unit definitions: kinds, tasks, and the live roster.
//!
//! A unit's current task carries an explicit provenance tag
//! ([`TaskOrigin`]): auto-behaviors (idle auto-work, auto-combat,
//! flee) may only replace tasks they themselves assigned, never a
//! player-issued order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::map::GridPos;
use crate::math::{Fixed, Vec2Fixed};
use crate::players::{Age, PlayerId, ResourceKind};

/// Unique identifier for units, monotonic within one simulation.
pub type UnitId = u64;

/// Movement domain, deciding passability rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveDomain {
    /// Ground movement; blocked by water, forest, deposits, footprints.
    Land,
    /// Water movement; requires water, blocked by footprints except docks.
    Naval,
    /// Direct flight; ignores all obstacles.
    Air,
}

/// All trainable unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Civilian worker; gathers, builds, flees.
    Citizen,
    /// Civilian boat; gathers food on fishing spots.
    FishingBoat,
    /// Basic infantry.
    Militia,
    /// Ranged infantry.
    Archer,
    /// Heavy cavalry.
    Knight,
    /// Siege weapon, strong versus buildings.
    Cannon,
    /// Armed naval vessel.
    Warship,
    /// Air unit, ignores terrain.
    Biplane,
}

impl UnitKind {
    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::FishingBoat => "fishing boat",
            Self::Militia => "militia",
            Self::Archer => "archer",
            Self::Knight => "knight",
            Self::Cannon => "cannon",
            Self::Warship => "warship",
            Self::Biplane => "biplane",
        }
    }

    /// Movement domain.
    #[must_use]
    pub const fn domain(self) -> MoveDomain {
        match self {
            Self::Citizen | Self::Militia | Self::Archer | Self::Knight | Self::Cannon => {
                MoveDomain::Land
            }
            Self::FishingBoat | Self::Warship => MoveDomain::Naval,
            Self::Biplane => MoveDomain::Air,
        }
    }

    /// Military units auto-engage and can be ordered to attack;
    /// civilians flee instead.
    #[must_use]
    pub const fn is_military(self) -> bool {
        !matches!(self, Self::Citizen | Self::FishingBoat)
    }

    /// Movement speed in tiles per tick.
    #[must_use]
    pub fn speed(self) -> Fixed {
        let hundredths: i64 = match self {
            Self::Citizen => 8,
            Self::FishingBoat => 10,
            Self::Militia => 9,
            Self::Archer => 9,
            Self::Knight => 14,
            Self::Cannon => 5,
            Self::Warship => 11,
            Self::Biplane => 20,
        };
        Fixed::from_num(hundredths) / Fixed::from_num(100)
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(self) -> u32 {
        match self {
            Self::Citizen => 25,
            Self::FishingBoat => 30,
            Self::Militia => 40,
            Self::Archer => 30,
            Self::Knight => 90,
            Self::Cannon => 60,
            Self::Warship => 120,
            Self::Biplane => 50,
        }
    }

    /// Attack damage per hit (0 for unarmed civilians).
    #[must_use]
    pub const fn damage(self) -> u32 {
        match self {
            Self::Citizen => 2,
            Self::FishingBoat => 0,
            Self::Militia => 6,
            Self::Archer => 5,
            Self::Knight => 12,
            Self::Cannon => 25,
            Self::Warship => 15,
            Self::Biplane => 10,
        }
    }

    /// Attack range in tiles.
    #[must_use]
    pub fn range(self) -> Fixed {
        let tiles: i64 = match self {
            Self::Citizen | Self::FishingBoat | Self::Militia | Self::Knight => 1,
            Self::Archer => 4,
            Self::Cannon => 5,
            Self::Warship => 4,
            Self::Biplane => 2,
        };
        Fixed::from_num(tiles)
    }

    /// Ticks between attacks.
    #[must_use]
    pub const fn attack_cooldown(self) -> u32 {
        match self {
            Self::Citizen => 30,
            Self::FishingBoat => 30,
            Self::Militia => 20,
            Self::Archer => 25,
            Self::Knight => 18,
            Self::Cannon => 50,
            Self::Warship => 30,
            Self::Biplane => 22,
        }
    }

    /// Resource cost to queue this unit.
    #[must_use]
    pub const fn cost(self) -> &'static [(ResourceKind, i64)] {
        match self {
            Self::Citizen => &[(ResourceKind::Food, 50)],
            Self::FishingBoat => &[(ResourceKind::Wood, 60)],
            Self::Militia => &[(ResourceKind::Food, 40), (ResourceKind::Wood, 20)],
            Self::Archer => &[(ResourceKind::Food, 30), (ResourceKind::Wood, 40)],
            Self::Knight => &[(ResourceKind::Food, 80), (ResourceKind::Metal, 40)],
            Self::Cannon => &[(ResourceKind::Metal, 100), (ResourceKind::Gold, 50)],
            Self::Warship => &[(ResourceKind::Wood, 120), (ResourceKind::Metal, 40)],
            Self::Biplane => &[(ResourceKind::Metal, 80), (ResourceKind::Oil, 60)],
        }
    }

    /// Age required to train this unit.
    #[must_use]
    pub const fn required_age(self) -> Age {
        match self {
            Self::Citizen | Self::FishingBoat | Self::Militia => Age::Ancient,
            Self::Archer => Age::Classical,
            Self::Knight | Self::Warship => Age::Medieval,
            Self::Cannon => Age::Industrial,
            Self::Biplane => Age::Modern,
        }
    }

    /// Production progress gained per tick while this unit is at the
    /// front of a queue (progress runs 0..100).
    #[must_use]
    pub fn production_rate(self) -> Fixed {
        let build_ticks: i64 = match self {
            Self::Citizen => 50,
            Self::FishingBoat => 60,
            Self::Militia => 60,
            Self::Archer => 70,
            Self::Knight => 100,
            Self::Cannon => 140,
            Self::Warship => 150,
            Self::Biplane => 120,
        };
        Fixed::from_num(100) / Fixed::from_num(build_ticks)
    }
}

/// What a unit is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Task {
    /// No task; candidate for idle auto-work.
    #[default]
    Idle,
    /// Moving to a position with no follow-up.
    Move,
    /// Gathering a resource at the target building or spot.
    Gather(ResourceKind),
    /// Attacking the current target.
    Attack,
    /// Running from nearby enemy military.
    Flee,
    /// Assisting construction at the target building.
    Build,
}

/// The target of a unit's task: nothing, a live unit reference, or a
/// grid cell (building origin, gather spot, or attack ground).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskTarget {
    /// No target.
    #[default]
    None,
    /// Another unit, re-validated against the roster every use.
    Unit(UnitId),
    /// A grid cell.
    Cell(GridPos),
}

/// Who assigned the current task.
///
/// Auto-behaviors must never replace a `Player` task; they may freely
/// replace `Auto` tasks (including their own earlier assignments).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskOrigin {
    /// Issued through the action API.
    Player,
    /// Assigned by an auto-behavior.
    #[default]
    Auto,
}

/// A single unit's full state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique id.
    pub id: UnitId,
    /// Kind, deciding all static stats.
    pub kind: UnitKind,
    /// Owning player.
    pub owner: PlayerId,
    /// Continuous world position.
    pub pos: Vec2Fixed,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Current task.
    pub task: Task,
    /// Current task target.
    pub target: TaskTarget,
    /// Provenance of the current task.
    pub task_origin: TaskOrigin,
    /// Whether the unit moved this tick / still has a move target.
    pub is_moving: bool,
    /// Where the unit is heading, if anywhere.
    #[serde(default)]
    pub move_target: Option<Vec2Fixed>,
    /// Ticks until the next attack is allowed.
    pub cooldown: u32,
    /// Tick at which the unit last became idle.
    pub idle_since: u64,
    /// Tick at which a fleeing candidate first spotted a threat.
    #[serde(default)]
    pub enemy_spotted_at: Option<u64>,
}

impl Unit {
    /// Create a unit of the given kind at a position.
    ///
    /// The id is assigned by [`UnitRoster::spawn`].
    #[must_use]
    pub fn new(kind: UnitKind, owner: PlayerId, pos: Vec2Fixed, tick: u64) -> Self {
        Self {
            id: 0,
            kind,
            owner,
            pos,
            health: kind.max_health(),
            max_health: kind.max_health(),
            task: Task::Idle,
            target: TaskTarget::None,
            task_origin: TaskOrigin::Auto,
            is_moving: false,
            move_target: None,
            cooldown: 0,
            idle_since: tick,
            enemy_spotted_at: None,
        }
    }

    /// Whether the unit is dead (health exhausted).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.health == 0
    }

    /// Whether auto-behaviors may replace the current task.
    #[must_use]
    pub fn auto_interruptible(&self) -> bool {
        self.task_origin == TaskOrigin::Auto
    }

    /// Drop to idle, clearing target and movement.
    pub fn set_idle(&mut self, tick: u64) {
        self.task = Task::Idle;
        self.target = TaskTarget::None;
        self.task_origin = TaskOrigin::Auto;
        self.is_moving = false;
        self.move_target = None;
        self.idle_since = tick;
    }

    /// Assign a task with target and provenance, setting up movement.
    pub fn assign(
        &mut self,
        task: Task,
        target: TaskTarget,
        origin: TaskOrigin,
        move_to: Option<Vec2Fixed>,
    ) {
        self.task = task;
        self.target = target;
        self.task_origin = origin;
        self.move_target = move_to;
        self.is_moving = move_to.is_some();
    }
}

/// Storage for all live units.
///
/// Uses a `HashMap` for O(1) lookup with deterministic processing via
/// sorted ids. The monotonic id counter lives here, on the owning
/// session state, so parallel simulations never interfere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitRoster {
    units: HashMap<UnitId, Unit>,
    next_id: UnitId,
}

impl UnitRoster {
    /// Create an empty roster. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a unit, assigning the next id. Returns the id.
    pub fn spawn(&mut self, mut unit: Unit) -> UnitId {
        let id = self.next_id;
        self.next_id += 1;
        unit.id = id;
        self.units.insert(id, unit);
        id
    }

    /// Remove a unit by id.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable unit by id.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Whether a unit id is live.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of live units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Sorted unit ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all units (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }
}

impl PartialEq for UnitRoster {
    fn eq(&self, other: &Self) -> bool {
        self.next_id == other.next_id && self.units == other.units
    }
}

impl Eq for UnitRoster {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;

    #[test]
    fn test_roster_ids_are_monotonic() {
        let mut roster = UnitRoster::new();
        let a = roster.spawn(Unit::new(UnitKind::Citizen, 0, Vec2Fixed::ZERO, 0));
        let b = roster.spawn(Unit::new(UnitKind::Militia, 0, Vec2Fixed::ZERO, 0));
        assert_eq!(a, 1);
        assert_eq!(b, 2);

        roster.remove(a);
        let c = roster.spawn(Unit::new(UnitKind::Citizen, 0, Vec2Fixed::ZERO, 0));
        // Ids are never reused.
        assert_eq!(c, 3);
    }

    #[test]
    fn test_independent_rosters_do_not_share_ids() {
        let mut a = UnitRoster::new();
        let mut b = UnitRoster::new();
        a.spawn(Unit::new(UnitKind::Citizen, 0, Vec2Fixed::ZERO, 0));
        let id = b.spawn(Unit::new(UnitKind::Citizen, 0, Vec2Fixed::ZERO, 0));
        assert_eq!(id, 1);
    }

    #[test]
    fn test_sorted_ids() {
        let mut roster = UnitRoster::new();
        for _ in 0..5 {
            roster.spawn(Unit::new(UnitKind::Citizen, 0, Vec2Fixed::ZERO, 0));
        }
        roster.remove(3);
        assert_eq!(roster.sorted_ids(), vec![1, 2, 4, 5]);
    }

    #[test]
    fn test_player_task_not_interruptible() {
        let mut unit = Unit::new(UnitKind::Militia, 0, Vec2Fixed::ZERO, 0);
        unit.assign(
            Task::Move,
            TaskTarget::Cell(GridPos::new(3, 3)),
            TaskOrigin::Player,
            Some(Vec2Fixed::new(Fixed::from_num(3), Fixed::from_num(3))),
        );
        assert!(!unit.auto_interruptible());

        unit.set_idle(10);
        assert!(unit.auto_interruptible());
        assert_eq!(unit.idle_since, 10);
    }

    #[test]
    fn test_kind_tables_are_consistent() {
        for kind in [
            UnitKind::Citizen,
            UnitKind::FishingBoat,
            UnitKind::Militia,
            UnitKind::Archer,
            UnitKind::Knight,
            UnitKind::Cannon,
            UnitKind::Warship,
            UnitKind::Biplane,
        ] {
            assert!(kind.speed() > Fixed::ZERO);
            assert!(kind.max_health() > 0);
            assert!(kind.production_rate() > Fixed::ZERO);
            if kind.is_military() {
                assert!(kind.damage() > 0, "{} should hit", kind.name());
            }
        }
    }
}
