//! Building lifecycle: construction progress, production queues, and
//! unit spawning.
//!
//! Buildings are processed in row-major origin order. An incomplete
//! building gains a base rate of construction progress each tick plus
//! a bonus per builder standing on site. A complete building with a
//! non-empty queue advances its front item; at full progress the unit
//! spawns with a small jitter onto a free perimeter tile matching its
//! movement domain. Naval units fall back to the building's own
//! position (docks are sail-through). When no spawn tile is free the
//! finished unit waits at full progress and retries next tick.

use rand_chacha::ChaCha8Rng;

use crate::behavior::{tight_jitter, work_arrival_radius};
use crate::buildings::{BUILDER_BONUS_HUNDREDTHS, CONSTRUCTION_BASE_RATE_HUNDREDTHS};
use crate::combat::distance_to_building;
use crate::map::{GameMap, GridPos};
use crate::math::Fixed;
use crate::pathfinding;
use crate::players::PlayerId;
use crate::units::{Task, TaskTarget, Unit, UnitId, UnitKind, UnitRoster};

/// A unit spawned by the lifecycle pass this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawned {
    /// New unit's id.
    pub id: UnitId,
    /// Kind spawned.
    pub kind: UnitKind,
    /// Owning player.
    pub owner: PlayerId,
}

/// What the lifecycle pass did this tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleOutcome {
    /// Buildings that finished construction this tick.
    pub completed: Vec<GridPos>,
    /// Units spawned from production queues this tick.
    pub spawned: Vec<Spawned>,
}

fn hundredths(n: i64) -> Fixed {
    Fixed::from_num(n) / Fixed::from_num(100)
}

/// Builders on site: units tasked to build this origin, within the
/// work radius.
fn builders_on_site(roster: &UnitRoster, map: &GameMap, origin: GridPos) -> u32 {
    roster
        .iter()
        .filter(|u| {
            u.task == Task::Build
                && u.target == TaskTarget::Cell(origin)
                && distance_to_building(map, u.pos, origin) <= work_arrival_radius()
        })
        .count() as u32
}

/// First free spawn tile on the ring around a building's footprint,
/// in row-major ring order, passable for the given domain. Naval
/// units fall back to the building's own tile when the ring has no
/// water, since docks are sail-through.
fn find_spawn_tile(map: &GameMap, origin: GridPos, kind: UnitKind) -> Option<GridPos> {
    let building = map.building_at(origin)?.1;
    let (w, h) = building.kind.footprint();
    let domain = kind.domain();
    for y in (origin.y - 1)..=(origin.y + h) {
        for x in (origin.x - 1)..=(origin.x + w) {
            let on_ring = x == origin.x - 1 || x == origin.x + w || y == origin.y - 1 || y == origin.y + h;
            if !on_ring {
                continue;
            }
            let pos = GridPos::new(x, y);
            if pathfinding::passable(map, pos, domain) {
                return Some(pos);
            }
        }
    }
    if kind.domain() == crate::units::MoveDomain::Naval && pathfinding::passable(map, origin, domain)
    {
        return Some(origin);
    }
    None
}

/// Run the building lifecycle pass for one tick.
pub fn run_lifecycle_pass(
    map: &mut GameMap,
    roster: &mut UnitRoster,
    rng: &mut ChaCha8Rng,
    tick: u64,
) -> LifecycleOutcome {
    let mut outcome = LifecycleOutcome::default();
    let origins: Vec<GridPos> = map.buildings().map(|(origin, _)| origin).collect();

    for origin in origins {
        // Construction.
        let builders = builders_on_site(roster, map, origin);
        let Some((_, building)) = map.building_at_mut(origin) else {
            continue;
        };
        if !building.is_complete() {
            let rate = hundredths(CONSTRUCTION_BASE_RATE_HUNDREDTHS)
                + hundredths(BUILDER_BONUS_HUNDREDTHS) * Fixed::from_num(i64::from(builders));
            building.advance_construction(rate);
            if building.is_complete() {
                outcome.completed.push(origin);
            }
            continue;
        }

        // Production.
        let Some(&front) = building.queue.front() else {
            continue;
        };
        let done = Fixed::from_num(100);
        building.production_progress = (building.production_progress + front.production_rate()).min(done);
        if building.production_progress < done {
            continue;
        }
        let owner = building.owner;

        // Spawn, if a perimeter tile is free; otherwise hold at full
        // progress and retry next tick.
        let Some(tile) = find_spawn_tile(map, origin, front) else {
            continue;
        };
        let pos = map.clamp_world(tile.center() + tight_jitter(rng));
        let id = roster.spawn(Unit::new(front, owner, pos, tick));
        outcome.spawned.push(Spawned {
            id,
            kind: front,
            owner,
        });
        if let Some((_, building)) = map.building_at_mut(origin) {
            building.queue.pop_front();
            building.production_progress = Fixed::ZERO;
        }
    }

    outcome
}
