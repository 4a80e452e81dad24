//! The per-tick unit pass.
//!
//! Units are processed in ascending id order. Each unit first runs its
//! auto-behaviors (military auto-engage, civilian flee, idle
//! auto-work), then executes its current task: moving, standing on a
//! work site, assisting construction, or attacking. Attacks go through
//! the [`DamageLedger`]; nothing in this pass mutates another unit.
//!
//! Auto-behaviors only ever replace tasks tagged [`TaskOrigin::Auto`].
//! A player-issued order sticks until it completes or the unit dies.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::combat::{distance_to_building, DamageLedger};
use crate::map::{GameMap, GridPos};
use crate::math::{Fixed, Vec2Fixed};
use crate::pathfinding;
use crate::players::ResourceKind;
use crate::units::{Task, TaskOrigin, TaskTarget, Unit, UnitId, UnitKind, UnitRoster};

/// Radius within which military units auto-engage enemies.
pub const DETECTION_RADIUS: i64 = 6;

/// Radius within which civilians register a military threat.
pub const FLEE_RADIUS: i64 = 4;

/// Ticks a threat must persist before a civilian breaks and runs.
pub const FLEE_DELAY: u64 = 10;

/// How far a fleeing civilian runs, in tiles.
pub const FLEE_DISTANCE: i64 = 6;

/// Base idle ticks before auto-work kicks in; each unit adds a small
/// id-based stagger so a crowd does not reassign on the same tick.
pub const IDLE_ASSIGN_DELAY: u64 = 40;

/// Search radius of idle auto-work.
pub const IDLE_SEARCH_RADIUS: i64 = 10;

/// A move order counts as arrived within this distance of its goal.
#[must_use]
pub fn move_arrival_radius() -> Fixed {
    Fixed::from_num(1) / Fixed::from_num(2)
}

/// A worker counts as on-site within this distance of the work
/// building (or fishing spot). Economy and construction use the same
/// radius when crediting arrived workers.
#[must_use]
pub fn work_arrival_radius() -> Fixed {
    Fixed::from_num(3) / Fixed::from_num(2)
}

fn hundredths(n: i64) -> Fixed {
    Fixed::from_num(n) / Fixed::from_num(100)
}

/// Small offset so co-assigned workers spread over a site instead of
/// stacking on one point. Also used for spawn placement.
pub(crate) fn tight_jitter(rng: &mut ChaCha8Rng) -> Vec2Fixed {
    Vec2Fixed::new(
        hundredths(rng.gen_range(-20..=20)),
        hundredths(rng.gen_range(-20..=20)),
    )
}

/// Larger offset for staging destinations such as flee points.
fn loose_jitter(rng: &mut ChaCha8Rng) -> Vec2Fixed {
    Vec2Fixed::new(
        hundredths(rng.gen_range(-80..=80)),
        hundredths(rng.gen_range(-80..=80)),
    )
}

/// Per-unit staging offset for attack approaches, so simultaneous
/// attackers fan out around a target instead of stacking on one
/// point. Derived from the unit id like the idle-delay stagger, and
/// kept shorter than the shortest attack range so a melee unit
/// aiming at the offset point still closes to range.
fn staging_offset(id: UnitId) -> Vec2Fixed {
    let dx = (id % 7) as i64 - 3;
    let dy = ((id / 7) % 7) as i64 - 3;
    Vec2Fixed::new(hundredths(dx * 10), hundredths(dy * 10))
}

/// Nearest enemy of `unit` within `radius`, by id on exact distance
/// ties (the scan runs in sorted-id order).
fn nearest_enemy(
    roster: &UnitRoster,
    unit: &Unit,
    radius: i64,
    military_only: bool,
) -> Option<UnitId> {
    let radius = Fixed::from_num(radius);
    let mut best: Option<(Fixed, UnitId)> = None;
    for id in roster.sorted_ids() {
        if id == unit.id {
            continue;
        }
        let Some(other) = roster.get(id) else { continue };
        if other.owner == unit.owner || other.is_dead() {
            continue;
        }
        if military_only && !other.kind.is_military() {
            continue;
        }
        let dist_sq = unit.pos.distance_squared(other.pos);
        if dist_sq > radius * radius {
            continue;
        }
        if best.map_or(true, |(d, _)| dist_sq < d) {
            best = Some((dist_sq, id));
        }
    }
    best.map(|(_, id)| id)
}

/// Workers currently assigned to gather at `origin`.
fn assigned_workers(roster: &UnitRoster, origin: GridPos) -> u32 {
    roster
        .iter()
        .filter(|u| matches!(u.task, Task::Gather(_)) && u.target == TaskTarget::Cell(origin))
        .count() as u32
}

/// Best understaffed work-site building for a citizen: empty sites
/// first, then lowest fill ratio, then nearest. Remaining ties go to
/// the earlier origin in row-major order.
fn find_work_site(roster: &UnitRoster, unit: &Unit, map: &GameMap) -> Option<(GridPos, ResourceKind)> {
    let radius = Fixed::from_num(IDLE_SEARCH_RADIUS);
    let mut best: Option<((bool, i64, Fixed), GridPos, ResourceKind)> = None;
    for (origin, building) in map.buildings() {
        if building.owner != unit.owner || !building.is_complete() {
            continue;
        }
        let Some((resource, _)) = building.kind.yields() else {
            continue;
        };
        let capacity = building.kind.worker_capacity();
        if capacity == 0 {
            continue;
        }
        let assigned = assigned_workers(roster, origin);
        if assigned >= capacity {
            continue;
        }
        let dist = distance_to_building(map, unit.pos, origin);
        if dist > radius {
            continue;
        }
        let fill = i64::from(assigned) * 100 / i64::from(capacity);
        let key = (assigned > 0, fill, dist);
        if best.map_or(true, |(k, _, _)| key < k) {
            best = Some((key, origin, resource));
        }
    }
    best.map(|(_, origin, resource)| (origin, resource))
}

/// Centroid of the enemy military presence around a civilian, if any.
fn threat_centroid(roster: &UnitRoster, unit: &Unit) -> Option<Vec2Fixed> {
    let radius = Fixed::from_num(FLEE_RADIUS);
    let mut sum = Vec2Fixed::ZERO;
    let mut count: i64 = 0;
    for other in roster.iter() {
        if other.owner == unit.owner || !other.kind.is_military() || other.is_dead() {
            continue;
        }
        if unit.pos.distance_squared(other.pos) > radius * radius {
            continue;
        }
        sum = sum + other.pos;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum.scale(Fixed::from_num(1) / Fixed::from_num(count)))
    }
}

/// Nearest unclaimed fishing spot for an idle boat.
fn find_fishing_spot(roster: &UnitRoster, unit: &Unit, map: &GameMap) -> Option<GridPos> {
    let Some(here) = map.world_to_grid(unit.pos) else {
        return None;
    };
    let r = IDLE_SEARCH_RADIUS as i32;
    let radius = Fixed::from_num(IDLE_SEARCH_RADIUS);
    let mut best: Option<(Fixed, GridPos)> = None;
    for y in (here.y - r)..=(here.y + r) {
        for x in (here.x - r)..=(here.x + r) {
            let pos = GridPos::new(x, y);
            let Some(tile) = map.tile(pos) else { continue };
            if !tile.fishing_spot || assigned_workers(roster, pos) > 0 {
                continue;
            }
            let dist = unit.pos.distance(pos.center());
            if dist > radius {
                continue;
            }
            if best.map_or(true, |(d, _)| dist < d) {
                best = Some((dist, pos));
            }
        }
    }
    best.map(|(_, pos)| pos)
}

/// One movement step toward `goal`. Returns `false` when no step was
/// found and the unit dropped to idle.
fn step(unit: &mut Unit, map: &GameMap, goal: Vec2Fixed, tick: u64) -> bool {
    match pathfinding::step_toward(map, unit.pos, goal, unit.kind.domain(), unit.kind.speed()) {
        Some(next) => {
            unit.pos = next;
            unit.is_moving = true;
            true
        }
        None => {
            unit.set_idle(tick);
            false
        }
    }
}

fn auto_behaviors(
    unit: &mut Unit,
    roster: &UnitRoster,
    map: &GameMap,
    rng: &mut ChaCha8Rng,
    tick: u64,
) {
    if unit.kind.is_military() {
        // Military targets take priority over stray civilians.
        if unit.auto_interruptible() && unit.task != Task::Attack {
            let enemy = nearest_enemy(roster, unit, DETECTION_RADIUS, true)
                .or_else(|| nearest_enemy(roster, unit, DETECTION_RADIUS, false));
            if let Some(enemy) = enemy {
                unit.assign(Task::Attack, TaskTarget::Unit(enemy), TaskOrigin::Auto, None);
                // A fresh engagement strikes immediately; no residual
                // cooldown carries over from the previous fight.
                unit.cooldown = 0;
            }
        }
        return;
    }

    // Civilian threat tracking. The delay keeps workers from
    // scattering the instant a patrol brushes past.
    if unit.auto_interruptible() {
        let threat = threat_centroid(roster, unit);
        match (threat, unit.enemy_spotted_at) {
            (Some(_), None) => unit.enemy_spotted_at = Some(tick),
            (Some(centroid), Some(seen))
                if tick.saturating_sub(seen) >= FLEE_DELAY && unit.task != Task::Flee =>
            {
                let away = (unit.pos - centroid).normalize();
                let away = if away == Vec2Fixed::ZERO {
                    Vec2Fixed::new(Fixed::from_num(1), Fixed::ZERO)
                } else {
                    away
                };
                let dest = map.clamp_world(
                    unit.pos + away.scale(Fixed::from_num(FLEE_DISTANCE)) + loose_jitter(rng),
                );
                unit.assign(Task::Flee, TaskTarget::None, TaskOrigin::Auto, Some(dest));
                unit.enemy_spotted_at = None;
            }
            (None, _) => {
                unit.enemy_spotted_at = None;
                // All clear: a runner stops running.
                if unit.task == Task::Flee {
                    unit.set_idle(tick);
                }
            }
            _ => {}
        }
    }

    // Idle auto-work after the staggered delay.
    if unit.task == Task::Idle {
        let delay = IDLE_ASSIGN_DELAY + (unit.id % 16);
        if tick.saturating_sub(unit.idle_since) >= delay {
            match unit.kind {
                UnitKind::Citizen => {
                    if let Some((origin, resource)) = find_work_site(roster, unit, map) {
                        let dest = map.clamp_world(origin.center() + tight_jitter(rng));
                        unit.assign(
                            Task::Gather(resource),
                            TaskTarget::Cell(origin),
                            TaskOrigin::Auto,
                            Some(dest),
                        );
                    }
                }
                UnitKind::FishingBoat => {
                    if let Some(spot) = find_fishing_spot(roster, unit, map) {
                        let dest = map.clamp_world(spot.center() + tight_jitter(rng));
                        unit.assign(
                            Task::Gather(ResourceKind::Food),
                            TaskTarget::Cell(spot),
                            TaskOrigin::Auto,
                            Some(dest),
                        );
                    }
                }
                _ => {}
            }
        }
    }
}

/// Pick a replacement attack target after the current one is lost:
/// nearest enemy unit in detection range, else nearest enemy building,
/// else drop to idle. Task provenance is kept.
fn retarget(unit: &mut Unit, roster: &UnitRoster, map: &GameMap, tick: u64) {
    if let Some(enemy) = nearest_enemy(roster, unit, DETECTION_RADIUS, false) {
        unit.target = TaskTarget::Unit(enemy);
        return;
    }
    let radius = Fixed::from_num(DETECTION_RADIUS);
    let mut best: Option<(Fixed, GridPos)> = None;
    for (origin, building) in map.buildings() {
        if building.owner == unit.owner {
            continue;
        }
        let dist = distance_to_building(map, unit.pos, origin);
        if dist > radius {
            continue;
        }
        if best.map_or(true, |(d, _)| dist < d) {
            best = Some((dist, origin));
        }
    }
    match best {
        Some((_, origin)) => unit.target = TaskTarget::Cell(origin),
        None => unit.set_idle(tick),
    }
}

fn execute_task(
    unit: &mut Unit,
    roster: &UnitRoster,
    map: &GameMap,
    ledger: &mut DamageLedger,
    tick: u64,
) {
    match unit.task {
        Task::Idle => {}
        Task::Move | Task::Flee => {
            let Some(goal) = unit.move_target else {
                unit.set_idle(tick);
                return;
            };
            let arrival = move_arrival_radius();
            if unit.pos.distance_squared(goal) <= arrival * arrival {
                unit.set_idle(tick);
            } else {
                step(unit, map, goal, tick);
            }
        }
        Task::Gather(_) => {
            let TaskTarget::Cell(cell) = unit.target else {
                unit.set_idle(tick);
                return;
            };
            let dist = match map.building_at(cell) {
                Some((origin, building)) => {
                    if building.owner != unit.owner
                        || !building.is_complete()
                        || building.kind.worker_capacity() == 0
                    {
                        unit.set_idle(tick);
                        return;
                    }
                    distance_to_building(map, unit.pos, origin)
                }
                None => {
                    let is_spot = map.tile(cell).is_some_and(|t| t.fishing_spot);
                    if !is_spot || unit.kind != UnitKind::FishingBoat {
                        unit.set_idle(tick);
                        return;
                    }
                    unit.pos.distance(cell.center())
                }
            };
            let arrival = work_arrival_radius();
            if dist > arrival {
                let goal = unit.move_target.unwrap_or_else(|| cell.center());
                step(unit, map, goal, tick);
            } else {
                unit.is_moving = false;
                unit.move_target = None;
            }
        }
        Task::Build => {
            let TaskTarget::Cell(cell) = unit.target else {
                unit.set_idle(tick);
                return;
            };
            match map.building_at(cell) {
                Some((origin, building)) if !building.is_complete() => {
                    let dist = distance_to_building(map, unit.pos, origin);
                    if dist > work_arrival_radius() {
                        let goal = unit.move_target.unwrap_or_else(|| cell.center());
                        step(unit, map, goal, tick);
                    } else {
                        unit.is_moving = false;
                        unit.move_target = None;
                    }
                }
                _ => unit.set_idle(tick),
            }
        }
        Task::Attack => match unit.target {
            TaskTarget::Unit(target_id) => {
                let target = roster
                    .get(target_id)
                    .filter(|t| !t.is_dead() && t.owner != unit.owner);
                let Some(target) = target else {
                    retarget(unit, roster, map, tick);
                    return;
                };
                let range = unit.kind.range();
                if unit.pos.distance_squared(target.pos) <= range * range {
                    unit.is_moving = false;
                    unit.move_target = None;
                    if unit.cooldown == 0 && unit.kind.damage() > 0 {
                        ledger.record_unit(target_id, unit.kind.damage());
                        unit.cooldown = unit.kind.attack_cooldown();
                    }
                } else {
                    let goal = map.clamp_world(target.pos + staging_offset(unit.id));
                    step(unit, map, goal, tick);
                }
            }
            TaskTarget::Cell(cell) => {
                let standing = map
                    .building_at(cell)
                    .filter(|(_, b)| b.owner != unit.owner);
                let Some((origin, _)) = standing else {
                    retarget(unit, roster, map, tick);
                    return;
                };
                let dist = distance_to_building(map, unit.pos, origin);
                if dist <= unit.kind.range() {
                    unit.is_moving = false;
                    unit.move_target = None;
                    if unit.cooldown == 0 && unit.kind.damage() > 0 {
                        ledger.record_building(origin, unit.kind.damage());
                        unit.cooldown = unit.kind.attack_cooldown();
                    }
                } else {
                    let goal = map.clamp_world(origin.center() + staging_offset(unit.id));
                    step(unit, map, goal, tick);
                }
            }
            TaskTarget::None => unit.set_idle(tick),
        },
    }
}

/// Run the unit pass for one tick. Damage lands in `ledger`; the
/// caller applies it after the pass.
pub fn run_unit_pass(
    roster: &mut UnitRoster,
    map: &GameMap,
    ledger: &mut DamageLedger,
    rng: &mut ChaCha8Rng,
    tick: u64,
) {
    for id in roster.sorted_ids() {
        let Some(mut unit) = roster.get(id).cloned() else {
            continue;
        };
        if unit.is_dead() {
            continue;
        }
        if unit.cooldown > 0 {
            unit.cooldown -= 1;
        }
        auto_behaviors(&mut unit, roster, map, rng, tick);
        execute_task(&mut unit, roster, map, ledger, tick);
        if let Some(slot) = roster.get_mut(id) {
            *slot = unit;
        }
    }
}
