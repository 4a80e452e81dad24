//! Per-tick movement resolution.
//!
//! Each unit resolves at most one step per tick. Air units fly
//! straight at the goal. Land and naval units first try a direct-path
//! check, sampling the straight segment at a fixed resolution; if any
//! sampled tile is impassable they fall back to a bounded greedy
//! best-first search over 8-neighbor tiles, ranked by Manhattan
//! distance to the goal and capped by an expansion budget.
//!
//! The destination tile is always treated as traversable regardless
//! of footprint occupancy (so units can walk up to an enemy building)
//! but never regardless of terrain: a naval unit ordered onto dry
//! land finds no path and stays put.
//!
//! Failure is not an error: `None` means the caller clears this
//! tick's move and may retry next tick.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::map::{GameMap, GridPos, Terrain};
use crate::math::{Fixed, Vec2Fixed};
use crate::units::MoveDomain;

/// Sampling resolution of the direct-path check, in tiles.
const DIRECT_SAMPLE_STEP_HUNDREDTHS: i64 = 50;

/// Expansion budget of the fallback search.
const SEARCH_BUDGET: usize = 256;

/// 8-neighbor direction offsets.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Terrain-only passability, ignoring building footprints.
fn bare_passable(map: &GameMap, pos: GridPos, domain: MoveDomain) -> bool {
    match domain {
        MoveDomain::Air => map.in_bounds(pos),
        MoveDomain::Land => map.tile(pos).is_some_and(|t| !t.blocks_land()),
        MoveDomain::Naval => map.tile(pos).is_some_and(|t| t.terrain == Terrain::Water),
    }
}

/// Full passability for a domain, including footprint occupancy.
#[must_use]
pub fn passable(map: &GameMap, pos: GridPos, domain: MoveDomain) -> bool {
    match domain {
        MoveDomain::Air => map.in_bounds(pos),
        MoveDomain::Land => map.land_passable(pos),
        MoveDomain::Naval => map.naval_passable(pos),
    }
}

/// Passability with the destination-tile occupancy exemption.
fn passable_or_goal(map: &GameMap, pos: GridPos, goal: GridPos, domain: MoveDomain) -> bool {
    passable(map, pos, domain) || (pos == goal && bare_passable(map, pos, domain))
}

/// Advance `from` toward `to` by at most `speed`, stopping exactly on
/// the target when within reach.
fn advance(from: Vec2Fixed, to: Vec2Fixed, speed: Fixed) -> Vec2Fixed {
    let dist_sq = from.distance_squared(to);
    if dist_sq <= speed * speed {
        return to;
    }
    let dir = (to - from).normalize();
    from + dir.scale(speed)
}

/// Check the straight segment from `from` to `goal` at fixed
/// resolution; every sampled tile must be passable (goal exempt from
/// occupancy).
fn direct_path_clear(map: &GameMap, from: Vec2Fixed, goal: Vec2Fixed, domain: MoveDomain) -> bool {
    let Some(goal_tile) = map.world_to_grid(goal) else {
        return false;
    };
    let step = Fixed::from_num(DIRECT_SAMPLE_STEP_HUNDREDTHS) / Fixed::from_num(100);
    let total = from.distance(goal);
    let dir = (goal - from).normalize();

    let mut travelled = Fixed::ZERO;
    loop {
        let sample = if travelled >= total {
            goal
        } else {
            from + dir.scale(travelled)
        };
        let Some(tile) = map.world_to_grid(sample) else {
            return false;
        };
        if !passable_or_goal(map, tile, goal_tile, domain) {
            return false;
        }
        if travelled >= total {
            return true;
        }
        travelled += step;
    }
}

/// A frontier entry of the greedy search, min-ordered by Manhattan
/// distance to the goal with a coordinate tie-breaker for
/// determinism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchNode {
    pos: GridPos,
    rank: Fixed,
    tie_breaker: u64,
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse for min-heap behavior.
        match other.rank.cmp(&self.rank) {
            Ordering::Equal => other.tie_breaker.cmp(&self.tie_breaker),
            ord => ord,
        }
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn tie_breaker(pos: GridPos) -> u64 {
    ((pos.y as u64) << 32) | (pos.x as u64 & 0xFFFF_FFFF)
}

fn manhattan_rank(a: GridPos, b: GridPos) -> Fixed {
    Fixed::from_num((a.x - b.x).abs() + (a.y - b.y).abs())
}

/// Bounded greedy best-first search; returns the first step tile of a
/// path from `start` to `goal`, or `None` within the budget.
fn first_search_step(
    map: &GameMap,
    start: GridPos,
    goal: GridPos,
    domain: MoveDomain,
) -> Option<GridPos> {
    let mut frontier = BinaryHeap::new();
    let mut came_from: HashMap<GridPos, GridPos> = HashMap::new();

    frontier.push(SearchNode {
        pos: start,
        rank: manhattan_rank(start, goal),
        tie_breaker: tie_breaker(start),
    });

    let mut expansions = 0;
    while let Some(node) = frontier.pop() {
        if node.pos == goal {
            // Walk back to the tile right after the start.
            let mut step = goal;
            while let Some(&prev) = came_from.get(&step) {
                if prev == start {
                    return Some(step);
                }
                step = prev;
            }
            return Some(goal);
        }

        expansions += 1;
        if expansions > SEARCH_BUDGET {
            return None;
        }

        for &(dx, dy) in &DIRECTIONS {
            let next = GridPos::new(node.pos.x + dx, node.pos.y + dy);
            if came_from.contains_key(&next) || next == start {
                continue;
            }
            if !passable_or_goal(map, next, goal, domain) {
                continue;
            }
            came_from.insert(next, node.pos);
            frontier.push(SearchNode {
                pos: next,
                rank: manhattan_rank(next, goal),
                tie_breaker: tie_breaker(next),
            });
        }
    }

    None
}

/// Resolve one movement step toward `goal` at `speed`.
///
/// Returns the unit's next position, or `None` when no step could be
/// found this tick (the caller clears the move order; no error).
#[must_use]
pub fn step_toward(
    map: &GameMap,
    from: Vec2Fixed,
    goal: Vec2Fixed,
    domain: MoveDomain,
    speed: Fixed,
) -> Option<Vec2Fixed> {
    let goal = map.clamp_world(goal);

    if domain == MoveDomain::Air {
        return Some(advance(from, goal, speed));
    }

    if direct_path_clear(map, from, goal, domain) {
        return Some(advance(from, goal, speed));
    }

    let start_tile = map.world_to_grid(from)?;
    let goal_tile = map.world_to_grid(goal)?;
    if start_tile == goal_tile {
        return Some(advance(from, goal, speed));
    }

    let step_tile = first_search_step(map, start_tile, goal_tile, domain)?;
    Some(advance(from, step_tile.center(), speed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::{Building, BuildingKind};

    fn world(x: i64, y: i64) -> Vec2Fixed {
        GridPos::new(x as i32, y as i32).center()
    }

    fn speed() -> Fixed {
        Fixed::from_num(1) / Fixed::from_num(10)
    }

    #[test]
    fn test_open_ground_advances_directly() {
        let map = GameMap::new(16, 16);
        let from = world(2, 2);
        let next = step_toward(&map, from, world(10, 2), MoveDomain::Land, speed()).unwrap();
        assert!(next.x > from.x);
        assert_eq!(next.y, from.y);
    }

    #[test]
    fn test_air_ignores_obstacles() {
        let mut map = GameMap::new(16, 16);
        for y in 0..16 {
            map.tile_mut(GridPos::new(8, y)).unwrap().terrain = Terrain::Water;
        }
        let from = world(2, 8);
        let next = step_toward(&map, from, world(14, 8), MoveDomain::Air, speed()).unwrap();
        assert!(next.x > from.x);
    }

    #[test]
    fn test_wall_forces_detour() {
        let mut map = GameMap::new(16, 16);
        // Vertical forest wall with a gap at the top.
        for y in 2..16 {
            map.tile_mut(GridPos::new(8, y)).unwrap().forest = 3;
        }
        let from = world(6, 8);
        let next = step_toward(&map, from, world(10, 8), MoveDomain::Land, speed()).unwrap();
        // The greedy step heads somewhere, not through the wall.
        assert_ne!(next, from);
        let tile = map.world_to_grid(next).unwrap();
        assert!(map.land_passable(tile));
    }

    #[test]
    fn test_naval_cannot_reach_land() {
        let mut map = GameMap::new(16, 16);
        for y in 0..16 {
            for x in 0..4 {
                map.tile_mut(GridPos::new(x, y)).unwrap().terrain = Terrain::Water;
            }
        }
        let from = world(1, 8);
        let step = step_toward(&map, from, world(12, 8), MoveDomain::Naval, speed());
        assert_eq!(step, None);
    }

    #[test]
    fn test_goal_occupancy_exemption() {
        let mut map = GameMap::new(16, 16);
        let origin = GridPos::new(8, 8);
        map.place_building(origin, Building::new(BuildingKind::House, 1));
        // Walking into the building's own tile is allowed; the tile is
        // occupied but terrain-passable.
        let from = world(8, 5);
        let next = step_toward(&map, from, origin.center(), MoveDomain::Land, speed()).unwrap();
        assert!(next.y > from.y);
    }

    #[test]
    fn test_unreachable_goal_within_budget_fails() {
        let mut map = GameMap::new(16, 16);
        // Seal off the right half completely.
        for y in 0..16 {
            map.tile_mut(GridPos::new(8, y)).unwrap().forest = 5;
        }
        let step = step_toward(&map, world(2, 8), world(14, 8), MoveDomain::Land, speed());
        assert_eq!(step, None);
    }

    #[test]
    fn test_determinism() {
        let mut map = GameMap::new(24, 24);
        for y in 4..20 {
            map.tile_mut(GridPos::new(12, y)).unwrap().forest = 2;
        }
        let a = step_toward(&map, world(8, 12), world(18, 12), MoveDomain::Land, speed());
        let b = step_toward(&map, world(8, 12), world(18, 12), MoveDomain::Land, speed());
        let c = step_toward(&map, world(8, 12), world(18, 12), MoveDomain::Land, speed());
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_arrives_exactly_when_close() {
        let map = GameMap::new(8, 8);
        let goal = world(3, 3);
        let from = goal - Vec2Fixed::new(Fixed::from_num(1) / Fixed::from_num(20), Fixed::ZERO);
        let next = step_toward(&map, from, goal, MoveDomain::Land, speed()).unwrap();
        assert_eq!(next, goal);
    }
}
