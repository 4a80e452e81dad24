//! The economy pass: per-tick income, storage clamping, and
//! population accounting.
//!
//! Income comes from three sources. Work-site buildings yield their
//! resource per arrived worker, scaled by the kind multiplier. Each
//! city center trickles gold scaled by its level. Fishing boats
//! standing on their spot yield a flat food rate. All income is
//! credited at the end of the pass and the stockpile is clamped to
//! the player's storage limits, so overflow is discarded.

use crate::behavior::work_arrival_radius;
use crate::combat::distance_to_building;
use crate::map::GameMap;
use crate::math::Fixed;
use crate::players::{Player, ResourceKind, ResourceStore, MIN_POPULATION_CAP};
use crate::units::{Task, TaskTarget, UnitRoster};

/// Resource units gathered per arrived worker per tick, before the
/// site's kind multiplier.
pub const BASE_GATHER_RATE_HUNDREDTHS: i64 = 5;

/// Gold per tick per city center level.
pub const CITY_GOLD_TRICKLE_HUNDREDTHS: i64 = 2;

/// Food per tick per fishing boat standing on its spot.
pub const FISHING_RATE_HUNDREDTHS: i64 = 8;

fn hundredths(n: i64) -> Fixed {
    Fixed::from_num(n) / Fixed::from_num(100)
}

/// Run the economy pass for one tick.
pub fn run_economy_pass(players: &mut [Player], roster: &UnitRoster, map: &GameMap) {
    let mut income = vec![ResourceStore::ZERO; players.len()];
    let mut housing = vec![0u32; players.len()];

    for (origin, building) in map.buildings() {
        let slot = building.owner as usize;
        if slot >= players.len() || !building.is_complete() {
            continue;
        }
        housing[slot] += building.kind.housing();

        if building.kind.is_city_family() {
            income[slot].add(
                ResourceKind::Gold,
                hundredths(CITY_GOLD_TRICKLE_HUNDREDTHS) * Fixed::from_num(i64::from(building.level)),
            );
        }

        let Some((resource, multiplier)) = building.kind.yields() else {
            continue;
        };
        let arrived = roster
            .iter()
            .filter(|u| {
                u.owner == building.owner
                    && matches!(u.task, Task::Gather(_))
                    && u.target == TaskTarget::Cell(origin)
                    && distance_to_building(map, u.pos, origin) <= work_arrival_radius()
            })
            .count() as u32;
        let workers = arrived.min(building.kind.worker_capacity());
        income[slot].add(
            resource,
            hundredths(BASE_GATHER_RATE_HUNDREDTHS)
                * multiplier
                * Fixed::from_num(i64::from(workers)),
        );
    }

    for unit in roster.iter() {
        let slot = unit.owner as usize;
        if slot >= players.len() {
            continue;
        }
        let TaskTarget::Cell(cell) = unit.target else {
            continue;
        };
        let on_spot = matches!(unit.task, Task::Gather(_))
            && map.tile(cell).is_some_and(|t| t.fishing_spot)
            && unit.pos.distance(cell.center()) <= work_arrival_radius();
        if on_spot {
            income[slot].add(ResourceKind::Food, hundredths(FISHING_RATE_HUNDREDTHS));
        }
    }

    let mut population = vec![0u32; players.len()];
    for unit in roster.iter() {
        let slot = unit.owner as usize;
        if slot < players.len() {
            population[slot] += 1;
        }
    }

    for (slot, player) in players.iter_mut().enumerate() {
        player.rates = income[slot];
        for kind in ResourceKind::ALL {
            player.stockpile.add(kind, income[slot].get(kind));
        }
        let storage = player.storage;
        player.stockpile.clamp_to(&storage);
        player.population = population[slot];
        player.population_cap =
            (player.age.base_population_cap() + housing[slot]).max(MIN_POPULATION_CAP);
    }
}
