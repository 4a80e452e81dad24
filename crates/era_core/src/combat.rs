//! Damage bookkeeping.
//!
//! Attacks resolved during the unit pass never mutate their targets
//! directly; they record damage into a [`DamageLedger`]. The ledger is
//! applied once after every unit has acted, so the outcome of a tick
//! does not depend on unit processing order. Unit damage is applied
//! before the death sweep, building damage after it.
//!
//! Territory attrition is recorded through the same ledger.

use std::collections::HashMap;

use crate::map::{GameMap, GridPos};
use crate::math::{Fixed, Vec2Fixed};
use crate::players::PlayerId;
use crate::territory::TerritoryMap;
use crate::units::{UnitId, UnitRoster};

/// Ticks between attrition pulses for units in hostile territory.
pub const ATTRITION_INTERVAL: u64 = 20;

/// Damage per attrition pulse.
pub const ATTRITION_DAMAGE: u32 = 1;

/// Accumulated damage of one tick, keyed by victim.
#[derive(Debug, Default)]
pub struct DamageLedger {
    unit_damage: HashMap<UnitId, u32>,
    building_damage: HashMap<GridPos, u32>,
}

impl DamageLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record damage against a unit.
    pub fn record_unit(&mut self, id: UnitId, amount: u32) {
        *self.unit_damage.entry(id).or_insert(0) += amount;
    }

    /// Record damage against the building at `origin`.
    pub fn record_building(&mut self, origin: GridPos, amount: u32) {
        *self.building_damage.entry(origin).or_insert(0) += amount;
    }

    /// Apply all recorded unit damage, saturating at zero health.
    /// Entries for units that already left the roster are dropped.
    pub fn apply_to_units(&mut self, roster: &mut UnitRoster) {
        let mut ids: Vec<_> = self.unit_damage.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let amount = self.unit_damage[&id];
            if let Some(unit) = roster.get_mut(id) {
                unit.health = unit.health.saturating_sub(amount);
            }
        }
        self.unit_damage.clear();
    }

    /// Apply all recorded building damage and remove destroyed
    /// buildings from the grid. Returns the removed origins with
    /// their former owners, in origin order.
    pub fn apply_to_buildings(&mut self, map: &mut GameMap) -> Vec<(GridPos, PlayerId)> {
        let mut origins: Vec<_> = self.building_damage.keys().copied().collect();
        origins.sort_unstable();

        let mut destroyed = Vec::new();
        for origin in origins {
            let amount = self.building_damage[&origin];
            let Some((_, building)) = map.building_at_mut(origin) else {
                continue;
            };
            building.apply_damage(amount);
            if building.is_destroyed() {
                let owner = building.owner;
                map.remove_building(origin);
                destroyed.push((origin, owner));
            }
        }
        self.building_damage.clear();
        destroyed
    }
}

/// Record one attrition pulse against every unit standing in another
/// player's territory. Runs only on interval ticks.
pub fn record_attrition(
    ledger: &mut DamageLedger,
    roster: &UnitRoster,
    territory: &TerritoryMap,
    tick: u64,
) {
    if tick == 0 || tick % ATTRITION_INTERVAL != 0 {
        return;
    }
    for id in roster.sorted_ids() {
        let Some(unit) = roster.get(id) else { continue };
        if let Some(owner) = territory.owner_at(unit.pos) {
            if owner != unit.owner {
                ledger.record_unit(id, ATTRITION_DAMAGE);
            }
        }
    }
}

/// Distance from a world position to the nearest footprint tile
/// center of the building at `origin`.
#[must_use]
pub fn distance_to_building(map: &GameMap, pos: Vec2Fixed, origin: GridPos) -> Fixed {
    let Some((_, building)) = map.building_at(origin) else {
        return Fixed::MAX;
    };
    let mut best = Fixed::MAX;
    for tile in GameMap::footprint_tiles(building.kind, origin) {
        let d = pos.distance(tile.center());
        if d < best {
            best = d;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::{Building, BuildingKind};
    use crate::units::{Unit, UnitKind};

    fn unit_at(roster: &mut UnitRoster, kind: UnitKind, owner: PlayerId, x: i32, y: i32) -> UnitId {
        roster.spawn(Unit::new(kind, owner, GridPos::new(x, y).center(), 0))
    }

    #[test]
    fn test_damage_is_deferred_and_merged() {
        let mut roster = UnitRoster::new();
        let victim = unit_at(&mut roster, UnitKind::Militia, 0, 4, 4);

        let mut ledger = DamageLedger::new();
        ledger.record_unit(victim, 6);
        ledger.record_unit(victim, 5);
        // Nothing applied until the ledger is flushed.
        assert_eq!(roster.get(victim).unwrap().health, 40);

        ledger.apply_to_units(&mut roster);
        assert_eq!(roster.get(victim).unwrap().health, 29);
    }

    #[test]
    fn test_unit_damage_saturates() {
        let mut roster = UnitRoster::new();
        let victim = unit_at(&mut roster, UnitKind::Citizen, 0, 1, 1);

        let mut ledger = DamageLedger::new();
        ledger.record_unit(victim, 10_000);
        ledger.apply_to_units(&mut roster);
        assert!(roster.get(victim).unwrap().is_dead());
    }

    #[test]
    fn test_stale_entries_are_dropped() {
        let mut roster = UnitRoster::new();
        let victim = unit_at(&mut roster, UnitKind::Citizen, 0, 1, 1);
        roster.remove(victim);

        let mut ledger = DamageLedger::new();
        ledger.record_unit(victim, 5);
        ledger.apply_to_units(&mut roster);
        assert!(roster.is_empty());
    }

    #[test]
    fn test_destroyed_buildings_leave_the_grid() {
        let mut map = GameMap::new(16, 16);
        let origin = GridPos::new(4, 4);
        map.place_building(origin, Building::new(BuildingKind::Road, 1));

        let mut ledger = DamageLedger::new();
        ledger.record_building(origin, 49);
        assert_eq!(ledger.apply_to_buildings(&mut map), vec![]);
        assert_eq!(map.building_at(origin).unwrap().1.health, 1);

        ledger.record_building(origin, 1);
        assert_eq!(ledger.apply_to_buildings(&mut map), vec![(origin, 1)]);
        assert!(map.building_at(origin).is_none());
        assert!(!map.is_occupied(origin));
    }

    #[test]
    fn test_attrition_hits_only_intruders_on_interval() {
        let mut map = GameMap::new(32, 32);
        map.place_building(GridPos::new(10, 10), Building::new(BuildingKind::CityCenter, 0));
        let territory = TerritoryMap::extract(&map);

        let mut roster = UnitRoster::new();
        let intruder = unit_at(&mut roster, UnitKind::Militia, 1, 14, 10);
        let resident = unit_at(&mut roster, UnitKind::Militia, 0, 14, 12);
        let outsider = unit_at(&mut roster, UnitKind::Militia, 1, 30, 30);

        let mut ledger = DamageLedger::new();
        record_attrition(&mut ledger, &roster, &territory, ATTRITION_INTERVAL - 1);
        ledger.apply_to_units(&mut roster);
        assert_eq!(roster.get(intruder).unwrap().health, 40);

        record_attrition(&mut ledger, &roster, &territory, ATTRITION_INTERVAL);
        ledger.apply_to_units(&mut roster);
        assert_eq!(
            roster.get(intruder).unwrap().health,
            40 - ATTRITION_DAMAGE
        );
        assert_eq!(roster.get(resident).unwrap().health, 40);
        assert_eq!(roster.get(outsider).unwrap().health, 40);
    }

    #[test]
    fn test_distance_to_building_uses_nearest_tile() {
        let mut map = GameMap::new(16, 16);
        let origin = GridPos::new(4, 4);
        map.place_building(origin, Building::new(BuildingKind::CityCenter, 0));

        // From the east, tile (6,4) is nearer than the origin (4,4).
        let pos = GridPos::new(9, 4).center();
        let d = distance_to_building(&map, pos, origin);
        assert_eq!(d, Fixed::from_num(3));
    }
}
