//! Scenario fixtures shared by tests and benches.
//!
//! Each builder returns a fully-configured [`Simulation`] so tests
//! can focus on assertions. Builders take no arguments and are pure,
//! which the determinism harness relies on.

use era_core::prelude::*;
use proptest::prelude::*;

/// Place a building and finish its construction immediately.
///
/// # Panics
///
/// Panics if the footprint is blocked; fixtures use known-good
/// coordinates.
pub fn place_complete(sim: &mut Simulation, origin: GridPos, kind: BuildingKind, owner: PlayerId) {
    let placed = sim
        .map_mut()
        .place_building(origin, Building::new(kind, owner));
    assert!(placed, "fixture placement blocked at {origin}");
    if let Some((_, building)) = sim.map_mut().building_at_mut(origin) {
        building.advance_construction(Fixed::from_num(100));
    }
}

/// Give a player plenty of every resource.
pub fn fund_player(sim: &mut Simulation, player: PlayerId) {
    let stockpile = &mut sim.players_mut()[player as usize].stockpile;
    for kind in ResourceKind::ALL {
        stockpile.set(kind, Fixed::from_num(1000));
    }
}

/// Two-player economy scenario: each side has a city center, a farm,
/// and idle citizens that will auto-assign to the farm.
#[must_use]
pub fn economy_scenario() -> Simulation {
    let mut sim = Simulation::new(SimConfig {
        width: 48,
        height: 48,
        players: 2,
        seed: 42,
    });
    place_complete(&mut sim, GridPos::new(6, 6), BuildingKind::CityCenter, 0);
    place_complete(&mut sim, GridPos::new(11, 6), BuildingKind::Farm, 0);
    place_complete(&mut sim, GridPos::new(38, 38), BuildingKind::CityCenter, 1);
    place_complete(&mut sim, GridPos::new(33, 38), BuildingKind::Farm, 1);
    for i in 0..3 {
        sim.spawn_unit(UnitKind::Citizen, 0, GridPos::new(8, 10 + i).center());
        sim.spawn_unit(UnitKind::Citizen, 1, GridPos::new(40, 33 + i).center());
    }
    sim
}

/// Two squads of mixed military facing each other on open ground.
#[must_use]
pub fn combat_scenario() -> Simulation {
    let mut sim = Simulation::new(SimConfig {
        width: 48,
        height: 48,
        players: 2,
        seed: 7,
    });
    place_complete(&mut sim, GridPos::new(4, 4), BuildingKind::CityCenter, 0);
    place_complete(&mut sim, GridPos::new(41, 41), BuildingKind::CityCenter, 1);
    for i in 0..4 {
        sim.spawn_unit(UnitKind::Militia, 0, GridPos::new(20, 20 + i).center());
        sim.spawn_unit(UnitKind::Archer, 0, GridPos::new(19, 20 + i).center());
        sim.spawn_unit(UnitKind::Militia, 1, GridPos::new(26, 20 + i).center());
        sim.spawn_unit(UnitKind::Archer, 1, GridPos::new(27, 20 + i).center());
    }
    sim
}

/// A coastline with a dock, a fishing spot, and an idle fishing boat.
#[must_use]
pub fn naval_scenario() -> Simulation {
    let mut sim = Simulation::new(SimConfig {
        width: 32,
        height: 32,
        players: 1,
        seed: 3,
    });
    // Water column on the east side.
    for y in 0..32 {
        for x in 22..32 {
            sim.map_mut()
                .tile_mut(GridPos::new(x, y))
                .unwrap()
                .terrain = Terrain::Water;
        }
    }
    sim.map_mut()
        .tile_mut(GridPos::new(26, 10))
        .unwrap()
        .fishing_spot = true;
    place_complete(&mut sim, GridPos::new(22, 16), BuildingKind::Dock, 0);
    place_complete(&mut sim, GridPos::new(10, 16), BuildingKind::CityCenter, 0);
    sim.spawn_unit(UnitKind::FishingBoat, 0, GridPos::new(25, 20).center());
    sim
}

/// Strategy for an on-map grid position with a margin so footprints
/// stay in bounds.
pub fn arb_grid_pos(width: i32, height: i32) -> impl Strategy<Value = GridPos> {
    (2..width - 4, 2..height - 4).prop_map(|(x, y)| GridPos::new(x, y))
}

/// Strategy over all unit kinds.
pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
    prop_oneof![
        Just(UnitKind::Citizen),
        Just(UnitKind::FishingBoat),
        Just(UnitKind::Militia),
        Just(UnitKind::Archer),
        Just(UnitKind::Knight),
        Just(UnitKind::Cannon),
        Just(UnitKind::Warship),
        Just(UnitKind::Biplane),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_build() {
        let sim = economy_scenario();
        assert_eq!(sim.players().len(), 2);
        assert_eq!(sim.units().len(), 6);

        let sim = combat_scenario();
        assert_eq!(sim.units().len(), 16);

        let sim = naval_scenario();
        assert_eq!(sim.units().len(), 1);
    }
}
