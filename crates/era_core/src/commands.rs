//! The action API: player commands applied between ticks.
//!
//! Every command validates completely before mutating anything, so a
//! returned error always leaves the session unchanged. Orders carry
//! [`TaskOrigin::Player`] provenance and therefore stick until they
//! complete; auto-behaviors never replace them.

use tracing::debug;

use crate::behavior::tight_jitter;
use crate::buildings::{Building, BuildingKind};
use crate::error::{Result, SimError};
use crate::map::{GameMap, GridPos};
use crate::math::{Fixed, Vec2Fixed};
use crate::players::{Player, PlayerId, ResourceKind, ResourceStore};
use crate::simulation::Simulation;
use crate::units::{Task, TaskOrigin, TaskTarget, Unit, UnitId, UnitKind};

/// Tile coordinate of a world position without bounds checking, for
/// error reporting on out-of-map targets.
fn floor_pos(pos: Vec2Fixed) -> GridPos {
    let x: i64 = pos.x.floor().to_num();
    let y: i64 = pos.y.floor().to_num();
    GridPos::new(x as i32, y as i32)
}

/// First unmet cost entry, if any.
fn check_cost(stockpile: &ResourceStore, cost: &[(ResourceKind, i64)]) -> Result<()> {
    for &(kind, amount) in cost {
        let available = stockpile.get(kind);
        if available < Fixed::from_num(amount) {
            return Err(SimError::InsufficientResources {
                resource: kind.name(),
                required: amount,
                available: available.floor().to_num(),
            });
        }
    }
    Ok(())
}

impl Simulation {
    fn owned_unit(&self, player: PlayerId, id: UnitId) -> Result<&Unit> {
        self.units
            .get(id)
            .filter(|u| u.owner == player)
            .ok_or(SimError::UnitNotFound(id))
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players
            .get_mut(id as usize)
            .ok_or(SimError::PlayerNotFound(id))
    }

    /// Order units to a world position.
    pub fn cmd_move(&mut self, player: PlayerId, units: &[UnitId], dest: Vec2Fixed) -> Result<()> {
        self.player(player)?;
        let cell = self
            .map
            .world_to_grid(dest)
            .ok_or_else(|| SimError::OutOfBounds(floor_pos(dest)))?;
        for &id in units {
            self.owned_unit(player, id)?;
        }
        for &id in units {
            if let Some(unit) = self.units.get_mut(id) {
                unit.assign(Task::Move, TaskTarget::Cell(cell), TaskOrigin::Player, Some(dest));
            }
        }
        Ok(())
    }

    /// Order workers to gather at, or help construct, the building or
    /// fishing spot at `cell`. The requested task must match the site:
    /// build orders need an incomplete own building, gather orders a
    /// complete work site yielding that resource, or a fishing spot
    /// (food, boats only).
    pub fn cmd_assign_task(
        &mut self,
        player: PlayerId,
        units: &[UnitId],
        task: Task,
        cell: GridPos,
    ) -> Result<()> {
        self.player(player)?;
        if !self.map.in_bounds(cell) {
            return Err(SimError::OutOfBounds(cell));
        }

        let (origin, is_spot) = match self.map.building_at(cell) {
            Some((origin, building)) if building.owner == player => {
                match task {
                    Task::Build if !building.is_complete() => {}
                    Task::Build => {
                        return Err(SimError::InvalidOrder("building is already complete"));
                    }
                    Task::Gather(_) if !building.is_complete() => {
                        return Err(SimError::InvalidOrder("building is under construction"));
                    }
                    Task::Gather(resource) => match building.kind.yields() {
                        Some((yielded, _)) if yielded == resource => {}
                        Some(_) => {
                            return Err(SimError::InvalidOrder("site yields a different resource"));
                        }
                        None => return Err(SimError::InvalidOrder("building is not a work site")),
                    },
                    _ => return Err(SimError::InvalidOrder("task is not a work assignment")),
                }
                (origin, false)
            }
            Some(_) => return Err(SimError::InvalidOrder("cannot work an enemy building")),
            None => {
                let spot = self.map.tile(cell).is_some_and(|t| t.fishing_spot);
                if !spot {
                    return Err(SimError::BuildingNotFound(cell));
                }
                if task != Task::Gather(ResourceKind::Food) {
                    return Err(SimError::InvalidOrder("fishing spots only yield food"));
                }
                (cell, true)
            }
        };

        for &id in units {
            let unit = self.owned_unit(player, id)?;
            let suitable = match task {
                Task::Build => unit.kind == UnitKind::Citizen,
                Task::Gather(_) if is_spot => unit.kind == UnitKind::FishingBoat,
                Task::Gather(_) => unit.kind == UnitKind::Citizen,
                _ => false,
            };
            if !suitable {
                return Err(SimError::InvalidOrder("unit cannot work this site"));
            }
        }

        for &id in units {
            let dest = self.map.clamp_world(origin.center() + tight_jitter(&mut self.rng));
            if let Some(unit) = self.units.get_mut(id) {
                unit.assign(task, TaskTarget::Cell(origin), TaskOrigin::Player, Some(dest));
            }
        }
        Ok(())
    }

    /// Order units to attack an enemy unit or building.
    pub fn cmd_attack(
        &mut self,
        player: PlayerId,
        units: &[UnitId],
        target: TaskTarget,
    ) -> Result<()> {
        self.player(player)?;
        let target = match target {
            TaskTarget::Unit(id) => {
                self.units
                    .get(id)
                    .filter(|t| t.owner != player)
                    .ok_or(SimError::UnitNotFound(id))?;
                TaskTarget::Unit(id)
            }
            TaskTarget::Cell(cell) => {
                let (origin, _) = self
                    .map
                    .building_at(cell)
                    .filter(|(_, b)| b.owner != player)
                    .ok_or(SimError::BuildingNotFound(cell))?;
                TaskTarget::Cell(origin)
            }
            TaskTarget::None => return Err(SimError::InvalidOrder("attack needs a target")),
        };
        for &id in units {
            let unit = self.owned_unit(player, id)?;
            if unit.kind.damage() == 0 {
                return Err(SimError::InvalidOrder("unit is unarmed"));
            }
        }
        for &id in units {
            if let Some(unit) = self.units.get_mut(id) {
                unit.assign(Task::Attack, target, TaskOrigin::Player, None);
            }
        }
        Ok(())
    }

    /// Place a building at `origin`, paying its cost. Construction
    /// starts at zero and advances during the lifecycle pass.
    pub fn cmd_place_building(
        &mut self,
        player: PlayerId,
        origin: GridPos,
        kind: BuildingKind,
    ) -> Result<()> {
        let current = self.player(player)?.age;
        if current < kind.required_age() {
            return Err(SimError::AgeRequirementNotMet {
                required: kind.required_age().name(),
                current: current.name(),
            });
        }
        check_cost(&self.player(player)?.stockpile, kind.cost())?;
        for pos in GameMap::footprint_tiles(kind, origin) {
            if !self.map.in_bounds(pos) {
                return Err(SimError::OutOfBounds(pos));
            }
        }
        if !self.map.can_place(kind, origin) {
            return Err(SimError::FootprintBlocked(origin));
        }

        self.player_mut(player)?.stockpile.pay(kind.cost());
        self.map.place_building(origin, Building::new(kind, player));
        debug!(player, %origin, kind = kind.name(), "building placed");
        Ok(())
    }

    /// Queue a unit at a production building, paying its cost up
    /// front. Queued units still spawn if the population cap is
    /// reached later; only queueing itself is gated.
    pub fn cmd_queue_unit(
        &mut self,
        player: PlayerId,
        building_pos: GridPos,
        kind: UnitKind,
    ) -> Result<()> {
        let state = self.player(player)?;
        let (age, population, cap) = (state.age, state.population, state.population_cap);

        let (origin, building) = self
            .map
            .building_at(building_pos)
            .filter(|(_, b)| b.owner == player)
            .ok_or(SimError::BuildingNotFound(building_pos))?;
        if !building.is_complete() {
            return Err(SimError::InvalidOrder("building is under construction"));
        }
        if !building.kind.trains().contains(&kind) {
            return Err(SimError::CannotTrain(kind.name()));
        }
        if age < kind.required_age() {
            return Err(SimError::AgeRequirementNotMet {
                required: kind.required_age().name(),
                current: age.name(),
            });
        }
        if population >= cap {
            return Err(SimError::PopulationCapReached { cap });
        }
        check_cost(&self.player(player)?.stockpile, kind.cost())?;

        self.player_mut(player)?.stockpile.pay(kind.cost());
        if let Some((_, building)) = self.map.building_at_mut(origin) {
            building.queue.push_back(kind);
        }
        Ok(())
    }

    /// Advance to the next age, paying the advancement cost.
    pub fn cmd_advance_age(&mut self, player: PlayerId) -> Result<()> {
        let state = self.player(player)?;
        let next = state.age.next().ok_or(SimError::FinalAgeReached)?;
        let cost = state.age.advance_cost();
        check_cost(&state.stockpile, cost)?;

        let state = self.player_mut(player)?;
        state.stockpile.pay(cost);
        state.age = next;
        debug!(player, age = next.name(), "age advanced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Terrain;
    use crate::simulation::SimConfig;

    fn session() -> Simulation {
        Simulation::new(SimConfig::default())
    }

    fn rich(sim: &mut Simulation, player: PlayerId) {
        let stockpile = &mut sim.players[player as usize].stockpile;
        for kind in ResourceKind::ALL {
            stockpile.set(kind, Fixed::from_num(1000));
        }
    }

    #[test]
    fn test_move_requires_owned_unit() {
        let mut sim = session();
        let mine = sim.spawn_unit(UnitKind::Militia, 0, GridPos::new(5, 5).center());
        let theirs = sim.spawn_unit(UnitKind::Militia, 1, GridPos::new(6, 5).center());

        let dest = GridPos::new(20, 20).center();
        assert!(sim.cmd_move(0, &[mine], dest).is_ok());
        assert!(matches!(
            sim.cmd_move(0, &[theirs], dest),
            Err(SimError::UnitNotFound(_))
        ));

        let unit = sim.units().get(mine).unwrap();
        assert_eq!(unit.task, Task::Move);
        assert_eq!(unit.task_origin, TaskOrigin::Player);
    }

    #[test]
    fn test_move_out_of_bounds_rejected() {
        let mut sim = session();
        let id = sim.spawn_unit(UnitKind::Militia, 0, GridPos::new(5, 5).center());
        let dest = Vec2Fixed::new(Fixed::from_num(-3), Fixed::from_num(2));
        assert!(matches!(
            sim.cmd_move(0, &[id], dest),
            Err(SimError::OutOfBounds(_))
        ));
        assert_eq!(sim.units().get(id).unwrap().task, Task::Idle);
    }

    #[test]
    fn test_failed_batch_changes_nothing() {
        let mut sim = session();
        let a = sim.spawn_unit(UnitKind::Militia, 0, GridPos::new(5, 5).center());
        let err = sim.cmd_move(0, &[a, 999], GridPos::new(8, 8).center());
        assert!(err.is_err());
        assert_eq!(sim.units().get(a).unwrap().task, Task::Idle);
    }

    #[test]
    fn test_place_building_validates_and_pays() {
        let mut sim = session();
        let origin = GridPos::new(8, 8);
        assert!(sim.cmd_place_building(0, origin, BuildingKind::House).is_ok());

        let wood = sim.player(0).unwrap().stockpile.get(ResourceKind::Wood);
        assert_eq!(wood, Fixed::from_num(150 - 50));
        assert!(sim.map().building_at(origin).is_some());

        // Overlap is rejected and nothing is charged.
        let err = sim.cmd_place_building(0, origin, BuildingKind::House);
        assert!(matches!(err, Err(SimError::FootprintBlocked(_))));
        assert_eq!(
            sim.player(0).unwrap().stockpile.get(ResourceKind::Wood),
            wood
        );
    }

    #[test]
    fn test_place_building_age_gate() {
        let mut sim = session();
        rich(&mut sim, 0);
        let err = sim.cmd_place_building(0, GridPos::new(8, 8), BuildingKind::Fort);
        assert!(matches!(err, Err(SimError::AgeRequirementNotMet { .. })));
    }

    #[test]
    fn test_insufficient_resources_reported() {
        let mut sim = session();
        let err = sim.cmd_place_building(0, GridPos::new(8, 8), BuildingKind::CityCenter);
        match err {
            Err(SimError::InsufficientResources { resource, required, .. }) => {
                assert_eq!(resource, "wood");
                assert_eq!(required, 300);
            }
            other => panic!("expected InsufficientResources, got {other:?}"),
        }
    }

    #[test]
    fn test_queue_unit_checks_trainer_and_cap() {
        let mut sim = session();
        rich(&mut sim, 0);
        let barracks = GridPos::new(8, 8);
        sim.cmd_place_building(0, barracks, BuildingKind::Barracks).unwrap();
        let err = sim.cmd_queue_unit(0, barracks, UnitKind::Militia);
        assert!(matches!(err, Err(SimError::InvalidOrder(_))));

        sim.map_mut()
            .building_at_mut(barracks)
            .unwrap()
            .1
            .advance_construction(Fixed::from_num(100));
        assert!(sim.cmd_queue_unit(0, barracks, UnitKind::Militia).is_ok());
        assert!(matches!(
            sim.cmd_queue_unit(0, barracks, UnitKind::Citizen),
            Err(SimError::CannotTrain(_))
        ));

        sim.players[0].population = sim.players[0].population_cap;
        assert!(matches!(
            sim.cmd_queue_unit(0, barracks, UnitKind::Militia),
            Err(SimError::PopulationCapReached { .. })
        ));
    }

    #[test]
    fn test_assign_task_build_then_gather() {
        let mut sim = session();
        rich(&mut sim, 0);
        let farm = GridPos::new(8, 8);
        sim.cmd_place_building(0, farm, BuildingKind::Farm).unwrap();
        let worker = sim.spawn_unit(UnitKind::Citizen, 0, GridPos::new(6, 8).center());

        sim.cmd_assign_task(0, &[worker], Task::Build, farm).unwrap();
        assert_eq!(sim.units().get(worker).unwrap().task, Task::Build);

        sim.map_mut()
            .building_at_mut(farm)
            .unwrap()
            .1
            .advance_construction(Fixed::from_num(100));
        sim.cmd_assign_task(0, &[worker], Task::Gather(ResourceKind::Food), farm)
            .unwrap();
        assert_eq!(
            sim.units().get(worker).unwrap().task,
            Task::Gather(ResourceKind::Food)
        );
    }

    #[test]
    fn test_assign_task_rejects_mismatched_request() {
        let mut sim = session();
        rich(&mut sim, 0);
        let farm = GridPos::new(8, 8);
        sim.cmd_place_building(0, farm, BuildingKind::Farm).unwrap();
        let worker = sim.spawn_unit(UnitKind::Citizen, 0, GridPos::new(6, 8).center());

        // Gathering at a site still under construction.
        assert!(matches!(
            sim.cmd_assign_task(0, &[worker], Task::Gather(ResourceKind::Food), farm),
            Err(SimError::InvalidOrder(_))
        ));

        sim.map_mut()
            .building_at_mut(farm)
            .unwrap()
            .1
            .advance_construction(Fixed::from_num(100));

        // Building a finished site, the wrong resource, and a
        // non-work task are all rejected without touching the unit.
        assert!(matches!(
            sim.cmd_assign_task(0, &[worker], Task::Build, farm),
            Err(SimError::InvalidOrder(_))
        ));
        assert!(matches!(
            sim.cmd_assign_task(0, &[worker], Task::Gather(ResourceKind::Wood), farm),
            Err(SimError::InvalidOrder(_))
        ));
        assert!(matches!(
            sim.cmd_assign_task(0, &[worker], Task::Attack, farm),
            Err(SimError::InvalidOrder(_))
        ));
        assert_eq!(sim.units().get(worker).unwrap().task, Task::Idle);
    }

    #[test]
    fn test_assign_task_fishing_spot_needs_boat() {
        let mut sim = session();
        let spot = GridPos::new(5, 5);
        sim.map_mut().tile_mut(spot).unwrap().terrain = Terrain::Water;
        sim.map_mut().tile_mut(spot).unwrap().fishing_spot = true;

        let boat = sim.spawn_unit(UnitKind::FishingBoat, 0, GridPos::new(5, 6).center());
        let citizen = sim.spawn_unit(UnitKind::Citizen, 0, GridPos::new(4, 5).center());

        let task = Task::Gather(ResourceKind::Food);
        assert!(sim.cmd_assign_task(0, &[boat], task, spot).is_ok());
        assert!(matches!(
            sim.cmd_assign_task(0, &[citizen], task, spot),
            Err(SimError::InvalidOrder(_))
        ));
        // A spot only ever yields food.
        assert!(matches!(
            sim.cmd_assign_task(0, &[boat], Task::Gather(ResourceKind::Wood), spot),
            Err(SimError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_attack_validates_target_and_arms() {
        let mut sim = session();
        let soldier = sim.spawn_unit(UnitKind::Militia, 0, GridPos::new(5, 5).center());
        let boat = sim.spawn_unit(UnitKind::FishingBoat, 0, GridPos::new(5, 6).center());
        let enemy = sim.spawn_unit(UnitKind::Militia, 1, GridPos::new(9, 5).center());

        assert!(matches!(
            sim.cmd_attack(0, &[soldier], TaskTarget::Unit(soldier)),
            Err(SimError::UnitNotFound(_))
        ));
        assert!(matches!(
            sim.cmd_attack(0, &[boat], TaskTarget::Unit(enemy)),
            Err(SimError::InvalidOrder(_))
        ));
        assert!(sim.cmd_attack(0, &[soldier], TaskTarget::Unit(enemy)).is_ok());
        assert_eq!(sim.units().get(soldier).unwrap().task, Task::Attack);
    }

    #[test]
    fn test_attack_building_normalizes_to_origin() {
        let mut sim = session();
        rich(&mut sim, 1);
        sim.cmd_place_building(1, GridPos::new(8, 8), BuildingKind::House).unwrap();
        let soldier = sim.spawn_unit(UnitKind::Militia, 0, GridPos::new(5, 5).center());

        // Target a non-origin footprint tile.
        sim.cmd_attack(0, &[soldier], TaskTarget::Cell(GridPos::new(9, 9)))
            .unwrap();
        assert_eq!(
            sim.units().get(soldier).unwrap().target,
            TaskTarget::Cell(GridPos::new(8, 8))
        );
    }

    #[test]
    fn test_advance_age() {
        let mut sim = session();
        assert!(matches!(
            sim.cmd_advance_age(0),
            Err(SimError::InsufficientResources { .. })
        ));

        rich(&mut sim, 0);
        assert!(sim.cmd_advance_age(0).is_ok());
        assert_eq!(sim.player(0).unwrap().age, crate::players::Age::Classical);

        rich(&mut sim, 0);
        sim.cmd_advance_age(0).unwrap();
        rich(&mut sim, 0);
        sim.cmd_advance_age(0).unwrap();
        rich(&mut sim, 0);
        sim.cmd_advance_age(0).unwrap();
        assert!(matches!(sim.cmd_advance_age(0), Err(SimError::FinalAgeReached)));
    }
}
