use crate::geometry::Geometry;
use crate::math::{is_finite, Point2d};
use crate::settings::Settings;
use crate::vehicle::{TickContext, TrafficView, VehicleAttributes};
use crate::{Direction, TurnType, Vehicle, VehicleId, VehicleSet, VehicleState};
use cgmath::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// New vehicles are not placed within this distance of a vehicle on the same approach.
const SPAWN_CLEARANCE: f64 = 60.0;

/// Emitted once for each vehicle that leaves the simulated area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleCompleted {
    pub id: VehicleId,
    /// The order in which the vehicle was spawned, starting at 1.
    pub serial: u64,
    /// The side the vehicle arrived from.
    pub origin: Direction,
    /// The side the vehicle left towards.
    pub destination: Direction,
    /// The total time the vehicle spent waiting, in s.
    pub total_wait: f64,
}

/// A callback receiving completion notifications.
pub type CompletionHandler = Box<dyn FnMut(&VehicleCompleted)>;

/// Owns the vehicles and drives their creation, update and removal.
pub struct VehicleManager {
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The serial number given to the next vehicle.
    next_serial: u64,
    /// The time since the last spawn attempt, in s.
    spawn_timer: f64,
    rng: StdRng,
    /// Receives a notification for every completed vehicle.
    on_completed: Option<CompletionHandler>,
}

/// The position of a vehicle at the start of a tick.
#[derive(Clone, Copy, Debug)]
struct LaneEntry {
    id: VehicleId,
    approach: Direction,
    pos: Point2d,
}

/// Vehicle positions captured before any vehicle moves,
/// so every vehicle sees the same traffic regardless of update order.
struct TrafficSnapshot {
    entries: Vec<LaneEntry>,
}

impl From<&Vehicle> for VehicleCompleted {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id(),
            serial: vehicle.serial(),
            origin: vehicle.origin(),
            destination: vehicle.destination(),
            total_wait: vehicle.total_wait(),
        }
    }
}

impl TrafficSnapshot {
    fn capture(vehicles: &VehicleSet) -> Self {
        let entries = vehicles
            .values()
            .map(|vehicle| LaneEntry {
                id: vehicle.id(),
                approach: vehicle.approach(),
                pos: vehicle.position(),
            })
            .collect();
        Self { entries }
    }
}

impl TrafficView for TrafficSnapshot {
    fn vehicle_ahead(&self, vehicle: &Vehicle) -> Option<(VehicleId, f64)> {
        let forward = vehicle.approach().forward();
        self.entries
            .iter()
            .filter(|entry| entry.id != vehicle.id() && entry.approach == vehicle.approach())
            .map(|entry| (entry.id, (entry.pos - vehicle.position()).dot(forward)))
            .filter(|(_, gap)| *gap > 0.0)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

impl VehicleManager {
    /// Creates an empty manager. Without a seed the random number generator
    /// is seeded from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            vehicles: VehicleSet::default(),
            next_serial: 1,
            spawn_timer: 0.0,
            rng: make_rng(seed),
            on_completed: None,
        }
    }

    /// Registers the callback invoked once for every vehicle that completes.
    pub fn set_completion_handler(&mut self, handler: impl FnMut(&VehicleCompleted) + 'static) {
        self.on_completed = Some(Box::new(handler));
    }

    /// Removes every vehicle and restarts the serial numbers and spawn timer.
    pub fn reset(&mut self, seed: Option<u64>) {
        self.vehicles.clear();
        self.next_serial = 1;
        self.spawn_timer = 0.0;
        if seed.is_some() {
            self.rng = make_rng(seed);
        }
    }

    /// Advances every vehicle by one tick, spawning and retiring vehicles as needed.
    pub(crate) fn step(&mut self, ctx: &TickContext, settings: &Settings) {
        self.update_spawning(ctx, settings);
        self.update_vehicles(ctx);
        self.retire_completed();
    }

    /// Tries to spawn a vehicle with a random origin and turn.
    pub fn spawn_random(&mut self, geometry: &dyn Geometry, max_speed: f64) -> Option<VehicleId> {
        let origin: Direction = self.rng.gen();
        let turn: TurnType = self.rng.gen();
        self.spawn_vehicle(origin, turn, geometry, max_speed)
    }

    /// Tries to spawn a vehicle at the spawn point of `origin`.
    ///
    /// Fails if the spawn point is invalid or another vehicle on the same
    /// approach is too close to it.
    pub fn spawn_vehicle(
        &mut self,
        origin: Direction,
        turn: TurnType,
        geometry: &dyn Geometry,
        max_speed: f64,
    ) -> Option<VehicleId> {
        let pos = geometry.spawn_point(origin);
        if !is_finite(pos) {
            log::warn!("Invalid spawn point {:?} for {:?}", pos, origin);
            return None;
        }
        let blocked = self
            .vehicles
            .values()
            .any(|veh| veh.approach() == origin && veh.position().distance(pos) < SPAWN_CLEARANCE);
        if blocked {
            log::trace!("Spawn from {:?} blocked", origin);
            return None;
        }

        let serial = self.next_serial;
        self.next_serial += 1;
        let attributes = VehicleAttributes {
            origin,
            turn,
            max_speed,
        };
        let id = self
            .vehicles
            .insert_with_key(|id| Vehicle::new(id, serial, &attributes, pos));
        log::debug!("Spawned vehicle {} from {:?} turning {:?}", serial, origin, turn);
        Some(id)
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    /// Iterates over the vehicles in a consistent order.
    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// The number of vehicles being simulated.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// The waiting vehicles in the lane of `approach`.
    pub fn waiting_vehicles(&self, approach: Direction) -> impl Iterator<Item = &Vehicle> {
        self.vehicles
            .values()
            .filter(move |veh| veh.approach() == approach && veh.is_waiting())
    }

    /// Applies a new cruising speed to every vehicle.
    pub fn set_max_speed(&mut self, max_speed: f64) {
        for vehicle in self.vehicles.values_mut() {
            vehicle.set_max_speed(max_speed);
        }
    }

    /// Accumulates the spawn timer and attempts a spawn once per interval.
    fn update_spawning(&mut self, ctx: &TickContext, settings: &Settings) {
        let Some(interval) = settings.spawn_interval() else {
            return;
        };
        self.spawn_timer += ctx.dt;
        if self.spawn_timer >= interval {
            self.spawn_timer = 0.0;
            self.spawn_random(ctx.geometry, settings.max_speed);
        }
    }

    /// Updates each vehicle against the traffic as it stood at the start of the tick.
    fn update_vehicles(&mut self, ctx: &TickContext) {
        let traffic = TrafficSnapshot::capture(&self.vehicles);
        for vehicle in self.vehicles.values_mut() {
            vehicle.update(ctx, &traffic);
        }
    }

    /// Removes completed vehicles, notifying the completion handler of each.
    fn retire_completed(&mut self) {
        let handler = &mut self.on_completed;
        self.vehicles.retain(|_, vehicle| {
            if vehicle.state() != VehicleState::Completed {
                return true;
            }
            let event = VehicleCompleted::from(&*vehicle);
            log::debug!(
                "Vehicle {} from {:?} completed after waiting {:.1} s",
                event.serial,
                event.origin,
                event.total_wait
            );
            if let Some(handler) = handler.as_mut() {
                handler(&event);
            }
            false
        });
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::Crossroads;
    use crate::light::LightState;
    use crate::turns::TurnTable;
    use crate::PerDirection;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn spawn_clearance() {
        let geometry = Crossroads::default();
        let mut manager = VehicleManager::new(Some(1));
        let first = manager.spawn_vehicle(Direction::North, TurnType::Left, &geometry, 60.0);
        assert!(first.is_some());
        assert_eq!(
            manager.spawn_vehicle(Direction::North, TurnType::Straight, &geometry, 60.0),
            None
        );
        assert!(manager
            .spawn_vehicle(Direction::East, TurnType::Straight, &geometry, 60.0)
            .is_some());
        assert_eq!(manager.len(), 2);
        let serials: Vec<_> = manager.iter().map(|veh| veh.serial()).collect();
        assert_eq!(serials, [1, 2]);
    }

    #[test]
    fn snapshot_finds_nearest_ahead() {
        let geometry = Crossroads::default();
        let turns = TurnTable::new(&geometry);
        let lights = PerDirection::splat(LightState::Red);
        let settings = Settings {
            spawn_rate: 0.0,
            ..Default::default()
        };
        let mut manager = VehicleManager::new(Some(1));
        let mut ids = vec![];
        let mut now = 0.0;
        // Three vehicles on the west approach, each released once the last has moved clear.
        while ids.len() < 3 {
            if let Some(id) = manager.spawn_vehicle(Direction::West, TurnType::Straight, &geometry, 60.0) {
                ids.push(id);
            }
            now += 0.25;
            let ctx = TickContext {
                dt: 0.25,
                now,
                lights: &lights,
                geometry: &geometry,
                turns: &turns,
            };
            manager.step(&ctx, &settings);
        }

        let traffic = TrafficSnapshot::capture(&manager.vehicles);
        let last = manager.get(ids[2]).unwrap();
        let (ahead, gap) = traffic.vehicle_ahead(last).unwrap();
        assert_eq!(ahead, ids[1]);
        assert!(gap >= SPAWN_CLEARANCE);
        let first = manager.get(ids[0]).unwrap();
        assert_eq!(traffic.vehicle_ahead(first), None);
    }

    #[test]
    fn completion_reported_once() {
        let geometry = Crossroads::default();
        let turns = TurnTable::new(&geometry);
        let lights = PerDirection::splat(LightState::Green);
        let settings = Settings {
            spawn_rate: 0.0,
            ..Default::default()
        };
        let completed = Rc::new(RefCell::new(vec![]));
        let mut manager = VehicleManager::new(Some(1));
        manager.set_completion_handler({
            let completed = completed.clone();
            move |event| completed.borrow_mut().push(*event)
        });
        manager.spawn_vehicle(Direction::South, TurnType::Straight, &geometry, 60.0);

        let mut now = 0.0;
        for _ in 0..400 {
            now += 0.25;
            let ctx = TickContext {
                dt: 0.25,
                now,
                lights: &lights,
                geometry: &geometry,
                turns: &turns,
            };
            manager.step(&ctx, &settings);
        }
        assert!(manager.is_empty());
        let completed = completed.borrow();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].serial, 1);
        assert_eq!(completed[0].origin, Direction::South);
        assert_eq!(completed[0].destination, Direction::North);
        assert_eq!(completed[0].total_wait, 0.0);
    }

    #[test]
    fn seeded_spawns_repeat() {
        let geometry = Crossroads::default();
        let spawned = |seed| {
            let mut manager = VehicleManager::new(Some(seed));
            for _ in 0..20 {
                manager.spawn_random(&geometry, 60.0);
                manager.reset(None);
            }
            (0..8)
                .filter_map(|_| manager.spawn_random(&geometry, 60.0))
                .collect::<Vec<_>>()
                .into_iter()
                .map(|id| {
                    let veh = manager.get(id).unwrap();
                    (veh.origin(), veh.turn())
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(spawned(42), spawned(42));
    }
}
