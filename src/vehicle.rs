use self::turning::TurnManeuver;
use crate::geometry::Geometry;
use crate::light::LightState;
use crate::math::{is_finite, Point2d};
use crate::turns::TurnTable;
use crate::{Direction, PerDirection, TurnType, VehicleId};
use cgmath::prelude::*;

mod turning;

/// Vehicles stop when the vehicle ahead is closer than this.
const FOLLOWING_GAP: f64 = 35.0;

/// How close to the stop line a vehicle must be to stop for a red light.
const STOP_THRESHOLD: f64 = 30.0;

/// The acceleration while approaching the intersection, in units/s^2.
const APPROACH_ACCEL: f64 = 30.0;

/// The acceleration while crossing the intersection, in units/s^2.
const CROSSING_ACCEL: f64 = 40.0;

/// Vehicles may exceed their maximum speed by this factor while crossing.
const CROSSING_SPEED_FACTOR: f64 = 1.2;

/// How far beyond the simulated area a vehicle travels before it is removed.
const EXIT_MARGIN: f64 = 50.0;

/// The lifecycle of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VehicleState {
    /// Driving towards the stop line.
    Approaching,
    /// Stopped at a red light or behind another vehicle.
    Waiting,
    /// Moving through the intersection.
    Crossing,
    /// Driving away from the intersection.
    Exiting,
    /// Past the edge of the simulated area, awaiting removal.
    Completed,
}

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID.
    id: VehicleId,
    /// The order in which the vehicle was spawned, starting at 1.
    serial: u64,
    /// The side the vehicle arrived from.
    origin: Direction,
    /// The approach whose lane the vehicle currently occupies.
    /// Becomes the lane leaving towards the destination once a turn is complete.
    approach: Direction,
    /// The side the vehicle is leaving towards.
    destination: Direction,
    /// The manoeuvre performed in the intersection.
    turn: TurnType,
    /// The world space position.
    pos: Point2d,
    /// The heading in radians, in screen space.
    heading: f64,
    /// The current speed in units/s.
    speed: f64,
    /// The cruising speed in units/s.
    max_speed: f64,
    /// The lifecycle state.
    state: VehicleState,
    /// When the current stop began, in simulated s.
    wait_start: Option<f64>,
    /// The time spent waiting in completed stops, in s.
    wait_accum: f64,
    /// The total time spent waiting, including the current stop.
    total_wait: f64,
    /// Whether the vehicle is inside the intersection footprint.
    inside: bool,
    /// Whether the vehicle has ever been inside the footprint.
    entered: bool,
    /// The time spent crossing, in s.
    path_progress: f64,
    /// The turn in progress, if there is one.
    maneuver: Option<TurnManeuver>,
}

/// The attributes of a new vehicle.
#[derive(Clone, Copy, Debug)]
pub struct VehicleAttributes {
    /// The side the vehicle arrives from.
    pub origin: Direction,
    /// The manoeuvre to perform in the intersection.
    pub turn: TurnType,
    /// The cruising speed in units/s.
    pub max_speed: f64,
}

/// The state of the world shared by every vehicle during one tick.
pub(crate) struct TickContext<'a> {
    /// The time step in s.
    pub dt: f64,
    /// The simulated time at the end of the step, in s.
    pub now: f64,
    /// The signal shown to each approach.
    pub lights: &'a PerDirection<LightState>,
    pub geometry: &'a dyn Geometry,
    pub turns: &'a TurnTable,
}

/// A read-only view of the traffic around a vehicle.
pub trait TrafficView {
    /// Finds the nearest vehicle ahead of `vehicle` in the same lane,
    /// along with the distance to it.
    fn vehicle_ahead(&self, vehicle: &Vehicle) -> Option<(VehicleId, f64)>;
}

impl Vehicle {
    /// Creates a new vehicle at `pos`, facing into the intersection.
    pub(crate) fn new(id: VehicleId, serial: u64, attributes: &VehicleAttributes, pos: Point2d) -> Self {
        let origin = attributes.origin;
        Self {
            id,
            serial,
            origin,
            approach: origin,
            destination: origin.destination(attributes.turn),
            turn: attributes.turn,
            pos,
            heading: origin.inbound_heading(),
            speed: 0.0,
            max_speed: attributes.max_speed,
            state: VehicleState::Approaching,
            wait_start: None,
            wait_accum: 0.0,
            total_wait: 0.0,
            inside: false,
            entered: false,
            path_progress: 0.0,
            maneuver: None,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The order in which the vehicle was spawned, starting at 1.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// The side the vehicle arrived from.
    pub fn origin(&self) -> Direction {
        self.origin
    }

    /// The approach whose lane the vehicle currently occupies.
    pub fn approach(&self) -> Direction {
        self.approach
    }

    /// The side the vehicle is leaving towards.
    pub fn destination(&self) -> Direction {
        self.destination
    }

    pub fn turn(&self) -> TurnType {
        self.turn
    }

    /// The world space position of the vehicle.
    pub fn position(&self) -> Point2d {
        self.pos
    }

    /// The heading in radians, in screen space.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// The current speed in units/s.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// The cruising speed in units/s.
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    /// Whether the vehicle is stopped.
    pub fn is_waiting(&self) -> bool {
        self.state == VehicleState::Waiting
    }

    /// The total time spent waiting so far, in s.
    pub fn total_wait(&self) -> f64 {
        self.total_wait
    }

    /// When the current stop began, if the vehicle is waiting.
    pub fn wait_start(&self) -> Option<f64> {
        self.wait_start
    }

    /// Whether the vehicle is inside the intersection footprint.
    pub fn is_inside_intersection(&self) -> bool {
        self.inside
    }

    /// The time spent crossing the intersection, in s.
    pub fn path_progress(&self) -> f64 {
        self.path_progress
    }

    /// Whether a turn is in progress.
    pub fn is_turning(&self) -> bool {
        self.maneuver.is_some()
    }

    pub(crate) fn set_max_speed(&mut self, max_speed: f64) {
        self.max_speed = max_speed;
    }

    /// Advances the vehicle by one tick.
    pub(crate) fn update(&mut self, ctx: &TickContext, traffic: &dyn TrafficView) {
        match self.state {
            VehicleState::Approaching => self.update_approaching(ctx, traffic),
            VehicleState::Waiting => self.update_waiting(ctx, traffic),
            VehicleState::Crossing => self.update_crossing(ctx),
            VehicleState::Exiting => self.update_exiting(ctx),
            VehicleState::Completed => {}
        }
    }

    fn update_approaching(&mut self, ctx: &TickContext, traffic: &dyn TrafficView) {
        let Some(dist) = self.stop_line_distance(ctx.geometry) else {
            return;
        };
        let red = !ctx.lights[self.approach].permits_entry();
        if self.is_blocked(traffic) || (red && (0.0..=STOP_THRESHOLD).contains(&dist)) {
            self.start_waiting(ctx.now);
            return;
        }

        self.speed = f64::min(self.max_speed, self.speed + APPROACH_ACCEL * ctx.dt);
        self.advance(ctx.dt);
        self.update_footprint(ctx.geometry);
        if self.inside {
            self.state = VehicleState::Crossing;
        }
    }

    fn update_waiting(&mut self, ctx: &TickContext, traffic: &dyn TrafficView) {
        self.speed = 0.0;
        if let Some(start) = self.wait_start {
            self.total_wait = self.wait_accum + (ctx.now - start);
        }
        if self.is_blocked(traffic) {
            return;
        }
        let Some(dist) = self.stop_line_distance(ctx.geometry) else {
            return;
        };

        let at_line = dist <= STOP_THRESHOLD;
        if ctx.lights[self.approach].permits_entry() {
            self.stop_waiting(ctx.now);
            self.state = if at_line {
                VehicleState::Crossing
            } else {
                VehicleState::Approaching
            };
        } else if !at_line {
            self.stop_waiting(ctx.now);
            self.state = VehicleState::Approaching;
        }
    }

    fn update_crossing(&mut self, ctx: &TickContext) {
        self.speed = f64::min(
            CROSSING_SPEED_FACTOR * self.max_speed,
            self.speed + CROSSING_ACCEL * ctx.dt,
        );
        self.path_progress += ctx.dt;

        if self.inside && self.maneuver.is_none() && self.needs_turn() {
            match ctx.turns.get(self.origin, self.turn) {
                Some(path) => {
                    self.maneuver = Some(TurnManeuver::begin(*path, self.pos, self.approach.forward()));
                }
                None => {
                    log::warn!("Vehicle {} has no path from {:?}", self.serial, self.origin);
                    return;
                }
            }
        }

        match self.maneuver.as_mut() {
            Some(maneuver) => {
                let sample = maneuver.advance(self.speed * ctx.dt);
                if maneuver.is_complete() {
                    self.finish_turn();
                } else {
                    self.pos = sample.pos;
                    self.heading = sample.heading;
                }
            }
            None => self.advance(ctx.dt),
        }

        self.update_footprint(ctx.geometry);
        if self.entered && !self.inside && self.maneuver.is_none() && self.path_progress > 0.0 {
            self.state = VehicleState::Exiting;
        }
    }

    fn update_exiting(&mut self, ctx: &TickContext) {
        let bounds = ctx.geometry.bounds().expand(EXIT_MARGIN);
        if !bounds.is_finite() {
            log::warn!("Invalid bounds {:?}, vehicle {} not moved", bounds, self.serial);
            return;
        }
        self.speed = self.max_speed;
        self.advance(ctx.dt);
        self.update_footprint(ctx.geometry);
        if !bounds.contains(self.pos) {
            self.state = VehicleState::Completed;
        }
    }

    /// The signed distance to the stop line of the current approach,
    /// positive while the line is still ahead.
    fn stop_line_distance(&self, geometry: &dyn Geometry) -> Option<f64> {
        let line = geometry.stop_line(self.approach);
        if !line.is_finite() || !is_finite(self.pos) {
            log::warn!(
                "Invalid stop line {:?} for vehicle {}, not moved",
                line,
                self.serial
            );
            return None;
        }
        Some((line.start - self.pos).dot(self.approach.forward()))
    }

    fn is_blocked(&self, traffic: &dyn TrafficView) -> bool {
        matches!(traffic.vehicle_ahead(self), Some((_, gap)) if gap < FOLLOWING_GAP)
    }

    fn needs_turn(&self) -> bool {
        self.turn != TurnType::Straight && self.approach == self.origin
    }

    /// Moves along the current lane at the current speed.
    fn advance(&mut self, dt: f64) {
        self.pos += self.speed * dt * self.approach.forward();
    }

    fn update_footprint(&mut self, geometry: &dyn Geometry) {
        self.inside = geometry.is_inside_intersection(self.pos);
        self.entered |= self.inside;
    }

    /// Snaps the vehicle onto the lane leaving towards its destination.
    fn finish_turn(&mut self) {
        if let Some(maneuver) = self.maneuver.take() {
            self.pos = maneuver.end();
        }
        self.heading = self.destination.outbound_heading();
        self.approach = self.destination.opposite();
    }

    fn start_waiting(&mut self, now: f64) {
        self.state = VehicleState::Waiting;
        self.speed = 0.0;
        self.wait_start = Some(now);
        self.total_wait = self.wait_accum;
    }

    fn stop_waiting(&mut self, now: f64) {
        if let Some(start) = self.wait_start.take() {
            self.wait_accum += now - start;
            self.total_wait = self.wait_accum;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::{Crossroads, Rect};
    use crate::math::LineSegment2d;
    use assert_approx_eq::assert_approx_eq;

    const DT: f64 = 0.25;

    struct OpenRoad;

    impl TrafficView for OpenRoad {
        fn vehicle_ahead(&self, _: &Vehicle) -> Option<(VehicleId, f64)> {
            None
        }
    }

    /// Reports another vehicle at a fixed distance ahead.
    struct Queue(f64);

    impl TrafficView for Queue {
        fn vehicle_ahead(&self, _: &Vehicle) -> Option<(VehicleId, f64)> {
            Some((VehicleId::default(), self.0))
        }
    }

    /// Crossroads whose stop lines cannot be computed.
    struct BrokenStopLines(Crossroads);

    impl Geometry for BrokenStopLines {
        fn centre(&self) -> Point2d {
            self.0.centre()
        }
        fn road_width(&self) -> f64 {
            self.0.road_width()
        }
        fn lane_offset(&self) -> f64 {
            self.0.lane_offset()
        }
        fn bounds(&self) -> Rect {
            self.0.bounds()
        }
        fn stop_line(&self, _: Direction) -> LineSegment2d {
            let nan = Point2d::new(f64::NAN, f64::NAN);
            LineSegment2d::from_ends(nan, nan)
        }
        fn spawn_point(&self, approach: Direction) -> Point2d {
            self.0.spawn_point(approach)
        }
        fn exit_point(&self, direction: Direction) -> Point2d {
            self.0.exit_point(direction)
        }
        fn is_inside_intersection(&self, point: Point2d) -> bool {
            self.0.is_inside_intersection(point)
        }
    }

    fn vehicle(origin: Direction, turn: TurnType, pos: Point2d) -> Vehicle {
        let attributes = VehicleAttributes {
            origin,
            turn,
            max_speed: 60.0,
        };
        Vehicle::new(VehicleId::default(), 1, &attributes, pos)
    }

    /// Runs the vehicle until it completes, checking `each` after every tick.
    fn drive_to_completion(vehicle: &mut Vehicle, mut each: impl FnMut(&Vehicle)) {
        let geometry = Crossroads::default();
        let turns = TurnTable::new(&geometry);
        let lights = PerDirection::splat(LightState::Green);
        let mut now = 0.0;
        for _ in 0..1000 {
            now += DT;
            let ctx = TickContext {
                dt: DT,
                now,
                lights: &lights,
                geometry: &geometry,
                turns: &turns,
            };
            vehicle.update(&ctx, &OpenRoad);
            each(vehicle);
            if vehicle.state() == VehicleState::Completed {
                return;
            }
        }
        panic!("vehicle never completed: {:?}", vehicle);
    }

    fn tick(vehicle: &mut Vehicle, light: LightState, now: f64, traffic: &dyn TrafficView) {
        let geometry = Crossroads::default();
        let turns = TurnTable::new(&geometry);
        let lights = PerDirection::splat(light);
        let ctx = TickContext {
            dt: DT,
            now,
            lights: &lights,
            geometry: &geometry,
            turns: &turns,
        };
        vehicle.update(&ctx, traffic);
    }

    #[test]
    fn stops_for_red_at_threshold() {
        // The stop line of the north approach is at y = 260.
        let mut veh = vehicle(Direction::North, TurnType::Straight, Point2d::new(380.0, 230.0));
        tick(&mut veh, LightState::Red, 1.0, &OpenRoad);
        assert_eq!(veh.state(), VehicleState::Waiting);
        assert_eq!(veh.position(), Point2d::new(380.0, 230.0));
        assert_eq!(veh.wait_start(), Some(1.0));
    }

    #[test]
    fn keeps_approaching_red_from_afar() {
        let mut veh = vehicle(Direction::North, TurnType::Straight, Point2d::new(380.0, 229.0));
        tick(&mut veh, LightState::Red, 1.0, &OpenRoad);
        assert_eq!(veh.state(), VehicleState::Approaching);
        assert_approx_eq!(veh.speed(), 7.5);
        assert!(veh.position().y > 229.0);
    }

    #[test]
    fn accumulates_wait_over_stops() {
        let mut veh = vehicle(Direction::East, TurnType::Straight, Point2d::new(470.0, 280.0));
        tick(&mut veh, LightState::Red, 1.0, &OpenRoad);
        tick(&mut veh, LightState::Red, 3.0, &OpenRoad);
        assert_eq!(veh.total_wait(), 2.0);

        // Released by green while at the stop line.
        tick(&mut veh, LightState::Green, 4.0, &OpenRoad);
        assert_eq!(veh.state(), VehicleState::Crossing);
        assert_eq!(veh.wait_start(), None);
        assert_eq!(veh.total_wait(), 3.0);
    }

    #[test]
    fn waits_behind_vehicle_ahead() {
        let mut veh = vehicle(Direction::South, TurnType::Left, Point2d::new(420.0, 500.0));
        tick(&mut veh, LightState::Green, 1.0, &Queue(34.0));
        assert_eq!(veh.state(), VehicleState::Waiting);
        tick(&mut veh, LightState::Green, 2.0, &Queue(34.0));
        assert_eq!(veh.state(), VehicleState::Waiting);
        assert_eq!(veh.total_wait(), 1.0);

        // Far from the stop line, so the queue clearing resumes the approach.
        tick(&mut veh, LightState::Green, 3.0, &Queue(35.0));
        assert_eq!(veh.state(), VehicleState::Approaching);
        assert_eq!(veh.total_wait(), 2.0);
    }

    #[test]
    fn straight_keeps_heading_and_lane() {
        let spawn = Crossroads::default().spawn_point(Direction::North);
        let mut veh = vehicle(Direction::North, TurnType::Straight, spawn);
        let mut states = vec![];
        drive_to_completion(&mut veh, |veh| {
            assert_eq!(veh.heading(), Direction::North.inbound_heading());
            assert_eq!(veh.position().x, 380.0);
            if states.last() != Some(&veh.state()) {
                states.push(veh.state());
            }
        });
        assert_eq!(
            states,
            [
                VehicleState::Approaching,
                VehicleState::Crossing,
                VehicleState::Exiting,
                VehicleState::Completed
            ]
        );
        assert!(veh.position().y > 650.0);
        assert_eq!(veh.total_wait(), 0.0);
    }

    #[test]
    fn turn_ends_on_outbound_lane() {
        let spawn = Crossroads::default().spawn_point(Direction::North);
        let mut veh = vehicle(Direction::North, TurnType::Right, spawn);
        assert_eq!(veh.destination(), Direction::East);
        let mut turned = false;
        drive_to_completion(&mut veh, |veh| {
            if veh.approach() != Direction::North && !turned {
                turned = true;
                assert_eq!(veh.position(), Point2d::new(440.0, 320.0));
            }
        });
        assert!(turned);
        assert_eq!(veh.approach(), Direction::West);
        assert_eq!(veh.heading(), Direction::East.outbound_heading());
        assert_eq!(veh.position().y, 320.0);
        assert!(veh.position().x > 850.0);
    }

    #[test]
    fn every_turn_completes() {
        let geometry = Crossroads::default();
        for origin in Direction::ALL {
            for turn in TurnType::ALL {
                let mut veh = vehicle(origin, turn, geometry.spawn_point(origin));
                drive_to_completion(&mut veh, |_| {});
                assert_eq!(veh.heading(), veh.destination().outbound_heading());
                assert!(veh.path_progress() > 0.0);
            }
        }
    }

    #[test]
    fn invalid_geometry_leaves_vehicle_in_place() {
        let geometry = BrokenStopLines(Crossroads::default());
        let turns = TurnTable::new(&geometry);
        let lights = PerDirection::splat(LightState::Green);
        let ctx = TickContext {
            dt: DT,
            now: 1.0,
            lights: &lights,
            geometry: &geometry,
            turns: &turns,
        };
        let mut veh = vehicle(Direction::West, TurnType::Straight, Point2d::new(0.0, 320.0));
        veh.update(&ctx, &OpenRoad);
        assert_eq!(veh.position(), Point2d::new(0.0, 320.0));
        assert_eq!(veh.state(), VehicleState::Approaching);
    }
}
