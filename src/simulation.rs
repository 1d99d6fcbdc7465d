#[cfg(feature = "debug")]
use crate::debug::take_debug_frame;
use crate::geometry::{Crossroads, Geometry};
use crate::light::{LightState, SignalController};
use crate::manager::{VehicleCompleted, VehicleManager};
use crate::sensor::{SensorSnapshot, SensorSystem};
use crate::settings::{ControlMode, Settings};
use crate::turns::TurnTable;
use crate::vehicle::TickContext;
use crate::{Direction, PerDirection, TurnType, Vehicle, VehicleId};

/// A simulation of one signalised intersection.
pub struct Simulation {
    /// The layout of the intersection.
    geometry: Box<dyn Geometry>,
    /// The paths through the intersection, derived from the geometry.
    turns: TurnTable,
    /// The parameters of the run.
    settings: Settings,
    /// The traffic signals.
    signals: SignalController,
    /// The vehicles being simulated.
    vehicles: VehicleManager,
    /// The detectors on each approach.
    sensors: SensorSystem,
    /// The most recent detector readings.
    snapshot: SensorSnapshot,
    /// The simulated time in s.
    time: f64,
    /// The current frame of simulation.
    frame: usize,
    /// Debugging information from the previously simulated frame.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Simulation {
    /// Creates a new simulation of the standard crossroads.
    pub fn new(settings: Settings) -> Self {
        Self::with_geometry(settings, Crossroads::default())
    }

    /// Creates a new simulation with a custom intersection layout.
    pub fn with_geometry(settings: Settings, geometry: impl Geometry + 'static) -> Self {
        let turns = TurnTable::new(&geometry);
        Self {
            geometry: Box::new(geometry),
            turns,
            signals: SignalController::new(settings.mode),
            vehicles: VehicleManager::new(settings.seed),
            sensors: SensorSystem::new(settings.detector_distance),
            snapshot: SensorSnapshot::default(),
            time: 0.0,
            frame: 0,
            settings,
            #[cfg(feature = "debug")]
            debug: serde_json::Value::Null,
        }
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// The signals are updated first, then every vehicle sees the resulting
    /// lights. The detectors are read at the end of the tick, and the
    /// controller acts on that reading in the next one.
    pub fn step(&mut self, dt: f64) {
        if !dt.is_finite() || dt < 0.0 {
            log::warn!("Ignoring invalid time step {}", dt);
            return;
        }
        self.time += dt;
        self.update_signals(dt);
        self.update_vehicles(dt);
        self.update_sensors();
        self.frame += 1;

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }
    }

    /// Advances the signal controller using the last detector readings.
    fn update_signals(&mut self, dt: f64) {
        let timings = self.settings.timings();
        self.signals.step(dt, &timings, &self.snapshot);
    }

    /// Spawns, moves and retires vehicles.
    fn update_vehicles(&mut self, dt: f64) {
        let lights = *self.signals.lights();
        let ctx = TickContext {
            dt,
            now: self.time,
            lights: &lights,
            geometry: self.geometry.as_ref(),
            turns: &self.turns,
        };
        self.vehicles.step(&ctx, &self.settings);
    }

    /// Reads the detectors.
    fn update_sensors(&mut self) {
        self.snapshot = self
            .sensors
            .scan(self.vehicles.iter(), self.time, self.geometry.as_ref());
    }

    /// Switches the signal control policy, restarting the signals.
    pub fn set_mode(&mut self, mode: ControlMode) {
        self.settings.mode = mode;
        self.signals.set_mode(mode);
        self.snapshot = SensorSnapshot::default();
    }

    /// Applies new settings. Timings and spawn rate take effect from the
    /// next tick, and the new cruising speed applies to existing vehicles.
    /// A change of mode restarts the signals.
    pub fn update_settings(&mut self, settings: Settings) {
        if settings.mode != self.signals.mode() {
            self.set_mode(settings.mode);
        }
        if settings.max_speed != self.settings.max_speed {
            self.vehicles.set_max_speed(settings.max_speed);
        }
        self.sensors.set_detector_distance(settings.detector_distance);
        self.settings = settings;
    }

    /// Removes every vehicle and restarts the signals and the clock.
    pub fn reset(&mut self) {
        log::info!("Resetting simulation at {:.2} s", self.time);
        self.vehicles.reset(self.settings.seed);
        self.signals.reset();
        self.snapshot = SensorSnapshot::default();
        self.time = 0.0;
        self.frame = 0;
    }

    /// Registers a callback invoked once for every vehicle that leaves the simulated area.
    pub fn set_completion_handler(&mut self, handler: impl FnMut(&VehicleCompleted) + 'static) {
        self.vehicles.set_completion_handler(handler);
    }

    /// Tries to add a vehicle at the spawn point of `origin`.
    /// Returns `None` if the spawn point is occupied.
    pub fn spawn_vehicle(&mut self, origin: Direction, turn: TurnType) -> Option<VehicleId> {
        let max_speed = self.settings.max_speed;
        self.vehicles
            .spawn_vehicle(origin, turn, self.geometry.as_ref(), max_speed)
    }

    /// The simulated time in s.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The number of frames simulated.
    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The active signal control policy.
    pub fn mode(&self) -> ControlMode {
        self.signals.mode()
    }

    pub fn geometry(&self) -> &dyn Geometry {
        self.geometry.as_ref()
    }

    pub fn turn_table(&self) -> &TurnTable {
        &self.turns
    }

    /// The signal controller.
    pub fn signals(&self) -> &SignalController {
        &self.signals
    }

    /// The state of every signal.
    pub fn lights(&self) -> &PerDirection<LightState> {
        self.signals.lights()
    }

    /// The detector readings taken at the end of the last tick.
    pub fn sensor_snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    /// The detectors.
    pub fn sensors(&self) -> &SensorSystem {
        &self.sensors
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// The number of vehicles in the simulation.
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// The waiting vehicles in the lane of `approach`.
    pub fn waiting_vehicles(&self, approach: Direction) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.waiting_vehicles(approach)
    }

    /// Gets debugging information from the previously simulated frame.
    #[cfg(feature = "debug")]
    pub fn debug(&mut self) -> serde_json::Value {
        std::mem::take(&mut self.debug)
    }
}
