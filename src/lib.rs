pub use cgmath;
pub use direction::{Direction, PerDirection, TurnType};
pub use geometry::{Crossroads, Geometry, Rect};
pub use light::{LightState, Phase, SignalController};
pub use manager::{CompletionHandler, VehicleCompleted, VehicleManager};
pub use sensor::{ApproachReading, SensorSnapshot, SensorSystem};
pub use settings::{ControlMode, Settings, SettingsError, Timings};
pub use simulation::Simulation;
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use turns::{PathSample, TurnPath, TurnTable};
pub use util::Interval;
pub use vehicle::{TrafficView, Vehicle, VehicleAttributes, VehicleState};

mod debug;
mod direction;
mod geometry;
mod light;
mod manager;
pub mod math;
mod sensor;
mod settings;
mod simulation;
mod turns;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
