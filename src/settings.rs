//! Tunable parameters of the simulation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The policy used to drive the traffic signals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    /// A fixed six-phase cycle.
    #[default]
    Fixed,
    /// Green time is allocated by demand measured by the detectors.
    Adaptive,
}

/// The parameters of a simulation run. Durations are in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The number of vehicles spawned per 10 simulated seconds.
    pub spawn_rate: f64,
    /// The cruising speed of vehicles, in units per second.
    pub max_speed: f64,
    /// The duration of a green phase in fixed mode.
    pub green_ms: u64,
    /// The duration of a yellow phase in fixed mode.
    pub yellow_ms: u64,
    /// The duration of an all-red clearance phase in fixed mode.
    pub all_red_ms: u64,
    /// The minimum time a green is held in adaptive mode.
    pub min_green_ms: u64,
    /// How far upstream of the stop line the detectors reach.
    pub detector_distance: f64,
    /// The signal control policy.
    pub mode: ControlMode,
    /// Seed for the random number generator; `None` seeds from entropy.
    pub seed: Option<u64>,
}

/// A reason a set of [Settings] was rejected.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("spawn rate must be finite and non-negative, got {0}")]
    SpawnRate(f64),
    #[error("max speed must be finite and positive, got {0}")]
    MaxSpeed(f64),
    #[error("{0} duration must be positive")]
    Duration(&'static str),
    #[error("detector distance must be finite and non-negative, got {0}")]
    DetectorDistance(f64),
    #[error("invalid settings document: {0}")]
    Parse(String),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            spawn_rate: 5.0,
            max_speed: 60.0,
            green_ms: 10_000,
            yellow_ms: 3_000,
            all_red_ms: 2_000,
            min_green_ms: 5_000,
            detector_distance: 100.0,
            mode: ControlMode::Fixed,
            seed: None,
        }
    }
}

impl Settings {
    /// Parses settings from a JSON document and validates them.
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings =
            serde_json::from_str(json).map_err(|err| SettingsError::Parse(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every value is within its permitted range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.spawn_rate.is_finite() || self.spawn_rate < 0.0 {
            return Err(SettingsError::SpawnRate(self.spawn_rate));
        }
        if !self.max_speed.is_finite() || self.max_speed <= 0.0 {
            return Err(SettingsError::MaxSpeed(self.max_speed));
        }
        let durations = [
            ("green", self.green_ms),
            ("yellow", self.yellow_ms),
            ("all-red", self.all_red_ms),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, ms)| *ms == 0) {
            return Err(SettingsError::Duration(*name));
        }
        if !self.detector_distance.is_finite() || self.detector_distance < 0.0 {
            return Err(SettingsError::DetectorDistance(self.detector_distance));
        }
        Ok(())
    }

    /// The time between spawn attempts in seconds, or `None` if spawning is disabled.
    pub fn spawn_interval(&self) -> Option<f64> {
        (self.spawn_rate > 0.0).then(|| 10.0 / self.spawn_rate)
    }

    /// The signal timings in seconds.
    pub fn timings(&self) -> Timings {
        Timings {
            green: secs(self.green_ms),
            yellow: secs(self.yellow_ms),
            all_red: secs(self.all_red_ms),
            min_green: secs(self.min_green_ms),
        }
    }
}

/// Signal timings in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timings {
    pub green: f64,
    pub yellow: f64,
    pub all_red: f64,
    pub min_green: f64,
}

fn secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}
