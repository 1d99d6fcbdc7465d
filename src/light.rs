use crate::sensor::SensorSnapshot;
use crate::settings::{ControlMode, Timings};
use crate::{Direction, PerDirection};
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

/// The state of the signal facing one approach.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightState {
    #[default]
    Red,
    Yellow,
    Green,
    Off,
}

/// One step of the fixed-time signal cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    NsGreen,
    NsYellow,
    AllRedToEw,
    EwGreen,
    EwYellow,
    AllRedToNs,
}

/// Drives the four signals of the intersection.
#[derive(Clone, Debug)]
pub struct SignalController {
    /// The current state of each signal.
    lights: PerDirection<LightState>,
    /// The policy and its state.
    plan: Plan,
    /// The time since the lights last changed, in s.
    timer: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Plan {
    Fixed { phase: Phase },
    Adaptive,
}

impl LightState {
    /// Whether vehicles may enter the intersection.
    pub fn permits_entry(self) -> bool {
        matches!(self, LightState::Green | LightState::Yellow)
    }
}

impl Phase {
    /// All phases in cycle order.
    pub const ALL: [Phase; 6] = [
        Phase::NsGreen,
        Phase::NsYellow,
        Phase::AllRedToEw,
        Phase::EwGreen,
        Phase::EwYellow,
        Phase::AllRedToNs,
    ];

    /// The position of the phase in the cycle.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The phase which follows this one.
    pub const fn next(self) -> Phase {
        Self::ALL[(self.index() + 1) % 6]
    }

    /// How long the phase lasts, in s.
    fn duration(self, timings: &Timings) -> f64 {
        match self {
            Phase::NsGreen | Phase::EwGreen => timings.green,
            Phase::NsYellow | Phase::EwYellow => timings.yellow,
            Phase::AllRedToEw | Phase::AllRedToNs => timings.all_red,
        }
    }

    /// The light state of the given approach during this phase.
    pub fn light(self, direction: Direction) -> LightState {
        let ns = direction.is_north_south();
        match self {
            Phase::NsGreen if ns => LightState::Green,
            Phase::NsYellow if ns => LightState::Yellow,
            Phase::EwGreen if !ns => LightState::Green,
            Phase::EwYellow if !ns => LightState::Yellow,
            _ => LightState::Red,
        }
    }
}

impl SignalController {
    /// Creates a controller in the initial state of `mode`.
    pub fn new(mode: ControlMode) -> Self {
        let mut controller = Self {
            lights: PerDirection::splat(LightState::Red),
            plan: Plan::Adaptive,
            timer: 0.0,
        };
        controller.set_mode(mode);
        controller
    }

    /// Switches the control policy, restarting it from its initial state.
    pub fn set_mode(&mut self, mode: ControlMode) {
        log::debug!("Signal control set to {:?}", mode);
        self.timer = 0.0;
        match mode {
            ControlMode::Fixed => {
                self.plan = Plan::Fixed {
                    phase: Phase::NsGreen,
                };
                self.apply_phase(Phase::NsGreen);
            }
            ControlMode::Adaptive => {
                self.plan = Plan::Adaptive;
                self.give_green(Direction::North);
            }
        }
    }

    /// Restarts the current policy from its initial state.
    pub fn reset(&mut self) {
        self.set_mode(self.mode());
    }

    /// The active control policy.
    pub fn mode(&self) -> ControlMode {
        match self.plan {
            Plan::Fixed { .. } => ControlMode::Fixed,
            Plan::Adaptive => ControlMode::Adaptive,
        }
    }

    /// The current phase of the fixed cycle, if in fixed mode.
    pub fn phase(&self) -> Option<Phase> {
        match self.plan {
            Plan::Fixed { phase } => Some(phase),
            Plan::Adaptive => None,
        }
    }

    /// The time since the lights last changed, in s.
    pub fn phase_elapsed(&self) -> f64 {
        self.timer
    }

    /// The state of every signal.
    pub fn lights(&self) -> &PerDirection<LightState> {
        &self.lights
    }

    /// The state of the signal facing `direction`.
    pub fn light(&self, direction: Direction) -> LightState {
        self.lights[direction]
    }

    /// Whether vehicles from `direction` may enter the intersection.
    pub fn can_proceed(&self, direction: Direction) -> bool {
        self.lights[direction].permits_entry()
    }

    /// The approaches currently showing green.
    pub fn green_directions(&self) -> ArrayVec<Direction, 2> {
        self.lights
            .iter()
            .filter(|(_, state)| **state == LightState::Green)
            .map(|(dir, _)| dir)
            .take(2)
            .collect()
    }

    /// Advances the controller by `dt` seconds.
    ///
    /// In adaptive mode `demand` is the most recent sensor snapshot.
    pub fn step(&mut self, dt: f64, timings: &Timings, demand: &SensorSnapshot) {
        self.timer += dt;
        match self.plan {
            Plan::Fixed { phase } => {
                if self.timer >= phase.duration(timings) {
                    let next = phase.next();
                    log::debug!("Signal phase {:?} -> {:?}", phase, next);
                    self.plan = Plan::Fixed { phase: next };
                    self.timer = 0.0;
                    self.apply_phase(next);
                }
            }
            Plan::Adaptive => {
                if self.timer < timings.min_green {
                    return;
                }
                if let Some(direction) = self.busiest_red_approach(demand) {
                    log::debug!("Adaptive green given to {:?}", direction);
                    self.give_green(direction);
                    self.timer = 0.0;
                }
            }
        }
    }

    /// Finds the non-green approach with the highest positive priority score.
    /// Earlier approaches win ties.
    fn busiest_red_approach(&self, demand: &SensorSnapshot) -> Option<Direction> {
        let mut best = None;
        let mut best_score = 0.0;
        for (direction, reading) in demand.iter() {
            if self.lights[direction] == LightState::Green || reading.waiting == 0 {
                continue;
            }
            let score = reading.priority();
            if score > best_score {
                best_score = score;
                best = Some(direction);
            }
        }
        best
    }

    /// Sets all lights to the states of the given fixed phase.
    fn apply_phase(&mut self, phase: Phase) {
        self.lights = PerDirection::from_fn(|dir| phase.light(dir));
    }

    /// Sets `direction` and the opposing approach green and every other light red.
    fn give_green(&mut self, direction: Direction) {
        self.lights = PerDirection::splat(LightState::Red);
        self.lights[direction] = LightState::Green;
        self.lights[direction.opposite()] = LightState::Green;
    }
}
