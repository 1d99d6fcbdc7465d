use crate::math::{Point2d, Vector2d};
use crate::turns::{PathSample, TurnPath};
use cgmath::InnerSpace;

/// A turn in progress, following a path through the footprint.
#[derive(Clone, Copy, Debug)]
pub struct TurnManeuver {
    /// The path being followed.
    path: TurnPath,
    /// The curve parameter reached so far, in `[0, 1]`.
    t: f64,
}

impl TurnManeuver {
    /// Starts following `path` from a vehicle at `pos` travelling along `forward`.
    ///
    /// A vehicle which has already rolled past the start of the path
    /// begins that far along it.
    pub fn begin(path: TurnPath, pos: Point2d, forward: Vector2d) -> Self {
        let overshoot = f64::max((pos - path.curve().start()).dot(forward), 0.0);
        Self {
            path,
            t: f64::min(overshoot / path.length(), 1.0),
        }
    }

    /// Moves `distance` further along the path and returns the new position and heading.
    pub fn advance(&mut self, distance: f64) -> PathSample {
        self.t = f64::min(self.t + distance / self.path.length(), 1.0);
        self.path.sample(self.t)
    }

    /// The fraction of the path covered so far.
    pub fn progress(&self) -> f64 {
        self.t
    }

    /// Whether the end of the path has been reached.
    pub fn is_complete(&self) -> bool {
        self.t >= 1.0
    }

    /// The final point of the path.
    pub fn end(&self) -> Point2d {
        self.path.curve().end()
    }
}
