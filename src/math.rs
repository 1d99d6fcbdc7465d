//! Mathematical structs and functions.

use cgmath::{Point2, Vector2};
pub use bezier::QuadraticBezier2d;
pub use curve::{curve_length, ParametricCurve2d};
pub use util::*;

mod bezier;
mod curve;
mod util;

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;

/// A line segment between two points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment2d {
    pub start: Point2d,
    pub end: Point2d,
}

impl LineSegment2d {
    /// Creates a line segment from its two end points.
    pub const fn from_ends(start: Point2d, end: Point2d) -> Self {
        Self { start, end }
    }

    /// Whether both end points have finite coordinates.
    pub fn is_finite(&self) -> bool {
        is_finite(self.start) && is_finite(self.end)
    }
}
