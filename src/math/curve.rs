use super::{Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;

/// A parametric curve in 2D space.
pub trait ParametricCurve2d {
    /// Samples the parametric curve.
    fn sample(&self, t: f64) -> Point2d;

    /// Returns the minimum and maximum t-values that define the bounds of the curve.
    fn bounds(&self) -> Interval<f64>;

    /// Samples the derivative of the parametric curve.
    ///
    /// The default implementation approximates the derivative by sampling
    /// two very nearby points along the curve.
    fn sample_dt(&self, t: f64) -> Vector2d {
        let delta = self.bounds().length() * 0.0001;
        let p1 = self.sample(t);
        let p2 = self.sample(t + delta);
        (p2 - p1) / delta
    }
}

/// Approximates the arc length of a curve by summing `segments` chords.
pub fn curve_length(curve: &impl ParametricCurve2d, segments: usize) -> f64 {
    let bounds = curve.bounds();
    let segments = segments.max(1);
    let step = bounds.length() / segments as f64;
    (0..=segments)
        .map(|i| curve.sample(bounds.min + i as f64 * step))
        .collect::<Vec<_>>()
        .windows(2)
        .map(|ps| (ps[1] - ps[0]).magnitude())
        .sum()
}
