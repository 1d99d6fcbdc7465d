use super::curve::ParametricCurve2d;
use super::{Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;

/// A quadratic bezier curve
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QuadraticBezier2d {
    points: [Point2d; 3],
}

impl QuadraticBezier2d {
    pub const fn new(points: &[Point2d; 3]) -> Self {
        Self { points: *points }
    }

    /// The start, control and end points of the curve.
    pub fn points(&self) -> &[Point2d; 3] {
        &self.points
    }

    /// The first point of the curve.
    pub fn start(&self) -> Point2d {
        self.points[0]
    }

    /// The last point of the curve.
    pub fn end(&self) -> Point2d {
        self.points[2]
    }
}

impl ParametricCurve2d for QuadraticBezier2d {
    fn sample(&self, t: f64) -> Point2d {
        let t1 = 1.0 - t;
        Point2d::from_vec(
            t1 * t1 * self.points[0].to_vec()
                + 2.0 * t1 * t * self.points[1].to_vec()
                + t * t * self.points[2].to_vec(),
        )
    }

    fn bounds(&self) -> Interval<f64> {
        Interval { min: 0.0, max: 1.0 }
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        let t1 = 1.0 - t;
        -2.0 * t1 * self.points[0].to_vec()
            + (2.0 - 4.0 * t) * self.points[1].to_vec()
            + 2.0 * t * self.points[2].to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::curve_length;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn quadratic_ends_and_tangents() {
        let curve = QuadraticBezier2d::new(&[
            Point2d::new(0.0, 0.0),
            Point2d::new(0.0, 10.0),
            Point2d::new(10.0, 10.0),
        ]);
        assert_eq!(curve.sample(0.0), Point2d::new(0.0, 0.0));
        assert_eq!(curve.sample(1.0), Point2d::new(10.0, 10.0));
        assert_eq!(curve.sample_dt(0.0), Vector2d::new(0.0, 20.0));
        assert_eq!(curve.sample_dt(1.0), Vector2d::new(20.0, 0.0));
    }

    #[test]
    fn collinear_length() {
        let curve = QuadraticBezier2d::new(&[
            Point2d::new(0.0, 0.0),
            Point2d::new(50.0, 0.0),
            Point2d::new(100.0, 0.0),
        ]);
        assert_approx_eq!(curve_length(&curve, 32), 100.0);
    }
}
