use super::{Point2d, Vector2d};
use std::f64::consts::PI;

/// Rotates a vector 90 degrees clockwise.
///
/// In screen space (y pointing down) this points to the right of `vec`.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}

/// The unit vector pointing along the given heading.
pub fn heading_vector(heading: f64) -> Vector2d {
    Vector2d::new(heading.cos(), heading.sin())
}

/// The heading of a vector, normalised into (-π, π].
pub fn vector_heading(vec: Vector2d) -> f64 {
    normalize_angle(vec.y.atan2(vec.x))
}

/// Wraps an angle in radians into the range (-π, π].
pub fn normalize_angle(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle <= -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Whether both coordinates of the point are finite.
pub fn is_finite(point: Point2d) -> bool {
    point.x.is_finite() && point.y.is_finite()
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn normalize_angle_range() {
        assert_eq!(normalize_angle(-PI), PI);
        assert_eq!(normalize_angle(PI), PI);
        assert_approx_eq!(normalize_angle(3.0 * PI / 2.0), -PI / 2.0);
        assert_approx_eq!(normalize_angle(-5.0 * PI / 2.0), -PI / 2.0);
    }

    #[test]
    fn headings() {
        assert_eq!(vector_heading(Vector2d::new(-1.0, 0.0)), PI);
        assert_eq!(vector_heading(Vector2d::new(0.0, 1.0)), PI / 2.0);
        assert_eq!(rot90(Vector2d::new(1.0, 0.0)), Vector2d::new(0.0, 1.0));
    }
}
