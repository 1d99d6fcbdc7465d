//! The static layout of the intersection.

use crate::math::{rot90, LineSegment2d, Point2d};
use crate::util::Interval;
use crate::Direction;
use serde::{Deserialize, Serialize};

/// Answers geometric queries about the intersection and the area around it.
///
/// All coordinates are in screen space, with x increasing to the right
/// and y increasing downwards.
pub trait Geometry {
    /// The centre of the intersection.
    fn centre(&self) -> Point2d;

    /// The full width of each road, covering both lanes.
    fn road_width(&self) -> f64;

    /// The lateral distance from a road's centre line to the centre of either lane.
    fn lane_offset(&self) -> f64;

    /// The extents of the simulated area.
    fn bounds(&self) -> Rect;

    /// The stop line of an approach, spanning its inbound lane.
    fn stop_line(&self, approach: Direction) -> LineSegment2d;

    /// The point at which vehicles arriving from `approach` appear.
    fn spawn_point(&self, approach: Direction) -> Point2d;

    /// The point at which vehicles leaving towards `direction` reach the edge of the area.
    fn exit_point(&self, direction: Direction) -> Point2d;

    /// Whether the point lies inside the intersection footprint.
    fn is_inside_intersection(&self, point: Point2d) -> bool;
}

/// An axis-aligned rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: Interval<f64>,
    pub y: Interval<f64>,
}

impl Rect {
    /// Creates the rectangle with the given opposite corners.
    pub fn from_corners(a: Point2d, b: Point2d) -> Self {
        Self {
            x: Interval::spanning(a.x, b.x),
            y: Interval::spanning(a.y, b.y),
        }
    }

    /// Whether the point lies inside the rectangle or on its boundary.
    pub fn contains(&self, point: Point2d) -> bool {
        self.x.contains(point.x) && self.y.contains(point.y)
    }

    /// Whether every edge of the rectangle is finite.
    pub fn is_finite(&self) -> bool {
        [self.x.min, self.x.max, self.y.min, self.y.max]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Grows the rectangle by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            x: Interval::new(self.x.min - margin, self.x.max + margin),
            y: Interval::new(self.y.min - margin, self.y.max + margin),
        }
    }
}

/// A plain crossing of two perpendicular two-lane roads with right-hand traffic.
///
/// The footprint is the square where the roads overlap, and each stop line
/// sits on the edge of the footprint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Crossroads {
    /// The width of the simulated area.
    pub width: f64,
    /// The height of the simulated area.
    pub height: f64,
    /// The full width of each road.
    pub road_width: f64,
}

impl Default for Crossroads {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            road_width: 80.0,
        }
    }
}

impl Crossroads {
    /// Half the side length of the footprint.
    fn half_size(&self) -> f64 {
        0.5 * self.road_width
    }

    /// The centre of the inbound lane of `approach`, where it meets the footprint.
    fn lane_entry(&self, approach: Direction) -> Point2d {
        let forward = approach.forward();
        let right = rot90(forward);
        self.centre() - self.half_size() * forward + self.lane_offset() * right
    }

    /// Projects `point` onto the edge of the simulated area on the given side.
    fn to_edge(&self, point: Point2d, side: Direction) -> Point2d {
        match side {
            Direction::North => Point2d::new(point.x, 0.0),
            Direction::East => Point2d::new(self.width, point.y),
            Direction::South => Point2d::new(point.x, self.height),
            Direction::West => Point2d::new(0.0, point.y),
        }
    }
}

impl Geometry for Crossroads {
    fn centre(&self) -> Point2d {
        Point2d::new(0.5 * self.width, 0.5 * self.height)
    }

    fn road_width(&self) -> f64 {
        self.road_width
    }

    fn lane_offset(&self) -> f64 {
        0.25 * self.road_width
    }

    fn bounds(&self) -> Rect {
        Rect::from_corners(Point2d::new(0.0, 0.0), Point2d::new(self.width, self.height))
    }

    fn stop_line(&self, approach: Direction) -> LineSegment2d {
        let forward = approach.forward();
        let edge = self.centre() - self.half_size() * forward;
        let kerb = edge + self.half_size() * rot90(forward);
        LineSegment2d::from_ends(edge, kerb)
    }

    fn spawn_point(&self, approach: Direction) -> Point2d {
        self.to_edge(self.lane_entry(approach), approach)
    }

    fn exit_point(&self, direction: Direction) -> Point2d {
        // Vehicles leaving towards `direction` use the lane that vehicles
        // arriving from the opposite side use inbound.
        let lane = self.lane_entry(direction.opposite());
        self.to_edge(lane, direction)
    }

    fn is_inside_intersection(&self, point: Point2d) -> bool {
        let centre = self.centre();
        let half = self.half_size();
        Interval::disc(centre.x, half).contains(point.x)
            && Interval::disc(centre.y, half).contains(point.y)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lanes_keep_right() {
        let geometry = Crossroads::default();
        // Southbound traffic from the north uses the west half of the road.
        assert_eq!(geometry.spawn_point(Direction::North), Point2d::new(380.0, 0.0));
        assert_eq!(geometry.spawn_point(Direction::East), Point2d::new(800.0, 280.0));
        assert_eq!(geometry.spawn_point(Direction::South), Point2d::new(420.0, 600.0));
        assert_eq!(geometry.spawn_point(Direction::West), Point2d::new(0.0, 320.0));
    }

    #[test]
    fn exit_points_mirror_spawn_points() {
        let geometry = Crossroads::default();
        assert_eq!(geometry.exit_point(Direction::South), Point2d::new(380.0, 600.0));
        assert_eq!(geometry.exit_point(Direction::West), Point2d::new(0.0, 280.0));
        assert_eq!(geometry.exit_point(Direction::North), Point2d::new(420.0, 0.0));
        assert_eq!(geometry.exit_point(Direction::East), Point2d::new(800.0, 320.0));
    }

    #[test]
    fn stop_lines_sit_on_footprint_edge() {
        let geometry = Crossroads::default();
        let line = geometry.stop_line(Direction::North);
        assert_eq!(line.start, Point2d::new(400.0, 260.0));
        assert_eq!(line.end, Point2d::new(360.0, 260.0));
        assert!(geometry.is_inside_intersection(line.start));
        assert!(!geometry.is_inside_intersection(Point2d::new(400.0, 259.9)));
    }
}
