//! Paths followed by vehicles through the intersection footprint.

use crate::geometry::Geometry;
use crate::math::{curve_length, is_finite, vector_heading, ParametricCurve2d, Point2d, QuadraticBezier2d};
use crate::{Direction, TurnType};
use itertools::iproduct;

/// The number of chords used to approximate the length of a path.
const LENGTH_SEGMENTS: usize = 32;

/// A path through the intersection from one approach to a destination.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurnPath {
    curve: QuadraticBezier2d,
    length: f64,
}

/// A position and heading sampled from a [TurnPath].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathSample {
    pub pos: Point2d,
    pub heading: f64,
}

/// The path for every combination of approach and turn type.
#[derive(Clone, Debug)]
pub struct TurnTable {
    paths: [[Option<TurnPath>; 3]; 4],
}

impl TurnPath {
    /// Creates a path from a curve.
    pub fn new(curve: QuadraticBezier2d) -> Self {
        let length = curve_length(&curve, LENGTH_SEGMENTS);
        Self { curve, length }
    }

    /// The underlying curve.
    pub fn curve(&self) -> &QuadraticBezier2d {
        &self.curve
    }

    /// The approximate length of the path.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Samples the position and heading of the path at `t` in `[0, 1]`.
    pub fn sample(&self, t: f64) -> PathSample {
        let t = t.clamp(0.0, 1.0);
        PathSample {
            pos: self.curve.sample(t),
            heading: vector_heading(self.curve.sample_dt(t)),
        }
    }
}

impl TurnTable {
    /// Builds the table from the intersection geometry.
    ///
    /// Each path starts where the approach's inbound lane meets the footprint
    /// and ends where the destination's outbound lane leaves it. The control
    /// point is the crossing of the two lane centre lines, so the path leaves
    /// and arrives tangent to the lanes.
    pub fn new(geometry: &dyn Geometry) -> Self {
        let mut paths = [[None; 3]; 4];
        for (from, turn) in iproduct!(Direction::ALL, TurnType::ALL) {
            let path = Self::build(geometry, from, turn);
            if path.is_none() {
                log::warn!("No valid path from {:?} turning {:?}", from, turn);
            }
            paths[from.index()][turn.index()] = path;
        }
        Self { paths }
    }

    /// Gets the path taken by vehicles from `from` performing `turn`.
    pub fn get(&self, from: Direction, turn: TurnType) -> Option<&TurnPath> {
        self.paths[from.index()][turn.index()].as_ref()
    }

    fn build(geometry: &dyn Geometry, from: Direction, turn: TurnType) -> Option<TurnPath> {
        let to = from.destination(turn);
        let centre = geometry.centre();
        let half = 0.5 * geometry.road_width();

        // Lane positions are taken from the spawn and exit points, which lie on the lane centres.
        let inbound = geometry.spawn_point(from);
        let outbound = geometry.exit_point(to);
        let entry_fwd = from.forward();
        let exit_fwd = to.opposite().forward();

        let start = along_axis(inbound, centre - half * entry_fwd, from);
        let end = along_axis(outbound, centre + half * exit_fwd, to);
        let control = if turn == TurnType::Straight {
            Point2d::new(0.5 * (start.x + end.x), 0.5 * (start.y + end.y))
        } else if from.is_north_south() {
            Point2d::new(start.x, end.y)
        } else {
            Point2d::new(end.x, start.y)
        };

        let points = [start, control, end];
        points
            .iter()
            .all(|p| is_finite(*p))
            .then(|| TurnPath::new(QuadraticBezier2d::new(&points)))
    }
}

/// Takes the lateral coordinate from `lane` and the longitudinal coordinate from `edge`,
/// for a road running along the axis of `dir`.
fn along_axis(lane: Point2d, edge: Point2d, dir: Direction) -> Point2d {
    if dir.is_north_south() {
        Point2d::new(lane.x, edge.y)
    } else {
        Point2d::new(edge.x, lane.y)
    }
}
