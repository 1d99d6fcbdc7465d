//! Detectors measuring demand on each approach.

use crate::debug::{debug_line, debug_rect};
use crate::geometry::{Geometry, Rect};
use crate::util::Interval;
use crate::{Direction, PerDirection, Vehicle, VehicleId};
use smallvec::SmallVec;

/// What the detector on one approach saw during a scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApproachReading {
    /// The number of waiting vehicles in the zone.
    pub waiting: usize,
    /// How long the longest-waiting vehicle in the zone has waited, in s.
    pub wait_time: f64,
    /// Every vehicle in the zone.
    pub detected: SmallVec<[VehicleId; 8]>,
}

/// The readings of all four detectors.
pub type SensorSnapshot = PerDirection<ApproachReading>;

/// The detectors placed upstream of each stop line.
#[derive(Clone, Copy, Debug)]
pub struct SensorSystem {
    /// How far upstream of the stop line each zone reaches.
    detector_distance: f64,
}

impl ApproachReading {
    /// The demand score used to allocate green time.
    pub fn priority(&self) -> f64 {
        self.waiting as f64 * self.wait_time
    }
}

impl SensorSystem {
    pub fn new(detector_distance: f64) -> Self {
        Self { detector_distance }
    }

    pub fn detector_distance(&self) -> f64 {
        self.detector_distance
    }

    pub fn set_detector_distance(&mut self, detector_distance: f64) {
        self.detector_distance = detector_distance;
    }

    /// The detection zone of an approach: the full road width, from the stop
    /// line to `detector_distance` upstream of it.
    pub fn detection_zone(&self, approach: Direction, geometry: &dyn Geometry) -> Option<Rect> {
        let line = geometry.stop_line(approach);
        if !line.is_finite() {
            log::warn!("Invalid stop line {:?}, {:?} detector disabled", line, approach);
            return None;
        }
        let stop = line.start;
        let upstream = stop - self.detector_distance * approach.forward();
        let centre = geometry.centre();
        let half = 0.5 * geometry.road_width();
        let zone = if approach.is_north_south() {
            Rect {
                x: Interval::disc(centre.x, half),
                y: Interval::spanning(stop.y, upstream.y),
            }
        } else {
            Rect {
                x: Interval::spanning(stop.x, upstream.x),
                y: Interval::disc(centre.y, half),
            }
        };
        Some(zone)
    }

    /// Measures the vehicles in each detection zone at time `now`.
    ///
    /// Vehicles are counted against the approach whose lane they occupy.
    /// Scanning does not alter any vehicle, so repeated scans of the same
    /// traffic give identical snapshots.
    pub fn scan<'a>(
        &self,
        vehicles: impl IntoIterator<Item = &'a Vehicle>,
        now: f64,
        geometry: &dyn Geometry,
    ) -> SensorSnapshot {
        let zones = PerDirection::from_fn(|dir| self.detection_zone(dir, geometry));
        for (dir, zone) in zones.iter() {
            if let Some(zone) = zone {
                let line = geometry.stop_line(dir);
                debug_line(&format!("stop line {:?}", dir), line.start, line.end);
                debug_rect(&format!("detector {:?}", dir), zone);
            }
        }

        let mut snapshot = SensorSnapshot::default();
        let mut earliest: PerDirection<Option<f64>> = PerDirection::splat(None);
        for vehicle in vehicles {
            let approach = vehicle.approach();
            match zones[approach] {
                Some(zone) if zone.contains(vehicle.position()) => {}
                _ => continue,
            }
            let reading = &mut snapshot[approach];
            reading.detected.push(vehicle.id());
            if vehicle.is_waiting() {
                reading.waiting += 1;
                let start = now - vehicle.total_wait();
                let first = &mut earliest[approach];
                *first = Some(first.map_or(start, |first| f64::min(first, start)));
            }
        }

        for (dir, start) in earliest.iter() {
            if let Some(start) = start {
                snapshot[dir].wait_time = now - start;
            }
        }
        snapshot
    }
}
