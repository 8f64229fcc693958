//! Range sensors used by the [vehicle](Vehicle).

use super::{
    track::TrackMap,
    vehicle::{direction, Vehicle},
    Point,
};

/// Number of sensors on a [vehicle](Vehicle).
pub const SENSOR_COUNT: usize = 5;

/// Angles of the sensors relative to the heading, in degrees.
pub const SENSOR_ANGLES: [f64; SENSOR_COUNT] = [-90.0, -45.0, 0.0, 45.0, 90.0];

/// A ray cast from the center of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sensor {
    /// Angle relative to the vehicle's heading, in degrees.
    pub angle_offset: f64,
    /// The distance the sensor can "see".
    pub range: f64,
}

/// What a [sensor](Sensor) saw during the last tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Signed distance.
    ///
    /// When the vehicle is on the track, this is the (non-negative) distance to the first
    /// pixel off the track, or the full range if there is none. When the vehicle is off the
    /// track, this is the negated distance to the first pixel on the track, or 0 if there is
    /// none.
    pub distance: f64,
    /// Tip of the ray at full range.
    pub endpoint: Point,
    /// Where the ray found the boundary, if it did.
    pub hit: Option<Point>,
}

impl Default for Reading {
    fn default() -> Self {
        Reading {
            distance: 0.0,
            endpoint: Point::origin(),
            hit: None,
        }
    }
}

impl Sensor {
    /// Casts the ray from `origin` along `heading + angle_offset`, one pixel at a time.
    pub fn cast(&self, track: &TrackMap, origin: Point, heading: f64) -> Reading {
        let dir = direction(heading + self.angle_offset);
        let endpoint = origin + dir * self.range;
        let on_track = track.is_on_track(origin.x, origin.y);

        // Looking for the first pixel whose on-track status differs from the vehicle's
        let found = (0..self.range as usize).map(|d| d as f64).find(|&d| {
            let p = origin + dir * d;
            track.is_on_track(p.x.floor(), p.y.floor()) != on_track
        });

        let distance = match (on_track, found) {
            (true, Some(d)) => d,
            (true, None) => self.range,
            (false, Some(d)) => -d,
            (false, None) => 0.0,
        };
        Reading {
            distance,
            endpoint,
            hit: found.map(|d| origin + dir * d),
        }
    }
}

/// The fixed set of [sensors](Sensor) on a vehicle, with their latest readings.
#[derive(Debug, Clone)]
pub struct SensorArray {
    sensors: [Sensor; SENSOR_COUNT],
    readings: [Reading; SENSOR_COUNT],
}

impl SensorArray {
    /// Constructs the standard layout with every sensor reaching `range`.
    pub fn new(range: f64) -> Self {
        let mut sensors = [Sensor {
            angle_offset: 0.0,
            range,
        }; SENSOR_COUNT];
        for (sensor, angle) in sensors.iter_mut().zip(SENSOR_ANGLES.iter()) {
            sensor.angle_offset = *angle;
        }
        SensorArray {
            sensors,
            readings: [Reading::default(); SENSOR_COUNT],
        }
    }

    pub fn sensors(&self) -> &[Sensor; SENSOR_COUNT] {
        &self.sensors
    }

    pub fn readings(&self) -> &[Reading; SENSOR_COUNT] {
        &self.readings
    }

    /// Signed distances of the latest readings.
    pub fn distances(&self) -> [f64; SENSOR_COUNT] {
        let mut distances = [0.0; SENSOR_COUNT];
        for (d, r) in distances.iter_mut().zip(self.readings.iter()) {
            *d = r.distance;
        }
        distances
    }

    /// Recasts every ray from the vehicle's current pose.
    pub fn update(&mut self, vehicle: &Vehicle, track: &TrackMap) {
        for (reading, sensor) in self.readings.iter_mut().zip(self.sensors.iter()) {
            *reading = sensor.cast(track, vehicle.pos(), vehicle.heading());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{track::Cell, vehicle::VehicleConfig};

    /// A 200x200 track with road on columns `[lo, hi)`.
    fn band_track(lo: usize, hi: usize) -> TrackMap {
        let n = 200;
        let cells = (0..n * n)
            .map(|i| {
                if (lo..hi).contains(&(i % n)) {
                    Cell::Road
                } else {
                    Cell::Off
                }
            })
            .collect();
        TrackMap::from_cells(n, n, cells).unwrap()
    }

    fn forward() -> Sensor {
        Sensor {
            angle_offset: 0.0,
            range: 150.0,
        }
    }

    #[test]
    fn on_track_reports_distance_to_edge() {
        let track = band_track(0, 120);
        let r = forward().cast(&track, Point::new(100.5, 100.5), 0.0);
        assert_eq!(r.distance, 20.0);
        assert!((r.hit.unwrap().x - 120.5).abs() < 1e-9);
        assert!((r.endpoint.x - 250.5).abs() < 1e-9);
    }

    #[test]
    fn on_track_without_edge_reports_range() {
        let track = band_track(0, 200);
        // Pointing up the screen, along the road
        let r = forward().cast(&track, Point::new(100.5, 190.5), 90.0);
        assert_eq!(r.distance, 150.0);
        assert_eq!(r.hit, None);
    }

    #[test]
    fn off_track_reports_negative_distance_back() {
        let track = band_track(0, 50);
        let r = forward().cast(&track, Point::new(80.5, 100.5), 180.0);
        assert_eq!(r.distance, -31.0);
    }

    #[test]
    fn off_track_without_road_reports_zero() {
        let track = band_track(0, 10);
        let r = forward().cast(&track, Point::new(100.5, 100.5), 0.0);
        assert_eq!(r.distance, 0.0);
    }

    #[test]
    fn world_edge_counts_as_off() {
        let track = band_track(0, 200);
        let r = forward().cast(&track, Point::new(190.5, 100.5), 0.0);
        assert_eq!(r.distance, 10.0);
    }

    #[test]
    fn array_follows_vehicle() {
        let track = band_track(0, 120);
        let vehicle = Vehicle::new(VehicleConfig::default(), Point::new(100.5, 100.5), 0.0);
        let mut array = SensorArray::new(150.0);
        array.update(&vehicle, &track);
        let d = array.distances();
        assert_eq!(d[2], 20.0);
        // The 90 degree sensors run along the road
        assert_eq!(d[0], 100.0);
        assert_eq!(d[4], 101.0);
    }
}
