//! Distance calculations between geographic coordinates.
//!
//! Route geometry is stored in degrees while stop distances and speeds are in
//! meters. The conversion between the two is a [`DistanceModel`]; both
//! provided models are flat approximations and drift away from the reference
//! latitude.

use std::f64::consts::PI;
use std::fmt::Debug;

use geo::{Coord, EuclideanLength, HaversineDistance, Line, Point};

/// Meters per degree used by the reference data set (0.11 m per 0.000001°)
pub const DEFAULT_METERS_PER_DEGREE: f64 = 0.11 / 0.000001;

/// Mean Earth radius in meters
const EARTH_RADIUS: f64 = 6_371_008.8;

/// Converts planar distances in degrees to meters and back
pub trait DistanceModel: Send + Sync + Debug {
    fn degrees_to_meters(&self, degrees: f64) -> f64;

    fn meters_to_degrees(&self, meters: f64) -> f64;

    /// Straight-line distance between two coordinates, in meters
    fn distance_m(&self, from: Coord, to: Coord) -> f64 {
        self.degrees_to_meters(Line::new(from, to).euclidean_length())
    }
}

/// A single fixed scale, independent of where the geometry lies
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedScale {
    meters_per_degree: f64,
}

impl FixedScale {
    pub fn new(meters_per_degree: f64) -> Self {
        Self { meters_per_degree }
    }

    /// Isotropic scale for geometry near `latitude`.
    ///
    /// Averages the north-south scale (constant) and the east-west scale
    /// (shrinks with cos(latitude)), so neither axis is exact.
    pub fn at_latitude(latitude: f64) -> Self {
        let meters_per_degree_lat = EARTH_RADIUS * PI / 180.0;
        let meters_per_degree_lon = meters_per_degree_lat * latitude.to_radians().cos();
        Self::new((meters_per_degree_lat + meters_per_degree_lon) / 2.0)
    }

    pub fn meters_per_degree(&self) -> f64 {
        self.meters_per_degree
    }
}

impl Default for FixedScale {
    fn default() -> Self {
        Self::new(DEFAULT_METERS_PER_DEGREE)
    }
}

impl DistanceModel for FixedScale {
    fn degrees_to_meters(&self, degrees: f64) -> f64 {
        degrees * self.meters_per_degree
    }

    fn meters_to_degrees(&self, meters: f64) -> f64 {
        meters / self.meters_per_degree
    }
}

/// Calculate Haversine distance between two points in meters
pub fn haversine_distance(p1: Point, p2: Point) -> f64 {
    p1.haversine_distance(&p2)
}
