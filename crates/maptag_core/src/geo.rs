//! Coordinate helpers shared by code generation and proximity lookups.
//!
//! # Invariants
//! - Distances are great-circle (haversine) meters on a spherical Earth.
//! - Bounding boxes use strict inequalities; points on an edge are outside.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

const METERS_PER_DEGREE_LAT: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// Region accepted at address creation time.
pub const COUNTRY_BOUNDS: CountryBounds = CountryBounds {
    min_lat: 9.4,
    max_lat: 15.1,
    min_lon: -5.6,
    max_lon: 2.5,
};

/// Inclusive rectangle used to accept creation coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountryBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl CountryBounds {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Open rectangle (`min < value < max`) used by the city table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl OpenBox {
    pub const fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat > self.min_lat && lat < self.max_lat && lon > self.min_lon && lon < self.max_lon
    }
}

/// Haversine great-circle distance between two points in meters.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_M * c
}

/// Degree deltas `(lat, lon)` that enclose a circle of `radius_m` around `lat`.
///
/// Used as an index-friendly prefilter; callers still compare exact distance.
pub fn degree_window(lat: f64, radius_m: f64) -> (f64, f64) {
    let d_lat = radius_m / METERS_PER_DEGREE_LAT;
    let cos_lat = lat.to_radians().cos().abs();
    let d_lon = if cos_lat < 1e-9 {
        360.0
    } else {
        (d_lat / cos_lat).min(360.0)
    };
    (d_lat, d_lon)
}
