// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Distances and great-circle geometry.
//!
//! Positions are `(lon, lat)` pairs in degrees throughout. Distances come
//! from a [`DistanceModel`]; paths for drawing are always discretised on the
//! sphere and split wherever they cross the antimeridian.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

/// Earth's mean radius.
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.009;

/// Mean Earth–Moon distance.
pub const EARTH_MOON_DISTANCE_KM: f64 = 384_402.0;

pub const METRES_PER_NAUTICAL_MILE: f64 = 1852.0;

/// Upper bound on the number of segments in one drawn path.
pub const MAX_PATH_SEGMENTS: usize = 1_000_000;

// WGS 84
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// A `(lon, lat)` polyline that never crosses ±180°.
pub type LineString = Vec<(f64, f64)>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeodesyError {
    #[error("distance solver did not converge after {iterations} iterations")]
    NoConvergence { iterations: usize },
    #[error("great circle is undefined between antipodal points")]
    Antipodal,
    #[error("unusable maximum segment length: {0} m")]
    InvalidSegmentLength(f64),
}

/// Central angle between two positions, in degrees (haversine formula).
pub fn angular_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lon1 = lon1.to_radians();
    let lat1 = lat1.to_radians();
    let lon2 = lon2.to_radians();
    let lat2 = lat2.to_radians();

    let a = ((lat1 - lat2) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lon1 - lon2) / 2.0).sin().powi(2);

    (2.0 * a.sqrt().min(1.0).asin()).to_degrees()
}

/// Spherical great-circle distance in kilometres.
pub fn great_circle_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    angular_distance(lon1, lat1, lon2, lat2).to_radians() * EARTH_MEAN_RADIUS_KM
}

/// Initial course from the first position towards the second, in [0, 360).
pub fn initial_bearing(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let x = delta_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// Interchangeable way of measuring the length of a leg.
pub trait DistanceModel {
    fn name(&self) -> &'static str;

    /// Distance between two `(lon, lat)` positions in kilometres.
    fn distance_km(&self, from: (f64, f64), to: (f64, f64)) -> Result<f64, GeodesyError>;
}

/// Which [`DistanceModel`] a report uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceModelKind {
    Spherical,
    #[default]
    Vincenty,
}

impl DistanceModelKind {
    pub fn build(self, max_iterations: usize) -> Box<dyn DistanceModel> {
        match self {
            DistanceModelKind::Spherical => Box::new(Spherical),
            DistanceModelKind::Vincenty => Box::new(Vincenty::new(max_iterations)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Spherical;

impl DistanceModel for Spherical {
    fn name(&self) -> &'static str {
        "spherical"
    }

    fn distance_km(&self, from: (f64, f64), to: (f64, f64)) -> Result<f64, GeodesyError> {
        Ok(great_circle_distance(from.0, from.1, to.0, to.1))
    }
}

/// Vincenty's inverse solution on the WGS 84 ellipsoid.
#[derive(Debug, Clone, Copy)]
pub struct Vincenty {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for Vincenty {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Vincenty {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            tolerance: 1.0e-12,
        }
    }

    /// Geodesic length in metres.
    pub fn inverse_m(&self, from: (f64, f64), to: (f64, f64)) -> Result<f64, GeodesyError> {
        let a = WGS84_A;
        let f = WGS84_F;
        let b = (1.0 - f) * a;

        let l = wrap_radians((to.0 - from.0).to_radians());
        let u1 = ((1.0 - f) * from.1.to_radians().tan()).atan();
        let u2 = ((1.0 - f) * to.1.to_radians().tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_u2, cos_u2) = u2.sin_cos();

        let mut lambda = l;
        let mut converged = false;
        let mut iterations = 0;

        let (mut sin_sigma, mut cos_sigma, mut sigma) = (0.0, 1.0, 0.0);
        let (mut cos_sq_alpha, mut cos_2sigma_m) = (1.0, 0.0);

        while iterations < self.max_iterations {
            iterations += 1;
            let (sin_lambda, cos_lambda) = lambda.sin_cos();

            sin_sigma = ((cos_u2 * sin_lambda).powi(2)
                + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
            .sqrt();
            if sin_sigma == 0.0 {
                // Coincident points.
                return Ok(0.0);
            }
            cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            sigma = sin_sigma.atan2(cos_sigma);

            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
            // Equatorial lines have cos²α = 0.
            cos_2sigma_m = if cos_sq_alpha != 0.0 {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
            } else {
                0.0
            };

            let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
            let previous = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sigma_m
                                + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

            if lambda.abs() > PI {
                // Nearly antipodal: the series wanders off instead of converging.
                return Err(GeodesyError::NoConvergence { iterations });
            }
            if (lambda - previous).abs() <= self.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(GeodesyError::NoConvergence { iterations });
        }

        let u_sq = cos_sq_alpha * (a * a - b * b) / (b * b);
        let big_a =
            1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
        let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
        let delta_sigma = big_b
            * sin_sigma
            * (cos_2sigma_m
                + big_b / 4.0
                    * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                        - big_b / 6.0
                            * cos_2sigma_m
                            * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                            * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));

        Ok(b * big_a * (sigma - delta_sigma))
    }
}

impl DistanceModel for Vincenty {
    fn name(&self) -> &'static str {
        "vincenty"
    }

    fn distance_km(&self, from: (f64, f64), to: (f64, f64)) -> Result<f64, GeodesyError> {
        self.inverse_m(from, to).map(|m| m * 0.001)
    }
}

fn wrap_radians(x: f64) -> f64 {
    let wrapped = (x + PI).rem_euclid(2.0 * PI) - PI;
    // Keep +π rather than folding it onto -π.
    if wrapped == -PI && x > 0.0 {
        PI
    } else {
        wrapped
    }
}

fn normalize_lon(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

fn to_unit_vector(lon: f64, lat: f64) -> [f64; 3] {
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
    [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat]
}

fn from_unit_vector(v: [f64; 3]) -> (f64, f64) {
    let lat = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt());
    let lon = v[1].atan2(v[0]);
    (lon.to_degrees(), lat.to_degrees())
}

/// Discretises the great circle between two positions.
///
/// Consecutive points are at most `max_segment_m` metres apart along the arc.
/// The result is one line string per side of the antimeridian, in travel
/// order; a path that does not cross ±180° comes back as a single line.
pub fn great_circle_path(
    lon1: f64,
    lat1: f64,
    lon2: f64,
    lat2: f64,
    max_segment_m: f64,
) -> Result<Vec<LineString>, GeodesyError> {
    if !(max_segment_m > 0.0 && max_segment_m.is_finite()) {
        return Err(GeodesyError::InvalidSegmentLength(max_segment_m));
    }

    let start = (normalize_lon(lon1), lat1);
    let end = (normalize_lon(lon2), lat2);

    let delta = angular_distance(lon1, lat1, lon2, lat2).to_radians();
    if delta == 0.0 {
        return Ok(vec![vec![start, end]]);
    }
    if PI - delta < 1.0e-9 {
        return Err(GeodesyError::Antipodal);
    }

    let arc_m = delta * EARTH_MEAN_RADIUS_KM * 1000.0;
    let segments = (arc_m / max_segment_m).ceil().max(1.0);
    if segments > MAX_PATH_SEGMENTS as f64 {
        return Err(GeodesyError::InvalidSegmentLength(max_segment_m));
    }
    let segments = segments as usize;

    let v1 = to_unit_vector(lon1, lat1);
    let v2 = to_unit_vector(lon2, lat2);
    let sin_delta = delta.sin();

    let mut points = Vec::with_capacity(segments + 1);
    points.push(start);
    for i in 1..segments {
        let t = i as f64 / segments as f64;
        let w1 = ((1.0 - t) * delta).sin() / sin_delta;
        let w2 = (t * delta).sin() / sin_delta;
        let v = [
            w1 * v1[0] + w2 * v2[0],
            w1 * v1[1] + w2 * v2[1],
            w1 * v1[2] + w2 * v2[2],
        ];
        points.push(from_unit_vector(v));
    }
    points.push(end);

    Ok(split_antimeridian(&points))
}

/// Breaks a polyline wherever consecutive points jump more than 180° in
/// longitude, closing each piece on the ±180° meridian at the interpolated
/// crossing latitude.
pub fn split_antimeridian(points: &[(f64, f64)]) -> Vec<LineString> {
    let mut lines: Vec<LineString> = Vec::new();
    let mut current: LineString = Vec::new();

    for &(lon, lat) in points {
        if let Some(&(prev_lon, prev_lat)) = current.last() {
            let d_lon = lon - prev_lon;
            if d_lon.abs() > 180.0 {
                let (edge, unwrapped) = if d_lon < 0.0 {
                    (180.0, lon + 360.0)
                } else {
                    (-180.0, lon - 360.0)
                };
                let t = (edge - prev_lon) / (unwrapped - prev_lon);
                let crossing_lat = prev_lat + t * (lat - prev_lat);

                push_distinct(&mut current, (edge, crossing_lat));
                lines.push(std::mem::take(&mut current));
                current.push((-edge, crossing_lat));
            }
        }
        push_distinct(&mut current, (lon, lat));
    }
    lines.push(current);

    lines.retain(|line| line.len() >= 2);
    lines
}

fn push_distinct(line: &mut LineString, point: (f64, f64)) {
    if line.last() != Some(&point) {
        line.push(point);
    }
}
