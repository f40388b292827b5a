//! Spherical geometry for corridor filtering and clustering.

use crate::error::GeoError;
use crate::models::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Segments shorter than this are treated as a single point.
const ZERO_LENGTH_SEGMENT_M: f64 = 1e-6;

/// Calculate distance between two points in meters using Haversine formula.
///
/// This is the standard formula for calculating great-circle distance
/// between two points on a sphere given their latitudes and longitudes.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Calculate bearing from point 1 to point 2 in radians.
/// Returns bearing in radians, 0 = north, π/2 = east.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Offset a position by distance and bearing.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_m` - Distance in meters
/// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Reject NaN and out-of-range coordinates.
pub fn validate(point: Coordinate) -> Result<Coordinate, GeoError> {
    if point.is_valid() {
        Ok(point)
    } else {
        Err(GeoError::InvalidCoordinate {
            lat: point.lat,
            lon: point.lon,
        })
    }
}

/// Great-circle distance between two coordinates in meters.
pub fn haversine(a: Coordinate, b: Coordinate) -> Result<f64, GeoError> {
    validate(a)?;
    validate(b)?;
    Ok(haversine_distance(a.lat, a.lon, b.lat, b.lon))
}

/// Shortest distance in meters from `point` to the great-circle segment `[start, end]`.
///
/// Uses the cross-track distance when the along-track projection lands on the
/// segment, otherwise the nearer endpoint. Never exceeds the distance to either
/// endpoint.
pub fn distance_point_to_segment(
    point: Coordinate,
    start: Coordinate,
    end: Coordinate,
) -> Result<f64, GeoError> {
    let dist_start = haversine(point, start)?;
    let dist_end = haversine(point, end)?;
    let segment_length = haversine(start, end)?;

    if segment_length <= ZERO_LENGTH_SEGMENT_M {
        return Ok(dist_start);
    }

    let angular_start = dist_start / EARTH_RADIUS_M;
    let bearing_to_point = bearing(start.lat, start.lon, point.lat, point.lon);
    let bearing_to_end = bearing(start.lat, start.lon, end.lat, end.lon);
    let bearing_delta = bearing_to_point - bearing_to_end;

    let cross_track =
        (angular_start.sin() * bearing_delta.sin()).clamp(-1.0, 1.0).asin() * EARTH_RADIUS_M;
    let cross_angular = cross_track / EARTH_RADIUS_M;
    let mut along_track = (angular_start.cos() / cross_angular.cos())
        .clamp(-1.0, 1.0)
        .acos()
        * EARTH_RADIUS_M;
    if bearing_delta.cos() < 0.0 {
        along_track = -along_track;
    }

    let nearest_endpoint = dist_start.min(dist_end);
    if along_track < 0.0 || along_track > segment_length {
        return Ok(nearest_endpoint);
    }
    Ok(cross_track.abs().min(nearest_endpoint))
}

/// Minimum distance from `point` to any segment of `path`.
///
/// Returns `f64::INFINITY` when the path has fewer than two points.
pub fn min_distance_point_to_polyline(
    point: Coordinate,
    path: &[Coordinate],
) -> Result<f64, GeoError> {
    validate(point)?;
    let mut best = f64::INFINITY;
    for pair in path.windows(2) {
        let distance = distance_point_to_segment(point, pair[0], pair[1])?;
        if distance < best {
            best = distance;
        }
    }
    Ok(best)
}

/// True when `point` lies within `radius_m` of the corridor path.
pub fn is_within_corridor(
    point: Coordinate,
    path: &[Coordinate],
    radius_m: f64,
) -> Result<bool, GeoError> {
    Ok(min_distance_point_to_polyline(point, path)? <= radius_m)
}
