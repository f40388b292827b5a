//! Encoded polyline decoding (precision 5, the format OSRM and most directions APIs return).

use crate::error::GeoError;
use crate::models::Coordinate;

const PRECISION: f64 = 1e5;

/// Decode an encoded polyline into a corridor path.
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>, GeoError> {
    let bytes = encoded.as_bytes();
    let mut index = 0usize;
    let mut lat = 0i64;
    let mut lon = 0i64;
    let mut path = Vec::new();

    while index < bytes.len() {
        lat += next_value(bytes, &mut index)?;
        lon += next_value(bytes, &mut index)?;
        let point = Coordinate::new(lat as f64 / PRECISION, lon as f64 / PRECISION);
        if !point.is_valid() {
            return Err(GeoError::InvalidPolyline(index));
        }
        path.push(point);
    }

    Ok(path)
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, GeoError> {
    let mut result = 0i64;
    let mut shift = 0u32;
    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(GeoError::InvalidPolyline(*index));
        };
        if !(63..127).contains(&byte) || shift > 30 {
            return Err(GeoError::InvalidPolyline(*index));
        }
        *index += 1;
        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Ok(if result & 1 == 1 { !(result >> 1) } else { result >> 1 })
}
