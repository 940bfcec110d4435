//! Geohash encoding and range queries.
//!
//! A geohash range query selects every record whose geohash starts with one of
//! a few prefixes. The prefixes are chosen so that their cells cover the
//! viewport, which means the result over-selects and must be filtered exactly
//! afterwards (see [`crate::services::filtering`]).

use serde::{Deserialize, Serialize};

use crate::models::{LatLng, ViewportBounds};

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Precision stored alongside every event.
pub const STORED_PRECISION: usize = 10;

/// Longest prefix used when building range queries.
pub const MAX_QUERY_PRECISION: usize = 9;

/// Encode a point as a geohash of `precision` characters.
pub fn encode(point: LatLng, precision: usize) -> String {
    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lng_lo, mut lng_hi) = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);
    let mut bits: usize = 0;
    let mut bit_count = 0;
    let mut even = true;

    while hash.len() < precision {
        if even {
            let mid = (lng_lo + lng_hi) / 2.0;
            if point.longitude >= mid {
                bits = (bits << 1) | 1;
                lng_lo = mid;
            } else {
                bits <<= 1;
                lng_hi = mid;
            }
        } else {
            let mid = (lat_lo + lat_hi) / 2.0;
            if point.latitude >= mid {
                bits = (bits << 1) | 1;
                lat_lo = mid;
            } else {
                bits <<= 1;
                lat_hi = mid;
            }
        }
        even = !even;
        bit_count += 1;

        if bit_count == 5 {
            hash.push(BASE32[bits] as char);
            bits = 0;
            bit_count = 0;
        }
    }

    hash
}

/// Cell size `(lat_degrees, lng_degrees)` of a geohash of `precision` characters.
pub fn cell_dimensions(precision: usize) -> (f64, f64) {
    let total_bits = 5 * precision as i32;
    let lng_bits = (total_bits + 1) / 2;
    let lat_bits = total_bits / 2;
    (180.0 / 2f64.powi(lat_bits), 360.0 / 2f64.powi(lng_bits))
}

/// Inclusive lexicographic range of geohashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeohashRange {
    pub start: String,
    pub end: String,
}

impl GeohashRange {
    /// Every geohash starting with `prefix`.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let start = prefix.into();
        let end = format!("{}~", start);
        Self { start, end }
    }

    pub fn contains(&self, hash: &str) -> bool {
        hash >= self.start.as_str() && hash <= self.end.as_str()
    }
}

/// Prefix ranges whose cells jointly cover `bounds`.
///
/// Uses the longest precision whose cell is at least as large as the viewport
/// on both axes, so the viewport touches at most two cells per axis and the
/// cells of its four corners cover it. A viewport larger than any cell yields
/// a single range spanning the whole globe.
pub fn query_ranges(bounds: &ViewportBounds) -> Vec<GeohashRange> {
    let lat_span = bounds.lat_span();
    let lng_span = bounds.lng_span();
    let precision = (1..=MAX_QUERY_PRECISION)
        .rev()
        .find(|&p| {
            let (cell_lat, cell_lng) = cell_dimensions(p);
            cell_lat >= lat_span && cell_lng >= lng_span
        })
        .unwrap_or(0);

    if precision == 0 {
        return vec![GeohashRange::prefix("")];
    }

    let mut prefixes: Vec<String> = bounds
        .corners()
        .iter()
        .map(|corner| encode(*corner, precision))
        .collect();
    prefixes.sort();
    prefixes.dedup();
    prefixes.into_iter().map(GeohashRange::prefix).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode(LatLng::new(57.64911, 10.40744), 11), "u4pruydqqvj");
        assert_eq!(encode(LatLng::new(0.0, 0.0), 5), "s0000");
        assert_eq!(encode(LatLng::new(-90.0, -180.0), 4), "0000");
    }

    #[test]
    fn test_encode_prefix_property() {
        let point = LatLng::new(40.4168, -3.7038);
        let long = encode(point, 10);
        for p in 1..10 {
            assert!(long.starts_with(&encode(point, p)));
        }
    }

    #[test]
    fn test_cell_dimensions() {
        assert_eq!(cell_dimensions(1), (45.0, 45.0));
        assert_eq!(cell_dimensions(2), (5.625, 11.25));
        assert_eq!(cell_dimensions(0), (180.0, 360.0));
    }

    #[test]
    fn test_range_contains() {
        let range = GeohashRange::prefix("u4pr");
        assert!(range.contains("u4pr"));
        assert!(range.contains("u4pruydqqvj"));
        assert!(!range.contains("u4ps0"));
        assert!(!range.contains("u4pq"));
        assert!(GeohashRange::prefix("").contains("zzzz"));
    }

    #[test]
    fn test_query_ranges_cover_viewport() {
        let bounds = ViewportBounds::new(40.43, 40.40, -3.68, -3.72);
        let ranges = query_ranges(&bounds);
        assert!(!ranges.is_empty() && ranges.len() <= 4);

        for i in 0..=10 {
            for j in 0..=10 {
                let lat = bounds.south + bounds.lat_span() * i as f64 / 10.0;
                let lng = bounds.west + bounds.lng_span() * j as f64 / 10.0;
                let hash = encode(LatLng::new(lat, lng), STORED_PRECISION);
                assert!(
                    ranges.iter().any(|r| r.contains(&hash)),
                    "point ({}, {}) not covered",
                    lat,
                    lng
                );
            }
        }
    }

    #[test]
    fn test_query_ranges_whole_world() {
        let bounds = ViewportBounds::new(80.0, -80.0, 170.0, -170.0);
        assert_eq!(query_ranges(&bounds), vec![GeohashRange::prefix("")]);
    }
}
