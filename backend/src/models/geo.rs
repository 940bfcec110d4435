//! Geographic primitives shared by the aggregation, filtering and storage layers.
//!
//! All coordinates are WGS84 degrees. Cells, spans and bounds are expressed in
//! degrees as well; no projection is applied anywhere in the crate.

use serde::{Deserialize, Serialize};

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Visible rectangle of the map, as reported by the map on every view change.
///
/// Bounds are inclusive on all four edges. Viewports crossing the antimeridian
/// (`west > east`) are not representable and fail [`ViewportBounds::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl ViewportBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Bounds of the given size centered on `center`, clamped to the globe.
    pub fn around(center: LatLng, lat_span: f64, lng_span: f64) -> Self {
        let half_lat = lat_span.abs() / 2.0;
        let half_lng = lng_span.abs() / 2.0;
        Self {
            north: (center.latitude + half_lat).min(90.0),
            south: (center.latitude - half_lat).max(-90.0),
            east: (center.longitude + half_lng).min(180.0),
            west: (center.longitude - half_lng).max(-180.0),
        }
    }

    /// Check that the rectangle is well formed.
    ///
    /// # Returns
    /// * `Ok(())` if all edges are finite, inside WGS84 ranges, and ordered
    /// * `Err(String)` describing the first problem found
    pub fn validate(&self) -> Result<(), String> {
        let edges = [
            ("north", self.north),
            ("south", self.south),
            ("east", self.east),
            ("west", self.west),
        ];
        for (name, value) in edges {
            if !value.is_finite() {
                return Err(format!("{} edge is not a finite number", name));
            }
        }
        if !(-90.0..=90.0).contains(&self.north) || !(-90.0..=90.0).contains(&self.south) {
            return Err("latitude edges must lie within [-90, 90]".to_string());
        }
        if !(-180.0..=180.0).contains(&self.east) || !(-180.0..=180.0).contains(&self.west) {
            return Err("longitude edges must lie within [-180, 180]".to_string());
        }
        if self.south > self.north {
            return Err(format!(
                "south edge {} is above north edge {}",
                self.south, self.north
            ));
        }
        if self.west > self.east {
            return Err(format!(
                "west edge {} is east of east edge {}",
                self.west, self.east
            ));
        }
        Ok(())
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: &LatLng) -> bool {
        point.latitude >= self.south
            && point.latitude <= self.north
            && point.longitude >= self.west
            && point.longitude <= self.east
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    /// The four corners, starting north-west and going clockwise.
    pub fn corners(&self) -> [LatLng; 4] {
        [
            LatLng::new(self.north, self.west),
            LatLng::new(self.north, self.east),
            LatLng::new(self.south, self.east),
            LatLng::new(self.south, self.west),
        ]
    }
}
