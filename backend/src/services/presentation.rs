//! Marker color and radius for hotspots.

use serde::{Deserialize, Serialize};

use crate::models::Hotspot;

/// Marker color bucket, by hotspot count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotspotColor {
    Green,
    Yellow,
    Orange,
    Red,
}

impl HotspotColor {
    /// Fill color used by the map markers.
    pub fn hex(&self) -> &'static str {
        match self {
            HotspotColor::Green => "#2ca02c",
            HotspotColor::Yellow => "#f2c40f",
            HotspotColor::Orange => "#ff7f0e",
            HotspotColor::Red => "#d62728",
        }
    }
}

/// ≥31 red, ≥11 orange, ≥4 yellow, otherwise green.
pub fn color_for_count(count: usize) -> HotspotColor {
    match count {
        31.. => HotspotColor::Red,
        11..=30 => HotspotColor::Orange,
        4..=10 => HotspotColor::Yellow,
        _ => HotspotColor::Green,
    }
}

/// Marker radius in pixels: `max(8, zoom * 0.8) + sqrt(count) * 4`.
pub fn radius_for(zoom: f64, count: usize) -> f64 {
    (zoom * 0.8).max(8.0) + (count as f64).sqrt() * 4.0
}

/// A hotspot with its marker style attached, as served to the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyledHotspot {
    pub latitude: f64,
    pub longitude: f64,
    pub count: usize,
    pub color: HotspotColor,
    pub fill: String,
    pub radius: f64,
}

impl StyledHotspot {
    pub fn new(hotspot: Hotspot, zoom: f64) -> Self {
        let color = color_for_count(hotspot.count);
        Self {
            latitude: hotspot.latitude,
            longitude: hotspot.longitude,
            count: hotspot.count,
            color,
            fill: color.hex().to_string(),
            radius: radius_for(zoom, hotspot.count),
        }
    }
}

pub fn style_hotspots(hotspots: Vec<Hotspot>, zoom: f64) -> Vec<StyledHotspot> {
    hotspots
        .into_iter()
        .map(|h| StyledHotspot::new(h, zoom))
        .collect()
}
