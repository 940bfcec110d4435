use serde::{Deserialize, Serialize};

use super::geo::{LatLng, ViewportBounds};

/// Last known map view: what gets persisted between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub center: LatLng,
    pub zoom: f64,
    /// Visible rectangle, when the map has reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<ViewportBounds>,
}

impl ViewState {
    pub fn from_bounds(bounds: ViewportBounds, zoom: f64) -> Self {
        Self {
            center: bounds.center(),
            zoom,
            bounds: Some(bounds),
        }
    }

    /// Visible rectangle, or an estimate derived from center and zoom.
    ///
    /// The estimate assumes a viewport of roughly 1024x768 pixels of 256-pixel
    /// tiles, which is enough to seed the first query after a restore.
    pub fn effective_bounds(&self) -> ViewportBounds {
        if let Some(bounds) = self.bounds {
            return bounds;
        }
        let tiles_across = 2f64.powf(self.zoom.clamp(0.0, 22.0));
        let lng_span = 360.0 / tiles_across * 4.0;
        let lat_span = 180.0 / tiles_across * 3.0;
        ViewportBounds::around(self.center, lat_span, lng_span)
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            center: LatLng::new(0.0, 0.0),
            zoom: 2.0,
            bounds: None,
        }
    }
}
