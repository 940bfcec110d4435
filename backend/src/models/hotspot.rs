use serde::{Deserialize, Serialize};

use super::geo::LatLng;

/// One displayed cluster: the centroid of the events sharing a grid cell and
/// how many there are.
///
/// Hotspots are derived and ephemeral. Every refresh replaces the whole set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub latitude: f64,
    pub longitude: f64,
    pub count: usize,
}

impl Hotspot {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}
