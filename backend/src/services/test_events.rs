//! Synthetic events for the "add test event" action.

use rand::Rng;

use crate::models::{LatLng, NewEvent};

/// Default jitter around the map center, in degrees (~500 m at mid latitudes).
pub const DEFAULT_JITTER_DEG: f64 = 0.005;

/// Largest accepted jitter; anything wider already spans the whole globe.
pub const MAX_JITTER_DEG: f64 = 180.0;

/// A new event near `center`, offset uniformly by up to `radius_deg` on both
/// axes. The timestamp is left for the store to assign. Radii are clamped to
/// [`MAX_JITTER_DEG`] and non-finite radii collapse to the center.
pub fn jittered_event<R: Rng + ?Sized>(center: LatLng, radius_deg: f64, rng: &mut R) -> NewEvent {
    let radius = if radius_deg.is_finite() {
        radius_deg.abs().min(MAX_JITTER_DEG)
    } else {
        0.0
    };
    let (d_lat, d_lng) = if radius > 0.0 {
        (
            rng.random_range(-radius..radius),
            rng.random_range(-radius..radius),
        )
    } else {
        (0.0, 0.0)
    };

    let latitude = (center.latitude + d_lat).clamp(-90.0, 90.0);
    let longitude = wrap_longitude(center.longitude + d_lng);
    NewEvent::at(LatLng::new(latitude, longitude))
}

/// Wrap a longitude into `[-180, 180)`.
pub fn wrap_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}
