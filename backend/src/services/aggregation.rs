//! Grid aggregation of events into hotspots.
//!
//! Points are bucketed into square cells whose edge (in degrees) depends on the
//! zoom level. Cells are not corrected for latitude, so their ground size
//! shrinks toward the poles.

use std::collections::HashMap;

use crate::models::{Hotspot, LatLng, RawEvent};

/// Cell edge for zoom 15 and above.
pub const FINE_GRID_DEG: f64 = 0.002;
/// Cell edge for zoom 12 up to 15.
pub const MEDIUM_GRID_DEG: f64 = 0.005;
/// Cell edge below zoom 12.
pub const COARSE_GRID_DEG: f64 = 0.01;

/// Cell edge length in degrees for a zoom level.
pub fn grid_size_for_zoom(zoom: f64) -> f64 {
    if zoom >= 15.0 {
        FINE_GRID_DEG
    } else if zoom >= 12.0 {
        MEDIUM_GRID_DEG
    } else {
        COARSE_GRID_DEG
    }
}

/// Cell index `(column, row)` of a point: `(floor(lng / grid), floor(lat / grid))`.
pub fn cell_index(point: &LatLng, grid_size: f64) -> (i64, i64) {
    (
        (point.longitude / grid_size).floor() as i64,
        (point.latitude / grid_size).floor() as i64,
    )
}

#[derive(Default)]
struct CellAccumulator {
    lat_sum: f64,
    lng_sum: f64,
    count: usize,
}

/// Bucket points into grid cells and emit one hotspot per non-empty cell.
///
/// Each hotspot sits at the arithmetic mean of its members and carries their
/// count. The output order follows the internal grouping and is unspecified.
pub fn aggregate(points: &[LatLng], zoom: f64) -> Vec<Hotspot> {
    let grid_size = grid_size_for_zoom(zoom);
    let mut cells: HashMap<(i64, i64), CellAccumulator> = HashMap::new();

    for point in points {
        let cell = cells.entry(cell_index(point, grid_size)).or_default();
        cell.lat_sum += point.latitude;
        cell.lng_sum += point.longitude;
        cell.count += 1;
    }

    cells
        .into_values()
        .map(|cell| Hotspot {
            latitude: cell.lat_sum / cell.count as f64,
            longitude: cell.lng_sum / cell.count as f64,
            count: cell.count,
        })
        .collect()
}

/// [`aggregate`] over normalized events.
pub fn aggregate_events(events: &[RawEvent], zoom: f64) -> Vec<Hotspot> {
    let points: Vec<LatLng> = events.iter().map(RawEvent::position).collect();
    aggregate(&points, zoom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_by_count(mut hotspots: Vec<Hotspot>) -> Vec<Hotspot> {
        hotspots.sort_by(|a, b| b.count.cmp(&a.count));
        hotspots
    }

    #[test]
    fn test_grid_size_steps() {
        assert_eq!(grid_size_for_zoom(18.0), 0.002);
        assert_eq!(grid_size_for_zoom(15.0), 0.002);
        assert_eq!(grid_size_for_zoom(14.9), 0.005);
        assert_eq!(grid_size_for_zoom(12.0), 0.005);
        assert_eq!(grid_size_for_zoom(11.99), 0.01);
        assert_eq!(grid_size_for_zoom(0.0), 0.01);
    }

    #[test]
    fn test_cell_index_floors_negative_coordinates() {
        assert_eq!(cell_index(&LatLng::new(0.0001, 0.0001), 0.01), (0, 0));
        assert_eq!(cell_index(&LatLng::new(-0.0001, -0.0001), 0.01), (-1, -1));
        assert_eq!(cell_index(&LatLng::new(0.015, 0.025), 0.01), (2, 1));
    }

    #[test]
    fn test_aggregate_empty() {
        for zoom in [0.0, 11.0, 12.0, 15.0, 20.0] {
            assert!(aggregate(&[], zoom).is_empty());
        }
    }

    #[test]
    fn test_aggregate_two_cells() {
        let points = vec![
            LatLng::new(0.0001, 0.0001),
            LatLng::new(0.0002, 0.0002),
            LatLng::new(5.0, 5.0),
        ];
        let hotspots = sorted_by_count(aggregate(&points, 10.0));

        assert_eq!(hotspots.len(), 2);
        assert_eq!(hotspots[0].count, 2);
        assert!((hotspots[0].latitude - 0.00015).abs() < 1e-12);
        assert!((hotspots[0].longitude - 0.00015).abs() < 1e-12);
        assert_eq!(hotspots[1].count, 1);
        assert_eq!(hotspots[1].latitude, 5.0);
        assert_eq!(hotspots[1].longitude, 5.0);
    }

    #[test]
    fn test_aggregate_same_cell_collapses_to_mean() {
        let points = vec![
            LatLng::new(40.4161, -3.7031),
            LatLng::new(40.4163, -3.7035),
            LatLng::new(40.4165, -3.7033),
            LatLng::new(40.4167, -3.7039),
        ];
        let hotspots = aggregate(&points, 10.0);

        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].count, 4);
        assert!((hotspots[0].latitude - 40.4164).abs() < 1e-9);
        assert!((hotspots[0].longitude - (-3.70345)).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_splits_with_finer_grid() {
        // 0.004 apart: same 0.01 cell, different 0.002 cells
        let points = vec![LatLng::new(0.001, 0.001), LatLng::new(0.005, 0.005)];
        assert_eq!(aggregate(&points, 10.0).len(), 1);
        assert_eq!(aggregate(&points, 16.0).len(), 2);
    }

    #[test]
    fn test_aggregate_events_uses_positions() {
        let ts = chrono::Utc::now();
        let events = vec![
            RawEvent::new(10.0001, 20.0001, ts),
            RawEvent::new(10.0002, 20.0002, ts),
        ];
        let hotspots = aggregate_events(&events, 13.0);
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].count, 2);
    }
}
