//! Properties of the aggregation, filtering and presentation core.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashMap;

use hotspot_map::models::{Hotspot, LatLng, RawEvent, ViewportBounds};
use hotspot_map::services::aggregation::{aggregate, cell_index, grid_size_for_zoom};
use hotspot_map::services::filtering::admits;
use hotspot_map::services::presentation::{color_for_count, radius_for, HotspotColor};

fn sorted(mut hotspots: Vec<Hotspot>) -> Vec<Hotspot> {
    hotspots.sort_by(|a, b| {
        a.latitude
            .total_cmp(&b.latitude)
            .then(a.longitude.total_cmp(&b.longitude))
            .then(a.count.cmp(&b.count))
    });
    hotspots
}

fn points() -> impl Strategy<Value = Vec<LatLng>> {
    prop::collection::vec((-89.0f64..89.0, -179.0f64..179.0), 0..200)
        .prop_map(|v| v.into_iter().map(|(lat, lng)| LatLng::new(lat, lng)).collect())
}

/// Points kept at least 1e-4 degrees away from every 0.005 and 0.01 grid line.
fn off_grid_points() -> impl Strategy<Value = Vec<LatLng>> {
    prop::collection::vec(((-500i64..500, 0.1f64..0.9), (-500i64..500, 0.1f64..0.9)), 0..150)
        .prop_map(|v| {
            v.into_iter()
                .map(|((li, lf), (gi, gf))| {
                    LatLng::new((li as f64 + lf) * 0.001, (gi as f64 + gf) * 0.001)
                })
                .collect()
        })
}

proptest! {
    #[test]
    fn empty_input_yields_nothing(zoom in 0.0f64..22.0) {
        prop_assert!(aggregate(&[], zoom).is_empty());
    }

    #[test]
    fn counts_add_up(points in points(), zoom in 0.0f64..22.0) {
        let hotspots = aggregate(&points, zoom);
        prop_assert_eq!(hotspots.iter().map(|h| h.count).sum::<usize>(), points.len());
        prop_assert!(hotspots.iter().all(|h| h.count >= 1));
    }

    #[test]
    fn each_hotspot_is_the_mean_of_its_cell(points in points(), zoom in 0.0f64..22.0) {
        let grid = grid_size_for_zoom(zoom);
        let mut cells: HashMap<(i64, i64), Vec<LatLng>> = HashMap::new();
        for p in &points {
            cells.entry(cell_index(p, grid)).or_default().push(*p);
        }

        let hotspots = aggregate(&points, zoom);
        prop_assert_eq!(hotspots.len(), cells.len());
        for members in cells.values() {
            let n = members.len() as f64;
            let lat = members.iter().map(|p| p.latitude).sum::<f64>() / n;
            let lng = members.iter().map(|p| p.longitude).sum::<f64>() / n;
            let found = hotspots.iter().any(|h| {
                h.count == members.len()
                    && (h.latitude - lat).abs() < 1e-9
                    && (h.longitude - lng).abs() < 1e-9
            });
            prop_assert!(found);
        }
    }

    #[test]
    fn aggregation_is_deterministic(points in points(), zoom in 0.0f64..22.0) {
        prop_assert_eq!(sorted(aggregate(&points, zoom)), sorted(aggregate(&points, zoom)));
    }

    #[test]
    fn nested_grid_never_merges_cells(points in off_grid_points()) {
        // 0.005 cells tile each 0.01 cell exactly.
        prop_assert!(aggregate(&points, 12.0).len() >= aggregate(&points, 11.0).len());
    }

    #[test]
    fn filter_admits_exactly_the_inclusive_rectangle(
        lat in -3.0f64..3.0,
        lng in -3.0f64..3.0,
        offset_secs in -10i64..10,
    ) {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let bounds = ViewportBounds::new(1.0, -1.0, 1.0, -1.0);
        let event = RawEvent::new(lat, lng, start + Duration::seconds(offset_secs));
        let expected = (-1.0..=1.0).contains(&lat)
            && (-1.0..=1.0).contains(&lng)
            && offset_secs >= 0;
        prop_assert_eq!(admits(&event, &bounds, start), expected);
    }

    #[test]
    fn radius_is_monotonic(zoom in 0.0f64..22.0, count in 1usize..1000) {
        prop_assert!(radius_for(zoom, count + 1) > radius_for(zoom, count));
        prop_assert!(radius_for(zoom + 0.5, count) >= radius_for(zoom, count));
    }
}

#[test]
fn worked_example_two_hotspots() {
    let points = [
        LatLng::new(0.0001, 0.0001),
        LatLng::new(0.0002, 0.0002),
        LatLng::new(5.0, 5.0),
    ];
    let mut hotspots = aggregate(&points, 10.0);
    hotspots.sort_by(|a, b| b.count.cmp(&a.count));

    assert_eq!(hotspots.len(), 2);
    assert_eq!(hotspots[0].count, 2);
    assert!((hotspots[0].latitude - 0.00015).abs() < 1e-12);
    assert!((hotspots[0].longitude - 0.00015).abs() < 1e-12);
    assert_eq!(hotspots[1].count, 1);
    assert_eq!((hotspots[1].latitude, hotspots[1].longitude), (5.0, 5.0));
}

#[test]
fn worked_example_filter() {
    let t = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let bounds = ViewportBounds::new(1.0, -1.0, 1.0, -1.0);
    let second = Duration::seconds(1);
    assert!(admits(&RawEvent::new(0.5, 0.5, t + second), &bounds, t));
    assert!(!admits(&RawEvent::new(2.0, 0.0, t + second), &bounds, t));
    assert!(!admits(&RawEvent::new(0.0, 0.0, t - second), &bounds, t));
}

#[test]
fn color_boundaries() {
    assert_eq!(color_for_count(3), HotspotColor::Green);
    assert_eq!(color_for_count(4), HotspotColor::Yellow);
    assert_eq!(color_for_count(10), HotspotColor::Yellow);
    assert_eq!(color_for_count(11), HotspotColor::Orange);
    assert_eq!(color_for_count(30), HotspotColor::Orange);
    assert_eq!(color_for_count(31), HotspotColor::Red);
}

#[test]
fn fine_grid_can_split_differently_from_medium_grid() {
    // 0.002 cells straddle 0.005 lines, so crossing zoom 15 is not a pure
    // refinement: these two points share a fine cell but not a medium one.
    let points = [LatLng::new(0.0, 0.0045), LatLng::new(0.0, 0.0055)];
    assert_eq!(aggregate(&points, 15.0).len(), 1);
    assert_eq!(aggregate(&points, 12.0).len(), 2);
}
