//! Hotspot computation and the runtime around it.
//!
//! The pure core (`aggregation`, `filtering`, `presentation`, `geohash`,
//! `test_events`) has no I/O. `refresh`, `debounce` and `polling` drive it
//! against a repository.

pub mod aggregation;
pub mod debounce;
pub mod filtering;
pub mod geohash;
pub mod polling;
pub mod presentation;
pub mod refresh;
pub mod test_events;

pub use aggregation::{aggregate, aggregate_events, grid_size_for_zoom};
pub use debounce::Debouncer;
pub use filtering::{admits, EventFilter};
pub use polling::spawn_poller;
pub use presentation::{color_for_count, style_hotspots, HotspotColor, StyledHotspot};
pub use refresh::{HotspotSnapshot, RefreshController, RefreshTrigger};
