//! Viewport and time-window admission of events.
//!
//! Backends are allowed to over-select (a geohash range covers more than the
//! visible rectangle) and to return events older than the selected window;
//! this filter is the exact check applied afterwards.

use chrono::{DateTime, Utc};

use crate::models::{RawEvent, TimeWindow, ViewportBounds};

/// Admit iff the event lies inside `bounds` (inclusive) and is not older than `start`.
pub fn admits(event: &RawEvent, bounds: &ViewportBounds, start: DateTime<Utc>) -> bool {
    bounds.contains(&event.position()) && event.timestamp >= start
}

/// Bounds and window start captured once per refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventFilter {
    pub bounds: ViewportBounds,
    pub start: DateTime<Utc>,
}

impl EventFilter {
    pub fn new(bounds: ViewportBounds, start: DateTime<Utc>) -> Self {
        Self { bounds, start }
    }

    /// Resolve `window` against the current local time.
    pub fn for_window(bounds: ViewportBounds, window: TimeWindow) -> Self {
        Self::new(bounds, window.start_now())
    }

    pub fn admits(&self, event: &RawEvent) -> bool {
        admits(event, &self.bounds, self.start)
    }

    /// Keep admitted events, preserving input order.
    pub fn apply(&self, events: impl IntoIterator<Item = RawEvent>) -> Vec<RawEvent> {
        events.into_iter().filter(|e| self.admits(e)).collect()
    }
}
