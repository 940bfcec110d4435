//! Refresh orchestration.
//!
//! [`RefreshController`] owns the current view and time window, runs fetch
//! cycles against a repository and publishes the resulting hotspot set.
//! Refreshes are single-flight: concurrent requests are serialized and a
//! request already covered by a cycle that started after it was issued is
//! answered with that cycle's result instead of fetching again.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::db::repositories::QueryMode;
use crate::db::repository::{ErrorContext, EventRepository, RepositoryError, RepositoryResult};
use crate::db::services::{self, FetchStats};
use crate::db::view_state::ViewStateStore;
use crate::models::{EventId, StoredEvent, TimeWindow, ViewState, ViewportBounds};
use crate::services::aggregation::aggregate_events;
use crate::services::presentation::{style_hotspots, StyledHotspot};
use crate::services::test_events::{DEFAULT_JITTER_DEG, MAX_JITTER_DEG};

/// What asked for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    Manual,
    ViewportChanged,
    Poll,
    TimeWindowChanged,
    TestEvent,
}

impl RefreshTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::ViewportChanged => "viewport_changed",
            Self::Poll => "poll",
            Self::TimeWindowChanged => "time_window_changed",
            Self::TestEvent => "test_event",
        }
    }
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The displayed hotspot set and how it was obtained.
#[derive(Debug, Clone, Serialize)]
pub struct HotspotSnapshot {
    pub hotspots: Vec<StyledHotspot>,
    pub zoom: f64,
    pub window: TimeWindow,
    pub bounds: Option<ViewportBounds>,
    /// `None` until the first cycle completes.
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Increases by one per completed cycle.
    pub generation: u64,
    pub trigger: Option<RefreshTrigger>,
    pub stats: FetchStats,
    /// User-visible message when the last cycle failed.
    pub error: Option<String>,
}

impl HotspotSnapshot {
    fn initial(view: &ViewState, window: TimeWindow) -> Self {
        Self {
            hotspots: Vec::new(),
            zoom: view.zoom,
            window,
            bounds: view.bounds,
            refreshed_at: None,
            generation: 0,
            trigger: None,
            stats: FetchStats::default(),
            error: None,
        }
    }

    /// Events represented by the hotspot set.
    pub fn event_count(&self) -> usize {
        self.hotspots.iter().map(|h| h.count).sum()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
struct ViewSettings {
    view: ViewState,
    window: TimeWindow,
}

/// State owned by whichever cycle holds the refresh lock.
struct CycleState {
    generation: u64,
    seen: HashSet<EventId>,
}

/// Serialized refresh pipeline shared by the HTTP layer, the debouncer and
/// the poller.
pub struct RefreshController {
    repo: Arc<dyn EventRepository>,
    view_store: Arc<dyn ViewStateStore>,
    mode: QueryMode,
    settings: RwLock<ViewSettings>,
    cycle: Mutex<CycleState>,
    /// Ticket handed to the most recent refresh request.
    requested: AtomicU64,
    /// Highest ticket whose request has been answered by a cycle.
    covered: AtomicU64,
    repo_healthy: AtomicBool,
    snapshot_tx: watch::Sender<HotspotSnapshot>,
}

impl RefreshController {
    /// Create a controller, restoring the last saved view if there is one.
    pub fn new(
        repo: Arc<dyn EventRepository>,
        view_store: Arc<dyn ViewStateStore>,
        window: TimeWindow,
    ) -> Self {
        let view = match view_store.load() {
            Ok(Some(view)) => {
                log::info!(
                    "Restored view at ({:.4}, {:.4}) zoom {}",
                    view.center.latitude,
                    view.center.longitude,
                    view.zoom
                );
                view
            }
            Ok(None) => ViewState::default(),
            Err(e) => {
                log::warn!("Could not restore view state: {}", e);
                ViewState::default()
            }
        };

        let (snapshot_tx, _) = watch::channel(HotspotSnapshot::initial(&view, window));
        Self {
            repo,
            view_store,
            mode: QueryMode::default(),
            settings: RwLock::new(ViewSettings { view, window }),
            cycle: Mutex::new(CycleState {
                generation: 0,
                seen: HashSet::new(),
            }),
            requested: AtomicU64::new(0),
            covered: AtomicU64::new(0),
            repo_healthy: AtomicBool::new(true),
            snapshot_tx,
        }
    }

    /// Choose between geohash range queries and full scans.
    pub fn with_query_mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn repository(&self) -> &Arc<dyn EventRepository> {
        &self.repo
    }

    pub fn query_mode(&self) -> QueryMode {
        self.mode
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> HotspotSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Receiver that observes every newly published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<HotspotSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn view_state(&self) -> ViewState {
        self.settings.read().view
    }

    pub fn time_window(&self) -> TimeWindow {
        self.settings.read().window
    }

    /// Whether the "add test event" action is available.
    pub fn can_add_events(&self) -> bool {
        self.repo_healthy.load(Ordering::Acquire) && !self.snapshot_tx.borrow().is_error()
    }

    /// Record a new viewport and persist it. Does not refresh; callers
    /// schedule a [`RefreshTrigger::ViewportChanged`] refresh themselves.
    pub fn set_viewport(&self, bounds: ViewportBounds, zoom: f64) -> RepositoryResult<ViewState> {
        bounds.validate().map_err(|e| {
            RepositoryError::validation_with_context(
                e,
                ErrorContext::new("set_viewport").with_entity("viewport"),
            )
        })?;
        if !zoom.is_finite() || zoom < 0.0 {
            return Err(RepositoryError::validation_with_context(
                format!("invalid zoom {}", zoom),
                ErrorContext::new("set_viewport").with_entity("viewport"),
            ));
        }

        let view = ViewState::from_bounds(bounds, zoom);
        self.settings.write().view = view;
        if let Err(e) = self.view_store.save(&view) {
            log::warn!("Could not persist view state: {}", e);
        }
        Ok(view)
    }

    /// Switch the time window and refresh immediately.
    pub async fn set_time_window(&self, window: TimeWindow) -> HotspotSnapshot {
        self.settings.write().window = window;
        self.refresh(RefreshTrigger::TimeWindowChanged).await
    }

    /// Ask the repository whether it is reachable and remember the answer.
    pub async fn check_health(&self) -> bool {
        let healthy = match services::health_check(self.repo.as_ref()).await {
            Ok(healthy) => healthy,
            Err(e) => {
                log::warn!("{} health check failed: {}", self.repo.name(), e);
                false
            }
        };
        self.repo_healthy.store(healthy, Ordering::Release);
        healthy
    }

    /// Append a jittered event around the current view center, then refresh.
    pub async fn add_test_event(
        &self,
        radius_deg: Option<f64>,
    ) -> RepositoryResult<(StoredEvent, HotspotSnapshot)> {
        if !self.can_add_events() {
            return Err(RepositoryError::connection_with_context(
                "Adding events is disabled while the event store is unavailable",
                ErrorContext::new("add_test_event"),
            ));
        }

        let radius = radius_deg.unwrap_or(DEFAULT_JITTER_DEG);
        if !radius.is_finite() || !(0.0..=MAX_JITTER_DEG).contains(&radius) {
            return Err(RepositoryError::validation(format!(
                "radius must be between 0 and {} degrees",
                MAX_JITTER_DEG
            )));
        }

        let center = self.view_state().center;
        let mut rng = StdRng::from_rng(&mut rand::rng());
        let stored = services::add_test_event(self.repo.as_ref(), center, radius, &mut rng)
            .await
            .map_err(|e| e.with_operation("add_test_event"))?;
        let snapshot = self.refresh(RefreshTrigger::TestEvent).await;
        Ok((stored, snapshot))
    }

    /// Run a refresh cycle, or join one that covers this request.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> HotspotSnapshot {
        let ticket = self.requested.fetch_add(1, Ordering::AcqRel) + 1;
        let mut cycle = self.cycle.lock().await;

        if self.covered.load(Ordering::Acquire) >= ticket {
            log::debug!("Refresh ({}) coalesced into a newer cycle", trigger);
            return self.snapshot();
        }

        // Every request ticketed so far changed its settings before taking
        // the ticket, so reading the settings now answers all of them.
        let high_water = self.requested.load(Ordering::Acquire);
        let settings = *self.settings.read();
        let bounds = settings.view.effective_bounds();
        let start = settings.window.start_now();

        let result = services::fetch_visible_events(
            self.repo.as_ref(),
            &bounds,
            start,
            self.mode,
            &mut cycle.seen,
        )
        .await;

        cycle.generation += 1;
        let snapshot = match result {
            Ok((events, stats)) => {
                self.repo_healthy.store(true, Ordering::Release);
                let zoom = settings.view.zoom;
                let hotspots = style_hotspots(aggregate_events(&events, zoom), zoom);
                log::info!(
                    "Refresh #{} ({}): fetched {}, admitted {}, {} hotspots",
                    cycle.generation,
                    trigger,
                    stats.fetched,
                    stats.admitted,
                    hotspots.len()
                );
                HotspotSnapshot {
                    hotspots,
                    zoom,
                    window: settings.window,
                    bounds: Some(bounds),
                    refreshed_at: Some(Utc::now()),
                    generation: cycle.generation,
                    trigger: Some(trigger),
                    stats,
                    error: None,
                }
            }
            Err(e) => {
                self.repo_healthy.store(false, Ordering::Release);
                log::warn!("Refresh #{} ({}) failed: {}", cycle.generation, trigger, e);
                HotspotSnapshot {
                    hotspots: Vec::new(),
                    zoom: settings.view.zoom,
                    window: settings.window,
                    bounds: Some(bounds),
                    refreshed_at: Some(Utc::now()),
                    generation: cycle.generation,
                    trigger: Some(trigger),
                    stats: FetchStats::default(),
                    error: Some(format!("Could not load events: {}", e.message())),
                }
            }
        };

        self.snapshot_tx.send_replace(snapshot.clone());
        self.covered.fetch_max(high_water, Ordering::AcqRel);
        snapshot
    }
}
