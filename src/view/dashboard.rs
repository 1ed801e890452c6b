/// Dashboard pages (operator dashboard and the read-only viewer).
///
/// Both load the same four resources; they differ in list limits and in
/// which timers they run. The operator dashboard can auto-store a device
/// reading every 30 s; the viewer polls the latest reading every 5 s.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::analysis::widgets::{DashboardSnapshot, DashboardWidgets, compute_widgets};
use crate::api::FlowraApi;
use crate::config::{DashboardConfig, PollingConfig};
use crate::logging::{self, LogSource};
use crate::model::{Alert, ApiError, DashboardStats, Reading, Sensor, StoreReadingRequest, StoredValue};
use crate::polling::{FirstTick, PollOutcome, PollingHandle, spawn_poller};

pub const STORE_FAILED_MESSAGE: &str = "Failed to store reading";
pub const DASHBOARD_FAILED_MESSAGE: &str = "Failed to load dashboard data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardKind {
    /// Operator dashboard: 20 readings, 10 alerts, optional auto-store.
    Full,
    /// Read-only viewer: 5 readings, 5 alerts, latest-reading polling.
    Viewer,
}

impl DashboardKind {
    /// (readings limit, alerts limit)
    pub fn limits(self, config: &DashboardConfig) -> (u32, u32) {
        match self {
            DashboardKind::Full => (config.full_readings_limit, config.full_alerts_limit),
            DashboardKind::Viewer => (config.viewer_readings_limit, config.viewer_alerts_limit),
        }
    }
}

/// Result of a manual or automatic store, as shown in the page's toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Default)]
struct DashboardState {
    snapshot: DashboardSnapshot,
    latest: Option<Reading>,
    last_stored: Option<DateTime<Utc>>,
    error: Option<String>,
    loading: bool,
}

fn lock_state(state: &Mutex<DashboardState>) -> MutexGuard<'_, DashboardState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One successful reload. `stats` is `None` when the backend answered
/// without a stats object.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSnapshot {
    pub stats: Option<DashboardStats>,
    pub sensors: Vec<Sensor>,
    pub readings: Vec<Reading>,
    pub alerts: Vec<Alert>,
}

impl FetchedSnapshot {
    /// Fills in missing stats from `previous`.
    pub fn merge_over(self, previous: &DashboardSnapshot) -> DashboardSnapshot {
        DashboardSnapshot {
            stats: self.stats.unwrap_or_else(|| previous.stats.clone()),
            sensors: self.sensors,
            readings: self.readings,
            alerts: self.alerts,
        }
    }
}

/// Fetches stats, sensors, readings and alerts concurrently. Fails as a
/// whole if any one of them fails.
pub async fn fetch_snapshot(
    api: &dyn FlowraApi,
    readings_limit: u32,
    alerts_limit: u32,
) -> Result<FetchedSnapshot, ApiError> {
    let (stats, sensors, readings, alerts) = tokio::join!(
        api.dashboard_stats(),
        api.sensors(),
        api.readings(readings_limit),
        api.alerts(alerts_limit),
    );

    Ok(FetchedSnapshot {
        stats: stats?,
        sensors: sensors?,
        readings: readings?,
        alerts: alerts?,
    })
}

/// Replaces the snapshot on success (keeping the old stats if none came
/// back); keeps the previous one on failure.
fn apply_snapshot(state: &Mutex<DashboardState>, result: Result<FetchedSnapshot, ApiError>) -> bool {
    let mut state = lock_state(state);
    state.loading = false;
    match result {
        Ok(fetched) => {
            state.snapshot = fetched.merge_over(&state.snapshot);
            state.error = None;
            true
        }
        Err(e) => {
            logging::warn(
                LogSource::View,
                None,
                &format!("Dashboard reload failed, keeping previous data: {}", e),
            );
            state.error = Some(e.user_message(DASHBOARD_FAILED_MESSAGE));
            false
        }
    }
}

fn store_outcome(result: &Result<StoredValue, ApiError>) -> StoreOutcome {
    match result {
        Ok(value) => StoreOutcome {
            success: true,
            message: format!("Data stored: {}", value),
        },
        Err(ApiError::Rejected(msg)) if !msg.trim().is_empty() => StoreOutcome {
            success: false,
            message: msg.clone(),
        },
        Err(_) => StoreOutcome {
            success: false,
            message: STORE_FAILED_MESSAGE.to_string(),
        },
    }
}

pub struct DashboardView {
    kind: DashboardKind,
    api: Arc<dyn FlowraApi>,
    limits: (u32, u32),
    polling: PollingConfig,
    state: Arc<Mutex<DashboardState>>,
    latest_poller: Option<PollingHandle>,
    auto_store: Option<PollingHandle>,
    revision_tx: Arc<watch::Sender<u64>>,
    revision: watch::Receiver<u64>,
}

impl DashboardView {
    /// Loads the dashboard once. Timers are started separately.
    pub async fn mount(
        api: Arc<dyn FlowraApi>,
        kind: DashboardKind,
        dashboard: &DashboardConfig,
        polling: &PollingConfig,
    ) -> Self {
        let (tx, rx) = watch::channel(0u64);
        let mut view = DashboardView {
            kind,
            api,
            limits: kind.limits(dashboard),
            polling: polling.clone(),
            state: Arc::new(Mutex::new(DashboardState::default())),
            latest_poller: None,
            auto_store: None,
            revision_tx: Arc::new(tx),
            revision: rx,
        };
        // failure is recorded in error(); the page still mounts
        let _ = view.reload().await;
        view.revision.borrow_and_update();
        view
    }

    pub fn kind(&self) -> DashboardKind {
        self.kind
    }

    pub async fn reload(&self) -> Result<(), ApiError> {
        lock_state(&self.state).loading = true;
        let (readings_limit, alerts_limit) = self.limits;
        let result = fetch_snapshot(self.api.as_ref(), readings_limit, alerts_limit).await;
        let outcome = result.as_ref().map(|_| ()).map_err(|e| e.clone());
        apply_snapshot(&self.state, result);
        self.bump();
        outcome
    }

    /// Asks the backend to pull and store the current value of a device pin.
    pub async fn store_reading(&self, pin: &str) -> StoreOutcome {
        let request = StoreReadingRequest::for_pin(pin);
        let result = self.api.store_reading(&request).await;
        let outcome = store_outcome(&result);

        if outcome.success {
            lock_state(&self.state).last_stored = Some(Utc::now());
            let _ = self.reload().await;
            if self.kind == DashboardKind::Viewer {
                self.refresh_latest().await;
            }
            logging::info(LogSource::View, Some(request.sensor_id.as_str()), &outcome.message);
        } else {
            logging::warn(
                LogSource::View,
                Some(request.sensor_id.as_str()),
                &format!("Store failed: {}", outcome.message),
            );
        }
        outcome
    }

    /// One latest-reading fetch outside the poll schedule.
    pub async fn refresh_latest(&self) {
        if let Ok(Some(reading)) = self.api.latest().await {
            lock_state(&self.state).latest = Some(reading);
            self.bump();
        }
    }

    /// Starts polling `/api/latest` (immediately, then every period). Only a
    /// successful response carrying data replaces the latest reading.
    pub fn start_latest_polling(&mut self) {
        if self.latest_poller.is_some() {
            return;
        }
        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let tx = Arc::clone(&self.revision_tx);

        self.latest_poller = Some(spawn_poller(
            "latest-reading",
            self.polling.latest_reading(),
            FirstTick::Immediate,
            self.polling.overlap,
            move || {
                let api = Arc::clone(&api);
                async move { api.latest().await }
            },
            move |result| match result {
                Ok(Some(reading)) => {
                    lock_state(&state).latest = Some(reading);
                    tx.send_modify(|revision| *revision += 1);
                    PollOutcome::Applied
                }
                Ok(None) => PollOutcome::Ignored,
                Err(_) => PollOutcome::Failed,
            },
        ));
    }

    pub fn stop_latest_polling(&mut self) {
        if let Some(mut poller) = self.latest_poller.take() {
            poller.cancel();
        }
    }

    /// Enables or disables the periodic store of the configured pin. The
    /// first automatic store happens one period after enabling.
    pub fn set_auto_store(&mut self, enabled: bool) {
        if !enabled {
            if let Some(mut poller) = self.auto_store.take() {
                poller.cancel();
            }
            return;
        }
        if self.auto_store.is_some() {
            return;
        }

        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let tx = Arc::clone(&self.revision_tx);
        let request = StoreReadingRequest::for_pin(&self.polling.auto_store_pin);
        let (readings_limit, alerts_limit) = self.limits;

        self.auto_store = Some(spawn_poller(
            "auto-store",
            self.polling.auto_store(),
            FirstTick::AfterPeriod,
            self.polling.overlap,
            move || {
                let api = Arc::clone(&api);
                let request = request.clone();
                async move {
                    let stored = api.store_reading(&request).await;
                    let snapshot = match stored {
                        Ok(_) => Some(fetch_snapshot(api.as_ref(), readings_limit, alerts_limit).await),
                        Err(_) => None,
                    };
                    (stored, snapshot)
                }
            },
            move |(stored, snapshot)| {
                let outcome = store_outcome(&stored);
                if outcome.success {
                    lock_state(&state).last_stored = Some(Utc::now());
                }
                if let Some(snapshot) = snapshot {
                    apply_snapshot(&state, snapshot);
                }
                tx.send_modify(|revision| *revision += 1);
                if outcome.success {
                    PollOutcome::Applied
                } else {
                    PollOutcome::Failed
                }
            },
        ));
    }

    pub fn auto_store_enabled(&self) -> bool {
        self.auto_store.is_some()
    }

    /// Waits until state changes (reload, poll or store).
    pub async fn changed(&mut self) -> bool {
        self.revision.changed().await.is_ok()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        lock_state(&self.state).snapshot.clone()
    }

    pub fn latest(&self) -> Option<Reading> {
        lock_state(&self.state).latest.clone()
    }

    pub fn last_stored(&self) -> Option<DateTime<Utc>> {
        lock_state(&self.state).last_stored
    }

    pub fn error(&self) -> Option<String> {
        lock_state(&self.state).error.clone()
    }

    pub fn is_loading(&self) -> bool {
        lock_state(&self.state).loading
    }

    pub fn widgets(&self) -> DashboardWidgets {
        let state = lock_state(&self.state);
        compute_widgets(&state.snapshot, state.latest.as_ref())
    }

    /// Cancels every timer the page started.
    pub fn unmount(mut self) {
        self.stop_latest_polling();
        self.set_auto_store(false);
        logging::info(LogSource::View, None, "Dashboard view unmounted");
    }

    fn bump(&self) {
        self.revision_tx.send_modify(|revision| *revision += 1);
    }
}
