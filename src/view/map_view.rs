/// Map page.
///
/// A `MapView` owns everything the map page needs for its lifetime: the
/// fetched drainage locations, the ad hoc pin, the renderer and the refresh
/// poller. Nothing here is process-global, so two views can be mounted side
/// by side and unmounting one leaves the other untouched.
///
/// The poller only updates the shared location state and bumps a revision
/// counter; drawing happens on the owner's side through `render()`, usually
/// right after `changed()` resolves.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::watch;

use crate::api::FlowraApi;
use crate::config::FlowraConfig;
use crate::custom_pin::{CoordinateError, CustomPinSlot};
use crate::logging::{self, LogSource};
use crate::map::renderer::{MapRenderer, SyncOutcome};
use crate::map::surface::{MapOptions, MapSurface};
use crate::model::{ApiError, LocationReading};
use crate::polling::{FirstTick, PollOutcome, PollingHandle, spawn_poller};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load drainage locations";

#[derive(Debug, Default)]
struct MapState {
    locations: Vec<LocationReading>,
    custom: CustomPinSlot,
    error: Option<String>,
    loading: bool,
}

fn lock_state(state: &Mutex<MapState>) -> MutexGuard<'_, MapState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Folds one fetch result into the state. A failure keeps the previous
/// locations and only sets the error message.
fn apply_fetch(state: &Mutex<MapState>, result: Result<Vec<LocationReading>, ApiError>) -> bool {
    let mut state = lock_state(state);
    state.loading = false;
    match result {
        Ok(locations) => {
            state.locations = locations;
            state.error = None;
            true
        }
        Err(e) => {
            logging::warn(
                LogSource::View,
                None,
                &format!("Map refresh failed, keeping {} location(s): {}", state.locations.len(), e),
            );
            state.error = Some(e.user_message(LOAD_FAILED_MESSAGE));
            false
        }
    }
}

pub struct MapView<S: MapSurface> {
    api: Arc<dyn FlowraApi>,
    state: Arc<Mutex<MapState>>,
    renderer: MapRenderer<S>,
    poller: Option<PollingHandle>,
    revision: watch::Receiver<u64>,
}

impl<S: MapSurface> MapView<S> {
    /// Loads the locations once, builds the map around them and starts the
    /// periodic refresh (first poll one full period after mount).
    pub async fn mount<F>(api: Arc<dyn FlowraApi>, factory: F, config: &FlowraConfig) -> Self
    where
        F: FnOnce(MapOptions) -> S,
    {
        let state = Arc::new(Mutex::new(MapState {
            loading: true,
            ..Default::default()
        }));

        apply_fetch(&state, api.drainage_locations().await);

        let initial = lock_state(&state).locations.clone();
        let renderer = MapRenderer::initialize(factory, &initial, config.map.clone());

        let (tx, rx) = watch::channel(0u64);
        let tx = Arc::new(tx);

        let poll_api = Arc::clone(&api);
        let poll_state = Arc::clone(&state);
        let poller = spawn_poller(
            "map-refresh",
            config.polling.map_refresh(),
            FirstTick::AfterPeriod,
            config.polling.overlap,
            move || {
                let api = Arc::clone(&poll_api);
                async move { api.drainage_locations().await }
            },
            move |result| {
                let applied = apply_fetch(&poll_state, result);
                tx.send_modify(|revision| *revision += 1);
                if applied {
                    PollOutcome::Applied
                } else {
                    PollOutcome::Failed
                }
            },
        );

        let mut view = MapView {
            api,
            state,
            renderer,
            poller: Some(poller),
            revision: rx,
        };
        view.render();

        logging::info(
            LogSource::View,
            None,
            &format!("Map view mounted with {} location(s)", view.location_count()),
        );
        view
    }

    /// Explicit user refresh, outside the poll schedule.
    pub async fn refresh(&mut self) -> Result<usize, ApiError> {
        lock_state(&self.state).loading = true;
        let result = self.api.drainage_locations().await;
        let outcome = match &result {
            Ok(locations) => Ok(locations.len()),
            Err(e) => Err(e.clone()),
        };
        apply_fetch(&self.state, result);
        self.render();
        outcome
    }

    /// Places (or replaces) the ad hoc pin and redraws. Invalid coordinates
    /// leave the map as it was.
    pub fn add_custom_location(&mut self, latitude: f64, longitude: f64) -> Result<(), CoordinateError> {
        lock_state(&self.state)
            .custom
            .set(latitude, longitude, Utc::now())
            .map(|_| ())?;
        self.render();
        Ok(())
    }

    /// Same as `add_custom_location`, from the two text fields of the form.
    pub fn add_custom_location_input(&mut self, latitude: &str, longitude: &str) -> Result<(), CoordinateError> {
        lock_state(&self.state)
            .custom
            .set_from_input(latitude, longitude, Utc::now())
            .map(|_| ())?;
        self.render();
        Ok(())
    }

    /// Removes the ad hoc pin. Returns whether there was one.
    pub fn clear_custom_location(&mut self) -> bool {
        let removed = lock_state(&self.state).custom.clear().is_some();
        if removed {
            self.render();
        }
        removed
    }

    /// Brings the map in line with fetched + ad hoc locations.
    pub fn render(&mut self) -> SyncOutcome {
        let all = self.all_locations();
        self.renderer.sync(&all)
    }

    /// Waits for the next completed poll. Returns `false` once the poller
    /// has gone away.
    pub async fn changed(&mut self) -> bool {
        self.revision.changed().await.is_ok()
    }

    /// Fetched locations followed by the ad hoc pin, if any.
    pub fn all_locations(&self) -> Vec<LocationReading> {
        let state = lock_state(&self.state);
        state.custom.merged_with(&state.locations)
    }

    pub fn location_count(&self) -> usize {
        let state = lock_state(&self.state);
        state.locations.len() + usize::from(state.custom.get().is_some())
    }

    pub fn error(&self) -> Option<String> {
        lock_state(&self.state).error.clone()
    }

    pub fn is_loading(&self) -> bool {
        lock_state(&self.state).loading
    }

    pub fn renderer(&self) -> &MapRenderer<S> {
        &self.renderer
    }

    pub fn poll_stats(&self) -> Option<crate::polling::PollStats> {
        self.poller.as_ref().map(PollingHandle::stats)
    }

    /// Stops the refresh timer, then removes every pin and disposes the map.
    /// The disposed surface is handed back.
    pub fn unmount(mut self) -> Option<S> {
        if let Some(mut poller) = self.poller.take() {
            poller.cancel();
        }
        logging::info(LogSource::View, None, "Map view unmounted");
        self.renderer.teardown()
    }
}
