/// Keeps the map pins and camera in step with the current reading set.
///
/// Lifecycle:
/// 1. `initialize` builds the surface once, centred on the mean of the
///    initial readings (or the configured default when there are none).
/// 2. `sync` replaces every pin whenever the reading set's content changes,
///    then reframes the camera.
/// 3. `teardown` (or drop) removes every pin and disposes the surface.
///
/// Coordinates are not range-checked here. A reading with a nonsensical
/// position produces a mislocated pin; one without a numeric position gets
/// no pin at all and is left out of the framing.

use chrono::{DateTime, Utc};

use crate::alert::severity::classify;
use crate::config::MapConfig;
use crate::logging::{self, LogSource};
use crate::map::geo::{LngLat, LngLatBounds, mean_center};
use crate::map::info_panel::InfoPanel;
use crate::map::surface::{CameraMove, MapOptions, MapSurface, PinKey, PinSpec};
use crate::model::LocationReading;

/// What a call to `sync` did.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Content matched the last synced set; nothing touched.
    Unchanged,
    Synced {
        pins: usize,
        camera: Option<CameraMove>,
    },
}

pub struct MapRenderer<S: MapSurface> {
    surface: Option<S>,
    pins: Vec<(PinKey, S::PinHandle)>,
    config: MapConfig,
    last_synced: Option<Vec<LocationReading>>,
}

impl<S: MapSurface> MapRenderer<S> {
    /// Surface construction parameters for a first mount with `initial`.
    pub fn initial_options(initial: &[LocationReading], config: &MapConfig) -> MapOptions {
        let (center, zoom) = match mean_center(initial) {
            Some(center) => (center, config.initial_zoom),
            None => (config.default_center(), config.default_zoom),
        };
        MapOptions {
            center,
            zoom,
            style_url: config.style_url.clone(),
        }
    }

    /// Builds the surface exactly once via `factory`. Pins are not drawn
    /// until the first `sync`.
    pub fn initialize<F>(factory: F, initial: &[LocationReading], config: MapConfig) -> Self
    where
        F: FnOnce(MapOptions) -> S,
    {
        let options = Self::initial_options(initial, &config);
        logging::debug(
            LogSource::Map,
            None,
            &format!(
                "Initializing map at ({:.4}, {:.4}) zoom {}",
                options.center.lat, options.center.lng, options.zoom
            ),
        );
        MapRenderer {
            surface: Some(factory(options)),
            pins: Vec::new(),
            config,
            last_synced: None,
        }
    }

    /// Camera move that frames `readings`, or `None` to leave it alone.
    pub fn framing_for(readings: &[LocationReading], config: &MapConfig) -> Option<CameraMove> {
        let placed: Vec<&LocationReading> = readings.iter().filter(|r| r.is_placed()).collect();
        match placed.as_slice() {
            [] => None,
            [only] => Some(CameraMove::FlyTo {
                center: LngLat::of(only),
                zoom: config.fly_to_zoom,
            }),
            many => LngLatBounds::from_points(many.iter().map(|r| LngLat::of(r))).map(|bounds| {
                CameraMove::FitBounds {
                    bounds,
                    padding_px: config.fit_padding_px,
                    max_zoom: config.fit_max_zoom,
                }
            }),
        }
    }

    pub fn sync(&mut self, readings: &[LocationReading]) -> SyncOutcome {
        self.sync_at(readings, Utc::now())
    }

    /// Replaces all pins with one per reading and reframes the camera.
    /// `now` drives the staleness marker in the info panels.
    pub fn sync_at(&mut self, readings: &[LocationReading], now: DateTime<Utc>) -> SyncOutcome {
        if self
            .last_synced
            .as_deref()
            .is_some_and(|last| same_content(last, readings))
        {
            return SyncOutcome::Unchanged;
        }
        let Some(surface) = self.surface.as_mut() else {
            return SyncOutcome::Unchanged;
        };

        for (_, handle) in self.pins.drain(..) {
            surface.remove_pin(handle);
        }

        for reading in readings.iter().filter(|r| r.is_placed()) {
            let class = classify(reading.water_level);
            let spec = PinSpec {
                key: PinKey::of(reading),
                position: LngLat::of(reading),
                color: class.color,
                pulsing: class.severity.pulses(),
                info: InfoPanel::for_reading(reading, self.config.stale_after_minutes, now),
            };
            let handle = surface.add_pin(&spec);
            self.pins.push((spec.key, handle));
        }

        let camera = Self::framing_for(readings, &self.config);
        if let Some(movement) = &camera {
            surface.move_camera(movement);
        }

        self.last_synced = Some(readings.to_vec());
        logging::debug(
            LogSource::Map,
            None,
            &format!("Synced {} pin(s)", self.pins.len()),
        );

        SyncOutcome::Synced {
            pins: self.pins.len(),
            camera,
        }
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Removes every pin and disposes the surface, handing the disposed
    /// surface back for inspection.
    pub fn teardown(mut self) -> Option<S> {
        self.release()
    }

    fn release(&mut self) -> Option<S> {
        let mut surface = self.surface.take()?;
        for (_, handle) in self.pins.drain(..) {
            surface.remove_pin(handle);
        }
        surface.dispose();
        self.last_synced = None;
        logging::debug(LogSource::Map, None, "Map surface disposed");
        Some(surface)
    }
}

/// Field-wise equality where two NaN coordinates count as the same value.
fn same_content(a: &[LocationReading], b: &[LocationReading]) -> bool {
    let same_f64 = |x: f64, y: f64| x == y || (x.is_nan() && y.is_nan());
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.id == y.id
                && same_f64(x.latitude, y.latitude)
                && same_f64(x.longitude, y.longitude)
                && same_f64(x.water_level, y.water_level)
                && x.area == y.area
                && x.timestamp == y.timestamp
                && x.name == y.name
        })
}

impl<S: MapSurface> Drop for MapRenderer<S> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
