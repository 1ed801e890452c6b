/// The seam between the renderer and whatever draws the map.
///
/// A browser build backs `MapSurface` with a tile-map library; the binary
/// and the tests use `HeadlessMap`, which keeps everything in memory.

use std::collections::BTreeMap;

use crate::map::geo::{LngLat, LngLatBounds, fit_zoom};
use crate::map::info_panel::InfoPanel;
use crate::model::LocationReading;

/// Default basemap style served by a free tile service.
pub const DEFAULT_STYLE_URL: &str = "https://basemaps.cartocdn.com/gl/voyager-gl-style/style.json";

// ---------------------------------------------------------------------------
// Pins
// ---------------------------------------------------------------------------

/// Pin identity: identifier plus bit-exact position.
///
/// Readings are replaced wholesale on every refresh, so a pin cannot be
/// tracked by object identity; two readings describe the same pin exactly
/// when they share an identifier and a position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinKey {
    pub id: Option<String>,
    lat_bits: u64,
    lng_bits: u64,
}

impl PinKey {
    pub fn of(reading: &LocationReading) -> Self {
        PinKey {
            id: reading.id.clone(),
            lat_bits: reading.latitude.to_bits(),
            lng_bits: reading.longitude.to_bits(),
        }
    }

    pub fn position(&self) -> LngLat {
        LngLat::new(f64::from_bits(self.lng_bits), f64::from_bits(self.lat_bits))
    }
}

/// Everything a surface needs to draw one pin.
#[derive(Debug, Clone, PartialEq)]
pub struct PinSpec {
    pub key: PinKey,
    pub position: LngLat,
    pub color: &'static str,
    pub pulsing: bool,
    pub info: InfoPanel,
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum CameraMove {
    /// Animate to a viewport containing `bounds`, never zooming past `max_zoom`.
    FitBounds {
        bounds: LngLatBounds,
        padding_px: f64,
        max_zoom: f64,
    },
    /// Fly straight to `center` at `zoom`.
    FlyTo { center: LngLat, zoom: f64 },
}

/// Construction parameters for a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub center: LngLat,
    pub zoom: f64,
    pub style_url: String,
}

// ---------------------------------------------------------------------------
// Surface trait
// ---------------------------------------------------------------------------

pub trait MapSurface {
    type PinHandle;

    fn add_pin(&mut self, pin: &PinSpec) -> Self::PinHandle;
    fn remove_pin(&mut self, handle: Self::PinHandle);
    fn move_camera(&mut self, movement: &CameraMove);
    /// Releases the surface and everything attached to it. Called exactly once.
    fn dispose(&mut self);
}

// ---------------------------------------------------------------------------
// Headless surface
// ---------------------------------------------------------------------------

/// Current camera of a `HeadlessMap`.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub center: LngLat,
    pub zoom: f64,
    /// Bounds requested by the last fit, if the last move was a fit.
    pub fitted_bounds: Option<LngLatBounds>,
}

/// In-memory `MapSurface`.
#[derive(Debug)]
pub struct HeadlessMap {
    options: MapOptions,
    viewport_px: (f64, f64),
    pins: BTreeMap<u64, PinSpec>,
    next_handle: u64,
    camera: Camera,
    camera_moves: usize,
    pins_added: usize,
    pins_removed: usize,
    disposed: bool,
}

impl HeadlessMap {
    pub fn new(options: MapOptions) -> Self {
        Self::with_viewport(options, 1024.0, 768.0)
    }

    pub fn with_viewport(options: MapOptions, width_px: f64, height_px: f64) -> Self {
        let camera = Camera {
            center: options.center,
            zoom: options.zoom,
            fitted_bounds: None,
        };
        HeadlessMap {
            options,
            viewport_px: (width_px, height_px),
            pins: BTreeMap::new(),
            next_handle: 0,
            camera,
            camera_moves: 0,
            pins_added: 0,
            pins_removed: 0,
            disposed: false,
        }
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    /// Pins currently on the map, in insertion order.
    pub fn pins(&self) -> Vec<&PinSpec> {
        self.pins.values().collect()
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_moves(&self) -> usize {
        self.camera_moves
    }

    pub fn pins_added(&self) -> usize {
        self.pins_added
    }

    pub fn pins_removed(&self) -> usize {
        self.pins_removed
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl MapSurface for HeadlessMap {
    type PinHandle = u64;

    fn add_pin(&mut self, pin: &PinSpec) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.pins.insert(handle, pin.clone());
        self.pins_added += 1;
        handle
    }

    fn remove_pin(&mut self, handle: u64) {
        if self.pins.remove(&handle).is_some() {
            self.pins_removed += 1;
        }
    }

    fn move_camera(&mut self, movement: &CameraMove) {
        self.camera_moves += 1;
        self.camera = match movement {
            CameraMove::FitBounds {
                bounds,
                padding_px,
                max_zoom,
            } => Camera {
                center: bounds.center(),
                zoom: fit_zoom(bounds, self.viewport_px.0, self.viewport_px.1, *padding_px, *max_zoom),
                fitted_bounds: Some(*bounds),
            },
            CameraMove::FlyTo { center, zoom } => Camera {
                center: *center,
                zoom: *zoom,
                fitted_bounds: None,
            },
        };
    }

    fn dispose(&mut self) {
        self.pins.clear();
        self.disposed = true;
    }
}
