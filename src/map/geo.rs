/// Geographic helpers for camera framing.
///
/// Coordinates are carried as `(lng, lat)` like the map libraries expect, but
/// constructors take named fields so latitude and longitude cannot be swapped
/// silently.

use crate::model::LocationReading;

/// Web-Mercator tiles are 256 px at zoom 0.
const TILE_SIZE_PX: f64 = 256.0;

/// Highest zoom level any tile service serves.
pub const MAX_MAP_ZOOM: f64 = 22.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        LngLat { lng, lat }
    }

    pub fn of(reading: &LocationReading) -> Self {
        LngLat::new(reading.longitude, reading.latitude)
    }
}

/// Axis-aligned bounding box, south-west and north-east corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLatBounds {
    pub sw: LngLat,
    pub ne: LngLat,
}

impl LngLatBounds {
    /// Degenerate bounds containing exactly one point.
    pub fn from_point(p: LngLat) -> Self {
        LngLatBounds { sw: p, ne: p }
    }

    /// Smallest bounds containing every point, `None` for an empty input.
    pub fn from_points<I: IntoIterator<Item = LngLat>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = LngLatBounds::from_point(first);
        for p in iter {
            bounds.extend(p);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, p: LngLat) {
        self.sw.lng = self.sw.lng.min(p.lng);
        self.sw.lat = self.sw.lat.min(p.lat);
        self.ne.lng = self.ne.lng.max(p.lng);
        self.ne.lat = self.ne.lat.max(p.lat);
    }

    pub fn contains(&self, p: LngLat) -> bool {
        p.lng >= self.sw.lng && p.lng <= self.ne.lng && p.lat >= self.sw.lat && p.lat <= self.ne.lat
    }

    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.sw.lng + self.ne.lng) / 2.0,
            (self.sw.lat + self.ne.lat) / 2.0,
        )
    }
}

/// Arithmetic mean of the placeable reading positions, `None` when there
/// are none.
pub fn mean_center(readings: &[LocationReading]) -> Option<LngLat> {
    let (lng_sum, lat_sum, n) = readings
        .iter()
        .filter(|r| r.is_placed())
        .fold((0.0, 0.0, 0usize), |(lng, lat, n), r| {
            (lng + r.longitude, lat + r.latitude, n + 1)
        });
    if n == 0 {
        return None;
    }
    Some(LngLat::new(lng_sum / n as f64, lat_sum / n as f64))
}

/// Web-Mercator y in [0, 1] for a latitude (0 at the north edge).
fn mercator_y(lat: f64) -> f64 {
    let clamped = lat.clamp(-85.051_128_78, 85.051_128_78).to_radians();
    (1.0 - (clamped.tan() + 1.0 / clamped.cos()).ln() / std::f64::consts::PI) / 2.0
}

/// Highest zoom at which `bounds` fits inside a `width_px` x `height_px`
/// viewport with `padding_px` on every side, capped at `max_zoom`.
pub fn fit_zoom(
    bounds: &LngLatBounds,
    width_px: f64,
    height_px: f64,
    padding_px: f64,
    max_zoom: f64,
) -> f64 {
    let usable_w = (width_px - 2.0 * padding_px).max(1.0);
    let usable_h = (height_px - 2.0 * padding_px).max(1.0);

    let lng_fraction = (bounds.ne.lng - bounds.sw.lng).abs() / 360.0;
    let lat_fraction = (mercator_y(bounds.sw.lat) - mercator_y(bounds.ne.lat)).abs();

    let zoom_for = |fraction: f64, usable: f64| {
        if fraction <= f64::EPSILON {
            f64::INFINITY
        } else {
            (usable / TILE_SIZE_PX / fraction).log2()
        }
    };

    zoom_for(lng_fraction, usable_w)
        .min(zoom_for(lat_fraction, usable_h))
        .min(max_zoom)
        .max(0.0)
}
