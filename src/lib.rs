//! Flowra drainage monitoring dashboard.
//!
//! Headless core of the Flowra water-level dashboard: severity
//! classification, map pin and camera synchronisation behind the
//! `MapSurface` seam, periodic polling of the Flowra backend, and the page
//! objects (map, dashboards, sensors) that tie them together.

pub mod alert;
pub mod analysis;
pub mod api;
pub mod config;
pub mod custom_pin;
pub mod dev_mode;
pub mod logging;
pub mod map;
pub mod model;
pub mod polling;
pub mod verify;
pub mod view;
