/// Configuration for the Flowra dashboard.
///
/// Loaded from a TOML file (every field has a default, so an empty file or
/// no file at all is valid), then overridden from the environment. A `.env`
/// file in the working directory is read first.
///
/// Environment overrides:
/// - `FLOWRA_CONFIG`       path of the TOML file (default `./flowra.toml`)
/// - `FLOWRA_API_BASE_URL` backend base URL
/// - `FLOWRA_LOG_LEVEL`    debug | info | warn | error
/// - `FLOWRA_DEV_FIXTURE`  serve this JSON fixture instead of calling a backend

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::logging::LogLevel;
use crate::map::geo::{LngLat, MAX_MAP_ZOOM};
use crate::map::surface::DEFAULT_STYLE_URL;
use crate::polling::OverlapPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "./flowra.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Centre used when the first load returned no locations (Toronto).
    pub default_center_lat: f64,
    pub default_center_lng: f64,
    /// Zoom used with the default centre.
    pub default_zoom: f64,
    /// Zoom used when centring on the mean of the initial readings.
    pub initial_zoom: f64,
    pub fit_padding_px: f64,
    /// Ceiling for fit-to-bounds so tight clusters are not over-zoomed.
    pub fit_max_zoom: f64,
    /// Zoom used when a single reading is shown.
    pub fly_to_zoom: f64,
    pub style_url: String,
    /// Readings older than this are marked stale in the info panel.
    /// Unset disables the marker.
    pub stale_after_minutes: Option<u64>,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            default_center_lat: 43.6532,
            default_center_lng: -79.3832,
            default_zoom: 10.0,
            initial_zoom: 12.0,
            fit_padding_px: 50.0,
            fit_max_zoom: 14.0,
            fly_to_zoom: 15.0,
            style_url: DEFAULT_STYLE_URL.to_string(),
            stale_after_minutes: Some(60),
        }
    }
}

impl MapConfig {
    pub fn default_center(&self) -> LngLat {
        LngLat::new(self.default_center_lng, self.default_center_lat)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub map_refresh_secs: u64,
    pub latest_reading_secs: u64,
    pub auto_store_secs: u64,
    /// Virtual pin stored by the dashboard auto-store timer.
    pub auto_store_pin: String,
    pub overlap: OverlapPolicy,
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            map_refresh_secs: 30,
            latest_reading_secs: 5,
            auto_store_secs: 30,
            auto_store_pin: "V0".to_string(),
            overlap: OverlapPolicy::SkipWhileInFlight,
        }
    }
}

impl PollingConfig {
    pub fn map_refresh(&self) -> Duration {
        Duration::from_secs(self.map_refresh_secs)
    }

    pub fn latest_reading(&self) -> Duration {
        Duration::from_secs(self.latest_reading_secs)
    }

    pub fn auto_store(&self) -> Duration {
        Duration::from_secs(self.auto_store_secs)
    }
}

/// Row limits requested by each dashboard flavour.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub full_readings_limit: u32,
    pub full_alerts_limit: u32,
    pub viewer_readings_limit: u32,
    pub viewer_alerts_limit: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            full_readings_limit: 20,
            full_alerts_limit: 10,
            viewer_readings_limit: 5,
            viewer_alerts_limit: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            file: None,
            timestamps: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlowraConfig {
    pub api: ApiConfig,
    pub map: MapConfig,
    pub polling: PollingConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
    /// JSON fixture served by dev mode instead of a live backend.
    pub dev_fixture: Option<String>,
}

impl FlowraConfig {
    /// Parses a TOML document and validates it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: FlowraConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists (defaults otherwise) and validates it.
    /// Environment overrides are not applied; see `load`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(FlowraConfig::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reads `.env`, loads the configured file and applies environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let path = std::env::var("FLOWRA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup` (the environment in production, a map
    /// in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FLOWRA_API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(level) = lookup("FLOWRA_LOG_LEVEL") {
            self.logging.level = level.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(fixture) = lookup("FLOWRA_DEV_FIXTURE") {
            self.dev_fixture = Some(fixture);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".to_string()));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.timeout_secs must be positive".to_string()));
        }

        let intervals = [
            ("polling.map_refresh_secs", self.polling.map_refresh_secs),
            ("polling.latest_reading_secs", self.polling.latest_reading_secs),
            ("polling.auto_store_secs", self.polling.auto_store_secs),
        ];
        for (name, secs) in intervals {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }

        let zooms = [
            ("map.default_zoom", self.map.default_zoom),
            ("map.initial_zoom", self.map.initial_zoom),
            ("map.fit_max_zoom", self.map.fit_max_zoom),
            ("map.fly_to_zoom", self.map.fly_to_zoom),
        ];
        for (name, zoom) in zooms {
            if !(0.0..=MAX_MAP_ZOOM).contains(&zoom) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within 0-{}, got {}",
                    name, MAX_MAP_ZOOM, zoom
                )));
            }
        }

        if !(-90.0..=90.0).contains(&self.map.default_center_lat)
            || !(-180.0..=180.0).contains(&self.map.default_center_lng)
        {
            return Err(ConfigError::Invalid("map default centre is out of range".to_string()));
        }
        if self.map.fit_padding_px < 0.0 {
            return Err(ConfigError::Invalid("map.fit_padding_px must not be negative".to_string()));
        }
        Ok(())
    }
}
