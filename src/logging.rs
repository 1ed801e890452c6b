/// Structured logging for the Flowra dashboard
///
/// Provides context-rich logging with source and sensor identifiers on top of
/// `tracing`. Supports both console output and file-based logging for
/// long-running headless sessions.

use std::fmt;
use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::Mutex;

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::model::ApiError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Log Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Api,
    Map,
    Poller,
    View,
    System,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::Api => write!(f, "API"),
            LogSource::Map => write!(f, "MAP"),
            LogSource::Poller => write!(f, "POLL"),
            LogSource::View => write!(f, "VIEW"),
            LogSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the backend understood the request and declined it
    Expected,
    /// Unexpected failure - indicates backend degradation or an API change
    Unexpected,
    /// Unknown - cannot tell whether the backend or the network is at fault
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriber Setup
// ---------------------------------------------------------------------------

/// Installs the global subscriber. Only the first call has any effect, so
/// tests and the binary can both call it freely.
///
/// `RUST_LOG`, when set, takes precedence over `min_level`. When `log_file`
/// is given, events are appended there instead of stderr.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.as_filter()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match (log_file, console_timestamps) {
        (Some(path), _) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init(),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", path, e);
                builder.with_writer(std::io::stderr).try_init()
            }
        },
        (None, true) => builder.with_writer(std::io::stderr).try_init(),
        (None, false) => builder.without_time().with_writer(std::io::stderr).try_init(),
    };

    // an already-installed subscriber is fine
    let _ = result;
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(source: LogSource, sensor_id: Option<&str>, message: &str) {
    tracing::info!(source = %source, sensor = sensor_id.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(source: LogSource, sensor_id: Option<&str>, message: &str) {
    tracing::warn!(source = %source, sensor = sensor_id.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(source: LogSource, sensor_id: Option<&str>, message: &str) {
    tracing::error!(source = %source, sensor = sensor_id.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(source: LogSource, sensor_id: Option<&str>, message: &str) {
    tracing::debug!(source = %source, sensor = sensor_id.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a backend call failure
pub fn classify_api_failure(err: &ApiError) -> FailureType {
    match err {
        // success:false with an error string is the backend doing its job
        ApiError::Rejected(_) => FailureType::Expected,
        // status codes without a body, or bodies we cannot read, suggest
        // backend trouble or an API change
        ApiError::HttpError(_) | ApiError::ParseError(_) => FailureType::Unexpected,
        ApiError::Transport(_) => FailureType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a backend call failure with automatic classification
pub fn log_api_failure(endpoint: &str, operation: &str, err: &ApiError) {
    let failure_type = classify_api_failure(err);

    let message = format!(
        "{} {} failed [{}]: {}",
        operation,
        endpoint,
        failure_type,
        err
    );

    match failure_type {
        FailureType::Expected => debug(LogSource::Api, None, &message),
        FailureType::Unexpected => error(LogSource::Api, None, &message),
        FailureType::Unknown => warn(LogSource::Api, None, &message),
    }
}

// ---------------------------------------------------------------------------
// Polling Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a polling session when its timer is cancelled
pub fn log_poll_summary(source: LogSource, name: &str, attempted: u64, applied: u64, failed: u64) {
    let message = format!(
        "{} polling stopped: {}/{} applied, {} failed",
        name,
        applied,
        attempted,
        failed
    );

    if failed == 0 {
        info(source, None, &message);
    } else if applied == 0 {
        error(source, None, &message);
    } else {
        warn(source, None, &message);
    }
}
