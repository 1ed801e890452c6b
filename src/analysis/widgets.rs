/// Dashboard widget values.
///
/// Table highlighting goes through the same classifier as the map pins, so a
/// reading highlighted on the dashboard is always a pulsing pin on the map.
/// Readings whose stored value is not a number are listed verbatim with no
/// severity.

use std::collections::BTreeMap;

use crate::alert::severity::{Severity, classify};
use crate::model::{Alert, DashboardStats, Reading, Sensor, StoredValue};

/// Everything a dashboard page loads in one `reload`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub stats: DashboardStats,
    pub sensors: Vec<Sensor>,
    pub readings: Vec<Reading>,
    pub alerts: Vec<Alert>,
}

/// One row of the recent-readings table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRow {
    pub sensor_id: String,
    pub water_level: StoredValue,
    pub timestamp: Option<String>,
    pub severity: Option<Severity>,
    pub highlight: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardWidgets {
    /// Value in the big gauge: the polled latest reading, else the one in the
    /// stats, else nothing.
    pub current_value: Option<StoredValue>,
    /// `current_value` when it is numeric.
    pub current_level: Option<f64>,
    pub current_severity: Option<Severity>,
    pub average_level: f64,
    /// Average level as a gauge fill, clamped to 0..=100.
    pub average_gauge_percent: f64,
    pub total_alerts: u64,
    pub alert_badge: bool,
    pub sensor_count: usize,
    pub rows: Vec<ReadingRow>,
    pub band_counts: BTreeMap<Severity, usize>,
}

/// Computes the widget values for `snapshot`, preferring `latest` (from the
/// latest-reading poller) for the current level.
pub fn compute_widgets(snapshot: &DashboardSnapshot, latest: Option<&Reading>) -> DashboardWidgets {
    let current_value = latest
        .or(snapshot.stats.latest_reading.as_ref())
        .map(|r| r.water_level.clone());
    let current_level = current_value.as_ref().and_then(StoredValue::level);

    let rows: Vec<ReadingRow> = snapshot.readings.iter().map(reading_row).collect();

    let mut band_counts = BTreeMap::new();
    for severity in rows.iter().filter_map(|row| row.severity) {
        *band_counts.entry(severity).or_insert(0) += 1;
    }

    let average_level = snapshot.stats.avg_water_level;

    DashboardWidgets {
        current_value,
        current_level,
        current_severity: current_level.map(|level| classify(level).severity),
        average_level,
        average_gauge_percent: gauge_percent(average_level),
        total_alerts: snapshot.stats.total_alerts,
        alert_badge: snapshot.stats.total_alerts > 0,
        sensor_count: snapshot.sensors.len(),
        rows,
        band_counts,
    }
}

pub fn reading_row(reading: &Reading) -> ReadingRow {
    let severity = reading.water_level.level().map(|level| classify(level).severity);
    ReadingRow {
        sensor_id: reading.sensor_id.clone(),
        water_level: reading.water_level.clone(),
        timestamp: reading.timestamp.clone(),
        severity,
        highlight: severity.is_some_and(Severity::pulses),
    }
}

/// Gauge fill for a level in cm. Non-finite levels read as an empty gauge.
pub fn gauge_percent(level_cm: f64) -> f64 {
    if level_cm.is_nan() {
        return 0.0;
    }
    level_cm.clamp(0.0, 100.0)
}
