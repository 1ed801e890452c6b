//! Backend Endpoint Verification
//!
//! Probes every read endpoint of a Flowra backend once and reports which ones
//! answer, how much data they return, and whether the data looks sane.
//!
//! Use this after deploying a backend or before pointing the dashboard at a
//! new one.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::FlowraApi;
use crate::api::client::{
    ALERTS_PATH, DASHBOARD_STATS_PATH, DRAINAGE_LOCATIONS_PATH, LATEST_PATH, READINGS_PATH,
    SENSORS_PATH,
};
use crate::custom_pin::validate_coordinates;
use crate::model::ApiError;

/// List size requested from the paged endpoints while probing.
pub const PROBE_LIMIT: u32 = 5;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub endpoints: Vec<EndpointVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointVerification {
    pub endpoint: String,
    pub status: VerificationStatus,
    pub item_count: usize,
    /// Entries that came back but cannot be shown, e.g. pins with
    /// out-of-range coordinates.
    pub invalid_items: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    /// Answered, but empty or with unusable entries.
    PartialSuccess,
    Failed,
}

impl EndpointVerification {
    fn from_result<T>(
        endpoint: &str,
        result: Result<T, ApiError>,
        count: impl Fn(&T) -> (usize, usize),
    ) -> Self {
        match result {
            Ok(value) => {
                let (item_count, invalid_items) = count(&value);
                let status = if item_count == 0 || invalid_items > 0 {
                    VerificationStatus::PartialSuccess
                } else {
                    VerificationStatus::Success
                };
                EndpointVerification {
                    endpoint: endpoint.to_string(),
                    status,
                    item_count,
                    invalid_items,
                    error_message: None,
                }
            }
            Err(e) => EndpointVerification {
                endpoint: endpoint.to_string(),
                status: VerificationStatus::Failed,
                item_count: 0,
                invalid_items: 0,
                error_message: Some(e.to_string()),
            },
        }
    }
}

// ============================================================================
// Verification
// ============================================================================

/// Probes every read endpoint in turn.
pub async fn verify_backend(api: &dyn FlowraApi) -> VerificationReport {
    let mut endpoints = Vec::new();

    endpoints.push(EndpointVerification::from_result(
        DRAINAGE_LOCATIONS_PATH,
        api.drainage_locations().await,
        |locations| {
            let invalid = locations
                .iter()
                .filter(|l| validate_coordinates(l.latitude, l.longitude).is_err())
                .count();
            (locations.len(), invalid)
        },
    ));

    endpoints.push(EndpointVerification::from_result(
        SENSORS_PATH,
        api.sensors().await,
        |sensors| {
            let unplaced = sensors
                .iter()
                .filter(|s| s.latitude.is_none() || s.longitude.is_none())
                .count();
            (sensors.len(), unplaced)
        },
    ));

    endpoints.push(EndpointVerification::from_result(
        READINGS_PATH,
        api.readings(PROBE_LIMIT).await,
        |readings| (readings.len(), 0),
    ));

    // an empty alert list is the healthy case, so it counts as a success
    let mut alerts = EndpointVerification::from_result(
        ALERTS_PATH,
        api.alerts(PROBE_LIMIT).await,
        |alerts| (alerts.len(), 0),
    );
    if alerts.status == VerificationStatus::PartialSuccess {
        alerts.status = VerificationStatus::Success;
    }
    endpoints.push(alerts);

    endpoints.push(EndpointVerification::from_result(
        DASHBOARD_STATS_PATH,
        api.dashboard_stats().await,
        |stats| match stats {
            Some(stats) => (stats.total_sensors as usize, 0),
            None => (0, 1),
        },
    ));

    endpoints.push(EndpointVerification::from_result(
        LATEST_PATH,
        api.latest().await,
        |latest| (usize::from(latest.is_some()), 0),
    ));

    let mut summary = VerificationSummary {
        total: endpoints.len(),
        ..Default::default()
    };
    for endpoint in &endpoints {
        match endpoint.status {
            VerificationStatus::Failed => summary.failed += 1,
            _ => summary.working += 1,
        }
    }

    VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        endpoints,
        summary,
    }
}

pub fn print_summary(report: &VerificationReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 BACKEND VERIFICATION ({})", report.timestamp);
    println!("═══════════════════════════════════════════════════════════");
    println!();
    for endpoint in &report.endpoints {
        match endpoint.status {
            VerificationStatus::Success => {
                println!("  {:<28} ✓ OK ({} items)", endpoint.endpoint, endpoint.item_count);
            }
            VerificationStatus::PartialSuccess => {
                println!(
                    "  {:<28} ⚠ {} items, {} unusable",
                    endpoint.endpoint, endpoint.item_count, endpoint.invalid_items
                );
            }
            VerificationStatus::Failed => {
                println!(
                    "  {:<28} ✗ FAILED: {}",
                    endpoint.endpoint,
                    endpoint.error_message.as_deref().unwrap_or("Unknown")
                );
            }
        }
    }
    println!();

    let success_rate = if report.summary.total > 0 {
        (report.summary.working as f64 / report.summary.total as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Endpoints: {}/{} working ({} failed), {:.1}%",
        report.summary.working, report.summary.total, report.summary.failed, success_rate
    );
    println!("═══════════════════════════════════════════════════════════");
}
