/// Integration tests for the dashboard pages
///
/// Covers snapshot loading, the 5 s latest-reading poller, the 30 s
/// auto-store timer and manual stores, all against the in-process backend
/// on tokio's paused clock.
///
/// Run with: cargo test --test dashboard_integration

mod common;

use std::time::Duration;

use flowra_dashboard::alert::severity::Severity;
use flowra_dashboard::config::{DashboardConfig, PollingConfig};
use flowra_dashboard::model::{ApiError, DashboardStats, StoredValue};
use flowra_dashboard::view::{DashboardKind, DashboardView};

use common::fake::{FakeBackend, reading, text_reading};

fn seeded() -> std::sync::Arc<FakeBackend> {
    let backend = FakeBackend::new();
    *backend.readings.lock().unwrap() = (0..30).map(|i| reading(i, "blynk_V0", i as f64 * 3.0)).collect();
    *backend.stats.lock().unwrap() = Some(DashboardStats {
        total_sensors: 2,
        total_readings: 30,
        total_alerts: 1,
        avg_water_level: 43.5,
        latest_reading: Some(reading(29, "blynk_V0", 87.0)),
        recent_readings_count: 30,
    });
    backend
}

async fn mount(backend: &std::sync::Arc<FakeBackend>, kind: DashboardKind) -> DashboardView {
    DashboardView::mount(
        backend.clone(),
        kind,
        &DashboardConfig::default(),
        &PollingConfig::default(),
    )
    .await
}

#[tokio::test(start_paused = true)]
async fn test_full_and_viewer_request_their_limits() {
    let backend = seeded();
    let full = mount(&backend, DashboardKind::Full).await;
    assert_eq!(full.snapshot().readings.len(), 20);

    let viewer = mount(&backend, DashboardKind::Viewer).await;
    assert_eq!(viewer.snapshot().readings.len(), 5);

    let limits = backend.limits_seen.lock().unwrap().clone();
    assert_eq!(
        limits,
        vec![("readings", 20), ("alerts", 10), ("readings", 5), ("alerts", 5)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_widgets_use_stats_until_latest_arrives() {
    let backend = seeded();
    *backend.latest.lock().unwrap() = Ok(Some(reading(31, "blynk_V0", 12.0)));
    let mut viewer = mount(&backend, DashboardKind::Viewer).await;

    let widgets = viewer.widgets();
    assert_eq!(widgets.current_level, Some(87.0), "stats latest before the first poll");
    assert_eq!(widgets.current_severity, Some(Severity::Critical));
    assert!(widgets.alert_badge);
    assert_eq!(widgets.average_gauge_percent, 43.5);

    viewer.start_latest_polling();
    assert!(viewer.changed().await);
    assert_eq!(viewer.widgets().current_level, Some(12.0));
    viewer.unmount();
}

#[tokio::test(start_paused = true)]
async fn test_latest_polls_every_five_seconds_and_ignores_failures() {
    let backend = seeded();
    *backend.latest.lock().unwrap() = Ok(Some(reading(31, "blynk_V0", 40.0)));
    let mut viewer = mount(&backend, DashboardKind::Viewer).await;
    viewer.start_latest_polling();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(backend.calls("latest"), 1, "first poll is immediate");
    assert_eq!(viewer.latest().and_then(|r| r.water_level.level()), Some(40.0));

    *backend.latest.lock().unwrap() = Err(ApiError::Transport("timeout".to_string()));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(backend.calls("latest"), 2);
    assert_eq!(
        viewer.latest().and_then(|r| r.water_level.level()),
        Some(40.0),
        "a failed poll keeps the previous reading"
    );

    *backend.latest.lock().unwrap() = Ok(None);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(viewer.latest().and_then(|r| r.water_level.level()), Some(40.0), "empty data is ignored");

    viewer.unmount();
    let calls = backend.calls("latest");
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.calls("latest"), calls, "no polling after unmount");
}

#[tokio::test(start_paused = true)]
async fn test_manual_store_success_reloads() {
    let backend = seeded();
    *backend.store_result.lock().unwrap() = Ok(StoredValue::Number(47.0));
    let full = mount(&backend, DashboardKind::Full).await;
    assert_eq!(backend.calls("dashboard_stats"), 1);

    let outcome = full.store_reading("V0").await;
    assert!(outcome.success);
    assert_eq!(outcome.message, "Data stored: 47");
    assert!(full.last_stored().is_some());
    assert_eq!(backend.calls("dashboard_stats"), 2, "successful store reloads");

    let requests = backend.store_requests.lock().unwrap().clone();
    assert_eq!(requests[0].pin, "V0");
    assert_eq!(requests[0].sensor_id, "blynk_V0");
}

#[tokio::test(start_paused = true)]
async fn test_manual_store_failure_messages() {
    let backend = seeded();
    let full = mount(&backend, DashboardKind::Full).await;

    *backend.store_result.lock().unwrap() = Err(ApiError::Rejected("Device offline".to_string()));
    let outcome = full.store_reading("V0").await;
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Device offline");

    *backend.store_result.lock().unwrap() = Err(ApiError::Transport("refused".to_string()));
    assert_eq!(full.store_reading("V0").await.message, "Failed to store reading");

    assert!(full.last_stored().is_none());
    assert_eq!(backend.calls("dashboard_stats"), 1, "failed stores do not reload");
}

#[tokio::test(start_paused = true)]
async fn test_auto_store_every_thirty_seconds_until_disabled() {
    let backend = seeded();
    let mut full = mount(&backend, DashboardKind::Full).await;

    full.set_auto_store(true);
    assert!(full.auto_store_enabled());
    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(backend.calls("store_reading"), 0, "first auto-store waits a full period");

    tokio::time::sleep(Duration::from_secs(32)).await;
    assert_eq!(backend.calls("store_reading"), 2);
    assert!(full.last_stored().is_some());

    full.set_auto_store(false);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(backend.calls("store_reading"), 2, "disabling cancels the timer");
}

#[tokio::test(start_paused = true)]
async fn test_failed_reload_keeps_previous_snapshot() {
    let backend = seeded();
    let full = mount(&backend, DashboardKind::Full).await;
    let before = full.snapshot();

    backend.readings.lock().unwrap().clear();
    *backend.stats_error.lock().unwrap() = Some(ApiError::HttpError(500));

    assert!(full.reload().await.is_err());
    assert_eq!(full.snapshot(), before, "one failed request keeps the whole snapshot");
    assert_eq!(full.error().as_deref(), Some("Failed to load dashboard data"));
}

#[tokio::test(start_paused = true)]
async fn test_text_level_reading_does_not_freeze_the_dashboard() {
    let backend = seeded();
    backend.readings.lock().unwrap()[0] = text_reading(0, "blynk_V0", "offline");
    if let Some(stats) = backend.stats.lock().unwrap().as_mut() {
        stats.latest_reading = Some(text_reading(29, "blynk_V0", "offline"));
    }

    let full = mount(&backend, DashboardKind::Full).await;
    assert_eq!(full.error(), None);
    let widgets = full.widgets();
    assert_eq!(widgets.rows.len(), 20);
    assert_eq!(widgets.rows[0].water_level, StoredValue::Text("offline".to_string()));
    assert_eq!(widgets.rows[0].severity, None);
    assert_eq!(widgets.current_value, Some(StoredValue::Text("offline".to_string())));
    assert_eq!(widgets.current_level, None);
    full.unmount();
}

#[tokio::test(start_paused = true)]
async fn test_reload_without_stats_keeps_previous_counters() {
    let backend = seeded();
    let full = mount(&backend, DashboardKind::Full).await;
    assert_eq!(full.widgets().total_alerts, 1);

    *backend.stats.lock().unwrap() = None;
    backend.readings.lock().unwrap().truncate(3);
    full.reload().await.expect("reload succeeds without stats");

    let widgets = full.widgets();
    assert_eq!(widgets.total_alerts, 1, "counters are not zeroed");
    assert_eq!(widgets.average_level, 43.5);
    assert_eq!(widgets.rows.len(), 3, "the other resources still refresh");
    full.unmount();
}
