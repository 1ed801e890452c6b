/// `flowra [map|dashboard|verify]`
///
/// Runs one dashboard page headlessly against the configured backend (or the
/// dev fixture when `FLOWRA_DEV_FIXTURE` is set) until Ctrl-C.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use flowra_dashboard::api::{FlowraApi, FlowraClient};
use flowra_dashboard::config::FlowraConfig;
use flowra_dashboard::dev_mode::DevMode;
use flowra_dashboard::logging::{self, LogSource};
use flowra_dashboard::map::surface::HeadlessMap;
use flowra_dashboard::verify;
use flowra_dashboard::view::{DashboardKind, DashboardView, MapView};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = FlowraConfig::load()?;
    logging::init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "map".to_string());
    let json = args.any(|a| a == "--json");

    let api: Arc<dyn FlowraApi> = match &config.dev_fixture {
        Some(path) => {
            logging::info(LogSource::System, None, &format!("Dev mode: serving fixture {}", path));
            Arc::new(DevMode::load(Path::new(path))?)
        }
        None => {
            logging::info(LogSource::System, None, &format!("Backend: {}", config.api.base_url));
            Arc::new(FlowraClient::new(&config.api)?)
        }
    };

    match command.as_str() {
        "map" => run_map(api, &config).await,
        "dashboard" => run_dashboard(api, &config).await,
        "verify" => {
            let report = verify::verify_backend(api.as_ref()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                verify::print_summary(&report);
            }
            Ok(())
        }
        other => Err(format!("unknown command '{}' (expected map, dashboard or verify)", other).into()),
    }
}

async fn run_map(api: Arc<dyn FlowraApi>, config: &FlowraConfig) -> Result<(), Box<dyn Error>> {
    let mut view = MapView::mount(api, HeadlessMap::new, config).await;
    log_pins(&view);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let changed = tokio::select! {
            changed = view.changed() => changed,
            _ = &mut ctrl_c => false,
        };
        if !changed {
            break;
        }
        view.render();
        if let Some(error) = view.error() {
            logging::warn(LogSource::View, None, &error);
        }
        log_pins(&view);
    }

    view.unmount();
    Ok(())
}

fn log_pins(view: &MapView<HeadlessMap>) {
    let Some(map) = view.renderer().surface() else {
        return;
    };
    logging::info(
        LogSource::Map,
        None,
        &format!("{} pin(s), zoom {:.1}", map.pin_count(), map.camera().zoom),
    );
    for pin in map.pins() {
        logging::info(LogSource::Map, pin.key.id.as_deref(), &pin.info.to_string());
    }
}

async fn run_dashboard(api: Arc<dyn FlowraApi>, config: &FlowraConfig) -> Result<(), Box<dyn Error>> {
    let mut view = DashboardView::mount(api, DashboardKind::Viewer, &config.dashboard, &config.polling).await;
    view.start_latest_polling();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let changed = tokio::select! {
            changed = view.changed() => changed,
            _ = &mut ctrl_c => false,
        };
        if !changed {
            break;
        }
        let widgets = view.widgets();
        let level = match (widgets.current_level, widgets.current_severity, &widgets.current_value) {
            (Some(level), Some(severity), _) => format!("{:.1} cm ({})", level, severity),
            (_, _, Some(value)) => format!("\"{}\"", value),
            _ => "no reading".to_string(),
        };
        logging::info(
            LogSource::View,
            None,
            &format!(
                "Level {} | avg {:.1} cm | {} alert(s) | {} sensor(s)",
                level, widgets.average_level, widgets.total_alerts, widgets.sensor_count
            ),
        );
    }

    view.unmount();
    Ok(())
}
