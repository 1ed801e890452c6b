/// Headless page objects.
///
/// Each view owns the state and timers of one page of the dashboard and
/// releases all of them on `unmount`.

pub mod dashboard;
pub mod map_view;
pub mod sensors;

pub use dashboard::{DashboardKind, DashboardView, StoreOutcome};
pub use map_view::MapView;
pub use sensors::{SensorForm, SensorsView};
