/// Data aggregation for the dashboard pages.
///
/// The backend already computes the heavy aggregates (`/api/dashboard/stats`);
/// this module only reshapes what the pages fetched into display values.
///
/// Submodules:
/// - `widgets`: turns a dashboard snapshot into widget values.

pub mod widgets;
