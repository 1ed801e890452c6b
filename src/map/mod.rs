/// Map rendering for drainage locations.
///
/// Submodules:
/// - `geo`: coordinates, bounds and camera-fit maths.
/// - `info_panel`: text attached to each pin.
/// - `surface`: the `MapSurface` trait and the in-memory `HeadlessMap`.
/// - `renderer`: keeps pins and camera in step with the reading set.

pub mod geo;
pub mod info_panel;
pub mod renderer;
pub mod surface;
