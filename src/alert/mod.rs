/// Water-level interpretation shared by every view.
///
/// Submodules:
/// - `severity`: the five severity bands and the map legend derived from them.
/// - `stalenesses`: detects readings whose timestamp is too old to trust.

pub mod severity;
pub mod stalenesses;
