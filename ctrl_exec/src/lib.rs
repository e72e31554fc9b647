//! # Longitudinal controller library.
//!
//! This library allows the executable, benchmarks and integration tests to access the controller
//! modules.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Control loop - runs longitudinal control on every tick and emits the commands
pub mod control_loop;

/// Input cache - last known value of every controller input
pub mod input_cache;

/// Longitudinal control module - converts the driving mode and speed into an acceleration demand
pub mod long_ctrl;

/// Executable parameters
pub mod params;

/// Script source - replays input scripts into the input cache
pub mod script_source;
