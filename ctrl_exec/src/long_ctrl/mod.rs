//! Longitudinal control module
//!
//! Turns the driving mode and the measured speed into an acceleration demand, using a PID
//! regulator to brake towards the desired speed.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod dispatch;
mod mode;
mod params;
mod pid;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use dispatch::*;
pub use mode::*;
pub use params::*;
pub use pid::*;
pub use state::*;

use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LongCtrl processing.
#[derive(Debug, thiserror::Error)]
pub enum LongCtrlError {
    #[error("Speed feedback is not finite ({0})")]
    NonFiniteSpeed(f64),

    #[error("Speed error is not finite ({0})")]
    NonFiniteError(f64),

    #[error("Brake regulator produced a non-finite output ({0})")]
    NonFiniteOutput(f64),
}

/// Possible errors that can occur while initialising LongCtrl.
#[derive(Debug, thiserror::Error)]
pub enum LongCtrlInitError {
    #[error("Could not load the LongCtrl parameters: {0}")]
    ParamsError(#[from] LoadError),

    #[error("Invalid LongCtrl parameters: {0}")]
    InvalidParams(String),

    #[error("Could not open the LongCtrl archives: {0}")]
    ArchiveError(#[from] ArchiveError),
}
