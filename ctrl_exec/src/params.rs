//! Executable parameters

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters for the control executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Number of consecutive cycle overruns tolerated before the executable stops.
    pub max_consec_overruns: u64,

    /// Period at which the input script is polled for due messages.
    ///
    /// Units: seconds
    pub script_poll_period_s: f64,
}

#[derive(Debug, Error)]
pub enum ExecParamsError {
    #[error("{0} must be a positive finite number of seconds ({1})")]
    InvalidPeriod(&'static str, f64),
}

impl ExecParams {
    /// Check that both periods can be turned into durations.
    pub fn validate(&self) -> Result<(), ExecParamsError> {
        for (name, period_s) in [
            ("cycle_period_s", self.cycle_period_s),
            ("script_poll_period_s", self.script_poll_period_s),
        ]
        .iter()
        {
            if !is_valid_period(*period_s) {
                return Err(ExecParamsError::InvalidPeriod(*name, *period_s));
            }
        }

        Ok(())
    }
}

impl Default for ExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.1,
            max_consec_overruns: 500,
            script_poll_period_s: 0.01,
        }
    }
}

/// True if the period is finite and greater than zero.
pub(crate) fn is_valid_period(period_s: f64) -> bool {
    period_s.is_finite() && period_s > 0.0
}
