//! # Velocity PID regulator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains of a PID controller, fixed at construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,
}

/// Runtime state carried between calls to `VelocityPid::output`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct PidState {
    /// The integral accumulation
    pub integral: f64,

    /// Error passed in on the previous call, zero before the first call
    pub prev_error: f64,
}

/// A discrete PID controller stepped once per control tick.
///
/// The integral and derivative terms are per-tick sums and differences, they are not scaled by the
/// tick period. The gains are therefore only meaningful for the period they were tuned at.
#[derive(Debug, Default, Clone, Serialize)]
pub struct VelocityPid {
    config: PidConfig,
    state: PidState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VelocityPid {

    /// Create a new controller with the given gains and a zeroed state.
    pub fn new(config: PidConfig) -> Self {
        Self {
            config,
            state: PidState::default()
        }
    }

    /// Get the value of the controller for the given error.
    ///
    /// The error is expected to be normalised (dimensionless). The output is not limited, callers
    /// must saturate it themselves.
    pub fn output(&mut self, error: f64) -> f64 {
        self.state.integral += error;

        let deriv = error - self.state.prev_error;
        self.state.prev_error = error;

        self.config.k_p * error
            + self.config.k_i * self.state.integral
            + self.config.k_d * deriv
    }

    /// Zero the integral and previous error.
    pub fn reset(&mut self) {
        self.state = PidState::default();
    }

    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    pub fn state(&self) -> &PidState {
        &self.state
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SLOW_BRAKE: PidConfig = PidConfig { k_p: 0.8, k_i: 0.0, k_d: 0.13 };

    #[test]
    fn test_first_output() {
        let mut pid = VelocityPid::new(SLOW_BRAKE);
        let error = (2.0 - 1.0) / 35.0;

        let out = pid.output(error);

        // On the first call the derivative is the error itself
        assert!((out - 0.93 * error).abs() < 1e-12);
        assert!((out - 0.026571).abs() < 1e-6);
        assert_eq!(pid.state().prev_error, error);
        assert_eq!(pid.state().integral, error);
    }

    #[test]
    fn test_derivative_uses_previous_error() {
        let mut pid = VelocityPid::new(SLOW_BRAKE);

        pid.output(0.1);
        let out = pid.output(0.1);

        // Constant error so the derivative term vanishes
        assert!((out - 0.08).abs() < 1e-12);

        let out = pid.output(0.0);
        assert!((out - (-0.013)).abs() < 1e-12);
    }

    #[test]
    fn test_integral_strictly_increasing() {
        let mut pid = VelocityPid::new(PidConfig { k_p: 0.0, k_i: 0.5, k_d: 0.0 });

        let mut prev_integral = pid.state().integral;
        let mut prev_out = std::f64::NEG_INFINITY;

        for _ in 0..50 {
            let out = pid.output(0.02);
            assert!(pid.state().integral > prev_integral);
            assert!(out > prev_out);
            prev_integral = pid.state().integral;
            prev_out = out;
        }

        assert!((pid.state().integral - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let mut pid = VelocityPid::new(SLOW_BRAKE);
        pid.output(0.3);
        pid.reset();

        assert_eq!(*pid.state(), PidState::default());
        assert_eq!(*pid.config(), SLOW_BRAKE);
    }
}
