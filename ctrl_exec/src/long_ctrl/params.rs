//! Parameters structure for LongCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{LongCtrlInitError, PidConfig};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for longitudinal control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {

    // ---- BRAKE REGULATOR ----

    /// Slow brake regulator proportional gain
    pub k_p: f64,

    /// Slow brake regulator integral gain
    pub k_i: f64,

    /// Slow brake regulator derivative gain
    pub k_d: f64,

    /// Speed the brake regulator drives the vehicle towards.
    ///
    /// Units: meters/second
    pub desired_speed_ms: f64,

    /// Scale the speed error is divided by before being passed to the regulator.
    ///
    /// Units: meters/second
    pub speed_error_scale_ms: f64,

    /// Below this speed the brake regulator is not used and the light brake acceleration is
    /// demanded instead.
    ///
    /// Units: meters/second
    pub brake_pid_min_speed_ms: f64,

    // ---- FIXED DEMANDS ----

    /// Acceleration demanded when braking at low speed or without speed feedback.
    ///
    /// Units: meters/second^2
    pub brake_light_accel_mps2: f64,

    /// Acceleration demanded in emergency mode, and whenever a tick faults.
    ///
    /// Units: meters/second^2
    pub emergency_accel_mps2: f64,

    // ---- LIMITS ----

    /// Minimum acceleration the brake regulator may demand.
    ///
    /// Units: meters/second^2
    pub min_accel_mps2: f64,

    /// Maximum acceleration the brake regulator may demand.
    ///
    /// Units: meters/second^2
    pub max_accel_mps2: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Gains for the brake regulator.
    pub fn pid_config(&self) -> PidConfig {
        PidConfig {
            k_p: self.k_p,
            k_i: self.k_i,
            k_d: self.k_d,
        }
    }
}

impl Params {
    /// Check that the parameters can be used by the controller.
    pub fn validate(&self) -> Result<(), LongCtrlInitError> {
        let fields = [
            ("k_p", self.k_p),
            ("k_i", self.k_i),
            ("k_d", self.k_d),
            ("desired_speed_ms", self.desired_speed_ms),
            ("speed_error_scale_ms", self.speed_error_scale_ms),
            ("brake_pid_min_speed_ms", self.brake_pid_min_speed_ms),
            ("brake_light_accel_mps2", self.brake_light_accel_mps2),
            ("emergency_accel_mps2", self.emergency_accel_mps2),
            ("min_accel_mps2", self.min_accel_mps2),
            ("max_accel_mps2", self.max_accel_mps2),
        ];

        for (name, value) in fields.iter() {
            if !value.is_finite() {
                return Err(LongCtrlInitError::InvalidParams(format!(
                    "{} is not finite ({})",
                    name, value
                )));
            }
        }

        if self.speed_error_scale_ms <= 0.0 {
            return Err(LongCtrlInitError::InvalidParams(format!(
                "speed_error_scale_ms must be positive ({})",
                self.speed_error_scale_ms
            )));
        }

        if self.min_accel_mps2 > self.max_accel_mps2 {
            return Err(LongCtrlInitError::InvalidParams(format!(
                "min_accel_mps2 ({}) is greater than max_accel_mps2 ({})",
                self.min_accel_mps2, self.max_accel_mps2
            )));
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            k_p: 0.8,
            k_i: 0.0,
            k_d: 0.13,
            desired_speed_ms: 0.0,
            speed_error_scale_ms: 35.0,
            brake_pid_min_speed_ms: 1.3,
            brake_light_accel_mps2: -0.2,
            emergency_accel_mps2: -0.4,
            min_accel_mps2: -3.0,
            max_accel_mps2: 1.5,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn invalid(p: Params) -> bool {
        matches!(p.validate(), Err(LongCtrlInitError::InvalidParams(_)))
    }

    #[test]
    fn test_default_params_valid() {
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn test_zero_or_negative_error_scale_rejected() {
        assert!(invalid(Params { speed_error_scale_ms: 0.0, ..Params::default() }));
        assert!(invalid(Params { speed_error_scale_ms: -35.0, ..Params::default() }));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(invalid(Params { k_p: std::f64::NAN, ..Params::default() }));
        assert!(invalid(Params { k_d: std::f64::INFINITY, ..Params::default() }));
        assert!(invalid(Params { desired_speed_ms: std::f64::NAN, ..Params::default() }));
        assert!(invalid(Params { emergency_accel_mps2: std::f64::NEG_INFINITY, ..Params::default() }));
    }

    #[test]
    fn test_inverted_limits_rejected() {
        assert!(invalid(Params { min_accel_mps2: 2.0, max_accel_mps2: 1.0, ..Params::default() }));

        // Equal limits pin the regulator demand but are usable
        let p = Params { min_accel_mps2: -1.0, max_accel_mps2: -1.0, ..Params::default() };
        assert!(p.validate().is_ok());
    }
}
