//! # Vehicle control command

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A command to the vehicle's drive-by-wire interface.
///
/// The same shape is used both for the upstream command fed into the controller and the command
/// it publishes. Fields missing from a JSON packet default to zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleControlCommand {
    /// Time the command was produced.
    ///
    /// Units: seconds
    pub stamp_s: f64,

    /// Longitudinal acceleration demand.
    ///
    /// Units: meters/second^2
    pub long_accel_mps2: f64,

    /// Velocity demand.
    ///
    /// Units: meters/second
    pub velocity_mps: f64,

    /// Front wheel steer angle demand.
    ///
    /// Units: radians
    pub front_wheel_angle_rad: f64,

    /// Rear wheel steer angle demand.
    ///
    /// Units: radians
    pub rear_wheel_angle_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VehicleControlCommand {
    /// Return a copy of this command with the acceleration demand replaced.
    pub fn with_accel(&self, long_accel_mps2: f64) -> Self {
        Self {
            long_accel_mps2,
            ..*self
        }
    }
}
