//! Driving modes and speed feedback

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::Odometry;
use nalgebra::Vector3;
use serde::Serialize;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Driving mode selecting the control policy for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControlMode {
    /// Pass the upstream command through. This is the default mode.
    Accelerate,
    /// Slow the vehicle down towards the desired speed.
    Brake,
    ChangeLaneLeft,
    ChangeLaneRight,
    /// Stop with a fixed strong deceleration, overriding everything else.
    Emergency,
}

/// Measured speed of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum FeedbackSpeed {
    /// No odometry has been received yet.
    Unset,
    /// Speed magnitude in meters/second.
    Known(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlMode {
    /// Map a mode switch code to a mode.
    ///
    /// `0` (no mode set yet) maps to `Accelerate`. Codes outside `0..=5` return `None`.
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            0 | 1 => Some(ControlMode::Accelerate),
            2 => Some(ControlMode::Brake),
            3 => Some(ControlMode::ChangeLaneLeft),
            4 => Some(ControlMode::ChangeLaneRight),
            5 => Some(ControlMode::Emergency),
            _ => None,
        }
    }

    /// The wire code of this mode.
    pub fn code(&self) -> i8 {
        match self {
            ControlMode::Accelerate => 1,
            ControlMode::Brake => 2,
            ControlMode::ChangeLaneLeft => 3,
            ControlMode::ChangeLaneRight => 4,
            ControlMode::Emergency => 5,
        }
    }
}

impl Default for ControlMode {
    fn default() -> Self {
        ControlMode::Accelerate
    }
}

impl FeedbackSpeed {
    /// Speed from the magnitude of the odometry's linear velocity.
    pub fn from_odometry(odom: &Odometry) -> Self {
        let v = odom.twist.linear;
        FeedbackSpeed::Known(Vector3::new(v.x, v.y, v.z).norm())
    }

    pub fn as_option(&self) -> Option<f64> {
        match self {
            FeedbackSpeed::Unset => None,
            FeedbackSpeed::Known(s) => Some(*s),
        }
    }
}

impl Default for FeedbackSpeed {
    fn default() -> Self {
        FeedbackSpeed::Unset
    }
}
