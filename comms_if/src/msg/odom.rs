//! # Odometry message

use serde::{Deserialize, Serialize};

/// A 3D vector.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Linear and angular velocity of the vehicle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Twist {
    /// Linear velocity.
    ///
    /// Units: meters/second
    pub linear: Vector3,

    /// Angular velocity.
    ///
    /// Units: radians/second
    pub angular: Vector3,
}

/// Odometry reported by the vehicle.
///
/// Only the twist is consumed by the controller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Odometry {
    pub twist: Twist,
}
