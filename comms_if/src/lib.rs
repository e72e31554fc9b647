//! # Communications interface crate.
//!
//! Provides the messages exchanged between the longitudinal controller and the rest of the
//! vehicle software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for the mode switch, vehicle commands and odometry
pub mod msg;
