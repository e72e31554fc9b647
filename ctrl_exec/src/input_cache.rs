//! # Input cache
//!
//! Holds the last known value of each controller input. Producers write into the cache whenever
//! a message arrives and the control loop takes a snapshot once per tick, never waiting for new
//! data.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::sync::{Arc, Mutex};
use thiserror::Error;

// Internal
use crate::long_ctrl::{FeedbackSpeed, InputData};
use comms_if::msg::{InputMsg, Odometry, SwitchCmd, VehicleControlCommand};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared handle to the last known inputs.
///
/// Cloning the handle shares the same underlying cache. Every update is a single assignment made
/// under the lock, so a snapshot never mixes fields from two different messages.
#[derive(Debug, Clone, Default)]
pub struct InputCache {
    inner: Arc<Mutex<InputData>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("The input cache lock is poisoned, a producer panicked while updating it")]
    Poisoned,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl InputCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current inputs.
    pub fn snapshot(&self) -> Result<InputData, CacheError> {
        self.inner
            .lock()
            .map(|d| *d)
            .map_err(|_| CacheError::Poisoned)
    }

    pub fn set_mode_code(&self, code: i8) -> Result<(), CacheError> {
        self.update(|d| d.mode_code = code)
    }

    pub fn set_upstream(&self, cmd: VehicleControlCommand) -> Result<(), CacheError> {
        self.update(|d| d.upstream = cmd)
    }

    /// Store the speed measured by the given odometry.
    pub fn set_odometry(&self, odom: &Odometry) -> Result<(), CacheError> {
        let speed = FeedbackSpeed::from_odometry(odom);
        self.update(|d| d.feedback = speed)
    }

    /// Store whatever the message carries.
    pub fn apply(&self, msg: &InputMsg) -> Result<(), CacheError> {
        match msg {
            InputMsg::SwitchCmd(SwitchCmd { data }) => self.set_mode_code(*data),
            InputMsg::RawCommand(cmd) => self.set_upstream(*cmd),
            InputMsg::Odometry(odom) => self.set_odometry(odom),
        }
    }

    fn update<F: FnOnce(&mut InputData)>(&self, f: F) -> Result<(), CacheError> {
        let mut d = self.inner.lock().map_err(|_| CacheError::Poisoned)?;
        f(&mut *d);
        Ok(())
    }
}
