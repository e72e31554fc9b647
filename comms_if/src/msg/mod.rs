//! # Message module
//!
//! Each message consumed or produced by the controller is defined here, along with the
//! `InputMsg` envelope used to carry any of the inputs in a single JSON packet.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod odom;
mod switch;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
pub use cmd::*;
pub use odom::*;
pub use switch::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Topic carrying the driving mode switch code.
pub const SWITCH_CMD_TOPIC: &str = "switch_cmd";

/// Topic carrying the upstream command, which is passed through unless overridden.
pub const RAW_COMMAND_MASTER_TOPIC: &str = "raw_command_master";

/// Topic the controller publishes its command on.
pub const RAW_COMMAND_TOPIC: &str = "raw_command";

/// Topic carrying the vehicle's odometry.
pub const ODOMETRY_TOPIC: &str = "odom";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Any input the controller can receive.
///
/// Serialised as `{"type": "<TYPE>", "payload": <message>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum InputMsg {
    /// A new driving mode code.
    #[serde(rename = "SWITCH_CMD")]
    SwitchCmd(SwitchCmd),

    /// A new upstream command.
    #[serde(rename = "RAW_COMMAND")]
    RawCommand(VehicleControlCommand),

    /// New odometry from the vehicle.
    #[serde(rename = "ODOM")]
    Odometry(Odometry),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum MsgParseError {
    #[error("Message contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl InputMsg {
    /// Parse a new input message from a JSON packet.
    pub fn from_json(json_str: &str) -> Result<Self, MsgParseError> {
        serde_json::from_str(json_str).map_err(MsgParseError::InvalidJson)
    }

    /// The topic this message would arrive on.
    pub fn topic(&self) -> &'static str {
        match self {
            InputMsg::SwitchCmd(_) => SWITCH_CMD_TOPIC,
            InputMsg::RawCommand(_) => RAW_COMMAND_MASTER_TOPIC,
            InputMsg::Odometry(_) => ODOMETRY_TOPIC,
        }
    }
}
