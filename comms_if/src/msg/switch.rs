//! # Mode switch message

use serde::{Deserialize, Serialize};

/// Driving mode code sent by the mode switch.
///
/// Codes `1..=5` select Accelerate, Brake, ChangeLaneLeft, ChangeLaneRight and Emergency
/// respectively. `0` means no mode has been set yet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchCmd {
    pub data: i8,
}
