//! # Input script interpreter module
//!
//! This module provides an interpreter for input scripts, which replay timestamped input messages
//! into the controller in place of live data.
//!
//! A script is a sequence of entries of the form `<time_s>: <json>;`, for example:
//!
//! ```text
//! 0.0: {"type": "ODOM", "payload": {"twist": {"linear": {"x": 5.0}}}};
//! 1.5: {"type": "SWITCH_CMD", "payload": {"data": 2}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use thiserror::Error;

// Internal
use comms_if::msg::{InputMsg, MsgParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A message which is scripted to arrive at a specific time.
#[derive(Debug)]
struct ScriptedMsg {
    /// The time the message is delivered at
    exec_time_s: f64,

    /// The message itself
    msg: InputMsg
}

/// A script interpreter.
///
/// After initialising with the path to the script use `.get_pending` to acquire the messages
/// which are due.
#[derive(Debug)]
pub struct ScriptInterpreter {
    msgs: VecDeque<ScriptedMsg>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid message at {0} s: {1}")]
    InvalidMsg(f64, MsgParseError),

    #[error("Script entry at {0} s is earlier than the entry before it")]
    OutOfOrder(f64)
}

/// Messages that are due for delivery.
#[derive(Debug, PartialEq)]
pub enum PendingMsgs {
    None,
    Some(Vec<InputMsg>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = script_path.as_ref();

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path.display().to_string()));
        }

        let script = fs::read_to_string(path).map_err(ScriptError::ScriptLoadError)?;

        Self::from_script_str(&script)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_script_str(script: &str) -> Result<Self, ScriptError> {
        let mut queue: VecDeque<ScriptedMsg> = VecDeque::new();

        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("script regex is valid");

        for cap in re.captures_iter(script) {
            let exec_time_s: f64 = cap[1]
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            let msg = InputMsg::from_json(&cap[3])
                .map_err(|e| ScriptError::InvalidMsg(exec_time_s, e))?;

            if let Some(prev) = queue.back() {
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(exec_time_s));
                }
            }

            queue.push_back(ScriptedMsg { exec_time_s, msg });
        }

        if queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter { msgs: queue })
    }

    /// Return the messages whose delivery time is at or before `elapsed_s`.
    pub fn get_pending(&mut self, elapsed_s: f64) -> PendingMsgs {
        if self.msgs.is_empty() {
            return PendingMsgs::EndOfScript
        }

        let mut due = vec![];

        while let Some(front) = self.msgs.front() {
            if front.exec_time_s > elapsed_s {
                break;
            }
            if let Some(m) = self.msgs.pop_front() {
                due.push(m.msg);
            }
        }

        if due.is_empty() {
            PendingMsgs::None
        }
        else {
            PendingMsgs::Some(due)
        }
    }

    /// Get the number of messages remaining in the script
    pub fn get_num_msgs(&self) -> usize {
        self.msgs.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.msgs.back() {
            Some(m) => m.exec_time_s,
            None => 0f64
        }
    }
}
