//! # Script input source
//!
//! Replays an input script into the input cache from a background thread, standing in for the
//! live message transport.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Internal
use crate::input_cache::InputCache;
use util::script_interpreter::{PendingMsgs, ScriptInterpreter};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Spawn a thread delivering the script's messages into the cache as they become due.
///
/// Script times are relative to the moment this function is called. Once the script has been
/// fully delivered `end_of_script` is set and the thread exits.
pub fn spawn_script_source(
    mut script: ScriptInterpreter,
    cache: InputCache,
    poll_period: Duration,
    end_of_script: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let start = Instant::now();

    thread::spawn(move || loop {
        match script.get_pending(start.elapsed().as_secs_f64()) {
            PendingMsgs::None => (),
            PendingMsgs::Some(msgs) => {
                for msg in msgs.iter() {
                    debug!("Delivering {} message: {:?}", msg.topic(), msg);

                    if let Err(e) = cache.apply(msg) {
                        error!("Script source stopping: {}", e);
                        end_of_script.store(true, Ordering::Relaxed);
                        return;
                    }
                }
            }
            PendingMsgs::EndOfScript => {
                info!("End of input script reached");
                end_of_script.store(true, Ordering::Relaxed);
                return;
            }
        }

        thread::sleep(poll_period);
    })
}
