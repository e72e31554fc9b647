//! Main controller executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Start the input source, which updates the input cache as messages arrive
//!     - Main loop, once per cycle:
//!         - Snapshot the input cache
//!         - Longitudinal control processing
//!         - Emit the command to the output sinks
//!
//! # Modules
//!
//! All modules (e.g. `long_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::info;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use ctrl_lib::{
    control_loop::{ArchiveSink, ControlLoop, FixedRateTicker, LogSink},
    input_cache::InputCache,
    long_ctrl::LongCtrl,
    params::ExecParams,
    script_source::spawn_script_source,
};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::ScriptInterpreter,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Longitudinal controller executable.
#[derive(Debug, StructOpt)]
#[structopt(name = "ctrl_exec")]
struct Opt {
    /// Input script to replay. Without a script the controller runs on default inputs.
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Stop after this many cycles.
    #[structopt(long)]
    cycles: Option<u64>,

    /// Minimum log level (trace, debug or info).
    #[structopt(long, default_value = "debug")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("ctrl_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(opt.log_level, &session).wrap_err("Failed to initialise logging")?;

    info!("Longitudinal Controller Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams = util::params::load("exec.toml")
        .wrap_err("Could not load exec params")?;
    exec_params.validate().wrap_err("Invalid exec params")?;
    session.save("params/exec.json", exec_params.clone());

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut long_ctrl = LongCtrl::default();
    long_ctrl
        .init("long_ctrl.toml", &session)
        .wrap_err("Failed to initialise LongCtrl")?;
    session.save("params/long_ctrl.json", long_ctrl.params().clone());
    info!("LongCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE INPUT SOURCE ----

    let cache = InputCache::new();
    let end_of_script = Arc::new(AtomicBool::new(false));

    // The source thread is left detached, it exits on its own at the end of the script
    let _script_handle = match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;
            info!(
                "Loaded script lasts {:.02} s and contains {} messages\n",
                si.get_duration(),
                si.get_num_msgs()
            );

            Some(spawn_script_source(
                si,
                cache.clone(),
                Duration::from_secs_f64(exec_params.script_poll_period_s),
                end_of_script.clone(),
            ))
        }
        None => {
            info!("No script provided, running on default inputs\n");
            None
        }
    };

    // ---- MAIN LOOP ----

    let mut ticker = FixedRateTicker::new(
        exec_params.cycle_period_s,
        exec_params.max_consec_overruns,
    )
    .wrap_err("Failed to initialise the cycle ticker")?
    .with_stop_flag(end_of_script);
    if let Some(n) = opt.cycles {
        ticker = ticker.with_max_ticks(n);
    }

    let mut sink = (
        LogSink,
        ArchiveSink::new(&session).wrap_err("Failed to initialise the command archive")?,
    );

    let mut control_loop = ControlLoop::new(long_ctrl, cache);

    info!("Begining main loop\n");

    let summary = control_loop
        .run(&mut ticker, &mut sink)
        .wrap_err("Control loop stopped")?;

    // ---- SHUTDOWN ----

    info!(
        "Executed {} cycles ({} faulted, {} emit errors)",
        summary.num_cycles, summary.num_faults, summary.num_sink_errors
    );

    session.exit();

    info!("End of execution");

    Ok(())
}
