//! Implementations for the LongCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use serde::Serialize;

// Internal
use super::{
    dispatch, ControlMode, FeedbackSpeed, LongCtrlError, LongCtrlInitError, Params, Policy,
    VelocityPid,
};
use comms_if::msg::VehicleControlCommand;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Longitudinal control module state
pub struct LongCtrl {
    pub(crate) params: Params,

    pid: VelocityPid,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    /// Mode code seen on the previous cycle, used to log mode changes
    last_mode_code: Option<i8>,

    /// True if the brake regulator demand was limited on the previous cycle
    last_accel_limited: bool,

    num_procs: u64,
}

/// Input data to longitudinal control, the latest known value of each input.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct InputData {
    /// Raw mode switch code
    pub mode_code: i8,

    /// Measured vehicle speed
    pub feedback: FeedbackSpeed,

    /// Upstream command to pass through or override
    pub upstream: VehicleControlCommand,
}

/// Status report for LongCtrl processing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct StatusReport {
    /// Index of the processing cycle this report is for
    pub proc_index: u64,

    pub mode_code: i8,

    /// True if the mode code was not recognised and Accelerate was used instead
    pub mode_code_invalid: bool,

    pub mode: ControlMode,

    pub policy: Policy,

    /// Measured speed, empty until the first feedback
    pub speed_ms: Option<f64>,

    pub pid_error: Option<f64>,

    pub pid_output: Option<f64>,

    pub pid_integral: f64,

    /// Commanded acceleration
    ///
    /// Units: meters/second^2
    pub accel_mps2: f64,

    pub accel_limited: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for LongCtrl {
    type InitData = &'static str;
    type InitError = LongCtrlInitError;

    type InputData = InputData;
    type OutputData = VehicleControlCommand;
    type StatusReport = StatusReport;
    type ProcError = LongCtrlError;

    /// Initialise the LongCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load(init_data)?;
        params.validate()?;

        *self = LongCtrl::new(params);

        self.arch_report = Archiver::from_path(session, "long_ctrl/status_report.csv")?;

        Ok(())
    }

    /// Perform cyclic processing of longitudinal control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.report = StatusReport {
            proc_index: self.num_procs,
            mode_code: input_data.mode_code,
            speed_ms: input_data.feedback.as_option(),
            ..Default::default()
        };
        self.num_procs += 1;

        let mode = self.resolve_mode(input_data.mode_code);
        self.report.mode = mode;

        let decision = dispatch(
            mode,
            input_data.feedback,
            &input_data.upstream,
            &mut self.pid,
            &self.params,
        )?;

        self.report.policy = decision.policy;
        self.report.pid_error = decision.pid_error;
        self.report.pid_output = decision.pid_output;
        self.report.pid_integral = self.pid.state().integral;
        self.report.accel_mps2 = decision.cmd.long_accel_mps2;
        self.report.accel_limited = decision.accel_limited;

        if decision.accel_limited && !self.last_accel_limited {
            warn!(
                "Brake regulator demand limited to {:.3} m/s^2",
                decision.cmd.long_accel_mps2
            );
        }

        self.last_accel_limited = decision.accel_limited;

        trace!("LongCtrl output: {:?} -> {:?}", decision.policy, decision.cmd);

        Ok((decision.cmd, self.report))
    }
}

impl Default for LongCtrl {
    fn default() -> Self {
        LongCtrl::new(Params::default())
    }
}

impl Archived for LongCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)
    }

    fn flush_archives(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.flush()
    }
}

impl LongCtrl {
    /// Create a new instance from the given parameters, without any archiving.
    pub fn new(params: Params) -> Self {
        Self {
            pid: VelocityPid::new(params.pid_config()),
            params,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
            last_mode_code: None,
            last_accel_limited: false,
            num_procs: 0,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The brake regulator, whose state persists across cycles.
    pub fn pid(&self) -> &VelocityPid {
        &self.pid
    }

    /// The status report from the most recent cycle.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// Map the mode code to a mode, logging whenever the code changes.
    ///
    /// Unrecognised codes are treated as `Accelerate` so the upstream command is passed through.
    fn resolve_mode(&mut self, code: i8) -> ControlMode {
        let changed = self.last_mode_code != Some(code);
        self.last_mode_code = Some(code);

        let mode = match ControlMode::from_code(code) {
            Some(m) => m,
            None => {
                self.report.mode_code_invalid = true;
                if changed {
                    warn!(
                        "Unrecognised mode code {}, passing the upstream command through",
                        code
                    );
                }
                return ControlMode::Accelerate;
            }
        };

        if changed {
            match mode {
                ControlMode::ChangeLaneLeft | ControlMode::ChangeLaneRight => info!(
                    "Mode changed to {:?}: lane change is not implemented, passing the upstream \
                     command through",
                    mode
                ),
                _ => info!("Mode changed to {:?}", mode),
            }
        }

        mode
    }
}
