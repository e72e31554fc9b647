//! # Control loop
//!
//! Runs longitudinal control once per tick: snapshot the input cache, process, emit the command.
//! The scheduler is abstracted behind the `Ticker` trait and the output behind `CommandSink` so
//! the loop can be single-stepped without real time passing.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

// Internal
use crate::input_cache::InputCache;
use crate::long_ctrl::LongCtrl;
use crate::params::is_valid_period;
use comms_if::msg::{VehicleControlCommand, RAW_COMMAND_TOPIC};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Source of control ticks.
pub trait Ticker {
    /// Block until the next tick is due.
    fn wait(&mut self) -> Result<TickStatus, TickerError>;
}

/// Destination of the commands produced by the loop.
pub trait CommandSink {
    fn emit(&mut self, cmd: &VehicleControlCommand) -> Result<(), SinkError>;

    /// Write out anything the sink has buffered.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The control loop, owning the longitudinal controller and reading the input cache.
pub struct ControlLoop {
    long_ctrl: LongCtrl,
    cache: InputCache,

    /// Upstream command from the last successful snapshot, used if the cache becomes unreadable
    last_upstream: VehicleControlCommand,

    /// Number of ticks already executed
    num_cycles: u64,

    /// Number of ticks which degraded to the fault output
    num_faults: u64,
}

/// Totals for a completed run of the loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub num_cycles: u64,
    pub num_faults: u64,
    pub num_sink_errors: u64,
}

/// Ticker sleeping until the start of each fixed period.
pub struct FixedRateTicker {
    period: Duration,
    cycle_start: Option<Instant>,
    max_ticks: Option<u64>,
    num_ticks: u64,
    max_consec_overruns: u64,
    num_consec_overruns: u64,
    stop: Arc<AtomicBool>,
}

/// Ticker producing a fixed number of ticks immediately.
pub struct StepTicker {
    remaining: u64,
}

/// Sink writing each command to the log.
pub struct LogSink;

/// Sink archiving each command as a CSV row.
pub struct ArchiveSink {
    arch: Archiver,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// Run a tick now.
    Tick,
    /// Stop the loop.
    Stop,
}

#[derive(Debug, Error)]
pub enum TickerError {
    #[error("Ticker period must be a positive finite number of seconds ({0})")]
    InvalidPeriod(f64),

    #[error("More than {0} consecutive cycle overruns")]
    TooManyOverruns(u64),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Could not archive the command: {0}")]
    ArchiveError(#[from] ArchiveError),
}

#[derive(Debug, Error)]
pub enum ControlLoopError {
    #[error("Ticker error: {0}")]
    TickerError(#[from] TickerError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlLoop {
    pub fn new(long_ctrl: LongCtrl, cache: InputCache) -> Self {
        Self {
            long_ctrl,
            cache,
            last_upstream: VehicleControlCommand::default(),
            num_cycles: 0,
            num_faults: 0,
        }
    }

    pub fn cache(&self) -> &InputCache {
        &self.cache
    }

    pub fn long_ctrl(&self) -> &LongCtrl {
        &self.long_ctrl
    }

    pub fn num_cycles(&self) -> u64 {
        self.num_cycles
    }

    pub fn num_faults(&self) -> u64 {
        self.num_faults
    }

    /// Execute a single tick and return the command to emit.
    ///
    /// A command is always produced. If the inputs cannot be read or processing fails the last
    /// known upstream command is returned with the emergency deceleration.
    pub fn tick(&mut self) -> VehicleControlCommand {
        self.num_cycles += 1;

        let input = match self.cache.snapshot() {
            Ok(i) => i,
            Err(e) => return self.fault_output(&e),
        };
        self.last_upstream = input.upstream;

        let cmd = match self.long_ctrl.proc(&input) {
            Ok((cmd, _)) => cmd,
            Err(e) => return self.fault_output(&e),
        };

        if let Err(e) = self.long_ctrl.write() {
            warn!("Could not archive LongCtrl status: {}", e);
        }

        cmd
    }

    /// Tick and emit until the ticker stops.
    pub fn run<T, S>(&mut self, ticker: &mut T, sink: &mut S) -> Result<RunSummary, ControlLoopError>
    where
        T: Ticker,
        S: CommandSink,
    {
        let start_cycles = self.num_cycles;
        let start_faults = self.num_faults;
        let mut num_sink_errors = 0;

        let result = loop {
            match ticker.wait() {
                Ok(TickStatus::Tick) => (),
                Ok(TickStatus::Stop) => break Ok(()),
                Err(e) => break Err(e),
            }

            let cmd = self.tick();

            if let Err(e) = sink.emit(&cmd) {
                num_sink_errors += 1;
                warn!("Could not emit command: {}", e);
            }
        };

        // Archives are only flushed periodically during the run
        if let Err(e) = sink.flush() {
            num_sink_errors += 1;
            warn!("Could not flush the command sink: {}", e);
        }
        if let Err(e) = self.long_ctrl.flush_archives() {
            warn!("Could not flush the LongCtrl archives: {}", e);
        }

        result?;

        Ok(RunSummary {
            num_cycles: self.num_cycles - start_cycles,
            num_faults: self.num_faults - start_faults,
            num_sink_errors,
        })
    }

    fn fault_output<E: std::fmt::Display>(&mut self, e: &E) -> VehicleControlCommand {
        self.num_faults += 1;

        let accel = self.long_ctrl.params().emergency_accel_mps2;
        error!(
            "Control tick {} faulted, demanding {} m/s^2: {}",
            self.num_cycles, accel, e
        );

        self.last_upstream.with_accel(accel)
    }
}

impl FixedRateTicker {
    /// Create a ticker with the given period in seconds.
    ///
    /// The ticker errors once more than `max_consec_overruns` cycles in a row take longer than the
    /// period.
    pub fn new(period_s: f64, max_consec_overruns: u64) -> Result<Self, TickerError> {
        if !is_valid_period(period_s) {
            return Err(TickerError::InvalidPeriod(period_s));
        }

        Ok(Self {
            period: Duration::from_secs_f64(period_s),
            cycle_start: None,
            max_ticks: None,
            num_ticks: 0,
            max_consec_overruns,
            num_consec_overruns: 0,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Stop after the given number of ticks.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Stop once the given flag is set.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }
}

impl Ticker for FixedRateTicker {
    fn wait(&mut self) -> Result<TickStatus, TickerError> {
        if self.stop.load(Ordering::Relaxed) {
            return Ok(TickStatus::Stop);
        }
        if let Some(max) = self.max_ticks {
            if self.num_ticks >= max {
                return Ok(TickStatus::Stop);
            }
        }

        if let Some(start) = self.cycle_start {
            let cycle_dur = start.elapsed();

            match self.period.checked_sub(cycle_dur) {
                Some(d) => {
                    self.num_consec_overruns = 0;
                    thread::sleep(d);
                }
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - self.period.as_secs_f64()
                    );
                    self.num_consec_overruns += 1;

                    if self.num_consec_overruns > self.max_consec_overruns {
                        return Err(TickerError::TooManyOverruns(self.max_consec_overruns));
                    }
                }
            }
        }

        self.cycle_start = Some(Instant::now());
        self.num_ticks += 1;

        Ok(TickStatus::Tick)
    }
}

impl StepTicker {
    pub fn new(num_ticks: u64) -> Self {
        Self { remaining: num_ticks }
    }
}

impl Ticker for StepTicker {
    fn wait(&mut self) -> Result<TickStatus, TickerError> {
        if self.remaining == 0 {
            return Ok(TickStatus::Stop);
        }
        self.remaining -= 1;
        Ok(TickStatus::Tick)
    }
}

impl CommandSink for LogSink {
    fn emit(&mut self, cmd: &VehicleControlCommand) -> Result<(), SinkError> {
        debug!("{}: {:.4} m/s^2 ({:?})", RAW_COMMAND_TOPIC, cmd.long_accel_mps2, cmd);
        Ok(())
    }
}

impl ArchiveSink {
    /// Archive commands into `commands.csv` in the session's archive root.
    pub fn new(session: &Session) -> Result<Self, ArchiveError> {
        Ok(Self {
            arch: Archiver::from_path(session, "commands.csv")?,
        })
    }

    /// Archive commands into the given file.
    pub fn from_abs_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ArchiveError> {
        Ok(Self {
            arch: Archiver::from_abs_path(path)?,
        })
    }
}

impl CommandSink for ArchiveSink {
    fn emit(&mut self, cmd: &VehicleControlCommand) -> Result<(), SinkError> {
        self.arch.serialise(cmd)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.arch.flush()?;
        Ok(())
    }
}

impl CommandSink for Vec<VehicleControlCommand> {
    fn emit(&mut self, cmd: &VehicleControlCommand) -> Result<(), SinkError> {
        self.push(*cmd);
        Ok(())
    }
}

impl<A: CommandSink, B: CommandSink> CommandSink for (A, B) {
    fn emit(&mut self, cmd: &VehicleControlCommand) -> Result<(), SinkError> {
        // Emit to both even if the first fails
        let a = self.0.emit(cmd);
        let b = self.1.emit(cmd);
        a.and(b)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        let a = self.0.flush();
        let b = self.1.flush();
        a.and(b)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_step_ticker() {
        let mut t = StepTicker::new(2);
        assert_eq!(t.wait().unwrap(), TickStatus::Tick);
        assert_eq!(t.wait().unwrap(), TickStatus::Tick);
        assert_eq!(t.wait().unwrap(), TickStatus::Stop);
    }

    #[test]
    fn test_fixed_rate_ticker_period() {
        let mut t = FixedRateTicker::new(0.02, 10).unwrap().with_max_ticks(3);
        let start = Instant::now();

        let mut n = 0;
        while t.wait().unwrap() == TickStatus::Tick {
            n += 1;
        }

        assert_eq!(n, 3);
        // First tick is immediate, the two after it wait a full period
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_fixed_rate_ticker_invalid_period() {
        for p in &[-0.1, 0.0, std::f64::NAN, std::f64::INFINITY] {
            assert!(matches!(
                FixedRateTicker::new(*p, 500),
                Err(TickerError::InvalidPeriod(_))
            ));
        }
    }

    #[test]
    fn test_fixed_rate_ticker_stop_flag() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut t = FixedRateTicker::new(0.001, 10).unwrap().with_stop_flag(stop.clone());

        assert_eq!(t.wait().unwrap(), TickStatus::Tick);
        stop.store(true, Ordering::Relaxed);
        assert_eq!(t.wait().unwrap(), TickStatus::Stop);
    }

    #[test]
    fn test_fixed_rate_ticker_overruns() {
        let mut t = FixedRateTicker::new(0.001, 1).unwrap();

        assert_eq!(t.wait().unwrap(), TickStatus::Tick);
        thread::sleep(Duration::from_millis(5));
        assert_eq!(t.wait().unwrap(), TickStatus::Tick);
        thread::sleep(Duration::from_millis(5));
        assert!(matches!(t.wait(), Err(TickerError::TooManyOverruns(1))));
    }

    #[test]
    fn test_run_flushes_command_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.csv");

        let mut control_loop = ControlLoop::new(LongCtrl::default(), InputCache::new());
        let mut sink = ArchiveSink::from_abs_path(&path).unwrap();

        let summary = control_loop.run(&mut StepTicker::new(3), &mut sink).unwrap();
        assert_eq!(summary.num_cycles, 3);
        assert_eq!(summary.num_sink_errors, 0);

        // Header plus one row per tick, fewer than one flush interval
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4);
    }

    #[test]
    fn test_pair_sink() {
        let mut sink = (LogSink, Vec::new());
        let cmd = VehicleControlCommand { long_accel_mps2: -0.4, ..Default::default() };

        sink.emit(&cmd).unwrap();
        assert_eq!(sink.1, vec![cmd]);
    }
}
