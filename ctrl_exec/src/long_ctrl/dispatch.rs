//! # Mode dispatcher
//!
//! Selects the control policy for the current mode and computes the command for this tick. The
//! decision only depends on its inputs, the brake regulator's state being the only thing carried
//! from one tick to the next.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{ControlMode, FeedbackSpeed, LongCtrlError, Params, VelocityPid};
use comms_if::msg::VehicleControlCommand;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The outcome of dispatching a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    /// The command to emit.
    pub cmd: VehicleControlCommand,

    /// The policy which produced the command.
    pub policy: Policy,

    /// Normalised speed error passed to the brake regulator, if it was used.
    pub pid_error: Option<f64>,

    /// Raw brake regulator output before sign inversion and limiting, if it was used.
    pub pid_output: Option<f64>,

    /// True if the regulator's demand was limited.
    pub accel_limited: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The control policy applied on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Policy {
    /// Fixed emergency deceleration.
    Emergency,
    /// Fixed light deceleration, speed is below the regulator threshold.
    LightBrake,
    /// Brake regulator in use.
    PidBrake,
    /// Fixed light deceleration as no speed feedback has been received yet.
    NoFeedbackBrake,
    /// Upstream command forwarded unchanged.
    Passthrough,
    /// Lane change requested. Trajectory merging is not implemented so the upstream command is
    /// forwarded unchanged.
    LaneChangeNotImplemented,
}

impl Default for Policy {
    fn default() -> Self {
        Policy::Passthrough
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Decide the command for this tick.
///
/// Only the acceleration of `upstream` is ever replaced, every other field is forwarded.
pub fn dispatch(
    mode: ControlMode,
    feedback: FeedbackSpeed,
    upstream: &VehicleControlCommand,
    pid: &mut VelocityPid,
    params: &Params,
) -> Result<Decision, LongCtrlError> {
    let fixed = |policy: Policy, accel: f64| Decision {
        cmd: upstream.with_accel(accel),
        policy,
        pid_error: None,
        pid_output: None,
        accel_limited: false,
    };

    let decision = match mode {
        ControlMode::Emergency => {
            trace!("Emergency brake");
            fixed(Policy::Emergency, params.emergency_accel_mps2)
        }

        ControlMode::Brake => match feedback {
            FeedbackSpeed::Unset => {
                trace!("Brake with no speed feedback yet");
                fixed(Policy::NoFeedbackBrake, params.brake_light_accel_mps2)
            }
            FeedbackSpeed::Known(speed_ms) if !speed_ms.is_finite() => {
                return Err(LongCtrlError::NonFiniteSpeed(speed_ms))
            }
            FeedbackSpeed::Known(speed_ms) if speed_ms < params.brake_pid_min_speed_ms => {
                trace!("Brake at low speed ({:.3} m/s)", speed_ms);
                fixed(Policy::LightBrake, params.brake_light_accel_mps2)
            }
            FeedbackSpeed::Known(speed_ms) => {
                brake_regulated(speed_ms, upstream, pid, params)?
            }
        },

        ControlMode::Accelerate => fixed(Policy::Passthrough, upstream.long_accel_mps2),

        ControlMode::ChangeLaneLeft | ControlMode::ChangeLaneRight => {
            fixed(Policy::LaneChangeNotImplemented, upstream.long_accel_mps2)
        }
    };

    Ok(decision)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Brake towards the desired speed using the regulator.
///
/// Overspeed gives a positive error, so the regulator output is inverted to demand deceleration.
fn brake_regulated(
    speed_ms: f64,
    upstream: &VehicleControlCommand,
    pid: &mut VelocityPid,
    params: &Params,
) -> Result<Decision, LongCtrlError> {
    let error = (speed_ms - params.desired_speed_ms) / params.speed_error_scale_ms;

    // A non-finite error would stay in the regulator state for every later cycle
    if !error.is_finite() {
        return Err(LongCtrlError::NonFiniteError(error));
    }

    let pid_output = pid.output(error);

    if !pid_output.is_finite() {
        return Err(LongCtrlError::NonFiniteOutput(pid_output));
    }

    let demand = -pid_output;
    let accel = demand.max(params.min_accel_mps2).min(params.max_accel_mps2);

    trace!(
        "Brake and slow: speed {:.3} m/s, error {:.6}, accel {:.6} m/s^2",
        speed_ms,
        error,
        accel
    );

    Ok(Decision {
        cmd: upstream.with_accel(accel),
        policy: Policy::PidBrake,
        pid_error: Some(error),
        pid_output: Some(pid_output),
        accel_limited: accel != demand,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::long_ctrl::PidState;

    fn upstream() -> VehicleControlCommand {
        VehicleControlCommand {
            stamp_s: 12.5,
            long_accel_mps2: 0.7,
            velocity_mps: 8.0,
            front_wheel_angle_rad: 0.05,
            rear_wheel_angle_rad: -0.01,
        }
    }

    fn run(mode: ControlMode, feedback: FeedbackSpeed, pid: &mut VelocityPid) -> Decision {
        let params = Params::default();
        dispatch(mode, feedback, &upstream(), pid, &params).unwrap()
    }

    #[test]
    fn test_emergency_overrides_everything() {
        let params = Params::default();

        for speed in &[0.0, 0.5, 1.3, 10.0, 40.0] {
            for desired in &[0.0, 5.0, 50.0] {
                let mut pid = VelocityPid::new(params.pid_config());
                let p = Params { desired_speed_ms: *desired, ..params.clone() };
                let d = dispatch(
                    ControlMode::Emergency,
                    FeedbackSpeed::Known(*speed),
                    &upstream(),
                    &mut pid,
                    &p,
                )
                .unwrap();

                assert_eq!(d.cmd.long_accel_mps2, -0.4);
                assert_eq!(d.policy, Policy::Emergency);
                assert_eq!(d.cmd, upstream().with_accel(-0.4));
            }
        }

        let mut pid = VelocityPid::new(params.pid_config());
        let d = run(ControlMode::Emergency, FeedbackSpeed::Unset, &mut pid);
        assert_eq!(d.cmd.long_accel_mps2, -0.4);
    }

    #[test]
    fn test_brake_threshold() {
        let mut pid = VelocityPid::new(Params::default().pid_config());

        let d = run(ControlMode::Brake, FeedbackSpeed::Known(1.2), &mut pid);
        assert_eq!(d.policy, Policy::LightBrake);
        assert_eq!(d.cmd.long_accel_mps2, -0.2);
        assert_eq!(pid.state().prev_error, 0.0);

        let d = run(ControlMode::Brake, FeedbackSpeed::Known(1.3), &mut pid);
        assert_eq!(d.policy, Policy::PidBrake);
        assert!(d.pid_output.is_some());
    }

    #[test]
    fn test_brake_pid_trace() {
        let params = Params { desired_speed_ms: 1.0, ..Params::default() };
        let mut pid = VelocityPid::new(params.pid_config());

        let d = dispatch(
            ControlMode::Brake,
            FeedbackSpeed::Known(2.0),
            &upstream(),
            &mut pid,
            &params,
        )
        .unwrap();

        assert!((d.pid_error.unwrap() - 0.028571).abs() < 1e-6);
        assert!((d.pid_output.unwrap() - 0.026571).abs() < 1e-6);
        assert!((d.cmd.long_accel_mps2 - (-0.026571)).abs() < 1e-6);
        assert!(!d.accel_limited);
        assert_eq!(d.cmd.velocity_mps, 8.0);
        assert_eq!(d.cmd.front_wheel_angle_rad, 0.05);
    }

    #[test]
    fn test_brake_limited() {
        let params = Params { k_p: 1000.0, ..Params::default() };
        let mut pid = VelocityPid::new(params.pid_config());

        let d = dispatch(
            ControlMode::Brake,
            FeedbackSpeed::Known(30.0),
            &upstream(),
            &mut pid,
            &params,
        )
        .unwrap();

        assert_eq!(d.cmd.long_accel_mps2, params.min_accel_mps2);
        assert!(d.accel_limited);
    }

    #[test]
    fn test_brake_without_feedback() {
        let mut pid = VelocityPid::new(Params::default().pid_config());

        let d = run(ControlMode::Brake, FeedbackSpeed::Unset, &mut pid);

        assert_eq!(d.policy, Policy::NoFeedbackBrake);
        assert_eq!(d.cmd.long_accel_mps2, -0.2);
        assert!(d.cmd.long_accel_mps2.is_finite());
        assert_eq!(pid.state().integral, 0.0);
    }

    #[test]
    fn test_brake_non_finite_speed() {
        let params = Params::default();
        let mut pid = VelocityPid::new(params.pid_config());

        let r = dispatch(
            ControlMode::Brake,
            FeedbackSpeed::Known(std::f64::NAN),
            &upstream(),
            &mut pid,
            &params,
        );

        assert!(matches!(r, Err(LongCtrlError::NonFiniteSpeed(_))));
    }

    #[test]
    fn test_non_finite_error_leaves_regulator_untouched() {
        let params = Params { speed_error_scale_ms: 0.0, ..Params::default() };
        let mut pid = VelocityPid::new(params.pid_config());

        let r = dispatch(
            ControlMode::Brake,
            FeedbackSpeed::Known(2.0),
            &upstream(),
            &mut pid,
            &params,
        );

        assert!(matches!(r, Err(LongCtrlError::NonFiniteError(_))));
        assert_eq!(*pid.state(), PidState::default());

        // A valid cycle afterwards is not poisoned by the failed one
        let d = run(ControlMode::Brake, FeedbackSpeed::Known(2.0), &mut pid);
        assert!(d.cmd.long_accel_mps2.is_finite());
    }

    #[test]
    fn test_passthrough_identity() {
        let mut pid = VelocityPid::new(Params::default().pid_config());

        for mode in &[
            ControlMode::Accelerate,
            ControlMode::ChangeLaneLeft,
            ControlMode::ChangeLaneRight,
        ] {
            let d = run(*mode, FeedbackSpeed::Known(20.0), &mut pid);
            assert_eq!(d.cmd, upstream());
        }

        let d = run(ControlMode::ChangeLaneLeft, FeedbackSpeed::Unset, &mut pid);
        assert_eq!(d.policy, Policy::LaneChangeNotImplemented);
        assert_eq!(*pid.state(), Default::default());
    }
}
