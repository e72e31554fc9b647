//! Integration tests single-stepping the control loop.

use comms_if::msg::{InputMsg, Odometry, SwitchCmd, Twist, Vector3, VehicleControlCommand};
use ctrl_lib::{
    control_loop::{ControlLoop, StepTicker},
    input_cache::InputCache,
    long_ctrl::{LongCtrl, Params, Policy},
};

fn upstream() -> VehicleControlCommand {
    VehicleControlCommand {
        stamp_s: 3.0,
        long_accel_mps2: 0.9,
        velocity_mps: 15.0,
        front_wheel_angle_rad: 0.02,
        rear_wheel_angle_rad: 0.0,
    }
}

fn odom(speed_ms: f64) -> Odometry {
    Odometry {
        twist: Twist {
            linear: Vector3 { x: speed_ms, y: 0.0, z: 0.0 },
            ..Default::default()
        },
    }
}

fn new_loop(params: Params) -> (ControlLoop, InputCache) {
    let cache = InputCache::new();
    (ControlLoop::new(LongCtrl::new(params), cache.clone()), cache)
}

#[test]
fn default_inputs_pass_through() {
    let (mut cl, cache) = new_loop(Params::default());

    assert_eq!(cl.tick(), VehicleControlCommand::default());

    cache.set_upstream(upstream()).unwrap();
    assert_eq!(cl.tick(), upstream());
    assert_eq!(cl.num_cycles(), 2);
}

#[test]
fn brake_before_first_feedback_is_defined() {
    let (mut cl, cache) = new_loop(Params::default());
    cache.set_upstream(upstream()).unwrap();
    cache.set_mode_code(2).unwrap();

    for _ in 0..5 {
        let cmd = cl.tick();
        assert_eq!(cmd.long_accel_mps2, -0.2);
        assert_eq!(cl.long_ctrl().report().policy, Policy::NoFeedbackBrake);
    }
    assert_eq!(cl.num_faults(), 0);

    cache.set_odometry(&odom(10.0)).unwrap();
    cl.tick();
    assert_eq!(cl.long_ctrl().report().policy, Policy::PidBrake);
}

#[test]
fn mode_change_takes_effect_next_tick() {
    let (mut cl, cache) = new_loop(Params::default());
    cache.set_upstream(upstream()).unwrap();
    cache.set_odometry(&odom(20.0)).unwrap();

    assert_eq!(cl.tick().long_accel_mps2, 0.9);

    cache.apply(&InputMsg::SwitchCmd(SwitchCmd { data: 5 })).unwrap();
    assert_eq!(cl.tick().long_accel_mps2, -0.4);

    cache.apply(&InputMsg::SwitchCmd(SwitchCmd { data: 4 })).unwrap();
    assert_eq!(cl.tick(), upstream());

    cache.apply(&InputMsg::SwitchCmd(SwitchCmd { data: 2 })).unwrap();
    let accel = cl.tick().long_accel_mps2;
    assert!(accel < 0.0);
    assert!(accel > -3.0);

    cache.apply(&InputMsg::SwitchCmd(SwitchCmd { data: 1 })).unwrap();
    assert_eq!(cl.tick(), upstream());
}

#[test]
fn integral_accumulates_over_brake_ticks() {
    let (mut cl, cache) = new_loop(Params { k_i: 0.1, k_d: 0.0, ..Params::default() });
    cache.set_mode_code(2).unwrap();
    cache.set_odometry(&odom(7.0)).unwrap();

    let mut prev_integral = 0.0;
    let mut prev_accel = std::f64::INFINITY;

    for _ in 0..20 {
        let accel = cl.tick().long_accel_mps2;
        let integral = cl.long_ctrl().pid().state().integral;

        assert!(integral > prev_integral);
        assert!(accel < prev_accel);

        prev_integral = integral;
        prev_accel = accel;
    }

    assert!((prev_integral - 20.0 * 0.2).abs() < 1e-9);
}

#[test]
fn fault_degrades_to_emergency_decel() {
    let (mut cl, cache) = new_loop(Params::default());
    cache.set_upstream(upstream()).unwrap();
    cache.set_mode_code(2).unwrap();
    cache.set_odometry(&odom(std::f64::INFINITY)).unwrap();

    let cmd = cl.tick();

    assert_eq!(cmd, upstream().with_accel(-0.4));
    assert_eq!(cl.num_faults(), 1);

    cache.set_odometry(&odom(0.5)).unwrap();
    assert_eq!(cl.tick().long_accel_mps2, -0.2);
    assert_eq!(cl.num_faults(), 1);
}

#[test]
fn run_emits_every_tick() {
    let (mut cl, cache) = new_loop(Params::default());
    cache.set_upstream(upstream()).unwrap();
    cache.set_mode_code(5).unwrap();

    let mut sink: Vec<VehicleControlCommand> = Vec::new();
    let summary = cl.run(&mut StepTicker::new(10), &mut sink).unwrap();

    assert_eq!(summary.num_cycles, 10);
    assert_eq!(summary.num_faults, 0);
    assert_eq!(summary.num_sink_errors, 0);
    assert_eq!(sink.len(), 10);
    assert!(sink.iter().all(|c| *c == upstream().with_accel(-0.4)));
}
