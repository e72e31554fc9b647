//! # Control Tick Benchmark

use comms_if::msg::{Odometry, Twist, Vector3, VehicleControlCommand};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ctrl_lib::{
    control_loop::ControlLoop,
    input_cache::InputCache,
    long_ctrl::{LongCtrl, Params},
};

fn tick_benchmark(c: &mut Criterion) {
    let cache = InputCache::new();
    cache
        .set_upstream(VehicleControlCommand {
            long_accel_mps2: 0.5,
            velocity_mps: 10.0,
            ..Default::default()
        })
        .unwrap();
    cache
        .set_odometry(&Odometry {
            twist: Twist {
                linear: Vector3 { x: 8.0, y: 0.5, z: 0.0 },
                ..Default::default()
            },
        })
        .unwrap();

    let mut control_loop = ControlLoop::new(LongCtrl::new(Params::default()), cache.clone());

    cache.set_mode_code(2).unwrap();
    c.bench_function("brake tick", |b| b.iter(|| black_box(control_loop.tick())));

    cache.set_mode_code(1).unwrap();
    c.bench_function("passthrough tick", |b| b.iter(|| black_box(control_loop.tick())));
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
