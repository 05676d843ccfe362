//! # Gait Generation Benchmark
//!
//! One control cycle has to fit in the 1 ms period, this measures the waveform evaluation and the
//! servo writes of a cycle separately.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gait_lib::{
    gait_gen::{GaitGen, InputData, Params},
    joint::{Joint, JointMap},
    servo_ctrl::{PulseMap, ServoCtrl, sim::SimDriver},
};
use util::module::State;

fn gait_gen_benchmark(c: &mut Criterion) {
    let mut gait_gen = GaitGen::default();
    gait_gen.init(Params::default()).unwrap();

    let mut t = 0.0;

    c.bench_function("gait_gen_proc", |b| b.iter(|| {
        t += 1e-3;
        gait_gen.proc(black_box(&InputData { elapsed_s: t })).unwrap()
    }));

    let mut servo_ctrl = ServoCtrl::new(
        SimDriver::new(),
        PulseMap::default(),
        &JointMap { ankle1: 26, knee1: 13, knee2: 25, ankle2: 12 }
    ).unwrap();
    let (demands, _) = gait_gen.proc(&InputData { elapsed_s: 0.0 }).unwrap();

    c.bench_function("servo_ctrl_write_cycle", |b| b.iter(|| {
        for &joint in Joint::WRITE_ORDER.iter() {
            servo_ctrl.set_angle(joint, black_box(demands.get(joint))).unwrap();
        }
    }));
}

criterion_group!(benches, gait_gen_benchmark);
criterion_main!(benches);
