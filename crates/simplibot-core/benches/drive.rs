//! Benchmarks for the drive path and PID
//!
//! Run with: cargo bench --bench drive

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use simplibot_core::drive::{curvature_mix, mix};
use simplibot_core::{
    Drive, DriveConfig, Logger, MotorSpec, MotorType, PidConfig, PidController, SimBackend,
};

fn bench_mix(c: &mut Criterion) {
    c.bench_function("mix", |b| {
        b.iter(|| black_box(mix(black_box(0.7), black_box(-0.4), black_box(0.8))))
    });
    c.bench_function("curvature_mix", |b| {
        b.iter(|| {
            black_box(curvature_mix(
                black_box(0.7),
                black_box(-0.4),
                black_box(false),
                black_box(0.8),
            ))
        })
    });
}

/// Full command: validation, mixing and fan-out to every motor
fn bench_drive_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("Drive fan-out");

    for per_side in [1i32, 2, 3].iter() {
        group.bench_with_input(
            BenchmarkId::new("motors per side", per_side),
            per_side,
            |b, &n| {
                let left = (0..n)
                    .map(|i| MotorSpec::new(MotorType::TalonSrx, 1 + i))
                    .collect();
                let right = (0..n)
                    .map(|i| MotorSpec::new(MotorType::SparkMax, 11 + i))
                    .collect();
                let sim = SimBackend::new();
                let mut drive = Drive::new(
                    &DriveConfig::new(left, right).with_max_power(0.8),
                    &sim,
                    &Logger::quiet("bench"),
                )
                .expect("drive config is valid");

                let mut t = 0.0f64;
                b.iter(|| {
                    t += 0.01;
                    black_box(drive.drive(t.sin(), (t * 0.5).cos() * 0.3))
                })
            },
        );
    }

    group.finish();
}

fn bench_pid(c: &mut Criterion) {
    c.bench_function("PID heading loop", |b| {
        let config = PidConfig::new(0.02, 0.001, 0.002)
            .continuous(-180.0, 180.0)
            .with_integral_range(10.0);
        let mut pid =
            PidController::new(config, &Logger::quiet("bench")).expect("pid config is valid");
        pid.set_setpoint(90.0);
        let mut heading = -170.0f64;

        b.iter(|| {
            let out = pid.calculate(black_box(heading));
            heading += out;
            black_box(out)
        })
    });
}

criterion_group!(benches, bench_mix, bench_drive_fanout, bench_pid);
criterion_main!(benches);
