// -------------------------------------------------------------------------
// SCPN Vlasov Core -- Source Map Benchmark
// Compares stencil application cost for the rotation and kick maps and
// the wake convolution at 128x128 and 256x256 grids.
// -------------------------------------------------------------------------

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::f64::consts::PI;
use std::hint::black_box;
use vlasov_core::impedance::Impedance;
use vlasov_core::kick::RfKickMap;
use vlasov_core::mesh::{BunchScalars, PhaseSpace};
use vlasov_core::rotation::{RotationCoordinates, RotationMap};
use vlasov_core::ElectricField;

fn make_mesh(n: usize) -> PhaseSpace {
    let mut ps = PhaseSpace::new(
        n,
        -5.0,
        5.0,
        -5.0,
        5.0,
        BunchScalars {
            charge: 3.7e-10,
            current: 1e-3,
            length: 1e-3,
            energy_spread: 6.11e5,
        },
    );
    ps.update_x_projection();
    ps
}

fn bench_rotation_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("rotation_apply");
    for &n in &[128usize, 256usize] {
        let mut src = make_mesh(n);
        let mut dst = src.clone_layout();
        let map = RotationMap::new(
            &src,
            2.0 * PI / 1000.0,
            RotationCoordinates::NormPm1,
            4,
            true,
            None,
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                map.apply(None, &mut src, &mut dst).unwrap();
                black_box(dst.get(n / 2, n / 2));
            })
        });
    }
    group.finish();
}

fn bench_kick_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("rf_kick_apply");
    for &n in &[128usize, 256usize] {
        let mut src = make_mesh(n);
        let mut dst = src.clone_layout();
        let angle = 2.0 * PI / 1000.0;
        let map = RfKickMap::new(&src, angle, 1.0 / angle, 4, true, None).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                map.apply(None, &mut src, &mut dst).unwrap();
                black_box(dst.get(n / 2, n / 2));
            })
        });
    }
    group.finish();
}

fn bench_wake_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("wake_update");
    for &n in &[128usize, 256usize] {
        let mesh = make_mesh(n);
        let f_max = n as f64 * 299_792_458.0 / (2.0 * 5.0 * 1e-3);
        let imp = Impedance::free_space_csr(n * 2, 8.58e6, f_max);
        let mut field = ElectricField::new(&mesh, imp, 2, 1e-3, 1e-3, 6.11e5).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                field.update_wake(&mesh).unwrap();
                black_box(field.wake_potential()[0]);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rotation_apply, bench_kick_apply, bench_wake_update);
criterion_main!(benches);
