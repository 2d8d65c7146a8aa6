use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use omni_bridge::velocity::VelocityFilter;
use omni_common::consts::DEVICE_SAMPLE_PERIOD_S;
use omni_common::regions::{OmniState, ShmVector3d};

fn bench_velocity_filter(c: &mut Criterion) {
    let filter = VelocityFilter::for_period(DEVICE_SAMPLE_PERIOD_S).unwrap();

    c.bench_function("velocity_filter_update", |b| {
        let mut state = OmniState::default();
        let mut t = 0.0f64;
        b.iter(|| {
            t += DEVICE_SAMPLE_PERIOD_S;
            let p = ShmVector3d::from_array([100.0 * t, (2.0 * t).sin(), -50.0 * t]);
            filter.update(black_box(&mut state), black_box(p));
        });
    });
}

criterion_group!(benches, bench_velocity_filter);
criterion_main!(benches);
