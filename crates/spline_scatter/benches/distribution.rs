mod common;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Affine3A, Vec3};
use spline_scatter::curve::Polyline;
use spline_scatter::distribution::{
    distribute, Accuracy, DistributionMode, DistributionSettings, InsideAreaDistribution,
    OnCurveDistribution, RadialDistribution,
};
use spline_scatter::placeable::{DescriptorTable, Placeable};

const SPACINGS: [f32; 4] = [4.0, 2.0, 1.0, 0.5];

fn table() -> DescriptorTable {
    let placeables = [
        Placeable::new("a").with_probability(60.0),
        Placeable::new("b").with_probability(30.0),
        Placeable::new("c").with_probability(10.0),
    ];
    DescriptorTable::build(&placeables).expect("placeables without masks")
}

fn bench_mode(c: &mut Criterion, group_name: &str, make: impl Fn(f32) -> DistributionMode) {
    let curve = Polyline::circle(Vec3::ZERO, 64.0, 128);
    let table = table();
    let mut group = c.benchmark_group(group_name);

    for &spacing in &SPACINGS {
        let settings = DistributionSettings::new(make(spacing));
        let expected = distribute(&curve, Affine3A::IDENTITY, &settings, &table, 1).len();
        group.throughput(common::elements_throughput(expected));

        group.bench_with_input(BenchmarkId::from_parameter(spacing), &spacing, |b, _| {
            b.iter(|| {
                let buffer = distribute(&curve, Affine3A::IDENTITY, &settings, &table, 1);
                black_box(buffer.len());
            });
        });
    }

    group.finish();
}

fn distribution_on_curve_benches(c: &mut Criterion) {
    bench_mode(c, "distribution/on_curve", |s| {
        DistributionMode::OnCurve(OnCurveDistribution::new(s).with_jitter(0.5))
    });
}

fn distribution_inside_area_benches(c: &mut Criterion) {
    bench_mode(c, "distribution/inside_area", |s| {
        DistributionMode::InsideArea(InsideAreaDistribution::new(s, 1.0))
    });
}

fn distribution_radial_benches(c: &mut Criterion) {
    for accuracy in [Accuracy::BestPerformance, Accuracy::Balanced, Accuracy::HighestAccuracy] {
        bench_mode(c, &format!("distribution/radial/{accuracy:?}"), move |s| {
            DistributionMode::Radial(RadialDistribution::new(0.0, s, s).with_accuracy(accuracy))
        });
    }
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = distribution_on_curve_benches, distribution_inside_area_benches, distribution_radial_benches
}
criterion_main!(benches);
