use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hillmap::crs::SpatialReference;
use hillmap::raster::Raster;
use hillmap::testing::utm_dem;
use hillmap::transform::convert::stretch_to_u8;
use hillmap::transform::downsample::downsample_raster;
use hillmap::transform::reproject::reproject_raster;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A 30 m UTM raster of the given size with random elevations.
fn noisy_dem(size: usize) -> Raster {
    let mut rng = StdRng::seed_from_u64(42);
    let mut raster = utm_dem(size, size);
    for value in raster.band_mut(0) {
        *value = rng.random_range(1000.0..3000.0);
    }
    raster
}

fn benchmark_downsample(c: &mut Criterion) {
    let dem = noisy_dem(2000);

    c.bench_function("downsample_4", |b| {
        b.iter(|| downsample_raster(black_box(&dem), black_box(4)))
    });
}

fn benchmark_reproject(c: &mut Criterion) {
    let dem = noisy_dem(500);
    let target = SpatialReference::from_epsg(4326).unwrap();

    c.bench_function("reproject_utm_to_geographic", |b| {
        b.iter(|| reproject_raster(black_box(&dem), black_box(&target)))
    });
}

fn benchmark_stretch(c: &mut Criterion) {
    let dem = noisy_dem(2000);

    c.bench_function("stretch_to_u8", |b| {
        b.iter(|| stretch_to_u8(black_box(&dem)))
    });
}

fn criterion_config() -> Criterion {
    Criterion::default().sample_size(10)
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = benchmark_downsample, benchmark_reproject, benchmark_stretch
}

criterion_main!(benches);
