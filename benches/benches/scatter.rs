// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use kurbo::Point;
use understory_scatter::{
    AttributeUpdate, AttributeValue, Axis, MarkerImage, MarkerRasterizer, PixelScale,
    RasterError, RasterRequest, ScatterItem, SpotBatch, SpotDescriptor, Values,
};

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn next_f64(&mut self, scale: f64) -> f64 {
        f64::from(self.next_u32()) / f64::from(u32::MAX) * scale
    }
}

struct Blank;

impl MarkerRasterizer for Blank {
    fn rasterize(&mut self, req: &RasterRequest<'_>) -> Result<MarkerImage, RasterError> {
        Ok(MarkerImage::transparent(req.width, req.height))
    }
}

const SYMBOLS: [&str; 4] = ["o", "s", "t", "d"];

fn spots(n: usize, seed: u64) -> Vec<SpotDescriptor> {
    let mut rng = Lcg::new(seed);
    (0..n)
        .map(|i| {
            SpotDescriptor::at((rng.next_f64(1000.0), rng.next_f64(1000.0)))
                .size(4.0 + (i % 5) as f64)
                .symbol(SYMBOLS[i % SYMBOLS.len()])
        })
        .collect()
}

fn xy(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = Lcg::new(seed);
    (0..n)
        .map(|_| (rng.next_f64(1000.0), rng.next_f64(1000.0)))
        .unzip()
}

fn populated(n: usize, px_mode: bool) -> ScatterItem {
    let mut item = ScatterItem::new(Blank);
    item.set_px_mode(px_mode);
    let (x, y) = xy(n, 0x5CA7_0000_0000_0001);
    item.replace_all(SpotBatch::from_xy(x, y))
        .expect("valid batch");
    item.ensure_up_to_date().expect("blank rasterizer never fails");
    item
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_scatter/ingest");
    group.sample_size(30);

    for &n in &[1_000_usize, 10_000, 100_000] {
        group.bench_function(format!("replace_xy(n={n})"), |b| {
            b.iter_batched(
                || xy(n, 1),
                |(x, y)| {
                    let mut item: ScatterItem = ScatterItem::new(Blank);
                    item.replace_all(SpotBatch::from_xy(x, y))
                        .expect("valid batch");
                    black_box(item);
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("replace_spots(n={n})"), |b| {
            b.iter_batched(
                || spots(n, 2),
                |descs| {
                    let mut item: ScatterItem = ScatterItem::new(Blank);
                    item.replace_all(SpotBatch::from_spots(descs))
                        .expect("valid batch");
                    black_box(item);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_scatter/refresh");
    group.sample_size(30);

    for &n in &[1_000_usize, 10_000] {
        group.bench_function(format!("first_pass_px(n={n})"), |b| {
            b.iter_batched(
                || {
                    let mut item = ScatterItem::new(Blank);
                    item.replace_all(SpotBatch::from_spots(spots(n, 3)))
                        .expect("valid batch");
                    item
                },
                |mut item| black_box(item.ensure_up_to_date().expect("refresh")),
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("first_pass_identical(n={n})"), |b| {
            b.iter_batched(
                || {
                    let mut item: ScatterItem = ScatterItem::new(Blank);
                    item.set_identical(true);
                    let (x, y) = xy(n, 4);
                    item.replace_all(SpotBatch::from_xy(x, y))
                        .expect("valid batch");
                    item
                },
                |mut item| black_box(item.ensure_up_to_date().expect("refresh")),
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("default_size_change(n={n})"), |b| {
            b.iter_batched(
                || populated(n, false),
                |mut item| {
                    item.set_default(AttributeValue::Size(9.0))
                        .expect("valid size");
                    black_box(item.ensure_up_to_date().expect("refresh"));
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("override_sizes(n={n})"), |b| {
            let sizes: Vec<f64> = (0..n).map(|i| 3.0 + (i % 7) as f64).collect();
            b.iter_batched(
                || (populated(n, true), sizes.clone()),
                |(mut item, sizes)| {
                    item.set_override(AttributeUpdate::Size(Values::Each(sizes)))
                        .expect("matching length");
                    black_box(item.ensure_up_to_date().expect("refresh"));
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_scatter/queries");
    group.sample_size(50);

    for &n in &[1_000_usize, 10_000, 100_000] {
        let mut item = populated(n, true);
        let scale = PixelScale::new(0.5, 0.5);

        group.bench_function(format!("points_at(n={n})"), |b| {
            let mut rng = Lcg::new(5);
            b.iter(|| {
                let pos = Point::new(rng.next_f64(1000.0), rng.next_f64(1000.0));
                black_box(item.points_at(pos, scale).expect("up to date"));
            });
        });

        group.bench_function(format!("data_bounds_exact_cached(n={n})"), |b| {
            b.iter(|| black_box(item.data_bounds(Axis::X, 1.0, None).expect("valid frac")));
        });

        group.bench_function(format!("data_bounds_percentile(n={n})"), |b| {
            b.iter(|| black_box(item.data_bounds(Axis::Y, 0.95, None).expect("valid frac")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ingest, bench_refresh, bench_queries);
criterion_main!(benches);
