//! Criterion benchmarks for the per-frame work.
//!
//! Benchmarks:
//!   - marker recompute for 10k records
//!   - full layer render of a synthetic world at two zoom levels
//!   - pointer hit test
//!
//! Run with: cargo bench --bench hot_paths

use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::DVec2;

use quakemap::data::{BoundaryFeature, EarthquakeRecord, GeometryKind};
use quakemap::map::{HoverState, MapRenderer, Viewport, ZoomTransform};

/// A 36x17 grid of 10° land squares with a few records on each
fn synthetic_world() -> (Vec<BoundaryFeature>, Vec<EarthquakeRecord>) {
    let mut features = Vec::new();
    let mut records = Vec::new();

    for i in 0..36 {
        for j in 0..17 {
            let lon = -180.0 + i as f64 * 10.0;
            let lat = -85.0 + j as f64 * 10.0;
            let ring = vec![
                DVec2::new(lon + 1.0, lat + 1.0),
                DVec2::new(lon + 9.0, lat + 1.0),
                DVec2::new(lon + 9.0, lat + 9.0),
                DVec2::new(lon + 1.0, lat + 9.0),
                DVec2::new(lon + 1.0, lat + 1.0),
            ];
            features.push(BoundaryFeature {
                name: format!("cell {i},{j}"),
                kind: GeometryKind::Polygon,
                polygons: vec![vec![ring]],
                lines: Vec::new(),
                points: Vec::new(),
            });

            for k in 0..16 {
                let longitude = lon + (k % 4) as f64 * 2.5;
                let latitude = lat + (k / 4) as f64 * 2.5;
                records.push(EarthquakeRecord {
                    longitude,
                    latitude,
                    magnitude: 6.5 + (k as f64) * 0.2,
                    location: String::new(),
                    date_time: String::new(),
                    tsunami: "0".into(),
                    mag_type: "mww".into(),
                    depth: "10".into(),
                    longitude_text: longitude.to_string(),
                    latitude_text: latitude.to_string(),
                });
            }
        }
    }

    (features, records)
}

fn bench_markers(c: &mut Criterion) {
    let (features, records) = synthetic_world();
    let renderer = MapRenderer::new(&features, records);
    let hover = HoverState::default();
    let now = Instant::now();

    let mut group = c.benchmark_group("markers");
    group.bench_function("recompute_10k", |b| {
        b.iter(|| black_box(renderer.markers(black_box(6.0), &hover, now)));
    });

    let vp = Viewport::world(400, 200);
    group.bench_function("hit_test", |b| {
        b.iter(|| black_box(renderer.marker_at(&vp, black_box(DVec2::new(200.0, 100.0)), &hover, now)));
    });
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let (features, records) = synthetic_world();
    let renderer = MapRenderer::new(&features, records);
    let hover = HoverState::default();
    let now = Instant::now();

    let mut group = c.benchmark_group("render");

    let world = Viewport::world(400, 200);
    group.bench_function("world_200x50", |b| {
        b.iter(|| black_box(renderer.render(200, 50, &world, &hover, now)));
    });

    let zoomed = Viewport::new(
        ZoomTransform::IDENTITY.scale_to(8.0, DVec2::new(1000.0, 500.0)),
        400,
        200,
    );
    group.bench_function("zoom8_200x50", |b| {
        b.iter(|| black_box(renderer.render(200, 50, &zoomed, &hover, now)));
    });

    group.finish();
}

criterion_group!(benches, bench_markers, bench_render);
criterion_main!(benches);
