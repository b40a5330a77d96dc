// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use shapeforge::geometry::{csg_difference, helical_sweep, prism, CsgOptions, Helix, Profile, ToothProfile};
use shapeforge::instructions::{validate, InstructionDocument};
use shapeforge::Engine;

fn bracket_document(detail: f64) -> InstructionDocument {
    InstructionDocument::from_value(json!({
        "detail": detail,
        "shapes": [
            {"type": "box", "width": 60, "length": 30, "height": 8, "fillet": 3},
            {"type": "cylinder", "radius": 4, "height": 8, "position": [-20, 0], "operation": "difference"},
            {"type": "cylinder", "radius": 4, "height": 8, "position": [20, 0], "operation": "difference"},
            {"type": "tapered_cylinder", "bottom_radius": 10, "top_radius": 6, "height": 20,
             "hollow": true, "wall_thickness": 1.5, "position": [0, 0, 8]}
        ]
    }))
    .unwrap()
}

fn bench_validate(c: &mut Criterion) {
    let document = bracket_document(50.0);
    c.bench_function("validate/bracket", |b| {
        b.iter(|| validate(black_box(&document)).unwrap())
    });
}

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");

    for segments in [16u32, 64, 160] {
        let profile = Profile::circle(10.0, segments);
        group.bench_with_input(BenchmarkId::new("cylinder", segments), &profile, |b, profile| {
            b.iter(|| prism(black_box(profile), 20.0).unwrap())
        });
    }

    let helix = Helix {
        major_radius: 3.0,
        pitch: 1.0,
        turns: 10.0,
        length: 10.0,
        segments_per_turn: 72,
    };
    group.bench_function("thread_m6_10_turns", |b| {
        b.iter(|| helical_sweep(&ToothProfile::iso(1.0), black_box(&helix)).unwrap())
    });

    group.finish();
}

fn bench_boolean_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("boolean");
    let options = CsgOptions::default();

    let block = prism(&Profile::rectangle(20.0, 20.0), 10.0).unwrap();
    let drill = prism(&Profile::circle(4.0, 32), 10.0).unwrap();

    group.bench_function("difference_drilled_block", |b| {
        b.iter(|| csg_difference(black_box(&block), black_box(&drill), &options).unwrap())
    });

    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    let engine = Engine::default();

    for detail in [0.0, 50.0, 100.0] {
        let document = bracket_document(detail);
        group.bench_with_input(
            BenchmarkId::new("bracket", detail as u32),
            &document,
            |b, document| b.iter(|| engine.generate(black_box(document)).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_validate,
    bench_primitives,
    bench_boolean_ops,
    bench_generate
);
criterion_main!(benches);
