// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Combine-operation behavior of full generation jobs

use anyhow::Result;
use approx::assert_relative_eq;
use serde_json::json;
use shapeforge::kernel::{FaultyKernel, KernelOp, MeshKernel};
use shapeforge::{Engine, EngineConfig, InstructionDocument, WarningKind};

fn document(value: serde_json::Value) -> Result<InstructionDocument> {
    Ok(InstructionDocument::from_value(value)?)
}

#[test]
fn test_plate_with_drilled_holes() -> Result<()> {
    let doc = document(json!({"detail": 0, "shapes": [
        {"type": "box", "width": 40, "length": 20, "height": 5},
        {"type": "cylinder", "radius": 3, "height": 7, "position": [-10, 0, -1], "operation": "difference"},
        {"type": "cylinder", "radius": 3, "height": 7, "position": [10, 0, -1], "operation": "difference"}
    ]}))?;

    let generation = Engine::default().generate(&doc)?;

    assert!(generation.warnings().is_empty(), "{:?}", generation.warnings());
    assert_eq!(generation.assembly.body_count(), 1);
    // 24-gon holes at detail 0
    let hole = 0.5 * 24.0 * 9.0 * (std::f64::consts::TAU / 24.0).sin() * 5.0;
    assert_relative_eq!(
        generation.report.total_volume,
        40.0 * 20.0 * 5.0 - 2.0 * hole,
        max_relative = 1e-6
    );
    let bbox = generation.assembly.bounding_box();
    assert_relative_eq!(bbox.min.z, 0.0, epsilon = 1e-9);
    assert_relative_eq!(bbox.max.z, 5.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_first_shape_difference_is_treated_as_base() -> Result<()> {
    let doc = document(json!({"shapes": [
        {"type": "box", "width": 10, "length": 10, "height": 10, "operation": "difference"},
        {"type": "box", "width": 2, "length": 2, "height": 2, "position": [30, 0]}
    ]}))?;

    let generation = Engine::default().generate(&doc)?;

    let warnings = generation.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::BaseOperationIgnored);
    assert_eq!(warnings[0].shape_index, 0);
    assert_eq!(generation.assembly.body_count(), 2);
    assert_relative_eq!(generation.report.total_volume, 1008.0, max_relative = 1e-9);
    Ok(())
}

#[test]
fn test_explicit_concatenate_on_first_shape_is_silent() -> Result<()> {
    let doc = document(json!({"shapes": [
        {"type": "cylinder", "radius": 1, "height": 1, "operation": "concatenate"}
    ]}))?;
    let generation = Engine::default().generate(&doc)?;
    assert!(generation.warnings().is_empty());
    Ok(())
}

#[test]
fn test_boolean_failure_keeps_every_operand() -> Result<()> {
    let doc = document(json!({"shapes": [
        {"type": "box", "width": 10, "length": 10, "height": 10},
        {"type": "cylinder", "radius": 2, "height": 10, "operation": "difference"},
        {"type": "box", "width": 4, "length": 4, "height": 4, "position": [4, 0], "operation": "union"}
    ]}))?;
    let mut kernel = FaultyKernel::new(MeshKernel::default()).fail_on(KernelOp::Boolean);

    let generation = Engine::default().generate_with_kernel(&mut kernel, &doc)?;

    assert_eq!(generation.assembly.body_count(), 3);
    let fallbacks: Vec<_> = generation
        .warnings()
        .iter()
        .map(|w| (w.shape_index, w.kind))
        .collect();
    assert_eq!(
        fallbacks,
        vec![(1, WarningKind::BooleanFallback), (2, WarningKind::BooleanFallback)]
    );
    assert!(generation.warnings()[0].message.contains("difference"));
    assert!(generation.warnings()[1].message.contains("union"));
    assert_eq!(kernel.call_count(KernelOp::Boolean), 2);
    Ok(())
}

#[test]
fn test_too_complex_boolean_falls_back() -> Result<()> {
    let engine = Engine::new(EngineConfig {
        boolean_polygon_limit: 50,
        ..EngineConfig::default()
    });
    let doc = document(json!({"shapes": [
        {"type": "cylinder", "radius": 5, "height": 5},
        {"type": "cylinder", "radius": 5, "height": 5, "position": [3, 0], "operation": "union"}
    ]}))?;

    let generation = engine.generate(&doc)?;

    assert_eq!(generation.assembly.body_count(), 2);
    assert_eq!(generation.warnings()[0].kind, WarningKind::BooleanFallback);
    assert!(generation.warnings()[0].message.contains("too complex"));
    Ok(())
}

#[test]
fn test_intersection_of_overlapping_blocks() -> Result<()> {
    let doc = document(json!({"shapes": [
        {"type": "box", "width": 4, "length": 4, "height": 4},
        {"type": "box", "width": 4, "length": 4, "height": 4, "position": [2, 2, 2],
         "operation": "intersection"}
    ]}))?;

    let generation = Engine::default().generate(&doc)?;

    assert_eq!(generation.assembly.body_count(), 1);
    assert_relative_eq!(generation.report.total_volume, 8.0, max_relative = 1e-6);
    Ok(())
}
