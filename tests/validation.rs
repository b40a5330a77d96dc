// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Instruction validation through the public API

use anyhow::Result;
use serde_json::{json, Value};
use shapeforge::instructions::{CombineOp, ShapeGeometry};
use shapeforge::{validate, InstructionDocument, ValidationReason};

fn reason_for(shapes: Value) -> (Option<usize>, ValidationReason) {
    let doc = InstructionDocument::from_value(json!({ "shapes": shapes })).unwrap();
    let err = validate(&doc).unwrap_err();
    (err.shape_index, err.reason)
}

#[test]
fn test_validate_is_idempotent_and_pure() -> Result<()> {
    let doc = InstructionDocument::from_value(json!({
        "extrude_height": 5,
        "shapes": [
            {"type": "box", "width": 2, "length": 3},
            {"type": "polygon", "vertices": [[0, 0], [4, 0], [4, 3], [0, 0]], "operation": "union"},
            {"type": "revolve", "profile": [[1, 0], [2, 0], [2, 4]], "angle_deg": 120}
        ]
    }))?;
    let before = doc.clone();

    let first = validate(&doc)?;
    let second = validate(&doc)?;

    assert_eq!(first, second);
    assert_eq!(doc, before);
    Ok(())
}

#[test]
fn test_first_violation_wins() {
    let shapes = json!([
        {"type": "box", "width": 1, "length": 1, "height": 1},
        {"type": "cylinder", "radius": 0, "height": 1},
        {"type": "torus"}
    ]);
    assert_eq!(
        reason_for(shapes),
        (Some(1), ValidationReason::NonPositiveDimension)
    );
}

#[test]
fn test_reason_codes() {
    assert_eq!(
        reason_for(json!([{"type": "cylinder", "height": 2}])),
        (Some(0), ValidationReason::MissingField)
    );
    assert_eq!(
        reason_for(json!([{"type": "box", "width": "wide", "length": 1, "height": 1}])),
        (Some(0), ValidationReason::InvalidField)
    );
    assert_eq!(
        reason_for(json!([{"type": "polygon", "vertices": [[0, 0], [1, 1]], "height": 1}])),
        (Some(0), ValidationReason::DegenerateProfile)
    );
    assert_eq!(
        reason_for(json!([{"type": "box", "width": 1, "length": 1, "height": 1, "operation": "xor"}])),
        (Some(0), ValidationReason::UnknownOperation)
    );
    assert_eq!(
        reason_for(json!([{"type": "sweep", "profile": [[0, 0], [1, 1]], "path": [[0, 0, 0], [0, 0, 0]]}])),
        (Some(0), ValidationReason::DegenerateProfile)
    );
}

#[test]
fn test_document_level_failures() {
    let empty = InstructionDocument::from_value(json!({"shapes": []})).unwrap();
    let err = validate(&empty).unwrap_err();
    assert_eq!(err.reason, ValidationReason::EmptyDocument);
    assert_eq!(err.shape_index, None);

    let err = InstructionDocument::from_json(r#"{"shapes": 3}"#).unwrap_err();
    assert_eq!(err.reason, ValidationReason::MalformedDocument);
}

#[test]
fn test_normalization() -> Result<()> {
    let doc = InstructionDocument::from_value(json!({"shapes": [
        {"type": "polygon", "vertices": [[0, 0], [4, 0], [4, 3], [0, 0]], "height": 2},
        {"type": "sweep", "profile": [[-1, -1], [1, 1]], "path": [[0, 0], [10, 0]],
         "operation": "difference"}
    ]}))?;

    let validated = validate(&doc)?;

    match &validated.shapes[0].geometry {
        ShapeGeometry::Polygon { vertices, .. } => assert_eq!(vertices.len(), 3),
        other => panic!("expected polygon, got {other:?}"),
    }
    match &validated.shapes[1].geometry {
        ShapeGeometry::Sweep { path, section } => {
            assert!(path.iter().all(|p| p.z == 0.0));
            assert_eq!(section.len(), 4);
        }
        other => panic!("expected sweep, got {other:?}"),
    }
    assert!(!validated.shapes[0].operation_declared);
    assert_eq!(validated.shapes[0].operation, CombineOp::Concatenate);
    assert_eq!(validated.shapes[1].operation, CombineOp::Difference);
    Ok(())
}
