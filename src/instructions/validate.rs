// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Instruction schema validation.
//!
//! Validation is all-or-nothing: the first violation, in document order,
//! rejects the whole document before any geometry is built.

use super::document::RawShape;
use super::{
    close_to_axis, CombineOp, InstructionDocument, Position, ShapeGeometry, ShapeKind, ShapeSpec,
    ValidatedDocument,
};
use crate::geometry::Profile;
use nalgebra::{Point2, Point3};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Machine-readable cause of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationReason {
    EmptyDocument,
    MalformedDocument,
    UnknownShapeType,
    MissingField,
    InvalidField,
    NonPositiveDimension,
    OutOfRange,
    DegenerateProfile,
    UnknownOperation,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationReason::EmptyDocument => "EmptyDocument",
            ValidationReason::MalformedDocument => "MalformedDocument",
            ValidationReason::UnknownShapeType => "UnknownShapeType",
            ValidationReason::MissingField => "MissingField",
            ValidationReason::InvalidField => "InvalidField",
            ValidationReason::NonPositiveDimension => "NonPositiveDimension",
            ValidationReason::OutOfRange => "OutOfRange",
            ValidationReason::DegenerateProfile => "DegenerateProfile",
            ValidationReason::UnknownOperation => "UnknownOperation",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal rejection of an instruction document
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{reason} at {}: {message}", .shape_index.map_or_else(|| "document".to_string(), |i| format!("shape {i}")))]
pub struct ValidationError {
    /// `None` for document-level problems
    pub shape_index: Option<usize>,
    pub reason: ValidationReason,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        shape_index: Option<usize>,
        reason: ValidationReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            shape_index,
            reason,
            message: message.into(),
        }
    }
}

type Result<T> = std::result::Result<T, ValidationError>;

/// Cosine below which consecutive path segments count as a reversal
const PATH_REVERSAL_COS: f64 = -0.999;

/// Validate a document and produce its typed form.
///
/// Pure: the document is not modified, so validating twice gives the same
/// answer.
pub fn validate(document: &InstructionDocument) -> Result<ValidatedDocument> {
    if document.shapes.is_empty() {
        return Err(ValidationError::new(
            None,
            ValidationReason::EmptyDocument,
            "document has no shapes",
        ));
    }

    let extrude_height = document_dimension("extrude_height", document.extrude_height)?;
    let wall_thickness = document_dimension("wall_thickness", document.wall_thickness)?;
    if let Some(detail) = document.detail {
        if !detail.is_finite() {
            return Err(ValidationError::new(
                None,
                ValidationReason::InvalidField,
                "detail must be a finite number",
            ));
        }
    }

    let shapes = document
        .shapes
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let raw = value.as_object().ok_or_else(|| {
                ValidationError::new(
                    Some(index),
                    ValidationReason::InvalidField,
                    "shape must be a JSON object",
                )
            })?;
            let fields = Fields { index, raw };
            fields.shape(extrude_height, wall_thickness)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ValidatedDocument {
        shapes,
        detail: document.detail,
        extrude_height,
        wall_thickness,
    })
}

fn document_dimension(name: &str, value: Option<f64>) -> Result<Option<f64>> {
    match value {
        Some(v) if !(v > 0.0 && v.is_finite()) => Err(ValidationError::new(
            None,
            ValidationReason::NonPositiveDimension,
            format!("{name} must be > 0, got {v}"),
        )),
        other => Ok(other),
    }
}

/// Field accessors for one raw shape, attributing errors to its index
struct Fields<'a> {
    index: usize,
    raw: &'a RawShape,
}

impl Fields<'_> {
    fn error(&self, reason: ValidationReason, message: impl Into<String>) -> ValidationError {
        ValidationError::new(Some(self.index), reason, message)
    }

    fn shape(&self, default_height: Option<f64>, default_wall: Option<f64>) -> Result<ShapeSpec> {
        let kind = self.kind()?;
        let geometry = self.geometry(kind, default_height)?;

        let hollow = self.boolean("hollow")?.unwrap_or(false);
        let wall_thickness = match self.number("wall_thickness")? {
            Some(t) => Some(self.positive_value("wall_thickness", t)?),
            None => default_wall,
        };
        let fillet = match self.number("fillet")? {
            Some(f) if f < 0.0 => {
                return Err(self.error(
                    ValidationReason::OutOfRange,
                    format!("fillet must be >= 0, got {f}"),
                ))
            }
            Some(f) => f,
            None => 0.0,
        };
        let position = self.position()?;
        let rotate_deg = self.number("rotate_deg")?.unwrap_or(0.0);
        let (operation, operation_declared) = self.operation()?;

        Ok(ShapeSpec {
            index: self.index,
            geometry,
            hollow,
            wall_thickness,
            fillet,
            position,
            rotate_deg,
            operation,
            operation_declared,
        })
    }

    fn kind(&self) -> Result<ShapeKind> {
        match self.raw.get("type") {
            None | Some(Value::Null) => {
                Err(self.error(ValidationReason::MissingField, "missing field 'type'"))
            }
            Some(Value::String(name)) => ShapeKind::from_str(name).ok_or_else(|| {
                self.error(
                    ValidationReason::UnknownShapeType,
                    format!("unknown shape type '{name}'"),
                )
            }),
            Some(other) => Err(self.error(
                ValidationReason::InvalidField,
                format!("'type' must be a string, got {other}"),
            )),
        }
    }

    fn geometry(&self, kind: ShapeKind, default_height: Option<f64>) -> Result<ShapeGeometry> {
        let height = || self.positive_or("height", default_height);

        Ok(match kind {
            ShapeKind::Box => ShapeGeometry::Box {
                width: self.positive("width")?,
                length: self.positive("length")?,
                height: height()?,
            },
            ShapeKind::Cylinder => ShapeGeometry::Cylinder {
                radius: self.positive("radius")?,
                height: height()?,
            },
            ShapeKind::TaperedCylinder => ShapeGeometry::TaperedCylinder {
                bottom_radius: self.positive("bottom_radius")?,
                top_radius: self.positive("top_radius")?,
                height: height()?,
            },
            ShapeKind::Polygon => {
                let vertices = self.outline("vertices")?;
                ShapeGeometry::Polygon {
                    vertices,
                    height: height()?,
                }
            }
            ShapeKind::Thread => ShapeGeometry::Thread {
                major_radius: self.positive("major_radius")?,
                pitch: self.positive("pitch")?,
                turns: self.positive("turns")?,
                length: self.positive("length")?,
            },
            ShapeKind::Revolve => self.revolve()?,
            ShapeKind::Sweep => self.sweep()?,
        })
    }

    fn revolve(&self) -> Result<ShapeGeometry> {
        let profile = self.points2("profile")?;
        if profile.len() < 2 {
            return Err(self.error(
                ValidationReason::DegenerateProfile,
                format!("revolve profile needs at least 2 points, got {}", profile.len()),
            ));
        }
        if let Some(p) = profile.iter().find(|p| p.x < 0.0) {
            return Err(self.error(
                ValidationReason::DegenerateProfile,
                format!("revolve profile crosses the axis at r = {}", p.x),
            ));
        }
        let outline = close_to_axis(&profile);
        Profile::polygon(outline).validate().map_err(|e| {
            self.error(ValidationReason::DegenerateProfile, format!("revolve profile: {e}"))
        })?;

        let angle_deg = self.positive("angle_deg")?;
        if angle_deg > 360.0 {
            return Err(self.error(
                ValidationReason::OutOfRange,
                format!("angle_deg must be <= 360, got {angle_deg}"),
            ));
        }
        Ok(ShapeGeometry::Revolve { profile, angle_deg })
    }

    fn sweep(&self) -> Result<ShapeGeometry> {
        let points = self.points2("profile")?;
        let section = match points.len() {
            2 => {
                let (a, b) = (points[0], points[1]);
                if (a.x - b.x).abs() <= f64::EPSILON || (a.y - b.y).abs() <= f64::EPSILON {
                    return Err(self.error(
                        ValidationReason::DegenerateProfile,
                        "sweep profile rectangle has zero width or length",
                    ));
                }
                let (lo, hi) = (a.inf(&b), a.sup(&b));
                Profile::polygon(vec![
                    lo,
                    Point2::new(hi.x, lo.y),
                    hi,
                    Point2::new(lo.x, hi.y),
                ])
            }
            _ => Profile::polygon(self.closed_points(points, "profile")?),
        };

        let path = self.path("path")?;
        Ok(ShapeGeometry::Sweep { section, path })
    }

    fn path(&self, key: &str) -> Result<Vec<Point3<f64>>> {
        let values = self.array(key)?;
        let path = values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let coords = self.coordinates(key, i, value)?;
                match coords.as_slice() {
                    [x, y] => Ok(Point3::new(*x, *y, 0.0)),
                    [x, y, z] => Ok(Point3::new(*x, *y, *z)),
                    _ => Err(self.error(
                        ValidationReason::InvalidField,
                        format!("{key}[{i}] must have 2 or 3 coordinates"),
                    )),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        if path.len() < 2 {
            return Err(self.error(
                ValidationReason::DegenerateProfile,
                format!("{key} needs at least 2 points, got {}", path.len()),
            ));
        }

        let mut previous_direction = None;
        for (i, pair) in path.windows(2).enumerate() {
            let segment = pair[1] - pair[0];
            if segment.norm() < 1e-9 {
                return Err(self.error(
                    ValidationReason::DegenerateProfile,
                    format!("{key} points {i} and {} coincide", i + 1),
                ));
            }
            let direction = segment.normalize();
            if let Some(prev) = previous_direction {
                if direction.dot(&prev) < PATH_REVERSAL_COS {
                    return Err(self.error(
                        ValidationReason::DegenerateProfile,
                        format!("{key} doubles back at point {i}"),
                    ));
                }
            }
            previous_direction = Some(direction);
        }
        Ok(path)
    }

    /// Closed outline of at least 3 points with the repeated closing vertex
    /// dropped; must be simple with non-zero area
    fn outline(&self, key: &str) -> Result<Vec<Point2<f64>>> {
        let points = self.points2(key)?;
        self.closed_points(points, key)
    }

    fn closed_points(&self, mut points: Vec<Point2<f64>>, key: &str) -> Result<Vec<Point2<f64>>> {
        if points.len() > 3 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return Err(self.error(
                ValidationReason::DegenerateProfile,
                format!("{key} needs at least 3 points, got {}", points.len()),
            ));
        }
        Profile::polygon(points.clone())
            .validate()
            .map_err(|e| self.error(ValidationReason::DegenerateProfile, format!("{key}: {e}")))?;
        Ok(points)
    }

    fn points2(&self, key: &str) -> Result<Vec<Point2<f64>>> {
        self.array(key)?
            .iter()
            .enumerate()
            .map(|(i, value)| match self.coordinates(key, i, value)?.as_slice() {
                [x, y] => Ok(Point2::new(*x, *y)),
                _ => Err(self.error(
                    ValidationReason::InvalidField,
                    format!("{key}[{i}] must have 2 coordinates"),
                )),
            })
            .collect()
    }

    fn array(&self, key: &str) -> Result<&Vec<Value>> {
        match self.raw.get(key) {
            None | Some(Value::Null) => Err(self.error(
                ValidationReason::MissingField,
                format!("missing field '{key}'"),
            )),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(self.error(
                ValidationReason::InvalidField,
                format!("'{key}' must be an array, got {other}"),
            )),
        }
    }

    fn coordinates(&self, key: &str, i: usize, value: &Value) -> Result<Vec<f64>> {
        let invalid = || {
            self.error(
                ValidationReason::InvalidField,
                format!("{key}[{i}] must be an array of numbers"),
            )
        };
        value
            .as_array()
            .ok_or_else(invalid)?
            .iter()
            .map(|c| c.as_f64().filter(|v| v.is_finite()).ok_or_else(invalid))
            .collect()
    }

    fn number(&self, key: &str) -> Result<Option<f64>> {
        match self.raw.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| {
                    self.error(
                        ValidationReason::InvalidField,
                        format!("'{key}' must be a number, got {value}"),
                    )
                }),
        }
    }

    fn boolean(&self, key: &str) -> Result<Option<bool>> {
        match self.raw.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.error(
                ValidationReason::InvalidField,
                format!("'{key}' must be a boolean, got {other}"),
            )),
        }
    }

    fn positive(&self, key: &str) -> Result<f64> {
        self.positive_or(key, None)
    }

    /// Required positive number, falling back to `default` when absent
    fn positive_or(&self, key: &str, default: Option<f64>) -> Result<f64> {
        let value = self.number(key)?.or(default).ok_or_else(|| {
            self.error(ValidationReason::MissingField, format!("missing field '{key}'"))
        })?;
        self.positive_value(key, value)
    }

    fn positive_value(&self, key: &str, value: f64) -> Result<f64> {
        if value > 0.0 {
            Ok(value)
        } else {
            Err(self.error(
                ValidationReason::NonPositiveDimension,
                format!("'{key}' must be > 0, got {value}"),
            ))
        }
    }

    fn position(&self) -> Result<Option<Position>> {
        let invalid = || {
            self.error(
                ValidationReason::InvalidField,
                "'position' must be [x, y] or [x, y, z]",
            )
        };
        match self.raw.get("position") {
            None | Some(Value::Null) => Ok(None),
            Some(value @ Value::Array(_)) => {
                let coords = self
                    .coordinates("position", 0, value)
                    .map_err(|_| invalid())?;
                match coords.as_slice() {
                    [x, y] => Ok(Some(Position {
                        x: *x,
                        y: *y,
                        z: None,
                    })),
                    [x, y, z] => Ok(Some(Position {
                        x: *x,
                        y: *y,
                        z: Some(*z),
                    })),
                    _ => Err(invalid()),
                }
            }
            Some(_) => Err(invalid()),
        }
    }

    fn operation(&self) -> Result<(CombineOp, bool)> {
        match self.raw.get("operation") {
            None | Some(Value::Null) => Ok((CombineOp::default(), false)),
            Some(Value::String(name)) => CombineOp::from_str(name)
                .map(|op| (op, true))
                .ok_or_else(|| {
                    self.error(
                        ValidationReason::UnknownOperation,
                        format!("unknown operation '{name}'"),
                    )
                }),
            Some(other) => Err(self.error(
                ValidationReason::InvalidField,
                format!("'operation' must be a string, got {other}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(shapes: Value) -> InstructionDocument {
        InstructionDocument::from_value(json!({ "shapes": shapes })).unwrap()
    }

    fn reason(document: &InstructionDocument) -> (Option<usize>, ValidationReason) {
        let err = validate(document).unwrap_err();
        (err.shape_index, err.reason)
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(reason(&doc(json!([]))), (None, ValidationReason::EmptyDocument));
    }

    #[test]
    fn test_unknown_type() {
        let d = doc(json!([{"type": "torus", "radius": 5}]));
        assert_eq!(reason(&d), (Some(0), ValidationReason::UnknownShapeType));
    }

    #[test]
    fn test_first_violation_wins() {
        let d = doc(json!([
            {"type": "box", "width": 1, "length": 1, "height": 1},
            {"type": "cylinder", "radius": -1, "height": 2},
            {"type": "torus"}
        ]));
        assert_eq!(reason(&d), (Some(1), ValidationReason::NonPositiveDimension));
    }

    #[test]
    fn test_missing_field() {
        let d = doc(json!([{"type": "box", "width": 1, "height": 1}]));
        let err = validate(&d).unwrap_err();
        assert_eq!(err.reason, ValidationReason::MissingField);
        assert!(err.message.contains("length"));
    }

    #[test]
    fn test_height_falls_back_to_document_default() {
        let d = InstructionDocument::from_value(json!({
            "shapes": [{"type": "cylinder", "radius": 2}],
            "extrude_height": 12.5,
            "wall_thickness": 1.5
        }))
        .unwrap();
        let validated = validate(&d).unwrap();
        assert_eq!(
            validated.shapes[0].geometry,
            ShapeGeometry::Cylinder {
                radius: 2.0,
                height: 12.5
            }
        );
        assert_eq!(validated.shapes[0].wall_thickness, Some(1.5));
    }

    #[test]
    fn test_bowtie_polygon_is_degenerate() {
        let d = doc(json!([{
            "type": "polygon",
            "vertices": [[0, 0], [2, 2], [2, 0], [0, 2]],
            "height": 1
        }]));
        assert_eq!(reason(&d), (Some(0), ValidationReason::DegenerateProfile));
    }

    #[test]
    fn test_closing_vertex_is_dropped() {
        let d = doc(json!([{
            "type": "polygon",
            "vertices": [[0, 0], [4, 0], [0, 3], [0, 0]],
            "height": 1
        }]));
        match &validate(&d).unwrap().shapes[0].geometry {
            ShapeGeometry::Polygon { vertices, .. } => assert_eq!(vertices.len(), 3),
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_revolve_angle_bounds() {
        let profile = json!([[10, 0], [10, 20]]);
        let zero = doc(json!([{"type": "revolve", "profile": profile, "angle_deg": 0}]));
        assert_eq!(reason(&zero).1, ValidationReason::NonPositiveDimension);

        let over = doc(json!([{"type": "revolve", "profile": profile, "angle_deg": 400}]));
        assert_eq!(reason(&over).1, ValidationReason::OutOfRange);

        let full = doc(json!([{"type": "revolve", "profile": profile, "angle_deg": 360}]));
        assert!(validate(&full).is_ok());
    }

    #[test]
    fn test_revolve_profile_on_axis_is_degenerate() {
        let d = doc(json!([{"type": "revolve", "profile": [[0, 0], [0, 10]], "angle_deg": 90}]));
        assert_eq!(reason(&d).1, ValidationReason::DegenerateProfile);
    }

    #[test]
    fn test_sweep_path_normalization() {
        let d = doc(json!([{
            "type": "sweep",
            "profile": [[-1, -1], [1, 1]],
            "path": [[0, 0], [10, 0, 5]]
        }]));
        match &validate(&d).unwrap().shapes[0].geometry {
            ShapeGeometry::Sweep { section, path } => {
                assert_eq!(section.len(), 4);
                assert_eq!(path[0], Point3::new(0.0, 0.0, 0.0));
                assert_eq!(path[1], Point3::new(10.0, 0.0, 5.0));
            }
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_sweep_path_reversal() {
        let d = doc(json!([{
            "type": "sweep",
            "profile": [[-1, -1], [1, 1]],
            "path": [[0, 0, 0], [10, 0, 0], [2, 0, 0]]
        }]));
        assert_eq!(reason(&d).1, ValidationReason::DegenerateProfile);
    }

    #[test]
    fn test_operation_checks() {
        let unknown = doc(json!([{"type": "box", "width": 1, "length": 1, "height": 1, "operation": "xor"}]));
        assert_eq!(reason(&unknown).1, ValidationReason::UnknownOperation);

        let declared = doc(json!([{"type": "box", "width": 1, "length": 1, "height": 1, "operation": "union"}]));
        let shape = &validate(&declared).unwrap().shapes[0];
        assert_eq!(shape.operation, CombineOp::Union);
        assert!(shape.operation_declared);
    }

    #[test]
    fn test_wrong_json_types() {
        let d = doc(json!([{"type": "box", "width": "10", "length": 1, "height": 1}]));
        assert_eq!(reason(&d).1, ValidationReason::InvalidField);

        let d = doc(json!([{"type": "box", "width": 1, "length": 1, "height": 1, "position": [1]}]));
        assert_eq!(reason(&d).1, ValidationReason::InvalidField);

        let d = doc(json!(["box"]));
        assert_eq!(reason(&d), (Some(0), ValidationReason::InvalidField));
    }

    #[test]
    fn test_negative_fillet_is_out_of_range() {
        let d = doc(json!([{"type": "box", "width": 1, "length": 1, "height": 1, "fillet": -2}]));
        assert_eq!(reason(&d).1, ValidationReason::OutOfRange);
    }

    #[test]
    fn test_document_level_defaults_must_be_positive() {
        let d = InstructionDocument::from_value(json!({
            "shapes": [{"type": "cylinder", "radius": 2, "height": 1}],
            "wall_thickness": 0
        }))
        .unwrap();
        assert_eq!(reason(&d), (None, ValidationReason::NonPositiveDimension));
    }
}
