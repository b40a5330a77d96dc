// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Instruction documents: the loose input form and the typed form the
//! validator produces

use super::{ValidationError, ValidationReason};
use crate::geometry::Profile;
use crate::kernel::BooleanOp;
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Shape instruction document as supplied by the caller.
///
/// Shapes stay untyped JSON objects until validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstructionDocument {
    #[serde(default)]
    pub shapes: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extrude_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_thickness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<f64>,
}

impl InstructionDocument {
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json).map_err(malformed)
    }

    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value).map_err(malformed)
    }

    pub fn with_shape(mut self, shape: Value) -> Self {
        self.shapes.push(shape);
        self
    }

    pub fn with_detail(mut self, detail: f64) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn malformed(err: serde_json::Error) -> ValidationError {
    ValidationError::new(None, ValidationReason::MalformedDocument, err.to_string())
}

/// Recognized shape types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Box,
    Cylinder,
    TaperedCylinder,
    Polygon,
    Thread,
    Revolve,
    Sweep,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 7] = [
        ShapeKind::Box,
        ShapeKind::Cylinder,
        ShapeKind::TaperedCylinder,
        ShapeKind::Polygon,
        ShapeKind::Thread,
        ShapeKind::Revolve,
        ShapeKind::Sweep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::TaperedCylinder => "tapered_cylinder",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Thread => "thread",
            ShapeKind::Revolve => "revolve",
            ShapeKind::Sweep => "sweep",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        ShapeKind::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

/// How a shape combines with the shapes before it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineOp {
    Union,
    Difference,
    Intersection,
    #[default]
    Concatenate,
}

impl CombineOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CombineOp::Union => "union",
            CombineOp::Difference => "difference",
            CombineOp::Intersection => "intersection",
            CombineOp::Concatenate => "concatenate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "union" => Some(CombineOp::Union),
            "difference" => Some(CombineOp::Difference),
            "intersection" => Some(CombineOp::Intersection),
            "concatenate" => Some(CombineOp::Concatenate),
            _ => None,
        }
    }

    /// Kernel boolean, or `None` for concatenate
    pub fn boolean(&self) -> Option<BooleanOp> {
        match self {
            CombineOp::Union => Some(BooleanOp::Union),
            CombineOp::Difference => Some(BooleanOp::Difference),
            CombineOp::Intersection => Some(BooleanOp::Intersection),
            CombineOp::Concatenate => None,
        }
    }
}

/// Type-specific geometry of a validated shape
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    Box {
        width: f64,
        length: f64,
        height: f64,
    },
    Cylinder {
        radius: f64,
        height: f64,
    },
    TaperedCylinder {
        bottom_radius: f64,
        top_radius: f64,
        height: f64,
    },
    Polygon {
        vertices: Vec<Point2<f64>>,
        height: f64,
    },
    Thread {
        major_radius: f64,
        pitch: f64,
        turns: f64,
        length: f64,
    },
    /// `profile` holds (r, z) points
    Revolve {
        profile: Vec<Point2<f64>>,
        angle_deg: f64,
    },
    Sweep {
        section: Profile,
        path: Vec<Point3<f64>>,
    },
}

impl ShapeGeometry {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeGeometry::Box { .. } => ShapeKind::Box,
            ShapeGeometry::Cylinder { .. } => ShapeKind::Cylinder,
            ShapeGeometry::TaperedCylinder { .. } => ShapeKind::TaperedCylinder,
            ShapeGeometry::Polygon { .. } => ShapeKind::Polygon,
            ShapeGeometry::Thread { .. } => ShapeKind::Thread,
            ShapeGeometry::Revolve { .. } => ShapeKind::Revolve,
            ShapeGeometry::Sweep { .. } => ShapeKind::Sweep,
        }
    }
}

/// Close an open (r, z) polyline back to the Z axis.
///
/// Endpoints off the axis get their projection onto it appended, so the
/// outline bounds the region between the polyline and the axis.
pub fn close_to_axis(profile: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut outline = profile.to_vec();
    let (Some(first), Some(last)) = (profile.first().copied(), profile.last().copied()) else {
        return outline;
    };
    if last.x > 0.0 {
        outline.push(Point2::new(0.0, last.y));
    }
    if first.x > 0.0 {
        outline.push(Point2::new(0.0, first.y));
    }
    outline.dedup_by(|a, b| (*a - *b).norm() < 1e-12);
    if outline.len() > 1 && (outline[0] - outline[outline.len() - 1]).norm() < 1e-12 {
        outline.pop();
    }
    outline
}

/// Placement offset as written in the document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    /// Only present for 3-component positions
    pub z: Option<f64>,
}

impl Position {
    /// Translation applied to the shape; a 2D position never moves Z
    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z.unwrap_or(0.0))
    }
}

/// One validated shape descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSpec {
    /// Index in the source document
    pub index: usize,
    pub geometry: ShapeGeometry,
    pub hollow: bool,
    /// Own thickness, or the document default
    pub wall_thickness: Option<f64>,
    pub fillet: f64,
    pub position: Option<Position>,
    pub rotate_deg: f64,
    pub operation: CombineOp,
    /// Whether `operation` was written explicitly
    pub operation_declared: bool,
}

impl ShapeSpec {
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.position
            .map(|p| p.translation())
            .unwrap_or_else(Vector3::zeros)
    }

    /// Hollowing was asked for with a usable thickness
    pub fn wants_hollow(&self) -> bool {
        self.hollow && self.wall_thickness.is_some()
    }

    pub fn wants_fillet(&self) -> bool {
        self.fillet > 0.0
    }
}

/// Output of validation: typed shapes plus the document-level values
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDocument {
    pub shapes: Vec<ShapeSpec>,
    pub detail: Option<f64>,
    pub extrude_height: Option<f64>,
    pub wall_thickness: Option<f64>,
}

/// Convenience for the raw object form of a shape
pub(crate) type RawShape = Map<String, Value>;
