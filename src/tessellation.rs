// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Adaptive tessellation planner

use crate::config::{clamp_detail, GenerationConfig};
use crate::instructions::{ShapeKind, ValidatedDocument};
use serde::Serialize;

pub const MIN_SEGMENTS: u32 = 16;
pub const MAX_SEGMENTS: u32 = 160;

/// Segments per full turn before the detail multiplier
pub fn base_segments(kind: ShapeKind) -> u32 {
    match kind {
        ShapeKind::Box | ShapeKind::Polygon | ShapeKind::Sweep => 4,
        ShapeKind::Cylinder => 24,
        ShapeKind::TaperedCylinder | ShapeKind::Revolve => 32,
        ShapeKind::Thread => 48,
    }
}

/// `clamp(round(base * (1 + detail / 100)), 16, 160)`
pub fn segments(kind: ShapeKind, detail: f64) -> u32 {
    let multiplier = 1.0 + clamp_detail(detail) / 100.0;
    let scaled = (f64::from(base_segments(kind)) * multiplier).round() as u32;
    scaled.clamp(MIN_SEGMENTS, MAX_SEGMENTS)
}

/// Resolution chosen for one shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShapePlan {
    pub shape_index: usize,
    pub kind: ShapeKind,
    pub segments: u32,
}

/// Plan every shape of a validated document
pub fn plan(document: &ValidatedDocument, config: &GenerationConfig) -> Vec<ShapePlan> {
    document
        .shapes
        .iter()
        .map(|shape| ShapePlan {
            shape_index: shape.index,
            kind: shape.kind(),
            segments: segments(shape.kind(), config.detail),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cylinder_at_detail_70() {
        assert_eq!(segments(ShapeKind::Cylinder, 70.0), 41);
    }

    #[test]
    fn test_bounds() {
        for kind in ShapeKind::ALL {
            for detail in [-50.0, 0.0, 33.3, 50.0, 100.0, 250.0] {
                let n = segments(kind, detail);
                assert!((MIN_SEGMENTS..=MAX_SEGMENTS).contains(&n), "{kind:?} {detail} -> {n}");
            }
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(segments(ShapeKind::Box, 100.0), 16);
        assert_eq!(segments(ShapeKind::Cylinder, 0.0), 24);
        assert_eq!(segments(ShapeKind::TaperedCylinder, 50.0), 48);
        assert_eq!(segments(ShapeKind::Thread, 100.0), 96);
        assert_eq!(segments(ShapeKind::Revolve, 100.0), 64);
    }

    #[test]
    fn test_out_of_range_detail_is_clamped() {
        assert_eq!(segments(ShapeKind::Thread, 500.0), segments(ShapeKind::Thread, 100.0));
        assert_eq!(segments(ShapeKind::Cylinder, -10.0), 24);
    }
}
