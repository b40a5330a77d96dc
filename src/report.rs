// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Quality report: a pure summary of what a generation job produced

use crate::assembly::Assembly;
use crate::compiler::{CompiledShape, DegradationWarning};
use crate::config::GenerationConfig;
use crate::instructions::{ShapeKind, ShapeSpec};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Advanced feature flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub tapered: bool,
    pub threaded: bool,
    pub hollow: bool,
    pub filleted: bool,
    pub sweep: bool,
    pub revolve: bool,
}

impl FeatureFlags {
    fn mark_kind(&mut self, kind: ShapeKind) {
        match kind {
            ShapeKind::TaperedCylinder => self.tapered = true,
            ShapeKind::Thread => self.threaded = true,
            ShapeKind::Sweep => self.sweep = true,
            ShapeKind::Revolve => self.revolve = true,
            ShapeKind::Box | ShapeKind::Cylinder | ShapeKind::Polygon => {}
        }
    }

    /// Features the document asked for
    pub fn requested(shapes: &[ShapeSpec]) -> Self {
        let mut flags = Self::default();
        for shape in shapes {
            flags.mark_kind(shape.kind());
            flags.hollow |= shape.hollow;
            flags.filleted |= shape.wants_fillet();
        }
        flags
    }

    /// Features present in the output. Hollow and fillet count only when the
    /// modifier actually took effect.
    pub fn used(shapes: &[CompiledShape]) -> Self {
        let mut flags = Self::default();
        for shape in shapes {
            flags.mark_kind(shape.kind);
            flags.hollow |= shape.applied.hollow;
            flags.filleted |= shape.applied.filleted;
        }
        flags
    }
}

/// Per-shape line of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSummary {
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub segments: u32,
    pub vertices: usize,
    pub triangles: usize,
    /// A real helix was built for a thread
    pub helix: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub detail_level: f64,
    pub shapes_generated: usize,
    pub shape_types: BTreeMap<String, usize>,
    pub advanced_features_used: FeatureFlags,
    pub advanced_features_requested: FeatureFlags,
    pub polygon_count: usize,
    pub total_vertices: usize,
    pub warnings: Vec<String>,
    pub degradations: Vec<DegradationWarning>,
    pub body_count: usize,
    pub total_volume: f64,
    pub bounding_box: [f64; 6],
    pub shapes: Vec<ShapeSummary>,
}

impl QualityReport {
    pub fn build(
        config: &GenerationConfig,
        requested: &[ShapeSpec],
        compiled: &[CompiledShape],
        assembly: &Assembly,
        warnings: &[DegradationWarning],
    ) -> Self {
        let mut shape_types = BTreeMap::new();
        for shape in compiled {
            *shape_types.entry(shape.kind.as_str().to_string()).or_insert(0) += 1;
        }

        let shapes = compiled
            .iter()
            .map(|shape| ShapeSummary {
                index: shape.index,
                kind: shape.kind,
                segments: shape.segments,
                vertices: shape.solid.vertex_count(),
                triangles: shape.solid.triangle_count(),
                helix: shape.applied.threaded,
            })
            .collect();

        Self {
            detail_level: config.detail,
            shapes_generated: compiled.len(),
            shape_types,
            advanced_features_used: FeatureFlags::used(compiled),
            advanced_features_requested: FeatureFlags::requested(requested),
            polygon_count: assembly.total_triangles(),
            total_vertices: assembly.total_vertices(),
            warnings: warnings.iter().map(ToString::to_string).collect(),
            degradations: warnings.to_vec(),
            body_count: assembly.body_count(),
            total_volume: assembly.total_volume(),
            bounding_box: assembly.bounding_box().to_array(),
            shapes,
        }
    }

    /// Features that were asked for but did not make it into the output
    pub fn missing_features(&self) -> Vec<&'static str> {
        let req = &self.advanced_features_requested;
        let used = &self.advanced_features_used;
        [
            ("tapered", req.tapered && !used.tapered),
            ("threaded", req.threaded && !used.threaded),
            ("hollow", req.hollow && !used.hollow),
            ("filleted", req.filleted && !used.filleted),
            ("sweep", req.sweep && !used.sweep),
            ("revolve", req.revolve && !used.revolve),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize quality report")
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write quality report to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::compose;
    use crate::compiler::ShapeCompiler;
    use crate::instructions::{validate, InstructionDocument};
    use crate::kernel::{FaultyKernel, Kernel, KernelOp, MeshKernel};
    use serde_json::json;

    fn run<K: Kernel>(kernel: &mut K, doc: serde_json::Value) -> QualityReport {
        let doc = InstructionDocument::from_value(doc).unwrap();
        let validated = validate(&doc).unwrap();
        let config = GenerationConfig::new(validated.detail.unwrap_or(50.0));
        let mut warnings = Vec::new();
        let compiled: Vec<_> = {
            let mut compiler = ShapeCompiler::new(&mut *kernel, &config);
            validated
                .shapes
                .iter()
                .map(|s| compiler.compile(s, &mut warnings).unwrap())
                .collect()
        };
        let assembly = compose(kernel, &compiled, &mut warnings).unwrap();
        QualityReport::build(&config, &validated.shapes, &compiled, &assembly, &warnings)
    }

    #[test]
    fn test_counts_and_types() {
        let report = run(
            &mut MeshKernel::default(),
            json!({"detail": 70, "shapes": [
                {"type": "cylinder", "radius": 2, "height": 3},
                {"type": "box", "width": 1, "length": 1, "height": 1, "position": [10, 0]},
                {"type": "cylinder", "radius": 1, "height": 1, "position": [20, 0]}
            ]}),
        );

        assert_eq!(report.detail_level, 70.0);
        assert_eq!(report.shapes_generated, 3);
        assert_eq!(report.shape_types.get("cylinder"), Some(&2));
        assert_eq!(report.shape_types.get("box"), Some(&1));
        assert_eq!(report.body_count, 3);
        assert_eq!(report.advanced_features_used, FeatureFlags::default());
        assert_eq!(report.shapes[0].segments, 41);
        assert_eq!(
            report.total_vertices,
            report.shapes.iter().map(|s| s.vertices).sum::<usize>()
        );
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_skipped_modifier_is_requested_but_not_used() {
        let mut kernel = FaultyKernel::new(MeshKernel::default()).fail_on(KernelOp::Fillet);
        let report = run(
            &mut kernel,
            json!({"shapes": [
                {"type": "box", "width": 4, "length": 4, "height": 2,
                 "hollow": true, "wall_thickness": 0.5, "fillet": 0.5}
            ]}),
        );

        assert!(report.advanced_features_requested.filleted);
        assert!(!report.advanced_features_used.filleted);
        assert!(report.advanced_features_used.hollow);
        assert_eq!(report.missing_features(), vec!["filleted"]);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("shape 0:"));
    }

    #[test]
    fn test_write_json() {
        let report = run(
            &mut MeshKernel::default(),
            json!({"shapes": [{
                "type": "revolve", "profile": [[1, 0], [2, 0], [2, 3], [1, 3]], "angle_deg": 360
            }]}),
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.quality.json");

        report.write_json(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(value["shape_types"]["revolve"], 1);
        assert_eq!(value["advanced_features_used"]["revolve"], true);
        assert_eq!(value["shapes"][0]["type"], "revolve");
        assert_eq!(value["bounding_box"].as_array().map(Vec::len), Some(6));
    }
}
