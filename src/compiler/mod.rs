// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Shape compiler: base recipe, then hollow, fillet and transform.
//!
//! Recoverable kernel failures degrade to a documented fallback and leave a
//! [`DegradationWarning`]; only failures with no fallback are returned as
//! [`CompileError`].

mod modifiers;
mod recipes;

pub use modifiers::Outcome;
pub use recipes::placed_path;

use crate::config::GenerationConfig;
use crate::instructions::{CombineOp, ShapeKind, ShapeSpec};
use crate::kernel::{Kernel, KernelError, Solid};
use crate::tessellation;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Category of a non-fatal degradation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Loft failed; a straight cylinder was built instead
    LoftFallback,
    /// Helix failed or is disabled; a plain cylinder was built instead
    ThreadApproximation,
    ShellFailed,
    FilletSkipped,
    /// Boolean failed; the operand was kept as an independent body
    BooleanFallback,
    /// The first shape declared an operation with nothing to apply it to
    BaseOperationIgnored,
    /// A modifier was requested that cannot apply to this shape
    ModifierUnsupported,
}

/// Non-fatal degradation attributed to one shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradationWarning {
    pub shape_index: usize,
    pub kind: WarningKind,
    pub message: String,
}

impl DegradationWarning {
    pub fn new(shape_index: usize, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            shape_index,
            kind,
            message: message.into(),
        }
    }

    /// Record into the job's warning list, logging it as it lands
    pub fn push_into(self, warnings: &mut Vec<DegradationWarning>) {
        warn!(shape = self.shape_index, kind = ?self.kind, "{}", self.message);
        warnings.push(self);
    }
}

impl fmt::Display for DegradationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape {}: {}", self.shape_index, self.message)
    }
}

/// Step of compilation that failed fatally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileStage {
    Base,
    Fallback,
    Transform,
}

impl fmt::Display for CompileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompileStage::Base => "base construction",
            CompileStage::Fallback => "fallback construction",
            CompileStage::Transform => "transform",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("shape {shape_index}: {stage} failed: {source}")]
pub struct CompileError {
    pub shape_index: usize,
    pub stage: CompileStage,
    #[source]
    pub source: KernelError,
}

impl CompileError {
    fn new(shape_index: usize, stage: CompileStage, source: KernelError) -> Self {
        Self {
            shape_index,
            stage,
            source,
        }
    }
}

/// Modifiers that actually took effect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppliedFeatures {
    pub hollow: bool,
    pub filleted: bool,
    /// A real helix was built (not the cylinder approximation)
    pub threaded: bool,
}

/// A shape after base construction and all modifiers
#[derive(Debug, Clone)]
pub struct CompiledShape {
    pub index: usize,
    pub kind: ShapeKind,
    pub solid: Solid,
    pub operation: CombineOp,
    pub operation_declared: bool,
    pub segments: u32,
    pub applied: AppliedFeatures,
}

/// Compiles validated shapes against one kernel
pub struct ShapeCompiler<'a, K: Kernel + ?Sized> {
    kernel: &'a mut K,
    config: &'a GenerationConfig,
}

impl<'a, K: Kernel + ?Sized> ShapeCompiler<'a, K> {
    pub fn new(kernel: &'a mut K, config: &'a GenerationConfig) -> Self {
        Self { kernel, config }
    }

    /// Build one shape. Degradations are appended to `warnings`.
    pub fn compile(
        &mut self,
        shape: &ShapeSpec,
        warnings: &mut Vec<DegradationWarning>,
    ) -> Result<CompiledShape, CompileError> {
        let kind = shape.kind();
        let segments = tessellation::segments(kind, self.config.detail);
        let mut applied = AppliedFeatures::default();

        let base = recipes::build(&mut *self.kernel, shape, segments, self.config)?;
        applied.threaded = base.threaded;
        let mut solid = base.outcome.record(warnings);

        let hollow = modifiers::hollow(&mut *self.kernel, shape, &solid);
        applied.hollow = hollow.is_applied();
        solid = hollow.record(warnings);

        let fillet = modifiers::fillet(&mut *self.kernel, shape, &solid);
        applied.filleted = fillet.is_applied();
        solid = fillet.record(warnings);

        let solid = modifiers::transform(&mut *self.kernel, shape, &solid)
            .map_err(|e| CompileError::new(shape.index, CompileStage::Transform, e))?;

        debug!(
            shape = shape.index,
            kind = kind.as_str(),
            segments,
            vertices = solid.vertex_count(),
            triangles = solid.triangle_count(),
            "compiled shape"
        );

        Ok(CompiledShape {
            index: shape.index,
            kind,
            solid,
            operation: shape.operation,
            operation_declared: shape.operation_declared,
            segments,
            applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::{validate, InstructionDocument};
    use crate::kernel::{FaultyKernel, KernelOp, MeshKernel};
    use serde_json::json;

    fn shape(value: serde_json::Value) -> ShapeSpec {
        let doc = InstructionDocument::from_value(json!({ "shapes": [value] })).unwrap();
        validate(&doc).unwrap().shapes.remove(0)
    }

    #[test]
    fn test_box_with_all_modifiers() {
        let spec = shape(json!({
            "type": "box", "width": 20, "length": 10, "height": 5,
            "hollow": true, "wall_thickness": 1, "fillet": 2,
            "position": [5, 0], "rotate_deg": 90
        }));
        let mut kernel = MeshKernel::default();
        let config = GenerationConfig::default();
        let mut warnings = Vec::new();

        let compiled = ShapeCompiler::new(&mut kernel, &config)
            .compile(&spec, &mut warnings)
            .unwrap();

        assert!(warnings.is_empty(), "{warnings:?}");
        assert!(compiled.applied.hollow && compiled.applied.filleted);
        // Rotated a quarter turn: the 20 wide box now spans Y
        let bbox = compiled.solid.bounding_box();
        assert!((bbox.size().y - 20.0).abs() < 1e-6);
        assert!((bbox.center().x - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_failed_shell_keeps_solid() {
        let spec = shape(json!({
            "type": "cylinder", "radius": 5, "height": 5, "hollow": true, "wall_thickness": 1
        }));
        let mut kernel = FaultyKernel::new(MeshKernel::default()).fail_on(KernelOp::Shell);
        let config = GenerationConfig::default();
        let mut warnings = Vec::new();

        let compiled = ShapeCompiler::new(&mut kernel, &config)
            .compile(&spec, &mut warnings)
            .unwrap();

        assert!(!compiled.applied.hollow);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::ShellFailed);
        assert!(warnings[0].message.contains("shell failed, falling back to solid"));
    }

    #[test]
    fn test_transform_failure_is_fatal() {
        let spec = shape(json!({"type": "box", "width": 1, "length": 1, "height": 1}));
        let mut kernel = FaultyKernel::new(MeshKernel::default()).fail_on(KernelOp::Transform);
        let config = GenerationConfig::default();

        let err = ShapeCompiler::new(&mut kernel, &config)
            .compile(&spec, &mut Vec::new())
            .unwrap_err();
        assert_eq!(err.stage, CompileStage::Transform);
        assert_eq!(err.shape_index, 0);
    }

    #[test]
    fn test_loft_fallback_uses_larger_radius() {
        let spec = shape(json!({
            "type": "tapered_cylinder", "bottom_radius": 2, "top_radius": 4, "height": 10
        }));
        let mut kernel = FaultyKernel::new(MeshKernel::default()).fail_on(KernelOp::Loft);
        let config = GenerationConfig::default();
        let mut warnings = Vec::new();

        let compiled = ShapeCompiler::new(&mut kernel, &config)
            .compile(&spec, &mut warnings)
            .unwrap();

        assert_eq!(warnings[0].kind, WarningKind::LoftFallback);
        let bbox = compiled.solid.bounding_box();
        assert!((bbox.max.x - 4.0).abs() < 1e-9);
        assert!((bbox.max.z - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_thread_modifiers_are_reported_unsupported() {
        let spec = shape(json!({
            "type": "thread", "major_radius": 3, "pitch": 1, "turns": 2, "length": 2,
            "hollow": true, "wall_thickness": 0.5, "fillet": 0.2
        }));
        let mut kernel = MeshKernel::default();
        let config = GenerationConfig::default();
        let mut warnings = Vec::new();

        let compiled = ShapeCompiler::new(&mut kernel, &config)
            .compile(&spec, &mut warnings)
            .unwrap();

        assert!(compiled.applied.threaded);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.kind == WarningKind::ModifierUnsupported));
    }
}
