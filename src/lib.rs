// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Shapeforge
//!
//! Procedural solid synthesis from shape-instruction documents. A document
//! lists shapes (boxes, cylinders, tapered cylinders, extruded polygons,
//! threads, revolves and sweeps) with optional modifiers and combine
//! operations; the engine validates it, builds each shape on a solid-modeling
//! kernel with graceful fallbacks, composes the result and reports what was
//! produced.

pub mod assembly;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod evaluation;
pub mod geometry;
pub mod instructions;
pub mod kernel;
pub mod pipeline;
pub mod report;
pub mod tessellation;

pub use assembly::{compose, Assembly, ComposeError};
pub use compiler::{CompileError, CompiledShape, DegradationWarning, ShapeCompiler, WarningKind};
pub use config::{EngineConfig, GenerationConfig};
pub use geometry::{BoundingBox, Mesh};
pub use instructions::{
    validate, InstructionDocument, ShapeKind, ShapeSpec, ValidatedDocument, ValidationError,
    ValidationReason,
};
pub use kernel::{FaultyKernel, Kernel, KernelError, KernelOp, MeshKernel, Solid};
pub use pipeline::{Engine, GenerateError, Generation};
pub use report::QualityReport;

/// Run a document through an engine with default settings
pub fn generate(document: &InstructionDocument) -> Result<Generation, GenerateError> {
    Engine::default().generate(document)
}

/// Parse and run a JSON instruction document with default settings
pub fn generate_json(json: &str) -> Result<Generation, GenerateError> {
    Engine::default().generate_json(json)
}
