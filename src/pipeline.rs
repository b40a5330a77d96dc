// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Generation pipeline: validate, compile every shape, compose, report.
//!
//! A job either returns the full model with its report or a single fatal
//! error. Partial models are never returned.

use crate::assembly::{compose, Assembly, ComposeError};
use crate::compiler::{CompileError, DegradationWarning, ShapeCompiler};
use crate::config::{EngineConfig, GenerationConfig};
use crate::instructions::{validate, InstructionDocument, ValidationError};
use crate::kernel::{Kernel, MeshKernel};
use crate::report::QualityReport;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error("composition failed: {0}")]
    Compose(#[from] ComposeError),
}

impl GenerateError {
    /// Shape the failure is attributed to, if any
    pub fn shape_index(&self) -> Option<usize> {
        match self {
            GenerateError::Validation(e) => e.shape_index,
            GenerateError::Compile(e) => Some(e.shape_index),
            GenerateError::Compose(_) => None,
        }
    }
}

/// Result of a successful job
#[derive(Debug, Clone)]
pub struct Generation {
    pub assembly: Assembly,
    pub report: QualityReport,
    pub config: GenerationConfig,
}

impl Generation {
    pub fn warnings(&self) -> &[DegradationWarning] {
        &self.report.degradations
    }
}

/// Entry point for generation jobs. Holds only immutable settings; each job
/// gets its own kernel.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fresh kernel configured from the engine settings
    pub fn kernel(&self) -> MeshKernel {
        MeshKernel::new(self.config.kernel_settings())
    }

    pub fn generate(&self, document: &InstructionDocument) -> Result<Generation, GenerateError> {
        let mut kernel = self.kernel();
        self.generate_with_kernel(&mut kernel, document)
    }

    pub fn generate_json(&self, json: &str) -> Result<Generation, GenerateError> {
        self.generate(&InstructionDocument::from_json(json)?)
    }

    /// Run a job against a caller-supplied kernel
    pub fn generate_with_kernel<K: Kernel + ?Sized>(
        &self,
        kernel: &mut K,
        document: &InstructionDocument,
    ) -> Result<Generation, GenerateError> {
        let start = Instant::now();
        let validated = validate(document)?;
        let config = GenerationConfig::resolve(
            &self.config,
            validated.detail,
            validated.extrude_height,
            validated.wall_thickness,
        );
        info!(
            shapes = validated.shapes.len(),
            detail = config.detail,
            helix = config.helix_synthesis,
            "generating"
        );

        let mut warnings = Vec::new();
        let mut compiled = Vec::with_capacity(validated.shapes.len());
        {
            let mut compiler = ShapeCompiler::new(&mut *kernel, &config);
            for shape in &validated.shapes {
                compiled.push(compiler.compile(shape, &mut warnings)?);
            }
        }

        let assembly = compose(kernel, &compiled, &mut warnings)?;
        let report =
            QualityReport::build(&config, &validated.shapes, &compiled, &assembly, &warnings);

        info!(
            bodies = assembly.body_count(),
            triangles = report.polygon_count,
            warnings = warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generation complete"
        );

        Ok(Generation {
            assembly,
            report,
            config,
        })
    }
}
