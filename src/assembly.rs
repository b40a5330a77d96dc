// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Assembly composer - merges compiled shapes into the final model
//!
//! The first shape is the primary body. Every later shape is applied to the
//! primary body with its declared operation, or kept as an independent body
//! for `concatenate`. A failed boolean keeps the operand as an independent
//! body and records a [`WarningKind::BooleanFallback`].

use crate::compiler::{CompiledShape, DegradationWarning, WarningKind};
use crate::geometry::{BoundingBox, Mesh};
use crate::instructions::CombineOp;
use crate::kernel::{Kernel, Solid};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("nothing to compose: no shapes were compiled")]
    Empty,
}

/// Final model: the primary body followed by independent bodies
#[derive(Debug, Clone)]
pub struct Assembly {
    bodies: Vec<Solid>,
}

impl Assembly {
    pub fn bodies(&self) -> &[Solid] {
        &self.bodies
    }

    /// Body every boolean was applied to
    pub fn primary(&self) -> &Solid {
        &self.bodies[0]
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn total_vertices(&self) -> usize {
        self.bodies.iter().map(Solid::vertex_count).sum()
    }

    pub fn total_triangles(&self) -> usize {
        self.bodies.iter().map(Solid::triangle_count).sum()
    }

    pub fn total_volume(&self) -> f64 {
        self.bodies.iter().map(Solid::volume).sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bodies
            .iter()
            .fold(BoundingBox::empty(), |acc, body| acc.union(&body.bounding_box()))
    }

    /// All bodies in one mesh, without any boolean merging
    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new();
        for body in &self.bodies {
            mesh.merge(body.mesh());
        }
        mesh
    }
}

/// Combine compiled shapes in document order
pub fn compose<K: Kernel + ?Sized>(
    kernel: &mut K,
    shapes: &[CompiledShape],
    warnings: &mut Vec<DegradationWarning>,
) -> Result<Assembly, ComposeError> {
    let (first, rest) = shapes.split_first().ok_or(ComposeError::Empty)?;

    if first.operation_declared && first.operation != CombineOp::Concatenate {
        DegradationWarning::new(
            first.index,
            WarningKind::BaseOperationIgnored,
            format!(
                "operation '{}' on the first shape ignored, it is the base body",
                first.operation.as_str()
            ),
        )
        .push_into(warnings);
    }

    let mut primary = first.solid.clone();
    let mut independent = Vec::new();

    for shape in rest {
        let Some(op) = shape.operation.boolean() else {
            independent.push(shape.solid.clone());
            continue;
        };

        match kernel.boolean(&primary, &shape.solid, op) {
            Ok(merged) => {
                debug!(shape = shape.index, %op, triangles = merged.triangle_count(), "boolean applied");
                primary = merged;
            }
            Err(err) => {
                DegradationWarning::new(
                    shape.index,
                    WarningKind::BooleanFallback,
                    format!(
                        "{} of shape {} failed, kept as an independent body ({err})",
                        shape.operation.as_str(),
                        shape.index
                    ),
                )
                .push_into(warnings);
                independent.push(shape.solid.clone());
            }
        }
    }

    let mut bodies = Vec::with_capacity(independent.len() + 1);
    bodies.push(primary);
    bodies.extend(independent);
    Ok(Assembly { bodies })
}
