// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Solid-modeling kernel seam.
//!
//! The compiler and composer only talk to [`Kernel`]. Every operation takes
//! immutable solids and returns a new one, so a failed call leaves the caller
//! holding the previous solid untouched.

mod faults;
mod mesh_kernel;

pub use faults::FaultyKernel;
pub use mesh_kernel::{KernelSettings, MeshKernel};

use crate::geometry::{analyze, BoundingBox, GeometryError, GeometryStats, Helix, Mesh, Profile, ToothProfile};
use nalgebra::{Isometry3, Matrix4, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Kernel operations, used to attribute failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelOp {
    Extrude,
    Loft,
    Sweep,
    Revolve,
    HelicalSweep,
    Shell,
    Fillet,
    Boolean,
    Transform,
}

impl KernelOp {
    pub const ALL: [KernelOp; 9] = [
        KernelOp::Extrude,
        KernelOp::Loft,
        KernelOp::Sweep,
        KernelOp::Revolve,
        KernelOp::HelicalSweep,
        KernelOp::Shell,
        KernelOp::Fillet,
        KernelOp::Boolean,
        KernelOp::Transform,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KernelOp::Extrude => "extrude",
            KernelOp::Loft => "loft",
            KernelOp::Sweep => "sweep",
            KernelOp::Revolve => "revolve",
            KernelOp::HelicalSweep => "helical_sweep",
            KernelOp::Shell => "shell",
            KernelOp::Fillet => "fillet",
            KernelOp::Boolean => "boolean",
            KernelOp::Transform => "transform",
        }
    }
}

impl fmt::Display for KernelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernelOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KernelOp::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown kernel operation '{s}'"))
    }
}

/// Errors returned by kernel operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("{op} failed: {source}")]
    Geometry {
        op: KernelOp,
        #[source]
        source: GeometryError,
    },

    #[error("{op} failed: fault injected")]
    Injected { op: KernelOp },
}

impl KernelError {
    pub fn geometry(op: KernelOp, source: GeometryError) -> Self {
        KernelError::Geometry { op, source }
    }

    pub fn op(&self) -> KernelOp {
        match self {
            KernelError::Geometry { op, .. } | KernelError::Injected { op } => *op,
        }
    }
}

pub type KernelResult<T> = std::result::Result<T, KernelError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOp {
    Union,
    Difference,
    Intersection,
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BooleanOp::Union => "union",
            BooleanOp::Difference => "difference",
            BooleanOp::Intersection => "intersection",
        })
    }
}

/// Which edges a fillet applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSelector {
    /// Edges parallel to the Z axis
    Vertical,
}

/// Rigid motion: rotation about the Z axis, then translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub translation: Vector3<f64>,
    pub rotate_deg: f64,
}

impl Placement {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotate_deg: 0.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.translation == Vector3::zeros() && self.rotate_deg == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.translation.iter().all(|c| c.is_finite()) && self.rotate_deg.is_finite()
    }

    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::new(self.translation, Vector3::z() * self.rotate_deg.to_radians())
    }

    pub fn to_matrix(&self) -> Matrix4<f64> {
        self.isometry().to_homogeneous()
    }

    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.isometry().transform_point(point)
    }
}

/// Construction history a prism-like solid can be rebuilt from
#[derive(Debug, Clone, PartialEq)]
pub struct PrismRecipe {
    pub profile: Profile,
    pub height: f64,
    /// Shell thickness applied after extrusion
    pub shell: Option<f64>,
}

/// Immutable kernel solid. Cloning is cheap; the mesh is shared.
#[derive(Debug, Clone)]
pub struct Solid {
    mesh: Arc<Mesh>,
    recipe: Option<Arc<PrismRecipe>>,
}

impl Solid {
    pub fn from_mesh(mesh: Mesh) -> Self {
        Self {
            mesh: Arc::new(mesh),
            recipe: None,
        }
    }

    pub(crate) fn with_recipe(mesh: Mesh, recipe: PrismRecipe) -> Self {
        Self {
            mesh: Arc::new(mesh),
            recipe: Some(Arc::new(recipe)),
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn recipe(&self) -> Option<&PrismRecipe> {
        self.recipe.as_deref()
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.mesh.bounding_box()
    }

    pub fn volume(&self) -> f64 {
        self.mesh.signed_volume().abs()
    }

    pub fn stats(&self) -> GeometryStats {
        analyze(&self.mesh)
    }

    /// True when both handles share the same mesh
    pub fn same_as(&self, other: &Solid) -> bool {
        Arc::ptr_eq(&self.mesh, &other.mesh)
    }
}

/// Capability surface the compiler and composer build solids with.
///
/// One kernel value serves one generation job; operations take `&mut self`
/// so implementations may keep per-job state.
pub trait Kernel {
    /// Extrude a planar profile along +Z
    fn extrude(&mut self, profile: &Profile, height: f64) -> KernelResult<Solid>;

    /// Ruled loft between two profiles at different elevations
    fn loft(&mut self, bottom: &Profile, top: &Profile) -> KernelResult<Solid>;

    /// Sweep a cross-section along a polyline
    fn sweep(&mut self, section: &Profile, path: &[Point3<f64>]) -> KernelResult<Solid>;

    /// Revolve a closed (r, z) outline around the Z axis
    fn revolve(&mut self, outline: &[Point2<f64>], angle_deg: f64, segments: u32)
        -> KernelResult<Solid>;

    /// Sweep a thread tooth along a helix
    fn helical_sweep(&mut self, tooth: &ToothProfile, helix: &Helix) -> KernelResult<Solid>;

    /// Hollow a solid; negative thickness grows the wall inward
    fn shell(&mut self, solid: &Solid, thickness: f64) -> KernelResult<Solid>;

    /// Round the selected edges
    fn fillet(&mut self, solid: &Solid, edges: EdgeSelector, radius: f64) -> KernelResult<Solid>;

    fn boolean(&mut self, a: &Solid, b: &Solid, op: BooleanOp) -> KernelResult<Solid>;

    fn transform(&mut self, solid: &Solid, placement: &Placement) -> KernelResult<Solid>;
}
