// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangle-mesh implementation of the kernel

use super::{
    BooleanOp, EdgeSelector, Kernel, KernelError, KernelOp, KernelResult, Placement, PrismRecipe,
    Solid,
};
use crate::geometry::{
    self, csg_difference, csg_intersection, csg_union, CsgOptions, GeometryError, Helix, Profile,
    ToothProfile,
};
use nalgebra::{Point2, Point3};
use tracing::debug;

/// Numeric settings for the mesh kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelSettings {
    pub csg: CsgOptions,
    pub weld_epsilon: f64,
    /// Angular step of the arcs a fillet inserts
    pub fillet_arc_step_deg: f64,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            csg: CsgOptions::default(),
            weld_epsilon: 1e-9,
            fillet_arc_step_deg: 15.0,
        }
    }
}

/// Kernel backed by the crate's own mesh algorithms
#[derive(Debug, Clone, Default)]
pub struct MeshKernel {
    settings: KernelSettings,
}

impl MeshKernel {
    pub fn new(settings: KernelSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &KernelSettings {
        &self.settings
    }
}

fn fail(op: KernelOp) -> impl FnOnce(GeometryError) -> KernelError {
    move |source| KernelError::geometry(op, source)
}

impl Kernel for MeshKernel {
    fn extrude(&mut self, profile: &Profile, height: f64) -> KernelResult<Solid> {
        let mesh = geometry::prism(profile, height).map_err(fail(KernelOp::Extrude))?;
        Ok(Solid::with_recipe(
            mesh,
            PrismRecipe {
                profile: profile.clone(),
                height,
                shell: None,
            },
        ))
    }

    fn loft(&mut self, bottom: &Profile, top: &Profile) -> KernelResult<Solid> {
        let mesh = geometry::loft(bottom, top).map_err(fail(KernelOp::Loft))?;
        Ok(Solid::from_mesh(mesh))
    }

    fn sweep(&mut self, section: &Profile, path: &[Point3<f64>]) -> KernelResult<Solid> {
        let mesh = geometry::sweep(section, path).map_err(fail(KernelOp::Sweep))?;
        Ok(Solid::from_mesh(mesh))
    }

    fn revolve(
        &mut self,
        outline: &[Point2<f64>],
        angle_deg: f64,
        segments: u32,
    ) -> KernelResult<Solid> {
        let mesh =
            geometry::revolve(outline, angle_deg, segments).map_err(fail(KernelOp::Revolve))?;
        Ok(Solid::from_mesh(mesh))
    }

    fn helical_sweep(&mut self, tooth: &ToothProfile, helix: &Helix) -> KernelResult<Solid> {
        let mesh = geometry::helical_sweep(tooth, helix).map_err(fail(KernelOp::HelicalSweep))?;
        Ok(Solid::from_mesh(mesh))
    }

    fn shell(&mut self, solid: &Solid, thickness: f64) -> KernelResult<Solid> {
        let mesh = geometry::shell(solid.mesh(), thickness, self.settings.weld_epsilon)
            .map_err(fail(KernelOp::Shell))?;

        // Keep the history only while it is a single shell of a prism
        Ok(match solid.recipe() {
            Some(recipe) if recipe.shell.is_none() => Solid::with_recipe(
                mesh,
                PrismRecipe {
                    shell: Some(thickness),
                    ..recipe.clone()
                },
            ),
            _ => Solid::from_mesh(mesh),
        })
    }

    fn fillet(&mut self, solid: &Solid, edges: EdgeSelector, radius: f64) -> KernelResult<Solid> {
        let EdgeSelector::Vertical = edges;
        let recipe = solid
            .recipe()
            .ok_or_else(|| KernelError::geometry(KernelOp::Fillet, GeometryError::NoEdgesSelected))?;

        let rounded = recipe
            .profile
            .with_rounded_corners(radius, self.settings.fillet_arc_step_deg)
            .map_err(fail(KernelOp::Fillet))?;
        let mut mesh = geometry::prism(&rounded, recipe.height).map_err(fail(KernelOp::Fillet))?;
        if let Some(thickness) = recipe.shell {
            mesh = geometry::shell(&mesh, thickness, self.settings.weld_epsilon)
                .map_err(fail(KernelOp::Fillet))?;
        }

        debug!(
            corners = recipe.profile.sharp_corners(20.0).len(),
            radius, "rebuilt prism with rounded vertical edges"
        );
        Ok(Solid::with_recipe(
            mesh,
            PrismRecipe {
                profile: rounded,
                height: recipe.height,
                shell: recipe.shell,
            },
        ))
    }

    fn boolean(&mut self, a: &Solid, b: &Solid, op: BooleanOp) -> KernelResult<Solid> {
        let options = &self.settings.csg;
        let mesh = match op {
            BooleanOp::Union => csg_union(a.mesh(), b.mesh(), options),
            BooleanOp::Difference => csg_difference(a.mesh(), b.mesh(), options),
            BooleanOp::Intersection => csg_intersection(a.mesh(), b.mesh(), options),
        }
        .map_err(fail(KernelOp::Boolean))?;
        Ok(Solid::from_mesh(mesh))
    }

    fn transform(&mut self, solid: &Solid, placement: &Placement) -> KernelResult<Solid> {
        if !placement.is_finite() {
            return Err(KernelError::geometry(
                KernelOp::Transform,
                GeometryError::InvalidParameter("placement is not finite".into()),
            ));
        }
        if placement.is_identity() {
            return Ok(solid.clone());
        }
        let mut mesh = solid.mesh().clone();
        mesh.transform(&placement.to_matrix());
        Ok(Solid::from_mesh(mesh))
    }
}
