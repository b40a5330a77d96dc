// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Base construction recipe per shape type

use super::{CompileError, CompileStage, DegradationWarning, Outcome, WarningKind};
use crate::config::GenerationConfig;
use crate::geometry::{Helix, Profile, ToothProfile};
use crate::instructions::{close_to_axis, ShapeGeometry, ShapeSpec};
use crate::kernel::{Kernel, KernelError, Placement, Solid};
use nalgebra::Point3;

pub(super) struct Base {
    pub outcome: Outcome,
    pub threaded: bool,
}

impl Base {
    fn plain(solid: Solid) -> Self {
        Self {
            outcome: Outcome::Applied(solid),
            threaded: false,
        }
    }
}

pub(super) fn build<K: Kernel + ?Sized>(
    kernel: &mut K,
    shape: &ShapeSpec,
    segments: u32,
    config: &GenerationConfig,
) -> Result<Base, CompileError> {
    let index = shape.index;
    let fatal =
        move |stage: CompileStage| move |e: KernelError| CompileError::new(index, stage, e);

    match &shape.geometry {
        ShapeGeometry::Box {
            width,
            length,
            height,
        } => kernel
            .extrude(&Profile::rectangle(*width, *length), *height)
            .map(Base::plain)
            .map_err(fatal(CompileStage::Base)),

        ShapeGeometry::Cylinder { radius, height } => kernel
            .extrude(&Profile::circle(*radius, segments), *height)
            .map(Base::plain)
            .map_err(fatal(CompileStage::Base)),

        ShapeGeometry::TaperedCylinder {
            bottom_radius,
            top_radius,
            height,
        } => {
            let bottom = Profile::circle(*bottom_radius, segments);
            let top = Profile::circle(*top_radius, segments).at_elevation(*height);
            match kernel.loft(&bottom, &top) {
                Ok(solid) => Ok(Base::plain(solid)),
                Err(err) => {
                    let radius = bottom_radius.max(*top_radius);
                    let solid = kernel
                        .extrude(&Profile::circle(radius, segments), *height)
                        .map_err(fatal(CompileStage::Fallback))?;
                    let warning = DegradationWarning::new(
                        shape.index,
                        WarningKind::LoftFallback,
                        format!("loft failed, using straight cylinder r={radius} ({err})"),
                    );
                    Ok(Base {
                        outcome: Outcome::Degraded { solid, warning },
                        threaded: false,
                    })
                }
            }
        }

        ShapeGeometry::Polygon { vertices, height } => kernel
            .extrude(&Profile::polygon(vertices.clone()), *height)
            .map(Base::plain)
            .map_err(fatal(CompileStage::Base)),

        ShapeGeometry::Thread {
            major_radius,
            pitch,
            turns,
            length,
        } => {
            let reason = if config.helix_synthesis {
                let helix = Helix {
                    major_radius: *major_radius,
                    pitch: *pitch,
                    turns: *turns,
                    length: *length,
                    segments_per_turn: segments,
                };
                match kernel.helical_sweep(&ToothProfile::iso(*pitch), &helix) {
                    Ok(solid) => {
                        return Ok(Base {
                            outcome: Outcome::Applied(solid),
                            threaded: true,
                        })
                    }
                    Err(err) => err.to_string(),
                }
            } else {
                "helix synthesis disabled".to_string()
            };

            let solid = kernel
                .extrude(&Profile::circle(*major_radius, segments), *length)
                .map_err(fatal(CompileStage::Fallback))?;
            let warning = DegradationWarning::new(
                shape.index,
                WarningKind::ThreadApproximation,
                format!("thread approximation used ({reason})"),
            );
            Ok(Base {
                outcome: Outcome::Degraded { solid, warning },
                threaded: false,
            })
        }

        ShapeGeometry::Revolve { profile, angle_deg } => kernel
            .revolve(&close_to_axis(profile), *angle_deg, segments)
            .map(Base::plain)
            .map_err(fatal(CompileStage::Base)),

        ShapeGeometry::Sweep { section, path } => {
            let path = placed_path(path, &placement(shape));
            kernel
                .sweep(section, &path)
                .map(Base::plain)
                .map_err(fatal(CompileStage::Base))
        }
    }
}

/// Placement requested by the shape's position and rotation
pub(super) fn placement(shape: &ShapeSpec) -> Placement {
    Placement {
        translation: shape.translation(),
        rotate_deg: shape.rotate_deg,
    }
}

/// Sweep path moved into place.
///
/// A 2D position shifts X and Y only; path heights are kept as written.
pub fn placed_path(path: &[Point3<f64>], placement: &Placement) -> Vec<Point3<f64>> {
    path.iter().map(|p| placement.apply(p)).collect()
}
