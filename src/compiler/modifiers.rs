// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Modifier steps. Each returns an [`Outcome`] the caller has to record.

use super::recipes::placement;
use super::{DegradationWarning, WarningKind};
use crate::instructions::{ShapeKind, ShapeSpec};
use crate::kernel::{EdgeSelector, Kernel, KernelResult, Placement, Solid};

/// Result of a fault-tolerant construction step
#[must_use = "an outcome may carry a warning that has to be recorded"]
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The step ran and produced this solid
    Applied(Solid),
    /// The step was not requested; the solid is the input
    Unchanged(Solid),
    /// The step failed; the solid is the fallback
    Degraded {
        solid: Solid,
        warning: DegradationWarning,
    },
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn warning(&self) -> Option<&DegradationWarning> {
        match self {
            Outcome::Degraded { warning, .. } => Some(warning),
            _ => None,
        }
    }

    /// Move any warning into `warnings` and hand back the solid
    pub fn record(self, warnings: &mut Vec<DegradationWarning>) -> Solid {
        match self {
            Outcome::Applied(solid) | Outcome::Unchanged(solid) => solid,
            Outcome::Degraded { solid, warning } => {
                warning.push_into(warnings);
                solid
            }
        }
    }
}

fn unsupported(shape: &ShapeSpec, solid: &Solid, message: String) -> Outcome {
    Outcome::Degraded {
        solid: solid.clone(),
        warning: DegradationWarning::new(shape.index, WarningKind::ModifierUnsupported, message),
    }
}

pub(super) fn hollow<K: Kernel + ?Sized>(
    kernel: &mut K,
    shape: &ShapeSpec,
    solid: &Solid,
) -> Outcome {
    if !shape.hollow {
        return Outcome::Unchanged(solid.clone());
    }
    if shape.kind() == ShapeKind::Thread {
        return unsupported(shape, solid, "hollow is not supported on threads, ignored".into());
    }
    let Some(thickness) = shape.wall_thickness else {
        return unsupported(
            shape,
            solid,
            "hollow requested without a wall_thickness, ignored".into(),
        );
    };

    match kernel.shell(solid, -thickness) {
        Ok(shelled) => Outcome::Applied(shelled),
        Err(err) => Outcome::Degraded {
            solid: solid.clone(),
            warning: DegradationWarning::new(
                shape.index,
                WarningKind::ShellFailed,
                format!("shell failed, falling back to solid ({err})"),
            ),
        },
    }
}

pub(super) fn fillet<K: Kernel + ?Sized>(
    kernel: &mut K,
    shape: &ShapeSpec,
    solid: &Solid,
) -> Outcome {
    if !shape.wants_fillet() {
        return Outcome::Unchanged(solid.clone());
    }
    if shape.kind() == ShapeKind::Thread {
        return unsupported(shape, solid, "fillet is not supported on threads, ignored".into());
    }

    match kernel.fillet(solid, EdgeSelector::Vertical, shape.fillet) {
        Ok(rounded) => Outcome::Applied(rounded),
        Err(err) => Outcome::Degraded {
            solid: solid.clone(),
            warning: DegradationWarning::new(
                shape.index,
                WarningKind::FilletSkipped,
                format!("fillet failed, skipped ({err})"),
            ),
        },
    }
}

/// Rigid placement. Sweeps are placed through their path, so they only go
/// through an identity transform here.
pub(super) fn transform<K: Kernel + ?Sized>(
    kernel: &mut K,
    shape: &ShapeSpec,
    solid: &Solid,
) -> KernelResult<Solid> {
    let placement = match shape.kind() {
        ShapeKind::Sweep => Placement::identity(),
        _ => placement(shape),
    };
    kernel.transform(solid, &placement)
}
