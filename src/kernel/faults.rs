// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Fault-injecting kernel wrapper for fallback drills and tests

use super::{
    BooleanOp, EdgeSelector, Kernel, KernelError, KernelOp, KernelResult, Placement, Solid,
};
use crate::geometry::{Helix, Profile, ToothProfile};
use ahash::{AHashMap, AHashSet};
use nalgebra::{Point2, Point3};

/// Wraps a kernel, forcing selected operations to fail and counting calls
#[derive(Debug, Clone, Default)]
pub struct FaultyKernel<K> {
    inner: K,
    failing: AHashSet<KernelOp>,
    calls: AHashMap<KernelOp, usize>,
}

impl<K: Kernel> FaultyKernel<K> {
    pub fn new(inner: K) -> Self {
        Self {
            inner,
            failing: AHashSet::new(),
            calls: AHashMap::new(),
        }
    }

    /// Make every call of `op` fail
    pub fn fail_on(mut self, op: KernelOp) -> Self {
        self.failing.insert(op);
        self
    }

    pub fn fail_on_all(mut self, ops: impl IntoIterator<Item = KernelOp>) -> Self {
        self.failing.extend(ops);
        self
    }

    pub fn call_count(&self, op: KernelOp) -> usize {
        self.calls.get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.values().sum()
    }

    pub fn into_inner(self) -> K {
        self.inner
    }

    fn enter(&mut self, op: KernelOp) -> KernelResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        if self.failing.contains(&op) {
            Err(KernelError::Injected { op })
        } else {
            Ok(())
        }
    }
}

impl<K: Kernel> Kernel for FaultyKernel<K> {
    fn extrude(&mut self, profile: &Profile, height: f64) -> KernelResult<Solid> {
        self.enter(KernelOp::Extrude)?;
        self.inner.extrude(profile, height)
    }

    fn loft(&mut self, bottom: &Profile, top: &Profile) -> KernelResult<Solid> {
        self.enter(KernelOp::Loft)?;
        self.inner.loft(bottom, top)
    }

    fn sweep(&mut self, section: &Profile, path: &[Point3<f64>]) -> KernelResult<Solid> {
        self.enter(KernelOp::Sweep)?;
        self.inner.sweep(section, path)
    }

    fn revolve(
        &mut self,
        outline: &[Point2<f64>],
        angle_deg: f64,
        segments: u32,
    ) -> KernelResult<Solid> {
        self.enter(KernelOp::Revolve)?;
        self.inner.revolve(outline, angle_deg, segments)
    }

    fn helical_sweep(&mut self, tooth: &ToothProfile, helix: &Helix) -> KernelResult<Solid> {
        self.enter(KernelOp::HelicalSweep)?;
        self.inner.helical_sweep(tooth, helix)
    }

    fn shell(&mut self, solid: &Solid, thickness: f64) -> KernelResult<Solid> {
        self.enter(KernelOp::Shell)?;
        self.inner.shell(solid, thickness)
    }

    fn fillet(&mut self, solid: &Solid, edges: EdgeSelector, radius: f64) -> KernelResult<Solid> {
        self.enter(KernelOp::Fillet)?;
        self.inner.fillet(solid, edges, radius)
    }

    fn boolean(&mut self, a: &Solid, b: &Solid, op: BooleanOp) -> KernelResult<Solid> {
        self.enter(KernelOp::Boolean)?;
        self.inner.boolean(a, b, op)
    }

    fn transform(&mut self, solid: &Solid, placement: &Placement) -> KernelResult<Solid> {
        self.enter(KernelOp::Transform)?;
        self.inner.transform(solid, placement)
    }
}
