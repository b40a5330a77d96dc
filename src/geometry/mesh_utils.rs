// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh connectivity checks

use super::Mesh;
use ahash::AHashMap;

/// Undirected edge, smaller index first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Edge {
    v0: usize,
    v1: usize,
}

impl Edge {
    fn new(v0: usize, v1: usize) -> Self {
        if v0 < v1 {
            Self { v0, v1 }
        } else {
            Self { v0: v1, v1: v0 }
        }
    }
}

fn edge_counts(mesh: &Mesh) -> AHashMap<Edge, u32> {
    let mut counts: AHashMap<Edge, u32> = AHashMap::with_capacity(mesh.triangles.len() * 3 / 2);
    for triangle in &mesh.triangles {
        let [a, b, c] = triangle.indices;
        for edge in [Edge::new(a, b), Edge::new(b, c), Edge::new(c, a)] {
            *counts.entry(edge).or_insert(0) += 1;
        }
    }
    counts
}

/// Check if mesh is manifold (each edge shared by at most 2 triangles)
pub fn is_manifold(mesh: &Mesh) -> bool {
    edge_counts(mesh).values().all(|&count| count <= 2)
}

/// Check if mesh is closed (each edge shared by exactly 2 triangles)
pub fn is_closed(mesh: &Mesh) -> bool {
    !mesh.triangles.is_empty() && edge_counts(mesh).values().all(|&count| count == 2)
}

/// Number of edges used by exactly one triangle
pub fn open_edge_count(mesh: &Mesh) -> usize {
    edge_counts(mesh).values().filter(|&&count| count == 1).count()
}

/// Number of edges used by more than two triangles
pub(crate) fn overloaded_edge_count(mesh: &Mesh) -> usize {
    edge_counts(mesh).values().filter(|&&count| count > 2).count()
}
