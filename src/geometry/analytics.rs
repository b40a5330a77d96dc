// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics and statistics

use super::{is_closed, Mesh};
use serde::{Deserialize, Serialize};

/// Geometry statistics and analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryStats {
    /// Enclosed volume in cubic units
    pub volume: f64,
    /// Total surface area in square units
    pub surface_area: f64,
    /// Bounding box [min_x, min_y, min_z, max_x, max_y, max_z]
    pub bbox: [f64; 6],
    /// Vertex average [x, y, z]
    pub centroid: [f64; 3],
    pub vertex_count: usize,
    pub triangle_count: usize,
    /// Every edge shared by exactly two triangles
    pub is_watertight: bool,
}

impl GeometryStats {
    pub fn empty() -> Self {
        Self {
            volume: 0.0,
            surface_area: 0.0,
            bbox: [0.0; 6],
            centroid: [0.0; 3],
            vertex_count: 0,
            triangle_count: 0,
            is_watertight: false,
        }
    }
}

/// Analyze mesh geometry and compute statistics
pub fn analyze(mesh: &Mesh) -> GeometryStats {
    let vertex_count = mesh.vertices.len();
    let triangle_count = mesh.triangles.len();

    if vertex_count == 0 || triangle_count == 0 {
        return GeometryStats::empty();
    }

    GeometryStats {
        volume: mesh.signed_volume().abs(),
        surface_area: calculate_surface_area(mesh),
        bbox: mesh.bounding_box().to_array(),
        centroid: calculate_centroid(mesh),
        vertex_count,
        triangle_count,
        is_watertight: is_closed(mesh),
    }
}

fn calculate_surface_area(mesh: &Mesh) -> f64 {
    mesh.triangles
        .iter()
        .map(|triangle| mesh.face_normal(triangle).norm() / 2.0)
        .sum()
}

fn calculate_centroid(mesh: &Mesh) -> [f64; 3] {
    let sum = mesh
        .vertices
        .iter()
        .fold(nalgebra::Vector3::zeros(), |acc, v| acc + v.position.coords);
    let mean = sum / mesh.vertices.len() as f64;
    [mean.x, mean.y, mean.z]
}
