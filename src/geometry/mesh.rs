// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation and utilities

use super::BoundingBox;
use ahash::AHashMap;
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Vertex with position and normal
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }

    /// Vertex with a placeholder normal; call `Mesh::recompute_normals` afterwards
    pub fn at(position: Point3<f64>) -> Self {
        Self::new(position, Vector3::z())
    }

    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        self.position = matrix.transform_point(&self.position);
        // Normals transform with the inverse transpose
        let normal_matrix = matrix
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(*matrix);
        let normal = normal_matrix.transform_vector(&self.normal);
        if normal.norm() > 1e-12 {
            self.normal = normal.normalize();
        }
    }
}

/// Triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self { indices }
    }

    pub fn flipped(&self) -> Self {
        Self::new([self.indices[0], self.indices[2], self.indices[1]])
    }

    pub fn is_degenerate(&self) -> bool {
        let [a, b, c] = self.indices;
        a == b || b == c || a == c
    }
}

/// Triangular mesh
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Transform all vertices by a matrix
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for vertex in &mut self.vertices {
            vertex.transform(matrix);
        }
    }

    /// Compute bounding box
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_vertices(&self.vertices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Positions of a triangle's corners
    pub fn corners(&self, triangle: &Triangle) -> [Point3<f64>; 3] {
        [
            self.vertices[triangle.indices[0]].position,
            self.vertices[triangle.indices[1]].position,
            self.vertices[triangle.indices[2]].position,
        ]
    }

    /// Unnormalized face normal (length is twice the triangle area)
    pub fn face_normal(&self, triangle: &Triangle) -> Vector3<f64> {
        let [a, b, c] = self.corners(triangle);
        (b - a).cross(&(c - a))
    }

    /// Merge with another mesh (no CSG, both solids stay as separate shells)
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);

        for triangle in &other.triangles {
            self.triangles.push(Triangle::new([
                triangle.indices[0] + offset,
                triangle.indices[1] + offset,
                triangle.indices[2] + offset,
            ]));
        }
    }

    /// Weld vertices that are within epsilon distance of each other.
    /// Returns the number of vertices removed.
    pub fn weld_vertices(&mut self, epsilon: f64) -> usize {
        if self.vertices.is_empty() || epsilon <= 0.0 {
            return 0;
        }

        let original_count = self.vertices.len();
        let cell = |p: &Point3<f64>| -> (i64, i64, i64) {
            (
                (p.x / epsilon).floor() as i64,
                (p.y / epsilon).floor() as i64,
                (p.z / epsilon).floor() as i64,
            )
        };

        let mut grid: AHashMap<(i64, i64, i64), Vec<usize>> = AHashMap::new();
        let mut new_vertices: Vec<Vertex> = Vec::with_capacity(original_count);
        let mut remap: Vec<usize> = vec![0; original_count];

        for (i, vertex) in self.vertices.iter().enumerate() {
            let (cx, cy, cz) = cell(&vertex.position);
            let mut found = None;

            // Neighbouring cells catch points straddling a cell boundary
            'search: for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        if let Some(bucket) = grid.get(&(cx + dx, cy + dy, cz + dz)) {
                            for &j in bucket {
                                if (new_vertices[j].position - vertex.position).norm() < epsilon {
                                    found = Some(j);
                                    break 'search;
                                }
                            }
                        }
                    }
                }
            }

            remap[i] = match found {
                Some(j) => j,
                None => {
                    let j = new_vertices.len();
                    new_vertices.push(*vertex);
                    grid.entry((cx, cy, cz)).or_default().push(j);
                    j
                }
            };
        }

        for triangle in &mut self.triangles {
            for index in &mut triangle.indices {
                *index = remap[*index];
            }
        }

        self.vertices = new_vertices;
        original_count - self.vertices.len()
    }

    /// Drop triangles that reference the same vertex twice or have no area.
    /// Returns the number of triangles removed.
    pub fn remove_degenerate_triangles(&mut self) -> usize {
        let original_count = self.triangles.len();
        let vertices = &self.vertices;
        self.triangles.retain(|t| {
            if t.is_degenerate() {
                return false;
            }
            let a = vertices[t.indices[0]].position;
            let b = vertices[t.indices[1]].position;
            let c = vertices[t.indices[2]].position;
            (b - a).cross(&(c - a)).norm() > 1e-12
        });
        original_count - self.triangles.len()
    }

    /// Remove vertices no triangle references. Returns the number removed.
    pub fn remove_orphaned_vertices(&mut self) -> usize {
        let mut used = vec![false; self.vertices.len()];
        for triangle in &self.triangles {
            for &i in &triangle.indices {
                used[i] = true;
            }
        }

        let mut remap = vec![usize::MAX; self.vertices.len()];
        let mut kept = Vec::with_capacity(self.vertices.len());
        for (i, vertex) in self.vertices.iter().enumerate() {
            if used[i] {
                remap[i] = kept.len();
                kept.push(*vertex);
            }
        }

        for triangle in &mut self.triangles {
            for index in &mut triangle.indices {
                *index = remap[*index];
            }
        }

        let removed = self.vertices.len() - kept.len();
        self.vertices = kept;
        removed
    }

    /// Signed volume enclosed by the mesh (positive when faces wind outward)
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = self.corners(t);
                a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
            })
            .sum()
    }

    /// Reverse the winding of every triangle
    pub fn flip(&mut self) {
        for triangle in &mut self.triangles {
            *triangle = triangle.flipped();
        }
        for vertex in &mut self.vertices {
            vertex.normal = -vertex.normal;
        }
    }

    /// Flip the mesh if its faces wind inward
    pub fn orient_outward(&mut self) {
        if self.signed_volume() < 0.0 {
            self.flip();
        }
    }

    /// Recompute vertex normals by area-weighted averaging of face normals
    pub fn recompute_normals(&mut self) {
        if self.vertices.is_empty() || self.triangles.is_empty() {
            return;
        }

        let mut normal_sums: Vec<Vector3<f64>> = vec![Vector3::zeros(); self.vertices.len()];

        for triangle in &self.triangles {
            // Cross product length already carries the area weighting
            let face_normal = self.face_normal(triangle);
            if face_normal.norm() > 1e-12 {
                for &idx in &triangle.indices {
                    normal_sums[idx] += face_normal;
                }
            }
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(normal_sums) {
            vertex.normal = if sum.norm() > 1e-12 {
                sum.normalize()
            } else {
                Vector3::z()
            };
        }
    }
}
