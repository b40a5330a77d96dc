// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Shell (hollowing) by planar vertex offset

use super::{is_closed, open_edge_count, GeometryError, GeometryResult, Mesh, Triangle, Vertex};
use ahash::AHashSet;
use nalgebra::{DMatrix, DVector, Vector3};

/// Faces with a normal this close to +Z are candidates for the opening
const TOP_FACE_COS: f64 = 0.999;

/// Incident normals closer than this are treated as one plane
const SAME_PLANE_COS: f64 = 0.9999;

/// Hollow a closed mesh, leaving a wall of `|thickness|`.
///
/// Negative thickness grows the wall inward, positive outward. The flat
/// top face, when there is one, is removed so the result is an open
/// container whose rim is bridged between the two surfaces. Without a flat
/// top the result is a closed solid with an internal cavity.
pub fn shell(mesh: &Mesh, thickness: f64, weld_epsilon: f64) -> GeometryResult<Mesh> {
    if thickness == 0.0 || !thickness.is_finite() {
        return Err(GeometryError::InvalidParameter(format!(
            "shell thickness {thickness} must be non-zero"
        )));
    }

    let mut base = mesh.clone();
    base.weld_vertices(weld_epsilon);
    base.remove_degenerate_triangles();
    base.remove_orphaned_vertices();
    if !is_closed(&base) {
        return Err(GeometryError::NonManifold {
            bad_edges: open_edge_count(&base),
        });
    }
    base.orient_outward();

    let (faces, rim) = remove_top_face(&base);
    let n = base.vertex_count();

    let displacements = vertex_displacements(&base, &faces, &rim, thickness)?;
    let displaced: Vec<Vertex> = base
        .vertices
        .iter()
        .zip(&displacements)
        .map(|(v, d)| Vertex::at(v.position + d))
        .collect();

    // Offset faces must keep their orientation, otherwise the wall folded
    for triangle in &faces {
        let original = base.face_normal(triangle);
        let [a, b, c] = triangle.indices.map(|i| displaced[i].position);
        let moved = (b - a).cross(&(c - a));
        if original.dot(&moved) <= 0.0 {
            return Err(GeometryError::WallTooThick {
                thickness: thickness.abs(),
            });
        }
    }

    let (outer, inner): (Vec<Vertex>, Vec<Vertex>) = if thickness < 0.0 {
        (base.vertices.clone(), displaced)
    } else {
        (displaced, base.vertices.clone())
    };

    let outer_box = Mesh {
        vertices: outer.clone(),
        triangles: Vec::new(),
    }
    .bounding_box();
    let inner_box = Mesh {
        vertices: inner.clone(),
        triangles: Vec::new(),
    }
    .bounding_box();
    let tolerance = weld_epsilon.max(1e-9);
    if (inner_box.min - outer_box.min).min() < -tolerance
        || (outer_box.max - inner_box.max).min() < -tolerance
    {
        return Err(GeometryError::WallTooThick {
            thickness: thickness.abs(),
        });
    }

    let mut result = Mesh::with_capacity(2 * n, 2 * faces.len() + 2 * n);
    result.vertices.extend(outer);
    result.vertices.extend(inner);

    for triangle in &faces {
        result.add_triangle(*triangle);
        let [a, b, c] = triangle.indices;
        result.add_triangle(Triangle::new([a + n, c + n, b + n]));
    }

    for (a, b) in boundary_edges(&faces) {
        result.add_triangle(Triangle::new([b, a, a + n]));
        result.add_triangle(Triangle::new([b, a + n, b + n]));
    }

    result.remove_degenerate_triangles();
    result.remove_orphaned_vertices();
    result.recompute_normals();

    let volume = result.signed_volume();
    if !(volume > 0.0) || !is_closed(&result) {
        return Err(GeometryError::WallTooThick {
            thickness: thickness.abs(),
        });
    }
    Ok(result)
}

/// Faces of `mesh` minus the flat face at its maximum height, plus a flag
/// per vertex marking the vertices the removed face touched
fn remove_top_face(mesh: &Mesh) -> (Vec<Triangle>, Vec<bool>) {
    let bbox = mesh.bounding_box();
    let top = bbox.max.z;
    let tolerance = 1e-9 * bbox.size().amax().max(1.0);

    let mut rim = vec![false; mesh.vertex_count()];
    let mut faces = Vec::with_capacity(mesh.triangles.len());
    for triangle in &mesh.triangles {
        let normal = mesh.face_normal(triangle);
        let length = normal.norm();
        let flat_up = length > 0.0 && normal.z / length > TOP_FACE_COS;
        let at_top = triangle
            .indices
            .iter()
            .all(|&i| mesh.vertices[i].position.z >= top - tolerance);
        if flat_up && at_top {
            for &i in &triangle.indices {
                rim[i] = true;
            }
        } else {
            faces.push(*triangle);
        }
    }

    (faces, rim)
}

/// Directed edges used by one face only; the reverse direction is missing
fn boundary_edges(faces: &[Triangle]) -> Vec<(usize, usize)> {
    let directed: AHashSet<(usize, usize)> = faces
        .iter()
        .flat_map(|t| {
            let [a, b, c] = t.indices;
            [(a, b), (b, c), (c, a)]
        })
        .collect();

    let mut edges: Vec<(usize, usize)> = directed
        .iter()
        .copied()
        .filter(|&(a, b)| !directed.contains(&(b, a)))
        .collect();
    edges.sort_unstable();
    edges
}

/// Per-vertex displacement moving every incident face plane by `thickness`
/// along its normal (least squares when the planes over-constrain it).
///
/// Rim vertices also keep the removed top plane fixed, so the opening stays
/// at the height of the outer top.
fn vertex_displacements(
    mesh: &Mesh,
    faces: &[Triangle],
    rim: &[bool],
    thickness: f64,
) -> GeometryResult<Vec<Vector3<f64>>> {
    let mut incident: Vec<Vec<Vector3<f64>>> = vec![Vec::new(); mesh.vertex_count()];
    for triangle in faces {
        let normal = mesh.face_normal(triangle);
        let length = normal.norm();
        if length < 1e-12 {
            continue;
        }
        let normal = normal / length;
        for &i in &triangle.indices {
            let planes = &mut incident[i];
            if !planes.iter().any(|p| p.dot(&normal) > SAME_PLANE_COS) {
                planes.push(normal);
            }
        }
    }

    incident
        .iter()
        .zip(rim)
        .map(|(planes, &on_rim)| {
            if planes.is_empty() {
                // Vertex only touched the removed top face
                return Ok(Vector3::zeros());
            }
            let rows = planes.len() + usize::from(on_rim);
            let a = DMatrix::from_fn(rows, 3, |r, c| match planes.get(r) {
                Some(normal) => normal[c],
                // Removed top plane, fixed in place
                None => if c == 2 { 1.0 } else { 0.0 },
            });
            let b = DVector::from_fn(rows, |r, _| if r < planes.len() { thickness } else { 0.0 });
            let solution = a
                .svd(true, true)
                .solve(&b, 1e-3)
                .map_err(|e| GeometryError::InvalidParameter(format!("offset solve: {e}")))?;
            let displacement = Vector3::new(solution[0], solution[1], solution[2]);
            let limit = 4.0 * thickness.abs();
            Ok(if displacement.norm() > limit {
                displacement.normalize() * limit
            } else {
                displacement
            })
        })
        .collect()
}
