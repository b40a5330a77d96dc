// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Constrained Delaunay triangulation of simple polygons

use super::{is_simple, GeometryError, GeometryResult};
use ahash::{AHashMap, AHashSet};
use nalgebra::Point2;
use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, Point2 as SpadePoint2, Triangulation};
use std::collections::VecDeque;

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Triangulate a simple polygon.
///
/// Returns counter-clockwise triangles indexing into `points`. The outline
/// must be simple; self-intersecting constraints are rejected up front.
pub fn triangulate_polygon(points: &[Point2<f64>]) -> GeometryResult<Vec<[usize; 3]>> {
    if points.len() < 3 {
        return Err(GeometryError::Triangulation(format!(
            "polygon needs at least 3 points, got {}",
            points.len()
        )));
    }
    if !is_simple(points) {
        return Err(GeometryError::Triangulation(
            "polygon outline is not simple".into(),
        ));
    }

    // Triangles are the outline itself; skip the CDT
    if points.len() == 3 {
        let area = (points[1] - points[0]).perp(&(points[2] - points[0]));
        return Ok(if area >= 0.0 {
            vec![[0, 1, 2]]
        } else {
            vec![[0, 2, 1]]
        });
    }

    let mut cdt = Cdt::new();
    let mut handles = Vec::with_capacity(points.len());
    let mut source_index: AHashMap<usize, usize> = AHashMap::with_capacity(points.len());

    for (i, p) in points.iter().enumerate() {
        let handle = cdt
            .insert(SpadePoint2::new(p.x, p.y))
            .map_err(|e| GeometryError::Triangulation(format!("CDT insert: {e:?}")))?;
        source_index.entry(handle.index()).or_insert(i);
        handles.push(handle);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from != to {
            cdt.add_constraint(from, to);
        }
    }

    let interior = classify_interior_faces(&cdt);
    let mut triangles = Vec::with_capacity(interior.len());

    for face in cdt.inner_faces() {
        if !interior.contains(&face.fix().index()) {
            continue;
        }
        let mut triangle = [0usize; 3];
        for (slot, vertex) in face.vertices().iter().enumerate() {
            triangle[slot] = *source_index.get(&vertex.fix().index()).ok_or_else(|| {
                GeometryError::Triangulation("triangulation introduced a vertex".into())
            })?;
        }
        triangles.push(triangle);
    }

    if triangles.is_empty() {
        return Err(GeometryError::Triangulation(
            "no interior triangles found".into(),
        ));
    }
    Ok(triangles)
}

/// Flood fill from the hull; crossing a constraint edge toggles inside/outside
fn classify_interior_faces(cdt: &Cdt) -> AHashSet<usize> {
    let mut interior = AHashSet::new();
    let mut depth_map: AHashMap<usize, u32> = AHashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer = cdt.outer_face().fix();
    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            let idx = inner.fix().index();
            if depth_map.contains_key(&idx) {
                continue;
            }
            let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(idx, depth);
            if depth % 2 == 1 {
                interior.insert(idx);
            }
            queue.push_back((inner.fix(), depth));
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        for edge in cdt.face(face_fix).adjacent_edges() {
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            let idx = neighbor.fix().index();
            if depth_map.contains_key(&idx) {
                continue;
            }
            let next_depth = if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                depth + 1
            } else {
                depth
            };
            depth_map.insert(idx, next_depth);
            if next_depth % 2 == 1 {
                interior.insert(idx);
            }
            queue.push_back((neighbor.fix(), next_depth));
        }
    }

    interior
}
