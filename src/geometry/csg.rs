// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CSG (Constructive Solid Geometry) operations using BSP trees.
//!
//! Nodes live in an arena and every traversal uses an explicit stack, so
//! convex inputs (which degrade the tree into a chain) cannot overflow the
//! call stack.

use super::mesh_utils::overloaded_edge_count;
use super::{is_manifold, GeometryError, GeometryResult, Mesh, Triangle, Vertex};
use nalgebra::{Point3, Vector3};

const EPSILON: f64 = 1e-6;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// Limits applied to every boolean
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CsgOptions {
    /// Combined triangle count of both operands
    pub max_polygons: usize,
    /// Distance under which output vertices are merged
    pub weld_epsilon: f64,
}

impl Default for CsgOptions {
    fn default() -> Self {
        Self {
            max_polygons: 4000,
            weld_epsilon: 1e-7,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: Vector3<f64>,
    w: f64,
}

impl Plane {
    fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Self> {
        let normal = (b - a).cross(&(c - a));
        let length = normal.norm();
        if length < 1e-12 {
            return None;
        }
        let normal = normal / length;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    /// Sort `polygon` into the four output lists, splitting it when it spans
    /// the plane
    fn split_polygon(
        &self,
        polygon: &Polygon,
        coplanar_front: &mut Vec<Polygon>,
        coplanar_back: &mut Vec<Polygon>,
        front: &mut Vec<Polygon>,
        back: &mut Vec<Polygon>,
    ) {
        let mut polygon_type = COPLANAR;
        let types: Vec<u8> = polygon
            .vertices
            .iter()
            .map(|v| {
                let t = self.normal.dot(&v.coords) - self.w;
                let vertex_type = if t < -EPSILON {
                    BACK
                } else if t > EPSILON {
                    FRONT
                } else {
                    COPLANAR
                };
                polygon_type |= vertex_type;
                vertex_type
            })
            .collect();

        match polygon_type {
            COPLANAR => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    coplanar_front.push(polygon.clone());
                } else {
                    coplanar_back.push(polygon.clone());
                }
            }
            FRONT => front.push(polygon.clone()),
            BACK => back.push(polygon.clone()),
            _ => {
                let n = polygon.vertices.len();
                let mut f = Vec::with_capacity(n + 1);
                let mut b = Vec::with_capacity(n + 1);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (ti, tj) = (types[i], types[j]);
                    let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                    if ti != BACK {
                        f.push(vi);
                    }
                    if ti != FRONT {
                        b.push(vi);
                    }
                    if (ti | tj) == SPANNING {
                        let t = (self.w - self.normal.dot(&vi.coords))
                            / self.normal.dot(&(vj - vi));
                        let v = vi + (vj - vi) * t;
                        f.push(v);
                        b.push(v);
                    }
                }
                if f.len() >= 3 {
                    front.push(Polygon {
                        vertices: f,
                        plane: polygon.plane,
                    });
                }
                if b.len() >= 3 {
                    back.push(Polygon {
                        vertices: b,
                        plane: polygon.plane,
                    });
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Polygon {
    vertices: Vec<Point3<f64>>,
    plane: Plane,
}

impl Polygon {
    fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }
}

#[derive(Debug, Default)]
struct Node {
    plane: Option<Plane>,
    front: Option<usize>,
    back: Option<usize>,
    polygons: Vec<Polygon>,
}

/// BSP tree stored as an arena; node 0 is the root
#[derive(Debug)]
struct BspTree {
    nodes: Vec<Node>,
}

impl BspTree {
    fn new(polygons: Vec<Polygon>) -> Self {
        let mut tree = Self {
            nodes: vec![Node::default()],
        };
        tree.build(polygons);
        tree
    }

    fn build(&mut self, polygons: Vec<Polygon>) {
        let mut stack = vec![(0usize, polygons)];
        while let Some((index, polygons)) = stack.pop() {
            if polygons.is_empty() {
                continue;
            }
            let plane = *self.nodes[index].plane.get_or_insert(polygons[0].plane);

            let mut coplanar = Vec::new();
            let mut front = Vec::new();
            let mut back = Vec::new();
            for polygon in &polygons {
                let mut coplanar_back = Vec::new();
                plane.split_polygon(polygon, &mut coplanar, &mut coplanar_back, &mut front, &mut back);
                coplanar.append(&mut coplanar_back);
            }
            self.nodes[index].polygons.append(&mut coplanar);

            if !front.is_empty() {
                let child = self.child(index, FRONT);
                stack.push((child, front));
            }
            if !back.is_empty() {
                let child = self.child(index, BACK);
                stack.push((child, back));
            }
        }
    }

    /// Existing child on `side`, or a fresh empty node linked there
    fn child(&mut self, index: usize, side: u8) -> usize {
        let existing = if side == FRONT {
            self.nodes[index].front
        } else {
            self.nodes[index].back
        };
        if let Some(child) = existing {
            return child;
        }
        let child = self.nodes.len();
        self.nodes.push(Node::default());
        if side == FRONT {
            self.nodes[index].front = Some(child);
        } else {
            self.nodes[index].back = Some(child);
        }
        child
    }

    fn polygon_count(&self) -> usize {
        self.nodes.iter().map(|n| n.polygons.len()).sum()
    }

    fn all_polygons(&self) -> Vec<Polygon> {
        self.nodes
            .iter()
            .flat_map(|n| n.polygons.iter().cloned())
            .collect()
    }

    /// Turn solid space into empty space and vice versa
    fn invert(&mut self) {
        for node in &mut self.nodes {
            for polygon in &mut node.polygons {
                polygon.flip();
            }
            if let Some(plane) = node.plane.as_mut() {
                plane.flip();
            }
            std::mem::swap(&mut node.front, &mut node.back);
        }
    }

    /// Remove the parts of `polygons` that lie inside this tree's solid
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut kept = Vec::with_capacity(polygons.len());
        let mut stack = vec![(0usize, polygons)];

        while let Some((index, polygons)) = stack.pop() {
            let node = &self.nodes[index];
            let Some(plane) = node.plane else {
                kept.extend(polygons);
                continue;
            };

            let mut front = Vec::new();
            let mut back = Vec::new();
            for polygon in &polygons {
                let mut coplanar_front = Vec::new();
                let mut coplanar_back = Vec::new();
                plane.split_polygon(
                    polygon,
                    &mut coplanar_front,
                    &mut coplanar_back,
                    &mut front,
                    &mut back,
                );
                front.append(&mut coplanar_front);
                back.append(&mut coplanar_back);
            }

            match node.front {
                Some(child) => stack.push((child, front)),
                None => kept.extend(front),
            }
            if let Some(child) = node.back {
                stack.push((child, back));
            }
        }

        kept
    }

    /// Remove every polygon of this tree that lies inside `other`
    fn clip_to(&mut self, other: &BspTree) {
        for node in &mut self.nodes {
            let polygons = std::mem::take(&mut node.polygons);
            node.polygons = other.clip_polygons(polygons);
        }
    }
}

fn mesh_to_polygons(mesh: &Mesh) -> Vec<Polygon> {
    mesh.triangles
        .iter()
        .filter_map(|triangle| {
            let [a, b, c] = mesh.corners(triangle);
            Plane::from_points(&a, &b, &c).map(|plane| Polygon {
                vertices: vec![a, b, c],
                plane,
            })
        })
        .collect()
}

fn polygons_to_mesh(polygons: &[Polygon], weld_epsilon: f64) -> Mesh {
    let vertex_total = polygons.iter().map(|p| p.vertices.len()).sum();
    let mut mesh = Mesh::with_capacity(vertex_total, vertex_total);

    for polygon in polygons {
        let indices: Vec<usize> = polygon
            .vertices
            .iter()
            .map(|p| mesh.add_vertex(Vertex::new(*p, polygon.plane.normal)))
            .collect();
        // Split polygons stay convex, so a fan is enough
        for k in 1..indices.len().saturating_sub(1) {
            mesh.add_triangle(Triangle::new([indices[0], indices[k], indices[k + 1]]));
        }
    }

    mesh.weld_vertices(weld_epsilon);
    mesh.remove_degenerate_triangles();
    mesh.remove_orphaned_vertices();
    mesh.recompute_normals();
    mesh
}

fn prepare(a: &Mesh, b: &Mesh, options: &CsgOptions) -> GeometryResult<(BspTree, BspTree)> {
    for mesh in [a, b] {
        if mesh.is_empty() {
            return Err(GeometryError::EmptyResult);
        }
        if !is_manifold(mesh) {
            return Err(GeometryError::NonManifold {
                bad_edges: overloaded_edge_count(mesh),
            });
        }
    }
    let polygons = a.triangle_count() + b.triangle_count();
    if polygons > options.max_polygons {
        return Err(GeometryError::TooComplex {
            polygons,
            limit: options.max_polygons,
        });
    }
    Ok((
        BspTree::new(mesh_to_polygons(a)),
        BspTree::new(mesh_to_polygons(b)),
    ))
}

fn finish(tree: &BspTree, options: &CsgOptions) -> GeometryResult<Mesh> {
    if tree.polygon_count() == 0 {
        return Err(GeometryError::EmptyResult);
    }
    let mesh = polygons_to_mesh(&tree.all_polygons(), options.weld_epsilon);
    if mesh.is_empty() {
        return Err(GeometryError::EmptyResult);
    }
    Ok(mesh)
}

/// Volume covered by either mesh
pub fn csg_union(a: &Mesh, b: &Mesh, options: &CsgOptions) -> GeometryResult<Mesh> {
    let (mut tree_a, mut tree_b) = prepare(a, b, options)?;

    tree_a.clip_to(&tree_b);
    tree_b.clip_to(&tree_a);
    tree_b.invert();
    tree_b.clip_to(&tree_a);
    tree_b.invert();
    tree_a.build(tree_b.all_polygons());

    finish(&tree_a, options)
}

/// Volume of `a` not covered by `b`
pub fn csg_difference(a: &Mesh, b: &Mesh, options: &CsgOptions) -> GeometryResult<Mesh> {
    let (mut tree_a, mut tree_b) = prepare(a, b, options)?;

    tree_a.invert();
    tree_a.clip_to(&tree_b);
    tree_b.clip_to(&tree_a);
    tree_b.invert();
    tree_b.clip_to(&tree_a);
    tree_b.invert();
    tree_a.build(tree_b.all_polygons());
    tree_a.invert();

    finish(&tree_a, options)
}

/// Volume covered by both meshes
pub fn csg_intersection(a: &Mesh, b: &Mesh, options: &CsgOptions) -> GeometryResult<Mesh> {
    let (mut tree_a, mut tree_b) = prepare(a, b, options)?;

    tree_a.invert();
    tree_b.clip_to(&tree_a);
    tree_b.invert();
    tree_a.clip_to(&tree_b);
    tree_b.clip_to(&tree_a);
    tree_a.build(tree_b.all_polygons());
    tree_a.invert();

    finish(&tree_a, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{prism, Profile};
    use approx::assert_relative_eq;
    use nalgebra::{Matrix4, Vector3};

    fn cube(size: f64, offset: Vector3<f64>) -> Mesh {
        let mut mesh = prism(&Profile::rectangle(size, size), size).unwrap();
        mesh.transform(&Matrix4::new_translation(&offset));
        mesh
    }

    #[test]
    fn test_union_of_overlapping_cubes() {
        let a = cube(2.0, Vector3::zeros());
        let b = cube(2.0, Vector3::new(1.0, 0.0, 0.0));
        let result = csg_union(&a, &b, &CsgOptions::default()).unwrap();

        assert_relative_eq!(result.signed_volume(), 12.0, epsilon = 1e-6);
        let bbox = result.bounding_box();
        assert_relative_eq!(bbox.min.x, -1.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.max.x, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_difference_removes_overlap() {
        let a = cube(2.0, Vector3::zeros());
        let b = cube(2.0, Vector3::new(1.0, 0.0, 0.0));
        let result = csg_difference(&a, &b, &CsgOptions::default()).unwrap();
        assert_relative_eq!(result.signed_volume(), 4.0, epsilon = 1e-6);
        assert_relative_eq!(result.bounding_box().max.x, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_intersection_keeps_overlap() {
        let a = cube(2.0, Vector3::zeros());
        let b = cube(2.0, Vector3::new(1.0, 0.0, 0.0));
        let result = csg_intersection(&a, &b, &CsgOptions::default()).unwrap();
        assert_relative_eq!(result.signed_volume(), 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_disjoint_intersection_is_empty() {
        let a = cube(1.0, Vector3::zeros());
        let b = cube(1.0, Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(
            csg_intersection(&a, &b, &CsgOptions::default()).unwrap_err(),
            GeometryError::EmptyResult
        );
    }

    #[test]
    fn test_drilled_cylinder_volume() {
        let block = cube(10.0, Vector3::zeros());
        let mut drill = prism(&Profile::circle(2.0, 32), 20.0).unwrap();
        drill.transform(&Matrix4::new_translation(&Vector3::new(0.0, 0.0, -5.0)));

        let result = csg_difference(&block, &drill, &CsgOptions::default()).unwrap();
        let hole = Profile::circle(2.0, 32).area() * 10.0;
        assert_relative_eq!(result.signed_volume(), 1000.0 - hole, max_relative = 1e-6);
    }

    #[test]
    fn test_polygon_limit() {
        let a = cube(1.0, Vector3::zeros());
        let b = cube(1.0, Vector3::new(0.5, 0.0, 0.0));
        let options = CsgOptions {
            max_polygons: 10,
            ..CsgOptions::default()
        };
        assert!(matches!(
            csg_union(&a, &b, &options),
            Err(GeometryError::TooComplex { polygons: 24, limit: 10 })
        ));
    }
}
