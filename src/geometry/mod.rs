// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - mesh representation and the construction algorithms
//! behind the mesh kernel

mod analytics;
mod bbox;
mod csg;
mod mesh;
mod mesh_utils;
mod offset;
mod primitives;
mod profile;
mod triangulate;

pub use analytics::{analyze, GeometryStats};
pub use bbox::BoundingBox;
pub use csg::{csg_difference, csg_intersection, csg_union, CsgOptions};
pub use mesh::{Mesh, Triangle, Vertex};
pub use mesh_utils::{is_closed, is_manifold, open_edge_count};
pub use offset::shell;
pub use primitives::{helical_sweep, loft, prism, revolve, sweep, Helix, ToothProfile};
pub use profile::{is_simple, segments_intersect, signed_area, Profile};
pub use triangulate::triangulate_polygon;

use thiserror::Error;

/// Failures raised while constructing or modifying geometry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("degenerate profile: {0}")]
    DegenerateProfile(String),

    #[error("incompatible profiles: {0}")]
    IncompatibleProfiles(String),

    #[error("degenerate path: {0}")]
    DegeneratePath(String),

    #[error("mesh is not manifold ({bad_edges} offending edges)")]
    NonManifold { bad_edges: usize },

    #[error("input too complex ({polygons} polygons, limit {limit})")]
    TooComplex { polygons: usize, limit: usize },

    #[error("operation produced an empty solid")]
    EmptyResult,

    #[error("wall thickness {thickness} does not fit the solid")]
    WallTooThick { thickness: f64 },

    #[error("no sharp vertical edges to fillet")]
    NoEdgesSelected,

    #[error("fillet radius {radius} does not fit at corner {corner}")]
    FilletTooLarge { radius: f64, corner: usize },

    #[error("triangulation failed: {0}")]
    Triangulation(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type GeometryResult<T> = std::result::Result<T, GeometryError>;
