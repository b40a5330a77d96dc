// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Solid generators: prism, loft, revolve, sweep and threaded rod.
//!
//! Every generator builds rings of points, stitches consecutive rings with
//! quads and closes the ends with triangulated caps. Winding is consistent
//! by construction; `orient_outward` then fixes the global sign.

use super::{
    triangulate_polygon, GeometryError, GeometryResult, Mesh, Profile, Triangle, Vertex,
};
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const WELD_EPSILON: f64 = 1e-9;

/// Rows of the thread height field per pitch
const THREAD_ROWS_PER_PITCH: f64 = 12.0;

/// Threaded rods larger than this are rejected rather than generated
const MAX_THREAD_VERTICES: usize = 500_000;

/// Thread tooth shape over one pitch, as fractions of the pitch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToothProfile {
    /// Radial depth from crest to root
    pub depth: f64,
    /// Width of the flat crest
    pub crest: f64,
    /// Width of the flat root
    pub root: f64,
}

impl ToothProfile {
    /// ISO metric 60 degree profile for the given pitch
    pub fn iso(pitch: f64) -> Self {
        Self {
            depth: 0.5413 * pitch,
            crest: 0.125,
            root: 0.25,
        }
    }

    /// Fraction of `depth` reached at `phase` in [0, 1)
    fn height_at(&self, phase: f64) -> f64 {
        let root_half = self.root / 2.0;
        let crest_lo = 0.5 - self.crest / 2.0;
        let crest_hi = 0.5 + self.crest / 2.0;

        if phase < root_half || phase >= 1.0 - root_half {
            0.0
        } else if phase < crest_lo {
            (phase - root_half) / (crest_lo - root_half)
        } else if phase <= crest_hi {
            1.0
        } else {
            (1.0 - root_half - phase) / (1.0 - root_half - crest_hi)
        }
    }
}

/// Helix a thread tooth is swept along
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Helix {
    pub major_radius: f64,
    pub pitch: f64,
    pub turns: f64,
    /// Rod length; the part above `turns * pitch` is plain shank
    pub length: f64,
    pub segments_per_turn: u32,
}

/// Extrude a profile along +Z from its elevation
pub fn prism(profile: &Profile, height: f64) -> GeometryResult<Mesh> {
    profile.validate()?;
    if !(height > 0.0 && height.is_finite()) {
        return Err(GeometryError::InvalidParameter(format!(
            "extrusion height {height} must be positive"
        )));
    }

    let base = profile.elevation();
    let bottom = lift(profile.points(), base);
    let top = lift(profile.points(), base + height);
    let cap = triangulate_polygon(profile.points())?;

    Ok(finish(stitch_rings(
        &[bottom, top],
        false,
        Some(Caps {
            first: cap.clone(),
            last: cap,
        }),
    )))
}

/// Ruled loft between two profiles with the same point count
pub fn loft(bottom: &Profile, top: &Profile) -> GeometryResult<Mesh> {
    bottom.validate()?;
    top.validate()?;
    if bottom.len() != top.len() {
        return Err(GeometryError::IncompatibleProfiles(format!(
            "point counts differ ({} vs {})",
            bottom.len(),
            top.len()
        )));
    }
    if top.elevation() <= bottom.elevation() {
        return Err(GeometryError::IncompatibleProfiles(
            "top profile must sit above the bottom profile".into(),
        ));
    }

    let caps = Caps {
        first: triangulate_polygon(bottom.points())?,
        last: triangulate_polygon(top.points())?,
    };
    let rings = [
        lift(bottom.points(), bottom.elevation()),
        lift(top.points(), top.elevation()),
    ];
    Ok(finish(stitch_rings(&rings, false, Some(caps))))
}

/// Revolve a closed (r, z) outline around the Z axis.
///
/// A full turn wraps the rings and needs no caps; a partial turn is capped
/// with the outline at both ends.
pub fn revolve(outline: &[Point2<f64>], angle_deg: f64, segments: u32) -> GeometryResult<Mesh> {
    if !(angle_deg > 0.0 && angle_deg <= 360.0) {
        return Err(GeometryError::InvalidParameter(format!(
            "revolve angle {angle_deg} outside (0, 360]"
        )));
    }
    if outline.iter().any(|p| p.x < -WELD_EPSILON) {
        return Err(GeometryError::DegenerateProfile(
            "revolve outline crosses the axis".into(),
        ));
    }
    let profile = Profile::polygon(outline.to_vec());
    profile.validate()?;

    let full = (angle_deg - 360.0).abs() < 1e-9;
    let steps = ((f64::from(segments.max(3)) * angle_deg / 360.0).ceil() as usize).max(1);
    let ring_count = if full { steps } else { steps + 1 };
    let sweep = angle_deg.to_radians();

    let rings: Vec<Vec<Point3<f64>>> = (0..ring_count)
        .map(|k| {
            let theta = sweep * k as f64 / steps as f64;
            let (sin, cos) = theta.sin_cos();
            profile
                .points()
                .iter()
                .map(|p| Point3::new(p.x.max(0.0) * cos, p.x.max(0.0) * sin, p.y))
                .collect()
        })
        .collect();

    let caps = if full {
        None
    } else {
        let cap = triangulate_polygon(profile.points())?;
        Some(Caps {
            first: cap.clone(),
            last: cap,
        })
    };

    let mesh = finish(stitch_rings(&rings, full, caps));
    if mesh.is_empty() {
        return Err(GeometryError::EmptyResult);
    }
    Ok(mesh)
}

/// Sweep a cross-section along a polyline path.
///
/// The section starts perpendicular to the first segment with its local Y
/// axis as close to world Z as possible. At each interior point it is
/// projected onto the mitre plane bisecting the turn.
pub fn sweep(section: &Profile, path: &[Point3<f64>]) -> GeometryResult<Mesh> {
    section.validate()?;
    if path.len() < 2 {
        return Err(GeometryError::DegeneratePath(format!(
            "{} points, need at least 2",
            path.len()
        )));
    }

    let mut directions = Vec::with_capacity(path.len() - 1);
    for (i, pair) in path.windows(2).enumerate() {
        let d = pair[1] - pair[0];
        if d.norm() < WELD_EPSILON {
            return Err(GeometryError::DegeneratePath(format!(
                "points {i} and {} coincide",
                i + 1
            )));
        }
        directions.push(d.normalize());
    }

    let d0 = directions[0];
    let up = project_out(&Vector3::z(), &d0)
        .or_else(|| project_out(&Vector3::y(), &d0))
        .ok_or_else(|| GeometryError::DegeneratePath("cannot frame the first segment".into()))?;
    let side = up.cross(&d0);

    let first: Vec<Point3<f64>> = section
        .points()
        .iter()
        .map(|p| path[0] + side * p.x + up * p.y)
        .collect();

    let mut rings = Vec::with_capacity(path.len());
    rings.push(first);

    for k in 1..path.len() {
        let d_in = directions[k - 1];
        let plane_normal = if k == path.len() - 1 {
            d_in
        } else {
            let bisector = d_in + directions[k];
            if bisector.norm() < 1e-6 {
                return Err(GeometryError::DegeneratePath(format!(
                    "path reverses direction at point {k}"
                )));
            }
            bisector.normalize()
        };

        let alignment = d_in.dot(&plane_normal);
        if alignment < 1e-3 {
            return Err(GeometryError::DegeneratePath(format!(
                "turn at point {k} is too sharp"
            )));
        }

        let previous = &rings[k - 1];
        let ring = previous
            .iter()
            .map(|q| {
                let s = (path[k] - q).dot(&plane_normal) / alignment;
                q + d_in * s
            })
            .collect();
        rings.push(ring);
    }

    let cap = triangulate_polygon(section.points())?;
    Ok(finish(stitch_rings(
        &rings,
        false,
        Some(Caps {
            first: cap.clone(),
            last: cap,
        }),
    )))
}

/// Threaded rod along +Z from z = 0, built as a radial height field
pub fn helical_sweep(tooth: &ToothProfile, helix: &Helix) -> GeometryResult<Mesh> {
    let Helix {
        major_radius,
        pitch,
        turns,
        length,
        segments_per_turn,
    } = *helix;

    for (name, value) in [
        ("major radius", major_radius),
        ("pitch", pitch),
        ("turns", turns),
        ("length", length),
        ("tooth depth", tooth.depth),
    ] {
        if !(value > 0.0 && value.is_finite()) {
            return Err(GeometryError::InvalidParameter(format!(
                "{name} {value} must be positive"
            )));
        }
    }
    if tooth.crest < 0.0 || tooth.root < 0.0 || tooth.crest + tooth.root >= 1.0 {
        return Err(GeometryError::InvalidParameter(
            "tooth crest and root must leave room for the flanks".into(),
        ));
    }
    let root_radius = major_radius - tooth.depth;
    if root_radius <= 0.0 {
        return Err(GeometryError::InvalidParameter(format!(
            "thread depth {:.3} leaves no core inside radius {major_radius}",
            tooth.depth
        )));
    }

    let columns = segments_per_turn.max(8) as usize;
    // Sized in f64 first; extreme length/pitch ratios do not fit a usize
    let row_estimate = (length / pitch * THREAD_ROWS_PER_PITCH).ceil().max(1.0);
    let vertex_estimate = (row_estimate + 1.0) * columns as f64;
    if !(vertex_estimate <= MAX_THREAD_VERTICES as f64) {
        return Err(GeometryError::TooComplex {
            polygons: (vertex_estimate.min(usize::MAX as f64) as usize).saturating_mul(2),
            limit: MAX_THREAD_VERTICES * 2,
        });
    }
    let rows = row_estimate as usize;

    let thread_end = (turns * pitch).min(length);
    let rings: Vec<Vec<Point3<f64>>> = (0..=rows)
        .map(|row| {
            let z = length * row as f64 / rows as f64;
            (0..columns)
                .map(|col| {
                    let theta = 2.0 * PI * col as f64 / columns as f64;
                    let radius = if z > thread_end + WELD_EPSILON {
                        major_radius
                    } else {
                        let phase = (z / pitch - theta / (2.0 * PI)).rem_euclid(1.0);
                        root_radius + tooth.depth * tooth.height_at(phase)
                    };
                    Point3::new(radius * theta.cos(), radius * theta.sin(), z)
                })
                .collect()
        })
        .collect();

    let planar = |ring: &[Point3<f64>]| -> Vec<Point2<f64>> {
        ring.iter().map(|p| Point2::new(p.x, p.y)).collect()
    };
    let caps = Caps {
        first: triangulate_polygon(&planar(&rings[0]))?,
        last: triangulate_polygon(&planar(&rings[rows]))?,
    };

    Ok(finish(stitch_rings(&rings, false, Some(caps))))
}

/// Cap triangles indexing into the first and last ring
struct Caps {
    first: Vec<[usize; 3]>,
    last: Vec<[usize; 3]>,
}

fn lift(points: &[Point2<f64>], z: f64) -> Vec<Point3<f64>> {
    points.iter().map(|p| Point3::new(p.x, p.y, z)).collect()
}

/// Component of `v` perpendicular to the unit vector `axis`, normalized
fn project_out(v: &Vector3<f64>, axis: &Vector3<f64>) -> Option<Vector3<f64>> {
    let perpendicular = v - axis * v.dot(axis);
    (perpendicular.norm() > 1e-6).then(|| perpendicular.normalize())
}

fn stitch_rings(rings: &[Vec<Point3<f64>>], wrap: bool, caps: Option<Caps>) -> Mesh {
    let ring_count = rings.len();
    let n = rings.first().map_or(0, Vec::len);
    let cap_triangles = caps.as_ref().map_or(0, |c| c.first.len() + c.last.len());
    let mut mesh = Mesh::with_capacity(n * ring_count, 2 * n * ring_count + cap_triangles);
    if ring_count < 2 || n < 3 {
        return mesh;
    }

    for ring in rings {
        for p in ring {
            mesh.add_vertex(Vertex::at(*p));
        }
    }

    let index = |ring: usize, i: usize| ring * n + i;
    let spans = if wrap { ring_count } else { ring_count - 1 };
    for r in 0..spans {
        let next = (r + 1) % ring_count;
        for i in 0..n {
            let j = (i + 1) % n;
            mesh.add_triangle(Triangle::new([index(r, i), index(r, j), index(next, j)]));
            mesh.add_triangle(Triangle::new([index(r, i), index(next, j), index(next, i)]));
        }
    }

    if let Some(caps) = caps {
        let last = ring_count - 1;
        for [a, b, c] in caps.first {
            mesh.add_triangle(Triangle::new([index(0, a), index(0, c), index(0, b)]));
        }
        for [a, b, c] in caps.last {
            mesh.add_triangle(Triangle::new([index(last, a), index(last, b), index(last, c)]));
        }
    }

    mesh
}

fn finish(mut mesh: Mesh) -> Mesh {
    mesh.weld_vertices(WELD_EPSILON);
    mesh.remove_degenerate_triangles();
    mesh.remove_orphaned_vertices();
    mesh.orient_outward();
    mesh.recompute_normals();
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::is_closed;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_prism() {
        let mesh = prism(&Profile::rectangle(2.0, 3.0), 4.0).unwrap();
        assert!(is_closed(&mesh));
        assert_relative_eq!(mesh.signed_volume(), 24.0, epsilon = 1e-9);

        let bbox = mesh.bounding_box();
        assert_relative_eq!(bbox.min.x, -1.0);
        assert_relative_eq!(bbox.max.y, 1.5);
        assert_relative_eq!(bbox.max.z, 4.0);
    }

    #[test]
    fn test_prism_rejects_zero_height() {
        assert!(prism(&Profile::rectangle(1.0, 1.0), 0.0).is_err());
    }

    #[test]
    fn test_loft_frustum_volume() {
        let segments = 64;
        let bottom = Profile::circle(2.0, segments);
        let top = Profile::circle(1.0, segments).at_elevation(3.0);
        let mesh = loft(&bottom, &top).unwrap();
        assert!(is_closed(&mesh));

        // Polygonal frustum: h/3 * (A1 + A2 + sqrt(A1*A2))
        let (a1, a2) = (bottom.area(), Profile::circle(1.0, segments).area());
        let expected = 3.0 / 3.0 * (a1 + a2 + (a1 * a2).sqrt());
        assert_relative_eq!(mesh.signed_volume(), expected, max_relative = 1e-3);
    }

    #[test]
    fn test_loft_rejects_mismatched_profiles() {
        let bottom = Profile::circle(2.0, 16);
        let top = Profile::circle(1.0, 24).at_elevation(1.0);
        assert!(matches!(
            loft(&bottom, &top),
            Err(GeometryError::IncompatibleProfiles(_))
        ));
    }

    #[test]
    fn test_full_revolve_is_closed() {
        // Rectangle touching the axis: a solid cylinder r=2, h=5
        let outline = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 5.0),
            Point2::new(0.0, 5.0),
        ];
        let mesh = revolve(&outline, 360.0, 48).unwrap();
        assert!(is_closed(&mesh));
        let expected = Profile::circle(2.0, 48).area() * 5.0;
        assert_relative_eq!(mesh.signed_volume(), expected, max_relative = 1e-9);
    }

    #[test]
    fn test_partial_revolve_is_capped() {
        let ring = [
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
        ];
        let mesh = revolve(&ring, 90.0, 64).unwrap();
        assert!(is_closed(&mesh));
        assert!(mesh.signed_volume() > 0.0);
        assert!(mesh.bounding_box().min.x > -1e-9);
    }

    #[test]
    fn test_straight_sweep_matches_prism() {
        let section = Profile::rectangle(2.0, 2.0);
        let path = [Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)];
        let mesh = sweep(&section, &path).unwrap();
        assert!(is_closed(&mesh));
        assert_relative_eq!(mesh.signed_volume(), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bent_sweep_is_closed() {
        let section = Profile::circle(2.0, 16);
        let path = [
            Point3::new(75.0, 0.0, 20.0),
            Point3::new(90.0, 0.0, 20.0),
            Point3::new(90.0, 0.0, 55.0),
            Point3::new(75.0, 0.0, 70.0),
        ];
        let mesh = sweep(&section, &path).unwrap();
        assert!(is_closed(&mesh));
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_sweep_rejects_u_turn() {
        let path = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        assert!(matches!(
            sweep(&Profile::rectangle(1.0, 1.0), &path),
            Err(GeometryError::DegeneratePath(_))
        ));
    }

    #[test]
    fn test_threaded_rod() {
        let helix = Helix {
            major_radius: 3.0,
            pitch: 1.0,
            turns: 5.0,
            length: 5.0,
            segments_per_turn: 48,
        };
        let tooth = ToothProfile::iso(helix.pitch);
        let mesh = helical_sweep(&tooth, &helix).unwrap();
        assert!(is_closed(&mesh));

        let volume = mesh.signed_volume();
        let core = PI * (3.0 - tooth.depth).powi(2) * 5.0;
        let outer = PI * 9.0 * 5.0;
        assert!(volume > core && volume < outer);
        assert_relative_eq!(mesh.bounding_box().max.z, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_thread_deeper_than_radius_fails() {
        let helix = Helix {
            major_radius: 1.0,
            pitch: 4.0,
            turns: 2.0,
            length: 8.0,
            segments_per_turn: 48,
        };
        assert!(matches!(
            helical_sweep(&ToothProfile::iso(helix.pitch), &helix),
            Err(GeometryError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_thread_with_extreme_pitch_ratio_is_too_complex() {
        let helix = Helix {
            major_radius: 3.0,
            pitch: 1e-300,
            turns: 1.0,
            length: 1e300,
            segments_per_turn: 48,
        };
        assert!(matches!(
            helical_sweep(&ToothProfile::iso(helix.pitch), &helix),
            Err(GeometryError::TooComplex { .. })
        ));

        let fine = Helix {
            pitch: 0.001,
            length: 100.0,
            ..helix
        };
        assert!(matches!(
            helical_sweep(&ToothProfile::iso(fine.pitch), &fine),
            Err(GeometryError::TooComplex { .. })
        ));
    }

    #[test]
    fn test_tooth_profile_shape() {
        let tooth = ToothProfile::iso(1.0);
        assert_eq!(tooth.height_at(0.0), 0.0);
        assert_eq!(tooth.height_at(0.5), 1.0);
        let mid_flank = tooth.height_at(0.28125);
        assert!(mid_flank > 0.4 && mid_flank < 0.6);
    }
}
