// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Planar profiles (closed 2D outlines) and polygon predicates

use super::{GeometryError, GeometryResult};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const EPS: f64 = 1e-9;

/// Closed planar outline placed at an elevation on the Z axis.
/// Points are stored counter-clockwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    points: Vec<Point2<f64>>,
    elevation: f64,
}

impl Profile {
    /// Rectangle centered on the origin, `width` along X and `length` along Y
    pub fn rectangle(width: f64, length: f64) -> Self {
        let (hw, hl) = (width / 2.0, length / 2.0);
        Self {
            points: vec![
                Point2::new(-hw, -hl),
                Point2::new(hw, -hl),
                Point2::new(hw, hl),
                Point2::new(-hw, hl),
            ],
            elevation: 0.0,
        }
    }

    /// Regular polygon approximating a circle
    pub fn circle(radius: f64, segments: u32) -> Self {
        let segments = segments.max(3);
        let points = (0..segments)
            .map(|i| {
                let angle = 2.0 * PI * f64::from(i) / f64::from(segments);
                Point2::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect();
        Self {
            points,
            elevation: 0.0,
        }
    }

    /// Arbitrary outline; the winding is normalized to counter-clockwise
    pub fn polygon(mut points: Vec<Point2<f64>>) -> Self {
        if signed_area(&points) < 0.0 {
            points.reverse();
        }
        Self {
            points,
            elevation: 0.0,
        }
    }

    pub fn at_elevation(mut self, elevation: f64) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn area(&self) -> f64 {
        signed_area(&self.points).abs()
    }

    /// Check the outline can bound a face
    pub fn validate(&self) -> GeometryResult<()> {
        if self.points.len() < 3 {
            return Err(GeometryError::DegenerateProfile(format!(
                "{} points, need at least 3",
                self.points.len()
            )));
        }
        if self.points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(GeometryError::DegenerateProfile(
                "non-finite coordinate".into(),
            ));
        }
        if self.area() <= EPS * scale(&self.points).powi(2) {
            return Err(GeometryError::DegenerateProfile("zero area".into()));
        }
        if !is_simple(&self.points) {
            return Err(GeometryError::DegenerateProfile(
                "outline self-intersects".into(),
            ));
        }
        Ok(())
    }

    /// Indices of corners whose turning angle exceeds `threshold_deg`
    pub fn sharp_corners(&self, threshold_deg: f64) -> Vec<usize> {
        let n = self.points.len();
        let threshold = threshold_deg.to_radians();
        (0..n)
            .filter(|&i| {
                let prev = self.points[(i + n - 1) % n];
                let next = self.points[(i + 1) % n];
                turning_angle(&prev, &self.points[i], &next) > threshold
            })
            .collect()
    }

    /// Replace every sharp corner with a circular arc of `radius`.
    ///
    /// Arcs are sampled every `arc_step_deg` degrees. Fails when there is no
    /// sharp corner or when two neighbouring arcs would overlap on an edge.
    pub fn with_rounded_corners(&self, radius: f64, arc_step_deg: f64) -> GeometryResult<Profile> {
        if radius <= 0.0 || !radius.is_finite() {
            return Err(GeometryError::InvalidParameter(format!(
                "fillet radius {radius} must be positive"
            )));
        }
        let corners = self.sharp_corners(SHARP_CORNER_DEG);
        if corners.is_empty() {
            return Err(GeometryError::NoEdgesSelected);
        }

        let n = self.points.len();
        let step = arc_step_deg.clamp(1.0, 45.0).to_radians();
        let mut rounded = Vec::with_capacity(n + corners.len() * 8);

        for i in 0..n {
            let current = self.points[i];
            if !corners.contains(&i) {
                rounded.push(current);
                continue;
            }

            let prev = self.points[(i + n - 1) % n];
            let next = self.points[(i + 1) % n];
            let d_in = (current - prev).normalize();
            let d_out = (next - current).normalize();
            let turn = turning_angle(&prev, &current, &next);
            let setback = radius * (turn / 2.0).tan();

            // Each edge is shared by two corners, so each may use half of it
            let available = ((current - prev).norm() / 2.0).min((next - current).norm() / 2.0);
            if setback > available + EPS {
                return Err(GeometryError::FilletTooLarge { radius, corner: i });
            }

            let start = current - d_in * setback;
            let left_turn = cross(&d_in, &d_out) > 0.0;
            let side = if left_turn { 1.0 } else { -1.0 };
            let center = start + Vector2::new(-d_in.y, d_in.x) * (radius * side);

            let steps = (turn / step).ceil().max(1.0) as usize;
            let start_offset = start - center;
            for k in 0..=steps {
                let angle = side * turn * k as f64 / steps as f64;
                let (sin, cos) = angle.sin_cos();
                let rotated = Vector2::new(
                    start_offset.x * cos - start_offset.y * sin,
                    start_offset.x * sin + start_offset.y * cos,
                );
                rounded.push(center + rotated);
            }
        }

        dedup_closed(&mut rounded);
        let profile = Profile {
            points: rounded,
            elevation: self.elevation,
        };
        profile.validate()?;
        Ok(profile)
    }
}

/// Corners turning less than this are treated as tessellated curvature
const SHARP_CORNER_DEG: f64 = 20.0;

fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

fn turning_angle(prev: &Point2<f64>, current: &Point2<f64>, next: &Point2<f64>) -> f64 {
    let d_in = current - prev;
    let d_out = next - current;
    if d_in.norm() < EPS || d_out.norm() < EPS {
        return 0.0;
    }
    let cos = d_in.normalize().dot(&d_out.normalize()).clamp(-1.0, 1.0);
    cos.acos()
}

fn scale(points: &[Point2<f64>]) -> f64 {
    points
        .iter()
        .map(|p| p.x.abs().max(p.y.abs()))
        .fold(1.0, f64::max)
}

/// Drop consecutive duplicates, including a closing point equal to the first
fn dedup_closed(points: &mut Vec<Point2<f64>>) {
    points.dedup_by(|a, b| (*a - *b).norm() < EPS);
    while points.len() > 1 {
        let (first, last) = (points[0], points[points.len() - 1]);
        if (first - last).norm() < EPS {
            points.pop();
        } else {
            break;
        }
    }
}

/// Shoelace area, positive for counter-clockwise outlines
pub fn signed_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

/// Check if two 2D segments touch or cross
pub fn segments_intersect(
    p0: &Point2<f64>,
    p1: &Point2<f64>,
    q0: &Point2<f64>,
    q1: &Point2<f64>,
) -> bool {
    let orient = |a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>| cross(&(b - a), &(c - a));
    let eps = EPS * scale(&[*p0, *p1, *q0, *q1]).powi(2);

    let d1 = orient(q0, q1, p0);
    let d2 = orient(q0, q1, p1);
    let d3 = orient(p0, p1, q0);
    let d4 = orient(p0, p1, q1);

    if ((d1 > eps && d2 < -eps) || (d1 < -eps && d2 > eps))
        && ((d3 > eps && d4 < -eps) || (d3 < -eps && d4 > eps))
    {
        return true;
    }

    let on_segment = |a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>| {
        c.x >= a.x.min(b.x) - EPS
            && c.x <= a.x.max(b.x) + EPS
            && c.y >= a.y.min(b.y) - EPS
            && c.y <= a.y.max(b.y) + EPS
    };

    (d1.abs() <= eps && on_segment(q0, q1, p0))
        || (d2.abs() <= eps && on_segment(q0, q1, p1))
        || (d3.abs() <= eps && on_segment(p0, p1, q0))
        || (d4.abs() <= eps && on_segment(p0, p1, q1))
}

/// True when the closed outline has no repeated vertices, no crossing edges
/// and no edge folding back over its neighbour
pub fn is_simple(points: &[Point2<f64>]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        if (points[(i + 1) % n] - points[i]).norm() < EPS {
            return false;
        }
    }

    for i in 0..n {
        let a0 = points[i];
        let a1 = points[(i + 1) % n];
        for j in (i + 1)..n {
            let b0 = points[j];
            let b1 = points[(j + 1) % n];

            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            if adjacent {
                // Neighbours share one endpoint; they may only overlap there
                let (shared, a_far, b_far) = if j == i + 1 {
                    (a1, a0, b1)
                } else {
                    (a0, a1, b0)
                };
                let da = a_far - shared;
                let db = b_far - shared;
                let collinear = cross(&da, &db).abs() <= EPS * da.norm() * db.norm();
                if collinear && da.dot(&db) > 0.0 {
                    return false;
                }
                continue;
            }

            if segments_intersect(&a0, &a1, &b0, &b1) {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_is_ccw_and_valid() {
        let rect = Profile::rectangle(4.0, 2.0);
        assert!(signed_area(rect.points()) > 0.0);
        assert!((rect.area() - 8.0).abs() < 1e-12);
        assert!(rect.validate().is_ok());
    }

    #[test]
    fn test_polygon_normalizes_winding() {
        let cw = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 0.0),
        ];
        let profile = Profile::polygon(cw);
        assert!(signed_area(profile.points()) > 0.0);
    }

    #[test]
    fn test_bowtie_is_not_simple() {
        let bowtie = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        ];
        assert!(!is_simple(&bowtie));
        assert!(Profile::polygon(bowtie.to_vec()).validate().is_err());
    }

    #[test]
    fn test_concave_polygon_is_simple() {
        let l_shape = [
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        assert!(is_simple(&l_shape));
    }

    #[test]
    fn test_segments_touching_counts_as_intersection() {
        let a0 = Point2::new(0.0, 0.0);
        let a1 = Point2::new(2.0, 0.0);
        assert!(segments_intersect(&a0, &a1, &Point2::new(1.0, 0.0), &Point2::new(1.0, 3.0)));
        assert!(!segments_intersect(&a0, &a1, &Point2::new(0.0, 1.0), &Point2::new(2.0, 1.0)));
    }

    #[test]
    fn test_circle_has_no_sharp_corners() {
        let circle = Profile::circle(10.0, 41);
        assert!(circle.sharp_corners(SHARP_CORNER_DEG).is_empty());
        assert_eq!(
            circle.with_rounded_corners(1.0, 15.0),
            Err(GeometryError::NoEdgesSelected)
        );
    }

    #[test]
    fn test_rounded_square_corners() {
        let square = Profile::rectangle(10.0, 10.0);
        let rounded = square.with_rounded_corners(2.0, 15.0).unwrap();

        // 90 degree corners at 15 degree steps: 7 points per corner
        assert_eq!(rounded.len(), 4 * 7);
        let full = 100.0;
        let removed = (4.0 - PI) * 4.0;
        assert!((rounded.area() - (full - removed)).abs() < 0.2);
        assert!(rounded
            .points()
            .iter()
            .all(|p| p.x.abs() <= 5.0 + 1e-9 && p.y.abs() <= 5.0 + 1e-9));
    }

    #[test]
    fn test_oversized_fillet_is_rejected() {
        let square = Profile::rectangle(2.0, 2.0);
        assert!(matches!(
            square.with_rounded_corners(5.0, 15.0),
            Err(GeometryError::FilletTooLarge { .. })
        ));
    }
}
