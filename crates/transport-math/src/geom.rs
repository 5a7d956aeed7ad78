// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Plane Geometry
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! 2-D points, lines, circles and axis-aligned boxes for ray tracing.

use crate::fp::fp_equiv_abs;
use std::ops::{Add, Mul, Sub};
use transport_types::constants::REAL_FUZZ;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Point2 { x, y }
    }

    pub fn distance(self, other: Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(self, other: Point2) -> Point2 {
        Point2::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }

    /// Azimuth of the point about the origin, in [0, 2π).
    pub fn azimuth(self) -> f64 {
        let a = self.y.atan2(self.x);
        if a < 0.0 {
            a + 2.0 * std::f64::consts::PI
        } else {
            a
        }
    }

    pub fn equiv(self, other: Point2) -> bool {
        fp_equiv_abs(self.x, other.x) && fp_equiv_abs(self.y, other.y)
    }
}

impl Add for Point2 {
    type Output = Point2;
    fn add(self, o: Point2) -> Point2 {
        Point2::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for Point2 {
    type Output = Point2;
    fn sub(self, o: Point2) -> Point2 {
        Point2::new(self.x - o.x, self.y - o.y)
    }
}

impl Mul<f64> for Point2 {
    type Output = Point2;
    fn mul(self, s: f64) -> Point2 {
        Point2::new(self.x * s, self.y * s)
    }
}

/// Line segment from `p1` to `p2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub p1: Point2,
    pub p2: Point2,
}

impl Line {
    pub const fn new(p1: Point2, p2: Point2) -> Self {
        Line { p1, p2 }
    }

    /// Intersection of two segments, excluding parallel overlap.
    pub fn intersect(&self, other: &Line) -> Option<Point2> {
        let r = self.p2 - self.p1;
        let s = other.p2 - other.p1;
        let denom = r.x * s.y - r.y * s.x;
        if denom.abs() < REAL_FUZZ {
            return None;
        }
        let q = other.p1 - self.p1;
        let t = (q.x * s.y - q.y * s.x) / denom;
        let u = (q.x * r.y - q.y * r.x) / denom;
        let fuzz = 1.0e-12;
        if t < -fuzz || t > 1.0 + fuzz || u < -fuzz || u > 1.0 + fuzz {
            return None;
        }
        Some(self.p1 + r * t)
    }
}

/// Circle of radius `r` centered on `c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub c: Point2,
    pub r: f64,
}

impl Circle {
    pub const fn new(c: Point2, r: f64) -> Self {
        Circle { c, r }
    }

    /// Points where the segment `p1 → p2` crosses the circle, ordered along
    /// the segment. Tangent touches are ignored.
    pub fn intersect(&self, p1: Point2, p2: Point2) -> Vec<Point2> {
        let d = p2 - p1;
        let f = p1 - self.c;
        let a = d.x * d.x + d.y * d.y;
        if a < REAL_FUZZ * REAL_FUZZ {
            return Vec::new();
        }
        let b = 2.0 * (f.x * d.x + f.y * d.y);
        let c = f.x * f.x + f.y * f.y - self.r * self.r;
        let disc = b * b - 4.0 * a * c;
        if disc <= 0.0 {
            return Vec::new();
        }
        let sq = disc.sqrt();
        let mut out = Vec::with_capacity(2);
        for t in [(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)] {
            if t > 0.0 && t < 1.0 {
                out.push(p1 + d * t);
            }
        }
        out
    }
}

/// Axis-aligned rectangle with lower-left `p1` and upper-right `p2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box2 {
    pub p1: Point2,
    pub p2: Point2,
}

impl Box2 {
    pub const fn new(p1: Point2, p2: Point2) -> Self {
        Box2 { p1, p2 }
    }

    pub fn width(&self) -> f64 {
        self.p2.x - self.p1.x
    }

    pub fn height(&self) -> f64 {
        self.p2.y - self.p1.y
    }

    /// Exit point of a ray starting at `p` (on or inside the box) travelling
    /// at azimuth `alpha`.
    pub fn intersect(&self, p: Point2, alpha: f64) -> Option<Point2> {
        let ox = alpha.cos();
        let oy = alpha.sin();
        let mut d_min = f64::MAX;
        let mut hit = None;

        let mut consider = |d: f64, q: Point2, within: bool| {
            if d > REAL_FUZZ && d < d_min && within {
                d_min = d;
                hit = Some(q);
            }
        };

        if ox.abs() > REAL_FUZZ {
            for x in [self.p1.x, self.p2.x] {
                let d = (x - p.x) / ox;
                let y = p.y + oy * d;
                consider(
                    d,
                    Point2::new(x, y),
                    y > self.p1.y - REAL_FUZZ && y < self.p2.y + REAL_FUZZ,
                );
            }
        }
        if oy.abs() > REAL_FUZZ {
            for y in [self.p1.y, self.p2.y] {
                let d = (y - p.y) / oy;
                let x = p.x + ox * d;
                consider(
                    d,
                    Point2::new(x, y),
                    x > self.p1.x - REAL_FUZZ && x < self.p2.x + REAL_FUZZ,
                );
            }
        }
        hit
    }
}

/// Sort points by distance from `origin` and drop near-duplicates.
pub fn sort_unique_along(origin: Point2, points: &mut Vec<Point2>) {
    points.sort_by(|a, b| {
        origin
            .distance(*a)
            .partial_cmp(&origin.distance(*b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    points.dedup_by(|a, b| a.equiv(*b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_circle_chord_through_center() {
        let c = Circle::new(Point2::new(0.0, 0.0), 0.5);
        let pts = c.intersect(Point2::new(-1.0, 0.0), Point2::new(1.0, 0.0));
        assert_eq!(pts.len(), 2);
        assert!((pts[0].x + 0.5).abs() < 1e-14);
        assert!((pts[1].x - 0.5).abs() < 1e-14);
    }

    #[test]
    fn test_circle_miss() {
        let c = Circle::new(Point2::new(0.0, 0.0), 0.5);
        let pts = c.intersect(Point2::new(-1.0, 0.7), Point2::new(1.0, 0.7));
        assert!(pts.is_empty());
    }

    #[test]
    fn test_line_intersect() {
        let a = Line::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let b = Line::new(Point2::new(0.0, 1.0), Point2::new(1.0, 0.0));
        let p = a.intersect(&b).unwrap();
        assert!(p.equiv(Point2::new(0.5, 0.5)));
        let c = Line::new(Point2::new(2.0, 0.0), Point2::new(3.0, 1.0));
        assert!(a.intersect(&c).is_none());
    }

    #[test]
    fn test_box_exit() {
        let b = Box2::new(Point2::new(0.0, 0.0), Point2::new(2.0, 1.0));
        let p = b.intersect(Point2::new(0.0, 0.5), PI / 4.0).unwrap();
        assert!(p.equiv(Point2::new(0.5, 1.0)));
        let q = b.intersect(Point2::new(2.0, 0.25), 3.0 * PI / 4.0).unwrap();
        assert!(q.equiv(Point2::new(1.25, 1.0)));
    }

    #[test]
    fn test_box_exit_through_corner() {
        let b = Box2::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let p = b.intersect(Point2::new(0.0, 0.0), PI / 4.0).unwrap();
        assert!(p.equiv(Point2::new(1.0, 1.0)));
    }

    #[test]
    fn test_sort_unique() {
        let o = Point2::new(0.0, 0.0);
        let mut pts = vec![
            Point2::new(2.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0 + 1e-15, 0.0),
        ];
        sort_unique_along(o, &mut pts);
        assert_eq!(pts.len(), 2);
        assert!(pts[0].equiv(Point2::new(1.0, 0.0)));
    }

    #[test]
    fn test_azimuth_range() {
        assert!((Point2::new(0.0, -1.0).azimuth() - 1.5 * PI).abs() < 1e-14);
        assert!(Point2::new(1.0, 0.0).azimuth().abs() < 1e-14);
    }
}
