// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Pin Meshes
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Sub-pin flat-source-region meshes.
//!
//! Coordinates passed to `trace` and `find_reg` are local to the pin, with
//! the origin at the pin center.

use transport_math::geom::{sort_unique_along, Box2, Circle, Line, Point2};
use transport_types::config::{PinMeshConfig, PinMeshKind};
use transport_types::constants::{MAX_AZI_DIVISIONS, PI, REAL_FUZZ, TWOPI};
use transport_types::error::{TransportError, TransportResult};

/// Concentric rings cut into equal azimuthal sectors.
#[derive(Debug, Clone)]
pub struct CylMesh {
    /// Material ring radii.
    xs_radii: Vec<f64>,
    /// Mesh sub-rings per material ring.
    sub_rad: Vec<usize>,
    sub_azi: usize,
    /// Mesh radii after equal-volume subdivision.
    radii: Vec<f64>,
    circles: Vec<Circle>,
    lines: Vec<Line>,
}

/// Uniform rectangular subdivision.
#[derive(Debug, Clone)]
pub struct RectMesh {
    sub_x: usize,
    sub_y: usize,
    dx: f64,
    dy: f64,
    lines: Vec<Line>,
}

#[derive(Debug, Clone)]
pub enum PinMeshGeometry {
    Cyl(CylMesh),
    Rect(RectMesh),
}

#[derive(Debug, Clone)]
pub struct PinMesh {
    id: u32,
    pitch_x: f64,
    pitch_y: f64,
    geometry: PinMeshGeometry,
    vols: Vec<f64>,
}

impl PinMesh {
    pub fn from_config(cfg: &PinMeshConfig) -> TransportResult<Self> {
        if cfg.pitch <= 0.0 || !cfg.pitch.is_finite() {
            return Err(TransportError::Geometry(format!(
                "pin mesh {}: invalid pitch {}",
                cfg.id, cfg.pitch
            )));
        }
        match &cfg.kind {
            PinMeshKind::Cyl {
                radii,
                sub_radii,
                sub_azi,
            } => Self::cylindrical(cfg.id, cfg.pitch, radii, sub_radii, *sub_azi),
            PinMeshKind::Rect { sub_x, sub_y } => {
                Self::rectangular(cfg.id, cfg.pitch, *sub_x, *sub_y)
            }
        }
    }

    pub fn cylindrical(
        id: u32,
        pitch: f64,
        xs_radii: &[f64],
        sub_rad: &[usize],
        sub_azi: usize,
    ) -> TransportResult<Self> {
        if xs_radii.is_empty() {
            return Err(TransportError::Geometry(format!(
                "pin mesh {id}: cylindrical mesh needs at least one radius"
            )));
        }
        if xs_radii.windows(2).any(|w| w[0] >= w[1]) || xs_radii[0] <= 0.0 {
            return Err(TransportError::Geometry(format!(
                "pin mesh {id}: radii are not strictly increasing"
            )));
        }
        let h = 0.5 * pitch;
        if xs_radii[xs_radii.len() - 1] > h + REAL_FUZZ {
            return Err(TransportError::Geometry(format!(
                "pin mesh {id}: largest radius exceeds the half pitch {h}"
            )));
        }
        if sub_azi < 2 || sub_azi % 2 != 0 || sub_azi > MAX_AZI_DIVISIONS {
            return Err(TransportError::Geometry(format!(
                "pin mesh {id}: azimuthal subdivisions must be even and <= {MAX_AZI_DIVISIONS}, got {sub_azi}"
            )));
        }
        if sub_rad.len() != xs_radii.len() || sub_rad.iter().any(|&n| n == 0) {
            return Err(TransportError::Geometry(format!(
                "pin mesh {id}: need one positive radial subdivision per ring"
            )));
        }

        // Equal-volume sub-rings inside each material ring.
        let mut radii = Vec::new();
        let mut r_xs_prev = 0.0_f64;
        let mut r_prev = 0.0_f64;
        for (&r_xs, &n) in xs_radii.iter().zip(sub_rad) {
            let v = (r_xs * r_xs - r_xs_prev * r_xs_prev) / n as f64;
            for _ in 0..n {
                let r = (v + r_prev * r_prev).sqrt();
                radii.push(r);
                r_prev = r;
            }
            r_xs_prev = r_xs;
        }

        let origin = Point2::new(0.0, 0.0);
        let pin_box = Box2::new(Point2::new(-h, -h), Point2::new(h, h));
        let circles = radii.iter().map(|&r| Circle::new(origin, r)).collect();
        let sep = TWOPI / sub_azi as f64;
        let mut lines = Vec::with_capacity(sub_azi);
        for i in 0..sub_azi {
            let p = pin_box.intersect(origin, i as f64 * sep).ok_or_else(|| {
                TransportError::Geometry(format!(
                    "pin mesh {id}: azimuthal line {i} does not reach the pin boundary"
                ))
            })?;
            lines.push(Line::new(origin, p));
        }

        let mut vols = Vec::with_capacity((radii.len() + 1) * sub_azi);
        let mut prev = 0.0_f64;
        for &r in &radii {
            let v = PI * (r * r - prev * prev) / sub_azi as f64;
            vols.extend(std::iter::repeat(v).take(sub_azi));
            prev = r;
        }
        let r_out = prev;
        for i in 0..sub_azi {
            let a0 = i as f64 * sep;
            let box_part = sector_box_area(h, h, a0, a0 + sep);
            vols.push(box_part - PI * r_out * r_out / sub_azi as f64);
        }

        Ok(PinMesh {
            id,
            pitch_x: pitch,
            pitch_y: pitch,
            geometry: PinMeshGeometry::Cyl(CylMesh {
                xs_radii: xs_radii.to_vec(),
                sub_rad: sub_rad.to_vec(),
                sub_azi,
                radii,
                circles,
                lines,
            }),
            vols,
        })
    }

    pub fn rectangular(id: u32, pitch: f64, sub_x: usize, sub_y: usize) -> TransportResult<Self> {
        if sub_x == 0 || sub_y == 0 {
            return Err(TransportError::Geometry(format!(
                "pin mesh {id}: rectangular subdivisions must be at least 1"
            )));
        }
        let h = 0.5 * pitch;
        let dx = pitch / sub_x as f64;
        let dy = pitch / sub_y as f64;
        let mut lines = Vec::new();
        for i in 1..sub_x {
            let x = -h + i as f64 * dx;
            lines.push(Line::new(Point2::new(x, -h), Point2::new(x, h)));
        }
        for j in 1..sub_y {
            let y = -h + j as f64 * dy;
            lines.push(Line::new(Point2::new(-h, y), Point2::new(h, y)));
        }
        Ok(PinMesh {
            id,
            pitch_x: pitch,
            pitch_y: pitch,
            geometry: PinMeshGeometry::Rect(RectMesh {
                sub_x,
                sub_y,
                dx,
                dy,
                lines,
            }),
            vols: vec![dx * dy; sub_x * sub_y],
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn pitch_x(&self) -> f64 {
        self.pitch_x
    }

    pub fn pitch_y(&self) -> f64 {
        self.pitch_y
    }

    pub fn area(&self) -> f64 {
        self.pitch_x * self.pitch_y
    }

    pub fn geometry(&self) -> &PinMeshGeometry {
        &self.geometry
    }

    /// Number of flat source regions.
    pub fn n_reg(&self) -> usize {
        self.vols.len()
    }

    /// Number of cross-section regions (one material each).
    pub fn n_xsreg(&self) -> usize {
        match &self.geometry {
            PinMeshGeometry::Cyl(c) => c.xs_radii.len() + 1,
            PinMeshGeometry::Rect(r) => r.sub_x * r.sub_y,
        }
    }

    /// Number of flat source regions inside cross-section region `ixs`.
    /// Regions of one material are contiguous.
    pub fn n_fsrs(&self, ixs: usize) -> usize {
        match &self.geometry {
            PinMeshGeometry::Cyl(c) => {
                if ixs < c.sub_rad.len() {
                    c.sub_rad[ixs] * c.sub_azi
                } else {
                    c.sub_azi
                }
            }
            PinMeshGeometry::Rect(_) => 1,
        }
    }

    /// Region areas, indexed like `find_reg`.
    pub fn vols(&self) -> &[f64] {
        &self.vols
    }

    /// Region containing a pin-local point, `None` outside the pin.
    pub fn find_reg(&self, p: Point2) -> Option<usize> {
        let hx = 0.5 * self.pitch_x;
        let hy = 0.5 * self.pitch_y;
        if p.x.abs() > hx + REAL_FUZZ || p.y.abs() > hy + REAL_FUZZ {
            return None;
        }
        match &self.geometry {
            PinMeshGeometry::Cyl(c) => {
                let r = (p.x * p.x + p.y * p.y).sqrt();
                let ir = c.radii.iter().position(|&ri| r < ri).unwrap_or(c.radii.len());
                let ia = ((p.azimuth() / (TWOPI / c.sub_azi as f64)) as usize).min(c.sub_azi - 1);
                Some(ir * c.sub_azi + ia)
            }
            PinMeshGeometry::Rect(m) => {
                let ix = (((p.x + hx) / m.dx).floor().max(0.0) as usize).min(m.sub_x - 1);
                let iy = (((p.y + hy) / m.dy).floor().max(0.0) as usize).min(m.sub_y - 1);
                Some(m.sub_x * iy + ix)
            }
        }
    }

    /// Trace the pin-local chord `p1 → p2`, appending segment lengths and
    /// region indices (offset by `first_reg`). Returns the segment count.
    pub fn trace(
        &self,
        p1: Point2,
        p2: Point2,
        first_reg: usize,
        seg_len: &mut Vec<f64>,
        seg_reg: &mut Vec<usize>,
    ) -> TransportResult<usize> {
        let chord = Line::new(p1, p2);
        let mut ps = vec![p1, p2];
        match &self.geometry {
            PinMeshGeometry::Cyl(c) => {
                for circle in &c.circles {
                    ps.extend(circle.intersect(p1, p2));
                }
                ps.extend(c.lines.iter().filter_map(|l| l.intersect(&chord)));
            }
            PinMeshGeometry::Rect(r) => {
                ps.extend(r.lines.iter().filter_map(|l| l.intersect(&chord)));
            }
        }
        sort_unique_along(p1, &mut ps);

        let mut nseg = 0;
        for w in ps.windows(2) {
            let len = w[0].distance(w[1]);
            if len < REAL_FUZZ {
                continue;
            }
            let reg = self.find_reg(w[0].midpoint(w[1])).ok_or_else(|| {
                TransportError::RayTrace(format!(
                    "pin mesh {}: segment midpoint {:?} outside the pin",
                    self.id,
                    w[0].midpoint(w[1])
                ))
            })?;
            seg_len.push(len);
            seg_reg.push(reg + first_reg);
            nseg += 1;
        }
        Ok(nseg)
    }
}

/// Area of the part of the box `[-hx, hx] × [-hy, hy]` between azimuths
/// `a0 < a1` (polygon fan about the origin).
fn sector_box_area(hx: f64, hy: f64, a0: f64, a1: f64) -> f64 {
    let bx = Box2::new(Point2::new(-hx, -hy), Point2::new(hx, hy));
    let origin = Point2::new(0.0, 0.0);
    let mut poly = Vec::with_capacity(7);
    poly.push(origin);
    if let Some(p) = bx.intersect(origin, a0) {
        poly.push(p);
    }
    let mut corners: Vec<(f64, Point2)> = [
        Point2::new(hx, hy),
        Point2::new(-hx, hy),
        Point2::new(-hx, -hy),
        Point2::new(hx, -hy),
    ]
    .iter()
    .map(|&c| (c.azimuth(), c))
    .filter(|(a, _)| *a > a0 && *a < a1)
    .collect();
    corners.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    poly.extend(corners.into_iter().map(|(_, c)| c));
    if let Some(p) = bx.intersect(origin, a1) {
        poly.push(p);
    }
    let mut area = 0.0;
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        area += a.x * b.y - b.x * a.y;
    }
    0.5 * area.abs()
}
