// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Planes and Macroplanes
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! A radial slice of the core as a grid of pins, and the axial grouping of
//! physical planes into macroplanes.

use crate::lattice::Pin;
use std::sync::Arc;
use transport_math::fp::bracket;
use transport_math::geom::{sort_unique_along, Point2};
use transport_types::constants::REAL_FUZZ;
use transport_types::error::{TransportError, TransportResult};

/// Result of tracing one chord across a plane.
#[derive(Debug, Clone, Default)]
pub struct PlaneTrace {
    /// Pin-boundary points along the chord, both ends included.
    pub points: Vec<Point2>,
    /// Fine segments inside the pin between `points[i]` and `points[i + 1]`.
    pub nseg: Vec<usize>,
}

/// Geometrically unique radial plane. Coordinates run from the lower-left
/// corner of the core.
#[derive(Debug, Clone)]
pub struct Plane {
    id: usize,
    x: Vec<f64>,
    y: Vec<f64>,
    pins: Vec<Arc<Pin>>,
    first_reg: Vec<usize>,
    n_reg: usize,
}

impl Plane {
    /// `pins` are ordered `nx·iy + ix`, bottom row first; `x` and `y` are the
    /// pin boundaries.
    pub fn new(id: usize, x: Vec<f64>, y: Vec<f64>, pins: Vec<Arc<Pin>>) -> TransportResult<Self> {
        let (nx, ny) = (x.len().saturating_sub(1), y.len().saturating_sub(1));
        if nx * ny == 0 || pins.len() != nx * ny {
            return Err(TransportError::Geometry(format!(
                "plane {id}: {} pins for a {nx}x{ny} grid",
                pins.len()
            )));
        }
        let mut first_reg = Vec::with_capacity(pins.len() + 1);
        let mut n_reg = 0;
        for pin in &pins {
            first_reg.push(n_reg);
            n_reg += pin.mesh.n_reg();
        }
        first_reg.push(n_reg);
        Ok(Plane {
            id,
            x,
            y,
            pins,
            first_reg,
            n_reg,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn nx(&self) -> usize {
        self.x.len() - 1
    }

    pub fn ny(&self) -> usize {
        self.y.len() - 1
    }

    pub fn n_reg(&self) -> usize {
        self.n_reg
    }

    pub fn pins(&self) -> &[Arc<Pin>] {
        &self.pins
    }

    /// First plane-local region of pin `ipin`.
    pub fn first_reg(&self, ipin: usize) -> usize {
        self.first_reg[ipin]
    }

    /// Plane-local regions of pin `ipin`.
    pub fn pin_regs(&self, ipin: usize) -> std::ops::Range<usize> {
        self.first_reg[ipin]..self.first_reg[ipin + 1]
    }

    /// Region areas in plane-local order.
    pub fn areas(&self) -> Vec<f64> {
        self.pins
            .iter()
            .flat_map(|p| p.mesh.vols().iter().copied())
            .collect()
    }

    /// Materials of every region in plane-local order.
    pub fn materials(&self) -> Vec<u32> {
        self.pins.iter().flat_map(|p| p.fsr_materials()).collect()
    }

    /// Pin containing `p`, with `p` shifted to pin-local coordinates.
    pub fn find_pin(&self, p: Point2) -> Option<(usize, Point2)> {
        let ix = bracket(&self.x, p.x)?;
        let iy = bracket(&self.y, p.y)?;
        let center = Point2::new(
            0.5 * (self.x[ix] + self.x[ix + 1]),
            0.5 * (self.y[iy] + self.y[iy + 1]),
        );
        Some((self.nx() * iy + ix, p - center))
    }

    /// Region containing `p`, plane-local.
    pub fn find_reg(&self, p: Point2) -> Option<usize> {
        let (ipin, local) = self.find_pin(p)?;
        Some(self.first_reg[ipin] + self.pins[ipin].mesh.find_reg(local)?)
    }

    /// Trace `p1 → p2` across the plane, appending fine segments.
    pub fn trace(
        &self,
        p1: Point2,
        p2: Point2,
        seg_len: &mut Vec<f64>,
        seg_reg: &mut Vec<usize>,
    ) -> TransportResult<PlaneTrace> {
        let d = p2 - p1;
        let mut points = vec![p1, p2];
        for (breaks, delta, start, along_x) in [(&self.x, d.x, p1.x, true), (&self.y, d.y, p1.y, false)] {
            if delta.abs() < REAL_FUZZ {
                continue;
            }
            for &b in breaks.iter() {
                let t = (b - start) / delta;
                if t > 0.0 && t < 1.0 {
                    let mut q = p1 + d * t;
                    // Snap onto the grid line so later lookups see it exactly.
                    if along_x {
                        q.x = b;
                    } else {
                        q.y = b;
                    }
                    points.push(q);
                }
            }
        }
        sort_unique_along(p1, &mut points);

        let mut out = PlaneTrace {
            points: Vec::with_capacity(points.len()),
            nseg: Vec::with_capacity(points.len()),
        };
        out.points.push(points[0]);
        for w in points.windows(2) {
            if w[0].distance(w[1]) < REAL_FUZZ {
                continue;
            }
            let mid = w[0].midpoint(w[1]);
            let (ipin, local_mid) = self.find_pin(mid).ok_or_else(|| {
                TransportError::RayTrace(format!(
                    "plane {}: chord midpoint ({}, {}) outside the core",
                    self.id, mid.x, mid.y
                ))
            })?;
            let shift = mid - local_mid;
            let n = self.pins[ipin].mesh.trace(
                w[0] - shift,
                w[1] - shift,
                self.first_reg[ipin],
                seg_len,
                seg_reg,
            )?;
            out.points.push(w[1]);
            out.nseg.push(n);
        }
        Ok(out)
    }
}

/// Contiguous stack of physical planes sharing one radial solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroPlane {
    /// Unique plane the macroplane is built from.
    pub plane: usize,
    pub first_plane: usize,
    pub n_planes: usize,
    pub height: f64,
    /// First core-level region of the macroplane.
    pub first_reg: usize,
}

impl MacroPlane {
    pub fn planes(&self) -> std::ops::Range<usize> {
        self.first_plane..self.first_plane + self.n_planes
    }
}
