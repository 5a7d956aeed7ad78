// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Modular Ray Data
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Modular ray sets for every unique plane.
//!
//! Construction runs in three steps:
//! 1. modularize the quadrature so an integer number of rays tiles each
//!    domain face, fixing the ray spacing of every angle;
//! 2. trace the rays of every octant-1 and octant-2 angle across every
//!    unique plane;
//! 3. rescale segment lengths so traced region volumes match the true ones.

use crate::context::RuntimeContext;
use crate::quadrature::AngularQuadrature;
use crate::ray::Ray;
use rayon::prelude::*;
use tracing::{debug, info};
use transport_math::fp::{fp_equiv_abs, fp_equiv_rel};
use transport_math::geom::{Box2, Point2};
use transport_math::rational::nearest_fraction;
use transport_mesh::core_mesh::CoreMesh;
use transport_types::config::{Modularity, Modularization, RayConfig, VolumeCorrection};
use transport_types::error::{TransportError, TransportResult};

/// Accepted range of true-to-traced volume ratios during correction.
const VOLUME_CORRECTION_BAND: (f64, f64) = (0.25, 4.0);

/// Ray counts and spacing of one octant-1 angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModularAngle {
    pub alpha: f64,
    /// Rays entering through a y-normal face.
    pub nx: usize,
    /// Rays entering through an x-normal face.
    pub ny: usize,
    pub spacing: f64,
}

/// Trigonometric modularization: round the face ray counts up.
pub fn modularize_trig(alpha: f64, hx_mod: f64, hy_mod: f64, spacing: f64) -> (usize, usize) {
    let nx = (hx_mod / spacing * alpha.sin().abs()).ceil().max(1.0) as usize;
    let ny = (hy_mod / spacing * alpha.cos().abs()).ceil().max(1.0) as usize;
    (nx, ny)
}

/// Rational-fraction modularization: approximate `nx/ny = tan α · hx/hy`
/// (or its reciprocal past the diagonal) on the grid set by the face width
/// over the spacing, then scale both until the spacing is no wider than
/// requested.
pub fn modularize_rational(alpha: f64, hx: f64, hy: f64, spacing: f64) -> (usize, usize) {
    let t = alpha.tan() * hx / hy;
    let (nx, ny) = if t <= 1.0 {
        let (n, d) = nearest_fraction(t, (hy / spacing).floor() as u64);
        (n as usize, d as usize)
    } else {
        let (n, d) = nearest_fraction(1.0 / t, (hx / spacing).floor() as u64);
        (d as usize, n as usize)
    };
    let new_alpha = (hy * nx as f64 / (hx * ny as f64)).atan();
    let k = (new_alpha.cos() * hy / (ny as f64 * spacing)).ceil().max(1.0) as usize;
    (k * nx, k * ny)
}

#[derive(Debug, Clone)]
pub struct RayData {
    ang_quad: AngularQuadrature,
    modular: Vec<ModularAngle>,
    /// `[unique plane][angle in octants 1-2][ray]`.
    rays: Vec<Vec<Vec<Ray>>>,
    max_seg: usize,
}

impl RayData {
    pub fn new(
        cfg: &RayConfig,
        ang_quad: &AngularQuadrature,
        core: &CoreMesh,
        ctx: &RuntimeContext,
    ) -> TransportResult<Self> {
        if !(cfg.spacing > 0.0) {
            return Err(TransportError::Config(format!(
                "invalid ray spacing {}",
                cfg.spacing
            )));
        }
        let mesh = core.mesh();
        let (hx, hy) = (mesh.hx_core(), mesh.hy_core());
        let mut ang_quad = ang_quad.clone();

        // 1. Modularize.
        let (hx_mod, hy_mod, mult) = match cfg.modularity {
            Modularity::Core => (hx, hy, (1, 1)),
            Modularity::Pin => {
                let (px, py) = (mesh.hx()[0], mesh.hy()[0]);
                let uniform = mesh.hx().iter().all(|&h| fp_equiv_rel(h, px))
                    && mesh.hy().iter().all(|&h| fp_equiv_rel(h, py));
                if !uniform {
                    return Err(TransportError::Config(
                        "core mesh does not support pin-modular ray tracing".to_string(),
                    ));
                }
                (px, py, (mesh.nx(), mesh.ny()))
            }
        };
        info!(modularity = ?cfg.modularity, modularization = ?cfg.modularization, spacing = cfg.spacing, "generating ray data");

        let mut modular = Vec::with_capacity(ang_quad.ndir_oct());
        for iang in 0..ang_quad.ndir_oct() {
            let ang = *ang_quad.angle(iang);
            let (nx, ny) = match cfg.modularization {
                Modularization::Trig => {
                    let (nx, ny) = modularize_trig(ang.alpha, hx_mod, hy_mod, cfg.spacing);
                    (nx * mult.0, ny * mult.1)
                }
                Modularization::RationalFraction => {
                    modularize_rational(ang.alpha, hx, hy, cfg.spacing)
                }
            };
            let alpha = (hy * nx as f64 / (hx * ny as f64)).atan();
            ang_quad.modify_angle(iang, ang.with_alpha(alpha));
            let spacing = alpha.cos() * hy / ny as f64;
            debug!(iang, alpha_in = ang.alpha, alpha, nx, ny, spacing, "modular angle");
            modular.push(ModularAngle {
                alpha,
                nx,
                ny,
                spacing,
            });
        }

        // 2. Trace every unique plane.
        let core_box = Box2::new(Point2::new(0.0, 0.0), Point2::new(hx, hy));
        let n_ang = 2 * ang_quad.ndir_oct();
        let mut rays = Vec::with_capacity(core.planes().len());
        for (iplane, plane) in core.planes().iter().enumerate() {
            let mut plane_rays = Vec::with_capacity(n_ang);
            for iang in 0..n_ang {
                let ang = *ang_quad.angle(iang);
                let m = modular[iang % ang_quad.ndir_oct()];
                let space_x = (m.spacing / ang.alpha.sin()).abs();
                let space_y = (m.spacing / ang.alpha.cos()).abs();
                let exit_slot = |p2: Point2| -> TransportResult<usize> {
                    if fp_equiv_abs(p2.x, hx) || fp_equiv_abs(p2.x, 0.0) {
                        Ok((p2.y / space_y) as usize)
                    } else if fp_equiv_abs(p2.y, hy) {
                        Ok((p2.x / space_x) as usize + m.ny)
                    } else {
                        Err(TransportError::RayTrace(format!(
                            "ray exit ({}, {}) is not on the core boundary",
                            p2.x, p2.y
                        )))
                    }
                };
                let start = |i: usize| -> Point2 {
                    if i < m.ny {
                        let x = if ang.ox > 0.0 { 0.0 } else { hx };
                        Point2::new(x, (0.5 + i as f64) * space_y)
                    } else {
                        Point2::new((0.5 + (i - m.ny) as f64) * space_x, 0.0)
                    }
                };
                let angle_rays: Vec<Ray> = ctx.install(|| {
                    (0..m.nx + m.ny)
                        .into_par_iter()
                        .map(|i| {
                            let p1 = start(i);
                            let p2 = core_box.intersect(p1, ang.alpha).ok_or_else(|| {
                                TransportError::RayTrace(format!(
                                    "ray from ({}, {}) does not leave the core",
                                    p1.x, p1.y
                                ))
                            })?;
                            Ray::new(p1, p2, [i, exit_slot(p2)?], iplane, core)
                        })
                        .collect::<TransportResult<Vec<Ray>>>()
                })?;

                let mut hits = vec![0usize; plane.n_reg()];
                for ray in &angle_rays {
                    for &r in ray.seg_reg() {
                        hits[r] += 1;
                    }
                }
                let missed = hits.iter().filter(|&&n| n == 0).count();
                if missed > 0 {
                    ctx.warn_once(
                        "No rays passed through at least one flat source region. \
                         Try finer ray spacing or larger regions.",
                    );
                    debug!(iplane, iang, missed, "regions without rays");
                }
                plane_rays.push(angle_rays);
            }
            rays.push(plane_rays);
        }
        let max_seg = rays
            .iter()
            .flatten()
            .flatten()
            .map(Ray::nseg)
            .max()
            .unwrap_or(0);

        let mut data = RayData {
            ang_quad,
            modular,
            rays,
            max_seg,
        };

        // 3. Volume correction.
        data.correct_volume(core, cfg.volume_correction)?;
        info!(
            n_planes = data.rays.len(),
            n_rays = data.n_rays_total(),
            max_seg = data.max_seg,
            "ray data ready"
        );
        Ok(data)
    }

    fn correct_volume(&mut self, core: &CoreMesh, kind: VolumeCorrection) -> TransportResult<()> {
        let check = |ratio: f64, ireg: usize| -> TransportResult<f64> {
            if ratio < VOLUME_CORRECTION_BAND.0 || ratio > VOLUME_CORRECTION_BAND.1 {
                return Err(TransportError::RayTrace(format!(
                    "volume correction factor {ratio:.4} for region {ireg} is outside [{}, {}]",
                    VOLUME_CORRECTION_BAND.0, VOLUME_CORRECTION_BAND.1
                )));
            }
            Ok(ratio)
        };
        match kind {
            VolumeCorrection::None => {}
            VolumeCorrection::Flat => {
                for (iplane, plane_rays) in self.rays.iter_mut().enumerate() {
                    let true_vol = core.planes()[iplane].areas();
                    for (iang, angle_rays) in plane_rays.iter_mut().enumerate() {
                        let space = self.modular[iang % self.ang_quad.ndir_oct()].spacing;
                        let mut traced = vec![0.0; true_vol.len()];
                        for ray in angle_rays.iter() {
                            for (&l, &r) in ray.seg_len().iter().zip(ray.seg_reg()) {
                                traced[r] += l * space;
                            }
                        }
                        let factor = traced
                            .iter()
                            .zip(&true_vol)
                            .enumerate()
                            .map(|(r, (&t, &v))| if t > 0.0 { check(v / t, r) } else { Ok(1.0) })
                            .collect::<TransportResult<Vec<f64>>>()?;
                        scale_segments(angle_rays, &factor);
                    }
                }
            }
            VolumeCorrection::Angle => {
                for (iplane, plane_rays) in self.rays.iter_mut().enumerate() {
                    let true_vol = core.planes()[iplane].areas();
                    let mut traced = vec![0.0; true_vol.len()];
                    for (iang, angle_rays) in plane_rays.iter().enumerate() {
                        let space = self.modular[iang % self.ang_quad.ndir_oct()].spacing;
                        let wgt = self.ang_quad.angle(iang).weight * 0.5;
                        for ray in angle_rays {
                            for (&l, &r) in ray.seg_len().iter().zip(ray.seg_reg()) {
                                traced[r] += l * space * wgt;
                            }
                        }
                    }
                    let factor = traced
                        .iter()
                        .zip(&true_vol)
                        .enumerate()
                        .map(|(r, (&t, &v))| if t > 0.0 { check(v / t, r) } else { Ok(1.0) })
                        .collect::<TransportResult<Vec<f64>>>()?;
                    for angle_rays in plane_rays.iter_mut() {
                        scale_segments(angle_rays, &factor);
                    }
                }
            }
        }
        Ok(())
    }

    /// Modularized quadrature.
    pub fn ang_quad(&self) -> &AngularQuadrature {
        &self.ang_quad
    }

    pub fn modular(&self) -> &[ModularAngle] {
        &self.modular
    }

    /// Ray spacing of any angle.
    pub fn spacing(&self, iang: usize) -> f64 {
        self.modular[iang % self.ang_quad.ndir_oct()].spacing
    }

    /// `(nx, ny)` of every octant-1 angle.
    pub fn ray_counts(&self) -> Vec<(usize, usize)> {
        self.modular.iter().map(|m| (m.nx, m.ny)).collect()
    }

    /// Rays of unique plane `iplane`, angle `iang` in octants 1-2.
    pub fn rays(&self, iplane: usize, iang: usize) -> &[Ray] {
        &self.rays[iplane][iang]
    }

    pub fn n_planes(&self) -> usize {
        self.rays.len()
    }

    pub fn max_seg(&self) -> usize {
        self.max_seg
    }

    pub fn n_rays_total(&self) -> usize {
        self.rays.iter().flatten().map(Vec::len).sum()
    }
}

fn scale_segments(rays: &mut [Ray], factor: &[f64]) {
    for ray in rays.iter_mut() {
        let regs = ray.seg_reg().to_vec();
        for (l, r) in ray.seg_len_mut().iter_mut().zip(regs) {
            *l *= factor[r];
        }
    }
}
