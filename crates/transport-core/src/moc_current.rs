// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — MoC Current Workers
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Hooks the MoC sweep calls after each ray and each angle.
//!
//! Rays of one angle are swept in parallel. Each worker thread folds its
//! rays into a `Local` accumulator; the accumulators are reduced and handed
//! to `post_angle`, which is the only place a worker mutates shared state.

use crate::coarse_data::CoarseData;
use crate::correction_data::CorrectionData;
use crate::quadrature::{Angle, AngularQuadrature};
use crate::ray::Ray;
use crate::xs_mesh::XsMeshHomogenized;
use transport_mesh::mesh::Mesh;
use transport_types::constants::PI;
use transport_types::surface::{Normal, Surface};

/// Per-angle state shared by every ray of one macroplane sweep.
#[derive(Debug, Clone, Copy)]
pub struct AngleSweep<'a> {
    pub g: usize,
    /// Forward angle, in octant 1 or 2.
    pub iang: usize,
    /// Backward angle.
    pub iang_bw: usize,
    pub angle: &'a Angle,
    pub spacing: f64,
    pub imp: usize,
    /// First core-level region of the macroplane.
    pub first_reg: usize,
    /// Transport XS the sweep attenuates with, core-level.
    pub xstr: &'a [f64],
    /// Transport XS before source splitting, core-level.
    pub xstr_true: &'a [f64],
    /// Angular source over σ_tr, core-level.
    pub qbar: &'a [f64],
}

/// One ray's sweep result: angular flux at every segment boundary in both
/// directions, plus the attenuation `1 - exp(-τ)` of every segment.
#[derive(Debug, Clone, Copy)]
pub struct RaySweep<'a> {
    pub ray: &'a Ray,
    pub psi1: &'a [f64],
    pub psi2: &'a [f64],
    pub e_tau: &'a [f64],
}

pub trait MocCurrentWorker: Sync {
    type Local: Send;

    /// Fresh per-thread accumulator.
    fn local(&self) -> Self::Local;

    fn post_ray(&self, local: &mut Self::Local, sweep: &AngleSweep<'_>, ray: &RaySweep<'_>);

    fn reduce(&self, a: Self::Local, b: Self::Local) -> Self::Local;

    fn post_angle(&mut self, local: Self::Local, sweep: &AngleSweep<'_>);

    fn post_sweep(&mut self, _g: usize) {}
}

/// Pure flux solve.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCurrent;

impl MocCurrentWorker for NoCurrent {
    type Local = ();

    fn local(&self) {}

    fn post_ray(&self, _local: &mut (), _sweep: &AngleSweep<'_>, _ray: &RaySweep<'_>) {}

    fn reduce(&self, _a: (), _b: ()) {}

    fn post_angle(&mut self, _local: (), _sweep: &AngleSweep<'_>) {}
}

/// Plane-local surface tallies of one angle.
#[derive(Debug, Clone)]
pub struct SurfaceTally {
    pub(crate) current: Vec<f64>,
    pub(crate) surface_flux: Vec<f64>,
    /// `[surf * 2 + direction]`.
    pub(crate) partial: Vec<f64>,
}

impl SurfaceTally {
    pub(crate) fn new(n_surf: usize) -> Self {
        SurfaceTally {
            current: vec![0.0; n_surf],
            surface_flux: vec![0.0; n_surf],
            partial: vec![0.0; 2 * n_surf],
        }
    }

    pub(crate) fn deposit(&mut self, surf: usize, current: f64, flux: f64) {
        self.current[surf] += current;
        self.surface_flux[surf] += flux;
        if current >= 0.0 {
            self.partial[2 * surf] += current;
        } else {
            self.partial[2 * surf + 1] -= current;
        }
    }

    pub(crate) fn merge(mut self, other: SurfaceTally) -> Self {
        for (a, b) in self.current.iter_mut().zip(other.current) {
            *a += b;
        }
        for (a, b) in self.surface_flux.iter_mut().zip(other.surface_flux) {
            *a += b;
        }
        for (a, b) in self.partial.iter_mut().zip(other.partial) {
            *a += b;
        }
        self
    }
}

/// Net current, surface flux and partial currents on the radial faces of
/// the coarse mesh.
#[derive(Debug)]
pub struct Current<'a> {
    mesh: &'a Mesh,
    coarse: &'a mut CoarseData,
}

impl<'a> Current<'a> {
    pub fn new(mesh: &'a Mesh, coarse: &'a mut CoarseData) -> Self {
        Current { mesh, coarse }
    }

    fn tally_ray(&self, tally: &mut SurfaceTally, sweep: &AngleSweep<'_>, rs: &RaySweep<'_>) {
        let mesh = self.mesh;
        let ray = rs.ray;
        let a = sweep.angle;
        let w = a.weight * PI;
        let (sa, ca) = (a.alpha.sin().abs(), a.alpha.cos().abs());
        let cw = [w * a.ox * sweep.spacing / ca, w * a.oy * sweep.spacing / sa];
        let fw = [w * sweep.spacing / ca, w * sweep.spacing / sa];
        let nseg = ray.nseg();
        let n = |surf: usize| mesh.surface_normal(surf).index();

        // 1. Boundary faces the ray enters through.
        let s = ray.cm_surf_fw();
        tally.deposit(s, rs.psi1[0] * cw[n(s)], rs.psi1[0] * fw[n(s)]);
        let s = ray.cm_surf_bw();
        tally.deposit(s, -rs.psi2[nseg] * cw[n(s)], rs.psi2[nseg] * fw[n(s)]);

        // 2. Every crossing, walking both directions at once.
        let (mut cell_fw, mut cell_bw) = (ray.cm_cell_fw(), ray.cm_cell_bw());
        let (mut iseg_fw, mut iseg_bw) = (0, nseg);
        for d in ray.cm_data() {
            if let Some(face) = d.fw {
                iseg_fw += d.nseg_fw;
                let s = mesh.coarse_surf(cell_fw, face);
                let k = face.normal().index();
                tally.deposit(s, rs.psi1[iseg_fw] * cw[k], rs.psi1[iseg_fw] * fw[k]);
                if let Some(next) = mesh.coarse_neighbor(cell_fw, face) {
                    cell_fw = next;
                }
            }
            if let Some(face) = d.bw {
                iseg_bw -= d.nseg_bw;
                let s = mesh.coarse_surf(cell_bw, face);
                let k = face.normal().index();
                tally.deposit(s, -rs.psi2[iseg_bw] * cw[k], rs.psi2[iseg_bw] * fw[k]);
                if let Some(next) = mesh.coarse_neighbor(cell_bw, face) {
                    cell_bw = next;
                }
            }
        }
    }

    fn store(&mut self, tally: SurfaceTally, sweep: &AngleSweep<'_>) {
        let first = self.mesh.macroplane_first(sweep.imp);
        let off = self.mesh.n_surf_plane() * first;
        let g = sweep.g;
        for s in self.mesh.plane_surf_xy_begin(0)..self.mesh.plane_surf_end(0) {
            self.coarse.current_mut()[[off + s, g]] += tally.current[s];
            self.coarse.surface_flux_mut()[[off + s, g]] += tally.surface_flux[s];
            let pc = self.coarse.partial_current_mut();
            pc[[off + s, g, 0]] += tally.partial[2 * s];
            pc[[off + s, g, 1]] += tally.partial[2 * s + 1];
        }
    }

    /// Normalize radial faces by their length and copy each macroplane's
    /// values onto its other physical planes.
    fn finish(&mut self, g: usize) {
        let mesh = self.mesh;
        let n_surf_plane = mesh.n_surf_plane();
        for imp in 0..mesh.n_macroplanes() {
            let first = mesh.macroplane_first(imp);
            let dz = mesh.dz(first);
            for s in mesh.plane_surf_xy_begin(first)..mesh.plane_surf_end(first) {
                let len = mesh.coarse_area(s) / dz;
                self.coarse.current_mut()[[s, g]] /= len;
                self.coarse.surface_flux_mut()[[s, g]] /= len;
                let pc = self.coarse.partial_current_mut();
                pc[[s, g, 0]] /= len;
                pc[[s, g, 1]] /= len;
                for ip in first + 1..first + mesh.macroplanes()[imp] {
                    let t = s + n_surf_plane * (ip - first);
                    let (j, f) = (self.coarse.current()[[s, g]], self.coarse.surface_flux()[[s, g]]);
                    self.coarse.current_mut()[[t, g]] = j;
                    self.coarse.surface_flux_mut()[[t, g]] = f;
                    let pc = self.coarse.partial_current_mut();
                    pc[[t, g, 0]] = pc[[s, g, 0]];
                    pc[[t, g, 1]] = pc[[s, g, 1]];
                }
            }
        }
    }
}

impl MocCurrentWorker for Current<'_> {
    type Local = SurfaceTally;

    fn local(&self) -> SurfaceTally {
        SurfaceTally::new(self.mesh.n_surf_plane())
    }

    fn post_ray(&self, local: &mut SurfaceTally, sweep: &AngleSweep<'_>, ray: &RaySweep<'_>) {
        self.tally_ray(local, sweep, ray);
    }

    fn reduce(&self, a: SurfaceTally, b: SurfaceTally) -> SurfaceTally {
        a.merge(b)
    }

    fn post_angle(&mut self, local: SurfaceTally, sweep: &AngleSweep<'_>) {
        self.store(local, sweep);
    }

    fn post_sweep(&mut self, g: usize) {
        self.finish(g);
    }
}

/// Forward (slot 0) and backward (slot 1) flux integrals of one angle.
#[derive(Debug, Clone)]
pub struct CorrectionTally {
    surface: SurfaceTally,
    /// `[cell * 2 + dir]`.
    vol_sum: Vec<f64>,
    vol_norm: Vec<f64>,
    sigt_sum: Vec<f64>,
    /// `[surf * 2 + dir]`.
    surf_sum: Vec<f64>,
}

impl CorrectionTally {
    fn merge(mut self, other: CorrectionTally) -> Self {
        self.surface = self.surface.merge(other.surface);
        for (a, b) in [
            (&mut self.vol_sum, other.vol_sum),
            (&mut self.vol_norm, other.vol_norm),
            (&mut self.sigt_sum, other.sigt_sum),
            (&mut self.surf_sum, other.surf_sum),
        ] {
            for (x, y) in a.iter_mut().zip(b) {
                *x += y;
            }
        }
        self
    }
}

/// Coarse currents plus the CDD factors that make a coarse Sn sweep
/// reproduce this MoC sweep.
#[derive(Debug)]
pub struct CurrentCorrections<'a> {
    current: Current<'a>,
    ang_quad: &'a AngularQuadrature,
    sn_xs: &'a XsMeshHomogenized,
    corrections: &'a mut CorrectionData,
    /// Squared change of `[α_x, α_y, β]`.
    residual: [f64; 3],
}

impl<'a> CurrentCorrections<'a> {
    pub fn new(
        mesh: &'a Mesh,
        coarse: &'a mut CoarseData,
        ang_quad: &'a AngularQuadrature,
        sn_xs: &'a XsMeshHomogenized,
        corrections: &'a mut CorrectionData,
    ) -> Self {
        CurrentCorrections {
            current: Current::new(mesh, coarse),
            ang_quad,
            sn_xs,
            corrections,
            residual: [0.0; 3],
        }
    }

    /// Accumulated squared change of `[α_x, α_y, β]`.
    pub fn residual(&self) -> [f64; 3] {
        self.residual
    }

    fn calculate_corrections(&mut self, t: &CorrectionTally, sweep: &AngleSweep<'_>) {
        use Surface::{East as E, North as N, South as S, West as W};
        const XL: usize = 0;
        const XR: usize = 1;
        const YL: usize = 2;
        const YR: usize = 3;

        let mesh = self.current.mesh;
        let iang_bw = self.ang_quad.reverse(sweep.iang, 2);
        let mut surfs = [[W, E, S, N], [E, W, N, S]];
        if sweep.angle.ox <= 0.0 {
            surfs[0][XL] = E;
            surfs[0][XR] = W;
            surfs[1][XL] = W;
            surfs[1][XR] = E;
        }
        let width = [
            (sweep.spacing / sweep.angle.alpha.cos()).abs(),
            (sweep.spacing / sweep.angle.alpha.sin()).abs(),
        ];
        let n_cell_plane = mesh.n_cell_plane();
        let first = mesh.macroplane_first(sweep.imp);

        for ic in 0..n_cell_plane {
            let pos = mesh.coarse_position(ic);
            let area_x = width[0] / mesh.dy(pos.y);
            let area_y = width[1] / mesh.dx(pos.x);
            let xstr_sn = self.sn_xs.xstr(ic + first * n_cell_plane, sweep.g);
            let icc = sweep.imp * n_cell_plane + ic;
            if t.vol_norm[ic] <= 0.0 {
                continue;
            }

            for (dir, iang) in [(0, sweep.iang), (1, iang_bw)] {
                let vol = t.vol_sum[2 * ic + dir] / t.vol_norm[ic];
                let sigt = t.sigt_sum[2 * ic + dir] / t.vol_sum[2 * ic + dir];
                let psi = |k: usize| t.surf_sum[2 * mesh.coarse_surf(ic, surfs[dir][k]) + dir];
                let ax = vol / ((psi(XL) + psi(XR)) * area_x);
                let ay = vol / ((psi(YL) + psi(YR)) * area_y);
                let b = sigt / xstr_sn;

                let cd = &mut *self.corrections;
                let e = ax - cd.alpha(icc, iang, sweep.g, Normal::X);
                self.residual[0] += e * e;
                let e = ay - cd.alpha(icc, iang, sweep.g, Normal::Y);
                self.residual[1] += e * e;
                let e = b - cd.beta(icc, iang, sweep.g);
                self.residual[2] += e * e;

                cd.set_alpha(icc, iang, sweep.g, Normal::X, ax);
                cd.set_alpha(icc, iang, sweep.g, Normal::Y, ay);
                cd.set_beta(icc, iang, sweep.g, b);
            }
        }
    }
}

impl MocCurrentWorker for CurrentCorrections<'_> {
    type Local = CorrectionTally;

    fn local(&self) -> CorrectionTally {
        let mesh = self.current.mesh;
        let (nc, ns) = (mesh.n_cell_plane(), mesh.n_surf_plane());
        CorrectionTally {
            surface: self.current.local(),
            vol_sum: vec![0.0; 2 * nc],
            vol_norm: vec![0.0; nc],
            sigt_sum: vec![0.0; 2 * nc],
            surf_sum: vec![0.0; 2 * ns],
        }
    }

    fn post_ray(&self, local: &mut CorrectionTally, sweep: &AngleSweep<'_>, rs: &RaySweep<'_>) {
        self.current.tally_ray(&mut local.surface, sweep, rs);

        let mesh = self.current.mesh;
        let ray = rs.ray;
        let nseg = ray.nseg();
        let rsin = sweep.angle.rsintheta;
        let seg = |iseg: usize, psi_in: f64| -> (f64, f64, f64) {
            let r = sweep.first_reg + ray.seg_reg()[iseg];
            let t = ray.seg_len()[iseg] * rsin;
            let q = sweep.qbar[r];
            let fluxvol = t * q + rs.e_tau[iseg] * (psi_in - q) / sweep.xstr[r];
            (t, fluxvol, sweep.xstr_true[r] * fluxvol)
        };

        local.surf_sum[2 * ray.cm_surf_fw()] += rs.psi1[0];
        local.surf_sum[2 * ray.cm_surf_bw() + 1] += rs.psi2[nseg];

        // Forward.
        let mut cell = ray.cm_cell_fw();
        let mut iseg = 0;
        for d in ray.cm_data() {
            for _ in 0..d.nseg_fw {
                let (t, fv, st) = seg(iseg, rs.psi1[iseg]);
                local.vol_sum[2 * cell] += fv;
                local.vol_norm[cell] += t;
                local.sigt_sum[2 * cell] += st;
                iseg += 1;
            }
            if let Some(face) = d.fw {
                local.surf_sum[2 * mesh.coarse_surf(cell, face)] += rs.psi1[iseg];
                if let Some(next) = mesh.coarse_neighbor(cell, face) {
                    cell = next;
                }
            }
        }

        // Backward.
        let mut cell = ray.cm_cell_bw();
        let mut iseg = nseg;
        for d in ray.cm_data() {
            for _ in 0..d.nseg_bw {
                iseg -= 1;
                let (_, fv, st) = seg(iseg, rs.psi2[iseg + 1]);
                local.vol_sum[2 * cell + 1] += fv;
                local.sigt_sum[2 * cell + 1] += st;
            }
            if let Some(face) = d.bw {
                local.surf_sum[2 * mesh.coarse_surf(cell, face) + 1] += rs.psi2[iseg];
                if let Some(next) = mesh.coarse_neighbor(cell, face) {
                    cell = next;
                }
            }
        }
    }

    fn reduce(&self, a: CorrectionTally, b: CorrectionTally) -> CorrectionTally {
        a.merge(b)
    }

    fn post_angle(&mut self, local: CorrectionTally, sweep: &AngleSweep<'_>) {
        self.calculate_corrections(&local, sweep);
        self.current.store(local.surface, sweep);
    }

    fn post_sweep(&mut self, g: usize) {
        self.current.finish(g);
    }
}
