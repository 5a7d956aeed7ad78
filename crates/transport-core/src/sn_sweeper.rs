// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Sn Sweeper
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Discrete ordinates on the coarse pin mesh.
//!
//! Every angle is a triple loop over cells in the order its direction
//! cosines dictate. The cell balance is a [`SnCellWorker`] and the face
//! tally a [`SnCurrentWorker`]; the sweeper picks the pairing once per
//! inner and the kernel is monomorphized for it.

use crate::boundary::{upwind_surface, BoundaryCondition};
use crate::coarse_data::CoarseData;
use crate::context::RuntimeContext;
use crate::correction_data::CorrectionData;
use crate::output::OutputWriter;
use crate::quadrature::AngularQuadrature;
use crate::sn_cell::{
    AxialDd, AxialFw, AxialPmb, AxialSc, CellIndex, CellState, CorrectedDiamond, Diamond, SnCellWorker,
};
use crate::sn_current::{Current, NoCurrent, SnCurrentWorker};
use crate::source::Source;
use crate::sweeper::{normalize_pin_powers, write_pin_output, TransportSweeper};
use crate::xs_mesh::{XsMesh, XsMeshHomogenized};
use ndarray::{Array2, Array3};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use transport_mesh::core_mesh::CoreMesh;
use transport_mesh::mesh::Mesh;
use transport_types::config::{AxialScheme, BoundaryUpdate, CaseConfig, SnEquation, SnSweeperConfig};
use transport_types::constants::{FPI, HPI, PI};
use transport_types::error::{ResultExt, TransportError, TransportResult};
use transport_types::surface::{Boundary, Normal, Surface};

/// Radial differencing selected for one group sweep.
#[derive(Clone, Copy)]
enum Scheme<'a> {
    Diamond,
    Corrected(&'a CorrectionData),
}

/// Everything one angle sweep reads.
struct AngleKernel<'a, W, C> {
    mesh: &'a Mesh,
    ang_quad: &'a AngularQuadrature,
    cell: &'a W,
    current: &'a C,
    q: &'a [f64],
    xstr: &'a [f64],
    g: usize,
    /// Angular integration factor, `π/2` in 3-D and `π` in 2-D.
    wfac: f64,
    two_d: bool,
    /// Angles in the upward hemisphere.
    n_ang_alpha: usize,
}

fn ordered(n: usize, forward: bool) -> Vec<usize> {
    if forward {
        (0..n).collect()
    } else {
        (0..n).rev().collect()
    }
}

impl<W: SnCellWorker, C: SnCurrentWorker> AngleKernel<'_, W, C> {
    fn sweep(&self, iang: usize, bc_in: &[f64], bc_out: &mut [f64], flux: &mut [f64], local: &mut C::Local) {
        let mesh = self.mesh;
        let (nx, ny, nz) = (mesh.nx(), mesh.ny(), mesh.nz());
        let ang = self.ang_quad.angle(iang);
        let wt = ang.weight * self.wfac;
        let st = CellState {
            ox: ang.ox.abs(),
            oy: ang.oy.abs(),
            oz: ang.oz.abs(),
            iang_alpha: iang % self.n_ang_alpha,
            g: self.g,
        };

        let (nfx, nfy) = (ny * nz, nx * nz);
        let mut fx = bc_in[..nfx].to_vec();
        let mut fy = bc_in[nfx..nfx + nfy].to_vec();
        let mut fz = bc_in[nfx + nfy..].to_vec();

        let xs = ordered(nx, ang.ox > 0.0);
        let ys = ordered(ny, ang.oy > 0.0);
        let zs = ordered(nz, ang.oz > 0.0);
        let up = [
            upwind_surface(ang, Normal::X),
            upwind_surface(ang, Normal::Y),
            upwind_surface(ang, Normal::Z),
        ];
        let down = up.map(Surface::opposite);

        for &iz in &zs {
            for &iy in &ys {
                for &ix in &xs {
                    let cell = mesh.coarse_cell_index(ix, iy, iz);
                    let at = CellIndex { cell, ix, iy, iz };
                    let (jx, jy, jz) = (ny * iz + iy, nx * iz + ix, nx * iy + ix);
                    let (q, xstr) = (self.q[cell], self.xstr[cell]);

                    if ix == xs[0] {
                        self.current.face(local, mesh.coarse_surf(cell, up[0]), ang.ox, fx[jx], wt);
                    }
                    if iy == ys[0] {
                        self.current.face(local, mesh.coarse_surf(cell, up[1]), ang.oy, fy[jy], wt);
                    }

                    let psi = if self.two_d {
                        self.cell.evaluate_2d(&st, &mut fx[jx], &mut fy[jy], q, xstr, at)
                    } else {
                        if iz == zs[0] {
                            self.current.face(local, mesh.coarse_surf(cell, up[2]), ang.oz, fz[jz], wt);
                        }
                        let psi = self.cell.evaluate(&st, &mut fx[jx], &mut fy[jy], &mut fz[jz], q, xstr, at);
                        self.current.face(local, mesh.coarse_surf(cell, down[2]), ang.oz, fz[jz], wt);
                        psi
                    };
                    flux[cell] += psi * wt;

                    self.current.face(local, mesh.coarse_surf(cell, down[0]), ang.ox, fx[jx], wt);
                    self.current.face(local, mesh.coarse_surf(cell, down[1]), ang.oy, fy[jy], wt);
                }
            }
        }

        bc_out[..nfx].copy_from_slice(&fx);
        bc_out[nfx..nfx + nfy].copy_from_slice(&fy);
        bc_out[nfx + nfy..].copy_from_slice(&fz);
    }
}

#[derive(Debug)]
pub struct SnSweeper {
    core: Arc<CoreMesh>,
    ctx: Arc<RuntimeContext>,
    ang_quad: AngularQuadrature,
    xs: XsMeshHomogenized,
    boundary: BoundaryCondition,
    boundary_out: BoundaryCondition,
    source: Source,
    flux: Array2<f64>,
    old_flux: Array2<f64>,
    vols: Vec<f64>,
    /// Transport XS of the staged group.
    xstr: Vec<f64>,
    equation: SnEquation,
    axial: AxialScheme,
    n_inner: usize,
    gauss_seidel: bool,
    /// Single plane between reflective axial faces.
    two_d: bool,
    /// Correction factors of a standalone CDD sweeper.
    corrections: Option<CorrectionData>,
    coarse: Option<CoarseData>,
}

impl SnSweeper {
    pub fn new(cfg: &CaseConfig, core: Arc<CoreMesh>, ctx: Arc<RuntimeContext>) -> TransportResult<Self> {
        let sc = &cfg.sweeper;
        let ang_quad = AngularQuadrature::from_config(&sc.ang_quad)?;
        let sn = sc.sn_sweeper.clone().unwrap_or_else(|| SnSweeperConfig {
            n_inner: sc.n_inner,
            ..SnSweeperConfig::default()
        });
        let mut sweeper = Self::build(cfg, &sn, core, ctx, ang_quad)?;
        if sn.equation == SnEquation::Cdd {
            let mut cd = CorrectionData::new(sweeper.core.mesh(), sweeper.ang_quad.ndir() / 2, sweeper.n_group());
            if !sn.correction_data.is_empty() {
                cd.load(&sn.correction_data).context("loading Sn correction factors")?;
            }
            sweeper.corrections = Some(cd);
        }
        Ok(sweeper)
    }

    /// Sn sweeper on an existing quadrature, whose correction factors come
    /// from the caller at sweep time.
    pub fn with_quadrature(
        cfg: &CaseConfig,
        core: Arc<CoreMesh>,
        ctx: Arc<RuntimeContext>,
        ang_quad: AngularQuadrature,
    ) -> TransportResult<Self> {
        let sn = cfg
            .sweeper
            .sn_sweeper
            .clone()
            .ok_or_else(|| TransportError::Config("coupled sweeper requires an sn_sweeper block".to_string()))?;
        Self::build(cfg, &sn, core, ctx, ang_quad)
    }

    fn build(
        cfg: &CaseConfig,
        sn: &SnSweeperConfig,
        core: Arc<CoreMesh>,
        ctx: Arc<RuntimeContext>,
        ang_quad: AngularQuadrature,
    ) -> TransportResult<Self> {
        let t0 = Instant::now();
        let mesh = core.mesh();
        let xs = XsMeshHomogenized::from_core(&core, &cfg.eubounds)?;
        let ng = xs.xs_mesh().n_group();
        let n_cell = mesh.n_pin();
        let two_d = mesh.nz() == 1
            && mesh.boundary_at(Surface::Bottom) == Boundary::Reflect
            && mesh.boundary_at(Surface::Top) == Boundary::Reflect;
        let boundary = if two_d {
            BoundaryCondition::for_sn_2d(ng, &ang_quad, mesh)?
        } else {
            BoundaryCondition::for_sn(ng, &ang_quad, mesh)?
        };
        let boundary_out = boundary.single_group();
        let source = Source::new(n_cell, ng, false).with_external_from(xs.xs_mesh());
        let vols = (0..n_cell).map(|c| mesh.coarse_volume(c)).collect();

        info!(
            n_cell,
            n_group = ng,
            n_angles = ang_quad.ndir(),
            equation = ?sn.equation,
            axial = ?sn.axial,
            two_d,
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "Sn sweeper ready"
        );

        let mut sweeper = SnSweeper {
            core,
            ctx,
            ang_quad,
            xs,
            boundary,
            boundary_out,
            source,
            flux: Array2::zeros((n_cell, ng)),
            old_flux: Array2::zeros((n_cell, ng)),
            vols,
            xstr: vec![0.0; n_cell],
            equation: sn.equation,
            axial: sn.axial,
            n_inner: sn.n_inner,
            gauss_seidel: cfg.sweeper.boundary_update == BoundaryUpdate::Gs,
            two_d,
            corrections: None,
            coarse: None,
        };
        sweeper.initialize();
        Ok(sweeper)
    }

    pub fn ang_quad(&self) -> &AngularQuadrature {
        &self.ang_quad
    }

    pub fn core(&self) -> &CoreMesh {
        &self.core
    }

    pub fn is_two_d(&self) -> bool {
        self.two_d
    }

    pub fn equation(&self) -> SnEquation {
        self.equation
    }

    pub fn corrections(&self) -> Option<&CorrectionData> {
        self.corrections.as_ref()
    }

    pub fn corrections_mut(&mut self) -> Option<&mut CorrectionData> {
        self.corrections.as_mut()
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Pin-homogenized cross sections.
    pub fn xs_homogenized(&self) -> &XsMeshHomogenized {
        &self.xs
    }

    /// Re-homogenize with a fine flux `[reg, g]` and refresh the staged
    /// transport XS of group `g`.
    pub fn update_xs(&mut self, flux: &Array2<f64>, g: usize) {
        self.xs.update(flux);
        self.xstr = self.xs.xs_mesh().expand_xstr(g);
    }

    /// Hand the coarse data back to its owner.
    pub fn detach_coarse_data(&mut self) -> Option<CoarseData> {
        self.coarse.take()
    }

    /// Sweep group `g`, reading CDD factors from `corrections`.
    pub fn sweep_with(&mut self, g: usize, corrections: Option<&CorrectionData>) -> TransportResult<()> {
        if self.xstr.iter().any(|&x| !(x > 0.0)) {
            return Err(TransportError::StateMisuse(format!(
                "group {g} source was not staged before the sweep"
            )));
        }
        let scheme = match (self.equation, corrections) {
            (SnEquation::Dd, _) => Scheme::Diamond,
            (SnEquation::Cdd, Some(cd)) => Scheme::Corrected(cd),
            (SnEquation::Cdd, None) => {
                return Err(TransportError::StateMisuse(
                    "CDD Sn sweep requested without correction data".to_string(),
                ))
            }
        };

        let t0 = Instant::now();
        for inner in 0..self.n_inner {
            let last = inner + 1 == self.n_inner;
            let flux_1g = self.flux.column(g).to_vec();
            self.source.self_scatter(self.xs.xs_mesh(), &flux_1g, &self.xstr, g);
            match self.coarse.take() {
                Some(mut coarse) if last => {
                    coarse.zero_data(g);
                    self.dispatch(g, scheme, &mut Current::new(&mut coarse));
                    coarse.set_has_axial(true);
                    coarse.set_has_radial(true);
                    self.coarse = Some(coarse);
                    if let Some(resid) = self.check_balance(g) {
                        debug!(group = g, balance = resid, "Sn cell balance");
                    }
                }
                other => {
                    self.coarse = other;
                    self.dispatch(g, scheme, &mut NoCurrent);
                }
            }
        }
        debug!(
            group = g,
            n_inner = self.n_inner,
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "Sn group sweep"
        );
        Ok(())
    }

    fn dispatch<C: SnCurrentWorker>(&mut self, g: usize, scheme: Scheme<'_>, current: &mut C) {
        let core = Arc::clone(&self.core);
        let mesh = core.mesh();
        match scheme {
            Scheme::Diamond => match self.axial {
                AxialScheme::Dd => self.sweep_1g(g, &Diamond::<AxialDd>::new(mesh), current),
                AxialScheme::Sc => self.sweep_1g(g, &Diamond::<AxialSc>::new(mesh), current),
                AxialScheme::Fw => self.sweep_1g(g, &Diamond::<AxialFw>::new(mesh), current),
                AxialScheme::Pmb => self.sweep_1g(g, &Diamond::<AxialPmb>::new(mesh), current),
            },
            Scheme::Corrected(cd) => match self.axial {
                AxialScheme::Dd => self.sweep_1g(g, &CorrectedDiamond::<AxialDd>::new(mesh, cd), current),
                AxialScheme::Sc => self.sweep_1g(g, &CorrectedDiamond::<AxialSc>::new(mesh, cd), current),
                AxialScheme::Fw => self.sweep_1g(g, &CorrectedDiamond::<AxialFw>::new(mesh, cd), current),
                AxialScheme::Pmb => self.sweep_1g(g, &CorrectedDiamond::<AxialPmb>::new(mesh, cd), current),
            },
        }
    }

    fn sweep_1g<W: SnCellWorker, C: SnCurrentWorker>(&mut self, g: usize, cell: &W, current: &mut C) {
        let core = Arc::clone(&self.core);
        let n_cell = self.flux.nrows();
        let n_ang = self.boundary.n_angle();
        let mut gauss_seidel = self.gauss_seidel;
        if gauss_seidel && self.ctx.n_threads() > 1 {
            self.ctx
                .warn_once("Gauss-Seidel boundary update is serial; using Jacobi for the parallel Sn sweep");
            gauss_seidel = false;
        }

        let mut flux = vec![0.0; n_cell];
        let local = {
            let w: &C = current;
            let kernel = AngleKernel {
                mesh: core.mesh(),
                ang_quad: &self.ang_quad,
                cell,
                current: w,
                q: self.source.get_transport(0),
                xstr: &self.xstr,
                g,
                wfac: if self.two_d { PI } else { HPI },
                two_d: self.two_d,
                n_ang_alpha: self.ang_quad.ndir() / 2,
            };

            if gauss_seidel {
                let mut local = w.local();
                for iang in 0..n_ang {
                    kernel.sweep(
                        iang,
                        self.boundary.angle(g, iang),
                        self.boundary_out.angle_mut(0, iang),
                        &mut flux,
                        &mut local,
                    );
                    self.boundary.update(g, iang, &self.boundary_out);
                }
                local
            } else {
                let bc_in = &self.boundary;
                let blocks = self.boundary_out.angles_mut(0);
                let reduced = self.ctx.install(|| {
                    blocks
                        .into_par_iter()
                        .enumerate()
                        .fold(
                            || (vec![0.0; n_cell], w.local()),
                            |(mut f, mut l), (iang, out)| {
                                kernel.sweep(iang, bc_in.angle(g, iang), out, &mut f, &mut l);
                                (f, l)
                            },
                        )
                        .reduce_with(|(mut fa, la), (fb, lb)| {
                            for (a, b) in fa.iter_mut().zip(&fb) {
                                *a += b;
                            }
                            (fa, w.reduce(la, lb))
                        })
                });
                self.boundary.update_all(g, &self.boundary_out);
                match reduced {
                    Some((f, l)) => {
                        flux = f;
                        l
                    }
                    None => w.local(),
                }
            }
        };
        current.finish(local, g);
        for (f, v) in self.flux.column_mut(g).iter_mut().zip(flux) {
            *f = v;
        }
    }

    /// Largest per-cell residual of `leakage + σ_tr φ V − 4π q V`, relative
    /// to the total source. Needs the currents of the last sweep.
    pub fn check_balance(&self, g: usize) -> Option<f64> {
        let coarse = self.coarse.as_ref()?;
        let mesh = self.core.mesh();
        let q = self.source.get_transport(0);
        let mut worst: f64 = 0.0;
        let mut total = 0.0;
        for cell in 0..mesh.n_pin() {
            let mut leak = 0.0;
            for s in Surface::ALL {
                if self.two_d && s.normal() == Normal::Z {
                    continue;
                }
                let surf = mesh.coarse_surf(cell, s);
                let sign = if s.is_positive() { 1.0 } else { -1.0 };
                leak += sign * coarse.current()[[surf, g]] * mesh.coarse_area(surf);
            }
            let v = self.vols[cell];
            let src = FPI * q[cell] * v;
            worst = worst.max((leak + self.xstr[cell] * self.flux[[cell, g]] * v - src).abs());
            total += src.abs();
        }
        Some(if total > 0.0 { worst / total } else { worst })
    }
}

impl TransportSweeper for SnSweeper {
    fn n_reg(&self) -> usize {
        self.flux.nrows()
    }

    fn n_group(&self) -> usize {
        self.xs.xs_mesh().n_group()
    }

    fn xs_mesh(&self) -> &XsMesh {
        self.xs.xs_mesh()
    }

    fn vols(&self) -> &[f64] {
        &self.vols
    }

    fn initialize(&mut self) {
        self.flux.fill(1.0);
        self.old_flux.fill(1.0);
        self.boundary.initialize_scalar(1.0 / FPI);
    }

    fn flux(&self) -> &Array2<f64> {
        &self.flux
    }

    fn old_flux(&self) -> &Array2<f64> {
        &self.old_flux
    }

    fn store_old_flux(&mut self) {
        self.old_flux.assign(&self.flux);
    }

    fn set_group_source(&mut self, g: usize, fs: Option<&[f64]>) {
        let xs = self.xs.xs_mesh();
        self.source.initialize_group(g);
        if let Some(fs) = fs {
            self.source.fission(xs, fs, g);
        }
        self.source.in_scatter(xs, &self.flux, g);
        self.xstr = xs.expand_xstr(g);
    }

    fn sweep(&mut self, g: usize) -> TransportResult<()> {
        let corrections = self.corrections.take();
        let result = self.sweep_with(g, corrections.as_ref());
        self.corrections = corrections;
        result
    }

    fn pin_flux(&self, g: usize) -> Vec<f64> {
        self.flux.column(g).to_vec()
    }

    fn set_pin_flux(&mut self, g: usize, pin_flux: &[f64]) -> f64 {
        let mut resid = 0.0;
        for (f, &p) in self.flux.column_mut(g).iter_mut().zip(pin_flux) {
            resid += (*f - p) * (*f - p);
            *f = p;
        }
        resid.sqrt()
    }

    fn pin_powers(&self) -> Array3<f64> {
        let mesh = self.core.mesh();
        let ng = self.n_group();
        let mut powers = Array3::zeros((mesh.nz(), mesh.ny(), mesh.nx()));
        for (cell, p) in powers.iter_mut().enumerate() {
            let xsr = self.xs.region(cell);
            *p = (0..ng).map(|g| xsr.xskf[g] * self.flux[[cell, g]]).sum::<f64>() * self.vols[cell];
        }
        normalize_pin_powers(&mut powers, |c| self.core.is_fuel(c));
        powers
    }

    fn coarse_data(&self) -> Option<&CoarseData> {
        self.coarse.as_ref()
    }

    fn coarse_data_mut(&mut self) -> Option<&mut CoarseData> {
        self.coarse.as_mut()
    }

    fn attach_coarse_data(&mut self, coarse: CoarseData) {
        self.coarse = Some(coarse);
    }

    fn output(&self, out: &mut OutputWriter) -> TransportResult<()> {
        let mesh = self.core.mesh();
        write_pin_output(self, (mesh.nz(), mesh.ny(), mesh.nx()), out)?;
        self.ang_quad.output(out)?;
        if let Some(cd) = &self.corrections {
            cd.output(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn load(name: &str) -> (CaseConfig, Arc<CoreMesh>) {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("validation")
            .join(name);
        let cfg = CaseConfig::from_file(&path.to_string_lossy()).unwrap();
        let core = Arc::new(CoreMesh::from_config(&cfg).unwrap());
        (cfg, core)
    }

    fn sweeper(cfg: &CaseConfig, core: Arc<CoreMesh>) -> SnSweeper {
        SnSweeper::new(cfg, core, Arc::new(RuntimeContext::serial().unwrap())).unwrap()
    }

    #[test]
    fn test_sweep_requires_staged_source() {
        let (cfg, core) = load("slab_sn_3d.json");
        let mut s = sweeper(&cfg, core);
        assert!(matches!(s.sweep(0), Err(TransportError::StateMisuse(_))));
    }

    #[test]
    fn test_two_d_mode_detection() {
        let (cfg, core) = load("slab_sn_3d.json");
        assert!(!sweeper(&cfg, core).is_two_d());
        let (mut cfg, core) = load("lattice_3x3_2d.json");
        cfg.sweeper.sn_sweeper = Some(SnSweeperConfig::default());
        let s = sweeper(&cfg, core);
        assert!(s.is_two_d());
        assert_eq!(s.boundary.n_angle(), s.ang_quad().ndir() / 2);
    }

    #[test]
    fn test_infinite_medium_2d_and_3d_agree() {
        // Reflective single material with a flat source: φ = S / (σ_tr − σ_s).
        for (two_d, nz) in [(true, 1), (false, 2)] {
            let (mut cfg, _) = load("rect_fixed_source.json");
            cfg.sweeper.sn_sweeper = Some(SnSweeperConfig::default());
            if !two_d {
                cfg.assemblies[0].lattices = vec![1; nz];
                cfg.assemblies[0].hz = vec![1.0];
            }
            let core = Arc::new(CoreMesh::from_config(&cfg).unwrap());
            let mut s = sweeper(&cfg, core);
            assert_eq!(s.is_two_d(), two_d);
            for _ in 0..200 {
                s.set_group_source(0, None);
                s.sweep(0).unwrap();
            }
            for &phi in s.flux().iter() {
                assert!((phi - 2.0).abs() < 1e-6, "φ = {phi}");
            }
        }
    }

    #[test]
    fn test_balance_with_currents() {
        let (cfg, core) = load("slab_sn_3d.json");
        let mesh = core.mesh().clone();
        let mut s = sweeper(&cfg, core);
        s.attach_coarse_data(CoarseData::new(&mesh, 2));
        let fs = s.calc_fission_source(1.0);
        s.set_group_source(0, Some(&fs));
        s.sweep(0).unwrap();
        let resid = s.check_balance(0).unwrap();
        assert!(resid < 1e-10, "balance residual {resid}");
        let coarse = s.coarse_data().unwrap();
        assert!(coarse.has_axial() && coarse.has_radial());
        // Vacuum top face leaks outward.
        let top = mesh.coarse_surf(mesh.coarse_cell_index(1, 1, mesh.nz() - 1), Surface::Top);
        assert!(coarse.current()[[top, 0]] > 0.0);
    }

    #[test]
    fn test_cdd_defaults_match_dd() {
        let (cfg, core) = load("slab_sn_3d.json");
        let mut dd = sweeper(&cfg, Arc::clone(&core));
        let mut cfg_cdd = cfg.clone();
        if let Some(sn) = cfg_cdd.sweeper.sn_sweeper.as_mut() {
            sn.equation = SnEquation::Cdd;
        }
        let mut cdd = sweeper(&cfg_cdd, core);
        assert!(cdd.corrections().is_some());
        for s in [&mut dd, &mut cdd] {
            let fs = s.calc_fission_source(1.0);
            s.set_group_source(0, Some(&fs));
            s.sweep(0).unwrap();
        }
        for (a, b) in dd.flux().iter().zip(cdd.flux().iter()) {
            assert!((a - b).abs() < 1e-13);
        }
    }

    #[test]
    fn test_cdd_without_factors_is_misuse() {
        let (mut cfg, core) = load("slab_sn_3d.json");
        if let Some(sn) = cfg.sweeper.sn_sweeper.as_mut() {
            sn.equation = SnEquation::Cdd;
        }
        let ctx = Arc::new(RuntimeContext::serial().unwrap());
        let q = AngularQuadrature::from_config(&cfg.sweeper.ang_quad).unwrap();
        let mut s = SnSweeper::with_quadrature(&cfg, core, ctx, q).unwrap();
        s.set_group_source(0, None);
        assert!(matches!(s.sweep(0), Err(TransportError::StateMisuse(_))));
    }

    #[test]
    fn test_parallel_sweep_matches_serial() {
        let (mut cfg, core) = load("slab_sn_3d.json");
        cfg.sweeper.boundary_update = BoundaryUpdate::Jacobi;
        let mut serial = sweeper(&cfg, Arc::clone(&core));
        let mut par = SnSweeper::new(&cfg, core, Arc::new(RuntimeContext::new(4).unwrap())).unwrap();
        for s in [&mut serial, &mut par] {
            for _ in 0..5 {
                let fs = s.calc_fission_source(1.0);
                s.set_group_source(0, Some(&fs));
                s.sweep(0).unwrap();
            }
        }
        for (a, b) in serial.flux().iter().zip(par.flux().iter()) {
            assert!((a - b).abs() < 1e-10 * a.abs().max(1.0));
        }
    }
}
