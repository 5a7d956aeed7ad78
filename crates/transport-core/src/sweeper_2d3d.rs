// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — 2D3D Coupled Sweeper
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Radial MoC per macroplane coupled to a 3-D corrected-diamond Sn sweep
//! on the pin mesh.
//!
//! Per group: the Sn axial currents become a transverse leakage source for
//! MoC; the last MoC inner produces CDD factors; the Sn sweep starts from
//! the MoC pin flux and its result is projected back onto the MoC regions.
//! The driver owns the coarse data and the correction factors and lends
//! them to each sweeper in turn.

use crate::coarse_data::CoarseData;
use crate::context::RuntimeContext;
use crate::correction_data::CorrectionData;
use crate::moc_current::{CurrentCorrections, NoCurrent};
use crate::moc_sweeper::MocSweeper;
use crate::output::{entry_index, OutputWriter};
use crate::quadrature::AngularQuadrature;
use crate::sn_sweeper::SnSweeper;
use crate::sweeper::{write_pin_output, TransportSweeper};
use crate::xs_mesh::XsMesh;
use ndarray::{Array2, Array3};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use transport_mesh::core_mesh::CoreMesh;
use transport_types::config::{CaseConfig, CouplingConfig, SnEquation};
use transport_types::error::{TransportError, TransportResult};
use transport_types::surface::Surface;

#[derive(Debug)]
pub struct Sweeper2D3D {
    core: Arc<CoreMesh>,
    moc: MocSweeper,
    sn: SnSweeper,
    /// Modularized quadrature shared by both sweepers.
    ang_quad: AngularQuadrature,
    corrections: CorrectionData,
    coarse: Option<CoarseData>,
    opts: CouplingConfig,
    n_outer: usize,
    /// MoC-vs-Sn pin flux residual of every group sweep, per group.
    pin_residual: Vec<Vec<f64>>,
    /// Squared change of `[α_x, α_y, β]` of every MoC sweep.
    correction_residual: Vec<[f64; 3]>,
    /// Last transverse leakage, `[g, macroplane pin]`.
    tl: Array2<f64>,
}

impl Sweeper2D3D {
    pub fn new(cfg: &CaseConfig, core: Arc<CoreMesh>, ctx: Arc<RuntimeContext>) -> TransportResult<Self> {
        let t0 = Instant::now();
        let opts = cfg.sweeper.coupling.clone();
        if opts.moc_modulo == 0 {
            return Err(TransportError::Config("moc_modulo must be at least 1".to_string()));
        }
        if !(opts.relax > 0.0 && opts.relax <= 1.0) {
            return Err(TransportError::Config(format!(
                "relax must lie in (0, 1], got {}",
                opts.relax
            )));
        }

        let moc = MocSweeper::new(cfg, Arc::clone(&core), Arc::clone(&ctx))?;
        let ang_quad = moc.ang_quad().clone();
        let sn = SnSweeper::with_quadrature(cfg, Arc::clone(&core), Arc::clone(&ctx), ang_quad.clone())?;
        if sn.equation() != SnEquation::Cdd {
            ctx.warn_once("2D3D coupling with a plain diamond-difference Sn sweeper ignores correction factors");
        }
        let ng = moc.n_group();
        let corrections = CorrectionData::new(core.mesh(), ang_quad.ndir() / 2, ng);
        let coarse = CoarseData::new(core.mesh(), ng);
        let tl = Array2::zeros((ng, core.macroplanes().len() * core.mesh().n_cell_plane()));

        info!(
            expose_sn = opts.expose_sn,
            sn_project = opts.sn_project,
            tl = opts.tl,
            inactive_moc = opts.inactive_moc,
            moc_modulo = opts.moc_modulo,
            relax = opts.relax,
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "2D3D sweeper ready"
        );

        Ok(Sweeper2D3D {
            core,
            moc,
            sn,
            ang_quad,
            corrections,
            coarse: Some(coarse),
            opts,
            n_outer: 0,
            pin_residual: vec![Vec::new(); ng],
            correction_residual: Vec::new(),
            tl,
        })
    }

    pub fn moc(&self) -> &MocSweeper {
        &self.moc
    }

    pub fn sn(&self) -> &SnSweeper {
        &self.sn
    }

    pub fn corrections(&self) -> &CorrectionData {
        &self.corrections
    }

    /// Outer iterations seen so far.
    pub fn n_outer(&self) -> usize {
        self.n_outer
    }

    pub fn pin_residual(&self, g: usize) -> &[f64] {
        &self.pin_residual[g]
    }

    pub fn correction_residual(&self) -> &[[f64; 3]] {
        &self.correction_residual
    }

    /// Transverse leakage of group `g` from its last sweep, one value per
    /// macroplane pin.
    pub fn tl(&self, g: usize) -> Vec<f64> {
        self.tl.row(g).to_vec()
    }

    /// `(J_bottom − J_top) / H` of every macroplane pin, replicated onto
    /// its regions. The pin values are kept for output.
    fn transverse_leakage(&mut self, coarse: &CoarseData, g: usize) -> Vec<f64> {
        let core = Arc::clone(&self.core);
        let mesh = core.mesh();
        let n_cell_plane = mesh.n_cell_plane();
        let mut tl = vec![0.0; core.n_reg()];
        for (imp, mp) in core.macroplanes().iter().enumerate() {
            let last = mp.first_plane + mp.n_planes - 1;
            for ipin in 0..n_cell_plane {
                let bottom = mesh.coarse_surf(mp.first_plane * n_cell_plane + ipin, Surface::Bottom);
                let top = mesh.coarse_surf(last * n_cell_plane + ipin, Surface::Top);
                let v = (coarse.current()[[bottom, g]] - coarse.current()[[top, g]]) / mp.height;
                self.tl[[g, imp * n_cell_plane + ipin]] = v;
                for r in core.pin_regs(imp, ipin) {
                    tl[r] = v;
                }
            }
        }
        tl
    }

    fn moc_active(&self) -> bool {
        let outer = self.n_outer.saturating_sub(1);
        outer >= self.opts.inactive_moc && outer % self.opts.moc_modulo == 0
    }

    /// MoC inners; the last one fills radial currents and the CDD factors.
    fn sweep_moc(&mut self, g: usize, coarse: &mut CoarseData) -> TransportResult<()> {
        self.moc.check_staged(g)?;
        let n_inner = self.moc.n_inner();
        for _ in 1..n_inner {
            self.moc.sweep_inner(g, &mut NoCurrent);
        }
        coarse.zero_data_radial(g);
        self.sn.update_xs(self.moc.flux(), g);
        let core = Arc::clone(&self.core);
        let residual = {
            let mut worker = CurrentCorrections::new(
                core.mesh(),
                coarse,
                &self.ang_quad,
                self.sn.xs_homogenized(),
                &mut self.corrections,
            );
            self.moc.sweep_inner(g, &mut worker);
            worker.residual()
        };
        coarse.set_has_radial(true);
        debug!(group = g, ?residual, "correction factor change");
        self.correction_residual.push(residual);
        Ok(())
    }

    fn sweep_coupled(&mut self, g: usize, mut coarse: CoarseData) -> (CoarseData, TransportResult<()>) {
        // 1. Transverse leakage from the last Sn currents.
        if self.opts.tl && coarse.has_axial() {
            let tl = self.transverse_leakage(&coarse, g);
            self.moc.apply_transverse_leakage(g, &tl);
        }

        // 2. MoC and the handoff of its pin flux to Sn.
        let moc_active = self.moc_active();
        if moc_active {
            if let Err(e) = self.sweep_moc(g, &mut coarse) {
                return (coarse, Err(e));
            }
        }
        let moc_pin = self.moc.pin_flux(g);
        if moc_active {
            let relax = self.opts.relax;
            let handoff: Vec<f64> = moc_pin
                .iter()
                .zip(self.sn.pin_flux(g))
                .map(|(&m, s)| relax * m + (1.0 - relax) * s)
                .collect();
            self.sn.set_pin_flux(g, &handoff);
        }

        // 3. Sn with the fresh factors.
        self.sn.attach_coarse_data(coarse);
        let result = self.sn.sweep_with(g, Some(&self.corrections));
        let coarse = match self.sn.detach_coarse_data() {
            Some(c) => c,
            None => CoarseData::new(self.core.mesh(), self.moc.n_group()),
        };
        if result.is_err() {
            return (coarse, result);
        }

        // 4. Projection and residual.
        let sn_pin = self.sn.pin_flux(g);
        if self.opts.sn_project {
            self.moc.set_pin_flux(g, &sn_pin);
        }
        let resid = moc_pin
            .iter()
            .zip(&sn_pin)
            .map(|(m, s)| (m - s) * (m - s))
            .sum::<f64>()
            .sqrt()
            / sn_pin.len() as f64;
        self.pin_residual[g].push(resid);
        debug!(group = g, outer = self.n_outer, moc_active, residual = resid, "MoC/Sn pin flux residual");
        (coarse, Ok(()))
    }
}

impl TransportSweeper for Sweeper2D3D {
    fn n_reg(&self) -> usize {
        self.moc.n_reg()
    }

    fn n_group(&self) -> usize {
        self.moc.n_group()
    }

    fn xs_mesh(&self) -> &XsMesh {
        self.moc.xs_mesh()
    }

    fn vols(&self) -> &[f64] {
        self.moc.vols()
    }

    fn initialize(&mut self) {
        self.moc.initialize();
        self.sn.initialize();
    }

    fn flux(&self) -> &Array2<f64> {
        self.moc.flux()
    }

    fn old_flux(&self) -> &Array2<f64> {
        self.moc.old_flux()
    }

    fn store_old_flux(&mut self) {
        self.moc.store_old_flux();
        self.sn.store_old_flux();
    }

    fn set_group_source(&mut self, g: usize, fs: Option<&[f64]>) {
        self.moc.set_group_source(g, fs);
        let sn_fs = fs.map(|fs| self.sn.xs_homogenized().homogenize(fs));
        self.sn.set_group_source(g, sn_fs.as_deref());
    }

    fn sweep(&mut self, g: usize) -> TransportResult<()> {
        if g == 0 {
            self.n_outer += 1;
        }
        let coarse = self.coarse.take().ok_or_else(|| {
            TransportError::StateMisuse("2D3D sweep requested without coarse data".to_string())
        })?;
        let (coarse, result) = self.sweep_coupled(g, coarse);
        self.coarse = Some(coarse);
        result
    }

    fn pin_flux(&self, g: usize) -> Vec<f64> {
        if self.opts.expose_sn {
            self.sn.pin_flux(g)
        } else {
            self.moc.pin_flux(g)
        }
    }

    fn set_pin_flux(&mut self, g: usize, pin_flux: &[f64]) -> f64 {
        let sn_resid = self.sn.set_pin_flux(g, pin_flux);
        let moc_resid = self.moc.set_pin_flux(g, pin_flux);
        if self.opts.expose_sn {
            sn_resid
        } else {
            moc_resid
        }
    }

    fn pin_powers(&self) -> Array3<f64> {
        if self.opts.expose_sn {
            self.sn.pin_powers()
        } else {
            self.moc.pin_powers()
        }
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
        self.corrections.output(out)?;
        for (g, hist) in self.pin_residual.iter().enumerate() {
            out.write_slice(&format!("pin_flux_residual/{}", entry_index(g)), hist)?;
        }
        for (g, tl) in self.tl.outer_iter().enumerate() {
            out.write_slice(&format!("TL/{}", entry_index(g)), &tl.to_vec())?;
        }
        info!(n_outer = self.n_outer, "2D3D output written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use transport_types::surface::Boundary;

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

    fn driver(cfg: &CaseConfig, core: Arc<CoreMesh>) -> Sweeper2D3D {
        Sweeper2D3D::new(cfg, core, Arc::new(RuntimeContext::serial().unwrap())).unwrap()
    }

    fn outer(s: &mut Sweeper2D3D, k: f64) {
        s.store_old_flux();
        let fs = s.calc_fission_source(k);
        for g in 0..s.n_group() {
            s.set_group_source(g, Some(&fs));
            s.sweep(g).unwrap();
        }
    }

    #[test]
    fn test_invalid_coupling_options() {
        let (mut cfg, core) = load("assembly_2d3d.json");
        cfg.sweeper.coupling.moc_modulo = 0;
        let err = Sweeper2D3D::new(&cfg, Arc::clone(&core), Arc::new(RuntimeContext::serial().unwrap())).unwrap_err();
        assert!(matches!(err, TransportError::Config(_)));
        cfg.sweeper.coupling.moc_modulo = 1;
        cfg.sweeper.coupling.relax = 1.5;
        let err = Sweeper2D3D::new(&cfg, core, Arc::new(RuntimeContext::serial().unwrap())).unwrap_err();
        assert!(matches!(err, TransportError::Config(_)));
    }

    #[test]
    fn test_outer_counter_and_histories() {
        let (cfg, core) = load("assembly_2d3d.json");
        let mut s = driver(&cfg, core);
        outer(&mut s, 1.0);
        outer(&mut s, 1.0);
        assert_eq!(s.n_outer(), 2);
        assert_eq!(s.pin_residual(0).len(), 2);
        assert_eq!(s.pin_residual(1).len(), 2);
        assert_eq!(s.correction_residual().len(), 2 * s.n_group());
        let coarse = s.coarse_data().unwrap();
        assert!(coarse.has_axial() && coarse.has_radial());
    }

    #[test]
    fn test_inactive_moc_skips_corrections() {
        let (mut cfg, core) = load("assembly_2d3d.json");
        cfg.sweeper.coupling.inactive_moc = 2;
        let mut s = driver(&cfg, core);
        outer(&mut s, 1.0);
        outer(&mut s, 1.0);
        assert!(s.correction_residual().is_empty());
        outer(&mut s, 1.0);
        assert_eq!(s.correction_residual().len(), s.n_group());
    }

    #[test]
    fn test_sn_tracks_moc_pin_flux() {
        let (mut cfg, _) = load("assembly_2d3d.json");
        cfg.sweeper.n_inner = 40;
        if let Some(sn) = cfg.sweeper.sn_sweeper.as_mut() {
            sn.n_inner = 40;
        }
        let core = Arc::new(CoreMesh::from_config(&cfg).unwrap());
        let mut s = driver(&cfg, core);
        let mut k = 1.0;
        for _ in 0..20 {
            let old = s.total_fission(false);
            outer(&mut s, k);
            k *= s.total_fission(false) / old;
        }
        for g in 0..s.n_group() {
            let hist = s.pin_residual(g);
            assert_eq!(hist.len(), 20);
            let last = hist[hist.len() - 1];
            assert!(last.is_finite() && last < 1e-5, "group {g}: residual {last}");
        }
        assert!(k.is_finite() && k > 0.0);
    }

    #[test]
    fn test_tl_carries_axial_leakage() {
        let (mut cfg, _) = load("assembly_2d3d.json");
        cfg.core.boundary.top = Boundary::Vacuum;
        let core = Arc::new(CoreMesh::from_config(&cfg).unwrap());
        let n_pin = core.macroplanes().len() * core.mesh().n_cell_plane();
        let mut s = driver(&cfg, core);
        outer(&mut s, 1.0);
        for g in 0..s.n_group() {
            assert_eq!(s.tl(g).len(), n_pin);
            assert!(s.tl(g).iter().all(|&v| v == 0.0));
        }
        outer(&mut s, 1.0);
        for g in 0..s.n_group() {
            let tl = s.tl(g);
            assert!(tl.iter().all(|&v| v < 0.0), "group {g}: {tl:?}");
        }
    }

    #[test]
    fn test_sweep_requires_staged_source() {
        let (cfg, core) = load("assembly_2d3d.json");
        let mut s = driver(&cfg, core);
        assert!(matches!(s.sweep(0), Err(TransportError::StateMisuse(_))));
        assert!(s.coarse_data().is_some());
    }
}
