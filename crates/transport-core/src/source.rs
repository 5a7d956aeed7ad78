// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Isotropic Source
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Group source assembly for the sweepers.
//!
//! A group source is built in stages: `initialize_group` (external source
//! or zero), `fission`, `in_scatter`, then any additive terms such as
//! transverse leakage. `self_scatter` folds in the within-group scattering
//! and produces the angular source `q` used by the sweep kernel.

use crate::xs_mesh::XsMesh;
use ndarray::Array2;
use transport_types::constants::RFPI;
use transport_types::error::{TransportError, TransportResult};

#[derive(Debug, Clone)]
pub struct Source {
    n_reg: usize,
    n_group: usize,
    /// Divide the angular source by σ_tr, as the MoC kernel expects.
    scale_transport: bool,
    source_1g: Vec<f64>,
    q: Vec<f64>,
    /// External source density `[reg, g]`.
    external: Option<Array2<f64>>,
}

impl Source {
    pub fn new(n_reg: usize, n_group: usize, scale_transport: bool) -> Self {
        Source {
            n_reg,
            n_group,
            scale_transport,
            source_1g: vec![0.0; n_reg],
            q: vec![0.0; n_reg],
            external: None,
        }
    }

    /// Take the external source from the cross-section mesh, if it has one.
    pub fn with_external_from(mut self, xs: &XsMesh) -> Self {
        if xs.has_external_source() {
            let mut ext = Array2::zeros((self.n_reg, self.n_group));
            for xsr in xs.regions() {
                for &r in xsr.regs() {
                    for g in 0..self.n_group {
                        ext[[r, g]] = xsr.source[g];
                    }
                }
            }
            self.external = Some(ext);
        }
        self
    }

    pub fn set_external(&mut self, external: Array2<f64>) -> TransportResult<()> {
        if external.dim() != (self.n_reg, self.n_group) {
            return Err(TransportError::Config(format!(
                "external source has shape {:?}, expected ({}, {})",
                external.dim(),
                self.n_reg,
                self.n_group
            )));
        }
        self.external = Some(external);
        Ok(())
    }

    pub fn has_external(&self) -> bool {
        self.external.is_some()
    }

    pub fn n_reg(&self) -> usize {
        self.n_reg
    }

    /// Reset to the external source of group `g`, or zero.
    pub fn initialize_group(&mut self, g: usize) {
        match &self.external {
            Some(ext) => {
                for (s, &e) in self.source_1g.iter_mut().zip(ext.column(g)) {
                    *s = e;
                }
            }
            None => self.source_1g.fill(0.0),
        }
    }

    /// Add `χ_g · fs` with a fission source `fs` already divided by k.
    pub fn fission(&mut self, xs: &XsMesh, fs: &[f64], g: usize) {
        for xsr in xs.regions() {
            let chi = xsr.chi[g];
            if chi == 0.0 {
                continue;
            }
            for &r in xsr.regs() {
                self.source_1g[r] += chi * fs[r];
            }
        }
    }

    /// Add scattering into `g` from every other group.
    pub fn in_scatter(&mut self, xs: &XsMesh, flux: &Array2<f64>, g: usize) {
        for xsr in xs.regions() {
            let row = xsr.scat().to(g);
            for &r in xsr.regs() {
                let mut s = 0.0;
                for (gp, v) in row.iter() {
                    if gp != g {
                        s += v * flux[[r, gp]];
                    }
                }
                self.source_1g[r] += s;
            }
        }
    }

    /// Add an arbitrary per-region term to the group source.
    pub fn add(&mut self, extra: &[f64]) {
        for (s, &e) in self.source_1g.iter_mut().zip(extra) {
            *s += e;
        }
    }

    /// Build the angular source from the group source and the current
    /// group flux. `xstr` is the per-region transport cross section the
    /// sweep uses; it is only read when scaling by σ_tr.
    pub fn self_scatter(&mut self, xs: &XsMesh, flux_1g: &[f64], xstr: &[f64], g: usize) {
        for xsr in xs.regions() {
            let sgg = xsr.scat().self_scat(g);
            for &r in xsr.regs() {
                let mut q = (self.source_1g[r] + sgg * flux_1g[r]) * RFPI;
                if self.scale_transport {
                    q /= xstr[r];
                }
                self.q[r] = q;
            }
        }
    }

    /// Group source without self-scatter.
    pub fn source_1g(&self) -> &[f64] {
        &self.source_1g
    }

    pub fn source_1g_mut(&mut self) -> &mut [f64] {
        &mut self.source_1g
    }

    /// Angular source for a direction. The source is isotropic, so the
    /// angle is ignored.
    pub fn get_transport(&self, _iang: usize) -> &[f64] {
        &self.q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use transport_mesh::core_mesh::CoreMesh;
    use transport_types::config::CaseConfig;
    use transport_types::constants::FPI;

    fn xs(name: &str) -> XsMesh {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("validation")
            .join(name);
        let cfg = CaseConfig::from_file(&path.to_string_lossy()).unwrap();
        let core = CoreMesh::from_config(&cfg).unwrap();
        XsMesh::from_core(&core, &cfg.eubounds).unwrap()
    }

    #[test]
    fn test_fission_and_scatter() {
        let xs = xs("pin_ihm_2g.json");
        let n = xs.n_reg();
        let mut src = Source::new(n, 2, true);
        let flux = Array2::from_elem((n, 2), 1.0);
        let fs = vec![1.0; n];
        src.initialize_group(1);
        src.fission(&xs, &fs, 1);
        src.in_scatter(&xs, &flux, 1);
        let xsr = &xs.regions()[0];
        let expect = xsr.chi[1] + xsr.scat().to(1).from(0);
        assert!(src.source_1g().iter().all(|&s| (s - expect).abs() < 1e-12));
    }

    #[test]
    fn test_self_scatter_scaling() {
        let xs = xs("pin_ihm_2g.json");
        let n = xs.n_reg();
        let xstr = xs.expand_xstr(0);
        let mut moc = Source::new(n, 2, true);
        let mut sn = Source::new(n, 2, false);
        for s in [&mut moc, &mut sn] {
            s.initialize_group(0);
            s.add(&vec![2.0; n]);
            s.self_scatter(&xs, &vec![0.0; n], &xstr, 0);
        }
        assert!((sn.get_transport(0)[0] - 2.0 / FPI).abs() < 1e-14);
        assert!((moc.get_transport(3)[0] - 2.0 / FPI / xstr[0]).abs() < 1e-14);
    }

    #[test]
    fn test_external_source() {
        let xs = xs("rect_fixed_source.json");
        let src = Source::new(xs.n_reg(), 1, true).with_external_from(&xs);
        assert!(src.has_external());
        let mut src = src;
        src.initialize_group(0);
        assert!(src.source_1g().iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_external_shape_checked() {
        let mut src = Source::new(4, 2, false);
        assert!(src.set_external(Array2::zeros((4, 1))).is_err());
        assert!(src.set_external(Array2::zeros((4, 2))).is_ok());
    }
}
