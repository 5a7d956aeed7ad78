// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Cross-Section Meshes
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Cross sections grouped by region.
//!
//! `XsMesh` groups flat source regions by material. `XsMeshHomogenized`
//! holds one region per 3-D coarse cell, homogenized from the fine regions
//! of the pin.

use ndarray::Array2;
use std::ops::Range;
use tracing::debug;
use transport_mesh::core_mesh::CoreMesh;
use transport_mesh::material::{Material, ScatteringMatrix};
use transport_types::error::{TransportError, TransportResult};

/// Cross sections shared by a set of regions.
#[derive(Debug, Clone)]
pub struct XsMeshRegion {
    regs: Vec<usize>,
    pub xstr: Vec<f64>,
    pub xsnf: Vec<f64>,
    pub xskf: Vec<f64>,
    pub chi: Vec<f64>,
    pub xsrm: Vec<f64>,
    /// External isotropic source density per group.
    pub source: Vec<f64>,
    scat: ScatteringMatrix,
}

impl XsMeshRegion {
    fn from_material(regs: Vec<usize>, mat: &Material) -> Self {
        XsMeshRegion {
            regs,
            xstr: mat.xstr.clone(),
            xsnf: mat.xsnf.clone(),
            xskf: mat.xskf.clone(),
            chi: mat.chi.clone(),
            xsrm: (0..mat.n_group()).map(|g| mat.xsrm(g)).collect(),
            source: mat.source.clone(),
            scat: mat.scat.clone(),
        }
    }

    /// Regions (FSRs or coarse cells) using these cross sections.
    pub fn regs(&self) -> &[usize] {
        &self.regs
    }

    pub fn scat(&self) -> &ScatteringMatrix {
        &self.scat
    }

    pub fn is_fissile(&self) -> bool {
        self.xsnf.iter().any(|&v| v > 0.0)
    }
}

#[derive(Debug, Clone)]
pub struct XsMesh {
    n_group: usize,
    n_reg: usize,
    eubounds: Vec<f64>,
    regions: Vec<XsMeshRegion>,
}

impl XsMesh {
    /// One region per material present in the core, in material id order.
    pub fn from_core(core: &CoreMesh, eubounds: &[f64]) -> TransportResult<Self> {
        let lib = core.materials();
        let mut by_mat: Vec<Vec<usize>> = vec![Vec::new(); lib.len()];
        for (ireg, &id) in core.reg_materials().iter().enumerate() {
            let imat = lib
                .index_of(id)
                .ok_or_else(|| TransportError::Config(format!("unknown material id {id}")))?;
            by_mat[imat].push(ireg);
        }
        let regions: Vec<XsMeshRegion> = lib
            .iter()
            .zip(by_mat)
            .filter(|(_, regs)| !regs.is_empty())
            .map(|(mat, regs)| XsMeshRegion::from_material(regs, mat))
            .collect();
        debug!(n_xsreg = regions.len(), n_reg = core.n_reg(), "fine cross-section mesh");
        Ok(XsMesh {
            n_group: lib.n_group(),
            n_reg: core.n_reg(),
            eubounds: eubounds.to_vec(),
            regions,
        })
    }

    pub fn n_group(&self) -> usize {
        self.n_group
    }

    pub fn n_reg(&self) -> usize {
        self.n_reg
    }

    pub fn eubounds(&self) -> &[f64] {
        &self.eubounds
    }

    pub fn regions(&self) -> &[XsMeshRegion] {
        &self.regions
    }

    /// Per-region transport cross section of group `g`.
    pub fn expand_xstr(&self, g: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.n_reg];
        for xsr in &self.regions {
            for &r in xsr.regs() {
                out[r] = xsr.xstr[g];
            }
        }
        out
    }

    /// Any region carries a non-zero external source.
    pub fn has_external_source(&self) -> bool {
        self.regions.iter().any(|x| x.source.iter().any(|&s| s != 0.0))
    }
}

/// FSRs of every 3-D coarse cell. Cells in the same macroplane share FSRs.
pub fn cell_fsrs(core: &CoreMesh) -> Vec<Range<usize>> {
    let mesh = core.mesh();
    let n_cell_plane = mesh.n_cell_plane();
    let mut out = Vec::with_capacity(mesh.n_pin());
    for &imp in mesh.macroplane_index() {
        for ipin in 0..n_cell_plane {
            out.push(core.pin_regs(imp, ipin));
        }
    }
    out
}

/// Pin-homogenized cross sections on the 3-D coarse mesh.
#[derive(Debug, Clone)]
pub struct XsMeshHomogenized {
    xs: XsMesh,
    fsrs: Vec<Range<usize>>,
    vols: Vec<f64>,
    /// Index into `materials` of every FSR.
    reg_mat: Vec<usize>,
    materials: Vec<Material>,
}

impl XsMeshHomogenized {
    /// Volume-weighted homogenization of every coarse cell.
    pub fn from_core(core: &CoreMesh, eubounds: &[f64]) -> TransportResult<Self> {
        let lib = core.materials();
        let materials: Vec<Material> = lib.iter().cloned().collect();
        let reg_mat = core
            .reg_materials()
            .iter()
            .map(|&id| {
                lib.index_of(id)
                    .ok_or_else(|| TransportError::Config(format!("unknown material id {id}")))
            })
            .collect::<TransportResult<Vec<usize>>>()?;
        let fsrs = cell_fsrs(core);
        let n_cell = fsrs.len();
        let mut hom = XsMeshHomogenized {
            xs: XsMesh {
                n_group: lib.n_group(),
                n_reg: n_cell,
                eubounds: eubounds.to_vec(),
                regions: Vec::with_capacity(n_cell),
            },
            fsrs,
            vols: core.vols().to_vec(),
            reg_mat,
            materials,
        };
        let ng = lib.n_group();
        let unit = Array2::from_elem((core.n_reg(), ng), 1.0);
        let regions: Vec<XsMeshRegion> = (0..n_cell).map(|c| hom.homogenize_cell(c, &unit)).collect();
        hom.xs.regions = regions;
        Ok(hom)
    }

    pub fn xs_mesh(&self) -> &XsMesh {
        &self.xs
    }

    pub fn n_cell(&self) -> usize {
        self.fsrs.len()
    }

    pub fn region(&self, cell: usize) -> &XsMeshRegion {
        &self.xs.regions[cell]
    }

    pub fn xstr(&self, cell: usize, g: usize) -> f64 {
        self.xs.regions[cell].xstr[g]
    }

    /// FSRs of coarse cell `cell`.
    pub fn fsrs(&self, cell: usize) -> Range<usize> {
        self.fsrs[cell].clone()
    }

    /// Flux-volume-weighted re-homogenization with a fine flux `[reg, g]`.
    pub fn update(&mut self, flux: &Array2<f64>) {
        let regions: Vec<XsMeshRegion> =
            (0..self.fsrs.len()).map(|c| self.homogenize_cell(c, flux)).collect();
        self.xs.regions = regions;
    }

    /// Volume average of a fine per-region field on every coarse cell.
    pub fn homogenize(&self, fine: &[f64]) -> Vec<f64> {
        self.fsrs
            .iter()
            .map(|r| {
                let (mut num, mut den) = (0.0, 0.0);
                for ireg in r.clone() {
                    num += fine[ireg] * self.vols[ireg];
                    den += self.vols[ireg];
                }
                num / den
            })
            .collect()
    }

    fn homogenize_cell(&self, cell: usize, flux: &Array2<f64>) -> XsMeshRegion {
        let ng = self.xs.n_group;
        let mut out = XsMeshRegion {
            regs: vec![cell],
            xstr: vec![0.0; ng],
            xsnf: vec![0.0; ng],
            xskf: vec![0.0; ng],
            chi: vec![0.0; ng],
            xsrm: vec![0.0; ng],
            source: vec![0.0; ng],
            scat: ScatteringMatrix::from_dense(&vec![vec![0.0; ng]; ng]),
        };
        let mut scat = vec![vec![0.0; ng]; ng];
        let mut fs_total = 0.0;
        let regs = self.fsrs[cell].clone();

        // 1. Fission-source weight of every region for χ.
        for ireg in regs.clone() {
            let mat = &self.materials[self.reg_mat[ireg]];
            let v = self.vols[ireg];
            let fs: f64 = (0..ng).map(|g| mat.xsnf[g] * flux[[ireg, g]] * v).sum();
            fs_total += fs;
            for g in 0..ng {
                out.chi[g] += mat.chi[g] * fs;
            }
        }

        // 2. Flux-volume weighted reactions.
        for g in 0..ng {
            let mut fluxvol = 0.0;
            for ireg in regs.clone() {
                let mat = &self.materials[self.reg_mat[ireg]];
                let fv = flux[[ireg, g]] * self.vols[ireg];
                fluxvol += fv;
                out.xstr[g] += mat.xstr[g] * fv;
                out.xsnf[g] += mat.xsnf[g] * fv;
                out.xskf[g] += mat.xskf[g] * fv;
                out.source[g] += mat.source[g] * self.vols[ireg];
                // Column `g` of the dense matrix: scattering out of group g.
                for (to, row) in scat.iter_mut().enumerate() {
                    row[g] += mat.scat.to(to).from(g) * fv;
                }
            }
            let vol: f64 = regs.clone().map(|r| self.vols[r]).sum();
            if fluxvol > 0.0 {
                out.xstr[g] /= fluxvol;
                out.xsnf[g] /= fluxvol;
                out.xskf[g] /= fluxvol;
                for row in scat.iter_mut() {
                    row[g] /= fluxvol;
                }
            }
            out.source[g] /= vol;
        }
        if fs_total > 0.0 {
            for c in out.chi.iter_mut() {
                *c /= fs_total;
            }
        }
        out.scat = ScatteringMatrix::from_dense(&scat);
        for g in 0..ng {
            out.xsrm[g] = out.xstr[g] - out.scat.self_scat(g);
        }
        out
    }
}
