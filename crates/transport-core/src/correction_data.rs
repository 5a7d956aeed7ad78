// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — CDD Correction Factors
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Corrected-diamond-difference factors `α_x`, `α_y` and `β`.
//!
//! Factors are stored per macroplane cell: every physical plane of a
//! macroplane shares the factors the 2-D sweep of that macroplane produced.
//! Angles cover the upward hemisphere (octants 1-4); a downward Sn angle
//! uses the factors of its upward image.

use crate::output::{entry_index, OutputReader, OutputWriter};
use ndarray::{Array3, Array4};
use tracing::{debug, info};
use transport_mesh::mesh::Mesh;
use transport_types::config::CorrectionDataEntry;
use transport_types::error::{TransportError, TransportResult};
use transport_types::surface::Normal;

/// α of an uncorrected diamond difference.
pub const ALPHA_DD: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct CorrectionData {
    nx: usize,
    ny: usize,
    n_cell_plane: usize,
    /// Macroplane of every physical plane.
    macroplane_index: Vec<usize>,
    n_ang: usize,
    n_group: usize,
    /// `[g, ang, macroplane cell, normal]`.
    alpha: Array4<f64>,
    /// `[g, ang, macroplane cell]`.
    beta: Array3<f64>,
}

impl CorrectionData {
    /// Diamond-difference defaults: `α = 1/2`, `β = 1`.
    pub fn new(mesh: &Mesh, n_ang: usize, n_group: usize) -> Self {
        let n_cell = mesh.n_cell_plane() * mesh.n_macroplanes();
        CorrectionData {
            nx: mesh.nx(),
            ny: mesh.ny(),
            n_cell_plane: mesh.n_cell_plane(),
            macroplane_index: mesh.macroplane_index().to_vec(),
            n_ang,
            n_group,
            alpha: Array4::from_elem((n_group, n_ang, n_cell, 2), ALPHA_DD),
            beta: Array3::from_elem((n_group, n_ang, n_cell), 1.0),
        }
    }

    pub fn n_ang(&self) -> usize {
        self.n_ang
    }

    pub fn n_group(&self) -> usize {
        self.n_group
    }

    /// Cells across all macroplanes.
    pub fn n_cell(&self) -> usize {
        self.beta.dim().2
    }

    /// Macroplane cell of a 3-D coarse cell.
    pub fn macroplane_cell(&self, cell: usize) -> usize {
        let iz = cell / self.n_cell_plane;
        self.macroplane_index[iz] * self.n_cell_plane + cell % self.n_cell_plane
    }

    /// `normal` must be `X` or `Y`.
    pub fn alpha(&self, cell: usize, iang: usize, g: usize, normal: Normal) -> f64 {
        self.alpha[[g, iang, cell, normal.index()]]
    }

    pub fn set_alpha(&mut self, cell: usize, iang: usize, g: usize, normal: Normal, v: f64) {
        self.alpha[[g, iang, cell, normal.index()]] = v;
    }

    pub fn beta(&self, cell: usize, iang: usize, g: usize) -> f64 {
        self.beta[[g, iang, cell]]
    }

    pub fn set_beta(&mut self, cell: usize, iang: usize, g: usize, v: f64) {
        self.beta[[g, iang, cell]] = v;
    }

    /// Expand one macroplane-indexed field to `[nz, ny, nx]`.
    fn expand(&self, f: impl Fn(usize) -> f64) -> Array3<f64> {
        let nz = self.macroplane_index.len();
        Array3::from_shape_fn((nz, self.ny, self.nx), |(iz, iy, ix)| {
            f(self.macroplane_index[iz] * self.n_cell_plane + self.nx * iy + ix)
        })
    }

    /// Write `alpha_x/GGG/AAA`, `alpha_y/GGG/AAA` and `beta/GGG/AAA`.
    pub fn output(&self, out: &mut OutputWriter) -> TransportResult<()> {
        for g in 0..self.n_group {
            for iang in 0..self.n_ang {
                let suffix = format!("{}/{}", entry_index(g), entry_index(iang));
                let ax = self.expand(|c| self.alpha[[g, iang, c, 0]]);
                let ay = self.expand(|c| self.alpha[[g, iang, c, 1]]);
                let b = self.expand(|c| self.beta[[g, iang, c]]);
                out.write(&format!("alpha_x/{suffix}"), &ax)?;
                out.write(&format!("alpha_y/{suffix}"), &ay)?;
                out.write(&format!("beta/{suffix}"), &b)?;
            }
        }
        Ok(())
    }

    /// Read factors from archives, each covering `bottom_plane..=top_plane`.
    /// An archive with a single plane applies it to the whole range; one
    /// with every plane of the mesh is read plane by plane.
    pub fn load(&mut self, entries: &[CorrectionDataEntry]) -> TransportResult<()> {
        let nz = self.macroplane_index.len();

        // 1. Validate the ranges.
        let mut covered = vec![false; nz];
        for e in entries {
            if e.bottom_plane >= nz {
                return Err(TransportError::Config("Invalid bottom_plane".to_string()));
            }
            if e.top_plane >= nz || e.top_plane < e.bottom_plane {
                return Err(TransportError::Config("Invalid top_plane".to_string()));
            }
            for (ip, c) in covered
                .iter_mut()
                .enumerate()
                .take(e.top_plane + 1)
                .skip(e.bottom_plane)
            {
                if *c {
                    return Err(TransportError::Config(format!(
                        "Plane data is over-specified. Look at plane {ip}"
                    )));
                }
                *c = true;
            }
        }
        debug!(
            planes = ?covered.iter().enumerate().filter(|(_, &c)| c).map(|(i, _)| i).collect::<Vec<_>>(),
            "correction data coverage"
        );

        // 2. Read.
        for e in entries {
            let mut reader = OutputReader::open(&e.file)?;
            for g in 0..self.n_group {
                for iang in 0..self.n_ang {
                    let suffix = format!("{}/{}", entry_index(g), entry_index(iang));
                    let ax = reader.read_array3(&format!("alpha_x/{suffix}"))?;
                    let ay = reader.read_array3(&format!("alpha_y/{suffix}"))?;
                    let b = reader.read_array3(&format!("beta/{suffix}"))?;
                    for ip in e.bottom_plane..=e.top_plane {
                        let src_iz = match ax.dim().0 {
                            1 => 0,
                            n if n == nz => ip,
                            n => {
                                return Err(TransportError::Config(format!(
                                    "correction data in '{}' has {n} planes, expected 1 or {nz}",
                                    e.file
                                )))
                            }
                        };
                        if ax.dim().1 != self.ny || ax.dim().2 != self.nx {
                            return Err(TransportError::Config(format!(
                                "correction data in '{}' does not match the {}x{} pin mesh",
                                e.file, self.nx, self.ny
                            )));
                        }
                        let base = self.macroplane_index[ip] * self.n_cell_plane;
                        for iy in 0..self.ny {
                            for ix in 0..self.nx {
                                let c = base + self.nx * iy + ix;
                                self.alpha[[g, iang, c, 0]] = ax[[src_iz, iy, ix]];
                                self.alpha[[g, iang, c, 1]] = ay[[src_iz, iy, ix]];
                                self.beta[[g, iang, c]] = b[[src_iz, iy, ix]];
                            }
                        }
                    }
                }
            }
            info!(file = %e.file, bottom = e.bottom_plane, top = e.top_plane, "loaded correction data");
        }
        Ok(())
    }
}
