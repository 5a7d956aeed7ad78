// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Core Mesh
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Full core geometry: assemblies arranged on a grid, unique radial planes,
//! macroplanes, the coarse pin mesh and flat-source-region numbering.
//!
//! Regions are numbered macroplane by macroplane. Inside a macroplane they
//! follow the unique plane's pin order (`nx·iy + ix`), then each pin mesh.

use crate::lattice::{Assembly, Lattice, Pin};
use crate::material::MaterialLib;
use crate::mesh::Mesh;
use crate::pin_mesh::PinMesh;
use crate::plane::{MacroPlane, Plane, PlaneTrace};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info};
use transport_math::fp::fp_equiv_rel;
use transport_math::geom::Point2;
use transport_types::config::CaseConfig;
use transport_types::error::{TransportError, TransportResult};

#[derive(Debug, Clone)]
pub struct CoreMesh {
    materials: MaterialLib,
    mesh: Mesh,
    planes: Vec<Plane>,
    /// Unique plane of each physical plane.
    plane_of: Vec<usize>,
    macroplanes: Vec<MacroPlane>,
    n_reg: usize,
    reg_mat: Vec<u32>,
    /// Region volumes (area times macroplane height).
    reg_vol: Vec<f64>,
    /// Plane-local pin of each region.
    reg_pin: Vec<usize>,
    reg_macroplane: Vec<usize>,
    /// Fissile pins on the 3-D coarse grid.
    fuel: Vec<bool>,
}

fn build_map<C, T>(
    what: &str,
    cfgs: &[C],
    id: impl Fn(&C) -> u32,
    mut make: impl FnMut(&C) -> TransportResult<T>,
) -> TransportResult<HashMap<u32, Arc<T>>> {
    let mut out = HashMap::with_capacity(cfgs.len());
    for cfg in cfgs {
        if out.insert(id(cfg), Arc::new(make(cfg)?)).is_some() {
            return Err(TransportError::Config(format!("duplicate {what} id {}", id(cfg))));
        }
    }
    Ok(out)
}

impl CoreMesh {
    pub fn from_config(cfg: &CaseConfig) -> TransportResult<Self> {
        let materials = MaterialLib::from_config(&cfg.materials)?;
        let meshes = build_map("pin mesh", &cfg.pin_meshes, |c| c.id, PinMesh::from_config)?;
        let pins = build_map("pin", &cfg.pins, |c| c.id, |c| {
            Pin::from_config(c, &meshes, &materials)
        })?;
        let lattices = build_map("lattice", &cfg.lattices, |c| c.id, |c| {
            Lattice::from_config(c, &pins)
        })?;
        let assemblies = build_map("assembly", &cfg.assemblies, |c| c.id, |c| {
            Assembly::from_config(c, &lattices)
        })?;

        let core = &cfg.core;
        if core.nx == 0 || core.ny == 0 || core.assemblies.len() != core.nx * core.ny {
            return Err(TransportError::Config(format!(
                "core: {} assemblies listed for {}x{}",
                core.assemblies.len(),
                core.nx,
                core.ny
            )));
        }
        let mut grid: Vec<Arc<Assembly>> = Vec::with_capacity(core.nx * core.ny);
        for iy in 0..core.ny {
            let row = core.ny - 1 - iy;
            for ix in 0..core.nx {
                let id = core.assemblies[row * core.nx + ix];
                grid.push(assemblies.get(&id).cloned().ok_or_else(|| {
                    TransportError::Config(format!("core: unknown assembly {id}"))
                })?);
            }
        }
        let first = &grid[0];
        for asy in &grid[1..] {
            let same_z = asy.nz() == first.nz()
                && asy.subplanes() == first.subplanes()
                && asy.hz().iter().zip(first.hz()).all(|(a, b)| fp_equiv_rel(*a, *b));
            if !same_z {
                return Err(TransportError::Geometry(format!(
                    "core: assembly {} is not axially aligned with assembly {}",
                    asy.id, first.id
                )));
            }
        }

        // Pin pitches along the core, checked per assembly column and row.
        let at = |ix: usize, iy: usize| &grid[iy * core.nx + ix];
        let mut hx = Vec::new();
        for ix in 0..core.nx {
            let col = at(ix, 0).lattice(0).hx().to_vec();
            for iy in 0..core.ny {
                let asy = at(ix, iy);
                for iz in 0..asy.nz() {
                    let h = asy.lattice(iz).hx();
                    if h.len() != col.len() || h.iter().zip(&col).any(|(a, b)| !fp_equiv_rel(*a, *b)) {
                        return Err(TransportError::Geometry(format!(
                            "core: lattices do not stack in assembly column {ix}"
                        )));
                    }
                }
            }
            hx.extend(col);
        }
        let mut hy = Vec::new();
        for iy in 0..core.ny {
            let row = at(0, iy).lattice(0).hy().to_vec();
            for ix in 0..core.nx {
                let asy = at(ix, iy);
                for iz in 0..asy.nz() {
                    let h = asy.lattice(iz).hy();
                    if h.len() != row.len() || h.iter().zip(&row).any(|(a, b)| !fp_equiv_rel(*a, *b)) {
                        return Err(TransportError::Geometry(format!(
                            "core: lattices do not stack in assembly row {iy}"
                        )));
                    }
                }
            }
            hy.extend(row);
        }
        let mesh = Mesh::from_pitches(
            &hx,
            &hy,
            first.hz(),
            core.boundary.as_array(),
            first.subplanes().to_vec(),
        )?;

        // Unique planes keyed by the lattice in every assembly position.
        let (nx, ny) = (mesh.nx(), mesh.ny());
        let mut keys: HashMap<Vec<u32>, usize> = HashMap::new();
        let mut planes = Vec::new();
        let mut plane_of = Vec::with_capacity(mesh.nz());
        for iz in 0..mesh.nz() {
            let key: Vec<u32> = grid.iter().map(|a| a.lattice(iz).id).collect();
            if let Some(&id) = keys.get(&key) {
                plane_of.push(id);
                continue;
            }
            let mut plane_pins = Vec::with_capacity(nx * ny);
            for iy_asy in 0..core.ny {
                let lat_ny = at(0, iy_asy).lattice(iz).ny();
                for iy in 0..lat_ny {
                    for ix_asy in 0..core.nx {
                        let lat = at(ix_asy, iy_asy).lattice(iz);
                        for ix in 0..lat.nx() {
                            plane_pins.push(lat.pin(ix, iy).clone());
                        }
                    }
                }
            }
            let id = planes.len();
            planes.push(Plane::new(
                id,
                mesh.x_vec().to_vec(),
                mesh.y_vec().to_vec(),
                plane_pins,
            )?);
            keys.insert(key, id);
            plane_of.push(id);
        }

        let mut macroplanes = Vec::with_capacity(mesh.n_macroplanes());
        let mut n_reg = 0;
        let mut reg_mat = Vec::new();
        let mut reg_vol = Vec::new();
        let mut reg_pin = Vec::new();
        let mut reg_macroplane = Vec::new();
        for imp in 0..mesh.n_macroplanes() {
            let first_plane = mesh.macroplane_first(imp);
            let plane = &planes[plane_of[first_plane]];
            let height = mesh.macroplane_height(imp);
            macroplanes.push(MacroPlane {
                plane: plane.id(),
                first_plane,
                n_planes: mesh.macroplanes()[imp],
                height,
                first_reg: n_reg,
            });
            reg_mat.extend(plane.materials());
            reg_vol.extend(plane.areas().into_iter().map(|a| a * height));
            for ipin in 0..plane.pins().len() {
                reg_pin.extend(std::iter::repeat(ipin).take(plane.pin_regs(ipin).len()));
            }
            reg_macroplane.extend(std::iter::repeat(imp).take(plane.n_reg()));
            n_reg += plane.n_reg();
        }

        let mut fuel = Vec::with_capacity(mesh.n_pin());
        for iz in 0..mesh.nz() {
            for pin in planes[plane_of[iz]].pins() {
                fuel.push(pin.is_fuel(&materials));
            }
        }

        info!(
            case = %cfg.case_name,
            nx,
            ny,
            nz = mesh.nz(),
            unique_planes = planes.len(),
            macroplanes = macroplanes.len(),
            n_reg,
            "core mesh built"
        );
        for (imp, mp) in macroplanes.iter().enumerate() {
            debug!(
                "macroplane {imp}: planes {:?}, unique plane {}, height {}",
                mp.planes(),
                mp.plane,
                mp.height
            );
        }

        Ok(CoreMesh {
            materials,
            mesh,
            planes,
            plane_of,
            macroplanes,
            n_reg,
            reg_mat,
            reg_vol,
            reg_pin,
            reg_macroplane,
            fuel,
        })
    }

    pub fn materials(&self) -> &MaterialLib {
        &self.materials
    }

    /// Coarse pin mesh.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Unique plane of physical plane `iz`.
    pub fn plane_of(&self, iz: usize) -> usize {
        self.plane_of[iz]
    }

    pub fn macroplanes(&self) -> &[MacroPlane] {
        &self.macroplanes
    }

    pub fn macroplane_plane(&self, imp: usize) -> &Plane {
        &self.planes[self.macroplanes[imp].plane]
    }

    pub fn n_reg(&self) -> usize {
        self.n_reg
    }

    pub fn reg_materials(&self) -> &[u32] {
        &self.reg_mat
    }

    pub fn vols(&self) -> &[f64] {
        &self.reg_vol
    }

    /// Plane-local pin of every region.
    pub fn reg_pin(&self) -> &[usize] {
        &self.reg_pin
    }

    pub fn reg_macroplane(&self) -> &[usize] {
        &self.reg_macroplane
    }

    pub fn macroplane_regs(&self, imp: usize) -> Range<usize> {
        let mp = &self.macroplanes[imp];
        mp.first_reg..mp.first_reg + self.planes[mp.plane].n_reg()
    }

    /// Core-level regions of plane-local pin `ipin` in macroplane `imp`.
    pub fn pin_regs(&self, imp: usize, ipin: usize) -> Range<usize> {
        let mp = &self.macroplanes[imp];
        let r = self.planes[mp.plane].pin_regs(ipin);
        mp.first_reg + r.start..mp.first_reg + r.end
    }

    /// Coarse cell holds fissile material.
    pub fn is_fuel(&self, cell: usize) -> bool {
        self.fuel[cell]
    }

    /// Trace `p1 → p2` across unique plane `plane`, appending plane-local
    /// segments.
    pub fn trace(
        &self,
        plane: usize,
        p1: Point2,
        p2: Point2,
        seg_len: &mut Vec<f64>,
        seg_reg: &mut Vec<usize>,
    ) -> TransportResult<PlaneTrace> {
        self.planes[plane].trace(p1, p2, seg_len, seg_reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn load(name: &str) -> CaseConfig {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("validation")
            .join(name);
        CaseConfig::from_file(&path.to_string_lossy()).unwrap()
    }

    #[test]
    fn test_single_pin() {
        let core = CoreMesh::from_config(&load("pin_ihm_2g.json")).unwrap();
        assert_eq!(core.mesh().n_pin(), 1);
        // Two equal-volume sub-rings plus the moderator ring, 8 sectors.
        assert_eq!(core.n_reg(), 3 * 8);
        let total: f64 = core.vols().iter().sum();
        assert!((total - 1.26 * 1.26).abs() < 1e-10);
        assert!(core.is_fuel(0));
    }

    #[test]
    fn test_lattice_fuel_map() {
        let core = CoreMesh::from_config(&load("lattice_3x3_2d.json")).unwrap();
        let m = core.mesh();
        assert_eq!((m.nx(), m.ny(), m.nz()), (3, 3, 1));
        assert!(!core.is_fuel(4));
        assert!(core.is_fuel(0));
        for ipin in 0..9 {
            let regs = core.pin_regs(0, ipin);
            assert!(regs.clone().all(|r| core.reg_pin()[r] == ipin));
        }
    }

    #[test]
    fn test_assembly_macroplanes() {
        let core = CoreMesh::from_config(&load("assembly_2d3d.json")).unwrap();
        assert_eq!(core.planes().len(), 1);
        assert_eq!(core.macroplanes().len(), 2);
        let mp = core.macroplanes()[1];
        assert_eq!(mp.planes(), 2..4);
        assert!((mp.height - 2.0).abs() < 1e-14);
        assert_eq!(core.macroplane_regs(1).start, core.macroplane_regs(0).end);
        // Volumes in a macroplane add up to the slab it spans.
        let v: f64 = core.macroplane_regs(1).map(|r| core.vols()[r]).sum();
        assert!((v - 2.52 * 2.52 * 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_misaligned_core_rejected() {
        let mut cfg = load("assembly_2d3d.json");
        cfg.core.assemblies = vec![1, 1];
        assert!(CoreMesh::from_config(&cfg).is_err());
    }
}
