// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Pins, Lattices, Assemblies
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::material::MaterialLib;
use crate::pin_mesh::PinMesh;
use std::collections::HashMap;
use std::sync::Arc;
use transport_math::fp::fp_equiv_rel;
use transport_types::config::{AssemblyConfig, LatticeConfig, PinConfig};
use transport_types::error::{TransportError, TransportResult};

/// A pin mesh filled with one material per cross-section region.
#[derive(Debug, Clone)]
pub struct Pin {
    pub id: u32,
    pub mesh: Arc<PinMesh>,
    pub mat_ids: Vec<u32>,
}

impl Pin {
    pub fn from_config(
        cfg: &PinConfig,
        meshes: &HashMap<u32, Arc<PinMesh>>,
        materials: &MaterialLib,
    ) -> TransportResult<Self> {
        let mesh = meshes.get(&cfg.mesh).cloned().ok_or_else(|| {
            TransportError::Config(format!("pin {}: unknown pin mesh {}", cfg.id, cfg.mesh))
        })?;
        if cfg.materials.len() != mesh.n_xsreg() {
            return Err(TransportError::Config(format!(
                "pin {}: {} materials given, mesh {} has {} regions",
                cfg.id,
                cfg.materials.len(),
                mesh.id(),
                mesh.n_xsreg()
            )));
        }
        for &m in &cfg.materials {
            materials.get(m)?;
        }
        Ok(Pin {
            id: cfg.id,
            mesh,
            mat_ids: cfg.materials.clone(),
        })
    }

    /// Material of each flat source region, in region order.
    pub fn fsr_materials(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.mesh.n_reg());
        for (ixs, &mat) in self.mat_ids.iter().enumerate() {
            out.extend(std::iter::repeat(mat).take(self.mesh.n_fsrs(ixs)));
        }
        out
    }

    /// True if any region holds a fissile material.
    pub fn is_fuel(&self, materials: &MaterialLib) -> bool {
        self.mat_ids
            .iter()
            .any(|&m| materials.get(m).map(|mat| mat.is_fissile()).unwrap_or(false))
    }
}

/// Rectangular arrangement of pins, stored bottom row first.
#[derive(Debug, Clone)]
pub struct Lattice {
    pub id: u32,
    nx: usize,
    ny: usize,
    pins: Vec<Arc<Pin>>,
    hx: Vec<f64>,
    hy: Vec<f64>,
}

impl Lattice {
    pub fn from_config(cfg: &LatticeConfig, pins: &HashMap<u32, Arc<Pin>>) -> TransportResult<Self> {
        if cfg.nx == 0 || cfg.ny == 0 || cfg.pins.len() != cfg.nx * cfg.ny {
            return Err(TransportError::Config(format!(
                "lattice {}: {} pins listed for {}x{}",
                cfg.id,
                cfg.pins.len(),
                cfg.nx,
                cfg.ny
            )));
        }
        let mut grid = Vec::with_capacity(cfg.pins.len());
        // Input rows run top-down; flip to bottom-up.
        for iy in 0..cfg.ny {
            let row = cfg.ny - 1 - iy;
            for ix in 0..cfg.nx {
                let id = cfg.pins[row * cfg.nx + ix];
                let pin = pins.get(&id).cloned().ok_or_else(|| {
                    TransportError::Config(format!("lattice {}: unknown pin {id}", cfg.id))
                })?;
                grid.push(pin);
            }
        }
        let mut hx = vec![0.0; cfg.nx];
        let mut hy = vec![0.0; cfg.ny];
        for iy in 0..cfg.ny {
            for ix in 0..cfg.nx {
                let pm = &grid[iy * cfg.nx + ix].mesh;
                if iy == 0 {
                    hx[ix] = pm.pitch_x();
                } else if !fp_equiv_rel(hx[ix], pm.pitch_x()) {
                    return Err(TransportError::Geometry(format!(
                        "lattice {}: pins in column {ix} have different pitches",
                        cfg.id
                    )));
                }
                if ix == 0 {
                    hy[iy] = pm.pitch_y();
                } else if !fp_equiv_rel(hy[iy], pm.pitch_y()) {
                    return Err(TransportError::Geometry(format!(
                        "lattice {}: pins in row {iy} have different pitches",
                        cfg.id
                    )));
                }
            }
        }
        Ok(Lattice {
            id: cfg.id,
            nx: cfg.nx,
            ny: cfg.ny,
            pins: grid,
            hx,
            hy,
        })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn pin(&self, ix: usize, iy: usize) -> &Arc<Pin> {
        &self.pins[iy * self.nx + ix]
    }

    /// Pin pitches along x.
    pub fn hx(&self) -> &[f64] {
        &self.hx
    }

    /// Pin pitches along y.
    pub fn hy(&self) -> &[f64] {
        &self.hy
    }

    pub fn width(&self) -> f64 {
        self.hx.iter().sum()
    }

    pub fn height(&self) -> f64 {
        self.hy.iter().sum()
    }

    /// Same footprint and same pin in every position.
    pub fn geometrically_equal(&self, other: &Lattice) -> bool {
        self.nx == other.nx
            && self.ny == other.ny
            && self
                .pins
                .iter()
                .zip(&other.pins)
                .all(|(a, b)| Arc::ptr_eq(a, b) || a.id == b.id)
    }
}

/// Axial stack of lattices with plane heights and subplane grouping.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub id: u32,
    lattices: Vec<Arc<Lattice>>,
    hz: Vec<f64>,
    subplanes: Vec<usize>,
}

impl Assembly {
    pub fn from_config(
        cfg: &AssemblyConfig,
        lattices: &HashMap<u32, Arc<Lattice>>,
    ) -> TransportResult<Self> {
        let nz = cfg.lattices.len();
        if nz == 0 {
            return Err(TransportError::Config(format!("assembly {}: no planes", cfg.id)));
        }
        let hz = match cfg.hz.len() {
            1 => vec![cfg.hz[0]; nz],
            n if n == nz => cfg.hz.clone(),
            n => {
                return Err(TransportError::Config(format!(
                    "assembly {}: {n} plane heights for {nz} planes",
                    cfg.id
                )))
            }
        };
        if hz.iter().any(|&h| h <= 0.0 || !h.is_finite()) {
            return Err(TransportError::Config(format!(
                "assembly {}: plane heights must be positive",
                cfg.id
            )));
        }
        let subplanes = if cfg.subplanes.is_empty() {
            vec![1; nz]
        } else {
            cfg.subplanes.clone()
        };
        if subplanes.iter().sum::<usize>() != nz || subplanes.iter().any(|&n| n == 0) {
            return Err(TransportError::Config(format!(
                "assembly {}: subplanes {:?} do not partition {nz} planes",
                cfg.id, subplanes
            )));
        }
        let mut stack = Vec::with_capacity(nz);
        for &id in &cfg.lattices {
            stack.push(lattices.get(&id).cloned().ok_or_else(|| {
                TransportError::Config(format!("assembly {}: unknown lattice {id}", cfg.id))
            })?);
        }
        if stack.windows(2).any(|w| {
            !fp_equiv_rel(w[0].width(), w[1].width()) || !fp_equiv_rel(w[0].height(), w[1].height())
        }) {
            return Err(TransportError::Geometry(format!(
                "assembly {}: lattices do not stack",
                cfg.id
            )));
        }
        // Planes sharing one macroplane must be the same geometry.
        let mut iz = 0;
        for &n in &subplanes {
            for k in 1..n {
                if !stack[iz].geometrically_equal(&stack[iz + k]) {
                    return Err(TransportError::Geometry(format!(
                        "assembly {}: macroplane starting at plane {iz} mixes lattices",
                        cfg.id
                    )));
                }
            }
            iz += n;
        }
        Ok(Assembly {
            id: cfg.id,
            lattices: stack,
            hz,
            subplanes,
        })
    }

    pub fn nz(&self) -> usize {
        self.lattices.len()
    }

    pub fn lattice(&self, iz: usize) -> &Arc<Lattice> {
        &self.lattices[iz]
    }

    pub fn hz(&self) -> &[f64] {
        &self.hz
    }

    pub fn subplanes(&self) -> &[usize] {
        &self.subplanes
    }

    pub fn width(&self) -> f64 {
        self.lattices[0].width()
    }

    pub fn height(&self) -> f64 {
        self.lattices[0].height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport_types::config::MaterialConfig;

    fn lib() -> MaterialLib {
        MaterialLib::from_config(&[MaterialConfig {
            id: 1,
            name: "m".into(),
            xstr: vec![1.0],
            xsnf: vec![0.1],
            xskf: vec![],
            chi: vec![1.0],
            scatter: vec![vec![0.5]],
            source: vec![],
        }])
        .unwrap()
    }

    fn pins() -> HashMap<u32, Arc<Pin>> {
        let mut meshes = HashMap::new();
        meshes.insert(1, Arc::new(PinMesh::rectangular(1, 1.0, 1, 1).unwrap()));
        meshes.insert(2, Arc::new(PinMesh::rectangular(2, 2.0, 1, 1).unwrap()));
        let lib = lib();
        let mut out = HashMap::new();
        for (id, mesh) in [(1, 1), (2, 1), (3, 2)] {
            let cfg = PinConfig { id, mesh, materials: vec![1] };
            out.insert(id, Arc::new(Pin::from_config(&cfg, &meshes, &lib).unwrap()));
        }
        out
    }

    #[test]
    fn test_lattice_rows_flipped() {
        let cfg = LatticeConfig { id: 1, nx: 2, ny: 2, pins: vec![1, 2, 2, 1] };
        let lat = Lattice::from_config(&cfg, &pins()).unwrap();
        // Top row in input is [1, 2]; it is stored as iy = 1.
        assert_eq!(lat.pin(0, 1).id, 1);
        assert_eq!(lat.pin(1, 1).id, 2);
        assert_eq!(lat.pin(0, 0).id, 2);
        assert!((lat.width() - 2.0).abs() < 1e-15);
    }

    #[test]
    fn test_lattice_mixed_pitch_rejected() {
        let cfg = LatticeConfig { id: 1, nx: 2, ny: 1, pins: vec![1, 3] };
        let err = Lattice::from_config(&cfg, &pins()).unwrap_err();
        assert!(err.to_string().contains("different pitches"));
    }

    #[test]
    fn test_assembly_subplanes() {
        let mut lats = HashMap::new();
        let l1 = LatticeConfig { id: 1, nx: 1, ny: 1, pins: vec![1] };
        let l2 = LatticeConfig { id: 2, nx: 1, ny: 1, pins: vec![2] };
        lats.insert(1, Arc::new(Lattice::from_config(&l1, &pins()).unwrap()));
        lats.insert(2, Arc::new(Lattice::from_config(&l2, &pins()).unwrap()));
        let ok = AssemblyConfig { id: 1, lattices: vec![1, 1, 2], hz: vec![1.0], subplanes: vec![2, 1] };
        let asy = Assembly::from_config(&ok, &lats).unwrap();
        assert_eq!(asy.nz(), 3);
        assert_eq!(asy.hz(), &[1.0, 1.0, 1.0]);
        let bad = AssemblyConfig { id: 2, lattices: vec![1, 2, 2], hz: vec![1.0], subplanes: vec![2, 1] };
        assert!(Assembly::from_config(&bad, &lats).is_err());
        let short = AssemblyConfig { id: 3, lattices: vec![1, 1], hz: vec![1.0], subplanes: vec![3] };
        assert!(Assembly::from_config(&short, &lats).is_err());
    }
}
