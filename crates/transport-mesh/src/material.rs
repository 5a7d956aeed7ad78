// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Materials
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Macroscopic cross sections and banded scattering matrices.

use std::collections::BTreeMap;
use transport_types::config::MaterialConfig;
use transport_types::error::{TransportError, TransportResult};

/// In-scatter into one destination group, stored over the band of source
/// groups `min_g..=max_g` that contribute.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatteringRow {
    pub min_g: usize,
    pub max_g: usize,
    values: Vec<f64>,
}

impl ScatteringRow {
    /// Scattering from source group `from`, zero outside the band.
    pub fn from(&self, from: usize) -> f64 {
        if from < self.min_g || from > self.max_g {
            0.0
        } else {
            self.values[from - self.min_g]
        }
    }

    /// `(source group, value)` pairs over the band.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, &v)| (self.min_g + i, v))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatteringMatrix {
    rows: Vec<ScatteringRow>,
    /// Total outscatter per source group.
    out: Vec<f64>,
}

impl ScatteringMatrix {
    /// Build from a dense `[to][from]` matrix.
    pub fn from_dense(dense: &[Vec<f64>]) -> Self {
        let ng = dense.len();
        let mut rows = Vec::with_capacity(ng);
        let mut out = vec![0.0; ng];
        for (to, row) in dense.iter().enumerate() {
            let nonzero: Vec<usize> = (0..ng).filter(|&g| row[g] != 0.0).collect();
            // Keep the self-scatter slot even when it is zero.
            let min_g = nonzero.first().copied().unwrap_or(to).min(to);
            let max_g = nonzero.last().copied().unwrap_or(to).max(to);
            let values = row[min_g..=max_g].to_vec();
            for (from, &v) in row.iter().enumerate() {
                out[from] += v;
            }
            rows.push(ScatteringRow { min_g, max_g, values });
        }
        ScatteringMatrix { rows, out }
    }

    /// Scattering row into group `g`.
    pub fn to(&self, g: usize) -> &ScatteringRow {
        &self.rows[g]
    }

    pub fn self_scat(&self, g: usize) -> f64 {
        self.rows[g].from(g)
    }

    pub fn out(&self, g: usize) -> f64 {
        self.out[g]
    }

    pub fn n_group(&self) -> usize {
        self.rows.len()
    }

    /// Dense `[to][from]` copy.
    pub fn as_dense(&self) -> Vec<Vec<f64>> {
        let ng = self.rows.len();
        self.rows
            .iter()
            .map(|r| (0..ng).map(|g| r.from(g)).collect())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    pub id: u32,
    pub name: String,
    pub xstr: Vec<f64>,
    pub xsnf: Vec<f64>,
    pub xskf: Vec<f64>,
    pub chi: Vec<f64>,
    pub scat: ScatteringMatrix,
    /// External isotropic source density per group.
    pub source: Vec<f64>,
}

impl Material {
    pub fn from_config(cfg: &MaterialConfig) -> TransportResult<Self> {
        let ng = cfg.xstr.len();
        let or_zero = |v: &Vec<f64>| if v.is_empty() { vec![0.0; ng] } else { v.clone() };
        let xsnf = or_zero(&cfg.xsnf);
        let xskf = if cfg.xskf.is_empty() { xsnf.clone() } else { cfg.xskf.clone() };
        let chi = or_zero(&cfg.chi);
        let scat = ScatteringMatrix::from_dense(&cfg.scatter);
        if scat.n_group() != ng {
            return Err(TransportError::Config(format!(
                "material {}: scattering matrix has {} groups, expected {ng}",
                cfg.id,
                scat.n_group()
            )));
        }
        Ok(Material {
            id: cfg.id,
            name: cfg.name.clone(),
            xstr: cfg.xstr.clone(),
            xsnf,
            xskf,
            chi,
            scat,
            source: or_zero(&cfg.source),
        })
    }

    pub fn is_fissile(&self) -> bool {
        self.xsnf.iter().any(|&v| v > 0.0)
    }

    /// Removal cross section, σ_tr − σ_s(g→g).
    pub fn xsrm(&self, g: usize) -> f64 {
        self.xstr[g] - self.scat.self_scat(g)
    }

    pub fn n_group(&self) -> usize {
        self.xstr.len()
    }
}

/// Materials keyed by id, iterated in id order.
#[derive(Debug, Clone, Default)]
pub struct MaterialLib {
    materials: BTreeMap<u32, Material>,
    n_group: usize,
}

impl MaterialLib {
    pub fn from_config(cfgs: &[MaterialConfig]) -> TransportResult<Self> {
        let mut lib = MaterialLib::default();
        for cfg in cfgs {
            let mat = Material::from_config(cfg)?;
            if lib.n_group == 0 {
                lib.n_group = mat.n_group();
            } else if mat.n_group() != lib.n_group {
                return Err(TransportError::Config(format!(
                    "material {} has {} groups, library has {}",
                    mat.id,
                    mat.n_group(),
                    lib.n_group
                )));
            }
            if lib.materials.insert(mat.id, mat).is_some() {
                return Err(TransportError::Config(format!(
                    "duplicate material id {}",
                    cfg.id
                )));
            }
        }
        Ok(lib)
    }

    pub fn get(&self, id: u32) -> TransportResult<&Material> {
        self.materials
            .get(&id)
            .ok_or_else(|| TransportError::Config(format!("unknown material id {id}")))
    }

    pub fn n_group(&self) -> usize {
        self.n_group
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Position of a material in id order.
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.materials.keys().position(|&k| k == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }
}
