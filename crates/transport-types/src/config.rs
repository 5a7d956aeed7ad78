// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{TransportError, TransportResult};
use crate::surface::{Boundary, BoundaryArray};
use serde::{Deserialize, Serialize};

/// Top-level transport case.
/// Geometry is described bottom-up: pin meshes, pins, lattices, assemblies, core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseConfig {
    pub case_name: String,
    /// Energy group upper bounds (eV), highest energy first. Optional.
    #[serde(default)]
    pub eubounds: Vec<f64>,
    pub materials: Vec<MaterialConfig>,
    pub pin_meshes: Vec<PinMeshConfig>,
    pub pins: Vec<PinConfig>,
    pub lattices: Vec<LatticeConfig>,
    pub assemblies: Vec<AssemblyConfig>,
    pub core: CoreConfig,
    pub sweeper: SweeperConfig,
    pub solver: SolverConfig,
}

/// Macroscopic cross sections of one material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialConfig {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// Transport cross section per group.
    pub xstr: Vec<f64>,
    /// ν·Σ_f per group. Absent for non-fissile materials.
    #[serde(default)]
    pub xsnf: Vec<f64>,
    /// κ·Σ_f per group, used for pin powers. Defaults to xsnf.
    #[serde(default)]
    pub xskf: Vec<f64>,
    /// Fission spectrum. Absent for non-fissile materials.
    #[serde(default)]
    pub chi: Vec<f64>,
    /// Dense scattering matrix, `scatter[to][from]`.
    pub scatter: Vec<Vec<f64>>,
    /// External isotropic source density per group (fixed-source cases).
    #[serde(default)]
    pub source: Vec<f64>,
}

/// Pin mesh: a square cell of side `pitch` with its own sub-mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinMeshConfig {
    pub id: u32,
    pub pitch: f64,
    #[serde(flatten)]
    pub kind: PinMeshKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PinMeshKind {
    /// Concentric rings with azimuthal sectors.
    Cyl {
        radii: Vec<f64>,
        sub_radii: Vec<usize>,
        #[serde(default = "default_sub_azi")]
        sub_azi: usize,
    },
    /// Uniform rectangular subdivision.
    Rect {
        #[serde(default = "default_one")]
        sub_x: usize,
        #[serde(default = "default_one")]
        sub_y: usize,
    },
}

fn default_sub_azi() -> usize {
    8
}
fn default_one() -> usize {
    1
}

/// Pin: a mesh plus one material per cross-section region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinConfig {
    pub id: u32,
    pub mesh: u32,
    pub materials: Vec<u32>,
}

/// Lattice of pins. `pins` lists rows from the top row down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeConfig {
    pub id: u32,
    pub nx: usize,
    pub ny: usize,
    pub pins: Vec<u32>,
}

/// Axial stack of lattices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    pub id: u32,
    /// Lattice per physical plane, bottom to top.
    pub lattices: Vec<u32>,
    /// Plane heights. A single value applies to every plane.
    pub hz: Vec<f64>,
    /// Number of physical planes in each macroplane, bottom to top.
    /// Empty means one macroplane per plane.
    #[serde(default)]
    pub subplanes: Vec<usize>,
}

/// Assembly arrangement. `assemblies` lists rows from the top row down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub nx: usize,
    pub ny: usize,
    pub assemblies: Vec<u32>,
    pub boundary: BoundaryConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundaryConfig {
    pub east: Boundary,
    pub north: Boundary,
    pub west: Boundary,
    pub south: Boundary,
    pub bottom: Boundary,
    pub top: Boundary,
}

impl BoundaryConfig {
    /// Boundaries indexed by `Surface as usize`.
    pub fn as_array(&self) -> BoundaryArray {
        [
            self.east,
            self.north,
            self.west,
            self.south,
            self.bottom,
            self.top,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweeperKind {
    #[serde(rename = "moc")]
    Moc,
    #[serde(rename = "sn")]
    Sn,
    #[serde(rename = "2d3d")]
    TwoDThreeD,
}

/// When the inbound boundary condition is refreshed from the outbound one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryUpdate {
    /// After every angle.
    #[default]
    Gs,
    /// Once after all angles.
    Jacobi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    #[serde(rename = "type")]
    pub kind: SweeperKind,
    #[serde(default = "default_n_inner")]
    pub n_inner: usize,
    #[serde(default)]
    pub boundary_update: BoundaryUpdate,
    pub ang_quad: AngQuadConfig,
    #[serde(default)]
    pub rays: RayConfig,
    /// Sn options. Required for `2d3d`, optional for `sn`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sn_sweeper: Option<SnSweeperConfig>,
    /// Move negative source into an augmentation of the transport XS.
    #[serde(default)]
    pub split_source: bool,
    #[serde(default)]
    pub coupling: CouplingConfig,
}

fn default_n_inner() -> usize {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuadratureKind {
    /// Level-symmetric.
    Ls,
    /// Chebyshev azimuthal × Yamamoto polar product.
    Cy,
    /// Explicit list of angles.
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AngQuadConfig {
    #[serde(rename = "type")]
    pub kind: QuadratureKind,
    #[serde(default)]
    pub order: usize,
    /// Azimuthal angles per octant (`cy` only).
    #[serde(default)]
    pub n_azimuthal: usize,
    /// Polar angles per octant (`cy` only).
    #[serde(default)]
    pub n_polar: usize,
    /// Octant-1 angles (`user` only); reflected into the other octants.
    #[serde(default)]
    pub angles: Vec<UserAngle>,
}

/// Explicit angle in octant 1. Weights are normalized after reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UserAngle {
    /// Azimuth in degrees, in (0, 90).
    pub alpha: f64,
    /// Polar angle from the z axis in degrees, in (0, 90).
    pub theta: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modularity {
    /// Ray spacing tiles the whole core.
    #[default]
    Core,
    /// Ray spacing tiles a single pin pitch.
    Pin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeCorrection {
    #[default]
    Flat,
    Angle,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modularization {
    #[default]
    Trig,
    RationalFraction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RayConfig {
    #[serde(default = "default_spacing")]
    pub spacing: f64,
    #[serde(default)]
    pub modularity: Modularity,
    #[serde(default)]
    pub volume_correction: VolumeCorrection,
    #[serde(default)]
    pub modularization: Modularization,
}

fn default_spacing() -> f64 {
    0.05
}

impl Default for RayConfig {
    fn default() -> Self {
        RayConfig {
            spacing: default_spacing(),
            modularity: Modularity::default(),
            volume_correction: VolumeCorrection::default(),
            modularization: Modularization::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnEquation {
    #[default]
    Dd,
    Cdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxialScheme {
    #[default]
    #[serde(alias = "dd_ff")]
    Dd,
    Sc,
    Fw,
    Pmb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnSweeperConfig {
    #[serde(default)]
    pub equation: SnEquation,
    #[serde(default)]
    pub axial: AxialScheme,
    #[serde(default = "default_n_inner")]
    pub n_inner: usize,
    /// Precomputed correction factors for a standalone CDD sweeper.
    #[serde(default)]
    pub correction_data: Vec<CorrectionDataEntry>,
}

impl Default for SnSweeperConfig {
    fn default() -> Self {
        SnSweeperConfig {
            equation: SnEquation::default(),
            axial: AxialScheme::default(),
            n_inner: default_n_inner(),
            correction_data: Vec::new(),
        }
    }
}

/// Correction factors for a contiguous range of planes, read from an archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionDataEntry {
    pub bottom_plane: usize,
    pub top_plane: usize,
    pub file: String,
}

/// Options for the coupled MoC/Sn sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingConfig {
    /// Report the Sn solution, instead of MoC, as the sweeper's pin flux.
    #[serde(default)]
    pub expose_sn: bool,
    /// Project the Sn pin flux back onto the MoC regions after each group.
    #[serde(default = "default_true")]
    pub sn_project: bool,
    /// Apply transverse leakage to the MoC source.
    #[serde(default = "default_true")]
    pub tl: bool,
    /// Outer iterations to run before the first MoC sweep.
    #[serde(default)]
    pub inactive_moc: usize,
    /// Run MoC only every `moc_modulo` outers.
    #[serde(default = "default_one")]
    pub moc_modulo: usize,
    /// Under-relaxation of the MoC pin flux handed to Sn.
    #[serde(default = "default_relax")]
    pub relax: f64,
}

fn default_true() -> bool {
    true
}
fn default_relax() -> f64 {
    1.0
}

impl Default for CouplingConfig {
    fn default() -> Self {
        CouplingConfig {
            expose_sn: false,
            sn_project: default_true(),
            tl: default_true(),
            inactive_moc: 0,
            moc_modulo: default_one(),
            relax: default_relax(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SolverConfig {
    Eigenvalue {
        #[serde(default = "default_k_tol")]
        k_tol: f64,
        #[serde(default = "default_psi_tol")]
        psi_tol: f64,
        #[serde(default = "default_max_iter")]
        max_iter: usize,
        #[serde(default)]
        min_iter: usize,
        /// Attach coarse data so a CMFD accelerator can be used.
        #[serde(default)]
        cmfd: bool,
    },
    FixedSource {
        #[serde(default = "default_psi_tol")]
        flux_tol: f64,
        #[serde(default = "default_max_iter")]
        max_iter: usize,
    },
}

fn default_k_tol() -> f64 {
    1.0e-6
}
fn default_psi_tol() -> f64 {
    1.0e-5
}
fn default_max_iter() -> usize {
    100
}

impl CaseConfig {
    /// Load from a JSON file and run the structural checks.
    pub fn from_file(path: &str) -> TransportResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> TransportResult<Self> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of energy groups, taken from the first material.
    pub fn n_group(&self) -> usize {
        self.materials.first().map_or(0, |m| m.xstr.len())
    }

    /// Checks that do not need the geometry to be built.
    pub fn validate(&self) -> TransportResult<()> {
        let ng = self.n_group();
        if ng == 0 {
            return Err(TransportError::Config(
                "case defines no materials or zero energy groups".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for mat in &self.materials {
            if !seen.insert(mat.id) {
                return Err(TransportError::Config(format!(
                    "duplicate material id {}",
                    mat.id
                )));
            }
            let check = |name: &str, v: &Vec<f64>, optional: bool| {
                if (optional && v.is_empty()) || v.len() == ng {
                    Ok(())
                } else {
                    Err(TransportError::Config(format!(
                        "material {}: {name} has {} groups, expected {ng}",
                        mat.id,
                        v.len()
                    )))
                }
            };
            check("xstr", &mat.xstr, false)?;
            check("xsnf", &mat.xsnf, true)?;
            check("xskf", &mat.xskf, true)?;
            check("chi", &mat.chi, true)?;
            check("source", &mat.source, true)?;
            if mat.scatter.len() != ng || mat.scatter.iter().any(|row| row.len() != ng) {
                return Err(TransportError::Config(format!(
                    "material {}: scattering matrix must be {ng}x{ng}",
                    mat.id
                )));
            }
            if mat.xstr.iter().any(|&x| x <= 0.0 || !x.is_finite()) {
                return Err(TransportError::Config(format!(
                    "material {}: transport cross section must be positive",
                    mat.id
                )));
            }
        }
        if self.sweeper.rays.spacing <= 0.0 || !self.sweeper.rays.spacing.is_finite() {
            return Err(TransportError::Config(format!(
                "invalid ray spacing {}",
                self.sweeper.rays.spacing
            )));
        }
        if self.sweeper.n_inner == 0 {
            return Err(TransportError::Config(
                "sweeper needs at least one inner iteration".into(),
            ));
        }
        if self.sweeper.coupling.moc_modulo == 0 {
            return Err(TransportError::Config("moc_modulo must be positive".into()));
        }
        if !(self.sweeper.coupling.relax > 0.0 && self.sweeper.coupling.relax <= 1.0) {
            return Err(TransportError::Config(format!(
                "coupling relaxation {} outside (0, 1]",
                self.sweeper.coupling.relax
            )));
        }
        if self.core.assemblies.len() != self.core.nx * self.core.ny {
            return Err(TransportError::Config(format!(
                "core lists {} assemblies for a {}x{} arrangement",
                self.core.assemblies.len(),
                self.core.nx,
                self.core.ny
            )));
        }
        if let SolverConfig::Eigenvalue {
            k_tol,
            psi_tol,
            max_iter,
            min_iter,
            ..
        } = self.solver
        {
            if k_tol <= 0.0 {
                return Err(TransportError::Config("k_tol must be positive".into()));
            }
            if psi_tol <= 0.0 {
                return Err(TransportError::Config("psi_tol must be positive".into()));
            }
            if min_iter > max_iter {
                return Err(TransportError::Config(format!(
                    "min_iter {min_iter} exceeds max_iter {max_iter}"
                )));
            }
        }
        if let SolverConfig::FixedSource { flux_tol, max_iter } = self.solver {
            if flux_tol <= 0.0 {
                return Err(TransportError::Config("flux_tol must be positive".into()));
            }
            if max_iter == 0 {
                return Err(TransportError::Config(
                    "fixed-source solver needs at least one iteration".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Build path relative to the workspace root.
    /// CARGO_MANIFEST_DIR points to crates/transport-types/ at compile time.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
    }

    fn config_path(relative: &str) -> String {
        project_root().join(relative).to_string_lossy().to_string()
    }

    #[test]
    fn test_load_pin_case() {
        let cfg = CaseConfig::from_file(&config_path("validation/pin_ihm_2g.json")).unwrap();
        assert_eq!(cfg.case_name, "pin-ihm-2g");
        assert_eq!(cfg.n_group(), 2);
        assert_eq!(cfg.sweeper.kind, SweeperKind::Moc);
        assert_eq!(cfg.sweeper.ang_quad.kind, QuadratureKind::Ls);
        assert!(matches!(cfg.pin_meshes[0].kind, PinMeshKind::Cyl { .. }));
        assert!((cfg.pin_meshes[0].pitch - 1.26).abs() < 1e-12);
    }

    #[test]
    fn test_load_all_cases() {
        let cases = [
            "validation/pin_ihm_2g.json",
            "validation/lattice_3x3_2d.json",
            "validation/assembly_2d3d.json",
            "validation/slab_sn_3d.json",
            "validation/rect_fixed_source.json",
        ];
        for relative in &cases {
            let path = config_path(relative);
            let result = CaseConfig::from_file(&path);
            assert!(result.is_ok(), "Failed to load case {}: {:?}", path, result.err());
        }
    }

    #[test]
    fn test_coupling_defaults() {
        let c = CouplingConfig::default();
        assert!(!c.expose_sn);
        assert!(c.sn_project);
        assert!(c.tl);
        assert_eq!(c.moc_modulo, 1);
        assert!((c.relax - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_axial_alias() {
        let a: AxialScheme = serde_json::from_str("\"dd_ff\"").unwrap();
        assert_eq!(a, AxialScheme::Dd);
        let b: AxialScheme = serde_json::from_str("\"pmb\"").unwrap();
        assert_eq!(b, AxialScheme::Pmb);
    }

    #[test]
    fn test_rejects_bad_spacing() {
        let path = config_path("validation/pin_ihm_2g.json");
        let text = std::fs::read_to_string(path).unwrap();
        let mut cfg: CaseConfig = serde_json::from_str(&text).unwrap();
        cfg.sweeper.rays.spacing = -0.1;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("ray spacing"));
    }

    #[test]
    fn test_rejects_short_scatter() {
        let path = config_path("validation/pin_ihm_2g.json");
        let text = std::fs::read_to_string(path).unwrap();
        let mut cfg: CaseConfig = serde_json::from_str(&text).unwrap();
        cfg.materials[0].scatter.pop();
        assert!(matches!(cfg.validate(), Err(TransportError::Config(_))));
    }

    #[test]
    fn test_unknown_modularization_is_parse_error() {
        let r: Result<Modularization, _> = serde_json::from_str("\"fancy\"");
        assert!(r.is_err());
        let ok: Modularization = serde_json::from_str("\"rational_fraction\"").unwrap();
        assert_eq!(ok, Modularization::RationalFraction);
    }
}
