// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Transport Sweeper Interface
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! The interface the outer solvers drive, and the factory that builds a
//! sweeper from a case file.

use crate::coarse_data::CoarseData;
use crate::context::RuntimeContext;
use crate::moc_sweeper::MocSweeper;
use crate::output::OutputWriter;
use crate::sn_sweeper::SnSweeper;
use crate::sweeper_2d3d::Sweeper2D3D;
use crate::xs_mesh::XsMesh;
use ndarray::{Array2, Array3};
use std::sync::Arc;
use tracing::info;
use transport_mesh::core_mesh::CoreMesh;
use transport_types::config::{CaseConfig, SweeperKind};
use transport_types::error::{TransportError, TransportResult};

pub trait TransportSweeper: Send {
    fn n_reg(&self) -> usize;

    fn n_group(&self) -> usize;

    /// Cross sections of the regions the fission source lives on.
    fn xs_mesh(&self) -> &XsMesh;

    /// Volume of every region.
    fn vols(&self) -> &[f64];

    /// Flat initial guess for flux and boundary conditions.
    fn initialize(&mut self);

    /// Scalar flux `[reg, g]`.
    fn flux(&self) -> &Array2<f64>;

    fn old_flux(&self) -> &Array2<f64>;

    fn store_old_flux(&mut self);

    /// Stage the group source: external source, fission source `fs`
    /// (already divided by k) and in-scatter.
    fn set_group_source(&mut self, g: usize, fs: Option<&[f64]>);

    /// Inner iterations for group `g` with the staged source.
    fn sweep(&mut self, g: usize) -> TransportResult<()>;

    /// Volume-averaged flux on every coarse cell.
    fn pin_flux(&self, g: usize) -> Vec<f64>;

    /// Scale the flux of group `g` to match `pin_flux`. Returns the L2
    /// difference between the old and new pin flux.
    fn set_pin_flux(&mut self, g: usize, pin_flux: &[f64]) -> f64;

    /// Fission power per pin, `[nz, ny, nx]`, unit mean over fuel pins.
    fn pin_powers(&self) -> Array3<f64>;

    fn coarse_data(&self) -> Option<&CoarseData>;

    fn coarse_data_mut(&mut self) -> Option<&mut CoarseData>;

    /// Have the sweeper fill coarse currents during its last inner.
    fn attach_coarse_data(&mut self, coarse: CoarseData);

    fn output(&self, out: &mut OutputWriter) -> TransportResult<()>;

    /// `Σ_g νσ_f φ / k` on every region.
    fn calc_fission_source(&self, k: f64) -> Vec<f64> {
        fission_density(self.xs_mesh(), self.flux(), 1.0 / k)
    }

    /// Volume-integrated fission production of the current or old flux.
    fn total_fission(&self, old: bool) -> f64 {
        let flux = if old { self.old_flux() } else { self.flux() };
        fission_density(self.xs_mesh(), flux, 1.0)
            .iter()
            .zip(self.vols())
            .map(|(f, v)| f * v)
            .sum()
    }

    /// Relative L2 change of the flux since `store_old_flux`.
    fn flux_residual(&self) -> f64 {
        let (num, den) = self
            .flux()
            .iter()
            .zip(self.old_flux())
            .fold((0.0, 0.0), |(n, d), (&f, &o)| (n + (f - o) * (f - o), d + f * f));
        if den > 0.0 {
            (num / den).sqrt()
        } else {
            num.sqrt()
        }
    }
}

/// `scale · Σ_g νσ_f φ_g` per region.
pub fn fission_density(xs: &XsMesh, flux: &Array2<f64>, scale: f64) -> Vec<f64> {
    let mut fs = vec![0.0; xs.n_reg()];
    for xsr in xs.regions() {
        if !xsr.is_fissile() {
            continue;
        }
        for &r in xsr.regs() {
            fs[r] = scale * (0..xs.n_group()).map(|g| xsr.xsnf[g] * flux[[r, g]]).sum::<f64>();
        }
    }
    fs
}

/// Scale so the mean over positive entries is 1. Returns the factor.
pub fn normalize_positive(values: &mut [f64]) -> f64 {
    let n = values.iter().filter(|&&v| v > 0.0).count();
    let sum: f64 = values.iter().sum();
    if n == 0 || sum == 0.0 {
        return 1.0;
    }
    let f = n as f64 / sum;
    for v in values.iter_mut() {
        *v *= f;
    }
    f
}

/// Scale pin powers to unit mean over fuel cells.
pub fn normalize_pin_powers(powers: &mut Array3<f64>, is_fuel: impl Fn(usize) -> bool) {
    let (n, sum) = powers
        .iter()
        .enumerate()
        .filter(|(i, _)| is_fuel(*i))
        .fold((0usize, 0.0), |(n, s), (_, &p)| (n + 1, s + p));
    if n > 0 && sum > 0.0 {
        let f = n as f64 / sum;
        powers.mapv_inplace(|p| p * f);
    }
}

/// Write normalized pin flux `flux/NNN` (1-based group) and `pin_powers`.
pub fn write_pin_output(
    sweeper: &dyn TransportSweeper,
    dims: (usize, usize, usize),
    out: &mut OutputWriter,
) -> TransportResult<()> {
    let ng = sweeper.n_group();
    let n_cell = dims.0 * dims.1 * dims.2;
    let mut all: Vec<f64> = (0..ng).flat_map(|g| sweeper.pin_flux(g)).collect();
    normalize_positive(&mut all);
    for (g, chunk) in all.chunks(n_cell).enumerate() {
        let arr = Array3::from_shape_vec(dims, chunk.to_vec())
            .map_err(|e| TransportError::Output(format!("pin flux shape: {e}")))?;
        out.write(&format!("flux/{:03}", g + 1), &arr)?;
    }
    out.write("pin_powers", &sweeper.pin_powers())?;
    out.write_slice("eubounds", sweeper.xs_mesh().eubounds())?;
    out.write_usize("ng", ng)?;
    Ok(())
}

/// Build the sweeper named by the case file.
pub fn build_sweeper(
    cfg: &CaseConfig,
    core: Arc<CoreMesh>,
    ctx: Arc<RuntimeContext>,
) -> TransportResult<Box<dyn TransportSweeper>> {
    info!(kind = ?cfg.sweeper.kind, case = %cfg.case_name, "building sweeper");
    let sweeper: Box<dyn TransportSweeper> = match cfg.sweeper.kind {
        SweeperKind::Moc => Box::new(MocSweeper::new(cfg, core, ctx)?),
        SweeperKind::Sn => Box::new(SnSweeper::new(cfg, core, ctx)?),
        SweeperKind::TwoDThreeD => Box::new(Sweeper2D3D::new(cfg, core, ctx)?),
    };
    Ok(sweeper)
}
