// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Fixed-Source Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Source iteration over all groups.
//!
//! The eigenvalue solver drives [`FixedSourceSolver::step`] with a fission
//! source; a fixed-source case calls [`FixedSourceSolver::solve`] with the
//! external source of the materials.

use crate::context::RuntimeContext;
use crate::output::OutputWriter;
use crate::sweeper::{build_sweeper, TransportSweeper};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use transport_mesh::core_mesh::CoreMesh;
use transport_types::config::{CaseConfig, SolverConfig};
use transport_types::error::{TransportError, TransportResult};

#[derive(Debug, Clone)]
pub struct FixedSourceResult {
    pub converged: bool,
    pub iterations: usize,
    pub residual: f64,
    pub residual_history: Vec<f64>,
}

pub struct FixedSourceSolver {
    sweeper: Box<dyn TransportSweeper>,
    flux_tol: f64,
    max_iter: usize,
    residual_history: Vec<f64>,
}

impl FixedSourceSolver {
    pub fn new(
        sweeper: Box<dyn TransportSweeper>,
        flux_tol: f64,
        max_iter: usize,
    ) -> TransportResult<Self> {
        if flux_tol <= 0.0 || flux_tol.is_nan() {
            return Err(TransportError::Config(format!(
                "flux tolerance {flux_tol} must be positive"
            )));
        }
        if max_iter == 0 {
            return Err(TransportError::Config(
                "fixed-source solver needs at least one iteration".into(),
            ));
        }
        Ok(FixedSourceSolver {
            sweeper,
            flux_tol,
            max_iter,
            residual_history: Vec::new(),
        })
    }

    /// Build the sweeper and solver of a `fixed_source` case. The materials
    /// must define an external source.
    pub fn from_config(
        cfg: &CaseConfig,
        core: Arc<CoreMesh>,
        ctx: Arc<RuntimeContext>,
    ) -> TransportResult<Self> {
        let SolverConfig::FixedSource { flux_tol, max_iter } = cfg.solver else {
            return Err(TransportError::Config(format!(
                "case {} does not configure a fixed-source solver",
                cfg.case_name
            )));
        };
        let sweeper = build_sweeper(cfg, core, ctx)?;
        if !sweeper.xs_mesh().has_external_source() {
            return Err(TransportError::Config(format!(
                "fixed-source case {} defines no external source",
                cfg.case_name
            )));
        }
        info!(flux_tol, max_iter, "fixed-source solver");
        Self::new(sweeper, flux_tol, max_iter)
    }

    pub fn sweeper(&self) -> &dyn TransportSweeper {
        self.sweeper.as_ref()
    }

    pub fn sweeper_mut(&mut self) -> &mut dyn TransportSweeper {
        self.sweeper.as_mut()
    }

    pub fn n_group(&self) -> usize {
        self.sweeper.n_group()
    }

    pub fn residual_history(&self) -> &[f64] {
        &self.residual_history
    }

    pub fn initialize(&mut self) {
        self.sweeper.initialize();
        self.residual_history.clear();
    }

    /// One sweep over all groups. `fs` is the fission source already
    /// divided by k.
    pub fn step(&mut self, fs: Option<&[f64]>) -> TransportResult<()> {
        self.sweeper.store_old_flux();
        for g in 0..self.sweeper.n_group() {
            self.sweeper.set_group_source(g, fs);
            self.sweeper.sweep(g)?;
        }
        Ok(())
    }

    /// Iterate until the relative flux change drops below the tolerance.
    pub fn solve(&mut self) -> TransportResult<FixedSourceResult> {
        self.initialize();
        let t0 = Instant::now();
        let mut converged = false;
        let mut residual = f64::INFINITY;
        for iter in 0..self.max_iter {
            self.step(None)?;
            residual = self.sweeper.flux_residual();
            if !residual.is_finite() {
                return Err(TransportError::SolverDiverged {
                    iteration: iter + 1,
                    message: format!("flux residual is {residual}"),
                });
            }
            self.residual_history.push(residual);
            debug!(iter = iter + 1, residual, "fixed-source iteration");
            if residual < self.flux_tol {
                converged = true;
                break;
            }
        }
        let iterations = self.residual_history.len();
        if converged {
            info!(
                iterations,
                residual,
                elapsed_s = t0.elapsed().as_secs_f64(),
                "fixed-source solve converged"
            );
        } else {
            warn!(iterations, residual, "fixed-source solve hit max_iter");
        }
        Ok(FixedSourceResult {
            converged,
            iterations,
            residual,
            residual_history: self.residual_history.clone(),
        })
    }

    pub fn output(&self, out: &mut OutputWriter) -> TransportResult<()> {
        self.sweeper.output(out)?;
        out.write_slice("residual_history", &self.residual_history)
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

    fn solver(cfg: &CaseConfig) -> TransportResult<FixedSourceSolver> {
        let core = Arc::new(CoreMesh::from_config(cfg).unwrap());
        let ctx = Arc::new(RuntimeContext::serial().unwrap());
        FixedSourceSolver::from_config(cfg, core, ctx)
    }

    #[test]
    fn test_rejects_eigenvalue_case() {
        let cfg = load("pin_ihm_2g.json");
        assert!(matches!(solver(&cfg), Err(TransportError::Config(_))));
    }

    #[test]
    fn test_requires_external_source() {
        let mut cfg = load("rect_fixed_source.json");
        cfg.materials[0].source.clear();
        assert!(matches!(solver(&cfg), Err(TransportError::Config(_))));
    }

    #[test]
    fn test_residual_history_decreases() {
        let mut cfg = load("rect_fixed_source.json");
        cfg.solver = SolverConfig::FixedSource {
            flux_tol: 1e-12,
            max_iter: 6,
        };
        let mut s = solver(&cfg).unwrap();
        let result = s.solve().unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 6);
        let h = &result.residual_history;
        assert!(h.windows(2).all(|w| w[1] < w[0]));
    }
}
