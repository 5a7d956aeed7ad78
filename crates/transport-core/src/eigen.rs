// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Eigenvalue Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Power iteration for the fundamental mode.
//!
//! Each outer optionally hands the pin flux to a [`CoarseAccelerator`],
//! prolongates the accelerated coarse flux, then sweeps every group with
//! the fission source of the previous flux. `k` is updated by the ratio of
//! new to old total fission.

use crate::cmfd::CoarseAccelerator;
use crate::coarse_data::CoarseData;
use crate::context::RuntimeContext;
use crate::fixed_source::FixedSourceSolver;
use crate::output::OutputWriter;
use crate::sweeper::{build_sweeper, TransportSweeper};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use transport_mesh::core_mesh::CoreMesh;
use transport_types::config::{CaseConfig, SolverConfig};
use transport_types::error::{TransportError, TransportResult};

/// One row of the convergence history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceCriteria {
    pub k: f64,
    pub error_k: f64,
    pub error_psi: f64,
}

#[derive(Debug, Clone)]
pub struct EigenResult {
    pub k: f64,
    pub converged: bool,
    pub iterations: usize,
    pub history: Vec<ConvergenceCriteria>,
}

pub struct EigenSolver {
    fss: FixedSourceSolver,
    accelerator: Option<Box<dyn CoarseAccelerator>>,
    k_tol: f64,
    psi_tol: f64,
    max_iter: usize,
    min_iter: usize,
    k: f64,
    k_prev: f64,
    fission_source: Vec<f64>,
    fission_source_prev: Vec<f64>,
    convergence: Vec<ConvergenceCriteria>,
}

impl EigenSolver {
    pub fn new(
        sweeper: Box<dyn TransportSweeper>,
        k_tol: f64,
        psi_tol: f64,
        max_iter: usize,
        min_iter: usize,
    ) -> TransportResult<Self> {
        if k_tol <= 0.0 || k_tol.is_nan() {
            return Err(TransportError::Config("invalid k tolerance".into()));
        }
        if psi_tol <= 0.0 || psi_tol.is_nan() {
            return Err(TransportError::Config("invalid psi tolerance".into()));
        }
        if max_iter == 0 || min_iter > max_iter {
            return Err(TransportError::Config(format!(
                "invalid iteration limits: min_iter {min_iter}, max_iter {max_iter}"
            )));
        }
        let n_reg = sweeper.n_reg();
        let fss = FixedSourceSolver::new(sweeper, psi_tol, max_iter)?;
        Ok(EigenSolver {
            fss,
            accelerator: None,
            k_tol,
            psi_tol,
            max_iter,
            min_iter,
            k: 1.0,
            k_prev: 1.0,
            fission_source: vec![0.0; n_reg],
            fission_source_prev: vec![0.0; n_reg],
            convergence: Vec::new(),
        })
    }

    /// Build the sweeper and solver of an `eigenvalue` case. With `cmfd`
    /// set, the sweeper gets coarse data for an accelerator to read.
    pub fn from_config(
        cfg: &CaseConfig,
        core: Arc<CoreMesh>,
        ctx: Arc<RuntimeContext>,
    ) -> TransportResult<Self> {
        let SolverConfig::Eigenvalue {
            k_tol,
            psi_tol,
            max_iter,
            min_iter,
            cmfd,
        } = cfg.solver
        else {
            return Err(TransportError::Config(format!(
                "case {} does not configure an eigenvalue solver",
                cfg.case_name
            )));
        };
        let mut sweeper = build_sweeper(cfg, Arc::clone(&core), ctx)?;
        if cmfd && sweeper.coarse_data().is_none() {
            sweeper.attach_coarse_data(CoarseData::new(core.mesh(), sweeper.n_group()));
        }
        info!(k_tol, psi_tol, max_iter, min_iter, cmfd, "eigenvalue solver");
        Self::new(sweeper, k_tol, psi_tol, max_iter, min_iter)
    }

    pub fn with_accelerator(mut self, accelerator: Box<dyn CoarseAccelerator>) -> Self {
        self.accelerator = Some(accelerator);
        self
    }

    pub fn sweeper(&self) -> &dyn TransportSweeper {
        self.fss.sweeper()
    }

    pub fn sweeper_mut(&mut self) -> &mut dyn TransportSweeper {
        self.fss.sweeper_mut()
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn convergence(&self) -> &[ConvergenceCriteria] {
        &self.convergence
    }

    /// Flat flux, `k = 1`, empty history.
    pub fn initialize(&mut self) {
        self.k = 1.0;
        self.k_prev = 1.0;
        self.fss.initialize();
        self.fission_source.fill(0.0);
        self.fission_source_prev.fill(0.0);
        self.convergence.clear();
    }

    /// One outer iteration.
    pub fn step(&mut self) -> TransportResult<()> {
        std::mem::swap(&mut self.fission_source, &mut self.fission_source_prev);
        self.k_prev = self.k;

        if let Some(accel) = self.accelerator.as_mut().filter(|a| a.is_enabled()) {
            let sweeper = self.fss.sweeper_mut();
            let ng = sweeper.n_group();
            let pin_flux: Vec<Vec<f64>> = (0..ng).map(|g| sweeper.pin_flux(g)).collect();
            let coarse = sweeper.coarse_data_mut().ok_or_else(|| {
                TransportError::StateMisuse(
                    "coarse-mesh acceleration needs coarse data on the sweeper".into(),
                )
            })?;
            for (g, pf) in pin_flux.iter().enumerate() {
                for (c, &f) in coarse.flux_group_mut(g).iter_mut().zip(pf) {
                    *c = f;
                }
            }
            accel.solve(&mut self.k, coarse)?;
            let accelerated: Vec<Vec<f64>> =
                (0..ng).map(|g| coarse.flux_group(g).to_vec()).collect();
            for (g, pf) in accelerated.iter().enumerate() {
                sweeper.set_pin_flux(g, pf);
            }
        }

        self.fission_source = self.fss.sweeper().calc_fission_source(self.k);
        self.fss.step(Some(&self.fission_source))?;

        let sweeper = self.fss.sweeper();
        let tfis_new = sweeper.total_fission(false);
        let tfis_old = sweeper.total_fission(true);
        self.k *= tfis_new / tfis_old;
        Ok(())
    }

    /// Power iteration until both `k` and the fission source settle.
    pub fn solve(&mut self) -> TransportResult<EigenResult> {
        self.initialize();
        let t0 = Instant::now();
        let mut converged = false;
        for iter in 0..self.max_iter {
            self.step()?;
            if !self.k.is_finite() {
                return Err(TransportError::SolverDiverged {
                    iteration: iter + 1,
                    message: format!("eigenvalue is {}", self.k),
                });
            }
            let error_k = (self.k - self.k_prev).abs();
            let error_psi = self
                .fission_source
                .iter()
                .zip(&self.fission_source_prev)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            let conv = ConvergenceCriteria {
                k: self.k,
                error_k,
                error_psi,
            };
            self.convergence.push(conv);
            info!(
                iter = iter + 1,
                k = conv.k,
                error_k = conv.error_k,
                error_psi = conv.error_psi,
                "outer"
            );
            if error_k < self.k_tol && error_psi < self.psi_tol && iter >= self.min_iter {
                converged = true;
                break;
            }
        }
        let iterations = self.convergence.len();
        if converged {
            info!(
                k = self.k,
                iterations,
                elapsed_s = t0.elapsed().as_secs_f64(),
                "convergence criteria met"
            );
        } else {
            warn!(k = self.k, iterations, "maximum number of outer iterations reached");
        }
        Ok(EigenResult {
            k: self.k,
            converged,
            iterations,
            history: self.convergence.clone(),
        })
    }

    /// Sweeper output plus `k` and the convergence history.
    pub fn output(&self, out: &mut OutputWriter) -> TransportResult<()> {
        self.fss.sweeper().output(out)?;
        out.write_slice("k", &[self.k])?;
        let column = |f: fn(&ConvergenceCriteria) -> f64| -> Vec<f64> {
            self.convergence.iter().map(f).collect()
        };
        out.write_slice("convergence/k", &column(|c| c.k))?;
        out.write_slice("convergence/error_k", &column(|c| c.error_k))?;
        out.write_slice("convergence/error_psi", &column(|c| c.error_psi))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn load(name: &str) -> CaseConfig {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("validation")
            .join(name);
        CaseConfig::from_file(&path.to_string_lossy()).unwrap()
    }

    fn ihm(max_iter: usize, cmfd: bool) -> EigenSolver {
        let mut cfg = load("pin_ihm_2g.json");
        cfg.sweeper.n_inner = 5;
        cfg.solver = SolverConfig::Eigenvalue {
            k_tol: 1e-7,
            psi_tol: 1e-6,
            max_iter,
            min_iter: 0,
            cmfd,
        };
        let core = Arc::new(CoreMesh::from_config(&cfg).unwrap());
        let ctx = Arc::new(RuntimeContext::serial().unwrap());
        EigenSolver::from_config(&cfg, core, ctx).unwrap()
    }

    #[test]
    fn test_invalid_limits() {
        let cfg = load("pin_ihm_2g.json");
        let core = Arc::new(CoreMesh::from_config(&cfg).unwrap());
        let ctx = Arc::new(RuntimeContext::serial().unwrap());
        let sweeper = build_sweeper(&cfg, core, ctx).unwrap();
        assert!(matches!(
            EigenSolver::new(sweeper, 1e-6, 1e-5, 3, 5),
            Err(TransportError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_fixed_source_case() {
        let cfg = load("rect_fixed_source.json");
        let core = Arc::new(CoreMesh::from_config(&cfg).unwrap());
        let ctx = Arc::new(RuntimeContext::serial().unwrap());
        assert!(matches!(
            EigenSolver::from_config(&cfg, core, ctx),
            Err(TransportError::Config(_))
        ));
    }

    #[test]
    fn test_history_records_every_outer() {
        let mut s = ihm(3, false);
        let result = s.solve().unwrap();
        assert_eq!(result.iterations, 3);
        assert_eq!(s.convergence().len(), 3);
        assert_eq!(result.history[2].k, s.k());
        assert!(result.history.iter().all(|c| c.k.is_finite() && c.k > 0.0));
    }

    #[test]
    fn test_accelerator_without_coarse_data_is_misuse() {
        let mut s = ihm(2, false).with_accelerator(Box::new(
            |_k: &mut f64, _c: &mut CoarseData| -> TransportResult<()> { Ok(()) },
        ));
        assert!(matches!(s.solve(), Err(TransportError::StateMisuse(_))));
    }

    #[test]
    fn test_accelerator_runs_every_outer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut s = ihm(4, true).with_accelerator(Box::new(
            move |_k: &mut f64, c: &mut CoarseData| -> TransportResult<()> {
                seen.fetch_add(1, Ordering::Relaxed);
                assert!(c.flux().iter().all(|&f| f > 0.0));
                Ok(())
            },
        ));
        let result = s.solve().unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), result.iterations);
    }

    #[test]
    fn test_nan_eigenvalue_diverges() {
        let mut s = ihm(5, true).with_accelerator(Box::new(
            |k: &mut f64, _c: &mut CoarseData| -> TransportResult<()> {
                *k = f64::NAN;
                Ok(())
            },
        ));
        match s.solve() {
            Err(TransportError::SolverDiverged { iteration, .. }) => assert_eq!(iteration, 1),
            other => panic!("expected divergence, got {other:?}"),
        }
    }

    #[test]
    fn test_infinite_eigenvalue_diverges() {
        let mut s = ihm(5, true).with_accelerator(Box::new(
            |k: &mut f64, _c: &mut CoarseData| -> TransportResult<()> {
                *k = f64::INFINITY;
                Ok(())
            },
        ));
        match s.solve() {
            Err(TransportError::SolverDiverged { iteration, .. }) => assert_eq!(iteration, 1),
            other => panic!("expected divergence, got {other:?}"),
        }
    }

    #[test]
    fn test_error_k_includes_accelerator_update() {
        let mut s = ihm(4, true).with_accelerator(Box::new(
            |k: &mut f64, _c: &mut CoarseData| -> TransportResult<()> {
                *k += 0.05;
                Ok(())
            },
        ));
        let result = s.solve().unwrap();
        assert_eq!(result.iterations, 4);
        assert!((result.history[0].error_k - (result.history[0].k - 1.0).abs()).abs() < 1e-15);
        for w in result.history.windows(2) {
            assert!((w[1].error_k - (w[1].k - w[0].k).abs()).abs() < 1e-15);
        }
    }
}
