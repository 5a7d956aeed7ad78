// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — End-to-End Scenarios
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Whole-case runs against the cases in `validation/`.

use std::path::PathBuf;
use std::sync::Arc;
use transport_core::context::RuntimeContext;
use transport_core::eigen::EigenSolver;
use transport_core::fixed_source::FixedSourceSolver;
use transport_core::output::{OutputReader, OutputWriter};
use transport_mesh::core_mesh::CoreMesh;
use transport_types::config::{CaseConfig, SolverConfig, SweeperKind};

fn load(name: &str) -> CaseConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("validation")
        .join(name);
    CaseConfig::from_file(&path.to_string_lossy()).unwrap()
}

fn eigen(cfg: &CaseConfig) -> EigenSolver {
    let core = Arc::new(CoreMesh::from_config(cfg).unwrap());
    let ctx = Arc::new(RuntimeContext::serial().unwrap());
    EigenSolver::from_config(cfg, core, ctx).unwrap()
}

fn tight(max_iter: usize) -> SolverConfig {
    SolverConfig::Eigenvalue {
        k_tol: 1e-8,
        psi_tol: 1e-7,
        max_iter,
        min_iter: 3,
        cmfd: false,
    }
}

/// Single fuel pin, all faces reflective: the eigenpair is the
/// infinite-medium one, `k = (νΣf1 + νΣf2 · Σ12/Σr2) / Σr1` and
/// `φ2/φ1 = Σ12/Σr2`.
#[test]
fn ihm_pin_matches_infinite_medium() {
    let mut cfg = load("pin_ihm_2g.json");
    cfg.sweeper.n_inner = 10;
    cfg.solver = tight(400);
    let mut solver = eigen(&cfg);
    let result = solver.solve().unwrap();
    assert!(result.converged, "no convergence after {} outers", result.iterations);

    let ratio = 0.02 / (1.2 - 0.95);
    let k_inf = (0.008 + 0.18 * ratio) / (0.5 - 0.47);
    assert!(
        (result.k - k_inf).abs() / k_inf < 1e-4,
        "k = {}, expected {k_inf}",
        result.k
    );

    let flux = solver.sweeper().flux();
    for r in 0..solver.sweeper().n_reg() {
        let got = flux[[r, 1]] / flux[[r, 0]];
        assert!((got - ratio).abs() / ratio < 5e-3, "region {r}: φ2/φ1 = {got}");
    }
}

/// Uniform absorber with a flat source: `φ = S / Σa` everywhere.
#[test]
fn fixed_source_infinite_medium() {
    let cfg = load("rect_fixed_source.json");
    let core = Arc::new(CoreMesh::from_config(&cfg).unwrap());
    let ctx = Arc::new(RuntimeContext::serial().unwrap());
    let mut solver = FixedSourceSolver::from_config(&cfg, core, ctx).unwrap();
    let result = solver.solve().unwrap();
    assert!(result.converged);
    for &f in solver.sweeper().flux().iter() {
        assert!((f - 2.0).abs() < 1e-6, "flux {f}");
    }
}

/// Same answer from one thread and four.
#[test]
fn ihm_pin_thread_count_independent() {
    let mut cfg = load("pin_ihm_2g.json");
    cfg.sweeper.n_inner = 3;
    cfg.solver = tight(5);
    let core = Arc::new(CoreMesh::from_config(&cfg).unwrap());
    let run = |threads: usize| {
        let ctx = Arc::new(RuntimeContext::new(threads).unwrap());
        let mut s = EigenSolver::from_config(&cfg, Arc::clone(&core), ctx).unwrap();
        s.solve().unwrap().k
    };
    let (k1, k4) = (run(1), run(4));
    assert!((k1 - k4).abs() < 1e-10, "k1 = {k1}, k4 = {k4}");
}

/// The coupled 2D3D driver on an axially uniform, fully reflective
/// assembly reproduces the pure-MoC eigenvalue to 10 pcm after 20 outers,
/// with the MoC and Sn pin fluxes agreeing in every group.
#[test]
fn coupled_2d3d_matches_moc() {
    let mut cfg = load("assembly_2d3d.json");
    cfg.sweeper.n_inner = 40;
    if let Some(sn) = cfg.sweeper.sn_sweeper.as_mut() {
        sn.n_inner = 40;
    }
    cfg.solver = SolverConfig::Eigenvalue {
        k_tol: 1e-8,
        psi_tol: 1e-7,
        max_iter: 20,
        min_iter: 20,
        cmfd: false,
    };
    let mut coupled = eigen(&cfg);
    let rc = coupled.solve().unwrap();
    assert_eq!(rc.iterations, 20);

    let mut moc_cfg = load("assembly_2d3d.json");
    moc_cfg.sweeper.kind = SweeperKind::Moc;
    moc_cfg.solver = tight(300);
    let mut moc = eigen(&moc_cfg);
    let rm = moc.solve().unwrap();
    assert!(rm.converged);

    assert!(
        (rc.k - rm.k).abs() / rm.k < 1e-4,
        "2D3D k = {}, MoC k = {}",
        rc.k,
        rm.k
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coupled.npz");
    let path = path.to_string_lossy();
    let mut out = OutputWriter::create(&path).unwrap();
    coupled.output(&mut out).unwrap();
    out.finish().unwrap();
    let mut rd = OutputReader::open(&path).unwrap();
    for g in 0..2 {
        let hist = rd.read_array1(&format!("pin_flux_residual/{g:03}")).unwrap();
        assert_eq!(hist.len(), 20);
        let last = hist[hist.len() - 1];
        assert!(last < 1e-5, "group {g}: MoC/Sn residual {last}");
    }
}

/// The archive carries the eigenvalue, the pin flux and the correction
/// factors.
#[test]
fn coupled_2d3d_output_archive() {
    let mut cfg = load("assembly_2d3d.json");
    cfg.solver = tight(4);
    let mut solver = eigen(&cfg);
    solver.solve().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assembly.npz");
    let path = path.to_string_lossy();
    let mut out = OutputWriter::create(&path).unwrap();
    solver.output(&mut out).unwrap();
    out.finish().unwrap();

    let mut rd = OutputReader::open(&path).unwrap();
    let names = rd.names().unwrap();
    for key in [
        "k",
        "flux/001",
        "flux/002",
        "pin_powers",
        "ng",
        "convergence/k",
        "pin_flux_residual/000",
        "TL/000",
        "TL/001",
    ] {
        assert!(names.iter().any(|n| n == key), "missing {key}");
    }
    assert!(names.iter().any(|n| n.starts_with("alpha_x/")));
    assert!(names.iter().any(|n| n.starts_with("beta/")));
    let k = rd.read_array1("k").unwrap();
    assert!((k[0] - solver.k()).abs() < 1e-15);
    assert_eq!(rd.read_usize("ng").unwrap(), 2);
    let flux = rd.read_array3("flux/001").unwrap();
    assert_eq!(flux.dim(), (4, 2, 2));
    assert_eq!(rd.read_array1("convergence/k").unwrap().len(), 4);
    assert_eq!(rd.read_array1("TL/001").unwrap().len(), 8);
}
