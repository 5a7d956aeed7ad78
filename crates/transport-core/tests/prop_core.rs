// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Property-Based Tests (proptest) for transport-core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for transport-core using proptest.
//!
//! Covers: angular quadrature symmetries, Sn cell balance for each axial
//! closure, step-characteristic weights, ray modularization.

use proptest::prelude::*;
use transport_core::quadrature::{level_symmetric, AngularQuadrature};
use transport_core::ray_data::{modularize_rational, modularize_trig};
use transport_core::sn_cell::{
    sc_rho, AxialClosure, AxialDd, AxialFw, AxialSc, CellIndex, CellState, Diamond, SnCellWorker,
};
use transport_mesh::mesh::Mesh;
use transport_types::config::QuadratureKind;
use transport_types::surface::{Boundary, Normal};

fn ls(order: usize) -> AngularQuadrature {
    AngularQuadrature::from_octant(QuadratureKind::Ls, level_symmetric(order).unwrap())
}

fn even_order() -> impl Strategy<Value = usize> {
    (1usize..=8).prop_map(|n| 2 * n)
}

// ── Angular Quadrature ───────────────────────────────────────────────

proptest! {
    /// Octant weights sum to one and every direction is a unit vector.
    #[test]
    fn ls_weights_and_cosines(order in even_order()) {
        let q = ls(order);
        for oct in 1..=8 {
            let w: f64 = q.octant(oct).iter().map(|a| a.weight).sum();
            prop_assert!((w - 1.0).abs() < 1e-12);
        }
        for a in q.angles() {
            let norm = a.ox * a.ox + a.oy * a.oy + a.oz * a.oz;
            prop_assert!((norm - 1.0).abs() < 1e-12);
        }
    }

    /// Reversal and reflection are involutions that flip the expected
    /// components.
    #[test]
    fn reverse_and_reflect_involutions(order in even_order(), pick in 0usize..1000) {
        let q = ls(order);
        let iang = pick % q.ndir();
        let a = q.angle(iang);
        for dim in [2, 3] {
            let r = q.reverse(iang, dim);
            prop_assert_eq!(q.reverse(r, dim), iang);
            let b = q.angle(r);
            prop_assert!((a.ox + b.ox).abs() < 1e-12);
            prop_assert!((a.oy + b.oy).abs() < 1e-12);
            let expect_oz = if dim == 2 { a.oz } else { -a.oz };
            prop_assert!((b.oz - expect_oz).abs() < 1e-12);
        }
        for normal in Normal::ALL {
            let r = q.reflect(iang, normal);
            prop_assert_eq!(q.reflect(r, normal), iang);
            let b = q.angle(r);
            let (flip, keep) = match normal {
                Normal::X => ((a.ox, b.ox), (a.oy, b.oy)),
                Normal::Y => ((a.oy, b.oy), (a.oz, b.oz)),
                Normal::Z => ((a.oz, b.oz), (a.ox, b.ox)),
            };
            prop_assert!((flip.0 + flip.1).abs() < 1e-12);
            prop_assert!((keep.0 - keep.1).abs() < 1e-12);
        }
    }
}

// ── Sn Cell Balance ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct CellInputs {
    ox: f64,
    oy: f64,
    oz: f64,
    psi: [f64; 3],
    q: f64,
    xstr: f64,
}

fn cell_inputs() -> impl Strategy<Value = CellInputs> {
    (
        0.05f64..1.0,
        0.05f64..1.0,
        0.05f64..1.0,
        prop::array::uniform3(0.0f64..5.0),
        0.0f64..3.0,
        0.05f64..4.0,
    )
        .prop_map(|(ox, oy, oz, psi, q, xstr)| CellInputs { ox, oy, oz, psi, q, xstr })
}

fn mesh() -> Mesh {
    Mesh::from_pitches(&[1.26], &[0.9], &[2.5], [Boundary::Reflect; 6], vec![]).unwrap()
}

/// `Σ t (ψ_out − ψ_in) + σ ψ − q` for one cell.
fn balance_residual<A: AxialClosure>(m: &Mesh, c: CellInputs) -> f64 {
    let worker = Diamond::<A>::new(m);
    let st = CellState { ox: c.ox, oy: c.oy, oz: c.oz, iang_alpha: 0, g: 0 };
    let at = CellIndex { cell: 0, ix: 0, iy: 0, iz: 0 };
    let (mut px, mut py, mut pz) = (c.psi[0], c.psi[1], c.psi[2]);
    let psi = worker.evaluate(&st, &mut px, &mut py, &mut pz, c.q, c.xstr, at);
    let (tx, ty, tz) = (c.ox / m.dx(0), c.oy / m.dy(0), c.oz / m.dz(0));
    tx * (px - c.psi[0]) + ty * (py - c.psi[1]) + tz * (pz - c.psi[2]) + c.xstr * psi - c.q
}

/// Cell average returned for a flat incoming flux equal to `q / σ`.
fn flat_response<A: AxialClosure>(m: &Mesh, c: CellInputs) -> (f64, [f64; 3]) {
    let worker = Diamond::<A>::new(m);
    let st = CellState { ox: c.ox, oy: c.oy, oz: c.oz, iang_alpha: 0, g: 0 };
    let at = CellIndex { cell: 0, ix: 0, iy: 0, iz: 0 };
    let flat = c.q / c.xstr;
    let (mut px, mut py, mut pz) = (flat, flat, flat);
    let psi = worker.evaluate(&st, &mut px, &mut py, &mut pz, c.q, c.xstr, at);
    (psi, [px, py, pz])
}

proptest! {
    #[test]
    fn diamond_cell_conserves(c in cell_inputs()) {
        let m = mesh();
        prop_assert!(balance_residual::<AxialDd>(&m, c).abs() < 1e-10);
    }

    #[test]
    fn step_axial_cell_conserves(c in cell_inputs()) {
        let m = mesh();
        prop_assert!(balance_residual::<AxialFw>(&m, c).abs() < 1e-10);
    }

    #[test]
    fn step_characteristic_axial_cell_conserves(c in cell_inputs()) {
        let m = mesh();
        prop_assert!(balance_residual::<AxialSc>(&m, c).abs() < 1e-9);
    }

    /// An infinite-medium angular flux passes through every closure
    /// unchanged.
    #[test]
    fn flat_flux_is_fixed_point(c in cell_inputs()) {
        let m = mesh();
        let flat = c.q / c.xstr;
        for (psi, out) in [
            flat_response::<AxialDd>(&m, c),
            flat_response::<AxialFw>(&m, c),
            flat_response::<AxialSc>(&m, c),
        ] {
            prop_assert!((psi - flat).abs() < 1e-10 * (1.0 + flat));
            for f in out {
                prop_assert!((f - flat).abs() < 1e-9 * (1.0 + flat));
            }
        }
    }

    /// The incoming-face weight of the step characteristic lies in
    /// (0, 1/2] and falls with optical thickness.
    #[test]
    fn sc_rho_bounded_and_monotone(tau in 0.0f64..50.0, dt in 1e-3f64..5.0) {
        let a = sc_rho(tau);
        let b = sc_rho(tau + dt);
        prop_assert!(a > 0.0 && a <= 0.5);
        prop_assert!(b < a);
    }
}

// ── Ray Modularization ───────────────────────────────────────────────

proptest! {
    /// Both modularizations give at least one ray per face and never
    /// widen the spacing beyond the request along the face.
    #[test]
    fn modular_ray_counts_positive(
        alpha in 0.05f64..1.52,
        hx in 0.5f64..25.0,
        hy in 0.5f64..25.0,
        spacing in 0.01f64..0.3,
    ) {
        let (nx, ny) = modularize_rational(alpha, hx, hy, spacing);
        prop_assert!(nx >= 1 && ny >= 1);
        let (tx, ty) = modularize_trig(alpha, hx, hy, spacing);
        prop_assert!(tx >= 1 && ty >= 1);
        prop_assert!(hx / tx as f64 * alpha.sin() <= spacing + 1e-12);
        prop_assert!(hy / ty as f64 * alpha.cos() <= spacing + 1e-12);
    }
}
