// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Sn Cell Differencing
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Spatial differencing of one coarse cell for one direction.
//!
//! A worker consumes the upwind face fluxes, returns the cell-average
//! angular flux and leaves the downwind face fluxes in place of the upwind
//! ones. Radial faces use (corrected) diamond difference; the axial face
//! closure is a separate [`AxialClosure`] so every radial/axial pairing is
//! one monomorphized kernel.

use crate::correction_data::CorrectionData;
use std::marker::PhantomData;
use transport_mesh::mesh::Mesh;
use transport_types::surface::Normal;

/// Per-angle state of a sweep, shared by every cell.
#[derive(Debug, Clone, Copy)]
pub struct CellState {
    /// Absolute direction cosines.
    pub ox: f64,
    pub oy: f64,
    pub oz: f64,
    /// Index of the upward-hemisphere image of the angle.
    pub iang_alpha: usize,
    pub g: usize,
}

/// Location of the cell being evaluated.
#[derive(Debug, Clone, Copy)]
pub struct CellIndex {
    pub cell: usize,
    pub ix: usize,
    pub iy: usize,
    pub iz: usize,
}

pub trait SnCellWorker: Sync {
    /// 3-D cell balance. `q` is the angular source, `xstr` the transport
    /// cross section.
    fn evaluate(
        &self,
        st: &CellState,
        psi_x: &mut f64,
        psi_y: &mut f64,
        psi_z: &mut f64,
        q: f64,
        xstr: f64,
        at: CellIndex,
    ) -> f64;

    /// Radial-only balance for a single plane with reflective axial faces.
    fn evaluate_2d(
        &self,
        st: &CellState,
        psi_x: &mut f64,
        psi_y: &mut f64,
        q: f64,
        xstr: f64,
        at: CellIndex,
    ) -> f64;
}

/// Axial closure: the `z` term of the cell balance and the outgoing `z`
/// face flux.
pub trait AxialClosure: Sync + Send + Default {
    /// `(numerator, denominator)` contributions. The numerator may depend
    /// on the angular source.
    fn balance(&self, tz: f64, xstr: f64, q: f64, psi_z: f64) -> (f64, f64);

    fn outgoing(&self, tz: f64, xstr: f64, q: f64, psi: f64, psi_z: f64) -> f64;
}

/// Diamond difference.
#[derive(Debug, Default, Clone, Copy)]
pub struct AxialDd;

impl AxialClosure for AxialDd {
    #[inline]
    fn balance(&self, tz: f64, _xstr: f64, _q: f64, psi_z: f64) -> (f64, f64) {
        (2.0 * tz * psi_z, 2.0 * tz)
    }

    #[inline]
    fn outgoing(&self, _tz: f64, _xstr: f64, _q: f64, psi: f64, psi_z: f64) -> f64 {
        2.0 * psi - psi_z
    }
}

/// Forward (step) difference: the outgoing face carries the cell average.
#[derive(Debug, Default, Clone, Copy)]
pub struct AxialFw;

impl AxialClosure for AxialFw {
    #[inline]
    fn balance(&self, tz: f64, _xstr: f64, _q: f64, psi_z: f64) -> (f64, f64) {
        (tz * psi_z, tz)
    }

    #[inline]
    fn outgoing(&self, _tz: f64, _xstr: f64, _q: f64, psi: f64, _psi_z: f64) -> f64 {
        psi
    }
}

/// Step characteristic.
#[derive(Debug, Default, Clone, Copy)]
pub struct AxialSc;

/// Optical thickness below which `ρ` uses its series expansion.
const SC_SERIES_TAU: f64 = 1.0e-3;

/// `ρ(τ) = 1/τ − 1/(e^τ − 1)`, the weight of the incoming face in the
/// step-characteristic cell average.
pub fn sc_rho(tau: f64) -> f64 {
    if tau < SC_SERIES_TAU {
        0.5 - tau / 12.0
    } else {
        1.0 / tau - 1.0 / tau.exp_m1()
    }
}

impl AxialClosure for AxialSc {
    #[inline]
    fn balance(&self, tz: f64, xstr: f64, _q: f64, psi_z: f64) -> (f64, f64) {
        let rho = sc_rho(xstr / tz);
        let rhofac = rho / (1.0 - rho);
        (tz * (rhofac + 1.0) * psi_z, tz / (1.0 - rho))
    }

    #[inline]
    fn outgoing(&self, tz: f64, xstr: f64, _q: f64, psi: f64, psi_z: f64) -> f64 {
        let rho = sc_rho(xstr / tz);
        (psi - rho * psi_z) / (1.0 - rho)
    }
}

/// Primitive multiple balance.
#[derive(Debug, Default, Clone, Copy)]
pub struct AxialPmb;

impl AxialClosure for AxialPmb {
    #[inline]
    fn balance(&self, tz: f64, xstr: f64, q: f64, psi_z: f64) -> (f64, f64) {
        (tz * psi_z - q / (2.0 + xstr / tz), tz / (1.0 + 0.5 * xstr))
    }

    #[inline]
    fn outgoing(&self, tz: f64, xstr: f64, q: f64, psi: f64, _psi_z: f64) -> f64 {
        (2.0 * psi * tz + q) / (2.0 * tz + xstr)
    }
}

/// Cell balance with radial weights `g_x`, `g_y` (`1/2` for plain diamond
/// difference).
#[inline]
#[allow(clippy::too_many_arguments)]
fn radial_balance<A: AxialClosure>(
    axial: &A,
    tx: f64,
    ty: f64,
    tz: f64,
    gx: f64,
    gy: f64,
    psi_x: &mut f64,
    psi_y: &mut f64,
    psi_z: &mut f64,
    q: f64,
    xstr: f64,
) -> f64 {
    let (num_z, den_z) = axial.balance(tz, xstr, q, *psi_z);
    let psi = (q + 2.0 * (tx * *psi_x + ty * *psi_y) + num_z) / (tx / gx + ty / gy + den_z + xstr);
    *psi_x = psi / gx - *psi_x;
    *psi_y = psi / gy - *psi_y;
    *psi_z = axial.outgoing(tz, xstr, q, psi, *psi_z);
    psi
}

#[inline]
fn radial_balance_2d(tx: f64, ty: f64, gx: f64, gy: f64, psi_x: &mut f64, psi_y: &mut f64, q: f64, xstr: f64) -> f64 {
    let psi = (q + 2.0 * (tx * *psi_x + ty * *psi_y)) / (tx / gx + ty / gy + xstr);
    *psi_x = psi / gx - *psi_x;
    *psi_y = psi / gy - *psi_y;
    psi
}

/// Diamond difference in x and y with axial closure `A`.
#[derive(Debug)]
pub struct Diamond<'a, A: AxialClosure> {
    mesh: &'a Mesh,
    axial: A,
}

impl<'a, A: AxialClosure> Diamond<'a, A> {
    pub fn new(mesh: &'a Mesh) -> Self {
        Diamond {
            mesh,
            axial: A::default(),
        }
    }
}

impl<A: AxialClosure> SnCellWorker for Diamond<'_, A> {
    #[inline]
    fn evaluate(
        &self,
        st: &CellState,
        psi_x: &mut f64,
        psi_y: &mut f64,
        psi_z: &mut f64,
        q: f64,
        xstr: f64,
        at: CellIndex,
    ) -> f64 {
        let tx = st.ox / self.mesh.dx(at.ix);
        let ty = st.oy / self.mesh.dy(at.iy);
        let tz = st.oz / self.mesh.dz(at.iz);
        radial_balance(&self.axial, tx, ty, tz, 0.5, 0.5, psi_x, psi_y, psi_z, q, xstr)
    }

    #[inline]
    fn evaluate_2d(
        &self,
        st: &CellState,
        psi_x: &mut f64,
        psi_y: &mut f64,
        q: f64,
        xstr: f64,
        at: CellIndex,
    ) -> f64 {
        let tx = st.ox / self.mesh.dx(at.ix);
        let ty = st.oy / self.mesh.dy(at.iy);
        radial_balance_2d(tx, ty, 0.5, 0.5, psi_x, psi_y, q, xstr)
    }
}

/// Corrected diamond difference in x and y with axial closure `A`.
#[derive(Debug)]
pub struct CorrectedDiamond<'a, A: AxialClosure> {
    mesh: &'a Mesh,
    corrections: &'a CorrectionData,
    axial: PhantomData<A>,
}

impl<'a, A: AxialClosure> CorrectedDiamond<'a, A> {
    pub fn new(mesh: &'a Mesh, corrections: &'a CorrectionData) -> Self {
        CorrectedDiamond {
            mesh,
            corrections,
            axial: PhantomData,
        }
    }

    #[inline]
    fn weights(&self, st: &CellState, cell: usize) -> (f64, f64) {
        let ia = self.corrections.macroplane_cell(cell);
        let b = self.corrections.beta(ia, st.iang_alpha, st.g);
        (
            self.corrections.alpha(ia, st.iang_alpha, st.g, Normal::X) * b,
            self.corrections.alpha(ia, st.iang_alpha, st.g, Normal::Y) * b,
        )
    }
}

impl<A: AxialClosure> SnCellWorker for CorrectedDiamond<'_, A> {
    #[inline]
    fn evaluate(
        &self,
        st: &CellState,
        psi_x: &mut f64,
        psi_y: &mut f64,
        psi_z: &mut f64,
        q: f64,
        xstr: f64,
        at: CellIndex,
    ) -> f64 {
        let (gx, gy) = self.weights(st, at.cell);
        let tx = st.ox / self.mesh.dx(at.ix);
        let ty = st.oy / self.mesh.dy(at.iy);
        let tz = st.oz / self.mesh.dz(at.iz);
        radial_balance(&A::default(), tx, ty, tz, gx, gy, psi_x, psi_y, psi_z, q, xstr)
    }

    #[inline]
    fn evaluate_2d(
        &self,
        st: &CellState,
        psi_x: &mut f64,
        psi_y: &mut f64,
        q: f64,
        xstr: f64,
        at: CellIndex,
    ) -> f64 {
        let (gx, gy) = self.weights(st, at.cell);
        let tx = st.ox / self.mesh.dx(at.ix);
        let ty = st.oy / self.mesh.dy(at.iy);
        radial_balance_2d(tx, ty, gx, gy, psi_x, psi_y, q, xstr)
    }
}
