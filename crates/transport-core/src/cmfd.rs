// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Coarse-Mesh Acceleration Interface
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! The seam between the eigenvalue solver and a coarse-mesh diffusion
//! accelerator.
//!
//! An accelerator owns its coarse cross sections. Before each transport
//! step the solver copies the sweeper's pin flux into
//! [`CoarseData::flux_mut`], calls [`CoarseAccelerator::solve`], and
//! prolongates the updated coarse flux back onto the fine mesh.

use crate::coarse_data::CoarseData;
use transport_types::error::TransportResult;

pub trait CoarseAccelerator: Send {
    /// Update the coarse flux in `coarse` and the eigenvalue `k` from the
    /// currents the last transport sweep deposited.
    fn solve(&mut self, k: &mut f64, coarse: &mut CoarseData) -> TransportResult<()>;

    /// Whether the next step should be accelerated.
    fn is_enabled(&self) -> bool {
        true
    }
}

impl<F> CoarseAccelerator for F
where
    F: FnMut(&mut f64, &mut CoarseData) -> TransportResult<()> + Send,
{
    fn solve(&mut self, k: &mut f64, coarse: &mut CoarseData) -> TransportResult<()> {
        self(k, coarse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport_mesh::mesh::Mesh;
    use transport_types::surface::Boundary;

    #[test]
    fn test_closure_accelerator_updates_k_and_flux() {
        let mesh =
            Mesh::from_pitches(&[1.0, 1.0], &[1.0], &[1.0], [Boundary::Reflect; 6], vec![]).unwrap();
        let mut coarse = CoarseData::new(&mesh, 1);
        let mut accel = |k: &mut f64, c: &mut CoarseData| -> TransportResult<()> {
            *k *= 1.5;
            c.flux_mut().fill(2.0);
            Ok(())
        };
        assert!(accel.is_enabled());
        let mut k = 1.0;
        CoarseAccelerator::solve(&mut accel, &mut k, &mut coarse).unwrap();
        assert!((k - 1.5).abs() < 1e-15);
        assert!(coarse.flux().iter().all(|&f| f == 2.0));
    }
}
