// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Sn Current Workers
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Hooks the Sn sweep calls on every face an angle crosses.
//!
//! Sn face fluxes are already face averages, so deposits need no area
//! normalization. Angles run in parallel; each thread folds into its own
//! `Local` and `finish` writes the reduced tally into the coarse data.

use crate::coarse_data::CoarseData;
use crate::moc_current::SurfaceTally;

pub trait SnCurrentWorker: Sync {
    type Local: Send;

    fn local(&self) -> Self::Local;

    /// Angular flux `psi` crossing surface `surf`. `o` is the signed
    /// direction cosine along the face normal and `wt` the angle's
    /// integration weight.
    fn face(&self, local: &mut Self::Local, surf: usize, o: f64, psi: f64, wt: f64);

    fn reduce(&self, a: Self::Local, b: Self::Local) -> Self::Local;

    fn finish(&mut self, local: Self::Local, g: usize);
}

/// Pure flux solve.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCurrent;

impl SnCurrentWorker for NoCurrent {
    type Local = ();

    #[inline]
    fn local(&self) {}

    #[inline]
    fn face(&self, _local: &mut (), _surf: usize, _o: f64, _psi: f64, _wt: f64) {}

    fn reduce(&self, _a: (), _b: ()) {}

    fn finish(&mut self, _local: (), _g: usize) {}
}

/// Net current, surface flux and partial currents on every coarse face.
#[derive(Debug)]
pub struct Current<'a> {
    coarse: &'a mut CoarseData,
}

impl<'a> Current<'a> {
    pub fn new(coarse: &'a mut CoarseData) -> Self {
        Current { coarse }
    }
}

impl SnCurrentWorker for Current<'_> {
    type Local = SurfaceTally;

    fn local(&self) -> SurfaceTally {
        SurfaceTally::new(self.coarse.n_surf())
    }

    #[inline]
    fn face(&self, local: &mut SurfaceTally, surf: usize, o: f64, psi: f64, wt: f64) {
        local.deposit(surf, o * psi * wt, psi * wt);
    }

    fn reduce(&self, a: SurfaceTally, b: SurfaceTally) -> SurfaceTally {
        a.merge(b)
    }

    fn finish(&mut self, local: SurfaceTally, g: usize) {
        for (s, (&j, &f)) in local.current.iter().zip(&local.surface_flux).enumerate() {
            self.coarse.current_mut()[[s, g]] += j;
            self.coarse.surface_flux_mut()[[s, g]] += f;
        }
        let pc = self.coarse.partial_current_mut();
        for (s, p) in local.partial.chunks_exact(2).enumerate() {
            pc[[s, g, 0]] += p[0];
            pc[[s, g, 1]] += p[1];
        }
    }
}
