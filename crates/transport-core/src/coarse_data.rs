// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Coarse Mesh Data
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Net currents, surface fluxes and scalar flux on the coarse pin mesh.
//!
//! Currents are per unit area and positive along the coordinate axis.
//! Partial currents hold the positive-going part in slot 0 and the
//! negative-going part in slot 1.

use ndarray::{s, Array2, Array3, ArrayView1, ArrayViewMut1};
use transport_mesh::mesh::Mesh;

#[derive(Debug, Clone)]
pub struct CoarseData {
    n_group: usize,
    n_cell_plane: usize,
    n_surf_plane: usize,
    nz: usize,
    current: Array2<f64>,
    surface_flux: Array2<f64>,
    partial_current: Array3<f64>,
    partial_current_old: Array3<f64>,
    flux: Array2<f64>,
    old_flux: Array2<f64>,
    has_radial: bool,
    has_axial: bool,
    has_old_partial: bool,
}

impl CoarseData {
    pub fn new(mesh: &Mesh, n_group: usize) -> Self {
        let (n_cell, n_surf) = (mesh.n_pin(), mesh.n_surf());
        CoarseData {
            n_group,
            n_cell_plane: mesh.n_cell_plane(),
            n_surf_plane: mesh.n_surf_plane(),
            nz: mesh.nz(),
            current: Array2::zeros((n_surf, n_group)),
            surface_flux: Array2::zeros((n_surf, n_group)),
            partial_current: Array3::zeros((n_surf, n_group, 2)),
            partial_current_old: Array3::zeros((n_surf, n_group, 2)),
            flux: Array2::zeros((n_cell, n_group)),
            old_flux: Array2::zeros((n_cell, n_group)),
            has_radial: false,
            has_axial: false,
            has_old_partial: false,
        }
    }

    pub fn n_group(&self) -> usize {
        self.n_group
    }

    pub fn n_cell(&self) -> usize {
        self.flux.nrows()
    }

    pub fn n_surf(&self) -> usize {
        self.current.nrows()
    }

    /// Net current `[surf, group]`.
    pub fn current(&self) -> &Array2<f64> {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Array2<f64> {
        &mut self.current
    }

    pub fn surface_flux(&self) -> &Array2<f64> {
        &self.surface_flux
    }

    pub fn surface_flux_mut(&mut self) -> &mut Array2<f64> {
        &mut self.surface_flux
    }

    /// Partial currents `[surf, group, direction]`.
    pub fn partial_current(&self) -> &Array3<f64> {
        &self.partial_current
    }

    pub fn partial_current_mut(&mut self) -> &mut Array3<f64> {
        &mut self.partial_current
    }

    pub fn partial_current_old(&self) -> &Array3<f64> {
        &self.partial_current_old
    }

    /// Coarse scalar flux `[cell, group]`.
    pub fn flux(&self) -> &Array2<f64> {
        &self.flux
    }

    pub fn flux_mut(&mut self) -> &mut Array2<f64> {
        &mut self.flux
    }

    pub fn old_flux(&self) -> &Array2<f64> {
        &self.old_flux
    }

    pub fn flux_group(&self, g: usize) -> ArrayView1<'_, f64> {
        self.flux.column(g)
    }

    pub fn flux_group_mut(&mut self, g: usize) -> ArrayViewMut1<'_, f64> {
        self.flux.column_mut(g)
    }

    pub fn store_old_flux(&mut self) {
        self.old_flux.assign(&self.flux);
    }

    /// Keep the current partial currents for the next acceleration step.
    pub fn store_old_partial(&mut self) {
        self.partial_current_old.assign(&self.partial_current);
        self.has_old_partial = true;
    }

    pub fn has_old_partial(&self) -> bool {
        self.has_old_partial
    }

    /// Clear every surface of group `g`.
    pub fn zero_data(&mut self, g: usize) {
        self.current.column_mut(g).fill(0.0);
        self.surface_flux.column_mut(g).fill(0.0);
        self.partial_current.slice_mut(s![.., g, ..]).fill(0.0);
    }

    /// Clear only the X- and Y-normal surfaces of group `g`.
    pub fn zero_data_radial(&mut self, g: usize) {
        for iz in 0..self.nz {
            let r = self.radial_surfaces(iz);
            self.current.slice_mut(s![r.clone(), g]).fill(0.0);
            self.surface_flux.slice_mut(s![r.clone(), g]).fill(0.0);
            self.partial_current.slice_mut(s![r, g, ..]).fill(0.0);
        }
    }

    /// X- and Y-normal surfaces of plane `iz`.
    pub fn radial_surfaces(&self, iz: usize) -> std::ops::Range<usize> {
        let start = self.n_surf_plane * iz + self.n_cell_plane;
        start..self.n_surf_plane * (iz + 1)
    }

    pub fn has_radial(&self) -> bool {
        self.has_radial
    }

    pub fn set_has_radial(&mut self, v: bool) {
        self.has_radial = v;
    }

    pub fn has_axial(&self) -> bool {
        self.has_axial
    }

    pub fn set_has_axial(&mut self, v: bool) {
        self.has_axial = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport_types::surface::{Boundary, Surface};

    fn mesh() -> Mesh {
        Mesh::from_pitches(&[1.0, 1.0], &[1.0, 1.0, 1.0], &[1.0, 2.0], [Boundary::Reflect; 6], vec![])
            .unwrap()
    }

    #[test]
    fn test_shapes() {
        let m = mesh();
        let cd = CoarseData::new(&m, 3);
        assert_eq!(cd.n_cell(), 12);
        assert_eq!(cd.n_surf(), m.n_surf());
        assert_eq!(cd.partial_current().dim(), (m.n_surf(), 3, 2));
    }

    #[test]
    fn test_zero_radial_keeps_axial() {
        let m = mesh();
        let mut cd = CoarseData::new(&m, 2);
        cd.current_mut().fill(1.0);
        cd.zero_data_radial(1);
        let cell = m.coarse_cell_index(1, 2, 1);
        let top = m.coarse_surf(cell, Surface::Top);
        let bottom = m.coarse_surf(cell, Surface::Bottom);
        let east = m.coarse_surf(cell, Surface::East);
        assert_eq!(cd.current()[[top, 1]], 1.0);
        assert_eq!(cd.current()[[bottom, 1]], 1.0);
        assert_eq!(cd.current()[[east, 1]], 0.0);
        assert_eq!(cd.current()[[east, 0]], 1.0);
    }

    #[test]
    fn test_zero_all_one_group() {
        let m = mesh();
        let mut cd = CoarseData::new(&m, 2);
        cd.surface_flux_mut().fill(2.0);
        cd.zero_data(0);
        assert!(cd.surface_flux().column(0).iter().all(|&v| v == 0.0));
        assert!(cd.surface_flux().column(1).iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_old_partial_flag() {
        let m = mesh();
        let mut cd = CoarseData::new(&m, 1);
        assert!(!cd.has_old_partial());
        cd.partial_current_mut().fill(0.5);
        cd.store_old_partial();
        assert!(cd.has_old_partial());
        assert_eq!(cd.partial_current_old()[[3, 0, 1]], 0.5);
    }
}
