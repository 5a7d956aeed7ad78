// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Angular Flux Boundary Conditions
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Storage for boundary angular flux.
//!
//! Values are laid out group-major, then by angle, then by face normal
//! (`X`, `Y`, `Z`). Each angle owns its own face sizes, so MoC angles with
//! different ray counts pack densely. An X-face slot is addressed by its
//! position along y, so the slot a ray leaves through is the slot its
//! reflection enters through.

use crate::quadrature::{Angle, AngularQuadrature};
use transport_mesh::mesh::Mesh;
use transport_types::error::{TransportError, TransportResult};
use transport_types::surface::{Boundary, BoundaryArray, Normal, Surface};

#[derive(Debug, Clone)]
pub struct BoundaryCondition {
    n_group: usize,
    boundary: BoundaryArray,
    ang_quad: AngularQuadrature,
    /// Face sizes `[x, y, z]` of every angle.
    sizes: Vec<[usize; 3]>,
    /// Start of each angle's block inside a group.
    angle_offset: Vec<usize>,
    group_size: usize,
    data: Vec<f64>,
}

/// Face through which `angle` enters a cell along `normal`.
pub fn upwind_surface(angle: &Angle, normal: Normal) -> Surface {
    match normal {
        Normal::X => {
            if angle.ox > 0.0 {
                Surface::West
            } else {
                Surface::East
            }
        }
        Normal::Y => {
            if angle.oy > 0.0 {
                Surface::South
            } else {
                Surface::North
            }
        }
        Normal::Z => {
            if angle.oz > 0.0 {
                Surface::Bottom
            } else {
                Surface::Top
            }
        }
    }
}

impl BoundaryCondition {
    /// General constructor: one `[x, y, z]` size per angle, angles indexed
    /// as in `ang_quad`.
    pub fn new(
        n_group: usize,
        ang_quad: &AngularQuadrature,
        boundary: BoundaryArray,
        sizes: Vec<[usize; 3]>,
    ) -> TransportResult<Self> {
        if sizes.is_empty() || sizes.len() > ang_quad.ndir() {
            return Err(TransportError::Config(format!(
                "boundary condition for {} angles, quadrature has {}",
                sizes.len(),
                ang_quad.ndir()
            )));
        }
        let mut angle_offset = Vec::with_capacity(sizes.len());
        let mut group_size = 0;
        for s in &sizes {
            angle_offset.push(group_size);
            group_size += s.iter().sum::<usize>();
        }
        Ok(BoundaryCondition {
            n_group,
            boundary,
            ang_quad: ang_quad.clone(),
            sizes,
            angle_offset,
            group_size,
            data: vec![0.0; n_group * group_size],
        })
    }

    /// MoC layout: the upward hemisphere only, `[Ny, Nx, 0]` per angle with
    /// the ray counts of the angle's octant-1 representative.
    pub fn for_moc(
        n_group: usize,
        ang_quad: &AngularQuadrature,
        boundary: BoundaryArray,
        ray_counts: &[(usize, usize)],
    ) -> TransportResult<Self> {
        let ndir_oct = ang_quad.ndir_oct();
        if ray_counts.len() != ndir_oct {
            return Err(TransportError::Config(format!(
                "{} ray counts for {ndir_oct} angles per octant",
                ray_counts.len()
            )));
        }
        let sizes = (0..ang_quad.ndir() / 2)
            .map(|iang| {
                let (nx, ny) = ray_counts[iang % ndir_oct];
                [ny, nx, 0]
            })
            .collect();
        Self::new(n_group, ang_quad, boundary, sizes)
    }

    /// Sn layout over the full coarse mesh, every angle.
    pub fn for_sn(
        n_group: usize,
        ang_quad: &AngularQuadrature,
        mesh: &Mesh,
    ) -> TransportResult<Self> {
        let (nx, ny, nz) = (mesh.nx(), mesh.ny(), mesh.nz());
        let sizes = vec![[ny * nz, nx * nz, nx * ny]; ang_quad.ndir()];
        Self::new(n_group, ang_quad, *mesh.boundary(), sizes)
    }

    /// Sn layout for a single radial plane, upward hemisphere only.
    pub fn for_sn_2d(
        n_group: usize,
        ang_quad: &AngularQuadrature,
        mesh: &Mesh,
    ) -> TransportResult<Self> {
        let sizes = vec![[mesh.ny(), mesh.nx(), 0]; ang_quad.ndir() / 2];
        Self::new(n_group, ang_quad, *mesh.boundary(), sizes)
    }

    /// Same layout with a single group, used for outgoing flux.
    pub fn single_group(&self) -> Self {
        BoundaryCondition {
            n_group: 1,
            boundary: self.boundary,
            ang_quad: self.ang_quad.clone(),
            sizes: self.sizes.clone(),
            angle_offset: self.angle_offset.clone(),
            group_size: self.group_size,
            data: vec![0.0; self.group_size],
        }
    }

    pub fn n_group(&self) -> usize {
        self.n_group
    }

    pub fn n_angle(&self) -> usize {
        self.sizes.len()
    }

    pub fn size(&self, iang: usize, normal: Normal) -> usize {
        self.sizes[iang][normal.index()]
    }

    fn angle_range(&self, g: usize, iang: usize) -> std::ops::Range<usize> {
        let start = g * self.group_size + self.angle_offset[iang];
        start..start + self.sizes[iang].iter().sum::<usize>()
    }

    fn face_range(&self, g: usize, iang: usize, normal: Normal) -> std::ops::Range<usize> {
        let s = &self.sizes[iang];
        let mut start = g * self.group_size + self.angle_offset[iang];
        start += s[..normal.index()].iter().sum::<usize>();
        start..start + s[normal.index()]
    }

    /// All faces of one angle, `X` then `Y` then `Z`.
    pub fn angle(&self, g: usize, iang: usize) -> &[f64] {
        &self.data[self.angle_range(g, iang)]
    }

    pub fn angle_mut(&mut self, g: usize, iang: usize) -> &mut [f64] {
        let r = self.angle_range(g, iang);
        &mut self.data[r]
    }

    pub fn face(&self, g: usize, iang: usize, normal: Normal) -> &[f64] {
        &self.data[self.face_range(g, iang, normal)]
    }

    pub fn face_mut(&mut self, g: usize, iang: usize, normal: Normal) -> &mut [f64] {
        let r = self.face_range(g, iang, normal);
        &mut self.data[r]
    }

    /// One group, every angle.
    pub fn group(&self, g: usize) -> &[f64] {
        &self.data[g * self.group_size..(g + 1) * self.group_size]
    }

    /// Split one group into per-angle blocks for parallel writers.
    pub fn angles_mut(&mut self, g: usize) -> Vec<&mut [f64]> {
        let block = &mut self.data[g * self.group_size..(g + 1) * self.group_size];
        let mut out = Vec::with_capacity(self.sizes.len());
        let mut rest = block;
        for s in &self.sizes {
            let (head, tail) = rest.split_at_mut(s.iter().sum::<usize>());
            out.push(head);
            rest = tail;
        }
        out
    }

    /// Fill with `value`, then clear the incoming faces that sit on a
    /// vacuum boundary.
    pub fn initialize_scalar(&mut self, value: f64) {
        self.data.fill(value);
        for g in 0..self.n_group {
            for iang in 0..self.sizes.len() {
                let angle = *self.ang_quad.angle(iang);
                for normal in Normal::ALL {
                    if self.boundary[upwind_surface(&angle, normal) as usize] == Boundary::Vacuum {
                        self.face_mut(g, iang, normal).fill(0.0);
                    }
                }
            }
        }
    }

    /// Refresh the incoming flux of group `g` from the outgoing flux of
    /// angle `iang`, face by face.
    pub fn update(&mut self, g: usize, iang: usize, out: &BoundaryCondition) {
        for normal in Normal::ALL {
            if self.sizes[iang][normal.index()] == 0 {
                continue;
            }
            let iang_in = self.ang_quad.reflect(iang, normal);
            let angle_in = *self.ang_quad.angle(iang_in);
            match self.boundary[upwind_surface(&angle_in, normal) as usize] {
                Boundary::Reflect => {
                    let src = out.face(0, iang, normal);
                    self.face_mut(g, iang_in, normal).copy_from_slice(src);
                }
                Boundary::Vacuum => self.face_mut(g, iang_in, normal).fill(0.0),
                Boundary::Prescribed => {}
            }
        }
    }

    /// Update every angle of group `g`.
    pub fn update_all(&mut self, g: usize, out: &BoundaryCondition) {
        for iang in 0..self.sizes.len() {
            self.update(g, iang, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport_types::config::QuadratureKind;
    use crate::quadrature::level_symmetric;

    fn quad() -> AngularQuadrature {
        AngularQuadrature::from_octant(QuadratureKind::Ls, level_symmetric(4).unwrap())
    }

    fn mesh(boundary: BoundaryArray) -> Mesh {
        Mesh::from_pitches(&[1.0, 1.0, 1.0], &[1.0, 1.0], &[2.0, 2.0], boundary, vec![]).unwrap()
    }

    #[test]
    fn test_sn_sizes() {
        let q = quad();
        let bc = BoundaryCondition::for_sn(2, &q, &mesh([Boundary::Reflect; 6])).unwrap();
        assert_eq!(bc.n_angle(), q.ndir());
        assert_eq!(bc.size(0, Normal::X), 2 * 2);
        assert_eq!(bc.size(0, Normal::Y), 3 * 2);
        assert_eq!(bc.size(0, Normal::Z), 3 * 2);
        assert_eq!(bc.angle(1, 5).len(), 16);
    }

    #[test]
    fn test_moc_sizes_follow_octant_one() {
        let q = quad();
        let counts = vec![(4, 6), (2, 2), (6, 4)];
        let bc = BoundaryCondition::for_moc(1, &q, [Boundary::Reflect; 6], &counts).unwrap();
        assert_eq!(bc.n_angle(), q.ndir() / 2);
        // Octant 3 copy of angle 1.
        let iang = 2 * q.ndir_oct() + 1;
        assert_eq!(bc.size(iang, Normal::X), 2);
        assert_eq!(bc.size(iang, Normal::Y), 2);
        assert_eq!(bc.size(iang, Normal::Z), 0);
    }

    #[test]
    fn test_vacuum_initialization() {
        let mut b = [Boundary::Reflect; 6];
        b[Surface::West as usize] = Boundary::Vacuum;
        let q = quad();
        let mut bc = BoundaryCondition::for_sn(1, &q, &mesh(b)).unwrap();
        bc.initialize_scalar(1.0);
        for iang in 0..q.ndir() {
            let x = bc.face(0, iang, Normal::X);
            let expect = if q.angle(iang).ox > 0.0 { 0.0 } else { 1.0 };
            assert!(x.iter().all(|&v| v == expect));
            assert!(bc.face(0, iang, Normal::Y).iter().all(|&v| v == 1.0));
        }
    }

    #[test]
    fn test_reflective_update_copies_to_mirror_angle() {
        let q = quad();
        let mut bc = BoundaryCondition::for_sn(1, &q, &mesh([Boundary::Reflect; 6])).unwrap();
        let mut out = bc.single_group();
        out.face_mut(0, 0, Normal::X).fill(3.0);
        bc.update(0, 0, &out);
        let mirror = q.reflect(0, Normal::X);
        assert!(bc.face(0, mirror, Normal::X).iter().all(|&v| v == 3.0));
    }

    #[test]
    fn test_vacuum_update_zeroes() {
        let q = quad();
        let mut bc = BoundaryCondition::for_sn(1, &q, &mesh([Boundary::Vacuum; 6])).unwrap();
        bc.data.fill(1.0);
        let out = bc.single_group();
        bc.update_all(0, &out);
        assert!(bc.group(0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_prescribed_left_alone() {
        let q = quad();
        let mut bc = BoundaryCondition::for_sn(1, &q, &mesh([Boundary::Prescribed; 6])).unwrap();
        bc.initialize_scalar(0.25);
        let out = bc.single_group();
        bc.update_all(0, &out);
        assert!(bc.group(0).iter().all(|&v| v == 0.25));
    }

    #[test]
    fn test_angles_mut_blocks() {
        let q = quad();
        let mut bc = BoundaryCondition::for_sn(1, &q, &mesh([Boundary::Reflect; 6])).unwrap();
        let blocks = bc.angles_mut(0);
        assert_eq!(blocks.len(), q.ndir());
        assert!(blocks.iter().all(|b| b.len() == 16));
    }
}
