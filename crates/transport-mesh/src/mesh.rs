// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Coarse Pin Mesh
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Orthogonal pin-cell mesh with cell and surface indexing.
//!
//! Cells are numbered `nx·ny·iz + nx·iy + ix`. Surfaces are numbered plane by
//! plane; each plane block holds its bottom faces (`nx·ny`), then the
//! X-normal faces (`(nx+1)·ny`, row-major in y), then the Y-normal faces
//! (`(ny+1)·nx`, column-major in x). Top faces of plane `iz` are the bottom
//! faces of plane `iz + 1`; the topmost faces follow the last plane block.

use transport_math::fp::{bracket, fp_equiv_abs};
use transport_math::geom::Point2;
use transport_types::error::{TransportError, TransportResult};
use transport_types::surface::{Boundary, BoundaryArray, Normal, Position, Surface};

#[derive(Debug, Clone)]
pub struct Mesh {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    hx: Vec<f64>,
    hy: Vec<f64>,
    hz: Vec<f64>,
    boundary: BoundaryArray,
    /// Physical planes per macroplane, bottom up.
    subplanes: Vec<usize>,
    /// Macroplane of each physical plane.
    macroplane_index: Vec<usize>,
    n_surf_plane: usize,
}

fn check_breaks(name: &str, v: &[f64]) -> TransportResult<Vec<f64>> {
    if v.len() < 2 {
        return Err(TransportError::Geometry(format!(
            "coarse mesh needs at least two {name} boundaries"
        )));
    }
    if v.windows(2).any(|w| w[1] <= w[0]) {
        return Err(TransportError::Geometry(format!(
            "coarse mesh {name} boundaries are not strictly increasing"
        )));
    }
    Ok(v.windows(2).map(|w| w[1] - w[0]).collect())
}

impl Mesh {
    /// Build from cell boundaries along each axis (`n + 1` values each).
    pub fn new(
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
        boundary: BoundaryArray,
        subplanes: Vec<usize>,
    ) -> TransportResult<Self> {
        let hx = check_breaks("x", &x)?;
        let hy = check_breaks("y", &y)?;
        let hz = check_breaks("z", &z)?;
        let nz = hz.len();
        let subplanes = if subplanes.is_empty() { vec![1; nz] } else { subplanes };
        if subplanes.iter().sum::<usize>() != nz || subplanes.contains(&0) {
            return Err(TransportError::Geometry(format!(
                "macroplanes {subplanes:?} do not partition {nz} planes"
            )));
        }
        let macroplane_index = subplanes
            .iter()
            .enumerate()
            .flat_map(|(imp, &n)| std::iter::repeat(imp).take(n))
            .collect();
        let (nx, ny) = (hx.len(), hy.len());
        Ok(Mesh {
            x,
            y,
            z,
            hx,
            hy,
            hz,
            boundary,
            subplanes,
            macroplane_index,
            n_surf_plane: nx * ny + (nx + 1) * ny + (ny + 1) * nx,
        })
    }

    /// Build from pitches, with the origin at the lower-left bottom corner.
    pub fn from_pitches(
        hx: &[f64],
        hy: &[f64],
        hz: &[f64],
        boundary: BoundaryArray,
        subplanes: Vec<usize>,
    ) -> TransportResult<Self> {
        let breaks = |h: &[f64]| {
            std::iter::once(0.0)
                .chain(h.iter().scan(0.0, |acc, &d| {
                    *acc += d;
                    Some(*acc)
                }))
                .collect::<Vec<f64>>()
        };
        Mesh::new(breaks(hx), breaks(hy), breaks(hz), boundary, subplanes)
    }

    pub fn nx(&self) -> usize {
        self.hx.len()
    }

    pub fn ny(&self) -> usize {
        self.hy.len()
    }

    pub fn nz(&self) -> usize {
        self.hz.len()
    }

    pub fn n_pin(&self) -> usize {
        self.nx() * self.ny() * self.nz()
    }

    /// Number of coarse cells in one plane.
    pub fn n_cell_plane(&self) -> usize {
        self.nx() * self.ny()
    }

    pub fn n_surf(&self) -> usize {
        self.n_surf_plane * self.nz() + self.n_cell_plane()
    }

    pub fn n_surf_plane(&self) -> usize {
        self.n_surf_plane
    }

    pub fn dx(&self, ix: usize) -> f64 {
        self.hx[ix]
    }

    pub fn dy(&self, iy: usize) -> f64 {
        self.hy[iy]
    }

    pub fn dz(&self, iz: usize) -> f64 {
        self.hz[iz]
    }

    pub fn hx(&self) -> &[f64] {
        &self.hx
    }

    pub fn hy(&self) -> &[f64] {
        &self.hy
    }

    pub fn hz(&self) -> &[f64] {
        &self.hz
    }

    pub fn x_vec(&self) -> &[f64] {
        &self.x
    }

    pub fn y_vec(&self) -> &[f64] {
        &self.y
    }

    pub fn z_vec(&self) -> &[f64] {
        &self.z
    }

    /// Core width along x.
    pub fn hx_core(&self) -> f64 {
        self.x[self.x.len() - 1] - self.x[0]
    }

    pub fn hy_core(&self) -> f64 {
        self.y[self.y.len() - 1] - self.y[0]
    }

    pub fn boundary(&self) -> &BoundaryArray {
        &self.boundary
    }

    pub fn boundary_at(&self, s: Surface) -> Boundary {
        self.boundary[s as usize]
    }

    /// Physical planes in each macroplane.
    pub fn macroplanes(&self) -> &[usize] {
        &self.subplanes
    }

    pub fn n_macroplanes(&self) -> usize {
        self.subplanes.len()
    }

    /// Macroplane of each physical plane.
    pub fn macroplane_index(&self) -> &[usize] {
        &self.macroplane_index
    }

    /// First physical plane of macroplane `imp`.
    pub fn macroplane_first(&self, imp: usize) -> usize {
        self.subplanes[..imp].iter().sum()
    }

    pub fn macroplane_height(&self, imp: usize) -> f64 {
        let first = self.macroplane_first(imp);
        self.hz[first..first + self.subplanes[imp]].iter().sum()
    }

    pub fn coarse_cell_index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        self.nx() * self.ny() * iz + self.nx() * iy + ix
    }

    /// Cell index of a grid position, `None` outside the mesh.
    pub fn coarse_cell(&self, pos: Position) -> Option<usize> {
        (pos.x < self.nx() && pos.y < self.ny() && pos.z < self.nz())
            .then(|| self.coarse_cell_index(pos.x, pos.y, pos.z))
    }

    pub fn coarse_position(&self, cell: usize) -> Position {
        let n2 = self.n_cell_plane();
        let iz = cell / n2;
        let rem = cell % n2;
        Position::new(rem % self.nx(), rem / self.nx(), iz)
    }

    /// Surface index of face `s` of `cell`.
    pub fn coarse_surf(&self, cell: usize, s: Surface) -> usize {
        let Position { x: ix, y: iy, z: iz } = self.coarse_position(cell);
        let (nx, ny) = (self.nx(), self.ny());
        let off = self.n_surf_plane * iz;
        let x_off = off + nx * ny;
        let y_off = x_off + (nx + 1) * ny;
        match s {
            Surface::West => x_off + (nx + 1) * iy + ix,
            Surface::East => x_off + (nx + 1) * iy + ix + 1,
            Surface::South => y_off + (ny + 1) * ix + iy,
            Surface::North => y_off + (ny + 1) * ix + iy + 1,
            Surface::Bottom => off + nx * iy + ix,
            Surface::Top => off + nx * iy + ix + self.n_surf_plane,
        }
    }

    /// Cell across face `s`, `None` on the domain boundary.
    pub fn coarse_neighbor(&self, cell: usize, s: Surface) -> Option<usize> {
        let Position { x, y, z } = self.coarse_position(cell);
        let pos = match s {
            Surface::East => Position::new(x + 1, y, z),
            Surface::West => Position::new(x.checked_sub(1)?, y, z),
            Surface::North => Position::new(x, y + 1, z),
            Surface::South => Position::new(x, y.checked_sub(1)?, z),
            Surface::Top => Position::new(x, y, z + 1),
            Surface::Bottom => Position::new(x, y, z.checked_sub(1)?),
        };
        self.coarse_cell(pos)
    }

    pub fn surface_normal(&self, surf: usize) -> Normal {
        let s = surf % self.n_surf_plane;
        let (nx, ny) = (self.nx(), self.ny());
        if surf >= self.n_surf_plane * self.nz() || s < nx * ny {
            Normal::Z
        } else if s < nx * ny + (nx + 1) * ny {
            Normal::X
        } else {
            Normal::Y
        }
    }

    /// Grid coordinates `(ix, iy, iz)` of a surface in face-lattice terms:
    /// for an X face `ix` runs over `0..=nx`, and so on.
    fn surf_indices(&self, surf: usize) -> (Normal, usize, usize, usize) {
        let (nx, ny) = (self.nx(), self.ny());
        let iz = surf / self.n_surf_plane;
        let s = surf % self.n_surf_plane;
        match self.surface_normal(surf) {
            Normal::Z => (Normal::Z, s % nx, s / nx, iz),
            Normal::X => {
                let k = s - nx * ny;
                (Normal::X, k % (nx + 1), k / (nx + 1), iz)
            }
            Normal::Y => {
                let k = s - nx * ny - (nx + 1) * ny;
                (Normal::Y, k / (ny + 1), k % (ny + 1), iz)
            }
        }
    }

    /// Cells on the negative and positive side of a surface.
    pub fn surf_cells(&self, surf: usize) -> (Option<usize>, Option<usize>) {
        let (normal, ix, iy, iz) = self.surf_indices(surf);
        let cell = |x: Option<usize>, y: Option<usize>, z: Option<usize>| {
            self.coarse_cell(Position::new(x?, y?, z?))
        };
        match normal {
            Normal::X => (
                cell(ix.checked_sub(1), Some(iy), Some(iz)),
                cell(Some(ix), Some(iy), Some(iz)),
            ),
            Normal::Y => (
                cell(Some(ix), iy.checked_sub(1), Some(iz)),
                cell(Some(ix), Some(iy), Some(iz)),
            ),
            Normal::Z => (
                cell(Some(ix), Some(iy), iz.checked_sub(1)),
                cell(Some(ix), Some(iy), Some(iz)),
            ),
        }
    }

    pub fn coarse_area(&self, surf: usize) -> f64 {
        let (normal, ix, iy, iz) = self.surf_indices(surf);
        match normal {
            Normal::X => self.hy[iy] * self.hz[iz],
            Normal::Y => self.hx[ix] * self.hz[iz],
            Normal::Z => self.hx[ix] * self.hy[iy],
        }
    }

    pub fn coarse_volume(&self, cell: usize) -> f64 {
        let p = self.coarse_position(cell);
        self.hx[p.x] * self.hy[p.y] * self.hz[p.z]
    }

    /// First radial (X or Y) surface of plane `iz`.
    pub fn plane_surf_xy_begin(&self, iz: usize) -> usize {
        self.n_surf_plane * iz + self.n_cell_plane()
    }

    /// One past the last radial surface of plane `iz`.
    pub fn plane_surf_end(&self, iz: usize) -> usize {
        self.n_surf_plane * (iz + 1)
    }

    /// Surfaces of the coarse grid that a 2-D point lies on, for a ray
    /// travelling in `octant` (1..=4). At an interior corner two surfaces are
    /// returned, in the order the ray crosses them.
    pub fn coarse_norm_point(&self, p: Point2, octant: u8) -> Vec<Surface> {
        use Surface::{East as E, North as N, South as S, West as W};
        let ix = self.x.iter().position(|&v| fp_equiv_abs(v, p.x));
        let iy = self.y.iter().position(|&v| fp_equiv_abs(v, p.y));
        let east_going = matches!(octant, 1 | 4);
        let north_going = matches!(octant, 1 | 2);
        let (nx, ny) = (self.nx(), self.ny());
        match (ix, iy) {
            (None, None) => Vec::new(),
            (Some(ix), None) => {
                let s = if ix == 0 {
                    W
                } else if ix == nx || east_going {
                    E
                } else {
                    W
                };
                vec![s]
            }
            (None, Some(iy)) => {
                let s = if iy == 0 {
                    S
                } else if iy == ny || north_going {
                    N
                } else {
                    S
                };
                vec![s]
            }
            (Some(ix), Some(iy)) => {
                if ix == 0 {
                    match octant {
                        2 => vec![N, W],
                        3 => vec![S, W],
                        _ => vec![W],
                    }
                } else if ix == nx {
                    match octant {
                        1 => vec![N, E],
                        4 => vec![S, E],
                        _ => vec![E],
                    }
                } else if iy == 0 {
                    match octant {
                        3 => vec![W, S],
                        4 => vec![E, S],
                        _ => vec![S],
                    }
                } else if iy == ny {
                    match octant {
                        1 => vec![E, N],
                        2 => vec![W, N],
                        _ => vec![N],
                    }
                } else {
                    match octant {
                        1 => vec![E, N],
                        2 => vec![W, N],
                        3 => vec![W, S],
                        _ => vec![E, S],
                    }
                }
            }
        }
    }

    /// Plane-local coarse cell a ray enters at boundary point `p`, moving in
    /// `octant`.
    pub fn coarse_boundary_cell(&self, p: Point2, octant: u8) -> TransportResult<usize> {
        let on_x = self.x.iter().any(|&v| fp_equiv_abs(v, p.x));
        let on_y = self.y.iter().any(|&v| fp_equiv_abs(v, p.y));
        let (nx, ny) = (self.nx(), self.ny());
        let (mut ix, mut iy) = match (bracket(&self.x, p.x), bracket(&self.y, p.y)) {
            (Some(ix), Some(iy)) => (ix, iy),
            _ => {
                return Err(TransportError::RayTrace(format!(
                    "point ({}, {}) is outside the core",
                    p.x, p.y
                )))
            }
        };
        // `bracket` assigns an interior break to the interval above it.
        if fp_equiv_abs(p.x, self.x[0]) {
            if octant == 4 && on_y && iy > 0 {
                iy -= 1;
            }
        } else if fp_equiv_abs(p.x, self.x[nx]) {
            ix = nx - 1;
            if octant == 3 && on_y && iy > 0 {
                iy -= 1;
            }
        } else if fp_equiv_abs(p.y, self.y[0]) {
            if octant == 2 && on_x && ix > 0 {
                ix -= 1;
            }
        } else if fp_equiv_abs(p.y, self.y[ny]) {
            iy = ny - 1;
            if octant == 3 && on_x && ix > 0 {
                ix -= 1;
            }
        } else {
            return Err(TransportError::RayTrace(format!(
                "point ({}, {}) is not on the core boundary",
                p.x, p.y
            )));
        }
        Ok(nx * iy + ix)
    }
}
