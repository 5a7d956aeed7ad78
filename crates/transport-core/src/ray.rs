// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Characteristic Rays
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! A single ray across a unique plane: its fine segments and the coarse
//! surfaces it crosses in both directions.

use transport_math::geom::Point2;
use transport_mesh::core_mesh::CoreMesh;
use transport_types::error::{TransportError, TransportResult};
use transport_types::surface::Surface;

/// One coarse-surface crossing, seen from both ends of the ray.
///
/// `nseg_fw` segments are swept forward before `fw` is crossed; `nseg_bw`
/// segments are swept backward before `bw` is crossed. When only one end
/// passes a corner, the surplus crossing carries `None` on the other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayCoarseData {
    pub fw: Option<Surface>,
    pub bw: Option<Surface>,
    pub nseg_fw: usize,
    pub nseg_bw: usize,
}

#[derive(Debug, Clone)]
pub struct Ray {
    p1: Point2,
    p2: Point2,
    /// Boundary slots at `p1` and `p2`.
    bc: [usize; 2],
    seg_len: Vec<f64>,
    /// Plane-local region of every segment.
    seg_reg: Vec<usize>,
    cm_cell_fw: usize,
    cm_cell_bw: usize,
    cm_surf_fw: usize,
    cm_surf_bw: usize,
    cm_data: Vec<RayCoarseData>,
}

/// Crossings of one direction: surfaces and segment counts.
fn crossings(
    core: &CoreMesh,
    points: &[Point2],
    nseg: &[usize],
    octant: u8,
) -> TransportResult<(Vec<Surface>, Vec<usize>)> {
    let mesh = core.mesh();
    let mut surfs = Vec::with_capacity(nseg.len() + 2);
    let mut counts = Vec::with_capacity(nseg.len() + 2);
    for (&n, &p) in nseg.iter().zip(&points[1..]) {
        let s = mesh.coarse_norm_point(p, octant);
        if s.is_empty() {
            return Err(TransportError::RayTrace(format!(
                "pin crossing ({}, {}) is not on the coarse mesh",
                p.x, p.y
            )));
        }
        surfs.extend_from_slice(&s);
        counts.push(n);
        if s.len() > 1 {
            counts.push(0);
        }
    }
    Ok((surfs, counts))
}

impl Ray {
    /// Trace `p1 → p2` across unique plane `plane`. `p2` must lie above
    /// `p1`, so the forward direction is in octant 1 or 2.
    pub fn new(
        p1: Point2,
        p2: Point2,
        bc: [usize; 2],
        plane: usize,
        core: &CoreMesh,
    ) -> TransportResult<Self> {
        let mesh = core.mesh();
        let mut seg_len = Vec::new();
        let mut seg_reg = Vec::new();
        let trace = core.trace(plane, p1, p2, &mut seg_len, &mut seg_reg)?;

        let start = |p: Point2, octant: u8| -> TransportResult<(usize, usize)> {
            let cell = mesh.coarse_boundary_cell(p, octant)?;
            let s = mesh.coarse_norm_point(p, octant);
            let first = s.first().copied().ok_or_else(|| {
                TransportError::RayTrace(format!("ray end ({}, {}) is not on a coarse face", p.x, p.y))
            })?;
            Ok((cell, mesh.coarse_surf(cell, first)))
        };

        // 1. Forward direction.
        let oct_fw: u8 = if p2.x > p1.x { 1 } else { 2 };
        let (cm_cell_fw, cm_surf_fw) = start(p1, oct_fw)?;
        let (surfs_fw, nsegs_fw) = crossings(core, &trace.points, &trace.nseg, oct_fw)?;

        // 2. Backward direction over the reversed crossings.
        let oct_bw: u8 = if oct_fw == 1 { 3 } else { 4 };
        let points_bw: Vec<Point2> = trace.points.iter().rev().copied().collect();
        let nseg_bw: Vec<usize> = trace.nseg.iter().rev().copied().collect();
        let (cm_cell_bw, cm_surf_bw) = start(p2, oct_bw)?;
        let (surfs_bw, nsegs_bw) = crossings(core, &points_bw, &nseg_bw, oct_bw)?;

        // 3. Pair them up; a corner at only one end leaves one surplus entry.
        let n = nsegs_fw.len().min(nsegs_bw.len());
        let mut cm_data: Vec<RayCoarseData> = (0..n)
            .map(|i| RayCoarseData {
                fw: Some(surfs_fw[i]),
                bw: Some(surfs_bw[i]),
                nseg_fw: nsegs_fw[i],
                nseg_bw: nsegs_bw[i],
            })
            .collect();
        if nsegs_fw.len() > n {
            cm_data.push(RayCoarseData {
                fw: surfs_fw.last().copied(),
                bw: None,
                nseg_fw: 0,
                nseg_bw: 0,
            });
        }
        if nsegs_bw.len() > n {
            cm_data.push(RayCoarseData {
                fw: None,
                bw: surfs_bw.last().copied(),
                nseg_fw: 0,
                nseg_bw: 0,
            });
        }

        Ok(Ray {
            p1,
            p2,
            bc,
            seg_len,
            seg_reg,
            cm_cell_fw,
            cm_cell_bw,
            cm_surf_fw,
            cm_surf_bw,
            cm_data,
        })
    }

    pub fn p1(&self) -> Point2 {
        self.p1
    }

    pub fn p2(&self) -> Point2 {
        self.p2
    }

    /// Boundary slot the forward sweep starts from.
    pub fn bc_in(&self) -> usize {
        self.bc[0]
    }

    /// Boundary slot the forward sweep ends in.
    pub fn bc_out(&self) -> usize {
        self.bc[1]
    }

    pub fn nseg(&self) -> usize {
        self.seg_len.len()
    }

    pub fn seg_len(&self) -> &[f64] {
        &self.seg_len
    }

    pub fn seg_len_mut(&mut self) -> &mut [f64] {
        &mut self.seg_len
    }

    pub fn seg_reg(&self) -> &[usize] {
        &self.seg_reg
    }

    /// Plane-local coarse cell where the forward sweep starts.
    pub fn cm_cell_fw(&self) -> usize {
        self.cm_cell_fw
    }

    pub fn cm_cell_bw(&self) -> usize {
        self.cm_cell_bw
    }

    /// Plane-local coarse surface where the forward sweep enters.
    pub fn cm_surf_fw(&self) -> usize {
        self.cm_surf_fw
    }

    pub fn cm_surf_bw(&self) -> usize {
        self.cm_surf_bw
    }

    pub fn cm_data(&self) -> &[RayCoarseData] {
        &self.cm_data
    }

    pub fn length(&self) -> f64 {
        self.p1.distance(self.p2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use transport_types::config::CaseConfig;
    use transport_types::surface::Normal;

    fn core(name: &str) -> CoreMesh {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("validation")
            .join(name);
        let cfg = CaseConfig::from_file(&path.to_string_lossy()).unwrap();
        CoreMesh::from_config(&cfg).unwrap()
    }

    #[test]
    fn test_horizontal_ray_crossings() {
        // 2x2 pins of pitch 1.0, each split 2x2.
        let core = core("rect_fixed_source.json");
        let ray = Ray::new(Point2::new(0.0, 0.3), Point2::new(2.0, 0.3), [0, 0], 0, &core).unwrap();
        assert_eq!(ray.nseg(), 4);
        let total: f64 = ray.seg_len().iter().sum();
        assert!((total - 2.0).abs() < 1e-12);
        assert_eq!(ray.cm_cell_fw(), 0);
        assert_eq!(ray.cm_cell_bw(), 1);
        let mesh = core.mesh();
        assert_eq!(ray.cm_surf_fw(), mesh.coarse_surf(0, Surface::West));
        assert_eq!(ray.cm_surf_bw(), mesh.coarse_surf(1, Surface::East));
        // Two pin crossings: the interior face and the far boundary.
        assert_eq!(ray.cm_data().len(), 2);
        assert_eq!(ray.cm_data()[0].fw, Some(Surface::East));
        assert_eq!(ray.cm_data()[0].bw, Some(Surface::West));
        assert_eq!(ray.cm_data()[0].nseg_fw, 2);
        assert_eq!(ray.cm_data()[0].nseg_bw, 2);
    }

    #[test]
    fn test_corner_crossing_adds_zero_segment_entry() {
        let core = core("rect_fixed_source.json");
        // Through the interior corner (1, 1).
        let ray = Ray::new(Point2::new(0.5, 0.0), Point2::new(1.5, 2.0), [0, 0], 0, &core).unwrap();
        let fw: Vec<Option<Surface>> = ray.cm_data().iter().map(|d| d.fw).collect();
        assert_eq!(
            fw,
            vec![Some(Surface::East), Some(Surface::North), Some(Surface::North)]
        );
        assert_eq!(ray.cm_data()[1].nseg_fw, 0);
        let bw: Vec<Option<Surface>> = ray.cm_data().iter().map(|d| d.bw).collect();
        assert_eq!(bw[0], Some(Surface::West));
        assert_eq!(bw[1], Some(Surface::South));
        let segs_fw: usize = ray.cm_data().iter().map(|d| d.nseg_fw).sum();
        assert_eq!(segs_fw, ray.nseg());
        let segs_bw: usize = ray.cm_data().iter().map(|d| d.nseg_bw).sum();
        assert_eq!(segs_bw, ray.nseg());
    }

    /// Global surfaces of the first two crossings, walking forward and
    /// backward from the ray's entry cells.
    fn corner_surfaces(ray: &Ray, core: &CoreMesh) -> ([usize; 2], [usize; 2]) {
        let mesh = core.mesh();
        let walk = |start: usize, side: &dyn Fn(&RayCoarseData) -> Option<Surface>| {
            let mut cell = start;
            let mut out = [0usize; 2];
            for (slot, d) in out.iter_mut().zip(ray.cm_data()) {
                let s = side(d).unwrap();
                *slot = mesh.coarse_surf(cell, s);
                if let Some(next) = mesh.coarse_neighbor(cell, s) {
                    cell = next;
                }
            }
            out
        };
        (walk(ray.cm_cell_fw(), &|d| d.fw), walk(ray.cm_cell_bw(), &|d| d.bw))
    }

    #[test]
    fn test_reflected_corner_ray_swaps_surface_pair() {
        let core = core("rect_fixed_source.json");
        let ray = Ray::new(Point2::new(0.5, 0.0), Point2::new(1.5, 2.0), [0, 0], 0, &core).unwrap();
        let mirror = Ray::new(Point2::new(1.5, 0.0), Point2::new(0.5, 2.0), [0, 0], 0, &core).unwrap();
        let (fw, bw) = corner_surfaces(&ray, &core);
        let (mfw, mbw) = corner_surfaces(&mirror, &core);

        // Each direction crosses its own pair of faces around the corner.
        for s in fw {
            assert!(!bw.contains(&s));
        }
        for s in mfw {
            assert!(!mbw.contains(&s));
        }
        // The x-normal faces keep their sweep direction, the y-normal faces
        // change sides.
        assert_eq!(mfw[0], fw[0]);
        assert_eq!(mbw[0], bw[0]);
        assert_eq!(mfw[1], bw[1]);
        assert_eq!(mbw[1], fw[1]);
        let mesh = core.mesh();
        assert_eq!(mesh.surface_normal(fw[1]), Normal::Y);
        assert_eq!(mesh.surface_normal(bw[1]), Normal::Y);
    }
}
