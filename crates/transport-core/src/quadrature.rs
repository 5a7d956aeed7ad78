// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Angular Quadrature
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Discrete ordinates over the unit sphere.
//!
//! Angles are stored octant-major: the `ndir_oct` angles of octant 1, then
//! their images in octants 2..=8. Octants 1–4 have `oz > 0` and run
//! counter-clockwise from `(+x, +y)`; octants 5–8 repeat them with `oz < 0`.
//! Weights sum to 1 within each octant.

use crate::output::OutputWriter;
use transport_types::config::{AngQuadConfig, QuadratureKind, UserAngle};
use transport_types::constants::{HPI, PI};
use transport_types::error::{TransportError, TransportResult};
use transport_types::surface::Normal;

/// Base direction cosines of the level-symmetric sets, S2 through S16.
const LS_MU_BASE: [f64; 8] = [
    0.577350269189626,
    0.350021,
    0.266636,
    0.218218218218218,
    0.192450089729876,
    0.174077655955702,
    0.161575,
    0.149071198499989,
];

/// Distinct point weights of every level-symmetric order, concatenated.
const LS_WEIGHTS: [f64; 31] = [
    1.0,
    1.0 / 3.0,
    0.1761262, 0.1572071,
    0.1209876, 0.0907408, 0.0925925,
    0.0893043, 0.0725281, 0.0450455, 0.0539274,
    0.0707734, 0.0558760, 0.0373436, 0.0502654, 0.0258553,
    0.0580031, 0.0488943, 0.0228095, 0.0393955, 0.0380920, 0.0258382, 0.0082759,
    0.0489967, 0.0413235, 0.0203158, 0.0265468, 0.0378883, 0.0135404, 0.0326129, 0.0103825,
];

const LS_WEIGHT_OFFSET: [usize; 8] = [0, 1, 2, 4, 7, 11, 16, 23];

/// One-based index into the order's weights for each point of octant 1,
/// rows of the octant triangle concatenated.
const LS_WEIGHT_MAP: [usize; 120] = [
    1,
    1, 1, 1,
    1, 2, 2, 1, 2, 1,
    1, 2, 2, 2, 3, 2, 1, 2, 2, 1,
    1, 2, 2, 3, 4, 3, 2, 4, 4, 2, 1, 2, 3, 2, 1,
    1, 2, 2, 3, 4, 3, 3, 5, 5, 3, 2, 4, 5, 4, 2, 1, 2, 3, 3, 2, 1,
    1, 2, 2, 3, 5, 3, 4, 6, 6, 4, 3, 6, 7, 6, 3, 2, 5, 6, 6, 5, 2, 1, 2, 3, 4, 3, 2, 1,
    1, 2, 2, 3, 5, 3, 4, 6, 6, 4, 4, 7, 8, 7, 4, 3, 6, 8, 8, 6, 3, 2, 5, 6, 7, 6, 5, 2,
    1, 2, 3, 4, 4, 3, 2, 1,
];

const LS_MAP_OFFSET: [usize; 8] = [0, 1, 4, 10, 20, 35, 56, 84];

/// Tabuchi–Yamamoto optimal polar sets: `(sin θ, weight)` per polar count.
const YAMAMOTO_1: [(f64, f64); 1] = [(0.798184, 1.0)];
const YAMAMOTO_2: [(f64, f64); 2] = [(0.363900, 0.212854), (0.899900, 0.787146)];
const YAMAMOTO_3: [(f64, f64); 3] = [
    (0.166648, 0.046233),
    (0.537707, 0.283619),
    (0.932954, 0.670148),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Angle {
    pub ox: f64,
    pub oy: f64,
    pub oz: f64,
    /// Azimuth from +x, in [0, 2π).
    pub alpha: f64,
    /// Polar angle from +z, in (0, π).
    pub theta: f64,
    pub weight: f64,
    pub rsintheta: f64,
}

impl Angle {
    pub fn from_angles(alpha: f64, theta: f64, weight: f64) -> Self {
        let st = theta.sin();
        Angle {
            ox: st * alpha.cos(),
            oy: st * alpha.sin(),
            oz: theta.cos(),
            alpha,
            theta,
            weight,
            rsintheta: 1.0 / st,
        }
    }

    pub fn from_cosines(ox: f64, oy: f64, oz: f64, weight: f64) -> Self {
        let theta = oz.clamp(-1.0, 1.0).acos();
        let mut alpha = oy.atan2(ox);
        if alpha < 0.0 {
            alpha += 2.0 * PI;
        }
        Angle {
            ox,
            oy,
            oz,
            alpha,
            theta,
            weight,
            rsintheta: 1.0 / theta.sin(),
        }
    }

    /// Image of this direction in octant `octant` (1..=8).
    pub fn to_octant(&self, octant: usize) -> Angle {
        let (sx, sy, sz) = match octant {
            1 => (1.0, 1.0, 1.0),
            2 => (-1.0, 1.0, 1.0),
            3 => (-1.0, -1.0, 1.0),
            4 => (1.0, -1.0, 1.0),
            5 => (1.0, 1.0, -1.0),
            6 => (-1.0, 1.0, -1.0),
            7 => (-1.0, -1.0, -1.0),
            _ => (1.0, -1.0, -1.0),
        };
        Angle::from_cosines(
            sx * self.ox.abs(),
            sy * self.oy.abs(),
            sz * self.oz.abs(),
            self.weight,
        )
    }

    /// Same polar angle and weight, new azimuth.
    pub fn with_alpha(&self, alpha: f64) -> Angle {
        Angle::from_angles(alpha, self.theta, self.weight)
    }

    pub fn octant(&self) -> usize {
        let xy = match (self.ox >= 0.0, self.oy >= 0.0) {
            (true, true) => 1,
            (false, true) => 2,
            (false, false) => 3,
            (true, false) => 4,
        };
        if self.oz >= 0.0 {
            xy
        } else {
            xy + 4
        }
    }
}

#[derive(Debug, Clone)]
pub struct AngularQuadrature {
    kind: QuadratureKind,
    angles: Vec<Angle>,
    ndir_oct: usize,
}

/// Reflected octant (zero-based) across each normal.
const REFLECTION: [[usize; 8]; 3] = [
    [1, 0, 3, 2, 5, 4, 7, 6],
    [3, 2, 1, 0, 7, 6, 5, 4],
    [4, 5, 6, 7, 0, 1, 2, 3],
];

impl AngularQuadrature {
    pub fn from_config(cfg: &AngQuadConfig) -> TransportResult<Self> {
        let octant1 = match cfg.kind {
            QuadratureKind::Ls => level_symmetric(cfg.order)?,
            QuadratureKind::Cy => product(&chebyshev(cfg.n_azimuthal)?, &yamamoto(cfg.n_polar)?),
            QuadratureKind::User => user_angles(&cfg.angles)?,
        };
        Ok(Self::from_octant(cfg.kind, octant1))
    }

    /// Expand octant-1 angles to all eight octants.
    pub fn from_octant(kind: QuadratureKind, octant1: Vec<Angle>) -> Self {
        let ndir_oct = octant1.len();
        let mut angles = Vec::with_capacity(8 * ndir_oct);
        for oct in 1..=8 {
            angles.extend(octant1.iter().map(|a| a.to_octant(oct)));
        }
        AngularQuadrature {
            kind,
            angles,
            ndir_oct,
        }
    }

    pub fn kind(&self) -> QuadratureKind {
        self.kind
    }

    pub fn ndir(&self) -> usize {
        self.angles.len()
    }

    pub fn ndir_oct(&self) -> usize {
        self.ndir_oct
    }

    pub fn angle(&self, iang: usize) -> &Angle {
        &self.angles[iang]
    }

    pub fn angles(&self) -> &[Angle] {
        &self.angles
    }

    /// Angles of octant `octant` (1..=8).
    pub fn octant(&self, octant: usize) -> &[Angle] {
        let start = (octant - 1) * self.ndir_oct;
        &self.angles[start..start + self.ndir_oct]
    }

    /// Index of the opposite direction. With `dim == 2` only the x and y
    /// components are reversed.
    pub fn reverse(&self, iang: usize, dim: usize) -> usize {
        let oct = iang / self.ndir_oct;
        let i = iang % self.ndir_oct;
        let rev = if dim == 2 {
            if oct < 4 {
                (oct + 2) % 4
            } else {
                4 + (oct + 2) % 4
            }
        } else if oct < 4 {
            4 + (oct + 2) % 4
        } else {
            (oct + 2) % 4
        };
        rev * self.ndir_oct + i
    }

    /// Index of the direction reflected off a face with normal `normal`.
    pub fn reflect(&self, iang: usize, normal: Normal) -> usize {
        let oct = iang / self.ndir_oct;
        let i = iang % self.ndir_oct;
        REFLECTION[normal.index()][oct] * self.ndir_oct + i
    }

    /// Replace octant-1 angle `iang` and all of its images.
    pub fn modify_angle(&mut self, iang: usize, angle: Angle) {
        for oct in 0..8 {
            self.angles[oct * self.ndir_oct + iang] = angle.to_octant(oct + 1);
        }
    }

    /// Scale weights so each octant sums to 1.
    pub fn normalize_weights(&mut self) {
        let sum: f64 = self.angles[..self.ndir_oct].iter().map(|a| a.weight).sum();
        if sum > 0.0 {
            for a in &mut self.angles {
                a.weight /= sum;
            }
        }
    }

    /// Octant-1 angles under `ang_quad/`.
    pub fn output(&self, out: &mut OutputWriter) -> TransportResult<()> {
        let oct1 = self.octant(1);
        let col = |f: fn(&Angle) -> f64| oct1.iter().map(f).collect::<Vec<f64>>();
        out.write_slice("ang_quad/alpha", &col(|a| a.alpha))?;
        out.write_slice("ang_quad/theta", &col(|a| a.theta))?;
        out.write_slice("ang_quad/weight", &col(|a| a.weight))?;
        Ok(())
    }
}

/// Octant-1 level-symmetric set of even `order` up to 16.
pub fn level_symmetric(order: usize) -> TransportResult<Vec<Angle>> {
    if order < 2 || order % 2 != 0 || order > 16 {
        return Err(TransportError::Config(format!(
            "level-symmetric order must be even and in 2..=16, got {order}"
        )));
    }
    let n = order / 2;
    let mu0 = LS_MU_BASE[n - 1];
    let mut mu = vec![mu0];
    if order > 2 {
        let delta = 2.0 * (1.0 - 3.0 * mu0 * mu0) / (order - 2) as f64;
        for i in 1..n {
            mu.push((mu0 * mu0 + i as f64 * delta).sqrt());
        }
    }
    let weights = &LS_WEIGHTS[LS_WEIGHT_OFFSET[n - 1]..];
    let map = &LS_WEIGHT_MAP[LS_MAP_OFFSET[n - 1]..];
    let mut angles = Vec::with_capacity(n * (n + 1) / 2);
    let mut k = 0;
    for i in 0..n {
        for j in 0..=i {
            angles.push(Angle::from_cosines(mu[i - j], mu[j], mu[n - i - 1], weights[map[k] - 1]));
            k += 1;
        }
    }
    let wsum: f64 = angles.iter().map(|a| a.weight).sum();
    for a in &mut angles {
        a.weight /= wsum;
    }
    Ok(angles)
}

/// Chebyshev azimuths in (0, π/2): `(α, w)` with equal weights.
pub fn chebyshev(n_azimuthal: usize) -> TransportResult<Vec<(f64, f64)>> {
    if n_azimuthal == 0 {
        return Err(TransportError::Config(
            "Chebyshev quadrature needs at least one azimuthal angle".into(),
        ));
    }
    let d = HPI / (2 * n_azimuthal) as f64;
    Ok((0..n_azimuthal)
        .map(|i| (d * (2 * i + 1) as f64, 1.0 / n_azimuthal as f64))
        .collect())
}

/// Yamamoto polar angles in (0, π/2): `(θ, w)`.
pub fn yamamoto(n_polar: usize) -> TransportResult<Vec<(f64, f64)>> {
    let table: &[(f64, f64)] = match n_polar {
        1 => &YAMAMOTO_1,
        2 => &YAMAMOTO_2,
        3 => &YAMAMOTO_3,
        _ => {
            return Err(TransportError::Config(format!(
                "Yamamoto polar quadrature supports 1 to 3 angles, got {n_polar}"
            )))
        }
    };
    Ok(table.iter().map(|&(s, w)| (s.asin(), w)).collect())
}

/// Tensor product of azimuthal and polar sets.
pub fn product(azi: &[(f64, f64)], pol: &[(f64, f64)]) -> Vec<Angle> {
    let mut angles = Vec::with_capacity(azi.len() * pol.len());
    for &(alpha, wa) in azi {
        for &(theta, wp) in pol {
            angles.push(Angle::from_angles(alpha, theta, wa * wp));
        }
    }
    angles
}

fn user_angles(input: &[UserAngle]) -> TransportResult<Vec<Angle>> {
    if input.is_empty() {
        return Err(TransportError::Config("user quadrature lists no angles".into()));
    }
    let mut angles = Vec::with_capacity(input.len());
    for (i, a) in input.iter().enumerate() {
        let inside = |v: f64| v > 0.0 && v < 90.0;
        if !inside(a.alpha) || !inside(a.theta) || a.weight <= 0.0 {
            return Err(TransportError::Geometry(format!(
                "user angle {i} is not strictly inside octant 1 (alpha {}, theta {}, weight {})",
                a.alpha, a.theta, a.weight
            )));
        }
        angles.push(Angle::from_angles(a.alpha.to_radians(), a.theta.to_radians(), a.weight));
    }
    let wsum: f64 = angles.iter().map(|a| a.weight).sum();
    for a in &mut angles {
        a.weight /= wsum;
    }
    Ok(angles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ls(order: usize) -> AngularQuadrature {
        AngularQuadrature::from_octant(QuadratureKind::Ls, level_symmetric(order).unwrap())
    }

    #[test]
    fn test_ls_counts_and_norms() {
        for order in [2, 4, 6, 8, 10, 12, 14, 16] {
            let q = ls(order);
            let n = order / 2;
            assert_eq!(q.ndir_oct(), n * (n + 1) / 2);
            assert_eq!(q.ndir(), 8 * q.ndir_oct());
            let w: f64 = q.angles().iter().map(|a| a.weight).sum();
            assert!((w - 8.0).abs() < 1e-12, "order {order}: {w}");
            for a in q.angles() {
                let norm = a.ox * a.ox + a.oy * a.oy + a.oz * a.oz;
                assert!((norm - 1.0).abs() < 1e-5, "order {order}: |Ω|² = {norm}");
            }
        }
    }

    #[test]
    fn test_ls_rejects_bad_order() {
        assert!(level_symmetric(3).is_err());
        assert!(level_symmetric(18).is_err());
        assert!(level_symmetric(0).is_err());
    }

    #[test]
    fn test_octant_signs() {
        let q = ls(4);
        for oct in 1..=8 {
            for a in q.octant(oct) {
                assert_eq!(a.octant(), oct);
            }
        }
    }

    #[test]
    fn test_reverse_2d_and_3d() {
        let q = ls(4);
        for iang in 0..q.ndir() {
            let a = q.angle(iang);
            let r2 = q.angle(q.reverse(iang, 2));
            assert!((r2.ox + a.ox).abs() < 1e-14);
            assert!((r2.oy + a.oy).abs() < 1e-14);
            assert!((r2.oz - a.oz).abs() < 1e-14);
            let r3 = q.angle(q.reverse(iang, 3));
            assert!((r3.oz + a.oz).abs() < 1e-14);
            assert_eq!(q.reverse(q.reverse(iang, 3), 3), iang);
        }
    }

    #[test]
    fn test_reflect_flips_one_component() {
        let q = ls(6);
        for iang in 0..q.ndir() {
            let a = q.angle(iang);
            let x = q.angle(q.reflect(iang, Normal::X));
            assert!((x.ox + a.ox).abs() < 1e-14 && (x.oy - a.oy).abs() < 1e-14);
            let y = q.angle(q.reflect(iang, Normal::Y));
            assert!((y.oy + a.oy).abs() < 1e-14 && (y.ox - a.ox).abs() < 1e-14);
            let z = q.angle(q.reflect(iang, Normal::Z));
            assert!((z.oz + a.oz).abs() < 1e-14);
        }
    }

    #[test]
    fn test_chebyshev_yamamoto_product() {
        let azi = chebyshev(4).unwrap();
        let pol = yamamoto(3).unwrap();
        assert!((pol[0].0 - 0.167429147795).abs() < 1e-5);
        let q = AngularQuadrature::from_octant(QuadratureKind::Cy, product(&azi, &pol));
        assert_eq!(q.ndir_oct(), 12);
        let w: f64 = q.octant(1).iter().map(|a| a.weight).sum();
        assert!((w - 1.0).abs() < 1e-6);
        // Azimuth-major ordering.
        assert!((q.angle(0).alpha - q.angle(2).alpha).abs() < 1e-14);
        assert!(yamamoto(4).is_err());
    }

    #[test]
    fn test_modify_angle_updates_images() {
        let mut q = ls(4);
        let a = q.angle(1).with_alpha(0.3);
        q.modify_angle(1, a);
        for oct in 1..=8 {
            let b = &q.octant(oct)[1];
            assert!((b.ox.abs() - a.ox).abs() < 1e-14);
            assert!((b.oy.abs() - a.oy).abs() < 1e-14);
            assert_eq!(b.octant(), oct);
        }
    }

    #[test]
    fn test_user_angles_validated() {
        let good = [UserAngle { alpha: 30.0, theta: 60.0, weight: 2.0 }];
        let v = user_angles(&good).unwrap();
        assert!((v[0].weight - 1.0).abs() < 1e-15);
        let bad = [UserAngle { alpha: 95.0, theta: 60.0, weight: 1.0 }];
        assert!(user_angles(&bad).is_err());
    }
}
