// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// π
pub const PI: f64 = std::f64::consts::PI;

/// 2π, the azimuthal span of a full circle.
pub const TWOPI: f64 = 2.0 * PI;

/// π/2
pub const HPI: f64 = 0.5 * PI;

/// 4π, the solid angle of the unit sphere. Isotropic sources are divided by it.
pub const FPI: f64 = 4.0 * PI;

/// 1/(4π)
pub const RFPI: f64 = 1.0 / FPI;

/// Tolerance for geometric comparisons (cm).
pub const REAL_FUZZ: f64 = 1.0e-12;

/// Relative tolerance used when two lengths must be treated as equal.
pub const REL_FUZZ: f64 = 1.0e-10;

/// Largest azimuthal subdivision accepted by a cylindrical pin mesh.
pub const MAX_AZI_DIVISIONS: usize = 8;
