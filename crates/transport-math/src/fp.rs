// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Floating-Point Comparisons
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fuzzy comparisons used by the geometry and the ray tracer.

use transport_types::constants::{REAL_FUZZ, REL_FUZZ};

/// Absolute equivalence within `REAL_FUZZ`.
#[inline]
pub fn fp_equiv_abs(a: f64, b: f64) -> bool {
    (a - b).abs() < REAL_FUZZ
}

/// Relative equivalence within `REL_FUZZ`, falling back to absolute near zero.
#[inline]
pub fn fp_equiv_rel(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs());
    if scale < REAL_FUZZ {
        return true;
    }
    (a - b).abs() <= REL_FUZZ * scale
}

/// `a < b` by more than the fuzz.
#[inline]
pub fn fuzzy_lt(a: f64, b: f64) -> bool {
    a < b - REAL_FUZZ
}

/// Index of the interval of a sorted breakpoint vector containing `v`.
///
/// `breaks` holds `n + 1` increasing values. Returns `None` outside
/// `[breaks[0], breaks[n]]`. A value on an interior breakpoint belongs to the
/// interval above it.
pub fn bracket(breaks: &[f64], v: f64) -> Option<usize> {
    let n = breaks.len().checked_sub(1)?;
    if n == 0 || v < breaks[0] - REAL_FUZZ || v > breaks[n] + REAL_FUZZ {
        return None;
    }
    let i = breaks.partition_point(|&b| b <= v + REAL_FUZZ);
    Some(i.saturating_sub(1).min(n - 1))
}
