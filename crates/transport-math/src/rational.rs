// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Rational Approximation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Rational approximation on a fixed denominator grid.

/// Nearest fraction `n/d` to `target ∈ [0, 1]` with the given denominator,
/// reduced to lowest terms. The numerator is never zero, so the error is at
/// most `1/(2d)` unless `target < 1/(2d)`.
pub fn nearest_fraction(target: f64, d: u64) -> (u64, u64) {
    let d = d.max(1);
    let n = ((target.clamp(0.0, 1.0) * d as f64).round() as u64).clamp(1, d);
    let g = gcd(n, d);
    (n / g, d / g)
}

pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_fractions() {
        assert_eq!(nearest_fraction(0.5, 10), (1, 2));
        assert_eq!(nearest_fraction(0.75, 8), (3, 4));
        assert_eq!(nearest_fraction(1.0 / 3.0, 9), (1, 3));
    }

    #[test]
    fn test_thirty_degrees_on_fine_grid() {
        let t = 30.0_f64.to_radians().tan();
        assert_eq!(nearest_fraction(t, 428), (247, 428));
        assert_eq!(nearest_fraction(t, 7), (4, 7));
    }

    #[test]
    fn test_numerator_never_zero() {
        assert_eq!(nearest_fraction(0.0, 5), (1, 5));
        assert_eq!(nearest_fraction(1e-6, 0), (1, 1));
        assert_eq!(nearest_fraction(1.0, 6), (1, 1));
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(247, 428), 1);
    }
}
