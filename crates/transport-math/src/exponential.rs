// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Tabulated Exponential
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Linear-interpolation table for `exp(v)`, `v ≤ 0`.
//!
//! Arguments below the table minimum, or positive arguments produced by a
//! split source, fall back to `f64::exp`.

/// Default lower end of the table.
const DEFAULT_MIN_ARG: f64 = -10.0;

/// Default number of table nodes.
const DEFAULT_TABLE_SIZE: usize = 10_000;

#[derive(Debug, Clone)]
pub struct ExpTable {
    min: f64,
    space: f64,
    rspace: f64,
    values: Vec<f64>,
    max_error: f64,
}

impl ExpTable {
    pub fn new(min: f64, n: usize) -> Self {
        let n = n.max(2);
        let space = -min / (n - 1) as f64;
        let values: Vec<f64> = (0..n).map(|i| (min + i as f64 * space).exp()).collect();
        let mut table = ExpTable {
            min,
            space,
            rspace: 1.0 / space,
            values,
            max_error: 0.0,
        };
        // Largest interpolation error sits near interval midpoints.
        let max_error = (0..n - 1)
            .map(|i| {
                let x = min + space * (0.5 + i as f64);
                (table.exp(x) - x.exp()).abs()
            })
            .fold(0.0_f64, f64::max);
        table.max_error = max_error;
        table
    }

    #[inline]
    pub fn exp(&self, v: f64) -> f64 {
        if v < self.min || v > 0.0 {
            return v.exp();
        }
        let fi = (v - self.min) * self.rspace;
        let i = (fi as usize).min(self.values.len() - 2);
        let frac = v - (self.space * i as f64 + self.min);
        self.values[i] + (self.values[i + 1] - self.values[i]) * frac * self.rspace
    }

    /// Largest absolute deviation from `f64::exp` over the table range.
    pub fn max_error(&self) -> f64 {
        self.max_error
    }
}

impl Default for ExpTable {
    fn default() -> Self {
        ExpTable::new(DEFAULT_MIN_ARG, DEFAULT_TABLE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_std_exp() {
        let t = ExpTable::default();
        for i in 0..1000 {
            let v = -10.0 * i as f64 / 1000.0;
            assert!((t.exp(v) - v.exp()).abs() <= t.max_error() * 1.01 + 1e-15);
        }
        assert!(t.max_error() < 1e-6);
    }

    #[test]
    fn test_outside_table_falls_back() {
        let t = ExpTable::default();
        assert_eq!(t.exp(-20.0), (-20.0_f64).exp());
        assert_eq!(t.exp(0.5), 0.5_f64.exp());
    }

    #[test]
    fn test_endpoints() {
        let t = ExpTable::default();
        assert!((t.exp(0.0) - 1.0).abs() < 1e-14);
        assert!((t.exp(-10.0) - (-10.0_f64).exp()).abs() < 1e-14);
    }
}
