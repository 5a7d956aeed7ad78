// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Surfaces
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Coarse-cell faces, face normals, boundary kinds and grid positions.

use serde::{Deserialize, Serialize};

/// Face of a coarse cell. The discriminants are part of the output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Surface {
    East = 0,
    North = 1,
    West = 2,
    South = 3,
    Bottom = 4,
    Top = 5,
}

impl Surface {
    pub const ALL: [Surface; 6] = [
        Surface::East,
        Surface::North,
        Surface::West,
        Surface::South,
        Surface::Bottom,
        Surface::Top,
    ];

    pub fn normal(self) -> Normal {
        match self {
            Surface::East | Surface::West => Normal::X,
            Surface::North | Surface::South => Normal::Y,
            Surface::Bottom | Surface::Top => Normal::Z,
        }
    }

    pub fn opposite(self) -> Surface {
        match self {
            Surface::East => Surface::West,
            Surface::West => Surface::East,
            Surface::North => Surface::South,
            Surface::South => Surface::North,
            Surface::Bottom => Surface::Top,
            Surface::Top => Surface::Bottom,
        }
    }

    /// True for the face on the positive side of its axis.
    pub fn is_positive(self) -> bool {
        matches!(self, Surface::East | Surface::North | Surface::Top)
    }
}

/// Axis normal to a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normal {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Normal {
    pub const ALL: [Normal; 3] = [Normal::X, Normal::Y, Normal::Z];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Domain boundary treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    Vacuum,
    Reflect,
    Prescribed,
}

/// Boundary treatments of the six domain faces, indexed by `Surface as usize`.
pub type BoundaryArray = [Boundary; 6];

/// Integer position on the coarse grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Position {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Position { x, y, z }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_discriminants() {
        assert_eq!(Surface::East as usize, 0);
        assert_eq!(Surface::North as usize, 1);
        assert_eq!(Surface::West as usize, 2);
        assert_eq!(Surface::South as usize, 3);
        assert_eq!(Surface::Bottom as usize, 4);
        assert_eq!(Surface::Top as usize, 5);
    }

    #[test]
    fn test_opposite_is_involution() {
        for s in Surface::ALL {
            assert_eq!(s.opposite().opposite(), s);
            assert_eq!(s.opposite().normal(), s.normal());
            assert_ne!(s.opposite().is_positive(), s.is_positive());
        }
    }

    #[test]
    fn test_boundary_lowercase_serde() {
        let b: Boundary = serde_json::from_str("\"reflect\"").unwrap();
        assert_eq!(b, Boundary::Reflect);
        assert!(serde_json::from_str::<Boundary>("\"periodic\"").is_err());
    }
}
