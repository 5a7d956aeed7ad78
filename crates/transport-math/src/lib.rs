//! Geometry and numerical primitives for SCPN Transport Core.

pub mod exponential;
pub mod fp;
pub mod geom;
pub mod rational;
