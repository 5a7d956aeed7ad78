// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Sweepers and Solvers
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Transport sweepers and the outer solvers that drive them.
//!
//! Stage 1: quadrature, boundary conditions, cross sections, sources
//! Stage 2: ray tracing and the MoC sweeper
//! Stage 3: the Sn sweeper and its differencing schemes
//! Stage 4: 2D3D coupling, eigenvalue and fixed-source drivers

pub mod boundary;
pub mod cmfd;
pub mod coarse_data;
pub mod context;
pub mod correction_data;
pub mod eigen;
pub mod fixed_source;
pub mod moc_current;
pub mod moc_sweeper;
pub mod output;
pub mod quadrature;
pub mod ray;
pub mod ray_data;
pub mod sn_cell;
pub mod sn_current;
pub mod sn_sweeper;
pub mod source;
pub mod sweeper;
pub mod sweeper_2d3d;
pub mod xs_mesh;
