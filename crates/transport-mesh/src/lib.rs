// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Transport Mesh
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Geometry hierarchy (pin mesh → pin → lattice → assembly → core),
//! coarse pin mesh indexing and material data.

pub mod core_mesh;
pub mod lattice;
pub mod material;
pub mod mesh;
pub mod pin_mesh;
pub mod plane;
