// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Vlasov Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Longitudinal phase-space evolution engine.
//!
//! Integrates the Vlasov–Fokker–Planck equation on a fixed q×p mesh by
//! chaining precomputed source maps: wake kick, rotation (or RF kick and
//! drift), Fokker–Planck. The wake is recomputed self-consistently each
//! step from the charge projection via an impedance convolution.

pub mod field;
pub mod fokker_planck;
pub mod haissinski;
pub mod impedance;
pub mod kernel;
pub mod kick;
pub mod mesh;
pub mod rotation;
pub mod stencil;
pub mod tracking;
pub mod wake;

pub use field::ElectricField;
pub use impedance::Impedance;
pub use kernel::{Snapshot, VlasovKernel};
pub use mesh::{Axis, PhaseSpace, Ruler};
pub use stencil::SourceMap;
pub use tracking::Position;
