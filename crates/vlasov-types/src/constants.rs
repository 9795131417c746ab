// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Speed of light (m/s)
pub const C: f64 = 299_792_458.0;

/// Elementary charge (C)
pub const Q_ELECTRON: f64 = 1.602_176_634e-19;

/// Electron rest energy (eV)
pub const E_REST_ELECTRON_EV: f64 = 510_998.95;

/// Vacuum permeability (H/m)
pub const MU0: f64 = 1.256_637_061_4e-6;

/// Vacuum permittivity (F/m)
pub const EPSILON0: f64 = 8.854_187_812_8e-12;

/// Impedance of free space (Ohm)
pub const Z0_VACUUM: f64 = 376.730_313_668;

/// Alfvén current (A), used by the bursting-threshold scaling law
pub const I_ALFVEN: f64 = 17_045.0;

/// Euler gamma function at 2/3, prefactor of the free-space CSR impedance
pub const GAMMA_TWO_THIRDS: f64 = 1.354_117_939_426_4;
