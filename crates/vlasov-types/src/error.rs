// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Error
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VlasovError {
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Accelerator device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Numerical divergence at step {step}: {message}")]
    NumericalDivergence { step: usize, message: String },

    #[error("Grid index out of bounds: q={q}, p={p}")]
    GridOutOfBounds { q: usize, p: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type VlasovResult<T> = Result<T, VlasovError>;
