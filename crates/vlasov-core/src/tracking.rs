// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Particle Tracking
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Marker particles advected through the same maps as the density.
//!
//! Positions live in mesh coordinates (fractional cell indices), which
//! is what the maps' continuous-coordinate transforms operate on.

use rand::Rng;
use rand_distr::StandardNormal;
use vlasov_types::error::VlasovResult;

use crate::impedance::read_two_column;
use crate::mesh::{Axis, PhaseSpace};

/// A tracked point in mesh coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub q: f64,
    pub p: f64,
}

/// Load marker coordinates from a two-column text file.
pub fn load_tracking_file(path: &str) -> VlasovResult<Vec<Position>> {
    let rows = read_two_column(path)?;
    Ok(rows
        .into_iter()
        .map(|(q, p)| Position { q, p })
        .collect())
}

/// Draw `count` markers from the mesh density by rejection sampling.
/// An empty (all-zero) mesh yields no markers.
pub fn sample_from_mesh<R: Rng>(mesh: &PhaseSpace, count: usize, rng: &mut R) -> Vec<Position> {
    let n = mesh.n();
    let peak = mesh.as_flat().iter().fold(0.0f64, |a, &b| a.max(b));
    if peak <= 0.0 {
        return Vec::new();
    }
    let span = (n - 1) as f64;
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let q = rng.gen_range(0.0..=span);
        let p = rng.gen_range(0.0..=span);
        let u = rng.gen_range(0.0..peak);
        let cell = mesh.get(q.round() as usize, p.round() as usize);
        if u < cell {
            out.push(Position { q, p });
        }
    }
    out
}

/// Draw `count` markers from the natural bi-Gaussian start distribution
/// (unit sigma per axis), in mesh coordinates.
pub fn sample_gaussian<R: Rng>(mesh: &PhaseSpace, count: usize, rng: &mut R) -> Vec<Position> {
    (0..count)
        .map(|_| {
            let q: f64 = rng.sample(StandardNormal);
            let p: f64 = rng.sample(StandardNormal);
            Position {
                q: mesh.axis(Axis::Q).to_index(q),
                p: mesh.axis(Axis::P).to_index(p),
            }
        })
        .collect()
}

/// Kolmogorov–Smirnov distance between the markers' q histogram and the
/// mesh's x-projection. The projection must be fresh.
pub fn ks_statistic(particles: &[Position], mesh: &PhaseSpace) -> f64 {
    if particles.is_empty() {
        return 1.0;
    }
    let n = mesh.n();
    let proj = mesh.x_projection();
    let dq = mesh.axis(Axis::Q).delta();
    let total: f64 = proj.iter().sum::<f64>() * dq;
    if total <= 0.0 {
        return 1.0;
    }

    let mut qs: Vec<f64> = particles.iter().map(|p| p.q).collect();
    qs.sort_by(f64::total_cmp);

    let count = qs.len() as f64;
    let mut ks = 0.0f64;
    let mut cdf_mesh = 0.0f64;
    let mut seen = 0usize;
    for x in 0..n {
        cdf_mesh += proj[x] * dq / total;
        // markers up to and including this cell centre
        while seen < qs.len() && qs[seen] <= x as f64 + 0.5 {
            seen += 1;
        }
        let cdf_emp = seen as f64 / count;
        ks = ks.max((cdf_emp - cdf_mesh).abs());
    }
    ks
}
