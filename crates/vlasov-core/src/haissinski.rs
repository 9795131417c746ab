// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Haissinski Seed
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fixed-point iteration toward the Haissinski equilibrium profile.
//!
//! Each pass recomputes the wake from the current charge projection and
//! resets the projection to `exp(−q²/2 − V(q))`, renormalised; the 2-D
//! density is rebuilt as the outer product with a Gaussian energy
//! profile. Returns the per-iteration relative residual so callers can
//! judge convergence.

use vlasov_types::error::VlasovResult;

use crate::field::ElectricField;
use crate::mesh::{Axis, PhaseSpace};

pub fn haissinski_seed(
    mesh: &mut PhaseSpace,
    field: &mut ElectricField,
    iterations: usize,
) -> VlasovResult<Vec<f64>> {
    let n = mesh.n();
    let dq = mesh.axis(Axis::Q).delta();
    let dp = mesh.axis(Axis::P).delta();

    // unit-integral Gaussian energy profile, reused every pass
    let mut y_proj: Vec<f64> = (0..n)
        .map(|y| {
            let p = mesh.axis(Axis::P).at(y);
            (-0.5 * p * p).exp()
        })
        .collect();
    let y_total: f64 = y_proj.iter().sum::<f64>() * dp;
    for v in y_proj.iter_mut() {
        *v /= y_total;
    }

    let mut residuals = Vec::with_capacity(iterations);
    let mut new_proj = vec![0.0f64; n];
    for _ in 0..iterations {
        field.update_wake(mesh)?;
        let wake = field.wake_potential();

        let mut charge = 0.0f64;
        for x in 0..n {
            let q = mesh.axis(Axis::Q).at(x);
            new_proj[x] = (-0.5 * q * q - wake[x]).exp();
            charge += new_proj[x] * dq;
        }
        for v in new_proj.iter_mut() {
            *v /= charge;
        }

        let mut num = 0.0f64;
        let mut den = 0.0f64;
        for (x, &v) in new_proj.iter().enumerate() {
            let d = v - mesh.x_projection()[x];
            num += d * d;
            den += v * v;
        }
        residuals.push((num / den).sqrt());

        mesh.set_x_projection(&new_proj);
        mesh.set_y_projection(&y_proj);
        mesh.create_from_projections();
    }
    Ok(residuals)
}
