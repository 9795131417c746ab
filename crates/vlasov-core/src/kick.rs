// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Kick Maps
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Position-dependent energy kicks and energy-dependent displacements.
//!
//! Both reduce to a 1-D interpolation perpendicular to the offset:
//! the RF kick shifts each q-column in p, the drift shifts each p-row
//! in q. Offsets are stored in units of mesh cells.

use vlasov_gpu::{GpuContext, StencilPipeline};
use vlasov_math::interp::lagrange_kernel;
use vlasov_types::error::VlasovResult;

use crate::mesh::{Axis, PhaseSpace, Ruler};
use crate::stencil::{apply_stage, Stencil};
use crate::tracking::Position;

/// Axis the offset acts along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickAxis {
    /// Shift in q, one offset per p-row (drift).
    Q,
    /// Shift in p, one offset per q-column (energy kick).
    P,
}

/// Build the 1-D shift stencil for per-line offsets given in cells.
pub(crate) fn build_shift_stencil(
    n: usize,
    points: usize,
    clamp: bool,
    axis: KickAxis,
    offset: &[f64],
) -> Stencil {
    debug_assert_eq!(offset.len(), n);
    let mut stencil = Stencil::new(n * n, points, clamp);
    for x in 0..n {
        for y in 0..n {
            let cell = x * n + y;
            let (moving, line_offset) = match axis {
                KickAxis::P => (y as f64, offset[x]),
                KickAxis::Q => (x as f64, offset[y]),
            };
            let src = moving - line_offset;
            let kernel = lagrange_kernel(points, src);
            for k in 0..points {
                let g = kernel.first + k as isize;
                if g < 0 || g >= n as isize {
                    continue; // boundary: sentinel stays
                }
                let idx = match axis {
                    KickAxis::P => x * n + g as usize,
                    KickAxis::Q => g as usize * n + y,
                };
                stencil.set(cell, k, idx as u32, kernel.weights[k]);
            }
        }
    }
    stencil
}

/// RF focusing kick: Δp(q) = −sin(angle·q/q_scale)/angle.
///
/// With the default q_scale = 1/angle the small-amplitude limit is the
/// linear focusing −angle·q of the rotation map; the full sine bends
/// the bucket at large amplitudes.
pub struct RfKickMap {
    stencil: Stencil,
    pipeline: Option<StencilPipeline>,
    offset: Vec<f64>,
    angle: f64,
    q_scale: f64,
    q_axis: Ruler,
    p_axis: Ruler,
}

impl RfKickMap {
    pub fn new(
        mesh: &PhaseSpace,
        angle: f64,
        q_scale: f64,
        points: usize,
        clamp: bool,
        ctx: Option<&GpuContext>,
    ) -> VlasovResult<Self> {
        let n = mesh.n();
        let q_axis = mesh.axis(Axis::Q).clone();
        let p_axis = mesh.axis(Axis::P).clone();
        let dp = p_axis.delta();

        let offset: Vec<f64> = (0..n)
            .map(|x| {
                let q = q_axis.at(x);
                -(angle * q / q_scale).sin() / angle / dp
            })
            .collect();

        let stencil = build_shift_stencil(n, points, clamp, KickAxis::P, &offset);
        let pipeline = match ctx {
            Some(ctx) => Some(stencil.build_pipeline(ctx)?),
            None => None,
        };
        Ok(RfKickMap {
            stencil,
            pipeline,
            offset,
            angle,
            q_scale,
            q_axis,
            p_axis,
        })
    }

    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    /// Current kick per q-column, in cells of p.
    pub fn force(&self) -> &[f64] {
        &self.offset
    }

    pub fn apply(
        &self,
        ctx: Option<&GpuContext>,
        input: &mut PhaseSpace,
        output: &mut PhaseSpace,
    ) -> VlasovResult<()> {
        apply_stage(&self.stencil, self.pipeline.as_ref(), ctx, input, output)
    }

    pub fn apply_to(&self, pos: Position) -> Position {
        let q = self.q_axis.at_continuous(pos.q);
        let dp_cells = -(self.angle * q / self.q_scale).sin() / self.angle / self.p_axis.delta();
        Position {
            q: pos.q,
            p: pos.p + dp_cells,
        }
    }
}

/// Chromatic drift: Δq(p) = (α₀ + α₁·p + α₂·p²)·angle·p/α₀.
pub struct DriftMap {
    stencil: Stencil,
    pipeline: Option<StencilPipeline>,
    offset: Vec<f64>,
    coeffs: [f64; 3],
    angle: f64,
    q_axis: Ruler,
    p_axis: Ruler,
}

impl DriftMap {
    pub fn new(
        mesh: &PhaseSpace,
        angle: f64,
        alpha: [f64; 3],
        points: usize,
        clamp: bool,
        ctx: Option<&GpuContext>,
    ) -> VlasovResult<Self> {
        let n = mesh.n();
        let q_axis = mesh.axis(Axis::Q).clone();
        let p_axis = mesh.axis(Axis::P).clone();
        let dq = q_axis.delta();

        let offset: Vec<f64> = (0..n)
            .map(|y| {
                let p = p_axis.at(y);
                drift_shift(&alpha, angle, p) / dq
            })
            .collect();

        let stencil = build_shift_stencil(n, points, clamp, KickAxis::Q, &offset);
        let pipeline = match ctx {
            Some(ctx) => Some(stencil.build_pipeline(ctx)?),
            None => None,
        };
        Ok(DriftMap {
            stencil,
            pipeline,
            offset,
            coeffs: alpha,
            angle,
            q_axis,
            p_axis,
        })
    }

    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    /// Current shift per p-row, in cells of q.
    pub fn force(&self) -> &[f64] {
        &self.offset
    }

    pub fn apply(
        &self,
        ctx: Option<&GpuContext>,
        input: &mut PhaseSpace,
        output: &mut PhaseSpace,
    ) -> VlasovResult<()> {
        apply_stage(&self.stencil, self.pipeline.as_ref(), ctx, input, output)
    }

    pub fn apply_to(&self, pos: Position) -> Position {
        let p = self.p_axis.at_continuous(pos.p);
        let dq_cells = drift_shift(&self.coeffs, self.angle, p) / self.q_axis.delta();
        Position {
            q: pos.q + dq_cells,
            p: pos.p,
        }
    }
}

#[inline]
fn drift_shift(alpha: &[f64; 3], angle: f64, p: f64) -> f64 {
    (alpha[0] + alpha[1] * p + alpha[2] * p * p) * angle * p / alpha[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::BunchScalars;
    use std::f64::consts::PI;

    fn gaussian_mesh(n: usize) -> PhaseSpace {
        PhaseSpace::new(
            n,
            -5.0,
            5.0,
            -5.0,
            5.0,
            BunchScalars {
                charge: 1e-10,
                current: 1e-3,
                length: 1e-3,
                energy_spread: 6e5,
            },
        )
    }

    #[test]
    fn test_rf_kick_sign_and_linearity() {
        let mesh = gaussian_mesh(64);
        let angle = 2.0 * PI / 1000.0;
        let map = RfKickMap::new(&mesh, angle, 1.0 / angle, 4, true, None).unwrap();
        // positive q gets a negative p kick proportional to -angle*q
        let dp = mesh.axis(Axis::P).delta();
        let q = mesh.axis(Axis::Q).at(50);
        assert!(q > 0.0);
        let expect = -angle * q / dp;
        let got = map.force()[50];
        assert!(
            (got - expect).abs() < 1e-3 * expect.abs(),
            "offset {got}, linear estimate {expect}"
        );
    }

    #[test]
    fn test_drift_shift_polynomial() {
        let mesh = gaussian_mesh(64);
        let angle = 2.0 * PI / 1000.0;
        let alpha = [1.0e-3, 2.0e-4, 0.0];
        let map = DriftMap::new(&mesh, angle, alpha, 4, true, None).unwrap();
        let dq = mesh.axis(Axis::Q).delta();
        let p = mesh.axis(Axis::P).at(10);
        let expect = (alpha[0] + alpha[1] * p) * angle * p / alpha[0] / dq;
        let got = map.force()[10];
        assert!((got - expect).abs() < 1e-12, "{got} vs {expect}");
    }

    #[test]
    fn test_kick_drift_pair_approximates_rotation() {
        // one kick + one drift on a tracked point is a first-order
        // rotation step
        let mesh = gaussian_mesh(128);
        let angle = 2.0 * PI / 2000.0;
        let kick = RfKickMap::new(&mesh, angle, 1.0 / angle, 4, true, None).unwrap();
        let drift = DriftMap::new(&mesh, angle, [1e-3, 0.0, 0.0], 4, true, None).unwrap();

        // start at q = 2 sigma, p = 0 (cell coordinates)
        let start = Position {
            q: mesh.axis(Axis::Q).to_index(2.0),
            p: mesh.axis(Axis::P).to_index(0.0),
        };
        let mut pos = start;
        let steps = 2000;
        for _ in 0..steps {
            pos = kick.apply_to(pos);
            pos = drift.apply_to(pos);
        }
        // after a full synchrotron period the point comes back
        let dq = (pos.q - start.q).abs();
        let dp = (pos.p - start.p).abs();
        assert!(dq < 1.0 && dp < 1.0, "drifted by ({dq}, {dp}) cells");
    }

    #[test]
    fn test_mass_conservation() {
        let mut m1 = gaussian_mesh(64);
        let mut m2 = m1.clone_layout();
        let angle = 2.0 * PI / 1000.0;
        let map = RfKickMap::new(&m1, angle, 1.0 / angle, 4, true, None).unwrap();
        let before: f64 = m1.as_flat().iter().sum();
        map.apply(None, &mut m1, &mut m2).unwrap();
        let after: f64 = m2.as_flat().iter().sum();
        let rel = (after - before).abs() / before;
        assert!(rel < 1e-4, "mass changed by {rel}");
    }

    #[test]
    fn test_drift_translates_rows() {
        // with linear momentum compaction a whole p-row translates
        // rigidly by angle*p/dq cells
        let n = 64;
        let mut m1 = gaussian_mesh(n);
        let mut m2 = m1.clone_layout();
        let angle = 2.0 * PI / 100.0;
        let map = DriftMap::new(&m1, angle, [1e-3, 0.0, 0.0], 4, false, None).unwrap();
        map.apply(None, &mut m1, &mut m2).unwrap();

        let y = 48; // p > 0 row
        let shift = map.force()[y];
        assert!(shift > 0.0);
        for x in 8..n - 8 {
            let src = x as f64 - shift;
            let lo = src.floor() as usize;
            let f = src - src.floor();
            let expect = (1.0 - f) * m1.get(lo, y)
                + f * m1.get(lo + 1, y);
            let got = m2.get(x, y);
            // cubic vs linear reference: agreement within interpolation error
            assert!(
                (got - expect).abs() < 1e-3 * m1.get(32, 32).abs().max(1e-12),
                "row translation mismatch at x={x}: {got} vs {expect}"
            );
        }
    }
}
