// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Fokker-Planck Map
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Synchrotron damping and quantum-excitation diffusion in p.
//!
//! Explicit three-point discretisation of
//! `∂ψ/∂t = e·[∂_p(p·ψ) + ∂²_p ψ]` with `e = 2/(f_s·t_d·steps)`,
//! whose stationary density is the unit-variance Gaussian. Boundary
//! rows are absorbing (they map to zero), which leaks mass only once
//! the tails touch the grid edge.

use vlasov_gpu::{GpuContext, StencilPipeline};
use vlasov_types::error::VlasovResult;

use crate::mesh::{Axis, PhaseSpace, Ruler};
use crate::stencil::{apply_stage, Stencil};
use crate::tracking::Position;

/// Which terms of the stencil are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FokkerPlanckVariant {
    /// Strict pass-through (identity rows, no renormalisation).
    None,
    DampingOnly,
    DiffusionOnly,
    Full,
}

pub struct FokkerPlanckMap {
    stencil: Stencil,
    pipeline: Option<StencilPipeline>,
    variant: FokkerPlanckVariant,
    beta: f64,
    p_axis: Ruler,
}

impl FokkerPlanckMap {
    pub fn new(
        mesh: &PhaseSpace,
        variant: FokkerPlanckVariant,
        beta: f64,
        ctx: Option<&GpuContext>,
    ) -> VlasovResult<Self> {
        let n = mesh.n();
        let p_axis = mesh.axis(Axis::P).clone();
        let dp = p_axis.delta();
        let e_d2 = beta / (dp * dp);
        let e_d = beta / (2.0 * dp);

        let mut stencil = Stencil::new(n * n, 3, false);
        for x in 0..n {
            // rows j = 0 and j = n-1 stay sentinel (absorbing)
            for j in 1..n - 1 {
                let cell = x * n + j;
                let here = (x * n + j) as u32;
                let below = (x * n + j - 1) as u32;
                let above = (x * n + j + 1) as u32;
                let p_j = p_axis.at(j);
                match variant {
                    FokkerPlanckVariant::None => {
                        stencil.set(cell, 0, here, 1.0);
                    }
                    FokkerPlanckVariant::DampingOnly => {
                        stencil.set(cell, 0, below, -e_d * p_j);
                        stencil.set(cell, 1, here, 1.0 + beta);
                        stencil.set(cell, 2, above, e_d * p_j);
                    }
                    FokkerPlanckVariant::DiffusionOnly => {
                        stencil.set(cell, 0, below, e_d2);
                        stencil.set(cell, 1, here, 1.0 - 2.0 * e_d2);
                        stencil.set(cell, 2, above, e_d2);
                    }
                    FokkerPlanckVariant::Full => {
                        stencil.set(cell, 0, below, e_d2 - e_d * p_j);
                        stencil.set(cell, 1, here, 1.0 + beta - 2.0 * e_d2);
                        stencil.set(cell, 2, above, e_d2 + e_d * p_j);
                    }
                }
            }
        }

        let pipeline = match ctx {
            Some(ctx) => Some(stencil.build_pipeline(ctx)?),
            None => None,
        };
        Ok(FokkerPlanckMap {
            stencil,
            pipeline,
            variant,
            beta,
            p_axis,
        })
    }

    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    pub fn variant(&self) -> FokkerPlanckVariant {
        self.variant
    }

    pub fn apply(
        &self,
        ctx: Option<&GpuContext>,
        input: &mut PhaseSpace,
        output: &mut PhaseSpace,
    ) -> VlasovResult<()> {
        apply_stage(&self.stencil, self.pipeline.as_ref(), ctx, input, output)
    }

    /// Deterministic part of the kick for tracked markers: damping
    /// contracts p toward zero. The diffusive part has no per-marker
    /// representation and is omitted.
    pub fn apply_to(&self, pos: Position) -> Position {
        match self.variant {
            FokkerPlanckVariant::Full | FokkerPlanckVariant::DampingOnly => {
                let p = self.p_axis.at_continuous(pos.p) * (1.0 - self.beta);
                Position {
                    q: pos.q,
                    p: self.p_axis.to_index(p),
                }
            }
            _ => pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::BunchScalars;

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
    fn test_gaussian_is_fixed_point() {
        let n = 128;
        let mut m1 = gaussian_mesh(n);
        let reference = m1.data().clone();
        let mut m2 = m1.clone_layout();
        let beta = 1e-4;
        let map =
            FokkerPlanckMap::new(&m1, FokkerPlanckVariant::Full, beta, None).unwrap();

        for _ in 0..500 {
            map.apply(None, &mut m1, &mut m2).unwrap();
            map.apply(None, &mut m2, &mut m1).unwrap();
        }

        let mut max_rel = 0.0f64;
        let peak = reference[[n / 2, n / 2]];
        for x in 0..n {
            for y in 2..n - 2 {
                let dev = (m1.get(x, y) - reference[[x, y]]).abs() / peak;
                max_rel = max_rel.max(dev);
            }
        }
        // the discrete fixed point sits O(dp²) from the continuum Gaussian
        assert!(max_rel < 5e-4, "Gaussian drifted by {max_rel} of peak");
    }

    #[test]
    fn test_damping_restores_offset_mean() {
        // an off-centre Gaussian relaxes toward p = 0
        let n = 128;
        let mut m1 = gaussian_mesh(n);
        let p_axis = m1.axis(Axis::P).clone();
        for x in 0..n {
            for y in 0..n {
                let q = m1.axis(Axis::Q).at(x);
                let p = p_axis.at(y) - 1.0;
                m1.set(x, y, (-0.5 * (q * q + p * p)).exp());
            }
        }
        let mut m2 = m1.clone_layout();
        let beta = 1e-3;
        let map =
            FokkerPlanckMap::new(&m1, FokkerPlanckVariant::Full, beta, None).unwrap();

        m1.update_y_projection();
        let mean_before = m1.average(Axis::P);
        assert!((mean_before - 1.0).abs() < 0.01);

        for _ in 0..1000 {
            map.apply(None, &mut m1, &mut m2).unwrap();
            map.apply(None, &mut m2, &mut m1).unwrap();
        }
        m1.update_y_projection();
        let mean_after = m1.average(Axis::P);
        // 2000 applications at beta = 1e-3: mean decays by exp(-2)
        let expect = 1.0 * (-2000.0 * beta).exp();
        assert!(
            (mean_after - expect).abs() < 0.02,
            "mean {mean_after}, expected {expect}"
        );
    }

    #[test]
    fn test_variant_none_is_pass_through() {
        let mut m1 = gaussian_mesh(32);
        let mut m2 = m1.clone_layout();
        let map =
            FokkerPlanckMap::new(&m1, FokkerPlanckVariant::None, 0.5, None).unwrap();
        map.apply(None, &mut m1, &mut m2).unwrap();
        for x in 0..32 {
            for y in 1..31 {
                assert_eq!(m1.get(x, y), m2.get(x, y));
            }
            // absorbing boundary rows
            assert_eq!(m2.get(x, 0), 0.0);
            assert_eq!(m2.get(x, 31), 0.0);
        }
    }

    #[test]
    fn test_diffusion_spreads_variance() {
        let n = 128;
        let mut m1 = gaussian_mesh(n);
        let mut m2 = m1.clone_layout();
        let beta = 1e-3;
        let map =
            FokkerPlanckMap::new(&m1, FokkerPlanckVariant::DiffusionOnly, beta, None)
                .unwrap();
        m1.update_y_projection();
        let var_before = m1.variance(Axis::P);
        for _ in 0..250 {
            map.apply(None, &mut m1, &mut m2).unwrap();
            map.apply(None, &mut m2, &mut m1).unwrap();
        }
        m1.update_y_projection();
        let var_after = m1.variance(Axis::P);
        // pure diffusion adds 2*beta per application
        let expect = var_before + 2.0 * beta * 500.0;
        assert!(
            (var_after - expect).abs() < 0.05 * expect,
            "variance {var_after}, expected {expect}"
        );
    }

    #[test]
    fn test_tracked_marker_damps() {
        let mesh = gaussian_mesh(64);
        let beta = 1e-2;
        let map =
            FokkerPlanckMap::new(&mesh, FokkerPlanckVariant::Full, beta, None).unwrap();
        let p_axis = mesh.axis(Axis::P);
        let start = Position {
            q: 10.0,
            p: p_axis.to_index(2.0),
        };
        let moved = map.apply_to(start);
        let p_phys = p_axis.at_continuous(moved.p);
        assert!((p_phys - 2.0 * (1.0 - beta)).abs() < 1e-12);
        assert_eq!(moved.q, start.q);
    }
}
