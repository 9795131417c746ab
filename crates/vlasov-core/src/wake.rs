// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Wake Kick Maps
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Energy kick from the collective wake.
//!
//! Two variants share the kick machinery: `WakePotentialMap` pulls the
//! freshly convolved potential from the electric field before every
//! application; `WakeFunctionMap` carries a static wake function from a
//! file and integrates it against the current charge projection.
//! Both translate the potential into a per-q offset in p and rebuild
//! their stencil in `update`.

use vlasov_gpu::{GpuContext, StencilPipeline};
use vlasov_math::interp::interp1d;
use vlasov_types::error::{VlasovError, VlasovResult};

use crate::field::ElectricField;
use crate::impedance::read_two_column;
use crate::kick::{build_shift_stencil, KickAxis};
use crate::mesh::{Axis, PhaseSpace};
use crate::stencil::{apply_stage, Stencil};
use crate::tracking::Position;

/// Wake kick driven by the self-consistent wake potential.
pub struct WakePotentialMap {
    stencil: Stencil,
    pipeline: Option<StencilPipeline>,
    offset: Vec<f64>,
    points: usize,
    clamp: bool,
    n: usize,
    dp: f64,
}

impl WakePotentialMap {
    pub fn new(
        mesh: &PhaseSpace,
        points: usize,
        clamp: bool,
        ctx: Option<&GpuContext>,
    ) -> VlasovResult<Self> {
        let n = mesh.n();
        let dp = mesh.axis(Axis::P).delta();
        let offset = vec![0.0; n];
        let stencil = build_shift_stencil(n, points, clamp, KickAxis::P, &offset);
        let pipeline = match ctx {
            Some(ctx) => Some(stencil.build_pipeline(ctx)?),
            None => None,
        };
        Ok(WakePotentialMap {
            stencil,
            pipeline,
            offset,
            points,
            clamp,
            n,
            dp,
        })
    }

    /// Rebuild the stencil from the field's current wake potential:
    /// δp(q) = −V(q), offsets in cells of p.
    pub fn update(
        &mut self,
        field: &ElectricField,
        ctx: Option<&GpuContext>,
    ) -> VlasovResult<()> {
        let wake = field.wake_potential();
        debug_assert_eq!(wake.len(), self.n);
        for (dst, &v) in self.offset.iter_mut().zip(wake.iter()) {
            *dst = -v / self.dp;
        }
        self.stencil =
            build_shift_stencil(self.n, self.points, self.clamp, KickAxis::P, &self.offset);
        if let (Some(ctx), Some(pipe)) = (ctx, self.pipeline.as_ref()) {
            let (idx, w) = self.stencil.gpu_tables();
            pipe.update_weights(ctx, &idx, &w);
        }
        Ok(())
    }

    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    /// Current per-q kick in cells of p.
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

    /// Kick a tracked point by the interpolated wake at its q.
    pub fn apply_to(&self, pos: Position) -> Position {
        let dp_cells = interp1d(&self.offset, pos.q, self.points, self.clamp);
        Position {
            q: pos.q,
            p: pos.p + dp_cells,
        }
    }
}

/// Wake kick from a static wake function loaded at construction.
pub struct WakeFunctionMap {
    stencil: Stencil,
    pipeline: Option<StencilPipeline>,
    /// Wake function on 2n offsets, entry j at (j − n) q-cells.
    wake_function: Vec<f64>,
    offset: Vec<f64>,
    kick_scaling: f64,
    points: usize,
    clamp: bool,
    n: usize,
    dq: f64,
    dp: f64,
}

impl WakeFunctionMap {
    /// Load (Δq, W) samples from a two-column file and resample them
    /// onto the 2n cell-offset grid.
    pub fn from_file(
        mesh: &PhaseSpace,
        path: &str,
        kick_scaling: f64,
        points: usize,
        clamp: bool,
        ctx: Option<&GpuContext>,
    ) -> VlasovResult<Self> {
        let mut rows = read_two_column(path)?;
        if rows.len() < 2 {
            return Err(VlasovError::ConfigInvalid(format!(
                "wake file {path} needs at least 2 samples, got {}",
                rows.len()
            )));
        }
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = mesh.n();
        let dq = mesh.axis(Axis::Q).delta();
        let dp = mesh.axis(Axis::P).delta();

        let wake_function: Vec<f64> = (0..2 * n)
            .map(|j| {
                let x = (j as isize - n as isize) as f64 * dq;
                sample_sorted(&rows, x)
            })
            .collect();

        let offset = vec![0.0; n];
        let stencil = build_shift_stencil(n, points, clamp, KickAxis::P, &offset);
        let pipeline = match ctx {
            Some(ctx) => Some(stencil.build_pipeline(ctx)?),
            None => None,
        };
        Ok(WakeFunctionMap {
            stencil,
            pipeline,
            wake_function,
            offset,
            kick_scaling,
            points,
            clamp,
            n,
            dq,
            dp,
        })
    }

    /// Integrate the wake function against the current x-projection and
    /// rebuild the stencil. The projection must be fresh.
    pub fn update(
        &mut self,
        mesh: &PhaseSpace,
        ctx: Option<&GpuContext>,
    ) -> VlasovResult<()> {
        let proj = mesh.x_projection();
        let n = self.n;
        for x in 0..n {
            let mut v = 0.0f64;
            for (xs, &rho) in proj.iter().enumerate() {
                // wake_function entry n + (x - xs)
                let j = (n as isize + x as isize - xs as isize) as usize;
                v += self.wake_function[j] * rho;
            }
            self.offset[x] = -v * self.dq * self.kick_scaling / self.dp;
        }
        self.stencil =
            build_shift_stencil(n, self.points, self.clamp, KickAxis::P, &self.offset);
        if let (Some(ctx), Some(pipe)) = (ctx, self.pipeline.as_ref()) {
            let (idx, w) = self.stencil.gpu_tables();
            pipe.update_weights(ctx, &idx, &w);
        }
        Ok(())
    }

    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    /// Current per-q kick in cells of p.
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
        let dp_cells = interp1d(&self.offset, pos.q, self.points, self.clamp);
        Position {
            q: pos.q,
            p: pos.p + dp_cells,
        }
    }
}

/// Linear interpolation on sorted (x, y) rows; zero outside the range.
fn sample_sorted(rows: &[(f64, f64)], x: f64) -> f64 {
    let first = rows[0].0;
    let last = rows[rows.len() - 1].0;
    if x < first || x > last {
        return 0.0;
    }
    let i = rows.partition_point(|r| r.0 <= x);
    if i == 0 {
        return rows[0].1;
    }
    if i >= rows.len() {
        return rows[rows.len() - 1].1;
    }
    let (x0, y0) = rows[i - 1];
    let (x1, y1) = rows[i];
    if x1 > x0 {
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    } else {
        y0
    }
}
