// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Source Map Stencils
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Precomputed transport stencils and the closed set of source maps.
//!
//! A stencil maps every output cell to `ip` input cells with real
//! weights: `out[c] = Σ_k w_k · in[s_k]`. Boundary cells carry sentinel
//! entries (index 0, weight 0). The map variants are a fixed set, so
//! they dispatch through a tagged union rather than trait objects.

use vlasov_gpu::{GpuContext, StencilPipeline};
use vlasov_types::error::VlasovResult;

use crate::fokker_planck::FokkerPlanckMap;
use crate::kick::{DriftMap, RfKickMap};
use crate::mesh::PhaseSpace;
use crate::rotation::RotationMap;
use crate::tracking::Position;
use crate::wake::{WakeFunctionMap, WakePotentialMap};

/// One `(source index, weight)` pair of a stencil row.
#[derive(Debug, Clone, Copy)]
pub struct StencilEntry {
    pub idx: u32,
    pub weight: f64,
}

/// Sentinel entry used to pad boundary rows.
pub const SENTINEL: StencilEntry = StencilEntry {
    idx: 0,
    weight: 0.0,
};

/// Flat `n_cells × ip` stencil with optional clamping.
pub struct Stencil {
    n_cells: usize,
    ip: usize,
    clamp: bool,
    entries: Vec<StencilEntry>,
}

impl Stencil {
    pub fn new(n_cells: usize, ip: usize, clamp: bool) -> Self {
        Stencil {
            n_cells,
            ip,
            clamp,
            entries: vec![SENTINEL; n_cells * ip],
        }
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// Interpolation points per output cell.
    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn clamped(&self) -> bool {
        self.clamp
    }

    #[inline]
    pub fn set(&mut self, cell: usize, k: usize, idx: u32, weight: f64) {
        debug_assert!(k < self.ip);
        self.entries[cell * self.ip + k] = StencilEntry { idx, weight };
    }

    #[inline]
    pub fn row(&self, cell: usize) -> &[StencilEntry] {
        &self.entries[cell * self.ip..(cell + 1) * self.ip]
    }

    pub fn row_mut(&mut self, cell: usize) -> &mut [StencilEntry] {
        &mut self.entries[cell * self.ip..(cell + 1) * self.ip]
    }

    /// Host-side application. Sentinel (zero-weight) entries neither
    /// contribute nor widen the clamping window.
    pub fn apply(&self, input: &[f64], output: &mut [f64]) {
        debug_assert_eq!(output.len(), self.n_cells);
        for (cell, out) in output.iter_mut().enumerate() {
            let row = &self.entries[cell * self.ip..(cell + 1) * self.ip];
            let mut acc = 0.0f64;
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for e in row {
                if e.weight != 0.0 {
                    let v = input[e.idx as usize];
                    acc += e.weight * v;
                    lo = lo.min(v);
                    hi = hi.max(v);
                }
            }
            *out = if self.clamp && lo <= hi {
                acc.clamp(lo, hi)
            } else {
                acc
            };
        }
    }

    /// Per-row weight sums, for the normalisation audit.
    pub fn weight_sums(&self) -> Vec<f64> {
        (0..self.n_cells)
            .map(|c| self.row(c).iter().map(|e| e.weight).sum())
            .collect()
    }

    /// Flat index/weight tables in the layout the device kernel expects.
    pub fn gpu_tables(&self) -> (Vec<u32>, Vec<f32>) {
        let idx = self.entries.iter().map(|e| e.idx).collect();
        let w = self.entries.iter().map(|e| e.weight as f32).collect();
        (idx, w)
    }

    pub(crate) fn build_pipeline(&self, ctx: &GpuContext) -> VlasovResult<StencilPipeline> {
        let (idx, w) = self.gpu_tables();
        StencilPipeline::new(ctx, &idx, &w, self.ip, self.clamp)
    }
}

/// Run one pipeline stage, on the device when every piece of the device
/// path is present, otherwise on the host.
pub(crate) fn apply_stage(
    stencil: &Stencil,
    pipeline: Option<&StencilPipeline>,
    ctx: Option<&GpuContext>,
    input: &mut PhaseSpace,
    output: &mut PhaseSpace,
) -> VlasovResult<()> {
    if let (Some(ctx), Some(pipe)) = (ctx, pipeline) {
        if let (Some(in_mirror), Some(out_mirror)) = (input.mirror_mut(), output.mirror_mut()) {
            pipe.apply(ctx, in_mirror, out_mirror)?;
            return Ok(());
        }
    }
    stencil.apply(input.as_flat(), output.as_flat_mut());
    Ok(())
}

/// The closed set of phase-space maps.
pub enum SourceMap {
    Identity(IdentityMap),
    Rotation(RotationMap),
    RfKick(RfKickMap),
    Drift(DriftMap),
    WakePotential(WakePotentialMap),
    WakeFunction(WakeFunctionMap),
    FokkerPlanck(FokkerPlanckMap),
}

impl SourceMap {
    /// Transport the density from `input` to `output`.
    pub fn apply(
        &self,
        ctx: Option<&GpuContext>,
        input: &mut PhaseSpace,
        output: &mut PhaseSpace,
    ) -> VlasovResult<()> {
        match self {
            SourceMap::Identity(m) => m.apply(ctx, input, output),
            SourceMap::Rotation(m) => m.apply(ctx, input, output),
            SourceMap::RfKick(m) => m.apply(ctx, input, output),
            SourceMap::Drift(m) => m.apply(ctx, input, output),
            SourceMap::WakePotential(m) => m.apply(ctx, input, output),
            SourceMap::WakeFunction(m) => m.apply(ctx, input, output),
            SourceMap::FokkerPlanck(m) => m.apply(ctx, input, output),
        }
    }

    /// Transport a tracked point through the same analytic transform.
    pub fn apply_to(&self, pos: Position) -> Position {
        match self {
            SourceMap::Identity(_) => pos,
            SourceMap::Rotation(m) => m.apply_to(pos),
            SourceMap::RfKick(m) => m.apply_to(pos),
            SourceMap::Drift(m) => m.apply_to(pos),
            SourceMap::WakePotential(m) => m.apply_to(pos),
            SourceMap::WakeFunction(m) => m.apply_to(pos),
            SourceMap::FokkerPlanck(m) => m.apply_to(pos),
        }
    }

    pub fn stencil(&self) -> &Stencil {
        match self {
            SourceMap::Identity(m) => &m.stencil,
            SourceMap::Rotation(m) => m.stencil(),
            SourceMap::RfKick(m) => m.stencil(),
            SourceMap::Drift(m) => m.stencil(),
            SourceMap::WakePotential(m) => m.stencil(),
            SourceMap::WakeFunction(m) => m.stencil(),
            SourceMap::FokkerPlanck(m) => m.stencil(),
        }
    }

    /// Current per-q kick of a wake map, in p units (read-only access
    /// for displays). `None` for non-wake maps.
    pub fn force(&self) -> Option<&[f64]> {
        match self {
            SourceMap::WakePotential(m) => Some(m.force()),
            SourceMap::WakeFunction(m) => Some(m.force()),
            _ => None,
        }
    }
}

/// Strict pass-through map.
pub struct IdentityMap {
    pub(crate) stencil: Stencil,
    pipeline: Option<StencilPipeline>,
}

impl IdentityMap {
    pub fn new(mesh: &PhaseSpace, ctx: Option<&GpuContext>) -> VlasovResult<Self> {
        let n = mesh.n();
        let mut stencil = Stencil::new(n * n, 1, false);
        for cell in 0..n * n {
            stencil.set(cell, 0, cell as u32, 1.0);
        }
        let pipeline = match ctx {
            Some(ctx) => Some(stencil.build_pipeline(ctx)?),
            None => None,
        };
        Ok(IdentityMap { stencil, pipeline })
    }

    pub fn apply(
        &self,
        ctx: Option<&GpuContext>,
        input: &mut PhaseSpace,
        output: &mut PhaseSpace,
    ) -> VlasovResult<()> {
        apply_stage(&self.stencil, self.pipeline.as_ref(), ctx, input, output)
    }
}
