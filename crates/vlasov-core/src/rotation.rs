// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Rotation Map
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Rigid rotation of the distribution by 2π/steps per application.
//!
//! Each output cell pulls from the preimage of its centre under the
//! inverse rotation, through a K×K tensor-product Lagrange kernel.
//! The stencil is precomputed once; cells whose preimage leaves the
//! mesh map to zero.

use vlasov_gpu::{GpuContext, StencilPipeline};
use vlasov_math::interp::lagrange_kernel;
use vlasov_types::error::VlasovResult;

use crate::mesh::{Axis, PhaseSpace, Ruler};
use crate::stencil::{apply_stage, Stencil};
use crate::tracking::Position;

/// Coordinate normalisation the rotation acts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationCoordinates {
    /// Cell indices centred on the mesh midpoint.
    MeshIndex,
    /// Physical axis values, origin at (q, p) = (0, 0).
    Physical,
    /// Both axes scaled to [-1, +1].
    NormPm1,
}

pub struct RotationMap {
    stencil: Stencil,
    pipeline: Option<StencilPipeline>,
    n: usize,
    cos: f64,
    sin: f64,
    coords: RotationCoordinates,
    q_axis: Ruler,
    p_axis: Ruler,
}

impl RotationMap {
    pub fn new(
        mesh: &PhaseSpace,
        angle: f64,
        coords: RotationCoordinates,
        points: usize,
        clamp: bool,
        ctx: Option<&GpuContext>,
    ) -> VlasovResult<Self> {
        let n = mesh.n();
        let q_axis = mesh.axis(Axis::Q).clone();
        let p_axis = mesh.axis(Axis::P).clone();
        let (sin, cos) = angle.sin_cos();

        let mut stencil = Stencil::new(n * n, points * points, clamp);
        let max_idx = (n - 1) as f64;
        for x in 0..n {
            for y in 0..n {
                let cx = to_coord(coords, &q_axis, n, x as f64);
                let cy = to_coord(coords, &p_axis, n, y as f64);
                // inverse rotation finds the source point
                let sx = cx * cos - cy * sin;
                let sy = cx * sin + cy * cos;
                let xi = from_coord(coords, &q_axis, n, sx);
                let yi = from_coord(coords, &p_axis, n, sy);
                if !(0.0..=max_idx).contains(&xi) || !(0.0..=max_idx).contains(&yi) {
                    continue; // preimage outside the mesh: row stays zero
                }
                let kx = lagrange_kernel(points, xi);
                let ky = lagrange_kernel(points, yi);
                let cell = x * n + y;
                for a in 0..points {
                    let gx = kx.first + a as isize;
                    if gx < 0 || gx >= n as isize {
                        continue;
                    }
                    for b in 0..points {
                        let gy = ky.first + b as isize;
                        if gy < 0 || gy >= n as isize {
                            continue;
                        }
                        let w = kx.weights[a] * ky.weights[b];
                        stencil.set(
                            cell,
                            a * points + b,
                            (gx as usize * n + gy as usize) as u32,
                            w,
                        );
                    }
                }
            }
        }

        let pipeline = match ctx {
            Some(ctx) => Some(stencil.build_pipeline(ctx)?),
            None => None,
        };
        Ok(RotationMap {
            stencil,
            pipeline,
            n,
            cos,
            sin,
            coords,
            q_axis,
            p_axis,
        })
    }

    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    pub fn apply(
        &self,
        ctx: Option<&GpuContext>,
        input: &mut PhaseSpace,
        output: &mut PhaseSpace,
    ) -> VlasovResult<()> {
        apply_stage(&self.stencil, self.pipeline.as_ref(), ctx, input, output)
    }

    /// Forward rotation of a tracked point in mesh coordinates.
    pub fn apply_to(&self, pos: Position) -> Position {
        let cx = to_coord(self.coords, &self.q_axis, self.n, pos.q);
        let cy = to_coord(self.coords, &self.p_axis, self.n, pos.p);
        let rx = cx * self.cos + cy * self.sin;
        let ry = -cx * self.sin + cy * self.cos;
        Position {
            q: from_coord(self.coords, &self.q_axis, self.n, rx),
            p: from_coord(self.coords, &self.p_axis, self.n, ry),
        }
    }
}

#[inline]
fn to_coord(coords: RotationCoordinates, axis: &Ruler, n: usize, idx: f64) -> f64 {
    let half = (n - 1) as f64 / 2.0;
    match coords {
        RotationCoordinates::MeshIndex => idx - half,
        RotationCoordinates::Physical => axis.at_continuous(idx),
        RotationCoordinates::NormPm1 => idx / half - 1.0,
    }
}

#[inline]
fn from_coord(coords: RotationCoordinates, axis: &Ruler, n: usize, c: f64) -> f64 {
    let half = (n - 1) as f64 / 2.0;
    match coords {
        RotationCoordinates::MeshIndex => c + half,
        RotationCoordinates::Physical => axis.to_index(c),
        RotationCoordinates::NormPm1 => (c + 1.0) * half,
    }
}
