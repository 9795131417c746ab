// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Phase Space
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! The 2-D phase-space mesh: density samples on a fixed q×p grid with
//! marginal projections, cached moments and an optional device mirror.
//!
//! Projections and moments are refreshed explicitly and are stale until
//! then; the orchestrator owns the refresh order. The mesh has exactly
//! one writer per pipeline stage, so no interior mutability is needed.

use ndarray::{Array1, Array2};
use vlasov_gpu::{GpuContext, MirroredBuffer, SyncDirection};
use vlasov_types::error::{VlasovError, VlasovResult};

/// Axis selector for projections and moments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Longitudinal position q (units of natural bunch length).
    Q = 0,
    /// Relative energy deviation p (units of energy spread).
    P = 1,
}

/// One mesh axis: origin, spacing and inclusive bounds.
#[derive(Debug, Clone)]
pub struct Ruler {
    n: usize,
    min: f64,
    max: f64,
    delta: f64,
}

impl Ruler {
    pub fn new(n: usize, min: f64, max: f64) -> Self {
        assert!(n > 1, "ruler needs at least 2 points");
        assert!(max > min, "ruler bounds inverted: [{min}, {max}]");
        Ruler {
            n,
            min,
            max,
            delta: (max - min) / (n - 1) as f64,
        }
    }

    /// Coordinate of grid point `i`.
    #[inline]
    pub fn at(&self, i: usize) -> f64 {
        self.min + i as f64 * self.delta
    }

    /// Continuous coordinate of fractional index `x`.
    #[inline]
    pub fn at_continuous(&self, x: f64) -> f64 {
        self.min + x * self.delta
    }

    /// Continuous (fractional) index of coordinate `v`.
    #[inline]
    pub fn to_index(&self, v: f64) -> f64 {
        (v - self.min) / self.delta
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }
}

/// Physical scalars attached to a mesh at construction.
#[derive(Debug, Clone, Copy)]
pub struct BunchScalars {
    /// Bunch charge (C).
    pub charge: f64,
    /// Bunch current (A).
    pub current: f64,
    /// Natural RMS bunch length (m).
    pub length: f64,
    /// Absolute energy spread (eV).
    pub energy_spread: f64,
}

/// Square phase-space mesh of density samples, indexed `[q, p]`.
pub struct PhaseSpace {
    n: usize,
    q_axis: Ruler,
    p_axis: Ruler,
    data: Array2<f64>,
    x_proj: Array1<f64>,
    y_proj: Array1<f64>,
    integral: f64,
    mean: [f64; 2],
    variance: [f64; 2],
    scalars: BunchScalars,
    mirror: Option<MirroredBuffer>,
}

impl PhaseSpace {
    /// Mesh seeded with a normalised bi-Gaussian (unit sigma per axis).
    pub fn new(
        n: usize,
        q_min: f64,
        q_max: f64,
        p_min: f64,
        p_max: f64,
        scalars: BunchScalars,
    ) -> Self {
        let q_axis = Ruler::new(n, q_min, q_max);
        let p_axis = Ruler::new(n, p_min, p_max);
        let data = Array2::from_shape_fn((n, n), |(x, y)| {
            let q = q_axis.at(x);
            let p = p_axis.at(y);
            (-0.5 * (q * q + p * p)).exp()
        });
        let mut ps = Self::with_density(q_axis, p_axis, data, scalars);
        ps.update_x_projection();
        ps.normalize();
        ps
    }

    /// Mesh around an externally produced density buffer (file-loaded
    /// start distributions arrive through here).
    pub fn with_density(
        q_axis: Ruler,
        p_axis: Ruler,
        data: Array2<f64>,
        scalars: BunchScalars,
    ) -> Self {
        let n = q_axis.n();
        assert_eq!(data.dim(), (n, n), "density buffer must be {n}x{n}");
        assert_eq!(p_axis.n(), n, "mesh must be square");
        PhaseSpace {
            n,
            q_axis,
            p_axis,
            data,
            x_proj: Array1::zeros(n),
            y_proj: Array1::zeros(n),
            integral: 0.0,
            mean: [0.0; 2],
            variance: [0.0; 2],
            scalars,
            mirror: None,
        }
    }

    /// Copy with shared geometry and scalars (ping-pong buffers).
    pub fn clone_layout(&self) -> Self {
        PhaseSpace {
            n: self.n,
            q_axis: self.q_axis.clone(),
            p_axis: self.p_axis.clone(),
            data: self.data.clone(),
            x_proj: self.x_proj.clone(),
            y_proj: self.y_proj.clone(),
            integral: self.integral,
            mean: self.mean,
            variance: self.variance,
            scalars: self.scalars,
            mirror: None,
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn axis(&self, which: Axis) -> &Ruler {
        match which {
            Axis::Q => &self.q_axis,
            Axis::P => &self.p_axis,
        }
    }

    pub fn scalars(&self) -> &BunchScalars {
        &self.scalars
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[[x, y]]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f64) {
        self.data[[x, y]] = v;
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    /// Row-major flat view (index = x·n + y), the layout every stencil
    /// indexes into.
    pub fn as_flat(&self) -> &[f64] {
        self.data.as_slice().expect("mesh data must be contiguous")
    }

    pub fn as_flat_mut(&mut self) -> &mut [f64] {
        self.data
            .as_slice_mut()
            .expect("mesh data must be contiguous")
    }

    /// Sum along p, scaled by the p spacing. Idempotent.
    pub fn update_x_projection(&mut self) {
        let dp = self.p_axis.delta();
        for x in 0..self.n {
            let mut acc = 0.0f64;
            for y in 0..self.n {
                acc += self.data[[x, y]];
            }
            self.x_proj[x] = acc * dp;
        }
    }

    /// Sum along q, scaled by the q spacing. Idempotent.
    pub fn update_y_projection(&mut self) {
        let dq = self.q_axis.delta();
        for y in 0..self.n {
            let mut acc = 0.0f64;
            for x in 0..self.n {
                acc += self.data[[x, y]];
            }
            self.y_proj[y] = acc * dq;
        }
    }

    pub fn x_projection(&self) -> &Array1<f64> {
        &self.x_proj
    }

    pub fn y_projection(&self) -> &Array1<f64> {
        &self.y_proj
    }

    /// Overwrite the x-projection (Haissinski seeding).
    pub fn set_x_projection(&mut self, proj: &[f64]) {
        assert_eq!(proj.len(), self.n);
        for (dst, &src) in self.x_proj.iter_mut().zip(proj.iter()) {
            *dst = src;
        }
    }

    /// Overwrite the y-projection (Haissinski seeding).
    pub fn set_y_projection(&mut self, proj: &[f64]) {
        assert_eq!(proj.len(), self.n);
        for (dst, &src) in self.y_proj.iter_mut().zip(proj.iter()) {
            *dst = src;
        }
    }

    /// Integral of the density from the x-projection; caches the value.
    /// Requires a fresh x-projection.
    pub fn integral(&mut self) -> f64 {
        let dq = self.q_axis.delta();
        let mut acc = 0.0f64;
        for &v in self.x_proj.iter() {
            acc += v;
        }
        self.integral = acc * dq;
        self.integral
    }

    pub fn cached_integral(&self) -> f64 {
        self.integral
    }

    /// Divide all cells by the current integral so it becomes 1.
    /// Requires a fresh x-projection; rescales both projections in place.
    pub fn normalize(&mut self) -> f64 {
        let total = self.integral();
        if total > 0.0 && total.is_finite() {
            let inv = 1.0 / total;
            self.data.mapv_inplace(|v| v * inv);
            self.x_proj.mapv_inplace(|v| v * inv);
            self.y_proj.mapv_inplace(|v| v * inv);
            self.integral = 1.0;
        }
        total
    }

    /// First moment of the named projection; cached. Requires the
    /// projection refreshed.
    pub fn average(&mut self, which: Axis) -> f64 {
        let (proj, axis) = match which {
            Axis::Q => (&self.x_proj, &self.q_axis),
            Axis::P => (&self.y_proj, &self.p_axis),
        };
        let d = axis.delta();
        let mut total = 0.0f64;
        let mut weighted = 0.0f64;
        for (i, &v) in proj.iter().enumerate() {
            total += v * d;
            weighted += v * axis.at(i) * d;
        }
        let avg = if total > 0.0 { weighted / total } else { 0.0 };
        self.mean[which as usize] = avg;
        avg
    }

    /// Central second moment of the named projection; cached. Requires
    /// the projection refreshed.
    pub fn variance(&mut self, which: Axis) -> f64 {
        let avg = self.average(which);
        let (proj, axis) = match which {
            Axis::Q => (&self.x_proj, &self.q_axis),
            Axis::P => (&self.y_proj, &self.p_axis),
        };
        let d = axis.delta();
        let mut total = 0.0f64;
        let mut central = 0.0f64;
        for (i, &v) in proj.iter().enumerate() {
            let dev = axis.at(i) - avg;
            total += v * d;
            central += v * dev * dev * d;
        }
        let var = if total > 0.0 { central / total } else { 0.0 };
        self.variance[which as usize] = var;
        var
    }

    pub fn cached_mean(&self, which: Axis) -> f64 {
        self.mean[which as usize]
    }

    pub fn cached_variance(&self, which: Axis) -> f64 {
        self.variance[which as usize]
    }

    /// Rebuild the density as the outer product of the current
    /// projections. Only the Haissinski seed uses this.
    pub fn create_from_projections(&mut self) {
        for x in 0..self.n {
            for y in 0..self.n {
                self.data[[x, y]] = self.x_proj[x] * self.y_proj[y];
            }
        }
    }

    /// Verify the density is finite and non-negative within tolerance.
    pub fn check_finite(&self, step: usize) -> VlasovResult<()> {
        const NEGATIVE_TOL: f64 = -1e-9;
        for &v in self.as_flat() {
            if !v.is_finite() {
                return Err(VlasovError::NumericalDivergence {
                    step,
                    message: "non-finite density sample".to_string(),
                });
            }
            if v < NEGATIVE_TOL {
                return Err(VlasovError::NumericalDivergence {
                    step,
                    message: format!("negative density {v} beyond tolerance"),
                });
            }
        }
        Ok(())
    }

    // ── device mirror ────────────────────────────────────────────────

    /// Attach a device mirror sized to the mesh.
    pub fn enable_mirror(&mut self, ctx: &GpuContext, label: &str) {
        self.mirror = Some(MirroredBuffer::new(ctx, self.n * self.n, label));
    }

    pub fn has_mirror(&self) -> bool {
        self.mirror.is_some()
    }

    pub fn mirror_mut(&mut self) -> Option<&mut MirroredBuffer> {
        self.mirror.as_mut()
    }

    /// Host data → device. No-op without a mirror.
    pub fn push_to_device(&mut self, ctx: &GpuContext) -> VlasovResult<()> {
        let flat: Vec<f64> = self.as_flat().to_vec();
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.write_host(&flat);
            mirror.sync(ctx, SyncDirection::HostToDevice)?;
        }
        Ok(())
    }

    /// Device data → host, only if the device side is dirty.
    pub fn pull_from_device(&mut self, ctx: &GpuContext) -> VlasovResult<()> {
        if let Some(mirror) = self.mirror.as_mut() {
            if mirror.is_device_dirty() {
                mirror.sync(ctx, SyncDirection::DeviceToHost)?;
                let host = mirror.read_host_f64();
                self.as_flat_mut().copy_from_slice(&host);
            }
        }
        Ok(())
    }
}
