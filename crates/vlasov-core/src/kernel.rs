// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov Core — Step Orchestrator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Owns the mesh triple and sequences the maps through each step.
//!
//! Per-step order (semantic, not incidental): wake update on mesh₁'s
//! projection, renormalise or integrate, periodic snapshot, wake kick
//! mesh₁→mesh₂, rotation (or RF kick and drift) →mesh₃, Fokker–Planck
//! →mesh₁, projection refresh. Tracked markers ride through the same
//! maps. Host-visible reads synchronise the device mirror implicitly.

use ndarray::Array2;
use vlasov_gpu::GpuContext;
use vlasov_types::config::{ScaledParams, SimulationConfig};
use vlasov_types::error::{VlasovError, VlasovResult};

use crate::field::ElectricField;
use crate::fokker_planck::{FokkerPlanckMap, FokkerPlanckVariant};
use crate::haissinski::haissinski_seed;
use crate::impedance::Impedance;
use crate::kick::{DriftMap, RfKickMap};
use crate::mesh::{Axis, BunchScalars, PhaseSpace, Ruler};
use crate::rotation::{RotationCoordinates, RotationMap};
use crate::stencil::{IdentityMap, SourceMap};
use crate::tracking::{load_tracking_file, Position};
use crate::wake::{WakeFunctionMap, WakePotentialMap};

/// Read-only view handed to the snapshot callback every `outstep`
/// steps. Collaborators persist or display it; the core writes nothing.
pub struct Snapshot<'a> {
    pub step: usize,
    /// Time in synchrotron periods.
    pub time: f64,
    pub mesh: &'a PhaseSpace,
    pub field: &'a ElectricField,
    /// Per-q wake kick in cells of p, when a wake map is active.
    pub wake_force: Option<&'a [f64]>,
    pub particles: &'a [Position],
}

impl Snapshot<'_> {
    /// One-line progress report in the classic log format.
    pub fn status_line(&self, rotations: f64) -> String {
        format!(
            "t = {:9.3}/{:.1}, charge = {:.6e}, energy spread = {:.6e}",
            self.time,
            rotations,
            self.mesh.cached_integral(),
            self.mesh.cached_variance(Axis::P).sqrt()
        )
    }
}

enum TransportChain {
    /// Precomputed rigid rotation.
    Rotation(SourceMap),
    /// First-order split: RF kick then chromatic drift.
    KickDrift(SourceMap, SourceMap),
}

pub struct VlasovKernel {
    cfg: SimulationConfig,
    params: ScaledParams,
    ctx: Option<GpuContext>,
    device_note: Option<String>,
    meshes: [PhaseSpace; 3],
    field: ElectricField,
    wake_map: SourceMap,
    chain: TransportChain,
    fp_map: SourceMap,
    particles: Vec<Position>,
    step_index: usize,
}

impl VlasovKernel {
    /// Kernel with the default bi-Gaussian start distribution.
    pub fn new(cfg: SimulationConfig) -> VlasovResult<Self> {
        Self::build(cfg, None)
    }

    /// Kernel seeded from an externally loaded density buffer, which
    /// must match the configured grid size.
    pub fn with_initial_density(
        cfg: SimulationConfig,
        density: Array2<f64>,
    ) -> VlasovResult<Self> {
        Self::build(cfg, Some(density))
    }

    fn build(mut cfg: SimulationConfig, density: Option<Array2<f64>>) -> VlasovResult<Self> {
        // grid_size 0 is only legal with an externally loaded density,
        // whose dimension then fixes the mesh
        if cfg.grid_size == 0 {
            match &density {
                Some(density) => cfg.grid_size = density.dim().0,
                None => {
                    return Err(VlasovError::ConfigInvalid(
                        "grid_size is 0 and no start distribution was supplied".to_string(),
                    ))
                }
            }
        }
        let params = ScaledParams::derive(&cfg)?;
        let n = params.n;

        let mut device_note = None;
        let ctx = if cfg.gpu_device > 0 {
            match GpuContext::new((cfg.gpu_device - 1) as usize) {
                Ok(ctx) => {
                    device_note = Some(ctx.info());
                    Some(ctx)
                }
                Err(e) => {
                    // recoverable: continue on the host path
                    device_note = Some(format!("host fallback: {e}"));
                    None
                }
            }
        } else {
            None
        };

        let scalars = BunchScalars {
            charge: params.bunch_charge,
            current: cfg.bunch_current,
            length: params.bunch_length,
            energy_spread: params.delta_e,
        };
        let mut mesh1 = match density {
            Some(density) => {
                let (rows, cols) = density.dim();
                if rows != cols {
                    return Err(VlasovError::ConfigInvalid(format!(
                        "initial density must be square, got {rows}x{cols}"
                    )));
                }
                if rows != n {
                    return Err(VlasovError::ConfigInvalid(format!(
                        "initial density is {rows}x{rows}, grid_size is {n}"
                    )));
                }
                let q_axis = Ruler::new(n, params.q_min, params.q_max);
                let p_axis = Ruler::new(n, params.p_min, params.p_max);
                let mut ps = PhaseSpace::with_density(q_axis, p_axis, density, scalars);
                ps.update_x_projection();
                ps.normalize();
                ps
            }
            None => PhaseSpace::new(
                n,
                params.q_min,
                params.q_max,
                params.p_min,
                params.p_max,
                scalars,
            ),
        };

        // impedance selection mirrors the classic rules: an explicit
        // file wins; otherwise the chamber gap picks shielded or free
        // space, with wall and collimator additions only under shielding
        let m = n * cfg.padding;
        let impedance = if let Some(path) = &cfg.impedance_file {
            Impedance::from_file(path, params.f_max, n)?
        } else if cfg.vacuum_chamber_gap > 0.0 {
            let mut z = Impedance::parallel_plates_csr(
                m,
                params.f0,
                params.f_max,
                cfg.vacuum_chamber_gap,
            );
            if cfg.wall_conductivity > 0.0 && cfg.wall_susceptibility >= -1.0 {
                z += &Impedance::resistive_wall(
                    m,
                    params.f0,
                    params.f_max,
                    cfg.wall_conductivity,
                    cfg.wall_susceptibility,
                    cfg.vacuum_chamber_gap / 2.0,
                );
            }
            if cfg.collimator_radius > 0.0 {
                z += &Impedance::collimator(
                    m,
                    params.f_max,
                    cfg.vacuum_chamber_gap / 2.0,
                    cfg.collimator_radius,
                );
            }
            z
        } else {
            Impedance::free_space_csr(m, params.f0, params.f_max)
        };

        mesh1.update_x_projection();
        let field = ElectricField::new(
            &mesh1,
            impedance,
            cfg.padding,
            params.current_scaled,
            params.revolution_part,
            params.delta_e,
        )?;

        let points = cfg.interpolation_points;
        let clamp = cfg.interpolation_clamped;
        let ctx_ref = ctx.as_ref();

        let wake_map = if let Some(path) = &cfg.wake_file {
            let kick_scaling = params.current_scaled * params.revolution_part / params.delta_e;
            SourceMap::WakeFunction(WakeFunctionMap::from_file(
                &mesh1,
                path,
                kick_scaling,
                points,
                clamp,
                ctx_ref,
            )?)
        } else if cfg.vacuum_chamber_gap != 0.0 {
            SourceMap::WakePotential(WakePotentialMap::new(&mesh1, points, clamp, ctx_ref)?)
        } else {
            SourceMap::Identity(IdentityMap::new(&mesh1, ctx_ref)?)
        };

        let chain = match cfg.rotation_type {
            0 | 1 => TransportChain::Rotation(SourceMap::Rotation(RotationMap::new(
                &mesh1,
                params.angle,
                RotationCoordinates::NormPm1,
                points,
                clamp,
                ctx_ref,
            )?)),
            _ => {
                let q_scale = params.rf_q_scale(&cfg);
                TransportChain::KickDrift(
                    SourceMap::RfKick(RfKickMap::new(
                        &mesh1,
                        params.angle,
                        q_scale,
                        points,
                        clamp,
                        ctx_ref,
                    )?),
                    SourceMap::Drift(DriftMap::new(
                        &mesh1,
                        params.angle,
                        [params.alpha0, params.alpha1, params.alpha2],
                        points,
                        clamp,
                        ctx_ref,
                    )?),
                )
            }
        };

        let fp_map = if params.fp_beta > 0.0 {
            SourceMap::FokkerPlanck(FokkerPlanckMap::new(
                &mesh1,
                FokkerPlanckVariant::Full,
                params.fp_beta,
                ctx_ref,
            )?)
        } else {
            SourceMap::Identity(IdentityMap::new(&mesh1, ctx_ref)?)
        };

        let particles = match &cfg.tracking_file {
            Some(path) => load_tracking_file(path)?,
            None => Vec::new(),
        };

        let mut mesh2 = mesh1.clone_layout();
        let mut mesh3 = mesh1.clone_layout();
        if let Some(ctx) = ctx.as_ref() {
            mesh1.enable_mirror(ctx, "mesh1");
            mesh2.enable_mirror(ctx, "mesh2");
            mesh3.enable_mirror(ctx, "mesh3");
            mesh1.push_to_device(ctx)?;
            mesh2.push_to_device(ctx)?;
            mesh3.push_to_device(ctx)?;
        }

        Ok(VlasovKernel {
            cfg,
            params,
            ctx,
            device_note,
            meshes: [mesh1, mesh2, mesh3],
            field,
            wake_map,
            chain,
            fp_map,
            particles,
            step_index: 0,
        })
    }

    pub fn params(&self) -> &ScaledParams {
        &self.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.cfg
    }

    /// Adapter description, or the reason the host path is in use.
    pub fn device_note(&self) -> Option<&str> {
        self.device_note.as_deref()
    }

    pub fn mesh(&self) -> &PhaseSpace {
        &self.meshes[0]
    }

    pub fn mesh_mut(&mut self) -> &mut PhaseSpace {
        &mut self.meshes[0]
    }

    pub fn field(&self) -> &ElectricField {
        &self.field
    }

    pub fn wake_force(&self) -> Option<&[f64]> {
        self.wake_map.force()
    }

    pub fn particles(&self) -> &[Position] {
        &self.particles
    }

    /// Replace the tracked-marker list (e.g. markers drawn from the
    /// mesh instead of a tracking file).
    pub fn set_particles(&mut self, particles: Vec<Position>) {
        self.particles = particles;
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Iterate the Haissinski fixed point on mesh₁ before the main
    /// loop; returns the per-iteration residuals.
    pub fn run_haissinski(&mut self) -> VlasovResult<Vec<f64>> {
        let iterations = self.cfg.haissinski_iterations;
        let residuals = haissinski_seed(&mut self.meshes[0], &mut self.field, iterations)?;
        if let Some(ctx) = self.ctx.as_ref() {
            self.meshes[0].push_to_device(ctx)?;
        }
        self.meshes[0].update_x_projection();
        Ok(residuals)
    }

    /// Advance one step. The snapshot callback fires on `outstep`
    /// boundaries only.
    pub fn step<F: FnMut(&Snapshot)>(&mut self, on_snapshot: &mut F) -> VlasovResult<()> {
        let i = self.step_index;

        // 1. wake update, driven by mesh₁'s fresh x-projection
        self.field.update_wake(&self.meshes[0])?;
        let ctx = self.ctx.as_ref();
        match &mut self.wake_map {
            SourceMap::WakePotential(m) => m.update(&self.field, ctx)?,
            SourceMap::WakeFunction(m) => m.update(&self.meshes[0], ctx)?,
            _ => {}
        }

        // 2. charge bookkeeping
        let renorm = self.cfg.renormalize;
        let integral = if renorm > 0 && i % renorm == 0 {
            let before = self.meshes[0].normalize();
            if let Some(ctx) = self.ctx.as_ref() {
                // normalisation touched host data
                self.meshes[0].push_to_device(ctx)?;
            }
            before
        } else {
            self.meshes[0].integral()
        };
        if !integral.is_finite() || integral <= 0.0 {
            return Err(VlasovError::NumericalDivergence {
                step: i,
                message: format!("charge integral became {integral}"),
            });
        }

        // 3. periodic snapshot
        let outstep = self.cfg.outstep;
        if outstep > 0 && i % outstep == 0 {
            self.meshes[0].variance(Axis::Q);
            self.meshes[0].update_y_projection();
            self.meshes[0].variance(Axis::P);
            self.field.update_csr(self.cfg.cutoff_frequency);
            let snapshot = Snapshot {
                step: i,
                time: i as f64 / self.cfg.steps as f64,
                mesh: &self.meshes[0],
                field: &self.field,
                wake_force: self.wake_map.force(),
                particles: &self.particles,
            };
            on_snapshot(&snapshot);
        }

        // 4. wake kick mesh₁ → mesh₂
        let ctx = self.ctx.as_ref();
        {
            let (src, dst) = mesh_pair(&mut self.meshes, 0, 1);
            self.wake_map.apply(ctx, src, dst)?;
        }
        for p in self.particles.iter_mut() {
            *p = self.wake_map.apply_to(*p);
        }

        // 5. transport mesh₂ → mesh₃
        match &self.chain {
            TransportChain::Rotation(rotation) => {
                let (src, dst) = mesh_pair(&mut self.meshes, 1, 2);
                rotation.apply(ctx, src, dst)?;
                for p in self.particles.iter_mut() {
                    *p = rotation.apply_to(*p);
                }
            }
            TransportChain::KickDrift(rf, drift) => {
                {
                    let (src, dst) = mesh_pair(&mut self.meshes, 1, 0);
                    rf.apply(ctx, src, dst)?;
                }
                for p in self.particles.iter_mut() {
                    *p = rf.apply_to(*p);
                }
                {
                    let (src, dst) = mesh_pair(&mut self.meshes, 0, 2);
                    drift.apply(ctx, src, dst)?;
                }
                for p in self.particles.iter_mut() {
                    *p = drift.apply_to(*p);
                }
            }
        }

        // 6. Fokker–Planck mesh₃ → mesh₁
        {
            let (src, dst) = mesh_pair(&mut self.meshes, 2, 0);
            self.fp_map.apply(ctx, src, dst)?;
        }
        for p in self.particles.iter_mut() {
            *p = self.fp_map.apply_to(*p);
        }

        // 7. refresh the projection the next wake update reads
        if let Some(ctx) = self.ctx.as_ref() {
            self.meshes[0].pull_from_device(ctx)?;
        }
        self.meshes[0].update_x_projection();

        self.step_index += 1;
        Ok(())
    }

    /// Run `steps × rotations` iterations. On divergence the loop halts
    /// with the last valid state left in mesh₁.
    pub fn run<F: FnMut(&Snapshot)>(&mut self, mut on_snapshot: F) -> VlasovResult<()> {
        self.meshes[0].update_x_projection();
        self.meshes[0].integral();
        self.meshes[0].update_y_projection();
        self.meshes[0].variance(Axis::P);

        let total = (self.cfg.steps as f64 * self.cfg.rotations).round() as usize;
        for _ in 0..total {
            self.step(&mut on_snapshot)?;
        }
        self.finalize(&mut on_snapshot)
    }

    /// End-of-run bookkeeping and the final snapshot at `rotations`.
    fn finalize<F: FnMut(&Snapshot)>(&mut self, on_snapshot: &mut F) -> VlasovResult<()> {
        self.field.update_wake(&self.meshes[0])?;
        let ctx = self.ctx.as_ref();
        match &mut self.wake_map {
            SourceMap::WakePotential(m) => m.update(&self.field, ctx)?,
            SourceMap::WakeFunction(m) => m.update(&self.meshes[0], ctx)?,
            _ => {}
        }
        if self.cfg.renormalize > 0 {
            self.meshes[0].normalize();
        } else {
            self.meshes[0].integral();
        }
        self.meshes[0].variance(Axis::Q);
        self.meshes[0].update_y_projection();
        self.meshes[0].variance(Axis::P);
        self.field.update_csr(self.cfg.cutoff_frequency);
        self.meshes[0].check_finite(self.step_index)?;

        let snapshot = Snapshot {
            step: self.step_index,
            time: self.cfg.rotations,
            mesh: &self.meshes[0],
            field: &self.field,
            wake_force: self.wake_map.force(),
            particles: &self.particles,
        };
        on_snapshot(&snapshot);
        Ok(())
    }
}

/// Disjoint mutable access to two meshes of the triple.
fn mesh_pair(
    meshes: &mut [PhaseSpace; 3],
    src: usize,
    dst: usize,
) -> (&mut PhaseSpace, &mut PhaseSpace) {
    debug_assert_ne!(src, dst);
    if src < dst {
        let (lo, hi) = meshes.split_at_mut(dst);
        (&mut lo[src], &mut hi[0])
    } else {
        let (lo, hi) = meshes.split_at_mut(src);
        (&mut hi[0], &mut lo[dst])
    }
}
