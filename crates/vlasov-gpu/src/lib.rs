//! Accelerator path for the phase-space maps via wgpu compute shaders.
//!
//! Provides the host↔device buffer mirror and a generic stencil-apply
//! pipeline. Everything degrades gracefully: callers that get
//! `DeviceUnavailable` at construction fall back to the host path.

use bytemuck::{Pod, Zeroable};
use std::borrow::Cow;
use vlasov_types::error::{VlasovError, VlasovResult};

/// Direction of a mirrored-buffer synchronisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    HostToDevice,
    DeviceToHost,
}

/// Uniform parameters passed to the stencil compute shader.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct StencilParams {
    n_cells: u32,
    ip: u32,
    clamp_enabled: u32,
    _pad: u32,
}

/// Shared device handle threaded through construction of every
/// GPU-resident object. There is intentionally no global state: one
/// context owns one queue, and all kernels of a run serialise on it.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Open adapter number `index` (0-based) of all available backends.
    pub fn new(index: usize) -> VlasovResult<Self> {
        let instance = wgpu::Instance::default();
        let mut adapters = instance.enumerate_adapters(wgpu::Backends::all());
        if index >= adapters.len() {
            return Err(VlasovError::DeviceUnavailable(format!(
                "adapter index {index} out of range ({} found)",
                adapters.len()
            )));
        }
        let adapter = adapters.swap_remove(index);
        Self::from_adapter(adapter)
    }

    /// Open the highest-performance adapter the system offers.
    pub fn default_adapter() -> VlasovResult<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| {
            VlasovError::DeviceUnavailable("no suitable GPU adapter found".to_string())
        })?;
        Self::from_adapter(adapter)
    }

    fn from_adapter(adapter: wgpu::Adapter) -> VlasovResult<Self> {
        let info = adapter.get_info();
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("vlasov-gpu"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| VlasovError::DeviceUnavailable(format!("device request failed: {e}")))?;
        Ok(GpuContext {
            device,
            queue,
            info,
        })
    }

    /// Adapter description for status output.
    pub fn info(&self) -> String {
        format!(
            "{} ({:?}, {:?})",
            self.info.name, self.info.backend, self.info.device_type
        )
    }

    /// Block until all submitted work has completed.
    pub fn wait_idle(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}

/// List adapter descriptions without opening a device.
pub fn list_devices() -> Vec<String> {
    let instance = wgpu::Instance::default();
    instance
        .enumerate_adapters(wgpu::Backends::all())
        .iter()
        .map(|a| {
            let info = a.get_info();
            format!("{} ({:?}, {:?})", info.name, info.backend, info.device_type)
        })
        .collect()
}

/// Check whether a GPU adapter is available without creating a context.
pub fn gpu_available() -> bool {
    let instance = wgpu::Instance::default();
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .is_some()
}

/// Host/device mirror of one f32 array with explicit residency tracking.
///
/// Exactly one side is authoritative at any time; `sync` is a no-op when
/// the source side is clean. Mesh data lives as f64 on the host, so the
/// accessors convert at the boundary.
pub struct MirroredBuffer {
    len: usize,
    host: Vec<f32>,
    buffer: wgpu::Buffer,
    staging: wgpu::Buffer,
    host_dirty: bool,
    device_dirty: bool,
}

impl MirroredBuffer {
    pub fn new(ctx: &GpuContext, len: usize, label: &str) -> Self {
        let size = (len * std::mem::size_of::<f32>()) as u64;
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        MirroredBuffer {
            len,
            host: vec![0.0; len],
            buffer,
            staging,
            host_dirty: false,
            device_dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Overwrite the host side; the device copy becomes stale.
    pub fn write_host(&mut self, data: &[f64]) {
        assert_eq!(data.len(), self.len, "mirrored buffer length mismatch");
        for (h, &d) in self.host.iter_mut().zip(data.iter()) {
            *h = d as f32;
        }
        self.host_dirty = true;
        self.device_dirty = false;
    }

    /// Host view. Callers must have synced device→host after device writes.
    pub fn host(&self) -> &[f32] {
        &self.host
    }

    /// Host copy widened back to f64.
    pub fn read_host_f64(&self) -> Vec<f64> {
        self.host.iter().map(|&v| v as f64).collect()
    }

    /// Flag the device side as freshly written by a kernel.
    pub fn mark_device_dirty(&mut self) {
        self.device_dirty = true;
        self.host_dirty = false;
    }

    pub fn is_device_dirty(&self) -> bool {
        self.device_dirty
    }

    /// Copy across the mirror if (and only if) the source side is dirty.
    pub fn sync(&mut self, ctx: &GpuContext, direction: SyncDirection) -> VlasovResult<()> {
        match direction {
            SyncDirection::HostToDevice => {
                if !self.host_dirty {
                    return Ok(());
                }
                ctx.queue
                    .write_buffer(&self.buffer, 0, bytemuck::cast_slice(&self.host));
                self.host_dirty = false;
            }
            SyncDirection::DeviceToHost => {
                if !self.device_dirty {
                    return Ok(());
                }
                let size = (self.len * std::mem::size_of::<f32>()) as u64;
                let mut encoder =
                    ctx.device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("mirror_download"),
                        });
                encoder.copy_buffer_to_buffer(&self.buffer, 0, &self.staging, 0, size);
                ctx.queue.submit(Some(encoder.finish()));

                let slice = self.staging.slice(..);
                let (tx, rx) = std::sync::mpsc::channel();
                slice.map_async(wgpu::MapMode::Read, move |result| {
                    let _ = tx.send(result);
                });
                ctx.device.poll(wgpu::Maintain::Wait);
                rx.recv()
                    .map_err(|e| {
                        VlasovError::DeviceUnavailable(format!("download channel error: {e}"))
                    })?
                    .map_err(|e| {
                        VlasovError::DeviceUnavailable(format!("buffer map failed: {e}"))
                    })?;

                {
                    let data = slice.get_mapped_range();
                    self.host.copy_from_slice(bytemuck::cast_slice(&data));
                }
                self.staging.unmap();
                self.device_dirty = false;
            }
        }
        Ok(())
    }

    fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Compute pipeline applying one precomputed stencil to a mirrored buffer.
///
/// The stencil tables are uploaded at construction; `update_weights`
/// refreshes them in place for maps whose stencil follows the
/// distribution (wake and RF kicks).
pub struct StencilPipeline {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    param_buffer: wgpu::Buffer,
    idx_buffer: wgpu::Buffer,
    weight_buffer: wgpu::Buffer,
    n_cells: u32,
    ip: u32,
}

impl StencilPipeline {
    pub fn new(
        ctx: &GpuContext,
        indices: &[u32],
        weights: &[f32],
        ip: usize,
        clamp_enabled: bool,
    ) -> VlasovResult<Self> {
        if ip == 0 || indices.len() != weights.len() || indices.len() % ip != 0 {
            return Err(VlasovError::ConfigInvalid(format!(
                "stencil tables inconsistent: {} indices, {} weights, ip={ip}",
                indices.len(),
                weights.len()
            )));
        }
        let n_cells = (indices.len() / ip) as u32;

        let shader_source = include_str!("apply_map.wgsl");
        let shader_module = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("apply_map"),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(shader_source)),
            });

        let param_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stencil_params"),
            size: std::mem::size_of::<StencilParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let params = StencilParams {
            n_cells,
            ip: ip as u32,
            clamp_enabled: clamp_enabled as u32,
            _pad: 0,
        };
        ctx.queue
            .write_buffer(&param_buffer, 0, bytemuck::bytes_of(&params));

        let idx_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stencil_idx"),
            size: (indices.len() * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        ctx.queue
            .write_buffer(&idx_buffer, 0, bytemuck::cast_slice(indices));

        let weight_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stencil_w"),
            size: (weights.len() * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        ctx.queue
            .write_buffer(&weight_buffer, 0, bytemuck::cast_slice(weights));

        let layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("apply_map_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    storage_entry(1, true),
                    storage_entry(2, true),
                    storage_entry(3, true),
                    storage_entry(4, false),
                ],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("apply_map_pipeline_layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("apply_map_pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });

        Ok(StencilPipeline {
            pipeline,
            layout,
            param_buffer,
            idx_buffer,
            weight_buffer,
            n_cells,
            ip: ip as u32,
        })
    }

    /// Refresh the stencil tables in place (distribution-dependent maps).
    pub fn update_weights(&self, ctx: &GpuContext, indices: &[u32], weights: &[f32]) {
        debug_assert_eq!(indices.len() as u32, self.n_cells * self.ip);
        debug_assert_eq!(weights.len() as u32, self.n_cells * self.ip);
        ctx.queue
            .write_buffer(&self.idx_buffer, 0, bytemuck::cast_slice(indices));
        ctx.queue
            .write_buffer(&self.weight_buffer, 0, bytemuck::cast_slice(weights));
    }

    /// Enqueue one stencil application. Returns immediately; the caller
    /// synchronises through the output buffer when it needs host access.
    pub fn apply(
        &self,
        ctx: &GpuContext,
        input: &mut MirroredBuffer,
        output: &mut MirroredBuffer,
    ) -> VlasovResult<()> {
        input.sync(ctx, SyncDirection::HostToDevice)?;

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("apply_map_bind"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.param_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.idx_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.weight_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: input.raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: output.raw().as_entire_binding(),
                },
            ],
        });

        let workgroups = self.n_cells.div_ceil(256);
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("apply_map_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("apply_map_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
        ctx.queue.submit(Some(encoder.finish()));
        output.mark_device_dirty();
        Ok(())
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stencil_params_size() {
        assert_eq!(std::mem::size_of::<StencilParams>(), 16);
    }

    #[test]
    fn test_gpu_available_does_not_panic() {
        // may be false in CI
        let _ = gpu_available();
    }

    #[test]
    fn test_list_devices_does_not_panic() {
        let _ = list_devices();
    }

    // Integration tests: only run when an adapter is present
    #[test]
    fn test_mirror_roundtrip() {
        if !gpu_available() {
            eprintln!("Skipping GPU test: no adapter available");
            return;
        }
        let ctx = GpuContext::default_adapter().expect("context");
        let mut buf = MirroredBuffer::new(&ctx, 64, "test");
        let data: Vec<f64> = (0..64).map(|i| i as f64 * 0.5).collect();
        buf.write_host(&data);
        buf.sync(&ctx, SyncDirection::HostToDevice).unwrap();
        // pretend a kernel wrote it, then read it back
        buf.mark_device_dirty();
        buf.sync(&ctx, SyncDirection::DeviceToHost).unwrap();
        let back = buf.read_host_f64();
        for i in 0..64 {
            assert!((back[i] - data[i]).abs() < 1e-6, "at {i}");
        }
    }

    #[test]
    fn test_identity_stencil_apply() {
        if !gpu_available() {
            eprintln!("Skipping GPU test: no adapter available");
            return;
        }
        let ctx = GpuContext::default_adapter().expect("context");
        let n = 128usize;
        let indices: Vec<u32> = (0..n as u32).collect();
        let weights = vec![1.0f32; n];
        let pipeline = StencilPipeline::new(&ctx, &indices, &weights, 1, false).unwrap();

        let mut input = MirroredBuffer::new(&ctx, n, "in");
        let mut output = MirroredBuffer::new(&ctx, n, "out");
        let data: Vec<f64> = (0..n).map(|i| ((i * 31 + 7) % 13) as f64).collect();
        input.write_host(&data);

        pipeline.apply(&ctx, &mut input, &mut output).unwrap();
        output.sync(&ctx, SyncDirection::DeviceToHost).unwrap();

        let back = output.read_host_f64();
        for i in 0..n {
            assert!((back[i] - data[i]).abs() < 1e-6, "identity failed at {i}");
        }
    }
}
