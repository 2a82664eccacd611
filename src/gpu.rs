use std::borrow::Cow;

use log::{debug, info};
use wgpu::util::DeviceExt;

use crate::engine::{EngineError, SimilarityEngine};
use crate::matrix::SimilarityMatrix;
use crate::vectors::VectorSet;

const NORMS_WORKGROUP: u32 = 256;
const TILE: u32 = 16;
const F32_BYTES: u64 = std::mem::size_of::<f32>() as u64;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    total_rows: u32,
    total_cols: u32,
    dim: u32,
    row_offset: u32,
    chunk_rows: u32,
    nan_bits: u32,
    _pad: [u32; 2],
}

/// Parallel engine running a WGSL compute kernel through wgpu.
///
/// The device and pipelines are created once in [`GpuEngine::new`]; every
/// [`compute`](SimilarityEngine::compute) uploads both sets, computes the norm
/// cache on the device, then launches one invocation per matrix entry in row
/// chunks sized to the device's storage binding limit.
///
/// Each vector is divided by its largest absolute component before it is
/// narrowed to f32, so squared norms neither overflow nor flush to zero; the
/// kernel accumulates with compensated summation.
pub struct GpuEngine {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    norms_pipeline: wgpu::ComputePipeline,
    cosine_pipeline: wgpu::ComputePipeline,
    chunk_limit: Option<u64>,
}

impl GpuEngine {
    pub async fn new() -> Result<Self, EngineError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(EngineError::NoAdapter)?;

        info!("Using GPU adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Cosine Similarity Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cosine Similarity Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!(
                "../shaders/cosine_similarity.wgsl"
            ))),
        });

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Cosine Similarity Bind Group Layout"),
            entries: &[
                storage(0, true),
                storage(1, true),
                storage(2, false),
                storage(3, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cosine Similarity Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |label: &str, entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point,
                cache: None,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            })
        };
        let norms_pipeline = pipeline("Norms Pipeline", "norms_main");
        let cosine_pipeline = pipeline("Cosine Pipeline", "cosine_main");

        if let Some(err) = device.pop_error_scope().await {
            return Err(EngineError::Launch(err.to_string()));
        }

        Ok(Self {
            device,
            queue,
            bind_group_layout,
            norms_pipeline,
            cosine_pipeline,
            chunk_limit: None,
        })
    }

    /// Caps the bytes of output produced per dispatch, below the device's own
    /// storage binding limit.
    pub fn with_chunk_limit(mut self, bytes: u64) -> Self {
        self.chunk_limit = Some(bytes);
        self
    }

    /// Async form of [`SimilarityEngine::compute`]; results are widened from
    /// the device's f32 to f64.
    pub async fn compute_async(
        &self,
        lhs: &VectorSet,
        rhs: &VectorSet,
    ) -> Result<SimilarityMatrix, EngineError> {
        let (rows, cols) = (lhs.len(), rhs.len());
        if rows == 0 || cols == 0 {
            return Ok(SimilarityMatrix::zeros(rows, cols));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let result = self.dispatch(lhs, rhs).await;

        let validation = self.device.pop_error_scope().await;
        let out_of_memory = self.device.pop_error_scope().await;
        if let Some(err) = validation.or(out_of_memory) {
            return Err(EngineError::Launch(err.to_string()));
        }

        let data = result?;
        SimilarityMatrix::from_row_major(rows, cols, data)
            .map_err(|e| EngineError::Launch(e.to_string()))
    }

    async fn dispatch(&self, lhs: &VectorSet, rhs: &VectorSet) -> Result<Vec<f64>, EngineError> {
        let limits = self.device.limits();
        let binding_limit = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
        let chunk_limit = self.chunk_limit.map_or(binding_limit, |c| c.min(binding_limit));
        let max_groups = limits.max_compute_workgroups_per_dimension;

        let (rows, cols, dim) = (lhs.len(), rhs.len(), lhs.dim());
        let rows_per_chunk = plan_chunks(rows, cols, dim, binding_limit, chunk_limit, max_groups)?;

        let lhs_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Input Buffer Lhs"),
            contents: bytemuck::cast_slice(&lhs.to_scaled_f32()),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let rhs_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Input Buffer Rhs"),
            contents: bytemuck::cast_slice(&rhs.to_scaled_f32()),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let norms_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Norm Cache Buffer"),
            size: (rows + cols) as u64 * F32_BYTES,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let mut params = Params {
            total_rows: rows as u32,
            total_cols: cols as u32,
            dim: dim as u32,
            row_offset: 0,
            chunk_rows: rows_per_chunk as u32,
            nan_bits: f32::NAN.to_bits(),
            _pad: [0; 2],
        };

        let mut result = Vec::with_capacity(rows * cols);

        for chunk_start in (0..rows).step_by(rows_per_chunk) {
            let chunk_end = (chunk_start + rows_per_chunk).min(rows);
            let chunk_rows = chunk_end - chunk_start;
            let chunk_size = (chunk_rows * cols) as u64 * F32_BYTES;

            params.row_offset = chunk_start as u32;
            params.chunk_rows = chunk_rows as u32;

            let params_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Params Buffer"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Output Buffer"),
                size: chunk_size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });

            let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Staging Buffer"),
                size: chunk_size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Cosine Similarity Bind Group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: lhs_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: rhs_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: norms_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: output_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            });

            let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Cosine Similarity Command Encoder"),
            });

            {
                let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Cosine Similarity Compute Pass"),
                    timestamp_writes: None,
                });
                compute_pass.set_bind_group(0, &bind_group, &[]);

                // The norm cache is filled once, ahead of the first chunk.
                if chunk_start == 0 {
                    compute_pass.set_pipeline(&self.norms_pipeline);
                    compute_pass.dispatch_workgroups(
                        ((rows + cols) as u32).div_ceil(NORMS_WORKGROUP),
                        1,
                        1,
                    );
                }

                compute_pass.set_pipeline(&self.cosine_pipeline);
                compute_pass.dispatch_workgroups(
                    (cols as u32).div_ceil(TILE),
                    (chunk_rows as u32).div_ceil(TILE),
                    1,
                );
            }

            encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging_buffer, 0, chunk_size);
            self.queue.submit(Some(encoder.finish()));

            debug!("Dispatched rows {chunk_start}..{chunk_end} of {rows}");

            let slice = staging_buffer.slice(..);
            let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
            slice.map_async(wgpu::MapMode::Read, move |mapped| {
                let _ = sender.send(mapped);
            });
            self.device.poll(wgpu::Maintain::Wait);

            match receiver.receive().await {
                Some(Ok(())) => {}
                Some(Err(err)) => return Err(err.into()),
                None => return Err(EngineError::ReadbackDropped),
            }

            let data = slice.get_mapped_range();
            result.extend(bytemuck::cast_slice::<u8, f32>(&data).iter().map(|&x| f64::from(x)));
            drop(data);
            staging_buffer.unmap();
        }

        Ok(result)
    }
}

/// Checks every buffer and grid against the device limits, then picks the
/// rows of output per dispatch.
fn plan_chunks(
    rows: usize,
    cols: usize,
    dim: usize,
    binding_limit: u64,
    chunk_limit: u64,
    max_groups: u32,
) -> Result<usize, EngineError> {
    check_fits("first vector set", rows as u64 * dim as u64 * F32_BYTES, binding_limit)?;
    check_fits("second vector set", cols as u64 * dim as u64 * F32_BYTES, binding_limit)?;
    check_fits("norm cache", (rows + cols) as u64 * F32_BYTES, binding_limit)?;
    check_fits("one output row", cols as u64 * F32_BYTES, chunk_limit)?;
    check_fits(
        "norm pass",
        ((rows + cols) as u64).div_ceil(NORMS_WORKGROUP as u64),
        u64::from(max_groups),
    )?;
    check_fits("output columns", (cols as u64).div_ceil(TILE as u64), u64::from(max_groups))?;
    Ok(rows_per_chunk(rows, cols, chunk_limit, max_groups))
}

/// Rows of output per dispatch: bounded by the byte budget, the workgroup
/// grid and the row count. Callers have checked that one row fits.
fn rows_per_chunk(rows: usize, cols: usize, chunk_limit: u64, max_groups: u32) -> usize {
    (chunk_limit / (cols as u64 * F32_BYTES))
        .min(u64::from(max_groups) * u64::from(TILE))
        .min(rows as u64)
        .max(1) as usize
}

fn check_fits(what: &'static str, needed: u64, limit: u64) -> Result<(), EngineError> {
    if needed > limit {
        return Err(EngineError::TooLarge { what, needed, limit });
    }
    Ok(())
}

impl SimilarityEngine for GpuEngine {
    fn name(&self) -> &str {
        "GPU"
    }

    fn compute(&self, lhs: &VectorSet, rhs: &VectorSet) -> Result<SimilarityMatrix, EngineError> {
        pollster::block_on(self.compute_async(lhs, rhs))
    }
}
