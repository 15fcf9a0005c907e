//! wgpu-backed buffer sink.
//!
//! [`WgpuSink`] owns the four GPU buffers a renderer needs to draw trails as
//! an indexed line list plus instanced particle heads:
//!
//! | Buffer | Usage | Contents |
//! |--------|-------|----------|
//! | positions | `VERTEX` | `vec3<f32>` per trail slot |
//! | colors | `VERTEX` | `vec3<f32>` per trail slot |
//! | indices | `INDEX` | line-list pairs, `Uint16` or `Uint32` |
//! | instances | `VERTEX` | `mat4x4<f32>` per particle |
//!
//! Buffers are recreated on [`GpuBufferSink::configure`] and updated with one
//! `Queue::write_buffer` per dirty range.

use crate::budget::IndexFormat;
use crate::error::GpuError;
use crate::sink::{BufferId, BufferLayout, DirtyRange, GpuBufferSink};

impl From<IndexFormat> for wgpu::IndexFormat {
    fn from(format: IndexFormat) -> Self {
        match format {
            IndexFormat::U16 => wgpu::IndexFormat::Uint16,
            IndexFormat::U32 => wgpu::IndexFormat::Uint32,
        }
    }
}

/// Whether `adapter` can draw with 32-bit indices.
pub fn adapter_supports_wide_index(adapter: &wgpu::Adapter) -> bool {
    adapter
        .get_downlevel_capabilities()
        .flags
        .contains(wgpu::DownlevelFlags::FULL_DRAW_INDEX_UINT32)
}

/// Trail and instance buffers living on a wgpu device.
pub struct WgpuSink {
    device: wgpu::Device,
    queue: wgpu::Queue,
    wide_index: bool,
    positions: wgpu::Buffer,
    colors: wgpu::Buffer,
    indices: wgpu::Buffer,
    instances: wgpu::Buffer,
    index_format: wgpu::IndexFormat,
    index_count: u32,
}

impl WgpuSink {
    /// Wrap an existing device. Buffers start empty until the first configure.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, wide_index: bool) -> Self {
        let positions = create_buffer(&device, "Trail Position Buffer", 0, vertex_usage());
        let colors = create_buffer(&device, "Trail Color Buffer", 0, vertex_usage());
        let indices = create_buffer(&device, "Trail Index Buffer", 0, index_usage());
        let instances = create_buffer(&device, "Particle Instance Buffer", 0, vertex_usage());
        Self {
            device,
            queue,
            wide_index,
            positions,
            colors,
            indices,
            instances,
            index_format: wgpu::IndexFormat::Uint16,
            index_count: 0,
        }
    }

    /// Acquire a device without a surface, blocking on adapter and device requests.
    pub fn request_headless() -> Result<Self, GpuError> {
        pollster::block_on(Self::request_headless_async())
    }

    pub async fn request_headless_async() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let wide_index = adapter_supports_wide_index(&adapter);
        log::info!(
            "using GPU adapter {} (32-bit indices: {})",
            adapter.get_info().name,
            wide_index
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Chaos Trails Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self::new(device, queue, wide_index))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn buffer(&self, id: BufferId) -> &wgpu::Buffer {
        match id {
            BufferId::Positions => &self.positions,
            BufferId::Colors => &self.colors,
            BufferId::Indices => &self.indices,
            BufferId::Instances => &self.instances,
        }
    }

    /// Format to pass to `RenderPass::set_index_buffer`.
    pub fn index_format(&self) -> wgpu::IndexFormat {
        self.index_format
    }

    /// Number of indices to draw with a `LineList` topology.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

impl GpuBufferSink for WgpuSink {
    fn supports_wide_index(&self) -> bool {
        self.wide_index
    }

    fn configure(&mut self, layout: &BufferLayout) {
        self.positions = create_buffer(&self.device, "Trail Position Buffer", layout.position_bytes, vertex_usage());
        self.colors = create_buffer(&self.device, "Trail Color Buffer", layout.color_bytes, vertex_usage());
        self.indices = create_buffer(&self.device, "Trail Index Buffer", layout.index_bytes, index_usage());
        self.instances = create_buffer(&self.device, "Particle Instance Buffer", layout.instance_bytes, vertex_usage());
        self.index_format = layout.index_format.into();
        self.index_count = (layout.index_bytes / layout.index_format.bytes()) as u32;
    }

    fn mark_dirty(&mut self, range: DirtyRange, bytes: &[u8]) {
        let buffer = self.buffer(range.buffer);
        if range.byte_offset + range.byte_length > buffer.size() {
            log::warn!(
                "dropping {:?} upload of {} bytes at {}: buffer holds {} bytes",
                range.buffer,
                range.byte_length,
                range.byte_offset,
                buffer.size()
            );
            return;
        }
        self.queue.write_buffer(buffer, range.byte_offset, bytes);
    }
}

fn vertex_usage() -> wgpu::BufferUsages {
    wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST
}

fn index_usage() -> wgpu::BufferUsages {
    wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST
}

// Zero-sized buffers are legal but cannot be bound, so keep at least one copy unit.
fn create_buffer(device: &wgpu::Device, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
    let size = size.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT).max(1) * wgpu::COPY_BUFFER_ALIGNMENT;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage,
        mapped_at_creation: false,
    })
}
