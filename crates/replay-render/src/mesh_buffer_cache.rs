//! Mesh Buffer Cache - keeps the body's GPU buffers alive across frames
//!
//! Index buffers depend only on the topology and are rebuilt when the geometry's
//! index lists change. The vertex buffer is allocated once and rewritten in
//! place for every new frame.

use crate::geometry::{GpuVertex, SmplGeometry};
use tracing::debug;
use wgpu::util::DeviceExt;

/// An index buffer with its element count
#[derive(Debug)]
pub struct IndexBuffer {
    /// `u32` indices
    pub buffer: wgpu::Buffer,
    /// Number of indices in `buffer`
    pub count: u32,
}

/// GPU copies of an [`SmplGeometry`]
#[derive(Debug, Default)]
pub struct MeshBufferCache {
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_capacity: usize,
    vertex_count: u32,
    triangles: Option<IndexBuffer>,
    edges: Option<IndexBuffer>,
    index_revision: Option<u64>,
    position_revision: Option<u64>,
    index_uploads: u64,
}

impl MeshBufferCache {
    /// Cache with nothing uploaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the GPU buffers up to date with `geometry`
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, geometry: &SmplGeometry) {
        if self.index_revision != Some(geometry.index_revision()) {
            self.triangles = create_index_buffer(
                device,
                "SMPL Triangle Index Buffer",
                geometry.triangle_indices(),
            );
            self.edges =
                create_index_buffer(device, "SMPL Edge Index Buffer", geometry.edge_indices());
            self.index_revision = Some(geometry.index_revision());
            self.index_uploads += 1;
            debug!(
                "Uploaded index buffers (revision {})",
                geometry.index_revision()
            );
        }

        if self.position_revision == Some(geometry.position_revision()) {
            return;
        }

        let vertices = geometry.vertices();
        if vertices.len() > self.vertex_capacity || self.vertex_buffer.is_none() {
            self.vertex_buffer = Some(device.create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some("SMPL Vertex Buffer"),
                    contents: vertex_bytes(vertices),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                },
            ));
            self.vertex_capacity = vertices.len().max(1);
        } else if let Some(buffer) = &self.vertex_buffer {
            if !vertices.is_empty() {
                queue.write_buffer(buffer, 0, bytemuck::cast_slice(vertices));
            }
        }

        self.vertex_count = vertices.len() as u32;
        self.position_revision = Some(geometry.position_revision());
    }

    /// Vertex buffer, possibly larger than the current frame
    pub fn vertex_buffer(&self) -> Option<&wgpu::Buffer> {
        self.vertex_buffer.as_ref()
    }

    /// Vertices of the last prepared frame
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Triangle list, `None` without topology
    pub fn triangles(&self) -> Option<&IndexBuffer> {
        self.triangles.as_ref()
    }

    /// Wireframe line list, `None` without topology
    pub fn edges(&self) -> Option<&IndexBuffer> {
        self.edges.as_ref()
    }

    /// How many times index buffers were (re)created
    pub fn index_uploads(&self) -> u64 {
        self.index_uploads
    }

    /// Drop every buffer
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

const EMPTY_VERTEX: GpuVertex = GpuVertex {
    position: [0.0; 3],
    normal: [0.0; 3],
};

/// wgpu rejects zero-sized buffers
fn vertex_bytes(vertices: &[GpuVertex]) -> &[u8] {
    if vertices.is_empty() {
        bytemuck::bytes_of(&EMPTY_VERTEX)
    } else {
        bytemuck::cast_slice(vertices)
    }
}

fn create_index_buffer(device: &wgpu::Device, label: &str, indices: &[u32]) -> Option<IndexBuffer> {
    if indices.is_empty() {
        return None;
    }
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    Some(IndexBuffer {
        buffer,
        count: indices.len() as u32,
    })
}
