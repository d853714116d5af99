//! SMPL Mesh Renderer - draws the body as a lit surface, wireframe or point cloud
//!
//! All three modes share one shader module, one uniform buffer and one vertex
//! layout; they differ only in primitive topology and fragment entry point.
//! The floor and grid under the body reuse the flat pipelines with their own
//! uniforms.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use tracing::info;
use wgpu::util::DeviceExt;

use crate::geometry::GpuVertex;
use crate::ground::{floor_quad, grid_lines, FLOOR_HEIGHT, FLOOR_SIZE, GRID_DIVISIONS, GRID_SIZE};
use crate::mesh_buffer_cache::MeshBufferCache;
use crate::{RenderError, RenderMode, Result};

/// Depth attachment format used by every pipeline
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Background behind the body
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.05,
    a: 1.0,
};

/// Floor colour (sRGB)
const FLOOR_SRGB: [f32; 3] = [0.35, 0.36, 0.38];

/// Grid line colour (sRGB)
const GRID_SRGB: [f32; 3] = [0.55, 0.57, 0.6];

/// Uniforms for mesh rendering (matches smpl_mesh.wgsl)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable, PartialEq)]
struct MeshUniforms {
    view_proj: [[f32; 4]; 4], // 64 bytes
    model: [[f32; 4]; 4],     // 64 bytes
    color: [f32; 4],          // 16 bytes
    light_dir: [f32; 4],      // 16 bytes (total 160 bytes)
}

/// Material and light settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshStyle {
    /// Linear RGB body colour
    pub color: [f32; 3],
    /// Direction towards the key light
    pub light_dir: Vec3,
}

impl MeshStyle {
    /// Style with an sRGB colour such as the user config's mesh colour
    pub fn from_srgb(rgb: [f32; 3]) -> Self {
        Self {
            color: rgb.map(srgb_to_linear),
            ..Default::default()
        }
    }
}

impl Default for MeshStyle {
    fn default() -> Self {
        Self {
            // #10b981
            color: [16.0 / 255.0, 185.0 / 255.0, 129.0 / 255.0].map(srgb_to_linear),
            light_dir: Vec3::new(5.0, 5.0, 5.0).normalize(),
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Static world-space geometry with its own colour
struct GroundLayer {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    color: [f32; 4],
}

impl GroundLayer {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        vertices: &[GpuVertex],
        srgb: [f32; 3],
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&MeshUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let [r, g, b] = srgb.map(srgb_to_linear);
        Self {
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            uniform_buffer,
            bind_group,
            color: [r, g, b, 1.0],
        }
    }

    fn write_uniforms(&self, queue: &wgpu::Queue, view_proj: Mat4) {
        let uniforms = MeshUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            color: self.color,
            light_dir: [0.0, 1.0, 0.0, 0.0],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, pipeline: &wgpu::RenderPipeline) {
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..self.vertex_count, 0..1);
    }
}

/// Renderer for the SMPL body
pub struct SmplMeshRenderer {
    solid_pipeline: wgpu::RenderPipeline,
    wireframe_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,
    floor_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    last_uniforms: Option<MeshUniforms>,
    floor: GroundLayer,
    grid: GroundLayer,
    ground_visible: bool,
    device: Arc<wgpu::Device>,
}

impl SmplMeshRenderer {
    /// Create a new mesh renderer drawing into `target_format`
    pub fn new(device: Arc<wgpu::Device>, target_format: wgpu::TextureFormat) -> Result<Self> {
        info!("Creating SMPL mesh renderer");

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("SMPL Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SMPL Uniform Buffer"),
            contents: bytemuck::bytes_of(&MeshUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SMPL Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader_source = include_str!("../../../shaders/smpl_mesh.wgsl");
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("SMPL Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("SMPL Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let build = |label: &str, topology: wgpu::PrimitiveTopology, fragment: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader_module,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3, // position
                            1 => Float32x3, // normal
                        ],
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader_module,
                    entry_point: Some(fragment),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // The body is viewed from every side
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            })
        };

        let solid_pipeline = build(
            "SMPL Solid Pipeline",
            wgpu::PrimitiveTopology::TriangleList,
            "fs_lit",
        );
        let wireframe_pipeline = build(
            "SMPL Wireframe Pipeline",
            wgpu::PrimitiveTopology::LineList,
            "fs_flat",
        );
        let point_pipeline = build(
            "SMPL Point Pipeline",
            wgpu::PrimitiveTopology::PointList,
            "fs_flat",
        );
        let floor_pipeline = build(
            "SMPL Floor Pipeline",
            wgpu::PrimitiveTopology::TriangleList,
            "fs_flat",
        );

        let floor = GroundLayer::new(
            &device,
            &uniform_bind_group_layout,
            "SMPL Floor",
            &floor_quad(FLOOR_SIZE, FLOOR_HEIGHT),
            FLOOR_SRGB,
        );
        let grid = GroundLayer::new(
            &device,
            &uniform_bind_group_layout,
            "SMPL Grid",
            &grid_lines(GRID_SIZE, GRID_DIVISIONS),
            GRID_SRGB,
        );

        Ok(Self {
            solid_pipeline,
            wireframe_pipeline,
            point_pipeline,
            floor_pipeline,
            uniform_buffer,
            uniform_bind_group,
            last_uniforms: None,
            floor,
            grid,
            ground_visible: true,
            device,
        })
    }

    /// Upload camera, model and style for the next draw
    ///
    /// The buffer is only written when something changed.
    pub fn update_uniforms(
        &mut self,
        queue: &wgpu::Queue,
        view_proj: Mat4,
        model: Mat4,
        style: &MeshStyle,
    ) {
        let [r, g, b] = style.color;
        let uniforms = MeshUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            color: [r, g, b, 1.0],
            light_dir: style.light_dir.normalize_or_zero().extend(0.0).to_array(),
        };

        if self.last_uniforms.map(|last| last.view_proj) != Some(uniforms.view_proj) {
            self.floor.write_uniforms(queue, view_proj);
            self.grid.write_uniforms(queue, view_proj);
        }
        if self.last_uniforms != Some(uniforms) {
            queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
            self.last_uniforms = Some(uniforms);
        }
    }

    /// Whether the floor and grid are drawn
    pub fn ground_visible(&self) -> bool {
        self.ground_visible
    }

    /// Show or hide the floor and grid
    pub fn set_ground_visible(&mut self, visible: bool) {
        self.ground_visible = visible;
    }

    /// Record the floor and grid into an open render pass
    pub fn draw_ground(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        self.floor.draw(render_pass, &self.floor_pipeline);
        self.grid.draw(render_pass, &self.wireframe_pipeline);
    }

    /// Depth attachment matching a `width` x `height` target
    pub fn create_depth_view(&self, width: u32, height: u32) -> wgpu::TextureView {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("SMPL Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Record the draw for `mode` into an open render pass
    pub fn draw(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        buffers: &MeshBufferCache,
        mode: RenderMode,
    ) -> Result<()> {
        let vertex_buffer = buffers
            .vertex_buffer()
            .filter(|_| buffers.vertex_count() > 0)
            .ok_or_else(|| RenderError::EmptyGeometry("no vertices uploaded".to_string()))?;

        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));

        let indexed = match mode {
            RenderMode::Solid => buffers
                .triangles()
                .map(|indices| (&self.solid_pipeline, indices)),
            RenderMode::Wireframe => buffers
                .edges()
                .map(|indices| (&self.wireframe_pipeline, indices)),
            RenderMode::Points => None,
        };

        match indexed {
            Some((pipeline, indices)) => {
                render_pass.set_pipeline(pipeline);
                render_pass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..indices.count, 0, 0..1);
            }
            None => {
                render_pass.set_pipeline(&self.point_pipeline);
                render_pass.draw(0..buffers.vertex_count(), 0..1);
            }
        }
        Ok(())
    }

    /// Clear `color_view` and draw the ground and the body into it
    ///
    /// With nothing uploaded only the ground is drawn.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        buffers: &MeshBufferCache,
        mode: RenderMode,
    ) -> Result<()> {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("SMPL Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if self.ground_visible {
            self.draw_ground(&mut render_pass);
        }
        match self.draw(&mut render_pass, buffers, mode) {
            Err(RenderError::EmptyGeometry(_)) => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_uniforms_size() {
        // 2 x mat4x4 + 2 x vec4, a multiple of 16 as uniform layout requires
        assert_eq!(std::mem::size_of::<MeshUniforms>(), 160);
    }

    #[test]
    fn test_default_style_is_linear_emerald() {
        let style = MeshStyle::default();
        assert!(style.color[1] > style.color[2]);
        assert!(style.color[2] > style.color[0]);
        assert!((style.light_dir.length() - 1.0).abs() < 1e-5);
        assert_eq!(MeshStyle::from_srgb([16.0 / 255.0, 185.0 / 255.0, 129.0 / 255.0]), style);
    }
}
