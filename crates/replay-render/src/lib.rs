//! Motion Replay Render - SMPL Mesh Drawing
//!
//! This crate turns decoded frames into pixels:
//! - CPU geometry (normals, wireframe edges, point fallback)
//! - Orbit camera
//! - wgpu backend, pipelines and per-frame buffer uploads

#![warn(missing_docs)]

use thiserror::Error;

pub mod backend;
pub mod camera;
pub mod geometry;
pub mod ground;
pub mod mesh_buffer_cache;
pub mod mesh_renderer;

pub use backend::{RenderBackend, WgpuBackend};
pub use camera::OrbitCamera;
pub use geometry::{BoundingSphere, GpuVertex, SmplGeometry};
pub use mesh_buffer_cache::MeshBufferCache;
pub use mesh_renderer::{MeshStyle, SmplMeshRenderer, DEPTH_FORMAT};
pub use replay_core::RenderMode;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// No adapter or device could be obtained
    #[error("Device error: {0}")]
    DeviceError(String),

    /// The window surface cannot be created or configured
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// A draw was requested before any vertices were uploaded
    #[error("Nothing to draw: {0}")]
    EmptyGeometry(String),
}

/// Result type for rendering operations
pub type Result<T> = std::result::Result<T, RenderError>;

/// Re-export commonly used wgpu types
pub use wgpu::{Device, Queue, Surface, SurfaceConfiguration, TextureFormat, TextureView};
