//! Rendering backend abstraction.

use crate::{RenderError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Trait for rendering backends
pub trait RenderBackend: Send {
    /// Logical device
    fn device(&self) -> &wgpu::Device;
    /// Submission queue of the device
    fn queue(&self) -> &wgpu::Queue;
}

/// wgpu-based rendering backend
pub struct WgpuBackend {
    /// Instance the adapter came from, also used for surfaces
    pub instance: Arc<wgpu::Instance>,
    /// Selected adapter
    pub adapter: wgpu::Adapter,
    /// Device shared with renderers
    pub device: Arc<wgpu::Device>,
    /// Queue of `device`
    pub queue: Arc<wgpu::Queue>,
    /// Name, type and API of the adapter
    pub adapter_info: wgpu::AdapterInfo,
}

impl WgpuBackend {
    /// Create a new wgpu backend
    ///
    /// Modern backends (Vulkan, Metal, DX12) are tried first; GL is only used
    /// when none of them yields a device, since GL initialisation can fail
    /// eagerly on headless systems.
    pub async fn new(preferred_gpu: Option<&str>) -> Result<Self> {
        let safe_backends = wgpu::Backends::all() & !wgpu::Backends::GL;
        let primary_result = Self::new_with_options(
            safe_backends,
            wgpu::PowerPreference::HighPerformance,
            preferred_gpu,
        )
        .await;

        if primary_result.is_ok() {
            return primary_result;
        }

        info!("Primary backend initialization failed, attempting GL fallback...");

        Self::new_with_options(
            wgpu::Backends::GL,
            wgpu::PowerPreference::HighPerformance,
            preferred_gpu,
        )
        .await
    }

    /// Create a new wgpu backend with specific options
    pub async fn new_with_options(
        backends: wgpu::Backends,
        power_preference: wgpu::PowerPreference,
        preferred_gpu: Option<&str>,
    ) -> Result<Self> {
        info!("Initializing wgpu backend");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let mut adapter = None;

        if let Some(gpu_name) = preferred_gpu.filter(|name| !name.is_empty()) {
            adapter = instance
                .enumerate_adapters(backends)
                .into_iter()
                .find(|a| a.get_info().name == gpu_name);
            match &adapter {
                Some(_) => info!("Found preferred adapter: {}", gpu_name),
                None => warn!(
                    "Preferred GPU '{}' not found, falling back to auto-selection.",
                    gpu_name
                ),
            }
        }

        if adapter.is_none() {
            // Discrete > Integrated > Virtual > CPU
            adapter = instance
                .enumerate_adapters(backends)
                .into_iter()
                .max_by_key(|a| match a.get_info().device_type {
                    wgpu::DeviceType::DiscreteGpu => 3,
                    wgpu::DeviceType::IntegratedGpu => 2,
                    wgpu::DeviceType::VirtualGpu => 1,
                    wgpu::DeviceType::Cpu | wgpu::DeviceType::Other => 0,
                });
        }

        if adapter.is_none() {
            adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok();
        }

        let adapter =
            adapter.ok_or_else(|| RenderError::DeviceError("No adapter found".to_string()))?;

        let adapter_info = adapter.get_info();
        info!(
            "Selected adapter: {} ({:?}, {:?})",
            adapter_info.name, adapter_info.device_type, adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Motion Replay Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                ..Default::default()
            })
            .await
            .map_err(|e: wgpu::RequestDeviceError| RenderError::DeviceError(e.to_string()))?;

        info!("Device created successfully");

        Ok(Self {
            instance: Arc::new(instance),
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
        })
    }

    /// Create a surface using the backend's instance
    pub fn create_surface(
        &self,
        window: Arc<winit::window::Window>,
    ) -> Result<wgpu::Surface<'static>> {
        self.instance
            .create_surface(window)
            .map_err(|e| RenderError::SurfaceError(format!("Failed to create surface: {}", e)))
    }

    /// Surface configuration for a `width` x `height` window
    ///
    /// Prefers an sRGB format among those the surface supports.
    pub fn surface_config(
        &self,
        surface: &wgpu::Surface<'_>,
        width: u32,
        height: u32,
    ) -> Result<wgpu::SurfaceConfiguration> {
        let capabilities = surface.get_capabilities(&self.adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| capabilities.formats.first().copied())
            .ok_or_else(|| {
                RenderError::SurfaceError("Surface is incompatible with the adapter".to_string())
            })?;

        Ok(wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Opaque),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        })
    }

    /// Get device limits
    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Get adapter info
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }
}

impl RenderBackend for WgpuBackend {
    fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}
