// ============================================================================
// GPU CONTEXT — wgpu Device, Queue, and the host's frame bindings
// ============================================================================

use std::sync::Arc;

/// A writable render target the host is currently drawing into.
#[derive(Clone)]
pub struct BoundTarget {
    pub texture: Arc<wgpu::Texture>,
    pub view: Arc<wgpu::TextureView>,
}

impl BoundTarget {
    /// Bind a whole texture with a default view.
    pub fn new(texture: Arc<wgpu::Texture>) -> Self {
        let view = Arc::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        Self { texture, view }
    }

    pub fn with_view(texture: Arc<wgpu::Texture>, view: Arc<wgpu::TextureView>) -> Self {
        Self { texture, view }
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }

    /// Same texture and same view as `other`.
    pub fn same_as(&self, other: &BoundTarget) -> bool {
        Arc::ptr_eq(&self.texture, &other.texture) && Arc::ptr_eq(&self.view, &other.view)
    }
}

/// Viewport rectangle in target pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Covers a `width × height` target from the origin.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Binding state the host keeps current while it records a frame.
///
/// wgpu scopes targets to individual render passes, so there is no global
/// "currently bound" target to query.  Hosts mirror theirs here; the blur
/// renderer reads it to find the frame it captures from and leaves it
/// exactly as it found it.
#[derive(Clone, Default)]
pub struct FrameBindings {
    pub target: Option<BoundTarget>,
    pub viewport: Option<Viewport>,
    /// Texture currently bound as a sampled input.
    pub input: Option<Arc<wgpu::TextureView>>,
}

impl FrameBindings {
    /// Same target, viewport and input as `other` (pointer identity for GPU
    /// objects).
    pub fn matches(&self, other: &FrameBindings) -> bool {
        let target = match (&self.target, &other.target) {
            (Some(a), Some(b)) => a.same_as(b),
            (None, None) => true,
            _ => false,
        };
        let input = match (&self.input, &other.input) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        target && input && self.viewport == other.viewport
    }
}

/// Holds the core wgpu resources the renderer draws with.
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_name: String,
    /// Maximum texture dimension supported by this device.
    pub max_texture_dim: u32,
    bindings: FrameBindings,
}

impl GpuContext {
    /// Attempt to create a GPU context.  Tries hardware first, then falls
    /// back to a software rasterizer (`force_fallback_adapter`).
    pub fn new(preferred_gpu: &str) -> Option<Self> {
        // 1. Try hardware adapter.
        if let Some(ctx) = pollster::block_on(Self::new_async(preferred_gpu, false)) {
            return Some(ctx);
        }
        // 2. Fallback: software rasterizer.
        crate::log_warn!("[GPU] Hardware adapter unavailable — trying software fallback");
        pollster::block_on(Self::new_async(preferred_gpu, true))
    }

    /// Wrap a device and queue the host already owns.
    pub fn from_device(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let max_texture_dim = device.limits().max_texture_dimension_2d;
        Self {
            device,
            queue,
            adapter_name: String::from("host device"),
            max_texture_dim,
            bindings: FrameBindings::default(),
        }
    }

    async fn new_async(preferred_gpu: &str, force_fallback: bool) -> Option<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Pick power preference from settings string.
        let power = match preferred_gpu.to_lowercase().as_str() {
            "low power" | "integrated" => wgpu::PowerPreference::LowPower,
            "high performance" | "discrete" => wgpu::PowerPreference::HighPerformance,
            _ => wgpu::PowerPreference::HighPerformance,
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power,
                compatible_surface: None, // headless — offscreen targets only
                force_fallback_adapter: force_fallback,
            })
            .await?;

        let adapter_name = adapter.get_info().name.clone();
        let limits = adapter.limits();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("backdrop-blur GPU"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits {
                        max_texture_dimension_2d: limits.max_texture_dimension_2d,
                        ..wgpu::Limits::downlevel_defaults()
                    },
                },
                None,
            )
            .await
            .ok()?;

        crate::log_info!("[GPU] Using adapter '{}'", adapter_name);

        Some(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name,
            max_texture_dim: limits.max_texture_dimension_2d,
            bindings: FrameBindings::default(),
        })
    }

    /// Check if a texture of the given dimensions can be created.
    pub fn supports_size(&self, width: u32, height: u32) -> bool {
        width <= self.max_texture_dim && height <= self.max_texture_dim
    }

    /// Submit a single encoder's commands.
    pub fn submit_one(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    // ---- Frame bindings -------------------------------------------------

    pub fn bindings(&self) -> &FrameBindings {
        &self.bindings
    }

    /// The writable target currently bound, if any.  Returns a new reference;
    /// dropping it releases nothing the context still needs.
    pub fn bound_target(&self) -> Option<BoundTarget> {
        self.bindings.target.clone()
    }

    pub fn bind_target(&mut self, target: BoundTarget) {
        self.bindings.target = Some(target);
    }

    pub fn unbind_target(&mut self) {
        self.bindings.target = None;
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.bindings.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.bindings.viewport = Some(viewport);
    }

    pub fn bind_input(&mut self, view: Arc<wgpu::TextureView>) {
        self.bindings.input = Some(view);
    }

    pub fn unbind_input(&mut self) {
        self.bindings.input = None;
    }

    /// Snapshot the target and viewport so they can be put back later.
    pub fn save_bindings(&self) -> FrameBindings {
        self.bindings.clone()
    }

    /// Put back a snapshot taken by [`save_bindings`](Self::save_bindings).
    pub fn restore_bindings(&mut self, saved: FrameBindings) {
        self.bindings = saved;
    }
}
