//! Frosted-glass backdrop blur for immediate-mode UIs on wgpu.
//!
//! A [`BlurRenderer`] owns the GPU objects for one screen region.  Each frame
//! the host calls [`BlurRenderer::render`] with the region geometry and a
//! "should blur" flag; after the flag has been held for the settle delay the
//! frame content under the region is copied, blurred with a two-pass
//! separable kernel, and handed back to the host as one rounded image.
//!
//! ```no_run
//! # use backdrop_blur::*;
//! # fn frame(ctx: &mut GpuContext, egui_ctx: &egui::Context, painter: &egui::Painter,
//! #          register: impl FnMut(&wgpu::TextureView, u64) -> egui::TextureId,
//! #          renderer: &mut BlurRenderer, panel: egui::Rect, open: bool) {
//! let mut target = PainterTarget::new(painter, register);
//! let params = BlurParams::new(ctx, &mut target, egui_ctx, panel.min, panel.size());
//! renderer.render(params, open);
//! # }
//! ```

pub mod logger;

pub mod activation;
pub mod compositor;
pub mod error;
pub mod gpu;
pub mod kernel;
pub mod renderer;
pub mod settings;

pub use activation::{ActivationState, RegionSize};
pub use compositor::{
    CompositeImage, DrawTarget, FrameClock, MonotonicClock, PainterTarget, ShapeTarget, TextureRegistrar,
};
pub use error::BlurError;
pub use gpu::{BoundTarget, FrameBindings, GpuContext, Viewport};
pub use renderer::{BlurParams, BlurRenderer};
pub use settings::BlurSettings;
