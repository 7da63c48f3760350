// ============================================================================
// BLUR RENDERER — per-frame entry point for one blurred region
// ============================================================================
//
// Once per frame the host calls `render` with the region geometry and the
// "should blur" flag.  The activation state machine decides whether this
// frame allocates, captures and blurs; when a result is ready exactly one
// rounded image is handed to the draw target.
//
// GPU objects are owned here and dropped on replacement:
//   fixed    — shaders, quad, sampler, pipelines (once per device)
//   targets  — capture / intermediate / result (once per size + format)

use std::sync::{Arc, Weak};

use egui::{Color32, Pos2, Rect, Vec2};

use crate::activation::{Activation, ActivationState, FrameInput, RegionSize, Transition};
use crate::compositor::{CompositeImage, DrawTarget, FrameClock, FULL_UV};
use crate::error::BlurError;
use crate::gpu::blur::process_blur;
use crate::gpu::capture::capture_background;
use crate::gpu::context::GpuContext;
use crate::gpu::pipeline::FixedResources;
use crate::gpu::targets::RenderTargetSet;
use crate::settings::BlurSettings;

/// Everything one frame needs.  The context and draw target are borrowed for
/// the duration of the call only.
pub struct BlurParams<'a> {
    pub ctx: &'a mut GpuContext,
    pub draw_target: &'a mut dyn DrawTarget,
    pub clock: &'a dyn FrameClock,
    pub region_origin: Pos2,
    pub region_size: Vec2,
    /// Sampling-offset multiplier, not a bounded intensity.
    pub blur_strength: f32,
    pub corner_radius: f32,
    /// Seconds.
    pub settle_delay: f64,
}

impl<'a> BlurParams<'a> {
    /// Parameters with the default strength, corner radius and settle delay.
    pub fn new(
        ctx: &'a mut GpuContext,
        draw_target: &'a mut dyn DrawTarget,
        clock: &'a dyn FrameClock,
        region_origin: Pos2,
        region_size: Vec2,
    ) -> Self {
        let defaults = BlurSettings::default();
        Self {
            ctx,
            draw_target,
            clock,
            region_origin,
            region_size,
            blur_strength: defaults.blur_strength,
            corner_radius: defaults.corner_radius,
            settle_delay: defaults.settle_delay,
        }
    }

    pub fn with_settings(mut self, settings: &BlurSettings) -> Self {
        self.blur_strength = settings.blur_strength;
        self.corner_radius = settings.corner_radius;
        self.settle_delay = settings.settle_delay;
        self
    }
}

/// Whole-pixel size of a region, truncated toward zero.  Fails when either
/// side truncates to zero or less.
pub fn region_pixels(region_size: Vec2) -> Result<RegionSize, BlurError> {
    let width = region_size.x as i32;
    let height = region_size.y as i32;
    if width <= 0 || height <= 0 {
        return Err(BlurError::InvalidRegion { width, height });
    }
    Ok(RegionSize::new(width as u32, height as u32))
}

pub struct BlurRenderer {
    /// Identity of the device the GPU objects below belong to.
    device: Option<Weak<wgpu::Device>>,
    fixed: Option<FixedResources>,
    targets: Option<RenderTargetSet>,
    activation: Activation,
    generation: u64,
    allocation_count: u64,
    last_error: Option<BlurError>,
}

impl BlurRenderer {
    pub fn new() -> Self {
        Self {
            device: None,
            fixed: None,
            targets: None,
            activation: Activation::new(),
            generation: 0,
            allocation_count: 0,
            last_error: None,
        }
    }

    // ========================================================================
    // ENTRY POINTS
    // ========================================================================

    /// Run one frame.  Returns `false` on any failure; nothing is fatal and
    /// a failed frame simply draws no blur.
    pub fn render(&mut self, params: BlurParams<'_>, should_blur: bool) -> bool {
        self.try_render(params, should_blur).is_ok()
    }

    /// Like [`render`](Self::render) but says why a frame failed.
    pub fn try_render(&mut self, params: BlurParams<'_>, should_blur: bool) -> Result<(), BlurError> {
        let outcome = self.frame(params, should_blur);
        match &outcome {
            Ok(()) => self.last_error = None,
            Err(e) => {
                // Persistent failures repeat every frame; log each one once.
                if self.last_error.as_ref() != Some(e) {
                    crate::log_warn!("[Blur] Frame failed: {}", e);
                }
                self.last_error = Some(e.clone());
            }
        }
        outcome
    }

    fn frame(&mut self, params: BlurParams<'_>, should_blur: bool) -> Result<(), BlurError> {
        let BlurParams {
            ctx,
            draw_target,
            clock,
            region_origin,
            region_size,
            blur_strength,
            corner_radius,
            settle_delay,
        } = params;

        let size = region_pixels(region_size)?;

        self.sync_device(ctx);

        let decision = self.activation.advance(FrameInput {
            active: should_blur,
            size,
            now: clock.now(),
            settle_delay,
        });
        self.log_transition(size);

        if decision.release_targets && self.targets.take().is_some() {
            crate::log_info!("[Blur] Released render targets");
        }

        if decision.capture_due {
            let outcome = self.capture_and_blur(ctx, region_origin, region_size, size, blur_strength);
            self.activation.finish_capture(outcome.is_ok());
            self.log_transition(size);
            outcome?;
        }

        if self.activation.is_ready()
            && let Some(targets) = &self.targets
        {
            draw_target.add_image_rounded(&CompositeImage {
                view: &targets.result.view,
                generation: targets.generation,
                rect: Rect::from_min_size(region_origin, region_size),
                uv: FULL_UV,
                corner_radius,
                tint: Color32::WHITE,
            });
        }

        Ok(())
    }

    // ========================================================================
    // RESOURCE LIFECYCLE
    // ========================================================================

    /// Drop everything owned if the context now holds a different device.
    fn sync_device(&mut self, ctx: &GpuContext) {
        let same = self
            .device
            .as_ref()
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(&ctx.device)));
        if same {
            return;
        }
        if self.device.is_some() {
            crate::log_info!("[Blur] Device changed, rebuilding GPU resources");
            self.activation.invalidate_result();
        }
        self.fixed = None;
        self.targets = None;
        self.device = Some(Arc::downgrade(&ctx.device));
    }

    /// Reuse the current set if it already has this size and format;
    /// otherwise free it and allocate a fresh one.
    fn ensure_targets(
        &mut self,
        ctx: &GpuContext,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<(), BlurError> {
        if let Some(targets) = &self.targets
            && targets.matches(width, height, format)
        {
            return Ok(());
        }
        self.targets = None;

        let generation = self.generation + 1;
        let set = RenderTargetSet::new(ctx, width, height, format, generation)?;
        crate::log_info!(
            "[Blur] Allocated {}x{} {:?} render targets (generation {})",
            width,
            height,
            format,
            generation
        );
        self.generation = generation;
        self.allocation_count += 1;
        self.targets = Some(set);
        Ok(())
    }

    /// ensure → capture → blur, recorded into one encoder and submitted once.
    fn capture_and_blur(
        &mut self,
        ctx: &mut GpuContext,
        origin: Pos2,
        region_size: Vec2,
        size: RegionSize,
        blur_strength: f32,
    ) -> Result<(), BlurError> {
        let format = ctx.bound_target().ok_or(BlurError::NoBoundTarget)?.format();

        if self.fixed.is_none() {
            self.fixed = Some(FixedResources::new(&ctx.device)?);
        }
        self.ensure_targets(ctx, size.width, size.height, format)?;

        let Self {
            fixed: Some(fixed),
            targets: Some(targets),
            ..
        } = self
        else {
            return Err(BlurError::TargetAllocation(String::from("render targets missing after allocation")));
        };

        let device = ctx.device.clone();
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("backdrop_blur_encoder"),
        });

        let recorded = match capture_background(ctx, &mut encoder, targets, origin, region_size) {
            Ok(()) => process_blur(ctx, &mut encoder, fixed, targets, blur_strength),
            Err(e) => Err(e),
        };
        if recorded.is_ok() {
            ctx.submit_one(encoder);
        }

        let scope = pollster::block_on(device.pop_error_scope());
        recorded?;
        match scope {
            None => Ok(()),
            Some(e) => Err(BlurError::GpuValidation(e.to_string())),
        }
    }

    fn log_transition(&mut self, size: RegionSize) {
        match self.activation.take_transition() {
            Some(Transition::Activated) => {
                crate::log_info!("[Blur] Region {}x{} activated", size.width, size.height);
            }
            Some(Transition::Deactivated) => {
                crate::log_info!("[Blur] Region deactivated");
            }
            Some(Transition::Resized) => {
                crate::log_info!("[Blur] Region resized to {}x{}", size.width, size.height);
            }
            Some(Transition::BecameReady) => {
                crate::log_info!("[Blur] Blur result ready");
            }
            None => {}
        }
    }

    // ========================================================================
    // INTROSPECTION
    // ========================================================================

    pub fn state(&self) -> ActivationState {
        self.activation.state()
    }

    pub fn is_ready(&self) -> bool {
        self.activation.is_ready()
    }

    /// Size of the live render-target set, if one exists.
    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.targets.as_ref().map(|t| (t.width, t.height))
    }

    /// Generation of the live render-target set, if one exists.
    pub fn target_generation(&self) -> Option<u64> {
        self.targets.as_ref().map(|t| t.generation)
    }

    /// Render-target sets allocated over this renderer's lifetime.
    pub fn allocation_count(&self) -> u64 {
        self.allocation_count
    }

    /// Whether shaders and fixed state exist for the current device.
    pub fn has_fixed_resources(&self) -> bool {
        self.fixed.is_some()
    }

    /// Why the most recent frame failed; cleared by a successful frame.
    pub fn last_error(&self) -> Option<&BlurError> {
        self.last_error.as_ref()
    }

    /// The blurred result, only while ready.
    pub fn result_view(&self) -> Option<&wgpu::TextureView> {
        if !self.is_ready() {
            return None;
        }
        self.targets.as_ref().map(|t| t.result.view.as_ref())
    }

    /// Copy the ready result back to tightly packed 8-bit pixels in the
    /// target's channel order.  `Ok(None)` unless ready.
    pub fn read_result(&self, ctx: &GpuContext) -> Result<Option<Vec<u8>>, BlurError> {
        match &self.targets {
            Some(targets) if self.is_ready() => targets.read_result(ctx).map(Some),
            _ => Ok(None),
        }
    }
}

impl Default for BlurRenderer {
    fn default() -> Self {
        Self::new()
    }
}
