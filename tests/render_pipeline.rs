// End-to-end frames through the real wgpu pipeline on a headless adapter.
// Every test returns early when no adapter (hardware or software) exists.

use std::sync::Arc;

use backdrop_blur::activation::ActivationState;
use backdrop_blur::gpu::pipeline::FixedResources;
use backdrop_blur::kernel::{self, RgbaImage};
use backdrop_blur::{
    BlurError, BlurParams, BlurRenderer, BlurSettings, BoundTarget, CompositeImage, DrawTarget, GpuContext,
    PainterTarget, ShapeTarget, Viewport,
};
use egui::{pos2, vec2, Pos2, Rect, Vec2};

const SOURCE_W: u32 = 400;
const SOURCE_H: u32 = 300;
const ORIGIN: Pos2 = pos2(40.0, 30.0);
const SIZE: Vec2 = vec2(200.0, 100.0);

#[derive(Clone, Copy, Debug, PartialEq)]
struct Draw {
    rect: Rect,
    uv: Rect,
    corner_radius: f32,
    generation: u64,
}

#[derive(Default)]
struct Recorder {
    draws: Vec<Draw>,
}

impl DrawTarget for Recorder {
    fn add_image_rounded(&mut self, image: &CompositeImage<'_>) {
        self.draws.push(Draw {
            rect: image.rect,
            uv: image.uv,
            corner_radius: image.corner_radius,
            generation: image.generation,
        });
    }
}

fn gpu() -> Option<GpuContext> {
    let ctx = GpuContext::new("");
    if ctx.is_none() {
        eprintln!("no wgpu adapter available, skipping");
    }
    ctx
}

fn source_texture(ctx: &GpuContext, usage: wgpu::TextureUsages) -> Arc<wgpu::Texture> {
    Arc::new(ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("test_frame"),
        size: wgpu::Extent3d {
            width: SOURCE_W,
            height: SOURCE_H,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage,
        view_formats: &[],
    }))
}

fn upload(ctx: &GpuContext, texture: &wgpu::Texture, pixel: impl Fn(u32, u32) -> [u8; 4]) {
    let mut data = Vec::with_capacity((SOURCE_W * SOURCE_H * 4) as usize);
    for y in 0..SOURCE_H {
        for x in 0..SOURCE_W {
            data.extend_from_slice(&pixel(x, y));
        }
    }
    ctx.queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(SOURCE_W * 4),
            rows_per_image: Some(SOURCE_H),
        },
        wgpu::Extent3d {
            width: SOURCE_W,
            height: SOURCE_H,
            depth_or_array_layers: 1,
        },
    );
}

/// A host frame: bound target with a flat colour, viewport covering it.
fn bind_flat_frame(ctx: &mut GpuContext, color: [u8; 4]) -> Arc<wgpu::Texture> {
    let texture = source_texture(
        ctx,
        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
    );
    upload(ctx, &texture, |_, _| color);
    ctx.bind_target(BoundTarget::new(texture.clone()));
    ctx.set_viewport(Viewport::full(SOURCE_W, SOURCE_H));
    texture
}

fn frame(
    renderer: &mut BlurRenderer,
    ctx: &mut GpuContext,
    recorder: &mut Recorder,
    now: f64,
    size: Vec2,
    active: bool,
) -> bool {
    let params = BlurParams::new(ctx, recorder, &now, ORIGIN, size);
    renderer.render(params, active)
}

fn assert_pixels_near(bytes: &[u8], expected: [u8; 4], tolerance: u8) {
    for (i, px) in bytes.chunks_exact(4).enumerate() {
        for c in 0..4 {
            assert!(
                px[c].abs_diff(expected[c]) <= tolerance,
                "pixel {} channel {}: {} vs {}",
                i,
                c,
                px[c],
                expected[c]
            );
        }
    }
}

#[test]
fn settle_delay_then_one_rounded_draw() {
    let Some(mut ctx) = gpu() else { return };
    bind_flat_frame(&mut ctx, [51, 102, 204, 255]);
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();

    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.0, SIZE, true));
    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.05, SIZE, true));
    assert!(rec.draws.is_empty());
    assert!(!renderer.is_ready());
    assert_eq!(renderer.target_size(), None);

    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.16, SIZE, true));
    assert!(renderer.is_ready());
    assert_eq!(rec.draws.len(), 1);
    let draw = rec.draws[0];
    assert_eq!(draw.rect, Rect::from_min_max(pos2(40.0, 30.0), pos2(240.0, 130.0)));
    assert_eq!(draw.uv, Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)));
    assert_eq!(draw.corner_radius, 6.0);
    assert_eq!(renderer.target_size(), Some((200, 100)));
}

#[test]
fn flat_colour_survives_the_blur() {
    let Some(mut ctx) = gpu() else { return };
    let color = [51, 102, 204, 255];
    bind_flat_frame(&mut ctx, color);
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();

    assert_eq!(renderer.read_result(&ctx), Ok(None));
    frame(&mut renderer, &mut ctx, &mut rec, 0.0, SIZE, true);
    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.2, SIZE, true));

    let bytes = renderer
        .read_result(&ctx)
        .expect("readback")
        .expect("ready result");
    assert_eq!(bytes.len(), 200 * 100 * 4);
    assert_pixels_near(&bytes, color, 1);
}

#[test]
fn gpu_output_tracks_cpu_reference() {
    let Some(mut ctx) = gpu() else { return };
    let texture = bind_flat_frame(&mut ctx, [0, 0, 0, 255]);
    // Vertical stripes, eight pixels wide.
    let stripe = |x: u32, _y: u32| -> [u8; 4] {
        if (x / 8) % 2 == 0 { [255, 255, 255, 255] } else { [0, 0, 0, 255] }
    };
    upload(&ctx, &texture, stripe);

    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();
    let size = vec2(64.0, 16.0);
    let params = BlurParams::new(&mut ctx, &mut rec, &0.0f64, pos2(0.0, 0.0), size);
    renderer.render(params, true);
    let params = BlurParams::new(&mut ctx, &mut rec, &1.0f64, pos2(0.0, 0.0), size);
    assert!(renderer.render(params, true));

    let bytes = renderer.read_result(&ctx).expect("readback").expect("ready result");

    let mut src = RgbaImage::filled(64, 16, [0.0; 4]);
    for y in 0..16 {
        for x in 0..64 {
            let p = stripe(x, y);
            src.set(x, y, p.map(|c| c as f32 / 255.0));
        }
    }
    let expected = kernel::blur_separable(&src, 0.95);
    for y in 0..16u32 {
        for x in 0..64u32 {
            let i = ((y * 64 + x) * 4) as usize;
            let want = expected.get(x, y);
            for c in 0..4 {
                let got = bytes[i + c] as f32 / 255.0;
                assert!(
                    (got - want[c]).abs() <= 3.0 / 255.0,
                    "({}, {}) channel {}: {} vs {}",
                    x,
                    y,
                    c,
                    got,
                    want[c]
                );
            }
        }
    }
}

#[test]
fn host_bindings_are_left_as_found() {
    let Some(mut ctx) = gpu() else { return };
    bind_flat_frame(&mut ctx, [10, 20, 30, 255]);
    let before = ctx.save_bindings();
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();

    frame(&mut renderer, &mut ctx, &mut rec, 0.0, SIZE, true);
    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.2, SIZE, true));
    assert!(renderer.is_ready());
    assert!(ctx.bindings().matches(&before));
    assert!(ctx.bindings().input.is_none());
}

#[test]
fn repeated_frames_reuse_the_allocation() {
    let Some(mut ctx) = gpu() else { return };
    bind_flat_frame(&mut ctx, [10, 20, 30, 255]);
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();

    frame(&mut renderer, &mut ctx, &mut rec, 0.0, SIZE, true);
    for i in 0..5 {
        assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.2 + i as f64 * 0.016, SIZE, true));
    }
    assert_eq!(renderer.allocation_count(), 1);
    assert_eq!(rec.draws.len(), 5);
    assert!(rec.draws.iter().all(|d| d.generation == rec.draws[0].generation));
}

#[test]
fn reactivation_captures_again() {
    let Some(mut ctx) = gpu() else { return };
    let texture = bind_flat_frame(&mut ctx, [255, 0, 0, 255]);
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();

    frame(&mut renderer, &mut ctx, &mut rec, 0.0, SIZE, true);
    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.2, SIZE, true));
    let first = renderer.read_result(&ctx).expect("readback").expect("ready");
    assert_pixels_near(&first, [255, 0, 0, 255], 1);

    // Falling edge: readiness drops at once, the allocation is kept.
    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.3, SIZE, false));
    assert!(!renderer.is_ready());
    assert_eq!(renderer.target_size(), Some((200, 100)));
    assert_eq!(renderer.read_result(&ctx), Ok(None));
    let draws_before = rec.draws.len();

    upload(&ctx, &texture, |_, _| [0, 0, 255, 255]);
    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.4, SIZE, true));
    assert_eq!(rec.draws.len(), draws_before);
    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.56, SIZE, true));
    assert!(renderer.is_ready());

    let second = renderer.read_result(&ctx).expect("readback").expect("ready");
    assert_pixels_near(&second, [0, 0, 255, 255], 1);
    assert_eq!(renderer.allocation_count(), 1);
}

#[test]
fn resize_reallocates_at_the_new_size() {
    let Some(mut ctx) = gpu() else { return };
    bind_flat_frame(&mut ctx, [10, 20, 30, 255]);
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();

    frame(&mut renderer, &mut ctx, &mut rec, 0.0, SIZE, true);
    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.2, SIZE, true));
    let first_generation = renderer.target_generation();

    let taller = vec2(200.0, 150.0);
    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.3, taller, true));
    assert!(!renderer.is_ready());
    assert_eq!(renderer.target_size(), None);
    assert_eq!(renderer.state(), ActivationState::PendingCapture { since: 0.3 });

    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.46, taller, true));
    assert!(renderer.is_ready());
    assert_eq!(renderer.target_size(), Some((200, 150)));
    assert_ne!(renderer.target_generation(), first_generation);
    assert_eq!(renderer.allocation_count(), 2);
}

#[test]
fn device_switch_rebuilds_everything() {
    let Some(mut first) = gpu() else { return };
    let Some(mut second) = gpu() else { return };
    bind_flat_frame(&mut first, [10, 20, 30, 255]);
    bind_flat_frame(&mut second, [10, 20, 30, 255]);
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();

    frame(&mut renderer, &mut first, &mut rec, 0.0, SIZE, true);
    assert!(frame(&mut renderer, &mut first, &mut rec, 0.2, SIZE, true));
    assert_eq!(renderer.allocation_count(), 1);

    // The episode already settled, so the new device captures right away.
    assert!(frame(&mut renderer, &mut second, &mut rec, 0.25, SIZE, true));
    assert!(renderer.is_ready());
    assert!(renderer.has_fixed_resources());
    assert_eq!(renderer.allocation_count(), 2);
    assert!(renderer.read_result(&second).expect("readback").is_some());
}

#[test]
fn missing_bound_target_fails_and_retries() {
    let Some(mut ctx) = gpu() else { return };
    bind_flat_frame(&mut ctx, [10, 20, 30, 255]);
    ctx.unbind_target();
    assert!(ctx.bound_target().is_none());
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();

    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.0, SIZE, true));
    assert!(!frame(&mut renderer, &mut ctx, &mut rec, 0.2, SIZE, true));
    assert_eq!(renderer.last_error(), Some(&BlurError::NoBoundTarget));
    assert_eq!(renderer.state(), ActivationState::PendingCapture { since: 0.0 });
    assert!(rec.draws.is_empty());

    bind_flat_frame(&mut ctx, [10, 20, 30, 255]);
    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.22, SIZE, true));
    assert!(renderer.is_ready());
    assert!(renderer.last_error().is_none());
}

#[test]
fn non_copyable_target_is_reported() {
    let Some(mut ctx) = gpu() else { return };
    let texture = source_texture(&ctx, wgpu::TextureUsages::RENDER_ATTACHMENT);
    ctx.bind_target(BoundTarget::new(texture));
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();

    frame(&mut renderer, &mut ctx, &mut rec, 0.0, SIZE, true);
    assert!(!frame(&mut renderer, &mut ctx, &mut rec, 0.2, SIZE, true));
    assert_eq!(renderer.last_error(), Some(&BlurError::TargetNotCopyable));
    assert!(!renderer.is_ready());
}

#[test]
fn region_past_the_target_edge_is_rejected() {
    let Some(mut ctx) = gpu() else { return };
    bind_flat_frame(&mut ctx, [10, 20, 30, 255]);
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();
    let origin = pos2(300.0, 250.0);

    let params = BlurParams::new(&mut ctx, &mut rec, &0.0f64, origin, SIZE);
    renderer.render(params, true);
    let params = BlurParams::new(&mut ctx, &mut rec, &0.2f64, origin, SIZE);
    assert!(!renderer.render(params, true));
    assert!(matches!(
        renderer.last_error(),
        Some(BlurError::RegionOutOfBounds { right: 500, bottom: 350, .. })
    ));
    assert!(matches!(renderer.state(), ActivationState::PendingCapture { .. }));
}

#[test]
fn degenerate_region_changes_nothing() {
    let Some(mut ctx) = gpu() else { return };
    bind_flat_frame(&mut ctx, [10, 20, 30, 255]);
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();

    frame(&mut renderer, &mut ctx, &mut rec, 0.0, SIZE, true);
    assert!(!frame(&mut renderer, &mut ctx, &mut rec, 0.05, vec2(0.5, 100.0), true));
    assert_eq!(
        renderer.last_error(),
        Some(&BlurError::InvalidRegion { width: 0, height: 100 })
    );
    // The rejected frame neither resized nor advanced the episode.
    assert_eq!(renderer.state(), ActivationState::PendingCapture { since: 0.0 });
    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.2, SIZE, true));
    assert!(renderer.is_ready());
}

#[test]
fn failed_allocation_leaves_no_targets_behind() {
    let Some(mut ctx) = gpu() else { return };
    bind_flat_frame(&mut ctx, [10, 20, 30, 255]);
    let limit = ctx.device.limits().max_texture_dimension_2d;
    // Let the region past the up-front size check so the device rejects it.
    ctx.max_texture_dim = limit + 16;
    let too_wide = vec2((limit + 16) as f32, 4.0);
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();

    frame(&mut renderer, &mut ctx, &mut rec, 0.0, too_wide, true);
    assert!(!frame(&mut renderer, &mut ctx, &mut rec, 0.2, too_wide, true));
    assert!(matches!(renderer.last_error(), Some(BlurError::TargetAllocation(_))));
    assert_eq!(renderer.target_size(), None);
    assert_eq!(renderer.target_generation(), None);
    assert_eq!(renderer.allocation_count(), 0);
    assert_eq!(renderer.state(), ActivationState::PendingCapture { since: 0.0 });

    // Next frame retries without restarting the delay.
    assert!(!frame(&mut renderer, &mut ctx, &mut rec, 0.21, too_wide, true));
    assert_eq!(renderer.state(), ActivationState::PendingCapture { since: 0.0 });
    assert!(rec.draws.is_empty());
}

#[test]
fn pipelines_are_cached_per_format() {
    let Some(ctx) = gpu() else { return };
    let mut fixed = FixedResources::new(&ctx.device).expect("fixed resources");
    assert_eq!(fixed.pipeline_count(), 0);
    assert!(fixed.pipelines(wgpu::TextureFormat::Rgba8Unorm).is_none());

    fixed
        .ensure_pipelines(&ctx.device, wgpu::TextureFormat::Rgba8Unorm)
        .expect("rgba pipelines");
    fixed
        .ensure_pipelines(&ctx.device, wgpu::TextureFormat::Rgba8Unorm)
        .expect("cached rgba pipelines");
    assert_eq!(fixed.pipeline_count(), 1);
    assert!(fixed.pipelines(wgpu::TextureFormat::Rgba8Unorm).is_some());

    fixed
        .ensure_pipelines(&ctx.device, wgpu::TextureFormat::Bgra8Unorm)
        .expect("bgra pipelines");
    assert_eq!(fixed.pipeline_count(), 2);
}

#[test]
fn settings_override_delay_and_corner_radius() {
    let Some(mut ctx) = gpu() else { return };
    bind_flat_frame(&mut ctx, [10, 20, 30, 255]);
    let settings = BlurSettings {
        blur_strength: 2.0,
        corner_radius: 12.0,
        settle_delay: 0.5,
    };
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();

    for now in [0.0f64, 0.3, 0.5] {
        let params = BlurParams::new(&mut ctx, &mut rec, &now, ORIGIN, SIZE).with_settings(&settings);
        assert!(renderer.render(params, true));
        if now < 0.5 {
            assert!(rec.draws.is_empty());
        }
    }
    assert_eq!(rec.draws.len(), 1);
    assert_eq!(rec.draws[0].corner_radius, 12.0);
}

#[test]
fn shape_target_collects_one_shape_per_ready_frame() {
    let Some(mut ctx) = gpu() else { return };
    bind_flat_frame(&mut ctx, [10, 20, 30, 255]);
    let mut renderer = BlurRenderer::new();
    let mut registered = Vec::new();
    let mut target = ShapeTarget::new(|_: &wgpu::TextureView, generation: u64| {
        registered.push(generation);
        egui::TextureId::User(generation)
    });

    let params = BlurParams::new(&mut ctx, &mut target, &0.0f64, ORIGIN, SIZE);
    assert!(renderer.render(params, true));
    assert!(target.take_shapes().is_empty());

    for now in [0.2f64, 0.3] {
        let params = BlurParams::new(&mut ctx, &mut target, &now, ORIGIN, SIZE);
        assert!(renderer.render(params, true));
        let shapes = target.take_shapes();
        assert_eq!(shapes.len(), 1);
        let egui::Shape::Rect(rect) = &shapes[0] else {
            panic!("expected a rect shape");
        };
        assert_eq!(rect.rect, Rect::from_min_size(ORIGIN, SIZE));
        assert_eq!(rect.rounding, egui::Rounding::same(6.0));
        assert_eq!(rect.fill_texture_id, egui::TextureId::User(1));
    }
    assert!(target.shapes.is_empty());
    drop(target);
    assert_eq!(registered, vec![1, 1]);
}

#[test]
fn painter_target_paints_one_shape_per_ready_frame() {
    let Some(mut ctx) = gpu() else { return };
    bind_flat_frame(&mut ctx, [10, 20, 30, 255]);
    let mut renderer = BlurRenderer::new();
    let mut rec = Recorder::default();
    frame(&mut renderer, &mut ctx, &mut rec, 0.0, SIZE, true);
    assert!(frame(&mut renderer, &mut ctx, &mut rec, 0.2, SIZE, true));

    let egui_ctx = egui::Context::default();
    egui_ctx.begin_frame(egui::RawInput::default());
    let painter = egui::Painter::new(egui_ctx.clone(), egui::LayerId::background(), Rect::EVERYTHING);
    let mut registrations = 0;
    {
        let mut target = PainterTarget::new(&painter, |_: &wgpu::TextureView, _: u64| {
            registrations += 1;
            egui::TextureId::User(1)
        });
        let params = BlurParams::new(&mut ctx, &mut target, &0.3f64, ORIGIN, SIZE);
        assert!(renderer.render(params, true));
    }
    let output = egui_ctx.end_frame();
    assert_eq!(registrations, 1);
    assert_eq!(output.shapes.len(), 1);
}
