// ============================================================================
// BLUR PASSES — horizontal (capture → intermediate), vertical (→ result)
// ============================================================================
//
// Both passes draw the full-screen quad into the target currently bound on
// the context, sampling the currently bound input.  The caller's target and
// viewport are saved first and put back afterwards; the sampled input is
// left unbound.

use std::sync::Arc;

use super::context::{BoundTarget, GpuContext, Viewport};
use super::pipeline::{BlurConstants, FixedResources};
use super::targets::RenderTargetSet;
use crate::error::BlurError;

/// Record both passes into `encoder`.
pub fn process_blur(
    ctx: &mut GpuContext,
    encoder: &mut wgpu::CommandEncoder,
    fixed: &mut FixedResources,
    targets: &RenderTargetSet,
    blur_strength: f32,
) -> Result<(), BlurError> {
    fixed.ensure_pipelines(&ctx.device, targets.format)?;
    let fixed: &FixedResources = fixed;
    let pipelines = fixed
        .pipelines(targets.format)
        .ok_or_else(|| BlurError::ShaderCreation(format!("no pipelines for {:?}", targets.format)))?;

    // Uploaded once; shared by both passes.
    let constants = BlurConstants::new(targets.width, targets.height, blur_strength);
    ctx.queue
        .write_buffer(&fixed.constant_buffer, 0, bytemuck::bytes_of(&constants));

    let saved = ctx.save_bindings();
    let viewport = Viewport::full(targets.width, targets.height);

    ctx.bind_target(targets.intermediate.as_target());
    ctx.set_viewport(viewport);
    ctx.bind_input(targets.capture.view.clone());
    let mut outcome = draw_pass(ctx, encoder, fixed, &pipelines.horizontal, "blur_horizontal_pass");

    if outcome.is_ok() {
        ctx.bind_target(targets.result.as_target());
        ctx.set_viewport(viewport);
        ctx.bind_input(targets.intermediate.view.clone());
        outcome = draw_pass(ctx, encoder, fixed, &pipelines.vertical, "blur_vertical_pass");
    }

    ctx.restore_bindings(saved);
    ctx.unbind_input();
    outcome
}

/// One quad draw from the bound input into the bound target.
fn draw_pass(
    ctx: &GpuContext,
    encoder: &mut wgpu::CommandEncoder,
    fixed: &FixedResources,
    pipeline: &wgpu::RenderPipeline,
    label: &str,
) -> Result<(), BlurError> {
    let bindings = ctx.bindings();
    let target: &BoundTarget = bindings.target.as_ref().ok_or(BlurError::NoBoundTarget)?;
    let input: &Arc<wgpu::TextureView> = bindings.input.as_ref().ok_or(BlurError::NoBoundTarget)?;
    let viewport = bindings
        .viewport
        .unwrap_or_else(|| Viewport::full(target.width(), target.height()));

    let input_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("blur_input_bg"),
        layout: &fixed.texture_bgl,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(input),
        }],
    });

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &target.view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_viewport(
        viewport.x,
        viewport.y,
        viewport.width,
        viewport.height,
        viewport.min_depth,
        viewport.max_depth,
    );
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, &fixed.constants_bind_group, &[]);
    pass.set_bind_group(1, &input_bind_group, &[]);
    pass.set_vertex_buffer(0, fixed.vertex_buffer.slice(..));
    pass.draw(0..4, 0..1);

    Ok(())
}
