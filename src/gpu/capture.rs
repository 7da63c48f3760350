// ============================================================================
// CAPTURE — copy the already-rendered frame under the region
// ============================================================================

use super::context::GpuContext;
use super::targets::RenderTargetSet;
use crate::error::BlurError;

/// Source rectangle of the region copy, in target pixels (right/bottom
/// exclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CaptureRect {
    /// `[origin, origin + size)` with the left/top edges clamped to zero.
    /// Right/bottom are not clamped against the target.
    pub fn from_region(origin: egui::Pos2, size: egui::Vec2) -> Self {
        Self {
            left: origin.x.max(0.0) as u32,
            top: origin.y.max(0.0) as u32,
            right: (origin.x + size.x) as u32,
            bottom: (origin.y + size.y) as u32,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Whether the rectangle lies inside a `width × height` source and is
    /// non-empty.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width() > 0 && self.height() > 0 && self.right <= width && self.bottom <= height
    }
}

/// Record the copy of the region under `origin`/`size` from the currently
/// bound target into `targets.capture` at (0,0).
///
/// The bound target is queried fresh from the context and the reference is
/// released before returning.
pub fn capture_background(
    ctx: &GpuContext,
    encoder: &mut wgpu::CommandEncoder,
    targets: &RenderTargetSet,
    origin: egui::Pos2,
    size: egui::Vec2,
) -> Result<(), BlurError> {
    let source = ctx.bound_target().ok_or(BlurError::NoBoundTarget)?;
    if !source.texture.usage().contains(wgpu::TextureUsages::COPY_SRC) {
        return Err(BlurError::TargetNotCopyable);
    }
    if source.format() != targets.format {
        return Err(BlurError::UnsupportedFormat(source.format()));
    }

    let rect = CaptureRect::from_region(origin, size);
    if !rect.fits_within(source.width(), source.height()) {
        return Err(BlurError::RegionOutOfBounds {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
            target_width: source.width(),
            target_height: source.height(),
        });
    }

    // Truncating origin and size separately can overshoot the capture
    // texture by a pixel.
    let copy_width = rect.width().min(targets.width);
    let copy_height = rect.height().min(targets.height);

    encoder.copy_texture_to_texture(
        wgpu::ImageCopyTexture {
            texture: &source.texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: rect.left,
                y: rect.top,
                z: 0,
            },
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyTexture {
            texture: &targets.capture.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::Extent3d {
            width: copy_width,
            height: copy_height,
            depth_or_array_layers: 1,
        },
    );

    Ok(())
}
