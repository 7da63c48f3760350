// ============================================================================
// RENDER TARGETS — capture / intermediate / result textures for one region
// ============================================================================

use std::sync::Arc;

use super::context::{BoundTarget, GpuContext};
use crate::error::BlurError;

/// WGPU requires `bytes_per_row` to be a multiple of 256.
pub const COPY_BYTES_PER_ROW_ALIGNMENT: u32 = 256;

/// 8-bit four-channel formats a region can be captured from.
pub fn is_capturable_format(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Rgba8Unorm
            | wgpu::TextureFormat::Rgba8UnormSrgb
            | wgpu::TextureFormat::Bgra8Unorm
            | wgpu::TextureFormat::Bgra8UnormSrgb
    )
}

/// A texture together with the shared views the passes bind.
pub struct TargetTexture {
    pub texture: Arc<wgpu::Texture>,
    pub view: Arc<wgpu::TextureView>,
}

impl TargetTexture {
    fn new(device: &wgpu::Device, width: u32, height: u32, format: wgpu::TextureFormat, usage: wgpu::TextureUsages, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture: Arc::new(texture),
            view: Arc::new(view),
        }
    }

    /// Bindable as a writable render target.
    pub fn as_target(&self) -> BoundTarget {
        BoundTarget::with_view(self.texture.clone(), self.view.clone())
    }
}

/// Three equally-sized textures.  Never partially valid: either all three
/// exist at `width × height`, or the set does not exist at all.
pub struct RenderTargetSet {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    /// Bumped on every allocation so hosts can re-register the result view.
    pub generation: u64,
    /// Copy destination only; sampled by the horizontal pass.
    pub capture: TargetTexture,
    /// Written by the horizontal pass, sampled by the vertical pass.
    pub intermediate: TargetTexture,
    /// Written by the vertical pass, sampled by the compositor.
    pub result: TargetTexture,
}

impl RenderTargetSet {
    /// Allocate all three textures.  Either every allocation succeeds or the
    /// partially built set is dropped here and nothing is returned.
    pub fn new(
        ctx: &GpuContext,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        generation: u64,
    ) -> Result<Self, BlurError> {
        if width == 0 || height == 0 {
            return Err(BlurError::InvalidRegion {
                width: width as i32,
                height: height as i32,
            });
        }
        if !ctx.supports_size(width, height) {
            return Err(BlurError::TargetTooLarge {
                width,
                height,
                max: ctx.max_texture_dim,
            });
        }
        if !is_capturable_format(format) {
            return Err(BlurError::UnsupportedFormat(format));
        }

        let device = &ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let capture = TargetTexture::new(
            device,
            width,
            height,
            format,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            "blur_capture",
        );
        let intermediate = TargetTexture::new(
            device,
            width,
            height,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            "blur_intermediate",
        );
        let result = TargetTexture::new(
            device,
            width,
            height,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            "blur_result",
        );

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(e) = out_of_memory.or(validation) {
            // capture / intermediate / result drop here: nothing from this
            // attempt outlives the failure.
            return Err(BlurError::TargetAllocation(e.to_string()));
        }

        Ok(Self {
            width,
            height,
            format,
            generation,
            capture,
            intermediate,
            result,
        })
    }

    pub fn matches(&self, width: u32, height: u32, format: wgpu::TextureFormat) -> bool {
        self.width == width && self.height == height && self.format == format
    }

    /// Copy the result texture back to tightly packed RGBA/BGRA bytes.
    pub fn read_result(&self, ctx: &GpuContext) -> Result<Vec<u8>, BlurError> {
        readback_texture(ctx, &self.result.texture, self.width, self.height)
    }
}

/// Bytes per row padded to wgpu's copy alignment.
pub fn aligned_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    unpadded.div_ceil(COPY_BYTES_PER_ROW_ALIGNMENT) * COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Synchronous readback of a whole texture, padding stripped.
pub fn readback_texture(
    ctx: &GpuContext,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, BlurError> {
    let device = &ctx.device;
    let queue = &ctx.queue;

    let bytes_per_row = aligned_bytes_per_row(width);
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("blur_readback_staging"),
        size: (bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("blur_readback_encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(BlurError::GpuValidation(format!("readback map error: {:?}", e))),
        Err(e) => return Err(BlurError::GpuValidation(format!("readback channel error: {:?}", e))),
    }

    let mapped = slice.get_mapped_range();
    let actual_row = (width * 4) as usize;
    let mut result = Vec::with_capacity(actual_row * height as usize);
    for y in 0..height as usize {
        let start = y * bytes_per_row as usize;
        result.extend_from_slice(&mapped[start..start + actual_row]);
    }
    drop(mapped);
    staging.unmap();

    Ok(result)
}
