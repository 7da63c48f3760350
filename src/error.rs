// ============================================================================
// ERRORS — why a frame produced no blurred backdrop
// ============================================================================

/// Reasons the capture/blur path can fail for a frame.
///
/// None of these are fatal: the renderer stays in (or returns to) a
/// non-ready state and retries on a later frame.
#[derive(Debug, Clone, PartialEq)]
pub enum BlurError {
    /// Region width or height truncates to zero or less.
    InvalidRegion { width: i32, height: i32 },
    /// Shader modules, pipelines or fixed buffers could not be created.
    ShaderCreation(String),
    /// One of the three render-target textures could not be allocated.
    TargetAllocation(String),
    /// Region exceeds the device's maximum 2D texture dimension.
    TargetTooLarge { width: u32, height: u32, max: u32 },
    /// No writable target is bound on the context, nothing to capture from.
    NoBoundTarget,
    /// The bound target was created without `COPY_SRC` usage.
    TargetNotCopyable,
    /// The bound target is not an 8-bit four-channel colour format.
    UnsupportedFormat(wgpu::TextureFormat),
    /// Capture rectangle falls outside the bound target.
    RegionOutOfBounds {
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
        target_width: u32,
        target_height: u32,
    },
    /// wgpu reported a validation error while recording or submitting.
    GpuValidation(String),
}

impl std::fmt::Display for BlurError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlurError::InvalidRegion { width, height } => {
                write!(f, "invalid region size {}x{}", width, height)
            }
            BlurError::ShaderCreation(e) => write!(f, "shader/pipeline creation failed: {}", e),
            BlurError::TargetAllocation(e) => write!(f, "render target allocation failed: {}", e),
            BlurError::TargetTooLarge { width, height, max } => {
                write!(f, "region {}x{} exceeds max texture dimension {}", width, height, max)
            }
            BlurError::NoBoundTarget => write!(f, "no render target bound, cannot capture"),
            BlurError::TargetNotCopyable => {
                write!(f, "bound render target lacks COPY_SRC usage")
            }
            BlurError::UnsupportedFormat(format) => {
                write!(f, "unsupported render target format {:?}", format)
            }
            BlurError::RegionOutOfBounds {
                left,
                top,
                right,
                bottom,
                target_width,
                target_height,
            } => write!(
                f,
                "capture rect [{},{})-[{},{}) outside {}x{} target",
                left, top, right, bottom, target_width, target_height
            ),
            BlurError::GpuValidation(e) => write!(f, "GPU validation error: {}", e),
        }
    }
}

impl std::error::Error for BlurError {}
