// ============================================================================
// GPU MODULE — device-bound objects of the backdrop blur
// ============================================================================
//
// Architecture:
//   context.rs  — wgpu Device, Queue, adapter init, host frame bindings
//   shaders.rs  — all WGSL shader source (inline strings)
//   pipeline.rs — fixed resources: quad, sampler, blend, per-format pipelines
//   targets.rs  — capture / intermediate / result texture set + readback
//   capture.rs  — region copy out of the bound target
//   blur.rs     — horizontal + vertical passes with binding save/restore
// ============================================================================

pub mod blur;
pub mod capture;
pub mod context;
pub mod pipeline;
pub mod shaders;
pub mod targets;

pub use context::{BoundTarget, FrameBindings, GpuContext, Viewport};
pub use targets::COPY_BYTES_PER_ROW_ALIGNMENT;
