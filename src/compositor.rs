// ============================================================================
// COMPOSITOR HOOKUP — hand the ready result to the host's drawing layer
// ============================================================================
//
// The renderer never draws to the screen itself.  When a result is ready it
// describes one rounded image and passes it to a `DrawTarget`; turning that
// into pixels is the host's job.

use std::time::Instant;

use egui::{Color32, Rect, Shape, TextureId};

/// Full texture mapping, (0,0) top-left to (1,1) bottom-right.
pub const FULL_UV: Rect = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

/// One rounded-image draw of the blurred result.
#[derive(Clone, Copy, Debug)]
pub struct CompositeImage<'a> {
    pub view: &'a wgpu::TextureView,
    /// Changes every time the render targets are reallocated.
    pub generation: u64,
    /// Region rectangle in screen points.
    pub rect: Rect,
    pub uv: Rect,
    pub corner_radius: f32,
    pub tint: Color32,
}

/// Receives the composite primitive once per ready frame.
pub trait DrawTarget {
    fn add_image_rounded(&mut self, image: &CompositeImage<'_>);
}

/// Maps a native result view to an egui texture id.
///
/// Hosts using egui-wgpu typically register the view with their renderer and
/// cache the id per `generation`.
pub trait TextureRegistrar {
    fn texture_id(&mut self, view: &wgpu::TextureView, generation: u64) -> TextureId;
}

impl<F> TextureRegistrar for F
where
    F: FnMut(&wgpu::TextureView, u64) -> TextureId,
{
    fn texture_id(&mut self, view: &wgpu::TextureView, generation: u64) -> TextureId {
        self(view, generation)
    }
}

/// Textured rounded rectangle covering `rect`.
pub fn rounded_image_shape(
    texture_id: TextureId,
    rect: Rect,
    uv: Rect,
    corner_radius: f32,
    tint: Color32,
) -> Shape {
    let mut shape = egui::epaint::RectShape::filled(rect, egui::Rounding::same(corner_radius), tint);
    shape.fill_texture_id = texture_id;
    shape.uv = uv;
    Shape::Rect(shape)
}

/// Draws straight into an egui painter.
pub struct PainterTarget<'p, R: TextureRegistrar> {
    painter: &'p egui::Painter,
    registrar: R,
}

impl<'p, R: TextureRegistrar> PainterTarget<'p, R> {
    pub fn new(painter: &'p egui::Painter, registrar: R) -> Self {
        Self { painter, registrar }
    }
}

impl<R: TextureRegistrar> DrawTarget for PainterTarget<'_, R> {
    fn add_image_rounded(&mut self, image: &CompositeImage<'_>) {
        let id = self.registrar.texture_id(image.view, image.generation);
        self.painter.add(rounded_image_shape(
            id,
            image.rect,
            image.uv,
            image.corner_radius,
            image.tint,
        ));
    }
}

/// Collects shapes for hosts that build their own shape lists.
pub struct ShapeTarget<R: TextureRegistrar> {
    pub shapes: Vec<Shape>,
    registrar: R,
}

impl<R: TextureRegistrar> ShapeTarget<R> {
    pub fn new(registrar: R) -> Self {
        Self {
            shapes: Vec::new(),
            registrar,
        }
    }

    pub fn take_shapes(&mut self) -> Vec<Shape> {
        std::mem::take(&mut self.shapes)
    }
}

impl<R: TextureRegistrar> DrawTarget for ShapeTarget<R> {
    fn add_image_rounded(&mut self, image: &CompositeImage<'_>) {
        let id = self.registrar.texture_id(image.view, image.generation);
        self.shapes.push(rounded_image_shape(
            id,
            image.rect,
            image.uv,
            image.corner_radius,
            image.tint,
        ));
    }
}

// ============================================================================
// FRAME CLOCK
// ============================================================================

/// Monotonic seconds, non-decreasing across calls.
pub trait FrameClock {
    fn now(&self) -> f64;
}

impl FrameClock for egui::Context {
    fn now(&self) -> f64 {
        self.input(|i| i.time)
    }
}

/// A fixed time, for hosts that already sampled their clock.
impl FrameClock for f64 {
    fn now(&self) -> f64 {
        *self
    }
}

/// Seconds since construction.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for MonotonicClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
