// ============================================================================
// BLUR KERNEL — fixed 9-tap Gaussian weights + CPU reference passes
// ============================================================================
//
// The WGSL programs in `gpu/shaders.rs` evaluate exactly these weights per
// fragment.  The CPU passes below mirror what the GPU computes (including
// linear clamp-to-edge sampling) so kernel behaviour can be checked without
// a device.

/// Kernel radius in taps.  The kernel spans `-RADIUS..=RADIUS`.
pub const KERNEL_RADIUS: i32 = 4;

/// Number of taps sampled per output pixel, per pass.
pub const TAP_COUNT: usize = (KERNEL_RADIUS * 2 + 1) as usize;

/// Unnormalised weight of tap `i`: `exp(-0.5 * i² / (r² * 0.5))`.
pub fn tap_weight(i: i32) -> f32 {
    let r2 = (KERNEL_RADIUS * KERNEL_RADIUS) as f32;
    (-0.5 * (i * i) as f32 / (r2 * 0.5)).exp()
}

/// All tap weights, index 0 being tap `-RADIUS`.
pub fn tap_weights() -> [f32; TAP_COUNT] {
    let mut weights = [0.0; TAP_COUNT];
    for (slot, i) in weights.iter_mut().zip(-KERNEL_RADIUS..=KERNEL_RADIUS) {
        *slot = tap_weight(i);
    }
    weights
}

/// Sum of all tap weights.  Always > 0 since the centre tap weighs 1.
pub fn weight_sum() -> f32 {
    tap_weights().iter().sum()
}

/// Sampling offset of tap `i` in UV units along one axis.
///
/// `strength` scales the spacing between taps, so larger values widen the
/// blur rather than deepen it.
pub fn tap_offset(i: i32, axis_len: u32, strength: f32) -> f32 {
    (1.0 / axis_len as f32) * i as f32 * strength
}

/// An RGBA float image, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 4]>,
}

impl RgbaImage {
    pub fn filled(width: u32, height: u32, color: [f32; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; (width * height) as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> [f32; 4] {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: [f32; 4]) {
        self.pixels[(y * self.width + x) as usize] = color;
    }
}

/// Linear sample of a 1D run of texels at normalised coordinate `u`,
/// clamp-to-edge.  Matches a bilinear sampler along a single axis.
fn sample_linear(len: u32, u: f32, fetch: impl Fn(u32) -> [f32; 4]) -> [f32; 4] {
    let texel = u.clamp(0.0, 1.0) * len as f32 - 0.5;
    let base = texel.floor();
    let frac = texel - base;
    let last = len as i64 - 1;
    let i0 = (base as i64).clamp(0, last) as u32;
    let i1 = (base as i64 + 1).clamp(0, last) as u32;
    let a = fetch(i0);
    let b = fetch(i1);
    let mut out = [0.0; 4];
    for c in 0..4 {
        out[c] = a[c] + (b[c] - a[c]) * frac;
    }
    out
}

fn convolve(len: u32, center_uv: f32, strength: f32, fetch: impl Fn(u32) -> [f32; 4]) -> [f32; 4] {
    let mut color = [0.0f32; 4];
    let mut total = 0.0f32;
    for i in -KERNEL_RADIUS..=KERNEL_RADIUS {
        let u = (center_uv + tap_offset(i, len, strength)).clamp(0.0, 1.0);
        let weight = tap_weight(i);
        let sample = sample_linear(len, u, &fetch);
        for c in 0..4 {
            color[c] += sample[c] * weight;
        }
        total += weight;
    }
    color.map(|c| c / total)
}

/// CPU reference of the horizontal pass: each output pixel only reads its
/// own row.
pub fn blur_horizontal(src: &RgbaImage, strength: f32) -> RgbaImage {
    let mut out = RgbaImage::filled(src.width, src.height, [0.0; 4]);
    for y in 0..src.height {
        for x in 0..src.width {
            let u = (x as f32 + 0.5) / src.width as f32;
            let color = convolve(src.width, u, strength, |sx| src.get(sx, y));
            out.set(x, y, color);
        }
    }
    out
}

/// CPU reference of the vertical pass: each output pixel only reads its
/// own column.
pub fn blur_vertical(src: &RgbaImage, strength: f32) -> RgbaImage {
    let mut out = RgbaImage::filled(src.width, src.height, [0.0; 4]);
    for y in 0..src.height {
        for x in 0..src.width {
            let v = (y as f32 + 0.5) / src.height as f32;
            let color = convolve(src.height, v, strength, |sy| src.get(x, sy));
            out.set(x, y, color);
        }
    }
    out
}

/// Both passes, horizontal then vertical.
pub fn blur_separable(src: &RgbaImage, strength: f32) -> RgbaImage {
    blur_vertical(&blur_horizontal(src, strength), strength)
}
