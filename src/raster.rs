//! Rasterizer / Compositor
//!
//! Maps each draw instruction's destination footprint to source samples
//! (rotation, scale, mirror), then composites pixel-by-pixel: lighting
//! multiply, alpha blending, optional blend mode, and the stage's filter
//! chain. All writes are bounds-checked and clamped; the output buffer is
//! always fully opaque.

use crate::frame::FrameBuffer;
use crate::instruction::BlendMode;
use crate::lighting::Lighting;
use crate::texture::Texture;
use crate::util::{weighted_blend, Rgb, Rng};

// ============================================================================
// Pixel Filters
// ============================================================================

/// A post-process filter applied to every composited pixel, in chain order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFilter {
    Red,
    Cyan,
    Blue,
    Green,
    Crt,
    Lcd,
    Grid,
    Noise,
    Film,
    Mono,
    Invert,
    Sepia,
    SepiaAlt,
}

impl PixelFilter {
    /// Parse a filter name. Unknown names map to None and are skipped.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "red" => Some(Self::Red),
            "cyan" => Some(Self::Cyan),
            "blue" => Some(Self::Blue),
            "green" => Some(Self::Green),
            "crt" => Some(Self::Crt),
            "lcd" => Some(Self::Lcd),
            "grid" => Some(Self::Grid),
            "noise" => Some(Self::Noise),
            "film" => Some(Self::Film),
            "mono" => Some(Self::Mono),
            "invert" => Some(Self::Invert),
            "sepia" => Some(Self::Sepia),
            "sepiaalt" => Some(Self::SepiaAlt),
            _ => None,
        }
    }

    /// Parse a comma-separated filter list, dropping unknown names
    pub fn parse_list(csv: &str) -> Vec<Self> {
        csv.split(',').filter_map(Self::from_name).collect()
    }
}

fn apply_filter(
    filter: PixelFilter,
    r: &mut f32,
    g: &mut f32,
    b: &mut f32,
    x: i32,
    y: i32,
    rng: &mut Rng,
) {
    match filter {
        PixelFilter::Red => {
            *g = 0.0;
            *b = 0.0;
        }
        PixelFilter::Cyan => {
            *r = 0.0;
        }
        PixelFilter::Blue => {
            *r = 0.0;
            *g = 0.0;
        }
        PixelFilter::Green => {
            *r = 0.0;
            *b = 0.0;
        }
        PixelFilter::Crt => {
            if y % 2 == 0 {
                *r -= 12.0;
                *g -= 12.0;
                *b -= 12.0;
            }
        }
        PixelFilter::Lcd => {
            if y % 2 == 0 {
                *r -= 6.0;
                *g -= 6.0;
                *b -= 6.0;
            } else if x % 2 == 0 {
                *r += 10.0;
                *g += 10.0;
                *b += 10.0;
            }
        }
        PixelFilter::Grid => {
            if y % 2 == 0 {
                *r -= 12.0;
                *g -= 12.0;
                *b -= 12.0;
            }
            if x % 2 == 0 {
                *r += 12.0;
                *g += 12.0;
                *b += 12.0;
            }
        }
        PixelFilter::Noise => {
            let n = rng.range_i32(-5, 5) as f32;
            *r += n;
            *g += n;
            *b += n;
        }
        PixelFilter::Film => {
            if rng.chance(7) {
                let n = rng.range_i32(0, 8) as f32;
                *r += n;
                *g += n;
                *b += n;
            }
        }
        PixelFilter::Mono => {
            let avg = ((*r + *g + *b) / 3.0).round();
            *r = avg;
            *g = avg;
            *b = avg;
        }
        PixelFilter::Invert => {
            *r = 255.0 - *r;
            *g = 255.0 - *g;
            *b = 255.0 - *b;
        }
        PixelFilter::Sepia => {
            // Classic sepia matrix, applied sequentially in place: the
            // green and blue rows read the already-rewritten channels.
            *r = 0.393 * *r + 0.769 * *g + 0.189 * *b;
            *g = 0.349 * *r + 0.686 * *g + 0.168 * *b;
            *b = 0.272 * *r + 0.534 * *g + 0.131 * *b;
        }
        PixelFilter::SepiaAlt => {
            *r = r.min(119.0);
            *g = g.min(66.0);
            *b = b.min(18.0);
        }
    }
}

// ============================================================================
// Blend Modes
// ============================================================================

/// One channel of the blend-mode table. `c1` is the incoming value,
/// `c2` the existing destination value, both in [0, 255].
fn blend_channel(mode: BlendMode, c1: f32, c2: f32) -> f32 {
    let n1 = c1 / 255.0;
    let n2 = c2 / 255.0;
    match mode {
        BlendMode::Multiply => c1 * c2 / 255.0,
        BlendMode::Screen => 255.0 * (1.0 - (1.0 - n1) * (1.0 - n2)),
        BlendMode::HardLight => {
            if c2 < 130.0 {
                255.0 * (n1 * 2.0 * n2)
            } else {
                255.0 * (1.0 - (1.0 - n1) * (1.0 - (2.0 * n2 - 1.0)))
            }
        }
        BlendMode::Lighten => c1.max(c2),
        BlendMode::Lighter => (c1 + c2).min(255.0),
        BlendMode::Darken => c1.min(c2),
        BlendMode::Darker => (c1 - c2).max(0.0),
        BlendMode::Overlay => {
            let m = c1 * c2 / 255.0;
            255.0 * (1.0 - (1.0 - n1) * (1.0 - m / 255.0))
        }
    }
}

// ============================================================================
// Pixel Compositing
// ============================================================================

/// Composite one incoming sample onto the buffer.
/// Opaque samples with no blend mode and no filters take the direct-write
/// fast path; everything else blends against the existing pixel.
#[allow(clippy::too_many_arguments)]
pub fn composite_pixel(
    buffer: &mut FrameBuffer,
    x: i32,
    y: i32,
    color: Rgb,
    alpha: u8,
    blend: Option<BlendMode>,
    ignore_lighting: bool,
    lighting: &Lighting,
    filters: &[PixelFilter],
    rng: &mut Rng,
) {
    if alpha == 0 || !buffer.in_bounds(x, y) {
        return;
    }

    let mut r = color.0 as f32;
    let mut g = color.1 as f32;
    let mut b = color.2 as f32;

    if !ignore_lighting {
        let shade = lighting.shade_at(x as f32, y as f32);
        r = (r * shade[0] / 255.0).round();
        g = (g * shade[1] / 255.0).round();
        b = (b * shade[2] / 255.0).round();
    }

    if alpha == 255 && blend.is_none() && filters.is_empty() {
        buffer.write_opaque(
            x,
            y,
            r.clamp(0.0, 255.0) as u8,
            g.clamp(0.0, 255.0) as u8,
            b.clamp(0.0, 255.0) as u8,
        );
        return;
    }

    let Some((ex_r, ex_g, ex_b)) = buffer.read(x, y) else {
        return;
    };

    if alpha < 255 {
        let weight = alpha as f32 / 255.0;
        r = weighted_blend(ex_r as f32, 1.0, r, weight);
        g = weighted_blend(ex_g as f32, 1.0, g, weight);
        b = weighted_blend(ex_b as f32, 1.0, b, weight);
    }

    if let Some(mode) = blend {
        r = blend_channel(mode, r, ex_r as f32);
        g = blend_channel(mode, g, ex_g as f32);
        b = blend_channel(mode, b, ex_b as f32);
    }

    for filter in filters {
        apply_filter(*filter, &mut r, &mut g, &mut b, x, y, rng);
    }

    buffer.write_opaque(
        x,
        y,
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    );
}

// ============================================================================
// Textured Footprints
// ============================================================================

/// A resolved tile or sprite paint request
pub struct TexturePaint<'a> {
    pub texture: &'a Texture,
    pub frame: u32,
    pub dx: f32,
    pub dy: f32,
    pub scale: f32,
    /// Radians
    pub rotation: f32,
    pub mirror: bool,
    pub opacity: f32,
    pub blend: Option<BlendMode>,
    pub ignore_lighting: bool,
    pub color_filter: Option<Rgb>,
}

/// Rasterize one textured footprint. The destination box is
/// `[dx, dx + w*scale) x [dy, dy + h*scale)`; rotation pads the box by a
/// quarter of its height per side (conservative corner cover) and samples
/// by rotating each pixel's offset about the box center.
pub fn paint_texture(
    buffer: &mut FrameBuffer,
    lighting: &Lighting,
    filters: &[PixelFilter],
    rng: &mut Rng,
    p: &TexturePaint,
) {
    let src_w = p.texture.width() as f32;
    let src_h = p.texture.height() as f32;
    let dw = src_w * p.scale;
    let dh = src_h * p.scale;
    if dw <= 0.0 || dh <= 0.0 {
        return;
    }

    let rotated = p.rotation != 0.0;
    let pad = if rotated { dh * 0.25 } else { 0.0 };
    let x0 = (p.dx - pad).floor() as i32;
    let y0 = (p.dy - pad).floor() as i32;
    let x1 = (p.dx + dw + pad).ceil() as i32;
    let y1 = (p.dy + dh + pad).ceil() as i32;

    let view_w = buffer.width() as i32;
    let view_h = buffer.height() as i32;
    if x1 <= 0 || y1 <= 0 || x0 >= view_w || y0 >= view_h {
        return;
    }

    let cx = p.dx + dw * 0.5;
    let cy = p.dy + dh * 0.5;
    let (sin, cos) = p.rotation.sin_cos();
    let max_tx = p.texture.width() as i32 - 1;

    for py in y0.max(0)..y1.min(view_h) {
        for px in x0.max(0)..x1.min(view_w) {
            let (sample_x, sample_y) = if rotated {
                let ox = px as f32 - cx;
                let oy = py as f32 - cy;
                (cx + ox * cos - oy * sin, cy + ox * sin + oy * cos)
            } else {
                (px as f32, py as f32)
            };

            // Linear position within the box, mapped to source texels
            let mut tx = ((sample_x - p.dx) / dw * src_w).floor() as i32;
            let ty = ((sample_y - p.dy) / dh * src_h).floor() as i32;
            if p.mirror {
                tx = max_tx - tx;
            }

            let Some((r, g, b, a)) = p.texture.texel(p.frame, tx, ty) else {
                continue;
            };
            let alpha = (a as f32 * p.opacity).round();
            if alpha <= 0.0 {
                continue;
            }

            let color = match p.color_filter {
                Some(cf) => (
                    r.saturating_add(cf.0),
                    g.saturating_add(cf.1),
                    b.saturating_add(cf.2),
                ),
                None => (r, g, b),
            };

            composite_pixel(
                buffer,
                px,
                py,
                color,
                alpha.min(255.0) as u8,
                p.blend,
                p.ignore_lighting,
                lighting,
                filters,
                rng,
            );
        }
    }
}

// ============================================================================
// Particle Footprints
// ============================================================================

/// A flat colored square, centered on its position
pub struct SquarePaint {
    pub dx: f32,
    pub dy: f32,
    pub size: f32,
    pub color: Rgb,
    pub opacity: f32,
    pub blend: Option<BlendMode>,
    pub ignore_lighting: bool,
    pub color_filter: Option<Rgb>,
}

pub fn paint_square(
    buffer: &mut FrameBuffer,
    lighting: &Lighting,
    filters: &[PixelFilter],
    rng: &mut Rng,
    p: &SquarePaint,
) {
    let alpha = (255.0 * p.opacity).round();
    if alpha <= 0.0 {
        return;
    }
    let alpha = alpha.min(255.0) as u8;

    let side = p.size.round().max(1.0) as i32;
    let x0 = (p.dx - p.size * 0.5).floor() as i32;
    let y0 = (p.dy - p.size * 0.5).floor() as i32;

    let color = match p.color_filter {
        Some(cf) => (
            p.color.0.saturating_add(cf.0),
            p.color.1.saturating_add(cf.1),
            p.color.2.saturating_add(cf.2),
        ),
        None => p.color,
    };

    for py in y0..y0 + side {
        for px in x0..x0 + side {
            composite_pixel(
                buffer,
                px,
                py,
                color,
                alpha,
                p.blend,
                p.ignore_lighting,
                lighting,
                filters,
                rng,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (FrameBuffer, Lighting, Rng) {
        (FrameBuffer::with_size(8, 8), Lighting::new(), Rng::new(99))
    }

    #[test]
    fn test_fast_path_writes_lit_source_exactly() {
        let (mut fb, light, mut rng) = setup();
        fb.clear(40, 40, 40);
        composite_pixel(&mut fb, 2, 2, (210, 120, 30), 255, None, false, &light, &[], &mut rng);
        // Default ambient is full white, so the lit color is the source color
        assert_eq!(fb.read(2, 2), Some((210, 120, 30)));
    }

    #[test]
    fn test_full_darkness_blacks_out_sprite() {
        let (mut fb, mut light, mut rng) = setup();
        light.set_ambient((0, 0, 0), 0.0);
        composite_pixel(&mut fb, 1, 1, (255, 255, 255), 255, None, false, &light, &[], &mut rng);
        assert_eq!(fb.read(1, 1), Some((0, 0, 0)));
    }

    #[test]
    fn test_ignore_lighting_skips_shading() {
        let (mut fb, mut light, mut rng) = setup();
        light.set_ambient((0, 0, 0), 0.0);
        composite_pixel(&mut fb, 1, 1, (255, 128, 0), 255, None, true, &light, &[], &mut rng);
        assert_eq!(fb.read(1, 1), Some((255, 128, 0)));
    }

    #[test]
    fn test_translucent_weighted_blend() {
        let (mut fb, light, mut rng) = setup();
        composite_pixel(&mut fb, 0, 0, (255, 255, 255), 128, None, false, &light, &[], &mut rng);
        // (0 * 1 + 255 * 128/255) / (1 + 128/255) = 85.2 -> 85
        assert_eq!(fb.read(0, 0), Some((85, 85, 85)));
    }

    #[test]
    fn test_multiply_blend() {
        let (mut fb, light, mut rng) = setup();
        fb.write_opaque(3, 3, 128, 128, 128);
        composite_pixel(
            &mut fb, 3, 3, (128, 128, 128), 255,
            Some(BlendMode::Multiply), false, &light, &[], &mut rng,
        );
        // 128 * 128 / 255 = 64.25 -> 64
        assert_eq!(fb.read(3, 3), Some((64, 64, 64)));
    }

    #[test]
    fn test_lighter_saturates_at_255() {
        let (mut fb, light, mut rng) = setup();
        fb.write_opaque(0, 0, 200, 200, 200);
        composite_pixel(
            &mut fb, 0, 0, (200, 200, 200), 255,
            Some(BlendMode::Lighter), false, &light, &[], &mut rng,
        );
        assert_eq!(fb.read(0, 0), Some((255, 255, 255)));
    }

    #[test]
    fn test_darker_floors_at_zero() {
        assert_eq!(blend_channel(BlendMode::Darker, 50.0, 200.0), 0.0);
        assert_eq!(blend_channel(BlendMode::Darker, 200.0, 50.0), 150.0);
    }

    #[test]
    fn test_screen_brightens() {
        // screen(128, 128) = 255 * (1 - 0.498 * 0.498) = 191.7
        let v = blend_channel(BlendMode::Screen, 128.0, 128.0);
        assert!((v - 191.7).abs() < 0.5);
    }

    #[test]
    fn test_invert_filter() {
        let (mut fb, light, mut rng) = setup();
        composite_pixel(
            &mut fb, 0, 1, (255, 0, 30), 255, None, false,
            &light, &[PixelFilter::Invert], &mut rng,
        );
        assert_eq!(fb.read(0, 1), Some((0, 255, 225)));
    }

    #[test]
    fn test_mono_filter_averages() {
        let (mut fb, light, mut rng) = setup();
        composite_pixel(
            &mut fb, 0, 1, (30, 60, 90), 255, None, false,
            &light, &[PixelFilter::Mono], &mut rng,
        );
        assert_eq!(fb.read(0, 1), Some((60, 60, 60)));
    }

    #[test]
    fn test_crt_darkens_even_rows_only() {
        let (mut fb, light, mut rng) = setup();
        for y in [0, 1] {
            composite_pixel(
                &mut fb, 0, y, (100, 100, 100), 255, None, false,
                &light, &[PixelFilter::Crt], &mut rng,
            );
        }
        assert_eq!(fb.read(0, 0), Some((88, 88, 88)));
        assert_eq!(fb.read(0, 1), Some((100, 100, 100)));
    }

    #[test]
    fn test_grid_cancels_on_even_even() {
        let (mut fb, light, mut rng) = setup();
        composite_pixel(
            &mut fb, 0, 0, (100, 100, 100), 255, None, false,
            &light, &[PixelFilter::Grid], &mut rng,
        );
        assert_eq!(fb.read(0, 0), Some((100, 100, 100)));
    }

    #[test]
    fn test_sepiaalt_hard_clamps() {
        let (mut fb, light, mut rng) = setup();
        composite_pixel(
            &mut fb, 0, 0, (255, 255, 255), 255, None, false,
            &light, &[PixelFilter::SepiaAlt], &mut rng,
        );
        assert_eq!(fb.read(0, 0), Some((119, 66, 18)));
    }

    #[test]
    fn test_filter_chain_output_stays_in_range() {
        let (mut fb, light, mut rng) = setup();
        let chain = [PixelFilter::Grid, PixelFilter::Noise, PixelFilter::Invert];
        for y in 0..8 {
            for x in 0..8 {
                composite_pixel(
                    &mut fb, x, y, (250, 3, 128), 255, None, false,
                    &light, &chain, &mut rng,
                );
            }
        }
        for chunk in fb.as_bytes().chunks_exact(4) {
            assert_eq!(chunk[3], 255);
        }
    }

    #[test]
    fn test_paint_texture_exact_copy() {
        let (mut fb, light, mut rng) = setup();
        let tex = Texture::solid(2, 2, 10, 200, 30);
        let p = TexturePaint {
            texture: &tex,
            frame: 0,
            dx: 1.0,
            dy: 1.0,
            scale: 1.0,
            rotation: 0.0,
            mirror: false,
            opacity: 1.0,
            blend: None,
            ignore_lighting: false,
            color_filter: None,
        };
        paint_texture(&mut fb, &light, &[], &mut rng, &p);
        assert_eq!(fb.read(1, 1), Some((10, 200, 30)));
        assert_eq!(fb.read(2, 2), Some((10, 200, 30)));
        assert_eq!(fb.read(0, 0), Some((0, 0, 0)));
        assert_eq!(fb.read(3, 3), Some((0, 0, 0)));
    }

    #[test]
    fn test_paint_texture_mirror_flips_source() {
        let (mut fb, light, mut rng) = setup();
        let frame = vec![
            255, 0, 0, 255, // left texel red
            0, 0, 255, 255, // right texel blue
        ];
        let tex = Texture::from_frames(2, 1, vec![frame]).unwrap();
        let p = TexturePaint {
            texture: &tex,
            frame: 0,
            dx: 0.0,
            dy: 0.0,
            scale: 1.0,
            rotation: 0.0,
            mirror: true,
            opacity: 1.0,
            blend: None,
            ignore_lighting: false,
            color_filter: None,
        };
        paint_texture(&mut fb, &light, &[], &mut rng, &p);
        assert_eq!(fb.read(0, 0), Some((0, 0, 255)));
        assert_eq!(fb.read(1, 0), Some((255, 0, 0)));
    }

    #[test]
    fn test_paint_texture_culls_offscreen() {
        let (mut fb, light, mut rng) = setup();
        let tex = Texture::solid(4, 4, 255, 255, 255);
        let p = TexturePaint {
            texture: &tex,
            frame: 0,
            dx: 100.0,
            dy: 100.0,
            scale: 1.0,
            rotation: 0.0,
            mirror: false,
            opacity: 1.0,
            blend: None,
            ignore_lighting: false,
            color_filter: None,
        };
        paint_texture(&mut fb, &light, &[], &mut rng, &p);
        assert!(fb.as_bytes().iter().step_by(4).all(|&r| r == 0));
    }

    #[test]
    fn test_zero_opacity_draws_nothing() {
        let (mut fb, light, mut rng) = setup();
        let tex = Texture::solid(2, 2, 255, 255, 255);
        let p = TexturePaint {
            texture: &tex,
            frame: 0,
            dx: 0.0,
            dy: 0.0,
            scale: 1.0,
            rotation: 0.0,
            mirror: false,
            opacity: 0.0,
            blend: None,
            ignore_lighting: false,
            color_filter: None,
        };
        paint_texture(&mut fb, &light, &[], &mut rng, &p);
        assert_eq!(fb.read(0, 0), Some((0, 0, 0)));
    }

    #[test]
    fn test_color_filter_ceiling() {
        let (mut fb, light, mut rng) = setup();
        let tex = Texture::solid(1, 1, 250, 10, 0);
        let p = TexturePaint {
            texture: &tex,
            frame: 0,
            dx: 0.0,
            dy: 0.0,
            scale: 1.0,
            rotation: 0.0,
            mirror: false,
            opacity: 1.0,
            blend: None,
            ignore_lighting: false,
            color_filter: Some((20, 20, 20)),
        };
        paint_texture(&mut fb, &light, &[], &mut rng, &p);
        assert_eq!(fb.read(0, 0), Some((255, 30, 20)));
    }

    #[test]
    fn test_paint_square_centered() {
        let (mut fb, light, mut rng) = setup();
        let p = SquarePaint {
            dx: 4.0,
            dy: 4.0,
            size: 2.0,
            color: (255, 0, 0),
            opacity: 1.0,
            blend: None,
            ignore_lighting: true,
            color_filter: None,
        };
        paint_square(&mut fb, &light, &[], &mut rng, &p);
        assert_eq!(fb.read(3, 3), Some((255, 0, 0)));
        assert_eq!(fb.read(4, 4), Some((255, 0, 0)));
        assert_eq!(fb.read(5, 5), Some((0, 0, 0)));
    }
}
