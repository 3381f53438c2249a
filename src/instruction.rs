//! Draw Instructions
//!
//! The frame-scoped queue of pending paint requests and its ordering
//! contract. Each instruction is a tagged union: tiles and sprites sample a
//! texture, lights feed the lighting model, particles are flat squares.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::pool::{Pool, Reusable};
use crate::texture::Texture;
use crate::util::Rgb;

// ============================================================================
// Blend Mode
// ============================================================================

/// Non-default pixel-combination formula, applied instead of plain alpha
/// blending during compositing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Multiply,
    Screen,
    HardLight,
    Lighten,
    Lighter,
    Darken,
    Darker,
    Overlay,
}

impl BlendMode {
    /// Parse a blend-mode name. Unknown names map to None (plain blending).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "multiply" => Some(Self::Multiply),
            "screen" => Some(Self::Screen),
            "hard-light" | "hardlight" => Some(Self::HardLight),
            "lighten" => Some(Self::Lighten),
            "lighter" => Some(Self::Lighter),
            "darken" => Some(Self::Darken),
            "darker" => Some(Self::Darker),
            "overlay" => Some(Self::Overlay),
            _ => None,
        }
    }
}

// ============================================================================
// Instruction Variants
// ============================================================================

/// Which way a sprite faces. `Left` flips the horizontal mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

pub struct TileDraw {
    pub texture: Option<Rc<Texture>>,
    /// Frame override; -1 uses the texture's current frame
    pub frame: i32,
    pub opacity: f32,
}

pub struct SpriteDraw {
    pub texture: Option<Rc<Texture>>,
    /// Frame override; -1 defers to `state`, then the texture's current frame
    pub frame: i32,
    /// Pose state pinning a sheet frame; -1 for none
    pub state: i32,
    pub facing: Facing,
    pub scale: f32,
    pub opacity: f32,
    /// Radians
    pub rotation: f32,
    pub mirror: bool,
    pub blend: Option<BlendMode>,
    pub ignore_lighting: bool,
    /// Additive RGB offset applied before compositing
    pub color_filter: Option<Rgb>,
}

pub struct LightDraw {
    pub radius: f32,
    /// Signed: positive brightens, negative darkens
    pub intensity: f32,
    pub color: Rgb,
}

pub struct ParticleDraw {
    pub color: Rgb,
    /// Side length of the painted square, in pixels
    pub size: f32,
    pub opacity: f32,
    pub blend: Option<BlendMode>,
    pub ignore_lighting: bool,
    pub color_filter: Option<Rgb>,
}

#[derive(Default)]
pub enum DrawBody {
    /// Pool-default state; never rasterized
    #[default]
    Empty,
    Tile(TileDraw),
    Sprite(SpriteDraw),
    Light(LightDraw),
    Particle(ParticleDraw),
}

/// One frame-scoped request to paint a tile, sprite, light, or particle.
/// Owned by the draw queue for the duration of a frame, then recycled.
#[derive(Default)]
pub struct DrawInstruction {
    pub x: f32,
    pub y: f32,
    /// Paint-order depth
    pub z: f32,
    /// Skip the view translation (UI-space drawing)
    pub raw_view: bool,
    pub body: DrawBody,
}

impl Reusable for DrawInstruction {}

impl DrawInstruction {
    /// Lights sort ahead of everything else so they are all collected
    /// before the first shaded pixel is painted
    #[inline]
    fn layer(&self) -> u8 {
        match self.body {
            DrawBody::Light(_) => 0,
            _ => 1,
        }
    }

    /// At equal depth, tiles form the background layer
    #[inline]
    fn kind_rank(&self) -> u8 {
        match self.body {
            DrawBody::Tile(_) => 0,
            _ => 1,
        }
    }
}

// ============================================================================
// Draw Queue
// ============================================================================

/// Ordered-insertion collection of the frame's pending instructions
#[derive(Default)]
pub struct DrawQueue {
    items: Vec<DrawInstruction>,
}

impl DrawQueue {
    pub fn enqueue(&mut self, instruction: DrawInstruction) {
        self.items.push(instruction);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Apply the total paint order: lights first, then z ascending, then
    /// tile before sprite, then y ascending. The sort is stable, so equal
    /// keys keep their insertion order.
    pub fn sort_for_raster(&mut self) {
        self.items.sort_by(|a, b| {
            a.layer()
                .cmp(&b.layer())
                .then(a.z.partial_cmp(&b.z).unwrap_or(Ordering::Equal))
                .then(a.kind_rank().cmp(&b.kind_rank()))
                .then(a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
        });
    }

    /// Iterate the (sorted) instructions in paint order
    pub fn iter(&self) -> impl Iterator<Item = &DrawInstruction> {
        self.items.iter()
    }

    /// Return every instruction to the pool, clearing texture references.
    /// Instructions past the pool cap are dropped.
    pub fn drain_into(&mut self, pool: &mut Pool<DrawInstruction>) {
        for instruction in self.items.drain(..) {
            pool.release(instruction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(z: f32, y: f32) -> DrawInstruction {
        DrawInstruction {
            y,
            z,
            body: DrawBody::Tile(TileDraw {
                texture: None,
                frame: -1,
                opacity: 1.0,
            }),
            ..Default::default()
        }
    }

    fn sprite(z: f32, y: f32) -> DrawInstruction {
        DrawInstruction {
            y,
            z,
            body: DrawBody::Sprite(SpriteDraw {
                texture: None,
                frame: -1,
                state: -1,
                facing: Facing::Right,
                scale: 1.0,
                opacity: 1.0,
                rotation: 0.0,
                mirror: false,
                blend: None,
                ignore_lighting: false,
                color_filter: None,
            }),
            ..Default::default()
        }
    }

    fn light(z: f32) -> DrawInstruction {
        DrawInstruction {
            z,
            body: DrawBody::Light(LightDraw {
                radius: 10.0,
                intensity: 1.0,
                color: (255, 255, 255),
            }),
            ..Default::default()
        }
    }

    fn kinds(queue: &DrawQueue) -> Vec<&'static str> {
        queue
            .iter()
            .map(|i| match i.body {
                DrawBody::Empty => "empty",
                DrawBody::Tile(_) => "tile",
                DrawBody::Sprite(_) => "sprite",
                DrawBody::Light(_) => "light",
                DrawBody::Particle(_) => "particle",
            })
            .collect()
    }

    #[test]
    fn test_lights_sort_first() {
        let mut q = DrawQueue::default();
        q.enqueue(sprite(-5.0, 0.0));
        q.enqueue(tile(-10.0, 0.0));
        q.enqueue(light(99.0));
        q.sort_for_raster();
        assert_eq!(kinds(&q), vec!["light", "tile", "sprite"]);
    }

    #[test]
    fn test_z_orders_non_lights() {
        let mut q = DrawQueue::default();
        q.enqueue(sprite(3.0, 0.0));
        q.enqueue(sprite(-2.0, 0.0));
        q.enqueue(sprite(1.0, 0.0));
        q.sort_for_raster();
        let zs: Vec<f32> = q.iter().map(|i| i.z).collect();
        assert_eq!(zs, vec![-2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_tile_precedes_sprite_at_equal_z() {
        // Tile at y=5 still paints before the sprite at y=3: type rank
        // outranks the y tiebreak.
        let mut q = DrawQueue::default();
        q.enqueue(sprite(0.0, 3.0));
        q.enqueue(tile(0.0, 5.0));
        q.sort_for_raster();
        assert_eq!(kinds(&q), vec!["tile", "sprite"]);
    }

    #[test]
    fn test_y_breaks_ties_within_kind() {
        let mut q = DrawQueue::default();
        q.enqueue(sprite(0.0, 9.0));
        q.enqueue(sprite(0.0, 2.0));
        q.enqueue(sprite(0.0, 5.0));
        q.sort_for_raster();
        let ys: Vec<f32> = q.iter().map(|i| i.y).collect();
        assert_eq!(ys, vec![2.0, 5.0, 9.0]);
    }

    #[test]
    fn test_stable_for_equal_keys() {
        let mut q = DrawQueue::default();
        for i in 0..4 {
            let mut s = sprite(1.0, 1.0);
            s.x = i as f32;
            q.enqueue(s);
        }
        q.sort_for_raster();
        let xs: Vec<f32> = q.iter().map(|i| i.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_drain_respects_pool_cap() {
        let mut q = DrawQueue::default();
        let mut pool: Pool<DrawInstruction> = Pool::with_capacity(2);
        for _ in 0..5 {
            q.enqueue(tile(0.0, 0.0));
        }
        q.drain_into(&mut pool);
        assert!(q.is_empty());
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_blend_mode_names() {
        assert_eq!(BlendMode::from_name("screen"), Some(BlendMode::Screen));
        assert_eq!(BlendMode::from_name("hard-light"), Some(BlendMode::HardLight));
        assert_eq!(BlendMode::from_name("HARDLIGHT"), Some(BlendMode::HardLight));
        assert_eq!(BlendMode::from_name("plasma"), None);
    }
}
