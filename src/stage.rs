//! Stage
//!
//! A rendering instance: the output frame buffer, the frame-scoped draw
//! queue, lighting state, the filter chain, and the particle simulation
//! that feeds it. `Context` carries the process-scoped state shared by
//! every stage: the two instruction pools and the global sway angle.

use std::rc::Rc;

use crate::effects::{self, EffectKind, EffectOptions, Environment};
use crate::frame::FrameBuffer;
use crate::instruction::{
    BlendMode, DrawBody, DrawInstruction, DrawQueue, Facing, LightDraw, ParticleDraw, SpriteDraw,
    TileDraw,
};
use crate::lighting::{Lighting, PointLight};
use crate::particles::{Bounds, ParticleEngine, ParticleInstruction, ParticleSpawn};
use crate::pool::Pool;
use crate::raster::{paint_square, paint_texture, PixelFilter, SquarePaint, TexturePaint};
use crate::texture::Texture;
use crate::util::{hex_to_rgb, normalize_delta, Rgb, Rng};

/// How far outside the view particles may roam before bounds-exit rules fire
const BOUNDS_MARGIN: f32 = 24.0;

// ============================================================================
// Context
// ============================================================================

/// Process-scoped state injected into every frame: the two bounded
/// instruction pools and the sway angle shared by all `use_global_angle`
/// particles. Single-threaded by construction; drop it to tear down.
pub struct Context {
    pub draw_pool: Pool<DrawInstruction>,
    pub particle_pool: Pool<ParticleInstruction>,
    sway_angle: f32,
}

impl Context {
    pub fn new() -> Self {
        Self {
            draw_pool: Pool::default(),
            particle_pool: Pool::default(),
            sway_angle: 0.0,
        }
    }

    #[inline]
    pub fn sway_angle(&self) -> f32 {
        self.sway_angle
    }

    fn advance_sway(&mut self, delta: f32) {
        self.sway_angle += delta * 0.002;
        if self.sway_angle > 360.0 {
            self.sway_angle -= 360.0;
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Draw-call Options
// ============================================================================

pub struct TileOptions {
    pub z: f32,
    /// Frame override; -1 uses the texture's current frame
    pub frame: i32,
    pub opacity: f32,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            z: 0.0,
            frame: -1,
            opacity: 1.0,
        }
    }
}

pub struct SpriteOptions {
    pub z: f32,
    pub scale: f32,
    pub opacity: f32,
    /// Pose state pinning a sheet frame; -1 for none
    pub state: i32,
    pub facing: Facing,
    /// Frame override; -1 defers to `state`, then the texture's cursor
    pub frame: i32,
    pub use_raw: bool,
    pub blend: Option<BlendMode>,
    pub rotation_degrees: f32,
    pub mirror: bool,
    pub ignore_lighting: bool,
    pub color_filter: Option<Rgb>,
}

impl Default for SpriteOptions {
    fn default() -> Self {
        Self {
            z: 0.0,
            scale: 1.0,
            opacity: 1.0,
            state: -1,
            facing: Facing::Right,
            frame: -1,
            use_raw: false,
            blend: None,
            rotation_degrees: 0.0,
            mirror: false,
            ignore_lighting: false,
            color_filter: None,
        }
    }
}

pub struct ParticleDrawOptions {
    pub z: f32,
    pub scale: f32,
    pub opacity: f32,
    pub blend: Option<BlendMode>,
    pub ignore_lighting: bool,
    pub color_filter: Option<Rgb>,
    pub use_raw: bool,
}

impl Default for ParticleDrawOptions {
    fn default() -> Self {
        Self {
            z: 0.0,
            scale: 1.0,
            opacity: 1.0,
            blend: None,
            ignore_lighting: false,
            color_filter: None,
            use_raw: false,
        }
    }
}

// ============================================================================
// Stage
// ============================================================================

/// One rendering instance. All draw calls are no-ops on invalid input;
/// nothing in the frame path panics.
pub struct Stage {
    width: u32,
    height: u32,
    buffer: FrameBuffer,
    queue: DrawQueue,
    particles: ParticleEngine,
    lighting: Lighting,
    filters: Vec<PixelFilter>,
    environment: Environment,
    view_x: f32,
    view_y: f32,
    rng: Rng,
    active: bool,
}

impl Stage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffer: FrameBuffer::with_size(width, height),
            queue: DrawQueue::default(),
            particles: ParticleEngine::new(),
            lighting: Lighting::new(),
            filters: Vec::new(),
            environment: Environment::None,
            view_x: 0.0,
            view_y: 0.0,
            rng: Rng::new(0x9E37_79B9),
            active: true,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.buffer
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Scroll the scene. Instructions translate by the negative offset
    /// unless flagged raw-view.
    pub fn set_view(&mut self, x: f32, y: f32) {
        self.view_x = x;
        self.view_y = y;
    }

    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Configure the stage-wide darkness: ambient becomes the configured
    /// color weighted by intensity. Invalid hex is ignored.
    pub fn set_lighting(&mut self, color_hex: &str, intensity: f32) {
        if let Some(color) = hex_to_rgb(color_hex) {
            self.lighting.set_ambient(color, intensity);
        }
    }

    /// Replace the filter chain from a comma-separated list; unknown
    /// names are dropped
    pub fn set_filters(&mut self, csv: &str) {
        self.filters = PixelFilter::parse_list(csv);
    }

    pub fn set_filter_list(&mut self, filters: Vec<PixelFilter>) {
        self.filters = filters;
    }

    pub fn particle_count(&self) -> usize {
        self.particles.active_count()
    }

    pub fn pending_draws(&self) -> usize {
        self.queue.len()
    }

    fn particle_bounds(&self) -> Bounds {
        Bounds {
            x_min: self.view_x - BOUNDS_MARGIN,
            x_max: self.view_x + self.width as f32 + BOUNDS_MARGIN,
            y_min: self.view_y - BOUNDS_MARGIN,
            y_max: self.view_y + self.height as f32 + BOUNDS_MARGIN,
        }
    }

    // ------------------------------------------------------------------
    // Draw calls
    // ------------------------------------------------------------------

    pub fn draw_tile(
        &mut self,
        ctx: &mut Context,
        texture: &Rc<Texture>,
        x: f32,
        y: f32,
        opts: TileOptions,
    ) {
        if texture.is_loading() || texture.frame_count() == 0 {
            return;
        }
        let mut instr = ctx.draw_pool.acquire();
        instr.x = x;
        instr.y = y;
        instr.z = opts.z;
        instr.body = DrawBody::Tile(TileDraw {
            texture: Some(Rc::clone(texture)),
            frame: opts.frame,
            opacity: opts.opacity.clamp(0.0, 1.0),
        });
        self.queue.enqueue(instr);
    }

    pub fn draw_sprite(
        &mut self,
        ctx: &mut Context,
        texture: &Rc<Texture>,
        x: f32,
        y: f32,
        opts: SpriteOptions,
    ) {
        if texture.is_loading() || texture.frame_count() == 0 || opts.scale <= 0.0 {
            return;
        }
        let mut instr = ctx.draw_pool.acquire();
        instr.x = x;
        instr.y = y;
        instr.z = opts.z;
        instr.raw_view = opts.use_raw;
        instr.body = DrawBody::Sprite(SpriteDraw {
            texture: Some(Rc::clone(texture)),
            frame: opts.frame,
            state: opts.state,
            facing: opts.facing,
            scale: opts.scale,
            opacity: opts.opacity.clamp(0.0, 1.0),
            rotation: opts.rotation_degrees.to_radians(),
            mirror: opts.mirror,
            blend: opts.blend,
            ignore_lighting: opts.ignore_lighting,
            color_filter: opts.color_filter,
        });
        self.queue.enqueue(instr);
    }

    /// Queue a point light. Requests with unparseable color, zero
    /// intensity, or a non-positive radius are dropped.
    pub fn draw_light(
        &mut self,
        ctx: &mut Context,
        color_hex: &str,
        intensity: f32,
        radius: f32,
        x: f32,
        y: f32,
    ) {
        let Some(color) = hex_to_rgb(color_hex) else {
            return;
        };
        if intensity == 0.0 || radius <= 0.0 {
            return;
        }
        let mut instr = ctx.draw_pool.acquire();
        instr.x = x;
        instr.y = y;
        instr.body = DrawBody::Light(LightDraw {
            radius,
            intensity,
            color,
        });
        self.queue.enqueue(instr);
    }

    /// Queue a one-off particle square (not simulated)
    pub fn draw_particle(
        &mut self,
        ctx: &mut Context,
        x: f32,
        y: f32,
        color_hex: &str,
        opts: ParticleDrawOptions,
    ) {
        let Some(color) = hex_to_rgb(color_hex) else {
            return;
        };
        let mut instr = ctx.draw_pool.acquire();
        instr.x = x;
        instr.y = y;
        instr.z = opts.z;
        instr.raw_view = opts.use_raw;
        instr.body = DrawBody::Particle(ParticleDraw {
            color,
            size: opts.scale,
            opacity: opts.opacity.clamp(0.0, 1.0),
            blend: opts.blend,
            ignore_lighting: opts.ignore_lighting,
            color_filter: opts.color_filter,
        });
        self.queue.enqueue(instr);
    }

    /// Dispatch an effect program by name; unknown names are ignored
    pub fn play_effect(&mut self, ctx: &mut Context, name: &str, opts: EffectOptions) {
        if let Some(kind) = EffectKind::from_name(name) {
            effects::play(
                kind,
                &mut self.particles,
                &mut ctx.particle_pool,
                &mut self.rng,
                &opts,
            );
        }
    }

    /// Low-level particle creation with the full field set
    pub fn insert_particle(&mut self, ctx: &mut Context, spawn: ParticleSpawn) {
        self.particles
            .insert(&mut ctx.particle_pool, &mut self.rng, &spawn);
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// Run the back half of a frame: sway, environment, particle
    /// integration, sort, rasterization, queue drain. Inactive stages
    /// drop their queued work unprocessed and shed their particles.
    pub fn finish_frame(&mut self, ctx: &mut Context, delta: f32) {
        if !self.active {
            self.queue.drain_into(&mut ctx.draw_pool);
            self.particles.clear(&mut ctx.particle_pool);
            return;
        }
        let delta = normalize_delta(delta);
        ctx.advance_sway(delta);

        let bounds = self.particle_bounds();
        effects::run_environment(
            self.environment,
            bounds,
            &mut self.particles,
            &mut ctx.particle_pool,
            &mut self.rng,
        );
        self.particles.step(
            &mut self.queue,
            &mut ctx.draw_pool,
            &mut ctx.particle_pool,
            bounds,
            ctx.sway_angle,
            delta,
            &mut self.rng,
        );

        self.queue.sort_for_raster();
        self.rasterize();
        self.lighting.clear_lights();
        self.queue.drain_into(&mut ctx.draw_pool);
    }

    /// Consume the sorted queue. Lights accumulate as they are
    /// encountered; since they sort first, every light is active before
    /// the first shaded pixel.
    fn rasterize(&mut self) {
        let Self {
            buffer,
            queue,
            lighting,
            filters,
            rng,
            view_x,
            view_y,
            ..
        } = self;

        for instr in queue.iter() {
            let (dx, dy) = if instr.raw_view {
                (instr.x, instr.y)
            } else {
                (instr.x - *view_x, instr.y - *view_y)
            };

            match &instr.body {
                DrawBody::Empty => {}
                DrawBody::Light(light) => {
                    lighting.add_light(PointLight {
                        x: dx,
                        y: dy,
                        radius: light.radius,
                        intensity: light.intensity,
                        color: light.color,
                    });
                }
                DrawBody::Tile(tile) => {
                    let Some(texture) = tile.texture.as_deref() else {
                        continue;
                    };
                    if texture.is_loading() {
                        continue;
                    }
                    let Some(frame) = resolve_frame(texture, tile.frame, -1) else {
                        continue;
                    };
                    paint_texture(
                        buffer,
                        lighting,
                        filters,
                        rng,
                        &TexturePaint {
                            texture,
                            frame,
                            dx,
                            dy,
                            scale: 1.0,
                            rotation: 0.0,
                            mirror: false,
                            opacity: tile.opacity,
                            blend: None,
                            ignore_lighting: false,
                            color_filter: None,
                        },
                    );
                }
                DrawBody::Sprite(sprite) => {
                    let Some(texture) = sprite.texture.as_deref() else {
                        continue;
                    };
                    if texture.is_loading() {
                        continue;
                    }
                    let Some(frame) = resolve_frame(texture, sprite.frame, sprite.state) else {
                        continue;
                    };
                    paint_texture(
                        buffer,
                        lighting,
                        filters,
                        rng,
                        &TexturePaint {
                            texture,
                            frame,
                            dx,
                            dy,
                            scale: sprite.scale,
                            rotation: sprite.rotation,
                            mirror: sprite.mirror ^ (sprite.facing == Facing::Left),
                            opacity: sprite.opacity,
                            blend: sprite.blend,
                            ignore_lighting: sprite.ignore_lighting,
                            color_filter: sprite.color_filter,
                        },
                    );
                }
                DrawBody::Particle(particle) => {
                    paint_square(
                        buffer,
                        lighting,
                        filters,
                        rng,
                        &SquarePaint {
                            dx,
                            dy,
                            size: particle.size,
                            color: particle.color,
                            opacity: particle.opacity,
                            blend: particle.blend,
                            ignore_lighting: particle.ignore_lighting,
                            color_filter: particle.color_filter,
                        },
                    );
                }
            }
        }
    }
}

/// Pick the frame to sample: explicit override, then pose state, then the
/// texture's animation cursor. Out-of-range picks drop the draw.
fn resolve_frame(texture: &Texture, frame: i32, state: i32) -> Option<u32> {
    let chosen = if frame >= 0 {
        frame
    } else if state >= 0 {
        state
    } else {
        texture.current_frame() as i32
    };
    if chosen >= 0 && (chosen as u32) < texture.frame_count() {
        Some(chosen as u32)
    } else {
        None
    }
}
