//! Particle Engine
//!
//! A persistent set of simulated particles advanced once per frame:
//! horizontal integration, gravity and terminal velocity on the elevation
//! axis, ground collision, view-bounds exit, trails, glow, and retirement.
//! Each live particle emits one draw instruction per frame.

use crate::effects::{self, EffectOptions};
use crate::instruction::{
    BlendMode, DrawBody, DrawInstruction, DrawQueue, LightDraw, ParticleDraw,
};
use crate::pool::{Pool, Reusable};
use crate::util::{normalize_delta, shift_color, Rgb, Rng};

/// The view rectangle particles live inside, pre-expanded by the margin
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

/// A simulated particle. `z` is elevation above the ground plane; a
/// particle at elevation z paints at screen `y - z` with paint order
/// `z_index + floor(z)`. Opacity never increases while `fade_speed > 0`;
/// once `retired` is set the record takes no further simulation steps.
pub struct ParticleInstruction {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub z_index: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub gravity: f32,
    pub terminal_velocity: f32,
    pub color: Rgb,
    pub size: f32,
    pub opacity: f32,
    pub fade_speed: f32,
    /// Frames remaining; -1 is unbounded
    pub life: f32,
    /// Countdown adopted on landing; -1 for none
    pub life_on_ground: f32,
    pub glow_radius: f32,
    pub glow_brightness: f32,
    pub blend: Option<BlendMode>,
    pub retired: bool,
    pub stay_on_ground: bool,
    pub trails: bool,
    pub ignore_lighting: bool,
    pub use_raw_view: bool,
    pub use_global_angle: bool,
    pub loops_back: bool,
    pub splat_on_impact: bool,
}

impl Default for ParticleInstruction {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            z_index: 0.0,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            gravity: 0.0,
            // A zero default would clamp every fall to nothing
            terminal_velocity: 1.0,
            color: (255, 255, 255),
            size: 1.0,
            opacity: 1.0,
            fade_speed: 0.0,
            life: -1.0,
            life_on_ground: -1.0,
            glow_radius: 0.0,
            glow_brightness: 0.0,
            blend: None,
            retired: false,
            stay_on_ground: false,
            trails: false,
            ignore_lighting: false,
            use_raw_view: false,
            use_global_angle: false,
            loops_back: false,
            splat_on_impact: false,
        }
    }
}

impl Reusable for ParticleInstruction {}

/// Full-field options bag for particle insertion. `color_variance`
/// randomizes each channel once, at creation.
pub struct ParticleSpawn {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub z_index: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub gravity: f32,
    pub terminal_velocity: f32,
    pub color: Rgb,
    pub color_variance: u8,
    pub size: f32,
    pub opacity: f32,
    pub fade_speed: f32,
    pub life: f32,
    pub life_on_ground: f32,
    pub glow_radius: f32,
    pub glow_brightness: f32,
    pub blend: Option<BlendMode>,
    pub stay_on_ground: bool,
    pub trails: bool,
    pub ignore_lighting: bool,
    pub use_raw_view: bool,
    pub use_global_angle: bool,
    pub loops_back: bool,
    pub splat_on_impact: bool,
}

impl Default for ParticleSpawn {
    fn default() -> Self {
        let d = ParticleInstruction::default();
        Self {
            x: d.x,
            y: d.y,
            z: d.z,
            z_index: d.z_index,
            vx: d.vx,
            vy: d.vy,
            vz: d.vz,
            gravity: d.gravity,
            terminal_velocity: d.terminal_velocity,
            color: d.color,
            color_variance: 0,
            size: d.size,
            opacity: d.opacity,
            fade_speed: d.fade_speed,
            life: d.life,
            life_on_ground: d.life_on_ground,
            glow_radius: d.glow_radius,
            glow_brightness: d.glow_brightness,
            blend: d.blend,
            stay_on_ground: d.stay_on_ground,
            trails: d.trails,
            ignore_lighting: d.ignore_lighting,
            use_raw_view: d.use_raw_view,
            use_global_angle: d.use_global_angle,
            loops_back: d.loops_back,
            splat_on_impact: d.splat_on_impact,
        }
    }
}

/// Retained particle simulation. Particles inserted during a frame join
/// the active set at the end of that frame's integration pass, so the
/// pass never mutates the collection it is iterating.
#[derive(Default)]
pub struct ParticleEngine {
    active: Vec<ParticleInstruction>,
    incoming: Vec<ParticleInstruction>,
}

impl ParticleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Borrow the live particles (integration order)
    pub fn particles(&self) -> &[ParticleInstruction] {
        &self.active
    }

    /// Create a particle from a spawn description, applying color variance
    /// once. The particle becomes active at the end of the current (or
    /// next) integration pass.
    pub fn insert(&mut self, pool: &mut Pool<ParticleInstruction>, rng: &mut Rng, spawn: &ParticleSpawn) {
        let mut p = pool.acquire();
        p.x = spawn.x;
        p.y = spawn.y;
        p.z = spawn.z;
        p.z_index = spawn.z_index;
        p.vx = spawn.vx;
        p.vy = spawn.vy;
        p.vz = spawn.vz;
        p.gravity = spawn.gravity;
        p.terminal_velocity = spawn.terminal_velocity;
        p.color = if spawn.color_variance > 0 {
            let v = spawn.color_variance as i32;
            shift_color(
                spawn.color,
                (
                    rng.range_i32(-v, v),
                    rng.range_i32(-v, v),
                    rng.range_i32(-v, v),
                ),
            )
        } else {
            spawn.color
        };
        p.size = spawn.size;
        p.opacity = spawn.opacity;
        p.fade_speed = spawn.fade_speed;
        p.life = spawn.life;
        p.life_on_ground = spawn.life_on_ground;
        p.glow_radius = spawn.glow_radius;
        p.glow_brightness = spawn.glow_brightness;
        p.blend = spawn.blend;
        p.stay_on_ground = spawn.stay_on_ground;
        p.trails = spawn.trails;
        p.ignore_lighting = spawn.ignore_lighting;
        p.use_raw_view = spawn.use_raw_view;
        p.use_global_angle = spawn.use_global_angle;
        p.loops_back = spawn.loops_back;
        p.splat_on_impact = spawn.splat_on_impact;
        self.incoming.push(p);
    }

    /// Advance every active particle one frame and emit its draw
    /// instruction (plus a light, when glowing). Retired particles are
    /// collected after the pass and recycled; particles spawned during
    /// the pass join the active set at the end.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        queue: &mut DrawQueue,
        draw_pool: &mut Pool<DrawInstruction>,
        particle_pool: &mut Pool<ParticleInstruction>,
        bounds: Bounds,
        sway_angle: f32,
        delta: f32,
        rng: &mut Rng,
    ) {
        let delta = normalize_delta(delta);
        let mut pass = std::mem::take(&mut self.active);

        for i in 0..pass.len() {
            let pre_x = pass[i].x;
            let pre_y = pass[i].y;
            let pre_z = pass[i].z;

            {
                let p = &mut pass[i];

                p.opacity -= p.fade_speed * delta;
                if p.opacity <= 0.0 {
                    p.retired = true;
                    continue;
                }

                if p.life > -1.0 {
                    p.life -= delta;
                    if p.life <= 0.0 {
                        p.retired = true;
                        continue;
                    }
                }

                let dx = if p.use_global_angle {
                    sway_angle.sin() * 2.0 * delta
                } else {
                    p.vx * delta
                };
                let dy = p.vy * delta;
                p.x += dx;
                p.y += dy;

                // Unbounded-lifetime particles die (or wrap) at the view edge
                if p.life == -1.0 {
                    if p.x < bounds.x_min && dx < 0.0 {
                        if p.loops_back {
                            p.x = bounds.x_max;
                        } else {
                            p.retired = true;
                            continue;
                        }
                    } else if p.x > bounds.x_max && dx > 0.0 {
                        if p.loops_back {
                            p.x = bounds.x_min;
                        } else {
                            p.retired = true;
                            continue;
                        }
                    }
                    if (p.y < bounds.y_min && dy < 0.0) || (p.y > bounds.y_max && dy > 0.0) {
                        p.retired = true;
                        continue;
                    }
                }

                p.vz = p.vz.min(p.terminal_velocity);
                p.vz += p.gravity * delta;
                p.z -= p.vz.min(p.terminal_velocity) * delta;
            }

            if pass[i].z <= 0.0 {
                if pass[i].stay_on_ground {
                    let p = &mut pass[i];
                    p.z = 0.0;
                    p.vx = 0.0;
                    p.vy = 0.0;
                    p.vz = 0.0;
                    p.gravity = 0.0;
                    p.terminal_velocity = 0.0;
                    if p.life == -1.0 && p.life_on_ground > -1.0 {
                        p.life = p.life_on_ground;
                    }
                } else {
                    pass[i].retired = true;
                    if pass[i].splat_on_impact {
                        let opts = EffectOptions {
                            x: pre_x,
                            y: pre_y,
                            amount: Some(rng.range_i32(2, 5) as u32),
                            color: Some(pass[i].color),
                            ..Default::default()
                        };
                        effects::splat(self, particle_pool, rng, &opts);
                    }
                    continue;
                }
            }

            if pass[i].trails {
                let p = &pass[i];
                let mut trail = particle_pool.acquire();
                trail.x = pre_x;
                trail.y = pre_y;
                trail.z = pre_z;
                trail.z_index = p.z_index;
                trail.color = p.color;
                trail.size = p.size;
                trail.opacity = p.opacity;
                trail.blend = p.blend;
                trail.fade_speed = p.fade_speed + 0.02;
                trail.ignore_lighting = p.ignore_lighting;
                trail.use_raw_view = p.use_raw_view;
                self.incoming.push(trail);
            }

            let p = &pass[i];

            if p.glow_radius > 0.0 && p.glow_brightness > 0.0 {
                let mut light = draw_pool.acquire();
                light.x = p.x;
                light.y = p.y - p.z;
                light.raw_view = p.use_raw_view;
                light.body = DrawBody::Light(LightDraw {
                    radius: p.glow_radius,
                    intensity: p.glow_brightness,
                    color: p.color,
                });
                queue.enqueue(light);
            }

            let mut draw = draw_pool.acquire();
            draw.x = p.x;
            draw.y = p.y - p.z;
            draw.z = p.z_index + p.z.floor();
            draw.raw_view = p.use_raw_view;
            draw.body = DrawBody::Particle(ParticleDraw {
                color: p.color,
                size: p.size,
                opacity: p.opacity,
                blend: p.blend,
                ignore_lighting: p.ignore_lighting,
                color_filter: None,
            });
            queue.enqueue(draw);
        }

        // Collect retirements after the pass, preserving insertion order
        for p in pass.drain(..) {
            if p.retired {
                particle_pool.release(p);
            } else {
                self.active.push(p);
            }
        }
        self.active.append(&mut self.incoming);
    }

    /// Drop every particle back into the pool
    pub fn clear(&mut self, particle_pool: &mut Pool<ParticleInstruction>) {
        for p in self.active.drain(..).chain(self.incoming.drain(..)) {
            particle_pool.release(p);
        }
    }
}
