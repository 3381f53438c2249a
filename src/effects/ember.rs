//! Ember: a rare glowing mote that rises on the global sway.

use super::EffectOptions;
use crate::instruction::BlendMode;
use crate::particles::{ParticleEngine, ParticleInstruction, ParticleSpawn};
use crate::pool::Pool;
use crate::util::Rng;

const DEFAULT_COLOR: (u8, u8, u8) = (255, 120, 40);
const DEFAULT_MAX_CHANCE: u32 = 40;

pub fn ember(
    engine: &mut ParticleEngine,
    pool: &mut Pool<ParticleInstruction>,
    rng: &mut Rng,
    opts: &EffectOptions,
) {
    let max_chance = opts.max_chance.unwrap_or(DEFAULT_MAX_CHANCE);
    if !rng.chance(max_chance) {
        return;
    }

    let z = rng.range_f32(1.0, 4.0);
    let vz = rng.range_f32(-0.08, -0.02); // slow upward drift
    let size = rng.range_f32(1.0, 2.0);
    engine.insert(
        pool,
        rng,
        &ParticleSpawn {
            x: opts.x,
            y: opts.y,
            z,
            vz,
            gravity: -0.001, // keeps rising
            use_global_angle: true,
            loops_back: opts.loops_back,
            blend: Some(BlendMode::Screen),
            color: opts.color.unwrap_or(DEFAULT_COLOR),
            color_variance: opts.color_variance.unwrap_or(12),
            size,
            opacity: 0.9,
            fade_speed: 0.004,
            glow_radius: 6.0,
            glow_brightness: 0.3,
            ..Default::default()
        },
    );
}
