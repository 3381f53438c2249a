//! Splat: a burst of short-flight debris that settles on the ground.
//! Used directly for impacts and by `splat_on_impact` particles.

use super::EffectOptions;
use crate::particles::{ParticleEngine, ParticleInstruction, ParticleSpawn};
use crate::pool::Pool;
use crate::util::Rng;

const DEFAULT_COLOR: (u8, u8, u8) = (200, 200, 200);
const GROUND_LIFE: f32 = 800.0;

pub fn splat(
    engine: &mut ParticleEngine,
    pool: &mut Pool<ParticleInstruction>,
    rng: &mut Rng,
    opts: &EffectOptions,
) {
    let amount = opts
        .amount
        .unwrap_or_else(|| rng.range_i32(15, 60) as u32);
    let color = opts.color.unwrap_or(DEFAULT_COLOR);

    for _ in 0..amount {
        let z = rng.range_f32(0.5, 2.5);
        let vx = rng.range_f32(-0.05, 0.05);
        let vy = rng.range_f32(-0.05, 0.05);
        let vz = rng.range_f32(-0.05, 0.05);
        engine.insert(
            pool,
            rng,
            &ParticleSpawn {
                x: opts.x,
                y: opts.y,
                z,
                vx,
                vy,
                vz,
                gravity: 0.01,
                color,
                color_variance: opts.color_variance.unwrap_or(0),
                opacity: 0.9,
                stay_on_ground: true,
                life_on_ground: GROUND_LIFE,
                ..Default::default()
            },
        );
    }
}
