//! Smoke: an occasional slow-drifting puff that rises as it fades.

use super::EffectOptions;
use crate::particles::{ParticleEngine, ParticleInstruction, ParticleSpawn};
use crate::pool::Pool;
use crate::util::Rng;

const DEFAULT_COLOR: (u8, u8, u8) = (110, 110, 110);

pub fn smoke(
    engine: &mut ParticleEngine,
    pool: &mut Pool<ParticleInstruction>,
    rng: &mut Rng,
    opts: &EffectOptions,
) {
    // 3-in-16 per invocation; callers fire it every frame from a source
    if rng.range_i32(0, 15) >= 3 {
        return;
    }

    let z = rng.range_f32(1.0, 3.0);
    let vx = rng.range_f32(-0.03, 0.03);
    let vz = rng.range_f32(-0.25, -0.1); // rises
    let size = rng.range_f32(1.0, 3.0);
    engine.insert(
        pool,
        rng,
        &ParticleSpawn {
            x: opts.x,
            y: opts.y,
            z,
            vx,
            vz,
            color: opts.color.unwrap_or(DEFAULT_COLOR),
            color_variance: opts.color_variance.unwrap_or(32),
            size,
            opacity: 0.8,
            fade_speed: 0.01,
            ..Default::default()
        },
    );
}
