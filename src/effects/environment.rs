//! Environmental drivers: weather-like generators run once per frame
//! while a mode is active.

use super::{ember, EffectOptions};
use crate::particles::{Bounds, ParticleEngine, ParticleInstruction, ParticleSpawn};
use crate::pool::Pool;
use crate::util::Rng;

const RAIN_COLOR: (u8, u8, u8) = (150, 180, 230);
const SNOW_COLOR: (u8, u8, u8) = (255, 255, 255);

/// The active weather mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    None,
    Rain,
    Snow,
    Embers,
}

impl Environment {
    /// Parse a mode name; unknown names map to None
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "none" => Some(Self::None),
            "rain" => Some(Self::Rain),
            "snow" => Some(Self::Snow),
            "embers" => Some(Self::Embers),
            _ => None,
        }
    }
}

/// Run the active driver for one frame
pub fn run_environment(
    environment: Environment,
    bounds: Bounds,
    engine: &mut ParticleEngine,
    pool: &mut Pool<ParticleInstruction>,
    rng: &mut Rng,
) {
    match environment {
        Environment::None => {}
        Environment::Rain => {
            for _ in 0..rng.range_i32(0, 3) {
                let x = rng.range_f32(bounds.x_min, bounds.x_max);
                let y = rng.range_f32(bounds.y_min, bounds.y_max);
                let z = rng.range_f32(10.0, 50.0);
                let vz = rng.range_f32(0.06, 0.14);
                engine.insert(
                    pool,
                    rng,
                    &ParticleSpawn {
                        x,
                        y,
                        z,
                        vz,
                        color: RAIN_COLOR,
                        opacity: 0.35,
                        trails: true,
                        splat_on_impact: true,
                        ..Default::default()
                    },
                );
            }
        }
        Environment::Snow => {
            if rng.chance(6) {
                let x = rng.range_f32(bounds.x_min, bounds.x_max);
                let y = rng.range_f32(bounds.y_min, bounds.y_max);
                let z = rng.range_f32(20.0, 60.0);
                let vz = rng.range_f32(0.02, 0.05);
                engine.insert(
                    pool,
                    rng,
                    &ParticleSpawn {
                        x,
                        y,
                        z,
                        vz,
                        use_global_angle: true,
                        loops_back: true,
                        stay_on_ground: true,
                        life_on_ground: 300.0,
                        color: SNOW_COLOR,
                        opacity: 0.9,
                        ..Default::default()
                    },
                );
            }
        }
        Environment::Embers => {
            let opts = EffectOptions {
                x: rng.range_f32(bounds.x_min, bounds.x_max),
                y: rng.range_f32(bounds.y_min, bounds.y_max),
                loops_back: true,
                ..Default::default()
            };
            ember(engine, pool, rng, &opts);
        }
    }
}
