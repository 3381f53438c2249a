//! Effect Program Library
//!
//! Stochastic particle generators invoked on demand (splat, smoke, ember)
//! and the per-frame environmental drivers (rain, snow, embers). Dispatch
//! is a closed enum; unknown effect names are a no-op.

mod ember;
mod environment;
mod smoke;
mod splat;

pub use ember::ember;
pub use environment::{run_environment, Environment};
pub use smoke::smoke;
pub use splat::splat;

use crate::particles::{ParticleEngine, ParticleInstruction};
use crate::pool::Pool;
use crate::util::{Rgb, Rng};

/// Options bag for effect invocations. Unset fields fall back to each
/// program's own defaults.
#[derive(Default)]
pub struct EffectOptions {
    pub x: f32,
    pub y: f32,
    pub amount: Option<u32>,
    pub color: Option<Rgb>,
    pub color_variance: Option<u8>,
    pub max_chance: Option<u32>,
    pub loops_back: bool,
}

/// The closed set of effect programs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Splat,
    Smoke,
    Ember,
}

impl EffectKind {
    /// Look up a program by name; unknown names map to None
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "splat" => Some(Self::Splat),
            "smoke" => Some(Self::Smoke),
            "ember" => Some(Self::Ember),
            _ => None,
        }
    }
}

/// Run one effect program
pub fn play(
    kind: EffectKind,
    engine: &mut ParticleEngine,
    pool: &mut Pool<ParticleInstruction>,
    rng: &mut Rng,
    opts: &EffectOptions,
) {
    match kind {
        EffectKind::Splat => splat(engine, pool, rng, opts),
        EffectKind::Smoke => smoke(engine, pool, rng, opts),
        EffectKind::Ember => ember(engine, pool, rng, opts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{BlendMode, DrawInstruction, DrawQueue};
    use crate::particles::Bounds;

    const BOUNDS: Bounds = Bounds {
        x_min: 0.0,
        x_max: 64.0,
        y_min: 0.0,
        y_max: 64.0,
    };

    struct Rig {
        engine: ParticleEngine,
        pool: Pool<crate::particles::ParticleInstruction>,
        rng: Rng,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                engine: ParticleEngine::new(),
                pool: Pool::default(),
                rng: Rng::new(0x51AB),
            }
        }

        fn settle(&mut self) {
            let mut queue = DrawQueue::default();
            let mut draw_pool: Pool<DrawInstruction> = Pool::default();
            self.engine.step(
                &mut queue,
                &mut draw_pool,
                &mut self.pool,
                BOUNDS,
                0.0,
                1.0,
                &mut self.rng,
            );
        }
    }

    #[test]
    fn test_unknown_effect_name_is_none() {
        assert_eq!(EffectKind::from_name("vortex"), None);
        assert_eq!(EffectKind::from_name(""), None);
        assert_eq!(EffectKind::from_name("Splat"), Some(EffectKind::Splat));
    }

    #[test]
    fn test_splat_respects_amount_override() {
        let mut rig = Rig::new();
        let opts = EffectOptions {
            x: 10.0,
            y: 10.0,
            amount: Some(5),
            ..Default::default()
        };
        splat(&mut rig.engine, &mut rig.pool, &mut rig.rng, &opts);
        rig.settle();
        assert_eq!(rig.engine.active_count(), 5);
    }

    #[test]
    fn test_splat_default_amount_range() {
        let mut rig = Rig::new();
        splat(
            &mut rig.engine,
            &mut rig.pool,
            &mut rig.rng,
            &EffectOptions::default(),
        );
        rig.settle();
        assert!((15..=60).contains(&rig.engine.active_count()));
    }

    #[test]
    fn test_splat_particles_are_grounded_settlers() {
        let mut rig = Rig::new();
        let opts = EffectOptions {
            x: 32.0,
            y: 32.0,
            amount: Some(8),
            ..Default::default()
        };
        splat(&mut rig.engine, &mut rig.pool, &mut rig.rng, &opts);
        rig.settle();
        for p in rig.engine.particles() {
            assert!(p.stay_on_ground);
            assert_eq!(p.life_on_ground, 800.0);
            assert!(p.vx.abs() <= 0.05 && p.vy.abs() <= 0.05 && p.vz.abs() <= 0.05);
        }
    }

    #[test]
    fn test_ember_always_fires_at_max_chance_one() {
        let mut rig = Rig::new();
        let opts = EffectOptions {
            x: 5.0,
            y: 60.0,
            max_chance: Some(1),
            loops_back: true,
            ..Default::default()
        };
        ember(&mut rig.engine, &mut rig.pool, &mut rig.rng, &opts);
        rig.settle();
        assert_eq!(rig.engine.active_count(), 1);
        let p = &rig.engine.particles()[0];
        assert!(p.use_global_angle);
        assert!(p.loops_back);
        assert_eq!(p.blend, Some(BlendMode::Screen));
        assert!(p.gravity < 0.0);
    }

    #[test]
    fn test_smoke_is_stochastic_but_not_silent() {
        let mut rig = Rig::new();
        for _ in 0..400 {
            smoke(
                &mut rig.engine,
                &mut rig.pool,
                &mut rig.rng,
                &EffectOptions::default(),
            );
        }
        rig.settle();
        // 3-in-16 per invocation: comfortably between "never" and "always"
        let count = rig.engine.active_count();
        assert!(count > 20 && count < 200, "smoke spawned {}", count);
    }

    #[test]
    fn test_rain_driver_spawns_trailing_drops() {
        let mut rig = Rig::new();
        for _ in 0..50 {
            run_environment(
                Environment::Rain,
                BOUNDS,
                &mut rig.engine,
                &mut rig.pool,
                &mut rig.rng,
            );
        }
        rig.settle();
        assert!(rig.engine.active_count() > 0);
        for p in rig.engine.particles() {
            assert!(p.trails);
            assert!(p.splat_on_impact);
            assert!(p.x >= BOUNDS.x_min && p.x <= BOUNDS.x_max);
            assert!(p.vz > 0.0 && p.vz <= 0.14);
        }
    }

    #[test]
    fn test_snow_driver_spawns_wrapping_settlers() {
        let mut rig = Rig::new();
        for _ in 0..120 {
            run_environment(
                Environment::Snow,
                BOUNDS,
                &mut rig.engine,
                &mut rig.pool,
                &mut rig.rng,
            );
        }
        rig.settle();
        assert!(rig.engine.active_count() > 0);
        for p in rig.engine.particles() {
            assert!(p.stay_on_ground);
            assert!(p.loops_back);
            assert!(p.use_global_angle);
            assert_eq!(p.life_on_ground, 300.0);
        }
    }

    #[test]
    fn test_none_environment_spawns_nothing() {
        let mut rig = Rig::new();
        for _ in 0..50 {
            run_environment(
                Environment::None,
                BOUNDS,
                &mut rig.engine,
                &mut rig.pool,
                &mut rig.rng,
            );
        }
        rig.settle();
        assert_eq!(rig.engine.active_count(), 0);
    }

    #[test]
    fn test_environment_names() {
        assert_eq!(Environment::from_name("rain"), Some(Environment::Rain));
        assert_eq!(Environment::from_name("NONE"), Some(Environment::None));
        assert_eq!(Environment::from_name("blizzard"), None);
    }
}
