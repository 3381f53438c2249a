// Allow unused code for engine APIs the demo scene doesn't reach
#![allow(dead_code)]

mod config;
mod control;
mod display;
mod effects;
mod frame;
mod instruction;
mod lighting;
mod mqtt;
mod particles;
mod pool;
mod raster;
mod stage;
mod texture;
mod util;

use std::rc::Rc;

use sdl2::keyboard::Keycode;

use config::StageConfig;
use control::{Command, Controller};
use display::{Display, InputEvent, RenderTarget};
use effects::{EffectOptions, Environment};
use frame::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use mqtt::{ControlMessage, MqttClient};
use stage::{Context, SpriteOptions, Stage, TileOptions};
use texture::Texture;
use util::{FpsCounter, TARGET_TICK_RATE};

const TILE_SIZE: u32 = 16;

struct Args {
    width: u32,
    height: u32,
    vsync: bool,
    config_path: String,
    mqtt_host: String,
}

/// Parse command line arguments
fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut args = Args {
        width: DEFAULT_WIDTH,
        height: DEFAULT_HEIGHT,
        vsync: true,
        config_path: "stage.json".to_string(),
        mqtt_host: String::new(),
    };

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--no-vsync" => args.vsync = false,
            "--width" | "-w" => {
                if i + 1 < argv.len() {
                    if let Ok(w) = argv[i + 1].parse::<u32>() {
                        args.width = w;
                    }
                    i += 1;
                }
            }
            "--height" | "-h" => {
                if i + 1 < argv.len() {
                    if let Ok(h) = argv[i + 1].parse::<u32>() {
                        args.height = h;
                    }
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < argv.len() {
                    args.config_path = argv[i + 1].clone();
                    i += 1;
                }
            }
            "--mqtt" => {
                if i + 1 < argv.len() {
                    args.mqtt_host = argv[i + 1].clone();
                    i += 1;
                }
            }
            "--help" => {
                println!("Usage: pixelstage [OPTIONS]");
                println!();
                println!("Options:");
                println!("  --width W, -w W    Window width (default: {})", DEFAULT_WIDTH);
                println!("  --height H, -h H   Window height (default: {})", DEFAULT_HEIGHT);
                println!("  --config PATH      Stage config JSON (default: stage.json)");
                println!("  --mqtt HOST        Enable MQTT control via this broker");
                println!("  --no-vsync         Disable VSync for uncapped framerate");
                println!("  --help             Show this help message");
                println!();
                println!("Keys: E cycle environment, L toggle night, F fps,");
                println!("      0-9 filter presets, Space splat at cursor, Esc quit");
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    args
}

fn filter_preset(index: u32) -> &'static str {
    match index {
        1 => "crt",
        2 => "lcd",
        3 => "grid",
        4 => "noise,film",
        5 => "mono",
        6 => "invert",
        7 => "sepia",
        8 => "sepiaalt",
        9 => "red",
        _ => "",
    }
}

fn next_environment(current: Environment) -> Environment {
    match current {
        Environment::None => Environment::Rain,
        Environment::Rain => Environment::Snow,
        Environment::Snow => Environment::Embers,
        Environment::Embers => Environment::None,
    }
}

fn apply_control_message(stage: &mut Stage, ctx: &mut Context, msg: &ControlMessage) {
    if let Some(name) = &msg.environment {
        if let Some(environment) = Environment::from_name(name) {
            stage.set_environment(environment);
        }
    }
    if let Some(csv) = &msg.filters {
        stage.set_filters(csv);
    }
    if let Some(lighting) = &msg.lighting {
        stage.set_lighting(&lighting.color, lighting.intensity);
    }
    if let Some(effect) = &msg.effect {
        let (x, y) = (stage.width() as f32 / 2.0, stage.height() as f32 / 2.0);
        stage.play_effect(ctx, effect, EffectOptions { x, y, ..Default::default() });
    }
}

fn main() -> Result<(), String> {
    let args = parse_args();

    let config = StageConfig::load(&args.config_path).unwrap_or_default();
    let width = if args.width != DEFAULT_WIDTH { args.width } else { config.width };
    let height = if args.height != DEFAULT_HEIGHT { args.height } else { config.height };

    let (mut display, texture_creator) =
        Display::with_options("pixelstage", width, height, args.vsync)?;
    let mut target = RenderTarget::with_size(&texture_creator, width, height)?;

    let mut ctx = Context::new();
    let mut stage = Stage::new(width, height);
    config.apply(&mut stage);

    // Optional remote control channels; the demo runs fine without them
    let controller = Controller::new()
        .map_err(|e| eprintln!("Control socket unavailable: {}", e))
        .ok();
    let mqtt_host = if !args.mqtt_host.is_empty() {
        args.mqtt_host.clone()
    } else {
        config.mqtt_host.clone()
    };
    let mqtt = if mqtt_host.is_empty() {
        None
    } else {
        MqttClient::new(&mqtt_host, MqttClient::default_topic())
            .map_err(|e| eprintln!("{}", e))
            .ok()
    };

    // Demo scene textures
    let grass = Rc::new(Texture::checkerboard(
        TILE_SIZE,
        TILE_SIZE / 2,
        (52, 96, 60),
        (44, 84, 52),
    ));
    let slime = Rc::new(Texture::blob(12, 90, 200, 120));
    let lantern = Rc::new(Texture::blob(6, 255, 220, 150));

    let mut fps_counter = FpsCounter::new(60);
    let mut show_fps = false;
    let mut night = false;
    let mut tick = 0u64;
    let mut mouse = (width as f32 / 2.0, height as f32 / 2.0);

    'running: loop {
        let (dt, avg_fps) = fps_counter.tick();
        let delta = dt * TARGET_TICK_RATE;
        tick = tick.wrapping_add(1);

        for event in display.poll_events() {
            match event {
                InputEvent::Quit | InputEvent::KeyDown(Keycode::Escape) => break 'running,
                InputEvent::KeyDown(Keycode::E) => {
                    stage.set_environment(next_environment(stage.environment()));
                }
                InputEvent::KeyDown(Keycode::F) => show_fps = !show_fps,
                InputEvent::KeyDown(Keycode::L) => {
                    night = !night;
                    if night {
                        stage.set_lighting("#8090c0", 0.35);
                    } else {
                        stage.set_lighting("#ffffff", 1.0);
                    }
                }
                InputEvent::KeyDown(Keycode::Space) => {
                    stage.play_effect(
                        &mut ctx,
                        "splat",
                        EffectOptions {
                            x: mouse.0,
                            y: mouse.1,
                            color: Some((120, 200, 255)),
                            ..Default::default()
                        },
                    );
                }
                InputEvent::KeyDown(key) => {
                    if let Some(digit) = keycode_digit(key) {
                        stage.set_filters(filter_preset(digit));
                    }
                }
                InputEvent::MouseMove { x, y } => mouse = (x as f32, y as f32),
            }
        }

        if let Some(controller) = &controller {
            for command in controller.poll() {
                match command {
                    Command::Environment(environment) => stage.set_environment(environment),
                    Command::Filters(csv) => stage.set_filters(&csv),
                    Command::Lighting { color, intensity } => {
                        stage.set_lighting(&color, intensity)
                    }
                    Command::Effect(name) => {
                        let opts = EffectOptions {
                            x: mouse.0,
                            y: mouse.1,
                            ..Default::default()
                        };
                        stage.play_effect(&mut ctx, &name, opts);
                    }
                    Command::ToggleFps => show_fps = !show_fps,
                    Command::Quit => break 'running,
                }
            }
        }
        if let Some(mqtt) = &mqtt {
            for message in mqtt.poll() {
                apply_control_message(&mut stage, &mut ctx, &message);
            }
        }

        // --- Build the frame ---
        stage.buffer_mut().clear(16, 18, 28);

        // Ground tiles
        for ty in 0..height.div_ceil(TILE_SIZE) {
            for tx in 0..width.div_ceil(TILE_SIZE) {
                stage.draw_tile(
                    &mut ctx,
                    &grass,
                    (tx * TILE_SIZE) as f32,
                    (ty * TILE_SIZE) as f32,
                    TileOptions::default(),
                );
            }
        }

        // A slime wandering a slow circle, animated by frame override
        let t = tick as f32 / TARGET_TICK_RATE;
        let slime_x = width as f32 / 2.0 + (t * 0.7).cos() * width as f32 * 0.25;
        let slime_y = height as f32 / 2.0 + (t * 0.7).sin() * height as f32 * 0.2;
        let facing = if (t * 0.7).sin() < 0.0 {
            instruction::Facing::Left
        } else {
            instruction::Facing::Right
        };
        stage.draw_sprite(
            &mut ctx,
            &slime,
            slime_x,
            slime_y,
            SpriteOptions {
                z: 1.0,
                scale: 2.0,
                frame: ((tick / 20) % 2) as i32,
                facing,
                ..Default::default()
            },
        );

        // A spinning lantern sprite that carries its own glow
        let lantern_x = width as f32 * 0.25;
        let lantern_y = height as f32 * 0.3;
        stage.draw_sprite(
            &mut ctx,
            &lantern,
            lantern_x,
            lantern_y,
            SpriteOptions {
                z: 1.0,
                rotation_degrees: (tick % 360) as f32,
                ignore_lighting: true,
                ..Default::default()
            },
        );
        stage.draw_light(&mut ctx, "#ffd890", 0.8, 60.0, lantern_x + 3.0, lantern_y + 3.0);

        // Cursor light, most visible at night
        stage.draw_light(&mut ctx, "#a0c0ff", 0.6, 50.0, mouse.0, mouse.1);

        // A smoking brazier in the corner
        stage.play_effect(
            &mut ctx,
            "smoke",
            EffectOptions {
                x: width as f32 * 0.8,
                y: height as f32 * 0.75,
                ..Default::default()
            },
        );

        stage.finish_frame(&mut ctx, delta);
        display.present(&mut target, stage.buffer())?;

        if show_fps && tick % 60 == 0 {
            eprintln!(
                "fps: {:5.1}  particles: {:4}  sway: {:6.2}",
                avg_fps,
                stage.particle_count(),
                ctx.sway_angle()
            );
        }
    }

    Ok(())
}

fn keycode_digit(key: Keycode) -> Option<u32> {
    match key {
        Keycode::Num0 => Some(0),
        Keycode::Num1 => Some(1),
        Keycode::Num2 => Some(2),
        Keycode::Num3 => Some(3),
        Keycode::Num4 => Some(4),
        Keycode::Num5 => Some(5),
        Keycode::Num6 => Some(6),
        Keycode::Num7 => Some(7),
        Keycode::Num8 => Some(8),
        Keycode::Num9 => Some(9),
        _ => None,
    }
}
