use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use log::{info, warn};

use sphere_reflect::{
    BitmapLoader, FileBitmapLoader, FrameRenderer, InputAction, InputController, InputEvent,
    KeyCode, MemoryBitmaps, RecordingPipeline, RendererConfig, SceneSnapshot, SceneState,
};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const EVENT_INTERVAL: Duration = Duration::from_millis(5);
const PROCEDURAL_TEXTURE_SIZE: u32 = 128;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let config = match &options.config {
        Some(path) => RendererConfig::load(path)
            .with_context(|| format!("failed to load config {path}"))?,
        None => RendererConfig::default(),
    };

    let summary = match &options.textures {
        Some(dir) => run_headless(&options, config, FileBitmapLoader::new(dir))?,
        None => {
            let bitmaps = MemoryBitmaps::procedural(&config.textures, PROCEDURAL_TEXTURE_SIZE);
            run_headless(&options, config, bitmaps)?
        }
    };
    summary.print();
    Ok(())
}

fn run_headless<L>(options: &CliOptions, config: RendererConfig, loader: L) -> Result<RunSummary>
where
    L: BitmapLoader + Send + 'static,
{
    let scene = Arc::new(SceneState::with_damping(config.damping_per_ms));
    let input_done = Arc::new(AtomicBool::new(false));
    let recreate = Arc::new(AtomicBool::new(false));

    let input = spawn_input_thread(
        InputController::new(Arc::clone(&scene), &config),
        options.events.clone(),
        Arc::clone(&input_done),
        Arc::clone(&recreate),
    )?;

    let renderer = FrameRenderer::new(config, Arc::clone(&scene), loader);
    let render = spawn_render_thread(
        renderer,
        options.frames,
        options.width,
        options.height,
        Arc::clone(&input_done),
        recreate,
    )?;

    let input_result = input
        .join()
        .map_err(|_| anyhow!("input thread panicked"));
    // A failed input thread must not leave the render loop waiting forever.
    input_done.store(true, Ordering::Release);
    let mut summary = render
        .join()
        .map_err(|_| anyhow!("render thread panicked"))?
        .context("render loop failed")?;
    input_result??;

    summary.final_state = scene.snapshot();
    Ok(summary)
}

fn spawn_input_thread(
    mut controller: InputController,
    events: Vec<InputEvent>,
    done: Arc<AtomicBool>,
    recreate: Arc<AtomicBool>,
) -> Result<JoinHandle<Result<()>>> {
    thread::Builder::new()
        .name("input".into())
        .spawn(move || {
            for event in events {
                match controller.handle(event) {
                    InputAction::RecreateSurface { fullscreen } => {
                        info!("recreating surface (fullscreen: {fullscreen})");
                        recreate.store(true, Ordering::Release);
                    }
                    InputAction::Ignored => warn!("input event {event:?} ignored"),
                    InputAction::SceneUpdated => {}
                }
                thread::sleep(EVENT_INTERVAL);
            }
            done.store(true, Ordering::Release);
            Ok(())
        })
        .context("failed to spawn input thread")
}

fn spawn_render_thread<L>(
    mut renderer: FrameRenderer<L>,
    frames: u64,
    width: u32,
    height: u32,
    input_done: Arc<AtomicBool>,
    recreate: Arc<AtomicBool>,
) -> Result<JoinHandle<Result<RunSummary>>>
where
    L: BitmapLoader + Send + 'static,
{
    thread::Builder::new()
        .name("render".into())
        .spawn(move || {
            let mut gl = RecordingPipeline::new();
            let mut summary = RunSummary::default();
            renderer.on_surface_created(&mut gl);
            let size = renderer
                .on_surface_changed(&mut gl, width, height)
                .context("failed to set up drawing surface")?;
            summary.surface = (size.width, size.height);
            summary.live_textures = gl.live_textures().len();

            while renderer.frames_rendered() < frames || !input_done.load(Ordering::Acquire) {
                if recreate.swap(false, Ordering::AcqRel) {
                    renderer.pause();
                    renderer.on_surface_destroyed(&mut gl);
                    renderer.on_surface_created(&mut gl);
                    renderer
                        .on_surface_changed(&mut gl, width, height)
                        .context("failed to recreate drawing surface")?;
                    renderer.resume();
                    summary.surfaces_recreated += 1;
                    summary.live_textures = gl.live_textures().len();
                }
                let started = Instant::now();
                renderer.draw_frame(&mut gl);
                for draw in gl.draws() {
                    summary.draw_calls += 1;
                    summary.triangles += draw.triangle_count as u64;
                }
                gl.take_commands();
                thread::sleep(FRAME_INTERVAL.saturating_sub(started.elapsed()));
            }
            summary.frames = renderer.frames_rendered();
            Ok(summary)
        })
        .context("failed to spawn render thread")
}

#[derive(Debug, Default)]
struct RunSummary {
    surface: (u32, u32),
    frames: u64,
    draw_calls: u64,
    triangles: u64,
    surfaces_recreated: u32,
    live_textures: usize,
    final_state: SceneSnapshot,
}

impl RunSummary {
    fn print(&self) {
        let state = &self.final_state;
        println!(
            "Rendered {} frame(s) on a {}x{} surface",
            self.frames, self.surface.0, self.surface.1
        );
        if self.surfaces_recreated > 0 {
            println!("Surface recreated {} time(s)", self.surfaces_recreated);
        }
        println!("Live textures: {}", self.live_textures);
        println!("Final scene state:");
        println!(
            " - object: {} ({})",
            state.object,
            if state.object.double_sided() {
                "double-sided"
            } else {
                "single-sided"
            }
        );
        println!(" - lighting: {}", if state.lighting { "on" } else { "off" });
        println!(" - filter: {}", state.filter);
        println!(" - zoom: {:.2} tilt: {:.2}", state.zoom, state.tilt);
        println!(" - rotation: dx={:.2} dy={:.2}", state.dx, state.dy);
        println!(
            " - speed: dx={:.4} dy={:.4} deg/ms",
            state.dx_speed, state.dy_speed
        );
        println!(
            "Draw calls: {} ({} triangles)",
            self.draw_calls, self.triangles
        );
    }
}

struct CliOptions {
    frames: u64,
    width: u32,
    height: u32,
    textures: Option<String>,
    config: Option<String>,
    events: Vec<InputEvent>,
}

const USAGE: &str = "Usage: sphere-reflect [--frames N] [--size WxH] [--textures DIR] \
[--config FILE] [--keys K1,K2,...] [--fling VX,VY]";

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut options = Self {
            frames: 60,
            width: 640,
            height: 480,
            textures: None,
            config: None,
            events: Vec::new(),
        };
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            let mut value = || {
                args.next()
                    .ok_or_else(|| anyhow!("{arg} expects a value. {USAGE}"))
            };
            match arg.as_str() {
                "--frames" => {
                    options.frames = value()?.parse().context("--frames expects a number")?;
                }
                "--size" => {
                    let size = value()?;
                    let (width, height) = size
                        .split_once('x')
                        .ok_or_else(|| anyhow!("--size expects WxH, got {size}"))?;
                    options.width = width.parse().context("invalid surface width")?;
                    options.height = height.parse().context("invalid surface height")?;
                }
                "--textures" => options.textures = Some(value()?),
                "--config" => options.config = Some(value()?),
                "--keys" => {
                    for name in value()?.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                        options.events.push(parse_key_event(name)?);
                    }
                }
                "--fling" => {
                    let fling = value()?;
                    let (vx, vy) = fling
                        .split_once(',')
                        .ok_or_else(|| anyhow!("--fling expects VX,VY, got {fling}"))?;
                    options.events.push(InputEvent::Fling {
                        vx: vx.trim().parse().context("invalid fling velocity")?,
                        vy: vy.trim().parse().context("invalid fling velocity")?,
                    });
                }
                "--help" | "-h" => return Err(anyhow!(USAGE)),
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(options)
    }
}

fn parse_key_event(name: &str) -> Result<InputEvent> {
    if name.eq_ignore_ascii_case("DoubleTap") {
        return Ok(InputEvent::DoubleTap);
    }
    KeyCode::from_name(name)
        .map(InputEvent::KeyDown)
        .ok_or_else(|| anyhow!("unknown key name: {name}"))
}
