use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use liquidwave::{
    build_shape, drain_pending, redraw_channel, LayerCompositor, Lifecycle, PixmapSurface,
    Renderable, WaveShape,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use waveconfig::{Rgba, WaveConfig};

use crate::cli::{GeometryArgs, RenderArgs};
use crate::export::FrameSink;
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads `explicit` if given, else `wave.toml` from the config directory,
/// else the built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<WaveConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    let paths = AppPaths::discover()?;
    let default_file = paths.config_file();
    if default_file.exists() {
        read_config(&default_file)
    } else {
        tracing::debug!(path = %default_file.display(), "no config file, using defaults");
        Ok(WaveConfig::default())
    }
}

pub fn read_config(path: &Path) -> Result<WaveConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = WaveConfig::from_toml_str(&raw)
        .with_context(|| format!("invalid config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded wave config");
    Ok(config)
}

/// Number of frames covering `duration` at `fps`, at least one.
pub fn frame_count(duration: Duration, fps: u32) -> u64 {
    let frames = (duration.as_secs_f64() * f64::from(fps)).ceil() as u64;
    frames.max(1)
}

pub fn render(args: RenderArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mut compositor = if args.single {
        LayerCompositor::single(config.attributes()?)
    } else {
        LayerCompositor::from_config(&config)?
    };
    let (width, height) = args.size;
    let mut surface = PixmapSurface::new(width, height)?;
    let background = args.background.unwrap_or(Rgba::new(0, 0, 0, 0));
    let mut sink = FrameSink::for_output(args.out.as_deref(), args.fps)?;

    let (sender, receiver) = redraw_channel();
    compositor.set_redraw(sender);

    let frames = frame_count(args.duration, args.fps);
    let interval = Duration::from_secs(1) / args.fps;
    let origin = Instant::now();
    tracing::info!(
        layers = compositor.len(),
        width,
        height,
        fps = args.fps,
        frames,
        "rendering waves"
    );

    compositor.handle(
        Lifecycle::BoundsChanged {
            width: i32::try_from(width).context("surface width out of range")?,
            height: i32::try_from(height).context("surface height out of range")?,
        },
        origin,
    );
    compositor.handle(Lifecycle::Attach, origin);
    compositor.handle(Lifecycle::BecomeVisible, origin);

    let mut redraws = 0u64;
    let mut now = origin;
    for frame in 0..frames {
        if frame > 0 {
            now += interval;
        }
        let status = compositor.tick(now);
        let pending = drain_pending(&receiver);
        if frame == 0 || pending > 0 {
            surface.clear(background);
            compositor.draw(&mut surface);
            redraws += 1;
        }
        tracing::trace!(frame, started = status.started, ticked = status.ticked, pending, "frame");
        sink.write(surface.to_rgba_image()?)?;
    }

    compositor.handle(Lifecycle::Detach, now);
    let output = sink.finish()?;
    tracing::info!(frames, redraws, output = ?output, "render finished");
    Ok(())
}

#[derive(Serialize)]
struct GeometryDump {
    width: u32,
    height: u32,
    offset: u32,
    phase: f64,
    wave_width: i32,
    wave_height: i32,
    total_height: i32,
    shape: WaveShape,
}

pub fn geometry(args: GeometryArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let attributes = config.attributes()?;
    let (width, height) = args.size;
    let shape = build_shape(
        &attributes,
        i32::try_from(width).context("surface width out of range")?,
        i32::try_from(height).context("surface height out of range")?,
        args.phase,
        args.offset,
    );
    let dump = GeometryDump {
        width,
        height,
        offset: args.offset,
        phase: args.phase,
        wave_width: attributes.wave_width(),
        wave_height: attributes.wave_height(),
        total_height: attributes.animation_total_height(),
        shape,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&dump).context("failed to serialise wave geometry")?
    );
    Ok(())
}

pub fn config_check(path: &Path) -> Result<()> {
    let config = read_config(path)?;
    let attributes = config.attributes()?;
    println!("{}: ok", path.display());
    println!("  layers:      {}", config.resolved_layers().len());
    println!("  start:       {:?}", config.compositor.start);
    println!(
        "  wave:        {}x{} px, travel {} px",
        attributes.wave_width(),
        attributes.wave_height(),
        attributes.animation_total_height()
    );
    println!("  period:      {:.0} ms", attributes.period_ms());
    println!("  color:       {}", attributes.wave_color());
    Ok(())
}

pub fn config_where() -> Result<()> {
    let paths = AppPaths::discover()?;
    let file = paths.config_file();
    println!("Configuration:");
    println!("  dir:    {}", paths.config_dir().display());
    println!(
        "  file:   {} ({})",
        file.display(),
        if file.exists() { "present" } else { "missing, using defaults" }
    );
    Ok(())
}
