use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use waveconfig::Rgba;

#[derive(Parser, Debug)]
#[command(
    name = "wavepaper",
    author,
    version,
    about = "Liquid wave wallpaper renderer"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Animate the waves on a simulated clock and export the frames.
    Render(RenderArgs),
    /// Print the wave shape for one layer as JSON.
    Geometry(GeometryArgs),
    /// Inspect configuration files and directories.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Wave configuration file; defaults to `wave.toml` in the config directory.
    #[arg(long, value_name = "FILE", env = "WAVEPAPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Surface size (e.g. `640x360`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size, default_value = "480x240")]
    pub size: (u32, u32),

    /// Frames per second of the simulated clock.
    #[arg(long, value_name = "FPS", default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: u32,

    /// Length of the animation (e.g. `3s`, `1500ms`).
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, default_value = "3s")]
    pub duration: Duration,

    /// Render a single wave instead of the layered stack.
    #[arg(long)]
    pub single: bool,

    /// Colour painted behind the waves (`#RRGGBB` or `#AARRGGBB`); transparent when omitted.
    #[arg(long, value_name = "COLOR", value_parser = parse_color)]
    pub background: Option<Rgba>,

    /// Output: a `.gif` file, or a directory that receives one PNG per frame.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct GeometryArgs {
    #[arg(long, value_name = "FILE", env = "WAVEPAPER_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size, default_value = "480x240")]
    pub size: (u32, u32),

    /// Oscillation offset in pixels.
    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    /// Phase in radians.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub phase: f64,
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Parse and validate a configuration file.
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the resolved config directory and default config file.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;
    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_color(value: &str) -> Result<Rgba, String> {
    Rgba::parse(value.trim()).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_sizes() {
        assert_eq!(parse_surface_size("640x360").unwrap(), (640, 360));
        assert_eq!(parse_surface_size(" 12X7 ").unwrap(), (12, 7));
        assert!(parse_surface_size("0x10").is_err());
        assert!(parse_surface_size("640").is_err());
        assert!(parse_surface_size("ax10").is_err());
    }

    #[test]
    fn parses_render_flags() {
        let cli = Cli::try_parse_from([
            "wavepaper",
            "render",
            "--size",
            "64x32",
            "--fps",
            "12",
            "--duration",
            "750ms",
            "--single",
            "--background",
            "#101010",
        ])
        .unwrap();
        let Command::Render(args) = cli.command else {
            panic!("expected render command");
        };
        assert_eq!(args.size, (64, 32));
        assert_eq!(args.fps, 12);
        assert_eq!(args.duration, Duration::from_millis(750));
        assert!(args.single);
        assert_eq!(args.background, Some(Rgba::rgb(0x10, 0x10, 0x10)));
    }

    #[test]
    fn rejects_zero_fps() {
        assert!(Cli::try_parse_from(["wavepaper", "render", "--fps", "0"]).is_err());
    }

    #[test]
    fn geometry_accepts_negative_phase() {
        let cli = Cli::try_parse_from(["wavepaper", "geometry", "--phase", "-0.785"]).unwrap();
        let Command::Geometry(args) = cli.command else {
            panic!("expected geometry command");
        };
        assert!((args.phase + 0.785).abs() < 1e-9);
    }
}
