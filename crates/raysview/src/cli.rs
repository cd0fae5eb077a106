use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use lightrays::RayOrigin;
use rayconfig::RaysConfig;

#[derive(Parser, Debug, Default)]
#[command(
    name = "raysview",
    author,
    version,
    about = "Preview the light rays background effect in a desktop window"
)]
pub struct Cli {
    /// Configuration file (TOML, or JSON with a `.json` extension).
    #[arg(long, value_name = "PATH", env = "LIGHTRAYS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where rays originate: top-center, top-left, top-right, left, right,
    /// bottom-left, bottom-center, bottom-right, or center.
    #[arg(long, value_name = "KEYWORD")]
    pub origin: Option<String>,

    /// Ray tint as a hex colour (e.g. `#6c9aea`).
    #[arg(long, value_name = "HEX")]
    pub color: Option<String>,

    #[arg(long, value_name = "FACTOR")]
    pub speed: Option<f32>,

    #[arg(long, value_name = "FACTOR")]
    pub spread: Option<f32>,

    /// Ray reach as a multiple of the window width.
    #[arg(long, value_name = "FACTOR")]
    pub length: Option<f32>,

    /// Keep rays fixed instead of bending toward the pointer.
    #[arg(long)]
    pub no_follow_pointer: bool,

    /// How strongly rays bend toward the pointer (0-1).
    #[arg(long, value_name = "WEIGHT")]
    pub pointer_influence: Option<f32>,

    /// Dithering strength.
    #[arg(long, value_name = "AMOUNT")]
    pub noise: Option<f32>,

    #[arg(long, value_name = "AMOUNT")]
    pub distortion: Option<f32>,

    /// Slowly oscillate overall intensity.
    #[arg(long)]
    pub pulsating: bool,

    #[arg(long, value_name = "FACTOR")]
    pub fade_distance: Option<f32>,

    #[arg(long, value_name = "FACTOR")]
    pub saturation: Option<f32>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Optional FPS cap (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Print the resolved configuration as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

impl Cli {
    /// Layers command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut RaysConfig) {
        let effect = &mut config.effect;
        if let Some(origin) = &self.origin {
            effect.origin = RayOrigin::from_keyword(origin);
        }
        if let Some(color) = &self.color {
            effect.color = color.clone();
        }
        let numbers = [
            (self.speed, &mut effect.speed),
            (self.spread, &mut effect.spread),
            (self.length, &mut effect.length),
            (self.pointer_influence, &mut effect.pointer_influence),
            (self.noise, &mut effect.noise_amount),
            (self.distortion, &mut effect.distortion),
            (self.fade_distance, &mut effect.fade_distance),
            (self.saturation, &mut effect.saturation),
        ];
        for (value, slot) in numbers {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if self.no_follow_pointer {
            effect.follow_pointer = false;
        }
        if self.pulsating {
            effect.pulsating = true;
        }

        if let Some((width, height)) = self.size {
            config.window.width = width;
            config.window.height = height;
        }
        if let Some(fps) = self.fps {
            config.window.fps = Some(fps);
        }
    }
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1280x720"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("window dimensions must be greater than zero");
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_surface_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size(" 640 X 480 ").unwrap(), (640, 480));
        assert!(parse_surface_size("0x480").is_err());
        assert!(parse_surface_size("wide").is_err());
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let cli = Cli::try_parse_from([
            "raysview",
            "--origin",
            "right",
            "--speed",
            "2.5",
            "--no-follow-pointer",
            "--size",
            "800x600",
        ])
        .expect("parse args");

        let mut config = RaysConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.effect.origin, RayOrigin::Right);
        assert_eq!(config.effect.speed, 2.5);
        assert!(!config.effect.follow_pointer);
        assert_eq!(config.effect.spread, 0.5);
        assert_eq!((config.window.width, config.window.height), (800, 600));
        assert_eq!(config.window.fps, None);
    }

    #[test]
    fn unknown_origin_keyword_falls_back() {
        let cli = Cli::try_parse_from(["raysview", "--origin", "diagonal"]).expect("parse args");
        let mut config = RaysConfig::default();
        config.effect.origin = RayOrigin::Left;
        cli.apply_overrides(&mut config);
        assert_eq!(config.effect.origin, RayOrigin::TopCenter);
    }
}
