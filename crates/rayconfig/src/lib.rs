use std::path::{Path, PathBuf};

use lightrays::RenderConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Only supported value of the top-level `version` key.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RaysConfig {
    pub version: u32,
    #[serde(default)]
    pub effect: RenderConfig,
    #[serde(default)]
    pub window: WindowSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Light Rays".to_string(),
            fps: None,
        }
    }
}

impl Default for RaysConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            effect: RenderConfig::default(),
            window: WindowSettings::default(),
        }
    }
}

impl RaysConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: RaysConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let raw: RaysConfig = serde_json::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads a config file; `.json` files are parsed as JSON, anything else
    /// as TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_toml_str(&contents)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        let effect = &self.effect;
        let numbers = [
            ("speed", effect.speed),
            ("spread", effect.spread),
            ("length", effect.length),
            ("pointer_influence", effect.pointer_influence),
            ("noise_amount", effect.noise_amount),
            ("distortion", effect.distortion),
            ("fade_distance", effect.fade_distance),
            ("saturation", effect.saturation),
        ];
        for (name, value) in numbers {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "effect.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if effect.pointer_influence > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "effect.pointer_influence must be within [0, 1], got {}",
                effect.pointer_influence
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if let Some(fps) = self.window.fps {
            if !fps.is_finite() || fps < 0.0 {
                return Err(ConfigError::Invalid("window.fps must be >= 0".into()));
            }
        }

        Ok(())
    }
}
