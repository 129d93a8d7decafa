use std::f64::consts::FRAC_PI_4;
use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

mod color;

pub use color::Rgba;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("wave width must be greater than zero (got {0})")]
    WaveWidth(i32),
    #[error("wave height must be greater than zero (got {0})")]
    WaveHeight(i32),
    #[error("animation total height must be non-negative (got {0})")]
    TotalHeight(i32),
    #[error("animation speed must be a positive, finite number of px/ms (got {0})")]
    Speed(f32),
    #[error("wave period of {0}ms exceeds the supported maximum")]
    Period(f64),
    #[error("invalid colour '{0}'; expected #RRGGBB or #AARRGGBB")]
    Color(String),
}

pub const DEFAULT_WAVE_WIDTH: i32 = 200;
pub const DEFAULT_WAVE_HEIGHT: i32 = 10;
pub const DEFAULT_TOTAL_HEIGHT: i32 = 30;
/// 30px of travel every 1500ms.
pub const DEFAULT_SPEED: f32 = 30.0 / 1500.0;
pub const DEFAULT_WAVE_COLOR: Rgba = Rgba::rgb(0xf6, 0x98, 0x99);
pub const DEFAULT_LAYER_COUNT: usize = 3;
/// Longest accepted 0 → total sweep. Deadlines derived from it stay
/// representable as `Instant`s on every platform.
pub const MAX_PERIOD: Duration = Duration::from_secs(u32::MAX as u64);
/// Paint overrides applied to the first two layers of a multi-wave stack.
pub const DEFAULT_COLOR_OVERRIDES: [Rgba; 2] =
    [Rgba::rgb(0xfa, 0xe0, 0xe0), Rgba::rgb(0xfb, 0xc7, 0xc7)];

/// Phase used for layer `index` in the default multi-wave stack: `-(index + 1) * π/4`.
pub fn default_phase(index: usize) -> f64 {
    -((index + 1) as f64) * FRAC_PI_4
}

/// Geometry and timing parameters of one wave.
///
/// Values are validated on construction, so a `WaveAttributes` can always be
/// divided by (`wave_width`, `animation_speed`) without producing NaN or
/// infinite geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveAttributes {
    wave_width: i32,
    wave_height: i32,
    animation_total_height: i32,
    animation_speed: f32,
    wave_color: Rgba,
}

impl WaveAttributes {
    pub fn new(
        wave_width: i32,
        wave_height: i32,
        animation_total_height: i32,
        animation_speed: f32,
        wave_color: Rgba,
    ) -> Result<Self, ConfigError> {
        if wave_width <= 0 {
            return Err(ConfigError::WaveWidth(wave_width));
        }
        if wave_height <= 0 {
            return Err(ConfigError::WaveHeight(wave_height));
        }
        if animation_total_height < 0 {
            return Err(ConfigError::TotalHeight(animation_total_height));
        }
        if !animation_speed.is_finite() || animation_speed <= 0.0 {
            return Err(ConfigError::Speed(animation_speed));
        }
        let period_ms = f64::from(animation_total_height) / f64::from(animation_speed);
        if period_ms / 1000.0 > MAX_PERIOD.as_secs_f64() {
            return Err(ConfigError::Period(period_ms));
        }
        Ok(Self {
            wave_width,
            wave_height,
            animation_total_height,
            animation_speed,
            wave_color,
        })
    }

    /// Builds attributes from a travel period instead of a speed.
    ///
    /// A zero travel height has no meaningful speed; the default speed is kept.
    pub fn with_period(
        wave_width: i32,
        wave_height: i32,
        animation_total_height: i32,
        period: Duration,
        wave_color: Rgba,
    ) -> Result<Self, ConfigError> {
        let speed = if animation_total_height == 0 {
            DEFAULT_SPEED
        } else {
            let millis = period.as_secs_f64() * 1000.0;
            if millis <= 0.0 {
                return Err(ConfigError::Invalid(
                    "wave period must be greater than zero".into(),
                ));
            }
            (f64::from(animation_total_height) / millis) as f32
        };
        Self::new(
            wave_width,
            wave_height,
            animation_total_height,
            speed,
            wave_color,
        )
    }

    pub fn wave_width(&self) -> i32 {
        self.wave_width
    }

    pub fn wave_height(&self) -> i32 {
        self.wave_height
    }

    pub fn animation_total_height(&self) -> i32 {
        self.animation_total_height
    }

    pub fn animation_speed(&self) -> f32 {
        self.animation_speed
    }

    pub fn wave_color(&self) -> Rgba {
        self.wave_color
    }

    /// Same attributes painted in a different colour.
    pub fn with_color(self, wave_color: Rgba) -> Self {
        Self { wave_color, ..self }
    }

    /// Time for one 0 → total sweep, in milliseconds.
    pub fn period_ms(&self) -> f64 {
        f64::from(self.animation_total_height) / f64::from(self.animation_speed)
    }

    /// `period_ms` as a `Duration`, or `None` when it cannot be represented.
    pub fn period(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.period_ms() / 1000.0).ok()
    }
}

impl Default for WaveAttributes {
    fn default() -> Self {
        Self {
            wave_width: DEFAULT_WAVE_WIDTH,
            wave_height: DEFAULT_WAVE_HEIGHT,
            animation_total_height: DEFAULT_TOTAL_HEIGHT,
            animation_speed: DEFAULT_SPEED,
            wave_color: DEFAULT_WAVE_COLOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    /// Layers begin oscillating one after another, back to front.
    #[default]
    Staggered,
    /// Every layer starts as soon as the compositor does.
    Immediate,
}

/// Host padding subtracted from the surface size before layers receive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Insets {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Insets {
    pub fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> i32 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WaveConfig {
    pub version: u32,
    #[serde(default)]
    pub wave: WaveSection,
    #[serde(default)]
    pub compositor: CompositorSection,
    #[serde(default, rename = "layer", skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<LayerSection>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WaveSection {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub total_height: Option<i32>,
    pub speed: Option<f32>,
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub period: Option<Duration>,
    pub color: Option<Rgba>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompositorSection {
    #[serde(default = "default_layer_count")]
    pub layer_count: usize,
    #[serde(default = "default_color_overrides")]
    pub color_overrides: Vec<Rgba>,
    #[serde(default)]
    pub start: StartMode,
    #[serde(default)]
    pub padding: Insets,
}

impl Default for CompositorSection {
    fn default() -> Self {
        Self {
            layer_count: default_layer_count(),
            color_overrides: default_color_overrides(),
            start: StartMode::default(),
            padding: Insets::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LayerSection {
    pub phase: Option<f64>,
    pub color: Option<Rgba>,
}

/// A layer description after defaults have been filled in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLayer {
    pub phase: f64,
    pub color: Option<Rgba>,
}

fn default_layer_count() -> usize {
    DEFAULT_LAYER_COUNT
}

fn default_color_overrides() -> Vec<Rgba> {
    DEFAULT_COLOR_OVERRIDES.to_vec()
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of milliseconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_millis(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_millis(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v / 1000.0)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration_opt<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(duration) => serializer.collect_str(&humantime::format_duration(*duration)),
        None => serializer.serialize_none(),
    }
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            version: 1,
            wave: WaveSection::default(),
            compositor: CompositorSection::default(),
            layers: Vec::new(),
        }
    }
}

impl WaveConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: WaveConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|err| ConfigError::Invalid(format!("failed to serialise configuration: {err}")))
    }

    /// Builds the wave attributes, filling unset fields with defaults.
    pub fn attributes(&self) -> Result<WaveAttributes, ConfigError> {
        let wave = &self.wave;
        let width = wave.width.unwrap_or(DEFAULT_WAVE_WIDTH);
        let height = wave.height.unwrap_or(DEFAULT_WAVE_HEIGHT);
        let total = wave.total_height.unwrap_or(DEFAULT_TOTAL_HEIGHT);
        let color = wave.color.unwrap_or(DEFAULT_WAVE_COLOR);
        match (wave.speed, wave.period) {
            (Some(_), Some(_)) => Err(ConfigError::Invalid(
                "wave.speed and wave.period are mutually exclusive".into(),
            )),
            (_, Some(period)) => WaveAttributes::with_period(width, height, total, period, color),
            (speed, None) => {
                WaveAttributes::new(width, height, total, speed.unwrap_or(DEFAULT_SPEED), color)
            }
        }
    }

    /// Layer list with phases and colours resolved.
    ///
    /// Explicit `[[layer]]` tables win over `compositor.layer_count`.
    pub fn resolved_layers(&self) -> Vec<ResolvedLayer> {
        if self.layers.is_empty() {
            (0..self.compositor.layer_count)
                .map(|index| ResolvedLayer {
                    phase: default_phase(index),
                    color: None,
                })
                .collect()
        } else {
            self.layers
                .iter()
                .enumerate()
                .map(|(index, layer)| ResolvedLayer {
                    phase: layer.phase.unwrap_or_else(|| default_phase(index)),
                    color: layer.color,
                })
                .collect()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        self.attributes()?;

        for (index, layer) in self.layers.iter().enumerate() {
            if let Some(phase) = layer.phase {
                if !phase.is_finite() {
                    return Err(ConfigError::Invalid(format!(
                        "layer {index} phase must be a finite number of radians"
                    )));
                }
            }
        }

        let padding = self.compositor.padding;
        if [padding.left, padding.top, padding.right, padding.bottom]
            .iter()
            .any(|value| *value < 0)
        {
            return Err(ConfigError::Invalid(
                "compositor.padding values must be non-negative".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1

[wave]
width = 240
height = 12
total_height = 40
period = "2s"
color = "#3A86FF"

[compositor]
color_overrides = ["#CFE1FF"]
start = "immediate"
padding = { left = 4, right = 4, top = 2 }

[[layer]]
phase = 0.0

[[layer]]
color = "#80FFFFFF"
"##;

    #[test]
    fn parses_sample_config() {
        let config = WaveConfig::from_toml_str(SAMPLE).expect("parse config");
        let attrs = config.attributes().unwrap();
        assert_eq!(attrs.wave_width(), 240);
        assert_eq!(attrs.wave_height(), 12);
        assert_eq!(attrs.animation_total_height(), 40);
        assert!((attrs.period_ms() - 2000.0).abs() < 1e-3);
        assert_eq!(attrs.wave_color(), Rgba::rgb(0x3a, 0x86, 0xff));
        assert_eq!(config.compositor.start, StartMode::Immediate);
        assert_eq!(config.compositor.padding.horizontal(), 8);
        assert_eq!(config.compositor.padding.vertical(), 2);
        assert_eq!(config.compositor.color_overrides, vec![Rgba::rgb(0xcf, 0xe1, 0xff)]);

        let layers = config.resolved_layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].phase, 0.0);
        assert_eq!(layers[1].phase, default_phase(1));
        assert_eq!(layers[1].color, Some(Rgba::new(0xff, 0xff, 0xff, 0x80)));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = WaveConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config.attributes().unwrap(), WaveAttributes::default());
        assert_eq!(config.compositor.color_overrides, DEFAULT_COLOR_OVERRIDES.to_vec());
        assert_eq!(config.compositor.start, StartMode::Staggered);
        let phases: Vec<f64> = config.resolved_layers().iter().map(|l| l.phase).collect();
        assert_eq!(phases, vec![default_phase(0), default_phase(1), default_phase(2)]);
    }

    #[test]
    fn default_attributes_match_reference_values() {
        let attrs = WaveAttributes::default();
        assert_eq!(attrs.wave_width(), 200);
        assert_eq!(attrs.wave_height(), 10);
        assert_eq!(attrs.animation_total_height(), 30);
        assert!((attrs.period_ms() - 1500.0).abs() < 1e-3);
        // f32 speed loses a little precision
        let period = attrs.period().expect("representable period");
        assert!(period.abs_diff(Duration::from_millis(1500)) < Duration::from_millis(1));
        assert_eq!(attrs.wave_color().to_string(), "#F69899");
    }

    #[test]
    fn rejects_non_positive_width_and_speed() {
        let err = WaveAttributes::new(0, 10, 30, 0.02, DEFAULT_WAVE_COLOR).unwrap_err();
        assert!(matches!(err, ConfigError::WaveWidth(0)));
        let err = WaveAttributes::new(200, 10, 30, 0.0, DEFAULT_WAVE_COLOR).unwrap_err();
        assert!(matches!(err, ConfigError::Speed(_)));
        let err = WaveAttributes::new(200, 10, 30, f32::NAN, DEFAULT_WAVE_COLOR).unwrap_err();
        assert!(matches!(err, ConfigError::Speed(_)));
        let err = WaveAttributes::new(200, -1, 30, 0.02, DEFAULT_WAVE_COLOR).unwrap_err();
        assert!(matches!(err, ConfigError::WaveHeight(-1)));
        let err = WaveAttributes::new(200, 10, -5, 0.02, DEFAULT_WAVE_COLOR).unwrap_err();
        assert!(matches!(err, ConfigError::TotalHeight(-5)));
    }

    #[test]
    fn rejects_periods_too_long_to_schedule() {
        let err = WaveAttributes::new(200, 10, 30, 1e-30, DEFAULT_WAVE_COLOR).unwrap_err();
        assert!(matches!(err, ConfigError::Period(_)));
        let err = WaveAttributes::new(200, 10, 1000, 1e-19, DEFAULT_WAVE_COLOR).unwrap_err();
        assert!(matches!(err, ConfigError::Period(_)));
        let err = WaveAttributes::with_period(200, 10, 30, MAX_PERIOD * 2, DEFAULT_WAVE_COLOR)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Period(_)));

        // no travel means no period, however slow the speed
        let still = WaveAttributes::new(200, 10, 0, 1e-30, DEFAULT_WAVE_COLOR).unwrap();
        assert_eq!(still.period(), Some(Duration::ZERO));
        let slow = WaveAttributes::with_period(200, 10, 30, MAX_PERIOD / 2, DEFAULT_WAVE_COLOR)
            .unwrap();
        assert!(slow.period().is_some());
    }

    #[test]
    fn rejects_invalid_config_values() {
        let err = WaveConfig::from_toml_str(
            r#"
version = 1

[wave]
width = -20
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::WaveWidth(-20)));

        let err = WaveConfig::from_toml_str(
            r#"
version = 1

[wave]
speed = 0.02
period = 1500
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = WaveConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = WaveConfig::from_toml_str(
            r#"
version = 1

[wave]
color = "pink"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn numeric_period_is_milliseconds() {
        let config = WaveConfig::from_toml_str(
            r#"
version = 1

[wave]
total_height = 30
period = 1500
"#,
        )
        .unwrap();
        assert_eq!(config.wave.period, Some(Duration::from_millis(1500)));
        let attrs = config.attributes().unwrap();
        assert!((attrs.animation_speed() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn zero_layer_count_yields_no_layers() {
        let config = WaveConfig::from_toml_str(
            r#"
version = 1

[compositor]
layer_count = 0
"#,
        )
        .unwrap();
        assert!(config.resolved_layers().is_empty());
    }

    #[test]
    fn serialises_back_to_toml() {
        let config = WaveConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("period = \"2s\""));
        let reparsed = WaveConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed.attributes().unwrap(), config.attributes().unwrap());
    }
}
