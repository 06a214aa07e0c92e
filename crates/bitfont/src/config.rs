//! Registry configuration.

use std::path::PathBuf;

use serde::Deserialize;

use crate::atlas::SynthesisDefaults;
use crate::command::HaloStyle;
use crate::error::FontResult;

/// Pixel height requested when a font is loaded without a size.
pub const DEFAULT_FONT_SIZE: u32 = 16;

/// Configuration for a [`FontRegistry`](crate::FontRegistry).
///
/// Build it in code with the `with_*` methods or read it from TOML:
///
/// ```
/// use bitfont::FontRegistryConfig;
///
/// let config = FontRegistryConfig::from_toml_str(r#"
///     font_dirs = ["assets/fonts"]
///     default_font = "FreeSans"
///     max_cache_age = 5.0
///
///     [halo]
///     alpha = 0.5
/// "#).unwrap();
/// assert_eq!(config.default_size, 16);
/// assert_eq!(config.halo.alpha, 0.5);
/// assert_eq!(config.halo.offset, 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FontRegistryConfig {
    /// Directories searched for atlas assets and vector sources, in order.
    pub font_dirs: Vec<PathBuf>,
    /// Font loaded when the registry is created.
    pub default_font: Option<String>,
    /// Pixel height used when a request does not name one.
    pub default_size: u32,
    /// Outline width used to size outlined text.
    pub outline_width: f32,
    /// Outline weight reported for outlined fonts.
    pub outline_weight: f32,
    /// Whether line commands are cached at all.
    pub cache_enabled: bool,
    /// Round draw anchors down to whole pixels.
    pub floor_positions: bool,
    /// Accumulated time between eviction sweeps.
    pub sweep_interval: f64,
    /// Age at which a cached line is evicted.
    pub max_cache_age: f64,
    /// Halo appearance of outlined fonts.
    pub halo: HaloStyle,
    /// Parameters handed to the atlas synthesizer.
    pub synthesis: SynthesisDefaults,
}

impl Default for FontRegistryConfig {
    fn default() -> Self {
        Self {
            font_dirs: Vec::new(),
            default_font: None,
            default_size: DEFAULT_FONT_SIZE,
            outline_width: 3.0,
            outline_weight: 3.0,
            cache_enabled: true,
            floor_positions: true,
            sweep_interval: 1.0,
            max_cache_age: 3.0,
            halo: HaloStyle::default(),
            synthesis: SynthesisDefaults::default(),
        }
    }
}

impl FontRegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> FontResult<Self> {
        Ok(toml::from_str(source)?)
    }

    #[must_use]
    pub fn with_font_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(dir.into());
        self
    }

    #[must_use]
    pub fn with_default_font(mut self, name: impl Into<String>) -> Self {
        self.default_font = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_default_size(mut self, size: u32) -> Self {
        self.default_size = size;
        self
    }

    #[must_use]
    pub fn with_outline_width(mut self, width: f32) -> Self {
        self.outline_width = width;
        self
    }

    #[must_use]
    pub fn with_outline_weight(mut self, weight: f32) -> Self {
        self.outline_weight = weight;
        self
    }

    #[must_use]
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_floor_positions(mut self, floor: bool) -> Self {
        self.floor_positions = floor;
        self
    }

    #[must_use]
    pub fn with_sweep_interval(mut self, interval: f64) -> Self {
        self.sweep_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_cache_age(mut self, age: f64) -> Self {
        self.max_cache_age = age;
        self
    }

    #[must_use]
    pub fn with_halo(mut self, halo: HaloStyle) -> Self {
        self.halo = halo;
        self
    }

    #[must_use]
    pub fn with_synthesis(mut self, synthesis: SynthesisDefaults) -> Self {
        self.synthesis = synthesis;
        self
    }
}
