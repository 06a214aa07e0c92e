//! Font names, rendering options and load requests.
//!
//! Font names may carry a legacy option prefix, `":<flags>:"`, ahead of the
//! base name: `":o:FreeSans"` requests outline rendering, `":n:"`
//! nearest-neighbor filtering, and flags combine (`":on:"`). Unknown flags
//! are ignored. The full name, prefix included, stays the registry key so
//! existing references keep resolving to the same font.

use std::fmt::Write as _;

use crate::atlas::TextureFilter;

/// Rendering options of one font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FontOptions {
    /// Draw an outline halo behind every glyph.
    pub outline: bool,
    /// Atlas sampling filter.
    pub filter: TextureFilter,
}

impl FontOptions {
    #[must_use]
    pub fn with_outline(mut self, outline: bool) -> Self {
        self.outline = outline;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: TextureFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Split a font name into its options and base name.
    ///
    /// ```
    /// use bitfont::{FontOptions, TextureFilter};
    ///
    /// let (options, base) = FontOptions::parse_name(":on:FreeSans");
    /// assert!(options.outline);
    /// assert_eq!(options.filter, TextureFilter::Nearest);
    /// assert_eq!(base, "FreeSans");
    /// ```
    pub fn parse_name(name: &str) -> (Self, &str) {
        let Some(rest) = name.strip_prefix(':') else {
            return (Self::default(), name);
        };
        let Some((flags, base)) = rest.split_once(':') else {
            return (Self::default(), name);
        };

        let mut options = Self::default();
        for flag in flags.chars() {
            match flag {
                'o' => options.outline = true,
                'n' => options.filter = TextureFilter::Nearest,
                _ => {}
            }
        }
        (options, base)
    }

    /// The legacy prefix for these options, empty for the defaults.
    pub fn prefix(&self) -> String {
        let mut flags = String::new();
        if self.outline {
            flags.push('o');
        }
        if self.filter == TextureFilter::Nearest {
            flags.push('n');
        }
        if flags.is_empty() {
            flags
        } else {
            format!(":{flags}:")
        }
    }
}

/// A request to load a font.
///
/// Overrides left as `None` take the registry configuration's values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FontRequest {
    /// Font name, optionally with an option prefix.
    pub name: String,
    /// Pixel height to load (and synthesize) the atlas at.
    pub size: Option<u32>,
    /// Outline width used when sizing outlined text.
    pub outline_width: Option<f32>,
    /// Outline weight reported to the widget layer.
    pub outline_weight: Option<f32>,
}

impl FontRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_outline_width(mut self, width: f32) -> Self {
        self.outline_width = Some(width);
        self
    }

    #[must_use]
    pub fn with_outline_weight(mut self, weight: f32) -> Self {
        self.outline_weight = Some(weight);
        self
    }

    /// Registry key: the name, plus any overrides.
    pub fn key(&self) -> String {
        let mut key = self.name.clone();
        if let Some(size) = self.size {
            let _ = write!(key, "@{size}");
        }
        if let Some(width) = self.outline_width {
            let _ = write!(key, "/w{width}");
        }
        if let Some(weight) = self.outline_weight {
            let _ = write!(key, "/k{weight}");
        }
        key
    }
}

impl From<&str> for FontRequest {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
