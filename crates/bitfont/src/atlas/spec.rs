//! Parsed bitmap-font descriptions.
//!
//! A metrics description is a JSON document produced by the rasterizer next
//! to the atlas image:
//!
//! ```json
//! {
//!   "srcFile": "FreeSans.ttf", "family": "FreeSans", "style": "Regular",
//!   "height": 16, "yStep": 19, "xTexSize": 256, "yTexSize": 256,
//!   "glyphs": {
//!     "32": { "adv": 0.25, "oxn": 0, "oyn": 0, "oxp": 0, "oyp": 0,
//!             "txn": 0, "tyn": 0, "txp": 0, "typ": 0 }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FontError, FontResult};
use crate::logging::targets;

/// Character code used when a code has no glyph of its own.
pub const FALLBACK_CODE: u8 = b' ';

/// Number of addressable character codes.
pub const CODE_COUNT: usize = 256;

/// Geometry of one character in the atlas.
///
/// `oxn..oyp` is the quad in normalized units (1.0 = the font's pixel
/// height), `txn..typ` the texture region in atlas pixels, and
/// `xmin..ymax`, `init_dist`, `width`, `whitespace` the pixel-space metrics
/// used by outlined rendering.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphMetrics {
    /// Character code. Filled in from the glyph map key.
    #[serde(skip)]
    pub code: u8,
    /// Advance width, normalized.
    pub adv: f32,
    pub oxn: f32,
    pub oyn: f32,
    pub oxp: f32,
    pub oyp: f32,
    pub txn: f32,
    pub tyn: f32,
    pub txp: f32,
    pub typ: f32,
    #[serde(default)]
    pub xmin: f32,
    #[serde(default)]
    pub ymin: f32,
    #[serde(default)]
    pub xmax: f32,
    #[serde(default)]
    pub ymax: f32,
    /// Distance from the pen position to the left edge of the bitmap.
    #[serde(default)]
    pub init_dist: f32,
    /// Bitmap width in pixels.
    #[serde(default)]
    pub width: f32,
    /// Extra spacing after the bitmap in pixels.
    #[serde(default)]
    pub whitespace: f32,
}

/// The serialized form of a metrics description.
///
/// The rasterizer writes this; [`GlyphAtlasSpec`] is built from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDescription {
    pub src_file: String,
    pub family: String,
    pub style: String,
    /// Pixel height the atlas was rasterized at.
    pub height: f32,
    /// Distance between baselines in pixels.
    pub y_step: f32,
    pub x_tex_size: u32,
    pub y_tex_size: u32,
    /// Normalized ascender; derived from the glyph boxes when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ascender: Option<f32>,
    /// Normalized descender (zero or negative); derived when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descender: Option<f32>,
    pub glyphs: BTreeMap<u32, GlyphMetrics>,
}

/// An immutable, validated description of one bitmap font.
#[derive(Debug, Clone)]
pub struct GlyphAtlasSpec {
    path: PathBuf,
    src_file: String,
    family: String,
    style: String,
    height: f32,
    y_step: f32,
    tex_width: u32,
    tex_height: u32,
    ascender: f32,
    descender: f32,
    glyphs: Box<[Option<GlyphMetrics>; CODE_COUNT]>,
    fallback: GlyphMetrics,
}

impl GlyphAtlasSpec {
    /// Read and validate a metrics description file.
    pub fn load(path: impl AsRef<Path>) -> FontResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json, path)
    }

    /// Parse a metrics description. `path` is only used for error reporting.
    pub fn from_json_str(json: &str, path: impl AsRef<Path>) -> FontResult<Self> {
        let path = path.as_ref();
        let description: MetricsDescription =
            serde_json::from_str(json).map_err(|e| malformed(path, e.to_string()))?;
        Self::from_description(description, path)
    }

    /// Validate a deserialized description.
    pub fn from_description(
        description: MetricsDescription,
        path: impl AsRef<Path>,
    ) -> FontResult<Self> {
        let path = path.as_ref();

        if !(description.height > 0.0) {
            return Err(malformed(path, "height must be positive"));
        }
        if description.x_tex_size == 0 || description.y_tex_size == 0 {
            return Err(malformed(path, "atlas texture size must be non-zero"));
        }

        let mut glyphs = Box::new([None; CODE_COUNT]);
        for (code, mut metrics) in description.glyphs {
            let code = u8::try_from(code)
                .map_err(|_| malformed(path, format!("glyph code {code} is out of range")))?;
            metrics.code = code;
            glyphs[code as usize] = Some(metrics);
        }

        let fallback = glyphs[FALLBACK_CODE as usize]
            .ok_or_else(|| malformed(path, "no glyph for the space character"))?;

        let height = description.height;
        let present = || glyphs.iter().flatten();
        let descender = description
            .descender
            .unwrap_or_else(|| present().map(|g| g.ymin).fold(0.0, f32::min) / height);
        let ascender = description.ascender.unwrap_or_else(|| {
            let top = present().map(|g| g.ymax).fold(0.0, f32::max) / height;
            if top > 0.0 { top } else { 1.0 + descender }
        });

        debug!(
            target: targets::ATLAS,
            path = %path.display(),
            family = %description.family,
            glyphs = present().count(),
            "parsed atlas spec"
        );

        Ok(Self {
            path: path.to_path_buf(),
            src_file: description.src_file,
            family: description.family,
            style: description.style,
            height,
            y_step: description.y_step,
            tex_width: description.x_tex_size,
            tex_height: description.y_tex_size,
            ascender,
            descender,
            glyphs,
            fallback,
        })
    }

    /// Path of the metrics file this spec was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the vector font the atlas was rasterized from.
    pub fn src_file(&self) -> &str {
        &self.src_file
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    /// Pixel height the atlas was rasterized at.
    pub fn pixel_height(&self) -> f32 {
        self.height
    }

    /// Distance between baselines in pixels.
    pub fn y_step(&self) -> f32 {
        self.y_step
    }

    /// Distance between baselines, normalized to the pixel height.
    pub fn line_height(&self) -> f32 {
        self.y_step / self.height
    }

    /// Normalized ascender.
    pub fn ascender(&self) -> f32 {
        self.ascender
    }

    /// Normalized descender (zero or negative).
    pub fn descender(&self) -> f32 {
        self.descender
    }

    /// Atlas texture dimensions in pixels.
    pub fn texture_size(&self) -> (u32, u32) {
        (self.tex_width, self.tex_height)
    }

    /// Metrics for a character code, falling back to the space glyph.
    #[inline]
    pub fn glyph(&self, code: u8) -> &GlyphMetrics {
        self.glyphs[code as usize].as_ref().unwrap_or(&self.fallback)
    }

    /// Whether the code has an explicit entry.
    pub fn has_glyph(&self, code: u8) -> bool {
        self.glyphs[code as usize].is_some()
    }

    /// The space glyph every missing code falls back to.
    pub fn fallback(&self) -> &GlyphMetrics {
        &self.fallback
    }

    /// Iterate over the explicit entries in code order.
    pub fn glyphs(&self) -> impl Iterator<Item = &GlyphMetrics> {
        self.glyphs.iter().flatten()
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> FontError {
    FontError::MalformedSpec {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
