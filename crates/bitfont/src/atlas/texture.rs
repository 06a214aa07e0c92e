//! Atlas texture bindings.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;
use tracing::{debug, warn};

use crate::error::{FontError, FontResult};
use crate::logging::targets;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one decoded atlas image.
///
/// Backends use this to upload a texture once and reuse the upload for
/// every draw command that binds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Sampling filter requested for an atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    /// Bilinear filtering.
    #[default]
    Linear,
    /// Nearest-neighbor filtering, for pixel-exact bitmap fonts.
    Nearest,
}

/// A decoded atlas image together with its sampling filter.
///
/// Shared (`Arc`) by every glyph and string command of one font.
pub struct AtlasTexture {
    id: TextureId,
    path: Option<PathBuf>,
    image: RgbaImage,
    filter: TextureFilter,
}

impl AtlasTexture {
    /// Decode an atlas image from disk.
    pub fn load(path: impl AsRef<Path>, filter: TextureFilter) -> FontResult<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|source| FontError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .into_rgba8();

        debug!(
            target: targets::ATLAS,
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            ?filter,
            "decoded atlas image"
        );

        Ok(Self {
            id: TextureId::next(),
            path: Some(path.to_path_buf()),
            image,
            filter,
        })
    }

    /// Wrap an image that is already in memory.
    pub fn from_image(image: RgbaImage, filter: TextureFilter) -> Self {
        Self {
            id: TextureId::next(),
            path: None,
            image,
            filter,
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Where the image was loaded from, if it came from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Decoded RGBA pixels.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn filter(&self) -> TextureFilter {
        self.filter
    }

    /// Width and height in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Log a warning when the image does not match the size the metrics
    /// description was computed for. Texture coordinates are derived from
    /// the description, so a mismatch shows up as misaligned glyphs.
    pub(crate) fn check_dimensions(&self, expected: (u32, u32)) {
        if self.dimensions() != expected {
            warn!(
                target: targets::ATLAS,
                path = ?self.path,
                actual = ?self.dimensions(),
                ?expected,
                "atlas image size differs from its metrics description"
            );
        }
    }
}

impl std::fmt::Debug for AtlasTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasTexture")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("dimensions", &self.dimensions())
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}
