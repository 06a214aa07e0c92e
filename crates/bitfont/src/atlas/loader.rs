//! Locating atlas assets and synthesizing missing ones.
//!
//! For a base name `N` at pixel height `S` the loader looks for the pair
//! `N_S.json` (metrics description) and `N_S.png` (atlas image) in each
//! configured font directory. When the pair is incomplete it looks for a
//! vector source (`N.ttf`, then `N.otf`) and asks an [`AtlasSynthesizer`] to
//! produce the pair, then searches again.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{FontError, FontResult};
use crate::logging::targets;

/// Extension of metrics description files.
pub const METRICS_EXTENSION: &str = "json";
/// Extension of atlas images.
pub const IMAGE_EXTENSION: &str = "png";
/// Vector font extensions, in lookup order.
pub const VECTOR_EXTENSIONS: [&str; 2] = ["ttf", "otf"];

/// Default parameters handed to the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SynthesisDefaults {
    /// First character code to rasterize.
    pub first_char: u8,
    /// Last character code to rasterize (inclusive).
    pub last_char: u8,
    /// Empty pixels around each glyph bitmap.
    pub padding: u32,
    /// Pixels between neighbouring cells in the atlas.
    pub spacing: u32,
}

impl Default for SynthesisDefaults {
    fn default() -> Self {
        Self {
            first_char: 0,
            last_char: 255,
            padding: 1,
            spacing: 1,
        }
    }
}

/// What the synthesizer is asked to produce.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// The vector font to rasterize.
    pub source: PathBuf,
    /// Pixel height to rasterize at.
    pub pixel_height: u32,
    pub first_char: u8,
    pub last_char: u8,
    pub padding: u32,
    pub spacing: u32,
    /// Where to write `<stem>.png`.
    pub image_path: PathBuf,
    /// Where to write `<stem>.json`.
    pub metrics_path: PathBuf,
}

/// Turns a vector font into an atlas image plus metrics description.
///
/// Implementations write both output files named in the request. An
/// implementation that cannot handle the source may return `Ok(())` without
/// writing anything; the loader checks for the files afterwards.
pub trait AtlasSynthesizer {
    fn synthesize(&self, request: &SynthesisRequest) -> FontResult<()>;
}

/// Paths of a complete atlas asset pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasAssets {
    pub metrics: PathBuf,
    pub image: PathBuf,
}

/// Resolves font names to atlas assets on disk.
pub struct AtlasLoader {
    font_dirs: Vec<PathBuf>,
    synthesizer: Option<Box<dyn AtlasSynthesizer>>,
    defaults: SynthesisDefaults,
}

impl AtlasLoader {
    /// Create a loader searching the given directories in order.
    pub fn new(font_dirs: Vec<PathBuf>, defaults: SynthesisDefaults) -> Self {
        Self {
            font_dirs,
            synthesizer: None,
            defaults,
        }
    }

    /// Attach the rasterizer used when assets are missing.
    pub fn set_synthesizer(&mut self, synthesizer: Box<dyn AtlasSynthesizer>) {
        self.synthesizer = Some(synthesizer);
    }

    pub fn has_synthesizer(&self) -> bool {
        self.synthesizer.is_some()
    }

    pub fn font_dirs(&self) -> &[PathBuf] {
        &self.font_dirs
    }

    /// The asset stem for a base name at a pixel height.
    pub fn stem(base_name: &str, pixel_height: u32) -> String {
        format!("{base_name}_{pixel_height}")
    }

    fn dirs(&self) -> Vec<&Path> {
        // With no configured directory, names resolve against the working
        // directory.
        if self.font_dirs.is_empty() {
            vec![Path::new(".")]
        } else {
            self.font_dirs.iter().map(PathBuf::as_path).collect()
        }
    }

    /// Find an existing metrics/image pair without synthesizing.
    pub fn locate(&self, base_name: &str, pixel_height: u32) -> Option<AtlasAssets> {
        let stem = Self::stem(base_name, pixel_height);
        self.dirs().into_iter().find_map(|dir| {
            let metrics = asset_path(dir, &stem, METRICS_EXTENSION);
            let image = asset_path(dir, &stem, IMAGE_EXTENSION);
            (metrics.is_file() && image.is_file()).then_some(AtlasAssets { metrics, image })
        })
    }

    /// Find a vector source for the base name.
    pub fn locate_vector_source(&self, base_name: &str) -> Option<PathBuf> {
        self.dirs().into_iter().find_map(|dir| {
            VECTOR_EXTENSIONS
                .iter()
                .map(|ext| asset_path(dir, base_name, ext))
                .find(|path| path.is_file())
        })
    }

    /// Resolve a font to its assets, synthesizing them if needed.
    pub fn load(&self, base_name: &str, pixel_height: u32) -> FontResult<AtlasAssets> {
        if let Some(assets) = self.locate(base_name, pixel_height) {
            debug!(target: targets::ATLAS, base_name, pixel_height, ?assets, "found atlas assets");
            return Ok(assets);
        }

        if let (Some(synthesizer), Some(source)) =
            (&self.synthesizer, self.locate_vector_source(base_name))
        {
            // Output lands next to the vector source, where `locate` will
            // find it on the next lookup.
            let stem = Self::stem(base_name, pixel_height);
            let file_stem = Path::new(&stem)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or(stem.clone());
            let out_dir = source.parent().unwrap_or(Path::new("."));
            let request = SynthesisRequest {
                pixel_height,
                first_char: self.defaults.first_char,
                last_char: self.defaults.last_char,
                padding: self.defaults.padding,
                spacing: self.defaults.spacing,
                image_path: asset_path(out_dir, &file_stem, IMAGE_EXTENSION),
                metrics_path: asset_path(out_dir, &file_stem, METRICS_EXTENSION),
                source,
            };

            info!(
                target: targets::ATLAS,
                source = %request.source.display(),
                pixel_height,
                "synthesizing atlas from vector font"
            );
            if let Err(err) = synthesizer.synthesize(&request) {
                warn!(target: targets::ATLAS, %err, "atlas synthesis failed");
            }

            if request.metrics_path.is_file() && request.image_path.is_file() {
                return Ok(AtlasAssets {
                    metrics: request.metrics_path,
                    image: request.image_path,
                });
            }
            if let Some(assets) = self.locate(base_name, pixel_height) {
                return Ok(assets);
            }
        }

        Err(FontError::MissingAsset {
            name: base_name.to_string(),
            searched: self.searched_paths(base_name, pixel_height),
        })
    }

    fn searched_paths(&self, base_name: &str, pixel_height: u32) -> Vec<PathBuf> {
        let stem = Self::stem(base_name, pixel_height);
        self.dirs()
            .into_iter()
            .flat_map(|dir| {
                let assets = [METRICS_EXTENSION, IMAGE_EXTENSION]
                    .into_iter()
                    .map(|ext| asset_path(dir, &stem, ext));
                let sources = VECTOR_EXTENSIONS
                    .iter()
                    .map(|ext| asset_path(dir, base_name, ext));
                assets.chain(sources).collect::<Vec<_>>()
            })
            .collect()
    }
}

/// `dir/name.ext`, without treating dots inside `name` as an extension.
fn asset_path(dir: &Path, name: &str, ext: &str) -> PathBuf {
    dir.join(format!("{name}.{ext}"))
}

impl std::fmt::Debug for AtlasLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasLoader")
            .field("font_dirs", &self.font_dirs)
            .field("has_synthesizer", &self.has_synthesizer())
            .field("defaults", &self.defaults)
            .finish()
    }
}
