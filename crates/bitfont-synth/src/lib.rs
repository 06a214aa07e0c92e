//! Rasterizes vector fonts into `bitfont` atlases.
//!
//! [`CosmicSynthesizer`] implements [`bitfont::AtlasSynthesizer`]: given a
//! TrueType or OpenType file it renders one glyph per character code with
//! cosmic-text's swash rasterizer, packs the bitmaps into a grid, and writes
//! the atlas PNG and the JSON metrics description `bitfont` loads.
//!
//! ```no_run
//! use bitfont::{FontRegistry, FontRegistryConfig};
//! use bitfont_synth::CosmicSynthesizer;
//!
//! let config = FontRegistryConfig::new().with_font_dir("assets/fonts");
//! let mut fonts = FontRegistry::with_synthesizer(config, Box::new(CosmicSynthesizer::new()));
//! // Writes assets/fonts/FreeSans_16.{png,json} on first use.
//! let font = fonts.load("FreeSans")?;
//! # Ok::<(), bitfont::FontError>(())
//! ```

mod error;
mod pack;
mod rasterizer;

pub use error::{SynthError, SynthResult};
pub use pack::{AtlasLayout, pack};
pub use rasterizer::{CosmicSynthesizer, FaceMetrics, RasterGlyph, describe};
