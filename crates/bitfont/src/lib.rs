//! Bitmap-atlas fonts for real-time renderers.
//!
//! `bitfont` loads fonts that were rasterized ahead of time into a single
//! atlas image plus a JSON metrics description, compiles every glyph into a
//! replayable draw command, and caches one composed command per distinct
//! line of text so that strings drawn every frame cost a single replay.
//!
//! # Getting Started
//!
//! ```no_run
//! use bitfont::{DrawOptions, FontRegistry, FontRegistryConfig, RecordingBackend};
//!
//! let mut fonts = FontRegistry::new(
//!     FontRegistryConfig::new().with_font_dir("assets/fonts"),
//! );
//! let font = fonts.load("FreeSans")?;
//!
//! // Measurements are normalized to the font's pixel height.
//! let width_px = fonts.text_width(font, b"Hello") * 16.0;
//!
//! let mut backend = RecordingBackend::new();
//! fonts.draw(font, &mut backend, b"Hello", 10.0, 30.0, &DrawOptions::new(16.0));
//!
//! // Once per frame, after drawing.
//! fonts.update(1.0 / 60.0);
//! # Ok::<(), bitfont::FontError>(())
//! ```
//!
//! # Rendering
//!
//! The crate does not talk to a graphics API. Implement [`TextBackend`] for
//! your renderer: it receives transforms, colors, the atlas texture and
//! [`GlyphQuad`]s (which are `bytemuck::Pod`, ready for a vertex buffer).
//! Backends that compile commands should drain
//! [`FontRegistry::take_released_commands`] to free evicted ones.
//!
//! # Inline Colors
//!
//! Text is a byte string. The four bytes `[0xFF, r, g, b]` switch the draw
//! color mid-string; see [`markup`].
//!
//! # Font Names
//!
//! A name may start with `":<flags>:"`: `o` draws an outline halo behind
//! each glyph, `n` samples the atlas with nearest-neighbor filtering. See
//! [`FontOptions`].

pub mod atlas;
mod backend;
mod command;
mod config;
mod error;
mod font;
pub mod layout;
pub mod logging;
pub mod markup;
mod options;
mod registry;
mod string_cache;
mod types;

pub use atlas::{
    AtlasLoader, AtlasSynthesizer, AtlasTexture, GlyphAtlasSpec, GlyphMetrics,
    MetricsDescription, SynthesisDefaults, SynthesisRequest, TextureFilter, TextureId,
};
pub use backend::{BackendEvent, ColorStack, Placement, RecordingBackend, TextBackend};
pub use command::{
    CommandId, DrawCommand, GlyphCommandBuilder, GlyphMode, GlyphTable, HaloStyle, RenderOp,
};
pub use config::{DEFAULT_FONT_SIZE, FontRegistryConfig};
pub use error::{FontError, FontResult};
pub use font::{DrawEnv, FontInstance, TextExtent};
pub use layout::{DrawOptions, HorizontalAlign, Shadow, VerticalAlign, VerticalAnchor};
pub use markup::strip_colors;
pub use options::{FontOptions, FontRequest};
pub use registry::{FontId, FontRegistry};
pub use string_cache::{StringCache, StringCacheStats};
pub use types::{Color, GlyphQuad, Rect, Size};
