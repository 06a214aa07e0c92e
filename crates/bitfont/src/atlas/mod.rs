//! Bitmap atlas assets: metrics descriptions, atlas images and the loader
//! that finds (or synthesizes) them.

mod loader;
mod spec;
mod texture;

pub use loader::{
    AtlasAssets, AtlasLoader, AtlasSynthesizer, IMAGE_EXTENSION, METRICS_EXTENSION,
    SynthesisDefaults, SynthesisRequest, VECTOR_EXTENSIONS,
};
pub use spec::{CODE_COUNT, FALLBACK_CODE, GlyphAtlasSpec, GlyphMetrics, MetricsDescription};
pub use texture::{AtlasTexture, TextureFilter, TextureId};
