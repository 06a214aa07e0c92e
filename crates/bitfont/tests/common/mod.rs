//! Synthetic atlases for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use bitfont::{FontRegistry, FontRegistryConfig, GlyphMetrics, MetricsDescription};
use image::RgbaImage;

pub const TEX_SIZE: u32 = 64;

/// A glyph with an advance and a vertical extent in pixels.
pub fn glyph(adv: f32, ymin: f32, ymax: f32) -> GlyphMetrics {
    GlyphMetrics {
        adv,
        oxp: adv,
        oyn: ymin,
        oyp: ymax,
        txp: 8.0,
        typ: 8.0,
        ymin,
        ymax,
        width: 8.0,
        whitespace: 1.0,
        ..GlyphMetrics::default()
    }
}

pub fn description(height: f32, y_step: f32, glyphs: &[(u8, GlyphMetrics)]) -> MetricsDescription {
    MetricsDescription {
        src_file: "Synthetic.ttf".to_string(),
        family: "Synthetic".to_string(),
        style: "Regular".to_string(),
        height,
        y_step,
        x_tex_size: TEX_SIZE,
        y_tex_size: TEX_SIZE,
        ascender: None,
        descender: None,
        glyphs: glyphs
            .iter()
            .map(|(code, metrics)| (*code as u32, *metrics))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// 'A' advances 10 and space 4, at 16 px.
pub fn simple_description() -> MetricsDescription {
    let mut description = description(
        16.0,
        20.0,
        &[(b' ', glyph(4.0, 0.0, 0.0)), (b'A', glyph(10.0, 0.0, 12.0)), (b'g', glyph(9.0, -4.0, 10.0))],
    );
    description.descender = Some(-0.25);
    description
}

/// Lowercase letters and space, each half a unit wide, at 10 px with a
/// 10 px line step.
pub fn mono_description() -> MetricsDescription {
    let glyphs: Vec<(u8, GlyphMetrics)> = std::iter::once(b' ')
        .chain(b'a'..=b'z')
        .map(|code| (code, glyph(0.5, -2.0, 7.0)))
        .collect();
    description(10.0, 10.0, &glyphs)
}

/// Write `<stem>.json` and `<stem>.png` into `dir`.
pub fn write_atlas(dir: &Path, stem: &str, description: &MetricsDescription) {
    let json = serde_json::to_string_pretty(description).unwrap();
    std::fs::write(dir.join(format!("{stem}.json")), json).unwrap();
    RgbaImage::new(TEX_SIZE, TEX_SIZE)
        .save(dir.join(format!("{stem}.png")))
        .unwrap();
}

/// A registry over `dir` with the default 16 px size.
pub fn registry(dir: &Path) -> FontRegistry {
    FontRegistry::new(FontRegistryConfig::new().with_font_dir(dir))
}

/// A temporary font directory holding `Simple_16` and `Mono_16`.
pub fn font_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_atlas(dir.path(), "Simple_16", &simple_description());
    write_atlas(dir.path(), "Mono_16", &mono_description());
    dir
}
